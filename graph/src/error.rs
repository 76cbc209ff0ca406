//! Fatal error taxonomy.
//!
//! Anything in here stops the current document (or the whole build, for
//! configuration problems). Conditions the build can continue past are
//! reported through [`Diagnostics`](crate::diagnostics::Diagnostics) instead.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = GraphError> = std::result::Result<T, E>;

/// A condition that aborts processing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// The configuration has the wrong shape or contradicts itself.
    #[error("configuration error: {0}")]
    Config(String),

    /// A token used a prefix that is not in the prefix table.
    #[error("unknown prefix \"{prefix}\" in \"{token}\"")]
    UnknownPrefix {
        /// The prefix part of the token.
        prefix: String,
        /// The full token as written.
        token: String,
    },

    /// A token had an empty local name and there was nothing to substitute.
    #[error("empty name \"{0}\" with no enclosing declaration to refer to")]
    EmptyName(String),

    /// An amount expression referred to a name that is not defined.
    #[error("name \"{0}\" is not defined")]
    UndefinedName(String),

    /// An amount expression or `defs` statement is malformed.
    #[error("invalid expression \"{expression}\": {reason}")]
    ExpressionSyntax {
        /// The offending source text.
        expression: String,
        /// What the evaluator expected.
        reason: String,
    },

    /// A consumes/produces line does not match the item grammar.
    #[error("invalid item \"{line}\": {reason}")]
    ItemSyntax {
        /// The offending line.
        line: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Turtle input could not be parsed.
    #[error("graph data could not be parsed: {0}")]
    Parse(String),
}

impl GraphError {
    pub(crate) fn syntax(expression: &str, reason: impl Into<String>) -> Self {
        GraphError::ExpressionSyntax {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn item(line: &str, reason: impl Into<String>) -> Self {
        GraphError::ItemSyntax {
            line: line.trim().to_string(),
            reason: reason.into(),
        }
    }
}
