//! Non-fatal build conditions: kinds, severity levels, and aggregation.
//!
//! Every entry is also emitted as a `tracing` event when it is recorded, so
//! the log shows problems as they happen and the collected list can be
//! printed as a summary at the end of a build.

use std::fmt;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Something looks wrong but output is still meaningful.
    Warning,
    /// Output is known to be incomplete, but the build continues.
    Error,
}

impl Severity {
    /// Returns the lowercase label used in summaries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// What kind of condition was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticKind {
    /// A URI was declared more than once.
    DuplicateDeclaration,
    /// An item used a unit missing from the unit table.
    UnsupportedUnit,
    /// A children-of placeholder points at something that is not a process.
    MissingCompositionSource,
    /// A short-name reference matched several things.
    AmbiguousReference,
    /// A reference matched nothing.
    UnresolvedReference,
    /// Only one half of the import/export pair was given.
    TradedMismatch,
    /// An inline graph data block could not be parsed.
    MalformedGraphData,
    /// A prefix was re-bound to a different namespace.
    PrefixConflict,
    /// A process consumes or produces an object that is never declared.
    UndefinedObject,
}

impl DiagnosticKind {
    /// Returns the kebab-case name shown in summaries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::DuplicateDeclaration => "duplicate-declaration",
            DiagnosticKind::UnsupportedUnit => "unsupported-unit",
            DiagnosticKind::MissingCompositionSource => "missing-composition-source",
            DiagnosticKind::AmbiguousReference => "ambiguous-reference",
            DiagnosticKind::UnresolvedReference => "unresolved-reference",
            DiagnosticKind::TradedMismatch => "traded-mismatch",
            DiagnosticKind::MalformedGraphData => "malformed-graph-data",
            DiagnosticKind::PrefixConflict => "prefix-conflict",
            DiagnosticKind::UndefinedObject => "undefined-object",
        }
    }
}

/// A single recorded condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// What was detected.
    pub kind: DiagnosticKind,
    /// How bad it is.
    pub severity: Severity,
    /// Document the condition belongs to, if any.
    pub document: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.document {
            Some(doc) => write!(
                f,
                "{}: {} [{}]: {}",
                doc,
                self.severity.as_str(),
                self.kind.as_str(),
                self.message
            ),
            None => write!(
                f,
                "{} [{}]: {}",
                self.severity.as_str(),
                self.kind.as_str(),
                self.message
            ),
        }
    }
}

/// Diagnostics collected over a build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    /// All entries in the order they were recorded.
    pub entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning.
    pub fn warn(
        &mut self,
        kind: DiagnosticKind,
        document: Option<&str>,
        message: impl Into<String>,
    ) {
        self.record(kind, Severity::Warning, document, message.into());
    }

    /// Records a non-fatal error.
    pub fn error(
        &mut self,
        kind: DiagnosticKind,
        document: Option<&str>,
        message: impl Into<String>,
    ) {
        self.record(kind, Severity::Error, document, message.into());
    }

    fn record(
        &mut self,
        kind: DiagnosticKind,
        severity: Severity,
        document: Option<&str>,
        message: String,
    ) {
        let doc = document.unwrap_or("-");
        match severity {
            Severity::Warning => tracing::warn!(kind = kind.as_str(), document = doc, "{message}"),
            Severity::Error => tracing::error!(kind = kind.as_str(), document = doc, "{message}"),
        }
        self.entries.push(Diagnostic {
            kind,
            severity,
            document: document.map(str::to_string),
            message,
        });
    }

    /// Appends entries from another collection without re-logging them.
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// Iterates over entries of one kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    /// Returns the number of entries at the given severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|d| d.severity == severity).count()
    }

    /// Returns the total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_severity() {
        let mut diags = Diagnostics::new();
        diags.warn(DiagnosticKind::UnsupportedUnit, Some("index"), "unit \"furlong\"");
        diags.error(DiagnosticKind::MissingCompositionSource, None, "not a process");
        assert_eq!(diags.count(Severity::Warning), 1);
        assert_eq!(diags.count(Severity::Error), 1);
        assert_eq!(diags.of_kind(DiagnosticKind::UnsupportedUnit).count(), 1);
    }

    #[test]
    fn display_includes_document() {
        let mut diags = Diagnostics::new();
        diags.warn(DiagnosticKind::DuplicateDeclaration, Some("a/b"), "twice");
        assert_eq!(
            diags.entries[0].to_string(),
            "a/b: warning [duplicate-declaration]: twice"
        );
    }
}
