//! Turtle reader for inline graph data and preloaded files.
//!
//! Parsing is delegated to `sophia_turtle`; terms are converted into the
//! crate's own [`Term`] model so the rest of the pipeline never sees the
//! parser's types.

use sophia_api::source::TripleSource;
use sophia_api::term::{Term as _, TermKind};
use sophia_api::triple::Triple as _;

use crate::error::{GraphError, Result};
use crate::model::{Term, Triple};

/// Parses a Turtle document into triples.
///
/// # Errors
///
/// Returns [`GraphError::Parse`] for malformed Turtle, or for terms that
/// have no counterpart in the graph model (variables, quoted triples).
pub fn parse_turtle(text: &str) -> Result<Vec<Triple>> {
    let mut triples = Vec::new();
    let mut unsupported: Option<String> = None;

    sophia_turtle::parser::turtle::parse_str(text)
        .for_each_triple(|t| {
            match (convert(t.s()), convert(t.p()), convert(t.o())) {
                (Some(s), Some(p), Some(o)) => triples.push(Triple::new(s, p, o)),
                _ => {
                    unsupported.get_or_insert_with(|| "unsupported term kind".to_string());
                }
            }
        })
        .map_err(|e| GraphError::Parse(e.to_string()))?;

    match unsupported {
        Some(reason) => Err(GraphError::Parse(reason)),
        None => Ok(triples),
    }
}

/// Parses a Turtle document whose blank nodes belong to `scope`.
///
/// Blank node labels only identify a node within one document, and the
/// parser names anonymous nodes from a counter that restarts on every call.
/// Each label is therefore prefixed with the sanitised scope, so blocks
/// parsed separately never share a node once their triples are merged.
///
/// # Errors
///
/// As [`parse_turtle`].
pub fn parse_turtle_scoped(text: &str, scope: &str) -> Result<Vec<Triple>> {
    let prefix = blank_scope(scope);
    let scoped = |term: Term| match term {
        Term::Blank(label) => Term::Blank(format!("{prefix}_{label}")),
        other => other,
    };
    Ok(parse_turtle(text)?
        .into_iter()
        .map(|t| Triple::new(scoped(t.subject), t.predicate, scoped(t.object)))
        .collect())
}

/// A string usable at the start of a Turtle blank node label.
fn blank_scope(scope: &str) -> String {
    let mut label: String = scope
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if !label.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
        label.insert(0, 'b');
    }
    label
}

fn convert<T: sophia_api::term::Term>(term: T) -> Option<Term> {
    match term.kind() {
        TermKind::Iri => term.iri().map(|iri| Term::iri(iri.as_str())),
        TermKind::BlankNode => term.bnode_id().map(|id| Term::blank(id.as_str())),
        TermKind::Literal => {
            let value = term.lexical_form()?.to_string();
            if let Some(tag) = term.language_tag() {
                return Some(Term::lang(value, tag.as_str()));
            }
            match term.datatype() {
                Some(dt) => Some(Term::typed(value, dt.as_str())),
                None => Some(Term::literal(value)),
            }
        }
        _ => None,
    }
}

/// Collects the `@prefix` / `PREFIX` declarations of a Turtle document, in
/// order of appearance.
///
/// Only declarations at the start of a line are recognised, which covers
/// every conventionally formatted document.
#[must_use]
pub fn declared_prefixes(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim_start();
            let rest = line
                .strip_prefix("@prefix")
                .or_else(|| {
                    line.get(..6)
                        .filter(|kw| kw.eq_ignore_ascii_case("prefix"))
                        .map(|_| &line[6..])
                })?;
            if !rest.starts_with(char::is_whitespace) {
                return None;
            }
            let (prefix, rest) = rest.trim_start().split_once(':')?;
            let rest = rest.trim_start().strip_prefix('<')?;
            let (namespace, _) = rest.split_once('>')?;
            Some((prefix.trim().to_string(), namespace.to_string()))
        })
        .collect()
}
