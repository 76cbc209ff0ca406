//! Turtle 1.1 serializer for the system graph.
//!
//! Produces one `@prefix` line per bound prefix, then one block per subject
//! with its predicates grouped. IRIs are abbreviated with the bound prefixes
//! when the remainder is a plain local name, and written in full otherwise,
//! so the output always parses back to the same triples.

use crate::model::{escape_literal, iris, Graph, Term};
use crate::store::PrefixBindings;

/// Serializes a graph to a Turtle string.
#[must_use]
pub fn to_turtle(graph: &Graph, bindings: &PrefixBindings) -> String {
    let mut out = String::with_capacity(64 * graph.len() + 512);

    for (prefix, namespace) in bindings.iter() {
        out.push_str(&format!("@prefix {prefix}: <{namespace}> .\n"));
    }
    if !graph.is_empty() {
        out.push('\n');
    }

    let mut subject: Option<&Term> = None;
    let mut predicate: Option<&Term> = None;
    for triple in graph {
        if subject == Some(&triple.subject) {
            if predicate == Some(&triple.predicate) {
                out.push_str(" ,\n    ");
            } else {
                out.push_str(" ;\n  ");
                out.push_str(&predicate_to_turtle(&triple.predicate, bindings));
                out.push(' ');
            }
        } else {
            if subject.is_some() {
                out.push_str(" .\n\n");
            }
            out.push_str(&term_to_turtle(&triple.subject, bindings));
            out.push_str("\n  ");
            out.push_str(&predicate_to_turtle(&triple.predicate, bindings));
            out.push(' ');
        }
        out.push_str(&term_to_turtle(&triple.object, bindings));
        subject = Some(&triple.subject);
        predicate = Some(&triple.predicate);
    }
    if subject.is_some() {
        out.push_str(" .\n");
    }

    out
}

fn predicate_to_turtle(term: &Term, bindings: &PrefixBindings) -> String {
    match term {
        Term::Iri(iri) if iri == iris::RDF_TYPE => "a".to_string(),
        other => term_to_turtle(other, bindings),
    }
}

/// Formats a single term in Turtle syntax.
#[must_use]
pub fn term_to_turtle(term: &Term, bindings: &PrefixBindings) -> String {
    match term {
        Term::Iri(iri) => bindings.curie(iri),
        Term::Blank(label) => format!("_:{label}"),
        Term::Literal(lit) => {
            let mut s = format!("\"{}\"", escape_literal(&lit.value));
            if let Some(lang) = &lit.language {
                s.push('@');
                s.push_str(lang);
            } else if let Some(datatype) = &lit.datatype {
                s.push_str("^^");
                s.push_str(&bindings.curie(datatype));
            }
            s
        }
    }
}

/// True when `local` can follow `prefix:` without escaping.
///
/// This is a conservative subset of Turtle's `PN_LOCAL`: ASCII letters,
/// digits, `_` and `-`, not starting with `-`.
#[must_use]
pub fn is_local_name(local: &str) -> bool {
    let mut chars = local.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphanumeric() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
