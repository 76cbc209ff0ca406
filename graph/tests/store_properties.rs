//! Property-based tests for the semantic store and the Turtle writer.
//!
//! Graphs are generated from IRIs (some with local names that cannot be
//! abbreviated), labelled blank nodes and literals with awkward characters,
//! then pushed through the store operations and the serialize/parse cycle.

use proptest::prelude::*;
use probs_graph::model::iris;
use probs_graph::parser::parse_turtle;
use probs_graph::serializer::turtle::to_turtle;
use probs_graph::{Diagnostics, Graph, Namespaces, PrefixBindings, Store, Term, Triple};

const SYS: &str = "http://example.org/system/";

fn bindings() -> PrefixBindings {
    let mut bindings = PrefixBindings::from_namespaces(&Namespaces::new(SYS).unwrap());
    bindings.bind("ex", "http://example.org/ex#");
    bindings
}

fn iri(namespace: &'static str) -> impl Strategy<Value = Term> {
    "[A-Za-z_][A-Za-z0-9_.-]{0,8}".prop_map(move |local| Term::iri(format!("{namespace}{local}")))
}

fn blank() -> impl Strategy<Value = Term> {
    "[a-z][a-z0-9_-]{0,6}".prop_map(Term::blank)
}

fn subject() -> impl Strategy<Value = Term> {
    prop_oneof![
        3 => iri(SYS),
        3 => iri("http://example.org/ex#"),
        2 => iri("urn:unbound:"),
        1 => blank(),
    ]
}

fn predicate() -> impl Strategy<Value = Term> {
    prop_oneof![
        Just(Term::iri(iris::RDF_TYPE)),
        Just(Term::iri(iris::RDFS_LABEL)),
        Just(Term::iri(iris::PROBS_CONSUMES)),
        Just(Term::iri(iris::RECIPE_QUANTITY)),
        iri("http://example.org/ex#"),
    ]
}

fn object() -> impl Strategy<Value = Term> {
    prop_oneof![
        subject(),
        "[ -~\n\t\"\\\\é]{0,12}".prop_map(Term::literal),
        "[a-z ]{0,6}".prop_map(|s| Term::lang(s, "en")),
        (-1.0e6f64..1.0e6).prop_map(Term::double),
    ]
}

fn triple() -> impl Strategy<Value = Triple> {
    (subject(), predicate(), object()).prop_map(|(s, p, o)| Triple::new(s, p, o))
}

fn graph() -> impl Strategy<Value = Graph> {
    prop::collection::vec(triple(), 0..24).prop_map(|triples| triples.into_iter().collect())
}

/// Makes every subject of `graph` unique to `document`.
fn owned_by(document: &str, graph: &Graph) -> Graph {
    graph
        .iter()
        .map(|t| {
            let subject = match &t.subject {
                Term::Iri(iri) => Term::iri(format!("{iri}-{document}")),
                other => other.clone(),
            };
            Triple::new(subject, t.predicate.clone(), t.object.clone())
        })
        .collect()
}

fn store_with(documents: &[(&str, &Graph)]) -> Store {
    let mut store = Store::with_bindings(bindings());
    for (document, graph) in documents {
        for triple in graph.iter() {
            store.add(document, triple.clone());
        }
    }
    store
}

proptest! {
    #[test]
    fn prop_turtle_round_trip(g in graph()) {
        let turtle = to_turtle(&g, &bindings());
        let parsed: Graph = parse_turtle(&turtle)
            .map_err(|e| TestCaseError::fail(format!("{e}\n{turtle}")))?
            .into_iter()
            .collect();
        prop_assert_eq!(parsed, g, "{}", turtle);
    }

    #[test]
    fn prop_store_serialization_round_trips(a in graph(), b in graph()) {
        let store = store_with(&[("a", &a), ("b", &b)]);
        let parsed: Graph = parse_turtle(&store.serialize())
            .map_err(|e| TestCaseError::fail(e.to_string()))?
            .into_iter()
            .collect();
        prop_assert_eq!(parsed, store.merged());
    }

    #[test]
    fn prop_clear_isolates_documents(a in graph(), b in graph()) {
        let a = owned_by("a", &a);
        let b = owned_by("b", &b);
        let mut store = store_with(&[("a", &a), ("b", &b)]);

        let cleared = store.clear("a");
        prop_assert_eq!(cleared, a.len());
        prop_assert!(store.context("a").is_none());
        let remaining = store.context("b").cloned().unwrap_or_default();
        prop_assert_eq!(&remaining, &b);
        prop_assert_eq!(store.merged(), b);
    }

    #[test]
    fn prop_merge_is_idempotent(global in graph(), partial in graph(), other in graph()) {
        let base = store_with(&[("doc", &global), ("other", &other)]);
        let update = store_with(&[("doc", &partial)]);
        let mut diagnostics = Diagnostics::new();

        let mut once = base.clone();
        once.merge(&update, &["doc"], &mut diagnostics);
        let mut twice = base.clone();
        twice.merge(&update, &["doc"], &mut diagnostics);
        twice.merge(&update, &["doc"], &mut diagnostics);

        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.context("doc").cloned().unwrap_or_default(), partial);
        prop_assert_eq!(once.context("other"), base.context("other"));
        prop_assert!(diagnostics.is_empty());
    }
}
