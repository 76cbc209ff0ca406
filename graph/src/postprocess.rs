//! Final rewrites applied to the merged graph before serialization.

use std::collections::BTreeMap;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{iris, Graph, Term, Triple};

/// Runs every postprocessing step on `graph`.
pub fn postprocess(graph: &mut Graph, diagnostics: &mut Diagnostics) {
    let expanded = expand_composed_of_children(graph, diagnostics);
    tracing::debug!(expanded, "expanded children-of placeholders");
}

/// Replaces each `processComposedOfChildrenOf` placeholder with explicit
/// `processComposedOf` edges to the direct children of the source process.
///
/// Children are read before any placeholder is expanded, so edges added by
/// one expansion are never picked up by another: `A children-of B` and
/// `B children-of C` give `A` only the children `B` declared explicitly.
///
/// Returns the number of placeholders removed.
pub fn expand_composed_of_children(graph: &mut Graph, diagnostics: &mut Diagnostics) -> usize {
    let composed_of = Term::iri(iris::PROBS_PROCESS_COMPOSED_OF);
    let placeholder = Term::iri(iris::PROBS_PROCESS_COMPOSED_OF_CHILDREN_OF);

    let requests: Vec<Triple> = graph
        .matching(None, Some(&placeholder), None)
        .into_iter()
        .cloned()
        .collect();

    let mut children: BTreeMap<Term, Vec<Term>> = BTreeMap::new();
    for request in &requests {
        children.entry(request.object.clone()).or_insert_with(|| {
            graph
                .objects(&request.object, &composed_of)
                .cloned()
                .collect()
        });
    }

    for request in &requests {
        let (process, source) = (&request.subject, &request.object);
        let is_process = source
            .as_iri()
            .is_some_and(|uri| graph.has_type(uri, iris::PROBS_PROCESS));
        if !is_process {
            diagnostics.error(
                DiagnosticKind::MissingCompositionSource,
                None,
                format!(
                    "Requested child \"{}\" of \"{}\" is not a Process",
                    display(source),
                    display(process)
                ),
            );
        }
        for child in children.get(source).into_iter().flatten() {
            graph.insert(Triple::new(
                process.clone(),
                composed_of.clone(),
                child.clone(),
            ));
        }
        graph.remove(request);
    }

    requests.len()
}

fn display(term: &Term) -> String {
    match term {
        Term::Iri(iri) => iri.clone(),
        other => other.to_string(),
    }
}
