//! Quantified recipes attached to processes.

use crate::model::{iris, Graph, Term, Triple};

/// One quantified input or output of a recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeItem {
    /// URI of the consumed or produced object.
    pub object: String,
    /// Amount in the metric's base unit.
    pub quantity: f64,
    /// Full IRI of the quantity kind.
    pub metric: String,
}

/// The quantified items of a process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recipe {
    /// Items consumed, in declaration order.
    pub consumes: Vec<RecipeItem>,
    /// Items produced, in declaration order.
    pub produces: Vec<RecipeItem>,
}

impl Recipe {
    /// True when the recipe has no items (and so is not emitted).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.consumes.is_empty() && self.produces.is_empty()
    }

    /// URI of the recipe node of a process.
    #[must_use]
    pub fn uri_for(process: &str) -> String {
        format!("{process}-recipe")
    }

    /// Triples describing this recipe as the recipe of `process`.
    #[must_use]
    pub fn to_triples(&self, process: &str) -> Vec<Triple> {
        if self.is_empty() {
            return Vec::new();
        }
        let recipe = Self::uri_for(process);
        let mut triples = vec![
            Triple::iris(process, iris::RECIPE_HAS_RECIPE, &recipe),
            Triple::iris(&recipe, iris::RDF_TYPE, iris::RECIPE_RECIPE),
        ];
        for (predicate, tag, items) in [
            (iris::RECIPE_CONSUMES, "in", &self.consumes),
            (iris::RECIPE_PRODUCES, "out", &self.produces),
        ] {
            for (n, item) in items.iter().enumerate() {
                let node = format!("{recipe}-{tag}-{n}");
                triples.push(Triple::iris(&recipe, predicate, &node));
                triples.push(Triple::iris(&node, iris::RDF_TYPE, iris::RECIPE_ITEM));
                triples.push(Triple::iris(&node, iris::RECIPE_OBJECT, &item.object));
                triples.push(Triple::new(
                    Term::iri(node.as_str()),
                    Term::iri(iris::RECIPE_QUANTITY),
                    Term::double(item.quantity),
                ));
                triples.push(Triple::iris(&node, iris::RECIPE_METRIC, &item.metric));
            }
        }
        triples
    }

    /// Reads back the recipe of `process` from a graph.
    ///
    /// Items are returned sorted by object URI since the graph does not keep
    /// declaration order. Items missing an object, quantity or metric are
    /// skipped.
    #[must_use]
    pub fn from_graph(graph: &Graph, process: &str) -> Option<Recipe> {
        let recipe = graph.value(&Term::iri(process), &Term::iri(iris::RECIPE_HAS_RECIPE))?;
        let read = |predicate: &str| -> Vec<RecipeItem> {
            let predicate = Term::iri(predicate);
            let mut items: Vec<RecipeItem> = graph
                .objects(recipe, &predicate)
                .filter_map(|node| read_item(graph, node))
                .collect();
            items.sort_by(|a, b| a.object.cmp(&b.object));
            items
        };
        Some(Recipe {
            consumes: read(iris::RECIPE_CONSUMES),
            produces: read(iris::RECIPE_PRODUCES),
        })
    }
}

fn read_item(graph: &Graph, node: &Term) -> Option<RecipeItem> {
    let object = graph
        .value(node, &Term::iri(iris::RECIPE_OBJECT))?
        .as_iri()?
        .to_string();
    let quantity = graph
        .value(node, &Term::iri(iris::RECIPE_QUANTITY))?
        .as_literal()?
        .value
        .parse()
        .ok()?;
    let metric = graph
        .value(node, &Term::iri(iris::RECIPE_METRIC))?
        .as_iri()?
        .to_string();
    Some(RecipeItem {
        object,
        quantity,
        metric,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(object: &str, quantity: f64) -> RecipeItem {
        RecipeItem {
            object: object.into(),
            quantity,
            metric: iris::QK_MASS.into(),
        }
    }

    #[test]
    fn empty_recipe_emits_nothing() {
        assert!(Recipe::default().to_triples("http://ex.org/P").is_empty());
    }

    #[test]
    fn triples_read_back() {
        let recipe = Recipe {
            consumes: vec![item("http://ex.org/B", 2.0), item("http://ex.org/A", 0.5)],
            produces: vec![item("http://ex.org/C", 1.0)],
        };
        let graph: Graph = recipe.to_triples("http://ex.org/P").into_iter().collect();
        assert!(graph.has_type("http://ex.org/P-recipe", iris::RECIPE_RECIPE));
        assert!(graph.has_type("http://ex.org/P-recipe-in-1", iris::RECIPE_ITEM));

        let back = Recipe::from_graph(&graph, "http://ex.org/P").unwrap();
        assert_eq!(
            back.consumes,
            vec![item("http://ex.org/A", 0.5), item("http://ex.org/B", 2.0)]
        );
        assert_eq!(back.produces, recipe.produces);
        assert!(Recipe::from_graph(&graph, "http://ex.org/Other").is_none());
    }
}
