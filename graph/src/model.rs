//! Core graph model types.
//!
//! Terms and triples are plain owned data ordered by their textual form, so
//! a [`Graph`] (an ordered set of triples) always iterates and serializes in
//! the same order regardless of insertion order.

use std::collections::BTreeSet;
use std::fmt;

/// An RDF literal.
///
/// A `datatype` of `None` is a simple `xsd:string` literal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    /// Lexical form.
    pub value: String,
    /// Full IRI of the datatype, or `None` for `xsd:string`.
    pub datatype: Option<String>,
    /// Language tag (mutually exclusive with `datatype`).
    pub language: Option<String>,
}

/// A node or value in a triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    /// An absolute IRI.
    Iri(String),
    /// A blank node label (only produced by parsed graph data).
    Blank(String),
    /// A literal value.
    Literal(Literal),
}

impl Term {
    /// Creates an IRI term.
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    /// Creates a simple string literal.
    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(Literal {
            value: value.into(),
            datatype: None,
            language: None,
        })
    }

    /// Creates a typed literal. `xsd:string` is normalised to a simple literal.
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        Term::Literal(Literal {
            value: value.into(),
            datatype: (datatype != iris::XSD_STRING).then_some(datatype),
            language: None,
        })
    }

    /// Creates a language-tagged literal.
    pub fn lang(value: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal(Literal {
            value: value.into(),
            datatype: None,
            language: Some(language.into()),
        })
    }

    /// Creates an `xsd:double` literal.
    #[must_use]
    pub fn double(value: f64) -> Self {
        Term::typed(format!("{value}"), iris::XSD_DOUBLE)
    }

    /// Creates a blank node.
    pub fn blank(label: impl Into<String>) -> Self {
        Term::Blank(label.into())
    }

    /// Returns the IRI if this is an IRI term.
    #[must_use]
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Returns the literal if this is a literal term.
    #[must_use]
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    /// Formats the term in N-Triples syntax.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::Blank(label) => write!(f, "_:{label}"),
            Term::Literal(lit) => {
                write!(f, "\"{}\"", escape_literal(&lit.value))?;
                if let Some(lang) = &lit.language {
                    write!(f, "@{lang}")
                } else if let Some(dt) = &lit.datatype {
                    write!(f, "^^<{dt}>")
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Escapes a literal's lexical form for a double-quoted Turtle/N-Triples string.
#[must_use]
pub fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// A subject-predicate-object statement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    /// Subject.
    pub subject: Term,
    /// Predicate (always an IRI).
    pub predicate: Term,
    /// Object.
    pub object: Term,
}

impl Triple {
    /// Creates a triple from three terms.
    #[must_use]
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Creates a triple whose three positions are all IRIs.
    pub fn iris(subject: &str, predicate: &str, object: &str) -> Self {
        Self::new(Term::iri(subject), Term::iri(predicate), Term::iri(object))
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// An ordered set of triples.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    triples: BTreeSet<Triple>,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a triple. Returns false if it was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    /// Removes a triple. Returns false if it was not present.
    pub fn remove(&mut self, triple: &Triple) -> bool {
        self.triples.remove(triple)
    }

    /// Returns true if the triple is present.
    #[must_use]
    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Number of triples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// True when there are no triples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Iterates over all triples in order.
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Adds every triple of `other`.
    pub fn extend_from(&mut self, other: &Graph) {
        self.triples.extend(other.triples.iter().cloned());
    }

    /// Returns the triples matching a pattern; `None` is a wildcard.
    #[must_use]
    pub fn matching(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
    ) -> Vec<&Triple> {
        self.triples
            .iter()
            .filter(|t| subject.map_or(true, |s| &t.subject == s))
            .filter(|t| predicate.map_or(true, |p| &t.predicate == p))
            .filter(|t| object.map_or(true, |o| &t.object == o))
            .collect()
    }

    /// Objects of every triple with the given subject and predicate.
    pub fn objects<'s: 'a, 'a>(
        &'s self,
        subject: &'a Term,
        predicate: &'a Term,
    ) -> impl Iterator<Item = &'s Term> + 'a {
        self.triples
            .iter()
            .filter(move |t| &t.subject == subject && &t.predicate == predicate)
            .map(|t| &t.object)
    }

    /// Subjects of every triple with the given predicate and object.
    pub fn subjects<'a>(
        &'a self,
        predicate: &'a Term,
        object: &'a Term,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.triples
            .iter()
            .filter(move |t| &t.predicate == predicate && &t.object == object)
            .map(|t| &t.subject)
    }

    /// The first object for a subject and predicate, if any.
    #[must_use]
    pub fn value(&self, subject: &Term, predicate: &Term) -> Option<&Term> {
        self.objects(subject, predicate).next()
    }

    /// True when `subject rdf:type class` is in the graph.
    #[must_use]
    pub fn has_type(&self, subject: &str, class: &str) -> bool {
        self.contains(&Triple::iris(subject, iris::RDF_TYPE, class))
    }
}

impl FromIterator<Triple> for Graph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self {
            triples: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Graph {
    type Item = &'a Triple;
    type IntoIter = std::collections::btree_set::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.iter()
    }
}

/// Whether a declared thing is a process or an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    /// A transformation consuming and producing objects.
    Process,
    /// A material, product or other thing flowing between processes.
    Object,
}

impl Kind {
    /// Returns the lowercase name used in anchors and messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Process => "process",
            Kind::Object => "object",
        }
    }

    /// Returns the ontology class for this kind.
    #[must_use]
    pub fn class_iri(self) -> &'static str {
        match self {
            Kind::Process => iris::PROBS_PROCESS,
            Kind::Object => iris::PROBS_OBJECT,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Process => "Process",
            Kind::Object => "Object",
        })
    }
}

/// A declared process or object, as recorded in the cross-reference index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thing {
    /// Full URI (identity).
    pub uri: String,
    /// Process or object.
    pub kind: Kind,
    /// Display label.
    pub label: String,
    /// Document that declared it.
    pub document: String,
    /// Anchor id used for back-links within the document.
    pub anchor: String,
}

/// Returns the trailing segment of a URI: everything after the last `/`, `#` or `:`.
#[must_use]
pub fn local_name(uri: &str) -> &str {
    uri.rsplit(['/', '#', ':']).next().unwrap_or(uri)
}

/// Standard IRI constants.
pub mod iris {
    /// RDF namespace.
    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    /// RDFS namespace.
    pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    /// XSD namespace.
    pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
    /// SKOS namespace.
    pub const SKOS: &str = "http://www.w3.org/2004/02/skos/core#";
    /// PRObs ontology namespace.
    pub const PROBS: &str = "https://ukfires.org/probs/ontology/";
    /// PRObs recipe namespace.
    pub const PROBS_RECIPE: &str = "https://ukfires.org/probs/ontology/recipe/";
    /// QUDT quantity kinds, used as recipe metrics.
    pub const QUANTITYKIND: &str = "http://qudt.org/vocab/quantitykind/";

    /// `rdf:type`.
    pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    /// `rdfs:label`.
    pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
    /// `skos:prefLabel`.
    pub const SKOS_PREF_LABEL: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";
    /// `xsd:string`.
    pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    /// `xsd:double`.
    pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";

    /// `probs:Process`.
    pub const PROBS_PROCESS: &str = "https://ukfires.org/probs/ontology/Process";
    /// `probs:Object`.
    pub const PROBS_OBJECT: &str = "https://ukfires.org/probs/ontology/Object";
    /// `probs:ReferenceObject`.
    pub const PROBS_REFERENCE_OBJECT: &str = "https://ukfires.org/probs/ontology/ReferenceObject";
    /// `probs:MarketProcess`.
    pub const PROBS_MARKET_PROCESS: &str = "https://ukfires.org/probs/ontology/MarketProcess";
    /// `probs:TradedObject`.
    pub const PROBS_TRADED_OBJECT: &str = "https://ukfires.org/probs/ontology/TradedObject";
    /// `probs:processComposedOf`.
    pub const PROBS_PROCESS_COMPOSED_OF: &str =
        "https://ukfires.org/probs/ontology/processComposedOf";
    /// `probs:processComposedOfChildrenOf`.
    pub const PROBS_PROCESS_COMPOSED_OF_CHILDREN_OF: &str =
        "https://ukfires.org/probs/ontology/processComposedOfChildrenOf";
    /// `probs:objectComposedOf`.
    pub const PROBS_OBJECT_COMPOSED_OF: &str =
        "https://ukfires.org/probs/ontology/objectComposedOf";
    /// `probs:objectEquivalentTo`.
    pub const PROBS_OBJECT_EQUIVALENT_TO: &str =
        "https://ukfires.org/probs/ontology/objectEquivalentTo";
    /// `probs:marketForObject`.
    pub const PROBS_MARKET_FOR_OBJECT: &str = "https://ukfires.org/probs/ontology/marketForObject";
    /// `probs:consumes`.
    pub const PROBS_CONSUMES: &str = "https://ukfires.org/probs/ontology/consumes";
    /// `probs:produces`.
    pub const PROBS_PRODUCES: &str = "https://ukfires.org/probs/ontology/produces";

    /// `recipe:hasRecipe`.
    pub const RECIPE_HAS_RECIPE: &str = "https://ukfires.org/probs/ontology/recipe/hasRecipe";
    /// `recipe:Recipe`.
    pub const RECIPE_RECIPE: &str = "https://ukfires.org/probs/ontology/recipe/Recipe";
    /// `recipe:RecipeItem`.
    pub const RECIPE_ITEM: &str = "https://ukfires.org/probs/ontology/recipe/RecipeItem";
    /// `recipe:consumes`.
    pub const RECIPE_CONSUMES: &str = "https://ukfires.org/probs/ontology/recipe/consumes";
    /// `recipe:produces`.
    pub const RECIPE_PRODUCES: &str = "https://ukfires.org/probs/ontology/recipe/produces";
    /// `recipe:object`.
    pub const RECIPE_OBJECT: &str = "https://ukfires.org/probs/ontology/recipe/object";
    /// `recipe:quantity`.
    pub const RECIPE_QUANTITY: &str = "https://ukfires.org/probs/ontology/recipe/quantity";
    /// `recipe:metric`.
    pub const RECIPE_METRIC: &str = "https://ukfires.org/probs/ontology/recipe/metric";

    /// `quantitykind:Mass`.
    pub const QK_MASS: &str = "http://qudt.org/vocab/quantitykind/Mass";
    /// `quantitykind:Length`.
    pub const QK_LENGTH: &str = "http://qudt.org/vocab/quantitykind/Length";
    /// `quantitykind:Area`.
    pub const QK_AREA: &str = "http://qudt.org/vocab/quantitykind/Area";
    /// `quantitykind:Volume`.
    pub const QK_VOLUME: &str = "http://qudt.org/vocab/quantitykind/Volume";
    /// `quantitykind:Dimensionless`.
    pub const QK_DIMENSIONLESS: &str = "http://qudt.org/vocab/quantitykind/Dimensionless";
}
