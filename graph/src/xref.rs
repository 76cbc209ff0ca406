//! Cross-reference index: every declared process and object, looked up by
//! URI or by short name, plus the alphabetical domain indices.

use std::collections::BTreeMap;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{iris, local_name, Graph, Kind, Term, Thing};
use crate::resolver::Namespaces;
use crate::store::PrefixBindings;

/// Registry of declared things.
///
/// Every registration is kept, in order. The first registration of a URI is
/// the authoritative one returned by lookups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XrefIndex {
    things: Vec<Thing>,
    first: BTreeMap<String, usize>,
}

impl XrefIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a declaration.
    ///
    /// Returns false, and records a duplicate-declaration warning, when the
    /// URI was already registered.
    pub fn register(&mut self, thing: Thing, diagnostics: &mut Diagnostics) -> bool {
        if let Some(&earlier) = self.first.get(&thing.uri) {
            let earlier = &self.things[earlier];
            diagnostics.warn(
                DiagnosticKind::DuplicateDeclaration,
                Some(thing.document.as_str()),
                format!(
                    "{} \"{}\" is already declared in {}",
                    thing.kind.as_str(),
                    thing.uri,
                    earlier.document
                ),
            );
            self.things.push(thing);
            return false;
        }
        self.first.insert(thing.uri.clone(), self.things.len());
        self.things.push(thing);
        true
    }

    /// The authoritative entry for a URI.
    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&Thing> {
        self.first.get(uri).map(|&i| &self.things[i])
    }

    /// Authoritative entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Thing> {
        self.things
            .iter()
            .enumerate()
            .filter(|(i, t)| self.first.get(&t.uri) == Some(i))
            .map(|(_, t)| t)
    }

    /// Every registration, duplicates included.
    #[must_use]
    pub fn registrations(&self) -> &[Thing] {
        &self.things
    }

    /// Number of distinct URIs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.first.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first.is_empty()
    }

    /// Candidate targets for a reference.
    ///
    /// An exact URI match wins; otherwise every thing whose URI ends in
    /// `target` as its last segment, in registration order.
    #[must_use]
    pub fn find(&self, target: &str, kind: Option<Kind>) -> Vec<&Thing> {
        let wanted = |t: &&Thing| kind.map_or(true, |k| t.kind == k);
        if let Some(thing) = self.get(target).filter(wanted) {
            return vec![thing];
        }
        self.iter()
            .filter(|t| local_name(&t.uri) == target)
            .filter(wanted)
            .collect()
    }

    /// Resolves a reference written in `document`, reporting misses and
    /// ambiguities. An ambiguous reference resolves to its first match.
    pub fn resolve(
        &self,
        target: &str,
        kind: Option<Kind>,
        document: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<&Thing> {
        let matches = self.find(target, kind);
        match matches.as_slice() {
            [] => {
                diagnostics.warn(
                    DiagnosticKind::UnresolvedReference,
                    Some(document),
                    format!("reference \"{target}\" does not match any declaration"),
                );
                None
            }
            [only] => Some(only),
            [first, ..] => {
                let uris: Vec<&str> = matches.iter().map(|t| t.uri.as_str()).collect();
                diagnostics.warn(
                    DiagnosticKind::AmbiguousReference,
                    Some(document),
                    format!(
                        "reference \"{target}\" is ambiguous ({}); using {}",
                        uris.join(", "),
                        first.uri
                    ),
                );
                Some(first)
            }
        }
    }

    /// Forgets every registration made by `document`.
    pub fn clear_document(&mut self, document: &str) {
        self.things.retain(|t| t.document != document);
        self.reindex();
    }

    /// Registers every entry of `other`.
    ///
    /// Only clashes with entries already in `self` are reported. Duplicates
    /// within `other` were reported when `other` was built and are carried
    /// over silently.
    pub fn merge(&mut self, other: &XrefIndex, diagnostics: &mut Diagnostics) {
        for (i, thing) in other.things.iter().enumerate() {
            if other.first.get(&thing.uri) == Some(&i) {
                self.register(thing.clone(), diagnostics);
            } else {
                self.first.entry(thing.uri.clone()).or_insert(self.things.len());
                self.things.push(thing.clone());
            }
        }
    }

    fn reindex(&mut self) {
        self.first.clear();
        for (i, thing) in self.things.iter().enumerate() {
            self.first.entry(thing.uri.clone()).or_insert(i);
        }
    }

    /// Processes grouped by the lowercase first letter of their label.
    #[must_use]
    pub fn process_index(&self) -> BTreeMap<char, Vec<&Thing>> {
        let mut index: BTreeMap<char, Vec<&Thing>> = BTreeMap::new();
        for thing in self.iter().filter(|t| t.kind == Kind::Process) {
            index.entry(index_key(&thing.label)).or_default().push(thing);
        }
        for entries in index.values_mut() {
            entries.sort_by(|a, b| a.label.cmp(&b.label));
        }
        index
    }

    /// Objects grouped by the lowercase first letter of their label, each
    /// with the declared processes that consume or produce it.
    #[must_use]
    pub fn object_index<'a>(&'a self, graph: &Graph) -> BTreeMap<char, Vec<ObjectEntry<'a>>> {
        let mut index: BTreeMap<char, Vec<ObjectEntry<'a>>> = BTreeMap::new();
        for thing in self.iter().filter(|t| t.kind == Kind::Object) {
            let object = Term::iri(thing.uri.as_str());
            let users = |predicate: &str| -> Vec<&'a Thing> {
                let mut found: Vec<&'a Thing> = graph
                    .subjects(&Term::iri(predicate), &object)
                    .filter_map(Term::as_iri)
                    .filter_map(|uri| self.get(uri))
                    .filter(|t| t.kind == Kind::Process)
                    .collect();
                found.sort_by(|a, b| a.label.cmp(&b.label));
                found
            };
            let entry = ObjectEntry {
                thing,
                consumed_by: users(iris::PROBS_CONSUMES),
                produced_by: users(iris::PROBS_PRODUCES),
            };
            index.entry(index_key(&thing.label)).or_default().push(entry);
        }
        for entries in index.values_mut() {
            entries.sort_by(|a, b| a.thing.label.cmp(&b.thing.label));
        }
        index
    }

    /// Warns about consumed or produced objects that are never declared.
    ///
    /// An object counts as declared if it is typed `probs:Object` anywhere
    /// in the graph, which includes preloaded data and `noindex` objects.
    pub fn check_undefined_objects(&self, graph: &Graph, diagnostics: &mut Diagnostics) {
        for (predicate, verb) in [
            (iris::PROBS_CONSUMES, "consumed"),
            (iris::PROBS_PRODUCES, "produced"),
        ] {
            for triple in graph.matching(None, Some(&Term::iri(predicate)), None) {
                let (Some(process), Some(object)) =
                    (triple.subject.as_iri(), triple.object.as_iri())
                else {
                    continue;
                };
                if graph.has_type(object, iris::PROBS_OBJECT) {
                    continue;
                }
                let document = self.get(process).map(|t| t.document.as_str());
                diagnostics.warn(
                    DiagnosticKind::UndefinedObject,
                    document,
                    format!("object {object} {verb} by process {process} is not defined"),
                );
            }
        }
    }

    /// Resolves the target of an inline RDF reference.
    ///
    /// `raw` is a CURIE or `<iri>`. The display text is the abbreviated URI;
    /// when the URI is not a declared thing it is prefixed with
    /// `[UNKNOWN!]`.
    #[must_use]
    pub fn resolve_inline_reference(
        &self,
        raw: &str,
        namespaces: &Namespaces,
        graph: &Graph,
        bindings: &PrefixBindings,
    ) -> InlineReference {
        let Ok(uri) = namespaces.resolve(raw, None) else {
            return InlineReference::Unknown {
                uri: None,
                display: format!("[UNKNOWN!] {}", raw.trim()),
                labels: Vec::new(),
            };
        };
        let curie = bindings.curie(&uri);
        let labels = preferred_labels(graph, &uri);
        match self.get(&uri) {
            Some(thing) => InlineReference::Resolved {
                document: thing.document.clone(),
                anchor: thing.anchor.clone(),
                uri,
                display: curie,
                labels,
            },
            None => InlineReference::Unknown {
                uri: Some(uri),
                display: format!("[UNKNOWN!] {curie}"),
                labels,
            },
        }
    }
}

fn index_key(label: &str) -> char {
    label
        .chars()
        .next()
        .map_or('_', |c| c.to_lowercase().next().unwrap_or(c))
}

/// One row of the object index.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEntry<'a> {
    /// The object.
    pub thing: &'a Thing,
    /// Declared processes consuming it.
    pub consumed_by: Vec<&'a Thing>,
    /// Declared processes producing it.
    pub produced_by: Vec<&'a Thing>,
}

/// Outcome of resolving an inline RDF reference.
#[derive(Debug, Clone, PartialEq)]
pub enum InlineReference {
    /// The URI is a declared thing.
    Resolved {
        /// Full URI.
        uri: String,
        /// Document declaring it.
        document: String,
        /// Anchor within that document.
        anchor: String,
        /// Abbreviated URI.
        display: String,
        /// Preferred labels from the graph.
        labels: Vec<String>,
    },
    /// Nothing declared under that URI, or the reference did not resolve.
    Unknown {
        /// Full URI, if the reference resolved to one.
        uri: Option<String>,
        /// `[UNKNOWN!] ` followed by the abbreviated URI.
        display: String,
        /// Preferred labels from the graph.
        labels: Vec<String>,
    },
}

/// The `skos:prefLabel` values of a node, or its `rdfs:label` values if it
/// has none.
#[must_use]
pub fn preferred_labels(graph: &Graph, uri: &str) -> Vec<String> {
    let subject = Term::iri(uri);
    for property in [iris::SKOS_PREF_LABEL, iris::RDFS_LABEL] {
        let labels: Vec<String> = graph
            .objects(&subject, &Term::iri(property))
            .filter_map(Term::as_literal)
            .map(|lit| lit.value.clone())
            .collect();
        if !labels.is_empty() {
            return labels;
        }
    }
    Vec::new()
}
