//! The semantic store: one graph context per source document.
//!
//! Each document's triples live only in its own context, so a document can
//! be cleared and rebuilt without touching anyone else's data, and partial
//! stores produced independently (for example on worker threads) can be
//! merged back by replacing whole contexts.

use std::collections::BTreeMap;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{Graph, Triple};
use crate::resolver::Namespaces;
use crate::serializer::turtle;

/// What happened when a prefix was bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// A new prefix was added.
    Added,
    /// The same prefix was already bound to the same namespace.
    Identical,
    /// The namespace is already bound under another prefix, which is kept.
    Existing(String),
    /// The prefix was taken by a different namespace; this one was bound
    /// under the returned alias instead.
    Renamed(String),
}

/// Prefix bindings used to abbreviate IRIs in serialized output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixBindings {
    bindings: BTreeMap<String, String>,
}

impl PrefixBindings {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds every prefix of a namespace table.
    #[must_use]
    pub fn from_namespaces(namespaces: &Namespaces) -> Self {
        let mut bindings = Self::new();
        for (prefix, iri) in namespaces.iter() {
            bindings.bind(prefix, iri);
        }
        bindings
    }

    /// Binds `prefix` to `namespace`.
    ///
    /// Identical bindings collapse; a namespace keeps its first prefix; a
    /// prefix already used for a different namespace gets a numbered alias.
    pub fn bind(&mut self, prefix: &str, namespace: &str) -> BindOutcome {
        match self.bindings.get(prefix) {
            Some(existing) if existing == namespace => return BindOutcome::Identical,
            _ => {}
        }
        if let Some((other, _)) = self.bindings.iter().find(|(_, ns)| *ns == namespace) {
            return BindOutcome::Existing(other.clone());
        }
        if !self.bindings.contains_key(prefix) {
            self.bindings
                .insert(prefix.to_string(), namespace.to_string());
            return BindOutcome::Added;
        }
        let alias = (1..)
            .map(|n| format!("{prefix}{n}"))
            .find(|candidate| !self.bindings.contains_key(candidate))
            .unwrap_or_else(|| format!("{prefix}_"));
        self.bindings.insert(alias.clone(), namespace.to_string());
        BindOutcome::Renamed(alias)
    }

    /// Binds a prefix, reporting a renamed binding as a conflict.
    pub fn bind_reporting(
        &mut self,
        prefix: &str,
        namespace: &str,
        document: Option<&str>,
        diagnostics: &mut Diagnostics,
    ) -> BindOutcome {
        let outcome = self.bind(prefix, namespace);
        if let BindOutcome::Renamed(alias) = &outcome {
            diagnostics.warn(
                DiagnosticKind::PrefixConflict,
                document,
                format!(
                    "prefix \"{prefix}\" is already bound to a different namespace; \
                     <{namespace}> bound as \"{alias}\""
                ),
            );
        }
        outcome
    }

    /// Copies every binding of `other` into this table.
    pub fn merge(&mut self, other: &PrefixBindings, diagnostics: &mut Diagnostics) {
        for (prefix, namespace) in &other.bindings {
            self.bind_reporting(prefix, namespace, None, diagnostics);
        }
    }

    /// Looks up a prefix.
    #[must_use]
    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// Iterates over `(prefix, namespace)` pairs in prefix order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }

    /// Splits a URI into `(prefix, local)` using the longest bound namespace.
    #[must_use]
    pub fn split<'a>(&'a self, uri: &'a str) -> Option<(&'a str, &'a str)> {
        self.bindings
            .iter()
            .filter(|(_, ns)| !ns.is_empty() && uri.starts_with(ns.as_str()))
            .max_by_key(|(_, ns)| ns.len())
            .map(|(prefix, ns)| (prefix.as_str(), &uri[ns.len()..]))
    }

    /// Formats a URI as `prefix:local` when possible, otherwise `<uri>`.
    #[must_use]
    pub fn curie(&self, uri: &str) -> String {
        match self.split(uri) {
            Some((prefix, local)) if turtle::is_local_name(local) => format!("{prefix}:{local}"),
            _ => format!("<{uri}>"),
        }
    }
}

/// Per-document partitioned triple store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    contexts: BTreeMap<String, Graph>,
    bindings: PrefixBindings,
}

impl Store {
    /// Creates an empty store with no prefix bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with the given prefix bindings.
    #[must_use]
    pub fn with_bindings(bindings: PrefixBindings) -> Self {
        Self {
            contexts: BTreeMap::new(),
            bindings,
        }
    }

    /// The document's context, created empty on first use.
    pub fn context_mut(&mut self, document: &str) -> &mut Graph {
        self.contexts.entry(document.to_string()).or_default()
    }

    /// The document's context, if it has one.
    #[must_use]
    pub fn context(&self, document: &str) -> Option<&Graph> {
        self.contexts.get(document)
    }

    /// Adds a triple to a document's context.
    pub fn add(&mut self, document: &str, triple: Triple) -> bool {
        self.context_mut(document).insert(triple)
    }

    /// Removes a document's context entirely. Returns how many triples it held.
    pub fn clear(&mut self, document: &str) -> usize {
        self.contexts.remove(document).map_or(0, |g| g.len())
    }

    /// Replaces the contexts of the listed documents with those from `other`.
    ///
    /// Documents not listed, or listed but absent from `other`, are left
    /// alone. Merging the same document twice gives the same result as once.
    pub fn merge(&mut self, other: &Store, only: &[&str], diagnostics: &mut Diagnostics) {
        for document in only {
            if let Some(graph) = other.contexts.get(*document) {
                self.contexts.insert((*document).to_string(), graph.clone());
            }
        }
        self.bindings.merge(&other.bindings, diagnostics);
    }

    /// Replaces every context present in `other`.
    pub fn merge_all(&mut self, other: &Store, diagnostics: &mut Diagnostics) {
        let documents: Vec<&str> = other.documents().collect();
        self.merge(other, &documents, diagnostics);
    }

    /// Document identifiers with a context, in order.
    pub fn documents(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(String::as_str)
    }

    /// The union of all contexts.
    #[must_use]
    pub fn merged(&self) -> Graph {
        let mut graph = Graph::new();
        for context in self.contexts.values() {
            graph.extend_from(context);
        }
        graph
    }

    /// Total number of triples over all contexts (duplicates counted per context).
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.values().map(Graph::len).sum()
    }

    /// True when no context holds any triple.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.values().all(Graph::is_empty)
    }

    /// Prefix bindings.
    #[must_use]
    pub fn bindings(&self) -> &PrefixBindings {
        &self.bindings
    }

    /// Mutable prefix bindings.
    pub fn bindings_mut(&mut self) -> &mut PrefixBindings {
        &mut self.bindings
    }

    /// Serializes the merged graph as Turtle.
    #[must_use]
    pub fn serialize(&self) -> String {
        turtle::to_turtle(&self.merged(), &self.bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::iris;

    fn triple(s: &str) -> Triple {
        Triple::iris(&format!("http://ex.org/{s}"), iris::RDF_TYPE, iris::PROBS_PROCESS)
    }

    #[test]
    fn contexts_are_created_lazily() {
        let mut store = Store::new();
        assert!(store.context("a").is_none());
        store.add("a", triple("P1"));
        assert_eq!(store.context("a").map(Graph::len), Some(1));
    }

    #[test]
    fn clear_removes_only_one_document() {
        let mut store = Store::new();
        store.add("a", triple("P1"));
        store.add("b", triple("P2"));
        let before = store.context("b").cloned();
        assert_eq!(store.clear("a"), 1);
        assert!(store.context("a").is_none());
        assert_eq!(store.context("b").cloned(), before);
        assert_eq!(store.clear("missing"), 0);
    }

    #[test]
    fn merge_replaces_listed_documents_only() {
        let mut global = Store::new();
        global.add("a", triple("Old"));
        global.add("c", triple("Keep"));

        let mut partial = Store::new();
        partial.add("a", triple("New"));
        partial.add("b", triple("Ignored"));

        let mut diags = Diagnostics::new();
        global.merge(&partial, &["a"], &mut diags);
        global.merge(&partial, &["a"], &mut diags);

        let a = global.context("a").unwrap();
        assert_eq!(a.len(), 1);
        assert!(a.contains(&triple("New")));
        assert!(global.context("b").is_none());
        assert!(global.context("c").unwrap().contains(&triple("Keep")));
    }

    #[test]
    fn prefix_binding_rules() {
        let mut bindings = PrefixBindings::new();
        assert_eq!(bindings.bind("ex", "http://ex.org/"), BindOutcome::Added);
        assert_eq!(bindings.bind("ex", "http://ex.org/"), BindOutcome::Identical);
        assert_eq!(
            bindings.bind("other", "http://ex.org/"),
            BindOutcome::Existing("ex".into())
        );
        assert_eq!(
            bindings.bind("ex", "http://different.org/"),
            BindOutcome::Renamed("ex1".into())
        );
        assert_eq!(bindings.get("ex1"), Some("http://different.org/"));
    }

    #[test]
    fn renamed_binding_is_reported() {
        let mut bindings = PrefixBindings::new();
        let mut diags = Diagnostics::new();
        bindings.bind("ex", "http://ex.org/");
        bindings.bind_reporting("ex", "http://different.org/", Some("doc"), &mut diags);
        assert_eq!(diags.of_kind(DiagnosticKind::PrefixConflict).count(), 1);
    }

    #[test]
    fn curie_falls_back_to_full_iri() {
        let mut bindings = PrefixBindings::new();
        bindings.bind("sys", "http://ex.org/system/");
        assert_eq!(bindings.curie("http://ex.org/system/P1"), "sys:P1");
        assert_eq!(
            bindings.curie("http://ex.org/system/a/b"),
            "<http://ex.org/system/a/b>"
        );
        assert_eq!(bindings.curie("http://nope/x"), "<http://nope/x>");
    }
}
