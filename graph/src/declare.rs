//! Turns process and object declarations into triples.
//!
//! A [`DocumentBuild`] is the whole mutable state of one document: its own
//! partial [`Store`] and [`XrefIndex`], the diagnostics it raised and the
//! two nesting stacks. Nothing is shared between documents except the
//! read-only [`Settings`], so documents can be built on separate threads
//! and merged afterwards.

use std::collections::BTreeSet;

use crate::config::Settings;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::Result;
use crate::items::{self, Amount, Item};
use crate::model::{iris, local_name, Kind, Term, Thing, Triple};
use crate::parser;
use crate::recipe::{Recipe, RecipeItem};
use crate::store::{PrefixBindings, Store};
use crate::units::Unit;
use crate::xref::XrefIndex;

/// Options of a process declaration. Absent options are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Display label; defaults to the name as written.
    pub label: Option<String>,
    /// Make this process the implicit parent of following declarations.
    pub become_parent: bool,
    /// Consumed items.
    pub consumes: Option<String>,
    /// Produced items.
    pub produces: Option<String>,
    /// Child processes; `*Name` adopts the children of `Name`.
    pub composed_of: Option<String>,
    /// `name = expression` statements used by item amounts.
    pub defs: Option<String>,
    /// Explicit parent, overriding the nesting stack.
    pub parent: Option<String>,
    /// Leave the process out of the cross-reference index.
    pub noindex: bool,
}

/// Options of an object declaration. Absent options are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectOptions {
    /// Display label; defaults to the name as written.
    pub label: Option<String>,
    /// Make this object the implicit parent of following declarations.
    pub become_parent: bool,
    /// Explicit parent, overriding the nesting stack.
    pub parent_object: Option<String>,
    /// The object is imported.
    pub traded_import: bool,
    /// The object is exported.
    pub traded_export: bool,
    /// Objects this one is equivalent to.
    pub equivalent: Option<String>,
    /// Leave the object out of the cross-reference index.
    pub noindex: bool,
}

/// Result of a successful declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declared {
    /// Resolved URI.
    pub uri: String,
    /// Anchor id for links back to the declaration.
    pub anchor: String,
    /// Nesting depth at the time of declaration.
    pub depth: usize,
    /// Parent the declaration was attached to: the explicit option or the
    /// innermost open parent.
    pub parent: Option<String>,
    /// The recipe, for processes with quantified items.
    pub recipe: Option<Recipe>,
}

/// Result of an end-nesting call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndOutcome {
    /// The given parent was popped.
    Ended(String),
    /// The stack was already empty.
    NothingToEnd,
}

/// Everything a document build produced.
#[derive(Debug, Clone, Default)]
pub struct DocumentOutput {
    /// Document identifier.
    pub document: String,
    /// The document's triples and the prefixes it bound.
    pub store: Store,
    /// The document's declarations.
    pub index: XrefIndex,
    /// Conditions raised while building.
    pub diagnostics: Diagnostics,
}

/// Per-document build state.
#[derive(Debug)]
pub struct DocumentBuild<'s> {
    settings: &'s Settings,
    document: String,
    store: Store,
    index: XrefIndex,
    diagnostics: Diagnostics,
    process_parents: Vec<String>,
    object_parents: Vec<String>,
    anchors: BTreeSet<String>,
}

impl<'s> DocumentBuild<'s> {
    /// Starts building `document`.
    pub fn new(settings: &'s Settings, document: impl Into<String>) -> Self {
        Self {
            settings,
            document: document.into(),
            store: Store::with_bindings(PrefixBindings::from_namespaces(&settings.namespaces)),
            index: XrefIndex::new(),
            diagnostics: Diagnostics::new(),
            process_parents: Vec::new(),
            object_parents: Vec::new(),
            anchors: BTreeSet::new(),
        }
    }

    /// Document identifier.
    #[must_use]
    pub fn document(&self) -> &str {
        &self.document
    }

    /// The document's partial store so far.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The document's index so far.
    #[must_use]
    pub fn index(&self) -> &XrefIndex {
        &self.index
    }

    /// Diagnostics raised so far.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Current process nesting depth.
    #[must_use]
    pub fn process_depth(&self) -> usize {
        self.process_parents.len()
    }

    /// Current object nesting depth.
    #[must_use]
    pub fn object_depth(&self) -> usize {
        self.object_parents.len()
    }

    /// Declares a process.
    ///
    /// # Errors
    ///
    /// Unknown prefixes, empty names, malformed item lists and failing
    /// amount expressions. Nothing is emitted for a failed declaration.
    pub fn begin_process(&mut self, name: &str, options: &ProcessOptions) -> Result<Declared> {
        let stack_default = self.process_parents.last().map(|p| local_name(p).to_string());
        let uri = self.resolve(name, stack_default.as_deref())?;
        let own = local_name(&uri).to_string();
        let parent = match &options.parent {
            Some(token) => Some(self.resolve(token, stack_default.as_deref())?),
            None => self.process_parents.last().cloned(),
        };

        let mut triples = vec![Triple::iris(&uri, iris::RDF_TYPE, iris::PROBS_PROCESS)];
        triples.push(label_triple(&uri, options.label.as_deref(), name));
        if let Some(parent) = &parent {
            triples.push(Triple::iris(parent, iris::PROBS_PROCESS_COMPOSED_OF, &uri));
        }
        for token in items::parse_tokens(options.composed_of.as_deref().unwrap_or_default()) {
            match token.strip_prefix('*') {
                Some(source) => triples.push(Triple::iris(
                    &uri,
                    iris::PROBS_PROCESS_COMPOSED_OF_CHILDREN_OF,
                    &self.resolve(source, Some(own.as_str()))?,
                )),
                None => triples.push(Triple::iris(
                    &uri,
                    iris::PROBS_PROCESS_COMPOSED_OF,
                    &self.resolve(&token, Some(own.as_str()))?,
                )),
            }
        }

        let defs = options.defs.as_deref().unwrap_or_default();
        let mut recipe = Recipe::default();
        for (text, predicate, quantified) in [
            (&options.consumes, iris::PROBS_CONSUMES, &mut recipe.consumes),
            (&options.produces, iris::PROBS_PRODUCES, &mut recipe.produces),
        ] {
            let Some(text) = text else { continue };
            let parsed = items::expand_amounts(defs, items::parse_items(text)?)?;
            for item in parsed {
                let object = self.resolve(&item.object, Some(own.as_str()))?;
                triples.push(Triple::iris(&uri, predicate, &object));
                if let Some(quantity) = self.quantify(&item, object) {
                    quantified.push(quantity);
                }
            }
        }
        triples.extend(recipe.to_triples(&uri));

        let depth = self.process_parents.len();
        self.emit(triples);
        let anchor = self.claim_anchor(Kind::Process, &uri);
        if !options.noindex {
            self.register(&uri, Kind::Process, options.label.as_deref(), name, &anchor);
        }
        if options.become_parent {
            self.process_parents.push(uri.clone());
        }
        tracing::debug!(document = %self.document, %uri, depth, "declared process");

        Ok(Declared {
            uri,
            anchor,
            depth,
            parent,
            recipe: (!recipe.is_empty()).then_some(recipe),
        })
    }

    /// Pops the innermost parent process.
    pub fn end_process(&mut self) -> EndOutcome {
        self.process_parents
            .pop()
            .map_or(EndOutcome::NothingToEnd, EndOutcome::Ended)
    }

    /// Declares an object and its market process.
    ///
    /// # Errors
    ///
    /// Unknown prefixes and empty names.
    pub fn begin_object(&mut self, name: &str, options: &ObjectOptions) -> Result<Declared> {
        let stack_default = self.object_parents.last().map(|p| local_name(p).to_string());
        let uri = self.resolve(name, stack_default.as_deref())?;
        let own = local_name(&uri).to_string();
        let parent = match &options.parent_object {
            Some(token) => Some(self.resolve(token, stack_default.as_deref())?),
            None => self.object_parents.last().cloned(),
        };

        let label = label_triple(&uri, options.label.as_deref(), name);
        let mut triples = vec![
            Triple::iris(&uri, iris::RDF_TYPE, iris::PROBS_OBJECT),
            Triple::iris(&uri, iris::RDF_TYPE, iris::PROBS_REFERENCE_OBJECT),
        ];
        if let Some(parent) = &parent {
            triples.push(Triple::iris(parent, iris::PROBS_OBJECT_COMPOSED_OF, &uri));
        }
        match (options.traded_import, options.traded_export) {
            (true, true) => triples.push(Triple::iris(&uri, iris::RDF_TYPE, iris::PROBS_TRADED_OBJECT)),
            (false, false) => {}
            (import, _) => self.diagnostics.error(
                DiagnosticKind::TradedMismatch,
                Some(self.document.as_str()),
                format!(
                    "object {uri} is marked {} but not {}; traded objects need both",
                    if import { "import" } else { "export" },
                    if import { "export" } else { "import" },
                ),
            ),
        }
        for token in items::parse_tokens(options.equivalent.as_deref().unwrap_or_default()) {
            let other = self.resolve(&token, Some(own.as_str()))?;
            triples.push(Triple::iris(&uri, iris::PROBS_OBJECT_EQUIVALENT_TO, &other));
        }

        let market = format!("{uri}-market");
        triples.extend([
            Triple::iris(&market, iris::RDF_TYPE, iris::PROBS_PROCESS),
            Triple::iris(&market, iris::RDF_TYPE, iris::PROBS_MARKET_PROCESS),
            Triple::new(Term::iri(market.as_str()), label.predicate.clone(), label.object.clone()),
            Triple::iris(&market, iris::PROBS_MARKET_FOR_OBJECT, &uri),
            Triple::iris(&market, iris::PROBS_CONSUMES, &uri),
            Triple::iris(&market, iris::PROBS_PRODUCES, &uri),
        ]);
        triples.push(label);

        let depth = self.object_parents.len();
        self.emit(triples);
        let anchor = self.claim_anchor(Kind::Object, &uri);
        if !options.noindex {
            self.register(&uri, Kind::Object, options.label.as_deref(), name, &anchor);
        }
        if options.become_parent {
            self.object_parents.push(uri.clone());
        }
        tracing::debug!(document = %self.document, %uri, depth, "declared object");

        Ok(Declared {
            uri,
            anchor,
            depth,
            parent,
            recipe: None,
        })
    }

    /// Pops the innermost parent object.
    pub fn end_object(&mut self) -> EndOutcome {
        self.object_parents
            .pop()
            .map_or(EndOutcome::NothingToEnd, EndOutcome::Ended)
    }

    /// Makes `name` the implicit parent of following process declarations.
    ///
    /// # Errors
    ///
    /// Unknown prefixes and empty names.
    pub fn start_sub_processes(&mut self, name: &str) -> Result<String> {
        let default = self.process_parents.last().map(|p| local_name(p).to_string());
        let uri = self.resolve(name, default.as_deref())?;
        self.process_parents.push(uri.clone());
        Ok(uri)
    }

    /// Makes `name` the implicit parent of following object declarations.
    ///
    /// # Errors
    ///
    /// Unknown prefixes and empty names.
    pub fn start_sub_objects(&mut self, name: &str) -> Result<String> {
        let default = self.object_parents.last().map(|p| local_name(p).to_string());
        let uri = self.resolve(name, default.as_deref())?;
        self.object_parents.push(uri.clone());
        Ok(uri)
    }

    /// Parses an inline Turtle block into the document's context.
    ///
    /// The configured prefixes are available to the block. Prefixes the
    /// block declares itself are added to the output bindings. Blank nodes
    /// are local to the block. Malformed
    /// content is reported and skipped; returns whether the block was
    /// accepted.
    pub fn add_graph_data(&mut self, text: &str, line: usize) -> bool {
        let mut source = String::new();
        for (prefix, namespace) in self.settings.namespaces.iter() {
            source.push_str(&format!("@prefix {prefix}: <{namespace}> .\n"));
        }
        source.push_str(text);

        let scope = format!("{}-l{line}", self.document);
        let triples = match parser::parse_turtle_scoped(&source, &scope) {
            Ok(triples) => triples,
            Err(e) => {
                self.diagnostics.warn(
                    DiagnosticKind::MalformedGraphData,
                    Some(self.document.as_str()),
                    format!("graph data block at line {line}: {e}"),
                );
                return false;
            }
        };
        for (prefix, namespace) in parser::declared_prefixes(text) {
            self.store.bindings_mut().bind_reporting(
                &prefix,
                &namespace,
                Some(self.document.as_str()),
                &mut self.diagnostics,
            );
        }
        let count = triples.len();
        self.emit(triples);
        tracing::debug!(document = %self.document, line, count, "loaded graph data block");
        true
    }

    /// Ends the build and hands back what it produced.
    #[must_use]
    pub fn finish(self) -> DocumentOutput {
        DocumentOutput {
            document: self.document,
            store: self.store,
            index: self.index,
            diagnostics: self.diagnostics,
        }
    }

    fn resolve(&self, token: &str, contextual_default: Option<&str>) -> Result<String> {
        self.settings.namespaces.resolve(token, contextual_default)
    }

    fn emit(&mut self, triples: Vec<Triple>) {
        let context = self.store.context_mut(&self.document);
        for triple in triples {
            context.insert(triple);
        }
    }

    /// An anchor unique within the document. Things outside the system
    /// namespace are named by their compact form, and clashes left after
    /// sanitising get a `-2`, `-3`, ... suffix.
    fn claim_anchor(&mut self, kind: Kind, uri: &str) -> String {
        let namespaces = &self.settings.namespaces;
        let base = if uri.starts_with(namespaces.system()) {
            anchor_for(kind, uri)
        } else {
            let name = namespaces.compact(uri).unwrap_or_else(|| uri.to_string());
            anchor_from_name(kind, &name)
        };
        let mut anchor = base.clone();
        let mut n = 1;
        while !self.anchors.insert(anchor.clone()) {
            n += 1;
            anchor = format!("{base}-{n}");
        }
        anchor
    }

    fn register(&mut self, uri: &str, kind: Kind, label: Option<&str>, name: &str, anchor: &str) {
        let thing = Thing {
            uri: uri.to_string(),
            kind,
            label: display_label(uri, label, name),
            document: self.document.clone(),
            anchor: anchor.to_string(),
        };
        self.index.register(thing, &mut self.diagnostics);
    }

    /// Recipe entry for a quantified item; `None` when it has no amount.
    fn quantify(&mut self, item: &Item, object: String) -> Option<RecipeItem> {
        let amount = item.amount.as_ref().and_then(Amount::as_number)?;
        let unit = match &item.unit {
            None => Unit::fallback(),
            Some(symbol) => match self.settings.units.get(symbol) {
                Some(unit) => unit.clone(),
                None => {
                    self.diagnostics.warn(
                        DiagnosticKind::UnsupportedUnit,
                        Some(self.document.as_str()),
                        format!("unit \"{symbol}\" of {object} is not supported; assuming mass"),
                    );
                    Unit::fallback()
                }
            },
        };
        Some(RecipeItem {
            object,
            quantity: amount * unit.scale,
            metric: unit.metric,
        })
    }
}

fn display_label(uri: &str, label: Option<&str>, name: &str) -> String {
    match (label, name.trim()) {
        (Some(label), _) => label.to_string(),
        (None, "") => local_name(uri).to_string(),
        (None, name) => name.to_string(),
    }
}

fn label_triple(uri: &str, label: Option<&str>, name: &str) -> Triple {
    Triple::new(
        Term::iri(uri),
        Term::iri(iris::RDFS_LABEL),
        Term::literal(display_label(uri, label, name)),
    )
}

/// `process-NAME` / `object-NAME`, with anything outside `[A-Za-z0-9_-]`
/// replaced by `-`.
#[must_use]
pub fn anchor_for(kind: Kind, uri: &str) -> String {
    anchor_from_name(kind, local_name(uri))
}

fn anchor_from_name(kind: Kind, name: &str) -> String {
    let name: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
        .collect();
    format!("{}-{name}", kind.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::model::Graph;

    const SYS: &str = "http://example.org/system/";

    fn settings() -> Settings {
        let mut settings = Settings::new(SYS).unwrap();
        settings
            .namespaces
            .insert("prefix", "http://example.org/prefix/")
            .unwrap();
        settings
    }

    fn sys(local: &str) -> String {
        format!("{SYS}{local}")
    }

    fn graph(build: &DocumentBuild<'_>) -> Graph {
        build.store().merged()
    }

    #[test]
    fn process_emits_type_label_and_edges() {
        let settings = settings();
        let mut build = DocumentBuild::new(&settings, "doc");
        let options = ProcessOptions {
            label: Some("Baking".into()),
            consumes: Some("Apples Flour".into()),
            produces: Some("Crumble".into()),
            composed_of: Some("Mixing *Oven".into()),
            ..ProcessOptions::default()
        };
        let declared = build.begin_process("Bake", &options).unwrap();
        assert_eq!(declared.uri, sys("Bake"));
        assert_eq!(declared.anchor, "process-Bake");
        assert_eq!(declared.depth, 0);
        assert!(declared.recipe.is_none());

        let g = graph(&build);
        assert!(g.has_type(&sys("Bake"), iris::PROBS_PROCESS));
        assert!(g.contains(&Triple::new(
            Term::iri(sys("Bake")),
            Term::iri(iris::RDFS_LABEL),
            Term::literal("Baking"),
        )));
        for object in ["Apples", "Flour"] {
            assert!(g.contains(&Triple::iris(&sys("Bake"), iris::PROBS_CONSUMES, &sys(object))));
        }
        assert!(g.contains(&Triple::iris(&sys("Bake"), iris::PROBS_PRODUCES, &sys("Crumble"))));
        assert!(g.contains(&Triple::iris(&sys("Bake"), iris::PROBS_PROCESS_COMPOSED_OF, &sys("Mixing"))));
        assert!(g.contains(&Triple::iris(
            &sys("Bake"),
            iris::PROBS_PROCESS_COMPOSED_OF_CHILDREN_OF,
            &sys("Oven")
        )));
        assert_eq!(build.index().get(&sys("Bake")).unwrap().label, "Baking");
    }

    #[test]
    fn quantified_items_build_a_recipe() {
        let settings = settings();
        let mut build = DocumentBuild::new(&settings, "doc");
        let options = ProcessOptions {
            consumes: Some("IronOre = 0.2 kg\nScrap".into()),
            produces: Some(r#"Output {amount: "k*0.5", unit: "-"}"#.into()),
            defs: Some("k = 2".into()),
            ..ProcessOptions::default()
        };
        let declared = build.begin_process("Smelt", &options).unwrap();
        let recipe = declared.recipe.unwrap();
        assert_eq!(
            recipe.consumes,
            vec![RecipeItem {
                object: sys("IronOre"),
                quantity: 0.2,
                metric: iris::QK_MASS.into(),
            }]
        );
        assert_eq!(
            recipe.produces,
            vec![RecipeItem {
                object: sys("Output"),
                quantity: 1.0,
                metric: iris::QK_DIMENSIONLESS.into(),
            }]
        );
        let g = graph(&build);
        assert!(g.contains(&Triple::iris(&sys("Smelt"), iris::PROBS_CONSUMES, &sys("Scrap"))));
        assert_eq!(Recipe::from_graph(&g, &sys("Smelt")).unwrap().consumes.len(), 1);
    }

    #[test]
    fn units_are_scaled_and_unknown_units_fall_back() {
        let settings = settings();
        let mut build = DocumentBuild::new(&settings, "doc");
        let options = ProcessOptions {
            consumes: Some("A = 2 t\nB = 3 furlong".into()),
            ..ProcessOptions::default()
        };
        let recipe = build.begin_process("P", &options).unwrap().recipe.unwrap();
        assert_eq!(recipe.consumes[0].quantity, 2000.0);
        assert_eq!(recipe.consumes[1].quantity, 3.0);
        assert_eq!(recipe.consumes[1].metric, iris::QK_MASS);
        assert_eq!(
            build.diagnostics().of_kind(DiagnosticKind::UnsupportedUnit).count(),
            1
        );
    }

    #[test]
    fn expression_failures_abort_the_declaration() {
        let settings = settings();
        let mut build = DocumentBuild::new(&settings, "doc");
        let undefined = ProcessOptions {
            consumes: Some("A = k*0.1 kg".into()),
            ..ProcessOptions::default()
        };
        assert_eq!(
            build.begin_process("P", &undefined).unwrap_err(),
            GraphError::UndefinedName("k".into())
        );
        let syntax = ProcessOptions {
            consumes: Some(r#"A = "k * " kg"#.into()),
            ..ProcessOptions::default()
        };
        assert!(matches!(
            build.begin_process("P", &syntax),
            Err(GraphError::ExpressionSyntax { .. })
        ));
        assert!(build.store().is_empty());
        assert!(build.index().is_empty());
    }

    #[test]
    fn nesting_uses_the_parent_stack() {
        let settings = settings();
        let mut build = DocumentBuild::new(&settings, "doc");
        let parent = ProcessOptions {
            become_parent: true,
            ..ProcessOptions::default()
        };
        build.begin_process("P1", &parent).unwrap();
        let child = build.begin_process("P1a", &ProcessOptions::default()).unwrap();
        assert_eq!(child.depth, 1);
        assert_eq!(build.end_process(), EndOutcome::Ended(sys("P1")));
        assert_eq!(build.end_process(), EndOutcome::NothingToEnd);

        let g = graph(&build);
        assert!(g.contains(&Triple::iris(&sys("P1"), iris::PROBS_PROCESS_COMPOSED_OF, &sys("P1a"))));
    }

    #[test]
    fn explicit_parent_overrides_the_stack() {
        let settings = settings();
        let mut build = DocumentBuild::new(&settings, "doc");
        build.start_sub_processes("Outer").unwrap();
        let options = ProcessOptions {
            parent: Some("prefix:Other".into()),
            ..ProcessOptions::default()
        };
        build.begin_process("Inner", &options).unwrap();
        let g = graph(&build);
        assert!(g.contains(&Triple::iris(
            "http://example.org/prefix/Other",
            iris::PROBS_PROCESS_COMPOSED_OF,
            &sys("Inner")
        )));
        assert!(!g.contains(&Triple::iris(&sys("Outer"), iris::PROBS_PROCESS_COMPOSED_OF, &sys("Inner"))));
    }

    #[test]
    fn empty_local_names_use_the_context() {
        let settings = settings();
        let mut build = DocumentBuild::new(&settings, "doc");
        let options = ProcessOptions {
            produces: Some("prefix:".into()),
            ..ProcessOptions::default()
        };
        build.begin_process("P2", &options).unwrap();
        assert!(graph(&build).contains(&Triple::iris(
            &sys("P2"),
            iris::PROBS_PRODUCES,
            "http://example.org/prefix/P2"
        )));
        assert!(matches!(
            build.begin_process("prefix:", &ProcessOptions::default()),
            Err(GraphError::EmptyName(_))
        ));
    }

    #[test]
    fn unknown_prefix_is_fatal() {
        let settings = settings();
        let mut build = DocumentBuild::new(&settings, "doc");
        assert!(matches!(
            build.begin_object("nope:Thing", &ObjectOptions::default()),
            Err(GraphError::UnknownPrefix { .. })
        ));
    }

    #[test]
    fn object_with_market_parent_and_equivalence() {
        let settings = settings();
        let mut build = DocumentBuild::new(&settings, "doc");
        build.start_sub_objects("Fruit").unwrap();
        let object = ObjectOptions {
            label: Some("Apples".into()),
            equivalent: Some("prefix:Apple".into()),
            traded_import: true,
            traded_export: true,
            ..ObjectOptions::default()
        };
        let declared = build.begin_object("Apples", &object).unwrap();
        assert_eq!(declared.depth, 1);
        assert_eq!(declared.anchor, "object-Apples");

        let g = graph(&build);
        let apples = sys("Apples");
        let market = format!("{apples}-market");
        assert!(g.has_type(&apples, iris::PROBS_OBJECT));
        assert!(g.has_type(&apples, iris::PROBS_TRADED_OBJECT));
        assert!(g.contains(&Triple::iris(&sys("Fruit"), iris::PROBS_OBJECT_COMPOSED_OF, &apples)));
        assert!(g.contains(&Triple::iris(
            &apples,
            iris::PROBS_OBJECT_EQUIVALENT_TO,
            "http://example.org/prefix/Apple"
        )));
        assert!(g.has_type(&market, iris::PROBS_MARKET_PROCESS));
        assert!(g.contains(&Triple::iris(&market, iris::PROBS_MARKET_FOR_OBJECT, &apples)));
        assert!(g.contains(&Triple::new(
            Term::iri(market.as_str()),
            Term::iri(iris::RDFS_LABEL),
            Term::literal("Apples"),
        )));
        assert_eq!(build.end_object(), EndOutcome::Ended(sys("Fruit")));
        assert_eq!(build.end_object(), EndOutcome::NothingToEnd);
    }

    #[test]
    fn traded_mismatch_is_reported() {
        let settings = settings();
        let mut build = DocumentBuild::new(&settings, "doc");
        let object = ObjectOptions {
            traded_export: true,
            ..ObjectOptions::default()
        };
        build.begin_object("Steel", &object).unwrap();
        assert!(!graph(&build).has_type(&sys("Steel"), iris::PROBS_TRADED_OBJECT));
        assert_eq!(
            build.diagnostics().of_kind(DiagnosticKind::TradedMismatch).count(),
            1
        );
    }

    #[test]
    fn noindex_skips_registration() {
        let settings = settings();
        let mut build = DocumentBuild::new(&settings, "doc");
        let object = ObjectOptions {
            noindex: true,
            ..ObjectOptions::default()
        };
        build.begin_object("Hidden", &object).unwrap();
        assert!(build.index().is_empty());
        assert!(graph(&build).has_type(&sys("Hidden"), iris::PROBS_OBJECT));
    }

    #[test]
    fn graph_data_blocks() {
        let settings = settings();
        let mut build = DocumentBuild::new(&settings, "doc");
        assert!(build.add_graph_data("sys:A rdfs:label \"A\" .", 3));
        assert!(build.add_graph_data(
            "@prefix ex: <http://example.org/ex/> .\nex:B a probs:Object .",
            8
        ));
        assert!(build.add_graph_data(
            "@prefix ex: <http://example.org/another/> .\nex:C a probs:Object .",
            12
        ));
        assert!(!build.add_graph_data("sys:A sys:b", 20));

        let g = graph(&build);
        assert!(g.has_type("http://example.org/ex/B", iris::PROBS_OBJECT));
        assert!(g.has_type("http://example.org/another/C", iris::PROBS_OBJECT));
        assert_eq!(
            build.store().bindings().get("ex1"),
            Some("http://example.org/another/")
        );
        assert_eq!(
            build.diagnostics().of_kind(DiagnosticKind::PrefixConflict).count(),
            1
        );
        let malformed: Vec<_> = build
            .diagnostics()
            .of_kind(DiagnosticKind::MalformedGraphData)
            .collect();
        assert_eq!(malformed.len(), 1);
        assert!(malformed[0].message.contains("line 20"));
    }

    #[test]
    fn blank_nodes_stay_local_to_their_block() {
        let settings = settings();
        let mut build = DocumentBuild::new(&settings, "doc");
        assert!(build.add_graph_data("sys:A rdfs:seeAlso [ rdfs:label \"first\" ] , _:n .", 3));
        assert!(build.add_graph_data("sys:B rdfs:seeAlso [ rdfs:label \"second\" ] , _:n .", 9));

        let g = graph(&build);
        let see_also = Term::iri("http://www.w3.org/2000/01/rdf-schema#seeAlso");
        let label = Term::iri(iris::RDFS_LABEL);
        let (a, b) = (Term::iri(sys("A")), Term::iri(sys("B")));
        let from_a: Vec<&Term> = g.objects(&a, &see_also).collect();
        let from_b: Vec<&Term> = g.objects(&b, &see_also).collect();
        assert_eq!(from_a.len(), 2);
        assert_eq!(from_b.len(), 2);
        assert!(from_a.iter().all(|t| !from_b.contains(t)));
        for node in from_a.iter().chain(&from_b) {
            assert!(g.objects(node, &label).count() <= 1);
        }
    }

    #[test]
    fn anchors_are_sanitised() {
        assert_eq!(anchor_for(Kind::Process, "http://x/a.b c"), "process-a-b-c");
    }

    #[test]
    fn anchors_are_unique_within_a_document() {
        let settings = settings();
        let mut build = DocumentBuild::new(&settings, "doc");
        let options = ProcessOptions::default();
        let anchors: Vec<String> = ["X", "prefix:X", "a.b", "a-b", "X"]
            .into_iter()
            .map(|name| build.begin_process(name, &options).unwrap().anchor)
            .collect();
        assert_eq!(
            anchors,
            vec!["process-X", "process-prefix-X", "process-a-b", "process-a-b-2", "process-X-2"]
        );

        let object = build.begin_object("X", &ObjectOptions::default()).unwrap();
        assert_eq!(object.anchor, "object-X");
    }

    #[test]
    fn explicit_parent_is_reported() {
        let settings = settings();
        let mut build = DocumentBuild::new(&settings, "doc");
        build.start_sub_processes("Outer").unwrap();
        let nested = build.begin_process("A", &ProcessOptions::default()).unwrap();
        assert_eq!(nested.parent, Some(sys("Outer")));
        let options = ProcessOptions {
            parent: Some("Elsewhere".into()),
            ..ProcessOptions::default()
        };
        let explicit = build.begin_process("B", &options).unwrap();
        assert_eq!(explicit.parent, Some(sys("Elsewhere")));
    }
}
