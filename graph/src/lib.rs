//! Compiles PRObs system definitions into an RDF graph.
//!
//! Documents declare processes (transformations) and objects (the things
//! flowing between them). Each document is built independently into its own
//! context; contexts are then merged, cross-references resolved against the
//! complete index, and the merged graph postprocessed and written as Turtle.
//!
//! # Entry Point
//!
//! ```
//! use probs_graph::{DocumentBuild, ProcessOptions, Settings};
//!
//! let settings = Settings::new("http://example.org/system/").unwrap();
//! let mut build = DocumentBuild::new(&settings, "index");
//! let options = ProcessOptions {
//!     consumes: Some("IronOre = 0.2 kg".into()),
//!     ..ProcessOptions::default()
//! };
//! let declared = build.begin_process("Smelting", &options).unwrap();
//! assert_eq!(declared.uri, "http://example.org/system/Smelting");
//! assert!(declared.recipe.is_some());
//! ```
//!
//! # Building several documents
//!
//! ```
//! use probs_graph::{postprocess, Diagnostics, DocumentBuild, ObjectOptions, Settings, Store};
//!
//! let settings = Settings::new("http://example.org/system/").unwrap();
//! let mut store = Store::new();
//! let mut diagnostics = Diagnostics::new();
//! for doc in ["a", "b"] {
//!     let mut build = DocumentBuild::new(&settings, doc);
//!     build.begin_object(&format!("Thing{doc}"), &ObjectOptions::default()).unwrap();
//!     let output = build.finish();
//!     store.merge(&output.store, &[doc], &mut diagnostics);
//! }
//! let mut graph = store.merged();
//! postprocess::postprocess(&mut graph, &mut diagnostics);
//! let turtle = probs_graph::serializer::turtle::to_turtle(&graph, store.bindings());
//! assert!(turtle.contains("sys:Thinga"));
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod config;
pub mod declare;
pub mod diagnostics;
pub mod error;
pub mod expr;
pub mod items;
pub mod model;
pub mod parser;
pub mod postprocess;
pub mod recipe;
pub mod resolver;
pub mod serializer;
pub mod store;
pub mod units;
pub mod xref;

pub use config::{Config, Settings, UnitConfig};
pub use declare::{
    DocumentBuild, DocumentOutput, Declared, EndOutcome, ObjectOptions, ProcessOptions,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::{GraphError, Result};
pub use model::{Graph, Kind, Term, Thing, Triple};
pub use recipe::{Recipe, RecipeItem};
pub use resolver::Namespaces;
pub use store::{PrefixBindings, Store};
pub use xref::{InlineReference, XrefIndex};
