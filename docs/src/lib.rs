//! Markdown front end for PRObs system definitions.
//!
//! Reads a tree of Markdown documents, applies the `{system:process}`,
//! `{system:object}`, nesting and `{ttl}` directives through
//! [`probs_graph`], merges the per-document results and writes the merged
//! graph as `output.ttl`. Pages can also be rendered to HTML, with
//! `{system:ref}` and `{system:rdf}` roles resolved across documents and a
//! generated process index and object index.
//!
//! # Entry Point
//!
//! ```no_run
//! use std::path::PathBuf;
//! use probs_docs::{build, BuildOptions};
//!
//! let options = BuildOptions {
//!     source: PathBuf::from("docs"),
//!     config: PathBuf::from("docs/probs.toml"),
//!     out: PathBuf::from("_build/probs"),
//!     html: true,
//! };
//! let output = build(&options).expect("build failed");
//! for diagnostic in &output.diagnostics.entries {
//!     eprintln!("{diagnostic}");
//! }
//! ```
//!
//! # Output
//!
//! ```text
//! _build/probs/
//!   output.ttl            ← merged, postprocessed graph
//!   index.html            ← one page per source document (with --html)
//!   guides/smelting.html
//!   system-process.html   ← process index
//!   system-object.html    ← object index
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod builder;
pub mod config;
pub mod extractor;
pub mod linker;
pub mod renderer;
pub mod writer;

pub use builder::{build, compile, discover, BuildOptions, BuildOutput, DocumentFailure, Page, Source};
