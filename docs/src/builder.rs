//! Two-phase build over a source tree.
//!
//! Phase one reads every document on its own: directives are applied to a
//! per-document [`DocumentBuild`] and the page is reduced to a tree of
//! [`Node`]s. Documents run in parallel and never see each other.
//!
//! Between the phases the partial stores and indices are merged in sorted
//! document order and preloaded Turtle is added. Phase two then resolves
//! roles against the complete index, checks for undefined objects,
//! expands children-of placeholders and renders the pages.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use probs_graph::model::Graph;
use probs_graph::postprocess::postprocess;
use probs_graph::serializer::turtle::to_turtle;
use probs_graph::{
    parser, Diagnostics, DocumentBuild, DocumentOutput, EndOutcome, PrefixBindings, Settings,
    Store, XrefIndex,
};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config;
use crate::extractor::{self, Block, Directive};
use crate::renderer::{
    render_nodes, render_object_index, render_page, render_process_index, Declaration, Node,
    RenderContext, OBJECT_INDEX, PROCESS_INDEX,
};
use crate::writer;

/// What to build and where.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory searched for `*.md` documents.
    pub source: PathBuf,
    /// Path of `probs.toml`.
    pub config: PathBuf,
    /// Output directory.
    pub out: PathBuf,
    /// Also write HTML pages.
    pub html: bool,
}

/// A document read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Path relative to the source root, without extension, `/`-separated.
    pub document: String,
    /// File contents.
    pub text: String,
}

/// A document whose declarations could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    /// Document id.
    pub document: String,
    /// The error with its context chain.
    pub error: String,
}

/// A rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Document id; the page is written to `<document>.html`.
    pub document: String,
    /// Page title.
    pub title: String,
    /// Complete HTML.
    pub html: String,
}

/// Result of a build.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// The merged, postprocessed graph as Turtle.
    pub turtle: String,
    /// The merged, postprocessed graph.
    pub graph: Graph,
    /// Per-document contexts, as merged.
    pub store: Store,
    /// Every declared thing.
    pub index: XrefIndex,
    /// Non-fatal conditions from both phases.
    pub diagnostics: Diagnostics,
    /// Documents that contributed nothing because of a fatal error.
    pub failures: Vec<DocumentFailure>,
    /// Rendered pages, including the two index pages.
    pub pages: Vec<Page>,
}

/// Phase-one result for one document.
#[derive(Debug)]
pub struct ReadDocument {
    /// Partial store, index and diagnostics.
    pub output: DocumentOutput,
    /// Page tree awaiting phase two.
    pub nodes: Vec<Node>,
}

/// Runs a complete build and writes its output.
///
/// # Errors
///
/// Returns an error if the configuration is missing or invalid, the source
/// tree cannot be read, a preload file cannot be loaded, or output cannot
/// be written. Errors in individual documents are reported in
/// [`BuildOutput::failures`] instead.
pub fn build(options: &BuildOptions) -> Result<BuildOutput> {
    let (config, settings) = config::load(&options.config)?;
    let sources = discover(&options.source)?;
    tracing::info!(
        source = %options.source.display(),
        documents = sources.len(),
        "building system definition"
    );
    let output = compile(&settings, &config.preload, &sources)?;
    writer::write_output(&options.out, &output, options.html)?;
    Ok(output)
}

/// Finds every `*.md` file under `root`, skipping hidden entries, sorted
/// by document id.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked or a file cannot be read.
pub fn discover(root: &Path) -> Result<Vec<Source>> {
    let mut sources = Vec::new();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |x| x != "md") {
            continue;
        }
        let relative = path
            .strip_prefix(root)
            .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
        let document = relative
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        sources.push(Source { document, text });
    }
    sources.sort_by(|a, b| a.document.cmp(&b.document));
    Ok(sources)
}

/// Runs both phases over already-read sources.
///
/// # Errors
///
/// Returns an error only if a preload file cannot be read or parsed.
pub fn compile(settings: &Settings, preload: &[PathBuf], sources: &[Source]) -> Result<BuildOutput> {
    let read: Vec<(String, Result<ReadDocument>)> = sources
        .par_iter()
        .map(|s| (s.document.clone(), read_document(settings, &s.document, &s.text)))
        .collect();

    let mut store = Store::with_bindings(PrefixBindings::from_namespaces(&settings.namespaces));
    let mut index = XrefIndex::new();
    let mut diagnostics = Diagnostics::new();
    let mut failures = Vec::new();
    let mut trees = Vec::new();

    for (document, result) in read {
        match result {
            Ok(ReadDocument { output, nodes }) => {
                merge_document(&mut store, &mut index, &mut diagnostics, output);
                trees.push((document, nodes));
            }
            Err(e) => {
                let error = format!("{e:#}");
                tracing::error!(%document, %error, "document skipped");
                failures.push(DocumentFailure { document, error });
            }
        }
    }

    for path in preload {
        load_preload(&mut store, &mut diagnostics, path)?;
    }

    let mut graph = store.merged();
    index.check_undefined_objects(&graph, &mut diagnostics);
    postprocess(&mut graph, &mut diagnostics);
    let turtle = to_turtle(&graph, store.bindings());

    let rendered: Vec<(Page, Diagnostics)> = trees
        .par_iter()
        .map(|(document, nodes)| {
            let mut page_diagnostics = Diagnostics::new();
            let ctx = RenderContext {
                document,
                index: &index,
                graph: &graph,
                namespaces: &settings.namespaces,
                bindings: store.bindings(),
            };
            let body = render_nodes(nodes, &ctx, &mut page_diagnostics);
            let title = title_of(nodes).unwrap_or_else(|| document.clone());
            let html = render_page(&title, document, &body);
            let page = Page {
                document: document.clone(),
                title,
                html,
            };
            (page, page_diagnostics)
        })
        .collect();

    let mut pages = Vec::with_capacity(rendered.len() + 2);
    for (page, page_diagnostics) in rendered {
        diagnostics.extend(page_diagnostics);
        pages.push(page);
    }
    for (document, title, body) in [
        (PROCESS_INDEX, "Process Index", render_process_index(&index)),
        (OBJECT_INDEX, "Object Index", render_object_index(&index, &graph)),
    ] {
        if pages.iter().any(|p| p.document == document) {
            tracing::warn!(document, "a source document uses the index page name; index not written");
            continue;
        }
        pages.push(Page {
            document: document.to_string(),
            title: title.to_string(),
            html: render_page(title, document, &body),
        });
    }

    tracing::info!(
        triples = graph.len(),
        declared = index.len(),
        warnings = diagnostics.count(probs_graph::Severity::Warning),
        errors = diagnostics.count(probs_graph::Severity::Error),
        failed = failures.len(),
        "build finished"
    );

    Ok(BuildOutput {
        turtle,
        graph,
        store,
        index,
        diagnostics,
        failures,
        pages,
    })
}

/// Replaces a document's earlier contribution with `output`.
pub fn merge_document(
    store: &mut Store,
    index: &mut XrefIndex,
    diagnostics: &mut Diagnostics,
    output: DocumentOutput,
) {
    let DocumentOutput {
        document,
        store: partial,
        index: partial_index,
        diagnostics: recorded,
    } = output;
    diagnostics.extend(recorded);
    store.clear(&document);
    index.clear_document(&document);
    store.merge(&partial, &[document.as_str()], diagnostics);
    index.merge(&partial_index, diagnostics);
}

fn load_preload(store: &mut Store, diagnostics: &mut Diagnostics, path: &Path) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read preload file: {}", path.display()))?;
    let context = format!("preload:{}", path.display());
    let triples = parser::parse_turtle_scoped(&text, &context)
        .with_context(|| format!("Failed to parse preload file: {}", path.display()))?;
    for (prefix, namespace) in parser::declared_prefixes(&text) {
        store
            .bindings_mut()
            .bind_reporting(&prefix, &namespace, Some(context.as_str()), diagnostics);
    }
    let count = triples.len();
    let graph = store.context_mut(&context);
    for triple in triples {
        graph.insert(triple);
    }
    tracing::debug!(path = %path.display(), count, "preloaded graph data");
    Ok(())
}

/// Phase one for a single document.
///
/// # Errors
///
/// Returns an error for malformed directive option blocks and for fatal
/// declaration errors, with the declaration and line as context.
pub fn read_document(settings: &Settings, document: &str, text: &str) -> Result<ReadDocument> {
    let blocks = extractor::extract(text, 1).with_context(|| format!("document {document}"))?;
    let mut build = DocumentBuild::new(settings, document);
    let nodes = read_blocks(&mut build, blocks).with_context(|| format!("document {document}"))?;
    Ok(ReadDocument {
        output: build.finish(),
        nodes,
    })
}

fn read_blocks(build: &mut DocumentBuild<'_>, blocks: Vec<Block>) -> Result<Vec<Node>> {
    let mut nodes = Vec::with_capacity(blocks.len());
    for block in blocks {
        match block {
            Block::Markdown { text, .. } => nodes.push(Node::Markdown(text)),
            Block::Directive(directive) => nodes.push(read_directive(build, directive)?),
        }
    }
    Ok(nodes)
}

fn read_directive(build: &mut DocumentBuild<'_>, d: Directive) -> Result<Node> {
    let name = d.name.strip_prefix("system:").unwrap_or(&d.name);
    let node = match name {
        "process" => {
            // The body goes first so a `become_parent` on this block only
            // applies to what follows it.
            let content = read_body(build, &d)?;
            let options = d.process_options();
            let declared = build
                .begin_process(&d.argument, &options)
                .with_context(|| format!("process \"{}\" at line {}", d.argument, d.line))?;
            let parent = declared.parent.clone();
            Node::Declaration(Box::new(Declaration {
                kind: probs_graph::Kind::Process,
                name: d.argument.clone(),
                label: options.label,
                declared,
                consumes: options.consumes,
                produces: options.produces,
                parent,
                content,
            }))
        }
        "object" => {
            let content = read_body(build, &d)?;
            let options = d.object_options();
            let declared = build
                .begin_object(&d.argument, &options)
                .with_context(|| format!("object \"{}\" at line {}", d.argument, d.line))?;
            Node::Declaration(Box::new(Declaration {
                kind: probs_graph::Kind::Object,
                name: d.argument.clone(),
                label: options.label,
                declared,
                consumes: None,
                produces: None,
                parent: None,
                content,
            }))
        }
        "start-sub-processes" => {
            let uri = build
                .start_sub_processes(&d.argument)
                .with_context(|| format!("start-sub-processes at line {}", d.line))?;
            Node::Message(format!("Starting sub processes of \"{uri}\""))
        }
        "start-sub-objects" => {
            let uri = build
                .start_sub_objects(&d.argument)
                .with_context(|| format!("start-sub-objects at line {}", d.line))?;
            Node::Message(format!("Starting sub objects of \"{uri}\""))
        }
        "end-sub-processes" => Node::Message(match build.end_process() {
            EndOutcome::Ended(uri) => format!("Ending sub processes of \"{uri}\""),
            EndOutcome::NothingToEnd => "Nothing to end!".to_string(),
        }),
        "end-sub-objects" => Node::Message(match build.end_object() {
            EndOutcome::Ended(uri) => format!("Ending sub objects of \"{uri}\""),
            EndOutcome::NothingToEnd => "Nothing to end!".to_string(),
        }),
        "ttl" => {
            let accepted = build.add_graph_data(&d.body, d.body_line);
            Node::GraphData {
                source: d.body,
                accepted,
            }
        }
        _ => {
            tracing::debug!(directive = %d.name, line = d.line, "passing through unknown directive");
            Node::Markdown(format!("```{}\n{}\n```\n", d.name, d.body))
        }
    };
    Ok(node)
}

fn read_body(build: &mut DocumentBuild<'_>, d: &Directive) -> Result<Vec<Node>> {
    if d.body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let blocks = extractor::extract(&d.body, d.body_line)?;
    read_blocks(build, blocks)
}

/// Text of the first top-level heading in the page's prose.
fn title_of(nodes: &[Node]) -> Option<String> {
    nodes.iter().find_map(|node| match node {
        Node::Markdown(text) => text
            .lines()
            .find_map(|line| line.strip_prefix("# "))
            .map(|title| title.trim().to_string()),
        _ => None,
    })
}
