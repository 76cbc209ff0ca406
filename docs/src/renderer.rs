//! Renders documents to HTML once the merged graph is complete.
//!
//! Phase one turns each document into a tree of [`Node`]s. Nothing in the
//! tree refers to other documents yet; roles stay as written and
//! declarations carry only what their own document knew. Rendering fills in
//! cross-references, recipe tables, parents and children from the merged
//! graph and index.

use probs_graph::model::{iris, Graph, Kind, Term};
use probs_graph::{
    Declared, DiagnosticKind, Diagnostics, InlineReference, Namespaces, PrefixBindings, Recipe,
    RecipeItem, XrefIndex,
};
use pulldown_cmark::{html, Options, Parser};

use crate::extractor::scan_roles;
use crate::linker::{href, root_prefix};

/// Document id of the generated process index page.
pub const PROCESS_INDEX: &str = "system-process";
/// Document id of the generated object index page.
pub const OBJECT_INDEX: &str = "system-object";

/// A rendered element of a document, before cross-references are known.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Prose with roles still unexpanded.
    Markdown(String),
    /// A process or object declaration.
    Declaration(Box<Declaration>),
    /// An inline Turtle block, shown as source.
    GraphData {
        /// The block's text.
        source: String,
        /// Whether it parsed.
        accepted: bool,
    },
    /// Output of a nesting directive.
    Message(String),
}

/// What a declaration block shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Process or object.
    pub kind: Kind,
    /// The name as written.
    pub name: String,
    /// The `label` option.
    pub label: Option<String>,
    /// Result of the declaration.
    pub declared: Declared,
    /// The `consumes` option as written.
    pub consumes: Option<String>,
    /// The `produces` option as written.
    pub produces: Option<String>,
    /// Parent process the declaration was attached to.
    pub parent: Option<String>,
    /// The block's body.
    pub content: Vec<Node>,
}

/// Everything rendering needs to look up.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Document being rendered.
    pub document: &'a str,
    /// Merged index.
    pub index: &'a XrefIndex,
    /// Merged, postprocessed graph.
    pub graph: &'a Graph,
    /// Configured prefixes, for resolving roles.
    pub namespaces: &'a Namespaces,
    /// Output prefixes, for abbreviating URIs.
    pub bindings: &'a PrefixBindings,
}

/// Renders a node tree to HTML.
pub fn render_nodes(nodes: &[Node], ctx: &RenderContext<'_>, diagnostics: &mut Diagnostics) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Markdown(text) => out.push_str(&markdown_to_html(&expand_roles(text, ctx, diagnostics))),
            Node::Declaration(decl) => out.push_str(&render_declaration(decl, ctx, diagnostics)),
            Node::GraphData { source, accepted } => {
                let class = if *accepted { "ttl" } else { "ttl invalid" };
                out.push_str(&format!(
                    "<pre class=\"{class}\"><code>{}</code></pre>\n",
                    escape_html(source)
                ));
            }
            Node::Message(text) => {
                out.push_str(&format!("<pre class=\"probs-message\">{}</pre>\n", escape_html(text)));
            }
        }
    }
    out
}

/// Expands `{system:ref}` and `{system:rdf}` roles into Markdown.
///
/// References that do not resolve are rendered as inert spans; other roles
/// are left alone.
pub fn expand_roles(source: &str, ctx: &RenderContext<'_>, diagnostics: &mut Diagnostics) -> String {
    let mut result = String::with_capacity(source.len());
    let mut cursor = 0;

    for role in scan_roles(source) {
        let expansion = match role.name {
            "system:ref" => expand_ref(role.target.trim(), ctx, diagnostics),
            "system:rdf" => expand_rdf(role.target.trim(), ctx, diagnostics),
            _ => continue,
        };
        result.push_str(&source[cursor..role.span.start]);
        result.push_str(&expansion);
        cursor = role.span.end;
    }

    result.push_str(&source[cursor..]);
    result
}

fn expand_ref(target: &str, ctx: &RenderContext<'_>, diagnostics: &mut Diagnostics) -> String {
    match ctx.index.resolve(target, None, ctx.document, diagnostics) {
        Some(thing) => format!(
            "<a class=\"xref {}\" href=\"{}\">{}</a>",
            thing.kind.as_str(),
            escape_html(&href(ctx.document, &thing.document, &thing.anchor)),
            escape_html(&thing.label)
        ),
        None => format!("<span class=\"xref unresolved\">{}</span>", escape_html(target)),
    }
}

fn expand_rdf(target: &str, ctx: &RenderContext<'_>, diagnostics: &mut Diagnostics) -> String {
    let reference = ctx
        .index
        .resolve_inline_reference(target, ctx.namespaces, ctx.graph, ctx.bindings);
    let (mut html, labels) = match reference {
        InlineReference::Resolved {
            document,
            anchor,
            display,
            labels,
            ..
        } => (
            format!(
                "<a class=\"rdf-reference\" href=\"{}\">{}</a>",
                escape_html(&href(ctx.document, &document, &anchor)),
                escape_html(&display)
            ),
            labels,
        ),
        InlineReference::Unknown { display, labels, .. } => {
            diagnostics.warn(
                DiagnosticKind::UnresolvedReference,
                Some(ctx.document),
                format!("RDF reference \"{target}\" is not a declared process or object"),
            );
            (
                format!("<span class=\"rdf-reference unknown\">{}</span>", escape_html(&display)),
                labels,
            )
        }
    };
    if !labels.is_empty() {
        html.push_str(&format!(" ({})", escape_html(&labels.join(", "))));
    }
    html
}

fn render_declaration(decl: &Declaration, ctx: &RenderContext<'_>, diagnostics: &mut Diagnostics) -> String {
    let title = match decl.kind {
        Kind::Process => "Process: ",
        Kind::Object => "Object: ",
    };
    let mut out = format!(
        "<div class=\"admonition toggle {} nested-{} system\" id=\"{}\">\n<p class=\"admonition-title\"><em>{title}</em>{}",
        decl.kind.as_str(),
        decl.declared.depth,
        escape_html(&decl.declared.anchor),
        escape_html(&decl.name),
    );
    if let Some(label) = &decl.label {
        out.push_str(&format!("<em> / {}</em>", escape_html(label)));
    }
    out.push_str("</p>\n");

    out.push_str(&render_nodes(&decl.content, ctx, diagnostics));

    if decl.kind == Kind::Process {
        for (heading, text) in [("Consumes", &decl.consumes), ("Produces", &decl.produces)] {
            if let Some(text) = text {
                out.push_str(&format!("<p>{heading}: {}</p>\n", escape_html(text)));
            }
        }
        if let Some(parent) = &decl.parent {
            out.push_str(&format!("<p>Parent: {}</p>\n", escape_html(parent)));
        }
    }

    let uri = &decl.declared.uri;
    let composed_of = match decl.kind {
        Kind::Process => {
            if let Some(recipe) = Recipe::from_graph(ctx.graph, uri) {
                out.push_str(&recipe_tables(&recipe, ctx));
            }
            iris::PROBS_PROCESS_COMPOSED_OF
        }
        Kind::Object => iris::PROBS_OBJECT_COMPOSED_OF,
    };
    out.push_str(&relations(uri, composed_of, ctx));
    out.push_str("</div>\n");
    out
}

fn recipe_tables(recipe: &Recipe, ctx: &RenderContext<'_>) -> String {
    let mut out = String::new();
    for (heading, items) in [("Consumes", &recipe.consumes), ("Produces", &recipe.produces)] {
        out.push_str(&format!("<p>{heading}: </p>\n"));
        out.push_str("<table class=\"recipe colwidths-auto\">\n<thead><tr><th><code>Object</code></th><th><code>Amount</code></th></tr></thead>\n<tbody>\n");
        for RecipeItem { object, quantity, metric } in items.iter() {
            out.push_str(&format!(
                "<tr><td>{}</td><td><code>{quantity:.1} {}</code></td></tr>\n",
                system_link(object, ctx),
                escape_html(&ctx.bindings.curie(metric)),
            ));
        }
        out.push_str("</tbody>\n</table>\n");
    }
    out
}

/// `Parents:` and `Children:` lines along a composition predicate.
fn relations(uri: &str, predicate: &str, ctx: &RenderContext<'_>) -> String {
    let node = Term::iri(uri);
    let predicate = Term::iri(predicate);
    let parents: Vec<&str> = ctx.graph.subjects(&predicate, &node).filter_map(Term::as_iri).collect();
    let children: Vec<&str> = ctx.graph.objects(&node, &predicate).filter_map(Term::as_iri).collect();

    let mut out = String::new();
    for (heading, uris) in [("Parents", parents), ("Children", children)] {
        if uris.is_empty() {
            continue;
        }
        out.push_str(&format!("<p>{heading}:"));
        for uri in uris {
            out.push(' ');
            out.push_str(&system_link(uri, ctx));
        }
        out.push_str("</p>\n");
    }
    out
}

/// Link to a declared thing, labelled with its abbreviated URI.
fn system_link(uri: &str, ctx: &RenderContext<'_>) -> String {
    let curie = escape_html(&ctx.bindings.curie(uri));
    match ctx.index.get(uri) {
        Some(thing) => format!(
            "<a class=\"xref\" href=\"{}\">{curie}</a>",
            escape_html(&href(ctx.document, &thing.document, &thing.anchor))
        ),
        None => format!("<span class=\"xref unresolved\">{curie}</span>"),
    }
}

/// Body of the process index page.
#[must_use]
pub fn render_process_index(index: &XrefIndex) -> String {
    let mut out = String::from("<h1>Process Index</h1>\n");
    for (letter, things) in index.process_index() {
        out.push_str(&format!("<h2>{}</h2>\n<ul>\n", escape_html(&letter.to_string())));
        for thing in things {
            out.push_str(&format!(
                "<li><a href=\"{}\">{}</a> <em>({})</em></li>\n",
                escape_html(&href(PROCESS_INDEX, &thing.document, &thing.anchor)),
                escape_html(&thing.label),
                escape_html(&thing.document)
            ));
        }
        out.push_str("</ul>\n");
    }
    out
}

/// Body of the object index page: each object with the processes that
/// consume and produce it.
#[must_use]
pub fn render_object_index(index: &XrefIndex, graph: &Graph) -> String {
    let mut out = String::from("<h1>Object Index</h1>\n");
    for (letter, entries) in index.object_index(graph) {
        out.push_str(&format!("<h2>{}</h2>\n<ul>\n", escape_html(&letter.to_string())));
        for entry in entries {
            let thing = entry.thing;
            out.push_str(&format!(
                "<li><a href=\"{}\">{}</a>",
                escape_html(&href(OBJECT_INDEX, &thing.document, &thing.anchor)),
                escape_html(&thing.label)
            ));
            let users = entry
                .consumed_by
                .iter()
                .map(|p| (p, "consumed"))
                .chain(entry.produced_by.iter().map(|p| (p, "produced")));
            let mut nested = String::new();
            for (process, direction) in users {
                nested.push_str(&format!(
                    "<li><a href=\"{}\">{}</a> <em>({direction})</em></li>\n",
                    escape_html(&href(OBJECT_INDEX, &process.document, &process.anchor)),
                    escape_html(&process.label)
                ));
            }
            if !nested.is_empty() {
                out.push_str(&format!("\n<ul>\n{nested}</ul>\n"));
            }
            out.push_str("</li>\n");
        }
        out.push_str("</ul>\n");
    }
    out
}

/// Converts Markdown to HTML using pulldown-cmark.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_FOOTNOTES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, opts);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

/// Wraps rendered content in the page shell, with links to the two index
/// pages.
pub fn render_page(title: &str, document: &str, content_html: &str) -> String {
    let root = root_prefix(document);
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
</head>
<body>
<header class="site-header">
<nav aria-label="Indices" class="site-nav">
<a href="{root}{PROCESS_INDEX}.html">Process Index</a>
<a href="{root}{OBJECT_INDEX}.html">Object Index</a>
</nav>
</header>
<main id="main-content">
<article class="page-content">
{content_html}
</article>
</main>
</body>
</html>
"##,
        title = escape_html(title),
        root = escape_html(&root),
    )
}

/// Escapes HTML special characters in a string.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use probs_graph::model::{Thing, Triple};

    const SYS: &str = "http://example.org/system/";

    struct Fixture {
        index: XrefIndex,
        graph: Graph,
        namespaces: Namespaces,
        bindings: PrefixBindings,
    }

    impl Fixture {
        fn new() -> Self {
            let namespaces = Namespaces::new(SYS).unwrap();
            let bindings = PrefixBindings::from_namespaces(&namespaces);
            let mut index = XrefIndex::new();
            let mut diags = Diagnostics::new();
            for (local, kind, doc) in [
                ("Smelting", Kind::Process, "processes/iron"),
                ("IronOre", Kind::Object, "objects"),
            ] {
                index.register(
                    Thing {
                        uri: format!("{SYS}{local}"),
                        kind,
                        label: local.to_string(),
                        document: doc.to_string(),
                        anchor: format!("{}-{local}", kind.as_str()),
                    },
                    &mut diags,
                );
            }
            let graph: Graph = [
                Triple::iris(&format!("{SYS}Smelting"), iris::PROBS_CONSUMES, &format!("{SYS}IronOre")),
                Triple::iris(&format!("{SYS}IronOre"), iris::RDF_TYPE, iris::PROBS_OBJECT),
                Triple::new(
                    Term::iri(format!("{SYS}IronOre")),
                    Term::iri(iris::RDFS_LABEL),
                    Term::literal("Iron ore"),
                ),
            ]
            .into_iter()
            .collect();
            Self {
                index,
                graph,
                namespaces,
                bindings,
            }
        }

        fn ctx<'a>(&'a self, document: &'a str) -> RenderContext<'a> {
            RenderContext {
                document,
                index: &self.index,
                graph: &self.graph,
                namespaces: &self.namespaces,
                bindings: &self.bindings,
            }
        }
    }

    #[test]
    fn ref_roles_link_across_documents() {
        let f = Fixture::new();
        let mut diags = Diagnostics::new();
        let out = expand_roles("Uses {system:ref}`IronOre` and {system:ref}`Missing`.", &f.ctx("processes/iron"), &mut diags);
        assert!(out.contains("href=\"../objects.html#object-IronOre\""));
        assert!(out.contains("<span class=\"xref unresolved\">Missing</span>"));
        assert_eq!(diags.of_kind(DiagnosticKind::UnresolvedReference).count(), 1);
    }

    #[test]
    fn rdf_roles_show_curie_and_labels() {
        let f = Fixture::new();
        let mut diags = Diagnostics::new();
        let out = expand_roles("{system:rdf}`sys:IronOre`", &f.ctx("objects"), &mut diags);
        assert_eq!(
            out,
            "<a class=\"rdf-reference\" href=\"#object-IronOre\">sys:IronOre</a> (Iron ore)"
        );
        let unknown = expand_roles("{system:rdf}`sys:Coke`", &f.ctx("objects"), &mut diags);
        assert_eq!(unknown, "<span class=\"rdf-reference unknown\">[UNKNOWN!] sys:Coke</span>");
    }

    #[test]
    fn other_roles_are_untouched() {
        let f = Fixture::new();
        let mut diags = Diagnostics::new();
        let text = "A {math}`x^2` role.";
        assert_eq!(expand_roles(text, &f.ctx("objects"), &mut diags), text);
        assert!(diags.is_empty());
    }

    #[test]
    fn declaration_block() {
        let f = Fixture::new();
        let mut diags = Diagnostics::new();
        let decl = Declaration {
            kind: Kind::Process,
            name: "Smelting".into(),
            label: Some("Iron smelting".into()),
            declared: Declared {
                uri: format!("{SYS}Smelting"),
                anchor: "process-Smelting".into(),
                depth: 1,
                parent: Some(format!("{SYS}Metals")),
                recipe: None,
            },
            consumes: Some("IronOre".into()),
            produces: None,
            parent: Some(format!("{SYS}Metals")),
            content: vec![Node::Markdown("Melts {system:ref}`IronOre`.".into())],
        };
        let html = render_nodes(&[Node::Declaration(Box::new(decl))], &f.ctx("processes/iron"), &mut diags);
        assert!(html.contains("class=\"admonition toggle process nested-1 system\" id=\"process-Smelting\""));
        assert!(html.contains("<em>Process: </em>Smelting<em> / Iron smelting</em>"));
        assert!(html.contains("<p>Consumes: IronOre</p>"));
        assert!(html.contains(&format!("<p>Parent: {SYS}Metals</p>")));
        assert!(html.contains("../objects.html#object-IronOre"));
        assert!(!html.contains("<table"));
    }

    #[test]
    fn messages_and_graph_data_are_escaped() {
        let f = Fixture::new();
        let mut diags = Diagnostics::new();
        let nodes = [
            Node::Message("Nothing to end!".into()),
            Node::GraphData {
                source: "<a> <b> \"c\" .".into(),
                accepted: false,
            },
        ];
        let html = render_nodes(&nodes, &f.ctx("objects"), &mut diags);
        assert!(html.contains("<pre class=\"probs-message\">Nothing to end!</pre>"));
        assert!(html.contains("<pre class=\"ttl invalid\"><code>&lt;a&gt; &lt;b&gt; &quot;c&quot; .</code></pre>"));
    }

    #[test]
    fn index_pages() {
        let f = Fixture::new();
        let processes = render_process_index(&f.index);
        assert!(processes.contains("<h2>s</h2>"));
        assert!(processes.contains("href=\"processes/iron.html#process-Smelting\""));
        let objects = render_object_index(&f.index, &f.graph);
        assert!(objects.contains("Smelting</a> <em>(consumed)</em>"));
    }

    #[test]
    fn page_shell_links_indices_from_nested_pages() {
        let page = render_page("Iron <ore>", "a/b", "<p>x</p>");
        assert!(page.contains("<title>Iron &lt;ore&gt;</title>"));
        assert!(page.contains("href=\"../system-process.html\""));
    }
}
