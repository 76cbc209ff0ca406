//! Splits Markdown sources into prose and directive blocks.
//!
//! A directive is a fenced code block whose info string starts with
//! `{name}`:
//!
//! ````markdown
//! ```{system:process} Smelting
//! :label: Iron smelting
//! :consumes: IronOre = 0.2 kg
//!     Coke = 0.1 kg
//! :become_parent:
//!
//! Free text shown inside the declaration.
//! ```
//! ````
//!
//! Options come first, either as `:key: value` lines (indented lines
//! continue the previous value) or as a YAML mapping between `---` lines.
//! Everything after the options is the directive body.

use std::collections::BTreeMap;
use std::ops::Range;

use anyhow::{bail, Context, Result};
use probs_graph::{ObjectOptions, ProcessOptions};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use serde_yaml::Value;

/// A piece of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Prose, passed through to the Markdown renderer.
    Markdown {
        /// Source text.
        text: String,
        /// Line of the first character.
        line: usize,
    },
    /// A `{name}` fenced block.
    Directive(Directive),
}

/// A parsed directive block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directive {
    /// Directive name without braces, e.g. `system:process`.
    pub name: String,
    /// Text after the name on the fence line.
    pub argument: String,
    /// Options. Flags map to an empty string.
    pub options: BTreeMap<String, String>,
    /// Content after the options.
    pub body: String,
    /// Line of the opening fence.
    pub line: usize,
    /// Line of the first body line.
    pub body_line: usize,
}

/// Splits `source` into blocks. `first_line` is the line number of the
/// first line of `source`, so nested bodies keep their position in the
/// file.
///
/// # Errors
///
/// Returns an error if a directive's YAML option block is malformed.
pub fn extract(source: &str, first_line: usize) -> Result<Vec<Block>> {
    let line_of = |offset: usize| first_line + source[..offset].matches('\n').count();

    let mut blocks = Vec::new();
    let mut cursor = 0;
    let mut pending: Option<(Range<usize>, String, String)> = None;

    for (event, range) in Parser::new_ext(source, Options::empty()).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info)))
                if pending.is_none() && info.trim_start().starts_with('{') =>
            {
                pending = Some((range, info.to_string(), String::new()));
            }
            Event::Text(text) => {
                if let Some((_, _, content)) = pending.as_mut() {
                    content.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                let Some((block, info, content)) = pending.take() else {
                    continue;
                };
                push_markdown(&mut blocks, &source[cursor..block.start], line_of(cursor));
                let line = line_of(block.start);
                let directive = parse_directive(&info, &content, line)
                    .with_context(|| format!("directive at line {line}"))?;
                blocks.push(Block::Directive(directive));
                cursor = block.end;
            }
            _ => {}
        }
    }
    push_markdown(&mut blocks, &source[cursor..], line_of(cursor));
    Ok(blocks)
}

fn push_markdown(blocks: &mut Vec<Block>, text: &str, line: usize) {
    if !text.trim().is_empty() {
        blocks.push(Block::Markdown {
            text: text.to_string(),
            line,
        });
    }
}

fn parse_directive(info: &str, content: &str, line: usize) -> Result<Directive> {
    let info = info.trim().trim_start_matches('{');
    let Some((name, argument)) = info.split_once('}') else {
        bail!("unterminated directive name \"{{{info}\"");
    };
    let (options, consumed) = split_options(content)?;
    let body: Vec<&str> = content.lines().skip(consumed).collect();
    Ok(Directive {
        name: name.trim().to_string(),
        argument: argument.trim().to_string(),
        options,
        body: body.join("\n"),
        line,
        body_line: line + 1 + consumed,
    })
}

/// Reads the option header. Returns the options and how many lines they
/// took, including one separating blank line.
fn split_options(content: &str) -> Result<(BTreeMap<String, String>, usize)> {
    let lines: Vec<&str> = content.lines().collect();
    let mut options = BTreeMap::new();

    if lines.first().map(|l| l.trim()) == Some("---") {
        let Some(close) = lines.iter().skip(1).position(|l| l.trim() == "---") else {
            bail!("option block starting with --- is never closed");
        };
        let yaml = lines[1..=close].join("\n");
        let mapping: BTreeMap<String, Value> =
            serde_yaml::from_str(&yaml).context("invalid YAML option block")?;
        for (key, value) in mapping {
            if let Some(value) = option_value(&key, value)? {
                options.insert(key, value);
            }
        }
        return Ok((options, skip_blank(&lines, close + 2)));
    }

    let mut i = 0;
    while let Some((key, value)) = lines.get(i).and_then(|l| option_line(l)) {
        let mut value = value.to_string();
        i += 1;
        while let Some(next) = lines.get(i) {
            if next.trim().is_empty() || !next.starts_with([' ', '\t']) {
                break;
            }
            if !value.is_empty() {
                value.push('\n');
            }
            value.push_str(next.trim());
            i += 1;
        }
        options.insert(key.to_string(), value);
    }
    if options.is_empty() {
        return Ok((options, 0));
    }
    Ok((options, skip_blank(&lines, i)))
}

fn skip_blank(lines: &[&str], at: usize) -> usize {
    match lines.get(at) {
        Some(line) if line.trim().is_empty() => at + 1,
        _ => at,
    }
}

/// `:key: value` → `(key, value)`.
fn option_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix(':')?;
    let (key, value) = rest.split_once(':')?;
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then(|| (key, value.trim()))
}

fn option_value(key: &str, value: Value) -> Result<Option<String>> {
    Ok(match value {
        Value::Null | Value::Bool(true) => Some(String::new()),
        Value::Bool(false) => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Sequence(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => parts.push(s),
                    Value::Number(n) => parts.push(n.to_string()),
                    _ => bail!("option \"{key}\" must be a list of strings"),
                }
            }
            Some(parts.join("\n"))
        }
        _ => bail!("option \"{key}\" must be a string, a flag or a list"),
    })
}

impl Directive {
    fn text(&self, key: &str) -> Option<String> {
        self.options.get(key).cloned()
    }

    fn flag(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    /// Options of a `process` directive.
    #[must_use]
    pub fn process_options(&self) -> ProcessOptions {
        ProcessOptions {
            label: self.text("label"),
            become_parent: self.flag("become_parent"),
            consumes: self.text("consumes"),
            produces: self.text("produces"),
            composed_of: self.text("composed_of"),
            defs: self.text("defs"),
            parent: self.text("parent"),
            noindex: self.flag("noindex"),
        }
    }

    /// Options of an `object` directive. `traded` takes the words `import`
    /// and `export`.
    #[must_use]
    pub fn object_options(&self) -> ObjectOptions {
        let mut options = ObjectOptions {
            label: self.text("label"),
            become_parent: self.flag("become_parent"),
            parent_object: self.text("parent_object"),
            equivalent: self.text("equivalent"),
            noindex: self.flag("noindex"),
            ..ObjectOptions::default()
        };
        if let Some(traded) = self.options.get("traded") {
            for word in traded.split(|c: char| c.is_whitespace() || c == ',') {
                match word.to_ascii_lowercase().as_str() {
                    "" => {}
                    "import" => options.traded_import = true,
                    "export" => options.traded_export = true,
                    other => tracing::warn!(line = self.line, word = other, "ignoring traded value"),
                }
            }
        }
        options
    }
}

/// An inline role such as `` {system:ref}`Smelting` ``.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role<'a> {
    /// Role name without braces.
    pub name: &'a str,
    /// Text between the backticks.
    pub target: &'a str,
    /// Byte range of the whole role in the scanned text.
    pub span: Range<usize>,
}

/// Finds every `` {name}`target` `` role in `text`, in order.
#[must_use]
pub fn scan_roles(text: &str) -> Vec<Role<'_>> {
    let mut roles = Vec::new();
    let mut from = 0;
    while let Some(found) = text[from..].find('{') {
        let start = from + found;
        from = start + 1;
        let rest = &text[start + 1..];
        let Some(close) = rest.find("}`") else { break };
        let name = &rest[..close];
        let is_name = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-'));
        if !is_name {
            continue;
        }
        let target_start = start + 1 + close + 2;
        let Some(len) = text[target_start..].find('`') else { break };
        let end = target_start + len + 1;
        roles.push(Role {
            name,
            target: &text[target_start..end - 1],
            span: start..end,
        });
        from = end;
    }
    roles
}
