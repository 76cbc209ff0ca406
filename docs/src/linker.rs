//! Links between rendered pages.
//!
//! A document `guides/smelting` is rendered to `guides/smelting.html`;
//! links are always relative so the output directory can be moved.

use std::path::PathBuf;

/// Output path of a document's page, relative to the output directory.
#[must_use]
pub fn page_path(document: &str) -> PathBuf {
    PathBuf::from(format!("{document}.html"))
}

/// Prefix leading from `document`'s page back to the output root.
#[must_use]
pub fn root_prefix(document: &str) -> String {
    "../".repeat(document.matches('/').count())
}

/// Relative link from `from`'s page to `anchor` in `to`'s page.
#[must_use]
pub fn href(from: &str, to: &str, anchor: &str) -> String {
    if from == to {
        return format!("#{anchor}");
    }
    let from_dirs: Vec<&str> = from.split('/').collect();
    let to_parts: Vec<&str> = to.split('/').collect();
    let from_dirs = &from_dirs[..from_dirs.len() - 1];

    let common = from_dirs
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count()
        .min(to_parts.len() - 1);

    let mut link = "../".repeat(from_dirs.len() - common);
    link.push_str(&to_parts[common..].join("/"));
    link.push_str(".html");
    if !anchor.is_empty() {
        link.push('#');
        link.push_str(anchor);
    }
    link
}
