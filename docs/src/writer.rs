//! Writes `output.ttl` and the rendered pages.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::BuildOutput;
use crate::linker::page_path;

/// Name of the Turtle file in the output directory.
pub const TURTLE_FILE: &str = "output.ttl";

/// Writes a build's output into `out_dir`. Pages are only written when
/// `html` is set. Returns the paths written.
///
/// # Errors
///
/// Returns an error if a directory cannot be created or a file cannot be
/// written.
pub fn write_output(out_dir: &Path, output: &BuildOutput, html: bool) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let mut written = Vec::new();
    let turtle = out_dir.join(TURTLE_FILE);
    write_file(&turtle, &output.turtle)?;
    written.push(turtle);

    if html {
        for page in &output.pages {
            let path = out_dir.join(page_path(&page.document));
            write_file(&path, &page.html)?;
            written.push(path);
        }
    }
    tracing::info!(out = %out_dir.display(), files = written.len(), "output written");
    Ok(written)
}

/// Writes a file, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot
/// be written.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Page;

    #[test]
    fn pages_only_with_html() {
        let dir = tempfile::tempdir().unwrap();
        let output = BuildOutput {
            turtle: "@prefix sys: <http://x/> .\n".into(),
            pages: vec![Page {
                document: "guides/intro".into(),
                title: "Intro".into(),
                html: "<html></html>".into(),
            }],
            ..BuildOutput::default()
        };

        let written = write_output(dir.path(), &output, false).unwrap();
        assert_eq!(written, vec![dir.path().join(TURTLE_FILE)]);
        assert!(!dir.path().join("guides").exists());

        let written = write_output(dir.path(), &output, true).unwrap();
        assert_eq!(written.len(), 2);
        let page = fs::read_to_string(dir.path().join("guides/intro.html")).unwrap();
        assert_eq!(page, "<html></html>");
    }
}
