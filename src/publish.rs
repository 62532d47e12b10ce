//! Copies finished PDFs into the shared output directory.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::document::Document;

/// Copy `<build_dir>/<name>.pdf` to `<output_dir>/<name>.pdf`, replacing any previous copy.
///
/// Two documents with the same name would silently overwrite each other;
/// discovery guarantees names are unique within one documents root.
pub fn publish_artifact(document: &Document, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory '{}'", output_dir.display()))?;

    let source = document.artifact();
    let target = document.published_artifact(output_dir);
    fs::copy(&source, &target).with_context(|| {
        format!(
            "publishing '{}' -> '{}'",
            source.display(),
            target.display()
        )
    })?;
    Ok(target)
}
