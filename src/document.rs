//! Documents and their discovery under the documents root.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const SOURCE_EXTENSION: &str = "tex";
pub const BIBLIOGRAPHY_EXTENSION: &str = "bib";
pub const ARTIFACT_EXTENSION: &str = "pdf";

/// One LaTeX document: a subdirectory of the documents root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    /// Original sources under the documents root.
    pub source_dir: PathBuf,
    /// Staging workspace under the LaTeX build root.
    pub build_dir: PathBuf,
}

impl Document {
    pub fn new(name: &str, docs_root: &Path, latex_build_dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            source_dir: docs_root.join(name),
            build_dir: latex_build_dir.join(name),
        }
    }

    /// Primary `.tex` file inside the build directory.
    pub fn tex_file(&self) -> PathBuf {
        self.build_file(SOURCE_EXTENSION)
    }

    /// Compiled PDF inside the build directory.
    pub fn artifact(&self) -> PathBuf {
        self.build_file(ARTIFACT_EXTENSION)
    }

    pub fn artifact_file_name(&self) -> String {
        format!("{}.{}", self.name, ARTIFACT_EXTENSION)
    }

    /// Where the publisher puts the PDF: `<output_dir>/<name>.pdf`.
    pub fn published_artifact(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.artifact_file_name())
    }

    pub fn bib_file_name(&self) -> String {
        format!("{}.{}", self.name, BIBLIOGRAPHY_EXTENSION)
    }

    /// `<name>.bib` in the build directory, if staging produced one.
    pub fn bib_file(&self) -> Option<PathBuf> {
        let path = self.build_file(BIBLIOGRAPHY_EXTENSION);
        path.is_file().then_some(path)
    }

    fn build_file(&self, extension: &str) -> PathBuf {
        self.build_dir.join(format!("{}.{}", self.name, extension))
    }
}

/// List the documents under `docs_root`, sorted by name.
///
/// Skips non-directories, hidden entries, the commons directory and names
/// that are not valid UTF-8.
pub fn discover_documents(
    docs_root: &Path,
    commons_dir_name: &str,
    latex_build_dir: &Path,
) -> Result<Vec<Document>> {
    let entries = fs::read_dir(docs_root)
        .with_context(|| format!("reading documents root '{}'", docs_root.display()))?;

    let mut documents = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| {
            format!("reading entry under documents root '{}'", docs_root.display())
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|part| part.to_str()) else {
            continue;
        };
        if name.starts_with('.') || name == commons_dir_name {
            continue;
        }
        documents.push(Document::new(name, docs_root, latex_build_dir));
    }

    documents.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(documents)
}
