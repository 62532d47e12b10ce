//! Mtime-based freshness of a document's PDF.
//!
//! The published PDF in the output directory is compared against every
//! `.tex` and `.bib` file under the document's original source directory,
//! symlinks included. Equal timestamps count as fresh; touching a file
//! without changing it still forces a rebuild because no content is inspected.
//!
//! The PDF in the build directory is not consulted: the first compile pass
//! writes it before bibliography and final passes run, so it exists even
//! after a failed build.

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

use crate::document::{Document, BIBLIOGRAPHY_EXTENSION, SOURCE_EXTENSION};

const WATCHED_EXTENSIONS: &[&str] = &[SOURCE_EXTENSION, BIBLIOGRAPHY_EXTENSION];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// Nothing published for this document yet.
    Missing,
    /// A source file is strictly newer than the published PDF.
    Stale { newer: PathBuf },
    UpToDate,
}

impl Freshness {
    pub fn needs_rebuild(&self) -> bool {
        !matches!(self, Freshness::UpToDate)
    }
}

/// Decide whether `document` has to be rebuilt, given where PDFs are published.
pub fn evaluate(document: &Document, output_dir: &Path) -> Result<Freshness> {
    let artifact = document.published_artifact(output_dir);
    let Some(artifact_time) = mtime(&artifact)? else {
        return Ok(Freshness::Missing);
    };

    match newest_source_after(&document.source_dir, artifact_time)? {
        Some(newer) => Ok(Freshness::Stale { newer }),
        None => Ok(Freshness::UpToDate),
    }
}

pub fn needs_rebuild(document: &Document, output_dir: &Path) -> Result<bool> {
    Ok(evaluate(document, output_dir)?.needs_rebuild())
}

/// First watched source under `dir` whose mtime is strictly after `threshold`.
fn newest_source_after(dir: &Path, threshold: SystemTime) -> Result<Option<PathBuf>> {
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            // Dangling symlinks point at nothing that could be newer.
            Err(err) if is_dangling_link(&err) => {
                debug!(path = ?err.path(), "ignoring dangling symlink");
                continue;
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("scanning sources in '{}'", dir.display()))
            }
        };
        if !entry.file_type().is_file() || !is_watched(entry.path()) {
            continue;
        }
        let modified = entry
            .metadata()
            .map_err(anyhow::Error::from)
            .and_then(|meta| Ok(meta.modified()?))
            .with_context(|| format!("reading mtime of '{}'", entry.path().display()))?;
        if modified > threshold {
            return Ok(Some(entry.into_path()));
        }
    }
    Ok(None)
}

fn is_dangling_link(err: &walkdir::Error) -> bool {
    let not_found = err
        .io_error()
        .is_some_and(|io| io.kind() == ErrorKind::NotFound);
    not_found && err.path().is_some_and(|path| path.is_symlink())
}

fn is_watched(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WATCHED_EXTENSIONS.contains(&ext))
}

fn mtime(path: &Path) -> Result<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(meta) => {
            let modified = meta
                .modified()
                .with_context(|| format!("reading mtime of '{}'", path.display()))?;
            Ok(Some(modified))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("inspecting '{}'", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn write_with_mtime(path: &Path, content: &str, time: SystemTime) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    /// Document plus the output directory its PDF is published to.
    fn document(temp: &TempDir) -> (Document, PathBuf) {
        let doc = Document::new(
            "paper",
            &temp.path().join("docs"),
            &temp.path().join("target/latex"),
        );
        fs::create_dir_all(&doc.build_dir).unwrap();
        (doc, temp.path().join("target"))
    }

    #[test]
    fn missing_artifact_needs_rebuild() {
        let temp = TempDir::new().unwrap();
        let (doc, out) = document(&temp);
        write_with_mtime(&doc.source_dir.join("paper.tex"), "x", at(100));

        assert_eq!(evaluate(&doc, &out).unwrap(), Freshness::Missing);
        assert!(needs_rebuild(&doc, &out).unwrap());
    }

    #[test]
    fn build_dir_pdf_alone_is_not_published() {
        let temp = TempDir::new().unwrap();
        let (doc, out) = document(&temp);
        write_with_mtime(&doc.source_dir.join("paper.tex"), "x", at(100));
        // Left behind by a first pass whose build later failed.
        write_with_mtime(&doc.artifact(), "pdf", at(900));

        assert_eq!(evaluate(&doc, &out).unwrap(), Freshness::Missing);
    }

    #[test]
    fn older_and_equal_sources_are_fresh() {
        let temp = TempDir::new().unwrap();
        let (doc, out) = document(&temp);
        write_with_mtime(&doc.source_dir.join("paper.tex"), "x", at(100));
        write_with_mtime(&doc.source_dir.join("paper.bib"), "x", at(200));
        write_with_mtime(&doc.published_artifact(&out), "pdf", at(200));

        assert_eq!(evaluate(&doc, &out).unwrap(), Freshness::UpToDate);
        assert!(!needs_rebuild(&doc, &out).unwrap());
    }

    #[test]
    fn newer_nested_source_is_stale() {
        let temp = TempDir::new().unwrap();
        let (doc, out) = document(&temp);
        let chapter = doc.source_dir.join("chapters/intro.tex");
        write_with_mtime(&doc.source_dir.join("paper.tex"), "x", at(100));
        write_with_mtime(&chapter, "x", at(301));
        write_with_mtime(&doc.published_artifact(&out), "pdf", at(300));

        assert_eq!(
            evaluate(&doc, &out).unwrap(),
            Freshness::Stale { newer: chapter }
        );
    }

    #[test]
    fn newer_bibliography_is_stale() {
        let temp = TempDir::new().unwrap();
        let (doc, out) = document(&temp);
        write_with_mtime(&doc.source_dir.join("paper.tex"), "x", at(100));
        write_with_mtime(&doc.source_dir.join("refs.bib"), "x", at(500));
        write_with_mtime(&doc.published_artifact(&out), "pdf", at(300));

        assert!(needs_rebuild(&doc, &out).unwrap());
    }

    #[test]
    fn symlinked_source_is_followed() {
        let temp = TempDir::new().unwrap();
        let (doc, out) = document(&temp);
        let shared = temp.path().join("shared/chapter.tex");
        write_with_mtime(&doc.source_dir.join("paper.tex"), "x", at(100));
        write_with_mtime(&shared, "x", at(900));
        let link = doc.source_dir.join("chapter.tex");
        std::os::unix::fs::symlink(&shared, &link).unwrap();
        write_with_mtime(&doc.published_artifact(&out), "pdf", at(300));

        assert_eq!(evaluate(&doc, &out).unwrap(), Freshness::Stale { newer: link });
    }

    #[test]
    fn dangling_symlink_is_ignored() {
        let temp = TempDir::new().unwrap();
        let (doc, out) = document(&temp);
        write_with_mtime(&doc.source_dir.join("paper.tex"), "x", at(100));
        std::os::unix::fs::symlink(
            temp.path().join("gone.tex"),
            doc.source_dir.join("gone.tex"),
        )
        .unwrap();
        write_with_mtime(&doc.published_artifact(&out), "pdf", at(300));

        assert_eq!(evaluate(&doc, &out).unwrap(), Freshness::UpToDate);
    }

    #[test]
    fn unwatched_extensions_are_ignored() {
        let temp = TempDir::new().unwrap();
        let (doc, out) = document(&temp);
        write_with_mtime(&doc.source_dir.join("paper.tex"), "x", at(100));
        write_with_mtime(&doc.source_dir.join("figure.png"), "x", at(900));
        write_with_mtime(&doc.source_dir.join("style.sty"), "x", at(900));
        write_with_mtime(&doc.published_artifact(&out), "pdf", at(300));

        assert!(!needs_rebuild(&doc, &out).unwrap());
    }

    #[test]
    fn staged_copies_do_not_count_as_sources() {
        let temp = TempDir::new().unwrap();
        let (doc, out) = document(&temp);
        write_with_mtime(&doc.source_dir.join("paper.tex"), "x", at(100));
        write_with_mtime(&doc.build_dir.join("paper.tex"), "x", at(900));
        write_with_mtime(&doc.published_artifact(&out), "pdf", at(300));

        assert!(!needs_rebuild(&doc, &out).unwrap());
    }
}
