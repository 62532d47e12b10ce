//! Workspace staging.
//!
//! Each document is copied into its own build directory, the commons
//! directory is laid over it (same-named files from commons win), and
//! version-control metadata directories are removed afterwards.
//!
//! Staging overlays rather than wipes: outputs left in the build directory by
//! a previous run, PDF and auxiliary files included, survive for inspection.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::document::Document;

/// Stage one document into its build directory.
pub fn stage_document(
    document: &Document,
    commons_dir: &Path,
    vcs_metadata_dirs: &[String],
) -> Result<()> {
    debug!(
        document = %document.name,
        build_dir = %document.build_dir.display(),
        "staging document"
    );

    copy_dir_recursive(&document.source_dir, &document.build_dir).with_context(|| {
        format!(
            "copying '{}' to '{}'",
            document.source_dir.display(),
            document.build_dir.display()
        )
    })?;

    if commons_dir.is_dir() {
        copy_dir_recursive(commons_dir, &document.build_dir).with_context(|| {
            format!(
                "copying commons '{}' to '{}'",
                commons_dir.display(),
                document.build_dir.display()
            )
        })?;
    }

    remove_metadata_dirs(&document.build_dir, vcs_metadata_dirs)
}

/// Stage every document. The first failure aborts.
pub fn stage_all(
    documents: &[Document],
    commons_dir: &Path,
    vcs_metadata_dirs: &[String],
) -> Result<()> {
    for document in documents {
        stage_document(document, commons_dir, vcs_metadata_dirs)
            .with_context(|| format!("staging document '{}'", document.name))?;
    }
    Ok(())
}

/// Recursively copy a directory over `dst`, preserving symlinks and mtimes.
///
/// Existing files in `dst` are overwritten; files only present in `dst` are kept.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    if !dst.exists() {
        fs::create_dir_all(dst)
            .with_context(|| format!("Failed to create directory: {}", dst.display()))?;
    }

    for entry in
        fs::read_dir(src).with_context(|| format!("Failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        let file_type = entry.file_type()?;

        if file_type.is_symlink() {
            let target = fs::read_link(&src_path)?;
            if dst_path.exists() || dst_path.is_symlink() {
                fs::remove_file(&dst_path)?;
            }
            std::os::unix::fs::symlink(&target, &dst_path)
                .with_context(|| format!("Failed to create symlink: {}", dst_path.display()))?;
        } else if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            copy_file_with_mtime(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

fn copy_file_with_mtime(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)
        .with_context(|| format!("Failed to copy file: {}", src.display()))?;

    let modified = fs::metadata(src)
        .and_then(|meta| meta.modified())
        .with_context(|| format!("reading mtime of '{}'", src.display()))?;
    File::open(dst)
        .and_then(|file| file.set_modified(modified))
        .with_context(|| format!("setting mtime of '{}'", dst.display()))?;
    Ok(())
}

/// Delete every directory named in `names` anywhere under `root`.
pub fn remove_metadata_dirs(root: &Path, names: &[String]) -> Result<()> {
    if names.is_empty() {
        return Ok(());
    }

    let mut walker = WalkDir::new(root).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry.with_context(|| format!("walking '{}'", root.display()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let is_metadata = entry
            .file_name()
            .to_str()
            .is_some_and(|name| names.iter().any(|candidate| candidate == name));
        if is_metadata {
            walker.skip_current_dir();
            fs::remove_dir_all(entry.path()).with_context(|| {
                format!("removing metadata directory '{}'", entry.path().display())
            })?;
            debug!(path = %entry.path().display(), "removed metadata directory");
        }
    }
    Ok(())
}
