//! Whole-run orchestration: discover, stage, build, publish.
//!
//! Documents are processed one at a time in name order. Every document is
//! staged before any tool runs. The first error stops the run; documents
//! already published stay published and build directories are never
//! cleaned up, so failed builds can be inspected.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use tracing::info;

use crate::config::BuildConfig;
use crate::document::{discover_documents, Document};
use crate::freshness::{self, Freshness};
use crate::process::ToolRunner;
use crate::sequence::{build_document, BuildOutcome};
use crate::stage::stage_all;

const LOCK_FILENAME: &str = ".latex-builder.lock";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub built: Vec<String>,
    pub skipped: Vec<String>,
}

/// Freshness of one document as reported by [`LatexBuilder::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStatus {
    pub document: Document,
    pub freshness: Freshness,
}

pub struct LatexBuilder<R: ToolRunner> {
    config: BuildConfig,
    runner: R,
}

impl<R: ToolRunner> LatexBuilder<R> {
    pub fn new(config: BuildConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn documents(&self) -> Result<Vec<Document>> {
        discover_documents(
            &self.config.docs_root,
            &self.config.commons_dir_name,
            &self.config.latex_build_dir(),
        )
    }

    /// Build every document that needs it.
    pub fn run(&mut self) -> Result<RunSummary> {
        self.config.validate()?;
        let latex_build_dir = self.config.latex_build_dir();
        let _lock = WorkspaceLock::acquire(&latex_build_dir)?;

        let documents = self.documents()?;
        info!(
            count = documents.len(),
            docs_root = %self.config.docs_root.display(),
            "discovered documents"
        );

        stage_all(
            &documents,
            &self.config.commons_dir(),
            &self.config.vcs_metadata_dirs,
        )?;

        let mut summary = RunSummary::default();
        for document in &documents {
            let outcome = build_document(document, &self.config, &mut self.runner)
                .with_context(|| format!("building document '{}'", document.name))?;
            match outcome {
                BuildOutcome::Skipped => summary.skipped.push(document.name.clone()),
                BuildOutcome::Built { .. } => summary.built.push(document.name.clone()),
            }
        }

        info!(
            built = summary.built.len(),
            skipped = summary.skipped.len(),
            "LaTeX build finished"
        );
        Ok(summary)
    }

    /// Report freshness without staging anything or running tools.
    pub fn status(&self) -> Result<Vec<DocumentStatus>> {
        self.config.validate()?;
        self.documents()?
            .into_iter()
            .map(|document| {
                let freshness = freshness::evaluate(&document, &self.config.build_dir)?;
                Ok(DocumentStatus {
                    document,
                    freshness,
                })
            })
            .collect()
    }
}

/// Exclusive lock on the LaTeX build root for the duration of a run.
///
/// The lock file itself is permanent. Unlinking it on release would let a
/// process still waiting on the old inode and a newcomer creating a fresh one
/// both believe they hold the lock.
struct WorkspaceLock {
    file: File,
}

impl WorkspaceLock {
    fn acquire(latex_build_dir: &Path) -> Result<Self> {
        fs::create_dir_all(latex_build_dir).with_context(|| {
            format!(
                "creating LaTeX build directory '{}'",
                latex_build_dir.display()
            )
        })?;
        let path = latex_build_dir.join(LOCK_FILENAME);

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to create lock file: {}", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            drop(file);
            return Err(anyhow::anyhow!(
                "LaTeX build directory is locked by another process: {}",
                path.display()
            ));
        }

        Ok(Self { file })
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
