//! Multi-pass build of a single document.
//!
//! A document that needs rebuilding goes through:
//!
//! ```text
//! [pdflatex, bibtex]   if <name>.bib was staged
//! [makeglossaries]     if glossaries are enabled for the run
//! pdflatex
//! pdflatex
//! publish
//! ```
//!
//! The first failing step aborts the document, and with it the run.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::BuildConfig;
use crate::document::Document;
use crate::freshness::{self, Freshness};
use crate::process::{run_checked, ExternalCommand, ToolRunner};
use crate::publish::publish_artifact;

pub const COMPILER: &str = "pdflatex";
pub const BIBLIOGRAPHY_TOOL: &str = "bibtex";
pub const GLOSSARY_TOOL: &str = "makeglossaries";
const COMPILER_FLAGS: &[&str] = &["-shell-escape", "--halt-on-error"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Compile,
    Bibliography,
    Glossary,
}

impl Step {
    /// The command this step runs for `document`, rooted in its build directory.
    pub fn command(self, document: &Document, config: &BuildConfig) -> ExternalCommand {
        let cmd = match self {
            Step::Compile => ExternalCommand::new(config.executable(COMPILER))
                .args(COMPILER_FLAGS.iter().copied())
                .arg_path(&absolute(&document.tex_file())),
            Step::Bibliography => {
                ExternalCommand::new(config.executable(BIBLIOGRAPHY_TOOL)).arg(&document.name)
            }
            Step::Glossary => {
                ExternalCommand::new(config.executable(GLOSSARY_TOOL)).arg(&document.name)
            }
        };
        cmd.cwd(&document.build_dir)
    }
}

/// Ordered steps for a staged document.
pub fn plan_steps(document: &Document, make_glossaries: bool) -> Vec<Step> {
    let mut steps = Vec::new();
    if document.bib_file().is_some() {
        steps.push(Step::Compile);
        steps.push(Step::Bibliography);
    }
    if make_glossaries {
        steps.push(Step::Glossary);
    }
    steps.push(Step::Compile);
    steps.push(Step::Compile);
    steps
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Skipped,
    Built { published: PathBuf },
}

/// Rebuild and publish `document` if its published PDF is missing or stale.
pub fn build_document(
    document: &Document,
    config: &BuildConfig,
    runner: &mut dyn ToolRunner,
) -> Result<BuildOutcome> {
    match freshness::evaluate(document, &config.build_dir)? {
        Freshness::UpToDate => {
            info!(
                document = %document.name,
                "Skipping: no LaTeX changes detected in {}",
                document.source_dir.display()
            );
            return Ok(BuildOutcome::Skipped);
        }
        Freshness::Missing => {
            info!(document = %document.name, "building: no PDF yet");
        }
        Freshness::Stale { newer } => {
            info!(
                document = %document.name,
                "building: {} changed",
                newer.display()
            );
        }
    }

    let tex_file = document.tex_file();
    if !tex_file.is_file() {
        bail!(
            "missing main source '{}' for document '{}'",
            tex_file.display(),
            document.name
        );
    }

    for step in plan_steps(document, config.make_glossaries) {
        run_checked(runner, &step.command(document, config))?;
    }

    let artifact = document.artifact();
    if !artifact.is_file() {
        bail!(
            "{} finished but '{}' was not produced",
            COMPILER,
            artifact.display()
        );
    }

    let published = publish_artifact(document, &config.build_dir)?;
    info!(document = %document.name, "published {}", published.display());
    Ok(BuildOutcome::Built { published })
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
