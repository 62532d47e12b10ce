//! Preflight checks for the TeX toolchain.
//!
//! Validates that the tools a run will invoke are installed before any
//! document is staged, so a missing `bibtex` does not surface halfway
//! through a batch.
//!
//! # Example
//!
//! ```rust,ignore
//! use latex_builder::{preflight::check_required_tools, BuildConfig, LatexBuilder, SystemRunner};
//!
//! let builder = LatexBuilder::new(BuildConfig::default(), SystemRunner);
//! if let Err(e) = check_required_tools(builder.config(), &builder.documents()?) {
//!     eprintln!("{e}");
//! }
//! ```

use anyhow::{bail, Result};

use crate::config::BuildConfig;
use crate::document::Document;
use crate::sequence::{BIBLIOGRAPHY_TOOL, COMPILER, GLOSSARY_TOOL};

/// Needed by every run, with the package that usually provides it.
pub const COMPILER_TOOLS: &[(&str, &str)] = &[(COMPILER, "texlive-latex-base")];

/// Only needed when some document ships `<name>.bib`.
pub const BIBLIOGRAPHY_TOOLS: &[(&str, &str)] = &[(BIBLIOGRAPHY_TOOL, "texlive-binaries")];

/// Only needed when `make_glossaries` is enabled.
pub const GLOSSARY_TOOLS: &[(&str, &str)] = &[(GLOSSARY_TOOL, "texlive-latex-extra")];

/// Check whether `tool` resolves under the configured binaries path or on PATH.
pub fn tool_exists(config: &BuildConfig, tool: &str) -> bool {
    match &config.binaries_path {
        Some(base) if !base.as_os_str().is_empty() => config.executable(tool).is_file(),
        _ => which::which(tool).is_ok(),
    }
}

/// Whether staging will give any of `documents` a `<name>.bib`.
///
/// The file can come from the document's own directory or from the commons
/// overlay.
pub fn needs_bibliography(config: &BuildConfig, documents: &[Document]) -> bool {
    let commons = config.commons_dir();
    documents.iter().any(|document| {
        let bib = document.bib_file_name();
        document.source_dir.join(&bib).is_file() || commons.join(&bib).is_file()
    })
}

/// Check the tools a run over `documents` with `config` will invoke.
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` listing every missing tool and its package
pub fn check_required_tools(config: &BuildConfig, documents: &[Document]) -> Result<()> {
    let mut tools: Vec<(&str, &str)> = COMPILER_TOOLS.to_vec();
    if needs_bibliography(config, documents) {
        tools.extend_from_slice(BIBLIOGRAPHY_TOOLS);
    }
    if config.make_glossaries {
        tools.extend_from_slice(GLOSSARY_TOOLS);
    }

    let missing: Vec<String> = tools
        .iter()
        .filter(|(tool, _)| !tool_exists(config, tool))
        .map(|(tool, package)| format!("  {} (install: {})", tool, package))
        .collect();

    if !missing.is_empty() {
        let location = match &config.binaries_path {
            Some(base) => format!("under '{}'", base.display()),
            None => "on PATH".to_string(),
        };
        bail!(
            "Missing required LaTeX tools {}:\n{}",
            location,
            missing.join("\n")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// A binaries directory holding `tools`, plus one document `paper`.
    fn host(temp: &TempDir, tools: &[&str], with_bib: bool) -> (BuildConfig, Vec<Document>) {
        let bin = temp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        for tool in tools {
            fs::write(bin.join(tool), "").unwrap();
        }
        let config = BuildConfig {
            docs_root: temp.path().join("docs"),
            binaries_path: Some(bin),
            ..BuildConfig::default()
        };
        let doc = Document::new("paper", &config.docs_root, &config.latex_build_dir());
        fs::create_dir_all(&doc.source_dir).unwrap();
        fs::write(doc.source_dir.join("paper.tex"), "").unwrap();
        if with_bib {
            fs::write(doc.source_dir.join("paper.bib"), "").unwrap();
        }
        (config, vec![doc])
    }

    #[test]
    fn test_tool_exists_on_path() {
        let config = BuildConfig::default();
        // 'sh' should exist on any Unix system
        assert!(tool_exists(&config, "sh"));
        assert!(!tool_exists(&config, "definitely_not_a_real_command_12345"));
    }

    #[test]
    fn test_binaries_path_lookup() {
        let temp = TempDir::new().unwrap();
        let (config, documents) = host(&temp, &["pdflatex", "bibtex"], true);

        assert!(tool_exists(&config, "pdflatex"));
        assert!(check_required_tools(&config, &documents).is_ok());
    }

    #[test]
    fn test_bibtex_not_required_without_bibliography() {
        let temp = TempDir::new().unwrap();
        let (config, documents) = host(&temp, &["pdflatex"], false);

        assert!(!needs_bibliography(&config, &documents));
        assert!(check_required_tools(&config, &documents).is_ok());
    }

    #[test]
    fn test_bibtex_required_with_bibliography() {
        let temp = TempDir::new().unwrap();
        let (config, documents) = host(&temp, &["pdflatex"], true);

        let err = check_required_tools(&config, &documents).unwrap_err();
        assert!(err.to_string().contains("bibtex"));
    }

    #[test]
    fn test_commons_bibliography_counts() {
        let temp = TempDir::new().unwrap();
        let (config, documents) = host(&temp, &["pdflatex"], false);
        fs::create_dir_all(config.commons_dir()).unwrap();
        fs::write(config.commons_dir().join("paper.bib"), "").unwrap();

        assert!(needs_bibliography(&config, &documents));
    }

    #[test]
    fn test_glossary_tool_required_only_when_enabled() {
        let temp = TempDir::new().unwrap();
        let (config, documents) = host(&temp, &["pdflatex", "bibtex"], true);
        assert!(check_required_tools(&config, &documents).is_ok());

        let config = BuildConfig {
            make_glossaries: true,
            ..config
        };
        let err = check_required_tools(&config, &documents).unwrap_err();
        assert!(err.to_string().contains("makeglossaries"));
    }

    #[test]
    fn test_missing_tools_are_listed() {
        let temp = TempDir::new().unwrap();
        let (_, documents) = host(&temp, &[], true);
        let config = BuildConfig {
            binaries_path: Some(PathBuf::from("/nonexistent/texlive/bin")),
            ..BuildConfig::default()
        };
        let msg = check_required_tools(&config, &documents).unwrap_err().to_string();
        assert!(msg.contains("pdflatex"));
        assert!(msg.contains("bibtex"));
    }
}
