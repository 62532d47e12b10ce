//! Build configuration.
//!
//! A [`BuildConfig`] is constructed once, either from defaults, from a
//! `latex-builder.toml` file, or both with command-line overrides applied on
//! top, and is then handed to the orchestrator by value. Nothing in the crate
//! reads configuration from global state.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Default configuration file looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "latex-builder.toml";

pub const DEFAULT_DOCS_ROOT: &str = "src/main/latex";
pub const DEFAULT_COMMONS_DIR_NAME: &str = "common";
pub const DEFAULT_BUILD_DIR: &str = "target";
const LATEX_BUILD_SUBDIR: &str = "latex";
const DEFAULT_VCS_METADATA_DIRS: &[&str] = &[".svn"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Directory holding one subdirectory per document.
    pub docs_root: PathBuf,
    /// Name of the shared assets directory inside `docs_root`.
    pub commons_dir_name: String,
    /// Host build output directory; published PDFs land here.
    pub build_dir: PathBuf,
    /// Per-document staging root. Falls back to `<build_dir>/latex`.
    pub latex_build_dir: Option<PathBuf>,
    /// Installation directory of the TeX binaries. `None` means PATH lookup.
    pub binaries_path: Option<PathBuf>,
    pub make_glossaries: bool,
    /// Directory names stripped from staged build directories.
    pub vcs_metadata_dirs: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            docs_root: PathBuf::from(DEFAULT_DOCS_ROOT),
            commons_dir_name: DEFAULT_COMMONS_DIR_NAME.to_string(),
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            latex_build_dir: None,
            binaries_path: None,
            make_glossaries: false,
            vcs_metadata_dirs: DEFAULT_VCS_METADATA_DIRS
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    #[serde(default)]
    latex: LatexToml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LatexToml {
    docs_root: Option<String>,
    commons_dir_name: Option<String>,
    build_dir: Option<String>,
    latex_build_dir: Option<String>,
    binaries_path: Option<String>,
    make_glossaries: Option<bool>,
    vcs_metadata_dirs: Option<Vec<String>>,
}

impl BuildConfig {
    /// Load a TOML configuration file.
    ///
    /// Relative paths are resolved against the directory containing the file.
    /// Keys that are absent keep their default value.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config '{}'", path.display()))?;
        let parsed: ConfigToml =
            toml::from_str(&raw).with_context(|| format!("parsing config '{}'", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let latex = parsed.latex;
        let mut config = Self::default();

        config.docs_root = resolve_relative(
            base,
            latex.docs_root.as_deref().unwrap_or(DEFAULT_DOCS_ROOT),
        );
        config.build_dir = resolve_relative(
            base,
            latex.build_dir.as_deref().unwrap_or(DEFAULT_BUILD_DIR),
        );
        if let Some(name) = latex.commons_dir_name {
            config.commons_dir_name = name;
        }
        config.latex_build_dir = latex
            .latex_build_dir
            .map(|dir| resolve_relative(base, &dir));
        config.binaries_path = latex
            .binaries_path
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);
        if let Some(flag) = latex.make_glossaries {
            config.make_glossaries = flag;
        }
        if let Some(dirs) = latex.vcs_metadata_dirs {
            config.vcs_metadata_dirs = dirs;
        }

        config
            .check_commons_dir_name()
            .with_context(|| format!("invalid config '{}'", path.display()))?;
        Ok(config)
    }

    /// Root of the per-document staging directories.
    pub fn latex_build_dir(&self) -> PathBuf {
        self.latex_build_dir
            .clone()
            .unwrap_or_else(|| self.build_dir.join(LATEX_BUILD_SUBDIR))
    }

    /// Shared assets directory. It may not exist.
    pub fn commons_dir(&self) -> PathBuf {
        self.docs_root.join(&self.commons_dir_name)
    }

    /// Resolve a tool name against `binaries_path`, or leave it bare for PATH lookup.
    pub fn executable(&self, name: &str) -> PathBuf {
        match &self.binaries_path {
            Some(base) if !base.as_os_str().is_empty() => base.join(name),
            _ => PathBuf::from(name),
        }
    }

    /// Check the parts of the configuration that must hold before a run.
    pub fn validate(&self) -> Result<()> {
        if !self.docs_root.exists() {
            bail!(
                "documents root '{}' does not exist",
                self.docs_root.display()
            );
        }
        if !self.docs_root.is_dir() {
            bail!(
                "documents root '{}' is not a directory",
                self.docs_root.display()
            );
        }
        self.check_commons_dir_name()
    }

    fn check_commons_dir_name(&self) -> Result<()> {
        let mut components = Path::new(&self.commons_dir_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => bail!(
                "commons_dir_name must be a single directory name, got '{}'",
                self.commons_dir_name
            ),
        }
    }
}

fn resolve_relative(base: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}
