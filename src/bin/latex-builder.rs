use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use latex_builder::config::DEFAULT_CONFIG_FILE;
use latex_builder::preflight::check_required_tools;
use latex_builder::{BuildConfig, Freshness, LatexBuilder, SystemRunner};
use tracing_subscriber::EnvFilter;

/// Build LaTeX documents into PDFs, skipping the ones that are up to date
#[derive(Parser)]
#[command(name = "latex-builder")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug output (command lines, staging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ConfigOverrides {
    /// Configuration file (default: ./latex-builder.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory containing one subdirectory per document
    #[arg(long, global = true)]
    docs_root: Option<PathBuf>,

    /// Shared assets directory name inside the documents root
    #[arg(long, global = true)]
    commons_dir_name: Option<String>,

    /// Output directory for published PDFs
    #[arg(long, global = true)]
    build_dir: Option<PathBuf>,

    /// Staging root (default: <build-dir>/latex)
    #[arg(long, global = true)]
    latex_build_dir: Option<PathBuf>,

    /// Directory holding pdflatex, bibtex and makeglossaries
    #[arg(long, global = true)]
    binaries_path: Option<PathBuf>,

    /// Run makeglossaries for every rebuilt document (`--make-glossaries=false` turns it off)
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    make_glossaries: Option<bool>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage, compile and publish documents that are out of date (default)
    Build {
        /// Do not check for the TeX tools before building
        #[arg(long)]
        skip_preflight: bool,
    },

    /// Show which documents would be rebuilt
    Status,

    /// Check that the required TeX tools are installed
    Preflight,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = resolve_config(&cli.overrides)?;

    match cli.command.unwrap_or(Commands::Build {
        skip_preflight: false,
    }) {
        Commands::Build { skip_preflight } => cmd_build(config, skip_preflight),
        Commands::Status => cmd_status(config),
        Commands::Preflight => {
            preflight(&LatexBuilder::new(config, SystemRunner))?;
            println!("All required LaTeX tools found");
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .init();
}

fn resolve_config(overrides: &ConfigOverrides) -> Result<BuildConfig> {
    let mut config = match &overrides.config {
        Some(path) => BuildConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            BuildConfig::load(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => BuildConfig::default(),
    };

    if let Some(docs_root) = &overrides.docs_root {
        config.docs_root = docs_root.clone();
    }
    if let Some(name) = &overrides.commons_dir_name {
        config.commons_dir_name = name.clone();
    }
    if let Some(build_dir) = &overrides.build_dir {
        config.build_dir = build_dir.clone();
    }
    if let Some(dir) = &overrides.latex_build_dir {
        config.latex_build_dir = Some(dir.clone());
    }
    if let Some(path) = &overrides.binaries_path {
        config.binaries_path = (!path.as_os_str().is_empty()).then(|| path.clone());
    }
    if let Some(flag) = overrides.make_glossaries {
        config.make_glossaries = flag;
    }
    Ok(config)
}

/// Check the tools this configuration and its documents will invoke.
fn preflight(builder: &LatexBuilder<SystemRunner>) -> Result<()> {
    builder.config().validate()?;
    check_required_tools(builder.config(), &builder.documents()?)
}

fn cmd_build(config: BuildConfig, skip_preflight: bool) -> Result<()> {
    let mut builder = LatexBuilder::new(config, SystemRunner);
    if !skip_preflight {
        preflight(&builder).context("preflight failed (use --skip-preflight to bypass)")?;
    }

    let summary = builder.run().context("LaTeX build failed")?;

    println!(
        "[latex] {} built, {} up to date",
        summary.built.len(),
        summary.skipped.len()
    );
    for name in &summary.built {
        println!(
            "[latex:{name}] {}",
            builder.config().build_dir.join(format!("{name}.pdf")).display()
        );
    }
    Ok(())
}

fn cmd_status(config: BuildConfig) -> Result<()> {
    let builder = LatexBuilder::new(config, SystemRunner);
    let statuses = builder.status()?;
    if statuses.is_empty() {
        println!(
            "[latex] no documents under {}",
            builder.config().docs_root.display()
        );
        return Ok(());
    }

    for status in statuses {
        let state = match &status.freshness {
            Freshness::Missing => "missing".to_string(),
            Freshness::Stale { newer } => format!("stale ({} changed)", newer.display()),
            Freshness::UpToDate => "up to date".to_string(),
        };
        println!("[latex:{}] {state}", status.document.name);
    }
    Ok(())
}
