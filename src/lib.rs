//! Incremental builder for trees of LaTeX documents.
//!
//! Every subdirectory of the documents root is one document. A run stages
//! each document into its own build directory, decides from file timestamps
//! whether its PDF is out of date, drives `pdflatex`, `bibtex` and
//! `makeglossaries` through the usual multi-pass sequence, and copies the
//! resulting PDFs into the build output directory.
//!
//! # Architecture
//!
//! ```text
//! <docs_root>/<name>/ ──► stage ──► <latex_build_dir>/<name>/
//!                                        │
//!                        freshness ◄─────┤  (published PDF vs original .tex/.bib)
//!                                        │
//!                sequence: [pdflatex bibtex] [makeglossaries] pdflatex pdflatex
//!                                        │
//!                                     publish ──► <build_dir>/<name>.pdf
//! ```
//!
//! Documents are processed sequentially and the first failure ends the run.
//!
//! # Example
//!
//! ```rust,ignore
//! use latex_builder::{BuildConfig, LatexBuilder, SystemRunner};
//!
//! let config = BuildConfig::load("latex-builder.toml".as_ref())?;
//! let summary = LatexBuilder::new(config, SystemRunner).run()?;
//! println!("built {} document(s)", summary.built.len());
//! ```

pub mod config;
pub mod document;
pub mod freshness;
pub mod orchestrator;
pub mod preflight;
pub mod process;
pub mod publish;
pub mod sequence;
pub mod stage;

pub use config::BuildConfig;
pub use document::{discover_documents, Document};
pub use freshness::{needs_rebuild, Freshness};
pub use orchestrator::{DocumentStatus, LatexBuilder, RunSummary};
pub use process::{ExternalCommand, SystemRunner, ToolOutput, ToolRunner};
pub use sequence::{build_document, plan_steps, BuildOutcome, Step};
