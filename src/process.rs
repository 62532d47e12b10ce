//! External tool invocation.
//!
//! Commands are described by an immutable [`ExternalCommand`] and executed
//! through a [`ToolRunner`]. [`SystemRunner`] spawns real processes; tests
//! drive the build sequence with a recording runner instead.
//!
//! # Example
//!
//! ```rust,ignore
//! use latex_builder::process::{run_checked, ExternalCommand, SystemRunner};
//!
//! let cmd = ExternalCommand::new("bibtex")
//!     .arg("paper")
//!     .cwd("target/latex/paper");
//! run_checked(&mut SystemRunner, &cmd)?;
//! ```

use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, error};

/// Lines of captured output echoed when a tool fails.
const FAILURE_TAIL_LINES: usize = 20;

/// One external process invocation: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: PathBuf,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.as_os_str().to_owned());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// File name of the program, e.g. `pdflatex` for `/opt/tex/bin/pdflatex`.
    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes external commands synchronously.
pub trait ToolRunner {
    fn run(&mut self, command: &ExternalCommand) -> Result<ToolOutput>;
}

/// Runs commands as child processes, capturing their output.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&mut self, command: &ExternalCommand) -> Result<ToolOutput> {
        let mut process = Command::new(&command.program);
        process.args(&command.args);
        if let Some(dir) = &command.cwd {
            process.current_dir(dir);
        }

        debug!(command = %command, cwd = ?command.cwd, "spawning process");

        let output = process
            .output()
            .with_context(|| format!("failed to launch: {command}"))?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run `command` and fail unless it exits with status 0.
///
/// The error names the full command line.
pub fn run_checked(runner: &mut dyn ToolRunner, command: &ExternalCommand) -> Result<ToolOutput> {
    debug!(command = %command, "running {}", command.tool_name());
    let output = runner.run(command)?;
    if output.success() {
        return Ok(output);
    }

    log_failure_tail(command, &output);
    let status = match output.code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    };
    bail!(
        "{} terminated with {}; error code returned for: {}",
        command.tool_name(),
        status,
        command
    )
}

fn log_failure_tail(command: &ExternalCommand, output: &ToolOutput) {
    for (stream, text) in [("stdout", &output.stdout), ("stderr", &output.stderr)] {
        let lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() {
            continue;
        }
        let tail = lines[lines.len().saturating_sub(FAILURE_TAIL_LINES)..].join("\n");
        error!(tool = %command.tool_name(), stream, "{tail}");
    }
}
