//! External tool invocation seam.
//!
//! External tools are contract-by-convention: exit code 0 means success,
//! diagnostics arrive on stderr. The trait isolates process spawning so
//! transforms and probes can be tested without invoking real tools.

use std::ffi::OsString;
use std::io;
use std::process::Command;

/// Captured output of one external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Whether the tool exited with status 0.
    pub success: bool,
    /// Exit code (-1 if terminated by signal).
    pub exit_code: i32,
    /// Captured stdout, lossily decoded.
    pub stdout: String,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
}

/// Runs external tools as child processes, capturing their output.
pub trait ToolRunner: Send + Sync {
    /// Run `program` with `args` to completion.
    ///
    /// `Err` means the tool could not be launched at all; a non-zero exit
    /// is a successful launch and is reported through [`ToolOutput`].
    fn run(&self, program: &str, args: &[OsString]) -> io::Result<ToolOutput>;
}

/// Production runner using `std::process::Command`.
///
/// No timeout is enforced; a hung external process hangs its worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolRunner;

impl ToolRunner for SystemToolRunner {
    fn run(&self, program: &str, args: &[OsString]) -> io::Result<ToolOutput> {
        let output = Command::new(program).args(args).output()?;

        Ok(ToolOutput {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Render a command line for logging.
pub fn display_command(program: &str, args: &[OsString]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| a.to_string_lossy().to_string()));
    parts.join(" ")
}
