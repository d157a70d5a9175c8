//! External tool execution and the per-operation command ledger.
//!
//! Every backend operation is a short sequence of tool invocations. Each one
//! is recorded as a [`CommandResult`] in a [`Ledger`] that is handed back to
//! the caller, successful or not.
//!
//! Directory scoping never touches the process working directory: tools are
//! given an explicit directory flag where they have one (`git -C`, `hg -R`,
//! location arguments for svn and bzr), and [`run_in_dir`] sets the working
//! directory of the child process only, so concurrent operations in different
//! repositories cannot observe each other.

use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use utils::shell::resolve_executable_path_blocking;

use crate::error::VcsError;

/// One external tool invocation: the reconstructed command line and the
/// combined stdout/stderr text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    command: String,
    output: String,
}

impl CommandResult {
    pub fn new(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn output(&self) -> &str {
        &self.output
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cmd: {}, output:", self.command)?;
        write_indented(f, &self.output)
    }
}

/// Ordered, append-only record of the commands run for one operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    results: Vec<CommandResult>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, result: CommandResult) {
        self.results.push(result);
    }

    pub fn all(&self) -> &[CommandResult] {
        &self.results
    }

    /// The most recent invocation, `None` before anything ran
    pub fn last(&self) -> Option<&CommandResult> {
        self.results.last()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Append every entry of `other`, keeping order
    pub fn extend(&mut self, other: Ledger) {
        self.results.extend(other.results);
    }

    pub(crate) fn merged(mut self, other: Ledger) -> Self {
        self.extend(other);
        self
    }

    /// Run `tool` and record the invocation. On failure the returned error
    /// carries this ledger, including the failing entry.
    pub fn run<I, S>(&mut self, tool: &str, args: I) -> Result<&CommandResult, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let outcome = run(tool, args);
        self.record(outcome)
    }

    /// Like [`Ledger::run`], with the child process started in `dir`.
    pub fn run_in_dir<I, S>(
        &mut self,
        dir: &Path,
        tool: &str,
        args: I,
    ) -> Result<&CommandResult, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let outcome = run_in_dir(dir, tool, args);
        self.record(outcome)
    }

    fn record(
        &mut self,
        outcome: Result<CommandResult, VcsError>,
    ) -> Result<&CommandResult, VcsError> {
        match outcome {
            Ok(result) => {
                self.results.push(result);
                let last = self.results.len() - 1;
                Ok(&self.results[last])
            }
            Err(VcsError::ToolFailure { reason, results }) => {
                self.extend(results);
                Err(VcsError::ToolFailure {
                    reason,
                    results: self.clone(),
                })
            }
            Err(other) => Err(other),
        }
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, result) in self.results.iter().enumerate() {
            writeln!(f, "cmd {}: {}, output {}:", i + 1, result.command, i + 1)?;
            if result.output.trim().is_empty() {
                writeln!(f, "[No output from command]")?;
            } else {
                write_indented(f, &result.output)?;
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a CommandResult;
    type IntoIter = std::slice::Iter<'a, CommandResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

fn write_indented(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    for line in text.lines() {
        writeln!(f, "  {line}")?;
    }
    Ok(())
}

/// Run `tool` with `args` and capture its combined output.
///
/// Empty arguments are dropped. The error is a [`VcsError::ToolFailure`]
/// whenever the tool cannot be started or exits non-zero; its ledger holds
/// the single failed invocation.
pub fn run<I, S>(tool: &str, args: I) -> Result<CommandResult, VcsError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    execute(None, tool, args)
}

/// Run `tool` as a child process whose working directory is `dir`.
pub fn run_in_dir<I, S>(dir: &Path, tool: &str, args: I) -> Result<CommandResult, VcsError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    execute(Some(dir), tool, args)
}

fn execute<I, S>(dir: Option<&Path>, tool: &str, args: I) -> Result<CommandResult, VcsError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args: Vec<String> = args
        .into_iter()
        .map(|arg| arg.as_ref().to_string())
        .filter(|arg| !arg.is_empty())
        .collect();
    let command_line = std::iter::once(tool)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");

    let Some(executable) = resolve_executable_path_blocking(tool) else {
        return Err(failure(
            CommandResult::new(command_line, ""),
            format!("{tool} executable not found or not runnable"),
        ));
    };

    let mut cmd = Command::new(executable);
    cmd.args(&args);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    tracing::trace!(dir = ?dir, "Running command: {}", command_line);

    let output = match cmd.output() {
        Ok(output) => output,
        Err(e) => {
            return Err(failure(
                CommandResult::new(command_line, ""),
                format!("failed to start {tool}: {e}"),
            ));
        }
    };

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    let result = CommandResult::new(command_line, combined);

    if output.status.success() {
        Ok(result)
    } else {
        tracing::debug!(status = %output.status, "Command failed: {}", result.command());
        Err(failure(result, format!("{tool} exited with {}", output.status)))
    }
}

fn failure(result: CommandResult, reason: String) -> VcsError {
    let mut results = Ledger::new();
    results.add(result);
    VcsError::ToolFailure { reason, results }
}
