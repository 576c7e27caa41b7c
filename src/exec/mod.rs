use std::fmt;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command as TokioCommand;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::capability::CapabilityError;

/// Number of trailing stderr lines kept in failure reports.
const STDERR_TAIL_LINES: usize = 20;

/// A program invocation. Arguments are passed directly, never through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs `spec` to completion and captures its output. The child is killed if
/// `cancel` fires first.
pub async fn run_capture(
    cancel: &CancellationToken,
    spec: &CommandSpec,
) -> Result<CommandOutput, CapabilityError> {
    if cancel.is_cancelled() {
        return Err(CapabilityError::Cancelled);
    }

    debug!(command = %spec, "Running external command");

    let child = TokioCommand::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                CapabilityError::ExecutionFailed(format!(
                    "command not found: {}. Please ensure it is installed and in your PATH.",
                    spec.program
                ))
            } else {
                CapabilityError::Io(err)
            }
        })?;

    let output = tokio::select! {
        _ = cancel.cancelled() => return Err(CapabilityError::Cancelled),
        output = child.wait_with_output() => output?,
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if output.status.success() {
        Ok(CommandOutput { stdout, stderr })
    } else {
        Err(CapabilityError::CommandFailed {
            program: spec.program.clone(),
            code: output.status.code(),
            stderr: tail_lines(&stderr, STDERR_TAIL_LINES),
        })
    }
}

fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
