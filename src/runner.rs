use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

/// Exit status the bootstrap uses when a module loads but exposes no `main()`.
pub const NO_ENTRY_POINT_EXIT: i32 = 87;

/// Last stderr line the bootstrap writes before exiting with
/// [`NO_ENTRY_POINT_EXIT`]; a unit exiting 87 on its own lacks it.
pub const NO_ENTRY_POINT_MARKER: &str = "scriptdeck: no callable main() in unit";

// Loads the file as a fresh module and calls its zero-argument entry point.
fn python_bootstrap() -> String {
    format!(
        r#"import importlib.util
import sys

found = importlib.util.spec_from_file_location("scriptdeck_unit", sys.argv[1])
module = importlib.util.module_from_spec(found)
found.loader.exec_module(module)
entry = getattr(module, "main", None)
if not callable(entry):
    sys.stderr.write("{NO_ENTRY_POINT_MARKER}\n")
    sys.exit({NO_ENTRY_POINT_EXIT})
entry()
"#
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    NoEntryPoint,
    Failed { detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub filename: String,
    pub outcome: RunOutcome,
    pub output: Vec<(OutputStream, String)>,
}

impl RunReport {
    pub fn failed(filename: String, detail: String) -> Self {
        Self {
            filename,
            outcome: RunOutcome::Failed { detail },
            output: Vec::new(),
        }
    }
}

/// A kind of runnable unit. Implementations must never panic or return
/// early with an error: every failure is folded into the report.
pub trait ScriptRunner {
    fn run(&self, path: &Path) -> RunReport;
}

#[derive(Debug, Clone)]
pub struct PythonRunner {
    interpreter: PathBuf,
}

impl PythonRunner {
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }
}

impl ScriptRunner for PythonRunner {
    fn run(&self, path: &Path) -> RunReport {
        let filename = file_label(path);
        let output = Command::new(&self.interpreter)
            .arg("-c")
            .arg(python_bootstrap())
            .arg(path)
            .stdin(Stdio::null())
            .output();

        let output = match output {
            Ok(output) => output,
            Err(err) => {
                return RunReport::failed(
                    filename,
                    format!("could not start {}: {err}", self.interpreter.display()),
                );
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut lines = Vec::new();
        lines.extend(
            stdout
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| (OutputStream::Stdout, line.to_string())),
        );
        lines.extend(
            stderr
                .lines()
                .filter(|line| !line.trim().is_empty() && line.trim() != NO_ENTRY_POINT_MARKER)
                .map(|line| (OutputStream::Stderr, line.to_string())),
        );

        RunReport {
            filename,
            outcome: classify_exit(output.status.code(), &stderr),
            output: lines,
        }
    }
}

pub fn classify_exit(code: Option<i32>, stderr: &str) -> RunOutcome {
    match code {
        Some(0) => RunOutcome::Completed,
        Some(NO_ENTRY_POINT_EXIT)
            if last_error_line(stderr).as_deref() == Some(NO_ENTRY_POINT_MARKER) =>
        {
            RunOutcome::NoEntryPoint
        }
        Some(code) => RunOutcome::Failed {
            detail: last_error_line(stderr).unwrap_or_else(|| format!("exited with status {code}")),
        },
        None => RunOutcome::Failed {
            detail: last_error_line(stderr)
                .unwrap_or_else(|| "terminated by signal".to_string()),
        },
    }
}

fn last_error_line(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
