//! Execution orchestrator
//!
//! Applies an inferred-file list and a command list to the filesystem:
//! all file writes first, then commands one at a time, tracking the
//! working directory across `cd` lines. The run is strictly linear —
//! writing, then executing, then a final summary — and no failure stops
//! the batch; every outcome is recorded and returned to the caller
//! instead of printed.

use super::attribute::InferredFile;
use super::safety::{check_command, SafetyVerdict};
use crate::util::{run_command_with_timeout, OutputMode};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Result of one executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub error_message: Option<String>,
}

/// One recorded step of a pipeline run, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    FileWritten {
        path: PathBuf,
        /// Where the previous content was copied, when one existed.
        backup: Option<PathBuf>,
    },
    WriteFailed {
        path: PathBuf,
        error: String,
    },
    DirectoryChanged {
        dir: PathBuf,
    },
    DirectoryNotFound {
        command: String,
    },
    CommandBlocked {
        command: String,
        reason: &'static str,
    },
    CommandRun {
        command: String,
        result: ExecutionResult,
    },
}

/// Everything a pipeline run produced, plus where it ended up.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub actions: Vec<ActionOutcome>,
    /// Working directory after all `cd` lines were honored.
    pub working_dir: PathBuf,
    /// Directory listing after the run; `None` when there was nothing
    /// actionable in the response.
    pub listing: Option<Vec<String>>,
}

impl PipelineOutcome {
    pub fn nothing_actionable(&self) -> bool {
        self.listing.is_none()
    }
}

/// Command prefixes that get inherited terminal I/O and the long
/// timeout. Kept as a plain data table so it can be extended without
/// touching the execution logic.
pub const LONG_RUNNING_PREFIXES: &[&str] = &[
    "npm install",
    "npm i",
    "yarn add",
    "yarn install",
    "pnpm install",
    "pip install",
    "pip3 install",
    "cargo install",
    "apt install",
    "apt-get install",
    "brew install",
    "gem install",
    "composer install",
];

/// Tunables for one run. The defaults match interactive use; tests
/// shrink the delays.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Copy existing files aside before overwriting them.
    pub backup_on_overwrite: bool,
    /// Timeout for ordinary, output-captured commands.
    pub capture_timeout: Duration,
    /// Timeout for long-running installer commands.
    pub long_running_timeout: Duration,
    /// Settle delay after each command, so its side effects are visible
    /// to the next one.
    pub command_delay: Duration,
    /// Prefix table for the long-running classification.
    pub long_running_prefixes: Vec<String>,
    /// Also move the real process working directory on `cd`, so tools
    /// spawned outside the pipeline agree with the tracked value.
    /// Tests turn this off to avoid mutating global process state.
    pub follow_process_cwd: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            backup_on_overwrite: true,
            capture_timeout: Duration::from_secs(30),
            long_running_timeout: Duration::from_secs(120),
            command_delay: Duration::from_millis(500),
            long_running_prefixes: LONG_RUNNING_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            follow_process_cwd: true,
        }
    }
}

/// Sequences file writes, then command execution, for a single run.
///
/// Not re-entrant: one executor handles one response, and callers must
/// serialize runs. The tracked working directory is mutated only here.
pub struct Executor {
    cwd: PathBuf,
    options: ExecuteOptions,
}

impl Executor {
    pub fn new(cwd: PathBuf, options: ExecuteOptions) -> Self {
        Self { cwd, options }
    }

    /// Run the full write-then-execute sequence.
    pub fn apply(mut self, files: &[InferredFile], commands: &[String]) -> PipelineOutcome {
        let mut actions = Vec::new();

        for file in files {
            actions.push(self.write_file(file));
        }

        for (i, command) in commands.iter().enumerate() {
            actions.push(self.run_command(command));
            if i + 1 < commands.len() {
                thread::sleep(self.options.command_delay);
            }
        }

        let listing = if actions.is_empty() {
            None
        } else {
            Some(list_directory(&self.cwd))
        };

        PipelineOutcome {
            actions,
            working_dir: self.cwd,
            listing,
        }
    }

    fn write_file(&self, file: &InferredFile) -> ActionOutcome {
        let target = self.cwd.join(&file.path);

        match self.write_with_backup(&target, &file.content) {
            Ok(backup) => ActionOutcome::FileWritten {
                path: target,
                backup,
            },
            Err(error) => ActionOutcome::WriteFailed {
                path: target,
                error,
            },
        }
    }

    fn write_with_backup(&self, target: &Path, content: &str) -> Result<Option<PathBuf>, String> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }

        let backup = if self.options.backup_on_overwrite && target.exists() {
            let backup_path = backup_path_for(target);
            fs::copy(target, &backup_path)
                .map_err(|e| format!("Failed to back up {}: {}", target.display(), e))?;
            Some(backup_path)
        } else {
            None
        };

        fs::write(target, content)
            .map_err(|e| format!("Failed to write {}: {}", target.display(), e))?;
        Ok(backup)
    }

    fn run_command(&mut self, command: &str) -> ActionOutcome {
        if let Some(target) = parse_cd(command) {
            return self.change_directory(command, target);
        }

        if let SafetyVerdict::Block(reason) = check_command(command) {
            return ActionOutcome::CommandBlocked {
                command: command.to_string(),
                reason,
            };
        }

        let (mode, timeout) = if self.is_long_running(command) {
            (OutputMode::Inherit, self.options.long_running_timeout)
        } else {
            (OutputMode::Capture, self.options.capture_timeout)
        };

        let result = match run_command_with_timeout(command, &self.cwd, timeout, mode) {
            Ok(run) => {
                if run.timed_out {
                    ExecutionResult {
                        success: false,
                        exit_code: run.status.and_then(|s| s.code()),
                        stdout: run.stdout,
                        stderr: run.stderr,
                        error_message: Some(format!(
                            "Timed out after {}s",
                            timeout.as_secs()
                        )),
                    }
                } else {
                    let exit_code = run.status.and_then(|s| s.code());
                    let success = run.status.map(|s| s.success()).unwrap_or(false);
                    ExecutionResult {
                        success,
                        exit_code,
                        stdout: run.stdout,
                        stderr: run.stderr,
                        error_message: if success {
                            None
                        } else {
                            Some(format!("Exit code {}", exit_code.unwrap_or(-1)))
                        },
                    }
                }
            }
            Err(error) => ExecutionResult {
                success: false,
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
                error_message: Some(error),
            },
        };

        ActionOutcome::CommandRun {
            command: command.to_string(),
            result,
        }
    }

    fn change_directory(&mut self, command: &str, target: &str) -> ActionOutcome {
        // `cd` with no argument stays put; the pipeline never wanders
        // to $HOME on its own.
        if target.is_empty() {
            return ActionOutcome::DirectoryChanged {
                dir: self.cwd.clone(),
            };
        }

        let candidate = if Path::new(target).is_absolute() {
            PathBuf::from(target)
        } else {
            self.cwd.join(target)
        };

        match candidate.canonicalize() {
            Ok(resolved) if resolved.is_dir() => {
                self.cwd = resolved.clone();
                if self.options.follow_process_cwd {
                    let _ = std::env::set_current_dir(&resolved);
                }
                ActionOutcome::DirectoryChanged { dir: resolved }
            }
            _ => ActionOutcome::DirectoryNotFound {
                command: command.to_string(),
            },
        }
    }

    fn is_long_running(&self, command: &str) -> bool {
        self.options.long_running_prefixes.iter().any(|prefix| {
            // Word-boundary prefix match: "npm i" classifies
            // "npm i express" but not "npm init".
            command == prefix || command.starts_with(&format!("{} ", prefix))
        })
    }
}

fn parse_cd(command: &str) -> Option<&str> {
    let rest = command.strip_prefix("cd")?;
    if rest.is_empty() {
        return Some("");
    }
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

fn backup_path_for(target: &Path) -> PathBuf {
    let timestamp = chrono::Utc::now().timestamp();
    PathBuf::from(format!("{}.backup.{}", target.display(), timestamp))
}

fn list_directory(dir: &Path) -> Vec<String> {
    let mut entries: Vec<String> = fs::read_dir(dir)
        .map(|iter| {
            iter.filter_map(|entry| {
                entry
                    .ok()
                    .map(|e| e.file_name().to_string_lossy().to_string())
            })
            .collect()
        })
        .unwrap_or_default();
    entries.sort();
    entries
}
