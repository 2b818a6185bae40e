//! The response-to-action pipeline
//!
//! Turns a model's free-text reply into filesystem and shell actions:
//!
//! ```text
//! raw text -> fenced blocks -> { inferred files, command lines }
//!          -> orchestrator -> side effects + outcome log
//! ```
//!
//! Each stage only consumes what the previous stage produced. File and
//! command attribution is heuristic; the safety check is an advisory
//! denylist, not isolation. Callers get every per-item result back in a
//! [`PipelineOutcome`] instead of console output.

pub mod attribute;
pub mod blocks;
pub mod commands;
pub mod execute;
pub mod safety;

pub use attribute::InferredFile;
pub use blocks::CodeBlock;
pub use execute::{ActionOutcome, ExecuteOptions, ExecutionResult, Executor, PipelineOutcome};
pub use safety::SafetyVerdict;

use std::path::Path;

/// What a response parsed into, before anything touches the disk.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub files: Vec<InferredFile>,
    pub commands: Vec<String>,
}

impl ParsedResponse {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.commands.is_empty()
    }
}

/// Parse a response without executing anything. Useful for previews.
pub fn parse_response(response: &str) -> ParsedResponse {
    let blocks = blocks::extract_blocks(response);
    let files = attribute::infer_files(response, &blocks);
    let commands = commands::extract_commands(&blocks);
    ParsedResponse { files, commands }
}

/// Parse a response and apply it: write the inferred files, then run
/// the command list, starting from `cwd`.
///
/// One run at a time; see [`execute::Executor`] for the sequencing and
/// failure-handling contract.
pub fn run_pipeline(response: &str, cwd: &Path, options: ExecuteOptions) -> PipelineOutcome {
    let parsed = parse_response(response);
    // The file list and the command list are computed independently; a
    // shell block with a filename is both written and executed.
    Executor::new(cwd.to_path_buf(), options).apply(&parsed.files, &parsed.commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn fast_options() -> ExecuteOptions {
        ExecuteOptions {
            command_delay: Duration::from_millis(1),
            follow_process_cwd: false,
            ..ExecuteOptions::default()
        }
    }

    #[test]
    fn test_parse_splits_files_and_commands() {
        let response = "Create `app.py`:\n```python\nprint('hi')\n```\nThen run:\n```bash\npython app.py\n```";
        let parsed = parse_response(response);
        assert_eq!(parsed.files.len(), 2); // shell block also infers a .sh file
        assert_eq!(parsed.files[0].path, "app.py");
        assert_eq!(parsed.commands, vec!["python app.py"]);
    }

    #[test]
    fn test_python_block_never_contributes_commands() {
        let response = "```python\nrm -rf /\nls -la\n```";
        let parsed = parse_response(response);
        assert!(parsed.commands.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_end_to_end_writes_then_runs() {
        let tmp = TempDir::new().unwrap();
        let response = "\
Save this file: greeting.txt\n\
```text\nhello\n```\n\
```bash\ncat greeting.txt\n```";

        let outcome = run_pipeline(response, tmp.path(), fast_options());

        // File writes precede command execution, so cat sees the file.
        // Two writes (greeting.txt + the fallback-named script), then
        // one command.
        assert_eq!(outcome.actions.len(), 3);
        match &outcome.actions[2] {
            ActionOutcome::CommandRun { result, .. } => {
                assert!(result.success);
                assert_eq!(result.stdout.trim(), "hello");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_shell_block_is_both_written_and_run() {
        let tmp = TempDir::new().unwrap();
        let response = "```bash\necho hi\n```";
        let outcome = run_pipeline(response, tmp.path(), fast_options());

        // The file list and command list are independent: the block is
        // saved under its fallback script name and its line executes.
        assert!(tmp.path().join("file0.sh").exists());
        assert!(outcome
            .actions
            .iter()
            .any(|a| matches!(a, ActionOutcome::CommandRun { .. })));
    }

    #[test]
    fn test_prose_only_response_is_not_actionable() {
        let tmp = TempDir::new().unwrap();
        let outcome = run_pipeline("No code here, just advice.", tmp.path(), fast_options());
        assert!(outcome.nothing_actionable());
    }
}
