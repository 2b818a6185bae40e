use std::io::{BufReader, Read};
use std::path::{Component, Path};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Truncate a string to `max` characters (Unicode-safe), appending an
/// ellipsis when anything was cut.
pub fn truncate(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }

    let char_count = s.chars().count();
    if char_count <= max {
        return s.to_string();
    }

    if max <= 3 {
        return s.chars().take(max).collect();
    }

    let truncated: String = s.chars().take(max - 3).collect();
    format!("{}...", truncated)
}

/// Strip characters that are illegal in file paths and normalize the
/// remainder to a safe relative path. Returns `None` when nothing
/// usable is left.
///
/// Parent-directory components and absolute prefixes are dropped so an
/// inferred path can never climb out of the working directory.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*') && !c.is_control())
        .collect();

    let mut parts = Vec::new();
    for component in Path::new(&cleaned).components() {
        if let Component::Normal(part) = component {
            let part = part.to_string_lossy();
            if !part.is_empty() {
                parts.push(part.to_string());
            }
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// How a child process's output is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Pipe stdout/stderr and collect them for the caller.
    Capture,
    /// Inherit the terminal; output goes straight to the user.
    Inherit,
}

#[derive(Debug)]
pub struct CommandRunResult {
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

/// Run a shell command line with a hard timeout.
///
/// On timeout the child is killed and `timed_out` is set; the partial
/// output collected so far is still returned in capture mode.
pub fn run_command_with_timeout(
    command_line: &str,
    cwd: &Path,
    timeout: Duration,
    mode: OutputMode,
) -> Result<CommandRunResult, String> {
    let mut command = shell_command(command_line);
    command.current_dir(cwd);

    match mode {
        OutputMode::Capture => {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        OutputMode::Inherit => {
            command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        }
    }

    let mut child = command
        .spawn()
        .map_err(|e| format!("Failed to start command: {}", e))?;

    let stdout_handle = child.stdout.take().map(|stdout| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let mut reader = BufReader::new(stdout);
            let _ = reader.read_to_end(&mut buf);
            buf
        })
    });
    let stderr_handle = child.stderr.take().map(|stderr| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let mut reader = BufReader::new(stderr);
            let _ = reader.read_to_end(&mut buf);
            buf
        })
    });

    let start = Instant::now();
    let mut timed_out = false;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    timed_out = true;
                    let _ = child.kill();
                    match child.wait() {
                        Ok(status) => break Some(status),
                        Err(_) => break None,
                    }
                }
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return Err(format!("Failed to wait for command: {}", e)),
        }
    };

    let stdout_bytes = stdout_handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default();
    let stderr_bytes = stderr_handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default();

    Ok(CommandRunResult {
        status,
        stdout: String::from_utf8_lossy(&stdout_bytes).to_string(),
        stderr: String::from_utf8_lossy(&stderr_bytes).to_string(),
        timed_out,
    })
}

fn shell_command(command_line: &str) -> Command {
    #[cfg(unix)]
    {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command_line);
        cmd
    }
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command_line);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_truncate_unicode_safe() {
        let input = "ééééé";
        assert_eq!(truncate(input, 4), "é...");
    }

    #[test]
    fn test_truncate_small_max() {
        let input = "こんにちは";
        assert_eq!(truncate(input, 3), "こんに");
        assert_eq!(truncate(input, 0), "");
    }

    #[test]
    fn test_sanitize_strips_illegal_chars() {
        assert_eq!(sanitize_filename("app<>.js"), Some("app.js".to_string()));
        assert_eq!(sanitize_filename("a|b?.txt"), Some("ab.txt".to_string()));
    }

    #[test]
    fn test_sanitize_drops_traversal_and_root() {
        assert_eq!(
            sanitize_filename("../../etc/passwd"),
            Some("etc/passwd".to_string())
        );
        assert_eq!(sanitize_filename("/tmp/x.sh"), Some("tmp/x.sh".to_string()));
    }

    #[test]
    fn test_sanitize_empty_yields_none() {
        assert_eq!(sanitize_filename("   "), None);
        assert_eq!(sanitize_filename("..."), Some("...".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_captures_output() {
        let result = run_command_with_timeout(
            "echo hello",
            Path::new("."),
            Duration::from_secs(5),
            OutputMode::Capture,
        )
        .unwrap();
        assert!(!result.timed_out);
        assert_eq!(result.stdout.trim(), "hello");
        assert!(result.status.unwrap().success());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_times_out() {
        let result = run_command_with_timeout(
            "sleep 5",
            Path::new("."),
            Duration::from_millis(200),
            OutputMode::Capture,
        )
        .unwrap();
        assert!(result.timed_out);
    }
}
