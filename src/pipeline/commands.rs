//! Shell command extraction
//!
//! Picks the shell-tagged blocks out of a response and flattens them
//! into an ordered list of runnable lines.

use super::blocks::CodeBlock;
use regex::Regex;
use std::sync::OnceLock;

/// Language tags whose blocks are treated as shell input.
const SHELL_LANGUAGES: &[&str] = &["bash", "sh", "shell", "zsh", "console", "terminal"];

fn heredoc_terminator() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Heredoc bodies are not commands; dropping the marker lines keeps
    // partial heredocs from being executed line by line.
    PATTERN.get_or_init(|| Regex::new(r"\b(EOF|EOL|END)\b").unwrap())
}

/// Whether a language tag selects a block for command extraction.
pub fn is_shell_language(language: &str) -> bool {
    let lower = language.to_lowercase();
    SHELL_LANGUAGES.contains(&lower.as_str())
}

/// Build the ordered command list from the given blocks.
///
/// Only shell-tagged blocks contribute. Blank lines, `#` comment lines,
/// and heredoc marker lines are dropped; everything else is kept as-is,
/// preserving intra-block and inter-block order.
pub fn extract_commands(blocks: &[CodeBlock]) -> Vec<String> {
    let mut commands = Vec::new();

    for block in blocks {
        if !is_shell_language(&block.language) {
            continue;
        }
        for line in block.content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if heredoc_terminator().is_match(trimmed) {
                continue;
            }
            commands.push(trimmed.to_string());
        }
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(language: &str, content: &str) -> CodeBlock {
        CodeBlock {
            language: language.to_string(),
            content: content.to_string(),
            fence_line: 0,
        }
    }

    #[test]
    fn test_only_shell_blocks_selected() {
        let blocks = vec![
            block("python", "import os\nos.system('ls')"),
            block("bash", "echo hi"),
        ];
        assert_eq!(extract_commands(&blocks), vec!["echo hi"]);
    }

    #[test]
    fn test_language_match_is_case_insensitive() {
        let blocks = vec![block("Bash", "ls"), block("SHELL", "pwd")];
        assert_eq!(extract_commands(&blocks), vec!["ls", "pwd"]);
    }

    #[test]
    fn test_comments_blanks_and_heredoc_markers_dropped() {
        let content = "# install deps\nnpm install\n\ncat << EOF\nEOF\nnpm start";
        let commands = extract_commands(&[block("sh", content)]);
        assert_eq!(commands, vec!["npm install", "npm start"]);
    }

    #[test]
    fn test_order_preserved_across_blocks() {
        let blocks = vec![block("bash", "mkdir foo\ncd foo"), block("sh", "touch bar.txt")];
        assert_eq!(
            extract_commands(&blocks),
            vec!["mkdir foo", "cd foo", "touch bar.txt"]
        );
    }
}
