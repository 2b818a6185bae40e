//! File attribution
//!
//! Decides, per extracted block, whether it represents a file and what
//! path it should be written to. Everything here is best-effort
//! heuristic text mining: a wrong guess is a nuisance, not a bug, and
//! callers must treat the result accordingly.
//!
//! The cascade is evaluated in a fixed order and the first rule that
//! produces a path wins:
//!   1. a filename comment on the block's first line
//!   2. a hint in the prose just above the opening fence
//!   3. inference from the language tag and block content

use super::blocks::CodeBlock;
use crate::util::sanitize_filename;
use regex::Regex;
use std::sync::OnceLock;

/// A block the resolver decided is a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredFile {
    /// Sanitized relative path, never empty.
    pub path: String,
    /// File body; the filename comment line, if any, has been removed.
    pub content: String,
    /// Language tag of the originating block.
    pub source_language: String,
}

/// How many prose lines above the fence are searched for a filename hint.
const HINT_WINDOW: usize = 3;

struct HintPatterns {
    /// "create/save/write/update (a/the) file (named/called) app.py"
    verb_file: Regex,
    /// "file: app.py" / "File - app.py"
    file_colon: Regex,
    /// bare "app.py:" or "app.py file"
    bare_name: Regex,
}

fn hint_patterns() -> &'static HintPatterns {
    static PATTERNS: OnceLock<HintPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| HintPatterns {
        verb_file: Regex::new(
            r"(?i)\b(?:create|save|write|update)\b[^`\n]*?\bfile\b[\s,]*(?:named|called)?[\s:]*`?([A-Za-z0-9_][A-Za-z0-9_./-]*\.[A-Za-z0-9]+)`?",
        )
        .unwrap(),
        file_colon: Regex::new(
            r"(?i)\bfile\s*[:\-]\s*`?([A-Za-z0-9_][A-Za-z0-9_./-]*\.[A-Za-z0-9]+)`?",
        )
        .unwrap(),
        bare_name: Regex::new(
            r"`?([A-Za-z0-9_][A-Za-z0-9_./-]*\.[A-Za-z0-9]+)`?\s*(?::|-|\bfile\b)",
        )
        .unwrap(),
    })
}

/// Resolve every block in `blocks` against the raw response text.
///
/// Returns at most one `InferredFile` per block, preserving block order.
pub fn infer_files(text: &str, blocks: &[CodeBlock]) -> Vec<InferredFile> {
    let lines: Vec<&str> = text.lines().collect();
    let mut files = Vec::new();

    for (index, block) in blocks.iter().enumerate() {
        if block.content.trim().is_empty() {
            continue;
        }
        if let Some(file) = infer_file(&lines, block, index) {
            files.push(file);
        }
    }

    files
}

fn infer_file(text_lines: &[&str], block: &CodeBlock, index: usize) -> Option<InferredFile> {
    // Rule 1: filename comment on the first content line. A block that
    // is empty once the comment is removed yields no file at all.
    if let Some((path, rest)) = filename_from_comment(&block.content) {
        if rest.trim().is_empty() {
            return None;
        }
        return Some(InferredFile {
            path,
            content: rest,
            source_language: block.language.clone(),
        });
    }

    // Rule 2: prose hint above the opening fence, nearest line first.
    if let Some(path) = filename_from_context(text_lines, block.fence_line) {
        return Some(InferredFile {
            path,
            content: block.content.clone(),
            source_language: block.language.clone(),
        });
    }

    // Rule 3: fall back to the language tag and content shape.
    let path = filename_from_content(block, index)?;
    Some(InferredFile {
        path,
        content: block.content.clone(),
        source_language: block.language.clone(),
    })
}

/// Rule 1: `// app.js`, `# config.yml`, or `/* style.css */` as the first
/// line. The comment line is stripped from the returned content.
fn filename_from_comment(content: &str) -> Option<(String, String)> {
    let mut lines = content.lines();
    let first = lines.next()?.trim();

    let candidate = if let Some(rest) = first.strip_prefix("//") {
        rest.trim()
    } else if let Some(rest) = first.strip_prefix("/*") {
        rest.trim_end_matches("*/").trim()
    } else if let Some(rest) = first.strip_prefix('#') {
        // A shebang is not a filename comment.
        if rest.starts_with('!') {
            return None;
        }
        rest.trim()
    } else {
        return None;
    };

    if candidate.is_empty() || !candidate.contains('.') || candidate.contains(char::is_whitespace) {
        return None;
    }

    let path = sanitize_filename(candidate)?;
    let rest: Vec<&str> = lines.collect();
    Some((path, rest.join("\n")))
}

/// Rule 2: scan up to [`HINT_WINDOW`] lines above the fence.
fn filename_from_context(text_lines: &[&str], fence_line: usize) -> Option<String> {
    let patterns = hint_patterns();

    for line in text_lines[..fence_line].iter().rev().take(HINT_WINDOW) {
        for rule in [&patterns.verb_file, &patterns.file_colon, &patterns.bare_name] {
            if let Some(caps) = rule.captures(line) {
                if let Some(path) = sanitize_filename(&caps[1]) {
                    return Some(path);
                }
            }
        }
    }

    None
}

/// Rule 3: language-tag default extension plus a handful of content
/// special cases for common block shapes.
fn filename_from_content(block: &CodeBlock, index: usize) -> Option<String> {
    let ext = extension_for(&block.language)?;
    let content = &block.content;

    if block.language == "json" && content.contains("\"name\"") {
        return Some("package.json".to_string());
    }

    let base = if looks_like_server(content) {
        "server".to_string()
    } else if looks_like_module(content) {
        "index".to_string()
    } else {
        format!("file{}", index)
    };

    sanitize_filename(&format!("{}{}", base, ext))
}

fn extension_for(language: &str) -> Option<&'static str> {
    let ext = match language {
        "python" | "py" => ".py",
        "javascript" | "js" => ".js",
        "typescript" | "ts" => ".ts",
        "rust" => ".rs",
        "bash" | "sh" | "shell" | "zsh" => ".sh",
        "json" => ".json",
        "html" => ".html",
        "css" => ".css",
        "toml" => ".toml",
        "yaml" | "yml" => ".yml",
        "sql" => ".sql",
        "go" => ".go",
        "c" => ".c",
        "cpp" | "c++" => ".cpp",
        "java" => ".java",
        "ruby" | "rb" => ".rb",
        "php" => ".php",
        "text" | "txt" | "markdown" | "md" => ".txt",
        _ => return None,
    };
    Some(ext)
}

fn looks_like_server(content: &str) -> bool {
    ["app.listen(", ".listen(", "createServer(", "app.run(", "HttpServer::new"]
        .iter()
        .any(|idiom| content.contains(idiom))
}

fn looks_like_module(content: &str) -> bool {
    ["module.exports", "export default", "export {"]
        .iter()
        .any(|idiom| content.contains(idiom))
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
    fn test_filename_comment_wins_and_is_stripped() {
        let b = block("javascript", "// app.js\nconsole.log('hi');");
        let files = infer_files("```javascript\n// app.js\nconsole.log('hi');\n```", &[b]);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "app.js");
        assert_eq!(files[0].content, "console.log('hi');");
    }

    #[test]
    fn test_hash_comment_filename() {
        let b = block("python", "# scripts/run.py\nprint(1)");
        let (path, rest) = filename_from_comment(&b.content).unwrap();
        assert_eq!(path, "scripts/run.py");
        assert_eq!(rest, "print(1)");
    }

    #[test]
    fn test_block_comment_filename() {
        let (path, _) = filename_from_comment("/* style.css */\nbody {}").unwrap();
        assert_eq!(path, "style.css");
    }

    #[test]
    fn test_shebang_is_not_a_filename() {
        assert!(filename_from_comment("#!/usr/bin/env python\nprint(1)").is_none());
    }

    #[test]
    fn test_comment_with_prose_is_not_a_filename() {
        assert!(filename_from_comment("// this writes to main.py eventually\nx").is_none());
    }

    #[test]
    fn test_context_hint_create_file() {
        let text = "Now create a file called app.py with:\n```python\nprint(1)\n```";
        let mut b = block("python", "print(1)");
        b.fence_line = 1;
        let files = infer_files(text, &[b]);
        assert_eq!(files[0].path, "app.py");
    }

    #[test]
    fn test_context_hint_file_colon() {
        let lines = vec!["File: src/main.rs", "```rust"];
        assert_eq!(
            filename_from_context(&lines, 1),
            Some("src/main.rs".to_string())
        );
    }

    #[test]
    fn test_context_hint_bare_name_with_separator() {
        let lines = vec!["`config.toml`:", "```toml"];
        assert_eq!(
            filename_from_context(&lines, 1),
            Some("config.toml".to_string())
        );
    }

    #[test]
    fn test_context_nearest_line_wins() {
        let lines = vec!["File: old.py", "File: new.py", "```python"];
        assert_eq!(filename_from_context(&lines, 2), Some("new.py".to_string()));
    }

    #[test]
    fn test_context_window_is_three_lines() {
        let lines = vec!["File: far.py", "a", "b", "c", "```python"];
        assert_eq!(filename_from_context(&lines, 4), None);
    }

    #[test]
    fn test_json_with_name_field_is_package_manifest() {
        let b = block("json", "{\n  \"name\": \"demo\",\n  \"version\": \"1.0.0\"\n}");
        assert_eq!(
            filename_from_content(&b, 0),
            Some("package.json".to_string())
        );
    }

    #[test]
    fn test_server_idiom_gets_server_name() {
        let b = block("javascript", "const app = express();\napp.listen(3000);");
        assert_eq!(filename_from_content(&b, 0), Some("server.js".to_string()));
    }

    #[test]
    fn test_module_export_gets_index_name() {
        let b = block("javascript", "module.exports = { x: 1 };");
        assert_eq!(filename_from_content(&b, 2), Some("index.js".to_string()));
    }

    #[test]
    fn test_generic_fallback_uses_block_index() {
        let b = block("python", "x = 1");
        assert_eq!(filename_from_content(&b, 4), Some("file4.py".to_string()));
    }

    #[test]
    fn test_unknown_language_yields_no_file() {
        let b = block("mermaid", "graph TD");
        assert!(infer_files("", std::slice::from_ref(&b)).is_empty());
    }

    #[test]
    fn test_empty_block_yields_no_file() {
        let b = block("python", "   ");
        assert!(infer_files("", std::slice::from_ref(&b)).is_empty());
    }
}
