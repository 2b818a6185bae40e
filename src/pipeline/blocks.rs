//! Fenced code block extraction
//!
//! Scans raw model output for triple-backtick fences and returns the
//! blocks in source order. This is the first stage of the pipeline and
//! is deliberately dumb: no nesting, no tilde fences, first closing
//! fence wins.

/// A single fenced code segment lifted out of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Language tag from the opening fence, lowercased; `"text"` when omitted.
    pub language: String,
    /// Block body with leading/trailing blank lines trimmed.
    pub content: String,
    /// Zero-based line index of the opening fence in the source text.
    /// Used by attribution to look at the prose just above the block.
    pub fence_line: usize,
}

/// Extract all fenced blocks from a response, in order of appearance.
///
/// A block that is still open when the text ends is discarded.
pub fn extract_blocks(text: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<(String, usize, Vec<&str>)> = None;

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if let Some((language, fence_line, body)) = open.take() {
            if trimmed.starts_with("```") {
                blocks.push(CodeBlock {
                    language,
                    content: trim_blank_edges(&body),
                    fence_line,
                });
            } else {
                let mut body = body;
                body.push(line);
                open = Some((language, fence_line, body));
            }
        } else if let Some(rest) = trimmed.strip_prefix("```") {
            let tag = rest.trim();
            let language = if tag.is_empty() {
                "text".to_string()
            } else {
                // Some models emit "```js title=app.js"; only the first
                // word is the language tag.
                tag.split_whitespace()
                    .next()
                    .unwrap_or("text")
                    .to_lowercase()
            };
            open = Some((language, idx, Vec::new()));
        }
    }

    blocks
}

fn trim_blank_edges(lines: &[&str]) -> String {
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map(|i| i + 1)
        .unwrap_or(start);
    lines[start..end].join("\n")
}
