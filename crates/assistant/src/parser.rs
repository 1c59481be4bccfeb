//! Response parser: model text in, structured response out.
//!
//! Fenced blocks (three backticks, optional language tag) become
//! [`CodeBlock`]s; the prose around them becomes the display message.
//! Parsing never fails. Degenerate input gets a fallback message.

use daycoach_core::provider::Usage;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Shown when the model produced nothing usable.
pub const FALLBACK_MESSAGE: &str =
    "Sorry, I could not put an answer together. Please try rephrasing your question.";

/// Shown when the model answered with code only.
pub const CODE_ONLY_MESSAGE: &str = "Here is a code example:";

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*([^\s`]*)[^\n]*\n(.*?)```").expect("fence pattern is valid")
});

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("blank-run pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Canonical language name, `plaintext` when unknown.
    pub language: String,
    /// Trimmed, never empty.
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantResponse {
    pub message: String,
    /// `None` when the text held no non-empty blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_examples: Option<Vec<CodeBlock>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl AssistantResponse {
    /// A plain text response without code or metadata.
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code_examples: None,
            model: None,
            usage: None,
        }
    }

    pub fn with_metadata(mut self, model: impl Into<String>, usage: Option<Usage>) -> Self {
        self.model = Some(model.into());
        self.usage = usage;
        self
    }

    pub fn code_block_count(&self) -> usize {
        self.code_examples.as_ref().map_or(0, Vec::len)
    }
}

pub fn parse_response(raw: &str) -> AssistantResponse {
    let mut blocks = Vec::new();
    let mut prose = String::with_capacity(raw.len());
    let mut last = 0;

    for caps in FENCED_BLOCK.captures_iter(raw) {
        let (Some(whole), Some(tag), Some(body)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        prose.push_str(&raw[last..whole.start()]);
        prose.push('\n');
        last = whole.end();

        let code = body.as_str().trim();
        if code.is_empty() {
            continue;
        }
        blocks.push(CodeBlock {
            language: normalize_language(tag.as_str()).to_string(),
            code: code.to_string(),
        });
    }
    prose.push_str(&raw[last..]);

    let message = BLANK_RUNS.replace_all(&prose, "\n\n").trim().to_string();
    let message = match (message.is_empty(), blocks.is_empty()) {
        (false, _) => message,
        (true, false) => CODE_ONLY_MESSAGE.to_string(),
        (true, true) => FALLBACK_MESSAGE.to_string(),
    };

    AssistantResponse {
        message,
        code_examples: (!blocks.is_empty()).then_some(blocks),
        model: None,
        usage: None,
    }
}

/// Message followed by each code block, fenced again.
pub fn format_for_display(response: &AssistantResponse) -> String {
    let mut out = response.message.clone();
    for block in response.code_examples.iter().flatten() {
        out.push_str("\n\n```");
        out.push_str(&block.language);
        out.push('\n');
        out.push_str(&block.code);
        out.push_str("\n```");
    }
    out
}

/// Map a fence tag to its canonical language name.
pub fn normalize_language(tag: &str) -> &'static str {
    match tag.trim().to_ascii_lowercase().as_str() {
        "js" | "javascript" | "jsx" | "node" | "mjs" => "javascript",
        "ts" | "typescript" | "tsx" => "typescript",
        "py" | "python" | "python3" => "python",
        "c++" | "cpp" | "cxx" | "cc" | "hpp" => "cpp",
        "cs" | "c#" | "csharp" => "csharp",
        "c" | "h" => "c",
        "java" => "java",
        "go" | "golang" => "go",
        "rs" | "rust" => "rust",
        "kt" | "kotlin" => "kotlin",
        "swift" => "swift",
        "rb" | "ruby" => "ruby",
        "php" => "php",
        "sh" | "bash" | "shell" | "zsh" | "console" => "bash",
        "sql" => "sql",
        "html" | "htm" => "html",
        "css" => "css",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        _ => "plaintext",
    }
}
