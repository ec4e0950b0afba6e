use serde::{Deserialize, Serialize};

const PREVIEW_CHARS: usize = 50;

/// Saved prompt with an optional model override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub title: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Template {
    pub fn label(&self) -> String {
        format!("{} - {}", self.title, preview(&self.prompt))
    }
}

/// First 50 chars, with `...` when cut.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
