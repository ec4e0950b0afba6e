use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

pub const HISTORY_LIMIT: usize = 50;
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl HistoryEntry {
    /// Entry stamped with the local time.
    pub fn now(prompt: impl Into<String>, model: Option<String>) -> Self {
        Self {
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            prompt: prompt.into(),
            model,
        }
    }

    fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT).ok()
    }
}

/// Put `entry` first, dropping older entries with the same prompt (ignoring
/// case), and keep at most [`HISTORY_LIMIT`] entries.
pub fn record(history: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
    let key = entry.prompt.to_lowercase();
    history.retain(|h| h.prompt.to_lowercase() != key);
    history.insert(0, entry);
    history.truncate(HISTORY_LIMIT);
}

/// Newest first. Entries with unreadable timestamps go last.
pub fn newest_first(mut history: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
    history.sort_by_key(|h| Reverse(h.parsed_timestamp()));
    history
}
