use std::ops::Range;

/// Plain in-memory text buffer with one cursor and an optional selection.
///
/// Offsets are byte offsets and always sit on char boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocument {
    text: String,
    cursor: usize,
    selection: Option<Range<usize>>,
}

impl TextDocument {
    /// Cursor at the end of `text`.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.len();
        Self {
            text,
            cursor,
            selection: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Select chars `start..end` (char offsets, clamped to the text).
    pub fn select_chars(&mut self, start: usize, end: usize) {
        let (start, end) = (start.min(end), start.max(end));
        let start = self.byte_offset(start);
        let end = self.byte_offset(end);
        self.selection = Some(start..end);
        self.cursor = end;
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    pub fn selected_text(&self) -> Option<&str> {
        let range = self.selection.clone()?;
        let s = &self.text[range];
        (!s.is_empty()).then_some(s)
    }

    /// Insert at the cursor and move the cursor past the new text.
    pub fn insert(&mut self, text: &str) {
        self.text.insert_str(self.cursor, text);
        self.cursor += text.len();
    }

    pub fn open_gap_after_selection(&mut self) {
        let Some(range) = self.selection.take() else {
            return;
        };
        self.cursor = range.end;
        self.insert("\n\n");
    }
}
