//! Services the editor provides to the plugin.
//!
//! Everything here is called on the host's UI context only.

/// Opaque handle to an editor document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(pub u64);

pub trait Notifier {
    /// Modal or otherwise prominent error report.
    fn error(&mut self, message: &str);

    /// Transient status-bar message.
    fn status_message(&mut self, message: &str);
}

/// The persistent "request in progress" indicator.
pub trait StatusIndicator {
    fn set_status(&mut self, text: &str);
    fn erase_status(&mut self);
}

/// Where generated text goes.
pub trait OutputSink {
    fn is_panel_visible(&self) -> bool;
    fn show_panel(&mut self);
    fn hide_panel(&mut self);
    fn write_to_panel(&mut self, text: &str);
    fn insert_at_cursor(&mut self, document: DocumentId, text: &str);
}

pub trait ChoicePrompt {
    /// Index of the picked item, or `None` if dismissed.
    fn choose(&mut self, items: &[String]) -> Option<usize>;
}

pub trait InputPrompt {
    /// Entered text, or `None` if dismissed.
    fn input(&mut self, label: &str, initial: &str) -> Option<String>;
}

pub trait Editor {
    fn active_document(&self) -> DocumentId;

    /// Text of the primary selection, if it is non-empty.
    fn selection(&self) -> Option<String>;

    fn document_text(&self) -> String;

    /// Collapse the selection, insert a blank line after it and put the
    /// cursor there, so output lands below the selected text.
    fn open_gap_after_selection(&mut self);
}

/// What the UI context needs to apply request events.
pub trait UiHost: Notifier + StatusIndicator + OutputSink {}

impl<T: Notifier + StatusIndicator + OutputSink + ?Sized> UiHost for T {}

/// Everything plugin commands need.
pub trait Host: UiHost + ChoicePrompt + InputPrompt + Editor {}

impl<T: UiHost + ChoicePrompt + InputPrompt + Editor + ?Sized> Host for T {}
