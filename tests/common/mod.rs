#![allow(dead_code)]

use ollama_assist::document::TextDocument;
use ollama_assist::host::{
    ChoicePrompt, DocumentId, Editor, InputPrompt, Notifier, OutputSink, StatusIndicator,
};
use ollama_assist::provider::{Fragments, GenerateRequest, Provider, ProviderFuture};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const DOC: DocumentId = DocumentId(7);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Panel(String),
    Document(String),
}

/// Host double that records every call and answers prompts from queues.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub document: TextDocument,
    pub panel_visible: bool,
    pub writes: Vec<Write>,
    pub status: Option<String>,
    pub status_sets: usize,
    pub status_clears: usize,
    pub errors: Vec<String>,
    pub messages: Vec<String>,
    pub choices: VecDeque<Option<usize>>,
    pub inputs: VecDeque<Option<String>>,
    pub offered: Vec<Vec<String>>,
    pub asked: Vec<(String, String)>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(text: &str) -> Self {
        Self {
            document: TextDocument::new(text),
            ..Self::default()
        }
    }

    pub fn choose_next(mut self, choice: Option<usize>) -> Self {
        self.choices.push_back(choice);
        self
    }

    pub fn input_next(mut self, input: Option<&str>) -> Self {
        self.inputs.push_back(input.map(str::to_string));
        self
    }

    pub fn written(&self) -> Vec<String> {
        self.writes
            .iter()
            .map(|w| match w {
                Write::Panel(s) | Write::Document(s) => s.clone(),
            })
            .collect()
    }
}

impl Notifier for RecordingHost {
    fn error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn status_message(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

impl StatusIndicator for RecordingHost {
    fn set_status(&mut self, text: &str) {
        self.status_sets += 1;
        self.status = Some(text.to_string());
    }

    fn erase_status(&mut self) {
        self.status_clears += 1;
        self.status = None;
    }
}

impl OutputSink for RecordingHost {
    fn is_panel_visible(&self) -> bool {
        self.panel_visible
    }

    fn show_panel(&mut self) {
        self.panel_visible = true;
    }

    fn hide_panel(&mut self) {
        self.panel_visible = false;
    }

    fn write_to_panel(&mut self, text: &str) {
        self.writes.push(Write::Panel(text.to_string()));
    }

    fn insert_at_cursor(&mut self, document: DocumentId, text: &str) {
        assert_eq!(document, DOC);
        self.document.insert(text);
        self.writes.push(Write::Document(text.to_string()));
    }
}

impl ChoicePrompt for RecordingHost {
    fn choose(&mut self, items: &[String]) -> Option<usize> {
        self.offered.push(items.to_vec());
        self.choices.pop_front().flatten()
    }
}

impl InputPrompt for RecordingHost {
    fn input(&mut self, label: &str, initial: &str) -> Option<String> {
        self.asked.push((label.to_string(), initial.to_string()));
        self.inputs.pop_front().flatten()
    }
}

impl Editor for RecordingHost {
    fn active_document(&self) -> DocumentId {
        DOC
    }

    fn selection(&self) -> Option<String> {
        self.document.selected_text().map(str::to_string)
    }

    fn document_text(&self) -> String {
        self.document.text().to_string()
    }

    fn open_gap_after_selection(&mut self) {
        self.document.open_gap_after_selection();
    }
}

/// Provider that records requests and answers with a fixed model list and
/// an empty stream.
#[derive(Debug, Clone, Default)]
pub struct CapturingProvider {
    pub models: Vec<String>,
    pub requests: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl CapturingProvider {
    pub fn with_models(models: &[&str]) -> Self {
        Self {
            models: models.iter().map(|m| m.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Provider for CapturingProvider {
    fn name(&self) -> &'static str {
        "capture"
    }

    fn list_models(&self, _base_url: &str) -> ProviderFuture<Vec<String>> {
        let models = self.models.clone();
        Box::pin(async move { Ok(models) })
    }

    fn generate(&self, req: GenerateRequest) -> ProviderFuture<Fragments> {
        self.requests.lock().unwrap().push(req);
        Box::pin(async move {
            let empty: Vec<Result<String, ollama_assist::provider::GenerateError>> = Vec::new();
            Ok(Box::pin(tokio_stream::iter(empty)) as Fragments)
        })
    }
}
