use ollama_assist::document::TextDocument;
use ollama_assist::host::{
    ChoicePrompt, DocumentId, Editor, InputPrompt, Notifier, OutputSink, StatusIndicator,
};
use std::io::{BufRead, Write};

const DOCUMENT: DocumentId = DocumentId(1);

/// Line-oriented host: prompts on stderr/stdin, panel on stdout, one
/// in-memory document.
pub struct TerminalHost<R> {
    input: R,
    document: TextDocument,
    panel_visible: bool,
    status: Option<String>,
    errors: usize,
}

impl<R: BufRead> TerminalHost<R> {
    pub fn new(input: R, document: TextDocument, panel_visible: bool) -> Self {
        Self {
            input,
            document,
            panel_visible,
            status: None,
            errors: 0,
        }
    }

    pub fn document(&self) -> &TextDocument {
        &self.document
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read input");
                None
            }
        }
    }
}

impl<R> Notifier for TerminalHost<R> {
    fn error(&mut self, message: &str) {
        self.errors += 1;
        eprintln!("error: {message}");
    }

    fn status_message(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

impl<R> StatusIndicator for TerminalHost<R> {
    fn set_status(&mut self, text: &str) {
        eprintln!("{text}");
        self.status = Some(text.to_string());
    }

    fn erase_status(&mut self) {
        self.status = None;
    }
}

impl<R> OutputSink for TerminalHost<R> {
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
        let mut out = std::io::stdout();
        // stdout going away is not worth failing the request over
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn insert_at_cursor(&mut self, document: DocumentId, text: &str) {
        if document != DOCUMENT {
            tracing::warn!(?document, "insert into unknown document dropped");
            return;
        }
        self.document.insert(text);
    }
}

impl<R: BufRead> ChoicePrompt for TerminalHost<R> {
    fn choose(&mut self, items: &[String]) -> Option<usize> {
        if items.is_empty() {
            return None;
        }
        for (i, item) in items.iter().enumerate() {
            eprintln!("{:>3}) {item}", i + 1);
        }
        eprint!("Select [1-{}] (empty to cancel): ", items.len());

        let line = self.read_line()?;
        let n: usize = line.trim().parse().ok()?;
        (1..=items.len()).contains(&n).then(|| n - 1)
    }
}

impl<R: BufRead> InputPrompt for TerminalHost<R> {
    fn input(&mut self, label: &str, initial: &str) -> Option<String> {
        if initial.is_empty() {
            eprint!("{label} ");
        } else {
            eprint!("{label} [{initial}] ");
        }

        let line = self.read_line()?;
        if line.is_empty() {
            return (!initial.is_empty()).then(|| initial.to_string());
        }
        Some(line)
    }
}

impl<R> Editor for TerminalHost<R> {
    fn active_document(&self) -> DocumentId {
        DOCUMENT
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
