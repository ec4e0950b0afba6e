#![cfg(feature = "tui")]

use anyhow::Context;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ollama_assist::document::TextDocument;
use ollama_assist::host::{
    ChoicePrompt, DocumentId, Editor, InputPrompt, Notifier, OutputSink, StatusIndicator,
};
use ollama_assist::settings::SettingsStore;
use ollama_assist::{ui, Command, Plugin, UiContext};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;
use std::io;
use tokio::sync::mpsc;

const DOCUMENT: DocumentId = DocumentId(1);

/// Screen state. Only touched from the UI loop.
struct TuiHost {
    document: TextDocument,
    panel: String,
    panel_visible: bool,
    status: Option<String>,
    message: Option<String>,
}

impl TuiHost {
    fn new(document: TextDocument) -> Self {
        Self {
            document,
            panel: String::new(),
            panel_visible: false,
            status: None,
            message: Some(
                "Enter sends a prompt. Ctrl+K cancel, Ctrl+O output panel, /model <name>, /clear-history, Esc quits"
                    .to_string(),
            ),
        }
    }
}

impl Notifier for TuiHost {
    fn error(&mut self, message: &str) {
        self.message = Some(format!("error: {message}"));
    }

    fn status_message(&mut self, message: &str) {
        self.message = Some(message.to_string());
    }
}

impl StatusIndicator for TuiHost {
    fn set_status(&mut self, text: &str) {
        self.status = Some(text.to_string());
    }

    fn erase_status(&mut self) {
        self.status = None;
    }
}

impl OutputSink for TuiHost {
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
        self.panel.push_str(text);
    }

    fn insert_at_cursor(&mut self, document: DocumentId, text: &str) {
        if document == DOCUMENT {
            self.document.insert(text);
        }
    }
}

const NO_PICKER: &str =
    "Pickers are not available here; use /model <name> or type the prompt and press Enter";

// No modal in this UI; say so instead of failing silently.
impl ChoicePrompt for TuiHost {
    fn choose(&mut self, _items: &[String]) -> Option<usize> {
        self.message = Some(NO_PICKER.to_string());
        None
    }
}

impl InputPrompt for TuiHost {
    fn input(&mut self, label: &str, _initial: &str) -> Option<String> {
        self.message = Some(format!("{label} {NO_PICKER}"));
        None
    }
}

impl Editor for TuiHost {
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

pub async fn run_tui<S: SettingsStore>(
    mut plugin: Plugin<S>,
    mut events: UiContext,
    document: TextDocument,
) -> anyhow::Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let (ev_tx, mut ev_rx) = mpsc::unbounded_channel::<Event>();
    std::thread::spawn(move || {
        while let Ok(ev) = crossterm::event::read() {
            if ev_tx.send(ev).is_err() {
                break;
            }
        }
    });

    let mut host = TuiHost::new(document);
    let mut input = String::new();
    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(33));

    let res = loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = draw(&mut terminal, &host, &input) {
                    break Err(e);
                }
            }
            Some(ev) = ev_rx.recv() => {
                if let Event::Key(key) = ev {
                    if handle_key(key, &mut input, &mut plugin, &mut host).await {
                        break Ok(());
                    }
                }
            }
            Some(event) = events.next() => {
                ui::dispatch(&mut host, event);
            }
        }
    };

    plugin.registry().cancel_current();

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

/// Returns true when the user asked to quit.
async fn handle_key<S: SettingsStore>(
    key: KeyEvent,
    input: &mut String,
    plugin: &mut Plugin<S>,
    host: &mut TuiHost,
) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => return true,
            KeyCode::Char('k') => {
                plugin.run(Command::CancelRequest, host).await;
            }
            KeyCode::Char('o') => {
                plugin.run(Command::ToggleOutputPanel, host).await;
            }
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Char(c) => input.push(c),
        KeyCode::Backspace => {
            input.pop();
        }
        KeyCode::Enter => {
            let msg = input.trim().to_string();
            input.clear();
            if msg.is_empty() {
                return false;
            }

            if let Some(rest) = msg.strip_prefix("/model ") {
                let model = rest.trim();
                match plugin.set_selected_model(model) {
                    Ok(()) => host.status_message(&format!("Ollama: model set to {model}")),
                    Err(e) => host.error(&e.to_string()),
                }
                return false;
            }
            if msg == "/clear-history" {
                plugin.run(Command::ClearHistory, host).await;
                return false;
            }

            plugin
                .run(Command::Ask { prompt: Some(msg) }, host)
                .await;
        }
        _ => {}
    }

    false
}

fn draw(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    host: &TuiHost,
    input: &str,
) -> anyhow::Result<()> {
    terminal.draw(|f| {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(3), Constraint::Length(1)])
            .split(f.area());

        let panes = if host.panel_visible {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
                .split(rows[0])
        } else {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(100)])
                .split(rows[0])
        };

        let doc = Paragraph::new(host.document.text().to_string())
            .block(Block::default().borders(Borders::ALL).title("document"))
            .wrap(Wrap { trim: false });
        f.render_widget(doc, panes[0]);

        if host.panel_visible {
            let panel = Paragraph::new(host.panel.clone())
                .block(Block::default().borders(Borders::ALL).title("Ollama Output"))
                .wrap(Wrap { trim: false });
            f.render_widget(panel, panes[1]);
        }

        let input_w = Paragraph::new(input.to_string())
            .block(Block::default().borders(Borders::ALL).title("prompt"));
        f.render_widget(input_w, rows[1]);

        let line = host
            .status
            .clone()
            .or_else(|| host.message.clone())
            .unwrap_or_default();
        let status = Paragraph::new(line).style(Style::default().add_modifier(Modifier::BOLD));
        f.render_widget(status, rows[2]);

        f.set_cursor_position(cursor_position(rows[1], input));
    })?;
    Ok(())
}

/// Cursor inside the bordered prompt box, clamped to its last column.
fn cursor_position(area: Rect, input: &str) -> (u16, u16) {
    let typed = u16::try_from(input.chars().count()).unwrap_or(u16::MAX);
    let x = area.x.saturating_add(1).saturating_add(typed);
    let last = area.x.saturating_add(area.width.saturating_sub(2));
    (x.min(last), area.y.saturating_add(1))
}
