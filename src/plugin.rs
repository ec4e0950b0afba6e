use crate::controller::Controller;
use crate::history::{self, HistoryEntry};
use crate::host::Host;
use crate::provider::{GenerateError, GenerateRequest, Provider};
use crate::registry::{CancelOutcome, RequestRegistry};
use crate::request::RequestHandle;
use crate::settings::{Settings, SettingsStore};
use crate::templates::{self, Template};
use crate::ui::UiQueue;
use std::sync::Arc;
use thiserror::Error;

/// Failures reported to the user. `Display` is the message shown.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Please select a model first")]
    NoModelSelected,
    #[error("No model selected or specified in template")]
    NoTemplateModel,
    #[error("No templates defined in settings")]
    NoTemplates,
    #[error("No templates to remove")]
    NothingToRemove,
    #[error("No history available")]
    NoHistory,
    #[error("Error fetching models: {0}")]
    ListModels(#[source] GenerateError),
    #[error("Failed to save settings: {0:#}")]
    Persist(#[source] anyhow::Error),
}

/// User-facing commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SelectModel,
    Ask { prompt: Option<String> },
    UseTemplate,
    AddTemplate,
    EditTemplate,
    RemoveTemplate,
    ShowHistory,
    ClearHistory,
    CancelRequest,
    ToggleOutputPanel,
}

const USE_DEFAULT_MODEL: &str = "Use Default Model";

/// Top-level plugin object: owns settings, the request registry and the
/// controller for as long as the host keeps the plugin loaded.
pub struct Plugin<S> {
    settings: Settings<S>,
    controller: Controller,
}

impl<S: SettingsStore> Plugin<S> {
    pub fn new(
        settings: Settings<S>,
        provider: Arc<dyn Provider>,
        ui: UiQueue,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let registry = Arc::new(RequestRegistry::new());
        Self {
            settings,
            controller: Controller::new(provider, registry, ui, runtime),
        }
    }

    pub fn settings(&self) -> &Settings<S> {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<RequestRegistry> {
        self.controller.registry()
    }

    /// Run `command`, reporting any failure through the host.
    ///
    /// Returns the request it started, if any.
    pub async fn run<H: Host + ?Sized>(
        &mut self,
        command: Command,
        host: &mut H,
    ) -> Option<RequestHandle> {
        let result = match command {
            Command::SelectModel => self.select_model(host).await.map(|_| None),
            Command::Ask { prompt } => self.ask(prompt, host),
            Command::UseTemplate => self.use_template(host),
            Command::AddTemplate => self.add_template(host).await.map(|_| None),
            Command::EditTemplate => self.edit_template(host).await.map(|_| None),
            Command::RemoveTemplate => self.remove_template(host).map(|_| None),
            Command::ShowHistory => self.show_history(host),
            Command::ClearHistory => self.clear_history(host).map(|_| None),
            Command::CancelRequest => {
                self.cancel_request(host);
                Ok(None)
            }
            Command::ToggleOutputPanel => {
                toggle_output_panel(host);
                Ok(None)
            }
        };

        match result {
            Ok(handle) => handle,
            Err(e) => {
                tracing::debug!(error = %e, "command failed");
                host.error(&e.to_string());
                None
            }
        }
    }

    fn persist(&mut self) -> Result<(), CommandError> {
        self.settings.persist().map_err(CommandError::Persist)
    }

    async fn list_models(&self) -> Result<Vec<String>, GenerateError> {
        let url = self.settings.url();
        self.controller.provider().list_models(&url).await
    }

    pub async fn select_model<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<(), CommandError> {
        let models = self.list_models().await.map_err(CommandError::ListModels)?;
        let Some(index) = host.choose(&models) else {
            return Ok(());
        };
        let Some(model) = models.get(index) else {
            return Ok(());
        };
        self.settings
            .set_selected_model(model)
            .map_err(CommandError::Persist)?;
        self.persist()
    }

    /// Send `prompt` (asked for if `None`) with the selection or the whole
    /// document as context.
    pub fn ask<H: Host + ?Sized>(
        &mut self,
        prompt: Option<String>,
        host: &mut H,
    ) -> Result<Option<RequestHandle>, CommandError> {
        let prompt = match prompt {
            Some(p) => Some(p),
            None => host.input("Enter your prompt:", ""),
        };
        let Some(prompt) = prompt.filter(|p| !p.is_empty()) else {
            return Ok(None);
        };

        self.remember(&prompt);

        let model = self
            .settings
            .selected_model()
            .ok_or(CommandError::NoModelSelected)?;

        let context = match host.selection() {
            Some(selected) => {
                host.open_gap_after_selection();
                selected
            }
            None => host.document_text(),
        };

        let req = GenerateRequest::new(
            self.settings.url(),
            model,
            self.settings.system_prompt(),
            prompt,
            context,
        );
        let document = host.active_document();
        Ok(Some(self.controller.submit(req, document)))
    }

    /// Add `prompt` to history. A failed save is logged; the prompt still goes out.
    fn remember(&mut self, prompt: &str) {
        let mut entries = self.settings.history();
        history::record(
            &mut entries,
            HistoryEntry::now(prompt, self.settings.selected_model()),
        );
        let saved = self
            .settings
            .set_history(&entries)
            .and_then(|()| self.settings.persist());
        if let Err(e) = saved {
            tracing::warn!(error = %format!("{e:#}"), "failed to save prompt history");
        }
    }

    pub fn use_template<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
    ) -> Result<Option<RequestHandle>, CommandError> {
        let list = self.settings.templates();
        if list.is_empty() {
            return Err(CommandError::NoTemplates);
        }

        let labels: Vec<String> = list.iter().map(Template::label).collect();
        let Some(template) = host.choose(&labels).and_then(|i| list.get(i)) else {
            return Ok(None);
        };

        let model = template
            .model
            .clone()
            .or_else(|| self.settings.selected_model())
            .ok_or(CommandError::NoTemplateModel)?;
        self.settings
            .set_selected_model(&model)
            .map_err(CommandError::Persist)?;

        match host.input("Edit prompt:", &template.prompt) {
            Some(edited) if !edited.is_empty() => self.ask(Some(edited), host),
            _ => Ok(None),
        }
    }

    pub async fn add_template<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<(), CommandError> {
        let Some(title) = host.input("Template Title:", "") else {
            return Ok(());
        };

        let model = match self.list_models().await {
            Ok(models) => {
                let mut items = vec![USE_DEFAULT_MODEL.to_string()];
                items.extend(models);
                match host.choose(&items) {
                    Some(i) if i > 0 => items.get(i).cloned(),
                    _ => None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "model list unavailable; template keeps default model");
                None
            }
        };

        let Some(prompt) = host.input("Template Prompt:", "") else {
            return Ok(());
        };

        let mut list = self.settings.templates();
        list.push(Template {
            title,
            prompt,
            model,
        });
        self.settings
            .set_templates(&list)
            .map_err(CommandError::Persist)?;
        self.persist()?;
        host.status_message("Template added successfully");
        Ok(())
    }

    pub async fn edit_template<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<(), CommandError> {
        let mut list = self.settings.templates();
        if list.is_empty() {
            return Err(CommandError::NoTemplates);
        }

        let labels: Vec<String> = list.iter().map(Template::label).collect();
        let Some(index) = host.choose(&labels).filter(|&i| i < list.len()) else {
            return Ok(());
        };
        let current = list[index].clone();

        let title = match host.input("Edit template title:", &current.title) {
            Some(t) if !t.is_empty() => t,
            _ => return Ok(()),
        };

        let model = match self.list_models().await {
            Ok(models) => choose_template_model(host, &current, models),
            Err(e) => {
                tracing::warn!(error = %e, "model list unavailable; keeping template model");
                current.model.clone()
            }
        };

        let prompt = match host.input("Edit template prompt:", &current.prompt) {
            Some(p) if !p.is_empty() => p,
            _ => return Ok(()),
        };

        list[index] = Template {
            title,
            prompt,
            model,
        };
        self.settings
            .set_templates(&list)
            .map_err(CommandError::Persist)?;
        self.persist()?;
        host.status_message("Template updated successfully");
        Ok(())
    }

    pub fn remove_template<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<(), CommandError> {
        let mut list = self.settings.templates();
        if list.is_empty() {
            return Err(CommandError::NothingToRemove);
        }

        let labels: Vec<String> = list.iter().map(Template::label).collect();
        let Some(index) = host.choose(&labels).filter(|&i| i < list.len()) else {
            return Ok(());
        };
        list.remove(index);
        self.settings
            .set_templates(&list)
            .map_err(CommandError::Persist)?;
        self.persist()?;
        host.status_message("Template removed successfully");
        Ok(())
    }

    pub fn show_history<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
    ) -> Result<Option<RequestHandle>, CommandError> {
        let entries = history::newest_first(self.settings.history());
        if entries.is_empty() {
            return Err(CommandError::NoHistory);
        }

        let labels: Vec<String> = entries
            .iter()
            .map(|h| format!("{} - {}", h.timestamp, templates::preview(&h.prompt)))
            .collect();
        let Some(entry) = host.choose(&labels).and_then(|i| entries.get(i)) else {
            return Ok(None);
        };

        match host.input("Edit prompt:", &entry.prompt) {
            Some(prompt) if !prompt.is_empty() => self.ask(Some(prompt), host),
            _ => Ok(None),
        }
    }

    pub fn clear_history<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<(), CommandError> {
        self.settings
            .set_history(&[])
            .map_err(CommandError::Persist)?;
        self.persist()?;
        host.status_message("Ollama: History cleared");
        Ok(())
    }

    pub fn cancel_request<H: Host + ?Sized>(&self, host: &mut H) -> CancelOutcome {
        let outcome = self.registry().cancel_current();
        match outcome {
            CancelOutcome::Cancelled(_) => host.status_message("Ollama: Request cancelled"),
            CancelOutcome::NothingToCancel => {
                host.status_message("Ollama: No active request to cancel")
            }
        }
        outcome
    }

    /// Store `model` as the selected model without listing the server.
    pub fn set_selected_model(&mut self, model: &str) -> Result<(), CommandError> {
        self.settings
            .set_selected_model(model)
            .map_err(CommandError::Persist)?;
        self.persist()
    }
}

pub fn toggle_output_panel<H: Host + ?Sized>(host: &mut H) {
    if host.is_panel_visible() {
        host.hide_panel();
    } else {
        host.show_panel();
    }
}

/// Model picker for editing: default, keep current (if any), then server
/// models. Dismissing keeps the current model.
fn choose_template_model<H: Host + ?Sized>(
    host: &mut H,
    current: &Template,
    models: Vec<String>,
) -> Option<String> {
    let mut items = vec![USE_DEFAULT_MODEL.to_string()];
    let offset = match &current.model {
        Some(m) => {
            items.push(format!("Keep Current Model ({m})"));
            2
        }
        None => 1,
    };
    items.extend(models.iter().cloned());

    match host.choose(&items) {
        None => current.model.clone(),
        Some(0) => None,
        Some(i) if i < offset => current.model.clone(),
        Some(i) => models.get(i - offset).cloned().or_else(|| current.model.clone()),
    }
}
