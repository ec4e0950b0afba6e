mod app;
mod cli;
mod config;
mod paths;
mod terminal;

#[cfg(feature = "tui")]
mod tui;

use anyhow::Context;
use clap::Parser;
use ollama_assist::document::TextDocument;
use ollama_assist::settings::{FileSettings, Settings};
use ollama_assist::{Command, Plugin, RequestHandle, UiContext, UiQueue};
use terminal::TerminalHost;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = cli::Args::parse();

    let dirs = paths::AppDirs::from_env()?;
    let cfg = config::Config::load_optional(dirs.config_file())?;
    tracing::debug!(?dirs, ?cfg, "resolved config");

    let http = app::build_http(cfg.as_ref())?;
    let provider_name = args
        .provider
        .clone()
        .or_else(|| cfg.as_ref().and_then(|c| c.provider.clone()))
        .unwrap_or_else(|| "ollama".to_string());
    let provider = app::build_provider(&http, &provider_name)?;

    let defaults = cfg.clone().unwrap_or_default().defaults();
    let store = FileSettings::open(dirs.settings_file())?;
    let settings = Settings::new(store, defaults).with_overrides(args.url.clone(), args.model.clone());

    let (queue, ui) = UiQueue::channel();
    let mut plugin = Plugin::new(
        settings,
        provider.clone(),
        queue,
        tokio::runtime::Handle::current(),
    );

    let (command, doc) = match args.cmd {
        cli::Command::Models => {
            let url = plugin.settings().url();
            let models = provider
                .list_models(&url)
                .await
                .context("failed to list models")?;
            for m in models {
                println!("{m}");
            }
            return Ok(());
        }
        #[cfg(feature = "tui")]
        cli::Command::Tui { file } => {
            let document = load_document(file.as_deref(), None)?;
            return tui::run_tui(plugin, ui, document).await;
        }
        cli::Command::Ask { doc, prompt } => {
            let prompt = prompt.join(" ");
            let prompt = (!prompt.trim().is_empty()).then_some(prompt);
            (Command::Ask { prompt }, Some(doc))
        }
        cli::Command::UseTemplate { doc } => (Command::UseTemplate, Some(doc)),
        cli::Command::History { doc } => (Command::ShowHistory, Some(doc)),
        cli::Command::SelectModel => (Command::SelectModel, None),
        cli::Command::AddTemplate => (Command::AddTemplate, None),
        cli::Command::EditTemplate => (Command::EditTemplate, None),
        cli::Command::RemoveTemplate => (Command::RemoveTemplate, None),
        cli::Command::ClearHistory => (Command::ClearHistory, None),
    };

    let file = doc.as_ref().and_then(|d| d.file.clone());
    let document = load_document(file.as_deref(), doc.as_ref().and_then(|d| d.select))?;

    // Without a file the output panel (stdout) receives the text.
    let mut host = TerminalHost::new(std::io::stdin().lock(), document, file.is_none());

    if let Some(handle) = plugin.run(command, &mut host).await {
        drive(&plugin, ui, &mut host, &handle).await;
    }

    match (file, doc) {
        (Some(path), Some(doc)) if doc.write => {
            std::fs::write(&path, host.document().text())
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        (Some(_), Some(_)) => print!("{}", host.document().text()),
        (None, Some(_)) => println!(),
        _ => {}
    }

    if host.errors() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn load_document(
    path: Option<&std::path::Path>,
    select: Option<(usize, usize)>,
) -> anyhow::Result<TextDocument> {
    let mut document = match path {
        Some(p) => TextDocument::new(
            std::fs::read_to_string(p).with_context(|| format!("failed to read {}", p.display()))?,
        ),
        None => TextDocument::default(),
    };
    if let Some((start, end)) = select {
        document.select_chars(start, end);
    }
    Ok(document)
}

/// Pump UI events until the request ends; Ctrl+C cancels it.
async fn drive<S, R>(
    plugin: &Plugin<S>,
    mut ui: UiContext,
    host: &mut TerminalHost<R>,
    handle: &RequestHandle,
) where
    S: ollama_assist::settings::SettingsStore,
    R: std::io::BufRead,
{
    let mut cancel_sent = false;
    loop {
        tokio::select! {
            outcome = ui.run_until_finished(host, handle.id()) => {
                tracing::debug!(?outcome, "request finished");
                return;
            }
            res = tokio::signal::ctrl_c(), if !cancel_sent => {
                if let Err(e) = res {
                    tracing::warn!(error = %e, "failed to listen for Ctrl+C");
                }
                cancel_sent = true;
                plugin.registry().cancel_current();
            }
        }
    }
}
