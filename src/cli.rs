use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stream answers from a local model server into your text.
#[derive(Debug, Parser)]
#[command(name = "ollama-assist")]
#[command(version)]
#[command(about = "Stream answers from a local model server into your text", long_about = None)]
pub struct Args {
    /// Model name (this run only; not saved)
    #[arg(short = 'm', long = "model", global = true)]
    pub model: Option<String>,

    /// Model server base URL (this run only; not saved)
    #[arg(long = "url", global = true)]
    pub url: Option<String>,

    /// Provider (default: config/provider or "ollama")
    #[arg(long = "provider", global = true)]
    pub provider: Option<String>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Clone, clap::Args)]
pub struct DocumentArgs {
    /// Document used as context and as the insertion target
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Use chars START:END of the document as the selection
    #[arg(long = "select", value_name = "START:END", value_parser = parse_range)]
    pub select: Option<(usize, usize)>,

    /// Write output into FILE instead of printing it
    #[arg(long = "write", requires = "file")]
    pub write: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send a prompt (asked for interactively when omitted)
    Ask {
        #[command(flatten)]
        doc: DocumentArgs,

        /// Prompt text
        #[arg(value_name = "PROMPT")]
        prompt: Vec<String>,
    },

    /// List models available on the server
    Models,

    /// Pick the model used for future prompts
    SelectModel,

    /// Run a saved template
    UseTemplate {
        #[command(flatten)]
        doc: DocumentArgs,
    },

    /// Save a new template
    AddTemplate,

    /// Change a saved template
    EditTemplate,

    /// Delete a saved template
    RemoveTemplate,

    /// Re-run a prompt from history
    History {
        #[command(flatten)]
        doc: DocumentArgs,
    },

    /// Forget all prompt history
    ClearHistory,

    /// Run an interactive terminal editor
    #[cfg(feature = "tui")]
    Tui {
        /// File to open in the document pane
        file: Option<PathBuf>,
    },
}

fn parse_range(s: &str) -> Result<(usize, usize), String> {
    let (a, b) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got {s:?}"))?;
    let a = a.trim().parse().map_err(|e| format!("bad START: {e}"))?;
    let b = b.trim().parse().map_err(|e| format!("bad END: {e}"))?;
    Ok((a, b))
}
