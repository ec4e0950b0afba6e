//! Send prompts and editor text to a local model server and stream the
//! answer back into the editor.

pub mod controller;
pub mod document;
pub mod history;
pub mod host;
pub mod plugin;
pub mod provider;
pub mod registry;
pub mod request;
pub mod settings;
pub mod templates;
pub mod ui;

pub use controller::Controller;
pub use plugin::{Command, CommandError, Plugin};
pub use registry::{CancelOutcome, RequestRegistry};
pub use request::{RequestHandle, RequestId, RequestState};
pub use ui::{Outcome, UiContext, UiEvent, UiQueue};
