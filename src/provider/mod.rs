mod types;

pub mod ndjson;
#[cfg(feature = "ollama")]
pub mod ollama;
pub mod stub;

pub use types::*;
