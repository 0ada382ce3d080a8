//! evalify-providers: sheet recognition integrations.
//!
//! Implements the `Recognizer` trait for Gemini and OpenAI-compatible vision
//! endpoints, plus a mock backend, and loads the `evalify.toml` config that
//! selects between them.

pub mod config;
pub mod gemini;
mod http;
pub mod mock;
pub mod openai;

pub use config::{create_recognizer, load_config, EvalifyConfig, RecognizerConfig};
