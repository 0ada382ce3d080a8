//! evalify-core: OMR answer-sheet evaluation core.
//!
//! This crate defines the data model, the answer-key registry, the scoring
//! engine, result and notification persistence, and the pipeline that ties
//! them to a recognition backend.

pub mod engine;
pub mod error;
pub mod model;
pub mod notifications;
pub mod parser;
pub mod registry;
pub mod results;
pub mod scoring;
pub mod statistics;
pub mod store;
pub mod traits;

pub use error::{EvalError, RecognitionError, StoreError};
