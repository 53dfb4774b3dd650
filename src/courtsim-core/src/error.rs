//! Error types for the simulation.
//!
//! Only configuration and output paths can fail outright; the turn loop
//! itself degrades to fallbacks instead of surfacing errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Audio encoding error: {0}")]
    AudioError(String),
}
