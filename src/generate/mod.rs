//! Deck generation: prompt the model with the caller's notes, recover a card
//! array from whatever text comes back, and persist it as a new deck.

pub mod extract;
pub mod pipeline;
pub mod prompt;

use thiserror::Error;

use crate::llm::OracleError;

pub use extract::{Extraction, extract_cards};
pub use pipeline::{GenerationRequest, Generator, derive_topic};
pub use prompt::{MAX_CARDS, MIN_CARDS, RequestedCount, build_prompt};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Input(String),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("could not read cards from model output: {0}")]
    Parse(String),

    #[error("failed to save deck: {0:#}")]
    Persistence(anyhow::Error),
}
