use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{Instrument, debug, info, info_span, warn};

use super::GenerationError;
use super::extract::extract_cards;
use super::prompt::{RequestedCount, build_prompt};
use crate::card::{Deck, NewDeck};
use crate::crud::DeckStore;
use crate::llm::{Oracle, OracleError};
use crate::utils::truncate_chars;

const TOPIC_CHARS: usize = 30;
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub source_text: String,
    pub count: RequestedCount,
}

impl GenerationRequest {
    pub fn new(source_text: impl Into<String>, count: RequestedCount) -> Self {
        Self {
            source_text: source_text.into(),
            count,
        }
    }

    /// Builds a request from loosely typed input such as an HTTP body.
    pub fn from_json(source_text: Option<&str>, count: Option<&Value>) -> Result<Self, GenerationError> {
        let source_text = source_text.unwrap_or_default();
        Ok(Self::new(source_text, RequestedCount::from_json(count)?))
    }
}

/// Deck label: the first characters of the source, always followed by an
/// ellipsis.
pub fn derive_topic(source_text: &str) -> String {
    format!("{}...", truncate_chars(source_text, TOPIC_CHARS))
}

/// Runs the whole pipeline for one request. Holds only shared, immutable
/// handles so a single instance serves concurrent requests.
#[derive(Clone)]
pub struct Generator {
    oracle: Arc<dyn Oracle>,
    store: Arc<dyn DeckStore>,
    oracle_timeout: Duration,
}

impl Generator {
    pub fn new(oracle: Arc<dyn Oracle>, store: Arc<dyn DeckStore>) -> Self {
        Self {
            oracle,
            store,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    pub fn with_oracle_timeout(mut self, oracle_timeout: Duration) -> Self {
        self.oracle_timeout = oracle_timeout;
        self
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        owner_id: i64,
    ) -> Result<Deck, GenerationError> {
        let span = info_span!("generate", owner_id, requested = request.count.get());
        self.run(request, owner_id).instrument(span).await
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        owner_id: i64,
    ) -> Result<Deck, GenerationError> {
        if request.source_text.trim().is_empty() {
            return Err(GenerationError::Input("text is required".to_string()));
        }
        debug!(source_chars = request.source_text.chars().count(), "received");

        let prompt = build_prompt(&request.source_text, request.count);
        debug!(prompt_chars = prompt.len(), "prompted");

        let raw = tokio::time::timeout(self.oracle_timeout, self.oracle.complete(&prompt))
            .await
            .map_err(|_| OracleError::Timeout(self.oracle_timeout))??;
        debug!(response_chars = raw.len(), "oracle called");

        let extraction = extract_cards(&raw, request.count).inspect_err(|err| {
            warn!("parse failed: {err}");
        })?;
        if extraction.truncated() {
            debug!(
                parsed = extraction.parsed,
                kept = extraction.cards.len(),
                "truncated"
            );
        } else {
            debug!(kept = extraction.cards.len(), "extracted as is");
        }

        let deck = self
            .store
            .insert_deck(NewDeck {
                owner_id,
                topic: derive_topic(&request.source_text),
                created_at: Utc::now(),
                cards: extraction.cards,
            })
            .await
            .map_err(GenerationError::Persistence)?;

        info!(
            deck_id = deck.id,
            cards = deck.cards.len(),
            dropped = extraction.dropped,
            "persisted"
        );
        Ok(deck)
    }
}
