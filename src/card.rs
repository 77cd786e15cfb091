use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub question: String,
    pub answer: String,
}

impl Card {
    pub fn new(question: &str, answer: &str) -> Result<Self> {
        let question = question.trim();
        let answer = answer.trim();
        if question.is_empty() {
            bail!("Invalid card: question is empty");
        }
        if answer.is_empty() {
            bail!("Invalid card: answer is empty");
        }

        Ok(Self {
            question: question.to_string(),
            answer: answer.to_string(),
        })
    }
}

/// Card as the model emitted it. Both fields are optional so that a missing
/// field surfaces as a validation failure instead of a JSON error for the
/// whole array.
#[derive(Debug, Default, Deserialize)]
pub struct RawCard {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

impl TryFrom<RawCard> for Card {
    type Error = anyhow::Error;

    fn try_from(raw: RawCard) -> Result<Self> {
        match (raw.question, raw.answer) {
            (Some(question), Some(answer)) => Card::new(&question, &answer),
            (None, _) => bail!("Invalid card: missing question"),
            (_, None) => bail!("Invalid card: missing answer"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: i64,
    pub owner_id: i64,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub cards: Vec<Card>,
}

/// A deck that passed validation but has not been written yet.
#[derive(Clone, Debug)]
pub struct NewDeck {
    pub owner_id: i64,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub cards: Vec<Card>,
}
