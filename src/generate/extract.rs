use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::GenerationError;
use super::prompt::RequestedCount;
use crate::card::{Card, RawCard};
use crate::llm::OracleError;

static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?").unwrap());

#[derive(Debug, PartialEq)]
pub struct Extraction {
    pub cards: Vec<Card>,
    /// Elements in the array the model returned.
    pub parsed: usize,
    /// Elements discarded for missing or blank fields.
    pub dropped: usize,
}

impl Extraction {
    pub fn truncated(&self) -> bool {
        self.parsed - self.dropped > self.cards.len()
    }
}

/// Strips code fences and surrounding prose, leaving the span from the first
/// `[` to the last `]`.
pub fn isolate_json_array(raw: &str) -> Result<String, GenerationError> {
    if raw.trim().is_empty() {
        return Err(OracleError::EmptyResponse.into());
    }

    let unfenced = FENCE_RE.replace_all(raw, "");
    let cleaned = unfenced.trim();

    let start = cleaned
        .find('[')
        .ok_or_else(|| GenerationError::Parse("no JSON array in model output".to_string()))?;
    let end = cleaned
        .rfind(']')
        .filter(|end| *end > start)
        .ok_or_else(|| GenerationError::Parse("unterminated JSON array in model output".to_string()))?;

    Ok(cleaned[start..=end].to_string())
}

pub fn extract_cards(raw: &str, count: RequestedCount) -> Result<Extraction, GenerationError> {
    let json = isolate_json_array(raw)?;
    let values: Vec<Value> =
        serde_json::from_str(&json).map_err(|err| GenerationError::Parse(err.to_string()))?;

    let parsed = values.len();
    let mut cards = Vec::with_capacity(parsed);
    for (index, value) in values.into_iter().enumerate() {
        let card = serde_json::from_value::<RawCard>(value)
            .map_err(anyhow::Error::from)
            .and_then(Card::try_from);
        match card {
            Ok(card) => cards.push(card),
            Err(err) => warn!(index, "dropping malformed card: {err}"),
        }
    }

    let dropped = parsed - cards.len();
    if parsed > 0 && cards.is_empty() {
        return Err(GenerationError::Parse(format!(
            "none of the {parsed} items were valid question/answer pairs"
        )));
    }

    cards.truncate(count.get());

    Ok(Extraction {
        cards,
        parsed,
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn count(n: i64) -> RequestedCount {
        RequestedCount::new(n).unwrap()
    }

    fn as_json(cards: &[Card]) -> String {
        serde_json::to_string(cards).unwrap()
    }

    fn sample(n: usize) -> Vec<Card> {
        (0..n)
            .map(|i| Card::new(&format!("Question {i}?"), &format!("Answer {i}")).unwrap())
            .collect()
    }

    #[test]
    fn bare_array() {
        let extraction = extract_cards(&as_json(&sample(3)), count(3)).unwrap();
        assert_eq!(extraction.cards, sample(3));
        assert_eq!(extraction.parsed, 3);
        assert_eq!(extraction.dropped, 0);
        assert!(!extraction.truncated());
    }

    #[test]
    fn fenced_array_matches_bare_array() {
        let bare = as_json(&sample(4));
        let fenced = format!("```json\n{bare}\n```");
        let plain_fence = format!("```\n{bare}\n```");

        let expected = extract_cards(&bare, count(10)).unwrap();
        assert_eq!(extract_cards(&fenced, count(10)).unwrap(), expected);
        assert_eq!(extract_cards(&plain_fence, count(10)).unwrap(), expected);
    }

    #[test]
    fn surrounding_prose_is_ignored() {
        let raw = format!("Here you go: {} Hope that helps!", as_json(&sample(2)));
        let extraction = extract_cards(&raw, count(2)).unwrap();
        assert_eq!(extraction.cards, sample(2));
    }

    #[test]
    fn brackets_inside_answers_survive() {
        let raw = r#"Sure: [{"question": "What is [x]?", "answer": "a list [1, 2]"}] ok"#;
        let extraction = extract_cards(raw, count(1)).unwrap();
        assert_eq!(extraction.cards[0].question, "What is [x]?");
        assert_eq!(extraction.cards[0].answer, "a list [1, 2]");
    }

    #[test]
    fn surplus_is_truncated_in_order() {
        let extraction = extract_cards(&as_json(&sample(8)), count(5)).unwrap();
        assert_eq!(extraction.cards, sample(5));
        assert!(extraction.truncated());
    }

    #[test]
    fn shortfall_is_not_padded() {
        let extraction = extract_cards(&as_json(&sample(2)), count(10)).unwrap();
        assert_eq!(extraction.cards.len(), 2);
        assert!(!extraction.truncated());
    }

    #[test]
    fn empty_array_is_valid() {
        let extraction = extract_cards("[]", count(3)).unwrap();
        assert!(extraction.cards.is_empty());
        assert_eq!(extraction.parsed, 0);
    }

    #[test]
    fn empty_output_is_an_oracle_failure() {
        for raw in ["", "   \n\t"] {
            assert!(matches!(
                extract_cards(raw, count(3)),
                Err(GenerationError::Oracle(OracleError::EmptyResponse))
            ));
        }
    }

    #[test]
    fn invalid_json_is_a_parse_failure() {
        for raw in [
            "I cannot help with that.",
            "[{\"question\": \"q\", \"answer\": }]",
            "] backwards [",
            "[ never closed",
            "{\"question\": \"q\", \"answer\": \"a\"}",
        ] {
            assert!(
                matches!(extract_cards(raw, count(3)), Err(GenerationError::Parse(_))),
                "expected parse failure for {raw:?}"
            );
        }
    }

    #[test]
    fn malformed_elements_are_dropped() {
        let raw = r#"[
            {"question": "q1", "answer": "a1"},
            {"question": "q2"},
            {"front": "q3", "back": "a3"},
            {"question": 4, "answer": "a4"},
            "just a string",
            {"question": "  ", "answer": "a6"},
            {"question": "q7", "answer": "a7"}
        ]"#;
        let extraction = extract_cards(raw, count(2)).unwrap();
        assert_eq!(
            extraction.cards,
            vec![Card::new("q1", "a1").unwrap(), Card::new("q7", "a7").unwrap()]
        );
        assert_eq!(extraction.parsed, 7);
        assert_eq!(extraction.dropped, 5);
        assert!(!extraction.truncated());
    }

    #[test]
    fn all_malformed_is_a_parse_failure() {
        let raw = r#"[{"front": "q", "back": "a"}, {"question": "q"}]"#;
        assert!(matches!(
            extract_cards(raw, count(3)),
            Err(GenerationError::Parse(_))
        ));
    }

    fn card_strategy() -> impl Strategy<Value = Card> {
        ("[a-zA-Z0-9?]{1,20}", "[a-zA-Z0-9 ]{0,20}[a-z]").prop_map(|(q, a)| Card::new(&q, &a).unwrap())
    }

    proptest! {
        #[test]
        fn keeps_the_first_requested_cards(
            cards in prop::collection::vec(card_strategy(), 0..40),
            requested in 1i64..=25,
            wrapping in 0usize..3,
        ) {
            let bare = as_json(&cards);
            let raw = match wrapping {
                0 => bare,
                1 => format!("```json\n{bare}\n```"),
                _ => format!("Here are your cards:\n{bare}\nGood luck!"),
            };

            let extraction = extract_cards(&raw, count(requested)).unwrap();
            let expected = cards.len().min(requested as usize);
            prop_assert_eq!(extraction.cards.len(), expected);
            prop_assert_eq!(&extraction.cards[..], &cards[..expected]);
        }
    }
}
