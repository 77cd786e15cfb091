use serde_json::Value;

use super::GenerationError;
use crate::utils::truncate_chars;

/// Longest source excerpt embedded in a prompt, in characters.
pub const MAX_SOURCE_CHARS: usize = 15_000;

pub const MIN_CARDS: usize = 1;
pub const MAX_CARDS: usize = 25;
pub const DEFAULT_CARDS: usize = 10;

/// Number of cards a caller asked for. Only constructible inside
/// `MIN_CARDS..=MAX_CARDS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestedCount(usize);

impl RequestedCount {
    pub fn new(count: i64) -> Result<Self, GenerationError> {
        if count < MIN_CARDS as i64 || count > MAX_CARDS as i64 {
            return Err(GenerationError::Input(format!(
                "card count must be between {MIN_CARDS} and {MAX_CARDS}, got {count}"
            )));
        }
        Ok(Self(count as usize))
    }

    /// Absent or non-numeric values fall back to the default; numbers are
    /// still range checked.
    pub fn from_json(value: Option<&Value>) -> Result<Self, GenerationError> {
        let parsed = match value {
            Some(Value::Number(number)) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|n| n.trunc() as i64)),
            Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
            _ => None,
        };

        match parsed {
            Some(count) => Self::new(count),
            None => Ok(Self::default()),
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for RequestedCount {
    fn default() -> Self {
        Self(DEFAULT_CARDS)
    }
}

pub fn build_prompt(source_text: &str, count: RequestedCount) -> String {
    let count = count.get();
    let source = truncate_chars(source_text, MAX_SOURCE_CHARS);

    format!(
        "Create exactly {count} study flashcards (question and answer) based on the text below.\n\
         Return ONLY a raw JSON array of exactly {count} objects. Each object must have exactly two string fields, \"question\" and \"answer\".\n\
         Format: [{{\"question\": \"...\", \"answer\": \"...\"}}]\n\
         Do not wrap the array in a markdown code block (no ```) and do not add any text before or after it.\n\
         If the text does not contain enough material for {count} cards, make up additional questions about it \
         (for example true/false questions) so that the array has exactly {count} items.\n\n\
         Text: \"{source}\""
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn count_bounds() {
        assert!(RequestedCount::new(0).is_err());
        assert!(RequestedCount::new(-3).is_err());
        assert!(RequestedCount::new(26).is_err());
        assert_eq!(RequestedCount::new(1).unwrap().get(), 1);
        assert_eq!(RequestedCount::new(25).unwrap().get(), 25);
    }

    #[test]
    fn count_from_json() {
        assert_eq!(RequestedCount::from_json(None).unwrap().get(), DEFAULT_CARDS);
        assert_eq!(
            RequestedCount::from_json(Some(&json!(null))).unwrap().get(),
            DEFAULT_CARDS
        );
        assert_eq!(
            RequestedCount::from_json(Some(&json!("lots"))).unwrap().get(),
            DEFAULT_CARDS
        );
        assert_eq!(
            RequestedCount::from_json(Some(&json!([5]))).unwrap().get(),
            DEFAULT_CARDS
        );
        assert_eq!(RequestedCount::from_json(Some(&json!(7))).unwrap().get(), 7);
        assert_eq!(RequestedCount::from_json(Some(&json!(" 12 "))).unwrap().get(), 12);
        assert_eq!(RequestedCount::from_json(Some(&json!(3.9))).unwrap().get(), 3);
        assert!(RequestedCount::from_json(Some(&json!(1000))).is_err());
        assert!(RequestedCount::from_json(Some(&json!("0"))).is_err());
    }

    #[test]
    fn prompt_states_contract() {
        let prompt = build_prompt("Mitochondria make ATP.", RequestedCount::new(4).unwrap());

        assert!(prompt.contains("exactly 4 study flashcards"));
        assert!(prompt.contains("exactly 4 objects"));
        assert!(prompt.contains("\"question\" and \"answer\""));
        assert!(prompt.contains("raw JSON array"));
        assert!(prompt.contains("markdown code block"));
        assert!(prompt.contains("true/false"));
        assert!(prompt.ends_with("Text: \"Mitochondria make ATP.\""));
    }

    #[test]
    fn prompt_is_deterministic() {
        let count = RequestedCount::default();
        assert_eq!(build_prompt("same", count), build_prompt("same", count));
    }

    #[test]
    fn long_source_is_truncated() {
        let source = "é".repeat(MAX_SOURCE_CHARS + 500);
        let prompt = build_prompt(&source, RequestedCount::default());

        let embedded = prompt.matches('é').count();
        assert_eq!(embedded, MAX_SOURCE_CHARS);
    }
}
