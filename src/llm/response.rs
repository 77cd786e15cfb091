use async_openai::{
    Client,
    config::OpenAIConfig,
    types::responses::{
        CreateResponseArgs, InputMessage, InputRole, OutputItem, OutputMessageContent,
    },
};
use async_trait::async_trait;

use super::oracle::{Oracle, OracleError};

const SYSTEM_PROMPT: &str = r#"
You write study flashcards from the material the user provides.
Reply with the JSON array you are asked for and nothing else.
"#;

const MAX_OUTPUT_TOKENS: u32 = 16_000;

pub async fn request_single_text_response(
    client: &Client<OpenAIConfig>,
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<String, OracleError> {
    let request = CreateResponseArgs::default()
        .model(model)
        .max_output_tokens(MAX_OUTPUT_TOKENS)
        .input(vec![
            InputMessage {
                role: InputRole::System,
                content: vec![system_prompt.into()],
                status: None,
            },
            InputMessage {
                role: InputRole::User,
                content: vec![user_prompt.into()],
                status: None,
            },
        ])
        .build()
        .map_err(|err| OracleError::Request(err.to_string()))?;

    let response = client
        .responses()
        .create(request)
        .await
        .map_err(|err| OracleError::Request(err.to_string()))?;

    let parts = response
        .output
        .into_iter()
        .filter_map(|item| match item {
            OutputItem::Message(message) => Some(message.content),
            _ => None,
        })
        .flatten()
        .filter_map(|content| match content {
            OutputMessageContent::OutputText(text) => Some(text.text),
            _ => None,
        })
        .collect::<Vec<_>>();

    join_output_text(parts.iter().map(String::as_str)).ok_or(OracleError::EmptyResponse)
}

/// Joins the text parts of a reply in order. `None` when nothing but
/// whitespace came back.
fn join_output_text<'a>(parts: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let joined: String = parts.into_iter().collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub struct OpenAiOracle {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiOracle {
    pub fn new(client: Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        request_single_text_response(&self.client, &self.model, SYSTEM_PROMPT, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_reply_is_joined_in_order() {
        let joined = join_output_text([" [{\"question\"", ": \"q\", \"answer\": \"a\"}]\n"]);
        assert_eq!(
            joined.as_deref(),
            Some(r#"[{"question": "q", "answer": "a"}]"#)
        );
    }

    #[test]
    fn blank_reply_is_empty() {
        assert_eq!(join_output_text([" ", "\n"]), None);
        assert_eq!(join_output_text(std::iter::empty()), None);
    }
}
