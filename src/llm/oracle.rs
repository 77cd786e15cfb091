use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("request to the model failed: {0}")]
    Request(String),

    #[error("no text output returned from model")]
    EmptyResponse,

    #[error("model did not answer within {0:?}")]
    Timeout(Duration),
}

/// Opaque text completion service. Implementations make exactly one
/// outbound call per `complete` and never retry.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Provider {
    #[value(name = "openai")]
    OpenAi,
    Gemini,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-5-nano",
            Provider::Gemini => "gemini-2.5-flash",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::OpenAi => "FLASHDECK_OPENAI_API_KEY",
            Provider::Gemini => "FLASHDECK_GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            other => bail!("Unknown provider {other:?}, expected openai or gemini"),
        }
    }
}
