use std::sync::Arc;

use anyhow::{Context, Result, anyhow};

use async_openai::{Client, config::OpenAIConfig};

use super::gemini::GeminiOracle;
use super::oracle::{Oracle, Provider};
use super::response::OpenAiOracle;
use super::secrets::{ApiKeySource, get_api_key_from_sources};

/// Builds the oracle used for the lifetime of the process.
pub fn build_oracle(provider: Provider, model: &str) -> Result<Arc<dyn Oracle>> {
    let (key, _) = require_api_key(provider)?;

    let oracle: Arc<dyn Oracle> = match provider {
        Provider::OpenAi => Arc::new(OpenAiOracle::new(initialize_client(&key), model)),
        Provider::Gemini => Arc::new(GeminiOracle::new(&key, model)?),
    };
    Ok(oracle)
}

pub async fn test_configured_api_key(provider: Provider) -> Result<ApiKeySource> {
    let (key, source) = require_api_key(provider)?;
    match provider {
        Provider::OpenAi => healthcheck_client(&initialize_client(&key)).await?,
        Provider::Gemini => {
            GeminiOracle::new(&key, provider.default_model())?
                .healthcheck()
                .await?
        }
    }
    Ok(source)
}

fn require_api_key(provider: Provider) -> Result<(String, ApiKeySource)> {
    let lookup = get_api_key_from_sources(provider)?;
    let missing = || {
        anyhow!(
            "No {} API key configured. Set {} or run `flashdeck llm --provider {} --set`.",
            provider,
            provider.api_key_env(),
            provider
        )
    };
    let key = lookup.api_key.ok_or_else(missing)?;
    let source = lookup.source.ok_or_else(missing)?;
    Ok((key, source))
}

fn initialize_client(api_key: &str) -> Client<OpenAIConfig> {
    let config = OpenAIConfig::new().with_api_key(api_key);

    Client::with_config(config)
}

async fn healthcheck_client(client: &Client<OpenAIConfig>) -> Result<()> {
    client
        .models()
        .list()
        .await
        .context("Failed to validate API key with OpenAI")?;
    Ok(())
}
