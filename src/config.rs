use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::llm::Provider;
use crate::utils::get_data_dir;

const PORT_ENV: &str = "FLASHDECK_PORT";
const DB_ENV: &str = "FLASHDECK_DB";
const PROVIDER_ENV: &str = "FLASHDECK_PROVIDER";
const MODEL_ENV: &str = "FLASHDECK_MODEL";
const ORACLE_TIMEOUT_ENV: &str = "FLASHDECK_ORACLE_TIMEOUT_SECS";

const DB_FILE_NAME: &str = "flashdeck.db";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    pub provider: Provider,
    pub model: String,
    pub oracle_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let provider: Provider = try_load(&lookup, PROVIDER_ENV, "openai")?;
        let model = lookup(MODEL_ENV)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());

        let db_path = match lookup(DB_ENV).filter(|value| !value.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => get_data_dir()?.join(DB_FILE_NAME),
        };

        let timeout_secs: u64 = try_load(&lookup, ORACLE_TIMEOUT_ENV, "60")?;
        if timeout_secs == 0 {
            bail!("Invalid {ORACLE_TIMEOUT_ENV} value: must be at least 1 second");
        }

        Ok(Self {
            port: try_load(&lookup, PORT_ENV, "5000")?,
            db_path,
            provider,
            model,
            oracle_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Applies command line overrides. A new provider without an explicit
    /// model switches to that provider's default model.
    pub fn with_overrides(
        mut self,
        port: Option<u16>,
        provider: Option<Provider>,
        model: Option<String>,
    ) -> Self {
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(provider) = provider
            && provider != self.provider
        {
            self.provider = provider;
            self.model = provider.default_model().to_string();
        }
        if let Some(model) = model {
            self.model = model;
        }
        self
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T>
where
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim()
        .parse()
        .map_err(|err| anyhow::anyhow!("{err}"))
        .with_context(|| format!("Invalid {key} value: {raw:?}"))
}
