pub mod client;
pub mod gemini;
pub mod oracle;
pub mod response;
pub mod secrets;

pub use client::{build_oracle, test_configured_api_key};
pub use gemini::GeminiOracle;
pub use oracle::{Oracle, OracleError, Provider};
pub use response::OpenAiOracle;
pub use secrets::{clear_api_key, prompt_for_api_key, store_api_key};
