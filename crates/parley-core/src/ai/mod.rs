use async_trait::async_trait;

use crate::error::FetchError;
use crate::fetcher::GenerativeModel;

pub mod gemini;

pub use gemini::GeminiClient;

/// Stand-in model used until an API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait]
impl GenerativeModel for Unconfigured {
    async fn generate(&self, _prompt: &str) -> Result<String, FetchError> {
        Err(FetchError::MissingApiKey)
    }
}
