use async_trait::async_trait;
use std::sync::Arc;

use crate::error::FetchError;

/// The external text generation service.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, FetchError>;
}

/// Fixed wrapper applied to every user message before it is sent.
///
/// `{message}` is replaced by the user's text; a template without the
/// placeholder gets the message appended after a space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate(String);

impl PromptTemplate {
    pub const PLACEHOLDER: &'static str = "{message}";
    pub const DEFAULT: &'static str = "Hey my assistant {message}";

    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn render(&self, message: &str) -> String {
        if self.0.contains(Self::PLACEHOLDER) {
            self.0.replace(Self::PLACEHOLDER, message)
        } else if self.0.is_empty() {
            message.to_string()
        } else {
            format!("{} {}", self.0, message)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

/// Single-attempt boundary call: template the prompt, ask the model once.
#[derive(Clone)]
pub struct ResponseFetcher {
    model: Arc<dyn GenerativeModel>,
    template: PromptTemplate,
}

impl ResponseFetcher {
    pub fn new(model: Arc<dyn GenerativeModel>, template: PromptTemplate) -> Self {
        Self { model, template }
    }

    pub async fn fetch(&self, prompt_text: &str) -> Result<String, FetchError> {
        let prompt = self.template.render(prompt_text);
        tracing::debug!(chars = prompt.chars().count(), "dispatching prompt");
        self.model.generate(&prompt).await
    }
}
