use std::time::Duration;

use async_trait::async_trait;
use chatgpt::client::ChatGPT;
use chatgpt::config::ChatGPTEngine;
use chatgpt::types::CompletionResponse;
use url::Url;

use crate::error::{ConfigError, ProviderError};

/// One prompt in, one generated text out. The only network boundary of the
/// quiz pipelines; retries are up to the caller.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

pub struct ChatGptCompleter {
    chat_gpt: ChatGPT,
    timeout: Duration,
}

impl ChatGptCompleter {
    pub fn new(
        api_key: &str,
        api_url: Url,
        model: &'static str,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let chat_gpt = {
            let mut gpt = ChatGPT::new(api_key)?;

            gpt.config.engine = ChatGPTEngine::Custom(model);
            gpt.config.api_url = api_url;
            gpt.config.timeout = timeout;

            gpt
        };

        Ok(Self { chat_gpt, timeout })
    }
}

#[async_trait]
impl Completer for ChatGptCompleter {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        // send_message starts a fresh conversation each time, so stages never
        // see each other's history except through the prompt text.
        let response: CompletionResponse = tokio::time::timeout(self.timeout, self.chat_gpt.send_message(prompt))
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout.as_secs()))??;

        response
            .message_choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(ProviderError::EmptyResponse)
    }
}
