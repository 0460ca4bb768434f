use std::sync::Arc;

use crate::core::config::{AgentConfig, LlmConfig};
use crate::core::errors::RagError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

/// Reply Generator: one chat completion per prompt, no history.
pub struct ReplyGenerator {
    name: String,
    system_message: Option<String>,
    model: String,
    llm: LlmConfig,
    provider: Arc<dyn LlmProvider>,
}

impl ReplyGenerator {
    pub fn new(agent: &AgentConfig, llm: &LlmConfig, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            name: agent.name.clone(),
            system_message: agent
                .system_message
                .as_ref()
                .filter(|m| !m.trim().is_empty())
                .cloned(),
            model: llm.model.clone(),
            llm: llm.clone(),
            provider,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn build_request(&self, prompt: &str) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_message {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(prompt));
        ChatRequest::new(messages).with_config(&self.llm)
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let request = self.build_request(prompt);
        tracing::debug!(
            agent = %self.name,
            provider = self.provider.name(),
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "Requesting reply"
        );

        let reply = self.provider.chat(request, &self.model).await.map_err(|e| {
            tracing::warn!(agent = %self.name, error = %e, "Reply generation failed");
            e
        })?;

        tracing::debug!(agent = %self.name, reply_chars = reply.chars().count(), "Reply received");
        Ok(reply)
    }
}
