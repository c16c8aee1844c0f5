//! Streaming answer generation over an OpenAI-compatible chat endpoint.

use super::{FragmentStream, GenerationModel};
use crate::error::{Result, TubeqaError};
use async_openai::config::OpenAIConfig;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, instrument};

/// Chat model streamed through `/chat/completions`.
pub struct OpenAIGenerationModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIGenerationModel {
    pub fn new(client: Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl GenerationModel for OpenAIGenerationModel {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.to_string())
            .build()
            .map_err(|e| TubeqaError::OpenAI(format!("Failed to build message: {}", e)))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .temperature(self.temperature)
            .build()
            .map_err(|e| TubeqaError::OpenAI(format!("Failed to build request: {}", e)))?;

        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| TubeqaError::OpenAI(format!("Failed to open generation stream: {}", e)))?;
        debug!("Opened generation stream");

        let fragments = stream.map(|item| match item {
            Ok(response) => Ok(response
                .choices
                .into_iter()
                .filter_map(|choice| choice.delta.content)
                .collect::<String>()),
            Err(e) => Err(TubeqaError::OpenAI(format!("Generation stream error: {}", e))),
        });

        Ok(Box::pin(fragments))
    }
}
