use snafu::{OptionExt, ResultExt};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
    client::{GeminiClient, ModelId},
    files::FileHandle,
    generation::{
        model::{
            response_text, total_token_count, GenerateContentRequest, GenerationConfig,
            GenerationResult,
        },
        ClientSnafu, Error, NoResponseSnafu,
    },
    models::{Content, Role},
};

/// Builder for content generation requests
#[derive(Clone)]
pub struct ContentBuilder {
    client: Arc<GeminiClient>,
    model: ModelId,
    pub contents: Vec<Content>,
    generation_config: Option<GenerationConfig>,
}

impl ContentBuilder {
    /// Creates a new `ContentBuilder`.
    pub(crate) fn new(client: Arc<GeminiClient>, model: ModelId) -> Self {
        Self {
            client,
            model,
            contents: Vec::new(),
            generation_config: None,
        }
    }

    /// Adds a user turn made of `text` followed by a reference to an uploaded file.
    pub fn with_user_message_and_file(
        mut self,
        text: impl Into<String>,
        file: &FileHandle,
    ) -> Self {
        let content = Content::text_with_file_uri(text, file.mime_type().as_ref(), file.uri())
            .with_role(Role::User);
        self.contents.push(content);
        self
    }

    /// Sets the generation configuration for the request.
    ///
    /// An empty configuration is not sent at all.
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = (!config.is_empty()).then_some(config);
        self
    }

    /// Builds the `GenerateContentRequest`.
    pub fn build(&self) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: self.contents.clone(),
            generation_config: self.generation_config.clone(),
        }
    }

    /// Executes the content generation request.
    ///
    /// Only `candidates[0].content.parts[0].text` and `usageMetadata.totalTokenCount` are
    /// read; the rest of the body is kept as-is in [`GenerationResult::raw_response`].
    /// Fails with [`Error::NoResponse`] when that text is absent or empty, whether the
    /// response was empty or malformed.
    #[instrument(skip_all, fields(
        model = %self.model,
        contents.count = self.contents.len(),
        config.present = self.generation_config.is_some(),
    ))]
    pub async fn execute(self) -> Result<GenerationResult, Error> {
        let request = self.build();
        let raw_response = self
            .client
            .generate_content(&self.model, &request)
            .await
            .map_err(Box::new)
            .context(ClientSnafu)?;

        let text = response_text(&raw_response)
            .context(NoResponseSnafu {
                model: self.model.as_str(),
            })?
            .to_string();
        let token_count = total_token_count(&raw_response);

        debug!(token_count, "content generated");

        Ok(GenerationResult {
            text,
            token_count,
            raw_response,
        })
    }
}
