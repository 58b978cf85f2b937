use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::api::{ChatBackend, ChatCompletionRequest};
use crate::config::{ApiConfig, DescribeConfig};
use crate::credential::Credential;
use crate::encoder::EncodedImage;
use crate::error::ServiceError;

/// What the vision model saw in one drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description(String);

impl Description {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Asks the image-understanding service to describe one drawing.
pub struct DescriptionClient {
    backend: Arc<dyn ChatBackend>,
    model: String,
    prompt: String,
    max_tokens: u32,
}

impl DescriptionClient {
    pub fn new(backend: Arc<dyn ChatBackend>, api: &ApiConfig, config: &DescribeConfig) -> Self {
        Self {
            backend,
            model: api.model.clone(),
            prompt: config.prompt.clone(),
            max_tokens: config.max_tokens,
        }
    }

    pub fn request_for(&self, image: &EncodedImage) -> ChatCompletionRequest {
        ChatCompletionRequest::with_image(&self.model, self.prompt.clone(), image.data_uri(), self.max_tokens)
    }

    /// One request, no retry. A reply without content becomes an empty description.
    pub async fn describe(
        &self,
        image: &EncodedImage,
        credential: &Credential,
    ) -> Result<Description, ServiceError> {
        info!(payload_len = image.as_str().len(), "Describing drawing");
        let request = self.request_for(image);
        let text = self.backend.complete(&request, credential).await?.unwrap_or_default();
        debug!(description = %text, "Drawing described");
        Ok(Description(text))
    }
}
