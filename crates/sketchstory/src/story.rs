use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::api::{ChatBackend, ChatCompletionRequest};
use crate::config::{ApiConfig, StoryConfig, STORY_PLACEHOLDER};
use crate::credential::Credential;
use crate::describe::Description;
use crate::error::ServiceError;
use crate::progress::DRAWINGS_PER_STORY;

/// The narrative tying the three drawings together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story(String);

impl Story {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Story {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Join the descriptions with `separator` and drop them into the template.
pub fn compose_prompt(
    template: &str,
    separator: &str,
    descriptions: &[Description; DRAWINGS_PER_STORY],
) -> String {
    let joined = descriptions
        .iter()
        .map(Description::as_str)
        .collect::<Vec<_>>()
        .join(separator);
    template.replace(STORY_PLACEHOLDER, &joined)
}

/// Asks the text-generation service for a story.
pub struct StoryClient {
    backend: Arc<dyn ChatBackend>,
    model: String,
    template: String,
    separator: String,
    max_tokens: u32,
}

impl StoryClient {
    pub fn new(backend: Arc<dyn ChatBackend>, api: &ApiConfig, config: &StoryConfig) -> Self {
        Self {
            backend,
            model: api.model.clone(),
            template: config.prompt_template.clone(),
            separator: config.separator.clone(),
            max_tokens: config.max_tokens,
        }
    }

    pub fn request_for(&self, descriptions: &[Description; DRAWINGS_PER_STORY]) -> ChatCompletionRequest {
        let prompt = compose_prompt(&self.template, &self.separator, descriptions);
        ChatCompletionRequest::text(&self.model, prompt, self.max_tokens)
    }

    /// One request per call; calling again asks for a fresh story.
    pub async fn synthesize(
        &self,
        descriptions: &[Description; DRAWINGS_PER_STORY],
        credential: &Credential,
    ) -> Result<Story, ServiceError> {
        info!("Generating story from {DRAWINGS_PER_STORY} descriptions");
        let request = self.request_for(descriptions);
        let text = self
            .backend
            .complete(&request, credential)
            .await?
            .filter(|t| !t.trim().is_empty())
            .ok_or(ServiceError::EmptyResponse)?;
        debug!(len = text.len(), "Story generated");
        Ok(Story(text))
    }
}
