use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::ChatBackend;
use crate::canvas::DrawingSurface;
use crate::config::Config;
use crate::credential::Credential;
use crate::describe::{Description, DescriptionClient};
use crate::encoder::{self, EncodedImage};
use crate::error::{EncodeError, SessionError};
use crate::progress::{SessionProgress, Stage};
use crate::story::{Story, StoryClient};

/// One user's run through the draw → describe ×3 → story workflow.
///
/// Owns everything the workflow touches; actions run one at a time.
pub struct Session<S> {
    surface: S,
    progress: SessionProgress,
    credential: Option<Credential>,
    describer: DescriptionClient,
    storyteller: StoryClient,
}

impl<S: DrawingSurface> Session<S> {
    pub fn new(surface: S, describer: DescriptionClient, storyteller: StoryClient) -> Self {
        Self {
            surface,
            progress: SessionProgress::new(),
            credential: None,
            describer,
            storyteller,
        }
    }

    pub fn from_config(surface: S, backend: Arc<dyn ChatBackend>, config: &Config) -> Self {
        let describer = DescriptionClient::new(backend.clone(), &config.api, &config.describe);
        let storyteller = StoryClient::new(backend, &config.api, &config.story);
        Self::new(surface, describer, storyteller)
    }

    pub fn set_credential(&mut self, credential: Option<Credential>) {
        if credential.is_some() {
            info!("API key set");
        }
        self.credential = credential;
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Shown for as long as no key has been entered.
    pub fn credential_warning(&self) -> Option<&'static str> {
        (!self.has_credential()).then_some("Please enter your API key.")
    }

    pub fn progress(&self) -> &SessionProgress {
        &self.progress
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Label for the analyze action, absent once all drawings are in.
    pub fn analyze_label(&self) -> Option<String> {
        match self.progress.stage() {
            Stage::AwaitingDrawing(n) => Some(format!("Analyze drawing {n}")),
            Stage::Complete => None,
        }
    }

    pub fn story_available(&self) -> bool {
        self.progress.story_available()
    }

    /// Describe what is currently on the drawing surface.
    pub async fn analyze(&mut self) -> Result<Description, SessionError> {
        self.ready_to_analyze()?;
        let image = self
            .surface
            .snapshot()
            .ok_or(SessionError::MissingImage)
            .and_then(|bytes| image_or_missing(encoder::encode(&bytes)))?;
        self.describe_and_record(&image).await
    }

    /// Describe a PNG from disk instead of the drawing surface.
    pub async fn analyze_file(&mut self, path: &Path) -> Result<Description, SessionError> {
        self.ready_to_analyze()?;
        let image = image_or_missing(encoder::encode_file(path))?;
        self.describe_and_record(&image).await
    }

    fn ready_to_analyze(&self) -> Result<&Credential, SessionError> {
        let credential = self.credential.as_ref().ok_or(SessionError::MissingCredential)?;
        if self.progress.is_complete() {
            return Err(SessionError::AnalysisComplete);
        }
        Ok(credential)
    }

    async fn describe_and_record(&mut self, image: &EncodedImage) -> Result<Description, SessionError> {
        let credential = self.ready_to_analyze()?;
        let step = self.progress.step();
        let description = match self.describer.describe(image, credential).await {
            Ok(d) => d,
            Err(e) => {
                warn!(step, "Drawing analysis failed: {e}");
                return Err(e.into());
            }
        };

        let stage = self.progress.record(description.clone())?;
        self.surface.reset();
        info!(step, %stage, "Drawing analyzed");
        Ok(description)
    }

    /// Ask for a story from the three descriptions. Every call sends a new request.
    pub async fn generate_story(&self) -> Result<Story, SessionError> {
        let credential = self.credential.as_ref().ok_or(SessionError::MissingCredential)?;
        let descriptions = self
            .progress
            .completed()
            .ok_or(SessionError::StoryUnavailable(self.progress.descriptions().len()))?;
        match self.storyteller.synthesize(descriptions, credential).await {
            Ok(story) => Ok(story),
            Err(e) => {
                warn!("Story generation failed: {e}");
                Err(e.into())
            }
        }
    }
}

/// A missing image turns the action into a no-op; anything else is a real failure.
fn image_or_missing(result: Result<EncodedImage, EncodeError>) -> Result<EncodedImage, SessionError> {
    result.map_err(|e| {
        if e.is_missing() {
            debug!("Nothing to analyze: {e}");
        } else {
            warn!("Could not encode drawing: {e}");
        }
        SessionError::MissingImage
    })
}
