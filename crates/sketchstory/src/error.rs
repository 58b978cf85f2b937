use std::path::PathBuf;

/// Failure to turn a snapshot into a request payload.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("snapshot is empty")]
    Empty,

    #[error("no image found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("could not read image {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("encoded image is corrupt: {0}")]
    Corrupt(#[from] base64::DecodeError),
}

impl EncodeError {
    /// True when there is simply no image yet, as opposed to a broken one.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Empty | Self::NotFound(_))
    }
}

/// Failure of a single call to the hosted chat-completions service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Request timed out. Try again.")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API key. Check the key you entered.")]
    Unauthorized,

    #[error("Rate limited. Wait a moment and try again.")]
    RateLimited,

    #[error("API server error (HTTP {0}). Try again.")]
    Server(u16),

    #[error("API error (HTTP {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Unexpected API response: {0}")]
    Malformed(String),

    #[error("Empty response from API.")]
    EmptyResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressError {
    #[error("all drawings have already been analyzed")]
    AlreadyComplete,
}

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("line width must be between {min} and {max}, got {got}")]
    StrokeWidth { got: u32, min: u32, max: u32 },

    #[error("invalid colour {0:?}, expected #RRGGBB")]
    Colour(String),

    #[error("canvas size must be non-zero, got {0}x{1}")]
    Size(u32, u32),

    #[error("could not load image: {0}")]
    Image(#[from] image::ImageError),
}

/// Error for one user action. None of these end the session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Please enter your API key.")]
    MissingCredential,

    /// Nothing drawn yet. Front-ends treat this as a silent no-op.
    #[error("no drawing to analyze")]
    MissingImage,

    #[error("all three drawings are analyzed; generate the story instead")]
    AnalysisComplete,

    #[error("the story needs three analyzed drawings, {0} so far")]
    StoryUnavailable(usize),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<ProgressError> for SessionError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::AlreadyComplete => Self::AnalysisComplete,
        }
    }
}
