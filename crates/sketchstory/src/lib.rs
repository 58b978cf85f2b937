//! Draw three sketches, have a vision model describe each one, then turn the
//! descriptions into a short story.

pub mod api;
pub mod canvas;
pub mod config;
pub mod credential;
pub mod describe;
pub mod encoder;
pub mod error;
pub mod logging;
pub mod progress;
pub mod session;
pub mod story;

pub use api::{ChatBackend, OpenAiBackend, RequestPolicy};
pub use canvas::{Canvas, DrawingSurface};
pub use config::Config;
pub use credential::Credential;
pub use describe::{Description, DescriptionClient};
pub use encoder::EncodedImage;
pub use error::{CanvasError, EncodeError, ProgressError, ServiceError, SessionError};
pub use progress::{SessionProgress, Stage, DRAWINGS_PER_STORY};
pub use session::Session;
pub use story::{Story, StoryClient};
