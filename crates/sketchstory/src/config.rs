use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::canvas::{MAX_STROKE_WIDTH, MIN_STROKE_WIDTH};

/// Directory of the running executable, used to find `config.toml`.
pub fn exe_directory() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent().map(|p| p.to_path_buf())
}

#[derive(Deserialize, Clone, Default, Debug)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub describe: DescribeConfig,
    #[serde(default)]
    pub story: StoryConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where requests go. The key itself is never read from this file.
#[derive(Deserialize, Clone, Debug)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-request timeout. 0 leaves the transport default in place.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DescribeConfig {
    #[serde(default = "default_describe_prompt")]
    pub prompt: String,
    #[serde(default = "default_describe_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StoryConfig {
    /// `{descriptions}` is replaced by the joined descriptions.
    #[serde(default = "default_story_template")]
    pub prompt_template: String,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_story_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CanvasConfig {
    #[serde(default = "default_canvas_width")]
    pub width: u32,
    #[serde(default = "default_canvas_height")]
    pub height: u32,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: u32,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    #[serde(default = "default_background_color")]
    pub background_color: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,
    /// Write logs to a file in this directory instead of stderr.
    pub directory: Option<String>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

pub const STORY_PLACEHOLDER: &str = "{descriptions}";

fn default_endpoint() -> String { "https://api.openai.com/v1/chat/completions".into() }
fn default_model() -> String { "gpt-4o-mini".into() }
fn default_timeout_secs() -> u64 { 60 }
fn default_describe_prompt() -> String {
    "Describe en español y de forma breve lo que aparece en este dibujo relacionado con fútbol."
        .into()
}
fn default_describe_max_tokens() -> u32 { 300 }
fn default_story_template() -> String {
    "Tienes estas tres descripciones de dibujos: {descriptions}. Con base en ellas, crea una \
     historia breve, emocionante y creativa sobre un partido de fútbol."
        .into()
}
fn default_separator() -> String { " | ".into() }
fn default_story_max_tokens() -> u32 { 600 }
fn default_canvas_width() -> u32 { 400 }
fn default_canvas_height() -> u32 { 300 }
fn default_stroke_width() -> u32 { 5 }
fn default_stroke_color() -> String { "#000000".into() }
fn default_background_color() -> String { "#FFFFFF".into() }
fn default_logging_enabled() -> bool { true }
fn default_log_level() -> String { "info".into() }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DescribeConfig {
    fn default() -> Self {
        Self {
            prompt: default_describe_prompt(),
            max_tokens: default_describe_max_tokens(),
        }
    }
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            prompt_template: default_story_template(),
            separator: default_separator(),
            max_tokens: default_story_max_tokens(),
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_canvas_width(),
            height: default_canvas_height(),
            stroke_width: default_stroke_width(),
            stroke_color: default_stroke_color(),
            background_color: default_background_color(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            directory: None,
            level: default_log_level(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let mut config: Config = toml::from_str(contents)?;
        config.sanitize();
        Ok(config)
    }

    /// Load from `path`, or `config.toml` next to the executable.
    /// Falls back to defaults (with a note on stderr) when the file is missing or broken.
    /// Logging is not up yet at this point, hence eprintln.
    pub fn load(path: Option<&Path>) -> Self {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let Some(dir) = exe_directory() else {
                    eprintln!("[sketchstory] Could not determine executable directory, using defaults");
                    return Config::default();
                };
                dir.join("config.toml")
            }
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("[sketchstory] Failed to parse {}: {e}", config_path.display());
                    Config::default()
                }
            },
            Err(_) => {
                if path.is_some() {
                    eprintln!(
                        "[sketchstory] {} not found, using defaults",
                        config_path.display()
                    );
                }
                Config::default()
            }
        }
    }

    /// Pull out-of-range values back to something usable.
    fn sanitize(&mut self) {
        let width = self.canvas.stroke_width;
        self.canvas.stroke_width = width.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH);
        if self.canvas.stroke_width != width {
            eprintln!(
                "[sketchstory] canvas.stroke_width {width} out of range, using {}",
                self.canvas.stroke_width
            );
        }
        if !self.story.prompt_template.contains(STORY_PLACEHOLDER) {
            eprintln!(
                "[sketchstory] story.prompt_template has no {STORY_PLACEHOLDER} placeholder, \
                 descriptions will be appended"
            );
            self.story.prompt_template.push(' ');
            self.story.prompt_template.push_str(STORY_PLACEHOLDER);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.api.model, "gpt-4o-mini");
        assert_eq!(config.describe.max_tokens, 300);
        assert_eq!(config.story.max_tokens, 600);
        assert_eq!(config.story.separator, " | ");
        assert_eq!(config.canvas.width, 400);
        assert_eq!(config.canvas.height, 300);
        assert_eq!(config.canvas.stroke_width, 5);
        assert_eq!(config.api.timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [api]
            model = "gpt-4o"
            timeout_secs = 0

            [story]
            max_tokens = 900
            "#,
        )
        .unwrap();
        assert_eq!(config.api.model, "gpt-4o");
        assert_eq!(config.api.endpoint, default_endpoint());
        assert_eq!(config.api.timeout(), None);
        assert_eq!(config.story.max_tokens, 900);
        assert_eq!(config.story.separator, " | ");
    }

    #[test]
    fn stroke_width_is_clamped() {
        let config = Config::from_toml_str("[canvas]\nstroke_width = 99\n").unwrap();
        assert_eq!(config.canvas.stroke_width, 30);
        let config = Config::from_toml_str("[canvas]\nstroke_width = 0\n").unwrap();
        assert_eq!(config.canvas.stroke_width, 1);
    }

    #[test]
    fn template_without_placeholder_gets_one() {
        let config = Config::from_toml_str("[story]\nprompt_template = \"Write a story.\"\n").unwrap();
        assert_eq!(config.story.prompt_template, "Write a story. {descriptions}");
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api\nmodel = ").unwrap();
        let config = Config::load(Some(path.as_path()));
        assert_eq!(config.api.model, "gpt-4o-mini");
    }

    #[test]
    fn loads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[describe]\nmax_tokens = 120\n").unwrap();
        let config = Config::load(Some(path.as_path()));
        assert_eq!(config.describe.max_tokens, 120);
    }
}
