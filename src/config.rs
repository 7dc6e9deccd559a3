use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "imagen-3.0-generate-002";
pub const DEFAULT_STORE_DIR: &str = ".spritegen";

/// Frames generated when a request does not say how many it wants.
pub const DEFAULT_FRAME_COUNT: u32 = 4;
pub const MIN_FRAME_COUNT: u32 = 4;
pub const MAX_FRAME_COUNT: u32 = 25;

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub frame_count: u32,
    pub store_dir: PathBuf,
    pub request_timeout_secs: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            frame_count: DEFAULT_FRAME_COUNT,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            request_timeout_secs: None,
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_key = non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("API_KEY"));
        let api_base = non_empty_env("GEMINI_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base);
        let model = non_empty_env("SPRITEGEN_MODEL").unwrap_or(defaults.model);
        let frame_count = non_empty_env("SPRITEGEN_FRAMES")
            .and_then(|s| s.parse().ok())
            .map(clamp_frame_count)
            .unwrap_or(defaults.frame_count);
        let store_dir = non_empty_env("SPRITEGEN_STORE")
            .map(PathBuf::from)
            .unwrap_or(defaults.store_dir);
        let request_timeout_secs = non_empty_env("SPRITEGEN_TIMEOUT_SECS").and_then(|s| s.parse().ok());

        GeneratorConfig {
            api_key,
            api_base,
            model,
            frame_count,
            store_dir,
            request_timeout_secs,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_frame_count(mut self, frame_count: u32) -> Self {
        self.frame_count = clamp_frame_count(frame_count);
        self
    }

    pub fn with_store_dir(mut self, store_dir: impl Into<PathBuf>) -> Self {
        self.store_dir = store_dir.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().map_or(false, |key| !key.is_empty())
    }
}

/// Frame counts outside 4..=25 are pulled back into range.
pub fn clamp_frame_count(frames: u32) -> u32 {
    frames.clamp(MIN_FRAME_COUNT, MAX_FRAME_COUNT)
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
