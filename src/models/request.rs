use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Static,
    Animation,
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMode::Static => write!(f, "static"),
            GenerationMode::Animation => write!(f, "animation"),
        }
    }
}

/// Everything one generation needs. Built by the caller, read-only to the
/// pipeline.
#[derive(Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub credential: String,
    pub prompt: String,
    pub model: String,
    pub negative_prompt: Option<String>,
    pub style_lock_prompt: Option<String>,
    pub frame_count: Option<u32>,
}

impl GenerationRequest {
    pub fn new(
        credential: impl Into<String>,
        prompt: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            credential: credential.into(),
            prompt: prompt.into(),
            model: model.into(),
            negative_prompt: None,
            style_lock_prompt: None,
            frame_count: None,
        }
    }

    pub fn with_negative_prompt(mut self, negative: impl Into<String>) -> Self {
        self.negative_prompt = non_empty(negative.into());
        self
    }

    pub fn with_style_lock(mut self, style_lock_prompt: impl Into<String>) -> Self {
        self.style_lock_prompt = non_empty(style_lock_prompt.into());
        self
    }

    pub fn with_frame_count(mut self, frames: u32) -> Self {
        self.frame_count = Some(frames);
        self
    }

    pub fn negative_prompt(&self) -> Option<&str> {
        self.negative_prompt.as_deref().filter(|s| !s.is_empty())
    }

    pub fn style_lock_prompt(&self) -> Option<&str> {
        self.style_lock_prompt.as_deref().filter(|s| !s.is_empty())
    }
}

// The credential never ends up in logs.
impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("credential", &format_args!("<{} chars>", self.credential.len()))
            .field("prompt", &self.prompt)
            .field("model", &self.model)
            .field("negative_prompt", &self.negative_prompt)
            .field("style_lock_prompt", &self.style_lock_prompt)
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_optional_prompts_are_absent() {
        let request = GenerationRequest::new("key", "a goblin thief", "imagen-3.0-generate-002")
            .with_negative_prompt("   ")
            .with_style_lock("");

        assert_eq!(request.negative_prompt(), None);
        assert_eq!(request.style_lock_prompt(), None);
    }

    #[test]
    fn test_debug_hides_credential() {
        let request = GenerationRequest::new("super-secret", "a healing potion", "m");
        let printed = format!("{:?}", request);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("a healing potion"));
    }
}
