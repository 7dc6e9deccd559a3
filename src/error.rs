use std::fmt;
use thiserror::Error;

/// Which generation path a failure happened on. Shows up in
/// `GenerationFailed` messages ("Failed to generate images: ...").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationContext {
    Images,
    Animation,
}

impl fmt::Display for GenerationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationContext::Images => write!(f, "images"),
            GenerationContext::Animation => write!(f, "animation"),
        }
    }
}

/// Raw failure of a single provider call, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("API key is missing. Please provide a valid key.")]
    MissingCredential,

    #[error("The API did not return any images. Try a different prompt.")]
    EmptyResult,

    #[error("Image data is missing for generated image #{position}.")]
    MissingImageData { position: usize },

    /// Transport or provider-side failure. `message` is `None` when the
    /// failure had no usable description.
    #[error("{}", .message.as_deref().unwrap_or("provider call failed"))]
    Provider { message: Option<String> },
}

impl BatchError {
    pub fn provider(message: impl Into<String>) -> Self {
        let message = message.into();
        BatchError::Provider {
            message: if message.trim().is_empty() {
                None
            } else {
                Some(message)
            },
        }
    }
}

/// Everything the generation pipeline can surface to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("API Key is missing. Please provide a valid key.")]
    MissingCredential,

    #[error("The API did not return any images. Try a different prompt.")]
    EmptyResult,

    #[error("Image data is missing for generated image #{position}.")]
    MissingImageData { position: usize },

    #[error("The provided API Key is not valid. Please check the key and try again.")]
    InvalidCredential,

    #[error("Rate limit exceeded. The API is busy. Please wait a moment before trying again.")]
    RateLimited,

    #[error("Failed to generate {context}: {detail}")]
    GenerationFailed {
        context: GenerationContext,
        detail: String,
    },

    #[error("An unknown error occurred while communicating with the image API.")]
    UnknownFailure,

    #[error("Generation was cancelled before it completed.")]
    Cancelled,
}

/// Translate a raw batch failure into the pipeline taxonomy.
///
/// Must be applied once, by whoever issued the failing call.
pub fn classify(raw: BatchError, context: GenerationContext) -> GenerationError {
    let classified = match raw {
        BatchError::MissingCredential => GenerationError::MissingCredential,
        BatchError::EmptyResult => GenerationError::EmptyResult,
        BatchError::MissingImageData { position } => GenerationError::MissingImageData { position },
        BatchError::Provider { message: None } => GenerationError::UnknownFailure,
        BatchError::Provider {
            message: Some(message),
        } => {
            if message.contains("API key not valid") {
                GenerationError::InvalidCredential
            } else if message.contains("429") || message.contains("RESOURCE_EXHAUSTED") {
                GenerationError::RateLimited
            } else {
                GenerationError::GenerationFailed {
                    context,
                    detail: message,
                }
            }
        }
    };

    log::error!("Error generating {}: {}", context, classified);
    classified
}

/// Crate-wide error for everything outside the generation pipeline.
#[derive(Debug, Error)]
pub enum SpriteGenError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Client error: {0}")]
    ClientError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpriteGenError>;

pub type GenerationResult<T> = std::result::Result<T, GenerationError>;
