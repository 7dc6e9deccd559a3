//! Pixel-art sprite generation on top of Google Imagen.
//!
//! A [`GenerationRequest`] goes through prompt composition, one or more
//! rate-paced provider calls and the asset factory, and comes back as
//! [`Asset`]s ready for the [`Collections`] or a spritesheet export.

pub mod animation;
pub mod assets;
pub mod batch;
pub mod collection;
pub mod config;
pub mod data_uri;
pub mod error;
pub mod generator;
pub mod imagen;
pub mod logger;
pub mod models;
pub mod prompt;
pub mod spritesheet;

pub use animation::{AnimationAssembler, REQUEST_DELAY};
pub use assets::AssetFactory;
pub use batch::{request_batch, MAX_IMAGES_PER_REQUEST};
pub use collection::{Collections, FileStore, KeyValueStore, MemoryStore, MAX_HISTORY_SIZE};
pub use config::GeneratorConfig;
pub use error::{
    classify, BatchError, GenerationContext, GenerationError, GenerationResult, Result,
    SpriteGenError,
};
pub use generator::SpriteGenerator;
pub use imagen::{ImageProvider, ImagenClient, MockProvider};
pub use models::{AnimationAsset, Asset, GenerationMode, GenerationRequest, ImageAsset};
