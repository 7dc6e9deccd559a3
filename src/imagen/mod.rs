pub mod image_client;
pub mod mock_client;

use crate::{error::BatchError, models::GeneratedImage};
use async_trait::async_trait;

pub use image_client::ImagenClient;
pub use mock_client::{MockProvider, MockReply, RecordedCall};

/// Parameters of one provider call.
#[derive(Debug, Clone, Copy)]
pub struct ImageCall<'a> {
    pub credential: &'a str,
    pub prompt: &'a str,
    pub model: &'a str,
    pub count: u32,
}

/// A backend able to turn a prompt into images.
///
/// Implementations make exactly one upstream call per `generate_images`
/// and report failures as raw [`BatchError`]s; classification happens in
/// the caller.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_images(
        &self,
        call: ImageCall<'_>,
    ) -> std::result::Result<Vec<GeneratedImage>, BatchError>;
}
