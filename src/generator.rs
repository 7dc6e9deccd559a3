use crate::{
    animation::AnimationAssembler,
    assets::AssetFactory,
    batch::{request_batch, MAX_IMAGES_PER_REQUEST},
    config::GeneratorConfig,
    error::{classify, GenerationContext, GenerationResult, Result},
    imagen::{ImageProvider, ImagenClient, MockProvider},
    logger,
    models::{AnimationAsset, Asset, GenerationMode, GenerationRequest, ImageAsset},
    prompt,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Images produced by one static generation.
pub const STATIC_BATCH_SIZE: u32 = MAX_IMAGES_PER_REQUEST;

/// Entry point of the pipeline: prompt in, assets out.
///
/// Holds a provider and an id factory; every other input arrives with the
/// request.
#[derive(Clone)]
pub struct SpriteGenerator {
    provider: Arc<dyn ImageProvider>,
    factory: Arc<AssetFactory>,
}

impl SpriteGenerator {
    pub fn new(provider: Arc<dyn ImageProvider>) -> Self {
        Self {
            provider,
            factory: Arc::new(AssetFactory::new()),
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        let client = ImagenClient::from_config(config)?;
        log::info!("Using image provider at {}", client.api_base());
        Ok(Self::new(Arc::new(client)))
    }

    pub fn offline() -> Self {
        log::warn!("Offline mode: images are local placeholders");
        Self::new(Arc::new(MockProvider::new()))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// One batch of four single-object sprites.
    pub async fn generate_static(&self, request: &GenerationRequest) -> GenerationResult<Vec<ImageAsset>> {
        let _timer = logger::timer("static generation");
        let full_prompt = prompt::compose(
            &prompt::static_subject(&request.prompt),
            request.negative_prompt(),
            request.style_lock_prompt(),
        );

        let images = request_batch(
            self.provider.as_ref(),
            &request.credential,
            &full_prompt,
            &request.model,
            STATIC_BATCH_SIZE,
        )
        .await
        .map_err(|e| classify(e, GenerationContext::Images))?;

        log::info!("Received {} image(s) for \"{}\"", images.len(), request.prompt);
        Ok(self.factory.make_image_assets(&request.prompt, images))
    }

    pub async fn generate_animation(&self, request: &GenerationRequest) -> GenerationResult<AnimationAsset> {
        AnimationAssembler::new(self.provider.as_ref(), &self.factory)
            .assemble_animation(request)
            .await
    }

    /// Like [`generate_animation`](Self::generate_animation), stopping
    /// before the next batch once `cancel` is set.
    pub async fn generate_animation_cancellable(
        &self,
        request: &GenerationRequest,
        cancel: Arc<AtomicBool>,
    ) -> GenerationResult<AnimationAsset> {
        AnimationAssembler::new(self.provider.as_ref(), &self.factory)
            .with_cancel_flag(cancel)
            .assemble_animation(request)
            .await
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        mode: GenerationMode,
    ) -> GenerationResult<Vec<Asset>> {
        log::info!("Starting {} generation with model {}", mode, request.model);
        match mode {
            GenerationMode::Static => Ok(self
                .generate_static(request)
                .await?
                .into_iter()
                .map(Asset::from)
                .collect()),
            GenerationMode::Animation => Ok(vec![self.generate_animation(request).await?.into()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BatchError, GenerationError};
    use crate::imagen::MockReply;
    use std::collections::HashSet;

    const MODEL: &str = "imagen-3.0-generate-002";

    fn generator_with(mock: &Arc<MockProvider>) -> SpriteGenerator {
        let provider: Arc<dyn ImageProvider> = mock.clone();
        SpriteGenerator::new(provider)
    }

    #[tokio::test]
    async fn test_static_slime_scenario() {
        let mock = Arc::new(MockProvider::new());
        let generator = generator_with(&mock);
        let request = GenerationRequest::new("key", "a cute slime monster", MODEL);

        let assets = generator.generate_static(&request).await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].count, 4);
        assert!(calls[0]
            .prompt
            .starts_with("A single, centered object of a a cute slime monster"));
        assert!(calls[0].prompt.ends_with(prompt::STYLE_SUFFIX));

        assert_eq!(assets.len(), 4);
        let ids: HashSet<_> = assets.iter().map(|a| a.id.clone()).collect();
        assert_eq!(ids.len(), 4);
        for asset in &assets {
            assert_eq!(asset.prompt, "a cute slime monster");
            assert!(asset.base64.starts_with("data:image/png;base64,"));
        }
    }

    #[tokio::test]
    async fn test_style_lock_and_negative_reach_the_provider() {
        let mock = Arc::new(MockProvider::labeled());
        let generator = generator_with(&mock);
        let request = GenerationRequest::new("key", "a goblin thief", MODEL)
            .with_negative_prompt("shadows")
            .with_style_lock("a steampunk robot");

        generator.generate_static(&request).await.unwrap();

        let sent = &mock.calls()[0].prompt;
        assert!(sent.starts_with("In the same artistic style as a \"a steampunk robot\"."));
        assert!(sent.contains("AVOID the following elements: shadows."));
    }

    #[tokio::test]
    async fn test_static_rate_limit() {
        let mock = Arc::new(MockProvider::new());
        mock.push_failure(BatchError::provider("HTTP 429 Too Many Requests"));
        let generator = generator_with(&mock);

        let result = generator
            .generate_static(&GenerationRequest::new("key", "a dragon's egg", MODEL))
            .await;
        assert_eq!(result, Err(GenerationError::RateLimited));
    }

    #[tokio::test]
    async fn test_static_empty_result() {
        let mock = Arc::new(MockProvider::new());
        mock.push_reply(MockReply::Images(vec![]));
        let generator = generator_with(&mock);

        let result = generator
            .generate_static(&GenerationRequest::new("key", "a treasure map", MODEL))
            .await;
        assert_eq!(result, Err(GenerationError::EmptyResult));
    }

    #[tokio::test]
    async fn test_static_failure_context() {
        let mock = Arc::new(MockProvider::new());
        mock.push_failure(BatchError::provider("[400 INVALID_ARGUMENT] bad prompt"));
        let generator = generator_with(&mock);

        let err = generator
            .generate_static(&GenerationRequest::new("key", "a flag waving", MODEL))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to generate images: [400 INVALID_ARGUMENT] bad prompt"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_dispatches_on_mode() {
        let mock = Arc::new(MockProvider::labeled());
        let generator = generator_with(&mock);

        let statics = generator
            .generate(&GenerationRequest::new("key", "a coin spinning", MODEL), GenerationMode::Static)
            .await
            .unwrap();
        assert_eq!(statics.len(), 4);
        assert!(statics.iter().all(|a| !a.is_animation()));

        let animated = generator
            .generate(
                &GenerationRequest::new("key", "a coin spinning", MODEL).with_frame_count(6),
                GenerationMode::Animation,
            )
            .await
            .unwrap();
        assert_eq!(animated.len(), 1);
        match &animated[0] {
            Asset::Animation(animation) => assert_eq!(animation.frames.len(), 6),
            other => panic!("expected animation, got {:?}", other),
        }
        assert_eq!(mock.call_count(), 3);
    }
}
