//! Multi-batch animation assembly.
//!
//! An animation of `n` frames needs `ceil(n / 4)` provider calls. Calls run
//! strictly one after another with [`REQUEST_DELAY`] between them, and the
//! frames are kept in call order.

use crate::{
    assets::AssetFactory,
    batch::{request_batch, MAX_IMAGES_PER_REQUEST},
    config::DEFAULT_FRAME_COUNT,
    error::{classify, GenerationContext, GenerationError, GenerationResult},
    imagen::ImageProvider,
    logger,
    models::{AnimationAsset, GenerationRequest},
    prompt,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Pause between two batches of the same animation.
pub const REQUEST_DELAY: Duration = Duration::from_millis(10_000);

/// How often the cancel flag is checked while pausing.
const CANCEL_POLL: Duration = Duration::from_millis(250);

#[derive(Debug)]
enum AssemblyState {
    Pending {
        frames_remaining: u32,
        collected: Vec<String>,
    },
    Complete {
        frames: Vec<String>,
    },
}

pub struct AnimationAssembler<'a> {
    provider: &'a dyn ImageProvider,
    factory: &'a AssetFactory,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> AnimationAssembler<'a> {
    pub fn new(provider: &'a dyn ImageProvider, factory: &'a AssetFactory) -> Self {
        Self {
            provider,
            factory,
            cancel: None,
        }
    }

    /// Flag checked before each batch and during the pause between
    /// batches. An in-flight call is never aborted.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub async fn assemble_animation(
        &self,
        request: &GenerationRequest,
    ) -> GenerationResult<AnimationAsset> {
        let total = requested_frames(request);
        let full_prompt = prompt::compose(
            &prompt::animation_subject(&request.prompt, total),
            request.negative_prompt(),
            request.style_lock_prompt(),
        );
        let _timer = logger::timer(&format!("{}-frame animation", total));

        let mut state = AssemblyState::Pending {
            frames_remaining: total,
            collected: Vec::with_capacity(total as usize),
        };

        let mut frames = loop {
            match state {
                AssemblyState::Complete { frames } => break frames,
                AssemblyState::Pending {
                    frames_remaining,
                    collected,
                } => {
                    state = self
                        .advance(request, &full_prompt, frames_remaining, collected)
                        .await?;
                }
            }
        };

        if frames.len() > total as usize {
            log::debug!(
                "Dropping {} surplus frame(s) from the last batch",
                frames.len() - total as usize
            );
        }
        frames.truncate(total as usize);

        Ok(self.factory.make_animation_asset(&request.prompt, frames))
    }

    async fn advance(
        &self,
        request: &GenerationRequest,
        full_prompt: &str,
        frames_remaining: u32,
        mut collected: Vec<String>,
    ) -> GenerationResult<AssemblyState> {
        if self.is_cancelled() {
            log::warn!(
                "Animation cancelled with {} frame(s) still to generate",
                frames_remaining
            );
            return Err(GenerationError::Cancelled);
        }

        let batch_size = frames_remaining.min(MAX_IMAGES_PER_REQUEST);
        log::info!(
            "Requesting {} frame(s), {} collected so far",
            batch_size,
            collected.len()
        );

        let batch = request_batch(
            self.provider,
            &request.credential,
            full_prompt,
            &request.model,
            batch_size,
        )
        .await
        .map_err(|e| classify(e, GenerationContext::Animation))?;

        collected.extend(batch);
        let frames_remaining = frames_remaining - batch_size;

        if frames_remaining == 0 {
            return Ok(AssemblyState::Complete { frames: collected });
        }

        log::info!(
            "Waiting {}ms before the next batch ({} frame(s) left)",
            REQUEST_DELAY.as_millis(),
            frames_remaining
        );
        self.pause(REQUEST_DELAY).await;

        Ok(AssemblyState::Pending {
            frames_remaining,
            collected,
        })
    }

    /// Sleep for `delay`, waking early once the cancel flag is raised.
    async fn pause(&self, delay: Duration) {
        if self.cancel.is_none() {
            tokio::time::sleep(delay).await;
            return;
        }

        let deadline = Instant::now() + delay;
        while !self.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep((deadline - now).min(CANCEL_POLL)).await;
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::SeqCst))
    }
}

fn requested_frames(request: &GenerationRequest) -> u32 {
    request
        .frame_count
        .filter(|&frames| frames > 0)
        .unwrap_or(DEFAULT_FRAME_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BatchError;
    use crate::imagen::{MockProvider, MockReply};
    use crate::models::GeneratedImage;

    fn request(frames: Option<u32>) -> GenerationRequest {
        let mut request = GenerationRequest::new("key", "a hero walking", "imagen-3.0-generate-002");
        request.frame_count = frames;
        request
    }

    fn labels(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("data:image/png;base64,{}", i)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_ten_frames_in_three_batches() {
        let mock = MockProvider::labeled();
        let factory = AssetFactory::new();

        let asset = AnimationAssembler::new(&mock, &factory)
            .assemble_animation(&request(Some(10)))
            .await
            .unwrap();

        let sizes: Vec<u32> = mock.calls().iter().map(|c| c.count).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(asset.frames, labels(10));
        assert_eq!(asset.prompt, "a hero walking");
        assert!(asset.id.ends_with("-anim"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_plan_for_every_frame_count() {
        for n in 1..=25u32 {
            let mock = MockProvider::labeled();
            let factory = AssetFactory::new();

            let asset = AnimationAssembler::new(&mock, &factory)
                .assemble_animation(&request(Some(n)))
                .await
                .unwrap();

            let sizes: Vec<u32> = mock.calls().iter().map(|c| c.count).collect();
            assert_eq!(sizes.len() as u32, (n + 3) / 4, "n = {}", n);
            let (last, rest) = sizes.split_last().unwrap();
            assert!(rest.iter().all(|&s| s == 4), "n = {}", n);
            assert_eq!(*last, n - 4 * rest.len() as u32, "n = {}", n);
            assert_eq!(asset.frames, labels(n as usize), "n = {}", n);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_batches_only() {
        let mock = MockProvider::labeled();
        let factory = AssetFactory::new();

        AnimationAssembler::new(&mock, &factory)
            .assemble_animation(&request(Some(12)))
            .await
            .unwrap();
        let finished = Instant::now();

        let calls = mock.calls();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            let gap = pair[1].at - pair[0].at;
            assert!(gap >= REQUEST_DELAY, "gap was {:?}", gap);
            assert!(gap < REQUEST_DELAY + Duration::from_millis(5), "gap was {:?}", gap);
        }
        assert!(finished - calls[2].at < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_batch_has_no_delay() {
        let mock = MockProvider::labeled();
        let factory = AssetFactory::new();
        let started = Instant::now();

        AnimationAssembler::new(&mock, &factory)
            .assemble_animation(&request(Some(4)))
            .await
            .unwrap();

        assert_eq!(mock.call_count(), 1);
        assert!(Instant::now() - started < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_surplus_frames_are_truncated() {
        let mock = MockProvider::labeled();
        mock.push_reply(MockReply::Images(
            (1..=4).map(|i| GeneratedImage::png(format!("a{}", i))).collect(),
        ))
        .push_reply(MockReply::Images(
            (1..=4).map(|i| GeneratedImage::png(format!("b{}", i))).collect(),
        ));
        let factory = AssetFactory::new();

        let asset = AnimationAssembler::new(&mock, &factory)
            .assemble_animation(&request(Some(6)))
            .await
            .unwrap();

        assert_eq!(mock.calls()[1].count, 2);
        assert_eq!(asset.frames.len(), 6);
        assert_eq!(asset.frames[5], "data:image/png;base64,b2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_frame_count() {
        let mock = MockProvider::labeled();
        let factory = AssetFactory::new();

        let asset = AnimationAssembler::new(&mock, &factory)
            .assemble_animation(&request(None))
            .await
            .unwrap();

        assert_eq!(asset.frames.len(), DEFAULT_FRAME_COUNT as usize);
        assert!(mock.calls()[0].prompt.starts_with("4-frame animation sprite sheet"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_mid_animation_is_fatal() {
        let mock = MockProvider::labeled();
        mock.push_reply(MockReply::Images(vec![GeneratedImage::png("1"); 4]))
            .push_failure(BatchError::provider("[429 RESOURCE_EXHAUSTED] slow down"));
        let factory = AssetFactory::new();

        let result = AnimationAssembler::new(&mock, &factory)
            .assemble_animation(&request(Some(12)))
            .await;

        assert_eq!(result, Err(GenerationError::RateLimited));
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_carries_animation_context() {
        let mock = MockProvider::labeled();
        mock.push_failure(BatchError::provider("[500 INTERNAL] oops"));
        let factory = AssetFactory::new();

        let result = AnimationAssembler::new(&mock, &factory)
            .assemble_animation(&request(Some(8)))
            .await;

        assert_eq!(
            result,
            Err(GenerationError::GenerationFailed {
                context: GenerationContext::Animation,
                detail: "[500 INTERNAL] oops".into(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_between_batches() {
        let mock = MockProvider::labeled();
        let factory = AssetFactory::new();
        let flag = Arc::new(AtomicBool::new(false));

        let assembler =
            AnimationAssembler::new(&mock, &factory).with_cancel_flag(Arc::clone(&flag));
        let req = request(Some(12));
        let run = assembler.assemble_animation(&req);
        tokio::pin!(run);

        // Let the first batch go out, then cancel during the pause.
        tokio::select! {
            _ = &mut run => panic!("finished before cancellation"),
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
        flag.store(true, Ordering::SeqCst);

        assert_eq!(run.await, Err(GenerationError::Cancelled));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_cuts_the_pause_short() {
        let mock = MockProvider::labeled();
        let factory = AssetFactory::new();
        let flag = Arc::new(AtomicBool::new(false));
        let started = Instant::now();

        let assembler =
            AnimationAssembler::new(&mock, &factory).with_cancel_flag(Arc::clone(&flag));
        let req = request(Some(8));
        let run = assembler.assemble_animation(&req);
        tokio::pin!(run);

        tokio::select! {
            _ = &mut run => panic!("finished before cancellation"),
            _ = tokio::time::sleep(Duration::from_millis(1_000)) => {}
        }
        flag.store(true, Ordering::SeqCst);

        assert_eq!(run.await, Err(GenerationError::Cancelled));
        assert_eq!(mock.call_count(), 1);
        assert!(Instant::now() - started <= Duration::from_millis(1_000) + CANCEL_POLL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unraised_flag_keeps_full_pacing() {
        let mock = MockProvider::labeled();
        let factory = AssetFactory::new();
        let flag = Arc::new(AtomicBool::new(false));

        AnimationAssembler::new(&mock, &factory)
            .with_cancel_flag(flag)
            .assemble_animation(&request(Some(8)))
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].at - calls[0].at >= REQUEST_DELAY);
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_calls() {
        let mock = MockProvider::labeled();
        let factory = AssetFactory::new();
        let mut req = request(Some(8));
        req.credential.clear();

        let result = AnimationAssembler::new(&mock, &factory)
            .assemble_animation(&req)
            .await;

        assert_eq!(result, Err(GenerationError::MissingCredential));
        assert_eq!(mock.call_count(), 0);
    }
}
