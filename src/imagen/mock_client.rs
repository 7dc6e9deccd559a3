//! Offline provider.
//!
//! Serves scripted replies first; once the script runs out it either
//! draws small placeholder sprites or hands out sequential labels.

use crate::{
    error::BatchError,
    imagen::{ImageCall, ImageProvider},
    models::GeneratedImage,
    spritesheet::encode_png,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{Rgba, RgbaImage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

const PLACEHOLDER_SIZE: u32 = 32;

#[derive(Debug, Clone)]
pub enum MockReply {
    Images(Vec<GeneratedImage>),
    Fail(BatchError),
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub model: String,
    pub count: u32,
    pub at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    Placeholder,
    Labeled,
}

pub struct MockProvider {
    replies: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<RecordedCall>>,
    fallback: Fallback,
    next_label: AtomicUsize,
}

impl MockProvider {
    /// Placeholder PNGs for every call.
    pub fn new() -> Self {
        Self::with_fallback(Fallback::Placeholder)
    }

    /// Images whose payload is a running label: "1", "2", "3", ...
    pub fn labeled() -> Self {
        Self::with_fallback(Fallback::Labeled)
    }

    fn with_fallback(fallback: Fallback) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            fallback,
            next_label: AtomicUsize::new(1),
        }
    }

    pub fn push_reply(&self, reply: MockReply) -> &Self {
        lock(&self.replies).push_back(reply);
        self
    }

    pub fn push_failure(&self, error: BatchError) -> &Self {
        self.push_reply(MockReply::Fail(error))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn fallback_images(&self, call: &ImageCall<'_>) -> Result<Vec<GeneratedImage>, BatchError> {
        (0..call.count)
            .map(|index| -> Result<GeneratedImage, BatchError> {
                match self.fallback {
                    Fallback::Labeled => {
                        let label = self.next_label.fetch_add(1, Ordering::SeqCst);
                        Ok(GeneratedImage::png(label.to_string()))
                    }
                    Fallback::Placeholder => {
                        let sprite = placeholder_sprite(call.prompt, index);
                        let png = encode_png(&sprite)
                            .map_err(|e| BatchError::provider(e.to_string()))?;
                        Ok(GeneratedImage::png(STANDARD.encode(png)))
                    }
                }
            })
            .collect()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_images(
        &self,
        call: ImageCall<'_>,
    ) -> std::result::Result<Vec<GeneratedImage>, BatchError> {
        lock(&self.calls).push(RecordedCall {
            prompt: call.prompt.to_string(),
            model: call.model.to_string(),
            count: call.count,
            at: Instant::now(),
        });

        let scripted = lock(&self.replies).pop_front();
        match scripted {
            Some(MockReply::Images(images)) => Ok(images),
            Some(MockReply::Fail(error)) => Err(error),
            None => self.fallback_images(&call),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A filled square on a transparent background, colored from the prompt.
fn placeholder_sprite(prompt: &str, index: u32) -> RgbaImage {
    let hash = prompt
        .bytes()
        .fold(index.wrapping_add(7), |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    let color = Rgba([
        ((hash >> 16) & 0xFF) as u8,
        ((hash >> 8) & 0xFF) as u8,
        (hash & 0xFF) as u8,
        255,
    ]);

    let margin = PLACEHOLDER_SIZE / 4;
    RgbaImage::from_fn(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, |x, y| {
        let inside = (margin..PLACEHOLDER_SIZE - margin).contains(&x)
            && (margin..PLACEHOLDER_SIZE - margin).contains(&y);
        if inside {
            color
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}
