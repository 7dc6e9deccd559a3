use crate::models::{AnimationAsset, ImageAsset};
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Turns encoded images into identified assets.
///
/// Ids are `<millis>-static-<index>` or `<millis>-anim`. The stamp never
/// repeats for one factory, so ids stay unique for the session even when
/// two generations land in the same millisecond.
#[derive(Debug, Default)]
pub struct AssetFactory {
    last_stamp: AtomicI64,
}

impl AssetFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_image_assets(&self, prompt: &str, images: Vec<String>) -> Vec<ImageAsset> {
        let stamp = self.next_stamp();
        images
            .into_iter()
            .enumerate()
            .map(|(index, base64)| ImageAsset {
                id: format!("{}-static-{}", stamp, index),
                base64,
                prompt: prompt.to_string(),
            })
            .collect()
    }

    pub fn make_animation_asset(&self, prompt: &str, frames: Vec<String>) -> AnimationAsset {
        AnimationAsset {
            id: format!("{}-anim", self.next_stamp()),
            frames,
            prompt: prompt.to_string(),
        }
    }

    fn next_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_stamp.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last_stamp
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return candidate,
                Err(current) => last = current,
            }
        }
    }
}
