use serde::{Deserialize, Serialize};

/// One static generated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub id: String,
    /// Self-describing data URI (`data:image/png;base64,...`)
    pub base64: String,
    pub prompt: String,
}

/// One multi-frame animation; `frames` are in generation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationAsset {
    pub id: String,
    pub frames: Vec<String>,
    pub prompt: String,
}

/// Anything the pipeline produces.
///
/// Stored untagged: an entry with a `frames` array is an animation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Asset {
    Animation(AnimationAsset),
    Image(ImageAsset),
}

impl Asset {
    pub fn id(&self) -> &str {
        match self {
            Asset::Image(image) => &image.id,
            Asset::Animation(animation) => &animation.id,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Asset::Image(image) => &image.prompt,
            Asset::Animation(animation) => &animation.prompt,
        }
    }

    pub fn is_animation(&self) -> bool {
        matches!(self, Asset::Animation(_))
    }

    pub fn as_image(&self) -> Option<&ImageAsset> {
        match self {
            Asset::Image(image) => Some(image),
            Asset::Animation(_) => None,
        }
    }

    /// Every encoded image the asset carries, in display order.
    pub fn encoded_images(&self) -> Vec<&str> {
        match self {
            Asset::Image(image) => vec![image.base64.as_str()],
            Asset::Animation(animation) => animation.frames.iter().map(String::as_str).collect(),
        }
    }
}

impl From<ImageAsset> for Asset {
    fn from(image: ImageAsset) -> Self {
        Asset::Image(image)
    }
}

impl From<AnimationAsset> for Asset {
    fn from(animation: AnimationAsset) -> Self {
        Asset::Animation(animation)
    }
}
