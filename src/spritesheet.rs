//! Horizontal spritesheet export and single-asset downloads.
//!
//! Cells are sized after the first image; image `i` is copied unscaled at
//! `x = i * cell_width`. Single images are written upscaled with
//! nearest-neighbour sampling so pixel edges stay hard.

use crate::{
    collection::Collections,
    data_uri,
    error::{Result, SpriteGenError},
    models::{AnimationAsset, Asset, ImageAsset},
};
use chrono::Utc;
use image::{imageops, imageops::FilterType, ImageFormat, RgbaImage};
use std::collections::HashSet;
use std::io::Cursor;

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .map_err(|e| SpriteGenError::ExportError(e.to_string()))?;
    Ok(bytes.into_inner())
}

pub fn decode_image(uri: &str) -> Result<RgbaImage> {
    let (_, bytes) = data_uri::decode(uri)?;
    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| SpriteGenError::ExportError(format!("cannot decode image: {}", e)))?;
    Ok(decoded.to_rgba8())
}

/// Lay already-decoded images side by side.
pub fn compose_strip(images: &[RgbaImage]) -> Result<RgbaImage> {
    let first = images
        .first()
        .ok_or_else(|| SpriteGenError::ExportError("nothing to export".into()))?;
    let (cell_width, cell_height) = first.dimensions();

    let mut sheet = RgbaImage::new(sheet_width(cell_width, images.len())?, cell_height);
    for (index, image) in images.iter().enumerate() {
        let x = index as i64 * cell_width as i64;
        imageops::replace(&mut sheet, image, x, 0);
    }

    log::debug!(
        "Composed {} cell(s) of {}x{} into a {}x{} sheet",
        images.len(),
        cell_width,
        cell_height,
        sheet.width(),
        sheet.height()
    );
    Ok(sheet)
}

fn sheet_width(cell_width: u32, cells: usize) -> Result<u32> {
    u32::try_from(cells)
        .ok()
        .and_then(|cells| cell_width.checked_mul(cells))
        .ok_or_else(|| {
            SpriteGenError::ExportError(format!(
                "{} cell(s) of width {} do not fit in one sheet",
                cells, cell_width
            ))
        })
}

pub fn compose_spritesheet(images: &[ImageAsset]) -> Result<RgbaImage> {
    let decoded = images
        .iter()
        .map(|asset| decode_image(&asset.base64))
        .collect::<Result<Vec<_>>>()?;
    compose_strip(&decoded)
}

/// All frames of an animation as one strip, in frame order.
pub fn animation_strip(animation: &AnimationAsset) -> Result<RgbaImage> {
    let decoded = animation
        .frames
        .iter()
        .map(|frame| decode_image(frame))
        .collect::<Result<Vec<_>>>()?;
    compose_strip(&decoded)
}

/// PNG bytes for the selected static images of the collections. Animations
/// among the selection are skipped.
pub fn export_selected(collections: &Collections, selected_ids: &[String]) -> Result<Vec<u8>> {
    let selected: HashSet<&str> = selected_ids.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();

    let images: Vec<ImageAsset> = collections
        .all()
        .filter(|asset| selected.contains(asset.id()))
        .filter_map(|asset| asset.as_image())
        .filter(|image| seen.insert(image.id.clone()))
        .cloned()
        .collect();

    if images.is_empty() {
        return Err(SpriteGenError::ExportError(
            "no static images among the selection".into(),
        ));
    }

    log::info!("Exporting spritesheet of {} image(s)", images.len());
    encode_png(&compose_spritesheet(&images)?)
}

pub fn spritesheet_file_name() -> String {
    format!("spritesheet-{}.png", Utc::now().timestamp_millis())
}

/// Scale factor for single-image downloads.
pub const DOWNLOAD_SCALE: u32 = 4;

const SLUG_MAX_LEN: usize = 30;

/// Enlarge by an integer factor; every source pixel becomes a
/// `factor x factor` block.
pub fn upscale(image: &RgbaImage, factor: u32) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    let scaled = width
        .checked_mul(factor)
        .zip(height.checked_mul(factor))
        .filter(|&(w, h)| w > 0 && h > 0);

    match scaled {
        Some((w, h)) => Ok(imageops::resize(image, w, h, FilterType::Nearest)),
        None => Err(SpriteGenError::ExportError(format!(
            "cannot upscale {}x{} by {}",
            width, height, factor
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    /// One static image, upscaled by [`DOWNLOAD_SCALE`].
    Image,
    /// An animation as a horizontal strip at native size.
    Animation,
}

/// Lowercased prompt with every run of characters outside `[a-z0-9]`
/// collapsed to one `-`, cut to 30 characters.
pub fn prompt_slug(prompt: &str) -> String {
    let mut slug = String::with_capacity(prompt.len());
    let mut in_gap = false;
    for c in prompt.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
            in_gap = false;
        } else if !in_gap {
            slug.push('-');
            in_gap = true;
        }
    }
    slug.truncate(SLUG_MAX_LEN);
    slug
}

pub fn download_file_name(prompt: &str, kind: DownloadKind) -> String {
    match kind {
        DownloadKind::Image => format!("pixel-asset-{}x-{}.png", DOWNLOAD_SCALE, prompt_slug(prompt)),
        DownloadKind::Animation => format!("pixel-anim-{}.png", prompt_slug(prompt)),
    }
}

/// PNG bytes for downloading one asset, paired with its file name.
pub fn download(asset: &Asset) -> Result<(String, Vec<u8>)> {
    match asset {
        Asset::Image(image) => {
            let upscaled = upscale(&decode_image(&image.base64)?, DOWNLOAD_SCALE)?;
            Ok((
                download_file_name(&image.prompt, DownloadKind::Image),
                encode_png(&upscaled)?,
            ))
        }
        Asset::Animation(animation) => Ok((
            download_file_name(&animation.prompt, DownloadKind::Animation),
            encode_png(&animation_strip(animation)?)?,
        )),
    }
}
