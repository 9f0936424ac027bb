//! # Image Backend
//!
//! The [`ImageBackend`] trait is the seam between the upload pipeline and the image
//! library. The pipeline only ever needs one operation: turn uploaded bytes into the
//! three JPEG resolutions.
//!
//! ## Resize rules
//!
//! 1. The upload must reach the original box on at least one side; an image smaller than
//!    the box on both sides is rejected with [`CmsError::ImageTooSmall`]
//! 2. Every variant is shrunk to fit its bounding box, keeping the aspect ratio.
//!    Images already inside a box are never enlarged
//! 3. Normalized and thumbnail variants are derived from the resized original

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::common::{CmsError, Result};

/// Bounding boxes `(width, height)` of the three stored resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSizes {
    pub original: (u32, u32),
    pub normalized: (u32, u32),
    pub thumbnail: (u32, u32),
}

/// Encoded JPEG bytes for each resolution.
#[derive(Debug, Clone)]
pub struct RenderedImages {
    pub original: Vec<u8>,
    pub normalized: Vec<u8>,
    pub thumbnail: Vec<u8>,
}

pub trait ImageBackend: Send + Sync {
    /// Decode `data`, check its size and produce the three JPEG variants.
    fn render(&self, data: &[u8], sizes: &ImageSizes) -> Result<RenderedImages>;
}

/// Production backend built on the `image` crate.
#[derive(Debug, Clone)]
pub struct JpegBackend {
    quality: u8,
}

impl JpegBackend {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    fn encode(&self, img: &DynamicImage) -> Result<Vec<u8>> {
        // JPEG has no alpha channel
        let rgb = img.to_rgb8();
        let mut output_bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut output_bytes, self.quality).encode_image(&rgb)?;
        Ok(output_bytes)
    }
}

impl Default for JpegBackend {
    fn default() -> Self {
        Self::new(90)
    }
}

impl ImageBackend for JpegBackend {
    fn render(&self, data: &[u8], sizes: &ImageSizes) -> Result<RenderedImages> {
        let img = image::load_from_memory(data)?;
        let (width, height) = img.dimensions();

        let (min_w, min_h) = sizes.original;
        if width < min_w && height < min_h {
            return Err(CmsError::ImageTooSmall {
                width: min_w,
                height: min_h,
            });
        }

        let original = fit_within(&img, sizes.original);
        let normalized = fit_within(&original, sizes.normalized);
        let thumbnail = fit_within(&original, sizes.thumbnail);

        Ok(RenderedImages {
            original: self.encode(&original)?,
            normalized: self.encode(&normalized)?,
            thumbnail: self.encode(&thumbnail)?,
        })
    }
}

/// Shrink `img` so it fits inside `bounds`, keeping its aspect ratio.
pub fn fit_within(img: &DynamicImage, bounds: (u32, u32)) -> DynamicImage {
    let (width, height) = img.dimensions();
    let (max_w, max_h) = bounds;
    if width <= max_w && height <= max_h {
        return img.clone();
    }
    img.resize(max_w, max_h, FilterType::Lanczos3)
}
