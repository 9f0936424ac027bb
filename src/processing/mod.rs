//! # Image Processing
//!
//! Turns uploaded JPEGs into the three stored resolutions (original, normalized,
//! thumbnail) and manages their files inside a site's image folder.

pub mod backend;
pub mod upload;

pub use backend::{ImageBackend, ImageSizes, JpegBackend, RenderedImages};
pub use upload::{ImagePipeline, StoredImage, Upload};
