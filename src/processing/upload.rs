//! # Upload Pipeline
//!
//! Stores an uploaded JPEG as three files inside a site's image folder:
//!
//! ```text
//! portfolio3.jpg        original, fit into the original box
//! portfolio3_norm.jpg   normalized
//! portfolio3_thumb.jpg  thumbnail
//! ```
//!
//! ## New images
//! 1. Check the extension (`.jpg` / `.jpeg`)
//! 2. Pick the first free slot starting at `start_index`; the original filename is
//!    created exclusively so concurrent uploads never share a slot
//! 3. Render and write the variants; on failure every file of the slot is removed
//!
//! ## Replacements
//! Variants are written next to their targets and renamed into place only after all
//! three were written, so a failed replacement leaves the previous files untouched.

use log::{error, info, warn};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::backend::{ImageBackend, ImageSizes, RenderedImages};
use crate::common::{CmsError, Result};
use crate::store::{ImageNames, ImageUrls};

/// A file received from the `upload` form field.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Result of storing a new image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub names: ImageNames,
    pub urls: ImageUrls,
}

/// Accept only `.jpg` and `.jpeg`, case-insensitively.
pub fn check_extension(filename: &str) -> Result<()> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => Ok(()),
        _ => Err(CmsError::UnsupportedFileType),
    }
}

/// Claim the first slot at or after `start_index` whose three files are all absent.
///
/// The original file is created empty as the reservation; callers either overwrite it
/// or remove the slot with [`remove_images`].
pub fn allocate_names(dir: &Path, prefix: &str, start_index: i64) -> Result<ImageNames> {
    let mut index = start_index.max(1);
    loop {
        let names = ImageNames::for_index(prefix, index);
        let [original, normalized, thumbnail] = names.paths(dir);
        if !normalized.exists() && !thumbnail.exists() {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&original)
            {
                Ok(_) => return Ok(names),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
        }
        index += 1;
    }
}

/// Render `data` and write the three variants under `names`, replacing existing files.
pub fn store_image(
    backend: &dyn ImageBackend,
    data: &[u8],
    dir: &Path,
    names: &ImageNames,
    sizes: &ImageSizes,
) -> Result<()> {
    let rendered = backend.render(data, sizes)?;
    write_variants(dir, names, &rendered)
}

fn write_variants(dir: &Path, names: &ImageNames, rendered: &RenderedImages) -> Result<()> {
    let targets = names.paths(dir);
    let contents = [&rendered.original, &rendered.normalized, &rendered.thumbnail];

    let mut staged: Vec<(PathBuf, &PathBuf)> = Vec::with_capacity(3);
    for (target, bytes) in targets.iter().zip(contents) {
        let part = part_path(target);
        if let Err(e) = fs::write(&part, bytes) {
            discard(&part);
            staged.iter().for_each(|(p, _)| discard(p));
            return Err(e.into());
        }
        staged.push((part, target));
    }

    for (i, (part, target)) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(part, target) {
            staged[i..].iter().for_each(|(p, _)| discard(p));
            return Err(e.into());
        }
    }
    Ok(())
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    target.with_file_name(name)
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

/// Store a brand new image in the first free slot of `prefix`.
pub fn store_new_image(
    backend: &dyn ImageBackend,
    upload: &Upload,
    prefix: &str,
    start_index: i64,
    dir: &Path,
    img_url: &str,
    sizes: &ImageSizes,
) -> Result<StoredImage> {
    check_extension(&upload.filename)?;
    let names = allocate_names(dir, prefix, start_index)?;
    if let Err(e) = store_image(backend, &upload.data, dir, &names, sizes) {
        remove_images(dir, &names);
        return Err(e);
    }
    Ok(StoredImage {
        urls: names.urls(img_url),
        names,
    })
}

/// Replace the files of an existing record with a new upload.
pub fn replace_image(
    backend: &dyn ImageBackend,
    upload: &Upload,
    dir: &Path,
    names: &ImageNames,
    sizes: &ImageSizes,
) -> Result<()> {
    check_extension(&upload.filename)?;
    store_image(backend, &upload.data, dir, names, sizes)
}

/// Delete whichever of the three files exist.
pub fn remove_images(dir: &Path, names: &ImageNames) {
    for path in names.paths(dir) {
        discard(&path);
    }
}

// ============================================================================
// IMAGE PIPELINE - async front end used by the HTTP handlers
// ============================================================================

/// Runs the upload pipeline off the async runtime.
///
/// Decoding and resizing are CPU-bound, so every operation that renders goes through
/// `spawn_blocking`.
#[derive(Clone)]
pub struct ImagePipeline {
    backend: Arc<dyn ImageBackend>,
    sizes: ImageSizes,
}

impl ImagePipeline {
    pub fn new(backend: Arc<dyn ImageBackend>, sizes: ImageSizes) -> Self {
        Self { backend, sizes }
    }

    /// Store a new image for a record that does not exist yet.
    ///
    /// # Arguments
    /// - `upload`: The uploaded file
    /// - `prefix`: Filename prefix (`portfolio` or `picture`)
    /// - `start_index`: First slot to try (last record id + 1)
    /// - `dir`: The site image folder
    /// - `img_url`: Public base URL of the folder, ending with `/`
    pub async fn store_new(
        &self,
        upload: Upload,
        prefix: &str,
        start_index: i64,
        dir: PathBuf,
        img_url: &str,
    ) -> Result<StoredImage> {
        let backend = self.backend.clone();
        let sizes = self.sizes;
        let prefix = prefix.to_string();
        let img_url = img_url.to_string();

        let stored = tokio::task::spawn_blocking(move || {
            store_new_image(
                backend.as_ref(),
                &upload,
                &prefix,
                start_index,
                &dir,
                &img_url,
                &sizes,
            )
        })
        .await
        .map_err(|e| CmsError::Io(std::io::Error::other(format!("Image task panicked: {}", e))))?;

        match &stored {
            Ok(image) => info!("🖼️  Stored image {}", image.names.original_image),
            Err(e) => error!("Image upload failed: {}", e),
        }
        stored
    }

    /// Overwrite the files of an existing record.
    pub async fn replace(&self, upload: Upload, dir: PathBuf, names: ImageNames) -> Result<()> {
        let backend = self.backend.clone();
        let sizes = self.sizes;

        let replaced = tokio::task::spawn_blocking(move || {
            replace_image(backend.as_ref(), &upload, &dir, &names, &sizes)
        })
        .await
        .map_err(|e| CmsError::Io(std::io::Error::other(format!("Image task panicked: {}", e))))?;

        if let Err(e) = &replaced {
            error!("Image replacement failed: {}", e);
        }
        replaced
    }
}
