// src/transform/image.rs

//! Image recompression.
//!
//! Raster images are decoded and re-encoded with the configured quality;
//! dimensions and pixel layout are preserved. Formats the optimizer cannot
//! re-encode losslessly (animated gif, svg) pass through unchanged.

use std::io::Cursor;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{GenericImageView, ImageEncoder, ImageOutputFormat};
use tracing::debug;

use crate::errors::{TransformCause, TransformError};
use crate::fileset::{FileEntry, FileSet};
use crate::transform::Transform;

const NAME: &str = "image";

/// Recompression options for [`ImageOptimize`].
#[derive(Debug, Clone, Copy)]
pub struct ImageOptions {
    /// JPEG quality, 1–100.
    pub quality: u8,
    /// Request interlaced/progressive output where the encoder supports it.
    pub interlace: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            quality: 80,
            interlace: true,
        }
    }
}

/// Quality-parameterized image recompression.
pub struct ImageOptimize {
    options: ImageOptions,
}

impl ImageOptimize {
    pub fn new(options: ImageOptions) -> Self {
        Self { options }
    }

    fn recompress(&self, entry: &FileEntry, ext: &str) -> Result<Vec<u8>, TransformCause> {
        let img = image::load_from_memory(&entry.contents)
            .map_err(|e| TransformCause::Image(e.to_string()))?;

        let mut out = Cursor::new(Vec::new());
        match ext {
            "jpg" | "jpeg" => {
                if self.options.interlace {
                    // The encoder emits baseline JPEG only.
                    debug!(path = %entry.path.display(), "progressive output unavailable, encoding baseline");
                }
                img.write_to(&mut out, ImageOutputFormat::Jpeg(self.options.quality))
                    .map_err(|e| TransformCause::Image(e.to_string()))?;
            }
            "png" => {
                let encoder = PngEncoder::new_with_quality(
                    &mut out,
                    CompressionType::Best,
                    FilterType::Adaptive,
                );
                encoder
                    .write_image(img.as_bytes(), img.width(), img.height(), img.color())
                    .map_err(|e| TransformCause::Image(e.to_string()))?;
            }
            _ => unreachable!("recompress called for unsupported extension"),
        }

        Ok(out.into_inner())
    }
}

impl Transform for ImageOptimize {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&self, input: FileSet) -> Result<FileSet, TransformError> {
        let mut out = Vec::with_capacity(input.len());

        for entry in input {
            let ext = entry.extension().unwrap_or_default();
            match ext.as_str() {
                "jpg" | "jpeg" | "png" => {
                    let recompressed = self
                        .recompress(&entry, &ext)
                        .map_err(|cause| TransformError::new(NAME, &entry.path, cause))?;

                    // Recompression is only a win when it actually shrinks.
                    let contents = if recompressed.len() < entry.contents.len() {
                        recompressed
                    } else {
                        entry.contents
                    };

                    debug!(path = %entry.path.display(), bytes = contents.len(), "optimized image");
                    out.push(FileEntry::new(entry.path, contents));
                }
                _ => out.push(entry),
            }
        }

        Ok(FileSet::new(out))
    }
}
