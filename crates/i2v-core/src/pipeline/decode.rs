//! Image decoding into estimator-ready tensors.

use image::{DynamicImage, ImageFormat};
use ndarray::{ArrayD, IxDyn};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::normalize::CHANNELS;

use super::hash::Hasher;

/// Reads and decodes image files.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

/// A decoded input image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Source file
    pub path: PathBuf,
    /// BLAKE3 hash of the file contents
    pub content_hash: String,
    /// Pixel data on the 0-255 scale: H×W for grayscale, H×W×C otherwise
    pub pixels: ArrayD<f32>,
    /// Detected image format
    pub format: ImageFormat,
}

impl ImageDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Read, hash and decode a file. The file is read once for both.
    pub fn decode(&self, path: &Path) -> Result<DecodedImage, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content_hash = Hasher::content_hash_from_bytes(&bytes);
        let (image, format) = Self::decode_bytes(bytes, path)?;

        tracing::debug!(
            "Decoded {:?} ({:?}, {}x{})",
            path,
            format,
            image.width(),
            image.height()
        );

        Ok(DecodedImage {
            path: path.to_path_buf(),
            content_hash,
            pixels: to_tensor(&image, path)?,
            format,
        })
    }

    /// Decode an in-memory buffer, detecting the format from its content.
    fn decode_bytes(
        bytes: Vec<u8>,
        path: &Path,
    ) -> Result<(DynamicImage, ImageFormat), PipelineError> {
        let decode_err = |message: String| PipelineError::Decode {
            path: path.to_path_buf(),
            message,
        };

        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| decode_err(format!("Cannot detect image format: {e}")))?;
        let format = match reader.format() {
            Some(f) => f,
            None => ImageFormat::from_path(path)
                .map_err(|_| decode_err("Unrecognized image format".to_string()))?,
        };
        let image = reader.decode().map_err(|e| decode_err(e.to_string()))?;
        Ok((image, format))
    }
}

/// Convert a decoded image into a raw tensor in the 0-255 value range.
///
/// Grayscale images become rank 2; images with an alpha channel become
/// H×W×4 (alpha is dropped later by normalization); everything else H×W×3.
fn to_tensor(image: &DynamicImage, path: &Path) -> Result<ArrayD<f32>, PipelineError> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_) => {
            let data = image.to_luma8().into_raw();
            shaped(data, &[h, w], path)
        }
        img if img.color().has_alpha() => shaped(img.to_rgba8().into_raw(), &[h, w, 4], path),
        img => shaped(img.to_rgb8().into_raw(), &[h, w, CHANNELS], path),
    }
}

fn shaped(data: Vec<u8>, shape: &[usize], path: &Path) -> Result<ArrayD<f32>, PipelineError> {
    let data: Vec<f32> = data.into_iter().map(f32::from).collect();
    ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|e| PipelineError::Decode {
        path: path.to_path_buf(),
        message: format!("pixel buffer does not match {shape:?}: {e}"),
    })
}
