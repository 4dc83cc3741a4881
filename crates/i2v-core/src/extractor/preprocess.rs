//! Image preprocessing shared by the ONNX backends.
//!
//! The illustration2vec networks expect:
//! - a fixed square input (224×224 for the released models)
//! - channel order BGR
//! - per-channel mean subtraction on the 0-255 scale, no further scaling
//! - tensor layout NCHW [batch, channels, height, width]

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb};
use ndarray::{s, Array3, Array4, ArrayView3};

use crate::error::ExtractError;
use crate::normalize::CHANNELS;

/// Mean pixel of the training set, BGR order.
pub const DEFAULT_MEAN: [f32; 3] = [164.761_39, 167.478_65, 181.138_39];

/// Bilinear resize of an H×W×3 float image.
///
/// Values are mapped into [0, 1] by the image's own min/max before resizing
/// and mapped back afterwards. A constant image resizes to the same constant.
pub fn resize(
    image: ArrayView3<'_, f32>,
    height: u32,
    width: u32,
) -> Result<Array3<f32>, ExtractError> {
    let (h, w, _) = image.dim();
    let out_dim = (height as usize, width as usize, CHANNELS);

    let (min, max) = image
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if max <= min {
        let fill = if min.is_finite() { min } else { 0.0 };
        return Ok(Array3::from_elem(out_dim, fill));
    }

    let range = max - min;
    let scaled: Vec<f32> = image.iter().map(|&v| (v - min) / range).collect();
    let buffer: ImageBuffer<Rgb<f32>, Vec<f32>> =
        ImageBuffer::from_raw(w as u32, h as u32, scaled).ok_or_else(|| {
            ExtractError::Preprocess(format!("cannot view {h}x{w} image as RGB buffer"))
        })?;

    let resized = imageops::resize(&buffer, width, height, FilterType::Triangle);
    let data: Vec<f32> = resized
        .into_raw()
        .into_iter()
        .map(|v| v * range + min)
        .collect();

    Array3::from_shape_vec(out_dim, data).map_err(|e| ExtractError::Preprocess(e.to_string()))
}

/// Take the centered `crop`×`crop` window of an H×W×C image.
pub fn center_crop(image: Array3<f32>, crop: u32) -> Result<Array3<f32>, ExtractError> {
    let (h, w, _) = image.dim();
    let crop = crop as usize;
    if crop > h || crop > w {
        return Err(ExtractError::Preprocess(format!(
            "crop size {crop} exceeds image size {h}x{w}"
        )));
    }
    if crop == h && crop == w {
        return Ok(image);
    }
    let top = (h - crop) / 2;
    let left = (w - crop) / 2;
    Ok(image
        .slice(s![top..top + crop, left..left + crop, ..])
        .to_owned())
}

/// Stack equally sized H×W×3 RGB images into a BGR, mean-subtracted NCHW batch.
pub fn to_network_input(
    images: &[Array3<f32>],
    mean: [f32; 3],
) -> Result<Array4<f32>, ExtractError> {
    let Some(first) = images.first() else {
        return Ok(Array4::zeros((0, CHANNELS, 0, 0)));
    };
    let (h, w, _) = first.dim();
    if let Some(bad) = images.iter().find(|img| img.dim() != first.dim()) {
        return Err(ExtractError::Preprocess(format!(
            "image shape mismatch in batch: expected {:?}, got {:?}",
            first.dim(),
            bad.dim()
        )));
    }

    let mut batch = Array4::<f32>::zeros((images.len(), CHANNELS, h, w));
    for (n, img) in images.iter().enumerate() {
        for c in 0..CHANNELS {
            // RGB -> BGR
            let src = img.slice(s![.., .., CHANNELS - 1 - c]);
            batch
                .slice_mut(s![n, c, .., ..])
                .zip_mut_with(&src, |dst, &v| *dst = v - mean[c]);
        }
    }
    Ok(batch)
}
