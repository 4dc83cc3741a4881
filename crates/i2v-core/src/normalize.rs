//! Coercion of caller-supplied images into 3-channel float tensors.
//!
//! Accepts any `ndarray` array whose elements convert losslessly into `f32`:
//! - rank 2 (H×W, monochrome): the single channel is copied into all three
//! - rank 3 (H×W×C, C >= 3): only the first three channels are kept
//!
//! Values are copied as-is. No rescaling, no grayscale formula.

use ndarray::{s, Array3, ArrayBase, ArrayView3, Data, Dimension, Ix2, Ix3};

use crate::error::EstimateError;

/// Number of channels every normalized image has.
pub const CHANNELS: usize = 3;

/// An H×W×3 `f32` image ready to be handed to a feature extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage(Array3<f32>);

impl NormalizedImage {
    /// Borrow the underlying H×W×3 tensor.
    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.0.view()
    }
}

/// Normalize a single image.
pub fn normalize<S, D>(image: &ArrayBase<S, D>) -> Result<NormalizedImage, EstimateError>
where
    S: Data,
    S::Elem: Copy + Into<f32>,
    D: Dimension,
{
    let view = image.view().into_dyn();
    match view.ndim() {
        2 => {
            let mono = view
                .into_dimensionality::<Ix2>()
                .map_err(|_| EstimateError::InvalidImageShape { ndim: 2 })?;
            let (h, w) = mono.dim();
            let out = Array3::<f32>::from_shape_fn((h, w, CHANNELS), |(y, x, _)| {
                mono[[y, x]].into()
            });
            Ok(NormalizedImage(out))
        }
        3 => {
            let color = view
                .into_dimensionality::<Ix3>()
                .map_err(|_| EstimateError::InvalidImageShape { ndim: 3 })?;
            let channels = color.shape()[2];
            if channels < CHANNELS {
                return Err(EstimateError::InvalidImageChannels { channels });
            }
            let out: Array3<f32> = color.slice(s![.., .., ..CHANNELS]).mapv(Into::into);
            Ok(NormalizedImage(out))
        }
        ndim => Err(EstimateError::InvalidImageShape { ndim }),
    }
}

/// Normalize every image of a batch. One bad image fails the whole batch.
pub fn normalize_batch<S, D>(
    images: &[ArrayBase<S, D>],
) -> Result<Vec<NormalizedImage>, EstimateError>
where
    S: Data,
    S::Elem: Copy + Into<f32>,
    D: Dimension,
{
    images.iter().map(normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, Array1, Array4, ArrayD};

    #[test]
    fn test_monochrome_broadcasts_to_three_channels() {
        let mono = Array::from_shape_fn((4, 4), |(y, x)| (y * 4 + x) as f32);
        let out = normalize(&mono).unwrap();
        assert_eq!(out.view().shape(), &[4, 4, 3]);
        for c in 0..3 {
            assert_eq!(out.view().slice(s![.., .., c]), mono);
        }
    }

    #[test]
    fn test_alpha_channel_is_dropped() {
        let rgba = Array::from_shape_fn((2, 3, 4), |(y, x, c)| (y * 100 + x * 10 + c) as u8);
        let out = normalize(&rgba).unwrap();
        assert_eq!(out.view().shape(), &[2, 3, 3]);
        assert_eq!(out.view()[[1, 2, 2]], 122.0);
    }

    #[test]
    fn test_rgb_is_copied_without_rescale() {
        let rgb = Array::from_shape_fn((5, 7, 3), |(y, x, c)| (y + x + c) as f32 * 40.0);
        let out = normalize(&rgb).unwrap();
        assert_eq!(out.view(), rgb);
    }

    #[test]
    fn test_two_channel_image_is_rejected() {
        let la = Array3::<u8>::zeros((4, 4, 2));
        let err = normalize(&la).unwrap_err();
        assert!(matches!(err, EstimateError::InvalidImageChannels { channels: 2 }));
    }

    #[test]
    fn test_unsupported_rank_is_rejected() {
        let flat = Array1::<f32>::zeros(16);
        assert!(matches!(
            normalize(&flat).unwrap_err(),
            EstimateError::InvalidImageShape { ndim: 1 }
        ));

        let batch = Array4::<f32>::zeros((1, 4, 4, 3));
        assert!(matches!(
            normalize(&batch).unwrap_err(),
            EstimateError::InvalidImageShape { ndim: 4 }
        ));
    }

    #[test]
    fn test_batch_fails_on_any_bad_image() {
        let images = vec![
            ArrayD::<f32>::zeros(vec![4, 4]),
            ArrayD::<f32>::zeros(vec![4, 4, 2]),
            ArrayD::<f32>::zeros(vec![4, 4, 3]),
        ];
        assert!(normalize_batch(&images).is_err());
        assert_eq!(normalize_batch(&images[..1]).unwrap().len(), 1);
    }
}
