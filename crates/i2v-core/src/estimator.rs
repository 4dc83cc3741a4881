//! Tag estimation and feature extraction on top of a [`FeatureExtractor`].
//!
//! The estimator owns the (optional) tag catalog and threshold table, and
//! turns raw layer activations into per-image results. Every call is a pure
//! function of the input batch: nothing is cached between calls.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayBase, ArrayD, Data, Dimension};

use crate::error::{EstimateError, EstimateResult};
use crate::extractor::{layer, FeatureExtractor};
use crate::math::{pack_bits, BINARY_THRESHOLD};
use crate::normalize::normalize_batch;
use crate::tagging::{rank_segment, Segment, TagCatalog, ThresholdRule, ThresholdTable};
use crate::types::{ScoredTag, SegmentedTags, SpecificTags};

/// Default number of tags per segment for [`Estimator::estimate_top_tags`].
pub const DEFAULT_TOP_N: usize = 10;

/// Ranking depth used before plausible-tag filtering (a whole segment).
const PLAUSIBLE_DEPTH: usize = 512;

/// Illustration tag estimator.
pub struct Estimator<E> {
    extractor: E,
    catalog: Option<TagCatalog>,
    thresholds: Option<ThresholdTable>,
}

impl<E: FeatureExtractor> Estimator<E> {
    /// Create an estimator.
    ///
    /// Without a catalog only feature extraction is available; without a
    /// threshold table only the `constant` plausibility rule is.
    pub fn new(
        extractor: E,
        catalog: Option<TagCatalog>,
        thresholds: Option<ThresholdTable>,
    ) -> EstimateResult<Self> {
        if let (Some(catalog), Some(table)) = (&catalog, &thresholds) {
            if table.len() != catalog.len() {
                return Err(EstimateError::ThresholdTableSize {
                    expected: catalog.len(),
                    actual: table.len(),
                });
            }
        }
        Ok(Self {
            extractor,
            catalog,
            thresholds,
        })
    }

    fn require_catalog(&self) -> EstimateResult<&TagCatalog> {
        self.catalog.as_ref().ok_or(EstimateError::CatalogRequired)
    }

    /// Normalize the batch, run `layer` and flatten to one row per image.
    ///
    /// With `expected_dim`, the flattened width must match it exactly.
    fn run_layer<S, D>(
        &self,
        images: &[ArrayBase<S, D>],
        layer: &str,
        expected_dim: Option<usize>,
    ) -> EstimateResult<Array2<f32>>
    where
        S: Data,
        S::Elem: Copy + Into<f32>,
        D: Dimension,
    {
        let normalized = normalize_batch(images)?;
        if normalized.is_empty() {
            return Ok(Array2::zeros((0, expected_dim.unwrap_or(0))));
        }

        tracing::debug!("Extracting layer {:?} for {} image(s)", layer, normalized.len());
        let output = self.extractor.extract(&normalized, layer)?;
        flatten_rows(output, normalized.len(), layer, expected_dim)
    }

    /// Per-tag probabilities, one row of catalog length per image.
    pub fn estimate_probabilities<S, D>(
        &self,
        images: &[ArrayBase<S, D>],
    ) -> EstimateResult<Array2<f32>>
    where
        S: Data,
        S::Elem: Copy + Into<f32>,
        D: Dimension,
    {
        let catalog = self.require_catalog()?;
        self.run_layer(images, layer::PROB, Some(catalog.len()))
    }

    /// Probability of each requested tag, per image.
    pub fn estimate_specific_tags<S, D, T>(
        &self,
        images: &[ArrayBase<S, D>],
        tags: &[T],
    ) -> EstimateResult<Vec<SpecificTags>>
    where
        S: Data,
        S::Elem: Copy + Into<f32>,
        D: Dimension,
        T: AsRef<str>,
    {
        let catalog = self.require_catalog()?;
        let lookups = tags
            .iter()
            .map(|t| {
                let name = t.as_ref();
                catalog
                    .index_of(name)
                    .map(|i| (name, i))
                    .ok_or_else(|| EstimateError::UnknownTag(name.to_string()))
            })
            .collect::<EstimateResult<Vec<_>>>()?;

        let prob = self.estimate_probabilities(images)?;
        Ok(prob
            .rows()
            .into_iter()
            .map(|row| {
                lookups
                    .iter()
                    .map(|&(name, i)| (name.to_string(), row[i]))
                    .collect::<BTreeMap<_, _>>()
            })
            .collect())
    }

    /// The `n_tag` most probable tags of each segment, per image.
    ///
    /// `n_tag` is clamped to the segment size; the rating segment is always
    /// returned whole. Equal probabilities keep catalog order.
    pub fn estimate_top_tags<S, D>(
        &self,
        images: &[ArrayBase<S, D>],
        n_tag: usize,
    ) -> EstimateResult<Vec<SegmentedTags>>
    where
        S: Data,
        S::Elem: Copy + Into<f32>,
        D: Dimension,
    {
        let catalog = self.require_catalog()?;
        let prob = self.estimate_probabilities(images)?;
        Ok(rank_rows(catalog, &prob, n_tag, |_, _| true))
    }

    /// Tags passing `rule`, per image.
    ///
    /// General, character and copyright tags are filtered; rating tags are
    /// always returned. The rule is checked against the available threshold
    /// table before any inference runs.
    pub fn estimate_plausible_tags<S, D>(
        &self,
        images: &[ArrayBase<S, D>],
        rule: ThresholdRule,
    ) -> EstimateResult<Vec<SegmentedTags>>
    where
        S: Data,
        S::Elem: Copy + Into<f32>,
        D: Dimension,
    {
        let catalog = self.require_catalog()?;
        let table = match rule {
            ThresholdRule::Constant(_) => None,
            ThresholdRule::FScore(_) => Some(self.thresholds.as_ref().ok_or_else(|| {
                EstimateError::ThresholdTableRequired {
                    rule: rule.name().to_string(),
                }
            })?),
        };

        let prob = self.estimate_probabilities(images)?;
        Ok(rank_rows(catalog, &prob, PLAUSIBLE_DEPTH, |index, p| {
            match (rule, table) {
                (ThresholdRule::Constant(threshold), _) => p > threshold,
                (ThresholdRule::FScore(beta), Some(table)) => {
                    table.get(index, beta).is_some_and(|t| p > t)
                }
                (ThresholdRule::FScore(_), None) => false,
            }
        }))
    }

    /// [`estimate_plausible_tags`](Self::estimate_plausible_tags) with the rule
    /// given by name (`constant`, `f0.5`, `f1`, `f2`).
    pub fn estimate_plausible_tags_by_name<S, D>(
        &self,
        images: &[ArrayBase<S, D>],
        threshold: f32,
        rule: &str,
    ) -> EstimateResult<Vec<SegmentedTags>>
    where
        S: Data,
        S::Elem: Copy + Into<f32>,
        D: Dimension,
    {
        let rule = ThresholdRule::parse(rule, threshold)?;
        self.estimate_plausible_tags(images, rule)
    }

    /// Dense feature vectors, one row per image.
    pub fn extract_feature<S, D>(&self, images: &[ArrayBase<S, D>]) -> EstimateResult<Array2<f32>>
    where
        S: Data,
        S::Elem: Copy + Into<f32>,
        D: Dimension,
    {
        self.run_layer(images, layer::ENCODE, None)
    }

    /// Bit-packed binary feature vectors, `ceil(D / 8)` bytes per image.
    ///
    /// Dimension `i` is set when its activation is `> 0.5` and is stored in
    /// byte `i / 8` at bit `7 - i % 8` (most significant bit first).
    pub fn extract_binary_feature<S, D>(
        &self,
        images: &[ArrayBase<S, D>],
    ) -> EstimateResult<Array2<u8>>
    where
        S: Data,
        S::Elem: Copy + Into<f32>,
        D: Dimension,
    {
        let feature = self.run_layer(images, layer::ENCODE_NEURON, None)?;
        let packed_len = feature.ncols().div_ceil(8);
        let mut packed = Array2::<u8>::zeros((feature.nrows(), packed_len));
        for (row, mut out) in feature.rows().into_iter().zip(packed.rows_mut()) {
            let bits = pack_bits(&row.to_vec(), BINARY_THRESHOLD);
            out.assign(&ndarray::aview1(&bits));
        }
        Ok(packed)
    }
}

/// Flatten an extractor output to `batch` rows, checking its shape.
fn flatten_rows(
    output: ArrayD<f32>,
    batch: usize,
    layer: &str,
    expected_dim: Option<usize>,
) -> EstimateResult<Array2<f32>> {
    let shape = output.shape().to_vec();
    let mismatch = |expected: String| EstimateError::LayerShapeMismatch {
        layer: layer.to_string(),
        expected,
        actual: shape.clone(),
    };

    if shape.first() != Some(&batch) {
        return Err(mismatch(format!("leading dimension {batch}")));
    }
    let dim: usize = shape[1..].iter().product();
    if let Some(expected) = expected_dim {
        if dim != expected {
            return Err(mismatch(format!("{expected} values per image")));
        }
    }

    let flat = output
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order((batch, dim))
        .map_err(|e| mismatch(format!("a reshapeable tensor ({e})")))?;
    Ok(flat)
}

/// Rank every row per segment, keeping tags accepted by `keep`.
///
/// `keep` sees the catalog index and probability. The rating segment is
/// always returned whole and bypasses it.
fn rank_rows<F>(
    catalog: &TagCatalog,
    prob: &Array2<f32>,
    depth: usize,
    keep: F,
) -> Vec<SegmentedTags>
where
    F: Fn(usize, f32) -> bool,
{
    prob.rows()
        .into_iter()
        .map(|row| {
            let row = row.to_vec();
            let mut tags = SegmentedTags::default();
            for segment in Segment::ALL {
                let n = match segment {
                    Segment::Rating => segment.len(),
                    _ => depth,
                };
                let ranked = rank_segment(&row, segment, n)
                    .into_iter()
                    .filter(|&i| segment == Segment::Rating || keep(i, row[i]))
                    .map(|i| ScoredTag::new(&catalog.all_tags()[i], row[i]));
                tags.get_mut(segment).extend(ranked);
            }
            tags
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use crate::math::unpack_bits;
    use crate::normalize::NormalizedImage;
    use crate::tagging::catalog::synthetic_tags;
    use crate::tagging::{FBeta, CATALOG_SIZE};
    use ndarray::{Array3, Array4, IxDyn};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic stand-in for a real backend.
    struct StubExtractor {
        calls: AtomicUsize,
    }

    impl StubExtractor {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn prob(image: usize, tag: usize) -> f32 {
            ((tag * 37 + image * 11) % 101) as f32 / 100.0
        }

        fn encode(image: usize, dim: usize) -> f32 {
            ((dim * 13 + image * 7) % 17) as f32 / 16.0
        }
    }

    impl FeatureExtractor for StubExtractor {
        fn extract(
            &self,
            images: &[NormalizedImage],
            layer: &str,
        ) -> Result<ArrayD<f32>, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let b = images.len();
            match layer {
                layer::PROB => {
                    let prob = Array4::from_shape_fn((b, CATALOG_SIZE, 1, 1), |(i, t, _, _)| {
                        Self::prob(i, t)
                    });
                    Ok(prob.into_dyn())
                }
                layer::ENCODE | layer::ENCODE_NEURON => {
                    Ok(Array2::from_shape_fn((b, 20), |(i, d)| Self::encode(i, d)).into_dyn())
                }
                other => Err(ExtractError::UnknownLayer {
                    layer: other.to_string(),
                    available: vec![],
                }),
            }
        }
    }

    /// Returns a fixed tensor regardless of input.
    struct FixedExtractor(ArrayD<f32>);

    impl FeatureExtractor for FixedExtractor {
        fn extract(&self, _: &[NormalizedImage], _: &str) -> Result<ArrayD<f32>, ExtractError> {
            Ok(self.0.clone())
        }
    }

    fn catalog() -> TagCatalog {
        TagCatalog::new(synthetic_tags()).unwrap()
    }

    fn images(n: usize) -> Vec<Array3<u8>> {
        (0..n).map(|_| Array3::zeros((8, 8, 3))).collect()
    }

    fn estimator() -> Estimator<StubExtractor> {
        Estimator::new(StubExtractor::new(), Some(catalog()), None).unwrap()
    }

    #[test]
    fn test_probabilities_shape() {
        let prob = estimator().estimate_probabilities(&images(3)).unwrap();
        assert_eq!(prob.dim(), (3, CATALOG_SIZE));
        assert_eq!(prob[[2, 5]], StubExtractor::prob(2, 5));
    }

    #[test]
    fn test_tag_modes_require_catalog() {
        let est = Estimator::new(StubExtractor::new(), None, None).unwrap();
        let imgs = images(1);
        assert!(matches!(
            est.estimate_probabilities(&imgs),
            Err(EstimateError::CatalogRequired)
        ));
        assert!(matches!(
            est.estimate_top_tags(&imgs, 10),
            Err(EstimateError::CatalogRequired)
        ));
        assert!(matches!(
            est.estimate_specific_tags(&imgs, &["t0"]),
            Err(EstimateError::CatalogRequired)
        ));
        // Feature extraction does not need one.
        assert_eq!(est.extract_feature(&imgs).unwrap().dim(), (1, 20));
    }

    #[test]
    fn test_specific_tags_are_exact() {
        let est = estimator();
        let imgs = images(2);
        let prob = est.estimate_probabilities(&imgs).unwrap();
        let result = est.estimate_specific_tags(&imgs, &["t0", "t1537"]).unwrap();
        assert_eq!(result.len(), 2);
        for (i, tags) in result.iter().enumerate() {
            assert_eq!(tags.len(), 2);
            assert_eq!(tags["t0"], prob[[i, 0]]);
            assert_eq!(tags["t1537"], prob[[i, 1537]]);
        }
    }

    #[test]
    fn test_unknown_tag_fails_before_inference() {
        let est = estimator();
        let err = est
            .estimate_specific_tags(&images(1), &["t0", "nope"])
            .unwrap_err();
        assert!(matches!(err, EstimateError::UnknownTag(ref t) if t == "nope"));
        assert_eq!(est.extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_top_tags_sizes_and_order() {
        let result = estimator().estimate_top_tags(&images(2), 10).unwrap();
        assert_eq!(result.len(), 2);
        for tags in &result {
            for ranked in [&tags.general, &tags.character, &tags.copyright] {
                assert_eq!(ranked.len(), 10);
                assert!(ranked
                    .windows(2)
                    .all(|w| w[0].probability >= w[1].probability));
            }
            assert_eq!(tags.rating.len(), 3);
        }
    }

    #[test]
    fn test_top_tags_keeps_whole_rating_segment() {
        let result = estimator().estimate_top_tags(&images(1), 1).unwrap();
        assert_eq!(result[0].general.len(), 1);
        assert_eq!(result[0].rating.len(), 3);
    }

    #[test]
    fn test_top_tags_clamps_to_segment() {
        let result = estimator().estimate_top_tags(&images(1), 600).unwrap();
        assert_eq!(result[0].general.len(), 512);
        assert_eq!(result[0].character.len(), 512);
        assert_eq!(result[0].rating.len(), 3);
    }

    #[test]
    fn test_plausible_constant_filters_strictly() {
        let result = estimator()
            .estimate_plausible_tags(&images(2), ThresholdRule::Constant(0.5))
            .unwrap();
        for tags in &result {
            for kept in [&tags.general, &tags.character, &tags.copyright] {
                assert!(!kept.is_empty());
                assert!(kept.iter().all(|t| t.probability > 0.5));
            }
            assert_eq!(tags.rating.len(), 3);
        }
        // 0.5 itself occurs in the stub output and must be excluded.
        let exact = result[0]
            .general
            .iter()
            .filter(|t| t.probability == 0.5)
            .count();
        assert_eq!(exact, 0);
    }

    #[test]
    fn test_plausible_fscore_uses_table_column() {
        // Column 1 (F1) lets only t3 and t600 through; the others block everything.
        let mut values = Array2::<f32>::from_elem((CATALOG_SIZE, 3), 2.0);
        values[[3, 1]] = 0.0;
        values[[600, 1]] = 0.0;
        let table = ThresholdTable::new(values).unwrap();
        let est = Estimator::new(StubExtractor::new(), Some(catalog()), Some(table)).unwrap();

        let result = est
            .estimate_plausible_tags(&images(1), ThresholdRule::FScore(FBeta::F1))
            .unwrap();
        let names = |tags: &[ScoredTag]| {
            tags.iter().map(|t| t.name.clone()).collect::<Vec<_>>()
        };
        assert_eq!(names(&result[0].general), vec!["t3"]);
        assert_eq!(names(&result[0].character), vec!["t600"]);
        assert!(result[0].copyright.is_empty());
        assert_eq!(result[0].rating.len(), 3);

        let result = est
            .estimate_plausible_tags(&images(1), ThresholdRule::FScore(FBeta::F2))
            .unwrap();
        assert!(result[0].general.is_empty());
    }

    #[test]
    fn test_plausible_fscore_without_table() {
        let est = estimator();
        let err = est
            .estimate_plausible_tags_by_name(&images(1), 0.25, "f1")
            .unwrap_err();
        assert!(matches!(
            err,
            EstimateError::ThresholdTableRequired { ref rule } if rule == "f1"
        ));
        assert_eq!(est.extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_plausible_unknown_rule() {
        let est = estimator();
        let err = est
            .estimate_plausible_tags_by_name(&images(1), 0.25, "f3")
            .unwrap_err();
        assert!(matches!(err, EstimateError::UnknownThresholdRule(_)));
        assert_eq!(est.extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_threshold_table_must_match_catalog() {
        let table = ThresholdTable::new(Array2::zeros((10, 3))).unwrap();
        let result = Estimator::new(StubExtractor::new(), Some(catalog()), Some(table));
        assert!(matches!(
            result.err(),
            Some(EstimateError::ThresholdTableSize {
                expected: 1539,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_binary_feature_matches_thresholded_feature() {
        let est = estimator();
        let imgs = images(3);
        let feature = est.extract_feature(&imgs).unwrap();
        let binary = est.extract_binary_feature(&imgs).unwrap();
        assert_eq!(binary.dim(), (3, 3)); // ceil(20 / 8)
        for (f, b) in feature.rows().into_iter().zip(binary.rows()) {
            let bits = unpack_bits(&b.to_vec(), f.len());
            let expected: Vec<bool> = f.iter().map(|&v| v > 0.5).collect();
            assert_eq!(bits, expected);
        }
    }

    #[test]
    fn test_layer_shape_mismatch() {
        let est = Estimator::new(
            FixedExtractor(ArrayD::zeros(IxDyn(&[1, 1000]))),
            Some(catalog()),
            None,
        )
        .unwrap();
        assert!(matches!(
            est.estimate_probabilities(&images(1)),
            Err(EstimateError::LayerShapeMismatch { .. })
        ));

        // Leading dimension must equal the batch size.
        let est = Estimator::new(
            FixedExtractor(ArrayD::zeros(IxDyn(&[2, CATALOG_SIZE]))),
            Some(catalog()),
            None,
        )
        .unwrap();
        assert!(matches!(
            est.estimate_probabilities(&images(1)),
            Err(EstimateError::LayerShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_image_fails_whole_batch() {
        let est = estimator();
        let batch = vec![
            ArrayD::<f32>::zeros(IxDyn(&[4, 4, 3])),
            ArrayD::<f32>::zeros(IxDyn(&[4])),
        ];
        assert!(matches!(
            est.estimate_top_tags(&batch, 5),
            Err(EstimateError::InvalidImageShape { ndim: 1 })
        ));
        assert_eq!(est.extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_batch() {
        let est = estimator();
        let none: Vec<Array3<u8>> = vec![];
        assert!(est.estimate_top_tags(&none, 10).unwrap().is_empty());
        assert_eq!(est.extract_binary_feature(&none).unwrap().nrows(), 0);
        assert_eq!(est.extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_extractor_error_propagates() {
        let est = estimator();
        let err = est.run_layer(&images(1), "conv1", None).unwrap_err();
        assert!(matches!(
            err,
            EstimateError::Extraction(ExtractError::UnknownLayer { .. })
        ));
    }
}
