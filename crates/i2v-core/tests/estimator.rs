//! End-to-end estimator behavior against a fixed-output extractor.

use i2v_core::error::ExtractError;
use i2v_core::extractor::layer;
use i2v_core::{
    normalize, EstimateError, Estimator, FeatureExtractor, NormalizedImage, ScoredTag,
    TagCatalog, ThresholdRule, ThresholdTable, CATALOG_SIZE,
};
use ndarray::{Array2, Array3, ArrayD, IxDyn};

/// Probability row returned for every image.
fn fixed_row() -> Vec<f32> {
    let mut row: Vec<f32> = (0..CATALOG_SIZE).map(|j| 0.001 * (j % 7) as f32).collect();
    row[0] = 0.125;
    row[7] = 0.9;
    row[300] = 0.8;
    row[600] = 0.7;
    row[1000] = 0.95;
    row[1024] = 0.3;
    row[1535] = 0.31;
    row[1536] = 0.1;
    row[1537] = 0.6;
    row[1538] = 0.3;
    row
}

struct FixedExtractor {
    row: Vec<f32>,
}

impl FeatureExtractor for FixedExtractor {
    fn extract(
        &self,
        images: &[NormalizedImage],
        layer: &str,
    ) -> Result<ArrayD<f32>, ExtractError> {
        if layer != layer::PROB {
            return Err(ExtractError::UnknownLayer {
                layer: layer.to_string(),
                available: vec![layer::PROB.to_string()],
            });
        }
        let batch = images.len();
        let data: Vec<f32> = (0..batch).flat_map(|_| self.row.iter().copied()).collect();
        Ok(ArrayD::from_shape_vec(IxDyn(&[batch, CATALOG_SIZE, 1, 1]), data).unwrap())
    }
}

fn catalog() -> TagCatalog {
    TagCatalog::new((0..CATALOG_SIZE).map(|i| format!("t{i}")).collect()).unwrap()
}

fn estimator(thresholds: Option<ThresholdTable>) -> Estimator<FixedExtractor> {
    let extractor = FixedExtractor { row: fixed_row() };
    Estimator::new(extractor, Some(catalog()), thresholds).unwrap()
}

fn image() -> Array3<u8> {
    Array3::from_elem((8, 8, 3), 200)
}

fn names(tags: &[ScoredTag]) -> Vec<&str> {
    tags.iter().map(|t| t.name.as_str()).collect()
}

#[test]
fn top_two_tags_per_segment() {
    let result = estimator(None).estimate_top_tags(&[image()], 2).unwrap();
    assert_eq!(result.len(), 1);
    let tags = &result[0];

    assert_eq!(names(&tags.general), vec!["t7", "t300"]);
    assert_eq!(names(&tags.character), vec!["t1000", "t600"]);
    assert_eq!(names(&tags.copyright), vec!["t1535", "t1024"]);
    assert_eq!(names(&tags.rating), vec!["t1537", "t1538", "t1536"]);
    assert_eq!(tags.general[0].probability, 0.9);
    assert_eq!(tags.character[0].probability, 0.95);
}

#[test]
fn specific_tag_returns_exact_column_value() {
    let result = estimator(None)
        .estimate_specific_tags(&[image(), image()], &["t0", "t1537"])
        .unwrap();
    assert_eq!(result.len(), 2);
    for tags in &result {
        assert_eq!(tags["t0"], 0.125);
        assert_eq!(tags["t1537"], 0.6);
    }
}

#[test]
fn plausible_constant_threshold() {
    let result = estimator(None)
        .estimate_plausible_tags(&[image()], ThresholdRule::Constant(0.5))
        .unwrap();
    let tags = &result[0];
    assert_eq!(names(&tags.general), vec!["t7", "t300"]);
    assert_eq!(names(&tags.character), vec!["t1000", "t600"]);
    assert!(tags.copyright.is_empty());
    assert_eq!(tags.rating.len(), 3);
}

#[test]
fn plausible_fscore_threshold_from_json_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thresholds.json");
    let rows = vec![[0.85f32, 0.85, 0.85]; CATALOG_SIZE];
    std::fs::write(&path, serde_json::to_string(&rows).unwrap()).unwrap();

    let table = ThresholdTable::load(&path).unwrap();
    let result = estimator(Some(table))
        .estimate_plausible_tags_by_name(&[image()], 0.0, "f1")
        .unwrap();
    let tags = &result[0];
    assert_eq!(names(&tags.general), vec!["t7"]);
    assert_eq!(names(&tags.character), vec!["t1000"]);
    assert!(tags.copyright.is_empty());
    assert_eq!(tags.rating.len(), 3);
}

#[test]
fn fscore_rule_without_table_fails() {
    let err = estimator(None)
        .estimate_plausible_tags_by_name(&[image()], 0.0, "f0.5")
        .unwrap_err();
    assert!(matches!(err, EstimateError::ThresholdTableRequired { .. }));
}

#[test]
fn monochrome_image_broadcasts_to_three_channels() {
    let mono = Array2::from_shape_fn((4, 4), |(y, x)| (y * 4 + x) as u8);
    let normalized = normalize(&mono).unwrap();

    assert_eq!(normalized.view().shape(), &[4, 4, 3]);
    for ((y, x, _), &v) in normalized.view().indexed_iter() {
        assert_eq!(v, mono[[y, x]] as f32);
    }
}
