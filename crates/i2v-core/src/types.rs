//! Result types returned by the estimator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tagging::Segment;

/// A tag name with the probability the network assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTag {
    /// The tag name as it appears in the tag list
    pub name: String,

    /// Sigmoid output of the network, 0.0 to 1.0
    pub probability: f32,
}

impl ScoredTag {
    pub fn new(name: impl Into<String>, probability: f32) -> Self {
        Self {
            name: name.into(),
            probability,
        }
    }
}

/// Ranked tags of one image, grouped by segment.
///
/// Every list is ordered by descending probability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentedTags {
    pub general: Vec<ScoredTag>,
    pub character: Vec<ScoredTag>,
    pub copyright: Vec<ScoredTag>,
    pub rating: Vec<ScoredTag>,
}

impl SegmentedTags {
    pub fn get_mut(&mut self, segment: Segment) -> &mut Vec<ScoredTag> {
        match segment {
            Segment::General => &mut self.general,
            Segment::Character => &mut self.character,
            Segment::Copyright => &mut self.copyright,
            Segment::Rating => &mut self.rating,
        }
    }
}

/// Probabilities of explicitly requested tags for one image.
pub type SpecificTags = BTreeMap<String, f32>;
