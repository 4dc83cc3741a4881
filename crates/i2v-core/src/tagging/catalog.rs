//! The ordered tag list the network predicts over.
//!
//! Positions are fixed by the trained model: the 1539 outputs are split into
//! four contiguous segments (general, character, copyright, rating).

use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EstimateError, I2vError, LoadError};

/// Number of tags the model predicts.
pub const CATALOG_SIZE: usize = 1539;

/// One of the four contiguous index ranges of the prediction vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    General,
    Character,
    Copyright,
    Rating,
}

impl Segment {
    /// All segments in catalog order.
    pub const ALL: [Segment; 4] = [
        Segment::General,
        Segment::Character,
        Segment::Copyright,
        Segment::Rating,
    ];

    /// Catalog positions covered by this segment.
    pub fn range(self) -> Range<usize> {
        match self {
            Segment::General => 0..512,
            Segment::Character => 512..1024,
            Segment::Copyright => 1024..1536,
            Segment::Rating => 1536..CATALOG_SIZE,
        }
    }

    /// Number of tags in this segment.
    pub fn len(self) -> usize {
        self.range().len()
    }

}

/// Immutable ordered tag names with a name → position index.
#[derive(Debug, Clone)]
pub struct TagCatalog {
    tags: Vec<String>,
    by_name: HashMap<String, usize>,
}

impl TagCatalog {
    /// Build a catalog from an ordered tag list of exactly [`CATALOG_SIZE`] names.
    ///
    /// Names are expected to be unique. If one repeats, lookups resolve to its
    /// last position.
    pub fn new(tags: Vec<String>) -> Result<Self, EstimateError> {
        if tags.len() != CATALOG_SIZE {
            return Err(EstimateError::InvalidCatalogSize {
                expected: CATALOG_SIZE,
                actual: tags.len(),
            });
        }

        let by_name: HashMap<String, usize> = tags
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        if by_name.len() != tags.len() {
            tracing::warn!(
                "Tag list contains {} duplicate name(s)",
                tags.len() - by_name.len()
            );
        }

        Ok(Self { tags, by_name })
    }

    /// Load a catalog from a JSON array of tag names.
    pub fn load(path: &Path) -> Result<Self, I2vError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tags: Vec<String> =
            serde_json::from_str(&content).map_err(|source| LoadError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let catalog = Self::new(tags)?;
        tracing::info!("Loaded tag catalog: {} tags from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// Position of a tag name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn all_tags(&self) -> &[String] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn synthetic_tags() -> Vec<String> {
    (0..CATALOG_SIZE).map(|i| format!("t{i}")).collect()
}
