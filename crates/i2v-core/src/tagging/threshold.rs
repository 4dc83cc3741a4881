//! Per-tag F-score thresholds and the rules that select between them.
//!
//! The table has one row per catalog tag and three columns holding the
//! thresholds that maximize F0.5, F1 and F2 on the validation set.

use std::fmt;
use std::fs::File;
use std::path::Path;

use ndarray::Array2;
use ndarray_npy::{NpzReader, ReadNpyExt};

use crate::error::{EstimateError, I2vError, LoadError};

/// Entry name of the threshold matrix inside an `.npz` archive.
const NPZ_ENTRY: &str = "threshold";

/// Which F-score a per-tag threshold was optimized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FBeta {
    F05,
    F1,
    F2,
}

impl FBeta {
    /// Column of the threshold table holding this score's thresholds.
    pub fn column(self) -> usize {
        match self {
            FBeta::F05 => 0,
            FBeta::F1 => 1,
            FBeta::F2 => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FBeta::F05 => "f0.5",
            FBeta::F1 => "f1",
            FBeta::F2 => "f2",
        }
    }
}

/// Filter applied to ranked tags by plausible-tag estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdRule {
    /// Keep tags with probability strictly above a fixed value.
    Constant(f32),
    /// Keep tags with probability strictly above their own table entry.
    FScore(FBeta),
}

impl Default for ThresholdRule {
    fn default() -> Self {
        ThresholdRule::Constant(0.25)
    }
}

impl ThresholdRule {
    /// Build a rule from its name; `threshold` is only used by `constant`.
    pub fn parse(name: &str, threshold: f32) -> Result<Self, EstimateError> {
        match name {
            "constant" => Ok(ThresholdRule::Constant(threshold)),
            "f0.5" => Ok(ThresholdRule::FScore(FBeta::F05)),
            "f1" => Ok(ThresholdRule::FScore(FBeta::F1)),
            "f2" => Ok(ThresholdRule::FScore(FBeta::F2)),
            other => Err(EstimateError::UnknownThresholdRule(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ThresholdRule::Constant(_) => "constant",
            ThresholdRule::FScore(beta) => beta.name(),
        }
    }
}

impl fmt::Display for ThresholdRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdRule::Constant(t) => write!(f, "constant({t})"),
            ThresholdRule::FScore(beta) => f.write_str(beta.name()),
        }
    }
}

/// N×3 matrix of per-tag thresholds.
#[derive(Debug, Clone)]
pub struct ThresholdTable {
    values: Array2<f32>,
}

impl ThresholdTable {
    /// Wrap an N×3 matrix.
    pub fn new(values: Array2<f32>) -> Result<Self, LoadError> {
        if values.ncols() != 3 {
            return Err(LoadError::Array {
                path: Default::default(),
                message: format!(
                    "threshold table must have 3 columns, got shape {:?}",
                    values.shape()
                ),
            });
        }
        Ok(Self { values })
    }

    /// Load a threshold table. The format is chosen by extension:
    /// `.npz` (entry `threshold`), `.npy`, or `.json` (array of 3-element rows).
    pub fn load(path: &Path) -> Result<Self, I2vError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        let values = match ext.as_deref() {
            Some("npz") => Self::read_npz(path)?,
            Some("npy") => Self::read_npy(path)?,
            Some("json") => Self::read_json(path)?,
            _ => return Err(LoadError::UnsupportedFormat(path.to_path_buf()).into()),
        };

        let table = Self::new(values).map_err(|e| match e {
            LoadError::Array { message, .. } => LoadError::Array {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        tracing::info!("Loaded threshold table: {} rows from {:?}", table.len(), path);
        Ok(table)
    }

    fn read_npz(path: &Path) -> Result<Array2<f32>, LoadError> {
        let array_err = |message: String| LoadError::Array {
            path: path.to_path_buf(),
            message,
        };
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut npz = NpzReader::new(file).map_err(|e| array_err(e.to_string()))?;
        let names = npz.names().map_err(|e| array_err(e.to_string()))?;
        let entry = names
            .into_iter()
            .find(|n| n == NPZ_ENTRY || n.strip_suffix(".npy") == Some(NPZ_ENTRY))
            .ok_or_else(|| array_err(format!("archive has no {NPZ_ENTRY:?} entry")))?;

        // numpy writes float64 by default; accept both widths.
        match npz.by_name::<_, ndarray::Ix2>(&entry) {
            Ok(values) => Ok(values),
            Err(_) => npz
                .by_name::<ndarray::OwnedRepr<f64>, ndarray::Ix2>(&entry)
                .map(|values| values.mapv(|v| v as f32))
                .map_err(|e| array_err(e.to_string())),
        }
    }

    fn read_npy(path: &Path) -> Result<Array2<f32>, LoadError> {
        let open = || {
            File::open(path).map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })
        };
        match Array2::<f32>::read_npy(open()?) {
            Ok(values) => Ok(values),
            Err(_) => Array2::<f64>::read_npy(open()?)
                .map(|values| values.mapv(|v| v as f32))
                .map_err(|e| LoadError::Array {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }),
        }
    }

    fn read_json(path: &Path) -> Result<Array2<f32>, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rows: Vec<[f32; 3]> =
            serde_json::from_str(&content).map_err(|source| LoadError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        Array2::from_shape_vec((rows.len(), 3), flat).map_err(|e| LoadError::Array {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Threshold for the tag at `index` under the given F-score.
    pub fn get(&self, index: usize, beta: FBeta) -> Option<f32> {
        self.values.get((index, beta.column())).copied()
    }

    /// Number of rows (tags).
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }
}
