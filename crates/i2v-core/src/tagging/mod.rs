//! Tag catalog, per-segment ranking and plausibility thresholds.
//!
//! The network emits one probability per catalog tag; this module maps those
//! positions back to names, ranks them within each segment and filters them
//! with a [`ThresholdRule`].

pub mod catalog;
pub mod ranking;
pub mod threshold;

pub use catalog::{Segment, TagCatalog, CATALOG_SIZE};
pub use ranking::rank_segment;
pub use threshold::{FBeta, ThresholdRule, ThresholdTable};
