//! Review document and the accuracy structures persisted inside it.
//!
//! A review is one human pass over one capture session's detections. The raw
//! per-shelf payload (`slot_reviews`) is kept verbatim; the computed
//! `AccuracySnapshot` lives alongside it and is recomputed on every
//! submission.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw slot as captured on a shelf planogram.
///
/// `oos_update` is tri-state: `None` means no reviewer touched the slot,
/// `Some(_)` means a correction was recorded. Presence matters, not just the
/// value, so the field must stay `Option<bool>` end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotCapture {
    pub slot_number: u32,
    pub upc: String,
    pub product_name: String,
    pub oos: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oos_update: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelfPlanogram {
    pub slots: Vec<SlotCapture>,
}

/// One entry of the raw `slot_reviews` sequence. Legacy documents can lack
/// the nested planogram entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelfReview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planogram: Option<ShelfPlanogram>,
}

/// Per-shelf reviewer tallies keyed by shelf identifier. Old documents carry
/// partial or missing counts; absent values contribute zero downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OosShelfCounts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub over_detection_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missed_detection_count: Option<u32>,
}

/// A normalized slot: detection plus derived ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub slot_number: u32,
    pub upc: String,
    pub product_name: String,
    pub detected_oos: bool,
    pub correct_oos: bool,
}

/// A normalized shelf. `shelf_number` is 1-based and slot order preserves
/// capture order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shelf {
    pub shelf_number: u32,
    pub slots: Vec<Slot>,
}

/// False-positive / false-negative tallies for one slot or product set.
///
/// Everything but `count` is `None` when the owning shelf is excluded from
/// OOS automation, which is distinct from a computed bucket with zero
/// mismatches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyBucket {
    pub count: usize,
    pub false_positives: Option<u32>,
    pub false_negatives: Option<u32>,
    pub false_positives_percentage: Option<f64>,
    pub false_negatives_percentage: Option<f64>,
    pub accuracy: Option<f64>,
}

impl AccuracyBucket {
    /// Bucket for a shelf excluded from OOS automation: count only.
    pub fn disabled(count: usize) -> Self {
        Self {
            count,
            false_positives: None,
            false_negatives: None,
            false_positives_percentage: None,
            false_negatives_percentage: None,
            accuracy: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShelfAccuracy {
    #[serde(default)]
    pub shelf_number: u32,
    #[serde(default)]
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub slot_level_accuracy: Option<AccuracyBucket>,
    #[serde(default)]
    pub sku_level_accuracy: Option<AccuracyBucket>,
}

/// The persisted accuracy result for one review.
///
/// Every field defaults so the legacy empty `{}` snapshot still
/// deserializes. An empty snapshot means "computed, nothing to report" and
/// keeps the review out of the backfill sweep; SQL NULL means "never
/// computed".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccuracySnapshot {
    #[serde(default)]
    pub slot_level_accuracy: Option<AccuracyBucket>,
    #[serde(default)]
    pub sku_level_accuracy: Option<AccuracyBucket>,
    #[serde(default)]
    pub shelves: Vec<ShelfAccuracy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub device_id: String,
    pub session_id: String,
    pub category: Option<String>,
    pub slot_reviews: Vec<ShelfReview>,
    pub oos_reviews: BTreeMap<String, OosShelfCounts>,
    pub planogram_items_count: u32,
    pub detected_items_count: u32,
    pub accuracy: Option<AccuracySnapshot>,
    pub instock_accuracy: Option<f64>,
    pub oos_accuracy: Option<f64>,
    pub instock_items_count: Option<u32>,
    pub oos_items_count: Option<u32>,
    pub shelf_model: Option<String>,
    pub object_model: Option<String>,
    pub classification_model: Option<String>,
    pub review_timestamp: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Incoming review payload for one (device, session) pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewSubmission {
    #[serde(default)]
    pub slot_reviews: Vec<ShelfReview>,
    #[serde(default)]
    pub oos_reviews: BTreeMap<String, OosShelfCounts>,
    #[serde(default)]
    pub planogram_items_count: u32,
    #[serde(default)]
    pub detected_items_count: u32,
}
