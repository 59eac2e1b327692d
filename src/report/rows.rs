use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::accuracy::round2;
use crate::db::models::{AccuracyBucket, Review};

/// One review flattened for reporting, derived from its persisted snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewReportRow {
    pub category: Option<String>,
    pub session_id: String,
    pub device_id: String,
    pub date: NaiveDate,
    pub planogram_items_count: u32,
    pub detected_items_count: u32,
    pub slot_false_negative_pct: f64,
    pub slot_false_positive_pct: f64,
    pub slot_accuracy: f64,
    pub sku_false_negative_pct: f64,
    pub sku_false_positive_pct: f64,
    pub sku_accuracy: f64,
    pub oos_accuracy: Option<f64>,
    pub instock_accuracy: Option<f64>,
}

impl ReviewReportRow {
    /// `None` when the review carries no snapshot, or the snapshot lacks
    /// either overall bucket (legacy empty `{}` snapshots).
    pub fn from_review(review: &Review) -> Option<Self> {
        let snapshot = review.accuracy.as_ref()?;
        let slot = snapshot.slot_level_accuracy.as_ref()?;
        let sku = snapshot.sku_level_accuracy.as_ref()?;

        Some(Self {
            category: review.category.clone(),
            session_id: review.session_id.clone(),
            device_id: review.device_id.clone(),
            date: review.created_at.date_naive(),
            planogram_items_count: review.planogram_items_count,
            detected_items_count: review.detected_items_count,
            slot_false_negative_pct: percentage_of(
                slot.false_negatives_percentage,
                slot.false_negatives,
                slot,
            ),
            slot_false_positive_pct: percentage_of(
                slot.false_positives_percentage,
                slot.false_positives,
                slot,
            ),
            slot_accuracy: slot.accuracy.unwrap_or(0.0),
            sku_false_negative_pct: percentage_of(
                sku.false_negatives_percentage,
                sku.false_negatives,
                sku,
            ),
            sku_false_positive_pct: percentage_of(
                sku.false_positives_percentage,
                sku.false_positives,
                sku,
            ),
            sku_accuracy: sku.accuracy.unwrap_or(0.0),
            oos_accuracy: review.oos_accuracy,
            instock_accuracy: review.instock_accuracy,
        })
    }
}

// Snapshots written before the percentage fields existed only carry the raw
// mismatch counts; recompute on the fly for those.
fn percentage_of(stored: Option<f64>, mismatches: Option<u32>, bucket: &AccuracyBucket) -> f64 {
    match stored {
        Some(pct) => pct,
        None => {
            let count = bucket.count.max(1);
            round2(f64::from(mismatches.unwrap_or(0)) / count as f64 * 100.0)
        }
    }
}

/// Slot- and SKU-level mismatch totals taken from the reviewer tallies
/// rather than the computed snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionCounts {
    pub over_detections: u32,
    pub missed_detections: u32,
    pub sku_over_detections: u32,
    pub sku_missed_detections: u32,
}

/// Total the per-shelf reviewer tallies and regroup the raw planograms to
/// product granularity. Legacy documents with missing tallies, absent
/// planograms, or fewer shelves than tally entries contribute zero for the
/// affected shelves instead of failing the report.
pub fn detection_counts(review: &Review) -> DetectionCounts {
    let mut counts = DetectionCounts::default();

    for tally in review.oos_reviews.values() {
        counts.over_detections += tally.over_detection_count.unwrap_or(0);
        counts.missed_detections += tally.missed_detection_count.unwrap_or(0);
    }

    for idx in 0..review.oos_reviews.len() {
        let slots = review
            .slot_reviews
            .get(idx)
            .and_then(|shelf| shelf.planogram.as_ref())
            .map(|planogram| planogram.slots.as_slice())
            .unwrap_or(&[]);

        // Product rollup: detected OOS if any facing was, corrected by the
        // first recorded reviewer update.
        let mut products: BTreeMap<&str, (bool, Option<bool>)> = BTreeMap::new();
        for slot in slots {
            let entry = products
                .entry(slot.product_name.as_str())
                .or_insert((false, None));
            entry.0 = entry.0 || slot.oos;
            if entry.1.is_none() {
                entry.1 = slot.oos_update;
            }
        }

        for (detected_oos, oos_update) in products.values() {
            match (detected_oos, oos_update) {
                (true, Some(false)) => counts.sku_over_detections += 1,
                (false, Some(true)) => counts.sku_missed_detections += 1,
                _ => {}
            }
        }
    }

    counts
}

/// One review flattened for the grouped summary report, computed from the
/// reviewer tallies.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewTallyRow {
    pub session_id: String,
    pub device_id: String,
    pub date: NaiveDate,
    pub planogram_items_count: u32,
    pub detected_items_count: u32,
    pub false_positives: u32,
    pub false_negatives: u32,
    pub false_positive_pct: f64,
    pub false_negative_pct: f64,
    pub accuracy: f64,
    pub sku_accuracy: f64,
    pub has_snapshot: bool,
}

impl ReviewTallyRow {
    pub fn from_review(review: &Review) -> Self {
        let counts = detection_counts(review);
        // Guard the ratio for legacy reviews persisted without item counts.
        let total_items = f64::from(review.planogram_items_count.max(1));

        let false_positive_pct = round2(f64::from(counts.over_detections) / total_items * 100.0);
        let false_negative_pct = round2(f64::from(counts.missed_detections) / total_items * 100.0);
        let sku_fp_pct = round2(f64::from(counts.sku_over_detections) / total_items * 100.0);
        let sku_fn_pct = round2(f64::from(counts.sku_missed_detections) / total_items * 100.0);

        Self {
            session_id: review.session_id.clone(),
            device_id: review.device_id.clone(),
            date: review.created_at.date_naive(),
            planogram_items_count: review.planogram_items_count,
            detected_items_count: review.detected_items_count,
            false_positives: counts.over_detections,
            false_negatives: counts.missed_detections,
            false_positive_pct,
            false_negative_pct,
            accuracy: round2(100.0 - false_positive_pct - false_negative_pct),
            sku_accuracy: round2(100.0 - sku_fp_pct - sku_fn_pct),
            has_snapshot: review.accuracy.is_some(),
        }
    }
}
