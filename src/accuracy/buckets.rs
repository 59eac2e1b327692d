use std::collections::BTreeMap;

use crate::accuracy::gate::shelf_enabled;
use crate::db::models::{AccuracyBucket, AccuracySnapshot, Shelf, ShelfAccuracy, Slot};

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One detection collapsed to product granularity.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProductDetection {
    pub detected_oos: bool,
    pub correct_oos: bool,
}

/// Collapse slots to one record per distinct UPC, AND-reducing both flags:
/// a product counts as out-of-stock only when every one of its facings is.
pub(crate) fn collapse_by_upc(slots: &[Slot]) -> Vec<ProductDetection> {
    let mut products: BTreeMap<&str, ProductDetection> = BTreeMap::new();

    for slot in slots {
        products
            .entry(slot.upc.as_str())
            .and_modify(|product| {
                product.detected_oos = product.detected_oos && slot.detected_oos;
                product.correct_oos = product.correct_oos && slot.correct_oos;
            })
            .or_insert(ProductDetection {
                detected_oos: slot.detected_oos,
                correct_oos: slot.correct_oos,
            });
    }

    products.into_values().collect()
}

/// Core counting routine shared by the slot-level and SKU-level entries.
///
/// The disabled-gate check comes before the empty check: a disabled shelf
/// yields the count-only bucket even with zero slots, while an enabled shelf
/// with no slots yields `None` ("no data", distinct from perfect).
fn detection_accuracy<I>(detections: I, count: usize, enabled: bool) -> Option<AccuracyBucket>
where
    I: IntoIterator<Item = (bool, bool)>,
{
    if !enabled {
        return Some(AccuracyBucket::disabled(count));
    }
    if count == 0 {
        return None;
    }

    let mut false_positives = 0u32;
    let mut false_negatives = 0u32;
    for (detected_oos, correct_oos) in detections {
        if !detected_oos && correct_oos {
            // Detected as in-stock, but actually out-of-stock.
            false_negatives += 1;
        } else if detected_oos && !correct_oos {
            // Detected as out-of-stock, but actually in-stock.
            false_positives += 1;
        }
    }

    let total = count as f64;
    let mismatch_percentage =
        |mismatches: u32| round2(f64::from(mismatches) / total * 100.0);

    Some(AccuracyBucket {
        count,
        false_positives: Some(false_positives),
        false_negatives: Some(false_negatives),
        false_positives_percentage: Some(mismatch_percentage(false_positives)),
        false_negatives_percentage: Some(mismatch_percentage(false_negatives)),
        accuracy: Some(round2(
            100.0 * (total - f64::from(false_positives) - f64::from(false_negatives)) / total,
        )),
    })
}

pub fn slot_level_accuracy(slots: &[Slot], enabled: bool) -> Option<AccuracyBucket> {
    detection_accuracy(
        slots.iter().map(|slot| (slot.detected_oos, slot.correct_oos)),
        slots.len(),
        enabled,
    )
}

/// Like `slot_level_accuracy`, after collapsing multi-facing products to one
/// record per UPC. The disabled bucket still reports the raw slot count.
pub fn sku_level_accuracy(slots: &[Slot], enabled: bool) -> Option<AccuracyBucket> {
    if !enabled {
        return Some(AccuracyBucket::disabled(slots.len()));
    }
    if slots.is_empty() {
        return None;
    }

    let products = collapse_by_upc(slots);
    detection_accuracy(
        products
            .iter()
            .map(|product| (product.detected_oos, product.correct_oos)),
        products.len(),
        true,
    )
}

/// Per-shelf buckets plus the overall buckets computed over the
/// concatenated slots of enabled shelves only. Returns `None` when there are
/// no shelves at all.
pub fn compute_snapshot(
    shelves: &[Shelf],
    shelf_config: &BTreeMap<String, bool>,
) -> Option<AccuracySnapshot> {
    if shelves.is_empty() {
        return None;
    }

    let mut shelf_results = Vec::with_capacity(shelves.len());
    let mut enabled_slots: Vec<Slot> = Vec::new();

    for shelf in shelves {
        let enabled = shelf_enabled(shelf_config, shelf.shelf_number);

        shelf_results.push(ShelfAccuracy {
            shelf_number: shelf.shelf_number,
            slots: shelf.slots.clone(),
            slot_level_accuracy: slot_level_accuracy(&shelf.slots, enabled),
            sku_level_accuracy: sku_level_accuracy(&shelf.slots, enabled),
        });

        if enabled {
            enabled_slots.extend(shelf.slots.iter().cloned());
        }
    }

    Some(AccuracySnapshot {
        slot_level_accuracy: slot_level_accuracy(&enabled_slots, true),
        sku_level_accuracy: sku_level_accuracy(&enabled_slots, true),
        shelves: shelf_results,
    })
}
