use serde::{Deserialize, Serialize};

use crate::accuracy::buckets::{collapse_by_upc, round2};
use crate::db::models::{Shelf, Slot};

/// Raw instock/OOS split totals for one review.
///
/// Counts are the canonical machine-readable form; the percentage and
/// display accessors are derived at the presentation boundary. Reports that
/// aggregate across many reviews sum these totals instead of averaging
/// percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitCounts {
    pub total_instock: u32,
    pub detected_instock: u32,
    pub total_oos: u32,
    pub detected_oos: u32,
}

impl SplitCounts {
    pub fn instock_accuracy(&self) -> f64 {
        population_accuracy(self.detected_instock, self.total_instock)
    }

    pub fn oos_accuracy(&self) -> f64 {
        population_accuracy(self.detected_oos, self.total_oos)
    }

    /// Distinct products seen across the review.
    pub fn product_count(&self) -> u32 {
        self.total_instock + self.total_oos
    }

    pub fn instock_display(&self) -> String {
        format!(
            "{:.2}% ({}/{})",
            self.instock_accuracy(),
            self.detected_instock,
            self.total_instock
        )
    }

    pub fn oos_display(&self) -> String {
        format!(
            "{:.2}% ({}/{})",
            self.oos_accuracy(),
            self.detected_oos,
            self.total_oos
        )
    }
}

// An empty population reads as vacuously correct.
fn population_accuracy(matches: u32, total: u32) -> f64 {
    if total == 0 {
        return 100.0;
    }
    round2(f64::from(matches) / f64::from(total) * 100.0)
}

/// Split accuracy over every shelf of a review, shelf gating ignored.
///
/// Products are collapsed to one record per distinct UPC across the whole
/// review, then partitioned by ground truth: the in-stock population counts
/// a match when the detection also said in-stock, the OOS population when it
/// also said out-of-stock.
pub fn split_accuracy(shelves: &[Shelf]) -> SplitCounts {
    let slots: Vec<Slot> = shelves
        .iter()
        .flat_map(|shelf| shelf.slots.iter().cloned())
        .collect();
    let products = collapse_by_upc(&slots);

    let mut counts = SplitCounts::default();
    for product in products {
        if product.correct_oos {
            counts.total_oos += 1;
            if product.detected_oos {
                counts.detected_oos += 1;
            }
        } else {
            counts.total_instock += 1;
            if !product.detected_oos {
                counts.detected_instock += 1;
            }
        }
    }

    counts
}
