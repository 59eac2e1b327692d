use crate::db::models::{Shelf, ShelfReview, Slot};

/// Transform a raw `slot_reviews` sequence into normalized shelves.
///
/// Shelf numbers are assigned 1-based from the sequence position. Ground
/// truth per slot: no correction recorded means the detection stands; a
/// correction equal to the detection confirms it; a differing correction
/// overturns it. A shelf without a nested planogram (legacy documents)
/// normalizes to a shelf with no slots.
pub fn normalize_shelves(slot_reviews: &[ShelfReview]) -> Vec<Shelf> {
    let mut shelves = Vec::with_capacity(slot_reviews.len());

    for (shelf_idx, shelf_review) in slot_reviews.iter().enumerate() {
        let captures = shelf_review
            .planogram
            .as_ref()
            .map(|planogram| planogram.slots.as_slice())
            .unwrap_or(&[]);

        let mut slots = Vec::with_capacity(captures.len());
        for capture in captures {
            let detected_oos = capture.oos;
            let correct_oos = match capture.oos_update {
                None => detected_oos,
                Some(update) if update == detected_oos => detected_oos,
                Some(_) => !detected_oos,
            };

            slots.push(Slot {
                slot_number: capture.slot_number,
                upc: capture.upc.clone(),
                product_name: capture.product_name.clone(),
                detected_oos,
                correct_oos,
            });
        }

        shelves.push(Shelf {
            shelf_number: shelf_idx as u32 + 1,
            slots,
        });
    }

    shelves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{ShelfPlanogram, SlotCapture};

    fn capture(upc: &str, oos: bool, oos_update: Option<bool>) -> SlotCapture {
        SlotCapture {
            slot_number: 1,
            upc: upc.to_string(),
            product_name: format!("product {upc}"),
            oos,
            oos_update,
        }
    }

    fn shelf_of(slots: Vec<SlotCapture>) -> ShelfReview {
        ShelfReview {
            planogram: Some(ShelfPlanogram { slots }),
        }
    }

    #[test]
    fn empty_input_yields_no_shelves() {
        assert!(normalize_shelves(&[]).is_empty());
    }

    #[test]
    fn missing_planogram_yields_empty_shelf() {
        let shelves = normalize_shelves(&[ShelfReview { planogram: None }]);
        assert_eq!(shelves.len(), 1);
        assert_eq!(shelves[0].shelf_number, 1);
        assert!(shelves[0].slots.is_empty());
    }

    #[test]
    fn no_correction_keeps_detection_as_ground_truth() {
        let shelves = normalize_shelves(&[shelf_of(vec![
            capture("A", true, None),
            capture("B", false, None),
        ])]);
        assert!(shelves[0].slots[0].correct_oos);
        assert!(!shelves[0].slots[1].correct_oos);
    }

    #[test]
    fn confirming_correction_keeps_detection() {
        let shelves = normalize_shelves(&[shelf_of(vec![capture("A", true, Some(true))])]);
        assert!(shelves[0].slots[0].detected_oos);
        assert!(shelves[0].slots[0].correct_oos);
    }

    #[test]
    fn overturning_correction_flips_ground_truth() {
        let shelves = normalize_shelves(&[shelf_of(vec![
            capture("A", true, Some(false)),
            capture("B", false, Some(true)),
        ])]);
        assert!(shelves[0].slots[0].detected_oos);
        assert!(!shelves[0].slots[0].correct_oos);
        assert!(!shelves[0].slots[1].detected_oos);
        assert!(shelves[0].slots[1].correct_oos);
    }

    #[test]
    fn shelf_numbers_follow_source_order() {
        let shelves = normalize_shelves(&[
            shelf_of(vec![capture("A", false, None)]),
            shelf_of(vec![capture("B", false, None)]),
            shelf_of(vec![capture("C", false, None)]),
        ]);
        let numbers: Vec<u32> = shelves.iter().map(|s| s.shelf_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
