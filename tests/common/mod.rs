//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::collections::BTreeMap;

use chrono::Utc;
use shelfpulse::db::models::{
    Device, ModelVersion, ReviewSubmission, Session, SessionModels, SessionStatus,
    ShelfPlanogram, ShelfReview, SlotCapture,
};

pub fn make_device(device_id: &str, category: Option<&str>) -> Device {
    make_device_with_config(device_id, category, BTreeMap::new())
}

pub fn make_device_with_config(
    device_id: &str,
    category: Option<&str>,
    oos_enabled_shelves: BTreeMap<String, bool>,
) -> Device {
    let now = Utc::now();
    Device {
        device_id: device_id.to_string(),
        category: category.map(|c| c.to_string()),
        oos_enabled_shelves,
        created_at: now,
        updated_at: now,
    }
}

pub fn make_session(session_id: &str, device_id: &str) -> Session {
    let now = Utc::now();
    let model = |category: &str| ModelVersion {
        category: category.to_string(),
        version: "3".to_string(),
    };
    Session {
        session_id: session_id.to_string(),
        device_id: device_id.to_string(),
        status: SessionStatus::Completed,
        models: SessionModels {
            shelf: model("shelf"),
            object: model("object"),
            oos_classification: model("oos"),
        },
        session_start_time: now,
        created_at: now,
        updated_at: now,
    }
}

pub fn capture(
    slot_number: u32,
    upc: &str,
    oos: bool,
    oos_update: Option<bool>,
) -> SlotCapture {
    SlotCapture {
        slot_number,
        upc: upc.to_string(),
        product_name: format!("product {upc}"),
        oos,
        oos_update,
    }
}

pub fn submission(shelves: Vec<Vec<SlotCapture>>) -> ReviewSubmission {
    let planogram_items_count = shelves.iter().map(|slots| slots.len() as u32).sum();
    ReviewSubmission {
        slot_reviews: shelves
            .into_iter()
            .map(|slots| ShelfReview {
                planogram: Some(ShelfPlanogram { slots }),
            })
            .collect(),
        oos_reviews: BTreeMap::new(),
        planogram_items_count,
        detected_items_count: 0,
    }
}
