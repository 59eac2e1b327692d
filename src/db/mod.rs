pub mod connection;
pub mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use models::{
    AccuracyBucket, AccuracySnapshot, Device, ModelVersion, OosShelfCounts, Review,
    ReviewSubmission, Session, SessionModels, SessionStatus, Shelf, ShelfAccuracy,
    ShelfPlanogram, ShelfReview, Slot, SlotCapture,
};
pub use repositories::devices::DeviceSummary;
