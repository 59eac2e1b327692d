pub mod device;
pub mod review;
pub mod session;

pub use device::Device;
pub use review::{
    AccuracyBucket, AccuracySnapshot, OosShelfCounts, Review, ReviewSubmission, Shelf,
    ShelfAccuracy, ShelfPlanogram, ShelfReview, Slot, SlotCapture,
};
pub use session::{ModelVersion, Session, SessionModels, SessionStatus};
