mod controller;

pub use controller::{BackfillOutcome, ReviewController};
