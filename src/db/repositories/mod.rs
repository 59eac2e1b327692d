pub mod devices;
pub mod reviews;
pub mod sessions;
