//! Capture-session data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "InProgress",
            SessionStatus::Completed => "Completed",
        }
    }
}

/// Version tag of one detection model, rendered as `"{category}.{version}"`
/// when denormalized onto a review at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVersion {
    pub category: String,
    pub version: String,
}

impl ModelVersion {
    pub fn tag(&self) -> String {
        format!("{}.{}", self.category, self.version)
    }
}

/// The three detection models a session was captured with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionModels {
    pub shelf: ModelVersion,
    pub object: ModelVersion,
    pub oos_classification: ModelVersion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub device_id: String,
    pub status: SessionStatus,
    pub models: SessionModels,
    pub session_start_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
