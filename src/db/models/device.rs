use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cooler device and its OOS automation shelf configuration.
///
/// `oos_enabled_shelves` is keyed `"shelf1"`, `"shelf2"`, ... An empty map
/// means every shelf participates in OOS accuracy; once the map has any
/// entry, only shelves explicitly mapped to `true` participate. Existing
/// device documents rely on that asymmetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    pub category: Option<String>,
    #[serde(default)]
    pub oos_enabled_shelves: BTreeMap<String, bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
