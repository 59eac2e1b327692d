use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::PathBuf, sync::RwLock};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillSettings {
    /// Only reviews newer than this many months are swept.
    pub window_months: u32,
    /// Reviews recomputed per batch query.
    pub batch_size: usize,
}

impl Default for BackfillSettings {
    fn default() -> Self {
        Self {
            window_months: 5,
            batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EngineSettings {
    backfill: BackfillSettings,
    /// Retailer name -> device-id prefix. Unknown retailers fall back to the
    /// raw name as the prefix.
    retailers: BTreeMap<String, String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            backfill: BackfillSettings::default(),
            retailers: BTreeMap::new(),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EngineSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            EngineSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn backfill(&self) -> BackfillSettings {
        self.data.read().unwrap().backfill.clone()
    }

    /// Device-id prefix used to scope a report to one retailer's fleet.
    pub fn retailer_prefix(&self, retailer: &str) -> String {
        let guard = self.data.read().unwrap();
        match guard.retailers.get(retailer) {
            Some(prefix) => format!("{prefix}-"),
            None => retailer.to_string(),
        }
    }

    pub fn update_backfill(&self, settings: BackfillSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.backfill = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    pub fn update_retailers(&self, retailers: BTreeMap<String, String>) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.retailers = retailers;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &EngineSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let backfill = store.backfill();
        assert_eq!(backfill.window_months, 5);
        assert_eq!(backfill.batch_size, 100);
    }

    #[test]
    fn retailer_prefix_falls_back_to_raw_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.retailer_prefix("acme"), "acme");

        let mut retailers = BTreeMap::new();
        retailers.insert("acme".to_string(), "ACM".to_string());
        store.update_retailers(retailers).unwrap();
        assert_eq!(store.retailer_prefix("acme"), "ACM-");
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update_backfill(BackfillSettings {
                window_months: 3,
                batch_size: 25,
            })
            .unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        let backfill = reopened.backfill();
        assert_eq!(backfill.window_months, 3);
        assert_eq!(backfill.batch_size, 25);
    }
}
