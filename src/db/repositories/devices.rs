use anyhow::Result;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::{
    connection::Database,
    helpers::{from_json, parse_datetime, to_json},
    models::Device,
};

/// Projection of a device down to what report listings need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub device_id: String,
    pub category: Option<String>,
}

fn row_to_device(row: &Row) -> Result<Device> {
    let oos_enabled_shelves_json: String = row.get("oos_enabled_shelves_json")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Device {
        device_id: row.get("device_id")?,
        category: row.get("category")?,
        oos_enabled_shelves: from_json(&oos_enabled_shelves_json, "oos_enabled_shelves_json")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_device(&self, device: &Device) -> Result<()> {
        let record = device.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO devices (device_id, category, oos_enabled_shelves_json, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.device_id,
                    record.category,
                    to_json(&record.oos_enabled_shelves, "oos_enabled_shelves")?,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_device(&self, device_id: &str) -> Result<Option<Device>> {
        let device_id = device_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT device_id, category, oos_enabled_shelves_json, created_at, updated_at
                 FROM devices
                 WHERE device_id = ?1",
            )?;

            let mut rows = stmt.query(params![device_id])?;
            let device = match rows.next()? {
                Some(row) => Some(row_to_device(row)?),
                None => None,
            };
            Ok(device)
        })
        .await
    }

    pub async fn list_devices(&self, category: Option<String>) -> Result<Vec<DeviceSummary>> {
        self.execute(move |conn| {
            let mut devices = Vec::new();
            match category {
                Some(category) => {
                    let mut stmt = conn.prepare(
                        "SELECT device_id, category FROM devices
                         WHERE category = ?1
                         ORDER BY device_id ASC",
                    )?;
                    let mut rows = stmt.query(params![category])?;
                    while let Some(row) = rows.next()? {
                        devices.push(DeviceSummary {
                            device_id: row.get(0)?,
                            category: row.get(1)?,
                        });
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT device_id, category FROM devices ORDER BY device_id ASC",
                    )?;
                    let mut rows = stmt.query([])?;
                    while let Some(row) = rows.next()? {
                        devices.push(DeviceSummary {
                            device_id: row.get(0)?,
                            category: row.get(1)?,
                        });
                    }
                }
            }
            Ok(devices)
        })
        .await
    }

    /// Devices whose id starts with `prefix` (SQLite LIKE, so matching is
    /// case-insensitive for ASCII, same as the retailer lookups upstream).
    pub async fn list_devices_by_prefix(&self, prefix: &str) -> Result<Vec<DeviceSummary>> {
        let prefix = prefix.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT device_id, category FROM devices
                 WHERE device_id LIKE ?1 || '%'
                 ORDER BY device_id ASC",
            )?;

            let mut rows = stmt.query(params![prefix])?;
            let mut devices = Vec::new();
            while let Some(row) = rows.next()? {
                devices.push(DeviceSummary {
                    device_id: row.get(0)?,
                    category: row.get(1)?,
                });
            }
            Ok(devices)
        })
        .await
    }

    /// Page numbering is 1-based.
    pub async fn list_devices_by_prefix_paginated(
        &self,
        prefix: &str,
        limit: usize,
        page: usize,
    ) -> Result<Vec<DeviceSummary>> {
        let prefix = prefix.to_string();
        let limit = limit as i64;
        let offset = (page.saturating_sub(1) as i64) * limit;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT device_id, category FROM devices
                 WHERE device_id LIKE ?1 || '%'
                 ORDER BY device_id ASC
                 LIMIT ?2 OFFSET ?3",
            )?;

            let mut rows = stmt.query(params![prefix, limit, offset])?;
            let mut devices = Vec::new();
            while let Some(row) = rows.next()? {
                devices.push(DeviceSummary {
                    device_id: row.get(0)?,
                    category: row.get(1)?,
                });
            }
            Ok(devices)
        })
        .await
    }
}
