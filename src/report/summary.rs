use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use log::info;
use serde::Serialize;

use crate::{
    accuracy::round2,
    db::{Database, DeviceSummary},
    error::EngineError,
    report::csv::write_csv,
    report::rows::{ReviewReportRow, ReviewTallyRow},
    settings::SettingsStore,
};

/// Filter parameters accepted by the report surface.
///
/// `start_date`/`end_date` must be given together; when both are absent the
/// report covers the last seven days. The end date is inclusive.
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
    pub category: Option<String>,
    pub retailer: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<usize>,
    pub page: Option<usize>,
}

/// Column order is fixed; downstream consumers parse the attachment by
/// header position.
pub const SUMMARY_REPORT_FIELDS: [&str; 8] = [
    "Cooler",
    "Category",
    "Total Number of Sessions Captured",
    "No. of Sessions Reviewed",
    "Avg Slot Level Accuracy",
    "Avg SKU Level Accuracy",
    "OOS Accuracy",
    "Instock Accuracy",
];

/// One device's summary over a report window. Serialized field names match
/// the CSV header titles so the JSON and tabular outputs line up.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummaryRow {
    #[serde(rename = "Cooler")]
    pub cooler: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Total Number of Sessions Captured")]
    pub sessions_captured: u64,
    #[serde(rename = "No. of Sessions Reviewed")]
    pub sessions_reviewed: usize,
    #[serde(rename = "Avg Slot Level Accuracy")]
    pub avg_slot_accuracy: Option<f64>,
    #[serde(rename = "Avg SKU Level Accuracy")]
    pub avg_sku_accuracy: Option<f64>,
    #[serde(rename = "OOS Accuracy")]
    pub oos_accuracy: Option<f64>,
    #[serde(rename = "Instock Accuracy")]
    pub instock_accuracy: Option<f64>,
}

/// Summary of one (date, device) group of reviews.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummaryRow {
    pub date: NaiveDate,
    pub cooler: String,
    pub sessions_reviewed: usize,
    pub accuracy: Option<f64>,
    pub sku_level_accuracy: Option<f64>,
}

/// Arithmetic mean that distinguishes "no data" from a real value. A mean of
/// exactly zero also reads as no data, same as the reports this replaces;
/// presentation renders `None` as an empty cell.
pub(crate) fn nullable_mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0;
    let mut n = 0usize;
    for value in values {
        sum += value;
        n += 1;
    }

    if n == 0 {
        return None;
    }
    let mean = sum / n as f64;
    if mean == 0.0 {
        None
    } else {
        Some(round2(mean))
    }
}

/// Group prepared rows by (date, device) and summarize each group. Output
/// order follows the grouping traversal: by date, then device id.
pub fn group_summaries(rows: &[ReviewTallyRow]) -> Vec<GroupSummaryRow> {
    let mut groups: BTreeMap<(NaiveDate, String), Vec<&ReviewTallyRow>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.date, row.device_id.clone()))
            .or_default()
            .push(row);
    }

    groups
        .into_iter()
        .map(|((date, cooler), group)| GroupSummaryRow {
            date,
            cooler,
            sessions_reviewed: group.iter().filter(|row| row.has_snapshot).count(),
            accuracy: nullable_mean(group.iter().map(|row| row.accuracy)),
            sku_level_accuracy: nullable_mean(group.iter().map(|row| row.sku_accuracy)),
        })
        .collect()
}

/// Builds report rows from persisted snapshots across many devices.
#[derive(Clone)]
pub struct ReportService {
    db: Database,
    settings: Arc<SettingsStore>,
}

impl ReportService {
    pub fn new(db: Database, settings: Arc<SettingsStore>) -> Self {
        Self { db, settings }
    }

    /// One summary row per device in scope, fetched and computed in
    /// parallel. Groups are independent, so every device gets its own task;
    /// all tasks are joined before anything is serialized.
    pub async fn device_summaries(
        &self,
        query: &ReportQuery,
    ) -> Result<Vec<DeviceSummaryRow>, EngineError> {
        let (start, end_exclusive) = resolve_range(query)?;
        let devices = self.list_target_devices(query).await?;
        info!("Building summary report for {} devices", devices.len());

        let mut handles = Vec::with_capacity(devices.len());
        for device in devices {
            let db = self.db.clone();
            handles.push(tokio::spawn(async move {
                device_summary(db, device, start, end_exclusive).await
            }));
        }

        let mut rows = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(Ok(row)) => rows.push(row),
                Ok(Err(err)) => return Err(err),
                Err(err) => {
                    return Err(EngineError::Store(format!("report task failed: {err}")))
                }
            }
        }

        Ok(rows)
    }

    /// The CSV attachment body for `device_summaries`.
    pub async fn summary_report_csv(&self, query: &ReportQuery) -> Result<String, EngineError> {
        let rows = self.device_summaries(query).await?;
        Ok(summary_csv(&rows))
    }

    /// Grouped (date, device) summary rows over the sessions in the window.
    pub async fn grouped_summaries(
        &self,
        query: &ReportQuery,
    ) -> Result<Vec<GroupSummaryRow>, EngineError> {
        let (start, end_exclusive) = resolve_range(query)?;

        let sessions = self.db.sessions_in_range(start, end_exclusive).await?;
        let session_ids: Vec<String> = sessions
            .iter()
            .map(|session| session.session_id.clone())
            .collect();
        let reviews = self.db.reviews_by_sessions(&session_ids).await?;

        let rows: Vec<ReviewTallyRow> = reviews
            .iter()
            .filter(|review| match &query.category {
                Some(category) => review.category.as_deref() == Some(category.as_str()),
                None => true,
            })
            .map(ReviewTallyRow::from_review)
            .collect();

        Ok(group_summaries(&rows))
    }

    async fn list_target_devices(
        &self,
        query: &ReportQuery,
    ) -> Result<Vec<DeviceSummary>, EngineError> {
        if let Some(retailer) = &query.retailer {
            let prefix = self.settings.retailer_prefix(retailer);
            if query.limit.is_some() || query.page.is_some() {
                let limit = query.limit.unwrap_or(100);
                let page = query.page.unwrap_or(1);
                return self
                    .db
                    .list_devices_by_prefix_paginated(&prefix, limit, page)
                    .await
                    .map_err(Into::into);
            }
            return self
                .db
                .list_devices_by_prefix(&prefix)
                .await
                .map_err(Into::into);
        }

        self.db
            .list_devices(query.category.clone())
            .await
            .map_err(Into::into)
    }
}

async fn device_summary(
    db: Database,
    device: DeviceSummary,
    start: DateTime<Utc>,
    end_exclusive: DateTime<Utc>,
) -> Result<DeviceSummaryRow, EngineError> {
    let reviews = db
        .reviews_by_device_in_range(&device.device_id, start, end_exclusive)
        .await?;
    let sessions_captured = db
        .count_sessions(&device.device_id, start, end_exclusive)
        .await?;

    let rows: Vec<ReviewReportRow> = reviews
        .iter()
        .filter_map(ReviewReportRow::from_review)
        .collect();

    Ok(DeviceSummaryRow {
        cooler: device.device_id,
        category: device.category.unwrap_or_else(|| "NA".to_string()),
        sessions_captured,
        sessions_reviewed: reviews.len(),
        avg_slot_accuracy: nullable_mean(rows.iter().map(|row| row.slot_accuracy)),
        avg_sku_accuracy: nullable_mean(rows.iter().map(|row| row.sku_accuracy)),
        oos_accuracy: nullable_mean(rows.iter().filter_map(|row| row.oos_accuracy)),
        instock_accuracy: nullable_mean(rows.iter().filter_map(|row| row.instock_accuracy)),
    })
}

pub fn summary_csv(rows: &[DeviceSummaryRow]) -> String {
    let records: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.cooler.clone(),
                row.category.clone(),
                row.sessions_captured.to_string(),
                row.sessions_reviewed.to_string(),
                format_accuracy(row.avg_slot_accuracy),
                format_accuracy(row.avg_sku_accuracy),
                format_accuracy(row.oos_accuracy),
                format_accuracy(row.instock_accuracy),
            ]
        })
        .collect();

    write_csv(&SUMMARY_REPORT_FIELDS, &records)
}

fn format_accuracy(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.2}"),
        None => String::new(),
    }
}

fn resolve_range(query: &ReportQuery) -> Result<(DateTime<Utc>, DateTime<Utc>), EngineError> {
    match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => Ok(day_range(start, end)),
        (None, None) => {
            let today = Utc::now().date_naive();
            let week_ago = today.checked_sub_days(Days::new(6)).unwrap_or(today);
            Ok(day_range(week_ago, today))
        }
        _ => Err(EngineError::InvalidQuery(
            "start_date and end_date are both required".to_string(),
        )),
    }
}

// The end date is inclusive: the returned range extends one day past it.
fn day_range(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let end_exclusive = end.checked_add_days(Days::new(1)).unwrap_or(end);
    (
        start.and_time(NaiveTime::MIN).and_utc(),
        end_exclusive.and_time(NaiveTime::MIN).and_utc(),
    )
}
