use chrono::{DateTime, Utc};
use anyhow::Result;
use rusqlite::{params, params_from_iter, Row};

use crate::db::{
    connection::Database,
    helpers::{from_json, from_optional_json, parse_datetime, parse_optional_datetime, to_json, to_u32},
    models::{AccuracySnapshot, Review},
};

const REVIEW_COLUMNS: &str = "id, device_id, session_id, category, slot_reviews_json, \
     oos_reviews_json, planogram_items_count, detected_items_count, accuracy_json, \
     instock_accuracy, oos_accuracy, instock_items_count, oos_items_count, \
     shelf_model, object_model, classification_model, review_timestamp, \
     created_at, updated_at";

fn row_to_review(row: &Row) -> Result<Review> {
    let slot_reviews_json: String = row.get("slot_reviews_json")?;
    let oos_reviews_json: String = row.get("oos_reviews_json")?;
    let accuracy_json: Option<String> = row.get("accuracy_json")?;
    let planogram_items_count: i64 = row.get("planogram_items_count")?;
    let detected_items_count: i64 = row.get("detected_items_count")?;
    let instock_items_count: Option<i64> = row.get("instock_items_count")?;
    let oos_items_count: Option<i64> = row.get("oos_items_count")?;
    let review_timestamp: Option<String> = row.get("review_timestamp")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Review {
        id: row.get("id")?,
        device_id: row.get("device_id")?,
        session_id: row.get("session_id")?,
        category: row.get("category")?,
        slot_reviews: from_json(&slot_reviews_json, "slot_reviews_json")?,
        oos_reviews: from_json(&oos_reviews_json, "oos_reviews_json")?,
        planogram_items_count: to_u32(planogram_items_count, "planogram_items_count")?,
        detected_items_count: to_u32(detected_items_count, "detected_items_count")?,
        accuracy: from_optional_json(accuracy_json, "accuracy_json")?,
        instock_accuracy: row.get("instock_accuracy")?,
        oos_accuracy: row.get("oos_accuracy")?,
        instock_items_count: instock_items_count
            .map(|v| to_u32(v, "instock_items_count"))
            .transpose()?,
        oos_items_count: oos_items_count
            .map(|v| to_u32(v, "oos_items_count"))
            .transpose()?,
        shelf_model: row.get("shelf_model")?,
        object_model: row.get("object_model")?,
        classification_model: row.get("classification_model")?,
        review_timestamp: parse_optional_datetime(review_timestamp, "review_timestamp")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_review(&self, review: &Review) -> Result<()> {
        let record = review.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO reviews (id, device_id, session_id, category, slot_reviews_json, \
                 oos_reviews_json, planogram_items_count, detected_items_count, accuracy_json, \
                 instock_accuracy, oos_accuracy, instock_items_count, oos_items_count, \
                 shelf_model, object_model, classification_model, review_timestamp, \
                 created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
                params![
                    record.id,
                    record.device_id,
                    record.session_id,
                    record.category,
                    to_json(&record.slot_reviews, "slot_reviews")?,
                    to_json(&record.oos_reviews, "oos_reviews")?,
                    record.planogram_items_count,
                    record.detected_items_count,
                    record
                        .accuracy
                        .as_ref()
                        .map(|snapshot| to_json(snapshot, "accuracy"))
                        .transpose()?,
                    record.instock_accuracy,
                    record.oos_accuracy,
                    record.instock_items_count,
                    record.oos_items_count,
                    record.shelf_model,
                    record.object_model,
                    record.classification_model,
                    record.review_timestamp.map(|dt| dt.to_rfc3339()),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn find_review(
        &self,
        device_id: &str,
        session_id: &str,
    ) -> Result<Option<Review>> {
        let device_id = device_id.to_string();
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REVIEW_COLUMNS} FROM reviews WHERE device_id = ?1 AND session_id = ?2"
            ))?;

            let mut rows = stmt.query(params![device_id, session_id])?;
            let review = match rows.next()? {
                Some(row) => Some(row_to_review(row)?),
                None => None,
            };
            Ok(review)
        })
        .await
    }

    /// Rewrite the submission-owned fields of an existing review. The
    /// creation-only denormalized columns (category, model tags) are left
    /// untouched.
    pub async fn update_review_submission(&self, review: &Review) -> Result<()> {
        let record = review.clone();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE reviews
                 SET slot_reviews_json = ?1,
                     oos_reviews_json = ?2,
                     planogram_items_count = ?3,
                     detected_items_count = ?4,
                     accuracy_json = ?5,
                     instock_accuracy = ?6,
                     oos_accuracy = ?7,
                     instock_items_count = ?8,
                     oos_items_count = ?9,
                     review_timestamp = ?10,
                     updated_at = ?11
                 WHERE device_id = ?12 AND session_id = ?13",
                params![
                    to_json(&record.slot_reviews, "slot_reviews")?,
                    to_json(&record.oos_reviews, "oos_reviews")?,
                    record.planogram_items_count,
                    record.detected_items_count,
                    record
                        .accuracy
                        .as_ref()
                        .map(|snapshot| to_json(snapshot, "accuracy"))
                        .transpose()?,
                    record.instock_accuracy,
                    record.oos_accuracy,
                    record.instock_items_count,
                    record.oos_items_count,
                    record.review_timestamp.map(|dt| dt.to_rfc3339()),
                    record.updated_at.to_rfc3339(),
                    record.device_id,
                    record.session_id,
                ],
            )?;

            if rows_affected == 0 {
                return Err(anyhow::anyhow!("Review not found"));
            }

            Ok(())
        })
        .await
    }

    /// Persist a recomputed snapshot only, as the backfill sweep does. The
    /// snapshot is always written (the empty one included) so the review
    /// stops matching `reviews_missing_accuracy`.
    pub async fn update_review_accuracy(
        &self,
        review_id: &str,
        snapshot: &AccuracySnapshot,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let review_id = review_id.to_string();
        let snapshot = snapshot.clone();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE reviews
                 SET accuracy_json = ?1,
                     updated_at = ?2
                 WHERE id = ?3",
                params![
                    to_json(&snapshot, "accuracy")?,
                    updated_at.to_rfc3339(),
                    review_id,
                ],
            )?;

            if rows_affected == 0 {
                return Err(anyhow::anyhow!("Review not found"));
            }

            Ok(())
        })
        .await
    }

    /// Reviews created after `cutoff` whose accuracy was never computed,
    /// oldest first so the sweep drains deterministically.
    pub async fn reviews_missing_accuracy(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Review>> {
        let limit = limit as i64;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REVIEW_COLUMNS} FROM reviews
                 WHERE accuracy_json IS NULL AND created_at >= ?1
                 ORDER BY created_at ASC
                 LIMIT ?2"
            ))?;

            let mut rows = stmt.query(params![cutoff.to_rfc3339(), limit])?;
            let mut reviews = Vec::new();
            while let Some(row) = rows.next()? {
                reviews.push(row_to_review(row)?);
            }

            Ok(reviews)
        })
        .await
    }

    /// Reviews for one device updated inside `[start, end_exclusive)`,
    /// most recent first.
    pub async fn reviews_by_device_in_range(
        &self,
        device_id: &str,
        start: DateTime<Utc>,
        end_exclusive: DateTime<Utc>,
    ) -> Result<Vec<Review>> {
        let device_id = device_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REVIEW_COLUMNS} FROM reviews
                 WHERE device_id = ?1 AND updated_at >= ?2 AND updated_at < ?3
                 ORDER BY updated_at DESC"
            ))?;

            let mut rows = stmt.query(params![
                device_id,
                start.to_rfc3339(),
                end_exclusive.to_rfc3339(),
            ])?;
            let mut reviews = Vec::new();
            while let Some(row) = rows.next()? {
                reviews.push(row_to_review(row)?);
            }

            Ok(reviews)
        })
        .await
    }

    pub async fn reviews_by_sessions(&self, session_ids: &[String]) -> Result<Vec<Review>> {
        let session_ids = session_ids.to_vec();
        self.execute(move |conn| {
            if session_ids.is_empty() {
                return Ok(Vec::new());
            }

            let placeholders = vec!["?"; session_ids.len()].join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT {REVIEW_COLUMNS} FROM reviews WHERE session_id IN ({placeholders})"
            ))?;

            let mut rows = stmt.query(params_from_iter(session_ids.iter()))?;
            let mut reviews = Vec::new();
            while let Some(row) = rows.next()? {
                reviews.push(row_to_review(row)?);
            }

            Ok(reviews)
        })
        .await
    }
}
