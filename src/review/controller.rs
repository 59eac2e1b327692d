use std::{collections::BTreeMap, sync::Arc};

use chrono::{Months, Utc};
use log::{info, warn};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    accuracy::{compute_snapshot, normalize_shelves, split_accuracy},
    db::{Database, Review, ReviewSubmission},
    error::EngineError,
    log_error, log_info,
    settings::BackfillSettings,
};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillOutcome {
    pub reviews_updated: usize,
    pub batches: usize,
}

/// Orchestrates the per-review accuracy path: normalize, gate, compute,
/// persist. One instance is shared across callers; the only state it owns is
/// the backfill single-flight lock.
#[derive(Clone)]
pub struct ReviewController {
    db: Database,
    backfill_lock: Arc<Mutex<()>>,
}

impl ReviewController {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            backfill_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn get_review(
        &self,
        device_id: &str,
        session_id: &str,
    ) -> Result<Option<Review>, EngineError> {
        self.db
            .find_review(device_id, session_id)
            .await
            .map_err(Into::into)
    }

    /// Compute and persist the full accuracy snapshot for one submission.
    ///
    /// Updates rewrite the submission-owned fields only; the denormalized
    /// category and model tags are copied from the device and session
    /// records at creation time and never touched again.
    pub async fn submit(
        &self,
        device_id: &str,
        session_id: &str,
        submission: ReviewSubmission,
    ) -> Result<Review, EngineError> {
        let shelves = normalize_shelves(&submission.slot_reviews);

        let device = self
            .db
            .get_device(device_id)
            .await?
            .ok_or_else(|| EngineError::DeviceNotFound(device_id.to_string()))?;

        let snapshot = compute_snapshot(&shelves, &device.oos_enabled_shelves);
        let split = split_accuracy(&shelves);
        let now = Utc::now();

        match self.db.find_review(device_id, session_id).await? {
            Some(mut review) => {
                review.slot_reviews = submission.slot_reviews;
                review.oos_reviews = submission.oos_reviews;
                review.planogram_items_count = submission.planogram_items_count;
                review.detected_items_count = submission.detected_items_count;
                review.accuracy = snapshot;
                review.instock_accuracy = Some(split.instock_accuracy());
                review.oos_accuracy = Some(split.oos_accuracy());
                review.instock_items_count = Some(split.total_instock);
                review.oos_items_count = Some(split.total_oos);
                review.review_timestamp = Some(now);
                review.updated_at = now;

                self.db.update_review_submission(&review).await?;
                info!("Updated review for device {device_id} session {session_id}");
                Ok(review)
            }
            None => {
                let session = self
                    .db
                    .get_session(session_id)
                    .await?
                    .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;

                let review = Review {
                    id: Uuid::new_v4().to_string(),
                    device_id: device_id.to_string(),
                    session_id: session_id.to_string(),
                    category: device.category.clone(),
                    slot_reviews: submission.slot_reviews,
                    oos_reviews: submission.oos_reviews,
                    planogram_items_count: submission.planogram_items_count,
                    detected_items_count: submission.detected_items_count,
                    accuracy: snapshot,
                    instock_accuracy: Some(split.instock_accuracy()),
                    oos_accuracy: Some(split.oos_accuracy()),
                    instock_items_count: Some(split.total_instock),
                    oos_items_count: Some(split.total_oos),
                    shelf_model: Some(session.models.shelf.tag()),
                    object_model: Some(session.models.object.tag()),
                    classification_model: Some(session.models.oos_classification.tag()),
                    review_timestamp: Some(now),
                    created_at: now,
                    updated_at: now,
                };

                self.db.insert_review(&review).await?;
                info!("Created review for device {device_id} session {session_id}");
                Ok(review)
            }
        }
    }

    /// Sweep reviews missing a snapshot and recompute them in batches.
    ///
    /// Only one sweep can run at a time; a concurrent trigger fails fast
    /// with `BackfillInProgress`. Recomputed reviews stop matching the batch
    /// query (the empty snapshot is persisted too), which is what lets the
    /// sweep resume from wherever a previous run stopped.
    pub async fn backfill(
        &self,
        settings: &BackfillSettings,
    ) -> Result<BackfillOutcome, EngineError> {
        let _guard = self
            .backfill_lock
            .try_lock()
            .map_err(|_| EngineError::BackfillInProgress)?;

        let now = Utc::now();
        let cutoff = now
            .checked_sub_months(Months::new(settings.window_months))
            .unwrap_or(now);

        let mut outcome = BackfillOutcome {
            reviews_updated: 0,
            batches: 0,
        };

        loop {
            let batch = self
                .db
                .reviews_missing_accuracy(cutoff, settings.batch_size)
                .await?;
            if batch.is_empty() {
                break;
            }

            outcome.batches += 1;
            log_info!(
                "Backfill batch {}: {} reviews to recompute",
                outcome.batches,
                batch.len()
            );

            let mut updated_this_batch = 0;
            for review in &batch {
                match self.recompute_review(review).await {
                    Ok(()) => {
                        updated_this_batch += 1;
                    }
                    Err(err) => {
                        log_error!("Skipping review {} during backfill: {err}", review.id);
                    }
                }
            }
            outcome.reviews_updated += updated_this_batch;

            // Every review in the batch failed to persist, so the next query
            // would return the same rows again.
            if updated_this_batch == 0 {
                warn!("Backfill made no progress on a batch; stopping sweep");
                break;
            }
        }

        Ok(outcome)
    }

    async fn recompute_review(&self, review: &Review) -> Result<(), EngineError> {
        let shelves = normalize_shelves(&review.slot_reviews);

        let shelf_config = match self.db.get_device(&review.device_id).await? {
            Some(device) => device.oos_enabled_shelves,
            None => {
                warn!(
                    "Device {} missing for review {}; treating all shelves as enabled",
                    review.device_id, review.id
                );
                BTreeMap::new()
            }
        };

        let snapshot = compute_snapshot(&shelves, &shelf_config).unwrap_or_default();
        self.db
            .update_review_accuracy(&review.id, &snapshot, Utc::now())
            .await?;
        Ok(())
    }
}
