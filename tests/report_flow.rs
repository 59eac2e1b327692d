//! Report aggregation against a real temp-file store: per-device summary
//! fan-out, CSV rendering, and the grouped (date, device) rows.

mod common;

use std::{collections::BTreeMap, sync::Arc};

use chrono::{Days, Utc};
use shelfpulse::{
    db::Database,
    error::EngineError,
    report::{ReportQuery, ReportService},
    review::ReviewController,
    settings::SettingsStore,
};

use common::{capture, make_device, make_session, submission};

struct Harness {
    db: Database,
    controller: ReviewController,
    reports: ReportService,
    settings: Arc<SettingsStore>,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("shelfpulse.sqlite3")).unwrap();
    let settings = Arc::new(SettingsStore::new(dir.path().join("settings.json")).unwrap());
    Harness {
        db: db.clone(),
        controller: ReviewController::new(db.clone()),
        reports: ReportService::new(db, Arc::clone(&settings)),
        settings,
        _dir: dir,
    }
}

fn last_week() -> ReportQuery {
    let today = Utc::now().date_naive();
    ReportQuery {
        start_date: Some(today.checked_sub_days(Days::new(7)).unwrap()),
        end_date: Some(today),
        ..Default::default()
    }
}

#[tokio::test]
async fn device_summaries_average_across_reviews() {
    let h = harness();

    h.db.insert_device(&make_device("DEV-1", Some("beverages")))
        .await
        .unwrap();
    h.db.insert_device(&make_device("DEV-2", None)).await.unwrap();
    h.db.insert_session(&make_session("S-1", "DEV-1")).await.unwrap();
    h.db.insert_session(&make_session("S-2", "DEV-1")).await.unwrap();

    // S-1 scores 100, S-2 scores 50.
    h.controller
        .submit("DEV-1", "S-1", submission(vec![vec![capture(1, "A", true, Some(true))]]))
        .await
        .unwrap();
    h.controller
        .submit(
            "DEV-1",
            "S-2",
            submission(vec![vec![
                capture(1, "B", true, Some(false)),
                capture(2, "C", false, None),
            ]]),
        )
        .await
        .unwrap();

    let rows = h.reports.device_summaries(&last_week()).await.unwrap();
    assert_eq!(rows.len(), 2);

    let dev1 = rows.iter().find(|row| row.cooler == "DEV-1").unwrap();
    assert_eq!(dev1.category, "beverages");
    assert_eq!(dev1.sessions_captured, 2);
    assert_eq!(dev1.sessions_reviewed, 2);
    assert_eq!(dev1.avg_slot_accuracy, Some(75.0));
    assert_eq!(dev1.avg_sku_accuracy, Some(75.0));
    // Both reviews had something out of stock or in stock to judge.
    assert!(dev1.oos_accuracy.is_some());
    assert!(dev1.instock_accuracy.is_some());

    let dev2 = rows.iter().find(|row| row.cooler == "DEV-2").unwrap();
    assert_eq!(dev2.category, "NA");
    assert_eq!(dev2.sessions_captured, 0);
    assert_eq!(dev2.sessions_reviewed, 0);
    assert_eq!(dev2.avg_slot_accuracy, None);
    assert_eq!(dev2.oos_accuracy, None);
}

#[tokio::test]
async fn zero_mean_reads_as_no_data() {
    let h = harness();

    h.db.insert_device(&make_device("DEV-1", None)).await.unwrap();
    h.db.insert_session(&make_session("S-1", "DEV-1")).await.unwrap();

    // Single review, every slot mismatched: accuracy 0.00.
    h.controller
        .submit(
            "DEV-1",
            "S-1",
            submission(vec![vec![capture(1, "A", true, Some(false))]]),
        )
        .await
        .unwrap();

    let rows = h.reports.device_summaries(&last_week()).await.unwrap();
    assert_eq!(rows[0].avg_slot_accuracy, None);

    let csv = h.reports.summary_report_csv(&last_week()).await.unwrap();
    let data_line = csv.lines().nth(1).unwrap();
    assert!(data_line.starts_with("DEV-1,NA,1,1,,"));
}

#[tokio::test]
async fn summary_csv_has_the_fixed_header() {
    let h = harness();
    let csv = h.reports.summary_report_csv(&last_week()).await.unwrap();
    assert_eq!(
        csv.lines().next().unwrap(),
        "Cooler,Category,Total Number of Sessions Captured,No. of Sessions Reviewed,\
         Avg Slot Level Accuracy,Avg SKU Level Accuracy,OOS Accuracy,Instock Accuracy"
    );
}

#[tokio::test]
async fn retailer_scopes_and_paginates_devices() {
    let h = harness();

    h.db.insert_device(&make_device("ACM-1", None)).await.unwrap();
    h.db.insert_device(&make_device("ACM-2", None)).await.unwrap();
    h.db.insert_device(&make_device("OTH-1", None)).await.unwrap();

    let mut retailers = BTreeMap::new();
    retailers.insert("acme".to_string(), "ACM".to_string());
    h.settings.update_retailers(retailers).unwrap();

    let mut query = last_week();
    query.retailer = Some("acme".to_string());
    let rows = h.reports.device_summaries(&query).await.unwrap();
    let coolers: Vec<&str> = rows.iter().map(|row| row.cooler.as_str()).collect();
    assert_eq!(coolers, vec!["ACM-1", "ACM-2"]);

    query.limit = Some(1);
    query.page = Some(2);
    let rows = h.reports.device_summaries(&query).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].cooler, "ACM-2");
}

#[tokio::test]
async fn grouped_summaries_split_by_date_and_device() {
    let h = harness();

    h.db.insert_device(&make_device("DEV-1", Some("beverages")))
        .await
        .unwrap();
    h.db.insert_device(&make_device("DEV-2", Some("beverages")))
        .await
        .unwrap();
    h.db.insert_session(&make_session("S-1", "DEV-1")).await.unwrap();
    h.db.insert_session(&make_session("S-2", "DEV-1")).await.unwrap();
    h.db.insert_session(&make_session("S-3", "DEV-2")).await.unwrap();

    for (device, session) in [("DEV-1", "S-1"), ("DEV-1", "S-2"), ("DEV-2", "S-3")] {
        h.controller
            .submit(
                device,
                session,
                submission(vec![vec![capture(1, "A", false, None)]]),
            )
            .await
            .unwrap();
    }

    let groups = h.reports.grouped_summaries(&last_week()).await.unwrap();
    assert_eq!(groups.len(), 2);

    let today = Utc::now().date_naive();
    assert_eq!(groups[0].date, today);
    assert_eq!(groups[0].cooler, "DEV-1");
    assert_eq!(groups[0].sessions_reviewed, 2);
    // No reviewer tallies were filed, so the tally accuracy is a clean 100.
    assert_eq!(groups[0].accuracy, Some(100.0));

    assert_eq!(groups[1].cooler, "DEV-2");
    assert_eq!(groups[1].sessions_reviewed, 1);
}

#[tokio::test]
async fn category_filter_narrows_grouped_rows() {
    let h = harness();

    h.db.insert_device(&make_device("DEV-1", Some("beverages")))
        .await
        .unwrap();
    h.db.insert_device(&make_device("DEV-2", Some("snacks")))
        .await
        .unwrap();
    h.db.insert_session(&make_session("S-1", "DEV-1")).await.unwrap();
    h.db.insert_session(&make_session("S-2", "DEV-2")).await.unwrap();

    for (device, session) in [("DEV-1", "S-1"), ("DEV-2", "S-2")] {
        h.controller
            .submit(
                device,
                session,
                submission(vec![vec![capture(1, "A", false, None)]]),
            )
            .await
            .unwrap();
    }

    let mut query = last_week();
    query.category = Some("snacks".to_string());
    let groups = h.reports.grouped_summaries(&query).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].cooler, "DEV-2");
}

#[tokio::test]
async fn one_sided_date_range_is_rejected() {
    let h = harness();
    let query = ReportQuery {
        start_date: Some(Utc::now().date_naive()),
        ..Default::default()
    };
    let err = h.reports.device_summaries(&query).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidQuery(_)));
}
