//! Report aggregation over persisted accuracy snapshots.

mod csv;
mod rows;
mod summary;

pub use csv::write_csv;
pub use rows::{detection_counts, DetectionCounts, ReviewReportRow, ReviewTallyRow};
pub use summary::{
    group_summaries, summary_csv, DeviceSummaryRow, GroupSummaryRow, ReportQuery, ReportService,
    SUMMARY_REPORT_FIELDS,
};
