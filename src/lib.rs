pub mod accuracy;
pub mod db;
pub mod error;
pub mod report;
pub mod review;
pub mod settings;
mod utils;

use std::{path::PathBuf, sync::Arc};

use db::Database;
use error::EngineError;
use report::ReportService;
use review::ReviewController;
use settings::SettingsStore;

pub use db::models;
pub use error::EngineError as Error;
pub use report::{ReportQuery, SUMMARY_REPORT_FIELDS};
pub use review::BackfillOutcome;

/// Everything a caller needs wired together: the store handle plus the
/// review and report services sharing it.
pub struct Engine {
    pub db: Database,
    pub reviews: ReviewController,
    pub reports: ReportService,
    pub settings: Arc<SettingsStore>,
}

impl Engine {
    pub fn open(db_path: PathBuf, settings_path: PathBuf) -> anyhow::Result<Self> {
        let db = Database::new(db_path)?;
        let settings = Arc::new(SettingsStore::new(settings_path)?);
        let reviews = ReviewController::new(db.clone());
        let reports = ReportService::new(db.clone(), Arc::clone(&settings));

        Ok(Self {
            db,
            reviews,
            reports,
            settings,
        })
    }
}

/// Maintenance entry point: open the store and run one backfill sweep.
///
/// Paths come from `SHELFPULSE_DB` and `SHELFPULSE_SETTINGS`, defaulting to
/// the working directory.
pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("shelfpulse starting up...");

    let result = (|| -> anyhow::Result<()> {
        let db_path = std::env::var("SHELFPULSE_DB")
            .unwrap_or_else(|_| "shelfpulse.sqlite3".to_string());
        let settings_path = std::env::var("SHELFPULSE_SETTINGS")
            .unwrap_or_else(|_| "shelfpulse-settings.json".to_string());

        let engine = Engine::open(PathBuf::from(db_path), PathBuf::from(settings_path))?;
        let backfill = engine.settings.backfill();

        let runtime = tokio::runtime::Runtime::new()?;
        let outcome = runtime
            .block_on(engine.reviews.backfill(&backfill))
            .map_err(|err: EngineError| anyhow::anyhow!(err))?;

        log::info!(
            "Backfill finished: {} reviews recomputed across {} batches",
            outcome.reviews_updated,
            outcome.batches
        );
        Ok(())
    })();

    if let Err(err) = result {
        log::error!("shelfpulse failed: {err:#}");
        std::process::exit(1);
    }
}
