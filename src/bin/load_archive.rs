//! Extract-load only: parse an archive already saved at `ARCHIVE_PATH`.

use anyhow::Result;
use namesync::{config::AppConfig, pipeline, telemetry};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    let cfg = AppConfig::from_env()?;
    info!(archive = %cfg.archive_path.display(), entry = %cfg.archive_entry, "loading archive");

    let report = pipeline::run_load(&cfg).await.inspect_err(|e| {
        error!("load failed: {:#}", e);
    })?;
    info!(
        records = report.records,
        chunks = report.chunks,
        skipped = report.skipped,
        "load finished"
    );
    Ok(())
}
