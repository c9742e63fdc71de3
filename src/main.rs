use anyhow::Result;
use namesync::{config::AppConfig, pipeline, telemetry};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    telemetry::init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let cfg = AppConfig::from_env()?;
    info!(?cfg, "configuration loaded");

    // ─── 3) download, extract and load ───────────────────────────────
    match pipeline::run_acquisition(&cfg).await {
        Ok(report) => {
            info!(
                records = report.records,
                chunks = report.chunks,
                skipped = report.skipped,
                "acquisition finished"
            );
            Ok(())
        }
        Err(e) => {
            error!("acquisition failed: {:#}", e);
            Err(e)
        }
    }
}
