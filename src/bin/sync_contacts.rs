//! Push the head of `BabyNames` to the CRM as contacts.
//!
//! Errors are logged and the process exits normally.

use namesync::{config::AppConfig, pipeline, telemetry};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    telemetry::init();
    info!("CRM data push initiated");

    let cfg = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("error in main sync process: {:#}", e);
            return;
        }
    };

    match pipeline::run_sync(&cfg).await {
        Ok(report) => info!(
            total_rows = report.total_rows,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            "sync finished"
        ),
        Err(e) => error!("error in main sync process: {:#}", e),
    }
}
