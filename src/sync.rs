// src/sync.rs

use anyhow::{bail, Result};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::{
    config::AppConfig,
    crm::ContactApi,
    store::RecordStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Most rows forwarded in one run.
    pub cap: usize,
    /// Pause between consecutive requests.
    pub delay: Duration,
    /// Refuse to run without a CRM token instead of failing every request.
    pub require_token: bool,
}

impl From<&AppConfig> for SyncSettings {
    fn from(cfg: &AppConfig) -> Self {
        SyncSettings {
            cap: cfg.sync_cap,
            delay: cfg.sync_delay,
            require_token: cfg.require_token,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub total_rows: u64,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Push the first `settings.cap` rows of the table to the CRM, one request
/// at a time. A failed request is logged and counted; it never stops the
/// batch and is never retried.
#[instrument(level = "info", skip_all, fields(cap = settings.cap))]
pub async fn sync_contacts<S, A>(
    store: &mut S,
    api: &A,
    token_loaded: bool,
    settings: SyncSettings,
) -> Result<SyncReport>
where
    S: RecordStore,
    A: ContactApi,
{
    let token_status = if token_loaded { "LOADED" } else { "MISSING" };
    info!(token = token_status, "authorization token status");
    if !token_loaded {
        if settings.require_token {
            bail!("HUBSPOT_API_TOKEN is not set and SYNC_REQUIRE_TOKEN is on");
        }
        warn!("no CRM token; every request will be rejected");
    }

    let total_rows = store.count().await?;
    info!(total_rows, "records available");

    let batch = store.fetch_prefix(settings.cap).await?;
    info!(batch = batch.len(), "processing batch");

    let mut report = SyncReport {
        total_rows,
        ..Default::default()
    };

    for (index, record) in batch.iter().enumerate() {
        if index > 0 && !settings.delay.is_zero() {
            sleep(settings.delay).await;
        }

        report.attempted += 1;
        match api.create_contact(record).await {
            Ok(()) => {
                report.succeeded += 1;
                info!(name = %record.name, "contact pushed");
            }
            Err(e) => {
                report.failed += 1;
                error!(name = %record.name, reason = %e, "failed to create contact");
            }
        }
    }

    info!(
        attempted = report.attempted,
        succeeded = report.succeeded,
        failed = report.failed,
        "all records processed"
    );
    Ok(report)
}
