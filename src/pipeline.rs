// src/pipeline.rs

use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::{
    config::AppConfig,
    crm::HubSpotClient,
    extract::extract_records,
    fetch::{dataset_download_url, download_archive},
    store::{insert_in_chunks, LoadReport, RecordStore, SqlStore},
    sync::{sync_contacts, SyncReport, SyncSettings},
};

/// Stream the archive on the blocking pool, then write its records in chunks.
#[instrument(level = "info", skip(store, archive_path), fields(archive = %archive_path.as_ref().display()))]
pub async fn extract_and_load<S: RecordStore>(
    store: &mut S,
    archive_path: impl AsRef<Path>,
    entry_name: &str,
    chunk_size: usize,
) -> Result<LoadReport> {
    let path: PathBuf = archive_path.as_ref().to_path_buf();
    let entry = entry_name.to_string();

    let extracted = tokio::task::spawn_blocking(move || extract_records(&path, &entry))
        .await
        .context("archive extraction task panicked")??;
    info!(
        records = extracted.records.len(),
        skipped = extracted.skipped,
        "CSV file processed"
    );

    let mut report = insert_in_chunks(store, &extracted.records, chunk_size).await?;
    report.skipped = extracted.skipped;
    Ok(report)
}

/// Download the dataset archive, then load it.
pub async fn run_acquisition(cfg: &AppConfig) -> Result<LoadReport> {
    let credentials = cfg.portal_credentials()?;
    let url = dataset_download_url(&cfg.kaggle_api_base, &cfg.kaggle_dataset)?;

    let client = Client::builder()
        .cookie_store(true)
        .build()
        .context("building HTTP client")?;
    info!(dataset = %cfg.kaggle_dataset, "downloading dataset");
    let archive = download_archive(&client, &url, &credentials, &cfg.archive_path).await?;

    load_archive(cfg, &archive).await
}

/// Load an archive that is already on disk at the configured path.
pub async fn run_load(cfg: &AppConfig) -> Result<LoadReport> {
    load_archive(cfg, &cfg.archive_path).await
}

async fn load_archive(cfg: &AppConfig, archive: &Path) -> Result<LoadReport> {
    let mut store = SqlStore::connect(&cfg.database_url).await?;
    let result = async {
        store.ensure_schema().await?;
        extract_and_load(&mut store, archive, &cfg.archive_entry, cfg.chunk_size).await
    }
    .await;
    store.close().await;
    result
}

/// Push the head of the table to the CRM.
pub async fn run_sync(cfg: &AppConfig) -> Result<SyncReport> {
    let client = Client::builder().build().context("building HTTP client")?;
    let api = HubSpotClient::new(client, cfg.contacts_url.clone(), cfg.hubspot_token.clone());

    let mut store = SqlStore::connect(&cfg.database_url).await?;
    let result = sync_contacts(&mut store, &api, api.has_token(), SyncSettings::from(cfg)).await;
    store.close().await;
    result
}
