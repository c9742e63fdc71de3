// src/crm.rs

use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::record::NameRecord;

/// Body of a create-contact call.
#[derive(Debug, Serialize)]
pub struct ContactPayload<'a> {
    pub properties: ContactProperties<'a>,
}

#[derive(Debug, Serialize)]
pub struct ContactProperties<'a> {
    pub firstname: &'a str,
    pub gender: &'a str,
}

impl<'a> From<&'a NameRecord> for ContactPayload<'a> {
    fn from(record: &'a NameRecord) -> Self {
        ContactPayload {
            properties: ContactProperties {
                firstname: &record.name,
                gender: &record.sex,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{status}: {message}")]
    Rejected { status: StatusCode, message: String },
}

#[allow(async_fn_in_trait)]
pub trait ContactApi {
    async fn create_contact(&self, record: &NameRecord) -> Result<(), ContactError>;
}

/// HubSpot CRM contacts endpoint.
pub struct HubSpotClient {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl HubSpotClient {
    pub fn new(client: Client, endpoint: Url, token: Option<String>) -> Self {
        HubSpotClient {
            client,
            endpoint,
            token,
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

impl ContactApi for HubSpotClient {
    async fn create_contact(&self, record: &NameRecord) -> Result<(), ContactError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.token.as_deref().unwrap_or_default())
            .json(&ContactPayload::from(record))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            debug!(%status, name = %record.name, "contact created");
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(ContactError::Rejected {
            status,
            message: rejection_message(status, &body),
        })
    }
}

/// Prefer the API's own `message` field, then the raw body, then the status.
fn rejection_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = value.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("unexpected status")
        .to_string()
}
