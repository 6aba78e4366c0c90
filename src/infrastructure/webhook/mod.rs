// ============================================================
// AUTOMATION WEBHOOK NOTIFIER
// ============================================================
// Best-effort outbound dispatch of imported records. One POST
// per record; callers aggregate outcomes and never fail an
// import over a webhook error.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::error::{AppError, Result};
use crate::domain::record::LeadRecord;
use crate::infrastructure::config::WebhookConfig;

#[async_trait]
pub trait RecordNotifier {
    async fn dispatch(&self, record: &LeadRecord) -> Result<()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordPayload<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    phone_no: &'a str,
    notes: &'a str,
}

impl<'a> RecordPayload<'a> {
    fn from_record(record: &'a LeadRecord) -> Self {
        Self {
            first_name: &record.first_name,
            last_name: &record.last_name,
            email: &record.email,
            phone_no: &record.phone_no,
            notes: record.notes.as_deref().unwrap_or(""),
        }
    }
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(config: &WebhookConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl RecordNotifier for WebhookNotifier {
    async fn dispatch(&self, record: &LeadRecord) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&RecordPayload::from_record(record))
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Notification(format!(
                "webhook rejected the record ({})",
                response.status()
            )));
        }
        Ok(())
    }
}
