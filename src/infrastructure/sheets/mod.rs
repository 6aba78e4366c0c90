// ============================================================
// SPREADSHEET EXPORT FETCHER
// ============================================================
// Pulls a published spreadsheet as CSV text over its export
// endpoint. No API key involved; the sheet must be link-readable.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::SheetsConfig;

static SHEET_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Spreadsheet ids use a URL-safe alphabet; anything else would end up
/// altering the export path.
pub fn is_valid_sheet_id(sheet_id: &str) -> bool {
    SHEET_ID_PATTERN.is_match(sheet_id)
}

#[async_trait]
pub trait SheetSource {
    async fn fetch_csv(&self, sheet_id: &str) -> Result<String>;
}

pub struct SheetFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl SheetFetcher {
    pub fn new(config: &SheetsConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: config.base_url.clone(),
        }
    }

    fn export_url(&self, sheet_id: &str) -> Result<String> {
        if !is_valid_sheet_id(sheet_id) {
            return Err(AppError::SheetFetch(format!(
                "invalid spreadsheet id: {:?}",
                sheet_id
            )));
        }
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::Config(format!("bad sheets base url: {}", e)))?;
        url.set_path(&format!("/spreadsheets/d/{}/export", sheet_id));
        url.set_query(Some("format=csv"));
        Ok(url.to_string())
    }
}

#[async_trait]
impl SheetSource for SheetFetcher {
    async fn fetch_csv(&self, sheet_id: &str) -> Result<String> {
        let url = self.export_url(sheet_id)?;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::SheetFetch(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::SheetFetch(format!(
                "sheet export failed ({})",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::SheetFetch(format!("Failed to read export body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> SheetFetcher {
        SheetFetcher::new(&SheetsConfig {
            base_url: "https://docs.google.com".to_string(),
        })
    }

    #[test]
    fn test_export_url() {
        let url = fetcher().export_url("1AbC_d-9").unwrap();
        assert_eq!(
            url,
            "https://docs.google.com/spreadsheets/d/1AbC_d-9/export?format=csv"
        );
    }

    #[test]
    fn test_rejects_sheet_ids_with_path_characters() {
        assert!(fetcher().export_url("abc/def").is_err());
        assert!(fetcher().export_url("abc?x=1").is_err());
        assert!(fetcher().export_url("").is_err());
    }
}
