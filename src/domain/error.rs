use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured failure reported by the hosted data platform.
///
/// The platform returns loosely shaped error objects; the candidate message
/// sources are ordered and the first non-empty one is surfaced to the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFault {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl StoreFault {
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Pick the message shown to the user: message, then details, then hint,
    /// then the raw error code.
    pub fn surface(&self) -> String {
        [&self.message, &self.details, &self.hint, &self.code]
            .into_iter()
            .flatten()
            .find(|candidate| !candidate.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| "unknown storage error".to_string())
    }
}

impl fmt::Display for StoreFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.surface())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AppError {
    /// No resolvable user identity; nothing was read or written.
    AuthenticationRequired(String),
    /// Advisory extension/media-type check failed; the upload was not parsed.
    InvalidFileType(String),
    /// The input had no data rows after tokenization.
    NoData(String),
    /// Every data row was removed by the validity filter.
    NoValidRows(String),
    /// The batched write (or a platform RPC) failed; the import is reported
    /// failed as a whole.
    Persistence(StoreFault),
    /// A single webhook dispatch failed; never escalated past a warning.
    Notification(String),
    /// Fetching a spreadsheet export failed.
    SheetFetch(String),
    Config(String),
    Internal(String),
}

impl AppError {
    /// Stable machine-readable tag used by the HTTP error body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::AuthenticationRequired(_) => "authentication_required",
            AppError::InvalidFileType(_) => "invalid_file_type",
            AppError::NoData(_) => "no_data",
            AppError::NoValidRows(_) => "no_valid_rows",
            AppError::Persistence(_) => "persistence_failure",
            AppError::Notification(_) => "notification_failure",
            AppError::SheetFetch(_) => "sheet_fetch_failed",
            AppError::Config(_) => "config_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::AuthenticationRequired(msg) => write!(f, "Authentication required: {}", msg),
            AppError::InvalidFileType(msg) => write!(f, "Invalid file type: {}", msg),
            AppError::NoData(msg) => write!(f, "No data: {}", msg),
            AppError::NoValidRows(msg) => write!(f, "No valid rows: {}", msg),
            AppError::Persistence(fault) => write!(f, "Import failed: {}", fault.surface()),
            AppError::Notification(msg) => write!(f, "Webhook error: {}", msg),
            AppError::SheetFetch(msg) => write!(f, "Sheet fetch error: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
