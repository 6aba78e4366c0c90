use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::domain::record::LeadRecord;
use crate::infrastructure::webhook::RecordNotifier;

/// What a single on-demand forward reported back. Failures land in the
/// receipt, never in an error: the caller decides how loudly to surface them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessReceipt {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Forwards one existing record to the automation webhook on demand, the
/// dashboard's "process client" action.
pub struct ProcessRecordUseCase {
    notifier: Arc<dyn RecordNotifier + Send + Sync>,
}

impl ProcessRecordUseCase {
    pub fn new(notifier: Arc<dyn RecordNotifier + Send + Sync>) -> Self {
        Self { notifier }
    }

    pub async fn execute(&self, record: &LeadRecord) -> ProcessReceipt {
        match self.notifier.dispatch(record).await {
            Ok(()) => ProcessReceipt {
                success: true,
                message: None,
            },
            Err(err) => {
                warn!(email = %record.email, "Record forwarding failed: {}", err);
                ProcessReceipt {
                    success: false,
                    message: Some(err.to_string()),
                }
            }
        }
    }
}
