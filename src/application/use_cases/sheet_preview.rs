use std::sync::Arc;

use tracing::debug;

use crate::domain::error::{AppError, Result};
use crate::domain::import::ImportProfile;
use crate::domain::record::{Identity, LeadRecord};
use crate::infrastructure::backend::TenantDirectory;
use crate::infrastructure::csv::{resolve_headers, tokenize};
use crate::infrastructure::sheets::SheetSource;

/// Read-only dashboard preview of a workspace's spreadsheet.
///
/// Fetches the sheet's CSV export and runs it through the same tokenizer and
/// header resolver as a file import, but nothing is persisted and nothing is
/// sent to the webhook. Rows without an email are dropped, the rest come back
/// as normalized records for display.
pub struct SheetPreviewUseCase {
    tenants: Arc<dyn TenantDirectory + Send + Sync>,
    sheets: Arc<dyn SheetSource + Send + Sync>,
}

impl SheetPreviewUseCase {
    pub fn new(
        tenants: Arc<dyn TenantDirectory + Send + Sync>,
        sheets: Arc<dyn SheetSource + Send + Sync>,
    ) -> Self {
        Self { tenants, sheets }
    }

    /// An explicit `sheet_id` wins over the workspace's stored binding.
    pub async fn execute(
        &self,
        identity: &Identity,
        sheet_id: Option<&str>,
    ) -> Result<Vec<LeadRecord>> {
        let sheet_id = match sheet_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(explicit) => explicit.to_string(),
            None => self
                .tenants
                .info(identity)
                .await?
                .and_then(|info| info.sheet_id)
                .ok_or_else(|| {
                    AppError::NoData("No spreadsheet is bound to this workspace".to_string())
                })?,
        };

        let text = self.sheets.fetch_csv(&sheet_id).await?;
        let rows = tokenize(&text);
        let Some((header, data)) = rows.split_first() else {
            return Err(no_rows());
        };
        if data.is_empty() {
            return Err(no_rows());
        }

        let map = resolve_headers(header);
        let profile = ImportProfile::sheet_preview();
        let records: Vec<LeadRecord> = data
            .iter()
            .filter_map(|row| {
                let record = profile.normalize(row, &map);
                profile.screen(row, &record).is_none().then_some(record)
            })
            .collect();
        debug!(
            sheet_id = %sheet_id,
            rows = data.len(),
            kept = records.len(),
            "Sheet preview normalized"
        );
        Ok(records)
    }
}

fn no_rows() -> AppError {
    AppError::NoData("CSV must have at least a header row and one data row".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    use crate::domain::record::{TenantInfo, TenantOptions, TenantProvision};

    fn identity() -> Identity {
        Identity {
            user_id: Uuid::nil(),
            email: None,
            access_token: "token".to_string(),
        }
    }

    struct FakeTenants {
        bound_sheet: Option<String>,
    }

    #[async_trait]
    impl TenantDirectory for FakeTenants {
        async fn ensure(
            &self,
            _identity: &Identity,
            _options: &TenantOptions,
        ) -> Result<TenantProvision> {
            Ok(TenantProvision {
                tenant_id: Uuid::nil(),
                created: false,
            })
        }

        async fn info(&self, _identity: &Identity) -> Result<Option<TenantInfo>> {
            Ok(Some(TenantInfo {
                id: Uuid::nil(),
                name: Some("Acme".to_string()),
                sheet_id: self.bound_sheet.clone(),
            }))
        }

        async fn bind_sheet(&self, _identity: &Identity, _sheet_id: &str) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSheets {
        csv: String,
        requested: Mutex<Option<String>>,
    }

    #[async_trait]
    impl SheetSource for FakeSheets {
        async fn fetch_csv(&self, sheet_id: &str) -> Result<String> {
            *self.requested.lock().unwrap() = Some(sheet_id.to_string());
            Ok(self.csv.clone())
        }
    }

    fn preview(bound_sheet: Option<&str>, csv: &str) -> (Arc<FakeSheets>, SheetPreviewUseCase) {
        let sheets = Arc::new(FakeSheets {
            csv: csv.to_string(),
            ..FakeSheets::default()
        });
        let use_case = SheetPreviewUseCase::new(
            Arc::new(FakeTenants {
                bound_sheet: bound_sheet.map(str::to_string),
            }),
            sheets.clone(),
        );
        (sheets, use_case)
    }

    #[tokio::test]
    async fn test_uses_bound_sheet_when_no_id_given() {
        let (sheets, use_case) = preview(Some("bound-sheet"), "email\njane@x.io");
        let records = use_case.execute(&identity(), None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            sheets.requested.lock().unwrap().as_deref(),
            Some("bound-sheet")
        );
    }

    #[tokio::test]
    async fn test_explicit_sheet_id_wins_over_binding() {
        let (sheets, use_case) = preview(Some("bound-sheet"), "email\njane@x.io");
        use_case
            .execute(&identity(), Some("explicit-sheet"))
            .await
            .unwrap();
        assert_eq!(
            sheets.requested.lock().unwrap().as_deref(),
            Some("explicit-sheet")
        );
    }

    #[tokio::test]
    async fn test_blank_sheet_id_falls_back_to_binding() {
        let (sheets, use_case) = preview(Some("bound-sheet"), "email\njane@x.io");
        use_case.execute(&identity(), Some("   ")).await.unwrap();
        assert_eq!(
            sheets.requested.lock().unwrap().as_deref(),
            Some("bound-sheet")
        );
    }

    #[tokio::test]
    async fn test_no_binding_and_no_id_is_no_data() {
        let (sheets, use_case) = preview(None, "email\njane@x.io");
        let err = use_case.execute(&identity(), None).await.unwrap_err();
        assert!(matches!(err, AppError::NoData(_)));
        // The fetcher is never called without a sheet to fetch.
        assert!(sheets.requested.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_header_only_sheet_is_no_data() {
        let (_, use_case) = preview(Some("s"), "first_name,email\n");
        let err = use_case.execute(&identity(), None).await.unwrap_err();
        assert!(matches!(err, AppError::NoData(_)));
    }

    #[tokio::test]
    async fn test_rows_without_email_are_dropped() {
        let csv = "first_name,email\nJane,jane@x.io\nBob,\nAna,ana@x.io";
        let (_, use_case) = preview(Some("s"), csv);
        let records = use_case.execute(&identity(), None).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].first_name, "Jane");
        assert_eq!(records[1].first_name, "Ana");
    }

    #[tokio::test]
    async fn test_preview_defaults_are_empty_not_fabricated() {
        // No source column and no email column: the preview neither invents a
        // placeholder address nor a source label.
        let (_, use_case) = preview(Some("s"), "first_name,email\nJane,jane@x.io");
        let records = use_case.execute(&identity(), None).await.unwrap();
        assert_eq!(records[0].source, "");
        assert_eq!(records[0].notes, None);
    }

    #[tokio::test]
    async fn test_all_rows_filtered_returns_empty_list() {
        // A sheet with data rows but no usable email previews as empty rather
        // than erroring; the dashboard renders an empty table.
        let (_, use_case) = preview(Some("s"), "first_name\nJane\nBob");
        let records = use_case.execute(&identity(), None).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        struct FailingSheets;

        #[async_trait]
        impl SheetSource for FailingSheets {
            async fn fetch_csv(&self, _sheet_id: &str) -> Result<String> {
                Err(AppError::SheetFetch("sheet export failed (404)".to_string()))
            }
        }

        let use_case = SheetPreviewUseCase::new(
            Arc::new(FakeTenants {
                bound_sheet: Some("s".to_string()),
            }),
            Arc::new(FailingSheets),
        );
        let err = use_case.execute(&identity(), None).await.unwrap_err();
        assert!(matches!(err, AppError::SheetFetch(_)));
    }
}
