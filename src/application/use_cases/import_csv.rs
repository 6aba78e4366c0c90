use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::import::{
    EmptyPolicy, ImportOutcome, ImportProfile, RowPredicate, SkippedRow, WebhookTally,
};
use crate::domain::record::{Identity, LeadRecord, TenantOptions};
use crate::infrastructure::backend::{CustomerStore, TenantDirectory};
use crate::infrastructure::csv::{resolve_headers, tokenize};
use crate::infrastructure::webhook::RecordNotifier;

/// The import pipeline: tokenize, resolve headers, normalize, filter, then
/// persist in one batch and fan out to the webhook.
///
/// Local stages run to completion before any delegate is touched, so a file
/// that fails validation causes no external calls at all. A persistence
/// failure aborts before notification; notification failures only downgrade
/// the reported tally.
pub struct CsvImportUseCase {
    store: Arc<dyn CustomerStore + Send + Sync>,
    tenants: Arc<dyn TenantDirectory + Send + Sync>,
    notifier: Arc<dyn RecordNotifier + Send + Sync>,
}

impl CsvImportUseCase {
    pub fn new(
        store: Arc<dyn CustomerStore + Send + Sync>,
        tenants: Arc<dyn TenantDirectory + Send + Sync>,
        notifier: Arc<dyn RecordNotifier + Send + Sync>,
    ) -> Self {
        Self {
            store,
            tenants,
            notifier,
        }
    }

    /// Advisory upload check: accept when either the file extension or the
    /// media type says CSV. When neither hint was supplied there is nothing
    /// to check.
    pub fn check_upload(file_name: Option<&str>, media_type: Option<&str>) -> Result<()> {
        if file_name.is_none() && media_type.is_none() {
            return Ok(());
        }
        let by_name = file_name
            .map(|name| name.to_ascii_lowercase().ends_with(".csv"))
            .unwrap_or(false);
        let by_type = media_type
            .map(|media| media.to_ascii_lowercase().contains("csv"))
            .unwrap_or(false);
        if by_name || by_type {
            Ok(())
        } else {
            Err(AppError::InvalidFileType(
                "Please upload a CSV file.".to_string(),
            ))
        }
    }

    pub async fn execute(
        &self,
        identity: &Identity,
        profile: &ImportProfile,
        text: &str,
    ) -> Result<ImportOutcome> {
        let rows = tokenize(text);
        let Some((header, data)) = rows.split_first() else {
            return empty_outcome(profile);
        };
        if data.is_empty() {
            return empty_outcome(profile);
        }

        let map = resolve_headers(header);
        let bound: Vec<String> = map
            .bindings()
            .into_iter()
            .map(|(field, idx)| format!("{}={}", field.name(), idx))
            .collect();
        debug!(
            "Resolved {} of 6 canonical columns for profile {}: [{}]",
            map.resolved_count(),
            profile.name,
            bound.join(", ")
        );

        let mut records = Vec::new();
        let mut skipped = Vec::new();
        for row in data {
            let record = profile.normalize(row, &map);
            match profile.screen(row, &record) {
                None => records.push(record),
                Some(reason) => skipped.push(SkippedRow {
                    line: row.line,
                    reason,
                }),
            }
        }

        if records.is_empty() {
            let message = match profile.predicate {
                RowPredicate::RequireEmail => "CSV did not contain any rows with an email field.",
                RowPredicate::AnyCell => "No data rows found in CSV file",
            };
            return Err(AppError::NoValidRows(message.to_string()));
        }

        // Every local stage passed; external calls may start now.
        let mut tenant_provisioned = false;
        if profile.ensure_tenant {
            let provision = self
                .tenants
                .ensure(identity, &TenantOptions::default())
                .await?;
            if provision.created {
                info!(
                    "Provisioned client workspace {} for user {}",
                    provision.tenant_id, identity.user_id
                );
                tenant_provisioned = true;
            }
        }

        let imported = self
            .store
            .write_batch(identity, &profile.target, profile.mode, &records)
            .await?;
        info!(
            "Imported {} records ({} skipped) via profile {}",
            imported,
            skipped.len(),
            profile.name
        );

        let webhook = if profile.notify {
            Some(self.fan_out(records).await)
        } else {
            None
        };

        Ok(ImportOutcome {
            imported,
            skipped,
            webhook,
            tenant_provisioned,
        })
    }

    /// Concurrent fan-out; waits for every dispatch to settle and counts
    /// outcomes instead of propagating them.
    async fn fan_out(&self, records: Vec<LeadRecord>) -> WebhookTally {
        let mut set = tokio::task::JoinSet::new();
        for record in records {
            let notifier = Arc::clone(&self.notifier);
            set.spawn(async move { notifier.dispatch(&record).await });
        }

        let mut tally = WebhookTally::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => tally.delivered += 1,
                Ok(Err(err)) => {
                    warn!("Webhook dispatch failed: {}", err);
                    tally.failed += 1;
                }
                Err(err) => {
                    warn!("Webhook task failed to run: {}", err);
                    tally.failed += 1;
                }
            }
        }
        tally
    }
}

fn empty_outcome(profile: &ImportProfile) -> Result<ImportOutcome> {
    match profile.on_empty {
        EmptyPolicy::SilentZero => Ok(ImportOutcome::empty()),
        EmptyPolicy::Fail => Err(AppError::NoData(
            "CSV must have at least a header row and one data row".to_string(),
        )),
    }
}
