use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::csv::{HeaderMap, RawRow};
use crate::domain::record::{placeholder_email, CanonicalField, LeadRecord};

/// What to write into the email field when no email column was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailPolicy {
    /// Leave it empty; the validity filter will drop the row.
    Require,
    /// Generate a unique placeholder address so the row survives.
    Placeholder,
}

/// Row-level validity check applied after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPredicate {
    /// Keep the row if any cell of the raw row is non-empty.
    AnyCell,
    /// Keep the row only if the normalized email is non-empty.
    RequireEmail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistMode {
    Insert,
    Upsert,
}

/// What an import should do when the file has no data rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPolicy {
    /// Report a successful zero-record import.
    SilentZero,
    /// Fail the import with a no-data error.
    Fail,
}

/// Destination table for the batched write.
#[derive(Debug, Clone)]
pub struct ImportTarget {
    pub table: String,
    /// Column holding the owning user id; also the first half of the
    /// (owner, email) conflict key on upserts.
    pub owner_column: String,
}

/// Why a data row was dropped by the validity filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoContent,
    MissingEmail,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoContent => write!(f, "row has no content"),
            SkipReason::MissingEmail => write!(f, "missing email"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    #[serde(rename = "row")]
    pub line: usize,
    pub reason: SkipReason,
}

/// Settled webhook fan-out counts. Failures stay here; they never fail the
/// import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookTally {
    #[serde(rename = "notificationSuccessCount")]
    pub delivered: usize,
    #[serde(rename = "notificationFailureCount")]
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    #[serde(rename = "importedCount")]
    pub imported: u64,
    #[serde(rename = "failures")]
    pub skipped: Vec<SkippedRow>,
    #[serde(flatten)]
    pub webhook: Option<WebhookTally>,
    pub tenant_provisioned: bool,
}

impl ImportOutcome {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Per-entry-point import behavior.
///
/// The two upload paths of the dashboard differ in defaults, filtering,
/// destination table and side effects; everything that differs lives here so
/// the engine itself stays single-pathed.
#[derive(Debug, Clone)]
pub struct ImportProfile {
    pub name: &'static str,
    /// Source value applied when no source column was resolved.
    pub source_default: String,
    pub email_policy: EmailPolicy,
    pub predicate: RowPredicate,
    pub on_empty: EmptyPolicy,
    pub mode: PersistMode,
    pub target: ImportTarget,
    /// Make sure the caller has a tenant workspace before writing.
    pub ensure_tenant: bool,
    /// Fan the imported records out to the automation webhook afterwards.
    pub notify: bool,
}

impl ImportProfile {
    /// Quick-upload path: takes anything, fabricates an email when the file
    /// has none, and forwards every imported record to the webhook.
    pub fn permissive() -> Self {
        Self {
            name: "permissive",
            source_default: "CSV Import".to_string(),
            email_policy: EmailPolicy::Placeholder,
            predicate: RowPredicate::AnyCell,
            on_empty: EmptyPolicy::SilentZero,
            mode: PersistMode::Insert,
            target: ImportTarget {
                table: "sales_representatives".to_string(),
                owner_column: "user_id".to_string(),
            },
            ensure_tenant: false,
            notify: true,
        }
    }

    /// Tenant-aware path: drops rows without an email, provisions the
    /// caller's workspace on demand and upserts on the (owner, email) key.
    pub fn strict_tenant() -> Self {
        Self {
            name: "strict_tenant",
            source_default: "csv".to_string(),
            email_policy: EmailPolicy::Require,
            predicate: RowPredicate::RequireEmail,
            on_empty: EmptyPolicy::Fail,
            mode: PersistMode::Upsert,
            target: ImportTarget {
                table: "customers".to_string(),
                owner_column: "sales_rep_user_id".to_string(),
            },
            ensure_tenant: true,
            notify: false,
        }
    }

    /// Display-only path for spreadsheet previews. Persistence settings are
    /// never consulted on this profile.
    pub fn sheet_preview() -> Self {
        Self {
            name: "sheet_preview",
            source_default: String::new(),
            email_policy: EmailPolicy::Require,
            predicate: RowPredicate::RequireEmail,
            on_empty: EmptyPolicy::Fail,
            mode: PersistMode::Insert,
            target: ImportTarget {
                table: "customers".to_string(),
                owner_column: "sales_rep_user_id".to_string(),
            },
            ensure_tenant: false,
            notify: false,
        }
    }

    pub fn with_mode(mut self, mode: PersistMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shape one raw row into a record. Resolved columns are read as-is,
    /// empty cells included; defaults apply only to unresolved fields.
    pub fn normalize(&self, row: &RawRow, map: &HeaderMap) -> LeadRecord {
        let take = |field: CanonicalField| map.get(field).map(|idx| row.cell(idx).to_string());
        LeadRecord {
            first_name: take(CanonicalField::FirstName).unwrap_or_default(),
            last_name: take(CanonicalField::LastName).unwrap_or_default(),
            email: take(CanonicalField::Email).unwrap_or_else(|| match self.email_policy {
                EmailPolicy::Placeholder => placeholder_email(),
                EmailPolicy::Require => String::new(),
            }),
            phone_no: take(CanonicalField::PhoneNo).unwrap_or_default(),
            source: take(CanonicalField::Source)
                .unwrap_or_else(|| self.source_default.clone()),
            notes: take(CanonicalField::Notes).filter(|cell| !cell.is_empty()),
        }
    }

    /// Validity filter. `None` keeps the row, `Some(reason)` drops it.
    pub fn screen(&self, row: &RawRow, record: &LeadRecord) -> Option<SkipReason> {
        match self.predicate {
            RowPredicate::AnyCell => (!row.has_content()).then_some(SkipReason::NoContent),
            RowPredicate::RequireEmail => {
                record.email.is_empty().then_some(SkipReason::MissingEmail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::csv::HeaderMap;

    fn row(cells: &[&str]) -> RawRow {
        RawRow::new(2, cells.iter().map(|c| c.to_string()).collect())
    }

    fn full_map() -> HeaderMap {
        let mut map = HeaderMap::default();
        map.bind(CanonicalField::FirstName, 0);
        map.bind(CanonicalField::LastName, 1);
        map.bind(CanonicalField::Email, 2);
        map.bind(CanonicalField::PhoneNo, 3);
        map.bind(CanonicalField::Source, 4);
        map.bind(CanonicalField::Notes, 5);
        map
    }

    #[test]
    fn test_normalize_reads_resolved_columns() {
        let record = ImportProfile::permissive().normalize(
            &row(&["Jane", "Doe", "jane@x.io", "555", "referral", "vip"]),
            &full_map(),
        );
        assert_eq!(record.first_name, "Jane");
        assert_eq!(record.last_name, "Doe");
        assert_eq!(record.email, "jane@x.io");
        assert_eq!(record.phone_no, "555");
        assert_eq!(record.source, "referral");
        assert_eq!(record.notes.as_deref(), Some("vip"));
    }

    #[test]
    fn test_normalize_keeps_empty_resolved_cells() {
        // An empty cell in a resolved column stays empty; the default is for
        // unresolved columns only.
        let record = ImportProfile::permissive()
            .normalize(&row(&["", "", "", "", "", ""]), &full_map());
        assert_eq!(record.source, "");
        assert_eq!(record.email, "");
        assert_eq!(record.notes, None);
    }

    #[test]
    fn test_normalize_defaults_for_unresolved_columns() {
        let mut map = HeaderMap::default();
        map.bind(CanonicalField::FirstName, 0);
        let record = ImportProfile::permissive().normalize(&row(&["Jane"]), &map);
        assert_eq!(record.first_name, "Jane");
        assert_eq!(record.last_name, "");
        assert_eq!(record.source, "CSV Import");
        assert!(record.email.starts_with("unknown_"));
        assert!(record.email.ends_with("@example.com"));
        assert_eq!(record.notes, None);
    }

    #[test]
    fn test_normalize_strict_leaves_email_empty() {
        let mut map = HeaderMap::default();
        map.bind(CanonicalField::FirstName, 0);
        let record = ImportProfile::strict_tenant().normalize(&row(&["Jane"]), &map);
        assert_eq!(record.email, "");
        assert_eq!(record.source, "csv");
    }

    #[test]
    fn test_normalize_short_row_reads_empty() {
        let record = ImportProfile::strict_tenant().normalize(&row(&["Jane", "Doe"]), &full_map());
        assert_eq!(record.first_name, "Jane");
        assert_eq!(record.last_name, "Doe");
        assert_eq!(record.email, "");
        assert_eq!(record.phone_no, "");
    }

    #[test]
    fn test_screen_any_cell() {
        let profile = ImportProfile::permissive();
        let map = HeaderMap::default();
        let keep = row(&["", "x"]);
        let drop = row(&["", ""]);
        assert_eq!(profile.screen(&keep, &profile.normalize(&keep, &map)), None);
        assert_eq!(
            profile.screen(&drop, &profile.normalize(&drop, &map)),
            Some(SkipReason::NoContent)
        );
    }

    #[test]
    fn test_screen_require_email() {
        let profile = ImportProfile::strict_tenant();
        let mut map = HeaderMap::default();
        map.bind(CanonicalField::Email, 0);
        let keep = row(&["a@b.c"]);
        let drop = row(&[""]);
        assert_eq!(profile.screen(&keep, &profile.normalize(&keep, &map)), None);
        assert_eq!(
            profile.screen(&drop, &profile.normalize(&drop, &map)),
            Some(SkipReason::MissingEmail)
        );
    }

    #[test]
    fn test_any_cell_looks_at_raw_row_not_record() {
        // A row whose only content sits in an unmapped column still counts.
        let profile = ImportProfile::permissive();
        let mut map = HeaderMap::default();
        map.bind(CanonicalField::FirstName, 0);
        let raw = row(&["", "orphan value"]);
        let record = profile.normalize(&raw, &map);
        assert_eq!(record.first_name, "");
        assert_eq!(profile.screen(&raw, &record), None);
    }

    #[test]
    fn test_profile_divergence() {
        let quick = ImportProfile::permissive();
        let tenant = ImportProfile::strict_tenant();
        assert_eq!(quick.target.table, "sales_representatives");
        assert_eq!(quick.target.owner_column, "user_id");
        assert_eq!(quick.mode, PersistMode::Insert);
        assert!(quick.notify);
        assert!(!quick.ensure_tenant);
        assert_eq!(quick.on_empty, EmptyPolicy::SilentZero);

        assert_eq!(tenant.target.table, "customers");
        assert_eq!(tenant.target.owner_column, "sales_rep_user_id");
        assert_eq!(tenant.mode, PersistMode::Upsert);
        assert!(!tenant.notify);
        assert!(tenant.ensure_tenant);
        assert_eq!(tenant.on_empty, EmptyPolicy::Fail);
    }

    #[test]
    fn test_with_mode_override() {
        let profile = ImportProfile::strict_tenant().with_mode(PersistMode::Insert);
        assert_eq!(profile.mode, PersistMode::Insert);
    }

    #[test]
    fn test_outcome_serialization_surface() {
        let outcome = ImportOutcome {
            imported: 3,
            skipped: vec![SkippedRow {
                line: 4,
                reason: SkipReason::MissingEmail,
            }],
            webhook: Some(WebhookTally {
                delivered: 2,
                failed: 1,
            }),
            tenant_provisioned: true,
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["importedCount"], 3);
        assert_eq!(value["failures"][0]["row"], 4);
        assert_eq!(value["failures"][0]["reason"], "missing_email");
        assert_eq!(value["notificationSuccessCount"], 2);
        assert_eq!(value["notificationFailureCount"], 1);
        assert_eq!(value["tenantProvisioned"], true);
    }

    #[test]
    fn test_outcome_without_webhook_omits_notification_counts() {
        let value = serde_json::to_value(ImportOutcome::empty()).unwrap();
        assert_eq!(value["importedCount"], 0);
        assert!(value.get("notificationSuccessCount").is_none());
    }
}
