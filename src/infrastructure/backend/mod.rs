pub mod postgres;
pub mod rest;

use async_trait::async_trait;

use crate::domain::error::Result;
use crate::domain::import::{ImportTarget, PersistMode};
use crate::domain::record::{Identity, LeadRecord, TenantInfo, TenantOptions, TenantProvision};

/// Batched lead persistence.
#[async_trait]
pub trait CustomerStore {
    /// Write the whole batch in one call and return however many rows the
    /// store says were affected.
    async fn write_batch(
        &self,
        identity: &Identity,
        target: &ImportTarget,
        mode: PersistMode,
        records: &[LeadRecord],
    ) -> Result<u64>;
}

/// Tenant workspace lookup and provisioning.
#[async_trait]
pub trait TenantDirectory {
    /// Return the caller's workspace, creating one when none exists yet.
    async fn ensure(
        &self,
        identity: &Identity,
        options: &TenantOptions,
    ) -> Result<TenantProvision>;

    /// Workspace details, or `None` when the caller has no workspace.
    async fn info(&self, identity: &Identity) -> Result<Option<TenantInfo>>;

    /// Point the caller's workspace at a spreadsheet.
    async fn bind_sheet(&self, identity: &Identity, sheet_id: &str) -> Result<()>;
}

/// Access-token to user-identity resolution at the HTTP boundary.
#[async_trait]
pub trait IdentityResolver {
    async fn resolve(&self, access_token: &str) -> Result<Identity>;
}
