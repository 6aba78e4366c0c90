// ============================================================
// POSTGRES BACKEND
// ============================================================
// Direct-connection driver for self-hosted deployments. Covers
// the same store and tenant operations as the REST driver, but
// scopes rows explicitly by the caller's user id instead of
// relying on row-level security.

use async_trait::async_trait;
use sqlx::postgres::{PgDatabaseError, PgPool, PgPoolOptions};
use sqlx::QueryBuilder;
use uuid::Uuid;

use super::{CustomerStore, TenantDirectory};
use crate::domain::error::{AppError, Result, StoreFault};
use crate::domain::import::{ImportTarget, PersistMode};
use crate::domain::record::{Identity, LeadRecord, TenantInfo, TenantOptions, TenantProvision};

pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| AppError::Config(format!("Failed to connect to Postgres: {}", e)))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl CustomerStore for PgBackend {
    async fn write_batch(
        &self,
        identity: &Identity,
        target: &ImportTarget,
        mode: PersistMode,
        records: &[LeadRecord],
    ) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        // Table and owner column come from the fixed import profiles, never
        // from user input, so interpolating them is safe.
        let mut builder = QueryBuilder::<sqlx::Postgres>::new(format!(
            "INSERT INTO {} ({}, first_name, last_name, email, phone_no, source, notes) ",
            target.table, target.owner_column
        ));
        builder.push_values(records.iter(), |mut row, record| {
            row.push_bind(identity.user_id)
                .push_bind(&record.first_name)
                .push_bind(&record.last_name)
                .push_bind(&record.email)
                .push_bind(&record.phone_no)
                .push_bind(&record.source)
                .push_bind(&record.notes);
        });
        if mode == PersistMode::Upsert {
            builder.push(format!(
                " ON CONFLICT ({}, email) DO UPDATE SET \
                 first_name = EXCLUDED.first_name, \
                 last_name = EXCLUDED.last_name, \
                 phone_no = EXCLUDED.phone_no, \
                 source = EXCLUDED.source, \
                 notes = EXCLUDED.notes",
                target.owner_column
            ));
        }

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(store_fault)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TenantDirectory for PgBackend {
    async fn ensure(
        &self,
        identity: &Identity,
        options: &TenantOptions,
    ) -> Result<TenantProvision> {
        let existing: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT client_id FROM profiles WHERE user_id = $1")
                .bind(identity.user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_fault)?;

        if let Some(Some(tenant_id)) = existing {
            return Ok(TenantProvision {
                tenant_id,
                created: false,
            });
        }

        // Create the workspace and point the caller's profile at it in one
        // transaction so a failed second step leaves no orphan workspace.
        let mut tx = self.pool.begin().await.map_err(store_fault)?;

        let name = options
            .client_name
            .clone()
            .unwrap_or_else(|| "Private workspace".to_string());
        let sheet = options.sheet_id.clone().unwrap_or_default();
        let tenant_id: Uuid = sqlx::query_scalar(
            "INSERT INTO client_data (client_name, google_sheet_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(&name)
        .bind(&sheet)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_fault)?;

        let updated = sqlx::query("UPDATE profiles SET client_id = $2 WHERE user_id = $1")
            .bind(identity.user_id)
            .bind(tenant_id)
            .execute(&mut *tx)
            .await
            .map_err(store_fault)?;
        if updated.rows_affected() == 0 {
            sqlx::query("INSERT INTO profiles (user_id, client_id) VALUES ($1, $2)")
                .bind(identity.user_id)
                .bind(tenant_id)
                .execute(&mut *tx)
                .await
                .map_err(store_fault)?;
        }

        tx.commit().await.map_err(store_fault)?;
        Ok(TenantProvision {
            tenant_id,
            created: true,
        })
    }

    async fn info(&self, identity: &Identity) -> Result<Option<TenantInfo>> {
        let row: Option<(Uuid, String, String)> = sqlx::query_as(
            r#"
            SELECT cd.id, cd.client_name, cd.google_sheet_id
            FROM client_data cd
            JOIN profiles p ON p.client_id = cd.id
            WHERE p.user_id = $1
            "#,
        )
        .bind(identity.user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_fault)?;

        Ok(row.map(|(id, name, sheet)| TenantInfo {
            id,
            name: Some(name).filter(|name| !name.is_empty()),
            sheet_id: Some(sheet).filter(|sheet| !sheet.is_empty()),
        }))
    }

    async fn bind_sheet(&self, identity: &Identity, sheet_id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE client_data SET google_sheet_id = $2
            WHERE id = (SELECT client_id FROM profiles WHERE user_id = $1)
            "#,
        )
        .bind(identity.user_id)
        .bind(sheet_id)
        .execute(&self.pool)
        .await
        .map_err(store_fault)?;

        if result.rows_affected() == 0 {
            return Err(AppError::Persistence(StoreFault::from_message(
                "no client workspace bound to this account",
            )));
        }
        Ok(())
    }
}

/// Lift a database error into the structured fault shape the rest of the
/// pipeline reports from.
fn store_fault(err: sqlx::Error) -> AppError {
    let fault = match err.as_database_error() {
        Some(db) => {
            let pg = db.try_downcast_ref::<PgDatabaseError>();
            StoreFault {
                message: Some(db.message().to_string()),
                details: pg.and_then(|pg| pg.detail().map(str::to_string)),
                hint: pg.and_then(|pg| pg.hint().map(str::to_string)),
                code: db.code().map(|code| code.to_string()),
            }
        }
        None => StoreFault::from_message(err.to_string()),
    };
    AppError::Persistence(fault)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_fault_without_database_error() {
        let err = store_fault(sqlx::Error::RowNotFound);
        let AppError::Persistence(fault) = err else {
            panic!("expected a persistence error");
        };
        assert!(!fault.surface().is_empty());
        assert!(fault.code.is_none());
    }
}
