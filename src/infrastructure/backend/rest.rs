// ============================================================
// HOSTED PLATFORM BACKEND (REST)
// ============================================================
// Talks to the data platform's REST surface: tables, RPC
// functions and the auth user endpoint. Row-level security
// applies because every call carries the caller's own token.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{CustomerStore, IdentityResolver, TenantDirectory};
use crate::domain::error::{AppError, Result, StoreFault};
use crate::domain::import::{ImportTarget, PersistMode};
use crate::domain::record::{Identity, LeadRecord, TenantInfo, TenantOptions, TenantProvision};
use crate::infrastructure::config::BackendConfig;

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct ProfileRow {
    client_id: Option<Uuid>,
}

#[derive(Deserialize)]
struct ClientRow {
    id: Uuid,
    client_name: Option<String>,
    google_sheet_id: Option<String>,
}

pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: String,
        identity: &Identity,
    ) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&identity.access_token)
    }

    /// Call the workspace RPC. Returns `None` when the platform reports no
    /// workspace for the caller (and none was requested to be created).
    async fn rpc_ensure(&self, identity: &Identity, args: Value) -> Result<Option<Uuid>> {
        let url = format!("{}/rest/v1/rpc/ensure_user_client", self.base_url);
        let response = self
            .request(reqwest::Method::POST, url, identity)
            .json(&args)
            .send()
            .await
            .map_err(request_failed)?;

        if !response.status().is_success() {
            return Err(store_error(response).await);
        }

        let id: Option<String> = response.json().await.map_err(|e| {
            AppError::Persistence(StoreFault::from_message(format!(
                "Failed to parse JSON: {}",
                e
            )))
        })?;
        match id {
            None => Ok(None),
            Some(raw) => Uuid::parse_str(&raw).map(Some).map_err(|_| {
                AppError::Persistence(StoreFault::from_message(
                    "workspace RPC returned a malformed id",
                ))
            }),
        }
    }

    /// The caller's workspace id from their profile row, if any.
    async fn client_id_of(&self, identity: &Identity) -> Result<Option<Uuid>> {
        let url = format!(
            "{}/rest/v1/profiles?select=client_id&user_id=eq.{}&limit=1",
            self.base_url, identity.user_id
        );
        let response = self
            .request(reqwest::Method::GET, url, identity)
            .send()
            .await
            .map_err(request_failed)?;

        if !response.status().is_success() {
            return Err(store_error(response).await);
        }

        let rows: Vec<ProfileRow> = response.json().await.map_err(|e| {
            AppError::Persistence(StoreFault::from_message(format!(
                "Failed to parse JSON: {}",
                e
            )))
        })?;
        Ok(rows.into_iter().next().and_then(|row| row.client_id))
    }
}

#[async_trait]
impl CustomerStore for RestBackend {
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

        let mut url = format!("{}/rest/v1/{}", self.base_url, target.table);
        let prefer = match mode {
            PersistMode::Insert => "return=minimal,count=exact".to_string(),
            PersistMode::Upsert => {
                url.push_str(&format!("?on_conflict={},email", target.owner_column));
                "return=minimal,count=exact,resolution=merge-duplicates".to_string()
            }
        };

        let rows: Vec<Value> = records
            .iter()
            .map(|record| row_payload(identity, target, record))
            .collect();

        let response = self
            .request(reqwest::Method::POST, url, identity)
            .header("Prefer", prefer)
            .json(&rows)
            .send()
            .await
            .map_err(request_failed)?;

        if !response.status().is_success() {
            return Err(store_error(response).await);
        }

        // The platform reports the exact count in Content-Range; fall back
        // to the batch length when the header is missing or unparseable.
        let affected = response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_affected)
            .unwrap_or(records.len() as u64);
        Ok(affected)
    }
}

#[async_trait]
impl TenantDirectory for RestBackend {
    async fn ensure(
        &self,
        identity: &Identity,
        options: &TenantOptions,
    ) -> Result<TenantProvision> {
        // Look up first; only provision when the caller has no workspace.
        if let Some(existing) = self.rpc_ensure(identity, json!({})).await? {
            return Ok(TenantProvision {
                tenant_id: existing,
                created: false,
            });
        }

        let args = json!({
            "p_client_name": options.client_name,
            "p_google_sheet_id": options.sheet_id,
        });
        let created = self.rpc_ensure(identity, args).await?.ok_or_else(|| {
            AppError::Persistence(StoreFault::from_message(
                "workspace provisioning returned no id",
            ))
        })?;
        Ok(TenantProvision {
            tenant_id: created,
            created: true,
        })
    }

    async fn info(&self, identity: &Identity) -> Result<Option<TenantInfo>> {
        let Some(client_id) = self.client_id_of(identity).await? else {
            return Ok(None);
        };

        let url = format!(
            "{}/rest/v1/client_data?select=id,client_name,google_sheet_id&id=eq.{}&limit=1",
            self.base_url, client_id
        );
        let response = self
            .request(reqwest::Method::GET, url, identity)
            .send()
            .await
            .map_err(request_failed)?;

        if !response.status().is_success() {
            return Err(store_error(response).await);
        }

        let rows: Vec<ClientRow> = response.json().await.map_err(|e| {
            AppError::Persistence(StoreFault::from_message(format!(
                "Failed to parse JSON: {}",
                e
            )))
        })?;
        Ok(rows.into_iter().next().map(|row| TenantInfo {
            id: row.id,
            name: row.client_name,
            sheet_id: row.google_sheet_id.filter(|sheet| !sheet.is_empty()),
        }))
    }

    async fn bind_sheet(&self, identity: &Identity, sheet_id: &str) -> Result<()> {
        let client_id = self.client_id_of(identity).await?.ok_or_else(|| {
            AppError::Persistence(StoreFault::from_message(
                "no client workspace bound to this account",
            ))
        })?;

        let url = format!("{}/rest/v1/client_data?id=eq.{}", self.base_url, client_id);
        let response = self
            .request(reqwest::Method::PATCH, url, identity)
            .header("Prefer", "return=minimal")
            .json(&json!({ "google_sheet_id": sheet_id }))
            .send()
            .await
            .map_err(request_failed)?;

        if !response.status().is_success() {
            return Err(store_error(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityResolver for RestBackend {
    async fn resolve(&self, access_token: &str) -> Result<Identity> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Auth request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::AuthenticationRequired(format!(
                "token rejected ({})",
                response.status()
            )));
        }

        let user: AuthUser = response.json().await.map_err(|e| {
            AppError::AuthenticationRequired(format!("malformed user payload: {}", e))
        })?;
        let user_id = Uuid::parse_str(&user.id)
            .map_err(|_| AppError::AuthenticationRequired("malformed user id".to_string()))?;
        Ok(Identity {
            user_id,
            email: user.email,
            access_token: access_token.to_string(),
        })
    }
}

fn request_failed(err: reqwest::Error) -> AppError {
    AppError::Persistence(StoreFault::from_message(format!("Request failed: {}", err)))
}

/// DB row for one lead: snake_case platform columns plus the profile's
/// owner column carrying the caller's user id.
fn row_payload(identity: &Identity, target: &ImportTarget, record: &LeadRecord) -> Value {
    let mut row = Map::new();
    row.insert(target.owner_column.clone(), json!(identity.user_id));
    row.insert("first_name".to_string(), json!(record.first_name));
    row.insert("last_name".to_string(), json!(record.last_name));
    row.insert("email".to_string(), json!(record.email));
    row.insert("phone_no".to_string(), json!(record.phone_no));
    row.insert("source".to_string(), json!(record.source));
    row.insert("notes".to_string(), json!(record.notes));
    Value::Object(row)
}

/// Affected-row count from a Content-Range header such as `0-56/57` or `*/57`.
fn parse_affected(content_range: &str) -> Option<u64> {
    content_range.rsplit('/').next()?.trim().parse().ok()
}

async fn store_error(response: reqwest::Response) -> AppError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    AppError::Persistence(decode_fault(status, &text))
}

/// Decode a platform error body into its structured shape, falling back to
/// the raw text when the body is not the usual JSON object.
fn decode_fault(status: reqwest::StatusCode, text: &str) -> StoreFault {
    match serde_json::from_str::<StoreFault>(text) {
        Ok(fault)
            if fault.message.is_some()
                || fault.details.is_some()
                || fault.hint.is_some()
                || fault.code.is_some() =>
        {
            fault
        }
        _ => StoreFault::from_message(format!("API error ({}): {}", status, text)),
    }
}
