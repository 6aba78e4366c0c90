use crate::application::use_cases::import_csv::CsvImportUseCase;
use crate::application::use_cases::process_record::ProcessRecordUseCase;
use crate::application::use_cases::sheet_preview::SheetPreviewUseCase;
use crate::domain::error::{AppError, Result};
use crate::domain::import::{ImportProfile, PersistMode};
use crate::domain::record::{Identity, LeadRecord};
use crate::infrastructure::backend::{IdentityResolver, TenantDirectory};
use crate::infrastructure::csv::decode_upload;
use crate::infrastructure::sheets::is_valid_sheet_id;
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{
    dev::Server, get, post, put, web, App, HttpRequest, HttpResponse, HttpServer, Responder, Scope,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

/// Shared handler state: the wired use cases plus the delegates the tenant
/// routes talk to directly, and the activity ring served under `/api/logs`.
pub struct AppState {
    pub import_use_case: CsvImportUseCase,
    pub sheet_preview_use_case: SheetPreviewUseCase,
    pub process_record_use_case: ProcessRecordUseCase,
    pub identity_resolver: Arc<dyn IdentityResolver + Send + Sync>,
    pub tenants: Arc<dyn TenantDirectory + Send + Sync>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Deserialize)]
struct ImportQuery {
    mode: Option<PersistMode>,
}

#[derive(Deserialize)]
struct PreviewQuery {
    sheet_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BindSheetRequest {
    sheet_id: String,
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Every data route goes through here before touching its payload.
async fn authenticate(data: &AppState, req: &HttpRequest) -> Result<Identity> {
    let token = bearer_token(req)
        .ok_or_else(|| AppError::AuthenticationRequired("missing bearer token".to_string()))?;
    data.identity_resolver.resolve(token).await
}

/// Map the error taxonomy onto HTTP statuses: auth to 401, rejected input to
/// 400, upstream platform trouble to 502, the rest to 500.
fn error_response(err: &AppError) -> HttpResponse {
    let body = json!({ "error": err.kind(), "message": err.to_string() });
    match err {
        AppError::AuthenticationRequired(_) => HttpResponse::Unauthorized().json(body),
        AppError::InvalidFileType(_) | AppError::NoData(_) | AppError::NoValidRows(_) => {
            HttpResponse::BadRequest().json(body)
        }
        AppError::Persistence(_) | AppError::SheetFetch(_) => HttpResponse::BadGateway().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

fn header_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn run_import(
    data: &AppState,
    req: &HttpRequest,
    body: &[u8],
    profile: ImportProfile,
) -> HttpResponse {
    let identity = match authenticate(data, req).await {
        Ok(identity) => identity,
        Err(err) => {
            add_log(
                &data.logs,
                "WARN",
                "Import",
                &format!("Rejected import: {}", err),
            );
            return error_response(&err);
        }
    };

    let file_name = header_value(req, "x-file-name");
    let media_type = header_value(req, "content-type");
    if let Err(err) = CsvImportUseCase::check_upload(file_name.as_deref(), media_type.as_deref()) {
        add_log(
            &data.logs,
            "WARN",
            "Import",
            &format!("Rejected upload: {}", err),
        );
        return error_response(&err);
    }

    add_log(
        &data.logs,
        "INFO",
        "Import",
        &format!(
            "Importing {} bytes (profile={} user={})",
            body.len(),
            profile.name,
            identity.user_id
        ),
    );

    let text = decode_upload(body);
    match data.import_use_case.execute(&identity, &profile, &text).await {
        Ok(outcome) => {
            add_log(
                &data.logs,
                "INFO",
                "Import",
                &format!(
                    "Imported {} records, {} skipped",
                    outcome.imported,
                    outcome.skipped.len()
                ),
            );
            HttpResponse::Ok().json(outcome)
        }
        Err(err) => {
            add_log(
                &data.logs,
                "ERROR",
                "Import",
                &format!("Import failed: {}", err),
            );
            error_response(&err)
        }
    }
}

#[post("/imports")]
async fn import_customers(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ImportQuery>,
    body: web::Bytes,
) -> impl Responder {
    let mut profile = ImportProfile::strict_tenant();
    if let Some(mode) = query.mode {
        profile = profile.with_mode(mode);
    }
    run_import(&data, &req, &body, profile).await
}

#[post("/imports/quick")]
async fn quick_import(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> impl Responder {
    run_import(&data, &req, &body, ImportProfile::permissive()).await
}

#[get("/sheet/preview")]
async fn sheet_preview(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PreviewQuery>,
) -> impl Responder {
    let identity = match authenticate(&data, &req).await {
        Ok(identity) => identity,
        Err(err) => return error_response(&err),
    };

    match data
        .sheet_preview_use_case
        .execute(&identity, query.sheet_id.as_deref())
        .await
    {
        Ok(records) => {
            add_log(
                &data.logs,
                "INFO",
                "Sheets",
                &format!("Previewed {} sheet rows", records.len()),
            );
            HttpResponse::Ok().json(records)
        }
        Err(err) => {
            add_log(
                &data.logs,
                "ERROR",
                "Sheets",
                &format!("Sheet preview failed: {}", err),
            );
            error_response(&err)
        }
    }
}

#[post("/customers/process")]
async fn process_customer(
    data: web::Data<AppState>,
    req: HttpRequest,
    record: web::Json<LeadRecord>,
) -> impl Responder {
    if let Err(err) = authenticate(&data, &req).await {
        return error_response(&err);
    }

    let receipt = data.process_record_use_case.execute(&record).await;
    if !receipt.success {
        add_log(
            &data.logs,
            "WARN",
            "Webhook",
            &format!(
                "Forwarding {} failed: {}",
                record.email,
                receipt.message.as_deref().unwrap_or("unknown error")
            ),
        );
    }
    // Webhook failures stay inside the receipt; the request itself succeeded.
    HttpResponse::Ok().json(receipt)
}

#[get("/tenant")]
async fn tenant_info(data: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let identity = match authenticate(&data, &req).await {
        Ok(identity) => identity,
        Err(err) => return error_response(&err),
    };

    match data.tenants.info(&identity).await {
        Ok(info) => HttpResponse::Ok().json(info),
        Err(err) => {
            add_log(
                &data.logs,
                "ERROR",
                "Tenant",
                &format!("Workspace lookup failed: {}", err),
            );
            error_response(&err)
        }
    }
}

#[put("/tenant/sheet")]
async fn bind_tenant_sheet(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<BindSheetRequest>,
) -> impl Responder {
    let identity = match authenticate(&data, &req).await {
        Ok(identity) => identity,
        Err(err) => return error_response(&err),
    };

    if !is_valid_sheet_id(&body.sheet_id) {
        return HttpResponse::BadRequest().json(json!({
            "error": "invalid_sheet_id",
            "message": "spreadsheet ids may only contain letters, digits, '-' and '_'",
        }));
    }

    match data.tenants.bind_sheet(&identity, &body.sheet_id).await {
        Ok(()) => {
            add_log(
                &data.logs,
                "INFO",
                "Tenant",
                &format!("Bound spreadsheet {}", body.sheet_id),
            );
            HttpResponse::NoContent().finish()
        }
        Err(err) => {
            add_log(
                &data.logs,
                "ERROR",
                "Tenant",
                &format!("Sheet binding failed: {}", err),
            );
            error_response(&err)
        }
    }
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[get("/logs")]
async fn get_logs(data: web::Data<AppState>) -> impl Responder {
    let logs = data.logs.lock().unwrap();
    HttpResponse::Ok().json(&*logs)
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap();
    logs.push(entry.clone());
    if logs.len() > 100 {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

fn api_scope() -> Scope {
    web::scope("/api")
        .service(import_customers)
        .service(quick_import)
        .service(sheet_preview)
        .service(process_customer)
        .service(tenant_info)
        .service(bind_tenant_sheet)
        .service(health)
        .service(get_logs)
}

pub fn start_server(state: Arc<AppState>, host: &str, port: u16) -> std::io::Result<Server> {
    let data = web::Data::from(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Allow all origins for the dashboard dev servers

        App::new()
            .wrap(cors)
            .app_data(data.clone())
            .service(api_scope())
    })
    .bind((host, port))?
    .run();

    Ok(server)
}
