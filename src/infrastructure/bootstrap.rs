use std::sync::{Arc, Mutex};

use tracing::info;

use crate::application::use_cases::import_csv::CsvImportUseCase;
use crate::application::use_cases::process_record::ProcessRecordUseCase;
use crate::application::use_cases::sheet_preview::SheetPreviewUseCase;
use crate::domain::error::Result;
use crate::infrastructure::backend::postgres::PgBackend;
use crate::infrastructure::backend::rest::RestBackend;
use crate::infrastructure::backend::{CustomerStore, TenantDirectory};
use crate::infrastructure::config::{BackendDriver, ServiceConfig};
use crate::infrastructure::sheets::SheetFetcher;
use crate::infrastructure::webhook::WebhookNotifier;
use crate::interfaces::http::{add_log, start_server, AppState};

/// Wire the configured delegates and the use cases into the shared handler
/// state.
///
/// Identity resolution always goes through the platform's auth endpoint; the
/// storage driver only decides where customer rows and workspaces live.
pub async fn build_state(config: &ServiceConfig) -> Result<Arc<AppState>> {
    let rest = Arc::new(RestBackend::new(&config.backend));

    let (store, tenants): (
        Arc<dyn CustomerStore + Send + Sync>,
        Arc<dyn TenantDirectory + Send + Sync>,
    ) = match config.backend.driver {
        BackendDriver::Rest => (rest.clone(), rest.clone()),
        BackendDriver::Postgres => {
            // Presence is checked at config load; the driver never activates
            // without a connection string.
            let url = config.backend.database_url.as_deref().unwrap_or_default();
            let pg = Arc::new(PgBackend::connect(url).await?);
            (pg.clone(), pg)
        }
    };

    let notifier = Arc::new(WebhookNotifier::new(&config.webhook));
    let sheets = Arc::new(SheetFetcher::new(&config.sheets));

    Ok(Arc::new(AppState {
        import_use_case: CsvImportUseCase::new(store, tenants.clone(), notifier.clone()),
        sheet_preview_use_case: SheetPreviewUseCase::new(tenants.clone(), sheets),
        process_record_use_case: ProcessRecordUseCase::new(notifier),
        identity_resolver: rest,
        tenants,
        logs: Arc::new(Mutex::new(Vec::new())),
    }))
}

pub async fn run(config: ServiceConfig) -> Result<()> {
    let state = build_state(&config).await?;
    let logs = state.logs.clone();

    let server = start_server(state, &config.server.host, config.server.port)?;
    info!(
        "HTTP server listening on {}:{}",
        config.server.host, config.server.port
    );
    add_log(
        &logs,
        "INFO",
        "System",
        &format!(
            "Backend initialized and HTTP server started on :{}",
            config.server.port
        ),
    );

    server.await?;
    Ok(())
}
