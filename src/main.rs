use tracing::error;
use tracing_subscriber::EnvFilter;

use leadbridge::infrastructure::bootstrap;
use leadbridge::infrastructure::config::ServiceConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let config = match ServiceConfig::load() {
        Ok(config) => config,
        Err(err) => {
            error!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = bootstrap::run(config).await {
        error!("Server exited with an error: {}", err);
        std::process::exit(2);
    }
}
