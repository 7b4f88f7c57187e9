use std::sync::Arc;

use sulama_asistani::inference::OpenAiClient;
use sulama_asistani::server::{self, state::AppState};
use sulama_asistani::types::config::ServerConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    if config.openai_api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY is not set, chat requests will fail");
    }
    if config.admin_key.is_empty() {
        tracing::warn!("ADMIN_KEY is not set, admin endpoints are disabled");
    }

    let client = OpenAiClient::new(&config.api_base_url, &config.openai_api_key)?;
    let state = AppState::new(config, Arc::new(client));

    server::serve(state).await?;
    Ok(())
}
