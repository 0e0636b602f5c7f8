use tokio::fs;
use std::sync::OnceLock;
use tracing::info;
use crate::models::config_model::ServerConfig;
use tokio::net::TcpListener;

static CONFIG_CACHE: OnceLock<ServerConfig> = OnceLock::new();

const DEFAULT_CONFIG_PATH: &str = "telemetry.json";
const CONFIG_PATH_ENV: &str = "TELEMETRY_CONFIG";

pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

pub async fn init_config_and_bind() -> Result<TcpListener, String> {
    let file_path = config_path();

    let data = fs::read_to_string(&file_path)
        .await
        .map_err(|e| format!("File read Error: {e} {file_path}"))?;

    let mut config: ServerConfig = serde_json::from_str(&data)
        .map_err(|e| format!("JSON Parse Error: {e}"))?;

    let bind_addr = format!(
        "{}:{}",
        config.connection.ip,
        config.connection.port
    );

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("Bind failed: {e}"))?;

    let actual_port = listener
        .local_addr()
        .map_err(|e| format!("Addr error: {e}"))?
        .port();

    // Port 0 asks the OS for a free port; report the real one
    config.connection.port = actual_port;

    CONFIG_CACHE
        .set(config)
        .map_err(|_| "Config already initialized".to_string())?;

    info!("Config initialized from {} with port: {}", file_path, actual_port);

    Ok(listener)
}

/// `None` until `init_config_and_bind` has succeeded.
pub fn get_cached_config() -> Option<&'static ServerConfig> {
    CONFIG_CACHE.get()
}
