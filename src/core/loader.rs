// Resolves a recording source into a parsed document

use crate::core::compression::decompress;
use crate::core::error::LoadError;
use crate::core::format::RecordingDocument;
use crate::core::generator::{generate, GeneratorConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecordingSource {
    File { path: PathBuf },
    Url { url: String },
    Synthetic(GeneratorConfig),
}

impl RecordingSource {
    pub fn describe(&self) -> String {
        match self {
            RecordingSource::File { path } => format!("file:{}", path.display()),
            RecordingSource::Url { url } => url.clone(),
            RecordingSource::Synthetic(config) => format!(
                "synthetic:{}s x {} labels",
                config.seconds, config.label_count
            ),
        }
    }

    pub async fn fetch(&self, client: &reqwest::Client) -> Result<RecordingDocument, LoadError> {
        match self {
            RecordingSource::File { path } => {
                let bytes = tokio::fs::read(path).await?;
                debug!("Read {} bytes from {}", bytes.len(), path.display());
                parse_off_thread(bytes).await
            }

            RecordingSource::Url { url } => {
                let response = client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(LoadError::Status {
                        url: url.clone(),
                        status: status.as_u16(),
                    });
                }
                let bytes = response.bytes().await?;
                debug!("Fetched {} bytes from {}", bytes.len(), url);
                parse_off_thread(bytes.to_vec()).await
            }

            RecordingSource::Synthetic(config) => {
                let config = config.clone();
                tokio::task::spawn_blocking(move || generate(&config))
                    .await
                    .map_err(|e| LoadError::Io(format!("Generator task failed: {e}")))
            }
        }
    }
}

/// Decompresses if needed and parses the JSON document.
pub fn parse_document(bytes: Vec<u8>) -> Result<RecordingDocument, LoadError> {
    let raw = decompress(bytes)?;
    Ok(serde_json::from_slice(&raw)?)
}

async fn parse_off_thread(bytes: Vec<u8>) -> Result<RecordingDocument, LoadError> {
    tokio::task::spawn_blocking(move || parse_document(bytes))
        .await
        .map_err(|e| LoadError::Io(format!("Parse task failed: {e}")))?
}
