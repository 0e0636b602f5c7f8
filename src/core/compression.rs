// Transparent decompression of recording documents

use crate::core::constants::{GZIP_MAGIC, LZ4_MAGIC, ZSTD_MAGIC};
use crate::core::error::LoadError;
use flate2::read::GzDecoder;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Gzip,
    Lz4,
    Zstd,
}

impl CompressionType {
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(GZIP_MAGIC) {
            CompressionType::Gzip
        } else if data.starts_with(ZSTD_MAGIC) {
            CompressionType::Zstd
        } else if data.starts_with(LZ4_MAGIC) {
            CompressionType::Lz4
        } else {
            CompressionType::None
        }
    }
}

/// Plain JSON passes through untouched.
pub fn decompress(data: Vec<u8>) -> Result<Vec<u8>, LoadError> {
    match CompressionType::detect(&data) {
        CompressionType::None => Ok(data),

        CompressionType::Gzip => {
            let mut decoder = GzDecoder::new(data.as_slice());
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| LoadError::DecompressionFailed(format!("Gzip: {}", e)))?;
            Ok(decompressed)
        }

        #[cfg(feature = "lz4")]
        CompressionType::Lz4 => {
            let mut decoder = lz4::Decoder::new(data.as_slice())
                .map_err(|e| LoadError::DecompressionFailed(format!("LZ4: {}", e)))?;
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| LoadError::DecompressionFailed(format!("LZ4: {}", e)))?;
            Ok(decompressed)
        }

        #[cfg(not(feature = "lz4"))]
        CompressionType::Lz4 => Err(LoadError::DecompressionFailed(
            "LZ4 support not compiled in".to_string(),
        )),

        #[cfg(feature = "zstd")]
        CompressionType::Zstd => zstd::decode_all(data.as_slice())
            .map_err(|e| LoadError::DecompressionFailed(format!("Zstd: {}", e))),

        #[cfg(not(feature = "zstd"))]
        CompressionType::Zstd => Err(LoadError::DecompressionFailed(
            "Zstd support not compiled in".to_string(),
        )),
    }
}
