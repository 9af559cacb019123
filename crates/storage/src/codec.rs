//! Payload codec: JSON serialization with transparent gzip compression.
//!
//! Payloads whose serialized form exceeds [`COMPRESSION_THRESHOLD`] are
//! compressed and flagged; decode branches on the stored flag. A malformed
//! blob is a [`InsightError::CorruptRecord`] for that row only — callers
//! decide whether to skip or surface it.

use std::io::{Read as _, Write as _};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde_json::Value;

use crate::error::{InsightError, Result};

/// Serialized payloads larger than this many bytes are gzip-compressed.
pub const COMPRESSION_THRESHOLD: usize = 1024;

/// Encode a payload to its stored form. Returns the bytes and whether
/// they were compressed.
pub fn encode_payload(payload: &Value) -> Result<(Vec<u8>, bool)> {
    let raw = serde_json::to_vec(payload)?;

    if raw.len() > COMPRESSION_THRESHOLD {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&raw)
            .and_then(|()| encoder.finish())
            .map(|compressed| (compressed, true))
            .map_err(|e| InsightError::Database(format!("payload compression: {e}")))
    } else {
        Ok((raw, false))
    }
}

/// Decode a stored payload, decompressing first when flagged.
pub fn decode_payload(data: &[u8], compressed: bool, id: &str) -> Result<Value> {
    let corrupt = |reason: String| InsightError::CorruptRecord {
        id: id.to_owned(),
        reason,
    };

    if compressed {
        let mut decoder = GzDecoder::new(data);
        let mut raw = Vec::new();
        decoder
            .read_to_end(&mut raw)
            .map_err(|e| corrupt(format!("gzip decompression failed: {e}")))?;
        serde_json::from_slice(&raw).map_err(|e| corrupt(format!("payload JSON invalid: {e}")))
    } else {
        serde_json::from_slice(data).map_err(|e| corrupt(format!("payload JSON invalid: {e}")))
    }
}
