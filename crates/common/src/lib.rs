use anyhow::Result;
use serde::Serialize;

/// NDJSON event skeleton shared across tools.
#[derive(Serialize, Debug)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "inlined")]
    Inlined {
        input: String,
        output: String,
        bytes: u64,
        hash: String,
    },
    #[serde(rename = "error")]
    Error {
        code: String,
        message: String,
        path_or_url: Option<String>,
    },
}

/// Write a single JSON object as a line (NDJSON). Flushes immediately.
pub fn write_ndjson<T: Serialize>(value: &T) -> Result<()> {
    use std::io::{self, Write};
    serde_json::to_writer(io::stdout(), value)?;
    io::stdout().write_all(b"\n")?;
    io::stdout().flush()?;
    Ok(())
}

/// Deterministic content hash (hex-encoded blake3).
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Heuristic binary detector (small sample, NUL byte check).
pub fn is_probably_binary(buf: &[u8]) -> bool {
    const N: usize = 1024;
    buf.iter().take(buf.len().min(N)).any(|&b| b == 0)
}
