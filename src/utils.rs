//! Small helpers for decoding, log previews and the output directory.

use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Decode bytes as UTF-8, dropping any invalid sequence.
///
/// Invalid bytes disappear rather than becoming U+FFFD, so a page with a few
/// stray bytes decodes to the same text as a clean one.
pub fn decode_utf8_ignoring_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

/// Truncate a string for logging purposes.
///
/// Strings longer than `max` characters are cut at a character boundary and
/// suffixed with `"…(+N bytes)"`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Create the data directory if needed and check that files can be created
/// in it.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe = path.join(".nfplus_write_probe");
    fs::write(&probe, b"").await?;
    if let Err(e) = fs::remove_file(&probe).await {
        warn!(error = %e, "Could not remove write probe");
    }
    info!("Data directory is writable");
    Ok(())
}
