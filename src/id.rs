//! ID generation utilities for babysitter
//!
//! Provides identifiers for sessions and for the scratch files the executor
//! writes before renaming them into place.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Generate a unique session ID
///
/// Format: `ses-{timestamp_ms}-{random_hex}`
/// Example: `ses-1738300800123-a1b2c3d4`
pub fn generate_session_id() -> String {
    let random: u32 = rand::rng().random();
    format!("ses-{}-{:08x}", now_ms(), random)
}

/// Generate the name of a scratch file that sits next to `file_name`
///
/// Format: `.{file_name}.{random_hex}.tmp`
pub fn scratch_file_name(file_name: &str) -> String {
    let random: u32 = rand::rng().random();
    format!(".{}.{:08x}.tmp", file_name, random)
}
