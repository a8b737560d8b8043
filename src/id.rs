//! ID generation utilities for verimath
//!
//! Correlation ids tie together every stage of one pipeline run.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a request correlation ID
///
/// Format: `req-{timestamp_ms}-{random_hex}`
/// Example: `req-1738300800123-a1b2c3d4`
pub fn generate_request_id() -> String {
    let timestamp = now_ms();
    let random: u32 = rand::rng().random();
    format!("req-{}-{:08x}", timestamp, random)
}

/// Milliseconds elapsed since `start`, as a float
pub fn elapsed_ms(start: std::time::Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
