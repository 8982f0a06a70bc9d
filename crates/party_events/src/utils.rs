//! Small helpers shared across crates.

/// Returns the current Unix timestamp in seconds.
///
/// A clock set before the Unix epoch yields `0` rather than panicking.
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
