//! Memory and timing probes for the experiment binaries.
//!
//! Peak memory is read from `/proc/self/status`, so it is only available on Linux. Each
//! measurement is meant to run in a fresh process: the high-water mark never decreases.

use std::time::{Duration, Instant};

/// Reads the peak resident set size (`VmHWM`) of the current process.
///
/// # Returns
/// The peak memory usage in kilobytes (KB), or 0 if the value cannot be read.
#[cfg(target_os = "linux")]
pub fn get_peak_rss_kb() -> u64 {
    let status_content = match std::fs::read_to_string("/proc/self/status") {
        Ok(content) => content,
        Err(_) => return 0,
    };
    parse_status_field(&status_content, "VmHWM:").unwrap_or(0)
}

/// A dummy implementation for non-Linux platforms to ensure the code compiles.
#[cfg(not(target_os = "linux"))]
pub fn get_peak_rss_kb() -> u64 {
    use std::sync::Once;
    static WARN_ONCE: Once = Once::new();
    WARN_ONCE.call_once(|| {
        log::warn!("Peak RSS measurement is only supported on Linux; returning 0.");
    });
    0
}

/// Extracts the numeric value of a `Key:   1234 kB` line.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_status_field(status: &str, key: &str) -> Option<u64> {
    status
        .lines()
        .find(|line| line.starts_with(key))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|value| value.parse().ok())
}

/// Runs `f` once and returns its result together with the elapsed wall-clock time.
pub fn timed<R>(f: impl FnOnce() -> R) -> (R, Duration) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}
