// perf.rs - Pass timing instrumentation for the N3 language server
//
// Controlled via the N3_LSP_PERF environment variable.
//
// Usage:
//   N3_LSP_PERF=1 n3-lsp --stdio       # Log the duration of every analysis pass
//   N3_LSP_PERF=verbose n3-lsp --stdio # Also warn when a pass exceeds its threshold

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Global flag indicating whether performance timing is enabled
static PERF_ENABLED: OnceLock<bool> = OnceLock::new();

/// Global flag indicating verbose mode (includes threshold warnings)
static PERF_VERBOSE: OnceLock<bool> = OnceLock::new();

/// Number of completed analysis passes since startup
static PASSES_COMPLETED: AtomicU64 = AtomicU64::new(0);

fn flag_enabled(value: &str) -> bool {
    !value.is_empty() && value != "0" && value.to_lowercase() != "false"
}

/// Check if performance timing is enabled
pub fn is_enabled() -> bool {
    *PERF_ENABLED.get_or_init(|| {
        std::env::var("N3_LSP_PERF")
            .map(|v| flag_enabled(&v))
            .unwrap_or(false)
    })
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    *PERF_VERBOSE.get_or_init(|| {
        std::env::var("N3_LSP_PERF")
            .map(|v| v.to_lowercase() == "verbose")
            .unwrap_or(false)
    })
}

/// Record a completed analysis pass and return the running total.
pub fn record_pass() -> u64 {
    PASSES_COMPLETED.fetch_add(1, Ordering::Relaxed) + 1
}

/// RAII timing guard that logs duration on drop
///
/// ```
/// use n3_lsp::perf::TimingGuard;
///
/// let _guard = TimingGuard::with_threshold("analysis pass", 50);
/// // ... do work ...
/// ```
pub struct TimingGuard {
    start: Instant,
    name: &'static str,
    threshold_warn_ms: Option<u64>,
    enabled: bool,
}

impl TimingGuard {
    /// Create a new timing guard with the given name
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
            threshold_warn_ms: None,
            enabled: is_enabled(),
        }
    }

    /// Create a timing guard that warns (in verbose mode) past `threshold_ms`.
    pub fn with_threshold(name: &'static str, threshold_ms: u64) -> Self {
        Self {
            threshold_warn_ms: Some(threshold_ms),
            ..Self::new(name)
        }
    }

    /// Get the elapsed time without consuming the guard
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }

        let elapsed = self.start.elapsed();
        log::info!("[PERF] {} completed in {:?}", self.name, elapsed);

        if let Some(threshold) = self.threshold_warn_ms {
            if elapsed.as_millis() > threshold as u128 && is_verbose() {
                log::warn!(
                    "[PERF] {} exceeded threshold ({}ms > {}ms)",
                    self.name,
                    elapsed.as_millis(),
                    threshold
                );
            }
        }
    }
}
