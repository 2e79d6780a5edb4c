#![forbid(unsafe_code)]

//! Zero-cost debug tracing controlled by environment variable.
//!
//! Set `MSGVIEW_DEBUG_TRACE=1` to print scheduler and sentinel diagnostics to
//! stderr. When disabled (the default) every call site is a single static bool
//! load.
//!
//! ```ignore
//! use msgview_runtime::debug_trace;
//! debug_trace!("frame coalesced: token={}", token);
//! ```

use std::sync::LazyLock;
use std::time::Instant;

/// Environment variable that enables [`debug_trace!`](crate::debug_trace!) output.
pub const DEBUG_TRACE_ENV: &str = "MSGVIEW_DEBUG_TRACE";

static DEBUG_TRACE_ENABLED: LazyLock<bool> = LazyLock::new(|| {
    std::env::var(DEBUG_TRACE_ENV)
        .ok()
        .and_then(|v| parse_flag(&v))
        .unwrap_or(false)
});

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Parse a boolean switch the way every `MSGVIEW_*` flag is parsed.
///
/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
/// Returns `None` for anything else.
#[must_use]
pub fn parse_flag(value: &str) -> Option<bool> {
    let value = value.trim();
    if ["1", "true", "yes", "on"]
        .iter()
        .any(|v| value.eq_ignore_ascii_case(v))
    {
        Some(true)
    } else if ["0", "false", "no", "off"]
        .iter()
        .any(|v| value.eq_ignore_ascii_case(v))
    {
        Some(false)
    } else {
        None
    }
}

/// Check if debug tracing is enabled.
#[inline]
pub fn is_enabled() -> bool {
    *DEBUG_TRACE_ENABLED
}

/// Milliseconds since the first trace call.
#[inline]
pub fn elapsed_ms() -> u64 {
    START_TIME.elapsed().as_millis() as u64
}

/// Conditionally print a timestamped trace line to stderr.
#[macro_export]
macro_rules! debug_trace {
    ($($arg:tt)*) => {
        if $crate::debug_trace::is_enabled() {
            eprintln!(
                "[MSGVIEW {:>8}ms] {}",
                $crate::debug_trace::elapsed_ms(),
                format_args!($($arg)*)
            );
        }
    };
}
