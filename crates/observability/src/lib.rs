//! Process-wide tracing setup shared by the binaries.

mod tracing;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Initialize JSON logging filtered by `RUST_LOG` (default [`DEFAULT_FILTER`]).
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    init_with(DEFAULT_FILTER);
}

/// Like [`init`], with an explicit fallback filter directive.
pub fn init_with(default_filter: &str) {
    tracing::install(tracing::filter(default_filter));
}
