//! Tracing and logging (shared setup).

/// Initialize process-wide tracing with the default filter and JSON output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize with an explicit filter directive and output format.
pub fn init_with(filter: &str, json: bool) {
    tracing::init_with(filter, json);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
