//! Tracing/logging setup shared by embedders of the authorization core.

/// Initialize process-wide logging in the human-readable format.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber construction (filters, formats).
pub mod tracing;
