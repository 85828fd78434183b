//! Logging for the ledger crates and their tests.

/// Log with the `RUST_LOG` filter, `info` when unset or unparsable.
/// Every call after the first does nothing.
pub fn init() {
    tracing::init(None);
}

/// Log with `directive` instead of `RUST_LOG`.
pub fn init_with_filter(directive: &str) {
    tracing::init(Some(directive));
}

pub mod tracing;
