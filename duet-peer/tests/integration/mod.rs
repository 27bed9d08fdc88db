//! Integration tests for duet-peer.
//!
//! Tests are organized by functionality:
//! - `negotiation_tests` - offer/answer exchange between two sessions
//! - `chunking_tests` - large descriptions under duplication and reordering
//! - `lifecycle_tests` - leave, rejoin, cancellation and failures

pub mod chunking_tests;
pub mod lifecycle_tests;

use tracing::Level;

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}
