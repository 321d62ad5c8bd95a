//! Test suite for the Jukebox Discord bot
//! This module contains all test configurations and common utilities

pub mod common;
pub mod integration;

/// Common test setup and utilities
pub mod test_utils {
    use std::sync::Once;
    use tracing::Level;

    static INIT: Once = Once::new();

    /// Initialize test environment
    pub fn init() {
        INIT.call_once(|| {
            // Another harness may have installed a subscriber already
            let _ = tracing_subscriber::fmt()
                .with_max_level(Level::DEBUG)
                .with_test_writer()
                .try_init();
        });
    }
}
