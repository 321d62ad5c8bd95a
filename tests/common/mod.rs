//! Common test utilities, fixtures, and mocks
//! This module contains shared functionality used across different test categories

pub mod fixtures;

/// Let spawned tasks (auto-advance loops, disconnect watchers) run until they are blocked again.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
