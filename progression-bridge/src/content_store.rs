//! Durable Content Store
//!
//! Large content (portrait art, full metadata documents) never rides in an
//! update transaction; it goes to a content-addressed store and only the
//! returned reference URI is embedded on chain.

use async_trait::async_trait;

use crate::error::BridgeResult;

/// Blob store returning stable reference URIs
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store a blob; returns a stable, content-addressed URI
    async fn put(&self, data: &[u8], content_type: &str) -> BridgeResult<String>;
}
