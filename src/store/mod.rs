//! Persistence contracts and backends
//!
//! Three narrow store traits keep the engine independent of the backend:
//! member records, append-only grant history, and per-tier list state.
//! `MemoryStore` backs dev mode and tests; `SledStore` is the production
//! backend.

use async_trait::async_trait;

use crate::models::{DistributionList, GrantRecord, LinkTier, Member};
use crate::types::Result;

pub mod disk;
pub mod memory;

pub use disk::SledStore;
pub use memory::MemoryStore;

/// Member record persistence. `get` reflects the most recent successful
/// `update` on the same store instance.
#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn create(&self, member: &Member) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Member>;
    async fn update(&self, member: &Member) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn list(&self) -> Result<Vec<Member>>;
}

/// Append-only grant history
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: &GrantRecord) -> Result<()>;
    async fn list_by_member(&self, id: &str) -> Result<Vec<GrantRecord>>;
    async fn list_all(&self) -> Result<Vec<GrantRecord>>;
}

/// Per-tier distribution list state
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Create a list; fails with `AlreadyExists` if the tier already has one
    async fn create(&self, list: &DistributionList) -> Result<()>;
    async fn get(&self, tier: LinkTier) -> Result<DistributionList>;
    async fn update(&self, list: &DistributionList) -> Result<()>;
}
