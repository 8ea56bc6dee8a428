//! In-memory store backend
//!
//! Backs dev mode and tests. Members and lists live in dashmaps; grant
//! history is an ordered vector behind an async RwLock to preserve append
//! order.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::models::{DistributionList, GrantRecord, LinkTier, Member};
use crate::types::{GuildError, Result};

use super::{HistoryStore, ListStore, MemberStore};

/// In-memory implementation of all three store contracts
#[derive(Default)]
pub struct MemoryStore {
    members: DashMap<String, Member>,
    history: RwLock<Vec<GrantRecord>>,
    lists: DashMap<LinkTier, DistributionList>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemberStore for MemoryStore {
    async fn create(&self, member: &Member) -> Result<()> {
        if self.members.contains_key(&member.id) {
            return Err(GuildError::AlreadyExists(format!(
                "member {}",
                member.id
            )));
        }
        self.members.insert(member.id.clone(), member.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Member> {
        self.members
            .get(id)
            .map(|m| m.value().clone())
            .ok_or_else(|| GuildError::NotFound(format!("member {}", id)))
    }

    async fn update(&self, member: &Member) -> Result<()> {
        if !self.members.contains_key(&member.id) {
            return Err(GuildError::NotFound(format!("member {}", member.id)));
        }
        self.members.insert(member.id.clone(), member.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.members
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| GuildError::NotFound(format!("member {}", id)))
    }

    async fn list(&self) -> Result<Vec<Member>> {
        Ok(self.members.iter().map(|m| m.value().clone()).collect())
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn append(&self, record: &GrantRecord) -> Result<()> {
        self.history.write().await.push(record.clone());
        Ok(())
    }

    async fn list_by_member(&self, id: &str) -> Result<Vec<GrantRecord>> {
        Ok(self
            .history
            .read()
            .await
            .iter()
            .filter(|r| r.member_id == id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<GrantRecord>> {
        Ok(self.history.read().await.clone())
    }
}

#[async_trait]
impl ListStore for MemoryStore {
    async fn create(&self, list: &DistributionList) -> Result<()> {
        if self.lists.contains_key(&list.tier) {
            return Err(GuildError::AlreadyExists(format!(
                "distribution list {}",
                list.tier
            )));
        }
        self.lists.insert(list.tier, list.clone());
        Ok(())
    }

    async fn get(&self, tier: LinkTier) -> Result<DistributionList> {
        self.lists
            .get(&tier)
            .map(|l| l.value().clone())
            .ok_or_else(|| GuildError::NotFound(format!("distribution list {}", tier)))
    }

    async fn update(&self, list: &DistributionList) -> Result<()> {
        self.lists.insert(list.tier, list.clone());
        Ok(())
    }
}
