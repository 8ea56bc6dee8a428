//! Sled-backed store backend
//!
//! One tree per aggregate: members keyed by member id, grant history keyed
//! by record id, lists keyed by tier. Values are MessagePack-encoded.

use async_trait::async_trait;
use sled::{Db, Tree};
use std::path::Path;
use tracing::info;

use crate::models::{DistributionList, GrantRecord, LinkTier, Member};
use crate::types::{GuildError, Result};

use super::{HistoryStore, ListStore, MemberStore};

/// Persistent implementation of all three store contracts
pub struct SledStore {
    #[allow(dead_code)]
    db: Db,
    members: Tree,
    history: Tree,
    lists: Tree,
}

impl SledStore {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref())?;
        let members = db.open_tree("members")?;
        let history = db.open_tree("history")?;
        let lists = db.open_tree("lists")?;

        info!(path = %path.as_ref().display(), "Opened guild store");

        Ok(Self {
            db,
            members,
            history,
            lists,
        })
    }

    fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(value)?)
    }

    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[async_trait]
impl MemberStore for SledStore {
    async fn create(&self, member: &Member) -> Result<()> {
        if self.members.contains_key(member.id.as_bytes())? {
            return Err(GuildError::AlreadyExists(format!(
                "member {}",
                member.id
            )));
        }
        self.members
            .insert(member.id.as_bytes(), Self::encode(member)?)?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Member> {
        match self.members.get(id.as_bytes())? {
            Some(bytes) => Self::decode(&bytes),
            None => Err(GuildError::NotFound(format!("member {}", id))),
        }
    }

    async fn update(&self, member: &Member) -> Result<()> {
        if !self.members.contains_key(member.id.as_bytes())? {
            return Err(GuildError::NotFound(format!("member {}", member.id)));
        }
        self.members
            .insert(member.id.as_bytes(), Self::encode(member)?)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.members.remove(id.as_bytes())?.is_none() {
            return Err(GuildError::NotFound(format!("member {}", id)));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Member>> {
        let mut members = Vec::new();
        for item in self.members.iter() {
            let (_, value) = item?;
            members.push(Self::decode(&value)?);
        }
        Ok(members)
    }
}

#[async_trait]
impl HistoryStore for SledStore {
    async fn append(&self, record: &GrantRecord) -> Result<()> {
        self.history
            .insert(record.record_id.as_bytes(), Self::encode(record)?)?;
        Ok(())
    }

    async fn list_by_member(&self, id: &str) -> Result<Vec<GrantRecord>> {
        let mut records: Vec<GrantRecord> = Vec::new();
        for item in self.history.iter() {
            let (_, value) = item?;
            let record: GrantRecord = Self::decode(&value)?;
            if record.member_id == id {
                records.push(record);
            }
        }
        records.sort_by_key(|r| r.granted_at);
        Ok(records)
    }

    async fn list_all(&self) -> Result<Vec<GrantRecord>> {
        let mut records: Vec<GrantRecord> = Vec::new();
        for item in self.history.iter() {
            let (_, value) = item?;
            records.push(Self::decode(&value)?);
        }
        records.sort_by_key(|r| r.granted_at);
        Ok(records)
    }
}

#[async_trait]
impl ListStore for SledStore {
    async fn create(&self, list: &DistributionList) -> Result<()> {
        if self.lists.contains_key(list.tier.as_str().as_bytes())? {
            return Err(GuildError::AlreadyExists(format!(
                "distribution list {}",
                list.tier
            )));
        }
        self.lists
            .insert(list.tier.as_str().as_bytes(), Self::encode(list)?)?;
        Ok(())
    }

    async fn get(&self, tier: LinkTier) -> Result<DistributionList> {
        match self.lists.get(tier.as_str().as_bytes())? {
            Some(bytes) => Self::decode(&bytes),
            None => Err(GuildError::NotFound(format!("distribution list {}", tier))),
        }
    }

    async fn update(&self, list: &DistributionList) -> Result<()> {
        self.lists
            .insert(list.tier.as_str().as_bytes(), Self::encode(list)?)?;
        Ok(())
    }
}
