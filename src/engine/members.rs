//! Member directory
//!
//! Member CRUD, participation marking, and promotion. Mutations of the
//! same member id are serialized behind a per-member lock so concurrent
//! read-modify-write sequences cannot lose updates; different members are
//! independent.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::models::{GrantRecord, LinkTier, Member, Rank};
use crate::rules::{self, EligibilityRules};
use crate::store::{HistoryStore, MemberStore};
use crate::types::{GuildError, Result};

use super::{Clock, SystemClock};

/// Detailed member status for display: the record plus derived flags and
/// grant-history aggregates
#[derive(Debug, Clone, Serialize)]
pub struct MemberStatus {
    pub member: Member,
    pub days_in_guild: i64,
    pub rank: Rank,
    pub silver_eligible: bool,
    pub gold_eligible: bool,
    pub is_active: bool,
    pub total_silver_links: usize,
    pub total_gold_links: usize,
    pub compensation_links: usize,
    pub last_silver_link: Option<GrantRecord>,
    pub last_gold_link: Option<GrantRecord>,
}

/// Member directory service
pub struct MemberDirectory {
    store: Arc<dyn MemberStore>,
    history: Arc<dyn HistoryStore>,
    rules: EligibilityRules,
    clock: Arc<dyn Clock>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MemberDirectory {
    pub fn new(
        store: Arc<dyn MemberStore>,
        history: Arc<dyn HistoryStore>,
        rules: EligibilityRules,
    ) -> Self {
        Self::with_clock(store, history, rules, Arc::new(SystemClock))
    }

    /// Construct with an explicit clock (tests)
    pub fn with_clock(
        store: Arc<dyn MemberStore>,
        history: Arc<dyn HistoryStore>,
        rules: EligibilityRules,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            history,
            rules,
            clock,
            locks: DashMap::new(),
        }
    }

    /// Per-member mutation lock
    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Create a new member. Rejects duplicate ids.
    pub async fn create_member(
        &self,
        id: &str,
        display_name: &str,
        join_date: DateTime<Utc>,
    ) -> Result<Member> {
        match self.store.get(id).await {
            Ok(_) => {
                return Err(GuildError::AlreadyExists(format!("member {}", id)));
            }
            Err(GuildError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let member = Member::new(id, display_name, join_date, self.clock.now());
        self.store.create(&member).await?;
        info!(member = %id, "Created member");
        Ok(member)
    }

    pub async fn get_member(&self, id: &str) -> Result<Member> {
        self.store.get(id).await
    }

    pub async fn list_members(&self) -> Result<Vec<Member>> {
        self.store.list().await
    }

    /// Administrative escape hatch; members are not deleted in normal
    /// operation.
    pub async fn delete_member(&self, id: &str) -> Result<()> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        self.store.delete(id).await?;
        info!(member = %id, "Deleted member");
        Ok(())
    }

    /// Mark attendance for a recurring event. Participation records the
    /// date and clears the absence counter; a miss increments it.
    pub async fn mark_event_participation(
        &self,
        id: &str,
        participated: bool,
        event_date: DateTime<Utc>,
    ) -> Result<Member> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut member = self.store.get(id).await?;
        let now = self.clock.now();
        if participated {
            member.record_participation(event_date, now);
        } else {
            member.record_absence(now);
        }
        self.store.update(&member).await?;

        info!(
            member = %id,
            participated,
            absences = member.absence_count,
            "Marked event participation"
        );
        Ok(member)
    }

    /// Set the recurring-participation flag for one member
    pub async fn set_recurring_participation(&self, id: &str, flag: bool) -> Result<Member> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut member = self.store.get(id).await?;
        member.recurring_participation = flag;
        member.updated_at = self.clock.now();
        self.store.update(&member).await?;
        Ok(member)
    }

    /// Clear the recurring-participation flag for every member (weekly
    /// rollover)
    pub async fn reset_recurring_participation(&self) -> Result<usize> {
        let members = self.store.list().await?;
        let now = self.clock.now();
        let count = members.len();

        for mut member in members {
            let lock = self.lock_for(&member.id);
            let _guard = lock.lock().await;
            member.recurring_participation = false;
            member.updated_at = now;
            self.store.update(&member).await?;
        }

        info!(count, "Reset recurring participation");
        Ok(count)
    }

    /// Promote a member to the administrative role
    pub async fn promote_officer(&self, id: &str) -> Result<Member> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut member = self.store.get(id).await?;
        member.promote(self.clock.now());
        self.store.update(&member).await?;
        info!(member = %id, "Promoted to officer");
        Ok(member)
    }

    /// Remove the administrative role
    pub async fn demote_officer(&self, id: &str) -> Result<Member> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut member = self.store.get(id).await?;
        member.demote(self.clock.now());
        self.store.update(&member).await?;
        info!(member = %id, "Demoted from officer");
        Ok(member)
    }

    /// Member record with freshly derived flags and history aggregates
    pub async fn member_status(&self, id: &str) -> Result<MemberStatus> {
        let member = self.store.get(id).await?;
        let history = self.history.list_by_member(id).await.unwrap_or_default();
        let now = self.clock.now();

        let last_of = |tier: LinkTier| {
            history
                .iter()
                .filter(|r| r.tier == tier)
                .max_by_key(|r| r.granted_at)
                .cloned()
        };

        Ok(MemberStatus {
            days_in_guild: member.days_in_guild(now),
            rank: rules::rank(&member, &self.rules, now),
            silver_eligible: rules::tier_eligibility(&member, LinkTier::Silver, &self.rules, now),
            gold_eligible: rules::tier_eligibility(&member, LinkTier::Gold, &self.rules, now),
            is_active: rules::is_active(&member, self.rules.max_absence),
            total_silver_links: history.iter().filter(|r| r.tier == LinkTier::Silver).count(),
            total_gold_links: history.iter().filter(|r| r.tier == LinkTier::Gold).count(),
            compensation_links: history.iter().filter(|r| r.is_compensation).count(),
            last_silver_link: last_of(LinkTier::Silver),
            last_gold_link: last_of(LinkTier::Gold),
            member,
        })
    }

    /// Grant history for a member
    pub async fn member_history(&self, id: &str) -> Result<Vec<GrantRecord>> {
        // Surface NotFound for unknown members instead of an empty list
        self.store.get(id).await?;
        self.history.list_by_member(id).await
    }

    /// The full grant log across all members
    pub async fn grant_log(&self) -> Result<Vec<GrantRecord>> {
        self.history.list_all().await
    }
}
