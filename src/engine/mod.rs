//! Distribution engine
//!
//! Owns every transition on the per-tier distribution lists: refresh from
//! the member store, random winner selection with compensation-first
//! ordering, administrative force-complete, and cycle resets. All
//! read-modify-write sequences on a list are serialized behind that tier's
//! lock; mutations happen on a local copy and are persisted in one write,
//! so a store failure aborts with nothing committed.

pub mod members;
pub mod selection;

pub use members::{MemberDirectory, MemberStatus};
pub use selection::{Clock, SystemClock, ThreadRngPicker, WinnerPicker};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::models::{DistributionList, GrantRecord, LinkTier, Member};
use crate::rules::{self, EligibilityRules};
use crate::store::{HistoryStore, ListStore, MemberStore};
use crate::types::{GuildError, Result};

/// One mutex per tier; held for the duration of refresh/select/reset
struct TierLocks {
    silver: Mutex<()>,
    gold: Mutex<()>,
}

impl TierLocks {
    fn new() -> Self {
        Self {
            silver: Mutex::new(()),
            gold: Mutex::new(()),
        }
    }

    fn for_tier(&self, tier: LinkTier) -> &Mutex<()> {
        match tier {
            LinkTier::Silver => &self.silver,
            LinkTier::Gold => &self.gold,
        }
    }
}

/// Snapshot of a distribution list for display
#[derive(Debug, Clone, Serialize)]
pub struct ListStatus {
    pub tier: LinkTier,
    pub eligible_count: usize,
    pub completed_count: usize,
    pub inactive_count: usize,
    pub compensation_count: usize,
    pub completion_percentage: f64,
    pub cycle_start: DateTime<Utc>,
    pub last_reset: DateTime<Utc>,
    pub can_force_complete: bool,
    pub is_complete: bool,
}

impl ListStatus {
    fn from_list(list: &DistributionList) -> Self {
        Self {
            tier: list.tier,
            eligible_count: list.eligible.len(),
            completed_count: list.completed.len(),
            inactive_count: list.inactive.len(),
            compensation_count: list.compensation_queue.len(),
            completion_percentage: list.completion_percentage(),
            cycle_start: list.cycle_start,
            last_reset: list.last_reset,
            can_force_complete: list.can_force_complete(),
            is_complete: list.is_complete(),
        }
    }
}

/// Outcome of a successful winner selection
#[derive(Debug, Clone, Serialize)]
pub struct WinnerSelection {
    pub winner: Member,
    pub record: GrantRecord,
    pub is_compensation: bool,
    pub status: ListStatus,
}

/// The distribution engine
pub struct DistributionEngine {
    members: Arc<dyn MemberStore>,
    history: Arc<dyn HistoryStore>,
    lists: Arc<dyn ListStore>,
    rules: EligibilityRules,
    picker: Arc<dyn WinnerPicker>,
    clock: Arc<dyn Clock>,
    locks: TierLocks,
}

impl DistributionEngine {
    pub fn new(
        members: Arc<dyn MemberStore>,
        history: Arc<dyn HistoryStore>,
        lists: Arc<dyn ListStore>,
        rules: EligibilityRules,
    ) -> Self {
        Self::with_sources(
            members,
            history,
            lists,
            rules,
            Arc::new(ThreadRngPicker),
            Arc::new(SystemClock),
        )
    }

    /// Construct with explicit picker and clock (tests)
    pub fn with_sources(
        members: Arc<dyn MemberStore>,
        history: Arc<dyn HistoryStore>,
        lists: Arc<dyn ListStore>,
        rules: EligibilityRules,
        picker: Arc<dyn WinnerPicker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            members,
            history,
            lists,
            rules,
            picker,
            clock,
            locks: TierLocks::new(),
        }
    }

    pub fn rules(&self) -> &EligibilityRules {
        &self.rules
    }

    /// Create each tier's list if absent. Called once at bootstrap.
    pub async fn init_lists(&self) -> Result<()> {
        let now = self.clock.now();
        for tier in LinkTier::ALL {
            match self.lists.get(tier).await {
                Ok(_) => {}
                Err(GuildError::NotFound(_)) => {
                    let list = DistributionList::new(tier, self.rules.max_absence, now);
                    self.lists.create(&list).await?;
                    info!(tier = %tier, "Created distribution list");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Rebuild a tier's eligible set from the current member snapshot.
    ///
    /// Completed/inactive status persists across refreshes within a cycle;
    /// members who became eligible mid-cycle join immediately.
    pub async fn refresh_list(&self, tier: LinkTier) -> Result<ListStatus> {
        let _guard = self.locks.for_tier(tier).lock().await;

        let mut list = self.lists.get(tier).await?;
        let members = self.members.list().await?;
        let now = self.clock.now();

        list.eligible.clear();
        for member in &members {
            if !rules::tier_eligibility(member, tier, &self.rules, now) {
                continue;
            }
            if list.completed.iter().any(|m| *m == member.id)
                || list.inactive.iter().any(|m| *m == member.id)
            {
                continue;
            }
            list.add_eligible(&member.id);
        }

        for member in &members {
            if !rules::is_active(member, list.max_absence)
                && list.eligible.iter().any(|m| *m == member.id)
            {
                list.mark_inactive(&member.id);
            }
        }

        list.updated_at = now;
        self.lists.update(&list).await?;

        info!(
            tier = %tier,
            eligible = list.eligible.len(),
            inactive = list.inactive.len(),
            "Refreshed distribution list"
        );

        Ok(ListStatus::from_list(&list))
    }

    /// Select a winner for a tier.
    ///
    /// A non-empty compensation queue always wins over the eligible set:
    /// the oldest queued member receives a compensation grant and the
    /// eligible set is left untouched. Otherwise one eligible member is
    /// picked uniformly at random, marked completed, and the list
    /// auto-resets when that empties the cycle.
    pub async fn select_winner(&self, tier: LinkTier) -> Result<WinnerSelection> {
        let _guard = self.locks.for_tier(tier).lock().await;

        let mut list = self.lists.get(tier).await?;
        let now = self.clock.now();

        if let Some(winner_id) = list.dequeue_compensation() {
            return self.grant_compensation(list, &winner_id, now).await;
        }

        if list.eligible.is_empty() {
            return Err(GuildError::PreconditionFailed(format!(
                "no eligible recipients for {} links",
                tier
            )));
        }

        let index = self.picker.pick(list.eligible.len());
        let winner_id = list.eligible[index].clone();
        let winner = self.members.get(&winner_id).await?;

        let record = GrantRecord::new(
            winner.id.as_str(),
            winner.display_name.as_str(),
            tier,
            now,
            false,
            "",
            now,
        );
        self.history.append(&record).await?;

        list.mark_completed(&winner_id);

        let mut cycle_reset = false;
        if list.is_complete() {
            list.reset(now);
            cycle_reset = true;
        }

        list.updated_at = now;
        self.lists.update(&list).await?;

        info!(
            tier = %tier,
            winner = %winner_id,
            cycle_reset,
            "Granted link"
        );

        Ok(WinnerSelection {
            status: ListStatus::from_list(&list),
            winner,
            record,
            is_compensation: false,
        })
    }

    /// Resolve the head of the compensation queue. Caller holds the tier
    /// lock and has already dequeued the winner.
    async fn grant_compensation(
        &self,
        mut list: DistributionList,
        winner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<WinnerSelection> {
        let mut winner = self.members.get(winner_id).await?;

        let record = GrantRecord::new(
            winner.id.as_str(),
            winner.display_name.as_str(),
            list.tier,
            now,
            true,
            "Compensation for missed events",
            now,
        );
        self.history.append(&record).await?;

        winner.compensation_owed = false;
        winner.updated_at = now;
        self.members.update(&winner).await?;

        list.updated_at = now;
        self.lists.update(&list).await?;

        info!(
            tier = %list.tier,
            winner = %winner_id,
            "Granted compensation link"
        );

        Ok(WinnerSelection {
            status: ListStatus::from_list(&list),
            winner,
            record,
            is_compensation: true,
        })
    }

    /// Close out a stalled cycle: sweep every still-eligible member to
    /// inactive, then reset. Fails unless there is at least one inactive
    /// member to compensate.
    pub async fn force_complete(&self, tier: LinkTier, reason: &str) -> Result<ListStatus> {
        let _guard = self.locks.for_tier(tier).lock().await;

        let mut list = self.lists.get(tier).await?;
        if !list.can_force_complete() {
            return Err(GuildError::PreconditionFailed(format!(
                "{} list cannot be force completed - no inactive members",
                tier
            )));
        }

        let remaining: Vec<String> = list.eligible.clone();
        for id in &remaining {
            list.mark_inactive(id);
        }

        let now = self.clock.now();
        list.reset(now);
        list.updated_at = now;
        self.lists.update(&list).await?;

        warn!(tier = %tier, reason = %reason, "Force completed distribution list");

        Ok(ListStatus::from_list(&list))
    }

    /// Status snapshot for one tier (unlocked read)
    pub async fn get_status(&self, tier: LinkTier) -> Result<ListStatus> {
        let list = self.lists.get(tier).await?;
        Ok(ListStatus::from_list(&list))
    }

    /// Status snapshots for every tier
    pub async fn all_statuses(&self) -> Result<Vec<ListStatus>> {
        let mut statuses = Vec::with_capacity(LinkTier::ALL.len());
        for tier in LinkTier::ALL {
            statuses.push(self.get_status(tier).await?);
        }
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic picker: returns preset indices in sequence
    struct SeqPicker {
        picks: Vec<usize>,
        next: AtomicUsize,
    }

    impl SeqPicker {
        fn new(picks: Vec<usize>) -> Self {
            Self {
                picks,
                next: AtomicUsize::new(0),
            }
        }
    }

    impl WinnerPicker for SeqPicker {
        fn pick(&self, len: usize) -> usize {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            self.picks.get(i).copied().unwrap_or(0) % len
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct Fixture {
        engine: DistributionEngine,
        store: Arc<MemoryStore>,
        now: DateTime<Utc>,
    }

    fn fixture(picks: Vec<usize>) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let engine = DistributionEngine::with_sources(
            store.clone(),
            store.clone(),
            store.clone(),
            EligibilityRules::default(),
            Arc::new(SeqPicker::new(picks)),
            Arc::new(FixedClock(now)),
        );
        Fixture { engine, store, now }
    }

    async fn add_member(fx: &Fixture, id: &str, days_in_guild: i64) {
        let mut member = Member::new(id, id, fx.now - Duration::days(days_in_guild), fx.now);
        member.recurring_participation = true;
        MemberStore::create(fx.store.as_ref(), &member).await.unwrap();
    }

    #[tokio::test]
    async fn test_init_lists_idempotent() {
        let fx = fixture(vec![]);
        fx.engine.init_lists().await.unwrap();
        fx.engine.init_lists().await.unwrap();

        let status = fx.engine.get_status(LinkTier::Silver).await.unwrap();
        assert_eq!(status.eligible_count, 0);
        assert!(status.is_complete);
    }

    #[tokio::test]
    async fn test_refresh_applies_eligibility_rules() {
        let fx = fixture(vec![]);
        fx.engine.init_lists().await.unwrap();

        add_member(&fx, "veteran", 120).await;
        add_member(&fx, "adept", 45).await;
        add_member(&fx, "rookie", 10).await;

        let silver = fx.engine.refresh_list(LinkTier::Silver).await.unwrap();
        assert_eq!(silver.eligible_count, 2);

        let gold = fx.engine.refresh_list(LinkTier::Gold).await.unwrap();
        assert_eq!(gold.eligible_count, 1);
    }

    #[tokio::test]
    async fn test_refresh_marks_absent_members_inactive() {
        let fx = fixture(vec![]);
        fx.engine.init_lists().await.unwrap();

        add_member(&fx, "present", 45).await;
        let mut absent = Member::new("absent", "absent", fx.now - Duration::days(45), fx.now);
        absent.recurring_participation = true;
        absent.absence_count = 5;
        MemberStore::create(fx.store.as_ref(), &absent).await.unwrap();

        let status = fx.engine.refresh_list(LinkTier::Silver).await.unwrap();
        assert_eq!(status.eligible_count, 1);
        assert_eq!(status.inactive_count, 1);
        assert!(status.can_force_complete);
    }

    #[tokio::test]
    async fn test_completed_members_not_readded_on_refresh() {
        let fx = fixture(vec![0]);
        fx.engine.init_lists().await.unwrap();

        add_member(&fx, "a", 45).await;
        add_member(&fx, "b", 45).await;
        fx.engine.refresh_list(LinkTier::Silver).await.unwrap();

        let selection = fx.engine.select_winner(LinkTier::Silver).await.unwrap();
        let completed = selection.winner.id.clone();

        let status = fx.engine.refresh_list(LinkTier::Silver).await.unwrap();
        assert_eq!(status.eligible_count, 1);

        let list = ListStore::get(fx.store.as_ref(), LinkTier::Silver)
            .await
            .unwrap();
        assert!(!list.eligible.contains(&completed));
        assert!(list.completed.contains(&completed));
    }

    #[tokio::test]
    async fn test_select_winner_regular_grant() {
        let fx = fixture(vec![1]);
        fx.engine.init_lists().await.unwrap();

        add_member(&fx, "a", 45).await;
        add_member(&fx, "b", 45).await;
        add_member(&fx, "c", 45).await;
        fx.engine.refresh_list(LinkTier::Silver).await.unwrap();

        let selection = fx.engine.select_winner(LinkTier::Silver).await.unwrap();
        assert!(!selection.is_compensation);
        assert_eq!(selection.status.eligible_count, 2);
        assert_eq!(selection.status.completed_count, 1);
        assert!(!selection.record.is_compensation);

        let history = fx.store.list_by_member(&selection.winner.id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_compensation_queue_preferred() {
        let fx = fixture(vec![0]);
        fx.engine.init_lists().await.unwrap();

        add_member(&fx, "a", 45).await;
        let mut owed = Member::new("z", "z", fx.now - Duration::days(200), fx.now);
        owed.compensation_owed = true;
        MemberStore::create(fx.store.as_ref(), &owed).await.unwrap();

        fx.engine.refresh_list(LinkTier::Silver).await.unwrap();

        let mut list = ListStore::get(fx.store.as_ref(), LinkTier::Silver)
            .await
            .unwrap();
        list.enqueue_compensation("z");
        ListStore::update(fx.store.as_ref(), &list).await.unwrap();

        let selection = fx.engine.select_winner(LinkTier::Silver).await.unwrap();
        assert!(selection.is_compensation);
        assert_eq!(selection.winner.id, "z");
        // Eligible set untouched by a compensation grant
        assert_eq!(selection.status.eligible_count, 1);
        assert_eq!(selection.status.compensation_count, 0);

        // The member's owed flag is cleared
        let member = MemberStore::get(fx.store.as_ref(), "z").await.unwrap();
        assert!(!member.compensation_owed);
    }

    #[tokio::test]
    async fn test_last_regular_grant_auto_resets() {
        let fx = fixture(vec![0]);
        fx.engine.init_lists().await.unwrap();

        add_member(&fx, "a", 45).await;
        fx.engine.refresh_list(LinkTier::Silver).await.unwrap();

        let before = fx.engine.get_status(LinkTier::Silver).await.unwrap();

        let selection = fx.engine.select_winner(LinkTier::Silver).await.unwrap();
        assert_eq!(selection.winner.id, "a");
        // Auto-reset cleared the cycle sets
        assert_eq!(selection.status.eligible_count, 0);
        assert_eq!(selection.status.completed_count, 0);
        assert!(selection.status.cycle_start >= before.cycle_start);
        assert!(selection.status.is_complete);
    }

    #[tokio::test]
    async fn test_no_eligible_recipients() {
        let fx = fixture(vec![]);
        fx.engine.init_lists().await.unwrap();

        let result = fx.engine.select_winner(LinkTier::Gold).await;
        assert!(matches!(result, Err(GuildError::PreconditionFailed(_))));
    }

    #[tokio::test]
    async fn test_force_complete_sweeps_eligible_and_inactive() {
        let fx = fixture(vec![]);
        fx.engine.init_lists().await.unwrap();

        add_member(&fx, "a", 45).await;
        for id in ["x", "y"] {
            let mut member = Member::new(id, id, fx.now - Duration::days(45), fx.now);
            member.recurring_participation = true;
            member.absence_count = 5;
            MemberStore::create(fx.store.as_ref(), &member).await.unwrap();
        }
        fx.engine.refresh_list(LinkTier::Silver).await.unwrap();

        let status = fx.engine.force_complete(LinkTier::Silver, "stalled").await.unwrap();
        assert_eq!(status.eligible_count, 0);
        assert_eq!(status.inactive_count, 0);
        // a, x, y all feed the compensation queue
        assert_eq!(status.compensation_count, 3);
    }

    #[tokio::test]
    async fn test_force_complete_requires_inactive() {
        let fx = fixture(vec![]);
        fx.engine.init_lists().await.unwrap();

        add_member(&fx, "a", 45).await;
        fx.engine.refresh_list(LinkTier::Silver).await.unwrap();

        let result = fx.engine.force_complete(LinkTier::Silver, "nope").await;
        assert!(matches!(result, Err(GuildError::PreconditionFailed(_))));
    }

    #[tokio::test]
    async fn test_tiers_do_not_interfere() {
        let fx = fixture(vec![0, 0]);
        fx.engine.init_lists().await.unwrap();

        add_member(&fx, "veteran", 120).await;
        fx.engine.refresh_list(LinkTier::Silver).await.unwrap();
        fx.engine.refresh_list(LinkTier::Gold).await.unwrap();

        fx.engine.select_winner(LinkTier::Silver).await.unwrap();

        let gold = fx.engine.get_status(LinkTier::Gold).await.unwrap();
        assert_eq!(gold.eligible_count, 1);
    }
}
