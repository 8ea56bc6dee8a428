//! Per-tier distribution list state machine
//!
//! One list exists per link tier. Within a cycle every member id lives in
//! at most one of eligible / completed / inactive; the compensation queue
//! is independent and FIFO-ordered across cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::GuildError;

/// Mastery link tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkTier {
    Silver,
    Gold,
}

impl LinkTier {
    pub const ALL: [LinkTier; 2] = [LinkTier::Silver, LinkTier::Gold];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkTier::Silver => "silver",
            LinkTier::Gold => "gold",
        }
    }
}

impl fmt::Display for LinkTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkTier {
    type Err = GuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "silver" => Ok(LinkTier::Silver),
            "gold" => Ok(LinkTier::Gold),
            other => Err(GuildError::BadRequest(format!(
                "unknown link tier '{}'",
                other
            ))),
        }
    }
}

/// Distribution list for one link tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionList {
    pub tier: LinkTier,
    /// Members still owed a link this cycle
    pub eligible: Vec<String>,
    /// Members who received a link this cycle
    pub completed: Vec<String>,
    /// Members swept out of this cycle for absences
    pub inactive: Vec<String>,
    /// FIFO queue of members owed a catch-up grant, survives resets
    pub compensation_queue: Vec<String>,
    /// Absence threshold copied from configuration at creation
    pub max_absence: u32,
    pub cycle_start: DateTime<Utc>,
    pub last_reset: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DistributionList {
    /// Create a fresh list for a tier
    pub fn new(tier: LinkTier, max_absence: u32, now: DateTime<Utc>) -> Self {
        Self {
            tier,
            eligible: Vec::new(),
            completed: Vec::new(),
            inactive: Vec::new(),
            compensation_queue: Vec::new(),
            max_absence,
            cycle_start: now,
            last_reset: now,
            updated_at: now,
        }
    }

    /// Add a member to the eligible set (no-op if already present)
    pub fn add_eligible(&mut self, id: &str) {
        if !self.eligible.iter().any(|m| m == id) {
            self.eligible.push(id.to_string());
        }
    }

    /// Remove a member from the eligible set (no-op if absent)
    pub fn remove_eligible(&mut self, id: &str) {
        self.eligible.retain(|m| m != id);
    }

    /// Move a member from eligible to completed. Idempotent; keeps the
    /// three cycle sets disjoint.
    pub fn mark_completed(&mut self, id: &str) {
        self.remove_eligible(id);
        self.inactive.retain(|m| m != id);
        if !self.completed.iter().any(|m| m == id) {
            self.completed.push(id.to_string());
        }
    }

    /// Move a member from eligible to inactive. Idempotent; keeps the
    /// three cycle sets disjoint.
    pub fn mark_inactive(&mut self, id: &str) {
        self.remove_eligible(id);
        self.completed.retain(|m| m != id);
        if !self.inactive.iter().any(|m| m == id) {
            self.inactive.push(id.to_string());
        }
    }

    /// Append a member to the compensation queue (duplicates suppressed)
    pub fn enqueue_compensation(&mut self, id: &str) {
        if !self.compensation_queue.iter().any(|m| m == id) {
            self.compensation_queue.push(id.to_string());
        }
    }

    /// Remove a member from the compensation queue
    pub fn remove_compensation(&mut self, id: &str) {
        self.compensation_queue.retain(|m| m != id);
    }

    /// Pop the oldest queued compensation entry
    pub fn dequeue_compensation(&mut self) -> Option<String> {
        if self.compensation_queue.is_empty() {
            None
        } else {
            Some(self.compensation_queue.remove(0))
        }
    }

    /// True when every current-cycle member has been resolved
    pub fn is_complete(&self) -> bool {
        self.eligible.is_empty()
    }

    /// True when there are inactive members to sweep into compensation
    pub fn can_force_complete(&self) -> bool {
        !self.inactive.is_empty()
    }

    /// Start a new cycle: inactive members are queued for compensation in
    /// ascending member-id order, then the cycle sets are cleared. The
    /// compensation queue otherwise survives untouched.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        let mut swept = std::mem::take(&mut self.inactive);
        swept.sort();
        for id in &swept {
            self.enqueue_compensation(id);
        }

        self.eligible.clear();
        self.completed.clear();
        self.cycle_start = now;
        self.last_reset = now;
        self.updated_at = now;
    }

    /// Share of this cycle's members already completed, in percent
    pub fn completion_percentage(&self) -> f64 {
        let total = self.eligible.len() + self.completed.len() + self.inactive.len();
        if total == 0 {
            return 100.0;
        }
        self.completed.len() as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_list() -> DistributionList {
        DistributionList::new(LinkTier::Silver, 3, Utc::now())
    }

    fn assert_disjoint(list: &DistributionList) {
        for id in &list.eligible {
            assert!(!list.completed.contains(id), "{} in eligible and completed", id);
            assert!(!list.inactive.contains(id), "{} in eligible and inactive", id);
        }
        for id in &list.completed {
            assert!(!list.inactive.contains(id), "{} in completed and inactive", id);
        }
    }

    #[test]
    fn test_tier_parse_round_trip() {
        for tier in LinkTier::ALL {
            assert_eq!(tier.as_str().parse::<LinkTier>().unwrap(), tier);
        }
        assert!("bronze".parse::<LinkTier>().is_err());
    }

    #[test]
    fn test_add_eligible_idempotent() {
        let mut list = fresh_list();
        list.add_eligible("a");
        list.add_eligible("a");
        assert_eq!(list.eligible, vec!["a"]);
    }

    #[test]
    fn test_mark_completed_moves_and_is_idempotent() {
        let mut list = fresh_list();
        list.add_eligible("a");
        list.add_eligible("b");

        list.mark_completed("a");
        assert_eq!(list.eligible, vec!["b"]);
        assert_eq!(list.completed, vec!["a"]);

        list.mark_completed("a");
        assert_eq!(list.completed, vec!["a"]);
        assert_disjoint(&list);
    }

    #[test]
    fn test_mark_inactive_keeps_sets_disjoint() {
        let mut list = fresh_list();
        list.add_eligible("a");
        list.mark_completed("a");
        list.mark_inactive("a");

        assert!(list.completed.is_empty());
        assert_eq!(list.inactive, vec!["a"]);
        assert_disjoint(&list);
    }

    #[test]
    fn test_compensation_queue_fifo_and_dedup() {
        let mut list = fresh_list();
        list.enqueue_compensation("z");
        list.enqueue_compensation("a");
        list.enqueue_compensation("z");

        assert_eq!(list.compensation_queue, vec!["z", "a"]);
        assert_eq!(list.dequeue_compensation().as_deref(), Some("z"));
        assert_eq!(list.dequeue_compensation().as_deref(), Some("a"));
        assert_eq!(list.dequeue_compensation(), None);
    }

    #[test]
    fn test_reset_migrates_inactive_sorted() {
        let mut list = fresh_list();
        list.add_eligible("a");
        list.mark_completed("a");
        list.mark_inactive("c");
        list.mark_inactive("b");
        list.enqueue_compensation("q");
        let before = list.last_reset;

        list.reset(Utc::now());

        assert!(list.eligible.is_empty());
        assert!(list.completed.is_empty());
        assert!(list.inactive.is_empty());
        // Pre-existing queue order preserved, swept members sorted by id
        assert_eq!(list.compensation_queue, vec!["q", "b", "c"]);
        assert!(list.last_reset >= before);
    }

    #[test]
    fn test_reset_dedups_against_existing_queue() {
        let mut list = fresh_list();
        list.enqueue_compensation("b");
        list.mark_inactive("b");
        list.mark_inactive("a");

        list.reset(Utc::now());

        assert_eq!(list.compensation_queue, vec!["b", "a"]);
    }

    #[test]
    fn test_completion_percentage() {
        let mut list = fresh_list();
        assert_eq!(list.completion_percentage(), 100.0);

        list.add_eligible("a");
        list.add_eligible("b");
        list.mark_completed("a");
        list.mark_inactive("c");

        // 1 completed of 3 tracked
        let pct = list.completion_percentage();
        assert!((pct - 33.33).abs() < 0.5, "unexpected percentage {}", pct);
    }

    #[test]
    fn test_is_complete_and_can_force_complete() {
        let mut list = fresh_list();
        assert!(list.is_complete());
        assert!(!list.can_force_complete());

        list.add_eligible("a");
        assert!(!list.is_complete());

        list.mark_inactive("a");
        assert!(list.is_complete());
        assert!(list.can_force_complete());
    }
}
