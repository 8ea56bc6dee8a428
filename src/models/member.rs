//! Guild member record
//!
//! Tier eligibility and rank are derived from tenure, participation, and
//! role (see `rules`); stored copies are display-only cache and never
//! consulted for decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Guild role. Officers hold the administrative role and are eligible
/// for every link tier regardless of tenure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Officer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Member => write!(f, "member"),
            Role::Officer => write!(f, "officer"),
        }
    }
}

/// Display rank derived from tenure and role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    /// Below the silver tenure threshold
    Initiate,
    /// At or above the silver tenure threshold
    Adept,
    /// At or above the gold tenure threshold
    Elder,
    /// Officer
    Warden,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Initiate => write!(f, "Initiate"),
            Rank::Adept => write!(f, "Adept"),
            Rank::Elder => write!(f, "Elder"),
            Rank::Warden => write!(f, "Warden"),
        }
    }
}

/// Guild member record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Opaque external account id
    pub id: String,
    /// Display name
    pub display_name: String,
    /// When the member joined the guild
    pub join_date: DateTime<Utc>,
    /// Guild role
    #[serde(default)]
    pub role: Role,
    /// Most recent recurring-participation check
    pub recurring_participation: bool,
    /// Recorded event participation dates
    pub event_participation_dates: Vec<DateTime<Utc>>,
    /// Most recent event participation
    pub last_event_participation: Option<DateTime<Utc>>,
    /// Consecutive missed event checks
    pub absence_count: u32,
    /// Whether a compensation grant is owed from a prior cycle
    pub compensation_owed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Create a new member record
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        join_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            join_date,
            role: Role::Member,
            recurring_participation: false,
            event_participation_dates: Vec::new(),
            last_event_participation: None,
            absence_count: 0,
            compensation_owed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whole days since the member joined the guild
    pub fn days_in_guild(&self, now: DateTime<Utc>) -> i64 {
        (now - self.join_date).num_days()
    }

    pub fn is_officer(&self) -> bool {
        self.role == Role::Officer
    }

    /// Promote to the administrative role
    pub fn promote(&mut self, now: DateTime<Utc>) {
        self.role = Role::Officer;
        self.updated_at = now;
    }

    /// Remove the administrative role
    pub fn demote(&mut self, now: DateTime<Utc>) {
        self.role = Role::Member;
        self.updated_at = now;
    }

    /// Record participation in a recurring event: stores the date and
    /// resets the absence counter.
    pub fn record_participation(&mut self, event_date: DateTime<Utc>, now: DateTime<Utc>) {
        self.event_participation_dates.push(event_date);
        self.last_event_participation = Some(event_date);
        self.absence_count = 0;
        self.updated_at = now;
    }

    /// Record a missed recurring event check
    pub fn record_absence(&mut self, now: DateTime<Utc>) {
        self.absence_count += 1;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn member_joined_days_ago(days: i64) -> (Member, DateTime<Utc>) {
        let now = Utc::now();
        let member = Member::new("m-1", "Tester", now - Duration::days(days), now);
        (member, now)
    }

    #[test]
    fn test_days_in_guild() {
        let (member, now) = member_joined_days_ago(45);
        assert_eq!(member.days_in_guild(now), 45);
    }

    #[test]
    fn test_participation_resets_absence() {
        let (mut member, now) = member_joined_days_ago(10);
        member.record_absence(now);
        member.record_absence(now);
        assert_eq!(member.absence_count, 2);

        member.record_participation(now, now);
        assert_eq!(member.absence_count, 0);
        assert_eq!(member.last_event_participation, Some(now));
        assert_eq!(member.event_participation_dates.len(), 1);
    }

    #[test]
    fn test_promote_demote() {
        let (mut member, now) = member_joined_days_ago(10);
        assert!(!member.is_officer());

        member.promote(now);
        assert!(member.is_officer());

        member.demote(now);
        assert!(!member.is_officer());
    }

    #[test]
    fn test_member_serialization_round_trip() {
        let (member, _) = member_joined_days_ago(45);
        let json = serde_json::to_string(&member).unwrap();
        let parsed: Member = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, member.id);
        assert_eq!(parsed.role, Role::Member);
    }
}
