//! Grant history records
//!
//! One immutable record per successful winner selection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LinkTier;

/// Record of a mastery link granted to a member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantRecord {
    /// Unique record id
    pub record_id: String,
    /// Member who received the link
    pub member_id: String,
    /// Display name at grant time
    pub display_name: String,
    pub tier: LinkTier,
    /// When the grant was made
    pub granted_at: DateTime<Utc>,
    /// The event the grant settles
    pub event_date: DateTime<Utc>,
    /// Whether this grant resolves a missed prior cycle
    pub is_compensation: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl GrantRecord {
    /// Create a new grant record
    pub fn new(
        member_id: impl Into<String>,
        display_name: impl Into<String>,
        tier: LinkTier,
        event_date: DateTime<Utc>,
        is_compensation: bool,
        notes: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4().to_string(),
            member_id: member_id.into(),
            display_name: display_name.into(),
            tier,
            granted_at: now,
            event_date,
            is_compensation,
            notes: notes.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ids_unique() {
        let now = Utc::now();
        let a = GrantRecord::new("m-1", "One", LinkTier::Silver, now, false, "", now);
        let b = GrantRecord::new("m-1", "One", LinkTier::Silver, now, false, "", now);
        assert_ne!(a.record_id, b.record_id);
    }

    #[test]
    fn test_serialization_round_trip() {
        let now = Utc::now();
        let record = GrantRecord::new(
            "m-2",
            "Two",
            LinkTier::Gold,
            now,
            true,
            "compensation for missed event",
            now,
        );

        let json = serde_json::to_string(&record).unwrap();
        let parsed: GrantRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.record_id, record.record_id);
        assert_eq!(parsed.tier, LinkTier::Gold);
        assert!(parsed.is_compensation);
    }
}
