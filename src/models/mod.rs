//! Data models for Guildhall

pub mod history;
pub mod list;
pub mod member;

pub use history::GrantRecord;
pub use list::{DistributionList, LinkTier};
pub use member::{Member, Rank, Role};
