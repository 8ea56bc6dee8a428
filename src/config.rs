//! Configuration for Guildhall
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

use crate::rules::EligibilityRules;

/// Guildhall - guild membership and mastery-link distribution service
#[derive(Parser, Debug, Clone)]
#[command(name = "guildhall")]
#[command(about = "Guild membership and mastery-link distribution service")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Data directory for the sled store
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Enable development mode (in-memory store fallback, relaxed startup)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Use the in-memory store instead of sled (implied by --dev-mode when
    /// the sled store cannot be opened)
    #[arg(long, env = "MEMORY_STORE", default_value = "false")]
    pub memory_store: bool,

    /// Days in guild before silver-link eligibility
    #[arg(long, env = "SILVER_TENURE_DAYS", default_value = "30")]
    pub silver_tenure_days: i64,

    /// Days in guild before gold-link eligibility
    #[arg(long, env = "GOLD_TENURE_DAYS", default_value = "90")]
    pub gold_tenure_days: i64,

    /// Missed event checks before a member is treated as inactive
    #[arg(long, env = "MAX_ABSENCE_COUNT", default_value = "3")]
    pub max_absence_count: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Eligibility rule set derived from the configured thresholds
    pub fn rules(&self) -> EligibilityRules {
        EligibilityRules {
            silver_tenure_days: self.silver_tenure_days,
            gold_tenure_days: self.gold_tenure_days,
            max_absence: self.max_absence_count,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.silver_tenure_days < 0 || self.gold_tenure_days < 0 {
            return Err("tenure thresholds must be non-negative".to_string());
        }

        if self.silver_tenure_days >= self.gold_tenure_days {
            return Err(
                "SILVER_TENURE_DAYS must be less than GOLD_TENURE_DAYS".to_string(),
            );
        }

        if self.max_absence_count == 0 {
            return Err("MAX_ABSENCE_COUNT must be at least 1".to_string());
        }

        Ok(())
    }
}
