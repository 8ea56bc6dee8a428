//! Guildhall - guild membership and mastery-link distribution
//!
//! Guildhall tracks guild members and fairly distributes a limited pool of
//! mastery links among eligible members over repeating cycles.
//!
//! ## Services
//!
//! - **Rules**: pure per-tier eligibility and activity checks
//! - **Distribution lists**: per-tier cycle state machine (eligible /
//!   completed / inactive / compensation queue)
//! - **Engine**: refresh, random winner selection, cycle resets
//! - **Directory**: member records, participation marking, promotion
//! - **Stores**: in-memory (dev) and sled-backed (production) persistence
//! - **HTTP API**: thin JSON surface over the engine and directory

pub mod config;
pub mod engine;
pub mod models;
pub mod routes;
pub mod rules;
pub mod server;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{GuildError, Result};
