//! Shared types for Guildhall

pub mod error;

pub use error::{GuildError, Result};
