//! HTTP server for Guildhall

pub mod http;

pub use http::{run, AppState};
