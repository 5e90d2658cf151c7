//! Core domain + application logic for the support relay bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and PostgreSQL
//! live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod dedup;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod relay;
pub mod retry;
pub mod session;
pub mod texts;

pub use errors::{Error, Result};
