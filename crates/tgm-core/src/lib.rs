//! Core domain + relay pipeline for the Telegram group monitor.
//!
//! This crate is framework-agnostic. Telegram and SQLite live behind ports
//! (traits) implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod export;
pub mod filter;
pub mod formatting;
pub mod logging;
pub mod matcher;
pub mod media;
pub mod messaging;
pub mod registry;
pub mod relay;

pub use errors::{Error, Result};
