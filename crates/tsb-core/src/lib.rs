//! Core domain + application logic for the ticket support bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and SQLite live
//! behind ports (traits) implemented in adapter crates.

pub mod access;
pub mod buttons;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod lifecycle;
pub mod logging;
pub mod ports;
pub mod render;

#[cfg(test)]
pub(crate) mod testutil;

pub use errors::{Error, Result};
