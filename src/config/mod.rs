//! Configuration module for the project ledger
//!
//! This module provides configuration management including:
//! - Data directory resolution
//! - User settings persistence and validation

pub mod paths;
pub mod settings;

pub use paths::LedgerPaths;
pub use settings::Settings;
