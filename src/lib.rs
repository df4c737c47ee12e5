//! Project ledger - budget tracking and invoicing for client projects
//!
//! This library provides the core of the `ledger` command line tool. It tracks
//! project budgets against approved spend, raises threshold alerts, and turns
//! approved billable work into invoices that move through a payment lifecycle.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (budgets, expenses, time entries, invoices)
//! - `storage`: JSON file storage with all-or-nothing transactions
//! - `services`: Business logic layer
//! - `audit`: Audit logging system
//! - `notify`: Domain event delivery
//! - `export`: CSV, JSON and YAML export
//!
//! # Example
//!
//! ```rust,ignore
//! use project_ledger::config::{LedgerPaths, Settings};
//! use project_ledger::storage::Storage;
//!
//! let paths = LedgerPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let storage = Storage::open(paths)?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod notify;
pub mod services;
pub mod storage;

pub use error::{LedgerError, LedgerResult};
