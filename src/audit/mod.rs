//! Audit logging for the project ledger
//!
//! Records every committed create, update and delete with before/after
//! values in an append-only audit log.
//!
//! - `AuditEntry`: a single entry with timestamp, operation, entity
//!   information and optional before/after JSON.
//! - `AuditLogger`: appends entries to the log file as JSON lines.
//!
//! Services never write to the logger directly. They stage entries on the
//! open transaction (`Tx::audit`), and the store writes them only after the
//! transaction commits, so a rolled-back operation leaves no audit trail.

mod entry;
mod logger;

pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
