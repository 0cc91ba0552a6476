//! Audit logging module
//!
//! Records which fields each anonymization pass changed, with original
//! values hashed.

pub mod logger;

pub use logger::AuditLogger;
