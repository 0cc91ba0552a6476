//! Audit logger for anonymization operations

use crate::anonymization::hooks::{AfterAnonymize, AnonymizeHooks};
use crate::domain::{Result, Value, VeilError};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Audit log entry, one per anonymized entity
#[derive(Debug, Serialize)]
struct AuditLogEntry {
    timestamp: String,
    entity_type: String,
    fields_processed: usize,
    fields_changed: usize,
    changes: Vec<AuditChange>,
}

/// A changed field (with hashed original)
#[derive(Debug, Serialize)]
struct AuditChange {
    field: String,
    /// SHA-256 hash of the original value (never log plaintext PII)
    original_hash: String,
}

/// Audit logger for anonymization operations
///
/// Registered as a listener, it appends one line per anonymized entity to
/// the log file. Only fields whose value changed are recorded; fields
/// holding nested entities are audited through the nested entity's own
/// entry.
pub struct AuditLogger {
    log_path: PathBuf,
    json_format: bool,
    enabled: bool,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(log_path: PathBuf, json_format: bool, enabled: bool) -> Result<Self> {
        if enabled {
            // Ensure parent directory exists
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    VeilError::Io(format!(
                        "Failed to create audit log directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        Ok(Self {
            log_path,
            json_format,
            enabled,
        })
    }

    pub fn log_path(&self) -> &PathBuf {
        &self.log_path
    }

    /// Record the outcome of one entity's anonymization
    pub fn log_anonymization(&self, event: &AfterAnonymize<'_>) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entity = event.entity.try_borrow().map_err(|_| {
            VeilError::Hook("audit logger cannot read a mutably borrowed entity".to_string())
        })?;
        let original = event.original.try_borrow().map_err(|_| {
            VeilError::Hook("audit logger cannot read a mutably borrowed snapshot".to_string())
        })?;

        let changes: Vec<AuditChange> = event
            .rules
            .iter()
            .filter_map(|(field, _)| {
                let before = original.get(field)?;
                let after = entity.get(field);
                if holds_entity(&before) || after.as_ref().is_some_and(holds_entity) {
                    return None;
                }
                (after.as_ref() != Some(&before)).then(|| AuditChange {
                    field: field.to_string(),
                    original_hash: self.hash_value(&before),
                })
            })
            .collect();

        let entry = AuditLogEntry {
            timestamp: Utc::now().to_rfc3339(),
            entity_type: entity.type_name().to_string(),
            fields_processed: event.rules.len(),
            fields_changed: changes.len(),
            changes,
        };

        self.write_entry(&entry)
    }

    /// Hash a value using SHA-256
    fn hash_value(&self, value: &Value) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.registry_key().as_bytes());
        let result = hasher.finalize();
        format!("{result:x}")
    }

    /// Write an audit entry to the log file
    fn write_entry(&self, entry: &AuditLogEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| {
                VeilError::Io(format!(
                    "Failed to open audit log {}: {e}",
                    self.log_path.display()
                ))
            })?;

        if self.json_format {
            let json_line = serde_json::to_string(entry)?;
            writeln!(file, "{json_line}")?;
        } else {
            // Plain text format
            let fields: Vec<&str> = entry.changes.iter().map(|c| c.field.as_str()).collect();
            writeln!(
                file,
                "[{}] Entity: {} | Fields: {} | Changed: {} [{}]",
                entry.timestamp,
                entry.entity_type,
                entry.fields_processed,
                entry.fields_changed,
                fields.join(", ")
            )?;
        }

        Ok(())
    }
}

impl AnonymizeHooks for AuditLogger {
    fn after_anonymize(&self, event: &AfterAnonymize<'_>) -> Result<()> {
        self.log_anonymization(event)
    }
}

fn holds_entity(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::List(items) => items.iter().any(holds_entity),
        _ => false,
    }
}
