//! Domain models and types for Veil.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Values** ([`Value`]) and declared field types ([`TypeKind`])
//! - **Entities** ([`Entity`], [`EntityRef`], [`Record`]) accessed by field name
//! - **Field rules** ([`FieldRule`], [`FixedValue`], [`FieldRules`])
//! - **Error types** ([`VeilError`], [`ExpressionError`]) and the [`Result`] alias
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, VeilError>`]:
//!
//! ```rust
//! use veil::domain::{FieldRule, Result};
//!
//! fn build() -> Result<FieldRule> {
//!     FieldRule::fixed("@=object.getId()")
//! }
//! # build().unwrap();
//! ```

pub mod entity;
pub mod errors;
pub mod result;
pub mod rule;
pub mod value;

// Re-export commonly used types for convenience
pub use entity::{entity_id, entity_ref, snapshot, Entity, EntityRef, Record, SnapshotMemo};
pub use errors::{ExpressionError, VeilError};
pub use result::Result;
pub use rule::{FieldRule, FieldRules, FixedValue, EXPRESSION_MARKER};
pub use value::{TypeKind, Value};
