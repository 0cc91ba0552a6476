//! Entities and the accessor capability
//!
//! The engine never touches an entity's storage. It reads and writes fields
//! by logical name through the [`Entity`] trait, and holds entities through
//! shared [`EntityRef`] handles so nested objects keep their identity while
//! they are mutated in place.

use super::errors::VeilError;
use super::result::Result;
use super::value::{TypeKind, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Shared, mutable handle to an entity
pub type EntityRef = Rc<RefCell<dyn Entity>>;

/// Field accessor capability required from every anonymizable record
///
/// # Examples
///
/// ```
/// use veil::domain::{entity_ref, Entity, Record, Value};
///
/// let customer = Record::new("Customer")
///     .with("email", "jane@example.com")
///     .with("age", 41)
///     .into_ref();
///
/// assert_eq!(customer.borrow().get("age"), Some(Value::Int(41)));
/// # let _ = entity_ref(Record::new("Empty"));
/// ```
pub trait Entity {
    /// Runtime type name used for metadata resolution
    fn type_name(&self) -> &str;

    /// Read a field. `None` means the entity has no accessor for it.
    fn get(&self, field: &str) -> Option<Value>;

    /// Write a field
    fn set(&mut self, field: &str, value: Value) -> Result<()>;

    /// Declared type of a field, `None` when it cannot be determined
    fn field_type(&self, _field: &str) -> Option<TypeKind> {
        None
    }

    /// Structural copy of this entity. Nested entities go through `memo` so
    /// each one is copied at most once.
    fn snapshot(&self, memo: &mut SnapshotMemo) -> EntityRef;
}

/// Wrap a concrete entity in a shared handle
pub fn entity_ref<E: Entity + 'static>(entity: E) -> EntityRef {
    Rc::new(RefCell::new(entity))
}

/// Identity of an entity handle, stable for the handle's lifetime
pub fn entity_id(entity: &EntityRef) -> usize {
    Rc::as_ptr(entity) as *const () as usize
}

/// Deep copy of an entity graph
pub fn snapshot(entity: &EntityRef) -> EntityRef {
    SnapshotMemo::default().copy_entity(entity)
}

/// Bookkeeping for a structural copy
///
/// Shared children stay shared in the copy. A back-reference to an entity
/// whose copy is still under construction keeps pointing at the live entity.
#[derive(Default)]
pub struct SnapshotMemo {
    copies: HashMap<usize, EntityRef>,
    in_progress: HashSet<usize>,
}

impl SnapshotMemo {
    /// Copy a value, descending into lists and entities
    pub fn copy_value(&mut self, value: &Value) -> Value {
        match value {
            Value::Object(entity) => Value::Object(self.copy_entity(entity)),
            Value::List(items) => Value::List(items.iter().map(|v| self.copy_value(v)).collect()),
            other => other.clone(),
        }
    }

    /// Copy an entity once per identity
    pub fn copy_entity(&mut self, entity: &EntityRef) -> EntityRef {
        let id = entity_id(entity);
        if let Some(copy) = self.copies.get(&id) {
            return Rc::clone(copy);
        }
        if !self.in_progress.insert(id) {
            return Rc::clone(entity);
        }

        let copy = match entity.try_borrow() {
            Ok(inner) => inner.snapshot(self),
            Err(_) => Rc::clone(entity),
        };

        self.in_progress.remove(&id);
        self.copies.insert(id, Rc::clone(&copy));
        copy
    }
}

/// Dynamically typed entity with ordered fields
///
/// Field types are inferred from the initial value unless declared with
/// [`Record::with_typed`].
#[derive(Debug, Clone)]
pub struct Record {
    type_name: String,
    fields: Vec<(String, Value)>,
    types: HashMap<String, TypeKind>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            types: HashMap::new(),
        }
    }

    /// Add a field, inferring its type from the value
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        if let Some(kind) = TypeKind::of(&value) {
            self.types.insert(name.clone(), kind);
        }
        self.insert(name, value);
        self
    }

    /// Add a field with an explicit type
    pub fn with_typed(
        mut self,
        name: impl Into<String>,
        kind: TypeKind,
        value: impl Into<Value>,
    ) -> Self {
        let name = name.into();
        self.types.insert(name.clone(), kind);
        self.insert(name, value.into());
        self
    }

    pub fn into_ref(self) -> EntityRef {
        entity_ref(self)
    }

    /// Borrow a field's current value
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    fn insert(&mut self, name: String, value: Value) {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }
}

impl Entity for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn get(&self, field: &str) -> Option<Value> {
        self.value(field).cloned()
    }

    fn set(&mut self, field: &str, value: Value) -> Result<()> {
        match self.fields.iter_mut().find(|(n, _)| n == field) {
            Some(slot) => {
                slot.1 = value;
                Ok(())
            }
            None => Err(VeilError::Entity(format!(
                "{} has no mutator for field '{}'",
                self.type_name, field
            ))),
        }
    }

    fn field_type(&self, field: &str) -> Option<TypeKind> {
        self.types.get(field).copied()
    }

    fn snapshot(&self, memo: &mut SnapshotMemo) -> EntityRef {
        let fields = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), memo.copy_value(value)))
            .collect();

        entity_ref(Record {
            type_name: self.type_name.clone(),
            fields,
            types: self.types.clone(),
        })
    }
}
