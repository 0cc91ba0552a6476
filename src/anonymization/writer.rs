//! Type coercion writer
//!
//! Casts a value to a field's declared kind before writing it. Lists are
//! only accepted by array fields and entities or dates only by array and
//! object fields. Scalar values get the cast of an `int`, `float` or `bool`
//! field and pass unchanged otherwise.

use crate::domain::{EntityRef, Result, TypeKind, Value, VeilError};

#[derive(Debug, Clone, Copy, Default)]
pub struct TypeCoercionWriter;

impl TypeCoercionWriter {
    /// Coerce `value` to `kind` and write it to `field`
    pub fn write(&self, entity: &EntityRef, field: &str, kind: TypeKind, value: Value) -> Result<()> {
        let coerced = self.coerce(kind, value)?;
        self.assign(entity, field, coerced)
    }

    /// Cast a value to a declared kind
    pub fn coerce(&self, kind: TypeKind, value: Value) -> Result<Value> {
        if value.is_list() {
            return match kind {
                TypeKind::Array => Ok(value),
                _ => Err(VeilError::mismatch(format!("array written to {kind} field"))),
            };
        }

        if value.is_object() && kind.is_scalar() {
            return Err(object_cast_error(&value, kind));
        }

        match kind {
            TypeKind::Int => value
                .to_int()
                .map(Value::Int)
                .ok_or_else(|| object_cast_error(&value, kind)),
            TypeKind::Float => value
                .to_float()
                .map(Value::Float)
                .ok_or_else(|| object_cast_error(&value, kind)),
            TypeKind::Bool => Ok(Value::Bool(value.to_bool())),
            TypeKind::String | TypeKind::Array | TypeKind::Object => Ok(value),
        }
    }

    /// Write without coercion
    pub fn assign(&self, entity: &EntityRef, field: &str, value: Value) -> Result<()> {
        let mut inner = entity.try_borrow_mut().map_err(|_| {
            VeilError::Entity(format!("cannot write '{field}': entity is already borrowed"))
        })?;
        inner.set(field, value)
    }
}

fn object_cast_error(value: &Value, kind: TypeKind) -> VeilError {
    VeilError::mismatch(format!("{} written to {kind} field", value.type_label()))
}
