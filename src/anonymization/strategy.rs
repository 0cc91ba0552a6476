//! Leaf value resolution
//!
//! Turns a field rule into the value to write. Priority: fixed value,
//! unique generation, clearing, then plain generation.

use super::engine::AnonymizeOptions;
use crate::domain::{EntityRef, FieldRule, FixedValue, Result, TypeKind, Value, VeilError};
use crate::expression::ExpressionEvaluator;
use crate::generator::{SharedRegistry, ValueGenerator};
use tracing::trace;

/// A resolved value and how it reaches the field
#[derive(Debug)]
pub(crate) enum Resolved {
    /// Cast to the field's kind by the coercion writer
    Coerced(Value),
    /// Object value assigned to a non-scalar field as-is
    Direct(Value),
}

pub(crate) struct LeafStrategy<'a> {
    pub generator: &'a dyn ValueGenerator,
    pub registry: &'a SharedRegistry,
    pub evaluator: &'a ExpressionEvaluator,
}

impl LeafStrategy<'_> {
    /// Resolve `rule` for a field of declared `kind` on `entity`
    pub fn resolve(
        &self,
        entity: &EntityRef,
        kind: TypeKind,
        rule: &FieldRule,
        options: AnonymizeOptions,
    ) -> Result<Resolved> {
        match rule.value() {
            FixedValue::NotProvided => {}
            FixedValue::Array(items) => return Ok(Resolved::Coerced(Value::List(items.clone()))),
            FixedValue::Expression(expression) => {
                trace!(expression = %expression.source(), "Evaluating fixed value expression");
                let value = self.evaluator.evaluate(expression, entity)?;
                return Ok(Resolved::Coerced(value));
            }
            FixedValue::Scalar(value) => {
                return Ok(Resolved::Coerced(prefixed(rule.prefix_str(), value)?));
            }
        }

        if rule.is_unique() {
            let pattern = rule.pattern().ok_or_else(|| {
                VeilError::InvalidArgument("unique generation requires a pattern".to_string())
            })?;
            let value = {
                let mut registry = self.registry.lock().map_err(|_| {
                    VeilError::Registry("uniqueness registry lock is poisoned".to_string())
                })?;
                self.generator.generate_unique(
                    &mut registry,
                    pattern,
                    rule.generator_args(),
                    options.reset,
                    options.max_retries,
                )?
            };
            return resolve_unique(value, kind, rule);
        }

        let Some(pattern) = rule.pattern() else {
            return Ok(Resolved::Coerced(Value::Null));
        };

        let value = self.generator.generate(pattern, rule.generator_args())?;
        if value.is_object() {
            return direct(value, kind);
        }
        if value.is_list() {
            return Ok(Resolved::Coerced(value));
        }
        Ok(Resolved::Coerced(prefixed(rule.prefix_str(), &value)?))
    }
}

fn resolve_unique(value: Value, kind: TypeKind, rule: &FieldRule) -> Result<Resolved> {
    if value.is_object() {
        return direct(value, kind);
    }
    if !matches!(value, Value::String(_) | Value::Int(_)) {
        return Err(VeilError::mismatch(format!(
            "unique value must be string or int, got {}",
            value.type_label()
        )));
    }
    Ok(Resolved::Coerced(prefixed(rule.prefix_str(), &value)?))
}

/// Object values only go to fields that are not declared scalar
fn direct(value: Value, kind: TypeKind) -> Result<Resolved> {
    if kind.is_scalar() {
        return Err(VeilError::mismatch(format!(
            "{} value for {kind} field",
            value.type_label()
        )));
    }
    Ok(Resolved::Direct(value))
}

fn prefixed(prefix: &str, value: &Value) -> Result<Value> {
    let text = value.stringify().ok_or_else(|| {
        VeilError::mismatch(format!("{} has no string form", value.type_label()))
    })?;
    Ok(Value::String(format!("{prefix}{text}")))
}
