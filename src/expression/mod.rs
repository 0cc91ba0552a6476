//! Expression language for computed fixed values
//!
//! A fixed value starting with `@=` is compiled into an [`Expression`] and
//! evaluated against the entity being anonymized, bound as `object`:
//!
//! ```
//! use veil::domain::Record;
//! use veil::expression::{Expression, ExpressionEvaluator};
//!
//! let order = Record::new("Order").with("id", 7).into_ref();
//! let expression = Expression::parse("'order-' ~ object.getId()").unwrap();
//! let value = ExpressionEvaluator.evaluate(&expression, &order).unwrap();
//! assert_eq!(value.as_str(), Some("order-7"));
//! ```
//!
//! Supported syntax: string, number, boolean and `null` literals, `[a, b]`
//! lists, variables, property access, accessor calls (`getX()`, `isX()`,
//! `hasX()`, `get('x')`), arithmetic, `~` concatenation, comparisons,
//! `and`/`or`/`not`, the ternary operator, and the functions `upper`,
//! `lower`, `trim`, `length` and `concat`.

mod eval;
mod lexer;
mod parser;

pub use eval::Bindings;

use crate::domain::{EntityRef, ExpressionError, Result, Value};
use parser::Node;

/// Variable name the entity is bound to
pub const OBJECT_VARIABLE: &str = "object";

/// A compiled expression
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    /// Compile expression source
    pub fn parse(source: &str) -> std::result::Result<Self, ExpressionError> {
        let root = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate with explicit variable bindings
    pub fn evaluate(&self, bindings: &Bindings) -> std::result::Result<Value, ExpressionError> {
        eval::evaluate(&self.root, bindings)
    }
}

/// Evaluates expressions on behalf of the anonymization engine
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionEvaluator;

impl ExpressionEvaluator {
    /// Evaluate a compiled expression with `entity` bound as `object`
    pub fn evaluate(&self, expression: &Expression, entity: &EntityRef) -> Result<Value> {
        let mut bindings = Bindings::new();
        bindings.insert(OBJECT_VARIABLE.to_string(), Value::Object(entity.clone()));
        Ok(expression.evaluate(&bindings)?)
    }

    /// Compile and evaluate source in one step
    pub fn evaluate_source(&self, source: &str, bindings: &Bindings) -> Result<Value> {
        Ok(Expression::parse(source)?.evaluate(bindings)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Record, VeilError};

    #[test]
    fn test_evaluator_binds_object() {
        let customer = Record::new("Customer").with("id", 42).into_ref();
        let expression = Expression::parse("object.getId()").unwrap();

        let value = ExpressionEvaluator.evaluate(&expression, &customer).unwrap();
        assert_eq!(value, Value::Int(42));
        assert_eq!(expression.source(), "object.getId()");
    }

    #[test]
    fn test_evaluate_source_with_bindings() {
        let mut bindings = Bindings::new();
        bindings.insert("n".to_string(), Value::Int(4));

        let value = ExpressionEvaluator
            .evaluate_source("n * 2 ~ ''", &bindings)
            .unwrap();
        assert_eq!(value, Value::from("8"));
    }

    #[test]
    fn test_errors_convert_to_veil_error() {
        let err = ExpressionEvaluator
            .evaluate_source("missing", &Bindings::new())
            .unwrap_err();
        assert!(matches!(
            err,
            VeilError::Expression(ExpressionError::UnknownVariable(_))
        ));
    }
}
