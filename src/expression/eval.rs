//! Tree-walking evaluator
//!
//! Arithmetic and comparisons follow loose scripting rules: numeric strings
//! take part in arithmetic, `==` compares across types, `===` does not.

use super::parser::Node;
use crate::domain::{ExpressionError, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Variables visible to an expression
pub type Bindings = HashMap<String, Value>;

type EvalResult = Result<Value, ExpressionError>;

/// Evaluate a parsed tree
pub fn evaluate(node: &Node, bindings: &Bindings) -> EvalResult {
    match node {
        Node::Literal(value) => Ok(value.clone()),
        Node::List(items) => items
            .iter()
            .map(|item| evaluate(item, bindings))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Node::Variable(name) => bindings
            .get(name)
            .cloned()
            .ok_or_else(|| ExpressionError::UnknownVariable(name.clone())),
        Node::Property { target, name } => {
            let target = evaluate(target, bindings)?;
            read_property(&target, name)
        }
        Node::MethodCall { target, name, args } => {
            let target = evaluate(target, bindings)?;
            let args = evaluate_all(args, bindings)?;
            call_method(&target, name, &args)
        }
        Node::Function { name, args } => {
            let args = evaluate_all(args, bindings)?;
            call_function(name, &args)
        }
        Node::Index { target, index } => {
            let target = evaluate(target, bindings)?;
            let index = evaluate(index, bindings)?;
            read_index(&target, &index)
        }
        Node::Unary { op, operand } => {
            let operand = evaluate(operand, bindings)?;
            unary(op, &operand)
        }
        Node::Binary { op, left, right } => match *op {
            "or" | "||" => {
                if evaluate(left, bindings)?.to_bool() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(evaluate(right, bindings)?.to_bool()))
            }
            "and" | "&&" => {
                if !evaluate(left, bindings)?.to_bool() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(evaluate(right, bindings)?.to_bool()))
            }
            _ => {
                let left = evaluate(left, bindings)?;
                let right = evaluate(right, bindings)?;
                binary(op, &left, &right)
            }
        },
        Node::Conditional {
            condition,
            then,
            otherwise,
        } => {
            if evaluate(condition, bindings)?.to_bool() {
                evaluate(then, bindings)
            } else {
                evaluate(otherwise, bindings)
            }
        }
    }
}

fn evaluate_all(nodes: &[Node], bindings: &Bindings) -> Result<Vec<Value>, ExpressionError> {
    nodes.iter().map(|node| evaluate(node, bindings)).collect()
}

fn read_field(target: &Value, field: &str) -> Option<EvalResult> {
    let entity = target.as_entity()?;
    let result = match entity.try_borrow() {
        Ok(inner) => inner.get(field).map(Ok),
        Err(_) => Some(Err(ExpressionError::Type(format!(
            "cannot read '{field}' while the entity is being modified"
        )))),
    };
    result
}

fn read_property(target: &Value, name: &str) -> EvalResult {
    if !matches!(target, Value::Object(_)) {
        return Err(ExpressionError::Type(format!(
            "unable to get property \"{name}\" of non-object ({})",
            target.type_label()
        )));
    }
    read_field(target, name).unwrap_or_else(|| {
        Err(ExpressionError::Type(format!(
            "undefined property \"{name}\""
        )))
    })
}

/// Field named by an accessor method: `getFirstName` reads `firstName`
fn accessor_field(method: &str) -> Option<String> {
    ["get", "is", "has"].iter().find_map(|prefix| {
        let rest = method.strip_prefix(prefix)?;
        let mut chars = rest.chars();
        let first = chars.next()?;
        if !first.is_ascii_uppercase() {
            return None;
        }
        Some(first.to_ascii_lowercase().to_string() + chars.as_str())
    })
}

fn call_method(target: &Value, name: &str, args: &[Value]) -> EvalResult {
    if !matches!(target, Value::Object(_)) {
        return Err(ExpressionError::Type(format!(
            "unable to call method \"{name}\" of non-object ({})",
            target.type_label()
        )));
    }

    if name == "get" {
        let field = match args {
            [Value::String(field)] => field,
            _ => {
                return Err(ExpressionError::Type(
                    "get() expects a single field name".to_string(),
                ))
            }
        };
        return read_field(target, field).unwrap_or(Ok(Value::Null));
    }

    if !args.is_empty() {
        return Err(ExpressionError::UnknownMethod(format!("{name}()")));
    }
    accessor_field(name)
        .and_then(|field| read_field(target, &field))
        .unwrap_or_else(|| Err(ExpressionError::UnknownMethod(format!("{name}()"))))
}

fn call_function(name: &str, args: &[Value]) -> EvalResult {
    let single_string = |args: &[Value]| -> Result<String, ExpressionError> {
        match args {
            [value] => stringify(value),
            _ => Err(ExpressionError::Type(format!(
                "{name}() expects exactly one argument"
            ))),
        }
    };

    match name {
        "upper" => Ok(Value::String(single_string(args)?.to_uppercase())),
        "lower" => Ok(Value::String(single_string(args)?.to_lowercase())),
        "trim" => Ok(Value::String(single_string(args)?.trim().to_string())),
        "length" => match args {
            [Value::List(items)] => Ok(Value::Int(items.len() as i64)),
            _ => Ok(Value::Int(single_string(args)?.chars().count() as i64)),
        },
        "concat" => {
            let mut out = String::new();
            for arg in args {
                out.push_str(&stringify(arg)?);
            }
            Ok(Value::String(out))
        }
        _ => Err(ExpressionError::UnknownMethod(format!("{name}()"))),
    }
}

fn read_index(target: &Value, index: &Value) -> EvalResult {
    match (target, index) {
        (Value::List(items), _) => {
            let position = index
                .to_int()
                .ok_or_else(|| ExpressionError::Type("list index must be numeric".to_string()))?;
            Ok(usize::try_from(position)
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Value::Null))
        }
        (Value::Object(_), Value::String(field)) => read_property(target, field),
        _ => Err(ExpressionError::Type(format!(
            "cannot index {} with {}",
            target.type_label(),
            index.type_label()
        ))),
    }
}

fn stringify(value: &Value) -> Result<String, ExpressionError> {
    value.stringify().ok_or_else(|| {
        ExpressionError::Type("object could not be converted to string".to_string())
    })
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Number::Int(i) => Value::Int(i),
            Number::Float(f) => Value::Float(f),
        }
    }
}

fn to_number(value: &Value) -> Result<Number, ExpressionError> {
    match value {
        Value::Int(i) => Ok(Number::Int(*i)),
        Value::Float(f) => Ok(Number::Float(*f)),
        Value::Bool(_) | Value::Null => Ok(Number::Int(value.to_int().unwrap_or_default())),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => Ok(Number::Int(i)),
            Err(_) => Ok(Number::Float(value.to_float().unwrap_or_default())),
        },
        _ => Err(ExpressionError::Type(format!(
            "unsupported operand type {}",
            value.type_label()
        ))),
    }
}

/// Whole-string numeric check used by loose comparison
fn numeric_string(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn unary(op: &str, operand: &Value) -> EvalResult {
    match op {
        "!" | "not" => Ok(Value::Bool(!operand.to_bool())),
        "-" => match to_number(operand)? {
            Number::Int(i) => Ok(i
                .checked_neg()
                .map(Value::Int)
                .unwrap_or(Value::Float(-(i as f64)))),
            Number::Float(f) => Ok(Value::Float(-f)),
        },
        "+" => Ok(to_number(operand)?.into_value()),
        _ => Err(ExpressionError::UnknownMethod(op.to_string())),
    }
}

fn arithmetic(
    left: Number,
    right: Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Value {
    match (left, right) {
        // Integer overflow degrades to float
        (Number::Int(a), Number::Int(b)) => int_op(a, b)
            .map(Value::Int)
            .unwrap_or_else(|| Value::Float(float_op(a as f64, b as f64))),
        _ => Value::Float(float_op(left.as_f64(), right.as_f64())),
    }
}

fn binary(op: &str, left: &Value, right: &Value) -> EvalResult {
    match op {
        "~" => Ok(Value::String(stringify(left)? + &stringify(right)?)),
        "+" => Ok(arithmetic(
            to_number(left)?,
            to_number(right)?,
            i64::checked_add,
            |a, b| a + b,
        )),
        "-" => Ok(arithmetic(
            to_number(left)?,
            to_number(right)?,
            i64::checked_sub,
            |a, b| a - b,
        )),
        "*" => Ok(arithmetic(
            to_number(left)?,
            to_number(right)?,
            i64::checked_mul,
            |a, b| a * b,
        )),
        "/" => {
            let (a, b) = (to_number(left)?, to_number(right)?);
            if b.as_f64() == 0.0 {
                return Err(ExpressionError::DivisionByZero);
            }
            match (a, b) {
                (Number::Int(x), Number::Int(y)) if x.checked_rem(y) == Some(0) => {
                    Ok(Value::Int(x / y))
                }
                _ => Ok(Value::Float(a.as_f64() / b.as_f64())),
            }
        }
        "%" => {
            let a = left.to_int().ok_or_else(|| operand_error(left))?;
            let b = right.to_int().ok_or_else(|| operand_error(right))?;
            if b == 0 {
                return Err(ExpressionError::DivisionByZero);
            }
            Ok(Value::Int(a.checked_rem(b).unwrap_or(0)))
        }
        "===" => Ok(Value::Bool(left == right)),
        "!==" => Ok(Value::Bool(left != right)),
        "==" => Ok(Value::Bool(loose_eq(left, right))),
        "!=" => Ok(Value::Bool(!loose_eq(left, right))),
        "<" | ">" | "<=" | ">=" => {
            let ordering = compare(left, right)?;
            let result = match op {
                "<" => ordering == Ordering::Less,
                ">" => ordering == Ordering::Greater,
                "<=" => ordering != Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        _ => Err(ExpressionError::UnknownMethod(op.to_string())),
    }
}

fn operand_error(value: &Value) -> ExpressionError {
    ExpressionError::Type(format!("unsupported operand type {}", value.type_label()))
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, other) | (other, Value::Null) => !other.to_bool(),
        (Value::Bool(b), other) | (other, Value::Bool(b)) => *b == other.to_bool(),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            left.to_float() == right.to_float()
        }
        (Value::String(s), number @ (Value::Int(_) | Value::Float(_)))
        | (number @ (Value::Int(_) | Value::Float(_)), Value::String(s)) => {
            match numeric_string(s) {
                Some(f) => number.to_float() == Some(f),
                None => number.stringify().as_deref() == Some(s.as_str()),
            }
        }
        (Value::String(a), Value::String(b)) => match (numeric_string(a), numeric_string(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Result<Ordering, ExpressionError> {
    let incomparable = || {
        ExpressionError::Type(format!(
            "cannot compare {} with {}",
            left.type_label(),
            right.type_label()
        ))
    };

    match (left, right) {
        (Value::String(a), Value::String(b)) => match (numeric_string(a), numeric_string(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).ok_or_else(incomparable),
            _ => Ok(a.cmp(b)),
        },
        (Value::Date(a), Value::Date(b)) => Ok(a.cmp(b)),
        (Value::List(_) | Value::Date(_) | Value::Object(_), _)
        | (_, Value::List(_) | Value::Date(_) | Value::Object(_)) => Err(incomparable()),
        _ => {
            let a = to_number(left)?.as_f64();
            let b = to_number(right)?.as_f64();
            a.partial_cmp(&b).ok_or_else(incomparable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Record;
    use crate::expression::parser::parse;

    fn eval(source: &str) -> EvalResult {
        evaluate(&parse(source).unwrap(), &Bindings::new())
    }

    fn eval_with_object(source: &str) -> EvalResult {
        let customer = Record::new("Customer")
            .with("id", 42)
            .with("firstName", "Jane")
            .with("active", true)
            .into_ref();
        let mut bindings = Bindings::new();
        bindings.insert("object".to_string(), Value::Object(customer));
        evaluate(&parse(source).unwrap(), &bindings)
    }

    #[test]
    fn test_accessor_methods() {
        assert_eq!(eval_with_object("object.getId()").unwrap(), Value::Int(42));
        assert_eq!(
            eval_with_object("object.getFirstName()").unwrap(),
            Value::from("Jane")
        );
        assert_eq!(
            eval_with_object("object.isActive()").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            eval_with_object("object.get('id')").unwrap(),
            Value::Int(42)
        );
        assert_eq!(eval_with_object("object.id").unwrap(), Value::Int(42));
    }

    #[test]
    fn test_unknown_accessor() {
        let err = eval_with_object("object.getMissing()").unwrap_err();
        assert!(matches!(err, ExpressionError::UnknownMethod(_)));
    }

    #[test]
    fn test_unknown_variable() {
        assert_eq!(
            eval("user.getId()").unwrap_err(),
            ExpressionError::UnknownVariable("user".to_string())
        );
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(
            eval_with_object("'user-' ~ object.getId()").unwrap(),
            Value::from("user-42")
        );
        assert_eq!(
            eval_with_object("upper(object.firstName) ~ '!'").unwrap(),
            Value::from("JANE!")
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Value::Int(7));
        assert_eq!(eval("10 / 4").unwrap(), Value::Float(2.5));
        assert_eq!(eval("10 / 5").unwrap(), Value::Int(2));
        assert_eq!(eval("7 % 3").unwrap(), Value::Int(1));
        assert_eq!(eval("'3' + 4").unwrap(), Value::Int(7));
        assert_eq!(eval("-(2 + 3)").unwrap(), Value::Int(-5));
        assert_eq!(eval("1 / 0").unwrap_err(), ExpressionError::DivisionByZero);
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval("1 == '1'").unwrap(), Value::Bool(true));
        assert_eq!(eval("1 === '1'").unwrap(), Value::Bool(false));
        assert_eq!(eval("'abc' == 0").unwrap(), Value::Bool(false));
        assert_eq!(eval("null == false").unwrap(), Value::Bool(true));
        assert_eq!(eval("2 >= 2 and not (1 > 2)").unwrap(), Value::Bool(true));
        assert_eq!(eval("'b' > 'a' || false").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_conditional_and_lists() {
        assert_eq!(eval("true ? 'yes' : 'no'").unwrap(), Value::from("yes"));
        assert_eq!(
            eval("[1, 'two'][1]").unwrap(),
            Value::from("two")
        );
        assert_eq!(eval("length([1, 2, 3])").unwrap(), Value::Int(3));
        assert_eq!(eval("[1][5]").unwrap(), Value::Null);
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("trim('  x ')").unwrap(), Value::from("x"));
        assert_eq!(eval("lower('ABC')").unwrap(), Value::from("abc"));
        assert_eq!(eval("concat('a', 1, true)").unwrap(), Value::from("a11"));
        assert!(matches!(
            eval("shout('x')").unwrap_err(),
            ExpressionError::UnknownMethod(_)
        ));
    }

    #[test]
    fn test_object_in_string_context_fails() {
        let err = eval_with_object("'x' ~ object").unwrap_err();
        assert!(matches!(err, ExpressionError::Type(_)));
    }
}
