//! Dynamic values and type descriptors
//!
//! Everything the engine reads from or writes to an entity is a [`Value`].
//! A field's declared type is a [`TypeKind`], which drives coercion when a
//! value is written.

use super::entity::{entity_id, EntityRef};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of an entity field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Bool,
    String,
    Int,
    Float,
    Array,
    /// Any non-builtin type: dates, nested entities
    Object,
}

impl TypeKind {
    /// The four scalar kinds that never accept an object-valued write
    pub const SCALARS: [TypeKind; 4] = [
        TypeKind::Bool,
        TypeKind::String,
        TypeKind::Int,
        TypeKind::Float,
    ];

    /// Check if this is one of the scalar kinds
    pub fn is_scalar(&self) -> bool {
        Self::SCALARS.contains(self)
    }

    /// Parse a builtin type name (`int`, `integer`, `bool`, `float`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "bool" | "boolean" => Some(Self::Bool),
            "string" | "str" => Some(Self::String),
            "int" | "integer" => Some(Self::Int),
            "float" | "double" => Some(Self::Float),
            "array" | "list" => Some(Self::Array),
            "object" | "date" | "datetime" => Some(Self::Object),
            _ => None,
        }
    }

    /// Kind of a runtime value, `None` for `Null`
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Self::Bool),
            Value::Int(_) => Some(Self::Int),
            Value::Float(_) => Some(Self::Float),
            Value::String(_) => Some(Self::String),
            Value::List(_) => Some(Self::Array),
            Value::Date(_) | Value::Object(_) => Some(Self::Object),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dynamically typed field value
///
/// `Date` and `Object` are object-valued; `List` is array-shaped and is the
/// only countable variant.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Date(DateTime<Utc>),
    Object(EntityRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Non-scalar values: dates and nested entities
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Date(_) | Value::Object(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            Value::Object(entity) => Some(entity),
            _ => None,
        }
    }

    /// Name of the variant, used in error messages
    pub fn type_label(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "array",
            Value::Date(_) => "date",
            Value::Object(_) => "object",
        }
    }

    /// String form used when a value is prefixed or concatenated.
    ///
    /// Returns `None` for entities, which have no string form.
    pub fn stringify(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(true) => Some("1".to_string()),
            Value::Bool(false) => Some(String::new()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(format_float(*f)),
            Value::String(s) => Some(s.clone()),
            Value::List(_) => Some("Array".to_string()),
            Value::Date(d) => Some(d.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Value::Object(_) => None,
        }
    }

    /// Integer cast. `None` for object values.
    pub fn to_int(&self) -> Option<i64> {
        match self {
            Value::Null => Some(0),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.is_nan() => Some(0),
            Value::Float(f) => Some(f.trunc() as i64),
            Value::String(s) => Some(parse_leading_int(s)),
            Value::List(items) => Some(i64::from(!items.is_empty())),
            Value::Date(_) | Value::Object(_) => None,
        }
    }

    /// Floating-point cast. `None` for object values.
    pub fn to_float(&self) -> Option<f64> {
        match self {
            Value::Null => Some(0.0),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => Some(parse_leading_number(s).unwrap_or(0.0)),
            Value::List(items) => Some(if items.is_empty() { 0.0 } else { 1.0 }),
            Value::Date(_) | Value::Object(_) => None,
        }
    }

    /// Boolean cast. Objects are always truthy.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !(s.is_empty() || s == "0"),
            Value::List(items) => !items.is_empty(),
            Value::Date(_) | Value::Object(_) => true,
        }
    }

    /// Stable key identifying this value inside a uniqueness set
    pub fn registry_key(&self) -> String {
        match self {
            Value::Null => "n:".to_string(),
            Value::Bool(b) => format!("b:{b}"),
            Value::Int(i) => format!("i:{i}"),
            Value::Float(f) => format!("f:{}", f.to_bits()),
            Value::String(s) => format!("s:{s}"),
            Value::List(items) => {
                let keys: Vec<String> = items.iter().map(Value::registry_key).collect();
                format!("l:[{}]", keys.join(","))
            }
            Value::Date(d) => format!("d:{}", d.timestamp_nanos_opt().unwrap_or_default()),
            Value::Object(entity) => format!("o:{:x}", entity_id(entity)),
        }
    }
}

/// Float formatting without a trailing `.0` for integral values
///
/// Integral values of 1e15 and above keep Rust's positional form
/// (`100000000000000000000`), not exponent notation.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NAN".to_string()
    } else if f.is_infinite() {
        let label = if f > 0.0 { "INF" } else { "-INF" };
        label.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{f}")
    }
}

/// Length of the numeric prefix of `s` (sign, digits, fraction, exponent)
fn numeric_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start || has_digits {
            has_digits |= frac_end > frac_start;
            end = frac_end;
        }
    }
    if !has_digits {
        return "";
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    &s[..end]
}

fn parse_leading_number(s: &str) -> Option<f64> {
    let prefix = numeric_prefix(s.trim_start());
    if prefix.is_empty() {
        return None;
    }
    prefix.parse().ok()
}

fn parse_leading_int(s: &str) -> i64 {
    let prefix = numeric_prefix(s.trim_start());
    if let Ok(i) = prefix.parse::<i64>() {
        return i;
    }
    match prefix.parse::<f64>() {
        Ok(f) if f.is_finite() => f.trunc() as i64,
        _ => 0,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => entity_id(a) == entity_id(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Date(d) => f.debug_tuple("Date").field(d).finish(),
            // Entity graphs may be cyclic, so only the type name is printed
            Value::Object(entity) => match entity.try_borrow() {
                Ok(inner) => write!(f, "Object({})", inner.type_name()),
                Err(_) => f.write_str("Object(<borrowed>)"),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<EntityRef> for Value {
    fn from(entity: EntityRef) -> Self {
        Value::Object(entity)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}
