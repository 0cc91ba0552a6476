//! Field rules
//!
//! A [`FieldRule`] says how one field is anonymized. Rules for a type come
//! from a metadata resolver as an ordered [`FieldRules`] set.

use super::errors::VeilError;
use super::result::Result;
use super::value::Value;
use crate::expression::Expression;
use crate::generator::GeneratorArgs;

/// Marker that turns a fixed string value into an expression
pub const EXPRESSION_MARKER: &str = "@=";

/// Fixed value of a rule, classified once when the rule is built
#[derive(Debug, Clone, Default)]
pub enum FixedValue {
    /// No fixed value; distinct from an explicit `Null`
    #[default]
    NotProvided,
    /// Written verbatim to array fields
    Array(Vec<Value>),
    /// Prefixed, stringified and coerced on write
    Scalar(Value),
    /// Evaluated against the entity on every write
    Expression(Expression),
}

impl FixedValue {
    /// Classify a raw fixed value
    ///
    /// Strings starting with `@=` are compiled as expressions here, so a
    /// malformed expression fails at rule construction.
    pub fn classify(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => Ok(Self::Array(items)),
            Value::String(s) if s.starts_with(EXPRESSION_MARKER) => {
                let expression = Expression::parse(&s[EXPRESSION_MARKER.len()..])?;
                Ok(Self::Expression(expression))
            }
            Value::Object(_) => Err(VeilError::InvalidArgument(
                "fixed values cannot hold entities".to_string(),
            )),
            other => Ok(Self::Scalar(other)),
        }
    }

    pub fn is_provided(&self) -> bool {
        !matches!(self, Self::NotProvided)
    }
}

/// How a single field is anonymized
///
/// Resolution priority: fixed value, then unique generation, then clearing
/// (no pattern), then pattern-based generation.
///
/// # Examples
///
/// ```
/// use veil::domain::FieldRule;
///
/// let email = FieldRule::faker("safeEmail").unique();
/// let code = FieldRule::faker("randomNumber").arg("digits", 6).prefix("C-");
/// let id_copy = FieldRule::fixed("@=object.getId()").unwrap();
/// let erased = FieldRule::clear();
/// # let _ = (email, code, id_copy, erased);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldRule {
    faker: Option<String>,
    args: GeneratorArgs,
    unique: bool,
    prefix: Option<String>,
    value: FixedValue,
}

impl FieldRule {
    /// Rule that clears the field
    pub fn clear() -> Self {
        Self::default()
    }

    /// Rule generating values from a named pattern
    pub fn faker(pattern: impl Into<String>) -> Self {
        Self {
            faker: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// Rule writing a fixed value, or an expression when it starts with `@=`
    pub fn fixed(value: impl Into<Value>) -> Result<Self> {
        Self::default().with_value(value)
    }

    /// Set the fixed value on an existing rule
    pub fn with_value(mut self, value: impl Into<Value>) -> Result<Self> {
        self.value = FixedValue::classify(value.into())?;
        Ok(self)
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name, value);
        self
    }

    pub fn args(mut self, args: GeneratorArgs) -> Self {
        self.args = args;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn pattern(&self) -> Option<&str> {
        self.faker.as_deref()
    }

    pub fn generator_args(&self) -> &GeneratorArgs {
        &self.args
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Prefix, empty when none was set
    pub fn prefix_str(&self) -> &str {
        self.prefix.as_deref().unwrap_or_default()
    }

    pub fn value(&self) -> &FixedValue {
        &self.value
    }
}

/// Ordered field-name to rule mapping for one type
///
/// A field may be listed without a rule so the engine still visits it,
/// which is how nested objects and collections get traversed.
#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    entries: Vec<(String, Option<FieldRule>)>,
}

impl FieldRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field's rule, keeping its original position
    pub fn insert(&mut self, field: impl Into<String>, rule: Option<FieldRule>) {
        let field = field.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = rule,
            None => self.entries.push((field, rule)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldRule> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .and_then(|(_, rule)| rule.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&FieldRule>)> {
        self.entries
            .iter()
            .map(|(name, rule)| (name.as_str(), rule.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Option<FieldRule>)> for FieldRules {
    fn from_iter<I: IntoIterator<Item = (String, Option<FieldRule>)>>(iter: I) -> Self {
        let mut rules = FieldRules::new();
        for (field, rule) in iter {
            rules.insert(field, rule);
        }
        rules
    }
}
