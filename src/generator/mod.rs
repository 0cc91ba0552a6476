//! Synthetic value generation
//!
//! The engine only sees the [`ValueGenerator`] trait: generate a value for
//! a named pattern, or generate one that has not been handed out before.
//! [`FakerGenerator`] is the bundled implementation backed by the `fake`
//! crate.

mod faker;
mod unique;

pub use faker::{FakerGenerator, SUPPORTED_LOCALES};
pub use unique::{SharedRegistry, UniqueRegistry};

use crate::domain::{Result, Value, VeilError};
use std::collections::BTreeMap;
use tracing::debug;

/// Named arguments passed to a generation pattern
///
/// # Examples
///
/// ```
/// use veil::generator::GeneratorArgs;
///
/// let mut args = GeneratorArgs::new();
/// args.insert("min", 10).insert("max", 20);
/// assert_eq!(args.get_int("min").unwrap(), Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratorArgs {
    values: BTreeMap<String, Value>,
}

impl GeneratorArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Integer argument, `None` when absent
    pub fn get_int(&self, name: &str) -> Result<Option<i64>> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Int(i)) => Ok(Some(*i)),
            Some(Value::Float(f)) if f.fract() == 0.0 => Ok(Some(*f as i64)),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| {
                VeilError::InvalidArgument(format!("'{name}' must be an integer, got \"{s}\""))
            }),
            Some(other) => Err(VeilError::InvalidArgument(format!(
                "'{name}' must be an integer, got {}",
                other.type_label()
            ))),
        }
    }

    /// Float argument, `None` when absent
    pub fn get_float(&self, name: &str) -> Result<Option<f64>> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value @ (Value::Int(_) | Value::Float(_) | Value::String(_))) => {
                Ok(value.to_float())
            }
            Some(other) => Err(VeilError::InvalidArgument(format!(
                "'{name}' must be a number, got {}",
                other.type_label()
            ))),
        }
    }

    /// List argument, `None` when absent
    pub fn get_list(&self, name: &str) -> Result<Option<&[Value]>> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::List(items)) => Ok(Some(items)),
            Some(other) => Err(VeilError::InvalidArgument(format!(
                "'{name}' must be a list, got {}",
                other.type_label()
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for GeneratorArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = GeneratorArgs::new();
        for (name, value) in iter {
            args.insert(name, value);
        }
        args
    }
}

/// Source of synthetic values
pub trait ValueGenerator {
    /// Generate a value for a named pattern
    fn generate(&self, pattern: &str, args: &GeneratorArgs) -> Result<Value>;

    /// Generate a value not yet recorded for `pattern` in `registry`
    ///
    /// With `reset` the registry is cleared first. Fails with
    /// [`VeilError::GenerationExhausted`] after `max_retries` collisions.
    fn generate_unique(
        &self,
        registry: &mut UniqueRegistry,
        pattern: &str,
        args: &GeneratorArgs,
        reset: bool,
        max_retries: usize,
    ) -> Result<Value> {
        if reset {
            registry.reset();
        }

        for attempt in 1..=max_retries {
            let value = self.generate(pattern, args)?;
            if registry.insert(pattern, &value) {
                return Ok(value);
            }
            debug!(pattern = %pattern, attempt, "Generated value already used, retrying");
        }

        Err(VeilError::GenerationExhausted {
            pattern: pattern.to_string(),
            max_retries,
        })
    }
}
