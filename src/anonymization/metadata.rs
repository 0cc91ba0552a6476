//! Metadata resolution
//!
//! Maps an entity type name to the ordered field rules it is anonymized
//! with. Where the rules come from is up to the resolver.

use crate::domain::{FieldRule, FieldRules, Result};
use std::collections::HashMap;

/// Source of field rules per entity type
pub trait MetadataResolver {
    /// Rules for `type_name`. An unknown type yields an empty set.
    fn resolve(&self, type_name: &str) -> Result<FieldRules>;
}

/// In-memory rule table
///
/// # Examples
///
/// ```
/// use veil::anonymization::{MetadataResolver, RuleRegistry};
/// use veil::domain::FieldRule;
///
/// let registry = RuleRegistry::new()
///     .rule("Customer", "email", FieldRule::faker("safeEmail").unique())
///     .field("Customer", "addresses");
///
/// let rules = registry.resolve("Customer").unwrap();
/// assert_eq!(rules.len(), 2);
/// assert!(registry.resolve("Order").unwrap().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    types: HashMap<String, FieldRules>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a rule to a field
    pub fn rule(mut self, type_name: &str, field: &str, rule: FieldRule) -> Self {
        self.entry(type_name).insert(field, Some(rule));
        self
    }

    /// List a field without a rule, so nested values are still traversed
    pub fn field(mut self, type_name: &str, field: &str) -> Self {
        self.entry(type_name).insert(field, None);
        self
    }

    /// Replace all rules of a type
    pub fn register(&mut self, type_name: impl Into<String>, rules: FieldRules) {
        self.types.insert(type_name.into(), rules);
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    fn entry(&mut self, type_name: &str) -> &mut FieldRules {
        self.types.entry(type_name.to_string()).or_default()
    }
}

impl MetadataResolver for RuleRegistry {
    fn resolve(&self, type_name: &str) -> Result<FieldRules> {
        Ok(self.types.get(type_name).cloned().unwrap_or_default())
    }
}

/// Ordered list of resolvers; the first non-empty answer wins
#[derive(Default)]
pub struct ResolverChain {
    resolvers: Vec<Box<dyn MetadataResolver>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: impl MetadataResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl MetadataResolver for ResolverChain {
    fn resolve(&self, type_name: &str) -> Result<FieldRules> {
        for resolver in &self.resolvers {
            let rules = resolver.resolve(type_name)?;
            if !rules.is_empty() {
                return Ok(rules);
            }
        }
        Ok(FieldRules::new())
    }
}
