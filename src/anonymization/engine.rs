//! Main anonymization engine
//!
//! This module provides the [`Anonymizer`] that walks an entity graph and
//! rewrites every field its metadata names.
//!
//! # Traversal
//!
//! Each field is classified from the value its accessor currently returns:
//! - **Collection**: a list. Entity elements are anonymized recursively;
//!   scalar elements are replaced one by one with the field's rule.
//! - **Nested object**: an entity or a date. Entities are anonymized
//!   recursively. A date with a rule is written like a leaf first.
//! - **Leaf**: anything else, including fields without an accessor. A leaf
//!   without a rule is logged as an error and left unchanged.
//!
//! Each entity is processed at most once per call, so cyclic graphs
//! terminate. Errors abort the pass without rolling back fields already
//! written.
//!
//! # Examples
//!
//! ```
//! use veil::anonymization::{Anonymizer, RuleRegistry};
//! use veil::domain::{FieldRule, Record, Value};
//! use veil::generator::FakerGenerator;
//!
//! let rules = RuleRegistry::new()
//!     .rule("Customer", "email", FieldRule::faker("safeEmail").unique())
//!     .rule("Customer", "note", FieldRule::clear());
//!
//! let anonymizer = Anonymizer::builder(rules)
//!     .generator(FakerGenerator::seeded(42))
//!     .build();
//!
//! let customer = Record::new("Customer")
//!     .with("email", "jane@example.com")
//!     .with("note", "VIP")
//!     .into_ref();
//! anonymizer.anonymize(&customer).unwrap();
//!
//! assert_ne!(customer.borrow().get("email"), Some(Value::from("jane@example.com")));
//! assert_eq!(customer.borrow().get("note"), Some(Value::Null));
//! ```

use super::audit::AuditLogger;
use super::hooks::{AfterAnonymize, AnonymizeHooks, BeforeAnonymize, HookDispatcher};
use super::metadata::MetadataResolver;
use super::strategy::{LeafStrategy, Resolved};
use super::writer::TypeCoercionWriter;
use crate::config::VeilConfig;
use crate::domain::{
    entity_id, snapshot, Entity, EntityRef, FieldRule, Result, TypeKind, Value, VeilError,
};
use crate::expression::ExpressionEvaluator;
use crate::generator::{FakerGenerator, SharedRegistry, UniqueRegistry, ValueGenerator};
use std::cell::Ref;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::{debug, error, warn};

/// Default number of attempts for unique generation
pub const DEFAULT_MAX_RETRIES: usize = 10_000;

/// Per-call generation settings, passed unchanged to nested entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnonymizeOptions {
    /// Clear the uniqueness registry before each unique generation
    pub reset: bool,
    /// Attempts per unique value before giving up
    pub max_retries: usize,
}

impl Default for AnonymizeOptions {
    fn default() -> Self {
        Self {
            reset: false,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Shape of a field's current value
enum FieldShape {
    Leaf,
    Collection(Vec<Value>),
    Nested(Value),
}

/// Metadata-driven anonymization engine
///
/// Single-threaded: entities are shared through `Rc` handles. Engines on
/// different threads can still share one uniqueness registry through
/// [`AnonymizerBuilder::registry`].
pub struct Anonymizer {
    resolver: Rc<dyn MetadataResolver>,
    generator: Rc<dyn ValueGenerator>,
    hooks: HookDispatcher,
    registry: SharedRegistry,
    evaluator: ExpressionEvaluator,
    writer: TypeCoercionWriter,
    defaults: AnonymizeOptions,
}

impl Anonymizer {
    /// Engine with a Faker generator, no listeners and a private registry
    pub fn new(resolver: impl MetadataResolver + 'static) -> Self {
        Self::builder(resolver).build()
    }

    pub fn builder(resolver: impl MetadataResolver + 'static) -> AnonymizerBuilder {
        AnonymizerBuilder::new(Rc::new(resolver))
    }

    /// Build an engine from configuration
    ///
    /// Seeds and localizes the Faker generator, applies the default
    /// retry budget and attaches an [`AuditLogger`] when auditing is
    /// enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the audit log
    /// directory cannot be created.
    pub fn from_config(
        config: &VeilConfig,
        resolver: impl MetadataResolver + 'static,
    ) -> Result<Self> {
        config.validate().map_err(|e| {
            VeilError::Configuration(format!("Configuration validation failed: {e}"))
        })?;

        let generator = match config.anonymizer.seed {
            Some(seed) => FakerGenerator::seeded(seed),
            None => FakerGenerator::new(),
        }
        .with_locale(&config.anonymizer.locale)?;

        let mut builder = Self::builder(resolver)
            .generator(generator)
            .reset(config.anonymizer.reset)
            .max_retries(config.anonymizer.max_retries);

        if config.audit.enabled {
            let logger = AuditLogger::new(
                config.audit.log_path.clone(),
                config.audit.json_format,
                true,
            )?;
            builder = builder.hook(Rc::new(logger));
        }

        Ok(builder.build())
    }

    /// Registry shared by every unique generation of this engine
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Options used by [`anonymize`](Self::anonymize)
    pub fn options(&self) -> AnonymizeOptions {
        self.defaults
    }

    /// Anonymize an entity graph with the engine's default options
    pub fn anonymize(&self, entity: &EntityRef) -> Result<()> {
        self.anonymize_with(entity, self.defaults)
    }

    /// Anonymize an entity graph with explicit options
    pub fn anonymize_with(&self, entity: &EntityRef, options: AnonymizeOptions) -> Result<()> {
        let mut visited = HashSet::new();
        self.anonymize_entity(entity, options, &mut visited)?;
        debug!(entities = visited.len(), "Anonymization pass complete");
        Ok(())
    }

    fn anonymize_entity(
        &self,
        entity: &EntityRef,
        options: AnonymizeOptions,
        visited: &mut HashSet<usize>,
    ) -> Result<()> {
        let type_name = borrow(entity)?.type_name().to_string();
        if !visited.insert(entity_id(entity)) {
            debug!(entity_type = %type_name, "Entity already anonymized in this pass, skipping");
            return Ok(());
        }

        self.hooks.before_anonymize(&BeforeAnonymize { entity })?;
        let original = snapshot(entity);
        let rules = self.resolver.resolve(&type_name)?;
        debug!(entity_type = %type_name, fields = rules.len(), "Anonymizing entity");

        for (field, rule) in rules.iter() {
            match classify(entity, field)? {
                FieldShape::Collection(items) => {
                    self.anonymize_collection(entity, &type_name, field, rule, items, options, visited)?
                }
                FieldShape::Nested(value) => {
                    self.anonymize_nested(entity, field, rule, value, options, visited)?
                }
                FieldShape::Leaf => match rule {
                    Some(rule) => self.apply_rule(entity, field, rule, options)?,
                    None => missing_rule(&type_name, field),
                },
            }
        }

        self.hooks.after_anonymize(&AfterAnonymize {
            entity,
            original: &original,
            rules: &rules,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn anonymize_collection(
        &self,
        entity: &EntityRef,
        type_name: &str,
        field: &str,
        rule: Option<&FieldRule>,
        items: Vec<Value>,
        options: AnonymizeOptions,
        visited: &mut HashSet<usize>,
    ) -> Result<()> {
        let mut updated = items.clone();
        let mut changed = false;
        let mut reported = false;
        // Set once a rule yields a whole list; later scalars are left alone
        let mut replacement: Option<Value> = None;

        for (index, item) in items.iter().enumerate() {
            match item {
                Value::Object(child) => self.anonymize_entity(child, options, visited)?,
                Value::Date(_) => {}
                _ if replacement.is_some() => {}
                scalar => {
                    let Some(rule) = rule else {
                        if !reported {
                            missing_rule(type_name, field);
                            reported = true;
                        }
                        continue;
                    };

                    let kind = TypeKind::of(scalar).unwrap_or(TypeKind::String);
                    match self.strategy().resolve(entity, kind, rule, options)? {
                        Resolved::Coerced(list @ Value::List(_)) => {
                            warn!(
                                entity_type = %type_name,
                                field = %field,
                                "Rule produced a list for a collection element, replacing the whole field"
                            );
                            replacement = Some(list);
                        }
                        Resolved::Coerced(value) => {
                            updated[index] = self.writer.coerce(kind, value)?;
                            changed = true;
                        }
                        Resolved::Direct(value) => {
                            updated[index] = value;
                            changed = true;
                        }
                    }
                }
            }
        }

        if let Some(list) = replacement {
            let field_kind = field_kind(entity, field, TypeKind::Array)?;
            return self.writer.write(entity, field, field_kind, list);
        }
        if changed {
            self.writer.assign(entity, field, Value::List(updated))?;
        }
        Ok(())
    }

    fn anonymize_nested(
        &self,
        entity: &EntityRef,
        field: &str,
        rule: Option<&FieldRule>,
        value: Value,
        options: AnonymizeOptions,
        visited: &mut HashSet<usize>,
    ) -> Result<()> {
        match (value, rule) {
            (Value::Date(_), Some(rule)) => {
                self.apply_rule(entity, field, rule, options)?;
                // The rule may have replaced the date with an entity
                let current = borrow(entity)?.get(field);
                if let Some(Value::Object(child)) = current {
                    return self.anonymize_entity(&child, options, visited);
                }
                Ok(())
            }
            (Value::Object(child), _) => self.anonymize_entity(&child, options, visited),
            _ => Ok(()),
        }
    }

    fn apply_rule(
        &self,
        entity: &EntityRef,
        field: &str,
        rule: &FieldRule,
        options: AnonymizeOptions,
    ) -> Result<()> {
        let kind = field_kind(entity, field, TypeKind::String)?;
        match self.strategy().resolve(entity, kind, rule, options)? {
            Resolved::Coerced(value) => self.writer.write(entity, field, kind, value),
            Resolved::Direct(value) => self.writer.assign(entity, field, value),
        }
    }

    fn strategy(&self) -> LeafStrategy<'_> {
        LeafStrategy {
            generator: self.generator.as_ref(),
            registry: &self.registry,
            evaluator: &self.evaluator,
        }
    }
}

fn borrow(entity: &EntityRef) -> Result<Ref<'_, dyn Entity>> {
    entity
        .try_borrow()
        .map_err(|_| VeilError::Entity("entity is mutably borrowed elsewhere".to_string()))
}

fn classify(entity: &EntityRef, field: &str) -> Result<FieldShape> {
    let shape = match borrow(entity)?.get(field) {
        Some(Value::List(items)) => FieldShape::Collection(items),
        Some(value) if value.is_object() => FieldShape::Nested(value),
        _ => FieldShape::Leaf,
    };
    Ok(shape)
}

/// Declared kind of a field, `fallback` when the entity cannot tell
fn field_kind(entity: &EntityRef, field: &str, fallback: TypeKind) -> Result<TypeKind> {
    Ok(borrow(entity)?.field_type(field).unwrap_or(fallback))
}

fn missing_rule(type_name: &str, field: &str) {
    error!(
        entity_type = %type_name,
        field = %field,
        "The attribute {} has no field rule and is not an object",
        field
    );
}

/// Builder for [`Anonymizer`]
pub struct AnonymizerBuilder {
    resolver: Rc<dyn MetadataResolver>,
    generator: Option<Rc<dyn ValueGenerator>>,
    hooks: HookDispatcher,
    registry: Option<SharedRegistry>,
    defaults: AnonymizeOptions,
}

impl AnonymizerBuilder {
    fn new(resolver: Rc<dyn MetadataResolver>) -> Self {
        Self {
            resolver,
            generator: None,
            hooks: HookDispatcher::new(),
            registry: None,
            defaults: AnonymizeOptions::default(),
        }
    }

    pub fn generator(mut self, generator: impl ValueGenerator + 'static) -> Self {
        self.generator = Some(Rc::new(generator));
        self
    }

    /// Add a listener; listeners run in the order they are added
    pub fn hook(mut self, listener: Rc<dyn AnonymizeHooks>) -> Self {
        self.hooks.add(listener);
        self
    }

    /// Share a uniqueness registry with other engines
    pub fn registry(mut self, registry: SharedRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn reset(mut self, reset: bool) -> Self {
        self.defaults.reset = reset;
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.defaults.max_retries = max_retries;
        self
    }

    pub fn build(self) -> Anonymizer {
        Anonymizer {
            resolver: self.resolver,
            generator: self
                .generator
                .unwrap_or_else(|| Rc::new(FakerGenerator::new())),
            hooks: self.hooks,
            registry: self.registry.unwrap_or_else(UniqueRegistry::shared),
            evaluator: ExpressionEvaluator,
            writer: TypeCoercionWriter,
            defaults: self.defaults,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymization::RuleRegistry;
    use crate::domain::Record;
    use crate::generator::GeneratorArgs;

    struct Constant(Value);

    impl ValueGenerator for Constant {
        fn generate(&self, _pattern: &str, _args: &GeneratorArgs) -> Result<Value> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_builder_defaults() {
        let anonymizer = Anonymizer::new(RuleRegistry::new());
        assert_eq!(anonymizer.options(), AnonymizeOptions::default());
        assert_eq!(anonymizer.options().max_retries, DEFAULT_MAX_RETRIES);
        assert!(anonymizer.registry().lock().unwrap().is_empty());
    }

    #[test]
    fn test_leaf_written_with_declared_kind() {
        let rules = RuleRegistry::new().rule("Customer", "age", FieldRule::faker("anything"));
        let anonymizer = Anonymizer::builder(rules)
            .generator(Constant(Value::from("27")))
            .build();

        let customer = Record::new("Customer").with("age", 40).into_ref();
        anonymizer.anonymize(&customer).unwrap();
        assert_eq!(customer.borrow().get("age"), Some(Value::Int(27)));
    }

    #[test]
    fn test_field_without_accessor_is_leaf() {
        let rules = RuleRegistry::new().rule("Customer", "missing", FieldRule::clear());
        let anonymizer = Anonymizer::new(rules);

        let customer = Record::new("Customer").into_ref();
        let err = anonymizer.anonymize(&customer).unwrap_err();
        assert!(matches!(err, VeilError::Entity(_)));
    }

    #[test]
    fn test_cycle_terminates() {
        let rules = RuleRegistry::new()
            .rule("Node", "label", FieldRule::fixed("x").unwrap())
            .field("Node", "next");
        let anonymizer = Anonymizer::new(rules);

        let a = Record::new("Node")
            .with("label", "a")
            .with("next", Value::Null)
            .into_ref();
        let b = Record::new("Node")
            .with("label", "b")
            .with("next", Value::Object(a.clone()))
            .into_ref();
        a.borrow_mut().set("next", Value::Object(b.clone())).unwrap();

        anonymizer.anonymize(&a).unwrap();
        assert_eq!(a.borrow().get("label"), Some(Value::from("x")));
        assert_eq!(b.borrow().get("label"), Some(Value::from("x")));

        // Break the cycle so the records are freed
        a.borrow_mut().set("next", Value::Null).unwrap();
    }

    #[test]
    fn test_date_replaced_by_entity_is_traversed() {
        let address = Record::new("Address").with("city", "Oslo").into_ref();
        let rules = RuleRegistry::new()
            .rule("Customer", "since", FieldRule::faker("anything"))
            .rule("Address", "city", FieldRule::fixed("Nowhere").unwrap());
        let anonymizer = Anonymizer::builder(rules)
            .generator(Constant(Value::Object(address.clone())))
            .build();

        let customer = Record::new("Customer")
            .with("since", Value::Date(chrono::Utc::now()))
            .into_ref();
        anonymizer.anonymize(&customer).unwrap();

        assert_eq!(address.borrow().get("city"), Some(Value::from("Nowhere")));
    }
}
