//! Before/after notifications
//!
//! Both events fire once per anonymized entity, nested ones included.
//! Listener errors are not caught: they abort the pass.

use crate::domain::{EntityRef, FieldRules, Result};
use std::rc::Rc;

/// Fired before any field of `entity` is touched
pub struct BeforeAnonymize<'a> {
    pub entity: &'a EntityRef,
}

/// Fired after every field of `entity` has been processed
pub struct AfterAnonymize<'a> {
    pub entity: &'a EntityRef,
    /// Deep copy taken before the first field was written
    pub original: &'a EntityRef,
    /// Rules the entity was processed with
    pub rules: &'a FieldRules,
}

/// Listener for anonymization events
pub trait AnonymizeHooks {
    fn before_anonymize(&self, _event: &BeforeAnonymize<'_>) -> Result<()> {
        Ok(())
    }

    fn after_anonymize(&self, _event: &AfterAnonymize<'_>) -> Result<()> {
        Ok(())
    }
}

/// Listener that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl AnonymizeHooks for NoopHooks {}

/// Fans events out to listeners in registration order
///
/// Stops at the first listener that fails.
#[derive(Default, Clone)]
pub struct HookDispatcher {
    listeners: Vec<Rc<dyn AnonymizeHooks>>,
}

impl HookDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Rc<dyn AnonymizeHooks>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl AnonymizeHooks for HookDispatcher {
    fn before_anonymize(&self, event: &BeforeAnonymize<'_>) -> Result<()> {
        for listener in &self.listeners {
            listener.before_anonymize(event)?;
        }
        Ok(())
    }

    fn after_anonymize(&self, event: &AfterAnonymize<'_>) -> Result<()> {
        for listener in &self.listeners {
            listener.after_anonymize(event)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Record, VeilError};
    use std::cell::RefCell;

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl AnonymizeHooks for Recorder {
        fn before_anonymize(&self, event: &BeforeAnonymize<'_>) -> Result<()> {
            let type_name = event.entity.borrow().type_name().to_string();
            self.log.borrow_mut().push(format!("{}:{}", self.name, type_name));
            if self.fail {
                return Err(VeilError::Hook(format!("{} failed", self.name)));
            }
            Ok(())
        }
    }

    #[test]
    fn test_dispatch_in_order_and_stop_on_error() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = HookDispatcher::new();
        for (name, fail) in [("first", false), ("second", true), ("third", false)] {
            dispatcher.add(Rc::new(Recorder {
                name,
                log: Rc::clone(&log),
                fail,
            }));
        }

        let entity = Record::new("Customer").into_ref();
        let err = dispatcher
            .before_anonymize(&BeforeAnonymize { entity: &entity })
            .unwrap_err();

        assert!(matches!(err, VeilError::Hook(_)));
        assert_eq!(*log.borrow(), ["first:Customer", "second:Customer"]);
    }

    #[test]
    fn test_noop_hooks() {
        let entity = Record::new("Customer").into_ref();
        let rules = FieldRules::new();
        assert!(NoopHooks
            .after_anonymize(&AfterAnonymize {
                entity: &entity,
                original: &entity,
                rules: &rules,
            })
            .is_ok());
        assert!(HookDispatcher::new().is_empty());
    }
}
