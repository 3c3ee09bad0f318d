//! Listener registry for dispatching property changes.

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{Listener, ListenerStatus, Property, PropertyValue, SubscriptionId};

/// What happens when a listener panics during dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListenerErrorPolicy {
    /// The panic unwinds out of the mutating call. Listeners not yet
    /// reached are skipped and the state is not persisted.
    Propagate,
    /// Each listener runs under `catch_unwind`; a panic is logged and the
    /// remaining listeners still run.
    #[default]
    Isolate,
}

/// Registered listeners, grouped by property.
///
/// Delivery order within a property is unspecified.
pub struct ListenerRegistry {
    /// Active listeners by property and ID.
    listeners: RwLock<HashMap<Property, HashMap<SubscriptionId, Listener>>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener for `property`.
    pub fn register<F>(&self, property: Property, listener: F) -> SubscriptionId
    where
        F: Fn(&PropertyValue) -> ListenerStatus + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners
            .write()
            .entry(property)
            .or_default()
            .insert(id, Arc::new(listener));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unregister(&self, property: Property, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(set) = listeners.get_mut(&property) else {
            return false;
        };
        let removed = set.remove(&id).is_some();
        if set.is_empty() {
            listeners.remove(&property);
        }
        removed
    }

    pub fn is_registered(&self, property: Property, id: SubscriptionId) -> bool {
        self.listeners
            .read()
            .get(&property)
            .map(|set| set.contains_key(&id))
            .unwrap_or(false)
    }

    /// Number of listeners for `property`.
    pub fn count(&self, property: Property) -> usize {
        self.listeners
            .read()
            .get(&property)
            .map(|set| set.len())
            .unwrap_or(0)
    }

    /// Whether anyone listens to `property`.
    pub fn has_listeners(&self, property: Property) -> bool {
        self.count(property) > 0
    }

    /// Invoke a single listener directly (used for replay on subscribe).
    ///
    /// Returns false if the listener panicked under [`ListenerErrorPolicy::Isolate`].
    pub fn deliver_to(
        &self,
        property: Property,
        id: SubscriptionId,
        value: &PropertyValue,
        policy: ListenerErrorPolicy,
    ) -> bool {
        let listener = self
            .listeners
            .read()
            .get(&property)
            .and_then(|set| set.get(&id).cloned());

        match listener {
            Some(listener) => self.invoke(property, id, &listener, value, policy),
            None => true,
        }
    }

    /// Deliver `value` to every listener of `property`.
    ///
    /// The lock is not held while listeners run, so a listener may read
    /// the store, unsubscribe, or subscribe. A listener removed by an
    /// earlier listener in the same round is skipped. Returns the number
    /// of listeners that panicked.
    pub fn dispatch(
        &self,
        property: Property,
        value: &PropertyValue,
        policy: ListenerErrorPolicy,
    ) -> usize {
        let targets: Vec<(SubscriptionId, Listener)> = match self.listeners.read().get(&property) {
            Some(set) => set.iter().map(|(id, l)| (*id, Arc::clone(l))).collect(),
            None => return 0,
        };

        let mut failures = 0;
        for (id, listener) in targets {
            if !self.is_registered(property, id) {
                continue;
            }
            if !self.invoke(property, id, &listener, value, policy) {
                failures += 1;
            }
        }
        failures
    }

    fn invoke(
        &self,
        property: Property,
        id: SubscriptionId,
        listener: &Listener,
        value: &PropertyValue,
        policy: ListenerErrorPolicy,
    ) -> bool {
        let status = match policy {
            ListenerErrorPolicy::Propagate => listener(value),
            ListenerErrorPolicy::Isolate => {
                match panic::catch_unwind(AssertUnwindSafe(|| listener(value))) {
                    Ok(status) => status,
                    Err(payload) => {
                        tracing::error!(
                            property = %property,
                            subscription = id.0,
                            "listener panicked: {}",
                            panic_message(payload.as_ref())
                        );
                        return false;
                    }
                }
            }
        };

        if status == ListenerStatus::Closed {
            self.unregister(property, id);
        }
        true
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_listener(
        counter: &Arc<AtomicUsize>,
    ) -> impl Fn(&PropertyValue) -> ListenerStatus + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            ListenerStatus::Active
        }
    }

    #[test]
    fn test_register_unregister() {
        let registry = ListenerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let id = registry.register(Property::Records, counter_listener(&calls));
        assert_eq!(registry.count(Property::Records), 1);
        assert!(registry.is_registered(Property::Records, id));

        assert!(registry.unregister(Property::Records, id));
        assert!(!registry.unregister(Property::Records, id));
        assert_eq!(registry.count(Property::Records), 0);
    }

    #[test]
    fn test_dispatch_only_reaches_property() {
        let registry = ListenerRegistry::new();
        let squares = Arc::new(AtomicUsize::new(0));
        let circles = Arc::new(AtomicUsize::new(0));

        registry.register(Property::SquareCount, counter_listener(&squares));
        registry.register(Property::CircleCount, counter_listener(&circles));

        registry.dispatch(
            Property::SquareCount,
            &PropertyValue::Count(1),
            ListenerErrorPolicy::Isolate,
        );

        assert_eq!(squares.load(Ordering::SeqCst), 1);
        assert_eq!(circles.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_closed_listener_is_removed() {
        let registry = ListenerRegistry::new();
        registry.register(Property::Records, |_| ListenerStatus::Closed);

        registry.dispatch(
            Property::Records,
            &PropertyValue::Records(vec![]),
            ListenerErrorPolicy::Isolate,
        );
        assert!(!registry.has_listeners(Property::Records));
    }

    #[test]
    fn test_isolate_keeps_other_listeners() {
        let registry = ListenerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        registry.register(Property::Records, |_| panic!("boom"));
        registry.register(Property::Records, counter_listener(&calls));
        registry.register(Property::Records, counter_listener(&calls));

        let failures = registry.dispatch(
            Property::Records,
            &PropertyValue::Records(vec![]),
            ListenerErrorPolicy::Isolate,
        );

        assert_eq!(failures, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // A panicking listener stays registered
        assert_eq!(registry.count(Property::Records), 3);
    }

    #[test]
    fn test_propagate_unwinds() {
        let registry = ListenerRegistry::new();
        registry.register(Property::Records, |_| panic!("boom"));

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            registry.dispatch(
                Property::Records,
                &PropertyValue::Records(vec![]),
                ListenerErrorPolicy::Propagate,
            )
        }));
        assert!(result.is_err());
    }
}
