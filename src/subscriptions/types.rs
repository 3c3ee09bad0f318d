//! Subscription types for property change notification.

use crate::types::{count_kind, Shape, ShapeKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};
use std::time::Duration;

use super::manager::ListenerRegistry;

/// An observable property of the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Property {
    /// The record sequence.
    Records,
    /// Number of squares.
    SquareCount,
    /// Number of circles.
    CircleCount,
}

impl Property {
    /// Every property, in notification order.
    pub const ALL: [Property; 3] = [
        Property::Records,
        Property::SquareCount,
        Property::CircleCount,
    ];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Property::Records => "records",
            Property::SquareCount => "squareCount",
            Property::CircleCount => "circleCount",
        }
    }

    /// Compute the current value of this property from `records`.
    pub fn compute(self, records: &[Shape]) -> PropertyValue {
        match self {
            Property::Records => PropertyValue::Records(records.to_vec()),
            Property::SquareCount => PropertyValue::Count(count_kind(records, ShapeKind::Square)),
            Property::CircleCount => PropertyValue::Count(count_kind(records, ShapeKind::Circle)),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Property {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "records" | "shapes" => Ok(Property::Records),
            "squareCount" | "squaresCount" => Ok(Property::SquareCount),
            "circleCount" | "circlesCount" => Ok(Property::CircleCount),
            other => Err(other.to_string()),
        }
    }
}

/// Value delivered to listeners.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Records(Vec<Shape>),
    Count(usize),
}

impl PropertyValue {
    pub fn as_records(&self) -> Option<&[Shape]> {
        match self {
            PropertyValue::Records(records) => Some(records),
            PropertyValue::Count(_) => None,
        }
    }

    pub fn as_count(&self) -> Option<usize> {
        match self {
            PropertyValue::Count(n) => Some(*n),
            PropertyValue::Records(_) => None,
        }
    }
}

/// Whether a listener wants further deliveries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerStatus {
    Active,
    /// The listener is finished and should be removed.
    Closed,
}

/// A registered listener.
pub type Listener = Arc<dyn Fn(&PropertyValue) -> ListenerStatus + Send + Sync>;

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle returned by `subscribe`.
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription {
    id: SubscriptionId,
    property: Property,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        property: Property,
        registry: Weak<ListenerRegistry>,
    ) -> Self {
        Self {
            id,
            property,
            registry,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn property(&self) -> Property {
        self.property
    }

    /// Stop deliveries to this listener.
    ///
    /// Returns true if the listener was still registered. Calling it again,
    /// or after the store is gone, is a no-op.
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.unregister(self.property, self.id),
            None => false,
        }
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.is_registered(self.property, self.id))
            .unwrap_or(false)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("property", &self.property)
            .finish()
    }
}

/// Channel-backed subscription.
pub struct Watch {
    pub subscription: Subscription,
    /// Channel to receive values.
    pub receiver: crossbeam_channel::Receiver<PropertyValue>,
}

impl Watch {
    /// Receive the next value (blocking).
    pub fn recv(&self) -> Result<PropertyValue, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a value (non-blocking).
    pub fn try_recv(&self) -> Result<PropertyValue, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<PropertyValue, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain every value currently buffered.
    pub fn drain(&self) -> Vec<PropertyValue> {
        self.receiver.try_iter().collect()
    }

    pub fn unsubscribe(&self) -> bool {
        self.subscription.unsubscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_names_round_trip() {
        for property in Property::ALL {
            assert_eq!(property.name().parse::<Property>(), Ok(property));
        }
    }

    #[test]
    fn test_property_aliases() {
        assert_eq!("shapes".parse::<Property>(), Ok(Property::Records));
        assert_eq!("squaresCount".parse::<Property>(), Ok(Property::SquareCount));
        assert_eq!("circlesCount".parse::<Property>(), Ok(Property::CircleCount));
        assert_eq!("triangles".parse::<Property>(), Err("triangles".to_string()));
    }

    #[test]
    fn test_compute_counts() {
        let records = vec![
            Shape::square("a", "#111111"),
            Shape::square("b", "#222222"),
            Shape::circle("c", "#333333"),
        ];

        assert_eq!(Property::SquareCount.compute(&records).as_count(), Some(2));
        assert_eq!(Property::CircleCount.compute(&records).as_count(), Some(1));
        assert_eq!(
            Property::Records.compute(&records).as_records().map(|r| r.len()),
            Some(3)
        );
    }

    #[test]
    fn test_unsubscribe_after_registry_dropped() {
        let registry = Arc::new(ListenerRegistry::new());
        let id = registry.register(Property::Records, |_| ListenerStatus::Active);
        let sub = Subscription::new(id, Property::Records, Arc::downgrade(&registry));

        drop(registry);
        assert!(!sub.is_active());
        assert!(!sub.unsubscribe());
    }
}
