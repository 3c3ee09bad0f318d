//! Per-property subscriptions to store changes.
//!
//! Every observable value of the store is a [`Property`]: the record
//! sequence itself and the counts derived from it. Listeners register for
//! one property and are invoked synchronously, inside the mutating call,
//! whenever that property may have changed.
//!
//! Two listener styles are supported:
//! - callbacks via [`Store::subscribe`](crate::Store::subscribe)
//! - bounded channels via [`Store::watch`](crate::Store::watch)
//!
//! # Example
//!
//! ```ignore
//! let sub = store.subscribe(Property::SquareCount, |value| {
//!     println!("squares: {:?}", value.as_count());
//! });
//!
//! store.add(Shape::square(generate_id(), random_color()))?;
//! sub.unsubscribe();
//! ```

mod manager;
mod types;

pub use manager::{ListenerErrorPolicy, ListenerRegistry};
pub use types::{
    Listener, ListenerStatus, Property, PropertyValue, Subscription, SubscriptionId, Watch,
};
