//! # Shape Store
//!
//! An observable store of colored shapes that persists itself to a
//! durable storage slot and notifies listeners of the properties that
//! change.
//!
//! ## Core Concepts
//!
//! - **Records**: Shapes with a unique id, a fixed kind, and a mutable color
//! - **Properties**: The record sequence plus counts derived from it
//! - **Subscriptions**: Per-property listeners, replayed on subscribe
//! - **Slots**: String-keyed durable storage, overwritten on every mutation
//!
//! ## Example
//!
//! ```ignore
//! use shape_store::{
//!     generate_id, random_color, Property, Shape, ShapeKind, Store, StoreConfig,
//! };
//!
//! let store = Store::open_file(StoreConfig::default(), "./shapes")?;
//!
//! let sub = store.subscribe(Property::SquareCount, |count| {
//!     println!("squares: {:?}", count.as_count());
//! });
//!
//! store.add(Shape::square(generate_id(), random_color()))?;
//! store.recolor(ShapeKind::Square, "#000000")?;
//! sub.unsubscribe();
//! ```

pub mod error;
pub mod generate;
pub mod slot;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use error::{Result, StoreError};
pub use generate::{generate_id, random_color};
pub use slot::{FileSlot, MemorySlot, StorageSlot};
pub use store::{Store, StoreConfig, DEFAULT_STORAGE_KEY};
pub use subscriptions::{
    Listener, ListenerErrorPolicy, ListenerRegistry, ListenerStatus, Property, PropertyValue,
    Subscription, SubscriptionId, Watch,
};
pub use types::*;
