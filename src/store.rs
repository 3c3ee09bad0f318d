//! Main Store struct tying records, listeners, and the storage slot together.

use crate::error::{Result, StoreError};
use crate::slot::{FileSlot, MemorySlot, StorageSlot};
use crate::subscriptions::{
    ListenerErrorPolicy, ListenerRegistry, ListenerStatus, Property, PropertyValue, Subscription,
    Watch,
};
use crate::types::{count_kind, PersistedState, Shape, ShapeKind, StateSnapshot};
use crossbeam_channel::{bounded, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Slot key used when none is configured.
pub const DEFAULT_STORAGE_KEY: &str = "shapes-app-state";

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Key of the slot entry holding the persisted state.
    pub storage_key: String,

    /// How panicking listeners are handled during notification.
    pub listener_errors: ListenerErrorPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            listener_errors: ListenerErrorPolicy::default(),
        }
    }
}

/// Observable shape store.
///
/// Holds an ordered sequence of shapes with unique ids, writes the whole
/// sequence to a [`StorageSlot`] after every mutation, and notifies
/// listeners of each [`Property`] that may have changed.
///
/// Mutation, notification, and persistence all happen synchronously in
/// the mutating call, in that order. No lock is held while listeners run.
pub struct Store {
    /// Store configuration.
    config: StoreConfig,

    /// Durable slot for the persisted state.
    slot: Box<dyn StorageSlot>,

    /// The records, in insertion order.
    records: RwLock<Vec<Shape>>,

    /// Listeners by property (shared with subscription handles).
    listeners: Arc<ListenerRegistry>,

    /// Held across copying the records and writing the slot, so the slot
    /// always ends with the latest state.
    persist_lock: Mutex<()>,
}

impl Store {
    /// Open a store over `slot`, loading any previously persisted state.
    ///
    /// Never fails: a missing, unreadable, or malformed entry yields an
    /// empty store.
    pub fn open(config: StoreConfig, slot: impl StorageSlot + 'static) -> Self {
        let records = match Self::load(&slot, &config.storage_key) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    key = %config.storage_key,
                    error = %e,
                    "failed to load stored state, starting empty"
                );
                Vec::new()
            }
        };

        tracing::debug!(key = %config.storage_key, records = records.len(), "store opened");

        Self {
            config,
            slot: Box::new(slot),
            records: RwLock::new(records),
            listeners: Arc::new(ListenerRegistry::new()),
            persist_lock: Mutex::new(()),
        }
    }

    /// Open a store persisted in a file slot directory at `path`.
    pub fn open_file(config: StoreConfig, path: impl AsRef<Path>) -> Result<Self> {
        let slot = FileSlot::open(path)?;
        Ok(Self::open(config, slot))
    }

    /// Open an empty store over a fresh in-memory slot.
    pub fn in_memory() -> Self {
        Self::open(StoreConfig::default(), MemorySlot::new())
    }

    /// Read and validate the persisted state.
    fn load(slot: &dyn StorageSlot, key: &str) -> Result<Vec<Shape>> {
        let Some(raw) = slot.read(key)? else {
            return Ok(Vec::new());
        };

        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| StoreError::Deserialization(e.to_string()))?;

        // `shapes` is only consulted when `records` is absent
        let records = value
            .get("records")
            .or_else(|| value.get("shapes"))
            .ok_or_else(|| StoreError::InvalidFormat("missing records field".into()))?;
        if !records.is_array() {
            return Err(StoreError::InvalidFormat("records is not an array".into()));
        }

        let stored: Vec<Shape> = serde_json::from_value(records.clone())
            .map_err(|e| StoreError::Deserialization(e.to_string()))?;

        let mut seen = HashSet::new();
        let total = stored.len();
        let records: Vec<Shape> = stored
            .into_iter()
            .filter(|shape| seen.insert(shape.id.clone()))
            .collect();

        if records.len() != total {
            tracing::warn!(
                key,
                dropped = total - records.len(),
                "stored state had duplicate ids, keeping first occurrence"
            );
        }

        Ok(records)
    }

    // --- Reads ---

    /// Independent copy of the records and every derived property.
    pub fn get_state(&self) -> StateSnapshot {
        StateSnapshot::from_records(&self.records.read())
    }

    /// Copy of the records, in insertion order.
    pub fn records(&self) -> Vec<Shape> {
        self.records.read().clone()
    }

    /// Get a shape by id.
    pub fn get(&self, id: impl AsRef<str>) -> Option<Shape> {
        let id = id.as_ref();
        self.records
            .read()
            .iter()
            .find(|s| s.id.as_str() == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn square_count(&self) -> usize {
        count_kind(&self.records.read(), ShapeKind::Square)
    }

    pub fn circle_count(&self) -> usize {
        count_kind(&self.records.read(), ShapeKind::Circle)
    }

    /// Current value of a property.
    pub fn value(&self, property: Property) -> PropertyValue {
        property.compute(&self.records.read())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // --- Mutations ---

    /// Append a shape.
    ///
    /// Fails with [`StoreError::DuplicateId`] if the id is already present;
    /// in that case nothing is notified or persisted.
    pub fn add(&self, shape: Shape) -> Result<()> {
        {
            let mut records = self.records.write();
            if records.iter().any(|s| s.id == shape.id) {
                return Err(StoreError::DuplicateId(shape.id));
            }
            tracing::debug!(id = %shape.id, kind = %shape.kind, "adding shape");
            records.push(shape);
        }

        self.commit(&Property::ALL)
    }

    /// Remove the shape with `id`. Returns whether a shape was removed.
    ///
    /// An unknown id still notifies and persists, like any other mutation.
    pub fn remove(&self, id: impl AsRef<str>) -> Result<bool> {
        let id = id.as_ref();
        let removed = {
            let mut records = self.records.write();
            let before = records.len();
            records.retain(|s| s.id.as_str() != id);
            before != records.len()
        };

        tracing::debug!(id, removed, "removing shape");
        self.commit(&Property::ALL)?;
        Ok(removed)
    }

    /// Set `color` on every shape of `kind`. Returns how many were recolored.
    ///
    /// Counts cannot change, so only [`Property::Records`] is notified.
    pub fn recolor(&self, kind: ShapeKind, color: impl Into<String>) -> Result<usize> {
        let color = color.into();
        let matched = {
            let mut records = self.records.write();
            let mut matched = 0;
            for shape in records.iter_mut().filter(|s| s.kind == kind) {
                shape.color.clone_from(&color);
                matched += 1;
            }
            matched
        };

        tracing::debug!(kind = %kind, color = %color, matched, "recoloring shapes");
        self.commit(&[Property::Records])?;
        Ok(matched)
    }

    /// Remove every shape and delete the slot entry.
    ///
    /// If another caller adds a shape before the entry is deleted, the
    /// state is written instead.
    pub fn clear(&self) -> Result<()> {
        self.records.write().clear();
        tracing::debug!("cleared store");
        self.notify(&Property::ALL);

        let key = &self.config.storage_key;
        let _persist = self.persist_lock.lock();
        if !self.is_empty() {
            return self.write_locked();
        }

        self.slot.remove(key).map_err(|e| {
            tracing::error!(key = %key, error = %e, "failed to remove stored state");
            StoreError::persistence(key, e)
        })?;

        tracing::debug!(key = %key, "removed stored state");
        Ok(())
    }

    /// Notify then persist.
    fn commit(&self, changed: &[Property]) -> Result<()> {
        self.notify(changed);
        self.save()
    }

    fn notify(&self, changed: &[Property]) {
        for &property in changed {
            if !self.listeners.has_listeners(property) {
                continue;
            }
            let value = self.value(property);
            self.listeners
                .dispatch(property, &value, self.config.listener_errors);
        }
    }

    /// Write the full state to the slot.
    ///
    /// Called after every mutation. On failure the in-memory state is
    /// already updated and stays so.
    pub fn save(&self) -> Result<()> {
        let _persist = self.persist_lock.lock();
        self.write_locked()
    }

    /// Encode and write the current records. Caller holds `persist_lock`.
    fn write_locked(&self) -> Result<()> {
        let key = &self.config.storage_key;
        let state = PersistedState {
            records: self.records(),
        };

        let encoded =
            serde_json::to_string(&state).map_err(|e| StoreError::persistence(key, e.into()))?;

        self.slot.write(key, &encoded).map_err(|e| {
            tracing::error!(key = %key, error = %e, "failed to persist state");
            StoreError::persistence(key, e)
        })?;

        tracing::debug!(key = %key, bytes = encoded.len(), "persisted state");
        Ok(())
    }

    // --- Subscriptions ---

    /// Listen to `property`.
    ///
    /// The callback is invoked once immediately with the current value,
    /// then after every mutation that may change the property.
    pub fn subscribe<F>(&self, property: Property, callback: F) -> Subscription
    where
        F: Fn(&PropertyValue) + Send + Sync + 'static,
    {
        let id = self.listeners.register(property, move |value| {
            callback(value);
            ListenerStatus::Active
        });

        let current = self.value(property);
        self.listeners
            .deliver_to(property, id, &current, self.config.listener_errors);

        Subscription::new(id, property, Arc::downgrade(&self.listeners))
    }

    /// Listen to a property given by name, e.g. `"squareCount"`.
    pub fn subscribe_named<F>(&self, name: &str, callback: F) -> Result<Subscription>
    where
        F: Fn(&PropertyValue) + Send + Sync + 'static,
    {
        let property = name
            .parse::<Property>()
            .map_err(StoreError::UnknownProperty)?;
        Ok(self.subscribe(property, callback))
    }

    /// Listen to `property` through a bounded channel.
    ///
    /// The current value is queued first. When the buffer is full, further
    /// values are dropped for this watcher until it catches up. A watcher
    /// whose receiver is gone is unsubscribed on the next delivery.
    pub fn watch(&self, property: Property, buffer_size: usize) -> Watch {
        let (sender, receiver) = bounded(buffer_size.max(1));

        let id = self.listeners.register(property, move |value| {
            match sender.try_send(value.clone()) {
                Ok(()) => ListenerStatus::Active,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(property = %property, "watch buffer full, dropping update");
                    ListenerStatus::Active
                }
                Err(TrySendError::Disconnected(_)) => ListenerStatus::Closed,
            }
        });

        let current = self.value(property);
        self.listeners
            .deliver_to(property, id, &current, self.config.listener_errors);

        Watch {
            subscription: Subscription::new(id, property, Arc::downgrade(&self.listeners)),
            receiver,
        }
    }

    /// Number of listeners registered for `property`.
    pub fn subscriber_count(&self, property: Property) -> usize {
        self.listeners.count(property)
    }
}
