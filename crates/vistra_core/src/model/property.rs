//! Property store with prototype-style resolution.
//!
//! # Responsibility
//! - Hold key/value styling configuration for one entity.
//! - Resolve lookups through the object-local -> model-default ->
//!   global-default chain.
//!
//! # Invariants
//! - Mutation is whole-value replace; partial merge exists only for state
//!   document load.
//! - Absence across all tiers is a distinct "unset" result, not an error.
//! - Malformed document values fail per-key (skip + warn), never aborting
//!   the surrounding document.

use crate::model::value::PropertyValue;
use log::warn;
use std::collections::BTreeMap;

/// JSON object shape used by the state serializer for property maps.
pub type PropertyDocument = serde_json::Map<String, serde_json::Value>;

/// Key/value configuration container with deterministic iteration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyStore {
    entries: BTreeMap<String, PropertyValue>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the value for `key`; always succeeds, records no history.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Removes `key`, returning the previous value when present.
    pub fn unset(&mut self, key: &str) -> Option<PropertyValue> {
        self.entries.remove(key)
    }

    /// Local lookup only; `None` means unset at this tier.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    /// Three-tier resolution: local value, then model defaults, then global
    /// defaults. First hit wins; `None` means unset everywhere.
    pub fn get_resolved<'a>(
        &'a self,
        key: &str,
        model_defaults: Option<&'a PropertyStore>,
        global_defaults: Option<&'a PropertyStore>,
    ) -> Option<&'a PropertyValue> {
        if let Some(value) = self.entries.get(key) {
            return Some(value);
        }
        if let Some(value) = model_defaults.and_then(|store| store.get(key)) {
            return Some(value);
        }
        global_defaults.and_then(|store| store.get(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.entries.iter()
    }

    /// Key-wise overwrite from a JSON document, used during state load.
    ///
    /// Keys whose values have no property representation are skipped with a
    /// warning; previously valid keys are never corrupted. Returns the
    /// number of skipped keys.
    pub fn merge_document(&mut self, document: &PropertyDocument) -> usize {
        let mut skipped = 0;
        for (key, raw) in document {
            match PropertyValue::from_json(raw) {
                Some(value) => {
                    self.entries.insert(key.clone(), value);
                }
                None => {
                    warn!(
                        "event=property_merge module=property status=skip key={key} reason=unrepresentable_value"
                    );
                    skipped += 1;
                }
            }
        }
        skipped
    }

    /// Builds a store from a JSON document with the same per-key tolerance
    /// as [`PropertyStore::merge_document`].
    pub fn from_document(document: &PropertyDocument) -> (PropertyStore, usize) {
        let mut store = PropertyStore::new();
        let skipped = store.merge_document(document);
        (store, skipped)
    }

    /// Serializes all entries to a JSON document with sorted keys.
    pub fn to_document(&self) -> PropertyDocument {
        self.entries
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect()
    }
}
