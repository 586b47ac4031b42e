//! In-memory reference store for testing and ephemeral use.
//!
//! [`InMemoryRefStore`] keeps all refs in a `BTreeMap` behind a single
//! `RwLock`, so every compare-and-swap runs under the write lock and is
//! trivially linearizable.

use std::collections::BTreeMap;
use std::sync::RwLock;

use folio_types::ObjectId;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::RefStore;

/// An in-memory implementation of [`RefStore`].
///
/// Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<BTreeMap<String, ObjectId>>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RefStore for InMemoryRefStore {
    fn get(&self, name: &str) -> Result<Option<ObjectId>> {
        validate_ref_name(name)?;
        let refs = self.refs.read().map_err(|_| RefError::Poisoned)?;
        Ok(refs.get(name).copied())
    }

    fn create_if_absent(&self, name: &str, commit: ObjectId) -> Result<bool> {
        validate_ref_name(name)?;
        let mut refs = self.refs.write().map_err(|_| RefError::Poisoned)?;
        if refs.contains_key(name) {
            tracing::debug!(name, "ref already exists");
            return Ok(false);
        }
        refs.insert(name.to_string(), commit);
        tracing::debug!(name, %commit, "created ref");
        Ok(true)
    }

    fn set_if_equals(&self, name: &str, expected: ObjectId, new: ObjectId) -> Result<bool> {
        validate_ref_name(name)?;
        let mut refs = self.refs.write().map_err(|_| RefError::Poisoned)?;
        match refs.get_mut(name) {
            Some(current) if *current == expected => {
                *current = new;
                tracing::debug!(name, from = %expected, to = %new, "moved ref");
                Ok(true)
            }
            current => {
                tracing::debug!(name, ?current, %expected, "ref compare-and-swap lost");
                Ok(false)
            }
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<(String, ObjectId)>> {
        let refs = self.refs.read().map_err(|_| RefError::Poisoned)?;
        Ok(refs
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, id)| (name.clone(), *id))
            .collect())
    }
}
