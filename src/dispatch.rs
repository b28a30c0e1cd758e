//! Lookup dispatch table
//!
//! Maps a `__typename` to the lookup service that fetches that entity. The
//! table is filled during startup and moved into the
//! [`EntityResolver`](crate::federation::EntityResolver), after which it is
//! only ever read.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::entity::{EntityKind, ResolvedEntity};
use crate::{FederationError, Result};

/// Failure of a single lookup. Degrades to an absent entity, never fails a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Entity not found")]
    NotFound,

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Key fields extracted from a representation, by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(BTreeMap<String, String>);

impl EntityKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Value of a required field, or `NotFound` when the key lacks it
    pub fn require(&self, field: &str) -> std::result::Result<&str, LookupError> {
        self.get(field).ok_or(LookupError::NotFound)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, value) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{field}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Lookup service for one entity type
///
/// Implementations usually perform blocking or remote I/O; the resolver runs
/// them on the tokio runtime under a timeout.
#[async_trait]
pub trait EntityLookup: Send + Sync {
    /// Fetch the entity identified by `key`
    async fn lookup(&self, key: EntityKey) -> std::result::Result<ResolvedEntity, LookupError>;
}

#[async_trait]
impl<F, Fut> EntityLookup for F
where
    F: Fn(EntityKey) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<ResolvedEntity, LookupError>> + Send + 'static,
{
    async fn lookup(&self, key: EntityKey) -> std::result::Result<ResolvedEntity, LookupError> {
        (self)(key).await
    }
}

/// Binding of a type name to its lookup service
#[derive(Clone)]
pub struct LookupBinding {
    type_name: String,
    kind: EntityKind,
    key_fields: Vec<String>,
    lookup: Arc<dyn EntityLookup>,
}

impl LookupBinding {
    /// Bind `type_name` to `lookup`, which produces `kind` entities
    pub fn new(
        type_name: impl Into<String>,
        kind: EntityKind,
        lookup: impl EntityLookup + 'static,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            kind,
            key_fields: Vec::new(),
            lookup: Arc::new(lookup),
        }
    }

    /// Add a required key field
    pub fn key(mut self, field: impl Into<String>) -> Self {
        self.key_fields.push(field.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn key_fields(&self) -> &[String] {
        &self.key_fields
    }

    pub(crate) fn lookup(&self) -> Arc<dyn EntityLookup> {
        self.lookup.clone()
    }
}

impl fmt::Debug for LookupBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupBinding")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("key_fields", &self.key_fields)
            .finish_non_exhaustive()
    }
}

/// Type name to lookup binding table
#[derive(Debug, Default)]
pub struct LookupTable {
    bindings: HashMap<String, LookupBinding>,
}

impl LookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding; a type name can only be bound once
    pub fn register(&mut self, binding: LookupBinding) -> Result<()> {
        if self.bindings.contains_key(binding.type_name()) {
            return Err(FederationError::DuplicateBinding(binding.type_name));
        }
        self.bindings.insert(binding.type_name.clone(), binding);
        Ok(())
    }

    pub fn get(&self, type_name: &str) -> Option<&LookupBinding> {
        self.bindings.get(type_name)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &LookupBinding> {
        self.bindings.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
