//! Apollo Federation entity resolution
//!
//! Resolves the representations of an `_entities` call to domain objects and
//! maps resolved objects back to their GraphQL type names.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::config::ResolverConfig;
use crate::dispatch::{EntityKey, EntityLookup, LookupBinding, LookupError, LookupTable};
use crate::entity::{EntityKind, ResolvedEntity};
use crate::{FederationError, Result};

const TYPENAME: &str = "__typename";

/// An entity reference forwarded by the gateway
///
/// A string-keyed object holding `__typename` plus the key fields of the type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Representation(Map<String, JsonValue>);

impl Representation {
    pub fn new(fields: Map<String, JsonValue>) -> Self {
        Self(fields)
    }

    /// `__typename`, if present and a string
    pub fn typename(&self) -> Option<&str> {
        self.0.get(TYPENAME).and_then(JsonValue::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.0.get(field)
    }

    /// Parse the `representations` argument
    ///
    /// Fails only when the input is not a list of objects; that is a protocol
    /// violation by the caller rather than an unresolvable entity.
    pub fn list_from_json(input: JsonValue) -> Result<Vec<Self>> {
        match input {
            JsonValue::Array(items) => items.into_iter().map(Self::try_from).collect(),
            other => Err(FederationError::MalformedRepresentations(format!(
                "expected a list, found {}",
                json_kind(&other)
            ))),
        }
    }
}

impl TryFrom<JsonValue> for Representation {
    type Error = FederationError;

    fn try_from(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(fields) => Ok(Self(fields)),
            other => Err(FederationError::MalformedRepresentations(format!(
                "expected an object, found {}",
                json_kind(&other)
            ))),
        }
    }
}

/// Conversion from the gateway's `_Any` scalar value
impl TryFrom<async_graphql::Value> for Representation {
    type Error = FederationError;

    fn try_from(value: async_graphql::Value) -> Result<Self> {
        let json = value
            .into_json()
            .map_err(|e| FederationError::MalformedRepresentations(e.to_string()))?;
        Self::try_from(json)
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "list",
        JsonValue::Object(_) => "object",
    }
}

/// Total mapping from entity variant to GraphQL type name
#[derive(Debug, Clone, Default)]
pub struct TypeNameMap {
    names: HashMap<EntityKind, String>,
}

impl TypeNameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, kind: EntityKind, type_name: impl Into<String>) -> Self {
        self.names.insert(kind, type_name.into());
        self
    }

    pub fn name_of(&self, kind: EntityKind) -> Option<&str> {
        self.names.get(&kind).map(String::as_str)
    }

    /// Every variant must be mapped, and every binding must produce the
    /// variant mapped to its own type name.
    pub fn check_complete(&self, table: &LookupTable) -> Result<()> {
        for kind in EntityKind::ALL {
            if self.name_of(kind).is_none() {
                return Err(FederationError::UnmappedVariant(kind.to_string()));
            }
        }

        for binding in table.bindings() {
            if self.name_of(binding.kind()) != Some(binding.type_name()) {
                return Err(FederationError::UnmappedVariant(format!(
                    "{} (bound as {})",
                    binding.kind(),
                    binding.type_name()
                )));
            }
        }

        Ok(())
    }
}

/// One lookup to perform; identical keys share a job when deduplicating
struct Job {
    type_name: String,
    kind: EntityKind,
    key: EntityKey,
    lookup: Arc<dyn EntityLookup>,
}

impl Job {
    fn new(binding: &LookupBinding, key: EntityKey) -> Self {
        Self {
            type_name: binding.type_name().to_string(),
            kind: binding.kind(),
            key,
            lookup: binding.lookup(),
        }
    }

    async fn run(self, timeout: Duration) -> Option<ResolvedEntity> {
        let Job {
            type_name,
            kind,
            key,
            lookup,
        } = self;

        match tokio::time::timeout(timeout, lookup.lookup(key.clone())).await {
            Ok(Ok(entity)) if entity.kind() == kind => Some(entity),
            Ok(Ok(entity)) => {
                tracing::warn!(
                    type_name = %type_name,
                    key = %key,
                    expected = %kind,
                    actual = %entity.kind(),
                    "lookup returned an unexpected entity variant"
                );
                None
            }
            Ok(Err(LookupError::NotFound)) => {
                tracing::debug!(type_name = %type_name, key = %key, "entity not found");
                None
            }
            Ok(Err(error)) => {
                tracing::warn!(type_name = %type_name, key = %key, %error, "entity lookup failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    type_name = %type_name,
                    key = %key,
                    timeout_ms = timeout.as_millis() as u64,
                    "entity lookup timed out"
                );
                None
            }
        }
    }
}

/// Resolver behind the `_entities` field
///
/// Owns the lookup table and type name mapping; both are immutable once the
/// resolver is built, so the resolver can be shared freely across requests.
#[derive(Debug)]
pub struct EntityResolver {
    table: LookupTable,
    type_names: TypeNameMap,
    config: ResolverConfig,
}

impl EntityResolver {
    /// Build a resolver, failing fast on incomplete wiring
    pub fn new(
        table: LookupTable,
        type_names: TypeNameMap,
        config: ResolverConfig,
    ) -> Result<Self> {
        config.validate()?;
        type_names.check_complete(&table)?;

        tracing::debug!(
            bindings = table.len(),
            max_concurrency = config.max_concurrency,
            "entity resolver ready"
        );

        Ok(Self {
            table,
            type_names,
            config,
        })
    }

    pub fn table(&self) -> &LookupTable {
        &self.table
    }

    /// Resolve a batch of representations
    ///
    /// Always returns one entry per representation, in input order. Unknown
    /// types, missing or non-string keys, not-found entities, backend
    /// failures, timeouts and panicking lookups all yield `None` for that
    /// position only. Dropping the returned future aborts in-flight lookups.
    #[tracing::instrument(skip_all, fields(batch_size = representations.len()))]
    pub async fn resolve_entities(
        &self,
        representations: &[Representation],
    ) -> Vec<Option<ResolvedEntity>> {
        let mut jobs: Vec<Job> = Vec::new();
        let mut shared: HashMap<(String, EntityKey), usize> = HashMap::new();
        let mut slots: Vec<Option<usize>> = Vec::with_capacity(representations.len());

        for (position, representation) in representations.iter().enumerate() {
            let Some((binding, key)) = self.plan(position, representation) else {
                slots.push(None);
                continue;
            };

            let job = if self.config.dedupe_keys {
                let shared_key = (binding.type_name().to_string(), key.clone());
                match shared.get(&shared_key) {
                    Some(&job) => job,
                    None => {
                        jobs.push(Job::new(binding, key));
                        shared.insert(shared_key, jobs.len() - 1);
                        jobs.len() - 1
                    }
                }
            } else {
                jobs.push(Job::new(binding, key));
                jobs.len() - 1
            };
            slots.push(Some(job));
        }

        let outcomes = self.run(jobs).await;

        slots
            .into_iter()
            .map(|slot| slot.and_then(|job| outcomes[job].clone()))
            .collect()
    }

    /// Resolve the raw `representations` argument
    ///
    /// Fails only when the argument is not a list of objects.
    pub async fn resolve_json(&self, input: JsonValue) -> Result<Vec<Option<ResolvedEntity>>> {
        let representations = Representation::list_from_json(input)?;
        Ok(self.resolve_entities(&representations).await)
    }

    /// GraphQL type name of a resolved entity
    pub fn resolve_concrete_type(&self, entity: &ResolvedEntity) -> Result<&str> {
        let kind = entity.kind();
        self.type_names
            .name_of(kind)
            .ok_or_else(|| FederationError::UnmappedVariant(kind.to_string()))
    }

    /// Encode resolved entities as the `_entities` response list
    ///
    /// Each entity object carries the `__typename` picked by
    /// [`resolve_concrete_type`](Self::resolve_concrete_type); absent entries
    /// stay `null`.
    pub fn to_response(&self, entities: &[Option<ResolvedEntity>]) -> Result<JsonValue> {
        entities
            .iter()
            .map(|entity| match entity {
                None => Ok(JsonValue::Null),
                Some(entity) => encode_entity(entity, self.resolve_concrete_type(entity)?),
            })
            .collect::<Result<Vec<_>>>()
            .map(JsonValue::Array)
    }

    fn plan<'a>(
        &'a self,
        position: usize,
        representation: &Representation,
    ) -> Option<(&'a LookupBinding, EntityKey)> {
        let Some(type_name) = representation.typename() else {
            tracing::debug!(position, "representation has no string __typename");
            return None;
        };
        let Some(binding) = self.table.get(type_name) else {
            tracing::debug!(position, type_name, "no lookup bound for type");
            return None;
        };

        let mut key = EntityKey::new();
        for field in binding.key_fields() {
            match representation.get(field) {
                Some(JsonValue::String(value)) => key.insert(field.as_str(), value.as_str()),
                Some(other) => {
                    tracing::debug!(
                        position,
                        type_name,
                        field = %field,
                        found = json_kind(other),
                        "key field is not a string"
                    );
                    return None;
                }
                None => {
                    tracing::debug!(position, type_name, field = %field, "key field is missing");
                    return None;
                }
            }
        }

        Some((binding, key))
    }

    async fn run(&self, jobs: Vec<Job>) -> Vec<Option<ResolvedEntity>> {
        let mut outcomes: Vec<Option<ResolvedEntity>> = vec![None; jobs.len()];
        if jobs.is_empty() {
            return outcomes;
        }

        let permits = Arc::new(Semaphore::new(self.config.max_concurrency));
        let timeout = self.config.lookup_timeout();
        let mut tasks = JoinSet::new();

        for (index, job) in jobs.into_iter().enumerate() {
            let permits = permits.clone();
            tasks.spawn(
                async move {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return (index, None);
                    };
                    (index, job.run(timeout).await)
                }
                .in_current_span(),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = outcome,
                Err(error) => tracing::warn!(%error, "entity lookup task aborted"),
            }
        }

        outcomes
    }
}

fn encode_entity<T: Serialize + ?Sized>(entity: &T, type_name: &str) -> Result<JsonValue> {
    let mut value =
        serde_json::to_value(entity).map_err(|e| FederationError::Serialization(e.to_string()))?;
    if let JsonValue::Object(fields) = &mut value {
        fields.insert(TYPENAME.to_string(), JsonValue::from(type_name));
    }
    Ok(value)
}
