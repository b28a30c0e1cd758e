//! # pleme-review-subgraph
//!
//! Entity resolution layer for the Pleme review subgraph.
//!
//! ## Features
//!
//! - **Entity Resolution** - ordered, fault-isolated `_entities` batches
//! - **Lookup Dispatch** - `__typename` to lookup service table
//! - **Directive Scaffolding** - mapping directives typed with an unrepresentable scalar
//! - **Schema Composition** - idempotent merge of directives and federation types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pleme_review_subgraph::{ReviewSchemaProvider, ReviewSubgraph, SubgraphConfig};
//! use pleme_review_subgraph::services::{ProductService, UserService};
//!
//! # async fn example() -> pleme_review_subgraph::Result<()> {
//! let subgraph = ReviewSubgraph::bootstrap(
//!     SubgraphConfig::default(),
//!     &ReviewSchemaProvider,
//!     UserService::default(),
//!     ProductService::default(),
//! )?;
//!
//! let entities = subgraph
//!     .resolver()
//!     .resolve_json(serde_json::json!([{ "__typename": "User", "id": "u1" }]))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod directives;
pub mod dispatch;
pub mod entity;
pub mod federation;
pub mod marker;
pub mod review;
pub mod schema;
pub mod services;

pub use config::{ResolverConfig, SubgraphConfig};
pub use directives::{DirectiveDeclaration, DirectiveLocation, DirectiveRegistry};
pub use dispatch::{EntityKey, EntityLookup, LookupBinding, LookupError, LookupTable};
pub use entity::{EntityKind, Product, ResolvedEntity, User};
pub use federation::{EntityResolver, Representation, TypeNameMap};
pub use marker::Unrepresentable;
pub use review::{ReviewSchemaProvider, ReviewSubgraph};
pub use schema::{SchemaComposer, SchemaObserver, SchemaProvider, SdlOptions};

use thiserror::Error;

/// Federation errors
///
/// All variants are startup or protocol failures. Per-representation misses
/// never surface here; they degrade to an absent entity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FederationError {
    #[error("Coercion error: {0}")]
    Coercion(String),

    #[error("Directive @{0} is already declared")]
    DuplicateDeclaration(String),

    #[error("Invalid directive location: {0}")]
    InvalidLocation(String),

    #[error("Lookup binding for {0} is already registered")]
    DuplicateBinding(String),

    #[error("Entity variant {0} has no type mapping")]
    UnmappedVariant(String),

    #[error("Type {0} is not an entity in the composed schema")]
    UnknownEntityType(String),

    #[error("Malformed representations: {0}")]
    MalformedRepresentations(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Entity serialization error: {0}")]
    Serialization(String),
}

/// Result type for federation operations
pub type Result<T> = std::result::Result<T, FederationError>;
