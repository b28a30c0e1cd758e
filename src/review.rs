//! Review subgraph wiring
//!
//! Runs the startup phase once: directives, schema composition, lookup
//! bindings and the completeness checks. The resulting [`ReviewSubgraph`] is
//! immutable and is shared by reference with request handlers.

use apollo_compiler::Schema;

use crate::config::SubgraphConfig;
use crate::directives::DirectiveRegistry;
use crate::dispatch::{LookupBinding, LookupTable};
use crate::entity::EntityKind;
use crate::federation::{EntityResolver, TypeNameMap};
use crate::schema::{self, SchemaComposer, SchemaProvider, SdlOptions, TracingObserver};
use crate::services::{ProductService, UserService};
use crate::{FederationError, Result};

const REVIEW_SDL: &str = r#"
type Query {
  reviews(filter: ReviewFilter): [Review!]!
}

type Review {
  id: ID!
  body: String
  author: User
  product: Product
}

type User @key(fields: "id") {
  id: ID!
  username: String
}

type Product @key(fields: "upc") {
  upc: String!
  name: String
}

input ReviewFilter {
  authorId: ID
  productUpc: String
}
"#;

/// Base schema of the review subgraph
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewSchemaProvider;

impl SchemaProvider for ReviewSchemaProvider {
    fn base_schema(&self) -> Result<Schema> {
        schema::parse_sdl(REVIEW_SDL, "review.graphql")
    }
}

/// Composed schema plus the entity resolver behind `_entities`
#[derive(Debug)]
pub struct ReviewSubgraph {
    schema: Schema,
    resolver: EntityResolver,
    sdl_options: SdlOptions,
}

impl ReviewSubgraph {
    /// Build the subgraph; any wiring error aborts startup
    pub fn bootstrap(
        config: SubgraphConfig,
        provider: &dyn SchemaProvider,
        users: UserService,
        products: ProductService,
    ) -> Result<Self> {
        let sdl_options = SdlOptions {
            include_directives: config.include_directives,
        };

        let registry = DirectiveRegistry::mapping_directives()?;
        let mut composer = SchemaComposer::new(&registry);
        if config.print_schema {
            composer = composer.observe(TracingObserver {
                options: sdl_options,
            });
        }
        let schema = composer.compose(provider.base_schema()?)?;

        let mut table = LookupTable::new();
        table.register(LookupBinding::new("User", EntityKind::User, users).key("id"))?;
        table.register(LookupBinding::new("Product", EntityKind::Product, products).key("upc"))?;

        for binding in table.bindings() {
            if !schema::is_entity(&schema, binding.type_name()) {
                return Err(FederationError::UnknownEntityType(
                    binding.type_name().to_string(),
                ));
            }
        }

        let type_names = TypeNameMap::new()
            .map(EntityKind::User, "User")
            .map(EntityKind::Product, "Product");
        let resolver = EntityResolver::new(table, type_names, config.resolver)?;

        tracing::info!(
            entities = schema::entity_types(&schema).len(),
            declarations = registry.len(),
            "review subgraph ready"
        );

        Ok(Self {
            schema,
            resolver,
            sdl_options,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    /// SDL of the composed schema, using the configured options
    pub fn sdl(&self) -> String {
        schema::sdl(&self.schema, self.sdl_options)
    }
}
