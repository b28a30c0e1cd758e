//! Schema composition
//!
//! A [`SchemaProvider`] supplies the base `apollo_compiler` schema; the
//! [`SchemaComposer`] merges directive declarations into its directive set,
//! adds the federation scaffolding (`_Any`, `_FieldSet`, `@key`, `_Service`,
//! `_Entity`, `_service`, `_entities`) and validates the result.

use apollo_compiler::ast::{FieldDefinition, InputValueDefinition};
use apollo_compiler::schema::{Component, ComponentName, ExtendedType, UnionType};
use apollo_compiler::{name, ty, Name, Node, Schema};

use crate::directives::{DirectiveDeclaration, DirectiveRegistry};
use crate::marker::{Unrepresentable, UNREPRESENTABLE};
use crate::{FederationError, Result};

const FEDERATION_SDL: &str = r#"
scalar _Any
scalar _FieldSet

type _Service {
  sdl: String
}

directive @key(fields: _FieldSet!, resolvable: Boolean = true) repeatable on OBJECT | INTERFACE
"#;

/// Source of the base schema
pub trait SchemaProvider {
    fn base_schema(&self) -> Result<Schema>;
}

/// Parse SDL into a schema without validating it
pub fn parse_sdl(sdl: &str, path: &str) -> Result<Schema> {
    Schema::builder()
        .adopt_orphan_extensions()
        .parse(sdl, path)
        .build()
        .map_err(|e| FederationError::Schema(e.errors.to_string()))
}

/// Object types carrying at least one `@key`
pub fn entity_types(schema: &Schema) -> Vec<&Name> {
    schema
        .types
        .iter()
        .filter_map(|(name, ty)| match ty {
            ExtendedType::Object(object) if object.directives.has("key") => Some(name),
            _ => None,
        })
        .collect()
}

pub fn is_entity(schema: &Schema, type_name: &str) -> bool {
    matches!(
        schema.types.get(type_name),
        Some(ExtendedType::Object(object)) if object.directives.has("key")
    )
}

/// SDL rendering options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdlOptions {
    /// Print the marker scalar and the directives typed with it
    pub include_directives: bool,
}

impl Default for SdlOptions {
    fn default() -> Self {
        Self {
            include_directives: true,
        }
    }
}

/// Render a schema as SDL, for operators; nothing parses this back
pub fn sdl(schema: &Schema, options: SdlOptions) -> String {
    if options.include_directives {
        return schema.to_string();
    }

    let mut public = schema.clone();
    public.directive_definitions.retain(|_, definition| {
        !definition
            .arguments
            .iter()
            .any(|argument| argument.ty.inner_named_type().as_str() == UNREPRESENTABLE)
    });
    public.types.shift_remove(UNREPRESENTABLE);
    public.to_string()
}

/// Hook invoked with every composed schema; never affects resolution
pub trait SchemaObserver: Send + Sync {
    fn on_composed(&self, schema: &Schema);
}

/// Logs the composed SDL
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver {
    pub options: SdlOptions,
}

impl SchemaObserver for TracingObserver {
    fn on_composed(&self, schema: &Schema) {
        tracing::info!(sdl = %sdl(schema, self.options), "schema with federation");
    }
}

/// Merges directive declarations and federation scaffolding into a base schema
#[derive(Default)]
pub struct SchemaComposer {
    declarations: Vec<DirectiveDeclaration>,
    observers: Vec<Box<dyn SchemaObserver>>,
}

impl SchemaComposer {
    pub fn new(registry: &DirectiveRegistry) -> Self {
        Self {
            declarations: registry.declarations().to_vec(),
            observers: Vec::new(),
        }
    }

    pub fn observe(mut self, observer: impl SchemaObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Compose `schema` with the registered declarations
    ///
    /// Idempotent: a declaration already present is kept once. A different
    /// definition under the same name is a conflict.
    pub fn compose(&self, mut schema: Schema) -> Result<Schema> {
        for declaration in &self.declarations {
            let definition = declaration.definition();
            match schema.directive_definitions.get(declaration.name()) {
                Some(existing) if **existing == *definition => {}
                Some(_) => {
                    return Err(FederationError::DuplicateDeclaration(
                        declaration.name().to_string(),
                    ))
                }
                None => {
                    schema
                        .directive_definitions
                        .insert(definition.name.clone(), definition);
                }
            }
        }

        if !self.declarations.is_empty() {
            let marker = Unrepresentable::schema_name()?;
            if !schema.types.contains_key(&marker) {
                schema
                    .types
                    .insert(marker, Unrepresentable::scalar_definition()?);
            }
        }

        federate(&mut schema)?;

        let schema = schema
            .validate()
            .map_err(|e| FederationError::Schema(e.errors.to_string()))?
            .into_inner();

        tracing::debug!(
            entities = entity_types(&schema).len(),
            declarations = self.declarations.len(),
            "schema composed"
        );
        for observer in &self.observers {
            observer.on_composed(&schema);
        }

        Ok(schema)
    }
}

fn federate(schema: &mut Schema) -> Result<()> {
    let entities: Vec<Name> = entity_types(schema).into_iter().cloned().collect();
    if entities.is_empty() {
        return Ok(());
    }

    let federation = parse_sdl(FEDERATION_SDL, "federation.graphql")?;
    for (name, definition) in federation.directive_definitions {
        schema.directive_definitions.entry(name).or_insert(definition);
    }
    for (name, ty) in federation.types {
        schema.types.entry(name).or_insert(ty);
    }

    schema.types.insert(
        name!("_Entity"),
        ExtendedType::Union(Node::new(UnionType {
            description: None,
            name: name!("_Entity"),
            directives: Default::default(),
            members: entities.into_iter().map(ComponentName::from).collect(),
        })),
    );

    let Some(ExtendedType::Object(query)) = schema.types.get_mut("Query") else {
        return Err(FederationError::Schema("schema has no Query type".to_string()));
    };
    let query = query.make_mut();
    query.fields.entry(name!("_service")).or_insert_with(|| {
        Component::new(FieldDefinition {
            description: None,
            name: name!("_service"),
            arguments: Vec::new(),
            ty: ty!(_Service!),
            directives: Default::default(),
        })
    });
    query.fields.entry(name!("_entities")).or_insert_with(|| {
        Component::new(FieldDefinition {
            description: None,
            name: name!("_entities"),
            arguments: vec![Node::new(InputValueDefinition {
                description: None,
                name: name!("representations"),
                ty: ty!([_Any!]!).into(),
                default_value: None,
                directives: Default::default(),
            })],
            ty: ty!([_Entity]!),
            directives: Default::default(),
        })
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const BASE: &str = r#"
type Query {
  users: [User!]!
}

type User @key(fields: "id") {
  id: ID!
}
"#;

    fn base() -> Schema {
        parse_sdl(BASE, "base.graphql").unwrap()
    }

    fn composer() -> SchemaComposer {
        SchemaComposer::new(&DirectiveRegistry::mapping_directives().unwrap())
    }

    #[test]
    fn test_compose_adds_directives() {
        let schema = composer().compose(base()).unwrap();

        for name in ["_mappedType", "_mappedOperation", "_mappedInputField"] {
            assert!(schema.directive_definitions.contains_key(name), "missing @{name}");
        }
        assert!(matches!(
            schema.types.get(UNREPRESENTABLE),
            Some(ExtendedType::Scalar(_))
        ));
    }

    #[test]
    fn test_compose_is_idempotent() {
        let composer = composer();
        let once = composer.compose(base()).unwrap();
        let twice = composer.compose(once.clone()).unwrap();
        let thrice = composer.compose(twice.clone()).unwrap();

        assert_eq!(once.to_string(), twice.to_string());
        assert_eq!(twice.to_string(), thrice.to_string());
        assert_eq!(thrice.to_string().matches("directive @_mappedType").count(), 1);
        assert_eq!(thrice.to_string().matches("_entities(").count(), 1);
    }

    #[test]
    fn test_compose_rejects_conflicting_declaration() {
        let mut registry = DirectiveRegistry::new();
        registry.declare("_mappedType", "FIELD_DEFINITION", "type").unwrap();
        let schema = composer().compose(base()).unwrap();

        let err = SchemaComposer::new(&registry).compose(schema).unwrap_err();
        assert_eq!(err, FederationError::DuplicateDeclaration("_mappedType".into()));
    }

    #[test]
    fn test_compose_leaves_plain_schema_alone() {
        let plain = parse_sdl("type Query { ping: String }", "plain.graphql").unwrap();
        let composed = SchemaComposer::default().compose(plain.clone()).unwrap();
        assert_eq!(composed.to_string(), plain.to_string());
    }

    #[test]
    fn test_compose_rejects_invalid_schema() {
        let broken = parse_sdl("type Query { user: Missing }", "broken.graphql").unwrap();
        let err = composer().compose(broken).unwrap_err();
        assert!(matches!(err, FederationError::Schema(_)));
    }

    #[test]
    fn test_federation_scaffolding() {
        let schema = composer().compose(base()).unwrap();

        match schema.types.get("_Entity") {
            Some(ExtendedType::Union(union)) => {
                let members: Vec<_> = union.members.iter().map(|m| m.as_str()).collect();
                assert_eq!(members, ["User"]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(schema.directive_definitions.contains_key("key"));
        assert!(!is_entity(&schema, "_Service"));
        assert!(is_entity(&schema, "User"));
    }

    #[test]
    fn test_sdl() {
        let schema = composer().compose(base()).unwrap();
        let sdl = sdl(&schema, SdlOptions::default());

        assert!(sdl.contains("scalar UNREPRESENTABLE"));
        assert!(sdl.contains("directive @_mappedType(type: UNREPRESENTABLE) on OBJECT"));
        assert!(sdl.contains("_entities(representations: [_Any!]!): [_Entity]!"));
        assert!(sdl.contains("union _Entity = User"));
    }

    #[test]
    fn test_sdl_without_directives() {
        let schema = composer().compose(base()).unwrap();
        let sdl = sdl(
            &schema,
            SdlOptions {
                include_directives: false,
            },
        );

        assert!(!sdl.contains("UNREPRESENTABLE"));
        assert!(!sdl.contains("@_mapped"));
        assert!(sdl.contains("scalar _Any"));
        assert!(sdl.contains("directive @key"));
    }

    struct CountingObserver(Arc<AtomicUsize>);

    impl SchemaObserver for CountingObserver {
        fn on_composed(&self, _schema: &Schema) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_observer_notified() {
        let count = Arc::new(AtomicUsize::new(0));
        let composer = composer().observe(CountingObserver(count.clone()));

        composer.compose(base()).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
