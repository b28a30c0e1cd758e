//! Directive declarations
//!
//! Named, positioned metadata annotations carrying one argument typed with the
//! [`Unrepresentable`](crate::marker::Unrepresentable) marker.

use std::fmt;
use std::str::FromStr;

use apollo_compiler::ast::{self, DirectiveDefinition, InputValueDefinition, Type};
use apollo_compiler::{Name, Node};

use crate::marker::Unrepresentable;
use crate::{FederationError, Result};

/// Locations a mapping directive may be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveLocation {
    Object,
    FieldDefinition,
    InputFieldDefinition,
}

impl DirectiveLocation {
    /// SDL spelling of the location
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "OBJECT",
            Self::FieldDefinition => "FIELD_DEFINITION",
            Self::InputFieldDefinition => "INPUT_FIELD_DEFINITION",
        }
    }
}

impl FromStr for DirectiveLocation {
    type Err = FederationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OBJECT" => Ok(Self::Object),
            "FIELD_DEFINITION" => Ok(Self::FieldDefinition),
            "INPUT_FIELD_DEFINITION" => Ok(Self::InputFieldDefinition),
            other => Err(FederationError::InvalidLocation(other.to_string())),
        }
    }
}

impl From<DirectiveLocation> for ast::DirectiveLocation {
    fn from(location: DirectiveLocation) -> Self {
        match location {
            DirectiveLocation::Object => Self::Object,
            DirectiveLocation::FieldDefinition => Self::FieldDefinition,
            DirectiveLocation::InputFieldDefinition => Self::InputFieldDefinition,
        }
    }
}

impl fmt::Display for DirectiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable directive definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveDeclaration {
    name: Name,
    location: DirectiveLocation,
    argument: Name,
    argument_type: Name,
}

impl DirectiveDeclaration {
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn location(&self) -> DirectiveLocation {
        self.location
    }

    /// Name of the single argument
    pub fn argument(&self) -> &str {
        self.argument.as_str()
    }

    /// Type of the single argument, always the marker scalar
    pub fn argument_type(&self) -> &str {
        self.argument_type.as_str()
    }

    /// Schema definition, e.g. `directive @_mappedType(type: UNREPRESENTABLE) on OBJECT`
    pub fn definition(&self) -> Node<DirectiveDefinition> {
        Node::new(DirectiveDefinition {
            description: None,
            name: self.name.clone(),
            arguments: vec![Node::new(InputValueDefinition {
                description: None,
                name: self.argument.clone(),
                ty: Node::new(Type::Named(self.argument_type.clone())),
                default_value: None,
                directives: Default::default(),
            })],
            repeatable: false,
            locations: vec![self.location.into()],
        })
    }
}

pub(crate) fn graphql_name(name: &str) -> Result<Name> {
    Name::new(name).map_err(|e| FederationError::Schema(e.to_string()))
}

/// Append-only registry of directive declarations
///
/// Filled during startup, then handed to the
/// [`SchemaComposer`](crate::schema::SchemaComposer). There is no removal.
#[derive(Debug, Default, Clone)]
pub struct DirectiveRegistry {
    declarations: Vec<DirectiveDeclaration>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the three mapping directives of the review subgraph
    pub fn mapping_directives() -> Result<Self> {
        let mut registry = Self::new();
        registry.declare("_mappedType", "OBJECT", "type")?;
        registry.declare("_mappedOperation", "FIELD_DEFINITION", "operation")?;
        registry.declare("_mappedInputField", "INPUT_FIELD_DEFINITION", "inputField")?;
        Ok(registry)
    }

    /// Declare a directive
    ///
    /// `location` uses the SDL spelling (`OBJECT`, `FIELD_DEFINITION`,
    /// `INPUT_FIELD_DEFINITION`); anything else is rejected.
    pub fn declare(
        &mut self,
        name: &str,
        location: &str,
        argument: &str,
    ) -> Result<DirectiveDeclaration> {
        if self.get(name).is_some() {
            return Err(FederationError::DuplicateDeclaration(name.to_string()));
        }
        let location = location.parse::<DirectiveLocation>()?;

        let declaration = DirectiveDeclaration {
            name: graphql_name(name)?,
            location,
            argument: graphql_name(argument)?,
            argument_type: Unrepresentable::schema_name()?,
        };
        self.declarations.push(declaration.clone());

        Ok(declaration)
    }

    pub fn get(&self, name: &str) -> Option<&DirectiveDeclaration> {
        self.declarations.iter().find(|d| d.name.as_str() == name)
    }

    /// Declarations in registration order
    pub fn declarations(&self) -> &[DirectiveDeclaration] {
        &self.declarations
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::UNREPRESENTABLE;
    use tokio_test::assert_ok;

    #[test]
    fn test_declare() {
        let mut registry = DirectiveRegistry::new();
        let declaration = assert_ok!(registry.declare("_mappedType", "OBJECT", "type"));

        assert_eq!(declaration.name(), "_mappedType");
        assert_eq!(declaration.location(), DirectiveLocation::Object);
        assert_eq!(declaration.argument(), "type");
        assert_eq!(declaration.argument_type(), "UNREPRESENTABLE");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_declaration() {
        let mut registry = DirectiveRegistry::new();
        registry.declare("_mappedType", "OBJECT", "type").unwrap();

        let err = registry
            .declare("_mappedType", "FIELD_DEFINITION", "other")
            .unwrap_err();
        assert_eq!(err, FederationError::DuplicateDeclaration("_mappedType".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_location() {
        let mut registry = DirectiveRegistry::new();

        let err = registry.declare("_mapped", "SCALAR", "type").unwrap_err();
        assert_eq!(err, FederationError::InvalidLocation("SCALAR".into()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_mapping_directives() {
        let registry = DirectiveRegistry::mapping_directives().unwrap();
        let names: Vec<_> = registry.declarations().iter().map(|d| d.name()).collect();
        assert_eq!(names, ["_mappedType", "_mappedOperation", "_mappedInputField"]);

        let input = registry.get("_mappedInputField").unwrap().definition();
        assert_eq!(input.locations, [ast::DirectiveLocation::InputFieldDefinition]);
        assert_eq!(input.arguments[0].ty.inner_named_type().as_str(), UNREPRESENTABLE);
        assert!(input.to_string().contains(
            "directive @_mappedInputField(inputField: UNREPRESENTABLE) on INPUT_FIELD_DEFINITION"
        ));
    }

    #[test]
    fn test_invalid_graphql_name() {
        let mut registry = DirectiveRegistry::new();

        let err = registry.declare("mapped-type", "OBJECT", "type").unwrap_err();
        assert!(matches!(err, FederationError::Schema(_)));
        assert!(registry.is_empty());
    }
}
