//! Unrepresentable marker scalar
//!
//! Directive arguments need a type for the schema to be valid, but their
//! values are never sent over the wire nor accepted from clients. This scalar
//! fills that slot: output always yields a fixed sentinel, input always fails.

use apollo_compiler::ast;
use apollo_compiler::schema::{ExtendedType, ScalarType as SchemaScalar};
use apollo_compiler::{Name, Node};
use async_graphql::{InputType, InputValueError, InputValueResult, Scalar, ScalarType, Value};

use crate::directives::graphql_name;
use crate::{FederationError, Result};

/// Name of the marker scalar in SDL
pub const UNREPRESENTABLE: &str = "UNREPRESENTABLE";

/// Value produced whenever anything is serialized through the marker
pub const SENTINEL: &str = "__internal__";

const NOT_INTENDED: &str = "Type not intended for use";

/// Scalar that exists only to type directive arguments.
///
/// Strip it from published SDL with `SdlOptions { include_directives: false }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unrepresentable;

impl Unrepresentable {
    /// Serialize any value through the marker. Always the sentinel.
    pub fn serialize<T: ?Sized>(_value: &T) -> Value {
        Value::String(SENTINEL.to_string())
    }

    /// Parse an externally supplied (variable) value. Always fails.
    pub fn parse_value(_input: &serde_json::Value) -> Result<Self> {
        Err(FederationError::Coercion(NOT_INTENDED.to_string()))
    }

    /// Parse a literal from a document. Always fails.
    pub fn parse_literal(_input: &ast::Value) -> Result<Self> {
        Err(FederationError::Coercion(NOT_INTENDED.to_string()))
    }

    /// Schema name, as registered with async-graphql
    pub fn schema_name() -> Result<Name> {
        graphql_name(&<Self as InputType>::type_name())
    }

    /// Scalar definition added to a composed schema
    pub fn scalar_definition() -> Result<ExtendedType> {
        Ok(ExtendedType::Scalar(Node::new(SchemaScalar {
            description: Some("Strip from published SDL; directive argument type only".into()),
            name: Self::schema_name()?,
            directives: Default::default(),
        })))
    }
}

#[Scalar(name = "UNREPRESENTABLE")]
impl ScalarType for Unrepresentable {
    fn parse(_value: Value) -> InputValueResult<Self> {
        Err(InputValueError::custom(NOT_INTENDED))
    }

    fn is_valid(_value: &Value) -> bool {
        false
    }

    fn to_value(&self) -> Value {
        Self::serialize(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;

    #[test]
    fn test_serialize_is_sentinel() {
        assert_eq!(
            Unrepresentable::serialize("anything"),
            Value::String(SENTINEL.to_string())
        );
        assert_eq!(
            Unrepresentable::serialize(&42_u64),
            Value::String(SENTINEL.to_string())
        );
        assert_eq!(
            <Unrepresentable as ScalarType>::to_value(&Unrepresentable),
            Value::String(SENTINEL.to_string())
        );
    }

    #[test]
    fn test_parse_literal_fails() {
        let err = Unrepresentable::parse_literal(&ast::Value::Boolean(true)).unwrap_err();
        assert_eq!(err, FederationError::Coercion(NOT_INTENDED.to_string()));
        assert_err!(Unrepresentable::parse_literal(&ast::Value::Null));
    }

    #[test]
    fn test_parse_value_fails() {
        assert_err!(Unrepresentable::parse_value(&serde_json::json!({ "type": "User" })));
        assert_err!(Unrepresentable::parse_value(&serde_json::Value::Null));
    }

    #[test]
    fn test_scalar_type_rejects_input() {
        assert!(<Unrepresentable as ScalarType>::parse(Value::from(1)).is_err());
        assert!(!<Unrepresentable as ScalarType>::is_valid(&Value::from("__internal__")));
    }

    #[test]
    fn test_scalar_definition_uses_registered_name() {
        assert_eq!(<Unrepresentable as InputType>::type_name(), UNREPRESENTABLE);

        match Unrepresentable::scalar_definition().unwrap() {
            ExtendedType::Scalar(scalar) => assert_eq!(scalar.name.as_str(), UNREPRESENTABLE),
            other => panic!("unexpected {:?}", other),
        }
    }
}
