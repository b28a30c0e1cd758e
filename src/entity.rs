//! Domain entities the review subgraph can resolve

use std::fmt;

use serde::{Deserialize, Serialize};

/// User referenced by reviews
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

/// Product referenced by reviews
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub upc: String,
    pub name: String,
}

/// A successfully resolved entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "__typename")]
pub enum ResolvedEntity {
    User(User),
    Product(Product),
}

impl ResolvedEntity {
    /// Discriminant of the variant
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::User(_) => EntityKind::User,
            Self::Product(_) => EntityKind::Product,
        }
    }
}

impl From<User> for ResolvedEntity {
    fn from(user: User) -> Self {
        Self::User(user)
    }
}

impl From<Product> for ResolvedEntity {
    fn from(product: Product) -> Self {
        Self::Product(product)
    }
}

/// Explicit discriminant of [`ResolvedEntity`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    User,
    Product,
}

impl EntityKind {
    /// Every variant; checked against the type name mapping at startup
    pub const ALL: [EntityKind; 2] = [EntityKind::User, EntityKind::Product];
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("User"),
            Self::Product => f.write_str("Product"),
        }
    }
}
