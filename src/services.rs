//! In-memory lookup services for users and products
//!
//! Stand-ins for the user and product stores; each one is registered into
//! the lookup table through its [`EntityLookup`] impl.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::dispatch::{EntityKey, EntityLookup, LookupError};
use crate::entity::{Product, ResolvedEntity, User};

/// Users by id
#[derive(Debug, Clone, Default)]
pub struct UserService {
    users: HashMap<String, User>,
}

impl UserService {
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.id.clone(), u)).collect(),
        }
    }

    pub fn lookup_user(&self, id: &str) -> Option<User> {
        self.users.get(id).cloned()
    }
}

#[async_trait]
impl EntityLookup for UserService {
    async fn lookup(&self, key: EntityKey) -> Result<ResolvedEntity, LookupError> {
        let id = key.require("id")?;
        self.lookup_user(id)
            .map(ResolvedEntity::User)
            .ok_or(LookupError::NotFound)
    }
}

/// Products by UPC
#[derive(Debug, Clone, Default)]
pub struct ProductService {
    products: HashMap<String, Product>,
}

impl ProductService {
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.upc.clone(), p)).collect(),
        }
    }

    pub fn lookup_product(&self, upc: &str) -> Option<Product> {
        self.products.get(upc).cloned()
    }
}

#[async_trait]
impl EntityLookup for ProductService {
    async fn lookup(&self, key: EntityKey) -> Result<ResolvedEntity, LookupError> {
        let upc = key.require("upc")?;
        self.lookup_product(upc)
            .map(ResolvedEntity::Product)
            .ok_or(LookupError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_user_lookup() {
        let service = UserService::new([User {
            id: "u1".into(),
            username: "ada".into(),
        }]);

        let found = service.lookup(EntityKey::new().with("id", "u1")).await;
        assert!(matches!(found, Ok(ResolvedEntity::User(u)) if u.username == "ada"));

        let missing = service.lookup(EntityKey::new().with("id", "u2")).await;
        assert_eq!(missing, Err(LookupError::NotFound));
    }

    #[tokio::test]
    async fn test_product_lookup() {
        let service = ProductService::new([Product {
            upc: "p1".into(),
            name: "Table".into(),
        }]);

        assert!(service.lookup(EntityKey::new().with("upc", "p1")).await.is_ok());
        assert_eq!(
            service.lookup(EntityKey::new().with("id", "p1")).await,
            Err(LookupError::NotFound)
        );
    }
}
