//! Strongly-typed identifiers for storefront entities
//!
//! All IDs are UUID-based but wrapped in newtype structs for type safety.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a global (top-level) category
    GlobalCategoryId,
    "gcat"
);
uuid_id!(
    /// Unique identifier for a category
    CategoryId,
    "cat"
);
uuid_id!(
    /// Unique identifier for a product
    ProductId,
    "product"
);
uuid_id!(
    /// Unique identifier for a user login
    UserId,
    "user"
);
uuid_id!(
    /// Unique identifier for a customer profile
    CustomerId,
    "customer"
);
uuid_id!(
    /// Unique identifier for a cart
    CartId,
    "cart"
);
uuid_id!(
    /// Unique identifier for a single cart line
    CartProductId,
    "line"
);
uuid_id!(
    /// Unique identifier for an order
    OrderId,
    "order"
);

/// Opaque bearer token identifying a login session
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    /// Number of random bytes behind a token
    pub const BYTES: usize = 32;

    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens are credentials; keep them out of logs.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "SessionToken({}…)", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id_generation() {
        let id1 = ProductId::generate();
        let id2 = ProductId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_cart_id_display() {
        let id = CartId::generate();
        let display = format!("{}", id);
        assert!(display.starts_with("cart:"));
    }

    #[test]
    fn test_ids_serialize_as_bare_uuid() {
        let uuid = Uuid::new_v4();
        let id = OrderId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
    }

    #[test]
    fn test_session_token_shape() {
        let token = SessionToken::generate();
        assert_eq!(token.as_str().len(), SessionToken::BYTES * 2);
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, SessionToken::generate());
        assert!(!format!("{:?}", token).contains(token.as_str()));
    }
}
