//! Type-safe identifier wrappers around store-assigned integer keys.
//!
//! Every row in the backing store is keyed by an auto-incremented `BIGSERIAL`
//! column. Callers never choose identifiers; they only receive them from the
//! store and pass them back. The newtypes keep a product id from being handed
//! to an order lookup by accident.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around an `i64` key with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw key returned by the store.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the inner key.
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of a catalog product.
    ProductId
}

define_id! {
    /// Identifier of a component (ingredient) that products are made of.
    ComponentId
}

define_id! {
    /// Identifier of a product-to-component link row.
    ProductComponentId
}

define_id! {
    /// Identifier of a user account.
    UserId
}

define_id! {
    /// Identifier of a session token row.
    TokenId
}

define_id! {
    /// Identifier of an order.
    OrderId
}

define_id! {
    /// Identifier of a single line item within an order.
    OrderItemId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&ProductId::new(7)).ok();
        assert_eq!(json.as_deref(), Some("7"));
    }

    #[test]
    fn id_deserializes_from_bare_integer() {
        let id: Result<OrderId, _> = serde_json::from_str("42");
        assert_eq!(id.ok(), Some(OrderId::new(42)));
    }

    #[test]
    fn id_display_matches_inner() {
        let id = UserId::from(5);
        assert_eq!(id.to_string(), "5");
        assert_eq!(i64::from(id), 5);
    }
}
