//! Orders and their line items.
//!
//! An [`Order`] is read as a fan-out projection: every [`OrderItem`] embeds
//! the live [`Product`] it references (not a snapshot taken at order time),
//! and that product carries its component identifiers. An item whose product
//! can no longer be resolved keeps `product: None` instead of failing the
//! whole read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::ids::{OrderId, OrderItemId, ProductId, UserId};

/// An order with its active items fully resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned identifier.
    pub id: OrderId,
    /// Owner of the order.
    #[serde(skip_serializing, default)]
    pub user_id: UserId,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
    /// When the item set was last replaced.
    pub updated_at: DateTime<Utc>,
    /// Active (not soft-deleted) items. Order is unspecified.
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Reduce the item set to `(product, quantity)` lines, e.g. to compare
    /// what was read back against what was written.
    pub fn lines(&self) -> Vec<OrderLine> {
        self.items.iter().map(OrderItem::line).collect()
    }
}

/// A single product/quantity entry of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Store-assigned identifier.
    pub id: OrderItemId,
    /// The owning order.
    #[serde(skip_serializing, default)]
    pub order_id: OrderId,
    /// The referenced product.
    pub product_id: ProductId,
    /// The referenced product, resolved at read time. `None` when the
    /// product is missing or soft-deleted.
    pub product: Option<Product>,
    /// Number of units ordered.
    pub quantity: i32,
}

impl OrderItem {
    /// The `(product, quantity)` line this item was written from.
    pub const fn line(&self) -> OrderLine {
        OrderLine {
            product_id: self.product_id,
            quantity: self.quantity,
        }
    }
}

/// Caller input for creating or replacing the items of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderLine {
    /// The product being ordered.
    pub product_id: ProductId,
    /// Number of units.
    pub quantity: i32,
}

impl OrderLine {
    /// Build a line for `quantity` units of `product_id`.
    pub const fn new(product_id: ProductId, quantity: i32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, product: i64, quantity: i32) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(id),
            order_id: OrderId::new(1),
            product_id: ProductId::new(product),
            product: None,
            quantity,
        }
    }

    #[test]
    fn lines_reduce_items_to_product_and_quantity() {
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(1),
            user_id: UserId::new(9),
            created_at: now,
            updated_at: now,
            items: vec![item(10, 1, 2), item(11, 3, 1)],
        };

        assert_eq!(
            order.lines(),
            vec![
                OrderLine::new(ProductId::new(1), 2),
                OrderLine::new(ProductId::new(3), 1),
            ]
        );
    }

    #[test]
    fn owner_ids_are_not_serialized() {
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(4),
            user_id: UserId::new(9),
            created_at: now,
            updated_at: now,
            items: vec![item(10, 1, 2)],
        };

        let value = serde_json::to_value(&order).unwrap_or_default();
        assert_eq!(value.get("id"), Some(&serde_json::json!(4)));
        assert!(value.get("user_id").is_none());
        let first = value.get("items").and_then(|items| items.get(0));
        assert!(first.is_some_and(|i| i.get("order_id").is_none()));
        assert_eq!(
            first.and_then(|i| i.get("quantity")),
            Some(&serde_json::json!(2))
        );
    }
}
