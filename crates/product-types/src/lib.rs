//! Shared domain types for the product catalog and ordering service.
//!
//! These are the plain structures that cross the persistence boundary: the
//! data layer produces them, and the transport layer serializes them.
//!
//! # Modules
//!
//! - [`ids`] -- Integer identifier newtypes for every entity
//! - [`catalog`] -- Products, components and their links
//! - [`order`] -- Orders, order items and order input lines
//! - [`account`] -- Users, session tokens and session keys

pub mod account;
pub mod catalog;
pub mod ids;
pub mod order;

// Re-export all public types at crate root for convenience.
pub use account::{SessionKey, Token, User};
pub use catalog::{Component, ComponentDetail, NewProduct, Product, ProductComponent};
pub use ids::{
    ComponentId, OrderId, OrderItemId, ProductComponentId, ProductId, TokenId, UserId,
};
pub use order::{Order, OrderItem, OrderLine};
