//! Persistence layer for the product catalog and ordering service (`PostgreSQL`).
//!
//! Every request handler talks to durable state through the [`Connection`]
//! trait. The production implementation, [`PostgresConnection`], is built
//! once at startup by [`acquire`] and shared for the life of the process.
//! Tests substitute a [`StubConnection`].
//!
//! # Architecture
//!
//! ```text
//! acquire(config) -- retry with backoff --> PostgresPool
//!     |
//!     +-- PostgresConnection (impl Connection)
//!         |-- CatalogStore   (products, components, links)
//!         |-- OrderStore     (orders + items, soft deletes, fan-out reads)
//!         +-- AccountStore   (users, password hashing, session tokens)
//! ```
//!
//! # Modules
//!
//! - [`bootstrap`] -- Startup acquisition with exponential backoff
//! - [`config`] -- YAML configuration with environment overrides
//! - [`connection`] -- The [`Connection`] facade and its production implementation
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`catalog_store`] -- Product and component reads and writes
//! - [`order_store`] -- Transactional order writes and nested order reads
//! - [`account_store`] -- Accounts, credential checks and session tokens
//! - [`policy`] -- How scoped writes treat a zero-row match
//! - [`stub`] -- Scripted test double
//! - [`error`] -- Shared error types

pub mod account_store;
pub mod bootstrap;
pub mod catalog_store;
pub mod config;
pub mod connection;
pub mod error;
pub mod order_store;
pub mod policy;
pub mod postgres;
pub mod stub;

// Re-export primary types for convenience.
pub use account_store::{AccountStore, MAX_PASSWORD_BYTES, TokenRow, UserRow};
pub use bootstrap::{RetryPolicy, acquire, retry_with_backoff};
pub use catalog_store::{CatalogStore, ComponentRow, ProductComponentRow, ProductRow};
pub use config::{ConfigError, DatabaseConfig};
pub use connection::{Connection, PostgresConnection};
pub use error::DbError;
pub use order_store::{OrderItemRow, OrderRow, OrderStore};
pub use policy::WritePolicy;
pub use postgres::{PostgresConfig, PostgresPool};
pub use stub::{Invocation, Operation, StubConnection};
