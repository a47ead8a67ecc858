//! Order reads and transactional order mutations.
//!
//! Every mutation runs in its own transaction. A failure at any step drops
//! the transaction handle, which rolls it back, so no partial order or item
//! rows ever become visible.
//!
//! # Fan-out read
//!
//! ```text
//! orders (user, not deleted)
//!   +-- order_items (not deleted)
//!         +-- products (not deleted)         -> None when missing
//!               +-- product_components (qty > 0, not deleted)
//! ```
//!
//! # Item replacement
//!
//! An update is a wholesale replacement: every active item of the order is
//! soft-deleted and the new lines are inserted. The old rows stay in the
//! table with `deleted_at` set.

use chrono::{DateTime, Utc};
use product_types::{
    Order, OrderId, OrderItem, OrderItemId, OrderLine, Product, ProductId, UserId,
};
use sqlx::{PgConnection, PgPool};

use crate::catalog_store::CatalogStore;
use crate::error::DbError;
use crate::policy::WritePolicy;

/// Operations on the `orders` and `order_items` tables.
pub struct OrderStore<'a> {
    pool: &'a PgPool,
    policy: WritePolicy,
}

impl<'a> OrderStore<'a> {
    /// Create a new order store bound to a connection pool, with the
    /// permissive write policy.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            policy: WritePolicy::Permissive,
        }
    }

    /// Set the policy applied when a scoped update/delete matches no order.
    #[must_use]
    pub const fn with_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// List a user's active orders with items, products and components
    /// resolved.
    ///
    /// With `order_id` set, the result holds at most that one order. An item
    /// whose product is missing or soft-deleted is returned with
    /// `product: None`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any query fails.
    pub async fn list_orders(
        &self,
        user_id: UserId,
        order_id: Option<OrderId>,
    ) -> Result<Vec<Order>, DbError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"SELECT id, user_id, created_at, updated_at
              FROM orders
              WHERE user_id = $1
                AND deleted_at IS NULL
                AND ($2::BIGINT IS NULL OR id = $2)
              ORDER BY id",
        )
        .bind(user_id.into_inner())
        .bind(order_id.map(OrderId::into_inner))
        .fetch_all(self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.list_items(OrderId::new(row.id)).await?;
            orders.push(row.into_order(items));
        }

        Ok(orders)
    }

    /// Active items of one order, each with its product resolved.
    async fn list_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, DbError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"SELECT id, order_id, product_id, quantity
              FROM order_items
              WHERE order_id = $1 AND deleted_at IS NULL
              ORDER BY id",
        )
        .bind(order_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        let catalog = CatalogStore::new(self.pool);
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let product = catalog.get_product(ProductId::new(row.product_id)).await?;
            items.push(row.into_item(product));
        }

        Ok(items)
    }

    /// Place an order with an initial set of lines, atomically.
    ///
    /// Returns the order re-read through [`OrderStore::list_orders`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any insert fails; nothing is
    /// committed in that case.
    pub async fn create_order(
        &self,
        user_id: UserId,
        lines: &[OrderLine],
    ) -> Result<Order, DbError> {
        let mut tx = self.pool.begin().await?;

        let order_id: i64 = sqlx::query_scalar(
            r"INSERT INTO orders (user_id)
              VALUES ($1)
              RETURNING id",
        )
        .bind(user_id.into_inner())
        .fetch_one(&mut *tx)
        .await?;

        insert_items(&mut *tx, order_id, lines).await?;
        tx.commit().await?;

        tracing::debug!(
            order_id,
            user_id = user_id.into_inner(),
            items = lines.len(),
            "Created order"
        );

        self.reload(user_id, OrderId::new(order_id)).await
    }

    /// Replace the full item set of one of the user's orders, atomically.
    ///
    /// Returns `Ok(None)` under the permissive policy when the order does
    /// not belong to the user, is deleted, or does not exist; nothing is
    /// written in that case.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] under the strict policy when no order
    /// matched, or [`DbError::Postgres`] if any statement fails. Nothing is
    /// committed on error.
    pub async fn update_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
        lines: &[OrderLine],
    ) -> Result<Option<Order>, DbError> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query(
            r"UPDATE orders SET updated_at = now()
              WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
        )
        .bind(order_id.into_inner())
        .bind(user_id.into_inner())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if !self.policy.check(touched, "order", order_id.into_inner())? {
            tx.rollback().await?;
            return Ok(None);
        }

        let replaced = sqlx::query(
            r"UPDATE order_items SET deleted_at = now(), updated_at = now()
              WHERE order_id = $1 AND deleted_at IS NULL",
        )
        .bind(order_id.into_inner())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        insert_items(&mut *tx, order_id.into_inner(), lines).await?;
        tx.commit().await?;

        tracing::debug!(
            order_id = order_id.into_inner(),
            replaced,
            items = lines.len(),
            "Replaced order items"
        );

        self.reload(user_id, order_id).await.map(Some)
    }

    /// Soft-delete one of the user's orders together with its items,
    /// atomically.
    ///
    /// Under the permissive policy a foreign, missing or already deleted
    /// order is a successful no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] under the strict policy when no order
    /// matched, or [`DbError::Postgres`] if any statement fails.
    pub async fn delete_order(&self, user_id: UserId, order_id: OrderId) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        let items = sqlx::query(
            r"UPDATE order_items SET deleted_at = now(), updated_at = now()
              WHERE deleted_at IS NULL
                AND order_id IN (
                  SELECT id FROM orders
                  WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
                )",
        )
        .bind(order_id.into_inner())
        .bind(user_id.into_inner())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let deleted = sqlx::query(
            r"UPDATE orders SET deleted_at = now(), updated_at = now()
              WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
        )
        .bind(order_id.into_inner())
        .bind(user_id.into_inner())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        self.policy.check(deleted, "order", order_id.into_inner())?;
        tx.commit().await?;

        tracing::debug!(
            order_id = order_id.into_inner(),
            deleted,
            items,
            "Deleted order"
        );
        Ok(())
    }

    /// Read back a single order right after writing it.
    async fn reload(&self, user_id: UserId, order_id: OrderId) -> Result<Order, DbError> {
        self.list_orders(user_id, Some(order_id))
            .await?
            .into_iter()
            .next()
            .ok_or(DbError::NotFound {
                entity: "order",
                id: order_id.into_inner(),
            })
    }
}

/// Insert one item row per line in a single `UNNEST` statement.
async fn insert_items(
    conn: &mut PgConnection,
    order_id: i64,
    lines: &[OrderLine],
) -> Result<(), DbError> {
    if lines.is_empty() {
        return Ok(());
    }

    let product_ids: Vec<i64> = lines.iter().map(|l| l.product_id.into_inner()).collect();
    let quantities: Vec<i32> = lines.iter().map(|l| l.quantity).collect();

    sqlx::query(
        r"INSERT INTO order_items (order_id, product_id, quantity)
          SELECT $1::BIGINT, product_id, quantity
          FROM UNNEST($2::BIGINT[], $3::INTEGER[]) AS lines (product_id, quantity)",
    )
    .bind(order_id)
    .bind(&product_ids)
    .bind(&quantities)
    .execute(conn)
    .await?;

    Ok(())
}

/// A row from the `orders` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    /// Auto-incremented order ID.
    pub id: i64,
    /// Owner of the order.
    pub user_id: i64,
    /// Insert timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    /// Convert into the domain type with its resolved items.
    pub fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: OrderId::new(self.id),
            user_id: UserId::new(self.user_id),
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        }
    }
}

/// A row from the `order_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    /// Auto-incremented item ID.
    pub id: i64,
    /// Owning order.
    pub order_id: i64,
    /// Referenced product.
    pub product_id: i64,
    /// Units ordered.
    pub quantity: i32,
}

impl OrderItemRow {
    /// Convert into the domain type. `product` is `None` when the referenced
    /// product is missing or soft-deleted.
    pub fn into_item(self, product: Option<Product>) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(self.id),
            order_id: OrderId::new(self.order_id),
            product_id: ProductId::new(self.product_id),
            product,
            quantity: self.quantity,
        }
    }
}
