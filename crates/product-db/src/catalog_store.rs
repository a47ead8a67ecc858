//! Catalog reads and writes: products, components and their links.
//!
//! Listing products is a two-step read: one query for the product rows and
//! one per product for its component identifiers. Only links with a positive
//! quantity and no soft-delete marker are reported. Lists come back in
//! insertion (id) order.

use chrono::{DateTime, Utc};
use product_types::{
    Component, ComponentDetail, ComponentId, NewProduct, Product, ProductComponent,
    ProductComponentId, ProductId,
};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::DbError;

/// Operations on the `products`, `components` and `product_components`
/// tables.
pub struct CatalogStore<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogStore<'a> {
    /// Create a new catalog store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List active products with their component identifiers.
    ///
    /// With `product_id` set, the result holds at most that one product.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any query fails.
    pub async fn list_products(
        &self,
        product_id: Option<ProductId>,
    ) -> Result<Vec<Product>, DbError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"SELECT id, name, teaser, description, image, price, created_at, updated_at
              FROM products
              WHERE deleted_at IS NULL
                AND ($1::BIGINT IS NULL OR id = $1)
              ORDER BY id",
        )
        .bind(product_id.map(ProductId::into_inner))
        .fetch_all(self.pool)
        .await?;

        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            let components = self.component_ids(ProductId::new(row.id)).await?;
            products.push(row.into_product(components));
        }

        Ok(products)
    }

    /// Fetch one active product with its component identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any query fails.
    pub async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>, DbError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"SELECT id, name, teaser, description, image, price, created_at, updated_at
              FROM products
              WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(product_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => {
                let components = self.component_ids(product_id).await?;
                Ok(Some(row.into_product(components)))
            }
            None => Ok(None),
        }
    }

    /// Identifiers of the live components linked to a product with a
    /// positive quantity. A soft-deleted link or component is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn component_ids(&self, product_id: ProductId) -> Result<Vec<ComponentId>, DbError> {
        let ids = sqlx::query_scalar::<_, i64>(
            r"SELECT pc.component_id
              FROM product_components pc
              JOIN components c ON c.id = pc.component_id
              WHERE pc.product_id = $1
                AND pc.quantity > 0
                AND pc.deleted_at IS NULL
                AND c.deleted_at IS NULL
              ORDER BY pc.component_id",
        )
        .bind(product_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        Ok(ids.into_iter().map(ComponentId::new).collect())
    }

    /// List the components of a product with the quantity and unit recorded
    /// on each link.
    ///
    /// A product without components (or an unknown product) yields an empty
    /// list.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_components(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ComponentDetail>, DbError> {
        let rows = sqlx::query_as::<_, ComponentDetailRow>(
            r"SELECT c.id, c.name, pc.quantity, pc.unit
              FROM product_components pc
              JOIN components c ON c.id = pc.component_id
              WHERE pc.product_id = $1
                AND pc.deleted_at IS NULL
                AND c.deleted_at IS NULL
              ORDER BY pc.id",
        )
        .bind(product_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ComponentDetail::from).collect())
    }

    /// Insert a product. The store assigns the id and timestamps.
    ///
    /// Names are not required to be unique.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn create_product(&self, draft: &NewProduct) -> Result<Product, DbError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"INSERT INTO products (name, teaser, description, image, price)
              VALUES ($1, $2, $3, $4, $5)
              RETURNING id, name, teaser, description, image, price, created_at, updated_at",
        )
        .bind(&draft.name)
        .bind(&draft.teaser)
        .bind(&draft.description)
        .bind(&draft.image)
        .bind(draft.price)
        .fetch_one(self.pool)
        .await?;

        tracing::debug!(product_id = row.id, name = %row.name, "Created product");
        Ok(row.into_product(Vec::new()))
    }

    /// Insert a component. The store assigns the id and timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn create_component(&self, name: &str) -> Result<Component, DbError> {
        let row = sqlx::query_as::<_, ComponentRow>(
            r"INSERT INTO components (name)
              VALUES ($1)
              RETURNING id, name, created_at, updated_at",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await?;

        tracing::debug!(component_id = row.id, name, "Created component");
        Ok(row.into())
    }

    /// Link a component to a product, or update the existing link.
    ///
    /// Uses `ON CONFLICT` on the `(product_id, component_id)` constraint, so
    /// a second write for the same pair updates quantity and unit in place.
    /// A soft-deleted link is revived.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails, including when
    /// either side of the link does not exist.
    pub async fn upsert_component_link(
        &self,
        product_id: ProductId,
        component_id: ComponentId,
        quantity: i32,
        unit: &str,
    ) -> Result<ProductComponent, DbError> {
        let row = sqlx::query_as::<_, ProductComponentRow>(
            r"INSERT INTO product_components (product_id, component_id, quantity, unit)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (product_id, component_id) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                unit = EXCLUDED.unit,
                updated_at = now(),
                deleted_at = NULL
              RETURNING id, product_id, component_id, quantity, unit, created_at, updated_at",
        )
        .bind(product_id.into_inner())
        .bind(component_id.into_inner())
        .bind(quantity)
        .bind(unit)
        .fetch_one(self.pool)
        .await?;

        tracing::debug!(
            product_id = row.product_id,
            component_id = row.component_id,
            quantity,
            unit,
            "Upserted product component"
        );
        Ok(row.into())
    }
}

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    /// Auto-incremented product ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Short marketing line.
    pub teaser: String,
    /// Long-form description.
    pub description: String,
    /// Image path or URL.
    pub image: String,
    /// Unit price.
    pub price: Decimal,
    /// Insert timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    /// Combine the row with its component identifiers.
    pub fn into_product(self, components: Vec<ComponentId>) -> Product {
        Product {
            id: ProductId::new(self.id),
            name: self.name,
            teaser: self.teaser,
            description: self.description,
            image: self.image,
            price: self.price,
            created_at: self.created_at,
            updated_at: self.updated_at,
            components,
        }
    }
}

/// A row from the `components` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ComponentRow {
    /// Auto-incremented component ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Insert timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<ComponentRow> for Component {
    fn from(row: ComponentRow) -> Self {
        Self {
            id: ComponentId::new(row.id),
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A row from the `product_components` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductComponentRow {
    /// Auto-incremented link ID.
    pub id: i64,
    /// Linked product.
    pub product_id: i64,
    /// Linked component.
    pub component_id: i64,
    /// Quantity of the component used.
    pub quantity: i32,
    /// Unit of `quantity`.
    pub unit: String,
    /// Insert timestamp.
    pub created_at: DateTime<Utc>,
    /// Last upsert timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<ProductComponentRow> for ProductComponent {
    fn from(row: ProductComponentRow) -> Self {
        Self {
            id: ProductComponentId::new(row.id),
            product_id: ProductId::new(row.product_id),
            component_id: ComponentId::new(row.component_id),
            quantity: row.quantity,
            unit: row.unit,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A component joined through its product link.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ComponentDetailRow {
    id: i64,
    name: String,
    quantity: i32,
    unit: String,
}

impl From<ComponentDetailRow> for ComponentDetail {
    fn from(row: ComponentDetailRow) -> Self {
        Self {
            id: ComponentId::new(row.id),
            name: row.name,
            quantity: row.quantity,
            unit: row.unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_row_keeps_fields_and_components() {
        let now = Utc::now();
        let row = ProductRow {
            id: 3,
            name: "Latte".to_owned(),
            teaser: "Smooth".to_owned(),
            description: String::new(),
            image: "/latte.png".to_owned(),
            price: Decimal::new(350, 2),
            created_at: now,
            updated_at: now,
        };

        let product = row.into_product(vec![ComponentId::new(1), ComponentId::new(4)]);
        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(product.name, "Latte");
        assert_eq!(product.price, Decimal::new(350, 2));
        assert_eq!(product.components.len(), 2);
    }

    #[test]
    fn link_row_maps_to_typed_ids() {
        let now = Utc::now();
        let link: ProductComponent = ProductComponentRow {
            id: 9,
            product_id: 3,
            component_id: 4,
            quantity: 200,
            unit: "ml".to_owned(),
            created_at: now,
            updated_at: now,
        }
        .into();

        assert_eq!(link.id, ProductComponentId::new(9));
        assert_eq!(link.product_id, ProductId::new(3));
        assert_eq!(link.component_id, ComponentId::new(4));
        assert_eq!(link.unit, "ml");
    }
}
