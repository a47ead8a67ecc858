//! Catalog entities: products, components and the links between them.
//!
//! A [`Product`] is made of any number of [`Component`]s. The many-to-many
//! relation lives in the product-component link table, where each row carries
//! the quantity and unit of the component used by the product. A product and
//! a component can be linked at most once; writing the same pair again
//! updates the existing link.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{ComponentId, ProductComponentId, ProductId};

/// A product as returned by the catalog, with its component identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Store-assigned identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Short marketing line.
    #[serde(default)]
    pub teaser: String,
    /// Long-form description.
    #[serde(default)]
    pub description: String,
    /// Image path or URL.
    #[serde(default)]
    pub image: String,
    /// Unit price.
    pub price: Decimal,
    /// When the row was inserted.
    pub created_at: DateTime<Utc>,
    /// When the row was last touched.
    pub updated_at: DateTime<Utc>,
    /// Components linked with a positive quantity. Order is unspecified.
    #[serde(default)]
    pub components: Vec<ComponentId>,
}

/// The caller-supplied fields of a product about to be created.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewProduct {
    /// Display name.
    pub name: String,
    /// Short marketing line.
    #[serde(default)]
    pub teaser: String,
    /// Long-form description.
    #[serde(default)]
    pub description: String,
    /// Image path or URL.
    #[serde(default)]
    pub image: String,
    /// Unit price.
    pub price: Decimal,
}

impl NewProduct {
    /// Start a draft with a name and price; descriptive fields stay empty.
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            price,
            ..Self::default()
        }
    }
}

/// A component (ingredient) with an independent lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Store-assigned identifier.
    pub id: ComponentId,
    /// Display name.
    pub name: String,
    /// When the row was inserted.
    pub created_at: DateTime<Utc>,
    /// When the row was last touched.
    pub updated_at: DateTime<Utc>,
}

/// A row of the product-component link table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductComponent {
    /// Store-assigned identifier of the link row.
    pub id: ProductComponentId,
    /// The product side of the link.
    pub product_id: ProductId,
    /// The component side of the link.
    pub component_id: ComponentId,
    /// How much of the component the product uses.
    pub quantity: i32,
    /// Unit of `quantity` (`ml`, `g`, ...).
    pub unit: String,
    /// When the link was first written.
    pub created_at: DateTime<Utc>,
    /// When the link was last upserted.
    pub updated_at: DateTime<Utc>,
}

/// A component as seen through a specific product: name plus the quantity
/// and unit recorded on the link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDetail {
    /// The component identifier.
    pub id: ComponentId,
    /// The component name.
    pub name: String,
    /// Quantity used by the product.
    pub quantity: i32,
    /// Unit of `quantity`.
    pub unit: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_product_leaves_descriptive_fields_empty() {
        let draft = NewProduct::new("Latte", Decimal::new(350, 2));
        assert_eq!(draft.name, "Latte");
        assert_eq!(draft.price.to_string(), "3.50");
        assert!(draft.teaser.is_empty());
        assert!(draft.description.is_empty());
        assert!(draft.image.is_empty());
    }

    #[test]
    fn new_product_accepts_minimal_json() {
        let draft: Result<NewProduct, _> =
            serde_json::from_str(r#"{"name": "Americano", "price": "2.25"}"#);
        let draft = draft.ok();
        assert_eq!(draft.as_ref().map(|d| d.name.as_str()), Some("Americano"));
        assert_eq!(draft.map(|d| d.price), Some(Decimal::new(225, 2)));
    }
}
