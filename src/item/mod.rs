//! Cart line items and the ordered cart that holds them.

mod cart;

use serde::{Deserialize, Serialize};

pub use cart::{AddOutcome, Cart, CartInvariantError};

/// A product as supplied by the catalog, before it has a quantity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: String,
    pub title: String,
    #[serde(alias = "imageUrl")]
    pub image_url: String,
    pub price: f64,
}

impl ProductRef {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        image_url: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            image_url: image_url.into(),
            price,
        }
    }
}

/// A single line of the cart. `quantity` is always at least 1 while the
/// item is part of a [`Cart`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub title: String,
    #[serde(alias = "imageUrl")]
    pub image_url: String,
    pub price: f64,
    pub quantity: u32,
}

impl CartItem {
    /// Build a fresh line for `product` with a quantity of one.
    pub fn from_product(product: ProductRef) -> Self {
        Self {
            id: product.id,
            title: product.title,
            image_url: product.image_url,
            price: product.price,
            quantity: 1,
        }
    }
}

impl From<ProductRef> for CartItem {
    fn from(product: ProductRef) -> Self {
        CartItem::from_product(product)
    }
}
