//! Cart - ordered, id-unique collection of line items.
//!
//! All mutations here are pure: no I/O, no notification. `CartStore` wraps a
//! `Cart` and adds persistence and subscribers on top.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{CartItem, ProductRef};
use crate::error::CartError;

/// Why a decoded item list is not a valid cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartInvariantError {
    #[error("item at position {0} has an empty id")]
    EmptyId(usize),
    #[error("item {0} appears more than once")]
    DuplicateId(String),
    #[error("item {0} has quantity 0")]
    ZeroQuantity(String),
}

/// Result of adding a product to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was appended with quantity 1.
    Inserted,
    /// The product was already present; its quantity went up by one.
    Merged,
}

/// Ordered sequence of [`CartItem`], unique by id.
///
/// Serializes as a plain JSON array of items. Deserializing checks the
/// invariants, so a stored value with duplicate ids or a zero quantity is
/// rejected rather than loaded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CartItem>", into = "Vec<CartItem>")]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities across all lines.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Add one unit of `product`. Merges into an existing line with the same id.
    ///
    /// The price must be finite and non-negative: JSON has no encoding for
    /// NaN or infinity, so such a line could never be loaded back.
    pub fn add(&mut self, product: ProductRef) -> Result<AddOutcome, CartError> {
        if product.id.is_empty() {
            return Err(CartError::InvalidProduct("product id must not be empty"));
        }
        if !product.price.is_finite() || product.price < 0.0 {
            return Err(CartError::InvalidProduct(
                "product price must be finite and non-negative",
            ));
        }

        if self.increment(&product.id) {
            return Ok(AddOutcome::Merged);
        }

        self.items.push(CartItem::from_product(product));
        Ok(AddOutcome::Inserted)
    }

    /// Raise the quantity of `id` by one. Returns false if `id` is not in the cart.
    pub fn increment(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Lower the quantity of `id` by one, removing the line when it reaches zero.
    /// Returns false if `id` is not in the cart.
    pub fn decrement(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };

        // quantity >= 1 holds for every stored line
        if self.items[index].quantity <= 1 {
            self.items.remove(index);
        } else {
            self.items[index].quantity -= 1;
        }
        true
    }

    /// Drop the line for `id` regardless of quantity.
    pub fn remove(&mut self, id: &str) -> Option<CartItem> {
        self.position(id).map(|index| self.items.remove(index))
    }

    /// Empty the cart. Returns false if it was already empty.
    pub fn clear(&mut self) -> bool {
        let had_items = !self.items.is_empty();
        self.items.clear();
        had_items
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}

impl TryFrom<Vec<CartItem>> for Cart {
    type Error = CartInvariantError;

    fn try_from(items: Vec<CartItem>) -> Result<Self, Self::Error> {
        for (index, item) in items.iter().enumerate() {
            if item.id.is_empty() {
                return Err(CartInvariantError::EmptyId(index));
            }
            if item.quantity == 0 {
                return Err(CartInvariantError::ZeroQuantity(item.id.clone()));
            }
            if items[..index].iter().any(|earlier| earlier.id == item.id) {
                return Err(CartInvariantError::DuplicateId(item.id.clone()));
            }
        }
        Ok(Self { items })
    }
}

impl From<Cart> for Vec<CartItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}
