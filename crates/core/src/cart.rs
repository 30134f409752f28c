use serde::{Deserialize, Serialize};

/// A single cart line supplied by the checkout UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
    /// Unit price.
    pub price: f64,
    pub quantity: u32,
    /// Line-level markdown already applied by the UI.
    #[serde(default)]
    pub discount: f64,
}

impl CartItem {
    pub fn new(product_id: impl Into<String>, price: f64, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: String::new(),
            price,
            quantity,
            discount: 0.0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = name.into();
        self
    }

    /// Line total after the line markdown, never negative.
    pub fn line_total(&self) -> f64 {
        (self.price * self.quantity as f64 - self.discount).max(0.0)
    }
}

/// Sum of line totals.
pub fn subtotal(items: &[CartItem]) -> f64 {
    items.iter().map(CartItem::line_total).sum()
}
