//! Coupon domain types and the pure rules behind coupon validation and
//! discount computation. Lookup and usage bookkeeping live in `pos-coupons`.

use crate::cart::{self, CartItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ─── Types ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CouponType {
    /// `value` is a percent of the cart subtotal.
    Percentage,
    /// `value` is a currency amount.
    Fixed,
    /// Buy `buy_quantity` units, get `get_quantity` units free.
    BuyXGetY,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    Active,
    Inactive,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    pub id: Uuid,
    /// Unique, compared case-insensitively.
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub coupon_type: CouponType,
    pub value: f64,
    #[serde(default)]
    pub min_purchase: Option<f64>,
    /// Cap on the discount. Only honoured for percentage coupons.
    #[serde(default)]
    pub max_discount: Option<f64>,
    #[serde(default)]
    pub buy_quantity: Option<u32>,
    #[serde(default)]
    pub get_quantity: Option<u32>,
    /// Products counted toward a buy-x-get-y offer. Empty means every product.
    #[serde(default)]
    pub applicable_products: Vec<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    pub used_count: u32,
    pub store_ids: Vec<String>,
    pub status: CouponStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// Why a coupon cannot be used. The `Display` text is shown to the cashier.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponRejection {
    #[error("Invalid coupon code")]
    InvalidCode,

    #[error("Coupon not valid for this store")]
    WrongStore,

    #[error("Coupon has expired")]
    Expired,

    #[error("Coupon usage limit reached")]
    UsageLimitReached,

    #[error("Minimum purchase of ${0} required")]
    MinimumPurchase(f64),
}

impl Coupon {
    pub fn matches_code(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }

    pub fn is_active(&self) -> bool {
        self.status == CouponStatus::Active
    }

    /// Inclusive on both ends.
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_from && now <= self.valid_to
    }

    pub fn usage_exhausted(&self) -> bool {
        self.usage_limit
            .map(|limit| self.used_count >= limit)
            .unwrap_or(false)
    }

    pub fn remaining_uses(&self) -> Option<u32> {
        self.usage_limit
            .map(|limit| limit.saturating_sub(self.used_count))
    }

    /// Checks store, validity window, usage and minimum purchase, in that
    /// order. Status and code matching are the lookup's job.
    pub fn check(
        &self,
        store_id: &str,
        cart_subtotal: f64,
        now: DateTime<Utc>,
    ) -> Result<(), CouponRejection> {
        if !self.store_ids.iter().any(|s| s == store_id) {
            return Err(CouponRejection::WrongStore);
        }
        if !self.is_within_window(now) {
            return Err(CouponRejection::Expired);
        }
        if self.usage_exhausted() {
            return Err(CouponRejection::UsageLimitReached);
        }
        if let Some(min) = self.min_purchase {
            if cart_subtotal < min {
                return Err(CouponRejection::MinimumPurchase(min));
            }
        }
        Ok(())
    }

    /// Discount this coupon grants on `items`. Never negative and never more
    /// than the cart subtotal.
    pub fn discount_for(&self, items: &[CartItem]) -> f64 {
        let subtotal = cart::subtotal(items);
        let discount = match self.coupon_type {
            CouponType::Percentage => {
                let raw = subtotal * self.value / 100.0;
                match self.max_discount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            CouponType::Fixed => self.value.min(subtotal),
            CouponType::BuyXGetY => self.buy_x_get_y_discount(items),
        };
        discount.max(0.0)
    }

    /// For every complete group of `buy + get` eligible units, the `get`
    /// cheapest eligible units are free.
    fn buy_x_get_y_discount(&self, items: &[CartItem]) -> f64 {
        let (buy, get) = match (self.buy_quantity, self.get_quantity) {
            (Some(b), Some(g)) if b > 0 && g > 0 => (b as u64, g as u64),
            _ => return 0.0,
        };

        let mut units: Vec<(f64, u64)> = items
            .iter()
            .filter(|item| item.quantity > 0 && self.applies_to(&item.product_id))
            .map(|item| (item.line_total() / item.quantity as f64, item.quantity as u64))
            .collect();

        let total_units: u64 = units.iter().map(|(_, qty)| qty).sum();
        let mut free_units = (total_units / (buy + get)) * get;

        units.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut discount = 0.0;
        for (unit_price, qty) in units {
            if free_units == 0 {
                break;
            }
            let take = qty.min(free_units);
            discount += unit_price * take as f64;
            free_units -= take;
        }
        discount
    }

    fn applies_to(&self, product_id: &str) -> bool {
        self.applicable_products.is_empty()
            || self.applicable_products.iter().any(|p| p == product_id)
    }
}

// ─── Validation result ──────────────────────────────────────────────────────

/// UI-facing validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<Coupon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CouponValidation {
    pub fn accepted(coupon: Coupon) -> Self {
        Self {
            valid: true,
            coupon: Some(coupon),
            error: None,
        }
    }

    pub fn rejected(reason: &CouponRejection) -> Self {
        Self {
            valid: false,
            coupon: None,
            error: Some(reason.to_string()),
        }
    }
}

impl From<Result<Coupon, CouponRejection>> for CouponValidation {
    fn from(result: Result<Coupon, CouponRejection>) -> Self {
        match result {
            Ok(coupon) => CouponValidation::accepted(coupon),
            Err(reason) => CouponValidation::rejected(&reason),
        }
    }
}

// ─── Admin requests ─────────────────────────────────────────────────────────

/// Fields an administrator supplies when creating a coupon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub coupon_type: CouponType,
    pub value: f64,
    #[serde(default)]
    pub min_purchase: Option<f64>,
    #[serde(default)]
    pub max_discount: Option<f64>,
    #[serde(default)]
    pub buy_quantity: Option<u32>,
    #[serde(default)]
    pub get_quantity: Option<u32>,
    #[serde(default)]
    pub applicable_products: Vec<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    pub store_ids: Vec<String>,
    pub status: CouponStatus,
}

/// Partial update. `used_count` is owned by the engine and not editable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouponUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub value: Option<f64>,
    pub min_purchase: Option<f64>,
    pub max_discount: Option<f64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub usage_limit: Option<u32>,
    pub store_ids: Option<Vec<String>>,
    pub status: Option<CouponStatus>,
}

impl CouponUpdate {
    pub fn apply_to(self, coupon: &mut Coupon) {
        if let Some(name) = self.name {
            coupon.name = name;
        }
        if let Some(description) = self.description {
            coupon.description = Some(description);
        }
        if let Some(value) = self.value {
            coupon.value = value;
        }
        if let Some(min) = self.min_purchase {
            coupon.min_purchase = Some(min);
        }
        if let Some(cap) = self.max_discount {
            coupon.max_discount = Some(cap);
        }
        if let Some(from) = self.valid_from {
            coupon.valid_from = from;
        }
        if let Some(to) = self.valid_to {
            coupon.valid_to = to;
        }
        if let Some(limit) = self.usage_limit {
            coupon.usage_limit = Some(limit);
        }
        if let Some(stores) = self.store_ids {
            coupon.store_ids = stores;
        }
        if let Some(status) = self.status {
            coupon.status = status;
        }
    }
}
