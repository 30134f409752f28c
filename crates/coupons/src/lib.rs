//! Coupon engine for the point-of-sale discount core.
//!
//! Validates coupon codes against store, validity window, usage and minimum
//! purchase rules, computes cart discounts, and owns `used_count`. Coupons
//! are held behind the [`CouponStore`] port; [`InMemoryCouponStore`] is the
//! DashMap-backed implementation used by the demo and tests.

pub mod engine;
pub mod store;

pub use engine::CouponEngine;
pub use store::{CouponStore, InMemoryCouponStore};
