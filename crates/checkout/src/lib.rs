//! Checkout composition: turns a cart plus an optional coupon code and
//! loyalty member into final totals, and performs the commit-time side
//! effects (coupon usage, reward redemption, points accrual) exactly once.

pub mod receipt;
pub mod service;

pub use receipt::{AppliedCoupon, AppliedReward, Quote, Receipt, TierUpgrade};
pub use service::{CheckoutRequest, CheckoutService};
