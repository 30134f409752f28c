//! Checkout orchestration: prices a cart with an optional coupon and an
//! optional loyalty reward, then commits usage, redemption, and accrual.

use crate::receipt::{round_cents, AppliedCoupon, AppliedReward, Quote, Receipt, TierUpgrade};
use pos_core::cart::{self, CartItem};
use pos_core::clock::Clock;
use pos_core::config::CheckoutConfig;
use pos_core::coupon::Coupon;
use pos_core::error::{DiscountError, DiscountResult};
use pos_core::loyalty::{calculate_points_earned, calculate_reward_discount, LoyaltyCustomer};
use pos_coupons::CouponEngine;
use pos_loyalty::LoyaltyEngine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub store_id: String,
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub loyalty_customer_id: Option<Uuid>,
    #[serde(default)]
    pub reward_id: Option<Uuid>,
    /// Generated from the clock when absent.
    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl CheckoutRequest {
    pub fn new(store_id: impl Into<String>, items: Vec<CartItem>) -> Self {
        Self {
            store_id: store_id.into(),
            items,
            coupon_code: None,
            loyalty_customer_id: None,
            reward_id: None,
            transaction_id: None,
        }
    }
}

/// Priced cart plus the records the commit step needs.
struct Priced {
    quote: Quote,
    coupon: Option<Coupon>,
    customer: Option<LoyaltyCustomer>,
}

pub struct CheckoutService {
    config: CheckoutConfig,
    coupons: Arc<CouponEngine>,
    loyalty: Arc<LoyaltyEngine>,
    clock: Arc<dyn Clock>,
}

impl CheckoutService {
    pub fn new(
        config: &CheckoutConfig,
        coupons: Arc<CouponEngine>,
        loyalty: Arc<LoyaltyEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        info!(tax_rate = config.tax_rate, currency = %config.currency, "Checkout service initialized");
        Self {
            config: config.clone(),
            coupons,
            loyalty,
            clock,
        }
    }

    /// Price the cart without changing any state.
    pub fn quote(&self, request: &CheckoutRequest) -> DiscountResult<Quote> {
        Ok(self.price(request)?.quote)
    }

    fn price(&self, request: &CheckoutRequest) -> DiscountResult<Priced> {
        let now = self.clock.now();
        let subtotal = cart::subtotal(&request.items);

        let coupon = match request.coupon_code.as_deref() {
            Some(code) => Some(self.coupons.check_coupon(code, &request.store_id, subtotal, now)?),
            None => None,
        };
        let coupon_discount = coupon
            .as_ref()
            .map(|c| round_cents(self.coupons.apply_coupon(c, &request.items)))
            .unwrap_or(0.0);

        let customer = match request.loyalty_customer_id {
            Some(id) => Some(
                self.loyalty
                    .get_customer(id)
                    .ok_or_else(|| DiscountError::CustomerNotFound(id.to_string()))?,
            ),
            None => None,
        };

        let reward = match request.reward_id {
            Some(reward_id) => {
                let customer = customer.as_ref().ok_or_else(|| {
                    DiscountError::CustomerNotFound("reward requires a loyalty customer".to_string())
                })?;
                let reward = self
                    .loyalty
                    .get_reward(reward_id)
                    .ok_or_else(|| DiscountError::RewardNotFound(reward_id.to_string()))?;
                reward.check_redeemable(customer)?;
                Some(reward)
            }
            None => None,
        };
        // Rewards apply to what is left after the coupon.
        let loyalty_discount = reward
            .as_ref()
            .map(|r| round_cents(calculate_reward_discount(r, (subtotal - coupon_discount).max(0.0))))
            .unwrap_or(0.0);

        let taxable = (subtotal - coupon_discount - loyalty_discount).max(0.0);
        let tax = round_cents(taxable * self.config.tax_rate);
        let total = round_cents(taxable + tax);
        let points_preview = customer.as_ref().map(|c| calculate_points_earned(total, c.tier));

        let quote = Quote {
            subtotal: round_cents(subtotal),
            coupon: coupon.as_ref().map(|c| AppliedCoupon {
                code: c.code.clone(),
                name: c.name.clone(),
                discount: coupon_discount,
            }),
            reward: reward.as_ref().map(|r| AppliedReward {
                reward_id: r.id,
                name: r.name.clone(),
                points_cost: r.points_cost,
                discount: loyalty_discount,
            }),
            coupon_discount,
            loyalty_discount,
            tax,
            total,
            points_preview,
        };
        Ok(Priced {
            quote,
            coupon,
            customer,
        })
    }

    /// Price the cart and commit it: count the coupon use, spend the
    /// reward's points, then accrue points on the final total. Nothing is
    /// written if pricing fails.
    pub fn complete(&self, request: &CheckoutRequest) -> DiscountResult<Receipt> {
        let Priced {
            quote,
            coupon,
            customer,
        } = self.price(request)?;
        let now = self.clock.now();
        let transaction_id = request
            .transaction_id
            .clone()
            .unwrap_or_else(|| format!("TXN{}", now.timestamp_millis()));

        if let Some(coupon) = &coupon {
            self.coupons.record_coupon_usage(&coupon.code)?;
        }

        if let (Some(customer), Some(applied)) = (&customer, &quote.reward) {
            if let Err(reason) = self.loyalty.redeem_reward(customer.id, applied.reward_id) {
                warn!(transaction_id = %transaction_id, reason = %reason, "Checkout aborted at redemption");
                if let Some(coupon) = &coupon {
                    if let Err(err) = self.coupons.release_coupon_usage(&coupon.code) {
                        error!(code = %coupon.code, error = %err, "Failed to release coupon usage");
                    }
                }
                return Err(reason.into());
            }
        }

        let loyalty = match &customer {
            Some(customer) => Some(self.loyalty.process_loyalty_transaction(
                customer.id,
                quote.total,
                &transaction_id,
            )?),
            None => None,
        };
        let tier_upgrade = match (&customer, &loyalty) {
            (Some(customer), Some(earned)) => earned
                .new_tier
                .map(|tier| TierUpgrade::new(customer.id, &customer.name, tier)),
            _ => None,
        };

        let receipt = Receipt {
            transaction_id,
            store_id: request.store_id.clone(),
            currency: self.config.currency.clone(),
            subtotal: quote.subtotal,
            coupon: quote.coupon,
            reward: quote.reward,
            coupon_discount: quote.coupon_discount,
            loyalty_discount: quote.loyalty_discount,
            tax: quote.tax,
            total: quote.total,
            loyalty,
            tier_upgrade,
            completed_at: now,
        };

        metrics::counter!("checkout.completed").increment(1);
        info!(
            transaction_id = %receipt.transaction_id,
            store_id = %receipt.store_id,
            subtotal = receipt.subtotal,
            discount = receipt.total_discount(),
            total = receipt.total,
            points_earned = receipt.points_earned(),
            "Checkout completed"
        );
        Ok(receipt)
    }
}
