use chrono::{DateTime, Utc};
use pos_core::loyalty::{EarnPointsResponse, LoyaltyTier};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedCoupon {
    pub code: String,
    pub name: String,
    pub discount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedReward {
    pub reward_id: Uuid,
    pub name: String,
    pub points_cost: u64,
    pub discount: f64,
}

/// Read-only totals for a cart. Amounts are rounded to cents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub subtotal: f64,
    pub coupon: Option<AppliedCoupon>,
    pub reward: Option<AppliedReward>,
    pub coupon_discount: f64,
    pub loyalty_discount: f64,
    pub tax: f64,
    pub total: f64,
    /// Points the member would earn on `total`.
    pub points_preview: Option<u64>,
}

/// Notification the UI shows when a purchase moves a member up a tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierUpgrade {
    pub customer_id: Uuid,
    pub new_tier: LoyaltyTier,
    pub title: String,
    pub message: String,
}

impl TierUpgrade {
    pub fn new(customer_id: Uuid, customer_name: &str, new_tier: LoyaltyTier) -> Self {
        Self {
            customer_id,
            new_tier,
            title: "Tier Upgrade!".to_string(),
            message: format!("{} has been upgraded to {} tier!", customer_name, new_tier),
        }
    }
}

/// Outcome of a completed checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_id: String,
    pub store_id: String,
    pub currency: String,
    pub subtotal: f64,
    pub coupon: Option<AppliedCoupon>,
    pub reward: Option<AppliedReward>,
    pub coupon_discount: f64,
    pub loyalty_discount: f64,
    pub tax: f64,
    pub total: f64,
    pub loyalty: Option<EarnPointsResponse>,
    pub tier_upgrade: Option<TierUpgrade>,
    pub completed_at: DateTime<Utc>,
}

impl Receipt {
    pub fn points_earned(&self) -> u64 {
        self.loyalty.as_ref().map(|l| l.points_earned).unwrap_or(0)
    }

    pub fn total_discount(&self) -> f64 {
        self.coupon_discount + self.loyalty_discount
    }
}

pub(crate) fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
