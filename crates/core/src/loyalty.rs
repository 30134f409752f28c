//! Loyalty program domain types: spend-driven tiers, points ledger, rewards.
//!
//! - Four tiers: Bronze → Silver → Gold → Platinum, chosen from lifetime spend
//! - Points earned per whole currency unit, scaled by the tier multiplier
//! - Reward catalog entries redeemable for points, each producing a discount

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ─── Tier System ────────────────────────────────────────────────────────────

/// Loyalty tier levels, ordered by rank.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoyaltyTier {
    /// Entry level. Every member starts here.
    Bronze,
    /// $500 lifetime spend.
    Silver,
    /// $1,500 lifetime spend.
    Gold,
    /// $5,000 lifetime spend. Top of the ladder.
    Platinum,
}

/// Tiers in ascending `min_spent` order.
pub const TIERS: [LoyaltyTier; 4] = [
    LoyaltyTier::Bronze,
    LoyaltyTier::Silver,
    LoyaltyTier::Gold,
    LoyaltyTier::Platinum,
];

impl LoyaltyTier {
    /// Lifetime spend at which this tier starts.
    pub fn min_spent(&self) -> f64 {
        match self {
            LoyaltyTier::Bronze => 0.0,
            LoyaltyTier::Silver => 500.0,
            LoyaltyTier::Gold => 1500.0,
            LoyaltyTier::Platinum => 5000.0,
        }
    }

    pub fn points_multiplier(&self) -> f64 {
        match self {
            LoyaltyTier::Bronze => 1.0,
            LoyaltyTier::Silver => 1.25,
            LoyaltyTier::Gold => 1.5,
            LoyaltyTier::Platinum => 2.0,
        }
    }

    /// Standing member discount, in percent.
    pub fn discount_percentage(&self) -> f64 {
        match self {
            LoyaltyTier::Bronze => 0.0,
            LoyaltyTier::Silver => 5.0,
            LoyaltyTier::Gold => 10.0,
            LoyaltyTier::Platinum => 15.0,
        }
    }

    pub fn benefits(&self) -> &'static [&'static str] {
        match self {
            LoyaltyTier::Bronze => &["Basic rewards", "Birthday discount"],
            LoyaltyTier::Silver => &["5% discount", "Priority support", "Early access to sales"],
            LoyaltyTier::Gold => &["10% discount", "Free shipping", "Exclusive products", "Personal shopper"],
            LoyaltyTier::Platinum => &["15% discount", "VIP events", "Concierge service", "Custom orders"],
        }
    }

    pub fn rank(&self) -> u8 {
        *self as u8
    }

    pub fn next(&self) -> Option<LoyaltyTier> {
        match self {
            LoyaltyTier::Bronze => Some(LoyaltyTier::Silver),
            LoyaltyTier::Silver => Some(LoyaltyTier::Gold),
            LoyaltyTier::Gold => Some(LoyaltyTier::Platinum),
            LoyaltyTier::Platinum => None,
        }
    }

    pub fn info(&self) -> TierInfo {
        TierInfo {
            tier: *self,
            min_spent: self.min_spent(),
            points_multiplier: self.points_multiplier(),
            discount_percentage: self.discount_percentage(),
            benefits: self.benefits().iter().map(|b| b.to_string()).collect(),
        }
    }
}

impl Default for LoyaltyTier {
    fn default() -> Self {
        LoyaltyTier::Bronze
    }
}

impl fmt::Display for LoyaltyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoyaltyTier::Bronze => "Bronze",
            LoyaltyTier::Silver => "Silver",
            LoyaltyTier::Gold => "Gold",
            LoyaltyTier::Platinum => "Platinum",
        };
        f.write_str(name)
    }
}

/// Flattened tier row for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierInfo {
    pub tier: LoyaltyTier,
    pub min_spent: f64,
    pub points_multiplier: f64,
    pub discount_percentage: f64,
    pub benefits: Vec<String>,
}

/// Highest tier whose threshold does not exceed `total_spent`.
pub fn determine_tier(total_spent: f64) -> LoyaltyTier {
    TIERS
        .iter()
        .rev()
        .find(|tier| total_spent >= tier.min_spent())
        .copied()
        .unwrap_or(LoyaltyTier::Bronze)
}

/// Points for a purchase: whole currency units times the tier multiplier,
/// floored.
pub fn calculate_points_earned(amount: f64, tier: LoyaltyTier) -> u64 {
    if !(amount > 0.0) {
        return 0;
    }
    (amount.floor() * tier.points_multiplier()).floor() as u64
}

/// Standing member discount for `tier` on `amount`.
pub fn calculate_tier_discount(amount: f64, tier: LoyaltyTier) -> f64 {
    (amount * tier.discount_percentage() / 100.0).max(0.0)
}

// ─── Customer ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PointsTransactionType {
    Earned,
    Redeemed,
}

/// Immutable ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointsTransaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: PointsTransactionType,
    pub points: u64,
    pub description: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RewardRedemption {
    pub id: Uuid,
    pub reward_id: Uuid,
    pub reward_name: String,
    pub points_cost: u64,
    pub timestamp: DateTime<Utc>,
}

/// An enrolled loyalty member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoyaltyCustomer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Unique, generated at enrollment.
    pub loyalty_number: String,
    pub points: u64,
    pub tier: LoyaltyTier,
    /// Lifetime spend. Never decreases.
    pub total_spent: f64,
    pub join_date: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Newest first.
    pub points_history: Vec<PointsTransaction>,
    /// Newest first.
    pub rewards_redeemed: Vec<RewardRedemption>,
}

impl LoyaltyCustomer {
    /// A fresh Bronze member with an empty ledger.
    pub fn enroll(
        details: NewLoyaltyCustomer,
        loyalty_number: String,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: details.name,
            email: details.email,
            phone: details.phone,
            loyalty_number,
            points: 0,
            tier: LoyaltyTier::Bronze,
            total_spent: 0.0,
            join_date: at,
            last_activity: at,
            points_history: Vec::new(),
            rewards_redeemed: Vec::new(),
        }
    }

    /// Accrue points for a purchase and move the tier forward if the new
    /// lifetime spend crosses a threshold. Points use the tier held before
    /// the purchase. Negative and non-finite amounts are treated as zero.
    pub fn apply_purchase(
        &mut self,
        amount: f64,
        transaction_id: &str,
        at: DateTime<Utc>,
    ) -> EarnPointsResponse {
        let amount = if amount.is_finite() { amount.max(0.0) } else { 0.0 };
        let points_earned = calculate_points_earned(amount, self.tier);

        self.points = self.points.saturating_add(points_earned);
        self.total_spent = (self.total_spent + amount).min(f64::MAX);
        self.last_activity = at;
        self.points_history.insert(
            0,
            PointsTransaction {
                id: Uuid::new_v4(),
                kind: PointsTransactionType::Earned,
                points: points_earned,
                description: format!("Purchase - Transaction {}", transaction_id),
                transaction_id: Some(transaction_id.to_string()),
                timestamp: at,
            },
        );

        // No downgrade path: a stored tier above the computed one is kept.
        let computed = determine_tier(self.total_spent);
        let new_tier = if computed > self.tier {
            self.tier = computed;
            Some(computed)
        } else {
            None
        };

        EarnPointsResponse {
            customer_id: self.id,
            points_earned,
            new_balance: self.points,
            total_spent: self.total_spent,
            tier: self.tier,
            new_tier,
        }
    }

    /// Spend points on `reward`. On rejection nothing changes.
    pub fn apply_redemption(
        &mut self,
        reward: &LoyaltyReward,
        at: DateTime<Utc>,
    ) -> Result<RewardRedemption, RedeemRejection> {
        reward.check_redeemable(self)?;

        self.points -= reward.points_cost;
        self.last_activity = at;
        self.points_history.insert(
            0,
            PointsTransaction {
                id: Uuid::new_v4(),
                kind: PointsTransactionType::Redeemed,
                points: reward.points_cost,
                description: format!("Redeemed: {}", reward.name),
                transaction_id: None,
                timestamp: at,
            },
        );
        let redemption = RewardRedemption {
            id: Uuid::new_v4(),
            reward_id: reward.id,
            reward_name: reward.name.clone(),
            points_cost: reward.points_cost,
            timestamp: at,
        };
        self.rewards_redeemed.insert(0, redemption.clone());
        Ok(redemption)
    }

    /// Progress from the current tier's threshold to the next one.
    pub fn next_tier_progress(&self) -> TierProgress {
        let Some(next) = self.tier.next() else {
            return TierProgress {
                next_tier: None,
                amount_needed: 0.0,
                progress: 100.0,
            };
        };
        let floor = self.tier.min_spent();
        let span = next.min_spent() - floor;
        let raw = (self.total_spent - floor) / span * 100.0;
        TierProgress {
            next_tier: Some(next),
            amount_needed: (next.min_spent() - self.total_spent).max(0.0),
            progress: if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 100.0) },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierProgress {
    pub next_tier: Option<LoyaltyTier>,
    pub amount_needed: f64,
    /// Percent, within [0, 100].
    pub progress: f64,
}

/// Contact details supplied at enrollment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLoyaltyCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

// ─── Rewards ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RewardDiscountType {
    Fixed,
    Percentage,
}

/// Reward catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoyaltyReward {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub points_cost: u64,
    pub discount_type: RewardDiscountType,
    pub discount_value: f64,
    #[serde(default)]
    pub min_purchase: Option<f64>,
    /// Cap for percentage rewards.
    #[serde(default)]
    pub max_discount: Option<f64>,
    #[serde(default)]
    pub tier_requirement: Option<LoyaltyTier>,
    pub is_active: bool,
    pub used_count: u32,
}

impl LoyaltyReward {
    pub fn from_request(request: NewLoyaltyReward) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: request.name,
            description: request.description,
            points_cost: request.points_cost,
            discount_type: request.discount_type,
            discount_value: request.discount_value,
            min_purchase: request.min_purchase,
            max_discount: request.max_discount,
            tier_requirement: request.tier_requirement,
            is_active: true,
            used_count: 0,
        }
    }

    /// Active, tier requirement met, enough points. Checked in that order.
    pub fn check_redeemable(&self, customer: &LoyaltyCustomer) -> Result<(), RedeemRejection> {
        if !self.is_active {
            return Err(RedeemRejection::Inactive);
        }
        if let Some(required) = self.tier_requirement {
            if customer.tier.rank() < required.rank() {
                return Err(RedeemRejection::TierRequired(required));
            }
        }
        if customer.points < self.points_cost {
            return Err(RedeemRejection::InsufficientPoints);
        }
        Ok(())
    }

    /// Discount this reward grants on a purchase.
    pub fn discount_for(&self, purchase_amount: f64) -> f64 {
        if let Some(min) = self.min_purchase {
            if purchase_amount < min {
                return 0.0;
            }
        }
        let discount = match self.discount_type {
            RewardDiscountType::Fixed => self.discount_value.min(purchase_amount),
            RewardDiscountType::Percentage => {
                let raw = purchase_amount * self.discount_value / 100.0;
                match self.max_discount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
        };
        discount.max(0.0)
    }
}

pub fn calculate_reward_discount(reward: &LoyaltyReward, purchase_amount: f64) -> f64 {
    reward.discount_for(purchase_amount)
}

pub fn can_redeem_reward(customer: &LoyaltyCustomer, reward: &LoyaltyReward) -> bool {
    reward.check_redeemable(customer).is_ok()
}

/// Fields an administrator supplies when adding a reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLoyaltyReward {
    pub name: String,
    pub description: String,
    pub points_cost: u64,
    pub discount_type: RewardDiscountType,
    pub discount_value: f64,
    #[serde(default)]
    pub min_purchase: Option<f64>,
    #[serde(default)]
    pub max_discount: Option<f64>,
    #[serde(default)]
    pub tier_requirement: Option<LoyaltyTier>,
}

// ─── Earning & Redemption results ───────────────────────────────────────────

/// Result of accruing points for a purchase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EarnPointsResponse {
    pub customer_id: Uuid,
    pub points_earned: u64,
    pub new_balance: u64,
    pub total_spent: f64,
    pub tier: LoyaltyTier,
    /// Set only when this purchase moved the customer up a tier.
    pub new_tier: Option<LoyaltyTier>,
}

/// Why a reward cannot be redeemed. The `Display` text is shown to the cashier.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeemRejection {
    #[error("Customer or reward not found")]
    NotFound,

    #[error("Reward is not active")]
    Inactive,

    #[error("Requires {0} tier")]
    TierRequired(LoyaltyTier),

    #[error("Insufficient points")]
    InsufficientPoints,
}

/// Result of a redemption. `discount` is the reward's raw `discount_value`;
/// the cart discount comes from [`calculate_reward_discount`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedeemResponse {
    pub success: bool,
    pub discount: f64,
    pub points_deducted: u64,
    pub new_balance: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RedeemResponse {
    pub fn redeemed(reward: &LoyaltyReward, new_balance: u64) -> Self {
        Self {
            success: true,
            discount: reward.discount_value,
            points_deducted: reward.points_cost,
            new_balance,
            error: None,
        }
    }

    pub fn rejected(reason: &RedeemRejection, balance: u64) -> Self {
        Self {
            success: false,
            discount: 0.0,
            points_deducted: 0,
            new_balance: balance,
            error: Some(reason.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    fn test_customer() -> LoyaltyCustomer {
        LoyaltyCustomer::enroll(
            NewLoyaltyCustomer {
                name: "Test Member".to_string(),
                email: "member@example.com".to_string(),
                phone: "+1 (555) 000-0000".to_string(),
            },
            "LOY000001".to_string(),
            at(),
        )
    }

    fn test_reward(points_cost: u64) -> LoyaltyReward {
        LoyaltyReward::from_request(NewLoyaltyReward {
            name: "$5 Off Purchase".to_string(),
            description: "Get $5 off your next purchase".to_string(),
            points_cost,
            discount_type: RewardDiscountType::Fixed,
            discount_value: 5.0,
            min_purchase: Some(25.0),
            max_discount: None,
            tier_requirement: None,
        })
    }

    #[test]
    fn test_determine_tier_thresholds() {
        assert_eq!(determine_tier(0.0), LoyaltyTier::Bronze);
        assert_eq!(determine_tier(499.99), LoyaltyTier::Bronze);
        assert_eq!(determine_tier(500.0), LoyaltyTier::Silver);
        assert_eq!(determine_tier(1499.99), LoyaltyTier::Silver);
        assert_eq!(determine_tier(1500.0), LoyaltyTier::Gold);
        assert_eq!(determine_tier(5000.0), LoyaltyTier::Platinum);
        assert_eq!(determine_tier(-10.0), LoyaltyTier::Bronze);
    }

    #[test]
    fn test_determine_tier_monotonic() {
        let mut previous = determine_tier(0.0);
        let mut spent = 0.0;
        while spent < 7000.0 {
            let tier = determine_tier(spent);
            assert!(tier >= previous, "tier dropped at {}", spent);
            previous = tier;
            spent += 37.5;
        }
    }

    #[test]
    fn test_points_floor_amount_then_product() {
        assert_eq!(calculate_points_earned(99.99, LoyaltyTier::Bronze), 99);
        // floor(99) * 1.25 = 123.75 -> 123
        assert_eq!(calculate_points_earned(99.99, LoyaltyTier::Silver), 123);
        assert_eq!(calculate_points_earned(10.5, LoyaltyTier::Platinum), 20);
        assert_eq!(calculate_points_earned(0.99, LoyaltyTier::Gold), 0);
        assert_eq!(calculate_points_earned(-5.0, LoyaltyTier::Gold), 0);
    }

    #[test]
    fn test_purchase_crossing_silver() {
        let mut customer = test_customer();
        customer.total_spent = 450.0;

        let resp = customer.apply_purchase(100.0, "TXN1", at());
        assert_eq!(resp.points_earned, 100);
        assert_eq!(resp.new_tier, Some(LoyaltyTier::Silver));
        assert_eq!(customer.tier, LoyaltyTier::Silver);
        assert!((customer.total_spent - 550.0).abs() < 1e-9);
        assert_eq!(customer.points_history.len(), 1);
        assert_eq!(customer.points_history[0].kind, PointsTransactionType::Earned);
        assert_eq!(customer.points_history[0].transaction_id.as_deref(), Some("TXN1"));
    }

    #[test]
    fn test_purchase_uses_tier_before_purchase() {
        let mut customer = test_customer();
        customer.total_spent = 1400.0;
        customer.tier = LoyaltyTier::Silver;

        let resp = customer.apply_purchase(200.0, "TXN2", at());
        assert_eq!(resp.points_earned, 250);
        assert_eq!(resp.new_tier, Some(LoyaltyTier::Gold));
    }

    #[test]
    fn test_purchase_saturates_points() {
        let mut customer = test_customer();
        customer.points = 1;

        let resp = customer.apply_purchase(1e20, "TXN3", at());
        assert_eq!(resp.new_balance, u64::MAX);
        assert_eq!(customer.points, u64::MAX);
        assert!(customer.total_spent.is_finite());

        customer.apply_purchase(1e20, "TXN4", at());
        assert_eq!(customer.points, u64::MAX);
    }

    #[test]
    fn test_purchase_ignores_non_finite_amount() {
        let mut customer = test_customer();
        for amount in [f64::INFINITY, f64::NAN, f64::NEG_INFINITY] {
            let resp = customer.apply_purchase(amount, "TXN5", at());
            assert_eq!(resp.points_earned, 0);
        }
        assert_eq!(customer.points, 0);
        assert_eq!(customer.total_spent, 0.0);
        assert_eq!(customer.tier, LoyaltyTier::Bronze);
    }

    #[test]
    fn test_purchase_history_newest_first() {
        let mut customer = test_customer();
        customer.apply_purchase(10.0, "first", at());
        customer.apply_purchase(20.0, "second", at());
        assert_eq!(customer.points_history[0].transaction_id.as_deref(), Some("second"));
        assert_eq!(customer.points_history[1].transaction_id.as_deref(), Some("first"));
    }

    #[test]
    fn test_redemption_insufficient_points_leaves_state() {
        let mut customer = test_customer();
        customer.points = 400;
        let reward = test_reward(500);

        let err = customer.apply_redemption(&reward, at()).unwrap_err();
        assert_eq!(err, RedeemRejection::InsufficientPoints);
        assert_eq!(err.to_string(), "Insufficient points");
        assert_eq!(customer.points, 400);
        assert!(customer.points_history.is_empty());
        assert!(customer.rewards_redeemed.is_empty());
    }

    #[test]
    fn test_redemption_deducts_and_records() {
        let mut customer = test_customer();
        customer.points = 650;
        let reward = test_reward(500);

        let redemption = customer.apply_redemption(&reward, at()).unwrap();
        assert_eq!(customer.points, 150);
        assert_eq!(redemption.points_cost, 500);
        assert_eq!(customer.rewards_redeemed.len(), 1);
        assert_eq!(customer.points_history[0].kind, PointsTransactionType::Redeemed);
        assert_eq!(customer.points_history[0].description, "Redeemed: $5 Off Purchase");
    }

    #[test]
    fn test_can_redeem_tier_and_active_rules() {
        let mut customer = test_customer();
        customer.points = 5000;
        let mut reward = test_reward(100);
        reward.tier_requirement = Some(LoyaltyTier::Gold);

        assert!(!can_redeem_reward(&customer, &reward));
        assert_eq!(
            reward.check_redeemable(&customer),
            Err(RedeemRejection::TierRequired(LoyaltyTier::Gold))
        );
        assert_eq!(
            RedeemRejection::TierRequired(LoyaltyTier::Gold).to_string(),
            "Requires Gold tier"
        );

        customer.tier = LoyaltyTier::Platinum;
        assert!(can_redeem_reward(&customer, &reward));

        reward.is_active = false;
        assert!(!can_redeem_reward(&customer, &reward));
    }

    #[test]
    fn test_fixed_reward_discount() {
        let reward = test_reward(500);
        assert_eq!(calculate_reward_discount(&reward, 20.0), 0.0);
        assert_eq!(calculate_reward_discount(&reward, 30.0), 5.0);

        let mut no_min = reward.clone();
        no_min.min_purchase = None;
        assert_eq!(calculate_reward_discount(&no_min, 3.0), 3.0);
    }

    #[test]
    fn test_percentage_reward_discount_capped() {
        let mut reward = test_reward(1000);
        reward.discount_type = RewardDiscountType::Percentage;
        reward.discount_value = 10.0;
        reward.min_purchase = Some(50.0);
        assert!((calculate_reward_discount(&reward, 80.0) - 8.0).abs() < 1e-9);

        reward.max_discount = Some(20.0);
        assert_eq!(calculate_reward_discount(&reward, 500.0), 20.0);
    }

    #[test]
    fn test_next_tier_progress_linear() {
        let mut customer = test_customer();
        customer.total_spent = 250.0;
        let progress = customer.next_tier_progress();
        assert_eq!(progress.next_tier, Some(LoyaltyTier::Silver));
        assert!((progress.progress - 50.0).abs() < 1e-9);
        assert!((progress.amount_needed - 250.0).abs() < 1e-9);

        customer.tier = LoyaltyTier::Silver;
        customer.total_spent = 1000.0;
        let progress = customer.next_tier_progress();
        assert_eq!(progress.next_tier, Some(LoyaltyTier::Gold));
        assert!((progress.progress - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_next_tier_progress_clamped() {
        let mut customer = test_customer();
        // Stored tier ahead of spend: negative delta clamps to 0.
        customer.tier = LoyaltyTier::Gold;
        customer.total_spent = 100.0;
        let progress = customer.next_tier_progress();
        assert_eq!(progress.progress, 0.0);
        assert!((progress.amount_needed - 4900.0).abs() < 1e-9);

        // Stored tier behind spend: overshoot clamps to 100.
        customer.tier = LoyaltyTier::Bronze;
        customer.total_spent = 900.0;
        let progress = customer.next_tier_progress();
        assert_eq!(progress.progress, 100.0);
        assert_eq!(progress.amount_needed, 0.0);
    }

    #[test]
    fn test_platinum_has_no_next_tier() {
        let mut customer = test_customer();
        customer.tier = LoyaltyTier::Platinum;
        customer.total_spent = 8000.0;
        let progress = customer.next_tier_progress();
        assert_eq!(progress.next_tier, None);
        assert_eq!(progress.amount_needed, 0.0);
        assert_eq!(progress.progress, 100.0);
    }

    #[test]
    fn test_tier_discount_and_info() {
        assert_eq!(calculate_tier_discount(200.0, LoyaltyTier::Bronze), 0.0);
        assert!((calculate_tier_discount(200.0, LoyaltyTier::Gold) - 20.0).abs() < 1e-9);
        let info = LoyaltyTier::Silver.info();
        assert_eq!(info.min_spent, 500.0);
        assert_eq!(info.points_multiplier, 1.25);
        assert_eq!(info.benefits.len(), 3);
    }

    #[test]
    fn test_tier_serializes_as_display_name() {
        assert_eq!(serde_json::to_string(&LoyaltyTier::Platinum).unwrap(), "\"Platinum\"");
        assert_eq!(LoyaltyTier::Silver.to_string(), "Silver");
    }
}
