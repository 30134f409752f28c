//! Core loyalty engine: handles enrollment, member lookup, points accrual,
//! tier transitions, reward catalog management, and reward redemption.

use crate::store::{InMemoryLoyaltyStore, LoyaltyStore};
use chrono::Duration;
use pos_core::clock::{Clock, SystemClock};
use pos_core::config::LoyaltyConfig;
use pos_core::error::{DiscountError, DiscountResult};
use pos_core::loyalty::*;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// State after a successful redemption.
#[derive(Debug, Clone)]
pub struct Redeemed {
    pub customer: LoyaltyCustomer,
    pub reward: LoyaltyReward,
    pub redemption: RewardRedemption,
}

/// Loyalty program engine. Owns every mutation of customers and rewards.
pub struct LoyaltyEngine {
    config: LoyaltyConfig,
    store: Arc<dyn LoyaltyStore>,
    clock: Arc<dyn Clock>,
}

impl LoyaltyEngine {
    pub fn new(config: &LoyaltyConfig, store: Arc<dyn LoyaltyStore>, clock: Arc<dyn Clock>) -> Self {
        info!(
            enabled = config.enabled,
            prefix = %config.number_prefix,
            silver = LoyaltyTier::Silver.min_spent(),
            gold = LoyaltyTier::Gold.min_spent(),
            platinum = LoyaltyTier::Platinum.min_spent(),
            "Loyalty engine initialized"
        );
        Self {
            config: config.clone(),
            store,
            clock,
        }
    }

    /// Engine over a fresh in-memory store and the system clock.
    pub fn in_memory(config: &LoyaltyConfig) -> Self {
        Self::new(config, Arc::new(InMemoryLoyaltyStore::new()), Arc::new(SystemClock))
    }

    pub fn config(&self) -> &LoyaltyConfig {
        &self.config
    }

    /// The tier ladder, lowest first.
    pub fn tiers(&self) -> Vec<TierInfo> {
        TIERS.iter().map(LoyaltyTier::info).collect()
    }

    // ─── Members ───────────────────────────────────────────────────────────

    /// Enroll a new member as Bronze with zero points and a freshly
    /// generated loyalty number. Fails while `LoyaltyConfig::enabled` is off;
    /// that flag does not affect accrual or redemption.
    pub fn enroll_customer(&self, details: NewLoyaltyCustomer) -> DiscountResult<LoyaltyCustomer> {
        if !self.config.enabled {
            return Err(DiscountError::Config("loyalty program is disabled".to_string()));
        }
        let now = self.clock.now();
        let mut sequence = self.store.customer_count() + 1;
        let mut customer = LoyaltyCustomer::enroll(details, self.loyalty_number(sequence), now);

        // Skip numbers already handed out, e.g. seeded members.
        while !self.store.insert_customer(customer.clone()) {
            sequence += 1;
            customer.loyalty_number = self.loyalty_number(sequence);
        }

        info!(
            customer_id = %customer.id,
            loyalty_number = %customer.loyalty_number,
            "Loyalty member enrolled"
        );
        Ok(customer)
    }

    fn loyalty_number(&self, sequence: usize) -> String {
        format!(
            "{}{:0width$}",
            self.config.number_prefix,
            sequence,
            width = self.config.number_width
        )
    }

    /// Look a member up by loyalty number, then email, then phone.
    pub fn find_loyalty_customer(&self, identifier: &str) -> Option<LoyaltyCustomer> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return None;
        }
        self.store
            .find_by_loyalty_number(identifier)
            .or_else(|| self.store.find_by_email(identifier))
            .or_else(|| self.store.find_by_phone(identifier))
    }

    pub fn get_customer(&self, id: Uuid) -> Option<LoyaltyCustomer> {
        self.store.get_customer(id)
    }

    /// Ordered by loyalty number.
    pub fn list_customers(&self) -> Vec<LoyaltyCustomer> {
        let mut customers = self.store.list_customers();
        customers.sort_by(|a, b| a.loyalty_number.cmp(&b.loyalty_number));
        customers
    }

    // ─── Earning ───────────────────────────────────────────────────────────

    /// Accrue points for a completed purchase of `amount`. An unknown
    /// customer or a non-finite amount is an error and nothing is written.
    pub fn process_loyalty_transaction(
        &self,
        customer_id: Uuid,
        amount: f64,
        transaction_id: &str,
    ) -> DiscountResult<EarnPointsResponse> {
        if !amount.is_finite() {
            warn!(customer_id = %customer_id, transaction_id = transaction_id, "Non-finite purchase amount");
            return Err(DiscountError::InvalidAmount(amount.to_string()));
        }
        let now = self.clock.now();
        let mut accrual = None;
        let updated = self.store.modify_customer(customer_id, &mut |customer| {
            accrual = Some(customer.apply_purchase(amount, transaction_id, now));
        });

        let response = match (updated, accrual) {
            (Some(_), Some(response)) => response,
            _ => {
                warn!(
                    customer_id = %customer_id,
                    transaction_id = transaction_id,
                    "Loyalty transaction for unknown customer"
                );
                return Err(DiscountError::CustomerNotFound(customer_id.to_string()));
            }
        };

        metrics::counter!("loyalty.points_earned").increment(response.points_earned);

        if let Some(tier) = response.new_tier {
            metrics::counter!("loyalty.tier_upgrades").increment(1);
            info!(customer_id = %customer_id, new = %tier, "Tier upgrade");
        }

        debug!(
            customer_id = %customer_id,
            transaction_id = transaction_id,
            amount = amount,
            points_earned = response.points_earned,
            balance = response.new_balance,
            tier = %response.tier,
            "Points earned"
        );
        Ok(response)
    }

    // ─── Redemption ────────────────────────────────────────────────────────

    /// Spend points on a reward. Failures are reported in the response and
    /// leave all state unchanged.
    pub fn redeem_loyalty_reward(&self, customer_id: Uuid, reward_id: Uuid) -> RedeemResponse {
        match self.redeem_reward(customer_id, reward_id) {
            Ok(redeemed) => RedeemResponse::redeemed(&redeemed.reward, redeemed.customer.points),
            Err(reason) => {
                let balance = self
                    .store
                    .get_customer(customer_id)
                    .map(|c| c.points)
                    .unwrap_or(0);
                RedeemResponse::rejected(&reason, balance)
            }
        }
    }

    /// Typed form of [`LoyaltyEngine::redeem_loyalty_reward`].
    pub fn redeem_reward(
        &self,
        customer_id: Uuid,
        reward_id: Uuid,
    ) -> Result<Redeemed, RedeemRejection> {
        let Some(reward) = self.store.get_reward(reward_id) else {
            warn!(customer_id = %customer_id, reward_id = %reward_id, "Redemption for unknown reward");
            return Err(RedeemRejection::NotFound);
        };

        let now = self.clock.now();
        let mut outcome = Err(RedeemRejection::NotFound);
        let updated = self.store.modify_customer(customer_id, &mut |customer| {
            outcome = customer.apply_redemption(&reward, now);
        });

        let (customer, redemption) = match (updated, outcome) {
            (Some(customer), Ok(redemption)) => (customer, redemption),
            (Some(_), Err(reason)) => {
                warn!(
                    customer_id = %customer_id,
                    reward = %reward.name,
                    reason = %reason,
                    "Redemption rejected"
                );
                return Err(reason);
            }
            (None, _) => {
                warn!(customer_id = %customer_id, "Redemption for unknown customer");
                return Err(RedeemRejection::NotFound);
            }
        };

        let reward = self
            .store
            .modify_reward(reward.id, &mut |r| r.used_count = r.used_count.saturating_add(1))
            .unwrap_or(reward);

        metrics::counter!("loyalty.points_redeemed").increment(reward.points_cost);
        metrics::counter!("loyalty.redemptions").increment(1);
        info!(
            customer_id = %customer_id,
            reward = %reward.name,
            cost = reward.points_cost,
            new_balance = customer.points,
            "Reward redeemed"
        );

        Ok(Redeemed {
            customer,
            reward,
            redemption,
        })
    }

    // ─── Reward catalog ────────────────────────────────────────────────────

    pub fn add_reward(&self, request: NewLoyaltyReward) -> LoyaltyReward {
        let reward = LoyaltyReward::from_request(request);
        self.store.insert_reward(reward.clone());
        info!(reward = %reward.name, cost = reward.points_cost, "Loyalty reward added");
        reward
    }

    pub fn set_reward_active(&self, reward_id: Uuid, active: bool) -> DiscountResult<LoyaltyReward> {
        self.store
            .modify_reward(reward_id, &mut |r| r.is_active = active)
            .ok_or_else(|| DiscountError::RewardNotFound(reward_id.to_string()))
    }

    pub fn get_reward(&self, reward_id: Uuid) -> Option<LoyaltyReward> {
        self.store.get_reward(reward_id)
    }

    /// Cheapest first.
    pub fn list_rewards(&self) -> Vec<LoyaltyReward> {
        let mut rewards = self.store.list_rewards();
        rewards.sort_by(|a, b| a.points_cost.cmp(&b.points_cost).then_with(|| a.name.cmp(&b.name)));
        rewards
    }

    /// Rewards `customer` could redeem right now.
    pub fn available_rewards(&self, customer: &LoyaltyCustomer) -> Vec<LoyaltyReward> {
        self.list_rewards()
            .into_iter()
            .filter(|reward| can_redeem_reward(customer, reward))
            .collect()
    }

    /// Seed demo data: two members and four catalog rewards.
    pub fn seed_demo_data(&self) -> DiscountResult<()> {
        let now = self.clock.now();

        self.seed_member(
            "John Doe",
            "john.doe@email.com",
            "+1 (555) 123-4567",
            "LOY123456",
            1250,
            2100.5,
            now - Duration::days(230),
            ("TXN001", 105, "Purchase at Downtown Store"),
        )?;
        self.seed_member(
            "Jane Smith",
            "jane.smith@email.com",
            "+1 (555) 987-6543",
            "LOY789012",
            890,
            750.25,
            now - Duration::days(160),
            ("TXN002", 75, "Purchase at Mall Location"),
        )?;

        let catalog = [
            ("$5 Off Purchase", "Get $5 off your next purchase", 500, RewardDiscountType::Fixed, 5.0, Some(25.0), None, None, 12),
            ("10% Off Everything", "Get 10% off your entire purchase", 1000, RewardDiscountType::Percentage, 10.0, Some(50.0), None, None, 8),
            ("Free Shipping", "Free shipping on your next order", 300, RewardDiscountType::Fixed, 9.99, None, None, None, 25),
            ("VIP 20% Off", "20% off for Gold members and above", 800, RewardDiscountType::Percentage, 20.0, None, Some(50.0), Some(LoyaltyTier::Gold), 0),
        ];
        for (name, description, cost, kind, value, min, cap, tier, used) in catalog {
            let reward = self.add_reward(NewLoyaltyReward {
                name: name.to_string(),
                description: description.to_string(),
                points_cost: cost,
                discount_type: kind,
                discount_value: value,
                min_purchase: min,
                max_discount: cap,
                tier_requirement: tier,
            });
            self.store.modify_reward(reward.id, &mut |r| r.used_count = used);
        }

        info!("Seeded demo loyalty data: 2 members, 4 rewards");
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn seed_member(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        loyalty_number: &str,
        points: u64,
        total_spent: f64,
        joined: chrono::DateTime<chrono::Utc>,
        last_purchase: (&str, u64, &str),
    ) -> DiscountResult<()> {
        let mut customer = LoyaltyCustomer::enroll(
            NewLoyaltyCustomer {
                name: name.to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
            },
            loyalty_number.to_string(),
            joined,
        );
        let (transaction_id, earned, description) = last_purchase;
        let last_activity = self.clock.now() - Duration::days(3);
        customer.points = points;
        customer.total_spent = total_spent;
        customer.tier = determine_tier(total_spent);
        customer.last_activity = last_activity;
        customer.points_history.push(PointsTransaction {
            id: Uuid::new_v4(),
            kind: PointsTransactionType::Earned,
            points: earned,
            description: description.to_string(),
            transaction_id: Some(transaction_id.to_string()),
            timestamp: last_activity,
        });

        if !self.store.insert_customer(customer) {
            return Err(DiscountError::Config(format!(
                "loyalty number {} already in use",
                loyalty_number
            )));
        }
        Ok(())
    }
}
