//! Loyalty persistence port and its in-memory implementation.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use pos_core::loyalty::{LoyaltyCustomer, LoyaltyReward};
use uuid::Uuid;

/// Storage the loyalty engine depends on. `modify_*` must run as a single
/// critical section per record.
pub trait LoyaltyStore: Send + Sync {
    fn get_customer(&self, id: Uuid) -> Option<LoyaltyCustomer>;

    fn list_customers(&self) -> Vec<LoyaltyCustomer>;

    fn customer_count(&self) -> usize;

    /// Returns `false` and stores nothing if the loyalty number is taken.
    fn insert_customer(&self, customer: LoyaltyCustomer) -> bool;

    fn modify_customer(
        &self,
        id: Uuid,
        f: &mut dyn FnMut(&mut LoyaltyCustomer),
    ) -> Option<LoyaltyCustomer>;

    fn find_by_loyalty_number(&self, loyalty_number: &str) -> Option<LoyaltyCustomer>;

    fn find_by_email(&self, email: &str) -> Option<LoyaltyCustomer>;

    fn find_by_phone(&self, phone: &str) -> Option<LoyaltyCustomer>;

    fn get_reward(&self, id: Uuid) -> Option<LoyaltyReward>;

    fn list_rewards(&self) -> Vec<LoyaltyReward>;

    fn insert_reward(&self, reward: LoyaltyReward);

    fn modify_reward(
        &self,
        id: Uuid,
        f: &mut dyn FnMut(&mut LoyaltyReward),
    ) -> Option<LoyaltyReward>;
}

/// Thread-safe in-memory store backed by DashMap.
#[derive(Default)]
pub struct InMemoryLoyaltyStore {
    customers: DashMap<Uuid, LoyaltyCustomer>,
    loyalty_numbers: DashMap<String, Uuid>,
    rewards: DashMap<Uuid, LoyaltyReward>,
}

impl InMemoryLoyaltyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Earliest-enrolled match, so duplicate contact details resolve the
    /// same way every time.
    fn first_customer_where(&self, pred: impl Fn(&LoyaltyCustomer) -> bool) -> Option<LoyaltyCustomer> {
        self.customers
            .iter()
            .filter(|r| pred(r.value()))
            .map(|r| r.value().clone())
            .min_by(|a, b| {
                a.join_date
                    .cmp(&b.join_date)
                    .then_with(|| a.loyalty_number.cmp(&b.loyalty_number))
            })
    }
}

impl LoyaltyStore for InMemoryLoyaltyStore {
    fn get_customer(&self, id: Uuid) -> Option<LoyaltyCustomer> {
        self.customers.get(&id).map(|r| r.value().clone())
    }

    fn list_customers(&self) -> Vec<LoyaltyCustomer> {
        self.customers.iter().map(|r| r.value().clone()).collect()
    }

    fn customer_count(&self) -> usize {
        self.customers.len()
    }

    fn insert_customer(&self, customer: LoyaltyCustomer) -> bool {
        match self.loyalty_numbers.entry(customer.loyalty_number.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(customer.id);
                self.customers.insert(customer.id, customer);
                true
            }
        }
    }

    fn modify_customer(
        &self,
        id: Uuid,
        f: &mut dyn FnMut(&mut LoyaltyCustomer),
    ) -> Option<LoyaltyCustomer> {
        let mut entry = self.customers.get_mut(&id)?;
        f(entry.value_mut());
        Some(entry.value().clone())
    }

    fn find_by_loyalty_number(&self, loyalty_number: &str) -> Option<LoyaltyCustomer> {
        let id = *self.loyalty_numbers.get(loyalty_number)?.value();
        self.get_customer(id)
    }

    fn find_by_email(&self, email: &str) -> Option<LoyaltyCustomer> {
        self.first_customer_where(|c| c.email.eq_ignore_ascii_case(email))
    }

    fn find_by_phone(&self, phone: &str) -> Option<LoyaltyCustomer> {
        self.first_customer_where(|c| c.phone == phone)
    }

    fn get_reward(&self, id: Uuid) -> Option<LoyaltyReward> {
        self.rewards.get(&id).map(|r| r.value().clone())
    }

    fn list_rewards(&self) -> Vec<LoyaltyReward> {
        self.rewards.iter().map(|r| r.value().clone()).collect()
    }

    fn insert_reward(&self, reward: LoyaltyReward) {
        self.rewards.insert(reward.id, reward);
    }

    fn modify_reward(
        &self,
        id: Uuid,
        f: &mut dyn FnMut(&mut LoyaltyReward),
    ) -> Option<LoyaltyReward> {
        let mut entry = self.rewards.get_mut(&id)?;
        f(entry.value_mut());
        Some(entry.value().clone())
    }
}
