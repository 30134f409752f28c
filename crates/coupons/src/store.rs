//! Coupon persistence port and its in-memory implementation.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use pos_core::coupon::Coupon;
use tracing::debug;
use uuid::Uuid;

/// Storage the coupon engine depends on. Implementations must apply
/// [`CouponStore::modify`] as a single critical section per coupon.
pub trait CouponStore: Send + Sync {
    fn get(&self, id: Uuid) -> Option<Coupon>;

    /// Case-insensitive code lookup, regardless of status.
    fn find_by_code(&self, code: &str) -> Option<Coupon>;

    fn list(&self) -> Vec<Coupon>;

    /// Returns `false` and stores nothing if the code is already taken.
    fn insert(&self, coupon: Coupon) -> bool;

    fn remove(&self, id: Uuid) -> Option<Coupon>;

    /// Read-modify-write under the coupon's lock. Returns the stored value
    /// after `f` ran, or `None` if the coupon does not exist.
    fn modify(&self, id: Uuid, f: &mut dyn FnMut(&mut Coupon)) -> Option<Coupon>;
}

fn code_key(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Thread-safe in-memory store backed by DashMap, with a code index.
#[derive(Default)]
pub struct InMemoryCouponStore {
    coupons: DashMap<Uuid, Coupon>,
    codes: DashMap<String, Uuid>,
}

impl InMemoryCouponStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CouponStore for InMemoryCouponStore {
    fn get(&self, id: Uuid) -> Option<Coupon> {
        self.coupons.get(&id).map(|r| r.value().clone())
    }

    fn find_by_code(&self, code: &str) -> Option<Coupon> {
        let id = *self.codes.get(&code_key(code))?.value();
        self.get(id)
    }

    fn list(&self) -> Vec<Coupon> {
        self.coupons.iter().map(|r| r.value().clone()).collect()
    }

    fn insert(&self, coupon: Coupon) -> bool {
        match self.codes.entry(code_key(&coupon.code)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(coupon.id);
                debug!(code = %coupon.code, id = %coupon.id, "Coupon stored");
                self.coupons.insert(coupon.id, coupon);
                true
            }
        }
    }

    fn remove(&self, id: Uuid) -> Option<Coupon> {
        let (_, coupon) = self.coupons.remove(&id)?;
        self.codes.remove(&code_key(&coupon.code));
        Some(coupon)
    }

    fn modify(&self, id: Uuid, f: &mut dyn FnMut(&mut Coupon)) -> Option<Coupon> {
        let mut entry = self.coupons.get_mut(&id)?;
        f(entry.value_mut());
        Some(entry.value().clone())
    }
}
