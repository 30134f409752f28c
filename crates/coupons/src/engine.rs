//! Coupon engine: validation, discount computation, usage recording, and
//! coupon administration.

use crate::store::{CouponStore, InMemoryCouponStore};
use chrono::{DateTime, Duration, Utc};
use pos_core::cart::CartItem;
use pos_core::clock::{Clock, SystemClock};
use pos_core::config::CouponConfig;
use pos_core::coupon::*;
use pos_core::error::{DiscountError, DiscountResult};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct CouponEngine {
    config: CouponConfig,
    store: Arc<dyn CouponStore>,
    clock: Arc<dyn Clock>,
}

impl CouponEngine {
    pub fn new(config: &CouponConfig, store: Arc<dyn CouponStore>, clock: Arc<dyn Clock>) -> Self {
        info!(
            code_min_len = config.code_min_len,
            code_max_len = config.code_max_len,
            "Coupon engine initialized"
        );
        Self {
            config: config.clone(),
            store,
            clock,
        }
    }

    /// Engine over a fresh in-memory store and the system clock.
    pub fn in_memory(config: &CouponConfig) -> Self {
        Self::new(config, Arc::new(InMemoryCouponStore::new()), Arc::new(SystemClock))
    }

    // ─── Validation ────────────────────────────────────────────────────────

    /// Validate `code` for a cart at `store_id` as of the engine clock.
    pub fn validate_coupon(&self, code: &str, store_id: &str, cart_subtotal: f64) -> CouponValidation {
        self.validate_coupon_at(code, store_id, cart_subtotal, self.clock.now())
    }

    pub fn validate_coupon_at(
        &self,
        code: &str,
        store_id: &str,
        cart_subtotal: f64,
        now: DateTime<Utc>,
    ) -> CouponValidation {
        self.check_coupon(code, store_id, cart_subtotal, now).into()
    }

    /// Typed form of [`CouponEngine::validate_coupon_at`]. Read-only.
    pub fn check_coupon(
        &self,
        code: &str,
        store_id: &str,
        cart_subtotal: f64,
        now: DateTime<Utc>,
    ) -> Result<Coupon, CouponRejection> {
        metrics::counter!("coupon.validations").increment(1);

        let result = match self.store.find_by_code(code) {
            Some(coupon) if coupon.is_active() => coupon
                .check(store_id, cart_subtotal, now)
                .map(|_| coupon),
            _ => Err(CouponRejection::InvalidCode),
        };

        match &result {
            Ok(coupon) => debug!(
                code = %coupon.code,
                store_id = store_id,
                subtotal = cart_subtotal,
                "Coupon accepted"
            ),
            Err(reason) => {
                metrics::counter!("coupon.rejections").increment(1);
                debug!(code = code, store_id = store_id, reason = %reason, "Coupon rejected");
            }
        }
        result
    }

    /// Discount `coupon` grants on `items`. Pure; does not count as a use.
    pub fn apply_coupon(&self, coupon: &Coupon, items: &[CartItem]) -> f64 {
        let discount = coupon.discount_for(items);
        debug!(code = %coupon.code, kind = ?coupon.coupon_type, discount = discount, "Coupon applied");
        discount
    }

    // ─── Usage ─────────────────────────────────────────────────────────────

    /// Count one completed checkout against the coupon. Called exactly once
    /// per transaction that applied it; refuses to pass `usage_limit`.
    pub fn record_coupon_usage(&self, code: &str) -> DiscountResult<Coupon> {
        let coupon = self
            .store
            .find_by_code(code)
            .ok_or_else(|| DiscountError::CouponNotFound(code.to_string()))?;

        let mut exhausted = false;
        let updated = self
            .store
            .modify(coupon.id, &mut |c| {
                if c.usage_exhausted() {
                    exhausted = true;
                } else {
                    c.used_count = c.used_count.saturating_add(1);
                }
            })
            .ok_or_else(|| DiscountError::CouponNotFound(code.to_string()))?;

        if exhausted {
            warn!(code = %updated.code, used = updated.used_count, "Coupon usage limit reached");
            return Err(CouponRejection::UsageLimitReached.into());
        }

        metrics::counter!("coupon.redemptions").increment(1);
        info!(
            code = %updated.code,
            used = updated.used_count,
            limit = ?updated.usage_limit,
            "Coupon usage recorded"
        );
        Ok(updated)
    }

    /// Give back one use recorded by [`CouponEngine::record_coupon_usage`]
    /// for a checkout that did not go through.
    pub fn release_coupon_usage(&self, code: &str) -> DiscountResult<Coupon> {
        let coupon = self
            .store
            .find_by_code(code)
            .ok_or_else(|| DiscountError::CouponNotFound(code.to_string()))?;
        let updated = self
            .store
            .modify(coupon.id, &mut |c| c.used_count = c.used_count.saturating_sub(1))
            .ok_or_else(|| DiscountError::CouponNotFound(code.to_string()))?;
        info!(code = %updated.code, used = updated.used_count, "Coupon usage released");
        Ok(updated)
    }

    // ─── Administration ────────────────────────────────────────────────────

    pub fn create_coupon(&self, request: NewCoupon, created_by: &str) -> DiscountResult<Coupon> {
        let coupon = Coupon {
            id: Uuid::new_v4(),
            code: request.code.trim().to_string(),
            name: request.name,
            description: request.description,
            coupon_type: request.coupon_type,
            value: request.value,
            min_purchase: request.min_purchase,
            max_discount: request.max_discount,
            buy_quantity: request.buy_quantity,
            get_quantity: request.get_quantity,
            applicable_products: request.applicable_products,
            valid_from: request.valid_from,
            valid_to: request.valid_to,
            usage_limit: request.usage_limit,
            used_count: 0,
            store_ids: request.store_ids,
            status: request.status,
            created_at: self.clock.now(),
            created_by: created_by.to_string(),
        };
        self.check_definition(&coupon)?;

        if !self.store.insert(coupon.clone()) {
            return Err(DiscountError::DuplicateCouponCode(coupon.code));
        }
        info!(code = %coupon.code, kind = ?coupon.coupon_type, by = created_by, "Coupon created");
        Ok(coupon)
    }

    /// Apply a partial update. The stored coupon is left untouched if the
    /// result would be an invalid definition.
    pub fn update_coupon(&self, id: Uuid, update: CouponUpdate) -> DiscountResult<Coupon> {
        let mut update = Some(update);
        let mut outcome: DiscountResult<()> = Ok(());
        let stored = self
            .store
            .modify(id, &mut |c| {
                let Some(update) = update.take() else { return };
                let mut candidate = c.clone();
                update.apply_to(&mut candidate);
                outcome = self.check_definition(&candidate);
                if outcome.is_ok() {
                    *c = candidate;
                }
            })
            .ok_or_else(|| DiscountError::CouponNotFound(id.to_string()))?;

        outcome?;
        info!(code = %stored.code, "Coupon updated");
        Ok(stored)
    }

    pub fn delete_coupon(&self, id: Uuid) -> DiscountResult<Coupon> {
        let removed = self
            .store
            .remove(id)
            .ok_or_else(|| DiscountError::CouponNotFound(id.to_string()))?;
        info!(code = %removed.code, "Coupon deleted");
        Ok(removed)
    }

    pub fn get_coupon(&self, id: Uuid) -> Option<Coupon> {
        self.store.get(id)
    }

    pub fn find_coupon(&self, code: &str) -> Option<Coupon> {
        self.store.find_by_code(code)
    }

    /// Newest first.
    pub fn list_coupons(&self) -> Vec<Coupon> {
        let mut coupons = self.store.list();
        coupons.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.code.cmp(&b.code)));
        coupons
    }

    pub fn coupons_for_store(&self, store_id: &str) -> Vec<Coupon> {
        self.list_coupons()
            .into_iter()
            .filter(|c| c.store_ids.iter().any(|s| s == store_id))
            .collect()
    }

    /// Flip active coupons whose window has closed to `Expired`. Returns how
    /// many changed.
    pub fn expire_lapsed_coupons(&self) -> usize {
        let now = self.clock.now();
        let mut expired = 0;
        for coupon in self.store.list() {
            if coupon.is_active() && now > coupon.valid_to {
                self.store.modify(coupon.id, &mut |c| {
                    if c.is_active() && now > c.valid_to {
                        c.status = CouponStatus::Expired;
                        expired += 1;
                    }
                });
            }
        }
        if expired > 0 {
            info!(count = expired, "Lapsed coupons expired");
        }
        expired
    }

    fn check_definition(&self, coupon: &Coupon) -> DiscountResult<()> {
        let invalid = |msg: String| Err(DiscountError::InvalidCoupon(msg));
        let len = coupon.code.chars().count();

        if len < self.config.code_min_len || len > self.config.code_max_len {
            return invalid(format!(
                "code must be {}-{} characters",
                self.config.code_min_len, self.config.code_max_len
            ));
        }
        if !coupon.code.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_') {
            return invalid("code may only contain letters, digits, '-' and '_'".to_string());
        }
        if !(coupon.value >= 0.0) {
            return invalid("value must be non-negative".to_string());
        }
        if coupon.coupon_type == CouponType::Percentage && coupon.value > 100.0 {
            return invalid("percentage value cannot exceed 100".to_string());
        }
        if coupon.coupon_type == CouponType::BuyXGetY
            && !matches!((coupon.buy_quantity, coupon.get_quantity), (Some(b), Some(g)) if b > 0 && g > 0)
        {
            return invalid("buy_x_get_y requires positive buy and get quantities".to_string());
        }
        if coupon.min_purchase.map(|m| m < 0.0).unwrap_or(false)
            || coupon.max_discount.map(|m| m < 0.0).unwrap_or(false)
        {
            return invalid("minimum purchase and maximum discount must be non-negative".to_string());
        }
        if coupon.usage_limit == Some(0) {
            return invalid("usage limit must be positive when set".to_string());
        }
        if coupon.usage_limit.map(|limit| coupon.used_count > limit).unwrap_or(false) {
            return invalid(format!(
                "usage limit cannot be below the {} uses already recorded",
                coupon.used_count
            ));
        }
        if coupon.valid_to < coupon.valid_from {
            return invalid("valid_to precedes valid_from".to_string());
        }
        if coupon.store_ids.is_empty() {
            return invalid("coupon must apply to at least one store".to_string());
        }
        Ok(())
    }

    /// Seed demo data: two live coupons, one lapsed coupon, and a
    /// buy-two-get-one offer, with windows relative to the engine clock.
    pub fn seed_demo_data(&self) -> DiscountResult<()> {
        let now = self.clock.now();
        let all_stores = vec!["store1".to_string(), "store2".to_string(), "store3".to_string()];

        let save10 = self.create_coupon(
            NewCoupon {
                code: "SAVE10".into(),
                name: "10% Off Everything".into(),
                description: None,
                coupon_type: CouponType::Percentage,
                value: 10.0,
                min_purchase: Some(50.0),
                max_discount: Some(100.0),
                buy_quantity: None,
                get_quantity: None,
                applicable_products: Vec::new(),
                valid_from: now - Duration::days(30),
                valid_to: now + Duration::days(335),
                usage_limit: Some(1000),
                store_ids: all_stores.clone(),
                status: CouponStatus::Active,
            },
            "admin",
        )?;

        let welcome = self.create_coupon(
            NewCoupon {
                code: "WELCOME20".into(),
                name: "Welcome Discount".into(),
                description: Some("$20 off a first order of $100 or more".into()),
                coupon_type: CouponType::Fixed,
                value: 20.0,
                min_purchase: Some(100.0),
                max_discount: None,
                buy_quantity: None,
                get_quantity: None,
                applicable_products: Vec::new(),
                valid_from: now - Duration::days(30),
                valid_to: now + Duration::days(150),
                usage_limit: Some(500),
                store_ids: vec!["store1".to_string()],
                status: CouponStatus::Active,
            },
            "admin",
        )?;

        self.create_coupon(
            NewCoupon {
                code: "EXPIRED1".into(),
                name: "Last Season Clearance".into(),
                description: None,
                coupon_type: CouponType::Percentage,
                value: 15.0,
                min_purchase: None,
                max_discount: None,
                buy_quantity: None,
                get_quantity: None,
                applicable_products: Vec::new(),
                valid_from: now - Duration::days(120),
                valid_to: now - Duration::days(30),
                usage_limit: None,
                store_ids: all_stores.clone(),
                status: CouponStatus::Active,
            },
            "admin",
        )?;

        self.create_coupon(
            NewCoupon {
                code: "BUY2GET1".into(),
                name: "Buy 2 Get 1 Free".into(),
                description: Some("Cheapest item of every three is free".into()),
                coupon_type: CouponType::BuyXGetY,
                value: 0.0,
                min_purchase: None,
                max_discount: None,
                buy_quantity: Some(2),
                get_quantity: Some(1),
                applicable_products: Vec::new(),
                valid_from: now - Duration::days(7),
                valid_to: now + Duration::days(60),
                usage_limit: Some(200),
                store_ids: all_stores,
                status: CouponStatus::Active,
            },
            "admin",
        )?;

        // Historical usage carried over from the fixtures.
        self.store.modify(save10.id, &mut |c| c.used_count = 45);
        self.store.modify(welcome.id, &mut |c| c.used_count = 123);

        info!("Seeded demo coupon data: 4 coupons");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pos_core::clock::ManualClock;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn test_engine() -> (CouponEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let engine = CouponEngine::new(
            &CouponConfig::default(),
            Arc::new(InMemoryCouponStore::new()),
            clock.clone(),
        );
        engine.seed_demo_data().unwrap();
        (engine, clock)
    }

    fn cart(total: f64) -> Vec<CartItem> {
        vec![CartItem::new("sku-1", total, 1)]
    }

    fn new_coupon(code: &str) -> NewCoupon {
        NewCoupon {
            code: code.into(),
            name: "Test".into(),
            description: None,
            coupon_type: CouponType::Fixed,
            value: 5.0,
            min_purchase: None,
            max_discount: None,
            buy_quantity: None,
            get_quantity: None,
            applicable_products: Vec::new(),
            valid_from: start(),
            valid_to: start() + Duration::days(1),
            usage_limit: Some(2),
            store_ids: vec!["store1".into()],
            status: CouponStatus::Active,
        }
    }

    #[test]
    fn test_validate_save10_and_apply() {
        let (engine, _) = test_engine();
        let result = engine.validate_coupon("save10", "store2", 600.0);
        assert!(result.valid);
        let coupon = result.coupon.unwrap();
        assert!((engine.apply_coupon(&coupon, &cart(600.0)) - 60.0).abs() < 1e-9);
        assert!((engine.apply_coupon(&coupon, &cart(2000.0)) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_expired_coupon() {
        let (engine, _) = test_engine();
        let result = engine.validate_coupon("EXPIRED1", "store1", 100.0);
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Coupon has expired"));
    }

    #[test]
    fn test_validate_unknown_and_inactive() {
        let (engine, _) = test_engine();
        let result = engine.validate_coupon("NOPE", "store1", 100.0);
        assert_eq!(result.error.as_deref(), Some("Invalid coupon code"));

        let coupon = engine.find_coupon("SAVE10").unwrap();
        engine
            .update_coupon(
                coupon.id,
                CouponUpdate {
                    status: Some(CouponStatus::Inactive),
                    ..Default::default()
                },
            )
            .unwrap();
        let result = engine.validate_coupon("SAVE10", "store1", 100.0);
        assert_eq!(result.error.as_deref(), Some("Invalid coupon code"));
    }

    #[test]
    fn test_validate_wrong_store_and_minimum() {
        let (engine, _) = test_engine();
        let result = engine.validate_coupon("WELCOME20", "store2", 150.0);
        assert_eq!(result.error.as_deref(), Some("Coupon not valid for this store"));

        let result = engine.validate_coupon("WELCOME20", "store1", 99.0);
        assert_eq!(result.error.as_deref(), Some("Minimum purchase of $100 required"));
    }

    #[test]
    fn test_validation_follows_clock() {
        let (engine, clock) = test_engine();
        assert!(engine.validate_coupon("WELCOME20", "store1", 150.0).valid);
        clock.advance(Duration::days(151));
        let result = engine.validate_coupon("WELCOME20", "store1", 150.0);
        assert_eq!(result.error.as_deref(), Some("Coupon has expired"));

        // Explicit timestamps override the clock.
        assert!(engine.validate_coupon_at("WELCOME20", "store1", 150.0, start()).valid);
    }

    #[test]
    fn test_validation_is_read_only() {
        let (engine, _) = test_engine();
        let before = engine.find_coupon("SAVE10").unwrap().used_count;
        for _ in 0..3 {
            engine.validate_coupon("SAVE10", "store1", 100.0);
        }
        assert_eq!(engine.find_coupon("SAVE10").unwrap().used_count, before);
    }

    #[test]
    fn test_record_usage_stops_at_limit() {
        let (engine, _) = test_engine();
        engine.create_coupon(new_coupon("TWICE"), "admin").unwrap();

        assert_eq!(engine.record_coupon_usage("twice").unwrap().used_count, 1);
        assert_eq!(engine.record_coupon_usage("TWICE").unwrap().used_count, 2);
        let err = engine.record_coupon_usage("TWICE").unwrap_err();
        assert!(matches!(
            err,
            DiscountError::CouponRejected(CouponRejection::UsageLimitReached)
        ));
        assert_eq!(engine.find_coupon("TWICE").unwrap().used_count, 2);

        let result = engine.validate_coupon("TWICE", "store1", 10.0);
        assert_eq!(result.error.as_deref(), Some("Coupon usage limit reached"));
    }

    #[test]
    fn test_release_usage() {
        let (engine, _) = test_engine();
        engine.create_coupon(new_coupon("UNDO"), "admin").unwrap();
        engine.record_coupon_usage("UNDO").unwrap();
        assert_eq!(engine.release_coupon_usage("undo").unwrap().used_count, 0);
        assert_eq!(engine.release_coupon_usage("UNDO").unwrap().used_count, 0);
    }

    #[test]
    fn test_record_usage_unknown_code() {
        let (engine, _) = test_engine();
        assert!(matches!(
            engine.record_coupon_usage("GHOST"),
            Err(DiscountError::CouponNotFound(_))
        ));
    }

    #[test]
    fn test_create_rejects_duplicates_and_bad_definitions() {
        let (engine, _) = test_engine();
        assert!(matches!(
            engine.create_coupon(new_coupon("save10"), "admin"),
            Err(DiscountError::DuplicateCouponCode(_))
        ));

        let mut pct = new_coupon("TOOMUCH");
        pct.coupon_type = CouponType::Percentage;
        pct.value = 120.0;
        assert!(matches!(engine.create_coupon(pct, "admin"), Err(DiscountError::InvalidCoupon(_))));

        let mut bogo = new_coupon("BOGO");
        bogo.coupon_type = CouponType::BuyXGetY;
        assert!(matches!(engine.create_coupon(bogo, "admin"), Err(DiscountError::InvalidCoupon(_))));

        let mut backwards = new_coupon("BACKWARDS");
        backwards.valid_to = backwards.valid_from - Duration::days(1);
        assert!(matches!(engine.create_coupon(backwards, "admin"), Err(DiscountError::InvalidCoupon(_))));

        assert!(matches!(engine.create_coupon(new_coupon("AB"), "admin"), Err(DiscountError::InvalidCoupon(_))));
    }

    #[test]
    fn test_update_keeps_stored_coupon_on_invalid_change() {
        let (engine, _) = test_engine();
        let coupon = engine.find_coupon("SAVE10").unwrap();
        let err = engine
            .update_coupon(
                coupon.id,
                CouponUpdate {
                    value: Some(-1.0),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, DiscountError::InvalidCoupon(_)));
        assert_eq!(engine.find_coupon("SAVE10").unwrap().value, 10.0);
    }

    #[test]
    fn test_update_cannot_lower_limit_below_used_count() {
        let (engine, _) = test_engine();
        let coupon = engine.find_coupon("SAVE10").unwrap();
        let err = engine
            .update_coupon(
                coupon.id,
                CouponUpdate {
                    usage_limit: Some(10),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, DiscountError::InvalidCoupon(_)));

        let stored = engine.find_coupon("SAVE10").unwrap();
        assert_eq!(stored.usage_limit, Some(1000));
        assert_eq!(stored.used_count, 45);

        // Exactly the recorded uses is allowed and exhausts the coupon.
        let updated = engine
            .update_coupon(
                coupon.id,
                CouponUpdate {
                    usage_limit: Some(45),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(updated.usage_exhausted());
    }

    #[test]
    fn test_delete_coupon() {
        let (engine, _) = test_engine();
        let coupon = engine.find_coupon("BUY2GET1").unwrap();
        engine.delete_coupon(coupon.id).unwrap();
        assert!(engine.find_coupon("BUY2GET1").is_none());
        assert!(matches!(engine.delete_coupon(coupon.id), Err(DiscountError::CouponNotFound(_))));
    }

    #[test]
    fn test_coupons_for_store() {
        let (engine, _) = test_engine();
        assert_eq!(engine.list_coupons().len(), 4);
        assert_eq!(engine.coupons_for_store("store1").len(), 4);
        assert_eq!(engine.coupons_for_store("store2").len(), 3);
    }

    #[test]
    fn test_expire_lapsed_coupons() {
        let (engine, clock) = test_engine();
        assert_eq!(engine.expire_lapsed_coupons(), 1);
        assert_eq!(engine.find_coupon("EXPIRED1").unwrap().status, CouponStatus::Expired);
        assert_eq!(engine.expire_lapsed_coupons(), 0);

        clock.advance(Duration::days(400));
        assert_eq!(engine.expire_lapsed_coupons(), 3);
    }

    #[test]
    fn test_buy_x_get_y_through_engine() {
        let (engine, _) = test_engine();
        let coupon = engine.validate_coupon("BUY2GET1", "store3", 45.0).coupon.unwrap();
        let items = vec![
            CartItem::new("tee", 15.0, 2),
            CartItem::new("cap", 9.0, 1),
            CartItem::new("pin", 2.0, 1),
        ];
        // 4 units, one group of 3, cheapest unit is the pin.
        assert!((engine.apply_coupon(&coupon, &items) - 2.0).abs() < 1e-9);
    }
}
