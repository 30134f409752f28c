use crate::coupon::CouponRejection;
use crate::loyalty::RedeemRejection;
use thiserror::Error;

pub type DiscountResult<T> = Result<T, DiscountError>;

#[derive(Error, Debug)]
pub enum DiscountError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    #[error("Coupon code already exists: {0}")]
    DuplicateCouponCode(String),

    #[error("Invalid coupon definition: {0}")]
    InvalidCoupon(String),

    #[error("{0}")]
    CouponRejected(#[from] CouponRejection),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Loyalty customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Loyalty reward not found: {0}")]
    RewardNotFound(String),

    #[error("{0}")]
    RedemptionRejected(#[from] RedeemRejection),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for DiscountError {
    fn from(err: config::ConfigError) -> Self {
        DiscountError::Config(err.to_string())
    }
}
