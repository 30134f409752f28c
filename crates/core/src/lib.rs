pub mod cart;
pub mod clock;
pub mod config;
pub mod coupon;
pub mod error;
pub mod loyalty;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::{DiscountError, DiscountResult};
