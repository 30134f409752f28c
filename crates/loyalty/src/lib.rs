//! Loyalty engine for the point-of-sale discount core.
//!
//! Enrolls members, accrues points on completed purchases, moves members up
//! the Bronze → Silver → Gold → Platinum ladder, and redeems catalog rewards
//! for points. Members and rewards are held behind the [`LoyaltyStore`] port.

pub mod engine;
pub mod store;

pub use engine::{LoyaltyEngine, Redeemed};
pub use store::{InMemoryLoyaltyStore, LoyaltyStore};
