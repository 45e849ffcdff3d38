//! Computer decision policy.
//!
//! Stateless: maps the computer's current dice and the score context to the
//! next dice.

pub mod threshold;

pub use threshold::{decide, threshold, PolicyInput, CHASE_MARGIN};
