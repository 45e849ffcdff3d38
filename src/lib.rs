//! Dicegame engine library.
//!
//! Exposes the dice primitives, the round state machine, the computer
//! policy, the async table driver, and the text protocol for use by
//! integration tests and the binary entry points.

pub mod dice;
pub mod engine;
pub mod logging;
pub mod policy;
pub mod protocol;
pub mod round;
pub mod selfplay;
pub mod table;
