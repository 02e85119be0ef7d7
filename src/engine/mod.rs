//! Game rules: stage progression, bot behavior, build actions, and scoring.
//!
//! Everything in this module is synchronous and operates on an in-memory
//! [`GameEntity`](crate::dao::models::GameEntity); the service layer owns all
//! I/O and writes documents back through the versioned store.

pub mod actions;
pub mod bots;
pub mod options;
pub mod progress;
pub mod scoring;
pub mod stage;

/// Maximum participants per game, bots included.
pub const MAX_PLAYERS: usize = 4;
/// Board slots per player.
pub const BOARD_SLOTS: usize = 4;
