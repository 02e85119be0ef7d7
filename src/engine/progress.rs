//! Lazy, poll-driven stage progression.
//!
//! There is no server-owned clock: every progress call recomputes elapsed
//! time from the stored stage-start timestamps and catches the game up. Late
//! or repeated calls can only delay transitions, never corrupt them, because
//! each call advances at most one stage and a call that observes no
//! elapsed-time change reports nothing to write.

use std::time::SystemTime;

use rand::Rng;
use tracing::debug;

use crate::{
    config::{BotTuning, TimingConfig},
    dao::models::GameEntity,
    engine::{bots, stage::GameStage},
};

/// Outcome of one progression tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Whether the document changed and must be written back.
    pub changed: bool,
    /// Whether the game just completed and final scores must be computed
    /// before the write.
    pub needs_scoring: bool,
}

impl Tick {
    const NOOP: Tick = Tick {
        changed: false,
        needs_scoring: false,
    };
}

/// Advance the game according to wall-clock time.
///
/// Idempotent under polling: invoked twice with the same `now`, the second
/// call changes nothing. Each invocation advances at most one stage.
pub fn tick(
    game: &mut GameEntity,
    now: SystemTime,
    timing: &TimingConfig,
    tuning: &BotTuning,
    bot_names: &[String],
    rng: &mut impl Rng,
) -> Tick {
    match game.stage {
        GameStage::Lobby => tick_lobby(game, now, timing, bot_names, rng),
        GameStage::Conjoint => tick_conjoint(game, now, timing, rng),
        GameStage::Building => tick_building(game, now, timing, tuning, rng),
        GameStage::Completed => Tick::NOOP,
    }
}

fn tick_lobby(
    game: &mut GameEntity,
    now: SystemTime,
    timing: &TimingConfig,
    bot_names: &[String],
    rng: &mut impl Rng,
) -> Tick {
    let elapsed = seconds_since(game.created_at, now);
    let remaining = timing.lobby_secs.saturating_sub(elapsed);

    let mut changed = false;
    if remaining != game.lobby_timer {
        game.lobby_timer = remaining;
        changed = true;
    }

    if remaining == 0 {
        debug!(game = %game.id, "lobby expired; filling with bots and starting conjoint");
        bots::fill_with_bots(game, bot_names, rng);
        game.stage = GameStage::Conjoint;
        game.conjoint_start_time = Some(now);
        game.round_timer = timing.conjoint_secs;
        changed = true;
    }

    Tick {
        changed,
        needs_scoring: false,
    }
}

fn tick_conjoint(
    game: &mut GameEntity,
    now: SystemTime,
    timing: &TimingConfig,
    rng: &mut impl Rng,
) -> Tick {
    let start = game.conjoint_start_time.unwrap_or(game.created_at);
    let elapsed = seconds_since(start, now);
    let remaining = timing.conjoint_secs.saturating_sub(elapsed);

    let mut changed = false;
    if remaining != game.round_timer {
        game.round_timer = remaining;
        changed = true;
    }

    // Bots vote after a short grace period so humans see the choices land
    // mid-stage rather than instantly. Safe to repeat: only unset choices are
    // touched.
    if elapsed >= timing.conjoint_grace_secs && bots::make_conjoint_choices(game, rng) {
        changed = true;
    }

    if remaining == 0 {
        debug!(game = %game.id, "conjoint expired; starting building stage");
        // No bot may leave the stage undecided. Humans who never chose simply
        // keep a null choice.
        bots::force_remaining_choices(game, rng);
        for player in &mut game.players {
            player.board.clear();
        }
        game.stage = GameStage::Building;
        game.building_start_time = Some(now);
        game.round_timer = timing.building_secs;
        changed = true;
    }

    Tick {
        changed,
        needs_scoring: false,
    }
}

fn tick_building(
    game: &mut GameEntity,
    now: SystemTime,
    timing: &TimingConfig,
    tuning: &BotTuning,
    rng: &mut impl Rng,
) -> Tick {
    let start = game.building_start_time.unwrap_or(game.created_at);
    let elapsed = seconds_since(start, now);
    let remaining = timing.building_secs.saturating_sub(elapsed);

    let mut changed = false;
    let timer_advanced = remaining != game.round_timer;
    if timer_advanced {
        game.round_timer = remaining;
        changed = true;
    }

    // Bot cadence: act on whole multiples of the cadence, and only on the
    // first call that observes the new timer value so back-to-back polls
    // within the same second stay idempotent.
    let cadence = timing.bot_cadence_secs.max(1);
    if timer_advanced
        && elapsed >= cadence
        && elapsed % cadence == 0
        && bots::run_builders(game, tuning, now, rng)
    {
        changed = true;
    }

    if remaining == 0 {
        debug!(game = %game.id, "building expired; completing game");
        game.stage = GameStage::Completed;
        game.completed_at = Some(now);
        game.round_timer = 0;
        return Tick {
            changed: true,
            needs_scoring: true,
        };
    }

    Tick {
        changed,
        needs_scoring: false,
    }
}

fn seconds_since(start: SystemTime, now: SystemTime) -> u64 {
    now.duration_since(start).map(|d| d.as_secs()).unwrap_or(0)
}
