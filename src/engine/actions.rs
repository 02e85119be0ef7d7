//! Player-initiated build actions: add, remove, steal, and cursor updates.
//!
//! Each function mutates an in-memory copy of the game document and reports
//! rule violations through [`ActionError`] without touching any state, so the
//! caller can reject the operation and skip the write entirely.

use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::models::{CursorEntity, GameEntity},
    engine::BOARD_SLOTS,
};

/// Rule violations reported by the build action processor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The acting player does not exist in this game.
    #[error("player `{0}` not found in game")]
    UnknownPlayer(Uuid),
    /// The steal target does not exist in this game.
    #[error("source player `{0}` not found in game")]
    UnknownSourcePlayer(Uuid),
    /// The requested feature is not in the shared pool.
    #[error("feature `{0}` is not available in the pool")]
    FeatureNotInPool(String),
    /// The requested feature is not on the expected board.
    #[error("feature `{0}` is not on the player's board")]
    FeatureNotOnBoard(String),
    /// The acting player's board already holds four features.
    #[error("board is full ({BOARD_SLOTS} slots)")]
    BoardFull,
    /// A steal action is missing its target player.
    #[error("steal requires a source player")]
    MissingSourcePlayer,
}

/// Move `feature` from the shared pool onto `player_id`'s board.
///
/// Fails with [`ActionError::BoardFull`] when the board already holds four
/// features, even if `slot_index` names an occupied slot. On a non-full board
/// an occupied `slot_index` is overwritten and the displaced feature returns
/// to the pool so no feature ever vanishes from the game; a slot at or past
/// `board.len()` collapses to an append, so placement never leaves gaps.
pub fn add_feature(
    game: &mut GameEntity,
    player_id: Uuid,
    feature: &str,
    slot_index: Option<usize>,
    now: SystemTime,
) -> Result<(), ActionError> {
    let player_index = find_player(game, player_id)?;
    let pool_index = game
        .available_features
        .iter()
        .position(|f| f == feature)
        .ok_or_else(|| ActionError::FeatureNotInPool(feature.to_owned()))?;

    if game.players[player_index].board.len() >= BOARD_SLOTS {
        return Err(ActionError::BoardFull);
    }

    let feature = game.available_features.remove(pool_index);
    let displaced = place_on_board(&mut game.players[player_index].board, feature.clone(), slot_index);
    if let Some(previous) = displaced {
        game.available_features.push(previous);
    }
    bump_build_count(game, &feature, 1);
    stamp_action_time(game, player_index, now);
    Ok(())
}

/// Return `feature` from `player_id`'s board to the shared pool, decrementing
/// its `build_selections` counter (floored at zero).
pub fn remove_feature(
    game: &mut GameEntity,
    player_id: Uuid,
    feature: &str,
    now: SystemTime,
) -> Result<(), ActionError> {
    let player_index = find_player(game, player_id)?;
    let board = &mut game.players[player_index].board;
    let board_index = board
        .iter()
        .position(|f| f == feature)
        .ok_or_else(|| ActionError::FeatureNotOnBoard(feature.to_owned()))?;

    let feature = board.remove(board_index);
    game.available_features.push(feature.clone());
    bump_build_count(game, &feature, -1);
    stamp_action_time(game, player_index, now);
    Ok(())
}

/// Move `feature` from `source_player_id`'s board onto `player_id`'s board.
///
/// Fails with [`ActionError::BoardFull`] when the thief's board is already
/// full; placement otherwise follows the same slot rules as [`add_feature`].
///
/// Increments `build_selections` for the thief's placement but deliberately
/// does not decrement anything for the victim: the counters track cumulative
/// placements, not current possession. Removal via [`remove_feature`] is the
/// only operation that decrements.
pub fn steal_feature(
    game: &mut GameEntity,
    player_id: Uuid,
    source_player_id: Uuid,
    feature: &str,
    slot_index: Option<usize>,
    now: SystemTime,
) -> Result<(), ActionError> {
    let player_index = find_player(game, player_id)?;
    let source_index = game
        .players
        .iter()
        .position(|p| p.id == source_player_id)
        .ok_or(ActionError::UnknownSourcePlayer(source_player_id))?;

    let board_index = game.players[source_index]
        .board
        .iter()
        .position(|f| f == feature)
        .ok_or_else(|| ActionError::FeatureNotOnBoard(feature.to_owned()))?;

    if game.players[player_index].board.len() >= BOARD_SLOTS {
        return Err(ActionError::BoardFull);
    }

    let feature = game.players[source_index].board.remove(board_index);
    let displaced = place_on_board(&mut game.players[player_index].board, feature.clone(), slot_index);
    if let Some(previous) = displaced {
        game.available_features.push(previous);
    }
    bump_build_count(game, &feature, 1);
    stamp_action_time(game, player_index, now);
    Ok(())
}

/// Store the player's last-known pointer position. Cosmetic; always succeeds
/// as long as the player exists.
pub fn update_cursor(
    game: &mut GameEntity,
    player_id: Uuid,
    x: i32,
    y: i32,
    now: SystemTime,
) -> Result<(), ActionError> {
    let player = game
        .player_mut(player_id)
        .ok_or(ActionError::UnknownPlayer(player_id))?;
    player.cursor = Some(CursorEntity {
        x,
        y,
        updated_at: now,
        action: player.cursor.take().and_then(|c| c.action),
    });
    Ok(())
}

fn find_player(game: &GameEntity, player_id: Uuid) -> Result<usize, ActionError> {
    game.players
        .iter()
        .position(|p| p.id == player_id)
        .ok_or(ActionError::UnknownPlayer(player_id))
}

/// Place a feature at the requested slot, returning the displaced feature if
/// the slot was occupied. Out-of-range or absent slot indices append, so a
/// sparse slot request on a short board collapses to the next free position.
fn place_on_board(
    board: &mut Vec<String>,
    feature: String,
    slot_index: Option<usize>,
) -> Option<String> {
    match slot_index {
        Some(slot) if slot < board.len() => {
            Some(std::mem::replace(&mut board[slot], feature))
        }
        Some(slot) if slot < BOARD_SLOTS => {
            board.push(feature);
            None
        }
        _ => {
            board.push(feature);
            None
        }
    }
}

fn bump_build_count(game: &mut GameEntity, feature: &str, delta: i32) {
    if let Some(stats) = game.feature_stats.get_mut(feature) {
        if delta >= 0 {
            stats.build_selections += delta as u32;
        } else {
            stats.build_selections = stats.build_selections.saturating_sub((-delta) as u32);
        }
    }
}

fn stamp_action_time(game: &mut GameEntity, player_index: usize, now: SystemTime) {
    let player = &mut game.players[player_index];
    if !player.is_bot {
        player.last_action_time = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::engine::test_support::game_with_players;

    fn assert_disjoint(game: &GameEntity) {
        let held: HashSet<&String> = game.players.iter().flat_map(|p| p.board.iter()).collect();
        for feature in &game.available_features {
            assert!(!held.contains(feature), "pool and boards overlap");
        }
    }

    #[test]
    fn add_moves_feature_from_pool_and_counts_it() {
        let mut game = game_with_players(&["Alice"]);
        let player = game.players[0].id;
        let feature = game.available_features[0].clone();
        let now = SystemTime::now();

        add_feature(&mut game, player, &feature, None, now).unwrap();

        assert_eq!(game.players[0].board, vec![feature.clone()]);
        assert!(!game.available_features.contains(&feature));
        assert_eq!(game.feature_stats[&feature].build_selections, 1);
        assert!(game.players[0].last_action_time.is_some());
        assert_disjoint(&game);
    }

    #[test]
    fn add_rejects_unknown_feature_and_full_board() {
        let mut game = game_with_players(&["Alice"]);
        let player = game.players[0].id;
        let now = SystemTime::now();

        assert_eq!(
            add_feature(&mut game, player, "No Such Feature", None, now),
            Err(ActionError::FeatureNotInPool("No Such Feature".into()))
        );

        for _ in 0..4 {
            let feature = game.available_features[0].clone();
            add_feature(&mut game, player, &feature, None, now).unwrap();
        }
        let feature = game.available_features[0].clone();
        assert_eq!(
            add_feature(&mut game, player, &feature, None, now),
            Err(ActionError::BoardFull)
        );
        assert!(game.available_features.contains(&feature));
        assert_disjoint(&game);
    }

    #[test]
    fn add_at_occupied_slot_returns_displaced_feature_to_pool() {
        let mut game = game_with_players(&["Alice"]);
        let player = game.players[0].id;
        let now = SystemTime::now();

        let first = game.available_features[0].clone();
        add_feature(&mut game, player, &first, None, now).unwrap();
        let second = game.available_features[0].clone();
        add_feature(&mut game, player, &second, Some(0), now).unwrap();

        assert_eq!(game.players[0].board, vec![second]);
        assert!(game.available_features.contains(&first));
        assert_disjoint(&game);
    }

    #[test]
    fn full_board_rejects_add_even_at_an_occupied_slot() {
        let mut game = game_with_players(&["Alice"]);
        let player = game.players[0].id;
        let now = SystemTime::now();

        for _ in 0..4 {
            let feature = game.available_features[0].clone();
            add_feature(&mut game, player, &feature, None, now).unwrap();
        }
        let board_before = game.players[0].board.clone();
        let feature = game.available_features[0].clone();

        assert_eq!(
            add_feature(&mut game, player, &feature, Some(1), now),
            Err(ActionError::BoardFull)
        );
        assert_eq!(game.players[0].board, board_before);
        assert!(game.available_features.contains(&feature));
        assert_disjoint(&game);
    }

    #[test]
    fn remove_then_add_restores_board_pool_and_stats() {
        let mut game = game_with_players(&["Alice"]);
        let player = game.players[0].id;
        let feature = game.available_features[0].clone();
        let now = SystemTime::now();

        add_feature(&mut game, player, &feature, None, now).unwrap();
        let before = game.clone();

        remove_feature(&mut game, player, &feature, now).unwrap();
        assert_eq!(game.feature_stats[&feature].build_selections, 0);
        assert!(game.available_features.contains(&feature));

        add_feature(&mut game, player, &feature, None, now).unwrap();
        assert_eq!(game.players[0].board, before.players[0].board);
        assert_eq!(game.feature_stats[&feature].build_selections, 1);
        let mut pool = game.available_features.clone();
        let mut prior_pool = before.available_features.clone();
        pool.sort_unstable();
        prior_pool.sort_unstable();
        assert_eq!(pool, prior_pool);
        assert_disjoint(&game);
    }

    #[test]
    fn remove_rejects_feature_not_held() {
        let mut game = game_with_players(&["Alice"]);
        let player = game.players[0].id;
        let feature = game.available_features[0].clone();

        assert_eq!(
            remove_feature(&mut game, player, &feature, SystemTime::now()),
            Err(ActionError::FeatureNotOnBoard(feature))
        );
    }

    #[test]
    fn remove_floors_build_count_at_zero() {
        let mut game = game_with_players(&["Alice"]);
        let player = game.players[0].id;
        let feature = game.available_features[0].clone();
        let now = SystemTime::now();

        // Force the counter to zero while the feature is on the board, as a
        // stolen-then-removed feature can produce.
        add_feature(&mut game, player, &feature, None, now).unwrap();
        game.feature_stats.get_mut(&feature).unwrap().build_selections = 0;

        remove_feature(&mut game, player, &feature, now).unwrap();
        assert_eq!(game.feature_stats[&feature].build_selections, 0);
    }

    #[test]
    fn steal_moves_feature_and_keeps_victim_stats() {
        let mut game = game_with_players(&["Alice", "Bob"]);
        let thief = game.players[0].id;
        let victim = game.players[1].id;
        let feature = game.available_features[0].clone();
        let now = SystemTime::now();

        add_feature(&mut game, victim, &feature, None, now).unwrap();
        assert_eq!(game.feature_stats[&feature].build_selections, 1);

        steal_feature(&mut game, thief, victim, &feature, None, now).unwrap();
        assert_eq!(game.players[0].board, vec![feature.clone()]);
        assert!(game.players[1].board.is_empty());
        // Cumulative placements: the victim's original placement stays counted.
        assert_eq!(game.feature_stats[&feature].build_selections, 2);
        assert_disjoint(&game);
    }

    #[test]
    fn steal_rejects_missing_target_feature_and_full_thief_board() {
        let mut game = game_with_players(&["Alice", "Bob"]);
        let thief = game.players[0].id;
        let victim = game.players[1].id;
        let now = SystemTime::now();

        let feature = game.available_features[0].clone();
        assert_eq!(
            steal_feature(&mut game, thief, victim, &feature, None, now),
            Err(ActionError::FeatureNotOnBoard(feature.clone()))
        );

        add_feature(&mut game, victim, &feature, None, now).unwrap();
        for _ in 0..4 {
            let f = game.available_features[0].clone();
            add_feature(&mut game, thief, &f, None, now).unwrap();
        }
        assert_eq!(
            steal_feature(&mut game, thief, victim, &feature, None, now),
            Err(ActionError::BoardFull)
        );
        // A slot index never turns a full-board steal into an overwrite.
        assert_eq!(
            steal_feature(&mut game, thief, victim, &feature, Some(0), now),
            Err(ActionError::BoardFull)
        );
        assert_eq!(game.players[1].board, vec![feature]);
    }

    #[test]
    fn cursor_update_stores_position_and_rejects_unknown_player() {
        let mut game = game_with_players(&["Alice"]);
        let player = game.players[0].id;
        let now = SystemTime::now();

        update_cursor(&mut game, player, 10, 20, now).unwrap();
        let cursor = game.players[0].cursor.as_ref().unwrap();
        assert_eq!((cursor.x, cursor.y), (10, 20));

        let stranger = Uuid::new_v4();
        assert_eq!(
            update_cursor(&mut game, stranger, 0, 0, now),
            Err(ActionError::UnknownPlayer(stranger))
        );
    }
}
