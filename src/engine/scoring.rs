//! Final scoring based on historical cross-game feature performance.
//!
//! A completed game is scored against every *other* completed game: features
//! that have done well historically are worth more than features that were
//! merely grabbed a lot in the current round.

use std::collections::HashMap;

use tracing::info;

use crate::dao::models::{FeatureStatEntity, GameEntity};

/// Points per build placement when accumulating a game's contribution.
const BUILD_WEIGHT: f64 = 5.0;
/// Points per conjoint selection, only counted for the very first game.
const CONJOINT_WEIGHT: f64 = 3.0;

/// Per-feature accumulation across a set of completed games.
#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    total: f64,
    games: u32,
}

impl Accumulator {
    fn average(self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.total / f64::from(self.games)
        }
    }
}

fn selected(stats: &FeatureStatEntity) -> bool {
    stats.build_selections > 0 || stats.conjoint_selections > 0
}

/// Compute each feature's historical average contribution.
///
/// Every historical game in which a feature was selected at least once
/// contributes `build_selections × 5` to that feature's total and bumps its
/// contributing-game count. When `history` is empty — the very first completed
/// game ever — the current game's own stats are folded in at
/// `build_selections × 5 + conjoint_selections × 3`, since there is no other
/// history to draw on. Later games only feed history through *future*
/// scoring runs. Features nothing ever selected average to zero.
pub fn feature_averages(history: &[GameEntity], current: &GameEntity) -> HashMap<String, f64> {
    let mut accumulators: HashMap<String, Accumulator> = HashMap::new();

    for game in history {
        for (feature, stats) in &game.feature_stats {
            if selected(stats) {
                let entry = accumulators.entry(feature.clone()).or_default();
                entry.total += f64::from(stats.build_selections) * BUILD_WEIGHT;
                entry.games += 1;
            }
        }
    }

    if history.is_empty() {
        info!(game = %current.id, "first completed game; folding own stats into history");
        for (feature, stats) in &current.feature_stats {
            if selected(stats) {
                let entry = accumulators.entry(feature.clone()).or_default();
                entry.total += f64::from(stats.build_selections) * BUILD_WEIGHT
                    + f64::from(stats.conjoint_selections) * CONJOINT_WEIGHT;
                entry.games += 1;
            }
        }
    }

    accumulators
        .into_iter()
        .map(|(feature, acc)| (feature, acc.average()))
        .collect()
}

/// Compute feature averages over a set of completed games for reporting.
///
/// Unlike [`feature_averages`] there is no "current" game here: the
/// chronologically first completed game folds in its conjoint selections,
/// every other game contributes build placements only.
pub fn historical_feature_averages(completed: &[GameEntity]) -> HashMap<String, f64> {
    let first_game_id = completed
        .iter()
        .min_by_key(|game| game.created_at)
        .map(|game| game.id);

    let mut accumulators: HashMap<String, Accumulator> = HashMap::new();
    for game in completed {
        let is_first = Some(game.id) == first_game_id;
        for (feature, stats) in &game.feature_stats {
            if selected(stats) {
                let entry = accumulators.entry(feature.clone()).or_default();
                entry.total += f64::from(stats.build_selections) * BUILD_WEIGHT;
                if is_first {
                    entry.total += f64::from(stats.conjoint_selections) * CONJOINT_WEIGHT;
                }
                entry.games += 1;
            }
        }
    }

    accumulators
        .into_iter()
        .map(|(feature, acc)| (feature, round2(acc.average())))
        .collect()
}

/// Finalize every player's score from the historical averages of the features
/// on their board, rounded to two decimal places.
///
/// `history` is `None` when historical data could not be retrieved; in that
/// case every player scores zero rather than failing the stage transition.
pub fn apply_final_scores(game: &mut GameEntity, history: Option<&[GameEntity]>) {
    let Some(history) = history else {
        for player in &mut game.players {
            player.score = 0.0;
        }
        return;
    };

    let averages = feature_averages(history, game);
    for player in &mut game.players {
        let total: f64 = player
            .board
            .iter()
            .map(|feature| averages.get(feature).copied().unwrap_or(0.0))
            .sum();
        player.score = round2(total);
    }
}

/// Round to two decimal places, the precision scores are reported at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::game_with_players;

    fn set_stats(game: &mut GameEntity, feature: &str, build: u32, conjoint: u32) {
        let stats = game.feature_stats.get_mut(feature).expect("known feature");
        stats.build_selections = build;
        stats.conjoint_selections = conjoint;
    }

    #[test]
    fn first_game_folds_in_its_own_conjoint_and_build_stats() {
        let mut game = game_with_players(&["Alice"]);
        let feature = game.available_features[0].clone();
        set_stats(&mut game, &feature, 2, 1);
        game.players[0].board.push(feature.clone());

        apply_final_scores(&mut game, Some(&[]));
        // (2×5 + 1×3) / 1 contributing game.
        assert_eq!(game.players[0].score, 13.0);
    }

    #[test]
    fn later_games_score_from_history_only() {
        let mut history_game = game_with_players(&["Old"]);
        let feature = history_game.available_features[0].clone();
        set_stats(&mut history_game, &feature, 4, 0);

        let mut game = game_with_players(&["Alice"]);
        set_stats(&mut game, &feature, 1, 0);
        game.players[0].board.push(feature.clone());

        apply_final_scores(&mut game, Some(std::slice::from_ref(&history_game)));
        // History: 4×5 = 20 over 1 contributing game. The current game's own
        // build count only reaches history via the next game's scoring run.
        assert_eq!(game.players[0].score, 20.0);
    }

    #[test]
    fn averages_divide_by_contributing_games_only() {
        let mut g1 = game_with_players(&[]);
        let feature = g1.available_features[0].clone();
        set_stats(&mut g1, &feature, 3, 0);
        let mut g2 = game_with_players(&[]);
        set_stats(&mut g2, &feature, 1, 0);
        // A third game that never touched the feature must not dilute it.
        let g3 = game_with_players(&[]);

        let mut game = game_with_players(&["Alice"]);
        game.players[0].board.push(feature.clone());

        let history = vec![g1, g2, g3];
        let averages = feature_averages(&history, &game);
        // (15 + 5) / 2 contributing games.
        assert_eq!(averages.get(&feature).copied(), Some(10.0));
    }

    #[test]
    fn conjoint_only_history_games_count_but_contribute_zero() {
        let mut history_game = game_with_players(&[]);
        let feature = history_game.available_features[0].clone();
        set_stats(&mut history_game, &feature, 0, 2);

        let game = game_with_players(&[]);
        let averages = feature_averages(std::slice::from_ref(&history_game), &game);
        assert_eq!(averages.get(&feature).copied(), Some(0.0));
    }

    #[test]
    fn report_averages_fold_conjoint_into_the_oldest_game_only() {
        let mut oldest = game_with_players(&[]);
        let feature = oldest.available_features[0].clone();
        set_stats(&mut oldest, &feature, 1, 2);
        let mut newer = game_with_players(&[]);
        newer.created_at = oldest.created_at + std::time::Duration::from_secs(60);
        set_stats(&mut newer, &feature, 1, 2);

        let averages = historical_feature_averages(&[newer, oldest]);
        // Oldest: 1×5 + 2×3 = 11; newer: 1×5 = 5; average 8.0.
        assert_eq!(averages.get(&feature).copied(), Some(8.0));
    }

    #[test]
    fn unretrievable_history_scores_everyone_zero() {
        let mut game = game_with_players(&["Alice", "Bob"]);
        let feature = game.available_features[0].clone();
        set_stats(&mut game, &feature, 5, 5);
        game.players[0].board.push(feature);
        game.players[0].score = 42.0;

        apply_final_scores(&mut game, None);
        assert!(game.players.iter().all(|p| p.score == 0.0));
    }

    #[test]
    fn scores_sum_board_averages_and_round_to_two_decimals() {
        let mut h1 = game_with_players(&[]);
        let f1 = h1.available_features[0].clone();
        let f2 = h1.available_features[1].clone();
        set_stats(&mut h1, &f1, 1, 0);
        set_stats(&mut h1, &f2, 2, 0);
        let mut h2 = game_with_players(&[]);
        set_stats(&mut h2, &f1, 2, 0);
        let mut h3 = game_with_players(&[]);
        set_stats(&mut h3, &f1, 1, 0);

        let mut game = game_with_players(&["Alice"]);
        game.players[0].board.push(f1.clone());
        game.players[0].board.push(f2.clone());

        apply_final_scores(&mut game, Some(&[h1, h2, h3]));
        // f1: (5+10+5)/3 = 6.666..., f2: 10/1 = 10 → 16.67 after rounding.
        assert_eq!(game.players[0].score, 16.67);
    }
}
