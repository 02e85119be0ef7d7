//! Catalog management and CSV reporting for administrators.

use std::fmt::Write as _;

use crate::{
    dao::models::GameEntity,
    dto::{
        admin::{DeleteFeatureResponse, FeatureInput, FeatureRow},
        format_system_time,
    },
    engine::scoring,
    error::ServiceError,
    state::SharedState,
};

/// Effective feature catalog: admin-edited rows when any exist, otherwise the
/// configured defaults.
pub async fn list_features(state: &SharedState) -> Result<Vec<FeatureRow>, ServiceError> {
    let store = state.require_game_store().await?;
    let stored = store.list_features().await?;
    let features = if stored.is_empty() {
        state.config().catalog().to_vec()
    } else {
        stored
    };
    Ok(features.into_iter().map(Into::into).collect())
}

/// Insert or update a catalog row. New games pick the change up on creation;
/// running games keep the catalog they started with.
pub async fn save_feature(
    state: &SharedState,
    input: FeatureInput,
) -> Result<FeatureRow, ServiceError> {
    let store = state.require_game_store().await?;
    let feature: crate::dao::models::FeatureEntity = input.into();
    store.save_feature(feature.clone()).await?;
    Ok(feature.into())
}

/// Delete a catalog row by name.
pub async fn delete_feature(
    state: &SharedState,
    name: String,
) -> Result<DeleteFeatureResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let deleted = store.delete_feature(name).await?;
    Ok(DeleteFeatureResponse { deleted })
}

/// CSV of every player row across all games, newest game first.
pub async fn export_game_data(state: &SharedState) -> Result<String, ServiceError> {
    let store = state.require_game_store().await?;
    let games = store.list_games().await?;
    Ok(game_data_csv(&games))
}

/// CSV of per-feature rows for real players of completed games, annotated
/// with each feature's historical average.
pub async fn export_feature_scores(state: &SharedState) -> Result<String, ServiceError> {
    let store = state.require_game_store().await?;
    let mut completed = store.list_completed_games(None).await?;
    completed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(feature_scores_csv(&completed))
}

fn csv_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn game_data_csv(games: &[GameEntity]) -> String {
    let mut csv =
        String::from("Game ID,Player Name,Is Bot,Panel ID,Score,Features,Conjoint Choice,Game Stage,Created At\n");

    for game in games {
        for player in &game.players {
            let features = player.board.join(";");
            let conjoint = player
                .conjoint_choice
                .map(|c| c.to_string())
                .unwrap_or_default();
            let _ = writeln!(
                csv,
                "{},{},{},{},{},{},{},{},{}",
                csv_quote(&game.id.to_string()),
                csv_quote(&player.name),
                csv_quote(&player.is_bot.to_string()),
                csv_quote(player.panel_id.as_deref().unwrap_or("")),
                csv_quote(&player.score.to_string()),
                csv_quote(&features),
                csv_quote(&conjoint),
                csv_quote(&game.stage.to_string()),
                csv_quote(&format_system_time(game.created_at)),
            );
        }
    }

    csv
}

fn feature_scores_csv(completed: &[GameEntity]) -> String {
    let averages = scoring::historical_feature_averages(completed);
    let mut csv = String::from(
        "Game ID,Player Name,Panel ID,Feature,Feature Historical Average,Player Total Score,Game Date\n",
    );

    for game in completed {
        for player in game.players.iter().filter(|p| !p.is_bot) {
            for feature in &player.board {
                let average = averages.get(feature).copied().unwrap_or(0.0);
                let _ = writeln!(
                    csv,
                    "{},{},{},{},{},{},{}",
                    csv_quote(&game.id.to_string()),
                    csv_quote(&player.name),
                    csv_quote(player.panel_id.as_deref().unwrap_or("")),
                    csv_quote(feature),
                    csv_quote(&average.to_string()),
                    csv_quote(&player.score.to_string()),
                    csv_quote(&format_system_time(game.created_at)),
                );
            }
        }
    }

    csv
}
