use std::time::{Duration, SystemTime};

use indexmap::IndexMap;
use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        game_store::UpdateOutcome,
        models::{FeatureEntity, GameEntity, PlayerEntity},
    },
    dto::game::{
        ActionResponse, BuildActionKind, BuildActionRequest, ConjointChoiceRequest,
        CursorUpdateRequest, GameSnapshot, JoinGameRequest, JoinGameResponse,
    },
    engine::{self, MAX_PLAYERS, actions, options, progress, scoring},
    error::ServiceError,
    state::SharedState,
};

/// Join an open lobby-stage game, or create a new one when none has room.
///
/// Candidates are lobby games created within the join window. Appending the
/// player goes through a versioned write; when a concurrent join wins the
/// race the next candidate is tried, and creation is the final fallback.
pub async fn join_game(
    state: &SharedState,
    request: JoinGameRequest,
) -> Result<JoinGameResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let now = SystemTime::now();
    let name = request.player_name.trim().to_string();

    let join_window = Duration::from_secs(state.config().timing().join_window_secs);
    let created_after = now
        .checked_sub(join_window)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let candidates = store.find_open_games(created_after).await?;
    for mut game in candidates {
        if game.real_player_count() >= MAX_PLAYERS {
            continue;
        }
        if game.players.iter().any(|p| p.name == name) {
            continue;
        }

        let expected = game.version;
        let player = PlayerEntity::new_human(name.clone(), request.panel_id.clone());
        let player_id = player.id;
        game.players.push(player);

        match store.update_game(game.clone(), expected).await? {
            UpdateOutcome::Updated => {
                debug!(game_id = %game.id, %player_id, "player joined existing game");
                return Ok(JoinGameResponse {
                    game_id: game.id,
                    player_id,
                });
            }
            UpdateOutcome::VersionConflict => continue,
        }
    }

    let catalog = resolve_catalog(state).await?;
    // Scoped so the thread-local rng never lives across an await point.
    let game = {
        let mut rng = rand::rng();
        new_game(state, &catalog, name, request.panel_id, now, &mut rng)
    };
    let game_id = game.id;
    let player_id = game.players[0].id;

    store.insert_game(game).await?;
    info!(%game_id, %player_id, "created new game for joining player");

    Ok(JoinGameResponse { game_id, player_id })
}

/// Full current document for a game.
pub async fn game_status(state: &SharedState, id: Uuid) -> Result<GameSnapshot, ServiceError> {
    let game = load_game(state, id).await?;
    Ok(game.into())
}

/// Run one stage progression tick against the game's stored timestamps.
///
/// Ticks against a completed game, or ticks that observe no time boundary,
/// change nothing and skip the write entirely.
pub async fn progress_game(state: &SharedState, id: Uuid) -> Result<ActionResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let mut game = load_game(state, id).await?;
    let expected = game.version;

    let config = state.config();
    let now = SystemTime::now();
    let tick = {
        let mut rng = rand::rng();
        progress::tick(
            &mut game,
            now,
            config.timing(),
            config.bots(),
            config.bot_names(),
            &mut rng,
        )
    };

    if !tick.changed {
        return Ok(ActionResponse::ok());
    }

    if tick.needs_scoring {
        // Scoring failure falls back to zero scores so the game still
        // completes.
        match store.list_completed_games(Some(game.id)).await {
            Ok(history) => scoring::apply_final_scores(&mut game, Some(&history)),
            Err(err) => {
                tracing::warn!(game_id = %game.id, error = %err, "historical scoring unavailable; applying zero scores");
                scoring::apply_final_scores(&mut game, None);
            }
        }
    }

    write_back(state, game, expected).await?;
    Ok(ActionResponse::ok())
}

/// Record a player's conjoint vote and bump the chosen features' counters.
pub async fn submit_conjoint_choice(
    state: &SharedState,
    request: ConjointChoiceRequest,
) -> Result<ActionResponse, ServiceError> {
    let mut game = load_game(state, request.game_id).await?;
    let expected = game.version;

    if game.stage != engine::stage::GameStage::Conjoint {
        return Err(ServiceError::InvalidState(format!(
            "conjoint choices are only accepted during the conjoint stage (game is {})",
            game.stage
        )));
    }
    if request.choice_index >= game.product_options.len() {
        return Err(ServiceError::InvalidInput(format!(
            "choice index {} is out of range",
            request.choice_index
        )));
    }

    let allow_revote = state.config().allow_conjoint_revote();
    let player = game
        .player_mut(request.player_id)
        .ok_or_else(|| ServiceError::NotFound(format!("player `{}` not found", request.player_id)))?;
    if player.conjoint_choice.is_some() && !allow_revote {
        return Err(ServiceError::InvalidState(
            "player has already submitted a conjoint choice".into(),
        ));
    }
    player.conjoint_choice = Some(request.choice_index);

    // Counters are cumulative selections, so a re-vote does not walk back the
    // previous option's features.
    let chosen: Vec<String> = game.product_options[request.choice_index].features.clone();
    for feature in chosen {
        if let Some(stat) = game.feature_stats.get_mut(&feature) {
            stat.conjoint_selections += 1;
        }
    }

    write_back(state, game, expected).await?;
    Ok(ActionResponse::ok())
}

/// Apply an add, remove, or steal to a player's board.
pub async fn build_action(
    state: &SharedState,
    request: BuildActionRequest,
) -> Result<ActionResponse, ServiceError> {
    let mut game = load_game(state, request.game_id).await?;
    let expected = game.version;

    if game.stage != engine::stage::GameStage::Building {
        return Err(ServiceError::InvalidState(format!(
            "build actions are only accepted during the building stage (game is {})",
            game.stage
        )));
    }

    let now = SystemTime::now();
    match request.action {
        BuildActionKind::Add => actions::add_feature(
            &mut game,
            request.player_id,
            &request.feature,
            request.slot_index,
            now,
        )?,
        BuildActionKind::Remove => {
            actions::remove_feature(&mut game, request.player_id, &request.feature, now)?
        }
        BuildActionKind::Steal => {
            let source = request
                .source_player_id
                .ok_or(actions::ActionError::MissingSourcePlayer)?;
            actions::steal_feature(
                &mut game,
                request.player_id,
                source,
                &request.feature,
                request.slot_index,
                now,
            )?
        }
    }

    write_back(state, game, expected).await?;
    Ok(ActionResponse::ok())
}

/// Store a player's latest cursor position. Cosmetic only.
pub async fn update_cursor(
    state: &SharedState,
    request: CursorUpdateRequest,
) -> Result<ActionResponse, ServiceError> {
    let mut game = load_game(state, request.game_id).await?;
    let expected = game.version;

    let now = SystemTime::now();
    actions::update_cursor(&mut game, request.player_id, request.x, request.y, now)?;

    write_back(state, game, expected).await?;
    Ok(ActionResponse::ok())
}

async fn load_game(state: &SharedState, id: Uuid) -> Result<GameEntity, ServiceError> {
    let store = state.require_game_store().await?;
    store
        .find_game(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{id}` not found")))
}

async fn write_back(
    state: &SharedState,
    game: GameEntity,
    expected_version: u64,
) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;
    match store.update_game(game, expected_version).await? {
        UpdateOutcome::Updated => Ok(()),
        UpdateOutcome::VersionConflict => Err(ServiceError::Contention(
            "the game changed while processing the request; retry".into(),
        )),
    }
}

/// Effective feature catalog: admin-edited rows when any exist, otherwise the
/// configured defaults.
async fn resolve_catalog(state: &SharedState) -> Result<Vec<FeatureEntity>, ServiceError> {
    let store = state.require_game_store().await?;
    let stored = store.list_features().await?;
    // A catalog smaller than the three product options needs cannot seed a
    // playable game; fall back to the shipped defaults.
    if stored.len() < options::OPTION_COUNT * options::FEATURES_PER_OPTION {
        Ok(state.config().catalog().to_vec())
    } else {
        Ok(stored)
    }
}

fn new_game(
    state: &SharedState,
    catalog: &[FeatureEntity],
    player_name: String,
    panel_id: Option<String>,
    now: SystemTime,
    rng: &mut impl Rng,
) -> GameEntity {
    let timing = state.config().timing();
    let product_options = options::generate_product_options(catalog, rng);
    let feature_stats: IndexMap<String, _> = catalog
        .iter()
        .map(|feature| (feature.name.clone(), Default::default()))
        .collect();

    GameEntity {
        id: Uuid::new_v4(),
        stage: engine::stage::GameStage::Lobby,
        players: vec![PlayerEntity::new_human(player_name, panel_id)],
        product_options,
        available_features: catalog.iter().map(|f| f.name.clone()).collect(),
        feature_stats,
        lobby_timer: timing.lobby_secs,
        round_timer: timing.conjoint_secs,
        created_at: now,
        conjoint_start_time: None,
        building_start_time: None,
        completed_at: None,
        version: 0,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
        time::{Duration, SystemTime},
    };

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            game_store::GameStore,
            models::FeatureEntity,
            storage::{StorageError, StorageResult},
        },
        engine::stage::GameStage,
        state::AppState,
    };

    /// In-memory store with the same versioned write semantics as the Mongo
    /// backend.
    #[derive(Default)]
    struct MemoryStore {
        games: Mutex<HashMap<Uuid, GameEntity>>,
        features: Mutex<Vec<FeatureEntity>>,
    }

    impl GameStore for MemoryStore {
        fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.games.lock().unwrap().insert(game.id, game);
            Box::pin(async { Ok(()) })
        }

        fn update_game(
            &self,
            game: GameEntity,
            expected_version: u64,
        ) -> BoxFuture<'static, StorageResult<UpdateOutcome>> {
            let outcome = {
                let mut games = self.games.lock().unwrap();
                match games.get(&game.id) {
                    Some(stored) if stored.version == expected_version => {
                        let mut next = game;
                        next.version = expected_version + 1;
                        games.insert(next.id, next);
                        UpdateOutcome::Updated
                    }
                    _ => UpdateOutcome::VersionConflict,
                }
            };
            Box::pin(async move { Ok(outcome) })
        }

        fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
            let found = self.games.lock().unwrap().get(&id).cloned();
            Box::pin(async move { Ok(found) })
        }

        fn find_open_games(
            &self,
            created_after: SystemTime,
        ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
            let mut open: Vec<GameEntity> = self
                .games
                .lock()
                .unwrap()
                .values()
                .filter(|g| g.stage == GameStage::Lobby && g.created_at >= created_after)
                .cloned()
                .collect();
            open.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Box::pin(async move { Ok(open) })
        }

        fn list_completed_games(
            &self,
            exclude: Option<Uuid>,
        ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
            let completed: Vec<GameEntity> = self
                .games
                .lock()
                .unwrap()
                .values()
                .filter(|g| g.stage == GameStage::Completed && Some(g.id) != exclude)
                .cloned()
                .collect();
            Box::pin(async move { Ok(completed) })
        }

        fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
            let games: Vec<GameEntity> = self.games.lock().unwrap().values().cloned().collect();
            Box::pin(async move { Ok(games) })
        }

        fn list_features(&self) -> BoxFuture<'static, StorageResult<Vec<FeatureEntity>>> {
            let features = self.features.lock().unwrap().clone();
            Box::pin(async move { Ok(features) })
        }

        fn save_feature(&self, feature: FeatureEntity) -> BoxFuture<'static, StorageResult<()>> {
            let mut features = self.features.lock().unwrap();
            if let Some(existing) = features.iter_mut().find(|f| f.name == feature.name) {
                *existing = feature;
            } else {
                features.push(feature);
            }
            Box::pin(async { Ok(()) })
        }

        fn delete_feature(&self, name: String) -> BoxFuture<'static, StorageResult<bool>> {
            let mut features = self.features.lock().unwrap();
            let before = features.len();
            features.retain(|f| f.name != name);
            let deleted = features.len() != before;
            Box::pin(async move { Ok(deleted) })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async {
                Err(StorageError::unavailable(
                    "memory store cannot reconnect".into(),
                    std::io::Error::other("unsupported"),
                ))
            })
        }
    }

    async fn test_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state.set_game_store(Arc::new(MemoryStore::default())).await;
        state
    }

    fn join(name: &str) -> JoinGameRequest {
        JoinGameRequest {
            player_name: name.into(),
            panel_id: None,
        }
    }

    #[tokio::test]
    async fn first_join_creates_a_lobby_game() {
        let state = test_state().await;

        let response = join_game(&state, join("Alice")).await.unwrap();
        let snapshot = game_status(&state, response.game_id).await.unwrap();

        assert_eq!(snapshot.stage, GameStage::Lobby);
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].id, response.player_id);
        assert_eq!(snapshot.product_options.len(), 3);
        assert_eq!(snapshot.available_features.len(), 20);
    }

    #[tokio::test]
    async fn rapid_joins_share_at_most_four_per_game() {
        let state = test_state().await;

        let mut game_ids = Vec::new();
        for name in ["P1", "P2", "P3", "P4", "P5"] {
            let response = join_game(&state, join(name)).await.unwrap();
            game_ids.push(response.game_id);
        }

        // First four land in the same lobby, the fifth spills into a new one.
        assert_eq!(game_ids[0], game_ids[1]);
        assert_eq!(game_ids[0], game_ids[2]);
        assert_eq!(game_ids[0], game_ids[3]);
        assert_ne!(game_ids[0], game_ids[4]);

        let full = game_status(&state, game_ids[0]).await.unwrap();
        assert_eq!(full.players.len(), 4);
    }

    #[tokio::test]
    async fn duplicate_name_gets_its_own_game() {
        let state = test_state().await;

        let first = join_game(&state, join("Alice")).await.unwrap();
        let second = join_game(&state, join("Alice")).await.unwrap();

        assert_ne!(first.game_id, second.game_id);
    }

    #[tokio::test]
    async fn conjoint_choice_rejected_outside_conjoint_stage() {
        let state = test_state().await;
        let joined = join_game(&state, join("Alice")).await.unwrap();

        let result = submit_conjoint_choice(
            &state,
            ConjointChoiceRequest {
                game_id: joined.game_id,
                player_id: joined.player_id,
                choice_index: 0,
            },
        )
        .await;

        assert!(matches!(result, Err(ServiceError::InvalidState(_))));
    }

    #[tokio::test]
    async fn conjoint_choice_bumps_selected_feature_counters() {
        let state = test_state().await;
        let joined = join_game(&state, join("Alice")).await.unwrap();

        // Force the stored game into the conjoint stage.
        let store = state.game_store().await.unwrap();
        let mut game = store.find_game(joined.game_id).await.unwrap().unwrap();
        let expected = game.version;
        game.stage = GameStage::Conjoint;
        game.conjoint_start_time = Some(SystemTime::now());
        store.update_game(game, expected).await.unwrap();

        submit_conjoint_choice(
            &state,
            ConjointChoiceRequest {
                game_id: joined.game_id,
                player_id: joined.player_id,
                choice_index: 1,
            },
        )
        .await
        .unwrap();

        let game = store.find_game(joined.game_id).await.unwrap().unwrap();
        assert_eq!(game.players[0].conjoint_choice, Some(1));
        for feature in &game.product_options[1].features {
            assert_eq!(game.feature_stats[feature].conjoint_selections, 1);
        }
    }

    #[tokio::test]
    async fn build_action_rejected_before_building_stage() {
        let state = test_state().await;
        let joined = join_game(&state, join("Alice")).await.unwrap();

        let result = build_action(
            &state,
            BuildActionRequest {
                game_id: joined.game_id,
                player_id: joined.player_id,
                action: BuildActionKind::Add,
                feature: "whatever".into(),
                source_player_id: None,
                slot_index: None,
            },
        )
        .await;

        assert!(matches!(result, Err(ServiceError::InvalidState(_))));
    }

    #[tokio::test]
    async fn progress_on_missing_game_is_not_found() {
        let state = test_state().await;
        let result = progress_game(&state, Uuid::new_v4()).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn stale_lobby_is_not_joined() {
        let state = test_state().await;
        let joined = join_game(&state, join("Alice")).await.unwrap();

        // Age the game past the join window.
        let store = state.game_store().await.unwrap();
        let mut game = store.find_game(joined.game_id).await.unwrap().unwrap();
        let expected = game.version;
        game.created_at = SystemTime::now() - Duration::from_secs(120);
        store.update_game(game, expected).await.unwrap();

        let second = join_game(&state, join("Bob")).await.unwrap();
        assert_ne!(second.game_id, joined.game_id);
    }
}
