use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dao::models::{
        CursorActionEntity, CursorActionKind, CursorEntity, FeatureStatEntity, GameEntity,
        PlayerEntity, ProductOptionEntity,
    },
    dto::{format_system_time, validation::validate_player_name},
    engine::stage::GameStage,
};

/// Payload used to join (or implicitly create) a game.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinGameRequest {
    /// Display name for the new player.
    pub player_name: String,
    /// Optional external survey-panel correlation id.
    #[serde(default)]
    pub panel_id: Option<String>,
}

impl Validate for JoinGameRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_player_name(&self.player_name) {
            errors.add("player_name", e);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Identifiers handed back to a freshly joined player.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinGameResponse {
    pub game_id: Uuid,
    pub player_id: Uuid,
}

/// Targets a game for a stage progression tick.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProgressGameRequest {
    pub game_id: Uuid,
}

/// A player's vote for one of the conjoint product options.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ConjointChoiceRequest {
    pub game_id: Uuid,
    pub player_id: Uuid,
    /// Index into the game's product options.
    #[validate(range(max = 2, code = "choice_index_range"))]
    pub choice_index: usize,
}

/// Kind of board manipulation requested.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BuildActionKind {
    /// Take a feature from the shared pool.
    Add,
    /// Return a feature from the board to the pool.
    Remove,
    /// Take a feature from another player's board.
    Steal,
}

/// One board manipulation during the building stage.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BuildActionRequest {
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub action: BuildActionKind,
    /// Name of the feature being moved.
    pub feature: String,
    /// Victim player for steal actions.
    #[serde(default)]
    pub source_player_id: Option<Uuid>,
    /// Board slot to place into; appends when omitted. Boards hold no gaps,
    /// so a slot at or past the current board length also appends.
    #[serde(default)]
    pub slot_index: Option<usize>,
}

impl Validate for BuildActionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.feature.trim().is_empty() {
            let mut err = ValidationError::new("feature_blank");
            err.message = Some("Feature name must not be blank".into());
            errors.add("feature", err);
        }
        if self.action == BuildActionKind::Steal && self.source_player_id.is_none() {
            let mut err = ValidationError::new("source_player_required");
            err.message = Some("Steal actions require a source player".into());
            errors.add("source_player_id", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Cosmetic cursor position report.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CursorUpdateRequest {
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub x: i32,
    pub y: i32,
}

/// Generic acknowledgement for mutating game operations.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub success: bool,
}

impl ActionResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Full projection of a game document returned by the status route.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameSnapshot {
    pub id: Uuid,
    pub stage: GameStage,
    pub players: Vec<PlayerView>,
    pub product_options: Vec<ProductOptionView>,
    pub available_features: Vec<String>,
    pub feature_stats: IndexMap<String, FeatureStatView>,
    pub lobby_timer: u64,
    pub round_timer: u64,
    pub created_at: String,
    pub conjoint_start_time: Option<String>,
    pub building_start_time: Option<String>,
    pub completed_at: Option<String>,
}

/// Public projection of a player.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerView {
    pub id: Uuid,
    pub name: String,
    pub is_bot: bool,
    pub panel_id: Option<String>,
    pub score: f64,
    pub board: Vec<String>,
    pub conjoint_choice: Option<usize>,
    pub cursor: Option<CursorView>,
    pub last_action_time: Option<String>,
}

/// One conjoint product option as shown to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductOptionView {
    pub id: usize,
    pub name: String,
    pub features: Vec<String>,
}

/// Selection counters for one feature.
#[derive(Debug, Serialize, ToSchema)]
pub struct FeatureStatView {
    pub conjoint_selections: u32,
    pub build_selections: u32,
}

/// Cursor position plus the last action it performed.
#[derive(Debug, Serialize, ToSchema)]
pub struct CursorView {
    pub x: i32,
    pub y: i32,
    pub updated_at: String,
    pub action: Option<CursorActionView>,
}

/// UI feedback descriptor for a take or steal.
#[derive(Debug, Serialize, ToSchema)]
pub struct CursorActionView {
    pub kind: String,
    pub feature: String,
    pub target: Option<String>,
    pub at: String,
}

impl From<GameEntity> for GameSnapshot {
    fn from(game: GameEntity) -> Self {
        Self {
            id: game.id,
            stage: game.stage,
            players: game.players.into_iter().map(Into::into).collect(),
            product_options: game.product_options.into_iter().map(Into::into).collect(),
            available_features: game.available_features,
            feature_stats: game
                .feature_stats
                .into_iter()
                .map(|(name, stat)| (name, stat.into()))
                .collect(),
            lobby_timer: game.lobby_timer,
            round_timer: game.round_timer,
            created_at: format_system_time(game.created_at),
            conjoint_start_time: game.conjoint_start_time.map(format_system_time),
            building_start_time: game.building_start_time.map(format_system_time),
            completed_at: game.completed_at.map(format_system_time),
        }
    }
}

impl From<PlayerEntity> for PlayerView {
    fn from(player: PlayerEntity) -> Self {
        Self {
            id: player.id,
            name: player.name,
            is_bot: player.is_bot,
            panel_id: player.panel_id,
            score: player.score,
            board: player.board,
            conjoint_choice: player.conjoint_choice,
            cursor: player.cursor.map(Into::into),
            last_action_time: player.last_action_time.map(format_system_time),
        }
    }
}

impl From<ProductOptionEntity> for ProductOptionView {
    fn from(option: ProductOptionEntity) -> Self {
        Self {
            id: option.id,
            name: option.name,
            features: option.features,
        }
    }
}

impl From<FeatureStatEntity> for FeatureStatView {
    fn from(stat: FeatureStatEntity) -> Self {
        Self {
            conjoint_selections: stat.conjoint_selections,
            build_selections: stat.build_selections,
        }
    }
}

impl From<CursorEntity> for CursorView {
    fn from(cursor: CursorEntity) -> Self {
        Self {
            x: cursor.x,
            y: cursor.y,
            updated_at: format_system_time(cursor.updated_at),
            action: cursor.action.map(Into::into),
        }
    }
}

impl From<CursorActionEntity> for CursorActionView {
    fn from(action: CursorActionEntity) -> Self {
        Self {
            kind: match action.kind {
                CursorActionKind::Take => "take".to_string(),
                CursorActionKind::Steal => "steal".to_string(),
            },
            feature: action.feature,
            target: action.target,
            at: format_system_time(action.at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_request_rejects_blank_name() {
        let request = JoinGameRequest {
            player_name: "   ".into(),
            panel_id: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn steal_without_source_player_fails_validation() {
        let request = BuildActionRequest {
            game_id: Uuid::new_v4(),
            player_id: Uuid::new_v4(),
            action: BuildActionKind::Steal,
            feature: "Cloud Sync".into(),
            source_player_id: None,
            slot_index: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn add_action_validates_without_source_player() {
        let request = BuildActionRequest {
            game_id: Uuid::new_v4(),
            player_id: Uuid::new_v4(),
            action: BuildActionKind::Add,
            feature: "Cloud Sync".into(),
            source_player_id: None,
            slot_index: Some(2),
        };
        assert!(request.validate().is_ok());
    }
}
