use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::stage::GameStage;

/// Per-feature selection counters accumulated over a game's lifetime.
///
/// `build_selections` counts board placements (decremented when a player
/// voluntarily returns a feature to the pool); `conjoint_selections` counts
/// how often the feature appeared in a chosen product option.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureStatEntity {
    /// Times the feature appeared in a chosen conjoint option.
    pub conjoint_selections: u32,
    /// Times the feature was placed on a board, net of removals.
    pub build_selections: u32,
}

/// Catalog row describing a single product feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureEntity {
    /// Display name; doubles as the feature's identity everywhere.
    pub name: String,
    /// Loose grouping used by the admin UI (e.g. "Technology").
    pub category: String,
}

/// One of the three bundled product concepts shown during the conjoint stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductOptionEntity {
    /// Index of the option (0..3).
    pub id: usize,
    /// Synthesized label ("Product A", "Product B", "Product C").
    pub name: String,
    /// Exactly five distinct feature names.
    pub features: Vec<String>,
}

/// Cosmetic classification of a cursor action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CursorActionKind {
    /// Feature drawn from the shared pool.
    Take,
    /// Feature taken from another player's board.
    Steal,
}

/// Descriptor of the last build/steal action a player performed, attached to
/// their cursor for UI feedback only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CursorActionEntity {
    /// Kind of action performed.
    pub kind: CursorActionKind,
    /// Feature the action moved.
    pub feature: String,
    /// Name of the player stolen from, for steal actions.
    pub target: Option<String>,
    /// When the action happened.
    pub at: SystemTime,
}

/// Last-known pointer position for a player. Purely cosmetic; no gameplay
/// decision ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CursorEntity {
    /// Horizontal position in UI coordinates.
    pub x: i32,
    /// Vertical position in UI coordinates.
    pub y: i32,
    /// When the position was last reported.
    pub updated_at: SystemTime,
    /// Most recent build/steal action, if any.
    pub action: Option<CursorActionEntity>,
}

/// A participant in a game, human or synthesized bot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerEntity {
    /// Stable identifier for the player within this game.
    pub id: Uuid,
    /// Display name, unique among the game's players.
    pub name: String,
    /// Whether this participant is a bot.
    pub is_bot: bool,
    /// External survey-panel correlation id, if the player came from a panel.
    pub panel_id: Option<String>,
    /// Final score; meaningful only once the game is completed.
    pub score: f64,
    /// Features currently held, at most four.
    pub board: Vec<String>,
    /// Index into `product_options`; `None` until the player votes.
    pub conjoint_choice: Option<usize>,
    /// Cosmetic cursor state.
    pub cursor: Option<CursorEntity>,
    /// Advisory timestamp of the player's last build action (real players only).
    pub last_action_time: Option<SystemTime>,
}

impl PlayerEntity {
    /// Create a fresh human player with an empty board.
    pub fn new_human(name: String, panel_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            is_bot: false,
            panel_id,
            score: 0.0,
            board: Vec::new(),
            conjoint_choice: None,
            cursor: None,
            last_action_time: None,
        }
    }
}

/// Aggregate game document persisted by the storage layer.
///
/// All gameplay state lives here; every operation re-reads the document,
/// mutates a copy, and writes it back guarded by `version`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Current stage of the game.
    pub stage: GameStage,
    /// Participants in join order.
    pub players: Vec<PlayerEntity>,
    /// The three conjoint options, generated once at creation.
    pub product_options: Vec<ProductOptionEntity>,
    /// Features not currently held by any player. Disjoint from the union of
    /// all player boards at all times.
    pub available_features: Vec<String>,
    /// Running selection counters keyed by feature name, in catalog order.
    pub feature_stats: IndexMap<String, FeatureStatEntity>,
    /// Cached lobby countdown display value, recomputed on every progress call.
    pub lobby_timer: u64,
    /// Cached round countdown display value for the current stage.
    pub round_timer: u64,
    /// When the game was created (also the lobby stage start).
    pub created_at: SystemTime,
    /// When the conjoint stage started, if reached.
    pub conjoint_start_time: Option<SystemTime>,
    /// When the building stage started, if reached.
    pub building_start_time: Option<SystemTime>,
    /// When the game completed, if reached.
    pub completed_at: Option<SystemTime>,
    /// Optimistic-concurrency token; every write must supply the version it
    /// read and the store rejects the write if it has advanced since.
    pub version: u64,
}

impl GameEntity {
    /// Find a player by id.
    pub fn player(&self, id: Uuid) -> Option<&PlayerEntity> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Find a player by id, mutably.
    pub fn player_mut(&mut self, id: Uuid) -> Option<&mut PlayerEntity> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Number of human participants.
    pub fn real_player_count(&self) -> usize {
        self.players.iter().filter(|p| !p.is_bot).count()
    }
}
