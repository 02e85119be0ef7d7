pub mod mongodb;

use std::time::SystemTime;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{FeatureEntity, GameEntity},
    storage::StorageResult,
};

/// Result of a versioned game write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The document matched the expected version and was replaced.
    Updated,
    /// The stored version had advanced (or the game vanished); the caller
    /// must re-read and retry.
    VersionConflict,
}

/// Abstraction over the persistence layer for game documents and the feature
/// catalog.
///
/// Game writes are optimistic: `update_game` only succeeds when the stored
/// document still carries the version the caller read, closing the
/// lost-update race between concurrent polling and player actions.
pub trait GameStore: Send + Sync {
    /// Insert a brand-new game document.
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Replace a game document if its stored version still equals
    /// `expected_version`; the stored version is bumped on success.
    fn update_game(
        &self,
        game: GameEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>>;
    /// Fetch a game by id.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Lobby-stage games created after the given instant, newest first.
    fn find_open_games(
        &self,
        created_after: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// All completed games, optionally excluding one (the game being scored).
    fn list_completed_games(
        &self,
        exclude: Option<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Every game regardless of stage, newest first (admin export).
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Admin-edited feature catalog rows.
    fn list_features(&self) -> BoxFuture<'static, StorageResult<Vec<FeatureEntity>>>;
    /// Insert or update a catalog row keyed by feature name.
    fn save_feature(&self, feature: FeatureEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete a catalog row; returns whether it existed.
    fn delete_feature(&self, name: String) -> BoxFuture<'static, StorageResult<bool>>;
    /// Cheap connectivity probe.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the underlying connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
