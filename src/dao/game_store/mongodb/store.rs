use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoGameDocument, doc_id, uuid_as_binary},
};
use crate::dao::{
    game_store::{GameStore, UpdateOutcome},
    models::{FeatureEntity, GameEntity},
    storage::StorageResult,
};

const GAME_COLLECTION_NAME: &str = "games";
const FEATURE_COLLECTION_NAME: &str = "features";

/// Upper bound on lobby candidates returned to the join logic.
const OPEN_GAME_LIMIT: i64 = 5;

#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        // The join path and the scoring path both query by stage plus a
        // created_at bound.
        let games = database.collection::<MongoGameDocument>(GAME_COLLECTION_NAME);
        let stage_index = mongodb::IndexModel::builder()
            .keys(doc! {"stage": 1, "created_at": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("game_stage_created_idx".to_owned()))
                    .build(),
            )
            .build();
        games
            .create_index(stage_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GAME_COLLECTION_NAME,
                index: "stage,created_at",
                source,
            })?;

        let features = database.collection::<FeatureEntity>(FEATURE_COLLECTION_NAME);
        let name_index = mongodb::IndexModel::builder()
            .keys(doc! {"name": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("feature_name_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        features
            .create_index(name_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: FEATURE_COLLECTION_NAME,
                index: "name",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection(&self) -> Collection<MongoGameDocument> {
        self.database()
            .await
            .collection::<MongoGameDocument>(GAME_COLLECTION_NAME)
    }

    async fn feature_collection(&self) -> Collection<FeatureEntity> {
        self.database()
            .await
            .collection::<FeatureEntity>(FEATURE_COLLECTION_NAME)
    }

    async fn insert_game(&self, game: GameEntity) -> MongoResult<()> {
        let id = game.id;
        let document: MongoGameDocument = game.into();
        self.collection()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::InsertGame { id, source })?;
        Ok(())
    }

    /// Compare-and-swap replace: the filter pins both the id and the version
    /// the caller read, so a concurrent writer makes this a no-match.
    async fn update_game(
        &self,
        mut game: GameEntity,
        expected_version: u64,
    ) -> MongoResult<UpdateOutcome> {
        let id = game.id;
        game.version = expected_version + 1;
        let document: MongoGameDocument = game.into();

        let result = self
            .collection()
            .await
            .replace_one(
                doc! {"_id": uuid_as_binary(id), "version": expected_version as i64},
                &document,
            )
            .await
            .map_err(|source| MongoDaoError::UpdateGame { id, source })?;

        if result.matched_count == 0 {
            Ok(UpdateOutcome::VersionConflict)
        } else {
            Ok(UpdateOutcome::Updated)
        }
    }

    async fn find_game(&self, id: Uuid) -> MongoResult<Option<GameEntity>> {
        let document = self
            .collection()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn find_open_games(&self, created_after: SystemTime) -> MongoResult<Vec<GameEntity>> {
        let documents: Vec<MongoGameDocument> = self
            .collection()
            .await
            .find(doc! {
                "stage": "lobby",
                "created_at": { "$gte": DateTime::from_system_time(created_after) },
            })
            .sort(doc! {"created_at": -1})
            .limit(OPEN_GAME_LIMIT)
            .await
            .map_err(|source| MongoDaoError::FindOpenGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::FindOpenGames { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn list_completed_games(&self, exclude: Option<Uuid>) -> MongoResult<Vec<GameEntity>> {
        let mut filter = doc! {"stage": "completed"};
        if let Some(id) = exclude {
            filter.insert("_id", doc! {"$ne": uuid_as_binary(id)});
        }

        let documents: Vec<MongoGameDocument> = self
            .collection()
            .await
            .find(filter)
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn list_games(&self) -> MongoResult<Vec<GameEntity>> {
        let documents: Vec<MongoGameDocument> = self
            .collection()
            .await
            .find(doc! {})
            .sort(doc! {"created_at": -1})
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn list_features(&self) -> MongoResult<Vec<FeatureEntity>> {
        self.feature_collection()
            .await
            .find(doc! {})
            .sort(doc! {"name": 1})
            .await
            .map_err(|source| MongoDaoError::ListFeatures { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListFeatures { source })
    }

    async fn save_feature(&self, feature: FeatureEntity) -> MongoResult<()> {
        let name = feature.name.clone();
        self.feature_collection()
            .await
            .replace_one(doc! {"name": &feature.name}, &feature)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveFeature { name, source })?;
        Ok(())
    }

    async fn delete_feature(&self, name: String) -> MongoResult<bool> {
        let result = self
            .feature_collection()
            .await
            .delete_one(doc! {"name": &name})
            .await
            .map_err(|source| MongoDaoError::DeleteFeature { name, source })?;
        Ok(result.deleted_count > 0)
    }
}

impl GameStore for MongoGameStore {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_game(game).await.map_err(Into::into) })
    }

    fn update_game(
        &self,
        game: GameEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_game(game, expected_version)
                .await
                .map_err(Into::into)
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn find_open_games(
        &self,
        created_after: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_open_games(created_after).await.map_err(Into::into) })
    }

    fn list_completed_games(
        &self,
        exclude: Option<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_completed_games(exclude).await.map_err(Into::into) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_games().await.map_err(Into::into) })
    }

    fn list_features(&self) -> BoxFuture<'static, StorageResult<Vec<FeatureEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_features().await.map_err(Into::into) })
    }

    fn save_feature(&self, feature: FeatureEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_feature(feature).await.map_err(Into::into) })
    }

    fn delete_feature(&self, name: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_feature(name).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
