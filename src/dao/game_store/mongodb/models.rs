use indexmap::IndexMap;
use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    dao::models::{FeatureStatEntity, GameEntity, PlayerEntity, ProductOptionEntity},
    engine::stage::GameStage,
};

/// BSON projection of a [`GameEntity`]. Top-level timestamps are stored as
/// native BSON datetimes so stage/time queries can filter on them; nested
/// player timestamps round-trip through serde untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    stage: GameStage,
    players: Vec<PlayerEntity>,
    product_options: Vec<ProductOptionEntity>,
    available_features: Vec<String>,
    feature_stats: IndexMap<String, FeatureStatEntity>,
    lobby_timer: u64,
    round_timer: u64,
    created_at: DateTime,
    conjoint_start_time: Option<DateTime>,
    building_start_time: Option<DateTime>,
    completed_at: Option<DateTime>,
    version: u64,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id,
            stage: value.stage,
            players: value.players,
            product_options: value.product_options,
            available_features: value.available_features,
            feature_stats: value.feature_stats,
            lobby_timer: value.lobby_timer,
            round_timer: value.round_timer,
            created_at: DateTime::from_system_time(value.created_at),
            conjoint_start_time: value.conjoint_start_time.map(DateTime::from_system_time),
            building_start_time: value.building_start_time.map(DateTime::from_system_time),
            completed_at: value.completed_at.map(DateTime::from_system_time),
            version: value.version,
        }
    }
}

impl From<MongoGameDocument> for GameEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            id: value.id,
            stage: value.stage,
            players: value.players,
            product_options: value.product_options,
            available_features: value.available_features,
            feature_stats: value.feature_stats,
            lobby_timer: value.lobby_timer,
            round_timer: value.round_timer,
            created_at: value.created_at.to_system_time(),
            conjoint_start_time: value.conjoint_start_time.map(|t| t.to_system_time()),
            building_start_time: value.building_start_time.map(|t| t.to_system_time()),
            completed_at: value.completed_at.map(|t| t.to_system_time()),
            version: value.version,
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
