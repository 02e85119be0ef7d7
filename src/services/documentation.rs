use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Product Forge.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::join_game,
        crate::routes::game::game_status,
        crate::routes::game::progress_game,
        crate::routes::game::submit_conjoint_choice,
        crate::routes::game::build_action,
        crate::routes::game::update_cursor,
        crate::routes::admin::list_features,
        crate::routes::admin::save_feature,
        crate::routes::admin::delete_feature,
        crate::routes::admin::export_game_data,
        crate::routes::admin::export_feature_scores,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::game::JoinGameRequest,
            crate::dto::game::JoinGameResponse,
            crate::dto::game::ProgressGameRequest,
            crate::dto::game::ConjointChoiceRequest,
            crate::dto::game::BuildActionRequest,
            crate::dto::game::BuildActionKind,
            crate::dto::game::CursorUpdateRequest,
            crate::dto::game::ActionResponse,
            crate::dto::game::GameSnapshot,
            crate::dto::game::PlayerView,
            crate::dto::game::ProductOptionView,
            crate::dto::game::FeatureStatView,
            crate::dto::game::CursorView,
            crate::dto::game::CursorActionView,
            crate::dto::admin::FeatureRow,
            crate::dto::admin::FeatureInput,
            crate::dto::admin::DeleteFeatureResponse,
            crate::engine::stage::GameStage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Player-facing game operations"),
        (name = "admin", description = "Token-gated catalog management and exports"),
    )
)]
pub struct ApiDoc;
