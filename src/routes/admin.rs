use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use validator::Validate;

use crate::{
    dto::admin::{DeleteFeatureResponse, FeatureInput, FeatureRow},
    error::AppError,
    services::admin_service,
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only catalog management and reporting endpoints.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/features", get(list_features).post(save_feature))
        .route("/admin/features/{name}", delete(delete_feature))
        .route("/admin/export/games", get(export_game_data))
        .route("/admin/export/feature-scores", get(export_feature_scores))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Retrieve the effective feature catalog.
#[utoipa::path(
    get,
    path = "/admin/features",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Shared admin token")),
    responses((status = 200, description = "Catalog rows", body = [FeatureRow]))
)]
pub async fn list_features(
    State(state): State<SharedState>,
) -> Result<Json<Vec<FeatureRow>>, AppError> {
    Ok(Json(admin_service::list_features(&state).await?))
}

/// Create or update a catalog feature.
#[utoipa::path(
    post,
    path = "/admin/features",
    tag = "admin",
    request_body = FeatureInput,
    params(("X-Admin-Token" = String, Header, description = "Shared admin token")),
    responses((status = 200, description = "Stored row", body = FeatureRow))
)]
pub async fn save_feature(
    State(state): State<SharedState>,
    Json(payload): Json<FeatureInput>,
) -> Result<Json<FeatureRow>, AppError> {
    payload.validate()?;
    Ok(Json(admin_service::save_feature(&state, payload).await?))
}

/// Delete a catalog feature by name.
#[utoipa::path(
    delete,
    path = "/admin/features/{name}",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Shared admin token"),
    ("name" = String, Path, description = "Feature name to delete")),
    responses((status = 200, description = "Deletion outcome", body = DeleteFeatureResponse))
)]
pub async fn delete_feature(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<DeleteFeatureResponse>, AppError> {
    Ok(Json(admin_service::delete_feature(&state, name).await?))
}

/// Download every player row across all games as CSV.
#[utoipa::path(
    get,
    path = "/admin/export/games",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Shared admin token")),
    responses((status = 200, description = "CSV export", content_type = "text/csv"))
)]
pub async fn export_game_data(State(state): State<SharedState>) -> Result<Response, AppError> {
    let csv = admin_service::export_game_data(&state).await?;
    Ok(csv_response(csv, "product_builder_data.csv"))
}

/// Download per-feature historical score rows as CSV.
#[utoipa::path(
    get,
    path = "/admin/export/feature-scores",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Shared admin token")),
    responses((status = 200, description = "CSV export", content_type = "text/csv"))
)]
pub async fn export_feature_scores(
    State(state): State<SharedState>,
) -> Result<Response, AppError> {
    let csv = admin_service::export_feature_scores(&state).await?;
    Ok(csv_response(csv, "feature_historical_scores.csv"))
}

fn csv_response(csv: String, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
        .into_response()
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    match state.config().admin_token() {
        Some(expected) if expected == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized(
            "admin access is not configured".into(),
        )),
    }
}
