use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::game::{
        ActionResponse, BuildActionRequest, ConjointChoiceRequest, CursorUpdateRequest,
        GameSnapshot, JoinGameRequest, JoinGameResponse, ProgressGameRequest,
    },
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes handling player-facing game operations.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/game/join", post(join_game))
        .route("/game/status/{id}", get(game_status))
        .route("/game/progress", post(progress_game))
        .route("/game/conjoint", post(submit_conjoint_choice))
        .route("/game/build", post(build_action))
        .route("/game/cursor", post(update_cursor))
}

/// Join an open lobby, or create a fresh game when none has room.
#[utoipa::path(
    post,
    path = "/game/join",
    tag = "game",
    request_body = JoinGameRequest,
    responses(
        (status = 200, description = "Joined or created a game", body = JoinGameResponse),
        (status = 400, description = "Invalid player name")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    Json(payload): Json<JoinGameRequest>,
) -> Result<Json<JoinGameResponse>, AppError> {
    payload.validate()?;
    let response = game_service::join_game(&state, payload).await?;
    Ok(Json(response))
}

/// Full current document for a game.
#[utoipa::path(
    get,
    path = "/game/status/{id}",
    tag = "game",
    params(("id" = String, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Current game state", body = GameSnapshot),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn game_status(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameSnapshot>, AppError> {
    let snapshot = game_service::game_status(&state, id).await?;
    Ok(Json(snapshot))
}

/// Trigger one stage progression tick for a game.
#[utoipa::path(
    post,
    path = "/game/progress",
    tag = "game",
    request_body = ProgressGameRequest,
    responses(
        (status = 200, description = "Tick applied (or nothing to do)", body = ActionResponse),
        (status = 409, description = "Concurrent update; retry")
    )
)]
pub async fn progress_game(
    State(state): State<SharedState>,
    Json(payload): Json<ProgressGameRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = game_service::progress_game(&state, payload.game_id).await?;
    Ok(Json(response))
}

/// Submit a player's conjoint product choice.
#[utoipa::path(
    post,
    path = "/game/conjoint",
    tag = "game",
    request_body = ConjointChoiceRequest,
    responses(
        (status = 200, description = "Choice recorded", body = ActionResponse),
        (status = 409, description = "Wrong stage, re-vote rejected, or concurrent update")
    )
)]
pub async fn submit_conjoint_choice(
    State(state): State<SharedState>,
    Json(payload): Json<ConjointChoiceRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    payload.validate()?;
    let response = game_service::submit_conjoint_choice(&state, payload).await?;
    Ok(Json(response))
}

/// Apply an add, remove, or steal to a player's board.
#[utoipa::path(
    post,
    path = "/game/build",
    tag = "game",
    request_body = BuildActionRequest,
    responses(
        (status = 200, description = "Board updated", body = ActionResponse),
        (status = 409, description = "Rejected action or concurrent update")
    )
)]
pub async fn build_action(
    State(state): State<SharedState>,
    Json(payload): Json<BuildActionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    payload.validate()?;
    let response = game_service::build_action(&state, payload).await?;
    Ok(Json(response))
}

/// Report a player's cursor position.
#[utoipa::path(
    post,
    path = "/game/cursor",
    tag = "game",
    request_body = CursorUpdateRequest,
    responses(
        (status = 200, description = "Cursor stored", body = ActionResponse)
    )
)]
pub async fn update_cursor(
    State(state): State<SharedState>,
    Json(payload): Json<CursorUpdateRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = game_service::update_cursor(&state, payload).await?;
    Ok(Json(response))
}
