use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the game store and report whether it can currently back games.
///
/// A failed ping or an uninstalled store yields a degraded report; flipping
/// the shared degraded flag itself is the storage supervisor's job, so this
/// only observes and logs.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let reachable = match state.game_store().await {
        Some(store) => match store.health_check().await {
            Ok(()) => !state.is_degraded().await,
            Err(err) => {
                warn!(error = %err, "game store ping failed");
                false
            }
        },
        None => {
            warn!("no game store installed yet");
            false
        }
    };

    HealthResponse::report(reachable)
}
