use serde::Serialize;
use utoipa::ToSchema;

/// Overall service classification reported by `/healthcheck`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The service can serve games normally.
    Ok,
    /// The game store is unreachable; game routes answer 503.
    Degraded,
}

/// Payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: HealthStatus,
    /// Whether the game store answered the latest ping.
    pub game_store_reachable: bool,
}

impl HealthResponse {
    /// Build the response from the game store's latest ping outcome.
    pub fn report(game_store_reachable: bool) -> Self {
        let status = if game_store_reachable {
            HealthStatus::Ok
        } else {
            HealthStatus::Degraded
        };
        Self {
            status,
            game_store_reachable,
        }
    }
}
