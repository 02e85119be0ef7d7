/// Catalog management and CSV exports for administrators.
pub mod admin_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Core game logic: joining, progression, votes, and build actions.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Storage connection supervisor with reconnect and degraded mode.
pub mod storage_supervisor;
