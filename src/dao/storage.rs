use std::error::Error;
use thiserror::Error;

/// Result alias shared by every [`GameStore`] operation.
///
/// [`GameStore`]: crate::dao::game_store::GameStore
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure talking to the backing game store, whatever the backend.
///
/// Version conflicts are not errors; they surface through
/// [`UpdateOutcome`](crate::dao::game_store::UpdateOutcome) so callers can
/// re-read and retry.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store is unreachable or the operation failed mid-flight.
    #[error("game store unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Wrap any backend failure as an unavailable error.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
