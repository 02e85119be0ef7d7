use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{game_store::GameStore, storage::StorageError},
    state::SharedState,
};

const CONNECT_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(15);
const PING_INTERVAL: Duration = Duration::from_secs(10);
const RECONNECT_ATTEMPTS: u32 = 4;

/// Keep the shared game store connected, parking the service in degraded mode
/// whenever the store cannot be reached.
///
/// `connect` is invoked for the initial connection and again from scratch
/// whenever an established store is lost for good.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    let mut backoff = CONNECT_BACKOFF;

    loop {
        match connect().await {
            Ok(store) => {
                info!("game store connected; leaving degraded mode");
                state.set_game_store(store.clone()).await;
                backoff = CONNECT_BACKOFF;
                watch_store(&state, store).await;
            }
            Err(err) => {
                warn!(error = %err, "game store connection attempt failed");
            }
        }
        sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// Ping the store on an interval, reviving it through its own reconnect hook
/// on failure. Returns once reconnection is exhausted so the caller can build
/// a fresh store.
async fn watch_store(state: &SharedState, store: Arc<dyn GameStore>) {
    loop {
        if store.health_check().await.is_ok() {
            if state.is_degraded().await {
                info!("game store healthy again; leaving degraded mode");
                state.update_degraded(false).await;
            }
            sleep(PING_INTERVAL).await;
            continue;
        }

        if revive(state, store.as_ref()).await {
            state.update_degraded(false).await;
            sleep(PING_INTERVAL).await;
        } else {
            warn!("exhausted game store reconnect attempts; staying degraded");
            return;
        }
    }
}

/// Attempt up to [`RECONNECT_ATTEMPTS`] reconnects with exponential backoff,
/// flipping the degraded flag on as soon as the first attempt fails.
async fn revive(state: &SharedState, store: &dyn GameStore) -> bool {
    let mut delay = CONNECT_BACKOFF;

    for attempt in 0..RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!("game store reconnected after a failed ping");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(
                        error = %err,
                        "game store ping and reconnect failed; entering degraded mode"
                    );
                    state.update_degraded(true).await;
                } else {
                    warn!(attempt, error = %err, "game store reconnect attempt failed");
                }
                sleep(delay).await;
                delay = (delay * 2).min(MAX_BACKOFF);
            }
        }
    }

    false
}
