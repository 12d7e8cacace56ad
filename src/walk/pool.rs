//! Tree Walk Pool
//!
//! Keeps paused walks between paginated listing calls. A page that stops
//! before the end parks its walk under the parameters the next page will
//! ask for, so the next call continues the same producer instead of
//! listing from the top again. Parked walks expire after a timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::session::TreeWalk;

/// Default time a parked walk is kept
pub const DEFAULT_POOL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Parameters identifying a resumable walk
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListParams {
    pub bucket: String,
    pub recursive: bool,
    pub marker: String,
    pub prefix: String,
}

/// A parked walk and the signal that stops its expiry timer
struct PooledWalk {
    id: u64,
    walk: TreeWalk,
    end_timer: CancellationToken,
}

#[derive(Default)]
struct PoolState {
    walks: HashMap<ListParams, Vec<PooledWalk>>,
    next_id: u64,
}

/// Pool of walks waiting for their next page
#[derive(Clone)]
pub struct TreeWalkPool {
    state: Arc<Mutex<PoolState>>,
    timeout: Duration,
}

impl TreeWalkPool {
    /// Create a pool whose walks expire after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(PoolState::default())),
            timeout,
        }
    }

    /// Take the oldest walk parked under `params`
    pub async fn release(&self, params: &ListParams) -> Option<TreeWalk> {
        let mut state = self.state.lock().await;
        let walks = state.walks.get_mut(params)?;
        let pooled = if walks.is_empty() {
            None
        } else {
            Some(walks.remove(0))
        };
        if walks.is_empty() {
            state.walks.remove(params);
        }

        let pooled = pooled?;
        pooled.end_timer.cancel();
        Some(pooled.walk)
    }

    /// Park `walk` under `params` until released or expired
    pub async fn set(&self, params: ListParams, walk: TreeWalk) {
        let end_timer = CancellationToken::new();
        let id = {
            let mut state = self.state.lock().await;
            let id = state.next_id;
            state.next_id += 1;
            state.walks.entry(params.clone()).or_default().push(PooledWalk {
                id,
                walk,
                end_timer: end_timer.clone(),
            });
            id
        };

        let state = Arc::clone(&self.state);
        let timeout = self.timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    let mut state = state.lock().await;
                    let Some(walks) = state.walks.get_mut(&params) else {
                        return;
                    };
                    if let Some(pos) = walks.iter().position(|w| w.id == id) {
                        let expired = walks.remove(pos);
                        expired.walk.cancel();
                        debug!(
                            "Expired parked walk of {} (prefix {:?}, marker {:?})",
                            params.bucket, params.prefix, params.marker
                        );
                    }
                    if walks.is_empty() {
                        state.walks.remove(&params);
                    }
                }
                _ = end_timer.cancelled() => {}
            }
        });
    }

    /// Number of parked walks
    pub async fn len(&self) -> usize {
        self.state.lock().await.walks.values().map(Vec::len).sum()
    }

    /// Whether no walks are parked
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for TreeWalkPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_TIMEOUT)
    }
}
