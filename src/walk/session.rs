//! Walk Session
//!
//! Starts a tree walk as a background producer and hands back the
//! consumer end of its result stream.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::lister::DirectoryLister;
use super::tree::{TreeWalkResult, TreeWalker};
use crate::error::{Error, Result};
use crate::storage::{IsLeafFn, SLASH_SEPARATOR};

/// Handle to a running tree walk.
///
/// Results arrive in key order. The stream closes when the producer
/// finishes, whether it completed, failed or was cancelled. Dropping the
/// handle stops the producer at its next send.
pub struct TreeWalk {
    results: mpsc::Receiver<TreeWalkResult>,
    cancel: CancellationToken,
    producer: JoinHandle<Result<()>>,
}

impl TreeWalk {
    /// Receive the next result, or `None` once the stream is closed
    pub async fn next(&mut self) -> Option<TreeWalkResult> {
        self.results.recv().await
    }

    /// Ask the producer to stop. Idempotent, and a no-op after completion.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the walk's cancellation signal
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Convert into a `Stream` of results plus the cancellation signal
    pub fn into_stream(self) -> (ReceiverStream<TreeWalkResult>, CancellationToken) {
        (ReceiverStream::new(self.results), self.cancel)
    }

    /// Stop receiving and wait for the producer's own outcome.
    ///
    /// A walk abandoned before completion reports `Error::WalkAborted`.
    pub async fn join(self) -> Result<()> {
        drop(self.results);
        self.producer
            .await
            .map_err(|e| Error::Internal(format!("Walk task failed: {}", e)))?
    }
}

/// Start walking `bucket` from `prefix`, resuming after `marker`.
///
/// With prefix `"one/two/th"` and marker `"one/two/three/four/five.txt"`
/// the walk starts in `"one/two/"`, keeps entries beginning with `"th"`
/// and resumes after `"three/four/five.txt"`. `page_size` bounds how far
/// the producer can run ahead of the consumer.
pub fn start_tree_walk(
    bucket: &str,
    prefix: &str,
    marker: &str,
    recursive: bool,
    lister: Arc<DirectoryLister>,
    is_leaf: IsLeafFn,
    page_size: usize,
) -> TreeWalk {
    let (prefix_dir, entry_prefix_match) = match prefix.rfind(SLASH_SEPARATOR) {
        Some(idx) => (&prefix[..=idx], &prefix[idx + 1..]),
        None => ("", prefix),
    };
    let marker = marker.strip_prefix(prefix_dir).unwrap_or(marker);

    let (tx, rx) = mpsc::channel(page_size.max(1));
    let cancel = CancellationToken::new();

    let walker = TreeWalker {
        bucket: bucket.to_string(),
        recursive,
        lister,
        is_leaf,
        results: tx,
        cancel: cancel.clone(),
    };
    let prefix_dir = prefix_dir.to_string();
    let entry_prefix_match = entry_prefix_match.to_string();
    let marker = marker.to_string();

    let producer = tokio::spawn(async move {
        let outcome = walker
            .walk(prefix_dir.clone(), entry_prefix_match, marker, true)
            .await;
        match &outcome {
            Ok(()) => debug!("Walk of {}/{} complete", walker.bucket, prefix_dir),
            Err(Error::WalkAborted) => debug!("Walk of {}/{} aborted", walker.bucket, prefix_dir),
            Err(e) => warn!("Walk of {}/{} failed: {}", walker.bucket, prefix_dir, e),
        }
        // Dropping the walker closes the result stream
        drop(walker);
        outcome
    });

    TreeWalk {
        results: rx,
        cancel,
        producer,
    }
}
