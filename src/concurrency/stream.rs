//! Result stream handed from the worker pool to its caller

use crate::digest::TargetDigest;
use crate::error::FinderError;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Outcome of checking one tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCheckResult {
    pub tag: String,
    pub outcome: Result<String, FinderError>,
}

impl TagCheckResult {
    pub fn success(tag: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            outcome: Ok(digest.into()),
        }
    }

    pub fn failure(tag: impl Into<String>, error: FinderError) -> Self {
        Self {
            tag: tag.into(),
            outcome: Err(error),
        }
    }

    pub fn digest(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    pub fn error(&self) -> Option<&FinderError> {
        self.outcome.as_ref().err()
    }

    /// True when the lookup succeeded and reported `target`
    pub fn matches(&self, target: &TargetDigest) -> bool {
        self.digest().is_some_and(|digest| target.matches(digest))
    }
}

/// Finite, unordered stream of [`TagCheckResult`]s.
///
/// Yields `None` once every worker has exited; that is the only "done"
/// signal. Results arrive in completion order.
#[derive(Debug)]
pub struct TagCheckStream {
    results: mpsc::Receiver<TagCheckResult>,
}

impl TagCheckStream {
    pub(crate) fn new(results: mpsc::Receiver<TagCheckResult>) -> Self {
        Self { results }
    }

    /// Wait for the next result, `None` after the pool has shut down
    pub async fn next_result(&mut self) -> Option<TagCheckResult> {
        self.results.recv().await
    }

    /// Drain the stream to the end
    pub async fn collect_all(mut self) -> Vec<TagCheckResult> {
        let mut collected = Vec::new();
        while let Some(result) = self.next_result().await {
            collected.push(result);
        }
        collected
    }
}

impl Stream for TagCheckStream {
    type Item = TagCheckResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().results.poll_recv(cx)
    }
}
