//! Fan-out/fan-in worker pool resolving manifest digests for many tags
//!
//! ```text
//!  tags ──► [ bounded job queue, pre-filled, closed ] ──► worker 1..N ──► [ result channel ] ──► caller
//!                                                                   ▲
//!                                   join barrier drops the last sender when every worker is done
//! ```

use crate::concurrency::stream::{TagCheckResult, TagCheckStream};
use crate::registry::{ImageReference, RegistryClient};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Result channel capacity per worker
const RESULT_BUFFER_PER_WORKER: usize = 2;

type JobQueue = Arc<Mutex<mpsc::Receiver<String>>>;

/// Check every tag's manifest digest with `concurrency` workers.
///
/// Must be called from within a tokio runtime. Each submitted tag yields
/// exactly one result unless `cancel` fires before a worker picks it up.
/// Cancellation is cooperative: workers look at the token before taking
/// the next tag, requests already sent run to completion, and the stream
/// still closes once every worker has stopped.
pub fn check_all(
    client: Arc<RegistryClient>,
    reference: ImageReference,
    tags: Vec<String>,
    concurrency: usize,
    cancel: CancellationToken,
) -> TagCheckStream {
    let workers = concurrency.max(1);
    let total = tags.len();

    let (job_tx, job_rx) = mpsc::channel(total.max(1));
    for tag in tags {
        // Capacity equals the tag count, so the queue cannot be full here.
        if let Err(err) = job_tx.try_send(tag) {
            warn!(error = %err, "job queue rejected a tag");
        }
    }
    drop(job_tx);

    let jobs: JobQueue = Arc::new(Mutex::new(job_rx));
    let (result_tx, result_rx) = mpsc::channel(workers * RESULT_BUFFER_PER_WORKER);
    let reference = Arc::new(reference);

    debug!(workers, tags = total, repository = reference.repository(), "starting digest workers");

    let handles: Vec<_> = (0..workers)
        .map(|worker_id| {
            tokio::spawn(run_worker(
                worker_id,
                Arc::clone(&client),
                Arc::clone(&reference),
                Arc::clone(&jobs),
                result_tx.clone(),
                cancel.clone(),
            ))
        })
        .collect();

    tokio::spawn(async move {
        for outcome in join_all(handles).await {
            if let Err(err) = outcome {
                warn!(error = %err, "digest worker terminated abnormally");
            }
        }
        debug!("all digest workers exited, closing result stream");
        drop(result_tx);
    });

    TagCheckStream::new(result_rx)
}

async fn run_worker(
    worker_id: usize,
    client: Arc<RegistryClient>,
    reference: Arc<ImageReference>,
    jobs: JobQueue,
    results: mpsc::Sender<TagCheckResult>,
    cancel: CancellationToken,
) {
    let mut processed = 0usize;

    loop {
        if cancel.is_cancelled() {
            debug!(worker_id, processed, "cancellation observed, worker stopping");
            break;
        }

        let next = jobs.lock().await.recv().await;
        let Some(tag) = next else {
            break;
        };

        let result = match client.fetch_manifest_digest(&reference, &tag).await {
            Ok(digest) => {
                debug!(worker_id, tag = %tag, digest = %digest, "resolved tag digest");
                TagCheckResult::success(tag, digest)
            }
            Err(err) => {
                debug!(worker_id, tag = %tag, error = %err, "tag check failed");
                TagCheckResult::failure(tag, err)
            }
        };
        processed += 1;

        if results.send(result).await.is_err() {
            debug!(worker_id, "result stream dropped by caller, worker stopping");
            break;
        }
    }
}
