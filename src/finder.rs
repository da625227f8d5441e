//! High level entry point tying resolution, listing and digest checks together

use crate::concurrency::{self, TagCheckResult, TagCheckStream};
use crate::config::FinderConfig;
use crate::digest::TargetDigest;
use crate::error::{FinderError, Result};
use crate::registry::{self, ImageReference, RegistryClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Tally of one scan, built incrementally from streamed results
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub reference: ImageReference,
    pub target: TargetDigest,
    pub total: usize,
    pub processed: usize,
    pub matches: Vec<String>,
    pub failures: Vec<(String, FinderError)>,
}

impl ScanReport {
    pub fn new(reference: ImageReference, target: TargetDigest, total: usize) -> Self {
        Self {
            reference,
            target,
            total,
            processed: 0,
            matches: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Count a result; failures are processed but never match
    pub fn record(&mut self, result: &TagCheckResult) -> bool {
        self.processed += 1;
        let matched = result.matches(&self.target);

        match &result.outcome {
            Ok(_) if matched => self.matches.push(result.tag.clone()),
            Ok(_) => {}
            Err(err) => self.failures.push((result.tag.clone(), err.clone())),
        }
        matched
    }

    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    /// True when the stream closed before every tag was checked
    pub fn is_incomplete(&self) -> bool {
        self.processed < self.total
    }
}

/// Finds the tags of a repository that currently point at a digest
#[derive(Debug, Clone)]
pub struct TagFinder {
    client: Arc<RegistryClient>,
    config: FinderConfig,
}

impl TagFinder {
    pub fn new(config: FinderConfig) -> Result<Self> {
        let client = Arc::new(RegistryClient::new(&config)?);
        Ok(Self { client, config })
    }

    /// Reuse an existing client, e.g. one whose token is already cached
    pub fn with_client(client: Arc<RegistryClient>, config: FinderConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &Arc<RegistryClient> {
        &self.client
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    pub fn resolve(&self, image: &str) -> Result<ImageReference> {
        registry::resolve(image)
    }

    pub async fn list_tags(&self, reference: &ImageReference) -> Result<Vec<String>> {
        self.client.list_tags(reference).await
    }

    /// Start the worker pool over `tags` with the configured worker count
    pub fn check_digests(
        &self,
        reference: &ImageReference,
        tags: Vec<String>,
        cancel: CancellationToken,
    ) -> TagCheckStream {
        concurrency::check_all(
            Arc::clone(&self.client),
            reference.clone(),
            tags,
            self.config.workers,
            cancel,
        )
    }

    /// Resolve, list and check in one go.
    ///
    /// Resolution and listing failures abort the scan; per-tag failures end
    /// up in [`ScanReport::failures`].
    pub async fn find(&self, image: &str, digest: &str, cancel: CancellationToken) -> Result<ScanReport> {
        let target = TargetDigest::parse(digest)?;
        let reference = self.resolve(image)?;
        self.scan(&reference, target, cancel, |_, _, _| {}).await
    }

    /// List and check an already resolved repository.
    ///
    /// `on_result` sees every result right after it was recorded, together
    /// with the running report and whether the tag matched.
    pub async fn scan<F>(
        &self,
        reference: &ImageReference,
        target: TargetDigest,
        cancel: CancellationToken,
        mut on_result: F,
    ) -> Result<ScanReport>
    where
        F: FnMut(&TagCheckResult, &ScanReport, bool),
    {
        let tags = self.list_tags(reference).await?;

        let mut report = ScanReport::new(reference.clone(), target, tags.len());
        let mut results = self.check_digests(reference, tags, cancel);

        while let Some(result) = results.next_result().await {
            let matched = report.record(&result);
            on_result(&result, &report, matched);
        }

        info!(
            reference = %report.reference,
            processed = report.processed,
            total = report.total,
            matches = report.matches.len(),
            "scan finished"
        );
        Ok(report)
    }
}
