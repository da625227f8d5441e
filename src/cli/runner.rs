//! Plain-text scan driver behind the binary

use crate::cli::args::Args;
use crate::concurrency::TagCheckResult;
use crate::config::FinderConfig;
use crate::digest::TargetDigest;
use crate::error::{FinderError, Result};
use crate::finder::{ScanReport, TagFinder};
use crate::logging::Logger;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

pub struct Runner {
    args: Args,
    output: Logger,
    cancel: CancellationToken,
}

impl Runner {
    pub fn new(args: Args) -> Self {
        let output = if args.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(args.verbose)
        };

        Self {
            args,
            output,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the scan from taking further tags
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn output(&self) -> &Logger {
        &self.output
    }

    /// Run the scan and map its outcome to the process exit code:
    /// success only when at least one tag matched.
    pub async fn run(&self) -> ExitCode {
        match self.scan().await {
            Ok(report) if report.has_matches() => ExitCode::SUCCESS,
            Ok(_) => ExitCode::FAILURE,
            Err(err) => {
                self.output.error(&err.to_string());
                ExitCode::FAILURE
            }
        }
    }

    fn build_config(&self) -> Result<FinderConfig> {
        self.args.validate().map_err(FinderError::Config)?;

        let mut config = FinderConfig::from_env()?;
        if let Some(workers) = self.args.workers {
            config = config.with_workers(workers);
        }
        config.validate()?;
        Ok(config)
    }

    pub async fn scan(&self) -> Result<ScanReport> {
        let config = self.build_config()?;
        let target = TargetDigest::parse(&self.args.digest)?;
        let finder = TagFinder::new(config)?;

        let reference = finder.resolve(&self.args.image)?;
        self.output.section("Docker Tag Finder");
        self.output.info(&format!("Repository: {}", reference));
        self.output.info(&format!("Target digest: {}", target));
        self.output.info(&format!(
            "Checking tags with {} workers",
            finder.config().workers
        ));

        let report = finder
            .scan(&reference, target, self.cancel.clone(), |result, report, matched| {
                self.render_result(result, report, matched)
            })
            .await?;

        self.print_summary(&report);
        Ok(report)
    }

    fn render_result(&self, result: &TagCheckResult, report: &ScanReport, matched: bool) {
        if matched {
            if self.output.quiet {
                self.output.result(&result.tag);
            } else {
                self.output.success(&format!("Match: {}", result.tag));
            }
        }

        let detail = match &result.outcome {
            Ok(digest) => format!("{} -> {}", result.tag, digest),
            Err(err) => format!("{} failed: {}", result.tag, err),
        };
        self.output.detail(&format!("[{}/{}] {}", report.processed, report.total, detail));
    }

    fn print_summary(&self, report: &ScanReport) {
        if report.is_incomplete() {
            self.output.warning(&format!(
                "Scan interrupted after {}/{} tags",
                report.processed, report.total
            ));
        }
        if !report.failures.is_empty() {
            self.output.warning(&format!(
                "{} tags could not be checked (use --verbose for details)",
                report.failures.len()
            ));
        }

        if report.has_matches() {
            self.output.summary(
                &format!("Found {} matching tag(s)", report.matches.len()),
                &report.matches,
            );
        } else {
            self.output.info("No tags found matching the digest.");
        }
        self.output.success(&format!(
            "Checked {}/{} tags in {}",
            report.processed,
            report.total,
            self.output.format_duration(self.output.elapsed())
        ));
    }
}
