//! Command-line argument parsing

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "docker-tag-finder")]
#[command(about = "Find which tags of an image currently point at a manifest digest")]
#[command(version, author)]
#[command(after_help = "Example: docker-tag-finder docker.io/library/nginx sha256:abc123...")]
pub struct Args {
    /// Image reference, e.g. nginx, ghcr.io/owner/repo or localhost:5000/app
    #[arg(value_name = "IMAGE")]
    pub image: String,

    /// Manifest digest to look for, with or without the sha256: prefix
    #[arg(
        value_name = "DIGEST",
        help = "Manifest digest to look for: 64 hex characters, optionally prefixed with sha256: (shorter or non-hex values are rejected)"
    )]
    pub digest: String,

    /// Number of concurrent HTTP requests
    #[arg(
        long = "workers",
        short = 'w',
        help = "Number of concurrent HTTP requests [default: 10, env: TAG_FINDER_WORKERS]"
    )]
    pub workers: Option<usize>,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', help = "Show every checked tag and progress details")]
    pub verbose: bool,

    /// Quiet output
    #[arg(
        long = "quiet",
        short = 'q',
        conflicts_with = "verbose",
        help = "Only print matching tags, one per line"
    )]
    pub quiet: bool,

    /// Debug logging
    #[arg(long = "debug", help = "Emit debug-level diagnostics on stderr")]
    pub debug: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        if self.image.trim().is_empty() {
            return Err("Image reference cannot be empty".to_string());
        }

        if self.digest.trim().is_empty() {
            return Err("Digest cannot be empty".to_string());
        }

        if self.workers == Some(0) {
            return Err("workers must be at least 1".to_string());
        }

        Ok(())
    }
}
