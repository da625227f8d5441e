//! Docker Tag Finder Library
//!
//! Finds which tags of a Docker Registry API v2 repository currently point
//! at a manifest digest. Digests are read from response headers only, and
//! many tags are checked concurrently.
//!
//! ```no_run
//! use docker_tag_finder::{FinderConfig, TagFinder};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> docker_tag_finder::Result<()> {
//! let finder = TagFinder::new(FinderConfig::default().with_workers(16))?;
//! let report = finder
//!     .find("ghcr.io/owner/repo", "sha256:4a5f...", CancellationToken::new())
//!     .await?;
//! for tag in &report.matches {
//!     println!("{}", tag);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod concurrency;
pub mod config;
pub mod digest;
pub mod error;
pub mod finder;
pub mod logging;
pub mod registry;

pub use concurrency::{TagCheckResult, TagCheckStream, check_all};
pub use config::FinderConfig;
pub use digest::TargetDigest;
pub use error::{FinderError, Result};
pub use finder::{ScanReport, TagFinder};
pub use registry::{ImageReference, RegistryClient, resolve};
