//! Target digest normalization
//!
//! Users hand the finder either a bare 64-character hex string or a full
//! `sha256:<hex>` digest. Both are normalized to the prefixed form the
//! registry reports in `Docker-Content-Digest`.

use crate::error::{FinderError, Result};
use std::fmt;

pub const SHA256_PREFIX: &str = "sha256:";

/// A normalized `sha256:<hex>` manifest digest
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetDigest(String);

impl TargetDigest {
    /// Normalize digest to full Docker format (add sha256: prefix if missing)
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let hex_part = input.strip_prefix(SHA256_PREFIX).unwrap_or(input);

        if !is_valid_sha256_hex(hex_part) {
            return Err(FinderError::InvalidDigest(input.to_string()));
        }

        Ok(Self(format!("{}{}", SHA256_PREFIX, hex_part.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex part without the algorithm prefix
    pub fn hex(&self) -> &str {
        &self.0[SHA256_PREFIX.len()..]
    }

    /// Compare against a digest reported by the registry
    pub fn matches(&self, reported: &str) -> bool {
        reported.trim().eq_ignore_ascii_case(&self.0)
    }
}

impl fmt::Display for TargetDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TargetDigest {
    type Err = FinderError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Validate SHA256 hex string (64 characters, all hex)
pub fn is_valid_sha256_hex(digest: &str) -> bool {
    digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit())
}
