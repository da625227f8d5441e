//! Image reference resolution
//!
//! Maps a user supplied image string such as `nginx`, `docker.io/myorg/app`
//! or `localhost:5000/team/app` onto a registry base URL and repository path.
//! Pure string handling, no network access.

use crate::error::{FinderError, Result};
use std::fmt;

pub const DOCKER_HUB_REGISTRY: &str = "https://registry-1.docker.io";
const DOCKER_HUB_ALIAS: &str = "docker.io";
const OFFICIAL_NAMESPACE: &str = "library/";
const TRANSPORT_PREFIX: &str = "docker://";

/// Registry base URL plus repository path within it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    registry_url: String,
    repository: String,
}

impl ImageReference {
    /// Builds a reference from parts, trimming slashes so the repository
    /// never starts or ends with one.
    pub fn new(registry_url: impl Into<String>, repository: impl AsRef<str>) -> Result<Self> {
        let registry_url = registry_url.into().trim_end_matches('/').to_string();
        let repository = repository.as_ref().trim_matches('/').to_string();

        if registry_url.is_empty() {
            return Err(FinderError::InvalidReference {
                reference: repository,
                reason: "registry address is empty".to_string(),
            });
        }
        if repository.is_empty() {
            return Err(FinderError::InvalidReference {
                reference: registry_url,
                reason: "repository is empty".to_string(),
            });
        }

        Ok(Self {
            registry_url,
            repository,
        })
    }

    /// Base URL without trailing slash, e.g. `https://ghcr.io`
    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tags_url(&self, page_size: usize) -> String {
        format!(
            "{}/v2/{}/tags/list?n={}",
            self.registry_url, self.repository, page_size
        )
    }

    pub fn manifest_url(&self, tag: &str) -> String {
        format!(
            "{}/v2/{}/manifests/{}",
            self.registry_url, self.repository, tag
        )
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry_url, self.repository)
    }
}

/// Resolve an image string to its registry and repository.
///
/// Rules, first match wins:
/// - no `/` at all: Docker Hub official image (`library/<name>`)
/// - `docker.io/...`: Docker Hub, single-segment names get `library/`
/// - `ghcr.io/...`, `quay.io/...`: that registry over HTTPS
/// - anything else: the first segment is a registry host (port allowed)
///
/// A leading `docker://` is ignored.
pub fn resolve(image: &str) -> Result<ImageReference> {
    let trimmed = image.trim();
    let trimmed = trimmed.strip_prefix(TRANSPORT_PREFIX).unwrap_or(trimmed);

    if trimmed.is_empty() {
        return Err(FinderError::InvalidReference {
            reference: image.to_string(),
            reason: "image name is empty".to_string(),
        });
    }

    let Some((registry, remainder)) = trimmed.split_once('/') else {
        return ImageReference::new(
            DOCKER_HUB_REGISTRY,
            format!("{}{}", OFFICIAL_NAMESPACE, trimmed),
        );
    };

    if registry.is_empty() {
        return Err(FinderError::InvalidReference {
            reference: image.to_string(),
            reason: "registry host is empty".to_string(),
        });
    }

    let resolved = match registry {
        DOCKER_HUB_ALIAS => {
            let remainder = remainder.trim_matches('/');
            if !remainder.is_empty() && !remainder.contains('/') {
                ImageReference::new(
                    DOCKER_HUB_REGISTRY,
                    format!("{}{}", OFFICIAL_NAMESPACE, remainder),
                )
            } else {
                ImageReference::new(DOCKER_HUB_REGISTRY, remainder)
            }
        }
        "ghcr.io" | "quay.io" => ImageReference::new(format!("https://{}", registry), remainder),
        host => ImageReference::new(format!("https://{}", host), remainder),
    };

    resolved.map_err(|err| match err {
        FinderError::InvalidReference { reason, .. } => FinderError::InvalidReference {
            reference: image.to_string(),
            reason,
        },
        other => other,
    })
}
