//! Manifest digest lookup without downloading the manifest body

use crate::error::handlers::HttpErrorHandler;
use crate::error::{FinderError, Result};
use crate::registry::client::RegistryClient;
use crate::registry::reference::ImageReference;
use reqwest::StatusCode;

pub const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const DOCKER_MANIFEST_LIST_V2: &str = "application/vnd.docker.distribution.manifest.list.v2+json";
pub const OCI_MANIFEST_V1: &str = "application/vnd.oci.image.manifest.v1+json";
pub const OCI_IMAGE_INDEX_V1: &str = "application/vnd.oci.image.index.v1+json";

/// Accepted manifest media types, most preferred first
pub const MANIFEST_MEDIA_TYPES: [&str; 4] = [
    DOCKER_MANIFEST_V2,
    DOCKER_MANIFEST_LIST_V2,
    OCI_MANIFEST_V1,
    OCI_IMAGE_INDEX_V1,
];

pub const CONTENT_DIGEST_HEADER: &str = "docker-content-digest";

pub fn manifest_accept_header() -> String {
    MANIFEST_MEDIA_TYPES.join(", ")
}

impl RegistryClient {
    /// Digest the registry reports for `tag`.
    ///
    /// Only the `Docker-Content-Digest` response header is used; the
    /// manifest body is dropped unread, so every lookup costs roughly the
    /// same regardless of manifest size.
    pub async fn fetch_manifest_digest(&self, reference: &ImageReference, tag: &str) -> Result<String> {
        let url = reference.manifest_url(tag);
        let response = self
            .get_authenticated(&url, reference.repository(), Some(&manifest_accept_header()))
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(HttpErrorHandler::status_error(
                status,
                &format!("manifest for tag {}", tag),
            ));
        }

        response
            .headers()
            .get(CONTENT_DIGEST_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|digest| !digest.is_empty())
            .map(str::to_string)
            .ok_or_else(|| FinderError::MissingDigestHeader {
                tag: tag.to_string(),
            })
    }
}
