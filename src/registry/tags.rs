//! Paginated tag listing (`GET /v2/<repo>/tags/list`)

use crate::error::handlers::HttpErrorHandler;
use crate::error::{FinderError, Result};
use crate::registry::client::RegistryClient;
use crate::registry::reference::ImageReference;
use reqwest::StatusCode;
use reqwest::header::LINK;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

pub const TAGS_PAGE_SIZE: usize = 1000;

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// One page of the tag listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPage {
    pub tags: Vec<String>,
    /// Absolute URL of the following page, if the registry announced one
    pub next: Option<String>,
}

/// Extract the target of a `rel="next"` link.
///
/// `</v2/repo/tags/list?n=100&last=tag99>; rel="next"` yields
/// `/v2/repo/tags/list?n=100&last=tag99`. Several comma-separated links may
/// share one header; the first one carrying an exact `rel="next"` parameter
/// wins. Links without angle brackets or without that parameter are skipped.
pub fn parse_link_header(header: &str) -> Option<String> {
    split_link_values(header)
        .into_iter()
        .find_map(next_link_target)
}

/// Split a `Link` header into its link-values, ignoring commas inside `<...>`
fn split_link_values(header: &str) -> Vec<&str> {
    let mut values = Vec::new();
    let mut in_target = false;
    let mut start = 0;

    for (idx, ch) in header.char_indices() {
        match ch {
            '<' => in_target = true,
            '>' => in_target = false,
            ',' if !in_target => {
                values.push(&header[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    values.push(&header[start..]);
    values
}

fn next_link_target(link_value: &str) -> Option<String> {
    let mut parts = link_value.split(';');
    let target = parts.next()?.trim();

    let target = target.strip_prefix('<')?.strip_suffix('>')?;
    if target.is_empty() {
        return None;
    }

    parts
        .any(|param| param.trim() == r#"rel="next""#)
        .then(|| target.to_string())
}

fn next_page_url(reference: &ImageReference, link: &str) -> Result<String> {
    let base = Url::parse(reference.registry_url())?;
    Ok(base.join(link)?.to_string())
}

impl RegistryClient {
    /// Fetch every tag of the repository, following `Link` pagination.
    ///
    /// Tags keep the order the registry returns them in, page after page.
    pub async fn list_tags(&self, reference: &ImageReference) -> Result<Vec<String>> {
        let mut all_tags = Vec::new();
        let mut next = Some(reference.tags_url(TAGS_PAGE_SIZE));
        let mut pages = 0usize;

        while let Some(url) = next {
            let page = self.fetch_tags_page(reference, &url).await?;
            pages += 1;
            debug!(page = pages, count = page.tags.len(), "fetched tag page");

            all_tags.extend(page.tags);
            next = page.next;
        }

        info!(
            repository = reference.repository(),
            tags = all_tags.len(),
            pages,
            "tag listing complete"
        );
        Ok(all_tags)
    }

    /// Fetch a single page of tags and the URL of the next one
    pub async fn fetch_tags_page(&self, reference: &ImageReference, url: &str) -> Result<TagPage> {
        let response = self
            .get_authenticated(url, reference.repository(), None)
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(HttpErrorHandler::status_error(status, "tag list"));
        }

        let link = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_link_header);

        let body = response
            .bytes()
            .await
            .map_err(|e| HttpErrorHandler::decode_error(status, "tag list", e))?;
        let list: TagList = serde_json::from_slice(&body)
            .map_err(|e| HttpErrorHandler::decode_error(status, "tag list", e))?;

        let next = link
            .map(|path| next_page_url(reference, &path))
            .transpose()
            .map_err(|e| match e {
                FinderError::Config(msg) => FinderError::registry(status.as_u16(), msg),
                other => other,
            })?;

        Ok(TagPage {
            tags: list.tags.unwrap_or_default(),
            next,
        })
    }
}
