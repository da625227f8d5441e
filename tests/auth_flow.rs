mod common;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use common::{client, reference, spawn_server, spawn_token_server, tag_names};
use docker_tag_finder::FinderError;
use docker_tag_finder::concurrency::check_all;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const DIGEST: &str = "sha256:0000000000000000000000000000000000000000000000000000000000000abc";

/// Registry that demands `Bearer <token>` on every path
struct ProtectedRegistry {
    challenge: Option<String>,
    token: String,
    hits: AtomicUsize,
    authorization: Mutex<Vec<Option<String>>>,
}

impl ProtectedRegistry {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn protected(State(registry): State<Arc<ProtectedRegistry>>, uri: Uri, headers: HeaderMap) -> Response {
    registry.hits.fetch_add(1, Ordering::SeqCst);

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    registry.authorization.lock().unwrap().push(presented.clone());

    if presented.as_deref() != Some(format!("Bearer {}", registry.token).as_str()) {
        return match &registry.challenge {
            Some(challenge) => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, challenge.clone())],
            )
                .into_response(),
            None => StatusCode::UNAUTHORIZED.into_response(),
        };
    }

    if uri.path().ends_with("/tags/list") {
        Json(json!({ "name": "team/app", "tags": ["v1", "v2"] })).into_response()
    } else {
        ([("docker-content-digest", DIGEST)], "{}").into_response()
    }
}

async fn spawn_protected(challenge: Option<String>, token: &str) -> (String, Arc<ProtectedRegistry>) {
    let registry = Arc::new(ProtectedRegistry {
        challenge,
        token: token.to_string(),
        hits: AtomicUsize::new(0),
        authorization: Mutex::new(Vec::new()),
    });
    let router = Router::new()
        .fallback(protected)
        .with_state(Arc::clone(&registry));
    (spawn_server(router).await, registry)
}

#[tokio::test]
async fn challenge_triggers_single_token_request_and_retry() {
    let (realm, tokens) = spawn_token_server("auth-token-xyz", "token", StatusCode::OK).await;
    let challenge = format!(
        r#"Bearer realm="{}",service="registry.test",scope="repository:team/app:pull""#,
        realm
    );
    let (base, registry) = spawn_protected(Some(challenge), "auth-token-xyz").await;
    let client = client();
    let image = reference(&base, "team/app");

    let tags = client.list_tags(&image).await.unwrap();

    assert_eq!(tags, vec!["v1", "v2"]);
    assert_eq!(tokens.hits(), 1);
    assert_eq!(registry.hits(), 2, "expected the 401 plus exactly one retry");

    let seen = registry.authorization.lock().unwrap().clone();
    assert_eq!(seen[0], None);
    assert_eq!(seen[1].as_deref(), Some("Bearer auth-token-xyz"));

    let query = tokens.last_query();
    assert_eq!(query["service"], "registry.test");
    assert_eq!(query["scope"], "repository:team/app:pull");
}

#[tokio::test]
async fn cached_token_is_reused_by_later_calls() {
    let (realm, tokens) = spawn_token_server("manifest-token", "token", StatusCode::OK).await;
    let challenge = format!(r#"Bearer realm="{}",service="registry.test""#, realm);
    let (base, registry) = spawn_protected(Some(challenge), "manifest-token").await;
    let client = client();
    let image = reference(&base, "team/app");

    client.list_tags(&image).await.unwrap();
    let digest = client.fetch_manifest_digest(&image, "v1").await.unwrap();

    assert_eq!(digest, DIGEST);
    assert_eq!(tokens.hits(), 1, "second call must not fetch another token");
    assert_eq!(registry.hits(), 3, "the manifest call should succeed on its first attempt");
    assert_eq!(
        client.cached_token().map(|t| t.value().to_string()).as_deref(),
        Some("manifest-token")
    );
}

#[tokio::test]
async fn access_token_field_is_accepted() {
    let (realm, tokens) = spawn_token_server("access-token-456", "access_token", StatusCode::OK).await;
    let challenge = format!(r#"Bearer realm="{}",service="test""#, realm);
    let (base, _registry) = spawn_protected(Some(challenge), "access-token-456").await;

    let digest = client()
        .fetch_manifest_digest(&reference(&base, "team/app"), "v2")
        .await
        .unwrap();

    assert_eq!(digest, DIGEST);
    assert_eq!(tokens.hits(), 1);
}

#[tokio::test]
async fn missing_scope_is_synthesized_for_the_repository() {
    let (realm, tokens) = spawn_token_server("tok", "token", StatusCode::OK).await;
    let challenge = format!(r#"Bearer realm="{}""#, realm);
    let (base, _registry) = spawn_protected(Some(challenge), "tok").await;

    client().list_tags(&reference(&base, "team/app")).await.unwrap();

    let query = tokens.last_query();
    assert_eq!(query["scope"], "repository:team/app:pull");
    assert!(!query.contains_key("service"));
}

#[tokio::test]
async fn unauthorized_without_challenge_header_is_malformed() {
    let (base, registry) = spawn_protected(None, "never").await;

    let err = client()
        .list_tags(&reference(&base, "team/app"))
        .await
        .unwrap_err();

    assert!(matches!(err, FinderError::AuthHeaderMalformed(_)), "got {:?}", err);
    assert_eq!(registry.hits(), 1);
}

#[tokio::test]
async fn non_bearer_challenge_is_malformed() {
    let (base, _registry) = spawn_protected(Some(r#"Basic realm="registry""#.to_string()), "never").await;

    let err = client()
        .fetch_manifest_digest(&reference(&base, "team/app"), "v1")
        .await
        .unwrap_err();

    assert!(matches!(err, FinderError::AuthHeaderMalformed(_)));
}

#[tokio::test]
async fn failing_token_endpoint_reports_token_request_failure() {
    let (realm, tokens) = spawn_token_server("unused", "token", StatusCode::INTERNAL_SERVER_ERROR).await;
    let challenge = format!(r#"Bearer realm="{}",service="registry.test""#, realm);
    let (base, _registry) = spawn_protected(Some(challenge), "unused").await;
    let client = client();

    let err = client
        .list_tags(&reference(&base, "team/app"))
        .await
        .unwrap_err();

    assert!(matches!(err, FinderError::TokenRequestFailed(_)), "got {:?}", err);
    assert_eq!(tokens.hits(), 1);
    assert!(client.cached_token().is_none());
}

#[tokio::test]
async fn rejected_retry_surfaces_registry_status() {
    // The token endpoint hands out a token the registry never accepts.
    let (realm, tokens) = spawn_token_server("wrong", "token", StatusCode::OK).await;
    let challenge = format!(r#"Bearer realm="{}""#, realm);
    let (base, registry) = spawn_protected(Some(challenge), "right").await;

    let err = client()
        .list_tags(&reference(&base, "team/app"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(registry.hits(), 2, "only one retry after a 401");
    assert_eq!(tokens.hits(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn workers_share_one_token_across_the_pool() {
    let (realm, tokens) = spawn_token_server("pool-token", "token", StatusCode::OK).await;
    let challenge = format!(r#"Bearer realm="{}",service="registry.test""#, realm);
    let (base, registry) = spawn_protected(Some(challenge), "pool-token").await;

    let stream = check_all(
        client(),
        reference(&base, "team/app"),
        tag_names(0, 50),
        10,
        CancellationToken::new(),
    );
    let results = timeout(Duration::from_secs(10), stream.collect_all())
        .await
        .expect("result stream never closed");

    assert_eq!(results.len(), 50);
    assert!(
        results.iter().all(|r| r.digest() == Some(DIGEST)),
        "every tag should succeed after the handshake"
    );
    assert!(tokens.hits() >= 1);
    assert!(tokens.hits() <= 10, "at most one token request per worker");

    let seen = registry.authorization.lock().unwrap().clone();
    let authorized = seen
        .iter()
        .filter(|auth| auth.as_deref() == Some("Bearer pool-token"))
        .count();
    assert_eq!(authorized, 50, "each tag is fetched once with the shared token");
    assert!(seen.iter().flatten().all(|auth| auth == "Bearer pool-token"));
    assert!(registry.hits() <= 100, "no tag is retried more than once");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn token_failure_is_reported_per_tag_without_stopping_the_pool() {
    let (realm, tokens) = spawn_token_server("unused", "token", StatusCode::INTERNAL_SERVER_ERROR).await;
    let challenge = format!(r#"Bearer realm="{}""#, realm);
    let (base, _registry) = spawn_protected(Some(challenge), "unused").await;
    let client = client();

    let stream = check_all(
        Arc::clone(&client),
        reference(&base, "team/app"),
        tag_names(0, 20),
        4,
        CancellationToken::new(),
    );
    let results = timeout(Duration::from_secs(10), stream.collect_all())
        .await
        .expect("result stream never closed");

    assert_eq!(results.len(), 20);
    assert!(
        results
            .iter()
            .all(|r| matches!(r.error(), Some(FinderError::TokenRequestFailed(_)))),
        "every tag should carry the token failure"
    );
    assert!(tokens.hits() >= 1);
    assert!(client.cached_token().is_none());
}
