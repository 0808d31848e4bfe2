use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use reqwest::{header, Client, Url};
use serde_json::json;
use std::{collections::HashSet, time::Duration};
use thiserror::Error;
use tracing::{debug, error};

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";

static ALLOWED_RESOURCES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["search", "discover", "movie"]));

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// v4 read access token, sent as `Authorization: Bearer`.
    Bearer(String),
    /// v3 key, appended as `api_key`.
    ApiKey(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Bearer(_) => f.write_str("Bearer(***)"),
            Credential::ApiKey(_) => f.write_str("ApiKey(***)"),
        }
    }
}

impl Credential {
    pub fn resolve(token: Option<String>, api_key: Option<String>) -> Option<Self> {
        let token = token.filter(|t| !t.is_empty());
        let api_key = api_key.filter(|k| !k.is_empty());
        match (token, api_key) {
            (Some(t), _) => Some(Credential::Bearer(t)),
            (None, Some(k)) => Some(Credential::ApiKey(k)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub url: Url,
    pub bearer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get(&self, request: &UpstreamRequest) -> Result<UpstreamResponse>;
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("TMDB credentials not configured")]
    MissingCredentials,

    #[error("Missing path parameter")]
    MissingPath,

    #[error("Unsupported path")]
    UnsupportedPath,

    #[error("upstream call failed: {0:#}")]
    Upstream(#[from] anyhow::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::MissingCredentials => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
            ProxyError::MissingPath | ProxyError::UnsupportedPath => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            ProxyError::Upstream(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal Server Error" })),
            )
                .into_response(),
        }
    }
}

/// Validates the `path` parameter and builds the upstream call. Performs no I/O.
///
/// Credentials are checked before the path, so an unconfigured proxy answers 500
/// for every request.
pub fn build_upstream_request(
    params: &[(String, String)],
    credential: Option<&Credential>,
) -> Result<UpstreamRequest, ProxyError> {
    let credential = credential.ok_or(ProxyError::MissingCredentials)?;

    let path = params
        .iter()
        .find(|(k, _)| k == "path")
        .map(|(_, v)| v.trim_start_matches('/'))
        .unwrap_or_default();
    if path.is_empty() {
        return Err(ProxyError::MissingPath);
    }

    let first_segment = path.split('/').next().unwrap_or_default();
    if !ALLOWED_RESOURCES.contains(first_segment) {
        return Err(ProxyError::UnsupportedPath);
    }
    // The parser reads `\` as `/` and folds encoded dots, so only literal
    // segments and the normalised result are trusted.
    if path.contains('\\') || path.split('/').any(|seg| seg == "." || seg == "..") {
        return Err(ProxyError::UnsupportedPath);
    }

    let mut url = Url::parse(&format!("{TMDB_BASE}/{path}"))
        .map_err(|_| ProxyError::UnsupportedPath)?;
    if !within_allowed_prefix(&url) {
        return Err(ProxyError::UnsupportedPath);
    }
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            if key == "path" {
                continue;
            }
            if key == "api_key" && matches!(credential, Credential::ApiKey(_)) {
                continue;
            }
            query.append_pair(key, value);
        }
        if let Credential::ApiKey(key) = credential {
            query.append_pair("api_key", key);
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }

    let bearer = match credential {
        Credential::Bearer(token) => Some(token.clone()),
        Credential::ApiKey(_) => None,
    };

    Ok(UpstreamRequest { url, bearer })
}

/// True when the parsed URL still points at `/3/<allowed resource>/...` on the TMDb host.
fn within_allowed_prefix(url: &Url) -> bool {
    if url.host_str() != Some("api.themoviedb.org") {
        return false;
    }
    let Some(mut segments) = url.path_segments() else {
        return false;
    };
    segments.next() == Some("3")
        && segments
            .next()
            .is_some_and(|resource| ALLOWED_RESOURCES.contains(resource))
}

/// One GET against the upstream. Status and body are relayed untouched.
pub async fn forward(
    upstream: &dyn Upstream,
    params: &[(String, String)],
    credential: Option<&Credential>,
) -> Result<UpstreamResponse, ProxyError> {
    let request = build_upstream_request(params, credential)?;
    debug!("Forwarding to {}", request.url.path());
    upstream.get(&request).await.map_err(|e| {
        error!("Upstream request failed: {:#}", e);
        ProxyError::Upstream(e)
    })
}

#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
}

impl HttpUpstream {
    pub fn new() -> Result<Self> {
        let user_agent = format!("reelscout/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get(&self, request: &UpstreamRequest) -> Result<UpstreamResponse> {
        let mut builder = self
            .client
            .get(request.url.clone())
            .header(header::ACCEPT, "application/json");
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        let res = builder.send().await.context("request failed")?;
        let status = res.status().as_u16();
        let content_type = res
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = res.bytes().await.context("reading body failed")?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn bearer() -> Credential {
        Credential::Bearer("v4-token".to_string())
    }

    #[test]
    fn prefers_bearer_over_api_key() {
        let cred = Credential::resolve(Some("tok".into()), Some("key".into()));
        assert_eq!(cred, Some(Credential::Bearer("tok".into())));
        let cred = Credential::resolve(Some(String::new()), Some("key".into()));
        assert_eq!(cred, Some(Credential::ApiKey("key".into())));
        assert_eq!(Credential::resolve(None, Some(String::new())), None);
    }

    #[test]
    fn missing_credentials_win_over_bad_path() {
        let err = build_upstream_request(&params(&[("path", "tv/1")]), None).unwrap_err();
        assert!(matches!(err, ProxyError::MissingCredentials));
    }

    #[test]
    fn rejects_missing_and_disallowed_paths() {
        let cred = bearer();
        for bad in [
            vec![],
            params(&[("path", "")]),
            params(&[("path", "///")]),
            params(&[("query", "batman")]),
        ] {
            let err = build_upstream_request(&bad, Some(&cred)).unwrap_err();
            assert!(matches!(err, ProxyError::MissingPath), "{bad:?}");
        }
        for bad in [
            "tv/1399",
            "account",
            "searchx/movie",
            "../movie",
            "3/movie/1",
            "movie/../account",
            "movie/x\\..\\..\\account",
            "movie/%2e%2e/account",
            "movie/.%2E/configuration",
            "search/%2e%2e/%2e%2e/4/list/1",
        ] {
            let err = build_upstream_request(&params(&[("path", bad)]), Some(&cred)).unwrap_err();
            assert!(matches!(err, ProxyError::UnsupportedPath), "{bad}");
        }
    }

    #[test]
    fn forwards_every_param_except_path() {
        let req = build_upstream_request(
            &params(&[
                ("path", "/search/movie"),
                ("query", "the batman"),
                ("page", "2"),
                ("include_adult", "false"),
            ]),
            Some(&bearer()),
        )
        .unwrap();

        assert_eq!(req.url.path(), "/3/search/movie");
        let pairs: Vec<(String, String)> = req.url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            params(&[("query", "the batman"), ("page", "2"), ("include_adult", "false")])
        );
        assert_eq!(req.bearer.as_deref(), Some("v4-token"));
    }

    #[test]
    fn api_key_is_appended_and_no_bearer_sent() {
        let cred = Credential::ApiKey("v3-key".to_string());
        let req = build_upstream_request(
            &params(&[("path", "movie/268"), ("api_key", "spoofed")]),
            Some(&cred),
        )
        .unwrap();
        let pairs: Vec<(String, String)> = req.url.query_pairs().into_owned().collect();
        assert_eq!(pairs, params(&[("api_key", "v3-key")]));
        assert!(req.bearer.is_none());
    }

    #[test]
    fn detail_path_without_params_has_no_query() {
        let req = build_upstream_request(&params(&[("path", "movie/268")]), Some(&bearer())).unwrap();
        assert_eq!(req.url.as_str(), "https://api.themoviedb.org/3/movie/268");
    }

    #[test]
    fn encoded_dots_that_stay_inside_the_prefix_are_allowed() {
        let req = build_upstream_request(
            &params(&[("path", "movie/%2e%2e/movie/268")]),
            Some(&bearer()),
        )
        .unwrap();
        assert_eq!(req.url.path(), "/3/movie/268");
    }

    #[test]
    fn credential_debug_hides_secret() {
        assert_eq!(format!("{:?}", bearer()), "Bearer(***)");
    }
}
