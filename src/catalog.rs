//! Client side of the proxy: the three lookups the view controller needs.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::models::{MovieDetail, MoviePage};

#[async_trait]
pub trait MovieSource: Send + Sync {
    async fn discover_popular(&self) -> Result<MoviePage>;
    async fn search(&self, query: &str) -> Result<MoviePage>;
    async fn movie_detail(&self, id: i64) -> Result<MovieDetail>;
}

#[derive(Debug, Clone)]
pub struct ProxyMovieSource {
    client: Client,
    endpoint: String,
}

impl ProxyMovieSource {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build proxy HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('?').to_string(),
        })
    }

    pub fn discover_url(&self) -> String {
        format!(
            "{}?path=discover/movie&sort_by=popularity.desc",
            self.endpoint
        )
    }

    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}?path=search/movie&query={}",
            self.endpoint,
            urlencoding::encode(query)
        )
    }

    pub fn detail_url(&self, id: i64) -> String {
        format!("{}?path=movie/{id}", self.endpoint)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let res = self
            .client
            .get(url)
            .send()
            .await
            .context("request failed")?;
        let status = res.status();
        if !status.is_success() {
            return Err(anyhow!("{} -> {}", url, status));
        }
        let text = res.text().await.context("reading body failed")?;
        serde_json::from_str(&text).context("JSON parse failed")
    }
}

#[async_trait]
impl MovieSource for ProxyMovieSource {
    async fn discover_popular(&self) -> Result<MoviePage> {
        self.get_json(&self.discover_url()).await
    }

    async fn search(&self, query: &str) -> Result<MoviePage> {
        self.get_json(&self.search_url(query)).await
    }

    async fn movie_detail(&self, id: i64) -> Result<MovieDetail> {
        self.get_json(&self.detail_url(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_proxy_urls() {
        let source = ProxyMovieSource::new("http://127.0.0.1:3146/tmdb").unwrap();
        assert_eq!(
            source.discover_url(),
            "http://127.0.0.1:3146/tmdb?path=discover/movie&sort_by=popularity.desc"
        );
        assert_eq!(
            source.search_url("the dark knight & co"),
            "http://127.0.0.1:3146/tmdb?path=search/movie&query=the%20dark%20knight%20%26%20co"
        );
        assert_eq!(
            source.detail_url(155),
            "http://127.0.0.1:3146/tmdb?path=movie/155"
        );
    }
}
