//! Search-term analytics backed by an Appwrite collection.
//!
//! Each term maps to one document whose id is derived from the term itself, so
//! recording a search is an increment-or-insert rather than a read-then-write.
//! Documents created earlier under random ids are found by their `searchTerm`
//! and incremented in place.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::AppwriteConfig;
use crate::models::{MovieSummary, NewSearchRecord, SearchRecord};
use crate::utils::poster_url;

pub const TRENDING_LIMIT: usize = 5;
const COUNT_ATTRIBUTE: &str = "count";
const TERM_ATTRIBUTE: &str = "searchTerm";
const MAX_DOCUMENT_ID_LEN: usize = 36;

#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(SearchRecord),
    /// A document with that id already exists.
    Conflict,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Adds one to the counter. `None` when the document does not exist.
    async fn increment_count(&self, document_id: &str) -> Result<Option<SearchRecord>>;
    async fn create_record(
        &self,
        document_id: &str,
        record: &NewSearchRecord,
    ) -> Result<CreateOutcome>;
    /// Any document holding exactly this term, whatever its id.
    async fn find_by_term(&self, term: &str) -> Result<Option<SearchRecord>>;
    async fn top_by_count(&self, limit: usize) -> Result<Vec<SearchRecord>>;
}

pub fn document_id(term: &str) -> String {
    let digest = Sha256::digest(term.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(MAX_DOCUMENT_ID_LEN);
    id
}

#[derive(Clone)]
pub struct AnalyticsSink {
    store: Arc<dyn DocumentStore>,
}

impl AnalyticsSink {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Best effort: failures are logged and never reach the caller.
    pub async fn record_search(&self, term: &str, movie: &MovieSummary) {
        match self.try_record_search(term, movie).await {
            Ok(record) => debug!("Search '{}' now counted {} times", term, record.count),
            Err(e) => warn!("Error updating search count for '{}': {:#}", term, e),
        }
    }

    async fn try_record_search(&self, term: &str, movie: &MovieSummary) -> Result<SearchRecord> {
        let id = document_id(term);
        if let Some(record) = self.store.increment_count(&id).await? {
            return Ok(record);
        }
        if let Some(existing) = self.store.find_by_term(term).await? {
            if let Some(record) = self.store.increment_count(&existing.id).await? {
                debug!("Counted '{}' on existing document {}", term, existing.id);
                return Ok(record);
            }
        }

        let new_record = NewSearchRecord {
            search_term: term.to_string(),
            count: 1,
            movie_id: movie.id,
            poster_url: poster_url(movie.poster_path.as_deref()),
        };
        match self.store.create_record(&id, &new_record).await? {
            CreateOutcome::Created(record) => {
                info!("First search recorded for '{}'", term);
                Ok(record)
            }
            // Lost the race to create; the other writer's document takes our increment.
            CreateOutcome::Conflict => self
                .store
                .increment_count(&id)
                .await?
                .ok_or_else(|| anyhow!("record for '{}' missing after create conflict", term)),
        }
    }

    /// Most searched terms, highest count first. Read fresh on every call; any
    /// failure yields an empty list.
    pub async fn top_searches(&self, limit: usize) -> Vec<SearchRecord> {
        match self.store.top_by_count(limit).await {
            Ok(mut records) => {
                records.sort_by(|a, b| b.count.cmp(&a.count));
                records.truncate(limit);
                records
            }
            Err(e) => {
                warn!("Error fetching top searches: {:#}", e);
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppwriteStore {
    client: Client,
    config: AppwriteConfig,
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    documents: Vec<SearchRecord>,
}

impl AppwriteStore {
    pub fn new(config: AppwriteConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build Appwrite HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(AppwriteConfig::from_env()?)
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.config.endpoint.trim_end_matches('/'),
            self.config.database_id,
            self.config.collection_id
        )
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Appwrite-Project",
            HeaderValue::from_str(&self.config.project_id).context("invalid project id")?,
        );
        if let Some(key) = &self.config.api_key {
            headers.insert(
                "X-Appwrite-Key",
                HeaderValue::from_str(key).context("invalid Appwrite api key")?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn list_documents(&self, queries: Vec<String>) -> Result<Vec<SearchRecord>> {
        let query: Vec<(&str, String)> = queries.into_iter().map(|q| ("queries[]", q)).collect();
        let res = self
            .client
            .get(self.documents_url())
            .headers(self.headers()?)
            .query(&query)
            .send()
            .await
            .context("list request failed")?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow!("list documents -> {} {}", status, text));
        }
        let list: DocumentList = res.json().await.context("list JSON parse failed")?;
        Ok(list.documents)
    }
}

/// Appwrite list queries are JSON objects passed as repeated `queries[]` params.
pub fn top_by_count_queries(limit: usize) -> Vec<String> {
    vec![
        json!({ "method": "orderDesc", "attribute": COUNT_ATTRIBUTE }).to_string(),
        json!({ "method": "limit", "values": [limit] }).to_string(),
    ]
}

pub fn find_by_term_queries(term: &str) -> Vec<String> {
    vec![
        json!({ "method": "equal", "attribute": TERM_ATTRIBUTE, "values": [term] }).to_string(),
        json!({ "method": "limit", "values": [1] }).to_string(),
    ]
}

#[async_trait]
impl DocumentStore for AppwriteStore {
    async fn increment_count(&self, document_id: &str) -> Result<Option<SearchRecord>> {
        let url = format!(
            "{}/{}/{}/increment",
            self.documents_url(),
            document_id,
            COUNT_ATTRIBUTE
        );
        let res = self
            .client
            .patch(&url)
            .headers(self.headers()?)
            .json(&json!({ "value": 1 }))
            .send()
            .await
            .context("increment request failed")?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow!("increment {} -> {} {}", document_id, status, text));
        }
        let record = res.json().await.context("increment JSON parse failed")?;
        Ok(Some(record))
    }

    async fn create_record(
        &self,
        document_id: &str,
        record: &NewSearchRecord,
    ) -> Result<CreateOutcome> {
        let res = self
            .client
            .post(self.documents_url())
            .headers(self.headers()?)
            .json(&json!({ "documentId": document_id, "data": record }))
            .send()
            .await
            .context("create request failed")?;

        let status = res.status();
        if status == StatusCode::CONFLICT {
            return Ok(CreateOutcome::Conflict);
        }
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow!("create {} -> {} {}", document_id, status, text));
        }
        let created = res.json().await.context("create JSON parse failed")?;
        Ok(CreateOutcome::Created(created))
    }

    async fn find_by_term(&self, term: &str) -> Result<Option<SearchRecord>> {
        let documents = self.list_documents(find_by_term_queries(term)).await?;
        Ok(documents.into_iter().next())
    }

    async fn top_by_count(&self, limit: usize) -> Result<Vec<SearchRecord>> {
        self.list_documents(top_by_count_queries(limit)).await
    }
}

/// In-process store with the same increment-or-insert semantics.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, SearchRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn increment_count(&self, document_id: &str) -> Result<Option<SearchRecord>> {
        let mut guard = self.records.lock().await;
        Ok(guard.get_mut(document_id).map(|record| {
            record.count += 1;
            record.clone()
        }))
    }

    async fn create_record(
        &self,
        document_id: &str,
        record: &NewSearchRecord,
    ) -> Result<CreateOutcome> {
        let mut guard = self.records.lock().await;
        if guard.contains_key(document_id) {
            return Ok(CreateOutcome::Conflict);
        }
        let created = record.clone().into_record(document_id.to_string());
        guard.insert(document_id.to_string(), created.clone());
        Ok(CreateOutcome::Created(created))
    }

    async fn find_by_term(&self, term: &str) -> Result<Option<SearchRecord>> {
        let guard = self.records.lock().await;
        Ok(guard.values().find(|r| r.search_term == term).cloned())
    }

    async fn top_by_count(&self, limit: usize) -> Result<Vec<SearchRecord>> {
        let guard = self.records.lock().await;
        let mut records: Vec<SearchRecord> = guard.values().cloned().collect();
        records.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.search_term.cmp(&b.search_term))
        });
        records.truncate(limit);
        Ok(records)
    }
}
