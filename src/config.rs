use anyhow::{anyhow, Context, Result};
use std::env;
use tracing::{info, warn};

use crate::tmdb::Credential;

const DEFAULT_PORT: u16 = 3146;
const DEFAULT_APPWRITE_ENDPOINT: &str = "https://nyc.cloud.appwrite.io/v1";
const DEFAULT_PROXY_ENDPOINT: &str = "http://127.0.0.1:3146/tmdb";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub credential: Option<Credential>,
    pub proxy_endpoint: String,
}

#[derive(Debug, Clone)]
pub struct AppwriteConfig {
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub collection_id: String,
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = match var("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid PORT value: {raw}"))?,
            None => DEFAULT_PORT,
        };

        let credential = Credential::resolve(var("TMDB_API_TOKEN"), var("TMDB_API_KEY_V3"));
        match &credential {
            Some(Credential::Bearer(_)) => info!("TMDB requests will use the bearer token"),
            Some(Credential::ApiKey(_)) => info!("TMDB requests will use the v3 api_key"),
            None => warn!("No TMDB credentials set; proxy requests will fail with 500"),
        }

        Ok(Self {
            port,
            credential,
            proxy_endpoint: var("PROXY_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_PROXY_ENDPOINT.to_string()),
        })
    }
}

impl AppwriteConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            endpoint: var("APPWRITE_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_APPWRITE_ENDPOINT.to_string()),
            project_id: required("APPWRITE_PROJECT_ID")?,
            database_id: required("APPWRITE_DATABASE_ID")?,
            collection_id: required("APPWRITE_COLLECTION_ID")?,
            api_key: var("APPWRITE_API_KEY"),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String> {
    var(key).ok_or_else(|| anyhow!("Missing required environment variable: {}", key))
}
