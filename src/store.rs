//! Search store access.
//!
//! [`SearchStore`] is the seam between the pipeline and the index: the pacer
//! only talks to the trait, [`ElasticStore`] speaks the Elasticsearch REST API
//! over reqwest, and tests substitute an in-memory recorder.

use crate::config::{Credentials, StoreConfig};
use crate::models::Document;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;
use std::fs;
use tracing::{debug, info};

#[async_trait]
pub trait SearchStore: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool>;

    async fn create_index(&self, index: &str, schema: &Value) -> Result<()>;

    async fn write_document(&self, index: &str, doc: &Document) -> Result<()>;
}

pub struct ElasticStore {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl ElasticStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = config.base_url();
        info!(url = %base_url, index = %config.index, "Search store configured");
        if let Some(creds) = &config.credentials {
            info!(user = %creds.user, "Using basic authentication");
        }

        Ok(Self {
            client,
            base_url,
            credentials: config.credentials.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(creds) => request.basic_auth(&creds.user, Some(&creds.password)),
            None => request,
        }
    }

    fn index_url(&self, index: &str) -> String {
        format!("{}/{}", self.base_url, index)
    }

    /// `/{index}/_doc/{id}` with the id percent-encoded, or `None` without an id.
    fn document_url(&self, index: &str, wiki_id: &str) -> Result<Option<Url>> {
        let id = wiki_id.trim();
        if id.is_empty() {
            return Ok(None);
        }
        let mut url = Url::parse(&self.index_url(index))
            .with_context(|| format!("Invalid search store URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Search store URL cannot take a path: {}", self.base_url))?
            .push("_doc")
            .push(id);
        Ok(Some(url))
    }
}

/// Turns a non-2xx response into an error carrying the status and body.
async fn ensure_success(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("{action} failed with {status}: {body}");
}

#[async_trait]
impl SearchStore for ElasticStore {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self
            .authorized(self.client.head(self.index_url(index)))
            .send()
            .await
            .with_context(|| format!("Failed to reach search store at {}", self.base_url))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => bail!("Checking index {index} failed with {status}"),
        }
    }

    async fn create_index(&self, index: &str, schema: &Value) -> Result<()> {
        let response = self
            .authorized(self.client.put(self.index_url(index)))
            .json(schema)
            .send()
            .await
            .with_context(|| format!("Failed to send create request for index {index}"))?;
        ensure_success(response, &format!("Creating index {index}")).await?;
        Ok(())
    }

    /// Pages with an id are written to `_doc/{wiki_id}`, so sending the same
    /// page twice (after a resume) replaces the earlier copy.
    async fn write_document(&self, index: &str, doc: &Document) -> Result<()> {
        let request = match self.document_url(index, &doc.wiki_id)? {
            Some(url) => self.client.put(url),
            None => self.client.post(format!("{}/_doc", self.index_url(index))),
        };
        let response = self
            .authorized(request)
            .json(doc)
            .send()
            .await
            .with_context(|| format!("Failed to send document {}", doc.title))?;
        ensure_success(response, &format!("Indexing {}", doc.title)).await?;
        debug!(title = %doc.title, "Document indexed");
        Ok(())
    }
}

/// Reads the index mapping/settings JSON handed to `create_index`.
pub fn load_mapping(path: &str) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read mapping file: {}", path))?;
    let mapping: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Mapping file is not valid JSON: {}", path))?;
    if !mapping.is_object() {
        bail!("Mapping file must contain a JSON object: {}", path);
    }
    Ok(mapping)
}
