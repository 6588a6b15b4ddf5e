//! # HyperThought document source
//!
//! Concrete [`DocumentSource`] over the HyperThought files REST API. The CLI
//! builds one [`HyperThoughtClient`] per run from the `hyperthought` config
//! section and the `HYPERTHOUGHT_TOKEN` environment variable.
//!
//! Folder paths follow HyperThought's convention: a comma-separated chain of
//! folder pks, with leading and trailing commas (`,pk1,pk2,`).

use std::env;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use innovator_sync_core::contract::DocumentSource;
use innovator_sync_core::error::SourceError;
use innovator_sync_core::metadata::{MetadataItem, StoredFile};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Deserialize;
use tracing::{debug, error, info};

pub const TOKEN_ENV: &str = "HYPERTHOUGHT_TOKEN";

#[derive(Debug, Clone)]
pub struct HyperThoughtClient {
    http: Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct DownloadUrl {
    url: String,
}

/// Listing responses are either a bare array or a paged
/// `{ "results": [...], "next": url }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing {
    Plain(Vec<StoredFile>),
    Paged {
        results: Vec<StoredFile>,
        #[serde(default)]
        next: Option<String>,
    },
}

impl Listing {
    /// Files on this page and the url of the next one, if any.
    fn into_page(self) -> (Vec<StoredFile>, Option<String>) {
        match self {
            Listing::Plain(files) => (files, None),
            Listing::Paged { results, next } => (results, next.filter(|n| !n.is_empty())),
        }
    }
}

/// Path of a folder's contents, given the path the folder itself lives at.
pub fn child_path(parent: Option<&str>, folder_pk: &str) -> String {
    let parent = parent.unwrap_or(",");
    let parent = if parent.ends_with(',') {
        parent.to_string()
    } else {
        format!("{parent},")
    };
    format!("{parent}{folder_pk},")
}

impl HyperThoughtClient {
    pub fn new(http: Client, base_url: &str, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Reads the access token from `HYPERTHOUGHT_TOKEN`.
    pub fn from_env(http: Client, base_url: &str) -> Result<Self, SourceError> {
        match env::var(TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => {
                info!(base_url, "Initialised HyperThought client from environment");
                Ok(Self::new(http, base_url, token.trim()))
            }
            _ => {
                error!(variable = TOKEN_ENV, "HyperThought token missing in environment");
                Err(SourceError::Other(format!("{TOKEN_ENV} is not set")))
            }
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, SourceError> {
        Url::parse(&format!("{}/api/files/{}", self.base_url, path))
            .map_err(|e| SourceError::Other(format!("invalid HyperThought url: {e}")))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.token)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, SourceError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        error!(status = %status, url = %url, "HyperThought request failed");
        Err(SourceError::Status {
            url,
            status: status.as_u16(),
            body,
        })
    }

    async fn list_folder(
        &self,
        space_id: &str,
        path: Option<&str>,
    ) -> Result<Vec<StoredFile>, SourceError> {
        let mut url = self.url("")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("space", "project");
            query.append_pair("space_id", space_id);
            if let Some(path) = path {
                query.append_pair("path", path);
            }
        }
        let mut files = Vec::new();
        let mut page = Some(url);
        while let Some(url) = page.take() {
            debug!(url = %url, "Listing HyperThought folder");
            let body = self.send(self.request(Method::GET, url)).await?.text().await?;
            let listing: Listing = serde_json::from_str(&body)?;
            let (mut results, next) = listing.into_page();
            files.append(&mut results);
            if let Some(next) = next {
                page = Some(Url::parse(&next).map_err(|e| {
                    SourceError::Other(format!("invalid next page url '{next}': {e}"))
                })?);
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl DocumentSource for HyperThoughtClient {
    async fn list_location(
        &self,
        space_id: &str,
        path: Option<String>,
    ) -> Result<Vec<StoredFile>, SourceError> {
        let mut files = Vec::new();
        let mut pending = vec![path];
        while let Some(path) = pending.pop() {
            for entry in self.list_folder(space_id, path.as_deref()).await? {
                if entry.is_folder() {
                    pending.push(Some(child_path(path.as_deref(), &entry.pk)));
                }
                files.push(entry);
            }
        }
        info!(space_id, files = files.len(), "Listed HyperThought location");
        Ok(files)
    }

    async fn get_document(&self, pk: &str) -> Result<StoredFile, SourceError> {
        let url = self.url(&format!("{pk}/"))?;
        let body = self.send(self.request(Method::GET, url)).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn download(&self, pk: &str, directory: &Path) -> Result<PathBuf, SourceError> {
        let file = self.get_document(pk).await?;
        let mut url = self.url("generate-download-url/")?;
        url.query_pairs_mut().append_pair("id", pk);
        let link: DownloadUrl = self
            .send(self.request(Method::GET, url))
            .await?
            .json()
            .await?;

        let bytes = self.send(self.http.get(&link.url)).await?.bytes().await?;
        let target = directory.join(&file.name);
        tokio::fs::write(&target, &bytes).await?;
        info!(pk, file = %target.display(), size = bytes.len(), "Downloaded HyperThought file");
        Ok(target)
    }

    async fn update_metadata(
        &self,
        pk: &str,
        metadata: Vec<MetadataItem>,
    ) -> Result<(), SourceError> {
        let url = self.url(&format!("{pk}/metadata/"))?;
        let count = metadata.len();
        self.send(self.request(Method::PATCH, url).json(&metadata))
            .await?;
        info!(pk, items = count, "Updated HyperThought metadata");
        Ok(())
    }
}
