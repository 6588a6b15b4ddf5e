//! # files: the `File` item type and vault uploads
//!
//! Physical content goes through the Innovator vault in one transaction:
//! 1. `vault.BeginTransaction` opens a transaction id
//! 2. `vault.UploadFile` streams the bytes as a single chunk
//! 3. `vault.CommitTransaction` creates the `File` item from a one-part
//!    `multipart/mixed` batch
//!
//! Nothing is visible in Innovator until the commit succeeds.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::contract::FileStore;
use crate::error::PlmError;
use crate::odata::{
    collection_url, filter_url, item_url, require_key, vault_url, Item, ODataClient,
    ODataCollection,
};

const FILE: &str = "File";

/// Id of the vault every Innovator install ships with.
pub const DEFAULT_VAULT_ID: &str = "67BBB9204FE84A8981ED8313049BA06C";

/// Fresh Innovator item id: 32 uppercase hex characters.
pub fn new_item_id() -> String {
    Uuid::new_v4().simple().to_string().to_uppercase()
}

/// `Content-Range` for a single chunk holding the whole file.
pub fn content_range(size: usize) -> String {
    if size == 0 {
        "bytes */0".to_string()
    } else {
        format!("bytes 0-{}/{}", size - 1, size)
    }
}

/// RFC 5987 encoding for `filename*=utf-8''...`.
pub fn encode_filename(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}

/// `File` item created at commit time.
pub fn file_item_payload(
    file_id: &str,
    filename: &str,
    size: usize,
    vault_id: &str,
    file_number: Option<&str>,
) -> Value {
    let mut item = json!({
        "id": file_id,
        "filename": filename,
        "file_size": size,
        "Located": [{ "file_version": 1, "related_id": vault_id }],
    });
    if let (Some(number), Some(object)) = (file_number, item.as_object_mut()) {
        object.insert("file_number".to_string(), Value::String(number.to_string()));
    }
    item
}

/// One-request OData batch for `vault.CommitTransaction`.
pub fn commit_batch(boundary: &str, base_url: &str, file_item: &Value) -> String {
    format!(
        "--{boundary}\r\n\
Content-Type: application/http\r\n\
\r\n\
POST {base_url}/vault/odata/File HTTP/1.1\r\n\
Content-Type: application/json\r\n\
\r\n\
{file_item}\r\n\
--{boundary}--\r\n"
    )
}

/// Pulls the JSON object out of a multipart commit response.
fn item_from_batch_response(body: &str) -> Option<Item> {
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&body[start..=end]).ok()
}

#[derive(Deserialize)]
struct BeginTransaction {
    #[serde(rename = "transactionId")]
    transaction_id: String,
}

#[derive(Debug, Clone)]
pub struct FilesApi {
    odata: ODataClient,
    vault_id: String,
}

impl FilesApi {
    pub fn new(odata: ODataClient) -> Self {
        Self {
            odata,
            vault_id: DEFAULT_VAULT_ID.to_string(),
        }
    }

    pub fn with_vault(mut self, vault_id: impl Into<String>) -> Self {
        self.vault_id = vault_id.into();
        self
    }

    pub async fn get_file_list(&self) -> Result<Vec<Item>, PlmError> {
        let url = collection_url(self.odata.base_url(), FILE)?;
        let list: ODataCollection<Item> = self.odata.get(url).await?;
        info!(count = list.value.len(), "Fetched file list");
        Ok(list.value)
    }

    pub async fn search_file_name(&self, filename: &str) -> Result<Vec<Item>, PlmError> {
        require_key(filename, "filename")?;
        let url = filter_url(self.odata.base_url(), FILE, "filename", filename)?;
        let list: ODataCollection<Item> = self.odata.get(url).await?;
        Ok(list.value)
    }

    pub async fn search_file_id(&self, file_id: &str) -> Result<Item, PlmError> {
        require_key(file_id, "file_id")?;
        let url = item_url(self.odata.base_url(), FILE, file_id)?;
        self.odata.get(url).await
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<(), PlmError> {
        require_key(file_id, "file_id")?;
        let url = item_url(self.odata.base_url(), FILE, file_id)?;
        self.odata.delete(url).await?;
        info!(file_id, "Deleted file");
        Ok(())
    }

    pub async fn upload_file(
        &self,
        path: &Path,
        file_number: Option<&str>,
    ) -> Result<Item, PlmError> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                PlmError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("'{}' has no usable file name", path.display()),
                ))
            })?
            .to_string();
        let content = tokio::fs::read(path).await?;
        let size = content.len();
        let file_id = new_item_id();
        info!(file = %path.display(), filename = %filename, size, file_id = %file_id, "Uploading file to vault");

        let base = self.odata.base_url().to_string();

        let begin_url = vault_url(&base, "vault.BeginTransaction")?;
        let body = self
            .odata
            .send(
                "POST",
                &begin_url,
                self.odata.request(Method::POST, begin_url.clone()),
            )
            .await?;
        let transaction: BeginTransaction = serde_json::from_str(&body)?;
        debug!(transaction_id = %transaction.transaction_id, "Vault transaction opened");

        let mut upload_url = vault_url(&base, "vault.UploadFile")?;
        upload_url.query_pairs_mut().append_pair("fileId", &file_id);
        let upload = self
            .odata
            .request(Method::POST, upload_url.clone())
            .header("transactionid", &transaction.transaction_id)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .header(reqwest::header::CONTENT_RANGE, content_range(size))
            .header(
                reqwest::header::CONTENT_DISPOSITION,
                format!("attachment; filename*=utf-8''{}", encode_filename(&filename)),
            )
            .body(content);
        self.odata.send("POST", &upload_url, upload).await?;
        debug!(file_id = %file_id, "Vault chunk uploaded");

        let boundary = format!("batch_{file_id}");
        let file_item = file_item_payload(&file_id, &filename, size, &self.vault_id, file_number);
        let commit_url = vault_url(&base, "vault.CommitTransaction")?;
        let commit = self
            .odata
            .request(Method::POST, commit_url.clone())
            .header("transactionid", &transaction.transaction_id)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/mixed; boundary={boundary}"),
            )
            .body(commit_batch(&boundary, &base, &file_item));
        let response = self.odata.send("POST", &commit_url, commit).await?;

        let item = item_from_batch_response(&response).unwrap_or_else(|| {
            warn!(file_id = %file_id, "Commit response carried no item, using submitted values");
            let mut properties = Map::new();
            properties.insert("filename".to_string(), Value::String(filename.clone()));
            Item {
                id: file_id.clone(),
                properties,
            }
        });
        info!(file_id = %item.id, filename = %filename, "File committed");
        Ok(item)
    }
}

#[async_trait]
impl FileStore for FilesApi {
    async fn upload_file(
        &self,
        path: &Path,
        file_number: Option<String>,
    ) -> Result<Item, PlmError> {
        FilesApi::upload_file(self, path, file_number.as_deref()).await
    }

    async fn get_file_list(&self) -> Result<Vec<Item>, PlmError> {
        FilesApi::get_file_list(self).await
    }
}
