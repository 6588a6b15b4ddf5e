//! The `Document` item type.

use serde_json::{json, Value};
use tracing::info;

use crate::error::PlmError;
use crate::odata::{
    collection_url, filter_url, item_url, require_key, Item, ODataClient, ODataCollection,
};

const DOCUMENT: &str = "Document";

/// Body for `create_document`.
pub fn document_payload(name: &str, item_number: &str) -> Value {
    json!({ "name": name, "item_number": item_number })
}

#[derive(Debug, Clone)]
pub struct DocumentApi {
    odata: ODataClient,
}

impl DocumentApi {
    pub fn new(odata: ODataClient) -> Self {
        Self { odata }
    }

    pub async fn get_document_list(&self) -> Result<Vec<Item>, PlmError> {
        let url = collection_url(self.odata.base_url(), DOCUMENT)?;
        let list: ODataCollection<Item> = self.odata.get(url).await?;
        info!(count = list.value.len(), "Fetched document list");
        Ok(list.value)
    }

    pub async fn search_document_name(&self, name: &str) -> Result<Vec<Item>, PlmError> {
        require_key(name, "document name")?;
        let url = filter_url(self.odata.base_url(), DOCUMENT, "name", name)?;
        let list: ODataCollection<Item> = self.odata.get(url).await?;
        Ok(list.value)
    }

    pub async fn search_document_id(&self, document_id: &str) -> Result<Item, PlmError> {
        require_key(document_id, "document_id")?;
        let url = item_url(self.odata.base_url(), DOCUMENT, document_id)?;
        self.odata.get(url).await
    }

    pub async fn create_document(&self, name: &str, item_number: &str) -> Result<Item, PlmError> {
        require_key(name, "document name")?;
        require_key(item_number, "document item_number")?;
        let url = collection_url(self.odata.base_url(), DOCUMENT)?;
        let created: Item = self
            .odata
            .post(url, &document_payload(name, item_number))
            .await?;
        info!(document_id = %created.id, name, "Created document");
        Ok(created)
    }

    pub async fn delete_document(&self, document_id: &str) -> Result<(), PlmError> {
        require_key(document_id, "document_id")?;
        let url = item_url(self.odata.base_url(), DOCUMENT, document_id)?;
        self.odata.delete(url).await?;
        info!(document_id, "Deleted document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_body_carries_name_and_number() {
        assert_eq!(
            document_payload("Test Plan", "DOC-0042"),
            json!({"name": "Test Plan", "item_number": "DOC-0042"})
        );
    }
}
