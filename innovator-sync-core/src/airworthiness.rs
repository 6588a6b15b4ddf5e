//! Custom airworthiness item types: parameters and per-OEM parameter assessments.

use serde_json::{Map, Value};
use tracing::info;

use crate::error::PlmError;
use crate::odata::{collection_url, item_url, require_key, Item, ODataClient, ODataCollection};
use crate::validate::{validate_payload, AW_ASSESSMENT, AW_PARAMETER};

const PARAMETER: &str = "Airworthiness Parameter";
const ASSESSMENT: &str = "Airworthiness Para Assessment";

#[derive(Debug, Clone)]
pub struct AirworthinessApi {
    odata: ODataClient,
}

impl AirworthinessApi {
    pub fn new(odata: ODataClient) -> Self {
        Self { odata }
    }

    async fn list(&self, entity_set: &str) -> Result<Vec<Item>, PlmError> {
        let url = collection_url(self.odata.base_url(), entity_set)?;
        let list: ODataCollection<Item> = self.odata.get(url).await?;
        info!(entity_set, count = list.value.len(), "Fetched list");
        Ok(list.value)
    }

    async fn by_id(&self, entity_set: &str, id: &str) -> Result<Item, PlmError> {
        require_key(id, "parameter_id")?;
        let url = item_url(self.odata.base_url(), entity_set, id)?;
        self.odata.get(url).await
    }

    async fn delete(&self, entity_set: &str, id: &str) -> Result<(), PlmError> {
        require_key(id, "parameter_id")?;
        let url = item_url(self.odata.base_url(), entity_set, id)?;
        self.odata.delete(url).await?;
        info!(entity_set, id, "Deleted");
        Ok(())
    }

    pub async fn get_aw_parameter_list(&self) -> Result<Vec<Item>, PlmError> {
        self.list(PARAMETER).await
    }

    pub async fn search_aw_parameter_id(&self, parameter_id: &str) -> Result<Item, PlmError> {
        self.by_id(PARAMETER, parameter_id).await
    }

    /// New parameter entry; should include `parameter_number`.
    pub async fn create_aw_parameter(&self, metadata: &Map<String, Value>) -> Result<Item, PlmError> {
        validate_payload(&AW_PARAMETER, metadata)?;
        let url = collection_url(self.odata.base_url(), PARAMETER)?;
        let created: Item = self.odata.post(url, &Value::Object(metadata.clone())).await?;
        info!(parameter_id = %created.id, "Created airworthiness parameter");
        Ok(created)
    }

    pub async fn edit_aw_parameter(
        &self,
        parameter_id: &str,
        metadata: &Map<String, Value>,
    ) -> Result<Value, PlmError> {
        require_key(parameter_id, "parameter_id")?;
        validate_payload(&AW_PARAMETER, metadata)?;
        let url = item_url(self.odata.base_url(), PARAMETER, parameter_id)?;
        let edited = self.odata.patch(url, &Value::Object(metadata.clone())).await?;
        info!(parameter_id, "Edited airworthiness parameter");
        Ok(edited)
    }

    pub async fn delete_aw_parameter(&self, parameter_id: &str) -> Result<(), PlmError> {
        self.delete(PARAMETER, parameter_id).await
    }

    pub async fn get_aw_para_assessment_list(&self) -> Result<Vec<Item>, PlmError> {
        self.list(ASSESSMENT).await
    }

    pub async fn search_aw_para_assessment_id(&self, parameter_id: &str) -> Result<Item, PlmError> {
        self.by_id(ASSESSMENT, parameter_id).await
    }

    pub async fn edit_aw_parameter_assessment(
        &self,
        parameter_id: &str,
        metadata: &Map<String, Value>,
    ) -> Result<Value, PlmError> {
        require_key(parameter_id, "parameter_id")?;
        validate_payload(&AW_ASSESSMENT, metadata)?;
        let url = item_url(self.odata.base_url(), ASSESSMENT, parameter_id)?;
        let edited = self.odata.patch(url, &Value::Object(metadata.clone())).await?;
        info!(parameter_id, "Edited airworthiness assessment");
        Ok(edited)
    }

    pub async fn create_aw_parameter_assessment(
        &self,
        metadata: &Map<String, Value>,
    ) -> Result<Item, PlmError> {
        validate_payload(&AW_ASSESSMENT, metadata)?;
        let url = collection_url(self.odata.base_url(), ASSESSMENT)?;
        let created: Item = self.odata.post(url, &Value::Object(metadata.clone())).await?;
        info!(assessment_id = %created.id, "Created airworthiness assessment");
        Ok(created)
    }

    pub async fn delete_aw_assessment_parameter(&self, parameter_id: &str) -> Result<(), PlmError> {
        self.delete(ASSESSMENT, parameter_id).await
    }
}
