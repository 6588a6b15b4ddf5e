//! # parts: the `Part` item type and its BOM/CAD relationships
//!
//! One method per OData endpoint. Payloads are validated against
//! [`crate::validate::PART_CREATE`] / [`crate::validate::PART_UPDATE`]
//! before anything is sent.

use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::contract::PartStore;
use crate::error::{PlmError, ValidationError};
use crate::odata::{
    collection_url, filter_url, item_url, quote_literal, relationship_url, require_key, Item,
    ODataClient, ODataCollection, Relationship,
};
use crate::validate::{validate_payload, PART_CREATE, PART_UPDATE};

const PART: &str = "Part";
const PART_BOM: &str = "Part BOM";
const PART_CAD: &str = "Part CAD";

/// `related_id` of a BOM line: the child part to create or reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildPart {
    pub item_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One entry of an assembly's `Part BOM`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssemblyChild {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Value>,
    pub related_id: ChildPart,
}

/// Parent and children of one part in a product structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureNode {
    pub parent: Option<String>,
    pub children: Vec<String>,
}

/// Body for `create_assembly`.
pub fn assembly_payload(
    item_number: &str,
    name: &str,
    children: &[AssemblyChild],
) -> Result<Value, PlmError> {
    require_key(item_number, "item_number")?;
    if children
        .iter()
        .any(|c| c.related_id.item_number.trim().is_empty())
    {
        return Err(ValidationError::EmptyKey {
            what: "related_id.item_number",
        }
        .into());
    }
    Ok(json!({
        "item_number": item_number,
        "name": name,
        "Part BOM": serde_json::to_value(children)?,
    }))
}

/// Body for `link_child_part`.
pub fn child_link_payload(assembly_id: &str, child_id: &str) -> Value {
    json!({
        "source_id@odata.bind": format!("Part({})", quote_literal(assembly_id)),
        "related_id@odata.bind": format!("BOM({})", quote_literal(child_id)),
    })
}

/// Body for `link_cad_document`.
pub fn cad_link_payload(cad_id: &str) -> Value {
    json!({ "related_id@odata.bind": format!("CAD({})", quote_literal(cad_id)) })
}

/// Depth-first walk over a part graph. `children_of` is asked once per
/// reachable part; a part seen again (shared or cyclic) is recorded as a
/// child but not expanded.
pub async fn walk_structure<F, Fut>(
    root_id: &str,
    mut children_of: F,
) -> Result<BTreeMap<String, StructureNode>, PlmError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Vec<String>, PlmError>>,
{
    let mut structure: BTreeMap<String, StructureNode> = BTreeMap::new();
    structure.insert(root_id.to_string(), StructureNode::default());
    let mut pending = vec![root_id.to_string()];

    while let Some(parent_id) = pending.pop() {
        let children = children_of(parent_id.clone()).await?;
        for child_id in children {
            if let Some(node) = structure.get_mut(&parent_id) {
                node.children.push(child_id.clone());
            }
            if structure.contains_key(&child_id) {
                continue;
            }
            structure.insert(
                child_id.clone(),
                StructureNode {
                    parent: Some(parent_id.clone()),
                    children: Vec::new(),
                },
            );
            pending.push(child_id);
        }
    }
    Ok(structure)
}

#[derive(Debug, Clone)]
pub struct PartsApi {
    odata: ODataClient,
}

impl PartsApi {
    pub fn new(odata: ODataClient) -> Self {
        Self { odata }
    }

    pub async fn get_parts_list(&self) -> Result<Vec<Item>, PlmError> {
        let url = collection_url(self.odata.base_url(), PART)?;
        let list: ODataCollection<Item> = self.odata.get(url).await?;
        info!(count = list.value.len(), "Fetched parts list");
        Ok(list.value)
    }

    /// Parts whose `item_number` (manufacturer's part number) matches.
    pub async fn search_part_number(&self, part_number: &str) -> Result<Vec<Item>, PlmError> {
        require_key(part_number, "part_number")?;
        self.search("item_number", part_number).await
    }

    pub async fn search_part_name(&self, part_name: &str) -> Result<Vec<Item>, PlmError> {
        require_key(part_name, "part_name")?;
        self.search("name", part_name).await
    }

    /// Parts of one category (`Gasket`, `Screw`, ...), stored as the description.
    pub async fn search_part_type(&self, part_type: &str) -> Result<Vec<Item>, PlmError> {
        require_key(part_type, "part_type")?;
        self.search("description", part_type).await
    }

    async fn search(&self, field: &str, value: &str) -> Result<Vec<Item>, PlmError> {
        let url = filter_url(self.odata.base_url(), PART, field, value)?;
        let list: ODataCollection<Item> = self.odata.get(url).await?;
        debug!(field, value, count = list.value.len(), "Part search");
        Ok(list.value)
    }

    pub async fn search_part_id(&self, part_id: &str) -> Result<Item, PlmError> {
        require_key(part_id, "part_id")?;
        let url = item_url(self.odata.base_url(), PART, part_id)?;
        self.odata.get(url).await
    }

    pub async fn create_part(&self, metadata: &Map<String, Value>) -> Result<Item, PlmError> {
        validate_payload(&PART_CREATE, metadata)?;
        let url = collection_url(self.odata.base_url(), PART)?;
        let created: Item = self.odata.post(url, &Value::Object(metadata.clone())).await?;
        info!(part_id = %created.id, item_number = ?metadata.get("item_number"), "Created part");
        Ok(created)
    }

    /// `part_id` is the Innovator id assigned at creation, not the item number.
    pub async fn update_part(
        &self,
        part_id: &str,
        metadata: &Map<String, Value>,
    ) -> Result<Value, PlmError> {
        require_key(part_id, "part_id")?;
        validate_payload(&PART_UPDATE, metadata)?;
        let url = item_url(self.odata.base_url(), PART, part_id)?;
        let updated = self
            .odata
            .patch(url, &Value::Object(metadata.clone()))
            .await?;
        info!(part_id, "Updated part");
        Ok(updated)
    }

    pub async fn delete_part(&self, part_id: &str) -> Result<(), PlmError> {
        require_key(part_id, "part_id")?;
        let url = item_url(self.odata.base_url(), PART, part_id)?;
        self.odata.delete(url).await?;
        info!(part_id, "Deleted part");
        Ok(())
    }

    /// Direct children (`Part BOM` rows with the child expanded).
    pub async fn get_assembly(&self, part_id: &str) -> Result<Vec<Relationship>, PlmError> {
        require_key(part_id, "part_id")?;
        let url = relationship_url(self.odata.base_url(), PART, part_id, PART_BOM)?;
        let list: ODataCollection<Relationship> = self.odata.get(url).await?;
        Ok(list.value)
    }

    /// Walks `Part BOM` from `root_id` down, returning every reachable part
    /// with its parent and children.
    pub async fn get_product_structure(
        &self,
        root_id: &str,
    ) -> Result<BTreeMap<String, StructureNode>, PlmError> {
        require_key(root_id, "part_id")?;
        let structure = walk_structure(root_id, move |part_id: String| async move {
            let rows = self.get_assembly(&part_id).await?;
            Ok::<Vec<String>, PlmError>(
                rows.into_iter()
                    .filter_map(|r| r.related_id)
                    .map(|child| child.id)
                    .collect(),
            )
        })
        .await?;
        info!(root_id, parts = structure.len(), "Resolved product structure");
        Ok(structure)
    }

    /// Creates the assembly part and its BOM lines in one request. Children
    /// that do not exist yet are created by Innovator from `related_id`.
    pub async fn create_assembly(
        &self,
        item_number: &str,
        assembly_name: &str,
        children: &[AssemblyChild],
    ) -> Result<Item, PlmError> {
        let payload = assembly_payload(item_number, assembly_name, children)?;
        let url = collection_url(self.odata.base_url(), PART)?;
        let created: Item = self.odata.post(url, &payload).await?;
        info!(
            part_id = %created.id,
            item_number,
            children = children.len(),
            "Created assembly"
        );
        Ok(created)
    }

    /// Attaches an existing part to an existing assembly.
    pub async fn link_child_part(
        &self,
        assembly_id: &str,
        child_id: &str,
    ) -> Result<Value, PlmError> {
        require_key(assembly_id, "assembly_id")?;
        require_key(child_id, "child_part")?;
        let url = collection_url(self.odata.base_url(), PART_BOM)?;
        let linked = self
            .odata
            .post(url, &child_link_payload(assembly_id, child_id))
            .await?;
        info!(assembly_id, child_id, "Linked child part");
        Ok(linked)
    }

    pub async fn search_linked_cad_files(
        &self,
        part_id: &str,
    ) -> Result<Vec<Relationship>, PlmError> {
        require_key(part_id, "part_id")?;
        let url = relationship_url(self.odata.base_url(), PART, part_id, PART_CAD)?;
        let list: ODataCollection<Relationship> = self.odata.get(url).await?;
        Ok(list.value)
    }

    pub async fn link_cad_document(&self, part_id: &str, cad_id: &str) -> Result<Value, PlmError> {
        require_key(part_id, "part_id")?;
        require_key(cad_id, "CAD_id")?;
        let mut url = item_url(self.odata.base_url(), PART, part_id)?;
        url.path_segments_mut()
            .map_err(|_| PlmError::BaseUrl {
                url: self.odata.base_url().to_string(),
                reason: "cannot be a base".to_string(),
            })?
            .push(PART_CAD);
        let linked = self.odata.post(url, &cad_link_payload(cad_id)).await?;
        info!(part_id, cad_id, "Linked CAD document to part");
        Ok(linked)
    }
}

#[async_trait]
impl PartStore for PartsApi {
    async fn create_part(&self, metadata: Map<String, Value>) -> Result<Item, PlmError> {
        PartsApi::create_part(self, &metadata).await
    }

    async fn create_assembly(
        &self,
        item_number: &str,
        name: &str,
        children: Vec<AssemblyChild>,
    ) -> Result<Item, PlmError> {
        PartsApi::create_assembly(self, item_number, name, &children).await
    }

    async fn get_parts_list(&self) -> Result<Vec<Item>, PlmError> {
        PartsApi::get_parts_list(self).await
    }

    async fn link_cad_document(&self, part_id: &str, cad_id: &str) -> Result<Value, PlmError> {
        PartsApi::link_cad_document(self, part_id, cad_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(item_number: &str, name: Option<&str>, quantity: Option<Value>) -> AssemblyChild {
        AssemblyChild {
            quantity,
            related_id: ChildPart {
                item_number: item_number.to_string(),
                name: name.map(str::to_string),
            },
        }
    }

    #[test]
    fn assembly_payload_nests_bom_lines() {
        let payload = assembly_payload(
            "2",
            "ARM-ASSY",
            &[
                child("2.1", Some("ARM-LINK"), Some(json!(2.0))),
                child("2.2", None, None),
            ],
        )
        .unwrap();
        assert_eq!(
            payload,
            json!({
                "item_number": "2",
                "name": "ARM-ASSY",
                "Part BOM": [
                    {"quantity": 2.0, "related_id": {"item_number": "2.1", "name": "ARM-LINK"}},
                    {"related_id": {"item_number": "2.2"}}
                ]
            })
        );
    }

    #[test]
    fn assembly_children_need_item_numbers() {
        let err = assembly_payload("2", "ARM", &[child(" ", None, None)]).unwrap_err();
        assert!(matches!(
            err,
            PlmError::Validation(ValidationError::EmptyKey { .. })
        ));
    }

    #[test]
    fn bind_payloads_reference_the_right_entity_sets() {
        assert_eq!(
            child_link_payload("A1", "C9"),
            json!({
                "source_id@odata.bind": "Part('A1')",
                "related_id@odata.bind": "BOM('C9')"
            })
        );
        assert_eq!(
            cad_link_payload("F7"),
            json!({"related_id@odata.bind": "CAD('F7')"})
        );
    }

    #[test]
    fn bind_payloads_double_embedded_quotes() {
        assert_eq!(
            child_link_payload("O'A", "C'9")["source_id@odata.bind"],
            "Part('O''A')"
        );
        assert_eq!(
            child_link_payload("O'A", "C'9")["related_id@odata.bind"],
            "BOM('C''9')"
        );
        assert_eq!(
            cad_link_payload("F'7")["related_id@odata.bind"],
            "CAD('F''7')"
        );
    }

    async fn walk(
        graph: &[(&str, &[&str])],
        root: &str,
    ) -> (BTreeMap<String, StructureNode>, Vec<String>) {
        let mut asked = Vec::new();
        let structure = walk_structure(root, |part_id: String| {
            asked.push(part_id.clone());
            let children: Vec<String> = graph
                .iter()
                .find(|(id, _)| *id == part_id)
                .map(|(_, kids)| kids.iter().map(|k| k.to_string()).collect())
                .unwrap_or_default();
            async move { Ok::<_, PlmError>(children) }
        })
        .await
        .unwrap();
        (structure, asked)
    }

    #[tokio::test]
    async fn cyclic_structures_terminate() {
        let (structure, asked) = walk(&[("A", &["B"]), ("B", &["A"])], "A").await;
        assert_eq!(asked, vec!["A", "B"]);
        assert_eq!(structure.len(), 2);
        assert_eq!(structure["A"].parent, None);
        assert_eq!(structure["B"].parent.as_deref(), Some("A"));
        assert_eq!(structure["B"].children, vec!["A"]);
    }

    #[tokio::test]
    async fn shared_parts_are_expanded_once() {
        let graph: &[(&str, &[&str])] = &[
            ("A", &["B", "C"]),
            ("B", &["D"]),
            ("C", &["D"]),
            ("D", &[]),
        ];
        let (structure, asked) = walk(graph, "A").await;
        assert_eq!(asked.len(), 4);
        assert_eq!(asked.iter().filter(|id| *id == "D").count(), 1);
        assert_eq!(structure.len(), 4);
        assert_eq!(structure["A"].children, vec!["B", "C"]);
        assert_eq!(structure["B"].children, vec!["D"]);
        assert_eq!(structure["C"].children, vec!["D"]);
    }

    #[tokio::test]
    async fn walk_stops_at_the_first_failed_fetch() {
        let result = walk_structure("A", |_part_id: String| async {
            Err::<Vec<String>, _>(PlmError::Auth("expired".into()))
        })
        .await;
        assert!(matches!(result, Err(PlmError::Auth(_))));
    }
}
