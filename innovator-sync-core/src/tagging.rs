//! Writes BOM data back onto CAD files in the document store, so each file
//! carries its own `ITEM NO.`, `PART NUMBER`, `QTY.` and inferred `ITEM TYPE`.
//!
//! The transfer pipeline reads these tags later; tagging is the step that
//! has to run first.

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bom::Bom;
use crate::classify::ItemType;
use crate::contract::DocumentSource;
use crate::error::TransferError;
use crate::metadata::{MetadataItem, CAD_FILE_TYPES, ID_NUMBER, ITEM_TYPE};

#[derive(Debug, Clone, PartialEq)]
pub enum TagOutcome {
    /// Not a CAD file; left untouched.
    Skipped { pk: String, name: String },
    Tagged {
        pk: String,
        name: String,
        /// BOM rows that matched the file name.
        matched_rows: usize,
        id_number: String,
    },
}

pub struct Tagger<'a, S: DocumentSource> {
    source: &'a S,
    bom: &'a Bom,
    types: Vec<ItemType>,
}

impl<'a, S: DocumentSource> Tagger<'a, S> {
    pub fn new(source: &'a S, bom: &'a Bom) -> Self {
        let types = bom.classify();
        Self { source, bom, types }
    }

    /// Metadata for a file stem: every column of each matching row plus its
    /// item type, then a fresh `id_number`.
    pub fn metadata_for(&self, stem: &str, id_number: &str) -> (Vec<MetadataItem>, usize) {
        let mut metadata = Vec::new();
        let mut matched = 0;
        for (row, item_type) in self.bom.rows.iter().zip(&self.types) {
            if !row.part_number_matches(stem) {
                continue;
            }
            matched += 1;
            for (column, value) in &row.cells {
                metadata.push(MetadataItem::new(column.clone(), value.clone()));
            }
            metadata.push(MetadataItem::new(
                ITEM_TYPE,
                Value::String(item_type.as_str().to_string()),
            ));
        }
        metadata.push(MetadataItem::new(
            ID_NUMBER,
            Value::String(id_number.to_string()),
        ));
        (metadata, matched)
    }

    pub async fn parse(&self, file_pk: &str) -> Result<TagOutcome, TransferError> {
        let file = self.source.get_document(file_pk).await?;
        let extension = file.extension();
        if !CAD_FILE_TYPES
            .iter()
            .any(|t| t.eq_ignore_ascii_case(extension))
        {
            info!(pk = %file.pk, name = %file.name, "[TAG] Not a CAD file, skipping");
            return Ok(TagOutcome::Skipped {
                pk: file.pk,
                name: file.name,
            });
        }

        let id_number = Uuid::new_v4().simple().to_string();
        let (metadata, matched_rows) = self.metadata_for(file.stem(), &id_number);
        if matched_rows == 0 {
            warn!(name = %file.name, "[TAG] No BOM row matches this file");
        }
        self.source.update_metadata(&file.pk, metadata).await?;
        info!(pk = %file.pk, name = %file.name, matched_rows, "[TAG] Metadata written");

        Ok(TagOutcome::Tagged {
            pk: file.pk,
            name: file.name,
            matched_rows,
            id_number,
        })
    }

    /// Tags every file below a location.
    pub async fn parse_all(
        &self,
        space_id: &str,
        path: Option<&str>,
    ) -> Result<Vec<TagOutcome>, TransferError> {
        let files = self
            .source
            .list_location(space_id, path.map(str::to_string))
            .await?;
        info!(space_id, files = files.len(), "[TAG] Tagging location");
        let mut outcomes = Vec::with_capacity(files.len());
        for file in files.iter().filter(|f| !f.is_folder()) {
            outcomes.push(self.parse(&file.pk).await?);
        }
        Ok(outcomes)
    }
}
