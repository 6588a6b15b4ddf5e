//! # transfer: one-way copy of tagged CAD files into Innovator
//!
//! Reads the CAD files of one document-store location (already tagged by
//! [`crate::tagging`]) and rebuilds them in Innovator as parts, assemblies and
//! attached CAD files. The order of the four phases is what keeps
//! references valid:
//!
//! 1. components: every `Component` becomes a standalone part
//! 2. assemblies: every `SubAssembly` becomes a part whose `Part BOM` holds
//!    its `SubComponent` children (created inline by Innovator)
//! 3. upload: the CAD files are downloaded to a temporary directory and
//!    re-uploaded to the vault, numbered by their BOM item number
//! 4. link: each uploaded file is related to the part named after it
//!
//! The run is fail-fast: the first failed call is returned and nothing is
//! rolled back.

use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::bom::Bom;
use crate::classify::{ItemNumber, ItemType};
use crate::contract::{DocumentSource, FileStore, PartStore};
use crate::error::TransferError;
use crate::metadata::{
    file_stem, MetadataItem, StoredFile, ITEM_NO, ITEM_TYPE, PART_NUMBER, QUANTITY,
};
use crate::parts::{AssemblyChild, ChildPart};

/// Where to read from and which BOM describes it.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub space_id: String,
    /// Folder path inside the space; `None` for the space root.
    pub path: Option<String>,
    pub bom_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPart {
    pub part_id: String,
    pub item_number: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedAssembly {
    pub part_id: String,
    pub item_number: String,
    pub name: String,
    pub children: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_id: String,
    pub filename: String,
    pub item_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CadLink {
    pub part_id: String,
    pub file_id: String,
    pub filename: String,
}

/// What a run did, phase by phase.
#[derive(Debug, Default)]
pub struct TransferReport {
    pub parts: Vec<CreatedPart>,
    pub assemblies: Vec<CreatedAssembly>,
    pub uploaded: Vec<UploadedFile>,
    pub links: Vec<CadLink>,
    /// Files passed over, with the reason.
    pub skipped: Vec<(String, String)>,
}

fn required_text(file: &StoredFile, key: &'static str) -> Result<String, TransferError> {
    file.text(key).ok_or_else(|| TransferError::MissingMetadata {
        file: file.name.clone(),
        key,
    })
}

fn item_number_of(file: &StoredFile) -> Result<ItemNumber, TransferError> {
    let value = file
        .lookup(ITEM_NO)
        .ok_or_else(|| TransferError::MissingMetadata {
            file: file.name.clone(),
            key: ITEM_NO,
        })?;
    ItemNumber::from_value(value).ok_or_else(|| TransferError::InvalidItemNumber {
        file: file.name.clone(),
        value: value.to_string(),
    })
}

fn item_type_of(file: &StoredFile) -> Option<ItemType> {
    file.text(ITEM_TYPE)?.parse().ok()
}

fn group_value<'a>(group: &'a [MetadataItem], key: &str) -> Option<&'a Value> {
    group
        .iter()
        .rev()
        .find(|m| m.key_name == key)
        .map(|m| &m.value.link)
}

/// BOM lines for an assembly, drawn from the CAD files whose item number
/// falls under it. A file tagged from several BOM rows contributes one line
/// per row under the assembly, each with that row's quantity.
pub fn assembly_children(assembly: &ItemNumber, cad_files: &[StoredFile]) -> Vec<AssemblyChild> {
    let mut children = Vec::new();
    for file in cad_files {
        for group in file.row_groups() {
            let Some(number) = group_value(group, ITEM_NO).and_then(ItemNumber::from_value) else {
                continue;
            };
            if !number.belongs_to(assembly) {
                continue;
            }
            children.push(AssemblyChild {
                quantity: group_value(group, QUANTITY).cloned(),
                related_id: ChildPart {
                    item_number: number.to_string(),
                    name: file.text(PART_NUMBER),
                },
            });
        }
    }
    children
}

pub struct TransferPipeline<'a, P, F, S>
where
    P: PartStore,
    F: FileStore,
    S: DocumentSource,
{
    parts: &'a P,
    files: &'a F,
    source: &'a S,
    bom: Bom,
    cad_files: Vec<StoredFile>,
}

impl<'a, P, F, S> TransferPipeline<'a, P, F, S>
where
    P: PartStore,
    F: FileStore,
    S: DocumentSource,
{
    /// Reads the BOM and lists the location, keeping only CAD files.
    pub async fn new(
        parts: &'a P,
        files: &'a F,
        source: &'a S,
        config: &TransferConfig,
    ) -> Result<Self, TransferError> {
        let bom = Bom::from_path(&config.bom_file)?;
        let listing = source
            .list_location(&config.space_id, config.path.clone())
            .await?;
        let total = listing.len();
        let cad_files: Vec<StoredFile> = listing.into_iter().filter(StoredFile::is_cad).collect();
        info!(
            space_id = %config.space_id,
            path = ?config.path,
            listed = total,
            cad_files = cad_files.len(),
            "[TRANSFER] Location listed"
        );
        Ok(Self {
            parts,
            files,
            source,
            bom,
            cad_files,
        })
    }

    pub fn cad_files(&self) -> &[StoredFile] {
        &self.cad_files
    }

    /// Runs all four phases.
    pub async fn create_parts_from_metadata(&self) -> Result<TransferReport, TransferError> {
        info!("[TRANSFER] Starting transfer");
        let mut report = TransferReport::default();

        let mut components = Vec::new();
        let mut assemblies = Vec::new();
        for file in &self.cad_files {
            match item_type_of(file) {
                Some(ItemType::Component) => components.push(file),
                Some(ItemType::SubAssembly) => assemblies.push(file),
                Some(ItemType::SubComponent) => {
                    debug!(name = %file.name, "[TRANSFER] Sub-component, created with its assembly");
                }
                None => {
                    warn!(name = %file.name, "[TRANSFER] File has no usable ITEM TYPE, skipping");
                    report
                        .skipped
                        .push((file.name.clone(), "no ITEM TYPE tag".to_string()));
                }
            }
        }

        for file in components {
            report.parts.push(self.capture_component(&file.pk).await?);
        }
        info!(parts = report.parts.len(), "[TRANSFER] Components created");

        for file in assemblies {
            report.assemblies.push(self.capture_subassembly(&file.pk).await?);
        }
        info!(assemblies = report.assemblies.len(), "[TRANSFER] Assemblies created");

        self.upload_files(&mut report).await?;
        info!(uploaded = report.uploaded.len(), "[TRANSFER] Files uploaded");

        report.links = self.link_files_to_parts().await?;
        info!(links = report.links.len(), "[TRANSFER] Transfer complete");
        Ok(report)
    }

    async fn capture_component(&self, pk: &str) -> Result<CreatedPart, TransferError> {
        let file = self.source.get_document(pk).await?;
        let name = required_text(&file, PART_NUMBER)?;
        let item_number = item_number_of(&file)?.to_string();

        let mut metadata = Map::new();
        metadata.insert("item_number".to_string(), Value::String(item_number.clone()));
        metadata.insert("name".to_string(), Value::String(name.clone()));

        let created = self.parts.create_part(metadata).await.map_err(|e| {
            error!(error = %e, name = %name, "[TRANSFER][ERROR] create_part failed");
            e
        })?;
        info!(part_id = %created.id, item_number = %item_number, name = %name, "[TRANSFER] Part created");
        Ok(CreatedPart {
            part_id: created.id,
            item_number,
            name,
        })
    }

    async fn capture_subassembly(&self, pk: &str) -> Result<CreatedAssembly, TransferError> {
        let file = self.source.get_document(pk).await?;
        let name = required_text(&file, PART_NUMBER)?;
        let number = item_number_of(&file)?;
        let item_number = number.to_string();

        let children = assembly_children(&number, &self.cad_files);
        let child_count = children.len();
        if child_count == 0 {
            warn!(name = %name, item_number = %item_number, "[TRANSFER] Assembly has no children among the listed files");
        }

        let created = self
            .parts
            .create_assembly(&item_number, &name, children)
            .await
            .map_err(|e| {
                error!(error = %e, name = %name, "[TRANSFER][ERROR] create_assembly failed");
                e
            })?;
        info!(
            part_id = %created.id,
            item_number = %item_number,
            children = child_count,
            "[TRANSFER] Assembly created"
        );
        Ok(CreatedAssembly {
            part_id: created.id,
            item_number,
            name,
            children: child_count,
        })
    }

    async fn upload_files(&self, report: &mut TransferReport) -> Result<(), TransferError> {
        let staging = tempfile::tempdir()?;
        debug!(dir = %staging.path().display(), "[TRANSFER] Staging directory created");

        // One directory per file: names repeat across folders.
        let mut downloaded = Vec::with_capacity(self.cad_files.len());
        for (index, file) in self.cad_files.iter().enumerate() {
            let directory = staging.path().join(index.to_string());
            tokio::fs::create_dir_all(&directory).await?;
            let path = self.source.download(&file.pk, &directory).await?;
            downloaded.push(path);
        }

        for path in downloaded {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let stem = file_stem(&filename);
            let Some(row) = self.bom.find_part(stem) else {
                warn!(filename = %filename, "[TRANSFER] No BOM row for downloaded file, not uploading");
                report
                    .skipped
                    .push((filename, "no matching BOM part number".to_string()));
                continue;
            };
            let item_number = row.item_number.to_string();
            let uploaded = self
                .files
                .upload_file(&path, Some(item_number.clone()))
                .await
                .map_err(|e| {
                    error!(error = %e, filename = %filename, "[TRANSFER][ERROR] upload_file failed");
                    e
                })?;
            report.uploaded.push(UploadedFile {
                file_id: uploaded.id,
                filename,
                item_number,
            });
        }
        Ok(())
    }

    /// Pairs every PLM file with every part named after its stem.
    async fn link_files_to_parts(&self) -> Result<Vec<CadLink>, TransferError> {
        let file_list = self.files.get_file_list().await?;
        let parts_list = self.parts.get_parts_list().await?;
        info!(
            files = file_list.len(),
            parts = parts_list.len(),
            "[TRANSFER] Pairing files to parts"
        );

        let mut links = Vec::new();
        for file in &file_list {
            let Some(filename) = file.text("filename") else {
                continue;
            };
            let stem = file_stem(&filename);
            for part in &parts_list {
                if part.text("name").as_deref() != Some(stem) {
                    continue;
                }
                self.parts.link_cad_document(&part.id, &file.id).await?;
                debug!(part_id = %part.id, file_id = %file.id, "[TRANSFER] CAD linked");
                links.push(CadLink {
                    part_id: part.id.clone(),
                    file_id: file.id.clone(),
                    filename: filename.clone(),
                });
            }
        }
        Ok(links)
    }
}
