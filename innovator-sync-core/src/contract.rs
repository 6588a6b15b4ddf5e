//! # contract: seams between the transfer pipeline and the systems it talks to
//!
//! The pipeline and the tagger never call HTTP directly. They depend on three
//! traits:
//! - [`PartStore`]: part and assembly creation in Innovator, CAD links
//! - [`FileStore`]: physical file upload and listing in Innovator
//! - [`DocumentSource`]: the document-management side the CAD files come from
//!
//! `PartsApi` and `FilesApi` implement the first two; the CLI crate provides
//! the HyperThought implementation of the third.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; mocks are exported under the
//!   `test-export-mocks` feature so integration tests in other crates can use them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{PlmError, SourceError};
use crate::metadata::{MetadataItem, StoredFile};
use crate::odata::Item;
use crate::parts::AssemblyChild;

/// Part-side operations the transfer pipeline needs.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PartStore: Send + Sync {
    /// Create a standalone part from a validated key/value payload.
    async fn create_part(&self, metadata: Map<String, Value>) -> Result<Item, PlmError>;

    /// Create an assembly together with its BOM lines.
    async fn create_assembly(
        &self,
        item_number: &str,
        name: &str,
        children: Vec<AssemblyChild>,
    ) -> Result<Item, PlmError>;

    async fn get_parts_list(&self) -> Result<Vec<Item>, PlmError>;

    /// Relate an uploaded CAD file to a part.
    async fn link_cad_document(&self, part_id: &str, cad_id: &str) -> Result<Value, PlmError>;
}

/// File-side operations the transfer pipeline needs.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Upload a local file; the PLM filename is the path's final component.
    async fn upload_file(&self, path: &Path, file_number: Option<String>)
        -> Result<Item, PlmError>;

    async fn get_file_list(&self) -> Result<Vec<Item>, PlmError>;
}

/// The document-management system CAD files and their metadata live in.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Every file below a location, folders expanded. `path` of `None` means the space root.
    async fn list_location(
        &self,
        space_id: &str,
        path: Option<String>,
    ) -> Result<Vec<StoredFile>, SourceError>;

    async fn get_document(&self, pk: &str) -> Result<StoredFile, SourceError>;

    /// Download a file's content into `directory`, returning the written path.
    async fn download(&self, pk: &str, directory: &Path) -> Result<PathBuf, SourceError>;

    /// Replace a file's metadata.
    async fn update_metadata(
        &self,
        pk: &str,
        metadata: Vec<MetadataItem>,
    ) -> Result<(), SourceError>;
}
