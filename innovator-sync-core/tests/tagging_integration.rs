use innovator_sync_core::bom::Bom;
use innovator_sync_core::contract::MockDocumentSource;
use innovator_sync_core::error::{SourceError, TransferError};
use innovator_sync_core::metadata::{MetadataItem, StoredFile};
use innovator_sync_core::tagging::{TagOutcome, Tagger};
use serde_json::{json, Value};
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

const BOM_CSV: &str = "ITEM NO.,PART NUMBER,QTY.,DESCRIPTION\n1,BASE-PLATE,1,Base\n2,ARM-ASSY,1,Arm\n2.1,VENDOR/ARM-LINK,2,Link\n2.2,PIN-6MM,4,\"Pin\n6 mm\"\n";

fn load_bom() -> Bom {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("assembly.csv");
    fs::write(&path, BOM_CSV).expect("write bom");
    Bom::from_path(&path).expect("bom should parse")
}

fn file(pk: &str, name: &str, ftype: &str) -> StoredFile {
    StoredFile {
        pk: pk.to_string(),
        name: name.to_string(),
        ftype: ftype.to_string(),
        metadata: vec![],
    }
}

fn value_of<'a>(metadata: &'a [MetadataItem], key: &str) -> Option<&'a Value> {
    metadata
        .iter()
        .find(|m| m.key_name == key)
        .map(|m| &m.value.link)
}

#[tokio::test]
async fn cad_files_receive_bom_columns_and_item_type() {
    let bom = load_bom();
    let written: Arc<Mutex<Vec<(String, Vec<MetadataItem>)>>> = Arc::new(Mutex::new(Vec::new()));

    let mut source = MockDocumentSource::new();
    source
        .expect_get_document()
        .times(1)
        .returning(|pk: &str| Ok(file(pk, "ARM-LINK.SLDPRT", "SLDPRT")));
    {
        let written = written.clone();
        source
            .expect_update_metadata()
            .times(1)
            .returning(move |pk: &str, metadata: Vec<MetadataItem>| {
                written.lock().unwrap().push((pk.to_string(), metadata));
                Ok(())
            });
    }

    let tagger = Tagger::new(&source, &bom);
    let outcome = tagger.parse("pk-link").await.expect("tagging should succeed");

    let id_number = match outcome {
        TagOutcome::Tagged {
            pk,
            matched_rows,
            id_number,
            ..
        } => {
            assert_eq!(pk, "pk-link");
            assert_eq!(matched_rows, 1, "prefixed part numbers match on the suffix");
            id_number
        }
        other => panic!("expected a tagged file, got {other:?}"),
    };
    assert_eq!(id_number.len(), 32);
    assert!(id_number.chars().all(|c| c.is_ascii_hexdigit()));

    let calls = written.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (pk, metadata) = &calls[0];
    assert_eq!(pk, "pk-link");
    assert_eq!(value_of(metadata, "ITEM NO."), Some(&json!("2.1")));
    assert_eq!(value_of(metadata, "PART NUMBER"), Some(&json!("VENDOR/ARM-LINK")));
    assert_eq!(value_of(metadata, "QTY."), Some(&json!(2.0)));
    assert_eq!(value_of(metadata, "DESCRIPTION"), Some(&json!("Link")));
    assert_eq!(value_of(metadata, "ITEM TYPE"), Some(&json!("SubComponent")));
    assert_eq!(value_of(metadata, "id_number"), Some(&json!(id_number)));
    assert_eq!(
        metadata.last().map(|m| m.key_name.as_str()),
        Some("id_number")
    );
}

#[tokio::test]
async fn non_cad_files_are_left_alone() {
    let bom = load_bom();
    let mut source = MockDocumentSource::new();
    source
        .expect_get_document()
        .returning(|pk: &str| Ok(file(pk, "BASE-PLATE.pdf", "PDF")));
    source.expect_update_metadata().never();

    let outcome = Tagger::new(&source, &bom).parse("pk-pdf").await.unwrap();
    assert_eq!(
        outcome,
        TagOutcome::Skipped {
            pk: "pk-pdf".into(),
            name: "BASE-PLATE.pdf".into()
        }
    );
}

#[tokio::test]
async fn unmatched_cad_files_still_get_an_id_number() {
    let bom = load_bom();
    let written: Arc<Mutex<Vec<Vec<MetadataItem>>>> = Arc::new(Mutex::new(Vec::new()));
    let mut source = MockDocumentSource::new();
    source
        .expect_get_document()
        .returning(|pk: &str| Ok(file(pk, "SPARE.sldprt", "SLDPRT")));
    {
        let written = written.clone();
        source
            .expect_update_metadata()
            .returning(move |_pk: &str, metadata: Vec<MetadataItem>| {
                written.lock().unwrap().push(metadata);
                Ok(())
            });
    }

    let outcome = Tagger::new(&source, &bom).parse("pk-spare").await.unwrap();
    assert!(matches!(outcome, TagOutcome::Tagged { matched_rows: 0, .. }));

    let calls = written.lock().unwrap();
    assert_eq!(calls[0].len(), 1);
    assert_eq!(calls[0][0].key_name, "id_number");
}

#[tokio::test]
async fn tagging_a_location_skips_folders_and_classifies_each_file() {
    let bom = load_bom();
    let listing = vec![
        file("pk-folder", "parts", "Folder"),
        file("pk-base", "BASE-PLATE.SLDPRT", "SLDPRT"),
        file("pk-arm", "ARM-ASSY.SLDASM", "SLDASM"),
        file("pk-notes", "notes.txt", "TXT"),
    ];
    let by_pk = listing.clone();
    let types: Arc<Mutex<Vec<(String, Value)>>> = Arc::new(Mutex::new(Vec::new()));

    let mut source = MockDocumentSource::new();
    source
        .expect_list_location()
        .times(1)
        .returning(move |space: &str, path: Option<String>| {
            assert_eq!(space, "space-7");
            assert_eq!(path.as_deref(), Some(",cad,"));
            Ok(listing.clone())
        });
    source.expect_get_document().times(3).returning(move |pk: &str| {
        by_pk
            .iter()
            .find(|f| f.pk == pk)
            .cloned()
            .ok_or_else(|| SourceError::Other(format!("unknown {pk}")))
    });
    {
        let types = types.clone();
        source
            .expect_update_metadata()
            .times(2)
            .returning(move |pk: &str, metadata: Vec<MetadataItem>| {
                let item_type = value_of(&metadata, "ITEM TYPE").cloned().unwrap_or(Value::Null);
                types.lock().unwrap().push((pk.to_string(), item_type));
                Ok(())
            });
    }

    let outcomes = Tagger::new(&source, &bom)
        .parse_all("space-7", Some(",cad,"))
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[2], TagOutcome::Skipped { .. }));

    let types = types.lock().unwrap();
    assert_eq!(
        *types,
        vec![
            ("pk-base".to_string(), json!("Component")),
            ("pk-arm".to_string(), json!("SubAssembly")),
        ]
    );
}

#[tokio::test]
async fn source_failures_surface_as_transfer_errors() {
    let bom = load_bom();
    let mut source = MockDocumentSource::new();
    source.expect_get_document().returning(|_pk: &str| {
        Err(SourceError::Status {
            url: "https://ht.example/api/files/pk/".into(),
            status: 404,
            body: "not found".into(),
        })
    });
    source.expect_update_metadata().never();

    let err = Tagger::new(&source, &bom).parse("pk").await.unwrap_err();
    assert!(matches!(
        err,
        TransferError::Source(SourceError::Status { status: 404, .. })
    ));
}
