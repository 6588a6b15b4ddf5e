#[path = "../../innovator-sync-core/tests/support/mod.rs"]
mod support;

use innovator_sync::hyperthought::HyperThoughtClient;
use innovator_sync_core::contract::DocumentSource;
use innovator_sync_core::error::SourceError;
use innovator_sync_core::metadata::MetadataItem;
use serde_json::{json, Value};
use support::{Route, StubServer};
use tempfile::tempdir;

fn client(server: &StubServer) -> HyperThoughtClient {
    HyperThoughtClient::new(StubServer::client(), &server.base, "t0k")
}

#[tokio::test]
async fn listing_follows_pages_and_descends_into_folders() {
    let server = StubServer::start(vec![
        Route::new(
            "GET",
            "/api/files/?page=2",
            200,
            r#"{"count": 3, "next": null, "results": [{"pk": "c", "name": "C.SLDPRT", "ftype": "SLDPRT"}]}"#,
        ),
        Route::new(
            "GET",
            "/api/files/?space=project&space_id=s1&path=%2Csub%2C",
            200,
            r#"[{"pk": "d", "name": "D.SLDASM", "ftype": "SLDASM"}]"#,
        ),
        Route::new(
            "GET",
            "/api/files/?space=project&space_id=s1",
            200,
            r#"{"count": 3, "next": "{base}/api/files/?page=2", "results": [
                {"pk": "a", "name": "A.SLDPRT", "ftype": "SLDPRT"},
                {"pk": "sub", "name": "sub", "ftype": "Folder"}
            ]}"#,
        ),
    ])
    .await;

    let files = client(&server).list_location("s1", None).await.unwrap();
    let pks: Vec<&str> = files.iter().map(|f| f.pk.as_str()).collect();
    assert_eq!(pks, vec!["a", "sub", "c", "d"]);

    let requests = server.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].target, "/api/files/?page=2");
    for request in &requests {
        assert_eq!(request.header("authorization"), Some("Bearer t0k"));
    }
}

#[tokio::test]
async fn download_writes_the_file_into_the_directory() {
    let server = StubServer::start(vec![
        Route::new(
            "GET",
            "/api/files/generate-download-url/?id=a",
            200,
            r#"{"url": "{base}/blob/a"}"#,
        ),
        Route::new(
            "GET",
            "/api/files/a/",
            200,
            r#"{"pk": "a", "name": "A.SLDPRT", "ftype": "SLDPRT"}"#,
        ),
        Route::new("GET", "/blob/a", 200, "solid"),
    ])
    .await;

    let dir = tempdir().unwrap();
    let path = client(&server).download("a", dir.path()).await.unwrap();
    assert_eq!(path, dir.path().join("A.SLDPRT"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "solid");

    let requests = server.requests();
    let blob = requests.iter().find(|r| r.target == "/blob/a").unwrap();
    assert_eq!(blob.header("authorization"), None);
}

#[tokio::test]
async fn metadata_updates_are_patched_as_json() {
    let server = StubServer::start(vec![Route::new(
        "PATCH",
        "/api/files/a/metadata/",
        200,
        "{}",
    )])
    .await;

    client(&server)
        .update_metadata("a", vec![MetadataItem::new("ITEM NO.", json!("2.1"))])
        .await
        .unwrap();

    let requests = server.requests();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body[0]["keyName"], "ITEM NO.");
    assert_eq!(body[0]["value"]["link"], "2.1");
}

#[tokio::test]
async fn missing_files_surface_the_status() {
    let server = StubServer::start(vec![]).await;
    let err = client(&server).get_document("gone").await.unwrap_err();
    assert!(matches!(err, SourceError::Status { status: 404, .. }));
}
