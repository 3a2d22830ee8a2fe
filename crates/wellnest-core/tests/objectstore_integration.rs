//! Integration tests for the backup bucket client.
//!
//! A mockito server stands in for an S3-compatible endpoint with
//! path-style addressing.

use chrono::{DateTime, TimeZone, Utc};
use mockito::Matcher;
use url::Url;
use wellnest_core::backup::{self, BackupSnapshot};
use wellnest_core::objectstore::Credentials;
use wellnest_core::{Category, CoreError, ObjectStore, ObjectStoreError, StorageSettings, WellnessState};

fn settings(endpoint: &str) -> StorageSettings {
    StorageSettings {
        region: "us-east-1".into(),
        bucket: "wellnest".into(),
        endpoint: Some(Url::parse(endpoint).unwrap()),
        prefix: "backups/".into(),
        credentials: Credentials {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "secret".into(),
            session_token: None,
        },
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 18, 5, 7).unwrap()
}

fn listing(objects: &[(&str, &str, u64)], next: Option<&str>) -> String {
    let mut body = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ListBucketResult>");
    body.push_str(&format!("<IsTruncated>{}</IsTruncated>", next.is_some()));
    if let Some(token) = next {
        body.push_str(&format!("<NextContinuationToken>{token}</NextContinuationToken>"));
    }
    for (key, modified, size) in objects {
        body.push_str(&format!(
            "<Contents><Key>{key}</Key><LastModified>{modified}</LastModified><Size>{size}</Size></Contents>"
        ));
    }
    body.push_str("</ListBucketResult>");
    body
}

#[tokio::test]
async fn list_follows_pages_and_sorts_newest_first() {
    let mut server = mockito::Server::new_async().await;

    let first = server
        .mock("GET", "/wellnest")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("prefix".into(), "backups/".into()),
            Matcher::Regex("SignedHeaders=host&list-type=2".into()),
        ]))
        .with_status(200)
        .with_body(listing(
            &[("backups/old.json", "2024-01-01T00:00:00.000Z", 10)],
            Some("tok1"),
        ))
        .create_async()
        .await;
    let second = server
        .mock("GET", "/wellnest")
        .match_query(Matcher::UrlEncoded("continuation-token".into(), "tok1".into()))
        .with_status(200)
        .with_body(listing(
            &[
                ("backups/new.json", "2024-03-01T00:00:00.000Z", 30),
                ("backups/mid.json", "2024-02-01T00:00:00.000Z", 20),
            ],
            None,
        ))
        .create_async()
        .await;

    let store = ObjectStore::new(settings(&server.url()));
    let objects = store.list(Some("backups/"), now()).await.unwrap();

    let keys: Vec<_> = objects.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, vec!["backups/new.json", "backups/mid.json", "backups/old.json"]);
    assert_eq!(objects[0].size, 30);
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn list_failure_is_a_retrieval_error() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/wellnest")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body("<Error><Code>AccessDenied</Code></Error>")
        .create_async()
        .await;

    let store = ObjectStore::new(settings(&server.url()));
    let err = store.list(None, now()).await.unwrap_err();
    match err {
        ObjectStoreError::Retrieval(message) => assert!(message.contains("403")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn push_uploads_snapshot_through_presigned_put() {
    let mut server = mockito::Server::new_async().await;
    let upload = server
        .mock("PUT", "/wellnest/backups/wellnest-20240309T180507Z.json")
        .match_query(Matcher::UrlEncoded(
            "X-Amz-SignedHeaders".into(),
            "content-type;host".into(),
        ))
        .match_header("content-type", "application/json")
        .match_body(Matcher::Regex("\"format_version\": 1".into()))
        .with_status(200)
        .create_async()
        .await;

    let mut state = WellnessState::new();
    state.add_item("Stretch", Category::Fitness, now()).unwrap();

    let store = ObjectStore::new(settings(&server.url()));
    let key = backup::push(&store, &state, now()).await.unwrap();
    assert_eq!(key, "backups/wellnest-20240309T180507Z.json");
    upload.assert_async().await;
}

#[tokio::test]
async fn pull_without_key_restores_newest_backup() {
    let mut server = mockito::Server::new_async().await;

    let mut state = WellnessState::new();
    state.add_item("Read", Category::Learning, now()).unwrap();
    let body = BackupSnapshot::new(state.clone(), now()).to_json_bytes().unwrap();

    let _list = server
        .mock("GET", "/wellnest")
        .match_query(Matcher::UrlEncoded("list-type".into(), "2".into()))
        .with_status(200)
        .with_body(listing(
            &[
                ("backups/notes.txt", "2024-03-09T00:00:00.000Z", 1),
                ("backups/wellnest-20240308T000000Z.json", "2024-03-08T00:00:00.000Z", 100),
                ("backups/wellnest-20240101T000000Z.json", "2024-01-01T00:00:00.000Z", 100),
            ],
            None,
        ))
        .create_async()
        .await;
    let download = server
        .mock("GET", "/wellnest/backups/wellnest-20240308T000000Z.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let store = ObjectStore::new(settings(&server.url()));
    let (key, snapshot) = backup::pull(&store, None, now()).await.unwrap();
    assert_eq!(key, "backups/wellnest-20240308T000000Z.json");
    assert_eq!(snapshot.state, state);
    download.assert_async().await;
}

#[tokio::test]
async fn pull_with_no_backups_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    let _list = server
        .mock("GET", "/wellnest")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(listing(&[], None))
        .create_async()
        .await;

    let store = ObjectStore::new(settings(&server.url()));
    let err = backup::pull(&store, None, now()).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { kind: "backup", .. }));
}
