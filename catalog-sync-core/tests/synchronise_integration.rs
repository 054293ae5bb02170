use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use catalog_sync_core::catalog::HttpCatalog;
use catalog_sync_core::config::{Staging, SyncConfig};
use catalog_sync_core::contract::{
    CatalogPage, ItemRecord, ItemReference, MockCatalog, MockPublisher, PublishReceipt,
};
use catalog_sync_core::error::{FetchError, PublishError, SyncError};
use catalog_sync_core::publish::ObjectStorePublisher;
use catalog_sync_core::serialize::StagedArtifact;
use catalog_sync_core::synchronise::{run, synchronise, RunStatus};
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::ObjectStore;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "staging/pokemon/pokemons.json";

/// Mounts a three-item catalog; `failing` detail ids answer HTTP 500.
async fn mount_catalog(server: &MockServer, failing: &[u32]) {
    let results: Vec<_> = (1..=3)
        .map(|id| json!({"name": format!("mon-{id}"), "url": format!("{}/api/v2/pokemon/{id}/", server.uri())}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/api/v2/pokemon"))
        .and(query_param("offset", "0"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"count": 3, "results": results})),
        )
        .mount(server)
        .await;

    for id in 1..=3u32 {
        let response = if failing.contains(&id) {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(200).set_body_json(json!({"id": id}))
        };
        Mock::given(method("GET"))
            .and(path(format!("/api/v2/pokemon/{id}/")))
            .respond_with(response)
            .mount(server)
            .await;
    }
}

fn config_for(server: &MockServer) -> SyncConfig {
    let mut config = SyncConfig::new("test-bucket");
    config.catalog.base_url = format!("{}/api/v2/pokemon", server.uri());
    config.catalog.request_timeout = Duration::from_secs(5);
    config.fetch.concurrency = 2;
    config
}

#[tokio::test]
async fn end_to_end_publishes_every_record() {
    let server = MockServer::start().await;
    mount_catalog(&server, &[]).await;

    let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
    let publisher = ObjectStorePublisher::new("test-bucket", Arc::clone(&store));
    let catalog = HttpCatalog::new(&config_for(&server).catalog).unwrap();

    let report = run(&config_for(&server), &catalog, &publisher).await;
    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.detail, "Success");

    let bytes = store
        .get(&Path::from(KEY))
        .await
        .expect("artifact should be published")
        .bytes()
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = text.split('\n').filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 3);

    let ids: BTreeSet<u64> = lines
        .iter()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).expect("line is JSON");
            value["id"].as_u64().expect("id present")
        })
        .collect();
    assert_eq!(ids, BTreeSet::from([1, 2, 3]));
}

#[tokio::test]
async fn end_to_end_through_a_staged_file() {
    let server = MockServer::start().await;
    mount_catalog(&server, &[]).await;
    let staging_dir = tempfile::tempdir().unwrap();

    let mut config = config_for(&server);
    config.staging = Staging::TempFile {
        dir: Some(staging_dir.path().to_path_buf()),
    };
    let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
    let publisher = ObjectStorePublisher::new("test-bucket", Arc::clone(&store));
    let catalog = HttpCatalog::new(&config.catalog).unwrap();

    let report = synchronise(&config, &catalog, &publisher)
        .await
        .expect("sync should succeed");

    assert_eq!(report.references, 3);
    assert_eq!(report.records, 3);
    assert_eq!(report.receipt.bytes as u64, report.artifact_bytes);
    assert_eq!(
        std::fs::read_dir(staging_dir.path()).unwrap().count(),
        0,
        "staging file must be gone after the run"
    );
}

#[tokio::test]
async fn failed_fetch_fails_run_and_publishes_nothing() {
    let server = MockServer::start().await;
    mount_catalog(&server, &[2]).await;

    let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
    let publisher = ObjectStorePublisher::new("test-bucket", Arc::clone(&store));
    let catalog = HttpCatalog::new(&config_for(&server).catalog).unwrap();

    let report = run(&config_for(&server), &catalog, &publisher).await;

    assert_eq!(report.status, RunStatus::Failure);
    assert!(report.detail.starts_with("fetch:"), "got {}", report.detail);
    assert!(report.detail.contains("/api/v2/pokemon/2/"));
    assert!(matches!(
        store.get(&Path::from(KEY)).await,
        Err(object_store::Error::NotFound { .. })
    ));
}

#[tokio::test]
async fn failed_run_leaves_previous_artifact_untouched() {
    let server = MockServer::start().await;
    mount_catalog(&server, &[2]).await;

    let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
    store
        .put(&Path::from(KEY), b"previous\n".to_vec().into())
        .await
        .unwrap();
    let publisher = ObjectStorePublisher::new("test-bucket", Arc::clone(&store));
    let catalog = HttpCatalog::new(&config_for(&server).catalog).unwrap();

    let report = run(&config_for(&server), &catalog, &publisher).await;
    assert!(!report.is_success());

    let bytes = store.get(&Path::from(KEY)).await.unwrap().bytes().await.unwrap();
    assert_eq!(&bytes[..], b"previous\n");
}

#[tokio::test]
async fn publisher_is_never_called_when_a_fetch_fails() {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_list()
        .withf(|limit, offset| *limit == 10_000 && *offset == 0)
        .times(1)
        .returning(|_, _| {
            Ok(CatalogPage {
                results: vec![
                    ItemReference::new("https://catalog.test/1/"),
                    ItemReference::new("https://catalog.test/2/"),
                ],
                count: Some(2),
            })
        });
    catalog.expect_get().returning(|url| {
        if url.ends_with("/2/") {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 500,
            })
        } else {
            let mut record = ItemRecord::new();
            record.insert("id".to_string(), json!(1));
            Ok(record)
        }
    });

    let mut publisher = MockPublisher::new();
    publisher.expect_publish().never();

    let err = synchronise(&SyncConfig::new("test-bucket"), &catalog, &publisher)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), "fetch");
}

#[tokio::test]
async fn publisher_receives_destination_and_ndjson() {
    let mut catalog = MockCatalog::new();
    catalog.expect_list().returning(|_, _| {
        Ok(CatalogPage {
            results: vec![ItemReference::new("https://catalog.test/7/")],
            count: None,
        })
    });
    catalog.expect_get().returning(|_| {
        let mut record = ItemRecord::new();
        record.insert("id".to_string(), json!(7));
        Ok(record)
    });

    let mut publisher = MockPublisher::new();
    publisher
        .expect_publish()
        .withf(|artifact, destination| {
            matches!(artifact, StagedArtifact::Memory(bytes) if bytes.as_slice() == b"{\"id\": 7}\n")
                && destination.bucket == "test-bucket"
                && destination.key == KEY
        })
        .times(1)
        .returning(|artifact, destination| {
            Ok(PublishReceipt {
                bucket: destination.bucket.clone(),
                key: destination.key.clone(),
                bytes: artifact.len() as usize,
                content_sha256: "0".repeat(64),
                e_tag: None,
            })
        });

    let report = synchronise(&SyncConfig::new("test-bucket"), &catalog, &publisher)
        .await
        .expect("sync should succeed");
    assert_eq!(report.records, 1);
    assert_eq!(report.receipt.bytes, 10);
}

#[tokio::test]
async fn staged_file_is_removed_when_publish_fails() {
    let mut catalog = MockCatalog::new();
    catalog.expect_list().returning(|_, _| {
        Ok(CatalogPage {
            results: vec![ItemReference::new("https://catalog.test/7/")],
            count: Some(1),
        })
    });
    catalog.expect_get().returning(|_| {
        let mut record = ItemRecord::new();
        record.insert("id".to_string(), json!(7));
        Ok(record)
    });

    let staging_dir = tempfile::tempdir().unwrap();
    let mut config = SyncConfig::new("test-bucket");
    config.staging = Staging::TempFile {
        dir: Some(staging_dir.path().to_path_buf()),
    };

    let mut publisher = MockPublisher::new();
    publisher
        .expect_publish()
        .withf(|artifact, _| {
            matches!(artifact, StagedArtifact::File { file, .. } if file.path().exists())
        })
        .times(1)
        .returning(|_, destination| {
            Err(PublishError::BucketMismatch {
                expected: "elsewhere".to_string(),
                actual: destination.bucket.clone(),
            })
        });

    let err = synchronise(&config, &catalog, &publisher)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), "publish");
    assert_eq!(
        std::fs::read_dir(staging_dir.path()).unwrap().count(),
        0,
        "staging file must be gone after a failed publish"
    );
}

#[tokio::test]
async fn listing_failure_is_reported_as_listing_stage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/pokemon"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let mut publisher = MockPublisher::new();
    publisher.expect_publish().never();
    let catalog = HttpCatalog::new(&config_for(&server).catalog).unwrap();

    let report = run(&config_for(&server), &catalog, &publisher).await;
    assert_eq!(report.status, RunStatus::Failure);
    assert!(report.detail.starts_with("listing:"), "got {}", report.detail);

    let response = report.into_response();
    assert_eq!(response.status_code, "500");
    assert_eq!(response.headers["Content-Type"], "application/json");
}

#[tokio::test]
async fn run_deadline_aborts_a_hanging_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/pokemon"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"results": []}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.run_deadline = Some(Duration::from_millis(100));
    let mut publisher = MockPublisher::new();
    publisher.expect_publish().never();
    let catalog = HttpCatalog::new(&config.catalog).unwrap();

    let err = synchronise(&config, &catalog, &publisher).await.unwrap_err();
    assert!(matches!(err, SyncError::DeadlineExceeded(_)));
    assert_eq!(err.stage(), "deadline");
}

#[tokio::test]
async fn success_response_matches_the_invocation_contract() {
    let server = MockServer::start().await;
    mount_catalog(&server, &[]).await;

    let publisher = ObjectStorePublisher::new("test-bucket", Arc::new(InMemory::new()));
    let catalog = HttpCatalog::new(&config_for(&server).catalog).unwrap();

    let response = run(&config_for(&server), &catalog, &publisher)
        .await
        .into_response();

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({
            "statusCode": "200",
            "body": "Success",
            "headers": {"Content-Type": "application/json"}
        })
    );
}
