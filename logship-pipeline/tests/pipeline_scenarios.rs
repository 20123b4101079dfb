//! End-to-end runs of the pipeline against in-memory collaborators.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;

use common::{pipeline, record, MemoryQueueStore, RecordingBackend};
use logship_pipeline::PipelineError;

const ACCESS_LINE: &str = "10/Oct/2023:13:55:36 -0700|1.2.3.4|HTTP/1.1|GET|example.com|\
                           GET /a?key=abc123 HTTP/1.1|200|512|0.01|0.009|10.0.0.1:80|200|-|-|curl/7";

const ERROR_LINE: &str = "2023/10/10 13:55:36 [error] 1234#0: *5 upstream timed out";

#[tokio::test]
async fn test_access_log_is_normalized_and_indexed() {
    let store = Arc::new(MemoryQueueStore::with_records(vec![record(&[
        ("type", "access-log"),
        ("message", ACCESS_LINE),
        ("host", "web-1"),
    ])]));
    let (backend, mut requests) = RecordingBackend::new();
    let running = pipeline(store, Arc::new(backend), 0).start();

    let documents = timeout(Duration::from_secs(5), requests.recv())
        .await
        .unwrap()
        .unwrap();
    running.shutdown();
    running.wait().await.unwrap();

    assert_eq!(documents.len(), 1);
    let doc = &documents[0];
    assert_eq!(doc.kind, "access-log");
    assert!(doc.index.starts_with("logstash-m1-"));
    assert_eq!(doc.body["status"], json!(200));
    assert_eq!(doc.body["request_time"], json!(0.01));
    assert_eq!(doc.body["@timestamp"], "2023-10-10T20:55:36.000Z");
    assert_eq!(doc.body["api_key"], "abc123");
    assert_eq!(doc.body["http_get_key"], "abc123");
    assert_eq!(doc.body["host"], "web-1");
    assert!(doc.body.get("message").is_none());
}

#[tokio::test]
async fn test_error_log_is_normalized_and_indexed() {
    let store = Arc::new(MemoryQueueStore::with_records(vec![record(&[
        ("type", "error-log"),
        ("message", ERROR_LINE),
    ])]));
    let (backend, mut requests) = RecordingBackend::new();
    let running = pipeline(store, Arc::new(backend), 0).start();

    let documents = timeout(Duration::from_secs(5), requests.recv())
        .await
        .unwrap()
        .unwrap();
    running.shutdown();
    running.wait().await.unwrap();

    let doc = &documents[0];
    assert_eq!(doc.kind, "error-log");
    assert_eq!(doc.body["severity"], "error");
    assert_eq!(doc.body["errmsg"], "upstream timed out");
    assert_eq!(doc.body["@timestamp"], "2023-10-10T13:55:36.000Z");
    assert!(doc.body.get("pid").is_none());
}

#[tokio::test]
async fn test_corrupt_record_is_dropped_from_its_batch() {
    // Popped record first; the two behind it are range-read into the same batch.
    let store = Arc::new(MemoryQueueStore::with_records(vec![
        record(&[("type", "app-log"), ("seq", "popped")]),
        vec![0xc1, 0xc1, 0xc1],
        record(&[("type", "app-log"), ("seq", "queued")]),
    ]));
    let (backend, mut requests) = RecordingBackend::new();
    let running = pipeline(store, Arc::new(backend), 1000).start();

    let documents = timeout(Duration::from_secs(5), requests.recv())
        .await
        .unwrap()
        .unwrap();
    running.shutdown();
    running.wait().await.unwrap();

    let sequence: Vec<_> = documents.iter().map(|doc| doc.body["seq"].clone()).collect();
    assert_eq!(sequence, vec![json!("queued"), json!("popped")]);
}

#[tokio::test]
async fn test_empty_queue_emits_nothing_and_keeps_polling() {
    let store = Arc::new(MemoryQueueStore::default());
    let (backend, mut requests) = RecordingBackend::new();
    let running = pipeline(store.clone(), Arc::new(backend), 1000).start();

    tokio::time::sleep(Duration::from_millis(150)).await;
    running.shutdown();
    running.wait().await.unwrap();

    assert!(store.pop_count.load(Ordering::SeqCst) >= 2);
    assert!(requests.try_recv().is_err());
}

#[tokio::test]
async fn test_stage_panic_stops_the_pipeline() {
    let store = Arc::new(MemoryQueueStore::with_records(vec![record(&[(
        "type", "app-log",
    )])]));
    let running = pipeline(store, Arc::new(RecordingBackend::panicking()), 0).start();

    let result = timeout(Duration::from_secs(5), running.wait()).await.unwrap();

    assert!(matches!(
        result,
        Err(PipelineError::StageTaskFailed {
            stage: "delivery",
            ..
        })
    ));
}
