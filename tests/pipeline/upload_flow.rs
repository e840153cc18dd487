use crate::support::{RecordingDispatcher, pipeline};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sendguard::error::DispatchError;
use sendguard::intercept::{
    BinaryPart, MultipartBody, NetworkDispatcher, OutboundRequest, PartValue, RequestBody,
    SelectionGesture,
};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn upload_part() -> BinaryPart {
    BinaryPart::from_file(
        "quarterly.pdf",
        "application/pdf",
        b"%PDF-original-bytes".to_vec(),
        1_700_000_000_000,
    )
}

fn upload_request(part: BinaryPart) -> OutboundRequest {
    let body = MultipartBody::new()
        .append_text("conversation", "c-42")
        .append_binary("file", part)
        .append_text("source", "picker");
    OutboundRequest::post("https://chat.example.com/upload", RequestBody::Multipart(body))
}

#[tokio::test]
async fn blocked_upload_raises_distinguishable_error_and_never_dispatches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/logs"))
        .and(body_partial_json(serde_json::json!({
            "attachment": {"format": "pdf"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "allow": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = pipeline(format!("{}/api/logs", server.uri()));
    let inner = RecordingDispatcher::new();
    let guard = pipeline
        .coordinator
        .install(Arc::clone(&inner) as Arc<dyn NetworkDispatcher>);

    let result = guard.dispatch(upload_request(upload_part())).await;

    assert!(matches!(result, Err(DispatchError::Blocked { .. })));
    assert_eq!(inner.call_count(), 0, "blocked upload must never reach the wire");
    server.verify().await;
}

#[tokio::test]
async fn replacement_attachment_is_substituted_byte_for_byte() {
    let replacement_bytes = b"%PDF-scrubbed-by-policy".to_vec();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "allow": true,
            "attachment": {
                "format": "pdf",
                "data": BASE64.encode(&replacement_bytes),
                "size": replacement_bytes.len(),
                "file_change": true
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = pipeline(format!("{}/api/logs", server.uri()));
    let inner = RecordingDispatcher::new();
    let guard = pipeline
        .coordinator
        .install(Arc::clone(&inner) as Arc<dyn NetworkDispatcher>);

    let result = guard.dispatch(upload_request(upload_part())).await;

    assert!(result.is_ok());
    let bodies = inner.sent_bodies();
    let RequestBody::Multipart(sent) = &bodies[0] else {
        panic!("multipart body expected on the wire");
    };

    assert_eq!(sent.parts.len(), 3, "all sibling parts preserved");
    assert_eq!(sent.parts[0].1, PartValue::Text("c-42".to_string()));
    assert_eq!(sent.parts[2].1, PartValue::Text("picker".to_string()));

    let PartValue::Binary(part) = &sent.parts[1].1 else {
        panic!("binary part expected");
    };
    assert_eq!(part.bytes, replacement_bytes, "bytes match the verdict payload");
    let filename = part.filename.as_deref().expect("replacement keeps a filename");
    assert!(
        filename.ends_with(".pdf"),
        "extension must match the verdict format, got {filename}"
    );
    server.verify().await;
}

#[tokio::test]
async fn selection_time_decision_is_reused_at_dispatch_time() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "allow": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = pipeline(format!("{}/api/logs", server.uri()));
    let inner = RecordingDispatcher::new();
    let guard = pipeline
        .coordinator
        .install(Arc::clone(&inner) as Arc<dyn NetworkDispatcher>);

    let part = upload_part();
    pipeline
        .coordinator
        .observe_selection(&SelectionGesture::InputChange(vec![part.clone()]));

    let result = guard.dispatch(upload_request(part)).await;

    assert!(matches!(result, Err(DispatchError::Blocked { .. })));
    assert_eq!(inner.call_count(), 0);
    // expect(1) on the mock proves the dispatch reused the selection-time
    // decision instead of asking again.
    server.verify().await;
}

#[tokio::test]
async fn stripped_blob_upload_matches_pending_selection_heuristically() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "allow": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = pipeline(format!("{}/api/logs", server.uri()));
    let inner = RecordingDispatcher::new();
    let guard = pipeline
        .coordinator
        .install(Arc::clone(&inner) as Arc<dyn NetworkDispatcher>);

    let selected = upload_part();
    pipeline
        .coordinator
        .observe_selection(&SelectionGesture::DragDrop(vec![selected.clone()]));

    // The host page re-wraps the file, dropping name and timestamp.
    let stripped = BinaryPart::from_blob("application/pdf", selected.bytes.clone());
    let result = guard
        .dispatch(OutboundRequest::post(
            "https://chat.example.com/upload",
            RequestBody::Binary(stripped),
        ))
        .await;

    assert!(matches!(result, Err(DispatchError::Blocked { .. })));
    assert_eq!(inner.call_count(), 0);
    server.verify().await;
}

#[tokio::test]
async fn unsupported_extension_uploads_without_any_decision_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = pipeline(format!("{}/api/logs", server.uri()));
    let inner = RecordingDispatcher::new();
    let guard = pipeline
        .coordinator
        .install(Arc::clone(&inner) as Arc<dyn NetworkDispatcher>);

    let part = BinaryPart::from_file(
        "installer.exe",
        "application/x-msdownload",
        vec![0x4D, 0x5A, 0x00],
        1,
    );
    let result = guard.dispatch(upload_request(part)).await;

    assert!(result.is_ok(), "unsupported formats pass through unmodified");
    assert_eq!(inner.call_count(), 1);
    server.verify().await;
}

#[tokio::test]
async fn relay_silence_fails_open_and_upload_proceeds_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/logs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"allow": false}))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let pipeline = pipeline(format!("{}/api/logs", server.uri()));
    let inner = RecordingDispatcher::new();
    let guard = pipeline
        .coordinator
        .install(Arc::clone(&inner) as Arc<dyn NetworkDispatcher>);

    let result = guard.dispatch(upload_request(upload_part())).await;

    assert!(result.is_ok(), "timeout fails open");
    assert_eq!(inner.call_count(), 1);
    let bodies = inner.sent_bodies();
    let RequestBody::Multipart(sent) = &bodies[0] else {
        panic!("multipart body expected");
    };
    let PartValue::Binary(part) = &sent.parts[1].1 else {
        panic!("binary part expected");
    };
    assert_eq!(part.bytes, b"%PDF-original-bytes".to_vec(), "body unchanged");
}

#[tokio::test]
async fn deferred_entry_point_blocks_through_callback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "allow": false
        })))
        .mount(&server)
        .await;

    let pipeline = pipeline(format!("{}/api/logs", server.uri()));
    let inner = RecordingDispatcher::new();
    let guard = pipeline
        .coordinator
        .install(Arc::clone(&inner) as Arc<dyn NetworkDispatcher>);

    let (tx, rx) = tokio::sync::oneshot::channel();
    guard.dispatch_deferred(
        upload_request(upload_part()),
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    );

    let result = rx.await.expect("callback fired");
    assert!(matches!(result, Err(DispatchError::Blocked { .. })));
    assert_eq!(inner.call_count(), 0);
}
