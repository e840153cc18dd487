use crate::support::{RecordingSurface, pipeline};
use sendguard::collector::{ComposerSurface, GestureOutcome, PromptCollector, SubmitGesture};
use sendguard::config::{Settings, SettingsStore};
use sendguard::protocol::Frame;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn enter() -> SubmitGesture {
    SubmitGesture::EnterKey { shift: false }
}

#[tokio::test]
async fn blocked_prompt_is_held_and_never_submitted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/logs"))
        .and(body_partial_json(serde_json::json!({
            "prompt": "secret data",
            "host": "chat.example.com"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "allow": false,
            "alert": "credential leak"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = pipeline(format!("{}/api/logs", server.uri()));
    let surface = RecordingSurface::with_input("secret data");
    let collector = PromptCollector::new(
        Arc::clone(&surface) as Arc<dyn ComposerSurface>,
        pipeline.coordinator.requester(),
    );

    let outcome = collector.on_gesture(enter()).await;

    assert_eq!(outcome, GestureOutcome::Blocked { notice_shown: true });
    assert_eq!(surface.submit_count(), 0);
    assert_eq!(surface.input(), "secret data", "input left untouched");
    assert_eq!(surface.notice_count(), 1);
    server.verify().await;
}

#[tokio::test]
async fn rewritten_prompt_is_replaced_then_submitted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "allow": true,
            "modified_prompt": "[REDACTED]"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = pipeline(format!("{}/api/logs", server.uri()));
    let surface = RecordingSurface::with_input("my key is X");
    let collector = PromptCollector::new(
        Arc::clone(&surface) as Arc<dyn ComposerSurface>,
        pipeline.coordinator.requester(),
    );

    let outcome = collector.on_gesture(enter()).await;

    assert_eq!(outcome, GestureOutcome::SubmittedModified);
    assert_eq!(surface.input(), "[REDACTED]");
    assert_eq!(surface.submit_count(), 1);
    server.verify().await;
}

#[tokio::test]
async fn allowed_prompt_submits_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "allow": true
        })))
        .mount(&server)
        .await;

    let pipeline = pipeline(format!("{}/api/logs", server.uri()));
    let surface = RecordingSurface::with_input("what is rust");
    let collector = PromptCollector::new(
        Arc::clone(&surface) as Arc<dyn ComposerSurface>,
        pipeline.coordinator.requester(),
    );

    assert_eq!(collector.on_gesture(enter()).await, GestureOutcome::Submitted);
    assert_eq!(surface.input(), "what is rust");
    assert_eq!(surface.submit_count(), 1);
}

#[tokio::test]
async fn disabled_settings_submit_without_any_decision_traffic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = pipeline(format!("{}/api/logs", server.uri()));
    pipeline.store.update_settings(Settings {
        enabled: false,
        endpoint_url: format!("{}/api/logs", server.uri()),
    });
    let mut frames = pipeline.bus.subscribe();

    let surface = RecordingSurface::with_input("anything at all");
    let collector = PromptCollector::new(
        Arc::clone(&surface) as Arc<dyn ComposerSurface>,
        pipeline.coordinator.requester(),
    );

    assert_eq!(collector.on_gesture(enter()).await, GestureOutcome::Submitted);
    assert_eq!(surface.submit_count(), 1);
    assert!(
        !matches!(frames.try_recv(), Ok(Frame::Request(_))),
        "no request frame may be emitted while disabled"
    );
    server.verify().await;
}

#[tokio::test]
async fn relay_silence_fails_open_and_submits_original() {
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
    let surface = RecordingSurface::with_input("slow server");
    let collector = PromptCollector::new(
        Arc::clone(&surface) as Arc<dyn ComposerSurface>,
        pipeline.coordinator.requester(),
    );

    let outcome = collector.on_gesture(enter()).await;

    assert_eq!(outcome, GestureOutcome::SubmittedFailOpen);
    assert_eq!(surface.submit_count(), 1);
    assert_eq!(surface.input(), "slow server");
}
