// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection controller against mock transport and microphone.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hark_core::{HarkError, PermissionCause};
use hark_test_utils::{MockMicrophone, MockTransport};
use hark_widget::credential::TOKEN_URL_REQUIRED;
use hark_widget::{
    AudioCaptureOptions, CaptureError, ConnectionController, ConnectionEvent, ConnectionObserver,
    ConnectionPhase, CredentialSource, HttpCredentialSource, Microphone, VoiceConfig,
};
use tokio::sync::Notify;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct Recorder(Mutex<Vec<ConnectionEvent>>);

impl Recorder {
    fn events(&self) -> Vec<ConnectionEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl ConnectionObserver for Recorder {
    fn on_event(&self, event: &ConnectionEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

fn config_with_token() -> VoiceConfig {
    let mut config = VoiceConfig::new("wss://media.test");
    config.token = Some("tok-static".into());
    config
}

fn controller(
    config: VoiceConfig,
    transport: Arc<MockTransport>,
    microphone: Arc<dyn Microphone>,
    credentials: Option<Arc<dyn CredentialSource>>,
) -> (ConnectionController, Arc<Recorder>) {
    let controller = ConnectionController::new(config, transport, microphone, credentials);
    let recorder = Arc::new(Recorder::default());
    controller.subscribe(recorder.clone());
    (controller, recorder)
}

async fn wait_for(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached");
}

#[tokio::test]
async fn connects_with_supplied_token() {
    let transport = Arc::new(MockTransport::new());
    let (controller, recorder) = controller(
        config_with_token(),
        transport.clone(),
        Arc::new(MockMicrophone::granted()),
        None,
    );

    controller.connect().await.unwrap();

    assert_eq!(controller.state().phase, ConnectionPhase::Connected);
    assert_eq!(
        recorder.events(),
        vec![ConnectionEvent::MicrophonePermissionGranted, ConnectionEvent::Connected]
    );
    assert_eq!(transport.tokens(), vec!["tok-static".to_string()]);
    assert!(controller.is_microphone_enabled());
}

#[tokio::test]
async fn prompts_for_microphone_when_not_granted() {
    let microphone = Arc::new(MockMicrophone::prompting());
    let (controller, _) = controller(
        config_with_token(),
        Arc::new(MockTransport::new()),
        microphone.clone(),
        None,
    );

    assert!(!controller.has_microphone_permission().await);
    controller.connect().await.unwrap();

    assert_eq!(microphone.request_count(), 1);
    assert!(controller.has_microphone_permission().await);
}

/// Granted, but the permission check suspends until released.
#[derive(Default)]
struct SlowGrantedMicrophone {
    checks: AtomicUsize,
    release: Notify,
}

#[async_trait]
impl Microphone for SlowGrantedMicrophone {
    async fn is_granted(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        true
    }

    async fn request_access(&self, _: &AudioCaptureOptions) -> Result<(), CaptureError> {
        panic!("access was already granted");
    }
}

#[tokio::test]
async fn granted_microphone_skips_permission_phase() {
    let microphone = Arc::new(SlowGrantedMicrophone::default());
    let (controller, recorder) = controller(
        config_with_token(),
        Arc::new(MockTransport::new()),
        microphone.clone(),
        None,
    );

    let attempt = tokio::spawn({
        let controller = controller.clone();
        async move { controller.connect().await }
    });
    wait_for(|| microphone.checks.load(Ordering::SeqCst) == 1).await;
    assert_ne!(controller.state().phase, ConnectionPhase::RequestingPermission);

    microphone.release.notify_one();
    attempt.await.unwrap().unwrap();

    assert_eq!(controller.state().phase, ConnectionPhase::Connected);
    assert_eq!(microphone.checks.load(Ordering::SeqCst), 1);
    assert_eq!(
        recorder.events(),
        vec![ConnectionEvent::MicrophonePermissionGranted, ConnectionEvent::Connected]
    );
}

#[tokio::test]
async fn second_connect_while_in_flight_is_ignored() {
    let (transport, gate) = MockTransport::gated();
    let transport = Arc::new(transport);
    let (controller, recorder) = controller(
        config_with_token(),
        transport.clone(),
        Arc::new(MockMicrophone::granted()),
        None,
    );

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.connect().await }
    });
    wait_for(|| transport.connect_count() == 1).await;
    assert!(controller.state().is_connecting());

    controller.connect().await.unwrap();
    assert_eq!(transport.connect_count(), 1);

    gate.notify_one();
    first.await.unwrap().unwrap();

    controller.connect().await.unwrap();
    assert_eq!(transport.connect_count(), 1);
    assert_eq!(transport.sessions().len(), 1);
    let connected = recorder
        .events()
        .into_iter()
        .filter(|e| *e == ConnectionEvent::Connected)
        .count();
    assert_eq!(connected, 1);
}

#[tokio::test]
async fn denied_and_missing_microphone_have_distinct_errors() {
    for (error, cause, prefix) in [
        (CaptureError::NotAllowed, PermissionCause::Denied, "Microphone permission denied."),
        (CaptureError::NotFound, PermissionCause::DeviceNotFound, "No microphone found."),
    ] {
        let transport = Arc::new(MockTransport::new());
        let (controller, recorder) = controller(
            config_with_token(),
            transport.clone(),
            Arc::new(MockMicrophone::refusing(error)),
            None,
        );

        let err = controller.connect().await.unwrap_err();
        assert!(matches!(err, HarkError::Permission { cause: c, .. } if c == cause));

        let state = controller.state();
        assert_eq!(state.phase, ConnectionPhase::Error);
        assert!(state.last_error.unwrap().starts_with(prefix));
        assert!(matches!(recorder.events().as_slice(), [ConnectionEvent::Error(m)] if m.starts_with(prefix)));
        assert_eq!(transport.connect_count(), 0);
    }
}

#[tokio::test]
async fn missing_token_source_is_an_error() {
    let (controller, recorder) = controller(
        VoiceConfig::new("wss://media.test"),
        Arc::new(MockTransport::new()),
        Arc::new(MockMicrophone::granted()),
        None,
    );

    let err = controller.connect().await.unwrap_err();
    assert_eq!(err.to_string(), TOKEN_URL_REQUIRED);
    assert_eq!(
        recorder.events(),
        vec![
            ConnectionEvent::MicrophonePermissionGranted,
            ConnectionEvent::Error(TOKEN_URL_REQUIRED.to_string()),
        ]
    );
}

#[tokio::test]
async fn handshake_failure_allows_retry() {
    let transport = Arc::new(MockTransport::failing("signal connection refused"));
    let (controller, _) = controller(
        config_with_token(),
        transport.clone(),
        Arc::new(MockMicrophone::granted()),
        None,
    );

    assert!(controller.connect().await.is_err());
    assert_eq!(controller.state().phase, ConnectionPhase::Error);

    assert!(controller.connect().await.is_err());
    assert_eq!(transport.connect_count(), 2);
}

#[tokio::test]
async fn publish_failure_leaves_the_room() {
    let transport = Arc::new(MockTransport::new());
    transport.set_publish_failure(true);
    let (controller, _) = controller(
        config_with_token(),
        transport.clone(),
        Arc::new(MockMicrophone::granted()),
        None,
    );

    assert!(controller.connect().await.is_err());
    assert!(transport.last_session().unwrap().is_disconnected());
    assert!(!controller.state().is_connected());
}

#[tokio::test]
async fn explicit_disconnect_returns_to_idle() {
    let transport = Arc::new(MockTransport::new());
    let (controller, recorder) = controller(
        config_with_token(),
        transport.clone(),
        Arc::new(MockMicrophone::granted()),
        None,
    );
    controller.connect().await.unwrap();

    controller.disconnect().await;

    assert_eq!(controller.state().phase, ConnectionPhase::Idle);
    assert!(transport.last_session().unwrap().is_disconnected());
    assert_eq!(recorder.events().last(), Some(&ConnectionEvent::Disconnected));

    // Not connected any more: ignored, no second event.
    controller.disconnect().await;
    let disconnects = recorder
        .events()
        .into_iter()
        .filter(|e| *e == ConnectionEvent::Disconnected)
        .count();
    assert_eq!(disconnects, 1);
}

#[tokio::test]
async fn remote_events_reach_observers() {
    let transport = Arc::new(MockTransport::new());
    let (controller, recorder) = controller(
        config_with_token(),
        transport.clone(),
        Arc::new(MockMicrophone::granted()),
        None,
    );
    controller.connect().await.unwrap();
    let session = transport.last_session().unwrap();

    session.agent_joins("agent-1");
    wait_for(|| recorder.events().contains(&ConnectionEvent::ParticipantConnected("agent-1".into()))).await;

    session.end_remotely();
    wait_for(|| controller.state().phase == ConnectionPhase::Idle).await;
    assert_eq!(recorder.events().last(), Some(&ConnectionEvent::Disconnected));
}

#[tokio::test]
async fn destroy_cancels_in_flight_attempt() {
    let (transport, gate) = MockTransport::gated();
    let transport = Arc::new(transport);
    let (controller, recorder) = controller(
        config_with_token(),
        transport.clone(),
        Arc::new(MockMicrophone::granted()),
        None,
    );

    let attempt = tokio::spawn({
        let controller = controller.clone();
        async move { controller.connect().await }
    });
    wait_for(|| transport.connect_count() == 1).await;

    controller.destroy().await;
    assert_eq!(controller.state().phase, ConnectionPhase::Idle);

    gate.notify_one();
    assert!(attempt.await.unwrap().is_err());

    assert_eq!(controller.state().phase, ConnectionPhase::Idle);
    assert!(transport.last_session().unwrap().is_disconnected());
    assert!(!recorder.events().contains(&ConnectionEvent::Connected));
}

#[tokio::test]
async fn toggle_microphone_flips_track() {
    let (controller, _) = controller(
        config_with_token(),
        Arc::new(MockTransport::new()),
        Arc::new(MockMicrophone::granted()),
        None,
    );
    assert!(controller.toggle_microphone().await.is_err());

    controller.connect().await.unwrap();
    assert!(!controller.toggle_microphone().await.unwrap());
    assert!(!controller.is_microphone_enabled());
    assert!(controller.toggle_microphone().await.unwrap());
}

#[tokio::test]
async fn fetches_token_from_credential_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate-token"))
        .and(body_partial_json(serde_json::json!({ "participantName": "Web User" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": { "token": "tok-http" },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Arc::new(MockTransport::new());
    let source = HttpCredentialSource::new(format!("{}/generate-token", server.uri()));
    let (controller, _) = controller(
        VoiceConfig::new("wss://media.test"),
        transport.clone(),
        Arc::new(MockMicrophone::granted()),
        Some(Arc::new(source)),
    );

    controller.connect().await.unwrap();
    assert_eq!(transport.tokens(), vec!["tok-http".to_string()]);
}

#[tokio::test]
async fn rejected_token_request_is_wrapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let source = HttpCredentialSource::new(server.uri());
    let err = source.fetch("room", "Web User").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Token generation failed: Token API request failed: 429 Too Many Requests"
    );
}

#[tokio::test]
async fn plain_text_token_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("tok-plain\n"))
        .mount(&server)
        .await;

    let source = HttpCredentialSource::new(server.uri());
    assert_eq!(source.fetch("room", "Web User").await.unwrap(), "tok-plain");
}
