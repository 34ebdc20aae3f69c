//! End-to-end push workflow tests against a scripted registry client

use async_trait::async_trait;
use futures_util::StreamExt;
use registry_push::cli::{Args, Runner};
use registry_push::config::ProjectConfig;
use registry_push::error::{PushError, REMOTE_ERROR_EXIT_CODE, Result};
use registry_push::preflight::TestStep;
use registry_push::progress::render::ProgressRenderer;
use registry_push::registry::client::{
    EventStream, LoginCredentials, LoginStatus, PushOptions, RegistryClient,
};
use registry_push::registry::events::{PushEvent, RawEvent};
use clap::Parser;
use std::sync::{Arc, Mutex};

const SIMPLE_STREAM: &[&str] = &[
    r#"{"stream": "In process"}"#,
    r#"{"status": "Successfully pushed"}"#,
];

#[derive(Default)]
struct FakeInner {
    login_status: Mutex<Option<String>>,
    events: Mutex<Vec<String>>,
    logins: Mutex<Vec<(LoginCredentials, String)>>,
    pushes: Mutex<Vec<(String, String, PushOptions)>>,
}

/// Scripted registry client recording every call it receives
#[derive(Clone, Default)]
struct FakeClient {
    inner: Arc<FakeInner>,
}

impl FakeClient {
    fn with_events(events: &[&str]) -> Self {
        let fake = FakeClient::default();
        *fake.inner.events.lock().unwrap() = events.iter().map(|e| e.to_string()).collect();
        fake
    }

    fn with_login_status(self, status: &str) -> Self {
        *self.inner.login_status.lock().unwrap() = Some(status.to_string());
        self
    }

    fn logins(&self) -> Vec<(LoginCredentials, String)> {
        self.inner.logins.lock().unwrap().clone()
    }

    fn pushes(&self) -> Vec<(String, String, PushOptions)> {
        self.inner.pushes.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryClient for FakeClient {
    async fn login(&self, credentials: &LoginCredentials, registry: &str) -> Result<LoginStatus> {
        self.inner
            .logins
            .lock()
            .unwrap()
            .push((credentials.clone(), registry.to_string()));
        let status = self
            .inner
            .login_status
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "Login Succeeded".to_string());
        Ok(LoginStatus { status })
    }

    async fn push(
        &self,
        repository: &str,
        tag: &str,
        options: PushOptions,
    ) -> Result<EventStream> {
        self.inner
            .pushes
            .lock()
            .unwrap()
            .push((repository.to_string(), tag.to_string(), options));
        let events: Vec<Result<PushEvent>> = self
            .inner
            .events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|record| {
                let raw: RawEvent = serde_json::from_str(record).expect("valid record");
                PushEvent::from_raw(raw).map(Ok)
            })
            .collect();
        Ok(futures::stream::iter(events).boxed())
    }
}

/// Test step that records its invocations and can be scripted to fail
#[derive(Clone, Default)]
struct CountingTestStep {
    calls: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl CountingTestStep {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TestStep for CountingTestStep {
    async fn run(&self, environment: &str, version: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((environment.to_string(), version.to_string()));
        if self.fail {
            Err(PushError::Preflight("image tests failed".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Aggregate(usize, usize),
    Finish,
}

#[derive(Default)]
struct RecordingRenderer {
    ops: Vec<Op>,
}

impl ProgressRenderer for RecordingRenderer {
    fn plain_line(&mut self, _line: &str) {}
    fn layer_discovered(&mut self, _id: &str) {}
    fn layer_update(&mut self, _id: &str, _phase: &str, _current: u64, _total: u64) {}
    fn layer_finished(&mut self, _id: &str, _phase: &str) {}
    fn aggregate(&mut self, completed: usize, total: usize) {
        self.ops.push(Op::Aggregate(completed, total));
    }
    fn finish(&mut self) {
        self.ops.push(Op::Finish);
    }
}

fn args(argv: &[&str]) -> Args {
    let full: Vec<&str> = ["registry-push", "--quiet"]
        .iter()
        .copied()
        .chain(argv.iter().copied())
        .collect();
    Args::try_parse_from(full).expect("valid argv")
}

fn config() -> ProjectConfig {
    serde_json::from_str(
        r#"{
            "registry": "registry",
            "images": {"dev": "user/project"},
            "default_version": "1.0"
        }"#,
    )
    .expect("valid config")
}

struct Harness {
    client: FakeClient,
    test_step: CountingTestStep,
    runner: Runner,
}

fn harness(argv: &[&str], client: FakeClient, test_step: CountingTestStep) -> Harness {
    let runner = Runner::new(
        args(argv),
        config(),
        Box::new(client.clone()),
        Some(Box::new(test_step.clone())),
    )
    .expect("valid arguments");
    Harness {
        client,
        test_step,
        runner,
    }
}

#[tokio::test]
async fn apikey_login_pushes_successfully() {
    let h = harness(
        &["dev", "--version", "test", "--apikey", "apikey"],
        FakeClient::with_events(SIMPLE_STREAM),
        CountingTestStep::default(),
    );
    let mut renderer = RecordingRenderer::default();

    h.runner.run(&mut renderer).await.expect("push succeeds");

    assert_eq!(
        h.client.logins(),
        vec![(LoginCredentials::from_apikey("apikey"), "registry".to_string())]
    );
    assert_eq!(
        h.client.pushes(),
        vec![(
            "registry/user/project".to_string(),
            "test".to_string(),
            PushOptions {
                insecure_registry: false
            },
        )]
    );
    assert_eq!(h.test_step.calls(), vec![("dev".to_string(), "test".to_string())]);
}

#[tokio::test]
async fn full_credentials_login_carries_the_email() {
    let h = harness(
        &[
            "dev", "--version", "test", "--username", "user", "--password", "pass", "--email",
            "mail",
        ],
        FakeClient::with_events(SIMPLE_STREAM),
        CountingTestStep::default(),
    );
    let mut renderer = RecordingRenderer::default();

    h.runner.run(&mut renderer).await.expect("push succeeds");

    assert_eq!(
        h.client.logins(),
        vec![(
            LoginCredentials::new("user".to_string(), "pass".to_string(), Some("mail".to_string())),
            "registry".to_string()
        )]
    );
}

#[tokio::test]
async fn insecure_flag_skips_login_entirely() {
    let h = harness(
        &["dev", "--version", "test", "--insecure", "--apikey", "apikey"],
        FakeClient::with_events(SIMPLE_STREAM),
        CountingTestStep::default(),
    );
    let mut renderer = RecordingRenderer::default();

    h.runner.run(&mut renderer).await.expect("push succeeds");

    assert!(h.client.logins().is_empty());
    assert_eq!(
        h.client.pushes(),
        vec![(
            "registry/user/project".to_string(),
            "test".to_string(),
            PushOptions {
                insecure_registry: true
            },
        )]
    );
}

#[tokio::test]
async fn missing_credentials_skip_login_but_still_push() {
    let h = harness(
        &["dev", "--version", "test"],
        FakeClient::with_events(SIMPLE_STREAM),
        CountingTestStep::default(),
    );
    let mut renderer = RecordingRenderer::default();

    h.runner.run(&mut renderer).await.expect("push succeeds");

    assert!(h.client.logins().is_empty());
    assert_eq!(h.client.pushes().len(), 1);
}

#[tokio::test]
async fn rejected_login_maps_to_the_remote_error_code() {
    let h = harness(
        &[
            "dev", "--version", "test", "--username", "user", "--password", "pass", "--email",
            "mail",
        ],
        FakeClient::with_events(SIMPLE_STREAM).with_login_status("Login Failed!"),
        CountingTestStep::default(),
    );
    let mut renderer = RecordingRenderer::default();

    let err = h.runner.run(&mut renderer).await.unwrap_err();

    assert!(matches!(err, PushError::Remote(_)));
    assert_eq!(err.exit_code(), REMOTE_ERROR_EXIT_CODE);
    // the push is never attempted after a failed login
    assert!(h.client.pushes().is_empty());
    // but the test step already ran
    assert_eq!(h.test_step.calls().len(), 1);
}

#[tokio::test]
async fn error_event_in_the_stream_maps_to_the_remote_error_code() {
    let h = harness(
        &[
            "dev", "--version", "test", "--username", "user", "--password", "pass", "--email",
            "mail",
        ],
        FakeClient::with_events(&[r#"{"error": "Failed:(", "errorDetail": ""}"#]),
        CountingTestStep::default(),
    );
    let mut renderer = RecordingRenderer::default();

    let err = h.runner.run(&mut renderer).await.unwrap_err();

    assert_eq!(err.exit_code(), REMOTE_ERROR_EXIT_CODE);
    assert_eq!(h.test_step.calls(), vec![("dev".to_string(), "test".to_string())]);
}

#[tokio::test]
async fn error_event_late_in_the_stream_still_fails() {
    let h = harness(
        &["dev", "--version", "test"],
        FakeClient::with_events(&[
            r#"{"status": "Preparing", "progressDetail": {}, "id": "abc"}"#,
            r#"{"status": "Pushed", "progressDetail": {}, "id": "abc"}"#,
            r#"{"error": "blob upload invalid", "errorDetail": ""}"#,
        ]),
        CountingTestStep::default(),
    );
    let mut renderer = RecordingRenderer::default();

    let err = h.runner.run(&mut renderer).await.unwrap_err();
    assert_eq!(err.exit_code(), REMOTE_ERROR_EXIT_CODE);
}

#[tokio::test]
async fn skip_tests_short_and_long_forms_bypass_the_test_step() {
    for flag in ["-S", "--skip-tests"] {
        let h = harness(
            &["dev", "--version", "test", flag],
            FakeClient::with_events(SIMPLE_STREAM),
            CountingTestStep::default(),
        );
        let mut renderer = RecordingRenderer::default();

        h.runner.run(&mut renderer).await.expect("push succeeds");

        assert!(h.test_step.calls().is_empty());
        assert_eq!(h.client.pushes().len(), 1);
    }
}

#[tokio::test]
async fn failing_test_step_aborts_before_any_network_call() {
    let h = harness(
        &["dev", "--version", "test", "--apikey", "apikey"],
        FakeClient::with_events(SIMPLE_STREAM),
        CountingTestStep::failing(),
    );
    let mut renderer = RecordingRenderer::default();

    let err = h.runner.run(&mut renderer).await.unwrap_err();

    assert!(matches!(err, PushError::Preflight(_)));
    assert_eq!(err.exit_code(), 1);
    assert!(h.client.logins().is_empty());
    assert!(h.client.pushes().is_empty());
}

#[tokio::test]
async fn staggered_layers_reach_full_aggregate_before_completion() {
    let h = harness(
        &["dev", "--version", "test"],
        FakeClient::with_events(&[
            r#"{"status": "Preparing", "progressDetail": {}, "id": "abc"}"#,
            r#"{"status": "Preparing", "progressDetail": {}, "id": "def"}"#,
            r#"{"status": "Preparing", "progressDetail": {}, "id": "egh"}"#,
            r#"{"status": "Pushing", "progressDetail": {"current": 512, "total": 24803}, "id": "abc"}"#,
            r#"{"status": "Layer already exists", "progressDetail": {}, "id": "def"}"#,
            r#"{"status": "Pushed", "progressDetail": {}, "id": "abc"}"#,
            r#"{"status": "Pushed", "progressDetail": {}, "id": "egh"}"#,
            r#"{"status": "Successfully pushed"}"#,
        ]),
        CountingTestStep::default(),
    );
    let mut renderer = RecordingRenderer::default();

    let summary = h.runner.run(&mut renderer).await.expect("push succeeds");

    assert_eq!(summary.layers_total, 3);
    assert_eq!(summary.layers_completed, 3);
    assert!(summary.saw_summary);

    let full = renderer
        .ops
        .iter()
        .position(|op| *op == Op::Aggregate(3, 3))
        .expect("aggregate reached 3/3");
    let finish = renderer
        .ops
        .iter()
        .position(|op| *op == Op::Finish)
        .expect("renderer finished");
    assert!(full < finish);
}

#[tokio::test]
async fn version_defaults_to_the_configured_one() {
    let h = harness(
        &["dev"],
        FakeClient::with_events(SIMPLE_STREAM),
        CountingTestStep::default(),
    );
    let mut renderer = RecordingRenderer::default();

    h.runner.run(&mut renderer).await.expect("push succeeds");

    assert_eq!(h.client.pushes()[0].1, "1.0");
    assert_eq!(h.test_step.calls(), vec![("dev".to_string(), "1.0".to_string())]);
}

#[tokio::test]
async fn mixed_auth_modes_are_rejected_up_front() {
    let result = Runner::new(
        args(&["dev", "--apikey", "key", "--username", "user", "--password", "p"]),
        config(),
        Box::new(FakeClient::default()),
        None,
    );
    match result {
        Err(err) => {
            assert!(matches!(err, PushError::Validation(_)));
            assert_eq!(err.exit_code(), 1);
        }
        Ok(_) => panic!("expected a validation error"),
    }
}
