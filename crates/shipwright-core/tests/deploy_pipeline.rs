//! End-to-end orchestrator tests over the in-memory fakes.

use std::sync::Arc;

use shipwright_core::fakes::{MemoryRemote, RecordingVcs, ScriptedCallback};
use shipwright_core::{
    Attachment, CredentialStore, DeployError, DeployRequest, HostingRemote, Orchestrator,
    RepositoryIdentity,
};

fn request(round: u8) -> DeployRequest {
    DeployRequest {
        email: "a@x.com".into(),
        secret: "S".into(),
        task: "hello world".into(),
        brief: "hi".into(),
        round,
        nonce: "n1".into(),
        evaluation_url: "http://eval.example/notify".into(),
        attachments: Vec::new(),
    }
}

struct Harness {
    remote: Arc<MemoryRemote>,
    vcs: Arc<RecordingVcs>,
    callback: Arc<ScriptedCallback>,
    orchestrator: Orchestrator,
}

fn harness(callback: ScriptedCallback) -> Harness {
    let remote = Arc::new(MemoryRemote::new("octo"));
    let vcs = Arc::new(RecordingVcs::new());
    let callback = Arc::new(callback);
    let credentials = CredentialStore::from_pairs([("a@x.com", "S")]);
    let orchestrator = Orchestrator::new(
        credentials,
        remote.clone(),
        vcs.clone(),
        callback.clone(),
    );
    Harness {
        remote,
        vcs,
        callback,
        orchestrator,
    }
}

#[tokio::test]
async fn round_one_creates_and_publishes() {
    let h = harness(ScriptedCallback::always(200));
    let identity = RepositoryIdentity::derive("octo", "hello world", "n1");
    assert!(h.remote.fetch_repository(&identity).await.unwrap().is_none());

    let outcome = h.orchestrator.deploy(&request(1)).await.unwrap();

    assert_eq!(outcome.pages_url, "https://octo.github.io/hello-world-n1/");
    assert_eq!(outcome.repo_url, "https://github.com/octo/hello-world-n1");
    assert_eq!(outcome.round, 1);
    assert!(outcome.notified);
    assert!(h.remote.fetch_repository(&identity).await.unwrap().is_some());
    assert!(h.remote.pages_enabled(&identity));

    let ops = h.vcs.ops();
    assert!(ops.contains(&"commit update round 1".to_string()));
    assert_eq!(ops.last().unwrap(), "force_push origin main");
}

#[tokio::test]
async fn round_one_replay_converges_on_the_same_repository() {
    let h = harness(ScriptedCallback::always(200));
    let identity = RepositoryIdentity::derive("octo", "hello world", "n1");
    h.remote.seed_repository(&identity);

    let outcome = h.orchestrator.deploy(&request(1)).await.unwrap();

    assert_eq!(outcome.pages_url, "https://octo.github.io/hello-world-n1/");
    assert_eq!(h.remote.repository_count(), 1);
    // The replay still force-pushed its own content: last writer wins.
    assert!(h.vcs.ops().contains(&"force_push origin main".to_string()));
}

#[tokio::test]
async fn round_two_without_repository_fails_before_any_commit() {
    let h = harness(ScriptedCallback::always(200));

    let err = h.orchestrator.deploy(&request(2)).await.unwrap_err();

    assert!(matches!(err, DeployError::RepositoryNotFound(_)));
    assert!(h.vcs.ops().is_empty());
    assert_eq!(h.callback.attempts(), 0);
}

#[tokio::test]
async fn round_two_updates_the_existing_repository() {
    let h = harness(ScriptedCallback::always(200));
    let identity = RepositoryIdentity::derive("octo", "hello world", "n1");
    h.remote.seed_repository(&identity);
    h.remote.set_head(&identity, "feedface");

    let outcome = h.orchestrator.deploy(&request(2)).await.unwrap();

    assert_eq!(outcome.round, 2);
    assert_eq!(outcome.commit_sha, "feedface");
    assert!(h.vcs.ops().contains(&"commit update round 2".to_string()));
}

#[tokio::test]
async fn credential_mismatch_rejects_before_any_side_effect() {
    let h = harness(ScriptedCallback::always(200));
    let mut bad = request(1);
    bad.secret = "WRONG".into();

    let err = h.orchestrator.deploy(&bad).await.unwrap_err();

    assert!(matches!(err, DeployError::Unauthorized(_)));
    assert!(h.remote.calls().is_empty());
    assert!(h.vcs.ops().is_empty());
    assert_eq!(h.callback.attempts(), 0);
}

#[tokio::test]
async fn invalid_round_rejects_before_any_side_effect() {
    let h = harness(ScriptedCallback::always(200));
    let mut bad = request(1);
    bad.round = 7;

    let err = h.orchestrator.deploy(&bad).await.unwrap_err();

    assert!(matches!(err, DeployError::InvalidRequest(_)));
    assert!(h.remote.calls().is_empty());
    assert!(h.vcs.ops().is_empty());
}

#[tokio::test(start_paused = true)]
async fn exhausted_notification_does_not_fail_the_deployment() {
    let h = harness(ScriptedCallback::always(500));

    let outcome = h.orchestrator.deploy(&request(1)).await.unwrap();

    assert!(!outcome.notified);
    assert_eq!(h.callback.attempts(), 5);
    assert_eq!(outcome.pages_url, "https://octo.github.io/hello-world-n1/");
}

#[tokio::test]
async fn pages_enablement_failure_does_not_fail_the_deployment() {
    let h = harness(ScriptedCallback::always(200));
    h.remote.set_pages_failing(true);
    let identity = RepositoryIdentity::derive("octo", "hello world", "n1");

    let outcome = h.orchestrator.deploy(&request(1)).await.unwrap();

    assert_eq!(outcome.pages_url, "https://octo.github.io/hello-world-n1/");
    assert_eq!(outcome.repo_url, "https://github.com/octo/hello-world-n1");
    assert!(outcome.notified);
    // The enablement call was made, failed, and was absorbed.
    assert!(h
        .remote
        .calls()
        .contains(&"enable_pages octo/hello-world-n1".to_string()));
    assert!(!h.remote.pages_enabled(&identity));
}

#[tokio::test]
async fn notification_payload_carries_the_deployment_result() {
    let h = harness(ScriptedCallback::always(200));
    let identity = RepositoryIdentity::derive("octo", "hello world", "n1");
    h.remote.seed_repository(&identity);
    h.remote.set_head(&identity, "cafef00d");

    h.orchestrator.deploy(&request(2)).await.unwrap();

    let deliveries = h.callback.deliveries();
    assert_eq!(deliveries.len(), 1);
    let (url, payload) = &deliveries[0];
    assert_eq!(url, "http://eval.example/notify");
    assert_eq!(payload.email, "a@x.com");
    assert_eq!(payload.task, "hello world");
    assert_eq!(payload.round, 2);
    assert_eq!(payload.nonce, "n1");
    assert_eq!(payload.repo_url, "https://github.com/octo/hello-world-n1");
    assert_eq!(payload.commit_sha, "cafef00d");
    assert_eq!(payload.pages_url, "https://octo.github.io/hello-world-n1/");
}

#[tokio::test]
async fn attachments_round_trip_into_the_staged_tree() {
    let h = harness(ScriptedCallback::always(200));
    let mut req = request(1);
    req.attachments = vec![Attachment {
        name: "hello.bin".into(),
        // "Hello" base64-encoded
        data: "data:application/octet-stream;base64,SGVsbG8=".into(),
    }];

    h.orchestrator.deploy(&req).await.unwrap();

    let staged = h.vcs.staged_files().expect("stage_all snapshot");
    assert_eq!(staged.get("hello.bin").unwrap(), b"Hello");
    assert!(staged.contains_key("index.html"));
    assert!(staged.contains_key("README.md"));
    assert!(staged.contains_key("LICENSE"));
}

#[tokio::test]
async fn bad_attachment_fails_the_request_as_client_fault() {
    let h = harness(ScriptedCallback::always(200));
    let mut req = request(1);
    req.attachments = vec![Attachment {
        name: "../escape".into(),
        data: "data:application/octet-stream;base64,AA==".into(),
    }];

    let err = h.orchestrator.deploy(&req).await.unwrap_err();

    assert!(err.client_fault());
    assert!(h.vcs.ops().is_empty());
}
