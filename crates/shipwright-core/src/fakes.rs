//! In-memory fakes for the hosting, VCS, and callback seams (testing only).
//!
//! All fakes record their calls so tests can assert ordering properties such
//! as "no side effect before authorization".

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::error::{DeployError, Result};
use crate::domain::{NotificationPayload, RemoteRepository, RepositoryIdentity};
use crate::hosting::{HostingRemote, PagesStatus, DEFAULT_BRANCH};
use crate::notifier::{CallbackTransport, TransportError};
use crate::vcs::{VcsClient, VcsError};

const FAKE_HEAD_SHA: &str = "0123456789abcdef0123456789abcdef01234567";

// ---------------------------------------------------------------------------
// MemoryRemote
// ---------------------------------------------------------------------------

/// In-memory hosting remote backed by a map of full name to repository.
pub struct MemoryRemote {
    login: String,
    repos: Mutex<HashMap<String, RemoteRepository>>,
    heads: Mutex<HashMap<String, String>>,
    pages: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    unreachable: AtomicBool,
    pages_failing: AtomicBool,
}

impl MemoryRemote {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            repos: Mutex::new(HashMap::new()),
            heads: Mutex::new(HashMap::new()),
            pages: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            unreachable: AtomicBool::new(false),
            pages_failing: AtomicBool::new(false),
        }
    }

    /// Pre-create a repository, as if a prior round had run.
    pub fn seed_repository(&self, identity: &RepositoryIdentity) {
        let repo = RemoteRepository {
            identity: identity.clone(),
            default_branch: DEFAULT_BRANCH.to_string(),
            html_url: identity.html_url(),
        };
        self.repos
            .lock()
            .unwrap()
            .insert(identity.full_name(), repo);
    }

    /// Fix the SHA reported for a repository's branch head.
    pub fn set_head(&self, identity: &RepositoryIdentity, sha: impl Into<String>) {
        self.heads
            .lock()
            .unwrap()
            .insert(identity.full_name(), sha.into());
    }

    /// When set, every operation fails as transient.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// When set, only `enable_pages` fails (everything else succeeds).
    pub fn set_pages_failing(&self, failing: bool) {
        self.pages_failing.store(failing, Ordering::SeqCst);
    }

    pub fn repository_count(&self) -> usize {
        self.repos.lock().unwrap().len()
    }

    pub fn pages_enabled(&self, identity: &RepositoryIdentity) -> bool {
        self.pages.lock().unwrap().contains(&identity.full_name())
    }

    /// Every operation performed, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DeployError::RemoteUnavailable(
                "fake remote is unreachable".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl HostingRemote for MemoryRemote {
    fn owner_login(&self) -> &str {
        &self.login
    }

    async fn fetch_repository(
        &self,
        identity: &RepositoryIdentity,
    ) -> Result<Option<RemoteRepository>> {
        self.record(format!("fetch {}", identity.full_name()))?;
        Ok(self.repos.lock().unwrap().get(&identity.full_name()).cloned())
    }

    async fn create_repository(&self, identity: &RepositoryIdentity) -> Result<RemoteRepository> {
        self.record(format!("create {}", identity.full_name()))?;
        let repo = RemoteRepository {
            identity: identity.clone(),
            default_branch: DEFAULT_BRANCH.to_string(),
            html_url: identity.html_url(),
        };
        self.repos
            .lock()
            .unwrap()
            .insert(identity.full_name(), repo.clone());
        Ok(repo)
    }

    fn push_url(&self, identity: &RepositoryIdentity) -> String {
        format!("https://fake-token@github.com/{}.git", identity.full_name())
    }

    async fn branch_head(&self, identity: &RepositoryIdentity, branch: &str) -> Result<String> {
        self.record(format!("branch_head {} {branch}", identity.full_name()))?;
        Ok(self
            .heads
            .lock()
            .unwrap()
            .get(&identity.full_name())
            .cloned()
            .unwrap_or_else(|| FAKE_HEAD_SHA.to_string()))
    }

    async fn enable_pages(&self, identity: &RepositoryIdentity) -> Result<PagesStatus> {
        self.record(format!("enable_pages {}", identity.full_name()))?;
        if self.pages_failing.load(Ordering::SeqCst) {
            return Err(DeployError::RemoteRejected(
                "enabling pages: status 400".into(),
            ));
        }
        if self.pages.lock().unwrap().insert(identity.full_name()) {
            Ok(PagesStatus::Enabled)
        } else {
            Ok(PagesStatus::AlreadyEnabled)
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingVcs
// ---------------------------------------------------------------------------

/// VCS fake that records operations and snapshots the working tree on
/// `stage_all`, so tests can inspect what would have been committed.
#[derive(Default)]
pub struct RecordingVcs {
    ops: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
    staged: Mutex<Option<BTreeMap<String, Vec<u8>>>>,
}

impl RecordingVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named operation (`init`, `commit`, ...) fail.
    pub fn fail_on(&self, op: &str) {
        *self.fail_on.lock().unwrap() = Some(op.to_string());
    }

    /// Operations performed so far, in order, with their arguments.
    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    /// The working tree content captured by the most recent `stage_all`.
    pub fn staged_files(&self) -> Option<BTreeMap<String, Vec<u8>>> {
        self.staged.lock().unwrap().clone()
    }

    fn record(&self, name: &str, op: String) -> std::result::Result<(), VcsError> {
        if self.fail_on.lock().unwrap().as_deref() == Some(name) {
            return Err(VcsError::Failed {
                command: op,
                stderr: "injected failure".into(),
            });
        }
        self.ops.lock().unwrap().push(op);
        Ok(())
    }
}

impl VcsClient for RecordingVcs {
    fn init(&self, _dir: &Path) -> std::result::Result<(), VcsError> {
        self.record("init", "init".into())
    }

    fn stage_all(&self, dir: &Path) -> std::result::Result<(), VcsError> {
        self.record("stage_all", "stage_all".into())?;
        let mut tree = BTreeMap::new();
        read_tree(dir, dir, &mut tree);
        *self.staged.lock().unwrap() = Some(tree);
        Ok(())
    }

    fn commit(&self, _dir: &Path, message: &str) -> std::result::Result<(), VcsError> {
        self.record("commit", format!("commit {message}"))
    }

    fn set_branch(&self, _dir: &Path, branch: &str) -> std::result::Result<(), VcsError> {
        self.record("set_branch", format!("set_branch {branch}"))
    }

    fn add_remote(&self, _dir: &Path, name: &str, url: &str) -> std::result::Result<(), VcsError> {
        self.record("add_remote", format!("add_remote {name} {url}"))
    }

    fn force_push(
        &self,
        _dir: &Path,
        remote: &str,
        branch: &str,
    ) -> std::result::Result<(), VcsError> {
        self.record("force_push", format!("force_push {remote} {branch}"))
    }
}

fn read_tree(root: &Path, dir: &Path, tree: &mut BTreeMap<String, Vec<u8>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            read_tree(root, &path, tree);
        } else if let Ok(bytes) = std::fs::read(&path) {
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            tree.insert(relative, bytes);
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedCallback
// ---------------------------------------------------------------------------

/// Scripted outcome for one callback attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedResponse {
    Status(u16),
    NetworkError,
}

/// Callback transport that plays back a script of responses, then repeats a
/// fallback. Records every delivery.
pub struct ScriptedCallback {
    script: Mutex<VecDeque<ScriptedResponse>>,
    fallback: ScriptedResponse,
    deliveries: Mutex<Vec<(String, NotificationPayload)>>,
}

impl ScriptedCallback {
    pub fn always(status: u16) -> Self {
        Self::sequence(Vec::new(), ScriptedResponse::Status(status))
    }

    pub fn sequence(script: Vec<ScriptedResponse>, fallback: ScriptedResponse) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            deliveries: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }

    pub fn deliveries(&self) -> Vec<(String, NotificationPayload)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallbackTransport for ScriptedCallback {
    async fn post(
        &self,
        url: &str,
        payload: &NotificationPayload,
        _timeout: Duration,
    ) -> std::result::Result<u16, TransportError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));
        let response = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        match response {
            ScriptedResponse::Status(status) => Ok(status),
            ScriptedResponse::NetworkError => {
                Err(TransportError("scripted connection failure".into()))
            }
        }
    }
}
