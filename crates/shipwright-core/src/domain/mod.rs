//! Domain types for deployment requests and derived repository identity.

pub mod error;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::error::{DeployError, Result};

/// An inbound attachment: a file name plus a self-describing encoded
/// payload (a data URI). Decoded bytes are opaque to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    /// Data URI carrying the file content. Evaluators send this field as
    /// `url`, hence the alias.
    #[serde(alias = "url")]
    pub data: String,
}

/// A deployment request as received on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployRequest {
    pub email: String,
    pub secret: String,
    pub task: String,
    pub brief: String,
    #[serde(default = "default_round")]
    pub round: u8,
    pub nonce: String,
    pub evaluation_url: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

fn default_round() -> u8 {
    1
}

impl DeployRequest {
    /// Check structural invariants: `round ∈ {1, 2}`, non-empty task and
    /// nonce. Attachment payloads are validated when materialized.
    pub fn validate(&self) -> Result<()> {
        if !(1..=2).contains(&self.round) {
            return Err(DeployError::InvalidRequest(format!(
                "round must be 1 or 2, got {}",
                self.round
            )));
        }
        if self.task.trim().is_empty() {
            return Err(DeployError::InvalidRequest("task must not be empty".into()));
        }
        if self.nonce.trim().is_empty() {
            return Err(DeployError::InvalidRequest("nonce must not be empty".into()));
        }
        Ok(())
    }
}

/// The stable repository identity derived from a request.
///
/// Never persisted; always recomputed from (owner, task, nonce) so that
/// replaying a request converges on the same repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryIdentity {
    pub owner: String,
    pub slug: String,
}

impl RepositoryIdentity {
    /// Derive the identity: `slug = lowercase(replace(task + "-" + nonce, " ", "-"))`.
    pub fn derive(owner: &str, task: &str, nonce: &str) -> Self {
        let slug = format!("{task}-{nonce}").replace(' ', "-").to_lowercase();
        Self {
            owner: owner.to_string(),
            slug,
        }
    }

    /// `owner/slug` as used by the hosting API.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.slug)
    }

    /// Public browsing URL of the repository.
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.slug)
    }

    /// Public static-hosting URL, derived deterministically.
    pub fn pages_url(&self) -> String {
        format!("https://{}.github.io/{}/", self.owner, self.slug)
    }
}

impl std::fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.slug)
    }
}

/// A repository as known by the hosting remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepository {
    pub identity: RepositoryIdentity,
    pub default_branch: String,
    pub html_url: String,
}

/// The deterministic file set staged for one deployment.
///
/// Ordered map from relative path to byte content. Owned by exactly one
/// orchestrator invocation; written into its scoped working area and
/// destroyed with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedFileSet {
    files: BTreeMap<String, Vec<u8>>,
}

impl StagedFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|b| b.as_slice())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(p, b)| (p.as_str(), b.as_slice()))
    }

    /// Write every file under `dir`, creating intermediate directories.
    /// Paths are relative by construction (attachment names are validated
    /// before they reach the set).
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        for (path, bytes) in &self.files {
            let target = dir.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, bytes)?;
        }
        Ok(())
    }
}

/// The payload delivered verbatim to the evaluation callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub email: String,
    pub task: String,
    pub round: u8,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

/// Result of a successful deployment, returned to the caller.
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub repo_url: String,
    pub pages_url: String,
    pub commit_sha: String,
    pub round: u8,
    /// Whether the evaluator acknowledged the notification. Informational
    /// only; a failed notification never fails the deployment.
    pub notified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_derivation_normalizes_spaces_and_case() {
        let identity = RepositoryIdentity::derive("octo", "hello world", "n1");
        assert_eq!(identity.slug, "hello-world-n1");
        assert_eq!(identity.full_name(), "octo/hello-world-n1");
        assert_eq!(identity.pages_url(), "https://octo.github.io/hello-world-n1/");
    }

    #[test]
    fn slug_derivation_lowercases_task_and_nonce() {
        let identity = RepositoryIdentity::derive("octo", "My Task", "N1");
        assert_eq!(identity.slug, "my-task-n1");
    }

    #[test]
    fn identity_is_recomputed_deterministically() {
        let a = RepositoryIdentity::derive("octo", "hello world", "n1");
        let b = RepositoryIdentity::derive("octo", "hello world", "n1");
        assert_eq!(a, b);
    }

    #[test]
    fn round_outside_range_is_rejected() {
        let mut request = sample_request();
        request.round = 3;
        assert!(request.validate().is_err());
        request.round = 0;
        assert!(request.validate().is_err());
        request.round = 2;
        assert!(request.validate().is_ok());
    }

    #[test]
    fn empty_task_or_nonce_is_rejected() {
        let mut request = sample_request();
        request.task = "  ".into();
        assert!(request.validate().is_err());

        let mut request = sample_request();
        request.nonce = String::new();
        assert!(request.validate().is_err());
    }

    #[test]
    fn round_defaults_to_one_on_the_wire() {
        let request: DeployRequest = serde_json::from_str(
            r#"{"email":"a@x.com","secret":"S","task":"hello world","brief":"hi",
                "nonce":"n1","evaluation_url":"http://eval.example/notify"}"#,
        )
        .unwrap();
        assert_eq!(request.round, 1);
        assert!(request.attachments.is_empty());
    }

    #[test]
    fn attachment_accepts_url_alias() {
        let attachment: Attachment =
            serde_json::from_str(r#"{"name":"a.bin","url":"data:application/octet-stream;base64,AA=="}"#)
                .unwrap();
        assert_eq!(attachment.data, "data:application/octet-stream;base64,AA==");
    }

    #[test]
    fn staged_file_set_round_trips_through_disk() {
        let mut files = StagedFileSet::new();
        files.insert("index.html", b"<html></html>".to_vec());
        files.insert("assets/logo.png", vec![0x89, 0x50]);

        let dir = tempfile::tempdir().unwrap();
        files.write_to(dir.path()).unwrap();

        assert_eq!(
            fs::read(dir.path().join("index.html")).unwrap(),
            b"<html></html>"
        );
        assert_eq!(
            fs::read(dir.path().join("assets/logo.png")).unwrap(),
            vec![0x89, 0x50]
        );
    }

    fn sample_request() -> DeployRequest {
        DeployRequest {
            email: "a@x.com".into(),
            secret: "S".into(),
            task: "hello world".into(),
            brief: "hi".into(),
            round: 1,
            nonce: "n1".into(),
            evaluation_url: "http://eval.example/notify".into(),
            attachments: Vec::new(),
        }
    }
}
