//! Hosting remote seam and the GitHub implementation.
//!
//! The orchestrator only ever talks to [`HostingRemote`]; `GithubRemote` is
//! the production backend over the REST API. Status mapping: 404 means the
//! repository is absent (not an error), 401/403 are fatal rejections, and
//! transport failures plus 5xx are transient.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::domain::error::{DeployError, Result};
use crate::domain::{RemoteRepository, RepositoryIdentity};

/// Default branch name used for newly created repositories.
pub const DEFAULT_BRANCH: &str = "main";

/// Result of a Pages enablement call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagesStatus {
    Enabled,
    AlreadyEnabled,
}

/// Operations consumed from the code-hosting service.
#[async_trait]
pub trait HostingRemote: Send + Sync {
    /// Login of the account repositories are created under.
    fn owner_login(&self) -> &str;

    /// Fetch a repository by identity; `Ok(None)` when it does not exist.
    async fn fetch_repository(
        &self,
        identity: &RepositoryIdentity,
    ) -> Result<Option<RemoteRepository>>;

    /// Create a new public repository at the identity.
    async fn create_repository(&self, identity: &RepositoryIdentity) -> Result<RemoteRepository>;

    /// Authenticated push URL for the repository.
    fn push_url(&self, identity: &RepositoryIdentity) -> String;

    /// Head commit SHA of a branch, read back from the remote. The publish
    /// postcondition is verified through this call, never from local state.
    async fn branch_head(&self, identity: &RepositoryIdentity, branch: &str) -> Result<String>;

    /// Enable static-site publishing from the default branch root.
    async fn enable_pages(&self, identity: &RepositoryIdentity) -> Result<PagesStatus>;
}

/// GitHub REST API backend.
pub struct GithubRemote {
    http: reqwest::Client,
    token: String,
    login: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepoBody {
    #[serde(default = "default_branch_name")]
    default_branch: String,
    html_url: String,
}

fn default_branch_name() -> String {
    DEFAULT_BRANCH.to_string()
}

#[derive(Debug, Deserialize)]
struct BranchBody {
    commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    sha: String,
}

impl GithubRemote {
    /// Resolve the authenticated user and build a client against the public
    /// GitHub API.
    pub async fn connect(token: impl Into<String>) -> Result<Self> {
        Self::connect_to("https://api.github.com", token).await
    }

    /// Same as [`connect`](Self::connect) against an alternate API base
    /// (GitHub Enterprise style deployments).
    pub async fn connect_to(api_base: &str, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let http = reqwest::Client::builder()
            .user_agent(concat!("shipwright/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transient)?;

        let response = http
            .get(format!("{api_base}/user"))
            .bearer_auth(&token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(transient)?;
        if !response.status().is_success() {
            return Err(status_error("resolving authenticated user", response.status()));
        }
        let user: UserBody = response.json().await.map_err(transient)?;

        Ok(Self {
            http,
            token,
            login: user.login,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::GET, path)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::POST, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.api_base))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
    }
}

#[async_trait]
impl HostingRemote for GithubRemote {
    fn owner_login(&self) -> &str {
        &self.login
    }

    async fn fetch_repository(
        &self,
        identity: &RepositoryIdentity,
    ) -> Result<Option<RemoteRepository>> {
        let response = self
            .get(&format!("/repos/{}", identity.full_name()))
            .send()
            .await
            .map_err(transient)?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: RepoBody = response.json().await.map_err(transient)?;
                Ok(Some(RemoteRepository {
                    identity: identity.clone(),
                    default_branch: body.default_branch,
                    html_url: body.html_url,
                }))
            }
            status => Err(status_error("fetching repository", status)),
        }
    }

    async fn create_repository(&self, identity: &RepositoryIdentity) -> Result<RemoteRepository> {
        let response = self
            .post("/user/repos")
            .json(&serde_json::json!({ "name": identity.slug, "private": false }))
            .send()
            .await
            .map_err(transient)?;
        if !response.status().is_success() {
            return Err(status_error("creating repository", response.status()));
        }
        let body: RepoBody = response.json().await.map_err(transient)?;
        Ok(RemoteRepository {
            identity: identity.clone(),
            default_branch: body.default_branch,
            html_url: body.html_url,
        })
    }

    fn push_url(&self, identity: &RepositoryIdentity) -> String {
        format!(
            "https://{}@github.com/{}.git",
            self.token,
            identity.full_name()
        )
    }

    async fn branch_head(&self, identity: &RepositoryIdentity, branch: &str) -> Result<String> {
        let response = self
            .get(&format!("/repos/{}/branches/{branch}", identity.full_name()))
            .send()
            .await
            .map_err(transient)?;
        if !response.status().is_success() {
            return Err(status_error("reading branch head", response.status()));
        }
        let body: BranchBody = response.json().await.map_err(transient)?;
        Ok(body.commit.sha)
    }

    async fn enable_pages(&self, identity: &RepositoryIdentity) -> Result<PagesStatus> {
        let response = self
            .post(&format!("/repos/{}/pages", identity.full_name()))
            .json(&serde_json::json!({
                "source": { "branch": DEFAULT_BRANCH, "path": "/" }
            }))
            .send()
            .await
            .map_err(transient)?;
        match response.status() {
            StatusCode::CREATED => Ok(PagesStatus::Enabled),
            StatusCode::CONFLICT => Ok(PagesStatus::AlreadyEnabled),
            status => Err(status_error("enabling pages", status)),
        }
    }
}

fn transient(err: reqwest::Error) -> DeployError {
    DeployError::RemoteUnavailable(err.to_string())
}

/// Map an unexpected response status onto the error taxonomy.
fn status_error(context: &str, status: StatusCode) -> DeployError {
    if status.is_server_error() {
        DeployError::RemoteUnavailable(format!("{context}: status {status}"))
    } else {
        DeployError::RemoteRejected(format!("{context}: status {status}"))
    }
}
