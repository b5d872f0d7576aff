//! Request orchestration.
//!
//! One [`Orchestrator`] handles every deployment request end to end:
//! `Validating → Provisioning → Publishing → Notifying → Done`, with
//! `Failed` terminal from any phase. The credential check runs before any
//! network or filesystem side effect; the scoped working area is released on
//! every exit path; the notification outcome never changes the request
//! outcome.

use std::sync::Arc;

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::assembler;
use crate::attachments;
use crate::auth::CredentialStore;
use crate::domain::error::Result;
use crate::domain::{
    DeployOutcome, DeployRequest, NotificationPayload, RemoteRepository, RepositoryIdentity,
};
use crate::hosting::HostingRemote;
use crate::notifier::{self, CallbackTransport, RetryPolicy};
use crate::provisioner;
use crate::publisher;
use crate::vcs::VcsClient;
use crate::workdir::Workdir;

/// Phases of a deployment request, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validating,
    Provisioning,
    Publishing,
    Notifying,
    Done,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Validating => "validating",
            Phase::Provisioning => "provisioning",
            Phase::Publishing => "publishing",
            Phase::Notifying => "notifying",
            Phase::Done => "done",
            Phase::Failed => "failed",
        }
    }
}

/// Top-level coordinator for deployment requests.
///
/// All collaborators are injected at construction; the orchestrator itself
/// holds no mutable state, so one instance serves concurrent requests.
pub struct Orchestrator {
    credentials: CredentialStore,
    remote: Arc<dyn HostingRemote>,
    vcs: Arc<dyn VcsClient>,
    callback: Arc<dyn CallbackTransport>,
    retry: RetryPolicy,
}

impl Orchestrator {
    pub fn new(
        credentials: CredentialStore,
        remote: Arc<dyn HostingRemote>,
        vcs: Arc<dyn VcsClient>,
        callback: Arc<dyn CallbackTransport>,
    ) -> Self {
        Self {
            credentials,
            remote,
            vcs,
            callback,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the evaluator retry policy (shorter delays in tests).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run one deployment request to completion.
    pub async fn deploy(&self, request: &DeployRequest) -> Result<DeployOutcome> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "deploy",
            %request_id,
            task = %request.task,
            round = request.round
        );
        async move {
            let result = self.deploy_inner(request).await;
            if let Err(err) = &result {
                error!(
                    phase = Phase::Failed.as_str(),
                    error = %err,
                    client_fault = err.client_fault(),
                    "deployment failed"
                );
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn deploy_inner(&self, request: &DeployRequest) -> Result<DeployOutcome> {
        info!(phase = Phase::Validating.as_str(), email = %request.email);
        self.credentials
            .authorize(&request.email, &request.secret)?;
        request.validate()?;

        info!(phase = Phase::Provisioning.as_str());
        let identity =
            RepositoryIdentity::derive(self.remote.owner_login(), &request.task, &request.nonce);
        let repository = provisioner::provision(self.remote.as_ref(), &identity, request.round)
            .await?;

        // The working area is scoped to this invocation: acquired here,
        // released after publish_and_notify on success and failure alike.
        let workdir = Workdir::create()?;
        let result = self
            .publish_and_notify(request, &identity, &repository, &workdir)
            .await;
        let failed = workdir.cleanup();
        if !failed.is_empty() {
            warn!(
                entries = failed.len(),
                "could not fully remove working area"
            );
        }
        result
    }

    async fn publish_and_notify(
        &self,
        request: &DeployRequest,
        identity: &RepositoryIdentity,
        repository: &RemoteRepository,
        workdir: &Workdir,
    ) -> Result<DeployOutcome> {
        info!(phase = Phase::Publishing.as_str(), repo = %identity);
        let materialized = attachments::materialize(&request.attachments)?;
        let files = assembler::assemble(
            &request.task,
            &request.brief,
            &materialized,
            &identity.owner,
        );
        let push_url = self.remote.push_url(identity);
        publisher::publish(
            self.vcs.as_ref(),
            workdir.path(),
            &files,
            repository,
            &push_url,
            request.round,
        )?;
        let commit_sha = self
            .remote
            .branch_head(identity, &repository.default_branch)
            .await?;

        match self.remote.enable_pages(identity).await {
            Ok(status) => info!(?status, "pages publishing confirmed"),
            Err(err) => warn!(error = %err, "could not enable pages publishing"),
        }

        info!(phase = Phase::Notifying.as_str());
        let payload = NotificationPayload {
            email: request.email.clone(),
            task: request.task.clone(),
            round: request.round,
            nonce: request.nonce.clone(),
            repo_url: repository.html_url.clone(),
            commit_sha: commit_sha.clone(),
            pages_url: identity.pages_url(),
        };
        let outcome = notifier::notify(
            self.callback.as_ref(),
            &self.retry,
            &request.evaluation_url,
            &payload,
        )
        .await;
        if !outcome.delivered {
            warn!(
                attempts = outcome.attempts,
                "evaluator unreachable; deployment is still successful"
            );
        }

        info!(phase = Phase::Done.as_str(), commit = %commit_sha);
        Ok(DeployOutcome {
            repo_url: repository.html_url.clone(),
            pages_url: identity.pages_url(),
            commit_sha,
            round: request.round,
            notified: outcome.delivered,
        })
    }
}
