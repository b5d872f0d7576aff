//! Shipwright core library
//!
//! The round-aware idempotent provisioning and delivery pipeline: derive a
//! stable repository identity from a deployment request, create or fetch the
//! repository depending on the round, publish a deterministic file set with
//! force-push semantics, and notify the evaluator with bounded retry.

pub mod assembler;
pub mod attachments;
pub mod auth;
pub mod domain;
pub mod fakes;
pub mod hosting;
pub mod notifier;
pub mod orchestrator;
pub mod provisioner;
pub mod publisher;
pub mod telemetry;
pub mod vcs;
pub mod workdir;

pub use auth::CredentialStore;
pub use domain::error::{DeployError, Result};
pub use domain::{
    Attachment, DeployOutcome, DeployRequest, NotificationPayload, RemoteRepository,
    RepositoryIdentity, StagedFileSet,
};
pub use hosting::{GithubRemote, HostingRemote, PagesStatus, DEFAULT_BRANCH};
pub use notifier::{
    notify, CallbackTransport, HttpCallback, NotificationOutcome, RetryPolicy, TransportError,
};
pub use orchestrator::{Orchestrator, Phase};
pub use provisioner::provision;
pub use publisher::publish;
pub use telemetry::init_tracing;
pub use vcs::{GitCli, VcsClient, VcsError};
pub use workdir::Workdir;

/// Shipwright version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
