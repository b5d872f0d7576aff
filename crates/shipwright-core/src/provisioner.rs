//! Round-aware repository provisioning.

use tracing::info;

use crate::domain::error::{DeployError, Result};
use crate::domain::{RemoteRepository, RepositoryIdentity};
use crate::hosting::HostingRemote;

/// Resolve the target repository for a round.
///
/// Round 1 creates the repository when absent and reuses it when present, so
/// replayed round-1 requests converge instead of duplicate-erroring. Round 2
/// never originates a repository: absence is [`DeployError::RepositoryNotFound`].
pub async fn provision(
    remote: &dyn HostingRemote,
    identity: &RepositoryIdentity,
    round: u8,
) -> Result<RemoteRepository> {
    match remote.fetch_repository(identity).await? {
        Some(repository) => {
            if round == 1 {
                info!(repo = %identity, "repository already exists, reusing");
            }
            Ok(repository)
        }
        None if round == 1 => {
            info!(repo = %identity, "creating repository");
            remote.create_repository(identity).await
        }
        None => Err(DeployError::RepositoryNotFound(identity.full_name())),
    }
}
