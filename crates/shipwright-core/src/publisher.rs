//! Commit publishing: stage the assembled file set and force-push it.
//!
//! One commit per round, message `update round {round}`, history replaced
//! unconditionally. This pipeline is the sole writer of its repositories, so
//! force-push keeps replays and round 2 deterministic without any merge
//! strategy. A failed step aborts the request; retry is full request replay.

use std::path::Path;

use tracing::debug;

use crate::domain::error::Result;
use crate::domain::{RemoteRepository, StagedFileSet};
use crate::vcs::VcsClient;

/// Write the staged set into `dir` and push one commit that replaces the
/// remote default branch. The resulting commit SHA must be read back from the
/// remote by the caller; local state is not trusted.
pub fn publish(
    vcs: &dyn VcsClient,
    dir: &Path,
    files: &StagedFileSet,
    repository: &RemoteRepository,
    push_url: &str,
    round: u8,
) -> Result<()> {
    files.write_to(dir)?;

    vcs.init(dir)?;
    vcs.stage_all(dir)?;
    vcs.commit(dir, &format!("update round {round}"))?;
    vcs.set_branch(dir, &repository.default_branch)?;
    vcs.add_remote(dir, "origin", push_url)?;
    vcs.force_push(dir, "origin", &repository.default_branch)?;

    debug!(
        repo = %repository.identity,
        branch = %repository.default_branch,
        files = files.len(),
        "force-pushed staged file set"
    );
    Ok(())
}
