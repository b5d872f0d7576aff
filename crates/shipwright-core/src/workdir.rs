//! Scoped per-request working area.
//!
//! Each orchestrator invocation owns exactly one working directory at a
//! uniquely generated path, so concurrent requests can never collide.
//! `cleanup` removes the tree entry by entry and reports what it could not
//! remove instead of failing; dropping the handle without calling it still
//! removes the tree best-effort.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Exclusive working directory for one deployment request.
#[derive(Debug)]
pub struct Workdir {
    path: PathBuf,
    cleaned: bool,
}

impl Workdir {
    /// Create a fresh working directory under the system temp root.
    pub fn create() -> std::io::Result<Self> {
        let path = std::env::temp_dir().join(format!("shipwright-{}", Uuid::new_v4()));
        fs::create_dir_all(&path)?;
        Ok(Self {
            path,
            cleaned: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the tree, tolerating per-entry failures. Returns the entries
    /// that could not be removed so the caller can log them.
    pub fn cleanup(mut self) -> Vec<PathBuf> {
        self.cleaned = true;
        let mut failed = Vec::new();
        remove_tree(&self.path, &mut failed);
        failed
    }
}

impl Drop for Workdir {
    fn drop(&mut self) {
        if !self.cleaned {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}

fn remove_tree(path: &Path, failed: &mut Vec<PathBuf>) {
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            let child = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                remove_tree(&child, failed);
            } else if fs::remove_file(&child).is_err() {
                failed.push(child);
            }
        }
    }
    if fs::remove_dir(path).is_err() && path.exists() {
        failed.push(path.to_path_buf());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_yields_an_empty_unique_directory() {
        let a = Workdir::create().unwrap();
        let b = Workdir::create().unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().is_dir());
        assert_eq!(fs::read_dir(a.path()).unwrap().count(), 0);
    }

    #[test]
    fn cleanup_removes_nested_content() {
        let workdir = Workdir::create().unwrap();
        let root = workdir.path().to_path_buf();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/b/file.txt"), "x").unwrap();
        fs::write(root.join("top.txt"), "y").unwrap();

        let failed = workdir.cleanup();
        assert!(failed.is_empty());
        assert!(!root.exists());
    }

    #[test]
    fn drop_removes_the_tree_as_a_backstop() {
        let root;
        {
            let workdir = Workdir::create().unwrap();
            root = workdir.path().to_path_buf();
            fs::write(root.join("file.txt"), "x").unwrap();
        }
        assert!(!root.exists());
    }
}
