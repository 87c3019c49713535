/// Workspace management for episode-scoped artifacts
///
/// Every evaluation call gets its own uniquely named directory, so
/// concurrent evaluators sharing a profile never collide on source or
/// artifact filenames.
use crate::config::types::{EnvError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Scratch directory owned by a single evaluation call.
pub struct EpisodeWorkspace {
    episode_id: String,
    dir: PathBuf,
}

impl EpisodeWorkspace {
    fn new(base_dir: &Path) -> Result<Self> {
        let episode_id = Uuid::new_v4().to_string();
        let dir = base_dir.join(&episode_id);

        fs::create_dir_all(&dir).map_err(|e| {
            EnvError::Workspace(format!(
                "failed to create episode directory {}: {e}",
                dir.display()
            ))
        })?;

        Ok(Self { episode_id, dir })
    }

    pub fn episode_id(&self) -> &str {
        &self.episode_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the submitted source verbatim, overwriting any prior content.
    /// The file handle is scoped to this call and closed on every path.
    pub fn write_source(&self, filename: &str, source_code: &str) -> Result<PathBuf> {
        let path = self.dir.join(filename);
        fs::write(&path, source_code).map_err(|e| {
            EnvError::Workspace(format!(
                "failed to write source file {}: {e}",
                path.display()
            ))
        })?;
        Ok(path)
    }

    /// Remove the episode directory and everything in it (idempotent).
    pub fn cleanup(&self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).map_err(|e| {
                EnvError::Workspace(format!(
                    "failed to remove episode directory {}: {e}",
                    self.dir.display()
                ))
            })?;
        }
        Ok(())
    }
}

impl Drop for EpisodeWorkspace {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            log::warn!("episode workspace cleanup failed: {e}");
        }
    }
}

/// Creates episode workspaces under a common base directory.
pub struct WorkspaceManager {
    base_dir: PathBuf,
}

impl WorkspaceManager {
    /// Runtime root scoped by effective UID, so different users on a shared
    /// host never collide under the system temp directory.
    pub fn runtime_root_dir() -> PathBuf {
        let euid = unsafe { libc::geteuid() };
        std::env::temp_dir().join(format!("rewardbox-uid-{euid}"))
    }

    /// Manager rooted at the default per-UID runtime directory.
    pub fn new() -> Result<Self> {
        Self::at(Self::runtime_root_dir())
    }

    /// Manager rooted at an explicit base directory (used by tests).
    pub fn at(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir).map_err(|e| {
            EnvError::Workspace(format!(
                "failed to create workspace base directory {}: {e}",
                base_dir.display()
            ))
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn create_workspace(&self) -> Result<EpisodeWorkspace> {
        EpisodeWorkspace::new(&self.base_dir)
    }

    /// Remove leftover episode directories older than `max_age`. Leftovers
    /// only appear when a prior process died before its Drop ran.
    pub fn cleanup_stale(&self, max_age: std::time::Duration) -> Result<usize> {
        let mut cleaned = 0;
        let now = std::time::SystemTime::now();

        if !self.base_dir.exists() {
            return Ok(0);
        }

        for entry in fs::read_dir(&self.base_dir)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("failed to read workspace entry: {e}");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let age = fs::metadata(&path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());

            if matches!(age, Some(age) if age > max_age) {
                log::info!("removing stale episode workspace {}", path.display());
                match fs::remove_dir_all(&path) {
                    Ok(()) => cleaned += 1,
                    Err(e) => log::warn!(
                        "failed to remove stale workspace {}: {e}",
                        path.display()
                    ),
                }
            }
        }

        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn workspace_creates_and_cleans_episode_dir() {
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::at(base.path().to_path_buf()).unwrap();

        let workspace = manager.create_workspace().unwrap();
        let dir = workspace.dir().to_path_buf();
        assert!(dir.exists());

        workspace.cleanup().unwrap();
        assert!(!dir.exists());
        // Idempotent.
        workspace.cleanup().unwrap();
    }

    #[test]
    fn source_write_overwrites_prior_content() {
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::at(base.path().to_path_buf()).unwrap();
        let workspace = manager.create_workspace().unwrap();

        let path = workspace.write_source("solution.c", "first").unwrap();
        workspace.write_source("solution.c", "second").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "second");
    }

    #[test]
    fn concurrent_workspaces_never_share_a_directory() {
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::at(base.path().to_path_buf()).unwrap();

        let a = manager.create_workspace().unwrap();
        let b = manager.create_workspace().unwrap();
        assert_ne!(a.dir(), b.dir());
        assert_ne!(a.episode_id(), b.episode_id());
    }

    #[test]
    fn drop_removes_the_episode_dir() {
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::at(base.path().to_path_buf()).unwrap();

        let dir = {
            let workspace = manager.create_workspace().unwrap();
            workspace.dir().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[test]
    fn stale_sweep_ignores_fresh_workspaces() {
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::at(base.path().to_path_buf()).unwrap();
        let workspace = manager.create_workspace().unwrap();

        let cleaned = manager.cleanup_stale(Duration::from_secs(3600)).unwrap();
        assert_eq!(cleaned, 0);
        assert!(workspace.dir().exists());
    }
}
