pub(crate) mod global;
pub(crate) mod local;

use crate::guard_error::GuardError;
use global::{GlobalRepositorySetting, SizeGuardGlobalConfig};
use local::RepositorySizeOverride;
use log::debug;
use std::path::{Path, PathBuf};

/// Source of truth for size-limit configuration.
///
/// Every check asks the provider again, so an admin change is visible to the
/// very next push or upload. Writes are last-writer-wins.
pub(crate) trait SettingsProvider {
    fn global_config(&self) -> Result<SizeGuardGlobalConfig, Box<GuardError>>;

    fn repo_override(&self, git_dir: &Path) -> Result<RepositorySizeOverride, Box<GuardError>>;

    fn save_global_setting(&self, setting: &GlobalRepositorySetting)
    -> Result<(), Box<GuardError>>;

    fn set_repo_size_limit(&self, git_dir: &Path, limit: i64) -> Result<(), Box<GuardError>>;

    fn set_repo_lfs_size_limit(&self, git_dir: &Path, limit: i64) -> Result<(), Box<GuardError>>;

    fn clear_repo_limits(&self, git_dir: &Path) -> Result<(), Box<GuardError>>;

    fn global_setting(&self) -> Result<GlobalRepositorySetting, Box<GuardError>> {
        Ok(self.global_config()?.repository)
    }
}

/// Global setting in a TOML file, overrides in each repository's git config.
pub(crate) struct FileSettingsStore {
    global_path: PathBuf,
}

impl FileSettingsStore {
    pub(crate) fn new(global_path: PathBuf) -> Self {
        debug!("Settings store using {}", global_path.display());
        FileSettingsStore { global_path }
    }

    pub(crate) fn global_path(&self) -> &Path {
        &self.global_path
    }
}

impl SettingsProvider for FileSettingsStore {
    fn global_config(&self) -> Result<SizeGuardGlobalConfig, Box<GuardError>> {
        SizeGuardGlobalConfig::load_global(&self.global_path)
    }

    fn repo_override(&self, git_dir: &Path) -> Result<RepositorySizeOverride, Box<GuardError>> {
        RepositorySizeOverride::load(git_dir)
    }

    fn save_global_setting(
        &self,
        setting: &GlobalRepositorySetting,
    ) -> Result<(), Box<GuardError>> {
        // Keep unrelated sections such as [lfs] intact.
        let mut config = self.global_config()?;
        config.repository = setting.clone();
        config.save_global(&self.global_path)
    }

    fn set_repo_size_limit(&self, git_dir: &Path, limit: i64) -> Result<(), Box<GuardError>> {
        RepositorySizeOverride::save_repo_size_limit(git_dir, limit)
    }

    fn set_repo_lfs_size_limit(&self, git_dir: &Path, limit: i64) -> Result<(), Box<GuardError>> {
        RepositorySizeOverride::save_lfs_size_limit(git_dir, limit)
    }

    fn clear_repo_limits(&self, git_dir: &Path) -> Result<(), Box<GuardError>> {
        RepositorySizeOverride::clear(git_dir)
    }
}

/// In-process store for tests that must not touch the filesystem config.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemorySettingsStore {
    global: std::sync::RwLock<SizeGuardGlobalConfig>,
    overrides: std::sync::RwLock<std::collections::HashMap<PathBuf, RepositorySizeOverride>>,
}

#[cfg(test)]
impl MemorySettingsStore {
    pub(crate) fn with_global(setting: GlobalRepositorySetting) -> Self {
        let store = MemorySettingsStore::default();
        store.global.write().unwrap().repository = setting;
        store
    }
}

#[cfg(test)]
impl SettingsProvider for MemorySettingsStore {
    fn global_config(&self) -> Result<SizeGuardGlobalConfig, Box<GuardError>> {
        Ok(self.global.read().unwrap().clone())
    }

    fn repo_override(&self, git_dir: &Path) -> Result<RepositorySizeOverride, Box<GuardError>> {
        Ok(self
            .overrides
            .read()
            .unwrap()
            .get(git_dir)
            .copied()
            .unwrap_or_default())
    }

    fn save_global_setting(
        &self,
        setting: &GlobalRepositorySetting,
    ) -> Result<(), Box<GuardError>> {
        self.global.write().unwrap().repository = setting.clone();
        Ok(())
    }

    fn set_repo_size_limit(&self, git_dir: &Path, limit: i64) -> Result<(), Box<GuardError>> {
        self.overrides
            .write()
            .unwrap()
            .entry(git_dir.to_path_buf())
            .or_default()
            .repo_size_limit = Some(limit);
        Ok(())
    }

    fn set_repo_lfs_size_limit(&self, git_dir: &Path, limit: i64) -> Result<(), Box<GuardError>> {
        self.overrides
            .write()
            .unwrap()
            .entry(git_dir.to_path_buf())
            .or_default()
            .lfs_size_limit = Some(limit);
        Ok(())
    }

    fn clear_repo_limits(&self, git_dir: &Path) -> Result<(), Box<GuardError>> {
        self.overrides.write().unwrap().remove(git_dir);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::EnforcementLevel;
    use git2::Repository;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_keeps_lfs_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[lfs]\nhref_base = \"https://git.example.com/lfs\"\n",
        )
        .unwrap();

        let store = FileSettingsStore::new(path);
        let setting = GlobalRepositorySetting {
            enabled: true,
            repo_size_limit: 65536,
            lfs_size_limit: 0,
            lfs_size_in_repo_size: false,
            enforcement: EnforcementLevel::Error,
        };
        store.save_global_setting(&setting).unwrap();

        let reloaded = store.global_config().unwrap();
        assert_eq!(reloaded.repository, setting);
        assert_eq!(reloaded.lfs.href_base, "https://git.example.com/lfs");
    }

    #[test]
    fn test_file_store_overrides_are_per_repository() {
        let dir = TempDir::new().unwrap();
        let first = Repository::init_bare(dir.path().join("first.git")).unwrap();
        let second = Repository::init_bare(dir.path().join("second.git")).unwrap();
        let store = FileSettingsStore::new(dir.path().join("config.toml"));

        store.set_repo_size_limit(first.path(), 1024).unwrap();
        assert_eq!(
            store.repo_override(first.path()).unwrap().repo_size_limit,
            Some(1024)
        );
        assert_eq!(store.repo_override(second.path()).unwrap().repo_size_limit, None);

        store.clear_repo_limits(first.path()).unwrap();
        assert_eq!(store.repo_override(first.path()).unwrap().repo_size_limit, None);
    }

    #[test]
    fn test_memory_store_last_writer_wins() {
        let store = MemorySettingsStore::default();
        let repo = Path::new("/srv/git/a.git");
        store.set_repo_lfs_size_limit(repo, 10).unwrap();
        store.set_repo_lfs_size_limit(repo, 20).unwrap();
        assert_eq!(store.repo_override(repo).unwrap().lfs_size_limit, Some(20));
        assert!(!store.global_setting().unwrap().enabled);
    }
}
