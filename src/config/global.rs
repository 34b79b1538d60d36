use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, CONFIG_PATH_ENV, DEFAULT_LFS_HREF_BASE,
};
use crate::guard_error::{GuardError, GuardErrorWorkflowType, NO_CHECK, NO_REPO};
use crate::rules::EnforcementLevel;
use crate::size::deserialize_size;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Instance-wide configuration, shared by every repository on this host
/// (e.g. Linux/macOS: ~/.config/sizeguard/config.toml, Windows: %APPDATA%/sizeguard/config.toml).
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct SizeGuardGlobalConfig {
    #[serde(default)]
    pub repository: GlobalRepositorySetting,
    #[serde(default)]
    pub lfs: GlobalLfsSetting,
}

/// Default size limits applied to every repository without an override.
/// Limits `<= 0` are not enforced (`-1` unlimited, `0` unset).
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct GlobalRepositorySetting {
    /// Master switch; when off no limit is enforced anywhere
    pub enabled: bool,
    #[serde(deserialize_with = "deserialize_size")]
    pub repo_size_limit: i64,
    #[serde(deserialize_with = "deserialize_size")]
    pub lfs_size_limit: i64,
    /// Count stored LFS bytes toward `repo_size_limit`
    pub lfs_size_in_repo_size: bool,
    pub enforcement: EnforcementLevel,
}

impl Default for GlobalRepositorySetting {
    fn default() -> Self {
        Self {
            enabled: false,
            repo_size_limit: -1,
            lfs_size_limit: -1,
            lfs_size_in_repo_size: false,
            enforcement: EnforcementLevel::Error,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct GlobalLfsSetting {
    /// Prefix for upload/download hrefs returned from batch responses
    pub href_base: String,
}

impl Default for GlobalLfsSetting {
    fn default() -> Self {
        Self {
            href_base: DEFAULT_LFS_HREF_BASE.to_string(),
        }
    }
}

fn config_error(name: &str, message: &str) -> Box<GuardError> {
    Box::new(GuardError::new(
        name,
        message,
        GuardErrorWorkflowType::Config,
        NO_REPO,
        NO_CHECK,
    ))
}

impl SizeGuardGlobalConfig {
    /// Load the global config from `path`. A missing file yields defaults,
    /// an unreadable or invalid one is an error.
    pub fn load_global(path: &Path) -> Result<SizeGuardGlobalConfig, Box<GuardError>> {
        debug!("Global config - resolved path: {}", path.display());

        if !path.exists() {
            debug!(
                "Global config file not found at {}, using defaults",
                path.display()
            );
            return Ok(SizeGuardGlobalConfig::default());
        }

        let config_content = fs::read_to_string(path).map_err(|e| {
            config_error(
                "Failed to read global config file",
                &format!("Could not read {}: {}", path.display(), e),
            )
        })?;

        let config: SizeGuardGlobalConfig = toml::from_str(&config_content).map_err(|e| {
            config_error(
                "Failed to parse global config file",
                &format!("Invalid TOML in {}: {}", path.display(), e),
            )
        })?;

        debug!(
            "Global config loaded: enabled={} repo_size_limit={} lfs_size_limit={} lfs_size_in_repo_size={}",
            config.repository.enabled,
            config.repository.repo_size_limit,
            config.repository.lfs_size_limit,
            config.repository.lfs_size_in_repo_size
        );

        Ok(config)
    }

    /// Persist to `path` by writing a sibling temp file and renaming it over
    /// the target, so concurrent readers see either the old or the new file.
    pub fn save_global(&self, path: &Path) -> Result<(), Box<GuardError>> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                config_error(
                    "Failed to create config directory",
                    &format!("Could not create {}: {}", parent.display(), e),
                )
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            config_error("Failed to serialize global config", &e.to_string())
        })?;

        let tmp_path = path.with_extension(format!("toml.{}.tmp", std::process::id()));
        fs::write(&tmp_path, content).map_err(|e| {
            config_error(
                "Failed to write global config file",
                &format!("Could not write {}: {}", tmp_path.display(), e),
            )
        })?;
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            config_error(
                "Failed to write global config file",
                &format!("Could not replace {}: {}", path.display(), e),
            )
        })?;

        debug!("Global config saved to {}", path.display());
        Ok(())
    }

    /// Platform-appropriate path to the global config file
    /// $SIZEGUARD_CONFIG wins over everything else.
    /// Linux/macOS: $XDG_CONFIG_HOME/sizeguard/config.toml or ~/.config/sizeguard/config.toml
    /// Windows: %APPDATA%/sizeguard/config.toml
    pub fn find_global_config_path() -> PathBuf {
        if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV)
            && !explicit.is_empty()
        {
            debug!("Using {} for global config: {}", CONFIG_PATH_ENV, explicit);
            return PathBuf::from(explicit);
        }

        #[cfg(windows)]
        {
            if let Ok(appdata) = std::env::var("APPDATA") {
                let mut p = PathBuf::from(appdata);
                p.push(CONFIG_DIR_NAME);
                p.push(CONFIG_FILE_NAME);
                debug!("Using Windows APPDATA for global config: {}", p.display());
                return p;
            }
        }

        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            let mut p = PathBuf::from(xdg);
            p.push(CONFIG_DIR_NAME);
            p.push(CONFIG_FILE_NAME);
            debug!("Using XDG_CONFIG_HOME for global config: {}", p.display());
            return p;
        }

        let mut p = home::home_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push(".config");
        p.push(CONFIG_DIR_NAME);
        p.push(CONFIG_FILE_NAME);
        debug!(
            "Using default ~/.config path for global config: {}",
            p.display()
        );
        p
    }
}
