use crate::config::SettingsProvider;
use crate::config::global::GlobalRepositorySetting;
use crate::config::local::RepositorySizeOverride;
use crate::guard_error::GuardError;
use crate::rules::EnforcementLevel;
use crate::size::format_size;
use log::debug;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Limit {
    Unlimited,
    Bytes(u64),
}

impl Limit {
    /// Map a configured value onto a limit; anything `<= 0` is not enforced.
    pub(crate) fn from_setting(value: i64) -> Self {
        if value > 0 {
            Limit::Bytes(value as u64)
        } else {
            Limit::Unlimited
        }
    }

    pub(crate) fn is_enforced(&self) -> bool {
        matches!(self, Limit::Bytes(_))
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Unlimited => f.write_str("unlimited"),
            Limit::Bytes(bytes) => write!(f, "{} ({} bytes)", format_size(*bytes), bytes),
        }
    }
}

/// Limits in force for one repository at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EffectiveLimits {
    pub repo_limit: Limit,
    pub lfs_limit: Limit,
    pub lfs_counts_in_repo: bool,
    pub enforcement: EnforcementLevel,
}

impl EffectiveLimits {
    pub(crate) fn unlimited() -> Self {
        EffectiveLimits {
            repo_limit: Limit::Unlimited,
            lfs_limit: Limit::Unlimited,
            lfs_counts_in_repo: false,
            enforcement: EnforcementLevel::Skip,
        }
    }

    /// Whether any check could possibly reject a transfer.
    pub(crate) fn any_enforced(&self) -> bool {
        self.enforcement != EnforcementLevel::Skip
            && (self.repo_limit.is_enforced() || self.lfs_limit.is_enforced())
    }
}

pub(crate) struct SizeLimitPolicy;

impl SizeLimitPolicy {
    /// Two-tier lookup: a set, non-zero override replaces the global value
    /// outright. Each limit is resolved on its own.
    pub(crate) fn resolve(
        global: &GlobalRepositorySetting,
        repo_override: &RepositorySizeOverride,
    ) -> EffectiveLimits {
        if !global.enabled {
            return EffectiveLimits::unlimited();
        }

        EffectiveLimits {
            repo_limit: Self::pick(repo_override.repo_size_limit, global.repo_size_limit),
            lfs_limit: Self::pick(repo_override.lfs_size_limit, global.lfs_size_limit),
            lfs_counts_in_repo: global.lfs_size_in_repo_size,
            enforcement: global.enforcement,
        }
    }

    fn pick(repo_value: Option<i64>, global_value: i64) -> Limit {
        match repo_value {
            Some(value) if value != 0 => Limit::from_setting(value),
            _ => Limit::from_setting(global_value),
        }
    }

    /// Read both tiers from `store` and resolve them. Never cached: callers
    /// run this once per push or upload attempt.
    pub(crate) fn for_repository(
        store: &dyn SettingsProvider,
        git_dir: &Path,
    ) -> Result<EffectiveLimits, Box<GuardError>> {
        let global = store.global_setting()?;
        let repo_override = store.repo_override(git_dir)?;
        let limits = Self::resolve(&global, &repo_override);
        debug!(
            "Effective limits for {}: repo={} lfs={} lfs_in_repo={} enforcement={:?}",
            git_dir.display(),
            limits.repo_limit,
            limits.lfs_limit,
            limits.lfs_counts_in_repo,
            limits.enforcement
        );
        Ok(limits)
    }
}
