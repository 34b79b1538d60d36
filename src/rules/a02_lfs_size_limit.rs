use crate::guard_error::{GuardError, GuardErrorWorkflowType, LimitExceeded, LimitKind};
use crate::policy::{EffectiveLimits, Limit};
use crate::repo_size::PendingTransfer;
use crate::rules::{EnforcementLevel, Rule, RuleOutput};

/// LFS upload check. The object itself must fit the LFS limit and, when LFS
/// bytes count toward the repository, the combined total must fit the
/// repository limit.
pub(crate) struct LfsSizeLimit {
    name: String,
    description: String,
    level: EnforcementLevel,
    repo: String,
    limits: EffectiveLimits,
    transfer: PendingTransfer,
}

impl LfsSizeLimit {
    pub(crate) fn new(repo: &str, limits: EffectiveLimits, transfer: PendingTransfer) -> Self {
        Self {
            name: "LfsSizeLimit".to_string(),
            description: "Reject LFS objects larger than the LFS limit or the remaining repository quota"
                .to_string(),
            level: limits.enforcement,
            repo: repo.to_string(),
            limits,
            transfer,
        }
    }
}

impl Rule for LfsSizeLimit {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn get_description(&self) -> &str {
        &self.description
    }

    fn get_level(&self) -> EnforcementLevel {
        self.level
    }

    fn get_repo(&self) -> &str {
        &self.repo
    }

    fn workflow_type(&self) -> GuardErrorWorkflowType {
        GuardErrorWorkflowType::Lfs
    }

    fn check(&self) -> Result<RuleOutput, Box<GuardError>> {
        let object_size = self.transfer.incoming_object_size_bytes;

        if self.transfer.is_lfs
            && let Limit::Bytes(lfs_limit) = self.limits.lfs_limit
            && object_size > lfs_limit
        {
            return Ok(RuleOutput::Exception(LimitExceeded {
                kind: LimitKind::Lfs,
                limit: lfs_limit,
                actual: object_size,
            }));
        }

        if self.limits.lfs_counts_in_repo
            && let Limit::Bytes(repo_limit) = self.limits.repo_limit
        {
            let prospective = self.transfer.prospective_repo_size(true);
            if prospective > repo_limit {
                return Ok(RuleOutput::Exception(LimitExceeded {
                    kind: LimitKind::Repository,
                    limit: repo_limit,
                    actual: prospective,
                }));
            }
        }

        Ok(RuleOutput::Success)
    }
}
