use crate::guard_error::{GuardError, GuardErrorWorkflowType, LimitExceeded, LimitKind};
use crate::policy::{EffectiveLimits, Limit};
use crate::repo_size::PendingTransfer;
use crate::rules::{EnforcementLevel, Rule, RuleOutput};

/// Pre-receive check: the repository must stay within its size limit once
/// the pushed objects land.
pub(crate) struct RepoSizeLimit {
    name: String,
    description: String,
    level: EnforcementLevel,
    repo: String,
    limits: EffectiveLimits,
    transfer: PendingTransfer,
}

impl RepoSizeLimit {
    pub(crate) fn new(repo: &str, limits: EffectiveLimits, transfer: PendingTransfer) -> Self {
        Self {
            name: "RepoSizeLimit".to_string(),
            description: "Reject pushes that would grow the repository past its size limit"
                .to_string(),
            level: limits.enforcement,
            repo: repo.to_string(),
            limits,
            transfer,
        }
    }
}

impl Rule for RepoSizeLimit {
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
        GuardErrorWorkflowType::PreReceive
    }

    fn check(&self) -> Result<RuleOutput, Box<GuardError>> {
        let Limit::Bytes(limit) = self.limits.repo_limit else {
            return Ok(RuleOutput::Success);
        };

        // Deleting refs or re-pointing them at existing objects never adds
        // bytes, so it stays possible to shrink an oversized repository.
        if self.transfer.incoming_object_size_bytes == 0 {
            return Ok(RuleOutput::Success);
        }

        let prospective = self
            .transfer
            .prospective_repo_size(self.limits.lfs_counts_in_repo);
        if prospective > limit {
            Ok(RuleOutput::Exception(LimitExceeded {
                kind: LimitKind::Repository,
                limit,
                actual: prospective,
            }))
        } else {
            Ok(RuleOutput::Success)
        }
    }
}
