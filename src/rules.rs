use clap::ValueEnum;
use colored::Colorize;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::guard_error::{GuardError, GuardErrorWorkflowType, LimitExceeded};

pub(crate) mod a01_repo_size_limit;
pub(crate) mod a02_lfs_size_limit;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum EnforcementLevel {
    /// Skip the size check entirely
    Skip,
    /// Soft enforcement: report the breach but let the transfer through
    Warning,
    /// Hard enforcement: reject the transfer
    #[default]
    Error,
}

pub(crate) enum RuleOutput {
    /// The transfer would break a limit
    Exception(LimitExceeded),
    /// The transfer fits
    Success,
}

/// A size check run strictly before anything durable happens (a ref update or
/// an LFS object write). Implementations must be free of side effects.
pub(crate) trait Rule {
    fn get_name(&self) -> &str;
    fn get_description(&self) -> &str;
    fn get_level(&self) -> EnforcementLevel;
    fn get_repo(&self) -> &str;
    fn workflow_type(&self) -> GuardErrorWorkflowType;

    /// Implement logic to check the rule
    fn check(&self) -> Result<RuleOutput, Box<GuardError>>;

    /// Run the check and apply the enforcement level.
    ///
    /// `Ok(true)` means the check passed or was skipped. `Ok(false)` means it
    /// was breached under soft enforcement and the transfer proceeds with a
    /// warning. Under hard enforcement a breach comes back as an error
    /// carrying the [`LimitExceeded`] verdict.
    fn execute(&self) -> Result<bool, Box<GuardError>> {
        debug!("Running {}: {}", self.get_name(), self.get_description());
        if self.get_level() == EnforcementLevel::Skip {
            debug!("{} skipped for {}", self.get_name(), self.get_repo());
            return Ok(true);
        }
        match self.check()? {
            RuleOutput::Success => {
                debug!("{} passed for {}", self.get_name(), self.get_repo());
                Ok(true)
            }
            RuleOutput::Exception(violation) => {
                if self.get_level() == EnforcementLevel::Warning {
                    warn!(
                        "{} breached for {} (soft enforcement): {}",
                        self.get_name(),
                        self.get_repo(),
                        violation
                    );
                    eprintln!(
                        "{} {}, accepted because the limit is not enforced strictly",
                        "warning:".yellow().bold(),
                        violation
                    );
                    Ok(false)
                } else {
                    Err(Box::new(
                        GuardError::new(
                            self.get_name(),
                            &violation.to_string(),
                            self.workflow_type(),
                            self.get_repo(),
                            self.get_name(),
                        )
                        .with_violation(violation),
                    ))
                }
            }
        }
    }
}
