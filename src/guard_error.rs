use colored::Colorize;
use std::fmt;

pub(crate) const NO_REPO: &str = "";
pub(crate) const NO_CHECK: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GuardErrorWorkflowType {
    Config,
    Measure,
    PreReceive,
    Lfs,
    Hook,
}

impl fmt::Display for GuardErrorWorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GuardErrorWorkflowType::Config => "config",
            GuardErrorWorkflowType::Measure => "measure",
            GuardErrorWorkflowType::PreReceive => "pre-receive",
            GuardErrorWorkflowType::Lfs => "lfs",
            GuardErrorWorkflowType::Hook => "hook",
        };
        f.write_str(name)
    }
}

/// Which limit a transfer ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LimitKind {
    Repository,
    Lfs,
}

/// A transfer that would leave the repository (or a single LFS object) above
/// its effective limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LimitExceeded {
    pub kind: LimitKind,
    pub limit: u64,
    pub actual: u64,
}

impl fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LimitKind::Repository => write!(
                f,
                "repository size {} would exceed the limit of {}",
                crate::size::format_size(self.actual),
                crate::size::format_size(self.limit)
            ),
            LimitKind::Lfs => write!(
                f,
                "LFS object size {} exceeds the limit of {}",
                crate::size::format_size(self.actual),
                crate::size::format_size(self.limit)
            ),
        }
    }
}

#[derive(Debug)]
pub(crate) struct GuardError {
    name: String,
    message: String,
    workflow_type: GuardErrorWorkflowType,
    repo: String,
    check: String,
    violation: Option<LimitExceeded>,
    status: Option<u16>,
}

impl GuardError {
    pub(crate) fn new(
        name: &str,
        message: &str,
        workflow_type: GuardErrorWorkflowType,
        repo: &str,
        check: &str,
    ) -> Self {
        GuardError {
            name: name.to_string(),
            message: message.to_string(),
            workflow_type,
            repo: repo.to_string(),
            check: check.to_string(),
            violation: None,
            status: None,
        }
    }

    pub(crate) fn with_violation(mut self, violation: LimitExceeded) -> Self {
        self.violation = Some(violation);
        self
    }

    /// Pin the HTTP status reported by the LFS surfaces.
    pub(crate) fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub(crate) fn violation(&self) -> Option<&LimitExceeded> {
        self.violation.as_ref()
    }

    pub(crate) fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn workflow_type(&self) -> GuardErrorWorkflowType {
        self.workflow_type
    }

    pub(crate) fn http_status(&self) -> u16 {
        if let Some(status) = self.status {
            return status;
        }
        if self.violation.is_some() {
            return 413;
        }
        500
    }

    pub(crate) fn print_error(&self) {
        eprintln!(
            "{} {}: {}",
            "error".red().bold(),
            self.name.bold(),
            self.message
        );
        let mut context = vec![format!("while running {}", self.workflow_type)];
        if !self.check.is_empty() {
            context.push(format!("check '{}'", self.check));
        }
        if !self.repo.is_empty() {
            context.push(format!("repository {}", self.repo));
        }
        eprintln!("  {} {}", "-->".blue().bold(), context.join(", "));
    }
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for GuardError {}
