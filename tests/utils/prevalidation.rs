use std::process::Command;

/// `init --initial-branch` needs git 2.28.
const MIN_GIT_VERSION: (u32, u32) = (2, 28);

pub struct PreValidation;

impl PreValidation {
    pub fn validate_all() -> Result<(), Box<dyn std::error::Error>> {
        Self::validate_git()?;
        Ok(())
    }

    fn validate_git() -> Result<(), Box<dyn std::error::Error>> {
        let output = Command::new("git").args(["--version"]).output()?;

        if !output.status.success() {
            return Err("Git is not installed or not accessible".into());
        }

        let version = String::from_utf8_lossy(&output.stdout);
        let found = parse_git_version(&version)
            .ok_or_else(|| format!("Unrecognised git version output: {version}"))?;
        if found < MIN_GIT_VERSION {
            return Err(format!(
                "git {}.{} or newer is required, found {}",
                MIN_GIT_VERSION.0,
                MIN_GIT_VERSION.1,
                version.trim()
            )
            .into());
        }

        Ok(())
    }
}

/// `git version 2.43.0` (or `2.39.3 (Apple Git-146)`) to `(2, 43)`.
fn parse_git_version(output: &str) -> Option<(u32, u32)> {
    let number = output.split_whitespace().nth(2)?;
    let mut parts = number.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}
