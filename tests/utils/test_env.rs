use crate::utils::prevalidation::PreValidation;
use assert_cmd::prelude::*;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// A bare "server" repository guarded by sizeguard, a clone to push from and
/// a private global config file.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub server_path: PathBuf,
    pub work_path: PathBuf,
    pub config_path: PathBuf,
}

impl TestEnv {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        PreValidation::validate_all()?;

        let temp_dir = TempDir::with_prefix("sizeguard_test_")?;
        let server_path = temp_dir.path().join("server.git");
        let work_path = temp_dir.path().join("work");
        let config_path = temp_dir.path().join("config.toml");

        let output = Command::new("git")
            .args(["init", "--bare", "--initial-branch=main"])
            .arg(&server_path)
            .output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("Failed to initialize bare repository: {stderr}").into());
        }

        let output = Command::new("git")
            .args(["init", "--initial-branch=main"])
            .arg(&work_path)
            .output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("Failed to initialize work tree: {stderr}").into());
        }

        let test_env = TestEnv {
            temp_dir,
            server_path,
            work_path,
            config_path,
        };
        test_env.git(&["remote", "add", "origin", &test_env.server_path.display().to_string()])?;

        Ok(test_env)
    }

    pub fn setup_git_user(
        &self,
        name: &str,
        email: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.git(&["config", "user.name", name])?;
        self.git(&["config", "user.email", email])?;
        Ok(())
    }

    /// Run git in the work tree and fail on a non-zero exit.
    pub fn git(&self, args: &[&str]) -> Result<Output, Box<dyn std::error::Error>> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_path)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("git {} failed: {stderr}", args.join(" ")).into());
        }
        Ok(output)
    }

    pub fn write_config(&self, toml: &str) -> Result<(), Box<dyn std::error::Error>> {
        fs::write(&self.config_path, toml)?;
        Ok(())
    }

    pub fn install_hook(&self) -> Result<(), Box<dyn std::error::Error>> {
        let server = self.server_path.display().to_string();
        let output = self.run_sizeguard(&["install-hook", &server], None)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("Failed to install hook: {stderr}").into());
        }
        Ok(())
    }

    /// Run the binary against this environment's config, optionally feeding
    /// `stdin`. Input comes from a file so a command that rejects early does
    /// not break a pipe.
    pub fn run_sizeguard(
        &self,
        args: &[&str],
        stdin: Option<Vec<u8>>,
    ) -> Result<Output, Box<dyn std::error::Error>> {
        let mut command = Command::cargo_bin("sizeguard")?;
        command
            .arg("--config")
            .arg(&self.config_path)
            .args(args)
            .env("NO_COLOR", "1")
            .current_dir(self.temp_dir.path());
        match stdin {
            Some(content) => {
                let input_path = self.temp_dir.path().join("stdin.bin");
                fs::write(&input_path, content)?;
                command.stdin(Stdio::from(fs::File::open(&input_path)?));
            }
            None => {
                command.stdin(Stdio::null());
            }
        }
        Ok(command.output()?)
    }

    /// Commit a file of incompressible content to the work tree.
    pub fn commit_blob(
        &self,
        relative_path: &str,
        size: usize,
        seed: u64,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let path = Path::new(relative_path);
        if path.is_absolute()
            || path
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err("Path must be relative and cannot contain '..' components".into());
        }

        let file_path = self.work_path.join(relative_path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file_path, pseudo_random_bytes(size, seed))?;

        self.git(&["add", relative_path])?;
        self.git(&["commit", "-q", "-m", &format!("add {relative_path}")])?;
        Ok(())
    }

    /// Push the current branch; the result is returned even when rejected.
    pub fn push(&self) -> Result<Output, Box<dyn std::error::Error>> {
        let output = Command::new("git")
            .args(["push", "origin", "HEAD:refs/heads/main"])
            .env("NO_COLOR", "1")
            .current_dir(&self.work_path)
            .output()?;
        Ok(output)
    }

    pub fn server_head(&self) -> Option<String> {
        let output = Command::new("git")
            .args(["rev-parse", "--verify", "-q", "refs/heads/main"])
            .current_dir(&self.server_path)
            .output()
            .ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub fn server(&self) -> String {
        self.server_path.display().to_string()
    }
}

/// Deterministic bytes that zlib cannot shrink much.
pub fn pseudo_random_bytes(size: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..size)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as u8
        })
        .collect()
}

pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

#[macro_export]
macro_rules! test_env {
    ($name:ident) => {
        let $name = $crate::utils::test_env::TestEnv::new()?;
        $name.setup_git_user("Test User", "test@example.com")?;
    };
}
