use crate::config::SettingsProvider;
use crate::config::local::open_git_dir;
use crate::guard_error::{GuardError, GuardErrorWorkflowType, NO_CHECK};
use crate::lfs::batch::BatchRequest;
use crate::lfs::{LfsTransferGate, UploadOutcome};
use log::debug;
use std::io::Write;
use std::path::Path;

fn lfs_error(name: &str, message: &str, git_dir: &Path, status: u16) -> Box<GuardError> {
    Box::new(
        GuardError::new(
            name,
            message,
            GuardErrorWorkflowType::Lfs,
            &git_dir.display().to_string(),
            NO_CHECK,
        )
        .with_status(status),
    )
}

/// Report the HTTP status a server front end should answer with.
fn report_status<T>(result: Result<T, Box<GuardError>>) -> Result<T, Box<GuardError>> {
    if let Err(err) = &result {
        debug!("LFS request failed during {}", err.workflow_type());
        eprintln!("status: {}", err.http_status());
    }
    result
}

/// Read a batch request from stdin and write the response to stdout.
pub(crate) fn batch(
    settings: &dyn SettingsProvider,
    repo: &Path,
    href_base: Option<&str>,
) -> Result<(), Box<GuardError>> {
    report_status(run_batch(settings, repo, href_base))
}

fn run_batch(
    settings: &dyn SettingsProvider,
    repo: &Path,
    href_base: Option<&str>,
) -> Result<(), Box<GuardError>> {
    let git_dir = open_git_dir(repo)?;
    let href_base = match href_base {
        Some(base) => base.to_string(),
        None => settings.global_config()?.lfs.href_base,
    };

    let request: BatchRequest = serde_json::from_reader(std::io::stdin().lock()).map_err(|e| {
        lfs_error("Malformed batch request", &e.to_string(), &git_dir, 422)
    })?;

    let gate = LfsTransferGate::new(settings, &git_dir, &href_base);
    let response = gate.batch(&request)?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &response)
        .map_err(|e| lfs_error("Failed to write batch response", &e.to_string(), &git_dir, 500))?;
    writeln!(stdout)
        .map_err(|e| lfs_error("Failed to write batch response", &e.to_string(), &git_dir, 500))?;
    Ok(())
}

/// Store one object streamed on stdin, after the size gate accepts it.
pub(crate) fn upload(
    settings: &dyn SettingsProvider,
    repo: &Path,
    oid: &str,
    size: i64,
) -> Result<(), Box<GuardError>> {
    report_status(run_upload(settings, repo, oid, size))
}

fn run_upload(
    settings: &dyn SettingsProvider,
    repo: &Path,
    oid: &str,
    size: i64,
) -> Result<(), Box<GuardError>> {
    let git_dir = open_git_dir(repo)?;
    let gate = LfsTransferGate::new(settings, &git_dir, "");
    match gate.upload(oid, size, std::io::stdin().lock())? {
        UploadOutcome::Stored(bytes) => println!("stored {oid} ({bytes} bytes)"),
        UploadOutcome::AlreadyPresent(bytes) => println!("already present {oid} ({bytes} bytes)"),
    }
    Ok(())
}
