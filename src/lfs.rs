pub(crate) mod batch;
pub(crate) mod store;

use crate::config::SettingsProvider;
use crate::guard_error::{GuardError, GuardErrorWorkflowType, NO_CHECK};
use crate::policy::{EffectiveLimits, SizeLimitPolicy};
use crate::repo_size::{PendingTransfer, current_git_size};
use crate::rules::Rule;
use crate::rules::a02_lfs_size_limit::LfsSizeLimit;
use batch::{BatchRequest, BatchResponse, ObjectResponse, ObjectSpec, Operation};
use log::{debug, info};
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use store::{LfsStore, is_valid_oid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UploadOutcome {
    Stored(u64),
    AlreadyPresent(u64),
}

/// Gate in front of a repository's LFS store. Limits are resolved from the
/// settings provider on every batch or upload call.
pub(crate) struct LfsTransferGate<'a> {
    settings: &'a dyn SettingsProvider,
    git_dir: PathBuf,
    store: LfsStore,
    href_base: String,
}

/// Running byte totals for one batch or upload.
struct Usage {
    git: u64,
    lfs: u64,
}

impl<'a> LfsTransferGate<'a> {
    pub(crate) fn new(settings: &'a dyn SettingsProvider, git_dir: &Path, href_base: &str) -> Self {
        LfsTransferGate {
            settings,
            git_dir: git_dir.to_path_buf(),
            store: LfsStore::for_git_dir(git_dir),
            href_base: href_base.trim_end_matches('/').to_string(),
        }
    }

    fn repo_label(&self) -> String {
        self.git_dir.display().to_string()
    }

    fn href(&self, oid: &str) -> String {
        format!("{}/{}", self.href_base, oid)
    }

    fn measure(&self, limits: &EffectiveLimits) -> Result<Usage, Box<GuardError>> {
        // Only combined mode needs current sizes
        if !limits.lfs_counts_in_repo || !limits.repo_limit.is_enforced() {
            return Ok(Usage { git: 0, lfs: 0 });
        }
        Ok(Usage {
            git: current_git_size(&self.git_dir)?,
            lfs: self.store.total_size()?,
        })
    }

    fn guard(&self, limits: EffectiveLimits, usage: &Usage, size: u64) -> LfsSizeLimit {
        LfsSizeLimit::new(
            &self.repo_label(),
            limits,
            PendingTransfer {
                current_repo_size_bytes: usage.git,
                incoming_object_size_bytes: size,
                current_lfs_size_bytes: usage.lfs,
                is_lfs: true,
            },
        )
    }

    /// Answer a batch request. Size rejections become per-object errors so a
    /// client can still transfer the objects that fit.
    pub(crate) fn batch(&self, request: &BatchRequest) -> Result<BatchResponse, Box<GuardError>> {
        let objects: Vec<ObjectResponse> = match request.operation {
            Operation::Download => request
                .objects
                .iter()
                .map(|spec| self.download_object(spec))
                .collect(),
            Operation::Upload => {
                let limits = SizeLimitPolicy::for_repository(self.settings, &self.git_dir)?;
                let mut usage = self.measure(&limits)?;
                let mut accepted = HashSet::new();
                let mut objects = Vec::with_capacity(request.objects.len());
                for spec in &request.objects {
                    objects.push(self.upload_object(spec, limits, &mut usage, &mut accepted)?);
                }
                objects
            }
        };
        Ok(BatchResponse::basic(objects))
    }

    fn download_object(&self, spec: &ObjectSpec) -> ObjectResponse {
        let response = ObjectResponse::bare(spec);
        if self.store.exists(&spec.oid) {
            response.with_action("download", self.href(&spec.oid))
        } else {
            response.with_error(404, "Object does not exist")
        }
    }

    fn upload_object(
        &self,
        spec: &ObjectSpec,
        limits: EffectiveLimits,
        usage: &mut Usage,
        accepted: &mut HashSet<String>,
    ) -> Result<ObjectResponse, Box<GuardError>> {
        let response = ObjectResponse::bare(spec);
        if !is_valid_oid(&spec.oid) {
            return Ok(response.with_error(422, "Invalid object id"));
        }
        if spec.size < 0 {
            return Ok(response.with_error(422, "Invalid object size"));
        }
        if self.store.exists(&spec.oid) {
            debug!("LFS object {} already stored", spec.oid);
            return Ok(response);
        }

        // A repeated oid is one object: answer it again without counting twice
        if accepted.contains(&spec.oid) {
            return Ok(response.with_action("upload", self.href(&spec.oid)));
        }

        let size = spec.size as u64;
        match self.guard(limits, usage, size).execute() {
            Ok(_) => {
                // Objects accepted earlier in this batch count toward later ones
                usage.lfs = usage.lfs.saturating_add(size);
                accepted.insert(spec.oid.clone());
                Ok(response.with_action("upload", self.href(&spec.oid)))
            }
            Err(err) => match err.violation() {
                Some(violation) => {
                    info!("Refusing LFS object {} for {}: {}", spec.oid, self.repo_label(), violation);
                    Ok(response.with_error(err.http_status(), err.message()))
                }
                None => Err(err),
            },
        }
    }

    /// Check and store one object. Nothing touches the store until the gate
    /// has accepted the declared size.
    pub(crate) fn upload<R: Read>(
        &self,
        oid: &str,
        size: i64,
        reader: R,
    ) -> Result<UploadOutcome, Box<GuardError>> {
        if !is_valid_oid(oid) || size < 0 {
            return Err(Box::new(
                GuardError::new(
                    "Invalid LFS object",
                    &format!("'{oid}' with size {size} is not a valid LFS object"),
                    GuardErrorWorkflowType::Lfs,
                    &self.repo_label(),
                    NO_CHECK,
                )
                .with_status(422),
            ));
        }
        let size = size as u64;

        if let Some(existing) = self.store.size_of(oid) {
            debug!("LFS object {} already stored, skipping upload", oid);
            return Ok(UploadOutcome::AlreadyPresent(existing));
        }

        let limits = SizeLimitPolicy::for_repository(self.settings, &self.git_dir)?;
        if limits.any_enforced() {
            let usage = self.measure(&limits)?;
            self.guard(limits, &usage, size).execute()?;
        }

        let stored = self.store.put(oid, size, reader)?;
        info!("Stored LFS object {} ({} bytes) for {}", oid, stored, self.repo_label());
        Ok(UploadOutcome::Stored(stored))
    }
}
