use crate::constants::{LFS_COPY_BUFFER_BYTES, LFS_OBJECTS_DIR, LFS_TMP_DIR};
use crate::guard_error::{GuardError, GuardErrorWorkflowType, NO_CHECK};
use log::debug;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Content-addressed LFS object store, laid out like git-lfs does locally:
/// `<git_dir>/lfs/objects/ab/cd/abcd…`.
pub(crate) struct LfsStore {
    root: PathBuf,
}

/// A sha256 oid is 64 lowercase hex digits.
pub(crate) fn is_valid_oid(oid: &str) -> bool {
    oid.len() == 64 && oid.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl LfsStore {
    pub(crate) fn for_git_dir(git_dir: &Path) -> Self {
        LfsStore {
            root: git_dir.join(LFS_OBJECTS_DIR),
        }
    }

    fn store_error(&self, name: &str, message: &str) -> Box<GuardError> {
        Box::new(GuardError::new(
            name,
            message,
            GuardErrorWorkflowType::Lfs,
            &self.root.display().to_string(),
            NO_CHECK,
        ))
    }

    /// Rejected content: reported as 422 Unprocessable Entity.
    fn content_error(&self, name: &str, message: &str) -> Box<GuardError> {
        Box::new(
            GuardError::new(
                name,
                message,
                GuardErrorWorkflowType::Lfs,
                &self.root.display().to_string(),
                NO_CHECK,
            )
            .with_status(422),
        )
    }

    fn object_path(&self, oid: &str) -> PathBuf {
        self.root.join(&oid[0..2]).join(&oid[2..4]).join(oid)
    }

    /// Size of a stored object, `None` when absent or `oid` is invalid.
    pub(crate) fn size_of(&self, oid: &str) -> Option<u64> {
        if !is_valid_oid(oid) {
            return None;
        }
        fs::metadata(self.object_path(oid)).ok().map(|m| m.len())
    }

    pub(crate) fn exists(&self, oid: &str) -> bool {
        self.size_of(oid).is_some()
    }

    /// Sum of all stored objects; in-flight temp files are not counted.
    pub(crate) fn total_size(&self) -> Result<u64, Box<GuardError>> {
        let mut total = 0u64;
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                !(e.depth() == 1 && e.file_type().is_dir() && e.file_name() == LFS_TMP_DIR)
            });
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.io_error().is_some_and(|io| io.kind() == ErrorKind::NotFound) => {
                    continue;
                }
                Err(e) => {
                    return Err(self.store_error("Failed to scan LFS store", &e.to_string()));
                }
            };
            if entry.file_type().is_file()
                && let Ok(metadata) = entry.metadata()
            {
                total = total.saturating_add(metadata.len());
            }
        }
        Ok(total)
    }

    /// Stream `reader` into the store under `oid`.
    ///
    /// Content is written to a temp file and only renamed into place once its
    /// length equals `size` and its sha256 equals `oid`; on any failure the
    /// temp file is removed and nothing is stored.
    pub(crate) fn put<R: Read>(
        &self,
        oid: &str,
        size: u64,
        mut reader: R,
    ) -> Result<u64, Box<GuardError>> {
        if !is_valid_oid(oid) {
            return Err(self.content_error(
                "Invalid LFS object id",
                &format!("'{oid}' is not a sha256 oid"),
            ));
        }

        let tmp_dir = self.root.join(LFS_TMP_DIR);
        fs::create_dir_all(&tmp_dir).map_err(|e| {
            self.store_error(
                "Failed to prepare LFS store",
                &format!("{}: {}", tmp_dir.display(), e),
            )
        })?;
        let tmp_path = tmp_dir.join(format!("{}-{}", oid, std::process::id()));

        let result = self.write_verified(&tmp_path, oid, size, &mut reader);
        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
            return result;
        }

        let final_path = self.object_path(oid);
        let committed = final_path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::rename(&tmp_path, &final_path));
        if let Err(e) = committed {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.store_error(
                "Failed to store LFS object",
                &format!("{}: {}", final_path.display(), e),
            ));
        }

        debug!("Stored LFS object {} ({} bytes)", oid, size);
        result
    }

    fn write_verified<R: Read>(
        &self,
        tmp_path: &Path,
        oid: &str,
        size: u64,
        reader: &mut R,
    ) -> Result<u64, Box<GuardError>> {
        let io_error = |e: std::io::Error| {
            self.store_error(
                "Failed to write LFS object",
                &format!("{}: {}", tmp_path.display(), e),
            )
        };

        let mut file = fs::File::create(tmp_path).map_err(io_error)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; LFS_COPY_BUFFER_BYTES];
        let mut written: u64 = 0;

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_error(e)),
            };
            written += n as u64;
            if written > size {
                return Err(self.content_error(
                    "LFS object size mismatch",
                    &format!("received more than the declared {size} bytes"),
                ));
            }
            hasher.update(&buffer[..n]);
            file.write_all(&buffer[..n]).map_err(io_error)?;
        }
        file.sync_all().map_err(io_error)?;

        if written != size {
            return Err(self.content_error(
                "LFS object size mismatch",
                &format!("received {written} bytes, declared {size}"),
            ));
        }
        let digest = hex::encode(hasher.finalize());
        if digest != oid {
            return Err(self.content_error(
                "LFS object hash mismatch",
                &format!("content hashes to {digest}, expected {oid}"),
            ));
        }
        Ok(written)
    }
}
