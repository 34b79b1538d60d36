use crate::constants::GIT_QUARANTINE_ENV;
use crate::guard_error::{GuardError, GuardErrorWorkflowType, NO_CHECK};
use crate::hooks::RefUpdate;
use crate::lfs::store::LfsStore;
use git2::{ObjectType, Odb, Oid, Repository, TreeWalkMode, TreeWalkResult};
use log::{debug, trace};
use std::collections::HashSet;
use std::path::Path;
use std::process::Command;

/// Byte accounting for one push or upload attempt. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PendingTransfer {
    pub current_repo_size_bytes: u64,
    pub incoming_object_size_bytes: u64,
    pub current_lfs_size_bytes: u64,
    pub is_lfs: bool,
}

impl PendingTransfer {
    /// Repository size after the transfer lands, with stored LFS bytes folded
    /// in when `lfs_counts_in_repo` is set.
    pub(crate) fn prospective_repo_size(&self, lfs_counts_in_repo: bool) -> u64 {
        let lfs = if lfs_counts_in_repo {
            self.current_lfs_size_bytes
        } else {
            0
        };
        self.current_repo_size_bytes
            .saturating_add(lfs)
            .saturating_add(self.incoming_object_size_bytes)
    }
}

fn measure_error(git_dir: &Path, name: &str, message: &str) -> Box<GuardError> {
    Box::new(GuardError::new(
        name,
        message,
        GuardErrorWorkflowType::Measure,
        &git_dir.display().to_string(),
        NO_CHECK,
    ))
}

/// On-disk size of the object store, from `git count-objects -v`.
///
/// Quarantine variables are stripped so a hook measures the repository as it
/// was before the push.
pub(crate) fn current_git_size(git_dir: &Path) -> Result<u64, Box<GuardError>> {
    let git = which::which("git").map_err(|e| {
        measure_error(
            git_dir,
            "Git is not installed",
            &format!("Could not locate the git executable: {e}"),
        )
    })?;

    let mut command = Command::new(git);
    command
        .arg("--git-dir")
        .arg(git_dir)
        .arg("count-objects")
        .arg("-v");
    for var in GIT_QUARANTINE_ENV {
        command.env_remove(var);
    }

    let output = command.output().map_err(|e| {
        measure_error(
            git_dir,
            "Failed to execute git count-objects",
            &e.to_string(),
        )
    })?;
    if !output.status.success() {
        return Err(measure_error(
            git_dir,
            "Failed to get repository size",
            &String::from_utf8_lossy(&output.stderr),
        ));
    }

    let size = parse_count_objects(&String::from_utf8_lossy(&output.stdout))
        .map_err(|e| measure_error(git_dir, "Could not parse repository size", &e))?;
    debug!("Current git size of {}: {} bytes", git_dir.display(), size);
    Ok(size)
}

/// Sum of loose (`size`) and packed (`size-pack`) KiB, in bytes.
fn parse_count_objects(output: &str) -> Result<u64, String> {
    let mut total_kib: Option<u64> = None;
    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim() == "size" || key.trim() == "size-pack" {
            let kib = value
                .trim()
                .parse::<u64>()
                .map_err(|e| format!("bad value for {}: {}", key.trim(), e))?;
            total_kib = Some(total_kib.unwrap_or(0) + kib);
        }
    }
    total_kib
        .map(|kib| kib * 1024)
        .ok_or_else(|| format!("no size fields in git output: {output}"))
}

/// Total bytes held in the repository's LFS store.
pub(crate) fn current_lfs_size(git_dir: &Path) -> Result<u64, Box<GuardError>> {
    let size = LfsStore::for_git_dir(git_dir).total_size()?;
    debug!("Current LFS size of {}: {} bytes", git_dir.display(), size);
    Ok(size)
}

fn quarantined() -> bool {
    std::env::var_os("GIT_QUARANTINE_PATH").is_some()
        || std::env::var_os("GIT_OBJECT_DIRECTORY").is_some()
}

/// Uncompressed size of every object the push introduces.
///
/// Objects reachable from the pushed tips count unless they are already
/// reachable from existing refs (through the boundary commits) or already in
/// the main object database. Deletions introduce nothing.
pub(crate) fn incoming_object_size(
    git_dir: &Path,
    updates: &[RefUpdate],
) -> Result<u64, Box<GuardError>> {
    let pushed: Vec<&RefUpdate> = updates.iter().filter(|u| !u.is_delete()).collect();
    if pushed.is_empty() {
        return Ok(0);
    }

    let git_error = |name: &str, e: git2::Error| measure_error(git_dir, name, &e.to_string());

    // Inside a hook the environment points at the quarantine directory with
    // the real object store as an alternate.
    let (repo, main_repo) = if quarantined() {
        let repo = Repository::open_from_env()
            .map_err(|e| git_error("Failed to open quarantined repository", e))?;
        let main = Repository::open(git_dir)
            .map_err(|e| git_error("Failed to open repository", e))?;
        (repo, Some(main))
    } else {
        let repo = Repository::open(git_dir)
            .map_err(|e| git_error("Failed to open repository", e))?;
        (repo, None)
    };
    let main_odb = match &main_repo {
        Some(main) => Some(
            main.odb()
                .map_err(|e| git_error("Failed to open object database", e))?,
        ),
        None => None,
    };
    let odb = repo
        .odb()
        .map_err(|e| git_error("Failed to open object database", e))?;

    let in_main = |oid: Oid| main_odb.as_ref().is_some_and(|main| main.exists(oid));

    let mut fresh: Vec<Oid> = Vec::new();
    let mut seen: HashSet<Oid> = HashSet::new();

    let mut walk = repo
        .revwalk()
        .map_err(|e| git_error("Failed to start revision walk", e))?;
    let mut walking = false;
    for update in &pushed {
        let (_, kind) = odb
            .read_header(update.new)
            .map_err(|e| git_error("Pushed object is missing", e))?;
        match kind {
            ObjectType::Commit => {}
            ObjectType::Tag => {
                if seen.insert(update.new) && !in_main(update.new) {
                    fresh.push(update.new);
                }
            }
            _ => {
                // A ref straight to a tree or blob: count just that object.
                if seen.insert(update.new) && !in_main(update.new) {
                    fresh.push(update.new);
                }
                continue;
            }
        }
        match walk.push(update.new) {
            Ok(()) => walking = true,
            // A tag of something other than a commit has no history to walk
            Err(e) if kind == ObjectType::Tag => trace!("Not walking {}: {}", update.new, e),
            Err(e) => return Err(git_error("Failed to walk pushed commits", e)),
        }
    }

    if walking {
        let references = repo
            .references()
            .map_err(|e| git_error("Failed to list references", e))?;
        for reference in references.flatten() {
            if let Some(target) = reference.target()
                && let Err(e) = walk.hide(target)
            {
                trace!("Not hiding {}: {}", target, e);
            }
        }

        let mut new_commits = Vec::new();
        for commit_id in walk {
            new_commits.push(commit_id.map_err(|e| git_error("Revision walk failed", e))?);
        }
        let new_set: HashSet<Oid> = new_commits.iter().copied().collect();
        debug!("Push introduces {} commit(s)", new_commits.len());

        let mut known: HashSet<Oid> = HashSet::new();
        for commit_id in &new_commits {
            let commit = repo
                .find_commit(*commit_id)
                .map_err(|e| git_error("Failed to read commit", e))?;
            for parent in commit.parents() {
                if !new_set.contains(&parent.id()) && known.insert(parent.id()) {
                    let tree = parent
                        .tree()
                        .map_err(|e| git_error("Failed to read tree", e))?;
                    mark_tree_known(&tree, &mut known)
                        .map_err(|e| git_error("Failed to walk tree", e))?;
                }
            }
        }

        for commit_id in &new_commits {
            if seen.insert(*commit_id) && !in_main(*commit_id) {
                fresh.push(*commit_id);
            }
            let tree = repo
                .find_commit(*commit_id)
                .and_then(|commit| commit.tree())
                .map_err(|e| git_error("Failed to read tree", e))?;
            if known.contains(&tree.id()) || in_main(tree.id()) || !seen.insert(tree.id()) {
                continue;
            }
            fresh.push(tree.id());
            tree.walk(TreeWalkMode::PreOrder, |_, entry| {
                let id = entry.id();
                let is_tree = entry.kind() == Some(ObjectType::Tree);
                if entry.kind() == Some(ObjectType::Commit) {
                    // Submodule gitlink, lives in another repository
                    return TreeWalkResult::Skip;
                }
                if known.contains(&id) || in_main(id) || !seen.insert(id) {
                    return if is_tree {
                        TreeWalkResult::Skip
                    } else {
                        TreeWalkResult::Ok
                    };
                }
                fresh.push(id);
                TreeWalkResult::Ok
            })
            .map_err(|e| git_error("Failed to walk tree", e))?;
        }
    }

    sum_object_sizes(&odb, &fresh).map_err(|e| git_error("Failed to read object size", e))
}

fn mark_tree_known(tree: &git2::Tree<'_>, known: &mut HashSet<Oid>) -> Result<(), git2::Error> {
    if !known.insert(tree.id()) {
        return Ok(());
    }
    tree.walk(TreeWalkMode::PreOrder, |_, entry| {
        let first_time = known.insert(entry.id());
        if !first_time && entry.kind() == Some(ObjectType::Tree) {
            TreeWalkResult::Skip
        } else {
            TreeWalkResult::Ok
        }
    })
}

fn sum_object_sizes(odb: &Odb<'_>, oids: &[Oid]) -> Result<u64, git2::Error> {
    let mut total: u64 = 0;
    for oid in oids {
        let (size, _) = odb.read_header(*oid)?;
        total = total.saturating_add(size as u64);
    }
    debug!("{} new object(s), {} bytes uncompressed", oids.len(), total);
    Ok(total)
}

/// Everything the pre-receive guard needs, measured in one go.
pub(crate) fn measure_push(
    git_dir: &Path,
    updates: &[RefUpdate],
    include_lfs: bool,
) -> Result<PendingTransfer, Box<GuardError>> {
    let incoming = incoming_object_size(git_dir, updates)?;
    if incoming == 0 {
        return Ok(PendingTransfer::default());
    }
    Ok(PendingTransfer {
        current_repo_size_bytes: current_git_size(git_dir)?,
        incoming_object_size_bytes: incoming,
        current_lfs_size_bytes: if include_lfs {
            current_lfs_size(git_dir)?
        } else {
            0
        },
        is_lfs: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_objects() {
        let output = "count: 3\nsize: 12\nin-pack: 6\npacks: 1\nsize-pack: 4\nprune-packable: 0\ngarbage: 0\nsize-garbage: 0\n";
        assert_eq!(parse_count_objects(output), Ok(16 * 1024));
    }

    #[test]
    fn test_parse_count_objects_empty_repository() {
        let output = "count: 0\nsize: 0\nin-pack: 0\npacks: 0\nsize-pack: 0\n";
        assert_eq!(parse_count_objects(output), Ok(0));
    }

    #[test]
    fn test_parse_count_objects_garbage() {
        assert!(parse_count_objects("hello\n").is_err());
        assert!(parse_count_objects("size: lots\n").is_err());
    }

    #[test]
    fn test_prospective_size() {
        let transfer = PendingTransfer {
            current_repo_size_bytes: 100,
            incoming_object_size_bytes: 50,
            current_lfs_size_bytes: 1000,
            is_lfs: false,
        };
        assert_eq!(transfer.prospective_repo_size(false), 150);
        assert_eq!(transfer.prospective_repo_size(true), 1150);
    }
}
