mod utils;

use utils::test_env::{pseudo_random_bytes, sha256_hex};

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;

fn global_config(repo_size_limit: &str, lfs_size_limit: &str, enforcement: &str) -> String {
    limits_config(repo_size_limit, lfs_size_limit, false, enforcement)
}

fn limits_config(
    repo_size_limit: &str,
    lfs_size_limit: &str,
    lfs_in_repo: bool,
    enforcement: &str,
) -> String {
    format!(
        "[repository]\n\
         enabled = true\n\
         repo_size_limit = {repo_size_limit}\n\
         lfs_size_limit = {lfs_size_limit}\n\
         lfs_size_in_repo_size = {lfs_in_repo}\n\
         enforcement = \"{enforcement}\"\n"
    )
}

#[test]
fn test_large_push_rejected_small_push_accepted() -> Result<(), Box<dyn std::error::Error>> {
    test_env!(env);
    env.write_config(&global_config("\"64KiB\"", "-1", "error"))?;
    env.install_hook()?;

    env.commit_blob("big.bin", 4 * MIB, 1)?;
    let rejected = env.push()?;
    assert!(!rejected.status.success());
    let stderr = String::from_utf8_lossy(&rejected.stderr);
    assert!(
        stderr.contains("would exceed the limit of 64 KiB"),
        "unexpected push output: {stderr}"
    );
    assert!(env.server_head().is_none());

    // Start over with a history that fits
    env.git(&["checkout", "-q", "--orphan", "small"])?;
    env.git(&["rm", "-q", "-r", "--cached", "."])?;
    std::fs::remove_file(env.work_path.join("big.bin"))?;
    env.commit_blob("small.bin", 8 * KIB, 2)?;
    let accepted = env.push()?;
    assert!(
        accepted.status.success(),
        "push failed: {}",
        String::from_utf8_lossy(&accepted.stderr)
    );
    assert!(env.server_head().is_some());
    Ok(())
}

#[test]
fn test_zero_limit_disables_the_check() -> Result<(), Box<dyn std::error::Error>> {
    test_env!(env);
    env.write_config(&global_config("0", "\"64KiB\"", "error"))?;
    env.install_hook()?;

    env.commit_blob("big.bin", 4 * MIB, 3)?;
    let output = env.push()?;
    assert!(
        output.status.success(),
        "push failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(())
}

#[test]
fn test_combined_mode_counts_stored_lfs_on_push() -> Result<(), Box<dyn std::error::Error>> {
    test_env!(env);
    env.write_config(&limits_config("\"256KiB\"", "-1", true, "error"))?;
    env.install_hook()?;

    let content = pseudo_random_bytes(250 * KIB, 10);
    let oid = sha256_hex(&content);
    let server = env.server();
    let stored = env.run_sizeguard(
        &["lfs", "upload", &server, &oid, &content.len().to_string()],
        Some(content),
    )?;
    assert!(
        stored.status.success(),
        "upload failed: {}",
        String::from_utf8_lossy(&stored.stderr)
    );

    // 250 KiB of LFS plus a 16 KiB blob no longer fits in 256 KiB
    env.commit_blob("small.bin", 16 * KIB, 11)?;
    let rejected = env.push()?;
    assert!(!rejected.status.success());
    let stderr = String::from_utf8_lossy(&rejected.stderr);
    assert!(
        stderr.contains("would exceed the limit of 256 KiB"),
        "unexpected push output: {stderr}"
    );

    env.write_config(&limits_config("\"256KiB\"", "-1", false, "error"))?;
    let accepted = env.push()?;
    assert!(
        accepted.status.success(),
        "push failed: {}",
        String::from_utf8_lossy(&accepted.stderr)
    );
    Ok(())
}

#[test]
fn test_disabled_setting_accepts_everything() -> Result<(), Box<dyn std::error::Error>> {
    test_env!(env);
    env.write_config(
        "[repository]\nenabled = false\nrepo_size_limit = 1024\nenforcement = \"error\"\n",
    )?;
    env.install_hook()?;

    env.commit_blob("big.bin", MIB, 4)?;
    assert!(env.push()?.status.success());
    Ok(())
}

#[test]
fn test_soft_limit_warns_but_accepts() -> Result<(), Box<dyn std::error::Error>> {
    test_env!(env);
    env.write_config(&global_config("\"64KiB\"", "-1", "warning"))?;
    env.install_hook()?;

    env.commit_blob("big.bin", MIB, 5)?;
    let output = env.push()?;
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("accepted because the limit is not enforced strictly"),
        "unexpected push output: {stderr}"
    );
    assert!(env.server_head().is_some());
    Ok(())
}

#[test]
fn test_repository_override_unblocks_the_same_push() -> Result<(), Box<dyn std::error::Error>> {
    test_env!(env);
    env.write_config(&global_config("\"64KiB\"", "-1", "error"))?;
    env.install_hook()?;

    env.commit_blob("big.bin", MIB, 6)?;
    assert!(!env.push()?.status.success());

    // -1: this repository is unlimited whatever the global limit says
    let server = env.server();
    let output = env.run_sizeguard(&["repo", "set-size-limit", &server, "-1"], None)?;
    assert!(output.status.success());
    let retried = env.push()?;
    assert!(
        retried.status.success(),
        "push failed: {}",
        String::from_utf8_lossy(&retried.stderr)
    );
    Ok(())
}

#[test]
fn test_raised_limit_applies_to_next_push() -> Result<(), Box<dyn std::error::Error>> {
    test_env!(env);
    env.write_config(&global_config("\"64KiB\"", "-1", "error"))?;
    env.install_hook()?;

    env.commit_blob("big.bin", MIB, 7)?;
    assert!(!env.push()?.status.success());

    env.write_config(&global_config("\"16MiB\"", "-1", "error"))?;
    assert!(env.push()?.status.success());
    Ok(())
}

#[test]
fn test_cleared_override_falls_back_to_global() -> Result<(), Box<dyn std::error::Error>> {
    test_env!(env);
    env.write_config(&global_config("\"64KiB\"", "-1", "error"))?;
    env.install_hook()?;
    let server = env.server();

    assert!(
        env.run_sizeguard(&["repo", "set-size-limit", &server, "16MiB"], None)?
            .status
            .success()
    );
    assert!(
        env.run_sizeguard(&["repo", "clear-limits", &server], None)?
            .status
            .success()
    );

    env.commit_blob("big.bin", MIB, 8)?;
    assert!(!env.push()?.status.success());
    Ok(())
}

#[test]
fn test_deleting_a_branch_is_always_allowed() -> Result<(), Box<dyn std::error::Error>> {
    test_env!(env);
    env.write_config(&global_config("-1", "-1", "error"))?;
    env.install_hook()?;

    env.commit_blob("big.bin", MIB, 9)?;
    assert!(env.push()?.status.success());
    env.git(&["push", "-q", "origin", "HEAD:refs/heads/topic"])?;

    // Now far over the limit, yet removing refs adds nothing
    env.write_config(&global_config("\"1KiB\"", "-1", "error"))?;
    let output = env.git(&["push", "origin", "--delete", "topic"])?;
    assert!(output.status.success());
    Ok(())
}
