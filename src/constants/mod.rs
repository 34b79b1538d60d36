// Global configuration discovery
pub(crate) const CONFIG_DIR_NAME: &str = "sizeguard";
pub(crate) const CONFIG_FILE_NAME: &str = "config.toml";
pub(crate) const CONFIG_PATH_ENV: &str = "SIZEGUARD_CONFIG";

// Per-repository overrides live in the repository's own git config
pub(crate) const GIT_CONFIG_REPO_SIZE_LIMIT: &str = "sizeguard.repoSizeLimit";
pub(crate) const GIT_CONFIG_LFS_SIZE_LIMIT: &str = "sizeguard.lfsSizeLimit";

// Layout of the LFS content store, relative to the git directory
pub(crate) const LFS_OBJECTS_DIR: &str = "lfs/objects";
pub(crate) const LFS_TMP_DIR: &str = "tmp";
pub(crate) const LFS_COPY_BUFFER_BYTES: usize = 64 * 1024; // 64 KiB
pub(crate) const DEFAULT_LFS_HREF_BASE: &str = "info/lfs/objects";

// Marker written into installed hooks so reinstalling can recognise them
pub(crate) const HOOK_MARKER: &str = "# installed by sizeguard";

// Environment git exports to hooks while objects are quarantined
pub(crate) const GIT_QUARANTINE_ENV: [&str; 4] = [
    "GIT_DIR",
    "GIT_OBJECT_DIRECTORY",
    "GIT_ALTERNATE_OBJECT_DIRECTORIES",
    "GIT_QUARANTINE_PATH",
];
