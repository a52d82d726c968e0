use directories::ProjectDirs;
use std::path::PathBuf;

/// Overrides the configuration file location.
pub const CONFIG_ENV: &str = "SVCMGR_CONFIG";
/// Overrides `root_dir` from the configuration file.
pub const ROOT_DIR_ENV: &str = "SVCMGR_ROOT_DIR";

/// Returns the XDG config directory for svcmgr.
///
/// Defaults to `~/.config/svcmgr` on Linux.
pub fn get_xdg_config_home() -> PathBuf {
    ProjectDirs::from("", "", "svcmgr").map_or_else(
        || PathBuf::from(".svcmgr"),
        |proj_dirs| proj_dirs.config_dir().to_path_buf(),
    )
}

/// The configuration file to load: `$SVCMGR_CONFIG`, else `config.toml` in the XDG
/// config directory.
pub fn config_file() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .filter(|v| !v.is_empty())
        .map_or_else(|| get_xdg_config_home().join("config.toml"), PathBuf::from)
}

/// `$SVCMGR_ROOT_DIR`, if set and non-empty.
pub fn root_dir_override() -> Option<PathBuf> {
    std::env::var_os(ROOT_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
