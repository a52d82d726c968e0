use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Component, Path, PathBuf};
use svcmgr_core::config::DataOwnerConfig;
use tracing::{debug, warn};

/// Joins a relative path to a root and ensures the result stays inside the root.
///
/// # Errors
///
/// Returns an error if the path is absolute, attempts to traverse above the root, or
/// contains unsupported components (like Windows prefixes).
pub fn safe_join(root: &Path, path: &str) -> Result<PathBuf> {
    let mut result = root.to_path_buf();

    for component in Path::new(path).components() {
        match component {
            Component::Normal(p) => result.push(p),
            Component::CurDir => {}
            Component::RootDir => {
                return Err(anyhow!("Absolute paths are not allowed here: {path}"));
            }
            Component::ParentDir => {
                if !result.pop() || !result.starts_with(root) {
                    return Err(anyhow!("Path traversal detected: {path}"));
                }
            }
            Component::Prefix(_) => {
                return Err(anyhow!("Windows prefixes not supported: {path}"));
            }
        }
    }

    Ok(result)
}

/// Creates each of `dirs` under `root` that does not exist yet and hands it to `owner`.
///
/// Directories that already exist are left alone, ownership included. Returns the
/// directories that were created.
///
/// # Errors
///
/// Returns an error if a directory cannot be created or chowned.
pub fn ensure_owned_dirs(root: &Path, dirs: &[&str], owner: DataOwnerConfig) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for dir in dirs {
        let path = safe_join(root, dir)?;
        if path.exists() {
            continue;
        }
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        if owner.chown {
            chown(&path, owner.uid, owner.gid)?;
        }
        debug!("Created {}", path.display());
        created.push(path);
    }
    Ok(created)
}

#[cfg(unix)]
fn chown(path: &Path, uid: u32, gid: u32) -> Result<()> {
    let uid = nix::unistd::Uid::from_raw(uid);
    let gid = nix::unistd::Gid::from_raw(gid);
    nix::unistd::chown(path, Some(uid), Some(gid))
        .with_context(|| format!("Failed to chown {}", path.display()))
}

#[cfg(not(unix))]
fn chown(path: &Path, _uid: u32, _gid: u32) -> Result<()> {
    debug!("Skipping chown of {} on this platform", path.display());
    Ok(())
}

/// Removes a directory tree; a missing tree is fine and other failures are only logged.
pub fn remove_dir_best_effort(path: &Path) {
    match fs::remove_dir_all(path) {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

/// Removes a file if it exists.
///
/// # Errors
///
/// Returns an error for any failure other than the file being absent.
pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

/// Recursively copies `src` into `dst`, creating `dst` as needed. Existing files are
/// overwritten; symlinks are recreated rather than followed. Returns the number of files
/// copied.
///
/// # Errors
///
/// Returns an error if any entry cannot be read or written.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
    fs::create_dir_all(dst).with_context(|| format!("Failed to create {}", dst.display()))?;
    let mut copied = 0;

    for entry in fs::read_dir(src).with_context(|| format!("Failed to read {}", src.display()))? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            copied += copy_tree(&from, &to)?;
        } else if file_type.is_symlink() {
            copy_symlink(&from, &to)?;
            copied += 1;
        } else {
            fs::copy(&from, &to)
                .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    let target = fs::read_link(from)?;
    remove_file_if_exists(to)?;
    std::os::unix::fs::symlink(&target, to)
        .with_context(|| format!("Failed to link {} -> {}", to.display(), target.display()))
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to)
        .map(|_| ())
        .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_join() {
        let root = PathBuf::from("/tmp/root");

        assert_eq!(safe_join(&root, "foo/bar").ok(), Some(root.join("foo/bar")));
        assert_eq!(safe_join(&root, "foo/../bar").ok(), Some(root.join("bar")));

        assert!(safe_join(&root, "../foo").is_err());
        assert!(safe_join(&root, "foo/../../bar").is_err());
        assert!(safe_join(&root, "/etc").is_err());
    }

    #[test]
    fn existing_dirs_are_not_recreated() {
        let tmp = tempfile::tempdir().unwrap();
        let owner = DataOwnerConfig {
            chown: false,
            ..DataOwnerConfig::default()
        };
        std::fs::create_dir(tmp.path().join("odoo")).unwrap();

        let created =
            ensure_owned_dirs(tmp.path(), &["odoo", "odoo/etc", "postgresql"], owner).unwrap();
        assert_eq!(
            created,
            vec![tmp.path().join("odoo/etc"), tmp.path().join("postgresql")]
        );
        assert!(ensure_owned_dirs(tmp.path(), &["odoo/etc"], owner).unwrap().is_empty());
    }

    #[test]
    fn copy_tree_merges_into_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("site");
        std::fs::create_dir_all(src.join("css")).unwrap();
        std::fs::write(src.join("index.php"), "<?php").unwrap();
        std::fs::write(src.join("css/app.css"), "body{}").unwrap();

        let dst = tmp.path().join("httpdocs");
        std::fs::create_dir_all(&dst).unwrap();
        std::fs::write(dst.join("index.php"), "old").unwrap();

        assert_eq!(copy_tree(&src, &dst).unwrap(), 2);
        assert_eq!(std::fs::read_to_string(dst.join("index.php")).unwrap(), "<?php");
        assert!(dst.join("css/app.css").is_file());
    }

    #[test]
    fn removal_tolerates_missing_paths() {
        let tmp = tempfile::tempdir().unwrap();
        remove_dir_best_effort(&tmp.path().join("missing"));
        remove_file_if_exists(&tmp.path().join("missing.txt")).unwrap();
    }
}
