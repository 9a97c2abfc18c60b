//! Activation switch.
//!
//! Repoints the well-known active-configuration symlink at a freshly
//! staged bundle. The new link is created under a temporary sibling name
//! and renamed over the old one in a single filesystem operation, so a
//! reader of the link always sees either the previous bundle or the new
//! one.

use std::path::Path;

use log::info;

use crate::error::SyncError;

pub fn activate(bundle: &Path, active_link: &Path) -> Result<(), SyncError> {
    let fail = |detail: String| SyncError::Activation {
        bundle: bundle.to_path_buf(),
        detail,
    };

    let parent = active_link
        .parent()
        .ok_or_else(|| fail("active link path has no parent directory".into()))?;
    std::fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;

    let file_name = active_link
        .file_name()
        .ok_or_else(|| fail("active link path has no file name".into()))?;
    let mut staged_name = file_name.to_os_string();
    staged_name.push(".staged");
    let staged = parent.join(staged_name);

    // A staged link left behind by an interrupted run is safe to discard.
    if staged.symlink_metadata().is_ok() {
        std::fs::remove_file(&staged).map_err(|e| fail(e.to_string()))?;
    }
    std::os::unix::fs::symlink(bundle, &staged).map_err(|e| fail(e.to_string()))?;
    std::fs::rename(&staged, active_link).map_err(|e| fail(e.to_string()))?;

    info!(
        "Activated bundle {} at {}",
        bundle.display(),
        active_link.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn bundle_dir(root: &Path, name: &str) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("top.sls"), b"marker").unwrap();
        dir
    }

    #[test]
    fn first_activation_creates_the_link() {
        let dir = TempDir::new().unwrap();
        let bundle = bundle_dir(dir.path(), "v1");
        let link = dir.path().join("etc").join("active");

        activate(&bundle, &link).unwrap();
        assert_eq!(std::fs::read_link(&link).unwrap(), bundle);
        assert!(link.join("top.sls").is_file());
    }

    #[test]
    fn activation_repoints_an_existing_link() {
        let dir = TempDir::new().unwrap();
        let old = bundle_dir(dir.path(), "v1");
        let new = bundle_dir(dir.path(), "v2");
        let link = dir.path().join("active");

        activate(&old, &link).unwrap();
        activate(&new, &link).unwrap();

        assert_eq!(std::fs::read_link(&link).unwrap(), new);
        // Prior bundle stays on disk for manual recovery.
        assert!(old.join("top.sls").is_file());
    }

    #[test]
    fn stale_staged_link_is_replaced() {
        let dir = TempDir::new().unwrap();
        let bundle = bundle_dir(dir.path(), "v1");
        let link = dir.path().join("active");

        let staged = dir.path().join("active.staged");
        std::os::unix::fs::symlink(dir.path().join("gone"), &staged).unwrap();

        activate(&bundle, &link).unwrap();
        assert_eq!(std::fs::read_link(&link).unwrap(), bundle);
        assert!(staged.symlink_metadata().is_err());
    }

    #[test]
    fn no_staged_link_survives_activation() {
        let dir = TempDir::new().unwrap();
        let bundle = bundle_dir(dir.path(), "v1");
        let link = dir.path().join("active");

        activate(&bundle, &link).unwrap();
        assert!(dir.path().join("active.staged").symlink_metadata().is_err());
    }
}
