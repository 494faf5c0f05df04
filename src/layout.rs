use std::path::{Path, PathBuf};

const INSTALL_SUBDIR: &str = "kubo";
const BINARY_NAME: &str = "ipfs";
const SCRATCH_SUBDIR: &str = "tmp";
const ARCHIVE_NAME: &str = "ipfs.tar";

/// On-disk locations, all relative to one root (the working directory by default).
///
/// `kubo/` holds the installed binary, `tmp/` holds in-flight downloads. The two never overlap.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// kubo/
    pub fn install_dir(&self) -> PathBuf {
        self.root.join(INSTALL_SUBDIR)
    }

    /// kubo/ipfs
    pub fn binary_path(&self) -> PathBuf {
        self.install_dir().join(BINARY_NAME)
    }

    /// tmp/
    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join(SCRATCH_SUBDIR)
    }

    /// tmp/ipfs.tar
    pub fn archive_path(&self) -> PathBuf {
        self.scratch_dir().join(ARCHIVE_NAME)
    }
}

/// The resolved executable. Recomputed by inspecting the filesystem every time, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBinary {
    pub path: PathBuf,
    pub present: bool,
}

impl InstalledBinary {
    pub fn inspect(layout: &Layout) -> Self {
        let path = layout.binary_path();
        let present = path.is_file();
        tracing::trace!(path = %path.display(), present, "Inspected kubo binary");
        Self { path, present }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = Layout::new("/work");
        assert_eq!(layout.binary_path(), PathBuf::from("/work/kubo/ipfs"));
        assert_eq!(layout.archive_path(), PathBuf::from("/work/tmp/ipfs.tar"));
        assert!(!layout.scratch_dir().starts_with(layout.install_dir()));
        assert!(!layout.install_dir().starts_with(layout.scratch_dir()));
    }

    #[test]
    fn test_inspect_reflects_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        assert!(!InstalledBinary::inspect(&layout).present);

        std::fs::create_dir_all(layout.install_dir()).unwrap();
        std::fs::write(layout.binary_path(), b"bin").unwrap();
        assert!(InstalledBinary::inspect(&layout).present);

        std::fs::remove_file(layout.binary_path()).unwrap();
        assert!(!InstalledBinary::inspect(&layout).present);
    }
}
