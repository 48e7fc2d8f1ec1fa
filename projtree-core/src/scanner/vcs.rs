use std::path::Path;

/// Directory and file names used by version control systems for their metadata
pub const VCS_METADATA_NAMES: &[&str] = &[".git", ".svn", ".hg", ".bzr", "CVS", "_darcs"];

/// Decides which entries of a scanned directory belong to version control
/// and must not show up as project files
pub trait VcsIgnore {
    fn is_vcs_file_or_directory(&self, dir: &Path, path: &Path) -> bool;
}

impl<F> VcsIgnore for F
where
    F: Fn(&Path, &Path) -> bool,
{
    fn is_vcs_file_or_directory(&self, dir: &Path, path: &Path) -> bool {
        self(dir, path)
    }
}

/// Treats nothing as version control metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVcs;

impl VcsIgnore for NoVcs {
    fn is_vcs_file_or_directory(&self, _dir: &Path, _path: &Path) -> bool {
        false
    }
}

/// Recognizes the metadata directories of common version control systems
#[derive(Debug, Clone, Copy, Default)]
pub struct VcsMetadata;

impl VcsIgnore for VcsMetadata {
    fn is_vcs_file_or_directory(&self, _dir: &Path, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| VCS_METADATA_NAMES.contains(&name))
    }
}
