mod progress;
mod vcs;
mod walker;

pub use progress::{ScanMessage, ScanProgress};
pub use vcs::{NoVcs, VCS_METADATA_NAMES, VcsIgnore, VcsMetadata};
pub use walker::{
    CancellationToken, PROGRESS_MAXIMUM, ScanConfig, ScanControl, Scanner, scan_for_files,
};
