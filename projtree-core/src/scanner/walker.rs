use std::cell::Cell;
use std::collections::HashSet;
use std::fs::FileType;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use jwalk::{Parallelism, WalkDir};
use log::{debug, trace};

use super::progress::{ScanMessage, ScanProgress};
use super::vcs::{NoVcs, VcsIgnore, VcsMetadata};
use crate::error::{ProjtreeError, Result};
use crate::tree::FileNode;

/// Upper end of the progress range of every scan
pub const PROGRESS_MAXIMUM: u64 = 1_000_000;

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Descend into symlinked directories. Symlink cycles are cut off either way.
    pub follow_symlinks: bool,
    /// Leave out version control metadata such as `.git`
    pub skip_vcs: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: true,
            skip_vcs: true,
        }
    }
}

/// Cancellation token for stopping scans
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress sink and cancellation source for [`scan_for_files`]
pub trait ScanControl {
    fn is_cancelled(&self) -> bool;
    fn set_progress_range(&self, minimum: u64, maximum: u64);
    fn set_progress_value(&self, value: u64);
    fn progress_maximum(&self) -> u64;
}

/// Recursively collect every file below `dir`, building nodes with `factory`.
///
/// Entries matched by `vcs` are skipped together with everything below them.
/// Symlinked directories are followed, but a directory whose canonical path
/// was already visited is not entered again. When `control` reports
/// cancellation the files found so far are returned.
pub fn scan_for_files<F>(
    dir: &Path,
    factory: F,
    vcs: &dyn VcsIgnore,
    control: Option<&dyn ScanControl>,
) -> Vec<FileNode>
where
    F: Fn(&Path) -> FileNode,
{
    walk(dir, &factory, vcs, control, true)
}

fn walk(
    dir: &Path,
    factory: &dyn Fn(&Path) -> FileNode,
    vcs: &dyn VcsIgnore,
    control: Option<&dyn ScanControl>,
    follow_symlinks: bool,
) -> Vec<FileNode> {
    if let Some(control) = control {
        control.set_progress_range(0, PROGRESS_MAXIMUM);
    }
    let mut walk = Walk {
        factory,
        vcs,
        control,
        follow_symlinks,
        visited: HashSet::new(),
        files: Vec::new(),
        last_reported: 0,
    };
    walk.directory(dir, 0.0, PROGRESS_MAXIMUM as f64);
    debug!(
        "Scanned {}: {} files in {} directories",
        dir.display(),
        walk.files.len(),
        walk.visited.len()
    );
    walk.files
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Directory,
    File,
    Skip,
}

struct Walk<'a> {
    factory: &'a dyn Fn(&Path) -> FileNode,
    vcs: &'a dyn VcsIgnore,
    control: Option<&'a dyn ScanControl>,
    follow_symlinks: bool,
    /// Canonical paths of entered directories
    visited: HashSet<PathBuf>,
    files: Vec<FileNode>,
    last_reported: u64,
}

impl Walk<'_> {
    /// Scan one directory, spending the progress budget `start..start + range`
    /// evenly across its entries
    fn directory(&mut self, dir: &Path, start: f64, range: f64) {
        let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        if !self.visited.insert(canonical.clone()) {
            trace!("Not entering {} again", dir.display());
            return;
        }

        let entries = self.list(dir, &canonical);
        let increment = if entries.is_empty() {
            0.0
        } else {
            range / entries.len() as f64
        };

        let mut progress = 0.0;
        for (path, kind) in entries {
            if self.is_cancelled() {
                trace!("Scan cancelled in {}", dir.display());
                return;
            }
            if !self.vcs.is_vcs_file_or_directory(dir, &path) {
                match kind {
                    EntryKind::Directory => {
                        self.directory(&path, start + progress, increment);
                        // a cancelled sub-directory must not advance the budget
                        if self.is_cancelled() {
                            return;
                        }
                    }
                    EntryKind::File => self.files.push((self.factory)(&path)),
                    EntryKind::Skip => {}
                }
            }
            progress += increment;
            self.report(start + progress);
        }
        self.report(start + range);
    }

    fn is_cancelled(&self) -> bool {
        self.control.is_some_and(|c| c.is_cancelled())
    }

    /// Entries of `dir` sorted by name. The listing reads the canonical
    /// directory, the returned paths stay below `dir`.
    ///
    /// jwalk only lists a single level here. Recursion stays in
    /// [`Walk::directory`], which owns the per-level progress budget and the
    /// canonical-path cycle guard.
    fn list(&self, dir: &Path, canonical: &Path) -> Vec<(PathBuf, EntryKind)> {
        WalkDir::new(canonical)
            .min_depth(1)
            .max_depth(1)
            .skip_hidden(false)
            .follow_links(self.follow_symlinks)
            .sort(true)
            .parallelism(Parallelism::Serial)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => {
                    let path = dir.join(entry.file_name());
                    let kind = self.classify(&path, entry.file_type());
                    Some((path, kind))
                }
                Err(err) => {
                    trace!("Skipping entry in {}: {err}", dir.display());
                    None
                }
            })
            .collect()
    }

    fn classify(&self, path: &Path, file_type: FileType) -> EntryKind {
        if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_symlink() {
            if path.is_dir() {
                if self.follow_symlinks {
                    EntryKind::Directory
                } else {
                    EntryKind::Skip
                }
            } else if path.exists() {
                EntryKind::File
            } else {
                // dangling
                EntryKind::Skip
            }
        } else {
            EntryKind::File
        }
    }

    fn report(&mut self, value: f64) {
        let Some(control) = self.control else {
            return;
        };
        let value = (value as u64).min(control.progress_maximum());
        if value > self.last_reported {
            control.set_progress_value(value);
            self.last_reported = value;
        }
    }
}

/// Forwards scan progress to the channel of a [`Scanner`]
struct ChannelControl {
    token: CancellationToken,
    tx: Sender<ScanMessage>,
    maximum: Cell<u64>,
}

impl ScanControl for ChannelControl {
    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    fn set_progress_range(&self, _minimum: u64, maximum: u64) {
        self.maximum.set(maximum);
    }

    fn set_progress_value(&self, value: u64) {
        let _ = self.tx.send(ScanMessage::Progress(ScanProgress {
            value,
            maximum: self.maximum.get(),
        }));
    }

    fn progress_maximum(&self) -> u64 {
        self.maximum.get()
    }
}

/// Scans project directories on a background thread
pub struct Scanner {
    config: ScanConfig,
    cancel_token: CancellationToken,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Scan a directory for files.
    /// Returns a receiver for progress updates and spawns scanning in background;
    /// the handle yields the files found.
    pub fn scan<F>(
        self,
        root: PathBuf,
        factory: F,
    ) -> Result<(Receiver<ScanMessage>, JoinHandle<Vec<FileNode>>)>
    where
        F: Fn(&Path) -> FileNode + Send + 'static,
    {
        let metadata = std::fs::metadata(&root).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ProjtreeError::PathNotFound(root.clone()),
            _ => ProjtreeError::Io(err),
        })?;
        if !metadata.is_dir() {
            return Err(ProjtreeError::NotADirectory(root));
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = std::thread::spawn(move || self.scan_sync(root, factory, tx));

        Ok((rx, handle))
    }

    /// Synchronous scan (runs in thread)
    fn scan_sync<F>(self, root: PathBuf, factory: F, tx: Sender<ScanMessage>) -> Vec<FileNode>
    where
        F: Fn(&Path) -> FileNode,
    {
        let _ = tx.send(ScanMessage::Started(root.clone()));

        let control = ChannelControl {
            token: self.cancel_token.clone(),
            tx: tx.clone(),
            maximum: Cell::new(0),
        };
        let vcs: &dyn VcsIgnore = if self.config.skip_vcs {
            &VcsMetadata
        } else {
            &NoVcs
        };
        let files = walk(
            &root,
            &factory,
            vcs,
            Some(&control),
            self.config.follow_symlinks,
        );

        if self.cancel_token.is_cancelled() {
            let _ = tx.send(ScanMessage::Cancelled);
        } else {
            let _ = tx.send(ScanMessage::Completed);
        }

        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    /// Records progress and cancels once `cancel_after` values were reported
    #[derive(Default)]
    struct Recorder {
        cancel_after: Option<usize>,
        maximum: Cell<u64>,
        values: RefCell<Vec<u64>>,
    }

    impl ScanControl for Recorder {
        fn is_cancelled(&self) -> bool {
            self.cancel_after
                .is_some_and(|n| self.values.borrow().len() >= n)
        }

        fn set_progress_range(&self, _minimum: u64, maximum: u64) {
            self.maximum.set(maximum);
        }

        fn set_progress_value(&self, value: u64) {
            self.values.borrow_mut().push(value);
        }

        fn progress_maximum(&self) -> u64 {
            self.maximum.get()
        }
    }

    fn classify(path: &Path) -> FileNode {
        FileNode::classified(path)
    }

    fn relative_paths(root: &Path, files: &[FileNode]) -> Vec<String> {
        let mut paths: Vec<String> = files
            .iter()
            .map(|f| {
                f.path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        paths.sort();
        paths
    }

    fn project_dir() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/gui")).unwrap();
        fs::create_dir(temp.path().join("empty")).unwrap();
        fs::write(temp.path().join("app.pro"), "").unwrap();
        fs::write(temp.path().join("src/main.cpp"), "").unwrap();
        fs::write(temp.path().join("src/gui/window.h"), "").unwrap();
        temp
    }

    #[test]
    fn test_scan_collects_nested_files() {
        let temp = project_dir();
        let files = scan_for_files(temp.path(), classify, &NoVcs, None);

        assert_eq!(
            relative_paths(temp.path(), &files),
            ["app.pro", "src/gui/window.h", "src/main.cpp"]
        );
        let window = files
            .iter()
            .find(|f| f.path().ends_with("window.h"))
            .unwrap();
        assert_eq!(window.file_type(), crate::tree::FileType::Header);
    }

    #[test]
    fn test_vcs_entries_are_skipped() {
        let temp = project_dir();
        fs::create_dir(temp.path().join(".git")).unwrap();
        fs::write(temp.path().join(".git/HEAD"), "").unwrap();
        fs::write(temp.path().join("src/main.o"), "").unwrap();

        let files = scan_for_files(temp.path(), classify, &VcsMetadata, None);
        assert_eq!(files.len(), 4);
        assert!(files.iter().all(|f| !f.path().ends_with("HEAD")));

        let objects = |_dir: &Path, path: &Path| {
            VcsMetadata.is_vcs_file_or_directory(_dir, path)
                || path.extension().is_some_and(|e| e == "o")
        };
        let files = scan_for_files(temp.path(), classify, &objects, None);
        assert_eq!(
            relative_paths(temp.path(), &files),
            ["app.pro", "src/gui/window.h", "src/main.cpp"]
        );
    }

    #[test]
    fn test_progress_is_monotonic_and_ends_at_maximum() {
        let temp = project_dir();
        let recorder = Recorder::default();
        scan_for_files(temp.path(), classify, &NoVcs, Some(&recorder));

        assert_eq!(recorder.maximum.get(), PROGRESS_MAXIMUM);
        let values = recorder.values.borrow();
        assert!(!values.is_empty());
        assert!(values.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(values.last(), Some(&PROGRESS_MAXIMUM));
    }

    #[test]
    fn test_empty_directory_reports_completion() {
        let temp = TempDir::new().unwrap();
        let recorder = Recorder::default();
        let files = scan_for_files(temp.path(), classify, &NoVcs, Some(&recorder));

        assert!(files.is_empty());
        assert_eq!(*recorder.values.borrow(), [PROGRESS_MAXIMUM]);
    }

    #[test]
    fn test_cancellation_returns_partial_result() {
        let temp = TempDir::new().unwrap();
        for i in 0..10 {
            fs::write(temp.path().join(format!("f{i}.txt")), "").unwrap();
        }
        let recorder = Recorder {
            cancel_after: Some(3),
            ..Recorder::default()
        };

        let files = scan_for_files(temp.path(), classify, &NoVcs, Some(&recorder));
        assert_eq!(files.len(), 3);
        assert!(recorder.values.borrow().iter().all(|&v| v < PROGRESS_MAXIMUM));
    }

    #[test]
    fn test_cancellation_inside_nested_directory_stops_progress() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();
        for i in 0..10 {
            fs::write(temp.path().join(format!("nested/f{i}.txt")), "").unwrap();
        }
        fs::write(temp.path().join("z.txt"), "").unwrap();
        let recorder = Recorder {
            cancel_after: Some(3),
            ..Recorder::default()
        };

        let files = scan_for_files(temp.path(), classify, &NoVcs, Some(&recorder));
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|f| f.path().starts_with(temp.path().join("nested"))));
        // nested gets half the range, each of its files a tenth of that
        assert_eq!(*recorder.values.borrow(), [50_000, 100_000, 150_000]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_terminates() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("f.txt"), "").unwrap();
        std::os::unix::fs::symlink(&dir, dir.join("loop")).unwrap();

        let files = scan_for_files(temp.path(), classify, &NoVcs, None);
        assert_eq!(relative_paths(temp.path(), &files), ["a/f.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_can_be_ignored() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("real")).unwrap();
        fs::write(temp.path().join("real/x.txt"), "").unwrap();
        std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("link")).unwrap();

        let config = ScanConfig {
            follow_symlinks: false,
            ..ScanConfig::default()
        };
        let (rx, handle) = Scanner::new(config)
            .scan(temp.path().to_path_buf(), classify)
            .unwrap();
        for _ in rx {}
        let files = handle.join().unwrap();
        assert_eq!(relative_paths(temp.path(), &files), ["real/x.txt"]);

        // followed, the directory is entered once under whichever name comes first
        let files = scan_for_files(temp.path(), classify, &NoVcs, None);
        assert_eq!(relative_paths(temp.path(), &files), ["link/x.txt"]);
    }

    #[test]
    fn test_scanner_messages() {
        let temp = project_dir();
        fs::create_dir(temp.path().join(".git")).unwrap();
        fs::write(temp.path().join(".git/HEAD"), "").unwrap();

        let (rx, handle) = Scanner::new(ScanConfig::default())
            .scan(temp.path().to_path_buf(), classify)
            .unwrap();
        let messages: Vec<ScanMessage> = rx.iter().collect();
        let files = handle.join().unwrap();

        assert_eq!(files.len(), 3);
        assert_eq!(
            messages.first(),
            Some(&ScanMessage::Started(temp.path().to_path_buf()))
        );
        assert_eq!(messages.last(), Some(&ScanMessage::Completed));
        let last_progress = messages
            .iter()
            .rev()
            .find_map(|m| match m {
                ScanMessage::Progress(p) => Some(*p),
                _ => None,
            })
            .unwrap();
        assert!(last_progress.is_done());
        assert_eq!(last_progress.maximum, PROGRESS_MAXIMUM);
    }

    #[test]
    fn test_scanner_cancelled_up_front() {
        let temp = project_dir();
        let token = CancellationToken::new();
        token.cancel();

        let (rx, handle) = Scanner::new(ScanConfig::default())
            .with_cancellation(token)
            .scan(temp.path().to_path_buf(), classify)
            .unwrap();
        let messages: Vec<ScanMessage> = rx.iter().collect();

        assert!(handle.join().unwrap().is_empty());
        assert_eq!(
            messages,
            [
                ScanMessage::Started(temp.path().to_path_buf()),
                ScanMessage::Cancelled,
            ]
        );
    }

    #[test]
    fn test_scanner_rejects_bad_roots() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");
        assert!(matches!(
            Scanner::new(ScanConfig::default()).scan(missing, classify),
            Err(ProjtreeError::PathNotFound(_))
        ));

        let file = temp.path().join("file.txt");
        fs::write(&file, "").unwrap();
        assert!(matches!(
            Scanner::new(ScanConfig::default()).scan(file, classify),
            Err(ProjtreeError::NotADirectory(_))
        ));
    }
}
