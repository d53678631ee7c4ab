// SPDX-License-Identifier: MPL-2.0
//! Recursive media scan of a selected folder.
//!
//! A scan walks the folder tree, keeps files whose extension belongs to the
//! [`ExtensionSet`], and returns them sorted. Scans run on the blocking pool
//! and can be superseded at any time: each request carries a generation
//! number, and the [`ScanHandle`] returned by [`spawn`] cancels the walk when
//! it is dropped.

use crate::error::{Error, Result};
use crate::media::ExtensionSet;
use iced::Task;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use walkdir::WalkDir;

/// Parameters of one scan.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Folder walked recursively.
    pub folder: PathBuf,
    pub extensions: ExtensionSet,
    /// File the caller wants selected once the list is known.
    pub target: Option<PathBuf>,
    pub generation: u64,
}

impl ScanRequest {
    /// Scan of `folder` with the default extension set and no target.
    pub fn folder(folder: impl Into<PathBuf>, generation: u64) -> Self {
        Self {
            folder: folder.into(),
            extensions: ExtensionSet::default(),
            target: None,
            generation,
        }
    }

    /// Scan of the parent of `file`, with `file` as target.
    ///
    /// Returns `None` when the file has no parent directory.
    pub fn around_file(file: impl Into<PathBuf>, generation: u64) -> Option<Self> {
        let file = file.into();
        let folder = file.parent()?.to_path_buf();
        Some(Self {
            folder,
            extensions: ExtensionSet::default(),
            target: Some(file),
            generation,
        })
    }
}

/// Result of a completed scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Matching files, sorted by full path.
    pub media: Vec<PathBuf>,
    pub target: Option<PathBuf>,
    pub generation: u64,
}

/// Shared flag polled by a running scan.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Walks `request.folder` and collects matching media files.
///
/// Unreadable entries below the root are skipped. The cancel flag is checked
/// before each entry.
///
/// # Errors
///
/// Returns [`Error::Io`] if the root folder cannot be read and
/// [`Error::Cancelled`] if the flag was raised during the walk.
pub fn scan(request: &ScanRequest, cancel: &CancelFlag) -> Result<ScanOutcome> {
    let mut media = Vec::new();

    for entry in WalkDir::new(&request.folder).follow_links(false) {
        if cancel.is_cancelled() {
            tracing::debug!(folder = %request.folder.display(), "scan cancelled");
            return Err(Error::Cancelled);
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => return Err(err.into()),
            Err(err) => {
                tracing::debug!("skipping unreadable entry: {err}");
                continue;
            }
        };

        if is_file_entry(&entry) && request.extensions.matches(entry.path()) {
            media.push(entry.into_path());
        }
    }

    sort_paths(&mut media);

    Ok(ScanOutcome {
        media,
        target: request.target.clone(),
        generation: request.generation,
    })
}

fn is_file_entry(entry: &walkdir::DirEntry) -> bool {
    let file_type = entry.file_type();
    // Symlinks are not descended into, but links to files are still listed.
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}

/// Sorts paths by their raw OS string, so "B.png" sorts before "a.png".
pub fn sort_paths(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
}

/// Handle to a scan running in the background.
///
/// Dropping the handle cancels the scan and aborts its task.
#[derive(Debug)]
pub struct ScanHandle {
    generation: u64,
    cancel: CancelFlag,
    _task: iced::task::Handle,
}

impl ScanHandle {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Flag polled by the worker of this scan.
    #[cfg(test)]
    pub(crate) fn worker_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn scan_on_blocking_pool(request: ScanRequest, cancel: CancelFlag) -> Result<ScanOutcome> {
    match tokio::task::spawn_blocking(move || scan(&request, &cancel)).await {
        Ok(result) => result,
        Err(e) => Err(Error::Io(format!("scan task failed: {e}"))),
    }
}

/// Starts `request` on the blocking pool.
///
/// `on_done` receives the request generation together with the scan result,
/// so late results of superseded scans can be recognised and dropped.
pub fn spawn<M, F>(request: ScanRequest, on_done: F) -> (Task<M>, ScanHandle)
where
    M: Send + 'static,
    F: FnOnce(u64, Result<ScanOutcome>) -> M + Send + 'static,
{
    let cancel = CancelFlag::new();
    let generation = request.generation;
    let worker_flag = cancel.clone();

    tracing::info!(folder = %request.folder.display(), generation, "scanning folder");

    let (task, handle) = Task::perform(scan_on_blocking_pool(request, worker_flag), move |result| {
        on_done(generation, result)
    })
    .abortable();

    let handle = ScanHandle {
        generation,
        cancel,
        _task: handle.abort_on_drop(),
    };

    (task, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn touch(dir: &Path, relative: &str) -> PathBuf {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        fs::write(&path, b"x").expect("failed to write fixture");
        path
    }

    #[test]
    fn scan_finds_media_recursively_and_sorted() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let root = temp_dir.path();
        let b = touch(root, "b.png");
        let a = touch(root, "a.jpg");
        let nested = touch(root, "sub/deeper/clip.mp4");
        touch(root, "notes.txt");
        touch(root, "sub/readme.md");

        let outcome = scan(&ScanRequest::folder(root, 1), &CancelFlag::new())
            .expect("scan should succeed");

        assert_eq!(outcome.media, vec![a, b, nested]);
        assert_eq!(outcome.generation, 1);
        assert!(outcome.target.is_none());
    }

    #[test]
    fn scan_matches_extensions_case_insensitively() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let root = temp_dir.path();
        let upper = touch(root, "HOLIDAY.JPG");
        let mixed = touch(root, "loop.Gif");

        let outcome = scan(&ScanRequest::folder(root, 0), &CancelFlag::new())
            .expect("scan should succeed");

        assert_eq!(outcome.media.len(), 2);
        assert!(outcome.media.contains(&upper));
        assert!(outcome.media.contains(&mixed));
    }

    #[test]
    fn scan_echoes_target() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let file = touch(temp_dir.path(), "pick.bmp");
        touch(temp_dir.path(), "other.png");

        let request = ScanRequest::around_file(&file, 7).expect("file has a parent");
        assert_eq!(request.folder, temp_dir.path());

        let outcome = scan(&request, &CancelFlag::new()).expect("scan should succeed");
        assert_eq!(outcome.target.as_deref(), Some(file.as_path()));
        assert_eq!(outcome.generation, 7);
    }

    #[test]
    fn scan_respects_custom_extension_set() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let root = temp_dir.path();
        touch(root, "a.jpg");
        let video = touch(root, "b.mkv");

        let mut request = ScanRequest::folder(root, 0);
        request.extensions = ExtensionSet::from_pairs([("mkv", MediaKind::Video)]);

        let outcome = scan(&request, &CancelFlag::new()).expect("scan should succeed");
        assert_eq!(outcome.media, vec![video]);
    }

    #[test]
    fn scan_of_empty_folder_is_empty() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let outcome = scan(&ScanRequest::folder(temp_dir.path(), 0), &CancelFlag::new())
            .expect("scan should succeed");
        assert!(outcome.media.is_empty());
    }

    #[test]
    fn scan_of_missing_folder_is_io_error() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let missing = temp_dir.path().join("gone");

        match scan(&ScanRequest::folder(missing, 0), &CancelFlag::new()) {
            Err(Error::Io(_)) => {}
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn cancelled_flag_aborts_scan() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        touch(temp_dir.path(), "a.jpg");

        let flag = CancelFlag::new();
        flag.cancel();

        match scan(&ScanRequest::folder(temp_dir.path(), 0), &flag) {
            Err(Error::Cancelled) => {}
            other => panic!("expected Cancelled, got {other:?}"),
        }
    }

    #[test]
    fn sort_paths_uses_byte_order() {
        let mut paths = vec![
            PathBuf::from("/m/b.png"),
            PathBuf::from("/m/B.png"),
            PathBuf::from("/m/a.png"),
        ];
        sort_paths(&mut paths);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/m/B.png"),
                PathBuf::from("/m/a.png"),
                PathBuf::from("/m/b.png"),
            ]
        );
    }

    #[test]
    fn around_file_without_parent_is_none() {
        assert!(ScanRequest::around_file("/", 0).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn scan_does_not_descend_into_symlinked_dirs() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().join("root");
        let outside = temp_dir.path().join("outside");
        touch(&outside, "far.png");
        fs::create_dir_all(&root).expect("create root");
        std::os::unix::fs::symlink(&outside, root.join("link")).expect("symlink");

        let outcome = scan(&ScanRequest::folder(&root, 0), &CancelFlag::new())
            .expect("scan should succeed");
        assert!(outcome.media.is_empty());
    }

    #[test]
    fn dropping_the_handle_cancels_the_worker() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let (_task, handle) = spawn(ScanRequest::folder(temp_dir.path(), 4), |_, _| ());
        let flag = handle.worker_flag();
        assert_eq!(handle.generation(), 4);
        assert!(!flag.is_cancelled());

        drop(handle);
        assert!(flag.is_cancelled());
    }

    #[test]
    fn cancel_raises_the_worker_flag() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let (_task, handle) = spawn(ScanRequest::folder(temp_dir.path(), 1), |_, _| ());

        handle.cancel();
        assert!(handle.worker_flag().is_cancelled());
    }

    #[tokio::test]
    async fn blocking_pool_scan_keeps_generation_and_honours_cancel() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let image = touch(temp_dir.path(), "a.png");

        let request = ScanRequest::folder(temp_dir.path(), 9);
        let outcome = scan_on_blocking_pool(request, CancelFlag::new())
            .await
            .expect("scan should succeed");
        assert_eq!(outcome.generation, 9);
        assert_eq!(outcome.media, vec![image]);

        let cancelled = CancelFlag::new();
        cancelled.cancel();
        let request = ScanRequest::folder(temp_dir.path(), 10);
        let result = scan_on_blocking_pool(request, cancelled).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
