// SPDX-License-Identifier: MPL-2.0
//! Ordered media list with a clamped cursor.
//!
//! A [`MediaList`] is rebuilt from every completed directory scan and owns the
//! "current index" the preview pane follows. Navigation never wraps: stepping
//! past either end leaves the cursor where it is.

use std::path::{Path, PathBuf};

/// Sorted list of media paths with an optional current position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaList {
    media_files: Vec<PathBuf>,
    current_index: Option<usize>,
}

impl MediaList {
    /// Creates a new empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from scan results.
    ///
    /// The cursor points at `target` when it is part of the list, at the
    /// first entry otherwise, and is `None` for an empty list.
    #[must_use]
    pub fn from_scan(media_files: Vec<PathBuf>, target: Option<&Path>) -> Self {
        let current_index = if media_files.is_empty() {
            None
        } else {
            target
                .and_then(|target| media_files.iter().position(|p| p == target))
                .or(Some(0))
        };

        Self {
            media_files,
            current_index,
        }
    }

    /// Returns the current media path.
    pub fn current(&self) -> Option<&Path> {
        self.current_index
            .and_then(|idx| self.media_files.get(idx))
            .map(PathBuf::as_path)
    }

    /// Returns the current index if set.
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Moves the cursor by `step` positions.
    ///
    /// Returns the new current path when the cursor moved. Steps that would
    /// leave the list bounds are ignored and return `None`.
    pub fn navigate(&mut self, step: isize) -> Option<&Path> {
        let current = self.current_index?;
        let target = current.checked_add_signed(step)?;
        if step == 0 || target >= self.media_files.len() {
            return None;
        }
        self.current_index = Some(target);
        self.current()
    }

    /// True when the cursor is on the first entry.
    pub fn is_at_first(&self) -> bool {
        matches!(self.current_index, Some(0))
    }

    /// True when the cursor is on the last entry.
    pub fn is_at_last(&self) -> bool {
        matches!(self.current_index, Some(idx) if idx + 1 == self.media_files.len())
    }

    /// Returns the total number of media files in the list.
    pub fn len(&self) -> usize {
        self.media_files.len()
    }

    /// Checks if the media list is empty.
    pub fn is_empty(&self) -> bool {
        self.media_files.is_empty()
    }

    /// Drops every entry and resets the cursor.
    pub fn clear(&mut self) {
        self.media_files.clear();
        self.current_index = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/m/{n}"))).collect()
    }

    #[test]
    fn from_scan_points_at_target() {
        let list = MediaList::from_scan(
            paths(&["a.jpg", "b.png", "c.mp4"]),
            Some(Path::new("/m/b.png")),
        );
        assert_eq!(list.current_index(), Some(1));
        assert_eq!(list.current(), Some(Path::new("/m/b.png")));
    }

    #[test]
    fn from_scan_falls_back_to_first_when_target_missing() {
        let list = MediaList::from_scan(
            paths(&["a.jpg", "b.png"]),
            Some(Path::new("/elsewhere/x.png")),
        );
        assert_eq!(list.current_index(), Some(0));

        let no_target = MediaList::from_scan(paths(&["a.jpg"]), None);
        assert_eq!(no_target.current_index(), Some(0));
    }

    #[test]
    fn empty_scan_has_no_cursor() {
        let list = MediaList::from_scan(Vec::new(), Some(Path::new("/m/a.jpg")));
        assert!(list.is_empty());
        assert_eq!(list.current_index(), None);
        assert!(list.current().is_none());
        assert!(!list.is_at_first());
        assert!(!list.is_at_last());
    }

    #[test]
    fn navigate_moves_within_bounds() {
        let mut list = MediaList::from_scan(paths(&["a.jpg", "b.png", "c.mp4"]), None);

        assert_eq!(list.navigate(1), Some(Path::new("/m/b.png")));
        assert_eq!(list.navigate(1), Some(Path::new("/m/c.mp4")));
        assert!(list.is_at_last());
        assert_eq!(list.navigate(-1), Some(Path::new("/m/b.png")));
    }

    #[test]
    fn navigate_past_ends_is_ignored() {
        let mut list = MediaList::from_scan(paths(&["a.jpg", "b.png"]), None);

        assert_eq!(list.navigate(-1), None);
        assert_eq!(list.current_index(), Some(0));

        list.navigate(1);
        assert_eq!(list.navigate(1), None);
        assert_eq!(list.current_index(), Some(1));
    }

    #[test]
    fn navigate_on_empty_list_is_noop() {
        let mut list = MediaList::new();
        assert_eq!(list.navigate(1), None);
        assert_eq!(list.navigate(-1), None);
        assert_eq!(list.current_index(), None);
    }

    #[test]
    fn single_entry_is_both_first_and_last() {
        let mut list = MediaList::from_scan(paths(&["only.gif"]), None);
        assert!(list.is_at_first());
        assert!(list.is_at_last());
        assert_eq!(list.navigate(1), None);
        assert_eq!(list.navigate(-1), None);
    }

    #[test]
    fn clear_resets_everything() {
        let mut list = MediaList::from_scan(paths(&["a.jpg"]), None);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.current_index(), None);
    }
}
