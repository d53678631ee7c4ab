// SPDX-License-Identifier: MPL-2.0
//! Lazy filesystem tree shown in the left pane.
//!
//! Directory nodes list their children the first time they are expanded,
//! on the blocking pool. Only directories and files matching the media
//! [`ExtensionSet`] appear, directories first, names compared
//! case-insensitively.
//!
//! The tree reports selections to the application through [`Effect`]; it never
//! scans or previews anything itself.

use crate::error::{Error, Result};
use crate::i18n::fluent::I18n;
use crate::media::ExtensionSet;
use crate::ui::design_tokens::{sizing, spacing, typography};
use crate::ui::styles;
use iced::widget::{button, column, container, row, scrollable, text, Column, Space};
use iced::{alignment, Element, Length, Task};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

/// One listed child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

impl TreeEntry {
    fn root(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            name,
            is_dir: true,
        }
    }
}

/// Lists the visible children of `dir`.
///
/// Directories are always listed (symlinks to directories included); files
/// only when their extension is in `extensions`. Hidden entries are skipped
/// unless `show_hidden` is set. Entries that cannot be inspected are skipped.
///
/// # Errors
///
/// Returns [`Error::Io`] if `dir` itself cannot be read.
pub fn list_children(
    dir: &Path,
    extensions: &ExtensionSet,
    show_hidden: bool,
) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(dir)? {
        let Ok(entry) = entry else {
            continue;
        };
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        // Follows symlinks so linked folders can be expanded
        let Ok(metadata) = fs::metadata(&path) else {
            tracing::debug!(path = %path.display(), "skipping unreadable tree entry");
            continue;
        };

        if !show_hidden && is_hidden(&name, &metadata) {
            continue;
        }

        let is_dir = metadata.is_dir();
        if !is_dir && !(metadata.is_file() && extensions.matches(&path)) {
            continue;
        }

        entries.push(TreeEntry { path, name, is_dir });
    }

    entries.sort_by(compare_entries);
    Ok(entries)
}

fn compare_entries(a: &TreeEntry, b: &TreeEntry) -> Ordering {
    b.is_dir
        .cmp(&a.is_dir)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

#[cfg(windows)]
fn is_hidden(name: &str, metadata: &fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    name.starts_with('.') || metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0
}

#[cfg(not(windows))]
fn is_hidden(name: &str, _metadata: &fs::Metadata) -> bool {
    name.starts_with('.')
}

/// Top-level entries when no root directory is configured.
///
/// `/` on Unix, every existing drive letter on Windows.
#[must_use]
pub fn filesystem_roots() -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        ('A'..='Z')
            .map(|letter| PathBuf::from(format!("{letter}:\\")))
            .filter(|drive| drive.exists())
            .collect()
    }
    #[cfg(not(windows))]
    {
        vec![PathBuf::from("/")]
    }
}

#[derive(Debug, Clone, Default)]
enum Children {
    #[default]
    Unloaded,
    Loading,
    Loaded(Vec<Node>),
    Failed,
}

#[derive(Debug, Clone)]
struct Node {
    entry: TreeEntry,
    expanded: bool,
    children: Children,
}

impl Node {
    fn new(entry: TreeEntry) -> Self {
        Self {
            entry,
            expanded: false,
            children: Children::Unloaded,
        }
    }
}

fn find_node_mut<'a>(nodes: &'a mut [Node], path: &Path) -> Option<&'a mut Node> {
    for node in nodes {
        if node.entry.path == path {
            return Some(node);
        }
        if !path.starts_with(&node.entry.path) {
            continue;
        }
        if let Children::Loaded(children) = &mut node.children {
            return find_node_mut(children, path);
        }
        return None;
    }
    None
}

#[derive(Debug, Clone)]
pub enum Message {
    /// A row label was clicked.
    RowPressed(PathBuf),
    /// A disclosure arrow was clicked.
    TogglePressed(PathBuf),
    ChildrenLoaded {
        parent: PathBuf,
        result: std::result::Result<Vec<TreeEntry>, Error>,
    },
    OpenFolderPressed,
    FolderPicked(Option<PathBuf>),
}

/// What the application should do after a tree message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// The selection moved to this path.
    Selected(PathBuf),
}

/// Tree pane state.
#[derive(Debug, Clone)]
pub struct State {
    roots: Vec<Node>,
    selected: Option<PathBuf>,
    extensions: ExtensionSet,
    show_hidden: bool,
    /// Path still being revealed; ancestors expand as their listings arrive.
    reveal: Option<PathBuf>,
}

impl State {
    /// Creates a tree rooted at `root`, or at the filesystem roots.
    #[must_use]
    pub fn new(root: Option<PathBuf>, extensions: ExtensionSet, show_hidden: bool) -> Self {
        let roots = root.map_or_else(filesystem_roots, |root| vec![root]);
        Self {
            roots: roots
                .into_iter()
                .map(|path| Node::new(TreeEntry::root(path)))
                .collect(),
            selected: None,
            extensions,
            show_hidden,
            reveal: None,
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<&Path> {
        self.selected.as_deref()
    }

    /// Root paths currently shown.
    pub fn root_paths(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(|node| node.entry.path.as_path())
    }

    /// Returns true if the directory at `path` is expanded.
    #[must_use]
    pub fn is_expanded(&self, path: &Path) -> bool {
        fn walk(nodes: &[Node], path: &Path) -> Option<bool> {
            let node = nodes.iter().find(|node| path.starts_with(&node.entry.path))?;
            if node.entry.path == path {
                return Some(node.expanded);
            }
            match &node.children {
                Children::Loaded(children) => walk(children, path),
                _ => None,
            }
        }
        walk(&self.roots, path).unwrap_or(false)
    }

    /// Selects `path` and expands every ancestor until its row is visible.
    ///
    /// Paths outside the tree are still selected but never shown.
    pub fn reveal(&mut self, path: PathBuf) -> Task<Message> {
        self.selected = Some(path.clone());
        self.reveal = Some(path);
        self.advance_reveal()
    }

    /// Replaces the roots with `folder` and selects it.
    pub fn reroot(&mut self, folder: PathBuf) -> Task<Message> {
        tracing::info!(folder = %folder.display(), "tree re-rooted");
        self.roots = vec![Node::new(TreeEntry::root(folder.clone()))];
        self.reveal(folder)
    }

    pub fn handle_message(&mut self, message: Message) -> (Effect, Task<Message>) {
        match message {
            Message::RowPressed(path) => {
                self.selected = Some(path.clone());
                self.reveal = None;
                let task = match find_node_mut(&mut self.roots, &path) {
                    Some(node) if node.entry.is_dir && !node.expanded => {
                        expand(node, &self.extensions, self.show_hidden)
                    }
                    _ => Task::none(),
                };
                (Effect::Selected(path), task)
            }
            Message::TogglePressed(path) => {
                let task = match find_node_mut(&mut self.roots, &path) {
                    Some(node) if node.expanded => {
                        node.expanded = false;
                        Task::none()
                    }
                    Some(node) => expand(node, &self.extensions, self.show_hidden),
                    None => Task::none(),
                };
                (Effect::None, task)
            }
            Message::ChildrenLoaded { parent, result } => {
                if let Some(node) = find_node_mut(&mut self.roots, &parent) {
                    node.children = match result {
                        Ok(entries) => {
                            Children::Loaded(entries.into_iter().map(Node::new).collect())
                        }
                        Err(e) => {
                            tracing::warn!(path = %parent.display(), "cannot list directory: {e}");
                            Children::Failed
                        }
                    };
                }
                (Effect::None, self.advance_reveal())
            }
            Message::OpenFolderPressed => (Effect::None, pick_folder(self.selected.clone())),
            Message::FolderPicked(Some(folder)) => {
                let task = self.reroot(folder.clone());
                (Effect::Selected(folder), task)
            }
            Message::FolderPicked(None) => (Effect::None, Task::none()),
        }
    }

    fn advance_reveal(&mut self) -> Task<Message> {
        let Some(target) = self.reveal.clone() else {
            return Task::none();
        };

        let mut nodes = &mut self.roots;
        loop {
            let Some(node) = nodes
                .iter_mut()
                .find(|node| target.starts_with(&node.entry.path))
            else {
                self.reveal = None;
                return Task::none();
            };

            if node.entry.path == target {
                self.reveal = None;
                return if node.entry.is_dir && !node.expanded {
                    expand(node, &self.extensions, self.show_hidden)
                } else {
                    Task::none()
                };
            }

            node.expanded = true;
            if matches!(node.children, Children::Failed) {
                self.reveal = None;
                return Task::none();
            }
            if matches!(node.children, Children::Unloaded) {
                node.children = Children::Loading;
                return load_children(
                    node.entry.path.clone(),
                    self.extensions.clone(),
                    self.show_hidden,
                );
            }
            match &mut node.children {
                Children::Loaded(children) => nodes = children,
                _ => return Task::none(),
            }
        }
    }

    pub fn view<'a>(&'a self, i18n: &I18n) -> Element<'a, Message> {
        let open_button = button(text(i18n.tr("tree-open-folder")).size(typography::BODY))
            .padding([spacing::XXS, spacing::SM])
            .style(styles::button::primary)
            .on_press(Message::OpenFolderPressed);

        let header = container(open_button)
            .width(Length::Fill)
            .padding(spacing::XS);

        let mut rows = Column::new().spacing(0);
        for node in &self.roots {
            rows = push_rows(rows, node, 0, self.selected.as_deref(), i18n);
        }

        let body = scrollable(container(rows).padding([0.0, spacing::XXS]))
            .width(Length::Fill)
            .height(Length::Fill);

        container(column![header, body])
            .width(Length::Fill)
            .height(Length::Fill)
            .style(styles::container::panel)
            .into()
    }
}

fn expand(node: &mut Node, extensions: &ExtensionSet, show_hidden: bool) -> Task<Message> {
    node.expanded = true;
    match node.children {
        Children::Unloaded | Children::Failed => {
            node.children = Children::Loading;
            load_children(node.entry.path.clone(), extensions.clone(), show_hidden)
        }
        Children::Loading | Children::Loaded(_) => Task::none(),
    }
}

fn load_children(parent: PathBuf, extensions: ExtensionSet, show_hidden: bool) -> Task<Message> {
    let dir = parent.clone();
    Task::perform(
        async move {
            match tokio::task::spawn_blocking(move || list_children(&dir, &extensions, show_hidden))
                .await
            {
                Ok(result) => result,
                Err(e) => Err(Error::Io(format!("tree listing task failed: {e}"))),
            }
        },
        move |result| Message::ChildrenLoaded {
            parent: parent.clone(),
            result,
        },
    )
}

fn pick_folder(start: Option<PathBuf>) -> Task<Message> {
    Task::perform(
        async move {
            let mut dialog = rfd::AsyncFileDialog::new();
            if let Some(dir) = start.filter(|dir| dir.is_dir()) {
                dialog = dialog.set_directory(dir);
            }
            dialog.pick_folder().await.map(|h| h.path().to_path_buf())
        },
        Message::FolderPicked,
    )
}

fn push_rows<'a>(
    mut rows: Column<'a, Message>,
    node: &'a Node,
    depth: u16,
    selected: Option<&Path>,
    i18n: &I18n,
) -> Column<'a, Message> {
    rows = rows.push(node_row(node, depth, selected == Some(node.entry.path.as_path())));

    if !node.expanded {
        return rows;
    }

    match &node.children {
        Children::Loaded(children) => {
            for child in children {
                rows = push_rows(rows, child, depth + 1, selected, i18n);
            }
            rows
        }
        Children::Loading => rows.push(status_row(i18n.tr("tree-loading"), depth + 1)),
        Children::Failed => rows.push(status_row(i18n.tr("tree-unreadable"), depth + 1)),
        Children::Unloaded => rows,
    }
}

fn node_row(node: &Node, depth: u16, is_selected: bool) -> Element<'_, Message> {
    let indent = Space::new().width(f32::from(depth) * sizing::TREE_INDENT);

    let disclosure: Element<'_, Message> = if node.entry.is_dir {
        let arrow = if node.expanded { "▾" } else { "▸" };
        button(text(arrow).size(typography::BODY))
            .width(sizing::DISCLOSURE_WIDTH)
            .padding(0)
            .style(styles::button::disclosure)
            .on_press(Message::TogglePressed(node.entry.path.clone()))
            .into()
    } else {
        Space::new().width(sizing::DISCLOSURE_WIDTH).into()
    };

    let label = button(text(node.entry.name.as_str()).size(typography::BODY))
        .width(Length::Fill)
        .height(sizing::TREE_ROW_HEIGHT)
        .padding([0.0, spacing::XXS])
        .style(styles::button::tree_row(is_selected))
        .on_press(Message::RowPressed(node.entry.path.clone()));

    row![indent, disclosure, label]
        .align_y(alignment::Vertical::Center)
        .into()
}

fn status_row<'a>(label: String, depth: u16) -> Element<'a, Message> {
    let indent =
        Space::new().width(f32::from(depth) * sizing::TREE_INDENT + sizing::DISCLOSURE_WIDTH);
    row![indent, text(label).size(typography::CAPTION)]
        .height(sizing::TREE_ROW_HEIGHT)
        .align_y(alignment::Vertical::Center)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn names(entries: &[TreeEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    #[test]
    fn list_children_filters_and_orders_entries() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let root = temp_dir.path();
        fs::create_dir(root.join("zeta")).expect("mkdir");
        fs::create_dir(root.join("Alpha")).expect("mkdir");
        File::create(root.join("b.PNG")).expect("create");
        File::create(root.join("a.mp4")).expect("create");
        File::create(root.join("notes.txt")).expect("create");
        File::create(root.join("C.gif")).expect("create");

        let entries = list_children(root, &ExtensionSet::default(), false).expect("listing");

        assert_eq!(names(&entries), vec!["Alpha", "zeta", "a.mp4", "b.PNG", "C.gif"]);
        assert!(entries[0].is_dir && entries[1].is_dir);
        assert!(!entries[2].is_dir);
    }

    #[test]
    fn list_children_skips_hidden_unless_requested() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let root = temp_dir.path();
        fs::create_dir(root.join(".cache")).expect("mkdir");
        File::create(root.join(".secret.jpg")).expect("create");
        File::create(root.join("visible.jpg")).expect("create");

        let hidden_off = list_children(root, &ExtensionSet::default(), false).expect("listing");
        assert_eq!(names(&hidden_off), vec!["visible.jpg"]);

        let hidden_on = list_children(root, &ExtensionSet::default(), true).expect("listing");
        assert_eq!(names(&hidden_on), vec![".cache", ".secret.jpg", "visible.jpg"]);
    }

    #[test]
    fn list_children_of_missing_directory_errors() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let result = list_children(&temp_dir.path().join("gone"), &ExtensionSet::default(), false);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn filesystem_roots_are_not_empty() {
        let roots = filesystem_roots();
        assert!(!roots.is_empty());
        assert!(roots.iter().all(|root| root.is_absolute()));
    }

    fn loaded(state: &mut State, parent: &Path) {
        let entries = list_children(parent, &state.extensions, state.show_hidden).expect("listing");
        let _ = state.handle_message(Message::ChildrenLoaded {
            parent: parent.to_path_buf(),
            result: Ok(entries),
        });
    }

    #[test]
    fn row_press_selects_and_expands_directory() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        fs::create_dir(root.join("photos")).expect("mkdir");
        let mut state = State::new(Some(root.clone()), ExtensionSet::default(), false);

        let (effect, _task) = state.handle_message(Message::RowPressed(root.clone()));

        assert_eq!(effect, Effect::Selected(root.clone()));
        assert_eq!(state.selected(), Some(root.as_path()));
        assert!(state.is_expanded(&root));
    }

    #[test]
    fn toggle_collapses_without_selecting() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let mut state = State::new(Some(root.clone()), ExtensionSet::default(), false);

        let (effect, _) = state.handle_message(Message::TogglePressed(root.clone()));
        assert_eq!(effect, Effect::None);
        assert!(state.is_expanded(&root));

        let _ = state.handle_message(Message::TogglePressed(root.clone()));
        assert!(!state.is_expanded(&root));
        assert!(state.selected().is_none());
    }

    #[test]
    fn reveal_expands_each_ancestor_as_listings_arrive() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let nested = root.join("a").join("b");
        fs::create_dir_all(&nested).expect("mkdir");
        let file = nested.join("clip.mov");
        File::create(&file).expect("create");

        let mut state = State::new(Some(root.clone()), ExtensionSet::default(), false);
        let _ = state.reveal(file.clone());
        assert_eq!(state.selected(), Some(file.as_path()));
        assert!(state.is_expanded(&root));

        loaded(&mut state, &root);
        assert!(state.is_expanded(&root.join("a")));

        loaded(&mut state, &root.join("a"));
        assert!(state.is_expanded(&nested));

        loaded(&mut state, &nested);
        assert!(state.reveal.is_none());
        assert_eq!(state.selected(), Some(file.as_path()));
    }

    #[test]
    fn reveal_outside_tree_only_selects() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().join("inside");
        fs::create_dir(&root).expect("mkdir");
        let mut state = State::new(Some(root.clone()), ExtensionSet::default(), false);

        let outside = temp_dir.path().join("other.png");
        let _ = state.reveal(outside.clone());

        assert_eq!(state.selected(), Some(outside.as_path()));
        assert!(state.reveal.is_none());
        assert!(!state.is_expanded(&root));
    }

    #[test]
    fn failed_listing_is_kept_and_stops_reveal() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let mut state = State::new(Some(root.clone()), ExtensionSet::default(), false);
        let _ = state.reveal(root.join("x").join("y.png"));

        let _ = state.handle_message(Message::ChildrenLoaded {
            parent: root.clone(),
            result: Err(Error::Io("denied".into())),
        });

        assert!(state.reveal.is_none());
        assert!(state.is_expanded(&root));
    }

    #[test]
    fn picked_folder_reroots_and_selects() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let folder = temp_dir.path().to_path_buf();
        let mut state = State::new(None, ExtensionSet::default(), false);

        let (effect, _) = state.handle_message(Message::FolderPicked(Some(folder.clone())));

        assert_eq!(effect, Effect::Selected(folder.clone()));
        assert_eq!(state.root_paths().collect::<Vec<_>>(), vec![folder.as_path()]);
        assert!(state.is_expanded(&folder));

        let (effect, _) = state.handle_message(Message::FolderPicked(None));
        assert_eq!(effect, Effect::None);
    }
}
