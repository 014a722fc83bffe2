use std::time::{Duration, SystemTime};

use derive_more::Display;
use snafu::{OptionExt, ResultExt, Snafu, ensure, location};
use tracing::{debug, error, info};

use super::arena::{Arena, CannotAddChildError};
use super::loader::{LoadError, parse_source};
use super::node::{Node, NodeId, is_path_component};

/// Directory used by `cd` without arguments
pub const DEFAULT_HOME: &str = "/home/user";

/// Characters `touch` refuses in a file name
const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

const DEFAULT_DIRECTORIES: &[&str] = &["/bin", "/home", "/home/user", "/etc", "/tmp", "/var"];

const DEFAULT_FILES: &[(&str, &str, &str)] = &[
    ("/home/user", "readme.txt", "Welcome to VFS!"),
    (
        "/etc",
        "passwd",
        "root:x:0:0:root:/root:/bin/sh\nuser:x:1000:1000:user:/home/user:/bin/sh",
    ),
    ("/etc", "hosts", "127.0.0.1 localhost\n::1 localhost"),
];

/// The virtual filesystem: one tree of nodes plus the current directory.
///
/// Every path argument is resolved UNIX style against either the root (when
/// it starts with `/`) or the cursor. Only [`Tree::change_directory`] moves
/// the cursor, and only [`Tree::load`] replaces the whole tree.
#[derive(Debug, Clone)]
pub struct Tree {
    arena: Arena,
    cursor: NodeId,
    home: String,
    loaded: bool,
    start_time: SystemTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("files: {files}, directories: {directories}, loaded: {loaded}")]
pub struct VfsInfo {
    pub files: usize,
    pub directories: usize,
    pub loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: &'static str,
    pub terminal: &'static str,
    pub login_time: &'static str,
    pub host: Option<&'static str>,
}

impl Tree {
    pub fn new() -> Self {
        Self::with_home(DEFAULT_HOME)
    }

    pub fn with_home(home: impl Into<String>) -> Self {
        let home: String = home.into();
        let mut tree = Tree {
            arena: Arena::new(),
            cursor: Arena::ROOT,
            home: format!("/{}", home.trim_start_matches('/')),
            loaded: false,
            start_time: SystemTime::now(),
        };
        if let Err(err) = tree.build_default() {
            error!(
                "Assumption that the default structure builds on a fresh root failed: {} {}",
                err,
                location!()
            );
        }
        tree
    }

    /// Creates the fixed starter hierarchy.
    ///
    /// Existing directories are reused and fixed files are only rewritten when
    /// their content differs, so running it twice leaves the tree unchanged.
    pub fn build_default(&mut self) -> Result<(), VfsError> {
        for path in DEFAULT_DIRECTORIES {
            self.ensure_directory(path)?;
        }
        for (directory, name, content) in DEFAULT_FILES {
            let parent = self.ensure_directory(directory)?;
            self.put_file(parent, name, content)?;
        }
        debug!("Default structure built");
        Ok(())
    }

    fn ensure_directory(&mut self, path: &str) -> Result<NodeId, VfsError> {
        let mut current = self.arena.root();
        for name in path.split('/').filter(|c| !c.is_empty()) {
            current = match self.arena.child(current, name) {
                Some(existing) => {
                    ensure!(
                        self.arena.get(existing).is_directory(),
                        NotADirectorySnafu {
                            path: self.arena.full_path(existing)
                        }
                    );
                    existing
                }
                None => {
                    let now = self.arena.now();
                    let id = self.arena.insert(Node::directory(name, now));
                    self.arena.add_child(current, id).context(StructureSnafu)?;
                    id
                }
            };
        }
        Ok(current)
    }

    fn put_file(&mut self, parent: NodeId, name: &str, content: &str) -> Result<(), VfsError> {
        let unchanged = self
            .arena
            .child(parent, name)
            .is_some_and(|id| self.arena.get(id).content() == Some(content));
        if unchanged {
            return Ok(());
        }

        let now = self.arena.now();
        let id = self.arena.insert(Node::file(name, content, now));
        self.arena.add_child(parent, id).context(StructureSnafu)
    }

    /// Replaces the whole tree with the one described by `source`.
    ///
    /// The new tree is built on the side and swapped in only when parsing
    /// succeeded; on error the current tree and cursor stay untouched.
    pub fn load(&mut self, source: &str) -> Result<(), LoadError> {
        let arena = parse_source(source, self.arena.clock())?;
        self.arena = arena;
        self.cursor = self.arena.root();
        self.loaded = true;

        let info = self.info();
        info!(
            "Loaded VFS with {} files and {} directories",
            info.files, info.directories
        );
        Ok(())
    }

    /// Finds the node `path` points to without moving the cursor.
    ///
    /// Returns `None` as soon as a component is missing or names a child of a
    /// file. `..` at the root stays at the root.
    pub fn resolve(&self, path: &str) -> Option<NodeId> {
        if path.is_empty() || path == "/" {
            return Some(self.arena.root());
        }

        let mut current = if path.starts_with('/') {
            self.arena.root()
        } else {
            self.cursor
        };

        for component in path.split('/').filter(|c| !c.is_empty()) {
            match component {
                "." => {}
                ".." => {
                    if let Some(parent) = self.arena.get(current).parent() {
                        current = parent;
                    }
                }
                name => current = self.arena.child(current, name)?,
            }
        }

        debug!("Resolved '{}' to {}", path, self.arena.full_path(current));
        Some(current)
    }

    /// Lists a directory, sorted by name.
    ///
    /// Plain mode suffixes directories with `/`. Detailed mode renders one
    /// `ls -l` line per entry, preceded by a `..` line unless listing the root.
    pub fn list(&self, path: Option<&str>, detailed: bool) -> Result<Vec<String>, VfsError> {
        let target = self.directory_at(path)?;
        let node = self.arena.get(target);
        let children = node.children().into_iter().flatten();

        if !detailed {
            return Ok(children
                .map(|(name, id)| {
                    if self.arena.get(*id).is_directory() {
                        format!("{name}/")
                    } else {
                        name.clone()
                    }
                })
                .collect());
        }

        let parent_line = node
            .parent()
            .map(|parent| self.arena.get(parent).detailed_listing(".."));
        Ok(parent_line
            .into_iter()
            .chain(children.map(|(name, id)| self.arena.get(*id).detailed_listing(name)))
            .collect())
    }

    /// Moves the cursor to `path`, or to the home directory when `path` is
    /// `None`. Home is always taken from the root; a missing home falls back
    /// to the root.
    pub fn change_directory(&mut self, path: Option<&str>) -> Result<(), VfsError> {
        let target = match path {
            Some(_) => self.directory_at(path)?,
            None => self
                .resolve(&self.home)
                .filter(|id| self.arena.get(*id).is_directory())
                .unwrap_or_else(|| self.arena.root()),
        };
        self.cursor = target;
        debug!("Changed directory to {}", self.current_path());
        Ok(())
    }

    pub fn read(&self, path: &str) -> Result<&str, VfsError> {
        let id = self.resolve(path).context(FileNotFoundSnafu { path })?;
        let node = self.arena.get(id);
        let content = node.content().context(NotAFileSnafu { path })?;
        if let Some(encoding) = node.encoding() {
            debug!("Read {} bytes of {} content from {}", content.len(), encoding, path);
        }
        Ok(content)
    }

    /// Creates an empty file in the current directory, or refreshes the
    /// modified time of whatever already carries that name.
    pub fn touch(&mut self, name: &str) -> Result<(), VfsError> {
        ensure!(is_valid_file_name(name), InvalidNameSnafu { name });

        let now = self.arena.now();
        match self.arena.child(self.cursor, name) {
            Some(existing) => {
                self.arena.get_mut(existing).metadata.modified = now;
                debug!("Touched existing {}", self.arena.full_path(existing));
            }
            None => {
                let id = self.arena.insert(Node::file(name, "", now));
                self.arena
                    .add_child(self.cursor, id)
                    .context(StructureSnafu)?;
                debug!("Created {}", self.arena.full_path(id));
            }
        }
        Ok(())
    }

    pub fn current_path(&self) -> String {
        self.arena.full_path(self.cursor)
    }

    /// Counts files and directories reachable from the root, root excluded
    pub fn info(&self) -> VfsInfo {
        let (files, directories) = self
            .arena
            .reachable()
            .into_iter()
            .filter(|id| *id != self.arena.root())
            .fold((0, 0), |(files, directories), id| {
                if self.arena.get(id).is_file() {
                    (files + 1, directories)
                } else {
                    (files, directories + 1)
                }
            });

        VfsInfo {
            files,
            directories,
            loaded: self.loaded,
        }
    }

    pub fn uptime(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or_default()
    }

    /// Fixed login sessions shown by `who`
    pub fn sessions(&self) -> Vec<Session> {
        vec![
            Session {
                user: "user",
                terminal: "tty1",
                login_time: "10:30",
                host: None,
            },
            Session {
                user: "root",
                terminal: "pts/0",
                login_time: "09:15",
                host: Some("192.168.1.100"),
            },
        ]
    }

    fn directory_at(&self, path: Option<&str>) -> Result<NodeId, VfsError> {
        let Some(path) = path else {
            return Ok(self.cursor);
        };
        let id = self
            .resolve(path)
            .context(DirectoryNotFoundSnafu { path })?;
        ensure!(
            self.arena.get(id).is_directory(),
            NotADirectorySnafu { path }
        );
        Ok(id)
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_file_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(FORBIDDEN_NAME_CHARS) && is_path_component(name)
}

#[derive(Debug, Snafu)]
pub enum VfsError {
    #[snafu(display("directory not found: {}", path))]
    DirectoryNotFound { path: String },
    #[snafu(display("not a directory: {}", path))]
    NotADirectory { path: String },
    #[snafu(display("file not found: {}", path))]
    FileNotFound { path: String },
    #[snafu(display("not a file: {}", path))]
    NotAFile { path: String },
    #[snafu(display("invalid name: '{}'", name))]
    InvalidName { name: String },
    #[snafu(display("{}", source))]
    StructureError { source: CannotAddChildError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    const SAMPLE: &str = r#"
<vfs>
  <directory name="d">
    <file name="f">hello</file>
    <directory name="inner">
      <file name="deep.txt">  deep content  </file>
    </directory>
  </directory>
  <file name="top.txt" owner="root" group="wheel" permissions="rw-------">top</file>
</vfs>
"#;

    #[fixture]
    fn tree() -> Tree {
        Tree::new()
    }

    #[fixture]
    fn loaded() -> Tree {
        let mut tree = Tree::new();
        tree.load(SAMPLE).unwrap();
        tree
    }

    fn empty_dir_tree() -> Tree {
        let mut tree = Tree::new();
        tree.change_directory(Some("/tmp")).unwrap();
        tree
    }

    #[rstest]
    fn default_structure_is_present(tree: Tree) {
        assert_eq!(
            tree.list(Some("/"), false).unwrap(),
            vec!["bin/", "etc/", "home/", "tmp/", "var/"]
        );
        assert_eq!(tree.list(Some("/etc"), false).unwrap(), vec!["hosts", "passwd"]);
        assert_eq!(
            tree.read("/home/user/readme.txt").unwrap(),
            "Welcome to VFS!"
        );
        assert!(!tree.loaded);
        assert_eq!(tree.current_path(), "/");
    }

    #[rstest]
    fn build_default_is_idempotent(mut tree: Tree) {
        let before = tree.info();
        let listing = tree.list(Some("/etc"), true).unwrap();
        tree.build_default().unwrap();
        assert_eq!(tree.info(), before);
        assert_eq!(tree.list(Some("/etc"), true).unwrap(), listing);
    }

    #[rstest]
    #[case("", "/")]
    #[case("/", "/")]
    #[case("/home/user", "/home/user")]
    #[case("/home//user/", "/home/user")]
    #[case("/home/./user", "/home/user")]
    #[case("/home/user/..", "/home")]
    #[case("/..", "/")]
    #[case("/../../etc", "/etc")]
    #[case("home/user/readme.txt", "/home/user/readme.txt")]
    #[case("/etc/passwd/..", "/etc")]
    fn resolve_from_root(tree: Tree, #[case] path: &str, #[case] expected: &str) {
        let id = tree.resolve(path).unwrap();
        assert_eq!(tree.arena.full_path(id), expected);
    }

    #[rstest]
    #[case("/nope")]
    #[case("/home/nope/user")]
    #[case("/etc/passwd/child")]
    fn resolve_missing(tree: Tree, #[case] path: &str) {
        assert!(tree.resolve(path).is_none());
    }

    #[rstest]
    fn resolve_relative_to_cursor(mut tree: Tree) {
        tree.change_directory(Some("/home/user")).unwrap();
        assert_eq!(tree.arena.full_path(tree.resolve(".").unwrap()), "/home/user");
        assert_eq!(tree.arena.full_path(tree.resolve("..").unwrap()), "/home");
        assert_eq!(tree.arena.full_path(tree.resolve("../../etc").unwrap()), "/etc");
        assert_eq!(
            tree.arena.full_path(tree.resolve("readme.txt").unwrap()),
            "/home/user/readme.txt"
        );
    }

    #[rstest]
    fn resolve_is_pure(mut tree: Tree) {
        tree.change_directory(Some("/home")).unwrap();
        let first = tree.resolve("user/../user").map(|id| tree.arena.full_path(id));
        let second = tree.resolve("user/../user").map(|id| tree.arena.full_path(id));
        assert_eq!(first, second);
        assert_eq!(tree.current_path(), "/home");
    }

    #[rstest]
    fn full_path_round_trips_for_every_node(loaded: Tree) {
        for id in loaded.arena.reachable() {
            let path = loaded.arena.full_path(id);
            let resolved = loaded.resolve(&path).unwrap();
            assert_eq!(loaded.arena.full_path(resolved), path);
        }
    }

    #[rstest]
    fn parent_then_child_equals_child(mut tree: Tree) {
        for directory in ["/", "/home", "/home/user"] {
            tree.change_directory(Some(directory)).unwrap();
            let children: Vec<String> = tree
                .arena
                .get(tree.cursor)
                .children()
                .unwrap()
                .keys()
                .cloned()
                .collect();
            for name in children {
                assert_eq!(
                    tree.resolve(&format!("{name}/../{name}")),
                    tree.resolve(&name)
                );
            }
        }
    }

    #[rstest]
    fn list_errors(tree: Tree) {
        let err = tree.list(Some("/missing"), false).unwrap_err();
        assert!(matches!(err, VfsError::DirectoryNotFound { .. }));
        assert_eq!(err.to_string(), "directory not found: /missing");

        let err = tree.list(Some("/etc/hosts"), false).unwrap_err();
        assert!(matches!(err, VfsError::NotADirectory { .. }));
        assert_eq!(err.to_string(), "not a directory: /etc/hosts");
    }

    #[rstest]
    fn list_defaults_to_cursor(mut tree: Tree) {
        tree.change_directory(Some("/home/user")).unwrap();
        assert_eq!(tree.list(None, false).unwrap(), vec!["readme.txt"]);
    }

    #[rstest]
    fn detailed_listing_synthesizes_parent_entry(mut tree: Tree) {
        let root_lines = tree.list(None, true).unwrap();
        assert_eq!(root_lines.len(), 5);
        assert!(root_lines.iter().all(|line| !line.ends_with(" ..")));

        tree.change_directory(Some("/etc")).unwrap();
        let lines = tree.list(None, true).unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('d'));
        assert!(lines[0].ends_with(" .."));
        assert!(lines[1].starts_with("-rw-r--r--"));
        assert!(lines[1].ends_with(" hosts"));
        assert!(lines[2].ends_with(" passwd"));
    }

    #[rstest]
    fn change_directory_without_path_goes_home(mut tree: Tree) {
        tree.change_directory(Some("/etc")).unwrap();
        tree.change_directory(None).unwrap();
        assert_eq!(tree.current_path(), "/home/user");
    }

    #[rstest]
    #[case("home/user", "/home/user")]
    #[case("/home/user", "/home/user")]
    #[case("user", "/")]
    fn relative_home_is_taken_from_root(#[case] home: &str, #[case] expected: &str) {
        let mut tree = Tree::with_home(home);
        tree.change_directory(Some("/home")).unwrap();
        tree.change_directory(None).unwrap();
        assert_eq!(tree.current_path(), expected);
        tree.change_directory(None).unwrap();
        assert_eq!(tree.current_path(), expected);
    }

    #[test]
    fn change_directory_home_falls_back_to_root() {
        let mut tree = Tree::with_home("/nowhere");
        tree.change_directory(Some("/etc")).unwrap();
        tree.change_directory(None).unwrap();
        assert_eq!(tree.current_path(), "/");

        let mut tree = Tree::with_home("/etc/passwd");
        tree.change_directory(None).unwrap();
        assert_eq!(tree.current_path(), "/");
    }

    #[rstest]
    #[case("/missing", "directory not found: /missing")]
    #[case("/etc/passwd", "not a directory: /etc/passwd")]
    fn change_directory_failures_keep_cursor(
        mut tree: Tree,
        #[case] path: &str,
        #[case] message: &str,
    ) {
        tree.change_directory(Some("/home")).unwrap();
        let err = tree.change_directory(Some(path)).unwrap_err();
        assert_eq!(err.to_string(), message);
        assert_eq!(tree.current_path(), "/home");
    }

    #[rstest]
    fn read_errors(tree: Tree) {
        let err = tree.read("/etc/shadow").unwrap_err();
        assert_eq!(err.to_string(), "file not found: /etc/shadow");
        let err = tree.read("/etc").unwrap_err();
        assert_eq!(err.to_string(), "not a file: /etc");
    }

    #[test]
    fn touch_creates_then_refreshes() {
        let mut tree = empty_dir_tree();
        assert!(tree.list(None, false).unwrap().is_empty());

        tree.touch("x").unwrap();
        assert_eq!(tree.list(None, false).unwrap(), vec!["x"]);
        let id = tree.resolve("x").unwrap();
        let first = tree.arena.get(id).metadata.modified;
        assert_eq!(tree.arena.get(id).metadata.size, 0);
        assert_eq!(tree.read("x").unwrap(), "");

        tree.touch("x").unwrap();
        assert_eq!(tree.list(None, false).unwrap(), vec!["x"]);
        assert_eq!(tree.resolve("x"), Some(id));
        assert!(tree.arena.get(id).metadata.modified > first);
    }

    #[test]
    fn touch_keeps_existing_content() {
        let mut tree = Tree::new();
        tree.change_directory(None).unwrap();
        tree.touch("readme.txt").unwrap();
        assert_eq!(tree.read("readme.txt").unwrap(), "Welcome to VFS!");
    }

    #[test]
    fn touch_existing_directory_refreshes_time() {
        let mut tree = Tree::new();
        let id = tree.resolve("/home").unwrap();
        let before = tree.arena.get(id).metadata.modified;
        tree.touch("home").unwrap();
        assert!(tree.arena.get(id).is_directory());
        assert!(tree.arena.get(id).metadata.modified > before);
    }

    #[test]
    fn touch_updates_parent_time_on_create() {
        let mut tree = empty_dir_tree();
        let before = tree.arena.get(tree.cursor).metadata.modified;
        tree.touch("new").unwrap();
        assert!(tree.arena.get(tree.cursor).metadata.modified > before);
    }

    #[rstest]
    #[case("a/b")]
    #[case("a\\b")]
    #[case("c:")]
    #[case("*")]
    #[case("what?")]
    #[case("\"quoted\"")]
    #[case("<in")]
    #[case("out>")]
    #[case("pi|pe")]
    #[case("")]
    #[case("   ")]
    #[case(".")]
    #[case("..")]
    fn touch_rejects_invalid_names(#[case] name: &str) {
        let mut tree = empty_dir_tree();
        let before = tree.arena.get(tree.cursor).metadata.clone();
        let err = tree.touch(name).unwrap_err();
        assert!(matches!(err, VfsError::InvalidName { .. }));
        assert!(tree.list(None, false).unwrap().is_empty());
        assert_eq!(tree.arena.get(tree.cursor).metadata, before);
    }

    #[rstest]
    fn load_replaces_tree(loaded: Tree) {
        assert!(loaded.loaded);
        assert_eq!(loaded.current_path(), "/");
        assert_eq!(loaded.read("/d/f").unwrap(), "hello");
        assert_eq!(loaded.list(Some("/d"), false).unwrap(), vec!["f", "inner/"]);
        assert_eq!(loaded.read("/d/inner/deep.txt").unwrap(), "deep content");
        assert!(loaded.resolve("/home").is_none());
        assert_eq!(
            loaded.info(),
            VfsInfo {
                files: 3,
                directories: 2,
                loaded: true
            }
        );
    }

    #[rstest]
    fn load_keeps_attributes(loaded: Tree) {
        let id = loaded.resolve("/top.txt").unwrap();
        let metadata = &loaded.arena.get(id).metadata;
        assert_eq!(metadata.owner, "root");
        assert_eq!(metadata.group, "wheel");
        assert_eq!(metadata.permissions, "rw-------");
        assert_eq!(metadata.size, 3);
    }

    #[rstest]
    fn load_resets_cursor_to_root(mut tree: Tree) {
        tree.change_directory(Some("/home/user")).unwrap();
        tree.load(SAMPLE).unwrap();
        assert_eq!(tree.current_path(), "/");
    }

    #[rstest]
    #[case(r#"<vfs><directory><file name="f">x</file></directory></vfs>"#)]
    #[case(r#"<root><file name="f">x</file></root>"#)]
    #[case(r#"<vfs><file name="f">x</vfs>"#)]
    #[case(r#"<vfs><file name="f" size="big">x</file></vfs>"#)]
    #[case("")]
    fn failed_load_leaves_tree_untouched(mut tree: Tree, #[case] source: &str) {
        tree.change_directory(Some("/home/user")).unwrap();
        let path = tree.current_path();
        let listing = tree.list(None, true).unwrap();
        let root_listing = tree.list(Some("/"), true).unwrap();
        let content = tree.read("readme.txt").unwrap().to_string();

        assert!(tree.load(source).is_err());

        assert!(!tree.loaded);
        assert_eq!(tree.current_path(), path);
        assert_eq!(tree.list(None, true).unwrap(), listing);
        assert_eq!(tree.list(Some("/"), true).unwrap(), root_listing);
        assert_eq!(tree.read("readme.txt").unwrap(), content);
    }

    #[rstest]
    fn info_counts_default_tree(tree: Tree) {
        let info = tree.info();
        assert_eq!(info.directories, 6);
        assert_eq!(info.files, 3);
        assert!(!info.loaded);
        assert_eq!(
            info.to_string(),
            "files: 3, directories: 6, loaded: false"
        );
    }

    #[rstest]
    fn sessions_are_fixed(tree: Tree) {
        let sessions = tree.sessions();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[1].host, Some("192.168.1.100"));
    }

    #[rstest]
    fn uptime_counts_from_start(tree: Tree) {
        assert!(tree.uptime() < Duration::from_secs(60));
        assert!(tree.start_time <= SystemTime::now());
    }
}
