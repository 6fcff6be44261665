//! Directory traversal and tree rendering.
//!
//! Walks a directory depth-first, listing subdirectories before files at
//! every level, skipping excluded entries and annotating Python sources.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::annotate::{self, AnnotateError};
use crate::exclude::{absolute_path, ExclusionSet};
use crate::tree::{annotation_lines, join_lines, Glyphs, RenderLine};

/// Label of the first output line.
pub const ROOT_MARKER: &str = ".";

/// Errors that can occur during directory walking.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WalkError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => WalkError::NotFound { path },
            io::ErrorKind::PermissionDenied => WalkError::PermissionDenied { path },
            _ => WalkError::Io { path, source },
        }
    }
}

impl From<AnnotateError> for WalkError {
    fn from(error: AnnotateError) -> Self {
        match error {
            AnnotateError::ReadFailed { path, source } => WalkError::Io { path, source },
        }
    }
}

/// Options controlling how the tree is rendered.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Glyph set used for connectors and continuation.
    pub glyphs: Glyphs,
    /// Annotate Python files with their docstring and declarations.
    pub annotate: bool,
    /// Descend into symlinked directories.
    pub follow_symlinks: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            glyphs: Glyphs::unicode(),
            annotate: true,
            follow_symlinks: false,
        }
    }
}

impl RenderOptions {
    /// Options for a plain tree without annotations.
    pub fn plain() -> Self {
        Self {
            annotate: false,
            ..Default::default()
        }
    }
}

/// Whether a listed entry is shown as a directory or a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: OsString,
    pub kind: EntryKind,
    /// The entry itself is a symbolic link.
    pub is_symlink: bool,
}

/// The sorted listing of one directory.
#[derive(Debug, Clone)]
pub struct DirectoryNode {
    pub path: PathBuf,
    pub directories: Vec<Entry>,
    pub files: Vec<Entry>,
}

impl DirectoryNode {
    /// List `path`, classifying entries by what they point to.
    ///
    /// Broken links and special files are left out.
    pub fn read(path: &Path) -> Result<Self, WalkError> {
        let mut directories = Vec::new();
        let mut files = Vec::new();

        for dir_entry in fs::read_dir(path).map_err(|e| WalkError::from_io(path, e))? {
            let dir_entry = dir_entry.map_err(|e| WalkError::from_io(path, e))?;
            let entry_path = dir_entry.path();
            let is_symlink = dir_entry
                .file_type()
                .map_err(|e| WalkError::from_io(&entry_path, e))?
                .is_symlink();

            let metadata = match fs::metadata(&entry_path) {
                Ok(metadata) => metadata,
                Err(error) if is_symlink => {
                    tracing::debug!(
                        path = %entry_path.display(),
                        %error,
                        "skipping broken symlink"
                    );
                    continue;
                }
                Err(error) => return Err(WalkError::from_io(&entry_path, error)),
            };

            let kind = if metadata.is_dir() {
                EntryKind::Directory
            } else if metadata.is_file() {
                EntryKind::File
            } else {
                tracing::debug!(path = %entry_path.display(), "skipping special file");
                continue;
            };

            let entry = Entry {
                name: dir_entry.file_name(),
                kind,
                is_symlink,
            };
            match kind {
                EntryKind::Directory => directories.push(entry),
                EntryKind::File => files.push(entry),
            }
        }

        directories.sort_by(|a, b| a.name.cmp(&b.name));
        files.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            path: path.to_path_buf(),
            directories,
            files,
        })
    }

    /// Directories first, then files.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.directories.iter().chain(self.files.iter())
    }
}

/// Render the tree below `root` as text, one `\n`-terminated line per entry.
///
/// # Examples
///
/// ```no_run
/// use rsg::exclude::ExclusionSet;
/// use rsg::walker::{render, RenderOptions};
/// use std::path::Path;
///
/// let exclusions = ExclusionSet::from_patterns(".", ["target"]).unwrap();
/// let tree = render(Path::new("."), &exclusions, &RenderOptions::default()).unwrap();
/// print!("{tree}");
/// ```
pub fn render(
    root: &Path,
    exclusions: &ExclusionSet,
    options: &RenderOptions,
) -> Result<String, WalkError> {
    render_lines(root, exclusions, options).map(|lines| join_lines(&lines))
}

/// Render the tree below `root` as lines.
pub fn render_lines(
    root: &Path,
    exclusions: &ExclusionSet,
    options: &RenderOptions,
) -> Result<Vec<RenderLine>, WalkError> {
    let cwd = std::env::current_dir().map_err(|e| WalkError::from_io(Path::new("."), e))?;
    let root = absolute_path(&cwd, root);

    let metadata = fs::metadata(&root).map_err(|e| WalkError::from_io(&root, e))?;
    if !metadata.is_dir() {
        return Err(WalkError::NotADirectory { path: root });
    }

    let mut walker = Walker {
        exclusions,
        options,
        ancestors: Vec::new(),
    };
    if options.follow_symlinks {
        let canonical = fs::canonicalize(&root).map_err(|e| WalkError::from_io(&root, e))?;
        walker.ancestors.push(canonical);
    }

    let mut lines = vec![RenderLine::bare("", ROOT_MARKER)];
    lines.extend(walker.walk_dir(&root, "")?);
    Ok(lines)
}

struct Walker<'a> {
    exclusions: &'a ExclusionSet,
    options: &'a RenderOptions,
    // Canonical paths of the directories on the current branch.
    ancestors: Vec<PathBuf>,
}

impl Walker<'_> {
    fn walk_dir(&mut self, path: &Path, prefix: &str) -> Result<Vec<RenderLine>, WalkError> {
        tracing::debug!(path = %path.display(), "reading directory");
        let node = DirectoryNode::read(path)?;

        let visible: Vec<&Entry> = node
            .entries()
            .filter(|entry| {
                let entry_path = path.join(&entry.name);
                let excluded = self.exclusions.is_excluded(&entry_path);
                if excluded {
                    tracing::debug!(path = %entry_path.display(), "excluded");
                }
                !excluded
            })
            .collect();

        let glyphs = self.options.glyphs;
        let mut lines = Vec::new();
        let count = visible.len();

        for (i, entry) in visible.into_iter().enumerate() {
            let is_last = i == count - 1;
            let entry_path = path.join(&entry.name);
            lines.push(RenderLine::entry(
                prefix,
                glyphs.connector(is_last),
                entry.name.to_string_lossy(),
            ));
            let child_prefix = glyphs.child_prefix(prefix, is_last);

            match entry.kind {
                EntryKind::Directory => {
                    if self.enter(&entry_path, entry.is_symlink)? {
                        lines.extend(self.walk_dir(&entry_path, &child_prefix)?);
                        if self.options.follow_symlinks {
                            self.ancestors.pop();
                        }
                    }
                }
                EntryKind::File => {
                    let is_source = entry.name.to_str().is_some_and(annotate::is_source_file);
                    if self.options.annotate && is_source {
                        if let Some(annotation) = annotate::annotate(&entry_path)? {
                            lines.extend(annotation_lines(&annotation, &child_prefix, &glyphs));
                        }
                    }
                }
            }
        }

        Ok(lines)
    }

    // Decide whether to descend into a directory, recording it as an ancestor.
    fn enter(&mut self, path: &Path, is_symlink: bool) -> Result<bool, WalkError> {
        if !self.options.follow_symlinks {
            return Ok(!is_symlink);
        }

        let canonical = fs::canonicalize(path).map_err(|e| WalkError::from_io(path, e))?;
        if self.ancestors.contains(&canonical) {
            tracing::warn!(path = %path.display(), "symlink loop detected, not descending");
            return Ok(false);
        }
        self.ancestors.push(canonical);
        Ok(true)
    }
}
