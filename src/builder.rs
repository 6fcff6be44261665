//! Fluent builder API for rsg.
//!
//! Collects exclusion patterns and render options, then renders the tree
//! in one call.

use std::path::{Path, PathBuf};

use crate::errors::RsgError;
use crate::exclude::{absolute_path, ExclusionSet};
use crate::tree::Glyphs;
use crate::walker::{render, RenderOptions, WalkError};

/// Builder for rendering a repository structure.
///
/// # Examples
///
/// ```no_run
/// use rsg::builder::Rsg;
///
/// let tree = Rsg::new("./project")
///     .exclude("*.pyc")
///     .exclude("build")
///     .render()
///     .unwrap();
/// print!("{tree}");
/// ```
pub struct Rsg {
    root: PathBuf,
    patterns: Vec<String>,
    use_ignore_file: bool,
    working_dir: Option<PathBuf>,
    options: RenderOptions,
}

impl Rsg {
    /// Create a new builder for the given root path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            patterns: Vec::new(),
            use_ignore_file: true,
            working_dir: None,
            options: RenderOptions::default(),
        }
    }

    /// Add one exclusion pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Add several exclusion patterns.
    pub fn excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Read `.rsgignore` from the root (default: true).
    pub fn ignore_file(mut self, enabled: bool) -> Self {
        self.use_ignore_file = enabled;
        self
    }

    /// Annotate Python files (default: true).
    pub fn annotate(mut self, enabled: bool) -> Self {
        self.options.annotate = enabled;
        self
    }

    /// Set the glyph set.
    pub fn glyphs(mut self, glyphs: Glyphs) -> Self {
        self.options.glyphs = glyphs;
        self
    }

    /// Descend into symlinked directories.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.options.follow_symlinks = follow;
        self
    }

    /// Directory relative patterns are anchored to (default: current directory).
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The render options collected so far.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Build the exclusion set from the patterns and the ignore file.
    pub fn exclusion_set(&self) -> Result<ExclusionSet, RsgError> {
        let cwd = std::env::current_dir()?;
        let base = match &self.working_dir {
            Some(dir) => absolute_path(&cwd, dir),
            None => cwd.clone(),
        };

        let mut set = ExclusionSet::from_patterns(&base, &self.patterns)?;
        let root = absolute_path(&cwd, &self.root);
        if self.use_ignore_file && root.is_dir() {
            let added = set.extend_from_ignore_file(&root)?;
            if added > 0 {
                tracing::debug!(count = added, "loaded ignore file patterns");
            }
        }
        Ok(set)
    }

    /// Render the tree.
    pub fn render(self) -> Result<String, RsgError> {
        let exclusions = self.exclusion_set()?;
        render(&self.root, &exclusions, &self.options).map_err(|e| into_rsg_error(&self.root, e))
    }
}

// Surface problems with the root itself as dedicated variants.
fn into_rsg_error(root: &Path, error: WalkError) -> RsgError {
    match error {
        WalkError::NotFound { path } if is_root(root, &path) => RsgError::PathNotFound(path),
        WalkError::NotADirectory { path } => RsgError::NotADirectory(path),
        other => RsgError::Walk(other),
    }
}

fn is_root(root: &Path, path: &Path) -> bool {
    std::env::current_dir()
        .map(|cwd| absolute_path(&cwd, root) == path)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclude::IGNORE_FILE_NAME;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("build")).unwrap();
        fs::write(dir.path().join("build/out.o"), "").unwrap();
        fs::write(dir.path().join("main.py"), "async def run():\n    pass\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        dir
    }

    #[test]
    fn test_render_with_patterns() {
        let dir = project();
        let tree = Rsg::new(dir.path())
            .working_dir(dir.path())
            .excludes(["build", "*.txt"])
            .render()
            .unwrap();

        let expected = "\
.
└── main.py
    └── Async Functions:
        └── run
";
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_ignore_file_honored() {
        let dir = project();
        fs::write(dir.path().join(IGNORE_FILE_NAME), "build\n").unwrap();

        let tree = Rsg::new(dir.path())
            .working_dir(dir.path())
            .annotate(false)
            .render()
            .unwrap();
        assert_eq!(tree, ".\n├── .rsgignore\n├── main.py\n└── notes.txt\n");
    }

    #[test]
    fn test_ignore_file_disabled() {
        let dir = project();
        fs::write(dir.path().join(IGNORE_FILE_NAME), "build\n").unwrap();

        let tree = Rsg::new(dir.path())
            .working_dir(dir.path())
            .ignore_file(false)
            .annotate(false)
            .render()
            .unwrap();
        assert!(tree.contains("out.o"));
    }

    #[test]
    fn test_ascii_glyphs() {
        let dir = project();
        let tree = Rsg::new(dir.path())
            .working_dir(dir.path())
            .exclude("build")
            .annotate(false)
            .glyphs(Glyphs::ascii())
            .render()
            .unwrap();
        assert_eq!(tree, ".\n|-- main.py\n`-- notes.txt\n");
    }

    #[test]
    fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        let result = Rsg::new(dir.path().join("missing")).ignore_file(false).render();
        assert!(matches!(result, Err(RsgError::PathNotFound(_))));
    }

    #[test]
    fn test_root_is_file() {
        let dir = project();
        let result = Rsg::new(dir.path().join("notes.txt")).render();
        assert!(matches!(result, Err(RsgError::NotADirectory(_))));
    }

    #[test]
    fn test_unreadable_ignore_file() {
        let dir = project();
        fs::create_dir(dir.path().join(IGNORE_FILE_NAME)).unwrap();
        let result = Rsg::new(dir.path()).render();
        assert!(matches!(result, Err(RsgError::Exclude(_))));
    }

    #[test]
    fn test_unclosed_bracket_matches_literally() {
        let dir = project();
        fs::write(dir.path().join("[draft"), "").unwrap();
        let tree = Rsg::new(dir.path())
            .working_dir(dir.path())
            .excludes(["[draft", "build", "*.txt"])
            .annotate(false)
            .render()
            .unwrap();
        assert_eq!(tree, ".\n└── main.py\n");
    }
}
