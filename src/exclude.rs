//! Exclusion patterns.
//!
//! Patterns are glob expressions anchored to an absolute base directory
//! (normally the working directory) and matched against absolute entry
//! paths. `*` may cross directory separators.

use std::io;
use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern, PatternError};
use thiserror::Error;

/// Name of the ignore file read from the scanned root.
pub const IGNORE_FILE_NAME: &str = ".rsgignore";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Errors from building an exclusion set.
#[derive(Debug, Error)]
pub enum ExcludeError {
    #[error("invalid exclusion pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: PatternError,
    },

    #[error("failed to read ignore file {path}: {source}")]
    ReadIgnoreFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A set of anchored glob patterns.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    base: PathBuf,
    patterns: Vec<Pattern>,
}

impl ExclusionSet {
    /// An empty set anchoring relative patterns to `base`.
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: normalize_path(base.as_ref()),
            patterns: Vec::new(),
        }
    }

    /// Build a set from raw patterns.
    pub fn from_patterns<I, S>(base: impl AsRef<Path>, patterns: I) -> Result<Self, ExcludeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new(base);
        for pattern in patterns {
            set.add(pattern.as_ref())?;
        }
        Ok(set)
    }

    /// Anchor and add one pattern.
    pub fn add(&mut self, pattern: &str) -> Result<(), ExcludeError> {
        let anchored = anchor_pattern(&self.base, &fnmatch_compatible(pattern));
        let compiled = Pattern::new(&anchored).map_err(|source| ExcludeError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        tracing::debug!(pattern, anchored = compiled.as_str(), "added exclusion pattern");
        self.patterns.push(compiled);
        Ok(())
    }

    /// Add the patterns of `root`'s ignore file, if it has one.
    ///
    /// Returns the number of patterns added.
    pub fn extend_from_ignore_file(&mut self, root: &Path) -> Result<usize, ExcludeError> {
        let patterns = read_ignore_file(root)?;
        for pattern in &patterns {
            self.add(pattern)?;
        }
        Ok(patterns.len())
    }

    /// Whether an absolute path matches any pattern.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_path_with(path, MATCH_OPTIONS))
    }

    /// The directory relative patterns are anchored to.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The anchored patterns.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Read the ignore file in `root`.
///
/// Lines are trimmed; blank lines and `#` comments are skipped. A missing
/// file yields no patterns.
pub fn read_ignore_file(root: &Path) -> Result<Vec<String>, ExcludeError> {
    let path = root.join(IGNORE_FILE_NAME);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(ExcludeError::ReadIgnoreFile { path, source }),
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Rewrite fnmatch syntax that `glob::Pattern` reads differently.
///
/// Runs of `*` collapse to one `*`, which already crosses `/`. A `[`
/// without a closing `]` is a literal bracket.
fn fnmatch_compatible(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                out.push('*');
                while chars.get(i + 1) == Some(&'*') {
                    i += 1;
                }
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.extend(&chars[i..=end]);
                    i = end;
                }
                None => out.push_str("[[]"),
            },
            c => out.push(c),
        }
        i += 1;
    }
    out
}

// Index of the `]` closing the class opened at `start`.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    (j..chars.len()).find(|&k| chars[k] == ']')
}

/// Turn a pattern into its absolute form.
///
/// Absolute patterns are kept. Relative ones are joined onto `base` with
/// leading `.` and `..` segments resolved; `base` is escaped so it only
/// matches literally.
fn anchor_pattern(base: &Path, pattern: &str) -> String {
    let trimmed = pattern.trim_end_matches('/');
    if trimmed.is_empty() {
        return if pattern.is_empty() {
            Pattern::escape(&base.to_string_lossy())
        } else {
            "/".to_string()
        };
    }
    if Path::new(trimmed).is_absolute() {
        return trimmed.to_string();
    }

    let mut base = base.to_path_buf();
    let mut rest: Vec<&str> = Vec::new();
    for segment in trimmed.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if rest.pop().is_none() {
                    base.pop();
                }
            }
            _ => rest.push(segment),
        }
    }

    let mut anchored = Pattern::escape(&base.to_string_lossy());
    if !rest.is_empty() {
        if !anchored.ends_with('/') {
            anchored.push('/');
        }
        anchored.push_str(&rest.join("/"));
    }
    anchored
}

/// Lexically normalize a path: drop `.` components and resolve `..`.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component.as_os_str());
            }
        }
    }
    normalized
}

/// Resolve `path` against `base` and normalize it.
pub fn absolute_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn set(patterns: &[&str]) -> ExclusionSet {
        ExclusionSet::from_patterns("/work/proj", patterns).unwrap()
    }

    #[test]
    fn test_relative_pattern_anchored_to_base() {
        let set = set(&["build"]);
        assert_eq!(set.patterns()[0].as_str(), "/work/proj/build");
        assert!(set.is_excluded(Path::new("/work/proj/build")));
        assert!(!set.is_excluded(Path::new("/work/proj/src/build")));
        assert!(!set.is_excluded(Path::new("/other/build")));
    }

    #[test]
    fn test_star_crosses_separators() {
        let set = set(&["*.log"]);
        assert!(set.is_excluded(Path::new("/work/proj/debug.log")));
        assert!(set.is_excluded(Path::new("/work/proj/deep/nested/trace.log")));
        assert!(!set.is_excluded(Path::new("/work/proj/log.txt")));
    }

    #[test]
    fn test_leading_dot_needs_no_literal_match() {
        let set = set(&["*cache*"]);
        assert!(set.is_excluded(Path::new("/work/proj/.cache")));
        assert!(set.is_excluded(Path::new("/work/proj/src/__pycache__")));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let set = set(&["Build"]);
        assert!(!set.is_excluded(Path::new("/work/proj/build")));
    }

    #[test]
    fn test_dot_segments_resolved() {
        let set = set(&["./dist", "../shared/*", "a/../b"]);
        assert_eq!(set.patterns()[0].as_str(), "/work/proj/dist");
        assert_eq!(set.patterns()[1].as_str(), "/work/shared/*");
        assert_eq!(set.patterns()[2].as_str(), "/work/proj/b");
    }

    #[test]
    fn test_absolute_pattern_kept() {
        let set = set(&["/var/tmp/*"]);
        assert_eq!(set.patterns()[0].as_str(), "/var/tmp/*");
        assert!(set.is_excluded(Path::new("/var/tmp/x")));
    }

    #[test]
    fn test_trailing_slash_ignored() {
        let set = set(&["node_modules/"]);
        assert!(set.is_excluded(Path::new("/work/proj/node_modules")));
    }

    #[test]
    fn test_base_is_matched_literally() {
        let set = ExclusionSet::from_patterns("/work/[v1]", ["out"]).unwrap();
        assert!(set.is_excluded(Path::new("/work/[v1]/out")));
        assert!(!set.is_excluded(Path::new("/work/v/out")));
    }

    #[test]
    fn test_unclosed_bracket_is_literal() {
        let set = ExclusionSet::from_patterns("/work", ["[unclosed", "a["]).unwrap();
        assert!(set.is_excluded(Path::new("/work/[unclosed")));
        assert!(set.is_excluded(Path::new("/work/a[")));
        assert!(!set.is_excluded(Path::new("/work/u")));
    }

    #[test]
    fn test_character_classes_still_work() {
        let set = set(&["v[0-9]", "[!a]x", "[]]y"]);
        assert!(set.is_excluded(Path::new("/work/proj/v1")));
        assert!(!set.is_excluded(Path::new("/work/proj/vx")));
        assert!(set.is_excluded(Path::new("/work/proj/bx")));
        assert!(!set.is_excluded(Path::new("/work/proj/ax")));
        assert!(set.is_excluded(Path::new("/work/proj/]y")));
    }

    #[test]
    fn test_double_star_behaves_like_star() {
        let set = set(&["build**", "docs/**/*.md"]);
        assert!(set.is_excluded(Path::new("/work/proj/build_output")));
        assert!(set.is_excluded(Path::new("/work/proj/build/deep/x.o")));
        assert!(set.is_excluded(Path::new("/work/proj/docs/api/index.md")));
        assert!(!set.is_excluded(Path::new("/work/proj/docs/index.md")));
    }

    #[test]
    fn test_fnmatch_compatible() {
        assert_eq!(fnmatch_compatible("a**b"), "a*b");
        assert_eq!(fnmatch_compatible("[oops"), "[[]oops");
        assert_eq!(fnmatch_compatible("x[ab]*"), "x[ab]*");
        assert_eq!(fnmatch_compatible("plain/path"), "plain/path");
    }

    #[test]
    fn test_empty_set_excludes_nothing() {
        let set = ExclusionSet::new("/work");
        assert!(set.is_empty());
        assert!(!set.is_excluded(Path::new("/work/anything")));
    }

    #[test]
    fn test_read_ignore_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(IGNORE_FILE_NAME),
            "# generated\n  target  \n\n*.pyc\n",
        )
        .unwrap();

        let patterns = read_ignore_file(dir.path()).unwrap();
        assert_eq!(patterns, ["target", "*.pyc"]);
    }

    #[test]
    fn test_missing_ignore_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(read_ignore_file(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_extend_from_ignore_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(IGNORE_FILE_NAME), "secret\n").unwrap();

        let mut set = ExclusionSet::new(dir.path());
        let added = set.extend_from_ignore_file(dir.path()).unwrap();
        assert_eq!(added, 1);
        assert!(set.is_excluded(&dir.path().join("secret")));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(
            absolute_path(Path::new("/base"), Path::new("./x/..")),
            PathBuf::from("/base")
        );
        assert_eq!(
            absolute_path(Path::new("/base"), Path::new("/abs")),
            PathBuf::from("/abs")
        );
    }
}
