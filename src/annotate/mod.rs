//! Source annotation for Python files.
//!
//! Extracts a module's leading documentation literal and a summary of the
//! functions, async functions and classes it defines. Parsing is
//! best-effort: a file that does not parse simply has no annotation.

mod python;
pub mod syntax;

use std::path::{Path, PathBuf};

use smallvec::SmallVec;
use thiserror::Error;

pub use python::{ParseError, parse_module};
use syntax::{Module, Node};

/// Suffix of the files the annotator understands.
pub const SOURCE_EXTENSION: &str = ".py";

/// Opening bracket of a rendered documentation literal.
pub const DOC_OPEN: &str = "「";
/// Closing bracket of a rendered documentation literal.
pub const DOC_CLOSE: &str = " 」";

/// A class and the methods defined directly in its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSummary {
    pub name: String,
    pub methods: SmallVec<[String; 8]>,
}

/// What the annotator found in one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceAnnotation {
    /// Leading documentation literal, as written (not yet bracketed).
    pub doc: Option<String>,
    /// Synchronous functions, top-level and nested, in declaration order.
    pub functions: Vec<String>,
    /// Asynchronous functions, top-level and nested, in declaration order.
    pub async_functions: Vec<String>,
    /// Classes in declaration order.
    pub classes: Vec<ClassSummary>,
}

impl SourceAnnotation {
    /// Build the annotation for a parsed module.
    pub fn from_module(module: &Module) -> Self {
        let mut annotation = Self {
            doc: module.docstring().map(str::to_string),
            ..Default::default()
        };

        for node in module.walk() {
            match node {
                Node::FunctionDef(def) => annotation.functions.push(def.name.clone()),
                Node::AsyncFunctionDef(def) => annotation.async_functions.push(def.name.clone()),
                Node::ClassDef(class) => {
                    let methods = class
                        .body
                        .iter()
                        .filter_map(|member| match member {
                            Node::FunctionDef(def) | Node::AsyncFunctionDef(def) => {
                                Some(def.name.clone())
                            }
                            Node::ClassDef(_) | Node::Expr(_) | Node::Other(_) => None,
                        })
                        .collect();
                    annotation.insert_class(ClassSummary {
                        name: class.name.clone(),
                        methods,
                    });
                }
                Node::Expr(_) | Node::Other(_) => {}
            }
        }

        annotation
    }

    // A redefined class keeps its first position and takes the latest methods.
    fn insert_class(&mut self, class: ClassSummary) {
        match self.classes.iter_mut().find(|c| c.name == class.name) {
            Some(existing) => existing.methods = class.methods,
            None => self.classes.push(class),
        }
    }

    /// The documentation literal wrapped in corner brackets.
    pub fn formatted_doc(&self) -> Option<String> {
        self.doc.as_deref().map(format_doc)
    }

    /// True when nothing would be rendered for this file.
    pub fn is_empty(&self) -> bool {
        self.doc.is_none()
            && self.functions.is_empty()
            && self.async_functions.is_empty()
            && self.classes.is_empty()
    }
}

/// Wrap a documentation literal as `「text 」`, keeping inner line breaks.
pub fn format_doc(doc: &str) -> String {
    let lines: Vec<&str> = doc.trim().split('\n').collect();
    format!("{}{}{}", DOC_OPEN, lines.join("\n"), DOC_CLOSE)
}

/// Check whether a file name carries the recognized source extension.
pub fn is_source_file(name: &str) -> bool {
    name.ends_with(SOURCE_EXTENSION)
}

/// Errors from reading a source file.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("failed to read file: {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Analyze Python source text.
pub fn analyze(source: &str) -> Result<SourceAnnotation, ParseError> {
    let module = parse_module(&normalize_newlines(source))?;
    Ok(SourceAnnotation::from_module(&module))
}

/// Annotate the source file at `path`.
///
/// A file that cannot be parsed is reported with a warning and yields
/// `Ok(None)`. Only a failure to read the file is an error.
pub fn annotate(path: &Path) -> Result<Option<SourceAnnotation>, AnnotateError> {
    let bytes = std::fs::read(path).map_err(|source| AnnotateError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let result = match String::from_utf8(bytes) {
        Ok(source) => analyze(&source),
        Err(_) => Err(ParseError::InvalidUtf8),
    };

    match result {
        Ok(annotation) => Ok(Some(annotation)),
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "error parsing source file");
            Ok(None)
        }
    }
}

fn normalize_newlines(source: &str) -> String {
    source.replace("\r\n", "\n").replace('\r', "\n")
}
