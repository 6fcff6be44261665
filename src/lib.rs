//! rsg - Render a repository's structure as an annotated tree.
//!
//! rsg walks a directory, draws it with box-drawing connectors, and lists
//! beneath every Python file its module docstring, functions, async
//! functions and classes.
//!
//! # Quick Start
//!
//! ```no_run
//! use rsg::builder::Rsg;
//!
//! let tree = Rsg::new("./my-project")
//!     .exclude("*.pyc")
//!     .exclude("__pycache__")
//!     .render()
//!     .unwrap();
//!
//! print!("{tree}");
//! ```
//!
//! # Modules
//!
//! - [`walker`] - Directory traversal and rendering
//! - [`tree`] - Glyphs, render lines and annotation layout
//! - [`annotate`] - Tree-sitter based Python annotation
//! - [`exclude`] - Anchored glob exclusions and `.rsgignore`
//! - [`output`] - Markdown report writing
//! - [`builder`] - Fluent API
//! - [`logging`] - Subscriber setup for the CLI

pub mod annotate;
pub mod builder;
pub mod errors;
pub mod exclude;
pub mod logging;
pub mod output;
pub mod tree;
pub mod walker;

// Re-export key types at crate root for convenience
pub use annotate::{analyze, annotate, AnnotateError, ClassSummary, ParseError, SourceAnnotation};
pub use builder::Rsg;
pub use errors::{exit_code, RsgError};
pub use exclude::{ExcludeError, ExclusionSet};
pub use output::OutputError;
pub use tree::{Glyphs, RenderLine};
pub use walker::{render, render_lines, RenderOptions, WalkError};
