//! Tree line representation and rendering.
//!
//! Provides the glyph set, the [`RenderLine`] type the walker emits, and
//! the layout of source annotations beneath a file entry.

use std::fmt;

use crate::annotate::SourceAnnotation;

/// Box-drawing glyphs used to draw the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyphs {
    /// Connector for an entry with more siblings below it.
    pub branch: &'static str,
    /// Connector for the last entry at its level.
    pub last_branch: &'static str,
    /// Continuation drawn under a non-last entry.
    pub vertical: &'static str,
    /// Padding after the continuation glyph.
    pub indent: &'static str,
}

impl Glyphs {
    /// `├──`, `└──`, `│` with three-space indentation.
    pub const fn unicode() -> Self {
        Self {
            branch: "├──",
            last_branch: "└──",
            vertical: "│",
            indent: "   ",
        }
    }

    /// Plain ASCII variant for terminals without box-drawing support.
    pub const fn ascii() -> Self {
        Self {
            branch: "|--",
            last_branch: "`--",
            vertical: "|",
            indent: "   ",
        }
    }

    /// The connector glyph for an entry.
    pub fn connector(&self, is_last: bool) -> &'static str {
        if is_last {
            self.last_branch
        } else {
            self.branch
        }
    }

    /// Extend `prefix` for the children of an entry.
    pub fn child_prefix(&self, prefix: &str, is_last: bool) -> String {
        let capacity = prefix.len() + self.vertical.len() + self.indent.len();
        let mut next = String::with_capacity(capacity);
        next.push_str(prefix);
        if is_last {
            next.extend(std::iter::repeat(' ').take(self.vertical.chars().count()));
        } else {
            next.push_str(self.vertical);
        }
        next.push_str(self.indent);
        next
    }
}

impl Default for Glyphs {
    fn default() -> Self {
        Self::unicode()
    }
}

/// One line of rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderLine {
    /// Continuation glyphs for the ancestors of this line.
    pub prefix: String,
    /// Branch or terminal connector; `None` for the root marker and doc lines.
    pub connector: Option<&'static str>,
    /// Entry name or annotation text.
    pub label: String,
}

impl RenderLine {
    /// A line with a connector.
    pub fn entry(prefix: &str, connector: &'static str, label: impl Into<String>) -> Self {
        Self {
            prefix: prefix.to_string(),
            connector: Some(connector),
            label: label.into(),
        }
    }

    /// A line drawn without a connector.
    pub fn bare(prefix: &str, label: impl Into<String>) -> Self {
        Self {
            prefix: prefix.to_string(),
            connector: None,
            label: label.into(),
        }
    }
}

impl fmt::Display for RenderLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.connector {
            Some(connector) => write!(f, "{}{} {}", self.prefix, connector, self.label),
            None => write!(f, "{}{}", self.prefix, self.label),
        }
    }
}

/// Join lines into the final text block, one `\n` after each line.
pub fn join_lines(lines: &[RenderLine]) -> String {
    // Pre-allocate for typical line length
    let mut output = String::with_capacity(lines.len() * 32);
    for line in lines {
        output.push_str(&line.to_string());
        output.push('\n');
    }
    output
}

/// A titled group of names shown beneath a file.
struct Section<'a> {
    title: &'static str,
    items: Vec<SectionItem<'a>>,
}

enum SectionItem<'a> {
    Name(&'a str),
    Class { name: &'a str, methods: &'a [String] },
}

fn names(list: &[String]) -> Vec<SectionItem<'_>> {
    list.iter().map(|n| SectionItem::Name(n.as_str())).collect()
}

fn sections(annotation: &SourceAnnotation) -> Vec<Section<'_>> {
    let candidates = [
        Section {
            title: "Functions",
            items: names(&annotation.functions),
        },
        Section {
            title: "Async Functions",
            items: names(&annotation.async_functions),
        },
        Section {
            title: "Classes",
            items: annotation
                .classes
                .iter()
                .map(|class| SectionItem::Class {
                    name: &class.name,
                    methods: &class.methods,
                })
                .collect(),
        },
    ];

    candidates
        .into_iter()
        .filter(|section| !section.items.is_empty())
        .collect()
}

/// Lay out an annotation as lines under `prefix`.
///
/// `prefix` is the child prefix of the file entry the annotation belongs to.
/// Sections come first; the documentation literal follows without connectors.
pub fn annotation_lines(
    annotation: &SourceAnnotation,
    prefix: &str,
    glyphs: &Glyphs,
) -> Vec<RenderLine> {
    let mut lines = Vec::new();
    let doc = annotation.formatted_doc();
    let sections = sections(annotation);
    let section_count = sections.len();

    for (i, section) in sections.into_iter().enumerate() {
        let is_last = i == section_count - 1 && doc.is_none();
        lines.push(RenderLine::entry(
            prefix,
            glyphs.connector(is_last),
            format!("{}:", section.title),
        ));

        let item_prefix = glyphs.child_prefix(prefix, is_last);
        let item_count = section.items.len();
        for (j, item) in section.items.into_iter().enumerate() {
            let item_is_last = j == item_count - 1;
            match item {
                SectionItem::Name(name) => {
                    lines.push(RenderLine::entry(
                        &item_prefix,
                        glyphs.connector(item_is_last),
                        name,
                    ));
                }
                SectionItem::Class { name, methods } => {
                    lines.push(RenderLine::entry(
                        &item_prefix,
                        glyphs.connector(item_is_last),
                        format!("{}:", name),
                    ));
                    let method_prefix = glyphs.child_prefix(&item_prefix, item_is_last);
                    for (k, method) in methods.iter().enumerate() {
                        lines.push(RenderLine::entry(
                            &method_prefix,
                            glyphs.connector(k == methods.len() - 1),
                            method.as_str(),
                        ));
                    }
                }
            }
        }
    }

    if let Some(doc) = doc {
        lines.extend(doc.split('\n').map(|line| RenderLine::bare(prefix, line)));
    }

    lines
}
