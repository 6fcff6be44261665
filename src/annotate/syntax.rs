//! Closed syntax-node model for Python modules.
//!
//! The tree-sitter concrete syntax tree is lowered into these types by
//! [`super::python`]. Only the shapes the annotator cares about get their own
//! variant; every other statement collapses into [`Node::Other`], which keeps
//! the nested statements so definitions inside `if`, `try`, function bodies
//! and the like are still reachable.

/// A parsed module: the top-level statement list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    pub body: Vec<Node>,
}

/// A statement-level syntax node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// `def name(...)`
    FunctionDef(FunctionDef),
    /// `async def name(...)`
    AsyncFunctionDef(FunctionDef),
    /// `class Name(...)`
    ClassDef(ClassDef),
    /// A bare expression statement.
    Expr(Expr),
    /// Any other construct, with the statements nested inside it.
    Other(Vec<Node>),
}

/// A function or method definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub body: Vec<Node>,
}

/// A class definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    pub body: Vec<Node>,
}

/// The value of an expression statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Constant(Constant),
    Other,
}

/// A literal constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// A text literal, escapes already decoded.
    Str(String),
    /// A byte literal; holds the undecoded source between the quotes.
    Bytes(String),
    /// Numbers, `True`, `False`, `None`, `...`; holds the source text.
    Literal(String),
}

impl Node {
    /// Statements nested directly inside this node.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::FunctionDef(def) | Node::AsyncFunctionDef(def) => &def.body,
            Node::ClassDef(class) => &class.body,
            Node::Other(children) => children,
            Node::Expr(_) => &[],
        }
    }

    /// The string value if this is a bare text-constant statement.
    pub fn as_text_constant(&self) -> Option<&str> {
        match self {
            Node::Expr(Expr::Constant(Constant::Str(text))) => Some(text),
            Node::Expr(Expr::Constant(Constant::Bytes(_) | Constant::Literal(_)))
            | Node::Expr(Expr::Other)
            | Node::FunctionDef(_)
            | Node::AsyncFunctionDef(_)
            | Node::ClassDef(_)
            | Node::Other(_) => None,
        }
    }
}

impl Module {
    /// Iterate every node of the module in document (pre-order) order.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self.body.iter().rev().collect(),
        }
    }

    /// The leading documentation literal, if the first statement is one.
    pub fn docstring(&self) -> Option<&str> {
        self.body.first().and_then(Node::as_text_constant)
    }
}

/// Pre-order iterator over a [`Module`], see [`Module::walk`].
pub struct Walk<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}
