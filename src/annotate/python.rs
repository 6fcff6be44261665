//! Python parsing with tree-sitter.
//!
//! Parses source text and lowers the concrete syntax tree into the closed
//! [`syntax`](super::syntax) model. Any `ERROR` or `MISSING` node in the
//! tree makes the whole parse fail; the annotator never works from a
//! partially recovered tree.

use std::cell::RefCell;
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;
use tree_sitter::Parser;

use super::syntax::{ClassDef, Constant, Expr, FunctionDef, Module, Node};

// Cached per thread; grammar loading is the expensive part of a parse.
thread_local! {
    static PYTHON_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

/// Reasons a source file could not be turned into a [`Module`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("failed to initialize Python parser")]
    ParserInit,

    #[error("parser produced no syntax tree")]
    NoTree,

    #[error("file is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid syntax at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
}

fn init_python_parser() -> Result<Parser, ParseError> {
    let mut p = Parser::new();
    p.set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|_| ParseError::ParserInit)?;
    Ok(p)
}

/// Execute a function with the cached Python parser.
fn with_python_parser<F, R>(f: F) -> Result<R, ParseError>
where
    F: FnOnce(&mut Parser) -> R,
{
    PYTHON_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(init_python_parser()?);
        }

        let parser = slot.as_mut().ok_or(ParseError::ParserInit)?;
        Ok(f(parser))
    })
}

/// Parse Python source into a [`Module`].
pub fn parse_module(source: &str) -> Result<Module, ParseError> {
    let tree = with_python_parser(|parser| parser.parse(source, None))?
        .ok_or(ParseError::NoTree)?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(first_error(root, source));
    }
    check_layout(root)?;

    Ok(Module {
        body: lower_block(root, source),
    })
}

/// Extract node text from content.
fn node_text<'s>(node: tree_sitter::Node, content: &'s str) -> &'s str {
    &content[node.byte_range()]
}

fn named_children(node: tree_sitter::Node) -> Vec<tree_sitter::Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

fn first_error(root: tree_sitter::Node, source: &str) -> ParseError {
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if node.is_missing() {
            return syntax_error(node, format!("missing `{}`", node.kind()));
        }
        if node.is_error() {
            let snippet: String = node_text(node, source)
                .lines()
                .next()
                .unwrap_or_default()
                .chars()
                .take(24)
                .collect();
            return syntax_error(node, format!("unexpected `{}`", snippet.trim()));
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }

    syntax_error(root, "invalid syntax".to_string())
}

fn syntax_error(node: tree_sitter::Node, message: String) -> ParseError {
    let position = node.start_position();
    ParseError::Syntax {
        line: position.row + 1,
        column: position.column + 1,
        message,
    }
}

/// Reject trees tree-sitter accepts but the Python compiler does not:
/// Python 2 `print`/`exec` statements and misplaced indentation.
fn check_layout(root: tree_sitter::Node) -> Result<(), ParseError> {
    check_statement_columns(&named_children(root), 0)?;

    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "print_statement" => {
                return Err(syntax_error(
                    node,
                    "missing parentheses in call to 'print'".to_string(),
                ));
            }
            "exec_statement" => {
                return Err(syntax_error(
                    node,
                    "missing parentheses in call to 'exec'".to_string(),
                ));
            }
            "block" => check_block(node)?,
            _ => {}
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    Ok(())
}

fn check_block(block: tree_sitter::Node) -> Result<(), ParseError> {
    let statements = named_children(block);
    let Some(first) = statements.first() else {
        return Err(syntax_error(block, "expected an indented block".to_string()));
    };
    let Some(header) = block.parent() else {
        return Ok(());
    };

    let header_start = header.start_position();
    let body_start = first.start_position();
    // `if x: pass` keeps its body on the header line.
    if body_start.row == header_start.row {
        return Ok(());
    }
    if body_start.column <= header_start.column {
        return Err(syntax_error(*first, "expected an indented block".to_string()));
    }
    check_statement_columns(&statements, body_start.column)
}

// Every statement that opens a line must sit at the block's indentation.
fn check_statement_columns(
    statements: &[tree_sitter::Node],
    indent: usize,
) -> Result<(), ParseError> {
    let mut previous_end_row = None;
    for statement in statements {
        let start = statement.start_position();
        if previous_end_row != Some(start.row) && start.column != indent {
            let message = if start.column > indent {
                "unexpected indent"
            } else {
                "unindent does not match any outer indentation level"
            };
            return Err(syntax_error(*statement, message.to_string()));
        }
        previous_end_row = Some(statement.end_position().row);
    }
    Ok(())
}

/// Lower every statement of a `module` or `block` node.
fn lower_block(node: tree_sitter::Node, source: &str) -> Vec<Node> {
    named_children(node)
        .into_iter()
        .map(|child| lower_statement(child, source))
        .collect()
}

fn lower_statement(node: tree_sitter::Node, source: &str) -> Node {
    match node.kind() {
        "function_definition" => lower_function(node, source),
        "class_definition" => lower_class(node, source),
        "decorated_definition" => match node.child_by_field_name("definition") {
            Some(definition) => lower_statement(definition, source),
            None => Node::Other(nested_statements(node, source)),
        },
        "expression_statement" => Node::Expr(lower_expression_statement(node, source)),
        _ => Node::Other(nested_statements(node, source)),
    }
}

/// Statements reachable below a compound statement (`if`, `try`, `with`, ...).
fn nested_statements(node: tree_sitter::Node, source: &str) -> Vec<Node> {
    let mut nested = Vec::new();
    for child in named_children(node) {
        match child.kind() {
            "block" => nested.extend(lower_block(child, source)),
            "function_definition" | "class_definition" | "decorated_definition" => {
                nested.push(lower_statement(child, source));
            }
            _ => nested.extend(nested_statements(child, source)),
        }
    }
    nested
}

fn lower_function(node: tree_sitter::Node, source: &str) -> Node {
    let Some(name) = node.child_by_field_name("name") else {
        return Node::Other(nested_statements(node, source));
    };

    let def = FunctionDef {
        name: node_text(name, source).to_string(),
        body: node
            .child_by_field_name("body")
            .map(|body| lower_block(body, source))
            .unwrap_or_default(),
    };

    let mut cursor = node.walk();
    let is_async = node.children(&mut cursor).any(|c| c.kind() == "async");

    if is_async {
        Node::AsyncFunctionDef(def)
    } else {
        Node::FunctionDef(def)
    }
}

fn lower_class(node: tree_sitter::Node, source: &str) -> Node {
    let Some(name) = node.child_by_field_name("name") else {
        return Node::Other(nested_statements(node, source));
    };

    Node::ClassDef(ClassDef {
        name: node_text(name, source).to_string(),
        body: node
            .child_by_field_name("body")
            .map(|body| lower_block(body, source))
            .unwrap_or_default(),
    })
}

fn lower_expression_statement(node: tree_sitter::Node, source: &str) -> Expr {
    match named_children(node).as_slice() {
        [expression] => lower_expression(*expression, source),
        _ => Expr::Other,
    }
}

fn lower_expression(node: tree_sitter::Node, source: &str) -> Expr {
    match node.kind() {
        "parenthesized_expression" => match named_children(node).as_slice() {
            [inner] => lower_expression(*inner, source),
            _ => Expr::Other,
        },
        "string" => decode_string_literal(node_text(node, source))
            .map(Expr::Constant)
            .unwrap_or(Expr::Other),
        "concatenated_string" => lower_concatenated(node, source),
        "integer" | "float" | "true" | "false" | "none" | "ellipsis" => {
            Expr::Constant(Constant::Literal(node_text(node, source).to_string()))
        }
        _ => Expr::Other,
    }
}

/// Implicit concatenation (`"a" "b"`) is a single constant when every part is.
fn lower_concatenated(node: tree_sitter::Node, source: &str) -> Expr {
    let mut text = String::new();
    let mut bytes = String::new();
    let (mut saw_text, mut saw_bytes) = (false, false);

    for part in named_children(node) {
        if part.kind() != "string" {
            return Expr::Other;
        }
        match decode_string_literal(node_text(part, source)) {
            Some(Constant::Str(s)) => {
                saw_text = true;
                text.push_str(&s);
            }
            Some(Constant::Bytes(b)) => {
                saw_bytes = true;
                bytes.push_str(&b);
            }
            Some(Constant::Literal(_)) | None => return Expr::Other,
        }
    }

    match (saw_text, saw_bytes) {
        (true, false) => Expr::Constant(Constant::Str(text)),
        (false, true) => Expr::Constant(Constant::Bytes(bytes)),
        _ => Expr::Other,
    }
}

/// Decode a string literal's source text.
///
/// Returns `None` for f-strings, which are not constants.
pub(crate) fn decode_string_literal(literal: &str) -> Option<Constant> {
    let quote_at = literal.find(['"', '\''])?;
    let (prefix, quoted) = literal.split_at(quote_at);
    let prefix = prefix.to_ascii_lowercase();
    if prefix.contains('f') {
        return None;
    }

    let quote = quoted.chars().next()?;
    let triple: String = std::iter::repeat(quote).take(3).collect();
    let width = if quoted.len() >= 6 && quoted.starts_with(&triple) && quoted.ends_with(&triple) {
        3
    } else {
        1
    };
    if quoted.len() < 2 * width {
        return None;
    }
    let body = &quoted[width..quoted.len() - width];

    Some(if prefix.contains('b') {
        Constant::Bytes(body.to_string())
    } else if prefix.contains('r') {
        Constant::Str(body.to_string())
    } else {
        Constant::Str(unescape(body))
    })
}

/// Resolve backslash escapes in a non-raw text literal.
///
/// `\N{...}` and malformed escapes are kept verbatim.
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            out.push('\\');
            break;
        };
        match escape {
            '\n' => {}
            '\\' | '\'' | '"' => out.push(escape),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut value = escape.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            'x' | 'u' | 'U' => {
                let width = match escape {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits = take_hex(&mut chars, width);
                let decoded = (digits.len() == width)
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push('\\');
                        out.push(escape);
                        out.push_str(&digits);
                    }
                }
            }
            _ => {
                out.push('\\');
                out.push(escape);
            }
        }
    }

    out
}

fn take_hex(chars: &mut Peekable<Chars<'_>>, width: usize) -> String {
    let mut digits = String::with_capacity(width);
    while digits.len() < width {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                digits.push(*c);
                chars.next();
            }
            _ => break,
        }
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(module: &Module) -> Vec<String> {
        module
            .walk()
            .filter_map(|node| match node {
                Node::FunctionDef(d) | Node::AsyncFunctionDef(d) => Some(d.name.clone()),
                Node::ClassDef(c) => Some(c.name.clone()),
                Node::Expr(_) | Node::Other(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_definitions() {
        let code = r#"
def greet(name: str) -> str:
    return f"Hello, {name}"

async def fetch(url):
    pass

class Handler(Base):
    def handle(self):
        pass
"#;
        let module = parse_module(code).unwrap();
        assert_eq!(module.body.len(), 3);
        assert!(matches!(&module.body[0], Node::FunctionDef(d) if d.name == "greet"));
        assert!(matches!(&module.body[1], Node::AsyncFunctionDef(d) if d.name == "fetch"));
        match &module.body[2] {
            Node::ClassDef(class) => {
                assert_eq!(class.name, "Handler");
                assert!(matches!(&class.body[0], Node::FunctionDef(d) if d.name == "handle"));
            }
            other => panic!("expected class, got {other:?}"),
        }
    }

    #[test]
    fn test_decorated_definitions_are_unwrapped() {
        let code = r#"
@app.route("/")
def index():
    pass

@dataclass
class Point:
    @property
    def norm(self):
        pass
"#;
        let module = parse_module(code).unwrap();
        assert!(matches!(&module.body[0], Node::FunctionDef(d) if d.name == "index"));
        match &module.body[1] {
            Node::ClassDef(class) => {
                assert!(matches!(&class.body[0], Node::FunctionDef(d) if d.name == "norm"));
            }
            other => panic!("expected class, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_compound_statements_keep_definitions() {
        let code = r#"
import os

if os.name == "nt":
    def windows():
        pass
else:
    def posix():
        pass

try:
    class Optional:
        pass
except ImportError:
    pass
"#;
        let module = parse_module(code).unwrap();
        // import, if, try: every statement is kept at top level
        assert_eq!(module.body.len(), 3);
        assert_eq!(names(&module), ["windows", "posix", "Optional"]);
    }

    #[test]
    fn test_comments_are_not_statements() {
        let code = "#!/usr/bin/env python\n# comment\n\"\"\"Doc.\"\"\"\n";
        let module = parse_module(code).unwrap();
        assert_eq!(module.docstring(), Some("Doc."));
    }

    #[test]
    fn test_docstring_after_import_is_not_leading() {
        let module = parse_module("import os\n\"late\"\n").unwrap();
        assert_eq!(module.docstring(), None);
    }

    #[test]
    fn test_expression_constants() {
        let module = parse_module("42\n").unwrap();
        assert!(matches!(
            &module.body[0],
            Node::Expr(Expr::Constant(Constant::Literal(text))) if text == "42"
        ));

        let module = parse_module("(\"wrapped\")\n").unwrap();
        assert_eq!(module.docstring(), Some("wrapped"));

        let module = parse_module("\"one \" 'two'\n").unwrap();
        assert_eq!(module.docstring(), Some("one two"));

        let module = parse_module("b\"raw\"\n").unwrap();
        assert!(matches!(
            &module.body[0],
            Node::Expr(Expr::Constant(Constant::Bytes(_)))
        ));

        let module = parse_module("f\"{x}\"\n").unwrap();
        assert!(matches!(&module.body[0], Node::Expr(Expr::Other)));

        let module = parse_module("x = \"not a doc\"\n").unwrap();
        assert_eq!(module.docstring(), None);
    }

    #[test]
    fn test_syntax_error_reports_position() {
        let err = parse_module("def broken(:\n    pass\n").unwrap_err();
        match err {
            ParseError::Syntax { line, .. } => assert_eq!(line, 1),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    fn assert_syntax_error(code: &str, expected: &str) {
        match parse_module(code) {
            Err(ParseError::Syntax { message, .. }) => assert_eq!(message, expected),
            other => panic!("expected syntax error for {code:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_python2_statements_rejected() {
        assert_syntax_error(
            "print \"hi\"\nclass Old:\n    pass\n",
            "missing parentheses in call to 'print'",
        );
        assert_syntax_error("exec \"x = 1\"\n", "missing parentheses in call to 'exec'");
        assert!(parse_module("print(\"hi\")\n").is_ok());
    }

    #[test]
    fn test_indented_top_level_statement_rejected() {
        for code in ["x = 1\n  y = 2\n", "  x = 1\n"] {
            assert!(matches!(parse_module(code), Err(ParseError::Syntax { .. })), "{code:?}");
        }
    }

    #[test]
    fn test_unindented_block_rejected() {
        assert_syntax_error("if True:\npass\n", "expected an indented block");
        assert_syntax_error(
            "if True:\ndef helper():\n    pass\n",
            "expected an indented block",
        );
        let unindented_method = "class A:\n    def m(self):\n    pass\n";
        assert!(matches!(
            parse_module(unindented_method),
            Err(ParseError::Syntax { .. })
        ));
    }

    #[test]
    fn test_valid_layouts_accepted() {
        let code = r#"
x = 1; y = 2
if x: pass
def f(a,
      b):
    # leading comment
    if a:
        return b
    else:
        return a
class K: z = 3
"#;
        let module = parse_module(code).unwrap();
        assert_eq!(names(&module), ["f", "K"]);
    }

    #[test]
    fn test_empty_source() {
        let module = parse_module("").unwrap();
        assert!(module.body.is_empty());
    }

    #[test]
    fn test_decode_string_literal_quotes_and_prefixes() {
        assert_eq!(
            decode_string_literal("\"hello\""),
            Some(Constant::Str("hello".into()))
        );
        assert_eq!(
            decode_string_literal("'''multi\nline'''"),
            Some(Constant::Str("multi\nline".into()))
        );
        assert_eq!(
            decode_string_literal("\"\""),
            Some(Constant::Str(String::new()))
        );
        assert_eq!(
            decode_string_literal("r\"\\n stays\""),
            Some(Constant::Str("\\n stays".into()))
        );
        assert_eq!(
            decode_string_literal("U\"upper prefix\""),
            Some(Constant::Str("upper prefix".into()))
        );
        assert_eq!(
            decode_string_literal("rb'x'"),
            Some(Constant::Bytes("x".into()))
        );
        assert_eq!(decode_string_literal("F'{x}'"), None);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"tab\there"), "tab\there");
        assert_eq!(unescape(r#"quote \" and \\"#), "quote \" and \\");
        assert_eq!(unescape("joined \\\nline"), "joined line");
        assert_eq!(unescape(r"\x41é\U0001F600"), "Aé😀");
        assert_eq!(unescape(r"\101"), "A");
        assert_eq!(unescape(r"\N{BULLET} \q"), r"\N{BULLET} \q");
        assert_eq!(unescape(r"\xZZ"), r"\xZZ");
    }
}
