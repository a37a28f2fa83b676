//! Abstract syntax tree for the Nostos DSL.
//!
//! Nodes form one algebraic type; parse failures are first-class
//! [`Node::ParseError`] variants so the rest of a document stays navigable.
//! Every node carries a [`Position`].

use crate::position::{DocumentUri, Position};
use indexmap::IndexMap;
use nostos_urispec::UriSpec;

/// One AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// String literal; escapes retained verbatim.
    Str { position: Position, text: String },
    Number { position: Position, value: f64 },
    Symbol { position: Position, text: String },
    /// Path literal carrying its parsed URI spec.
    Path { position: Position, spec: UriSpec },
    List { position: Position, items: Vec<Node> },
    Map(MapNode),
    /// Single-argument lambda `param => body`.
    Function {
        param: String,
        param_position: Position,
        body: Box<Node>,
    },
    /// `callee(arg)`.
    Call { callee: Box<Node>, arg: Box<Node> },
    /// `let <bindings> in <body>`.
    Let {
        position: Position,
        bindings: MapNode,
        body: Box<Node>,
    },
    /// Schema extension operator `left << right`.
    Shovel { left: Box<Node>, right: Box<Node> },
    ParseError(ParseErrorNode),
}

/// Ordered mapping from symbol keys to child nodes.
///
/// Insertion order is preserved; later definitions of the same key
/// overwrite earlier ones (the parser reports a warning).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapNode {
    pub position: Position,
    pub entries: IndexMap<String, MapEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key_position: Position,
    pub value: Node,
}

/// A parse failure embedded in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseErrorNode {
    pub uri: DocumentUri,
    pub message: String,
    pub position: Position,
}

impl Node {
    /// Position of the first character belonging to this node.
    pub fn position(&self) -> Position {
        match self {
            Node::Str { position, .. }
            | Node::Number { position, .. }
            | Node::Symbol { position, .. }
            | Node::Path { position, .. }
            | Node::List { position, .. } => *position,
            Node::Map(m) => m.position,
            Node::Function { param_position, .. } => *param_position,
            Node::Call { callee, .. } => callee.position(),
            Node::Let { position, .. } => *position,
            Node::Shovel { left, .. } => left.position(),
            Node::ParseError(e) => e.position,
        }
    }
}

/// Collect all [`ParseErrorNode`]s in the tree, post-order.
pub fn collect_parse_errors(node: &Node) -> Vec<&ParseErrorNode> {
    let mut errors = Vec::new();
    walk_errors(node, &mut errors);
    errors
}

fn walk_errors<'a>(node: &'a Node, out: &mut Vec<&'a ParseErrorNode>) {
    match node {
        Node::Str { .. } | Node::Number { .. } | Node::Symbol { .. } | Node::Path { .. } => {}
        Node::List { items, .. } => {
            for item in items {
                walk_errors(item, out);
            }
        }
        Node::Map(m) => {
            for entry in m.entries.values() {
                walk_errors(&entry.value, out);
            }
        }
        Node::Function { body, .. } => walk_errors(body, out),
        Node::Call { callee, arg } => {
            walk_errors(callee, out);
            walk_errors(arg, out);
        }
        Node::Let { bindings, body, .. } => {
            for entry in bindings.entries.values() {
                walk_errors(&entry.value, out);
            }
            walk_errors(body, out);
        }
        Node::Shovel { left, right } => {
            walk_errors(left, out);
            walk_errors(right, out);
        }
        Node::ParseError(e) => out.push(e),
    }
}

/// A named definition site extracted from the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSpan {
    pub name: String,
    pub begin: Position,
    pub end: Position,
}

/// Collect definition sites: map keys, let bindings and function parameters.
pub fn collect_symbols(node: &Node) -> Vec<SymbolSpan> {
    let mut symbols = Vec::new();
    walk_symbols(node, &mut symbols);
    symbols
}

fn walk_symbols(node: &Node, out: &mut Vec<SymbolSpan>) {
    match node {
        Node::Str { .. }
        | Node::Number { .. }
        | Node::Symbol { .. }
        | Node::Path { .. }
        | Node::ParseError(_) => {}
        Node::List { items, .. } => {
            for item in items {
                walk_symbols(item, out);
            }
        }
        Node::Map(m) => walk_map_symbols(m, out),
        Node::Function {
            param,
            param_position,
            body,
        } => {
            out.push(span(param, *param_position));
            walk_symbols(body, out);
        }
        Node::Call { callee, arg } => {
            walk_symbols(callee, out);
            walk_symbols(arg, out);
        }
        Node::Let { bindings, body, .. } => {
            walk_map_symbols(bindings, out);
            walk_symbols(body, out);
        }
        Node::Shovel { left, right } => {
            walk_symbols(left, out);
            walk_symbols(right, out);
        }
    }
}

fn walk_map_symbols(map: &MapNode, out: &mut Vec<SymbolSpan>) {
    for (name, entry) in &map.entries {
        out.push(span(name, entry.key_position));
        walk_symbols(&entry.value, out);
    }
}

fn span(name: &str, begin: Position) -> SymbolSpan {
    SymbolSpan {
        name: name.to_string(),
        begin,
        end: begin.end(name.chars().count() as u32),
    }
}
