//! Pratt parser for the Nostos DSL.
//!
//! Dispatch is keyed on token kind through a single rule table giving a
//! precedence, an optional null denotation (expression start) and an
//! optional left denotation (infix continuation). Maps and lists are grouped
//! by indentation. Parse failures never abort the parse: they become
//! [`Node::ParseError`] variants embedded in the tree, and sibling regions
//! keep parsing where indentation permits.

use crate::ast::{MapEntry, MapNode, Node, ParseErrorNode};
use crate::error::NostosError;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::position::{DocumentUri, Position};
use indexmap::IndexMap;
use nostos_urispec::UriSpec;

/// Binding strength, low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equality,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

type NudFn = fn(&mut Parser<'_>, Token) -> Node;
type LedFn = fn(&mut Parser<'_>, Node, u32, Token) -> Node;

struct Rule {
    precedence: Precedence,
    nud: Option<NudFn>,
    led: Option<LedFn>,
}

fn rule(kind: TokenKind) -> Rule {
    use TokenKind::*;
    match kind {
        Str | Path | Number | Symbol => Rule {
            precedence: Precedence::Lowest,
            nud: Some(literal),
            led: None,
        },
        Let => Rule {
            precedence: Precedence::Lowest,
            nud: Some(let_expression),
            led: None,
        },
        ListMarker => Rule {
            precedence: Precedence::Lowest,
            nud: Some(list),
            led: None,
        },
        Error => Rule {
            precedence: Precedence::Lowest,
            nud: Some(lex_error),
            led: None,
        },
        Colon => Rule {
            precedence: Precedence::Call,
            nud: None,
            led: Some(map_entry),
        },
        Arrow => Rule {
            precedence: Precedence::Call,
            nud: None,
            led: Some(function),
        },
        Shovel => Rule {
            precedence: Precedence::Call,
            nud: None,
            led: Some(shovel),
        },
        LeftParen => Rule {
            precedence: Precedence::Call,
            nud: None,
            led: Some(call),
        },
        RightParen | Dot | In | Eof => Rule {
            precedence: Precedence::Lowest,
            nud: None,
            led: None,
        },
    }
}

/// Result of parsing one document.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub uri: DocumentUri,
    pub root: Node,
    /// Non-fatal diagnostics, currently duplicate map keys.
    pub warnings: Vec<NostosError>,
}

/// Lex and parse a source string into a single root node.
pub fn parse_document(source: &str, uri: &DocumentUri) -> ParsedDocument {
    let parser = Parser::new(Lexer::new(source), uri.clone());
    parser.run()
}

pub struct Parser<'a> {
    tokens: Lexer<'a>,
    peeked: Option<Option<Token>>,
    uri: DocumentUri,
    warnings: Vec<NostosError>,
    /// Indent override for the first map inside a list item: tokens on the
    /// marker line carry the marker line's indent, but their map belongs to
    /// the item one step deeper.
    item_indent: Option<u32>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Lexer<'a>, uri: DocumentUri) -> Parser<'a> {
        Parser {
            tokens,
            peeked: None,
            uri,
            warnings: Vec::new(),
            item_indent: None,
        }
    }

    pub fn run(mut self) -> ParsedDocument {
        let mut nodes = Vec::new();
        while !self.at_end() {
            nodes.push(self.parse_expression(Precedence::Lowest));
        }
        let root = merge_top_level(nodes);
        ParsedDocument {
            uri: self.uri,
            root,
            warnings: self.warnings,
        }
    }

    fn peek(&mut self) -> Option<&Token> {
        let tokens = &mut self.tokens;
        self.peeked.get_or_insert_with(|| tokens.next()).as_ref()
    }

    fn accept(&mut self) -> Option<Token> {
        match self.peeked.take() {
            Some(t) => t,
            None => self.tokens.next(),
        }
    }

    fn at_end(&mut self) -> bool {
        matches!(self.peek(), None | Some(Token { kind: TokenKind::Eof, .. }))
    }

    fn error_node(&self, position: Position, message: impl Into<String>) -> Node {
        Node::ParseError(ParseErrorNode {
            uri: self.uri.clone(),
            message: message.into(),
            position,
        })
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Node {
        let Some(token) = self.accept() else {
            return self.error_node(Position::default(), "unexpected end of input");
        };
        let start_indent = token.indent;
        let mut lhs = match rule(token.kind).nud {
            Some(nud) => nud(self, token),
            None => {
                let what = if token.kind == TokenKind::Eof {
                    "end of input".to_string()
                } else {
                    format!("'{}'", token.text)
                };
                self.error_node(token.position, format!("unexpected {what}"))
            }
        };
        loop {
            let Some(next) = self.peek() else { break };
            let next_rule = rule(next.kind);
            if precedence >= next_rule.precedence {
                break;
            }
            let Some(led) = next_rule.led else { break };
            let op = self.accept().expect("peeked token vanished");
            lhs = led(self, lhs, start_indent, op);
        }
        lhs
    }

    fn insert_entry(&mut self, map: &mut MapNode, key: String, entry: MapEntry) {
        let key_position = entry.key_position;
        if map.entries.insert(key.clone(), entry).is_some() {
            self.warnings.push(NostosError::parse(
                self.uri.clone(),
                key_position,
                format!("duplicate map key {key:?}"),
            ));
        }
    }
}

/// Merge top-level expressions into a single root node.
///
/// Sibling maps merge into one; mixed content becomes a list; an empty
/// document is an empty map.
fn merge_top_level(mut nodes: Vec<Node>) -> Node {
    match nodes.len() {
        0 => Node::Map(MapNode::default()),
        1 => nodes.remove(0),
        _ if nodes.iter().all(|n| matches!(n, Node::Map(_))) => {
            let mut merged = MapNode::default();
            let mut first = true;
            for node in nodes {
                let Node::Map(m) = node else { unreachable!() };
                if first {
                    merged.position = m.position;
                    first = false;
                }
                merged.entries.extend(m.entries);
            }
            Node::Map(merged)
        }
        _ => {
            let position = nodes[0].position();
            Node::List {
                position,
                items: nodes,
            }
        }
    }
}

fn literal(parser: &mut Parser<'_>, token: Token) -> Node {
    match token.kind {
        TokenKind::Str => Node::Str {
            position: token.position,
            text: token.text,
        },
        TokenKind::Symbol => Node::Symbol {
            position: token.position,
            text: token.text,
        },
        TokenKind::Path => Node::Path {
            position: token.position,
            spec: UriSpec::parse(&token.text),
        },
        TokenKind::Number => match parse_number(&token.text) {
            Some(value) => Node::Number {
                position: token.position,
                value,
            },
            None => parser.error_node(
                token.position,
                format!("bad number syntax: {:?}", token.text),
            ),
        },
        _ => unreachable!("literal nud bound to non-literal token"),
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()? as f64
    } else {
        rest.parse::<f64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn lex_error(parser: &mut Parser<'_>, token: Token) -> Node {
    parser.error_node(token.position, token.text)
}

/// `key: value`, then greedily more `key: value` pairs at the same indent.
fn map_entry(parser: &mut Parser<'_>, lhs: Node, lhs_indent: u32, _colon: Token) -> Node {
    let (mut key, mut key_position) = match lhs {
        Node::Symbol { position, text } => (text, position),
        other => {
            return parser.error_node(
                other.position(),
                "map key must be a symbol",
            );
        }
    };
    let continuation = match parser.item_indent.take() {
        Some(item) => item.max(lhs_indent),
        None => lhs_indent,
    };

    let mut map = MapNode {
        position: key_position,
        entries: IndexMap::new(),
    };
    loop {
        let value = parser.parse_expression(Precedence::Lowest);
        parser.insert_entry(
            &mut map,
            key,
            MapEntry {
                key_position,
                value,
            },
        );

        // Another entry of the same map?
        let same_indent = matches!(
            parser.peek(),
            Some(t) if t.kind == TokenKind::Symbol && t.indent == continuation
        );
        if !same_indent {
            break;
        }
        let key_token = parser.accept().expect("peeked token vanished");
        if !matches!(parser.peek(), Some(t) if t.kind == TokenKind::Colon) {
            let err = parser.error_node(key_token.position, "expected ':' after map key");
            parser.insert_entry(
                &mut map,
                key_token.text,
                MapEntry {
                    key_position: key_token.position,
                    value: err,
                },
            );
            break;
        }
        parser.accept(); // ':'
        key = key_token.text;
        key_position = key_token.position;
    }
    Node::Map(map)
}

/// `parameter => body`.
fn function(parser: &mut Parser<'_>, lhs: Node, _lhs_indent: u32, _arrow: Token) -> Node {
    let (param, param_position) = match lhs {
        Node::Symbol { position, text } => (text, position),
        other => {
            return parser.error_node(other.position(), "function parameter must be a symbol");
        }
    };
    let body = parser.parse_expression(Precedence::Lowest);
    Node::Function {
        param,
        param_position,
        body: Box::new(body),
    }
}

/// `callee(argument)` with a single argument.
fn call(parser: &mut Parser<'_>, lhs: Node, _lhs_indent: u32, lparen: Token) -> Node {
    if matches!(parser.peek(), Some(t) if t.kind == TokenKind::RightParen) {
        let rparen = parser.accept().expect("peeked token vanished");
        return parser.error_node(rparen.position, "expected call argument");
    }
    let arg = parser.parse_expression(Precedence::Lowest);
    if matches!(parser.peek(), Some(t) if t.kind == TokenKind::RightParen) {
        parser.accept();
        Node::Call {
            callee: Box::new(lhs),
            arg: Box::new(arg),
        }
    } else {
        parser.error_node(lparen.position, "expected ')' after call argument")
    }
}

/// Left-associative `left << right`.
fn shovel(parser: &mut Parser<'_>, lhs: Node, _lhs_indent: u32, _op: Token) -> Node {
    let right = parser.parse_expression(Precedence::Call);
    Node::Shovel {
        left: Box::new(lhs),
        right: Box::new(right),
    }
}

/// `let <binding-map> [<binding-map>]* in <body>`.
fn let_expression(parser: &mut Parser<'_>, let_token: Token) -> Node {
    let mut bindings = MapNode {
        position: let_token.position,
        entries: IndexMap::new(),
    };
    loop {
        match parser.peek() {
            None => {
                return parser.error_node(let_token.position, "expected 'in' after let bindings");
            }
            Some(t) if t.kind == TokenKind::In => {
                parser.accept();
                break;
            }
            Some(t) if t.kind == TokenKind::Eof => {
                return parser.error_node(let_token.position, "expected 'in' after let bindings");
            }
            Some(_) => {
                let binding = parser.parse_expression(Precedence::Lowest);
                match binding {
                    // Binding maps merge left-to-right; a later binding
                    // overrides an earlier one without a duplicate warning.
                    Node::Map(m) => bindings.entries.extend(m.entries),
                    Node::ParseError(e) => return Node::ParseError(e),
                    other => {
                        return parser
                            .error_node(other.position(), "let bindings must be a map");
                    }
                }
            }
        }
    }
    let body = parser.parse_expression(Precedence::Lowest);
    Node::Let {
        position: let_token.position,
        bindings,
        body: Box::new(body),
    }
}

/// `- item` sequences at one indent level.
fn list(parser: &mut Parser<'_>, marker: Token) -> Node {
    let marker_indent = marker.indent;
    let position = marker.position;
    let mut items = Vec::new();
    loop {
        // Tokens on or under the marker line down to the next marker belong
        // to the current item.
        parser.item_indent = Some(marker_indent + 1);
        let item = parser.parse_expression(Precedence::Lowest);
        parser.item_indent = None;
        items.push(item);

        let next_marker = matches!(
            parser.peek(),
            Some(t) if t.kind == TokenKind::ListMarker && t.indent == marker_indent
        );
        if !next_marker {
            break;
        }
        parser.accept();
    }
    Node::List { position, items }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::collect_parse_errors;

    fn parse(source: &str) -> Node {
        parse_document(source, &DocumentUri::stdin()).root
    }

    fn map_keys(node: &Node) -> Vec<String> {
        match node {
            Node::Map(m) => m.entries.keys().cloned().collect(),
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn flat_map() {
        let root = parse("foo: \"bar\"\nbaz: \"qux\"");
        assert_eq!(map_keys(&root), vec!["foo", "baz"]);
        let Node::Map(m) = &root else { unreachable!() };
        assert!(matches!(&m.entries["foo"].value, Node::Str { text, .. } if text == "bar"));
        assert!(matches!(&m.entries["baz"].value, Node::Str { text, .. } if text == "qux"));
    }

    #[test]
    fn nested_map_by_indent() {
        let root = parse("a:\n  b: 1\n  c:\n    d: 2");
        let Node::Map(outer) = &root else { panic!() };
        let Node::Map(a) = &outer.entries["a"].value else {
            panic!("a should be a map");
        };
        assert_eq!(a.entries.keys().collect::<Vec<_>>(), vec!["b", "c"]);
        let Node::Map(c) = &a.entries["c"].value else {
            panic!("c should be a map");
        };
        assert!(matches!(c.entries["d"].value, Node::Number { value, .. } if value == 2.0));
    }

    #[test]
    fn list_of_maps() {
        let root = parse("items:\n- x: 1\n  y: 2\n- x: 3");
        let Node::Map(m) = &root else { panic!() };
        let Node::List { items, .. } = &m.entries["items"].value else {
            panic!("items should be a list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(map_keys(&items[0]), vec!["x", "y"]);
        assert_eq!(map_keys(&items[1]), vec!["x"]);
    }

    #[test]
    fn list_of_scalars() {
        let root = parse("- 1\n- 2\n- 3");
        let Node::List { items, .. } = &root else { panic!() };
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn nested_list() {
        let root = parse("outer:\n- inner:\n  - 1\n  - 2");
        let Node::Map(m) = &root else { panic!() };
        let Node::List { items, .. } = &m.entries["outer"].value else {
            panic!()
        };
        let Node::Map(item) = &items[0] else { panic!() };
        let Node::List { items: inner, .. } = &item.entries["inner"].value else {
            panic!("inner should be a list, got {:?}", item.entries["inner"].value)
        };
        assert_eq!(inner.len(), 2);
    }

    #[test]
    fn let_in() {
        let root = parse("let x: 1 in x");
        let Node::Let { bindings, body, .. } = &root else {
            panic!("expected let, got {root:?}")
        };
        assert_eq!(bindings.entries.keys().collect::<Vec<_>>(), vec!["x"]);
        assert!(matches!(&**body, Node::Symbol { text, .. } if text == "x"));
    }

    #[test]
    fn let_missing_in() {
        let root = parse("let x: 1");
        let errors = collect_parse_errors(&root);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("expected 'in'"));
    }

    #[test]
    fn function_literal() {
        let root = parse("x => x");
        let Node::Function { param, body, .. } = &root else {
            panic!("expected function, got {root:?}")
        };
        assert_eq!(param, "x");
        assert!(matches!(&**body, Node::Symbol { text, .. } if text == "x"));
    }

    #[test]
    fn function_parameter_must_be_symbol() {
        let root = parse("\"s\" => x");
        let errors = collect_parse_errors(&root);
        assert!(errors
            .iter()
            .any(|e| e.message == "function parameter must be a symbol"));
    }

    #[test]
    fn call_with_path_argument() {
        let root = parse("import(./svc.no)");
        let Node::Call { callee, arg } = &root else {
            panic!("expected call, got {root:?}")
        };
        assert!(matches!(&**callee, Node::Symbol { text, .. } if text == "import"));
        assert!(matches!(&**arg, Node::Path { .. }));
    }

    #[test]
    fn call_missing_rparen() {
        let root = parse("import(./svc.no");
        let errors = collect_parse_errors(&root);
        assert!(errors.iter().any(|e| e.message.contains("expected ')'")));
    }

    #[test]
    fn shovel_is_left_associative() {
        let root = parse("a << b << c");
        let Node::Shovel { left, right } = &root else {
            panic!("expected shovel, got {root:?}")
        };
        assert!(matches!(&**left, Node::Shovel { .. }));
        assert!(matches!(&**right, Node::Symbol { text, .. } if text == "c"));
    }

    #[test]
    fn let_with_import_binding() {
        let root = parse("let svc: import(./svc.no) in svc.spec.ports");
        let Node::Let { bindings, body, .. } = &root else {
            panic!("expected let, got {root:?}")
        };
        assert!(matches!(
            &bindings.entries["svc"].value,
            Node::Call { .. }
        ));
        assert!(matches!(&**body, Node::Symbol { text, .. } if text == "svc.spec.ports"));
    }

    #[test]
    fn lex_error_becomes_parse_error_node() {
        let root = parse("foo:\tbar");
        let errors = collect_parse_errors(&root);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("horizontal tabs"));
        // The tab sits right after "foo:".
        assert_eq!(errors[0].position.offset, 4);
        assert_eq!(errors[0].position.length, 1);
    }

    #[test]
    fn errors_do_not_abort_siblings() {
        let root = parse("good: 1\nbad: (");
        let Node::Map(m) = &root else { panic!("got {root:?}") };
        assert!(matches!(m.entries["good"].value, Node::Number { .. }));
        assert!(!collect_parse_errors(&root).is_empty());
    }

    #[test]
    fn duplicate_keys_overwrite_and_warn() {
        let doc = parse_document("x: 1\nx: 2", &DocumentUri::stdin());
        let Node::Map(m) = &doc.root else { panic!() };
        assert_eq!(m.entries.len(), 1);
        assert!(matches!(m.entries["x"].value, Node::Number { value, .. } if value == 2.0));
        assert_eq!(doc.warnings.len(), 1);
        assert!(doc.warnings[0].message.contains("duplicate map key"));
    }

    #[test]
    fn empty_document_is_an_empty_map() {
        let root = parse("");
        assert!(matches!(&root, Node::Map(m) if m.entries.is_empty()));
    }

    #[test]
    fn parse_error_positions_are_within_input() {
        for src in ["(", ")", "foo: (", "=>", "let", "- (", "a: 1\n  : 2"] {
            let root = parse(src);
            for err in collect_parse_errors(&root) {
                assert!(
                    (err.position.offset as usize) <= src.len(),
                    "error outside input for {src:?}: {err:?}"
                );
            }
        }
    }

    #[test]
    fn hex_numbers() {
        let root = parse("mask: 0xff");
        let Node::Map(m) = &root else { panic!() };
        assert!(matches!(m.entries["mask"].value, Node::Number { value, .. } if value == 255.0));
    }
}
