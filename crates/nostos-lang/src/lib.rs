//! Front end for the Nostos DSL.
//!
//! Source text flows through the [`lexer`] into the [`parser`], producing a
//! single [`ast::Node`] per document with parse failures embedded as
//! first-class nodes. The [`symbol_table`] indexes parsed documents for
//! language-server features, and [`error`]/[`report`] define the uniform
//! error value and its terminal rendering.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod position;
pub mod report;
pub mod symbol_table;

pub use ast::{collect_parse_errors, collect_symbols, MapEntry, MapNode, Node, ParseErrorNode};
pub use error::{ErrorKind, NostosError};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{parse_document, ParsedDocument, Parser, Precedence};
pub use position::{DocumentUri, Position};
pub use report::{Formatter, PrettyFormatter, Reporter, SimpleFormatter};
pub use symbol_table::{SymbolEntry, SymbolTable};

/// Collect every ParseError in a parsed document as [`NostosError`]s.
pub fn parse_errors(doc: &ParsedDocument) -> Vec<NostosError> {
    collect_parse_errors(&doc.root)
        .into_iter()
        .map(NostosError::from)
        .collect()
}
