//! The uniform error value shared by the lexer, parser, evaluator and
//! planner.

use crate::ast::ParseErrorNode;
use crate::position::{DocumentUri, Position};

/// Category of a [`NostosError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Surface syntax violation; fatal to the current document.
    Lex,
    /// Structural violation collected from ParseError nodes.
    Parse,
    /// Runtime violation during evaluation.
    Eval,
    /// Type-assertion failure against the registry.
    Schema,
    /// Cycle detected during DAG construction.
    DependencyCycle,
    /// File or cluster I/O failure.
    Io,
}

/// An error with document identity, source position and an optional stack of
/// evaluation frames.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct NostosError {
    pub kind: ErrorKind,
    pub uri: DocumentUri,
    pub position: Position,
    pub message: String,
    pub stack: Vec<String>,
}

impl NostosError {
    pub fn new(
        kind: ErrorKind,
        uri: DocumentUri,
        position: Position,
        message: impl Into<String>,
    ) -> NostosError {
        NostosError {
            kind,
            uri,
            position,
            message: message.into(),
            stack: Vec::new(),
        }
    }

    pub fn lex(uri: DocumentUri, position: Position, message: impl Into<String>) -> NostosError {
        NostosError::new(ErrorKind::Lex, uri, position, message)
    }

    pub fn parse(uri: DocumentUri, position: Position, message: impl Into<String>) -> NostosError {
        NostosError::new(ErrorKind::Parse, uri, position, message)
    }

    pub fn eval(uri: DocumentUri, position: Position, message: impl Into<String>) -> NostosError {
        NostosError::new(ErrorKind::Eval, uri, position, message)
    }

    pub fn io(uri: DocumentUri, message: impl Into<String>) -> NostosError {
        NostosError::new(ErrorKind::Io, uri, Position::default(), message)
    }

    pub fn with_stack(mut self, stack: Vec<String>) -> NostosError {
        self.stack = stack;
        self
    }
}

impl From<&ParseErrorNode> for NostosError {
    fn from(node: &ParseErrorNode) -> NostosError {
        NostosError::parse(node.uri.clone(), node.position, node.message.clone())
    }
}
