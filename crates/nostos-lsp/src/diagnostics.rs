//! Conversion of Nostos errors into LSP diagnostics.

use crate::indexer::DocumentDiagnostic;
use nostos_lang::Position;
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position as LspPosition, Range};

pub fn to_lsp_position(position: Position) -> LspPosition {
    LspPosition {
        line: position.line,
        character: position.character,
    }
}

/// Range covering the offending token. Token lengths are bytes; the end
/// character is an approximation good enough for underlining ASCII-heavy
/// configuration sources.
fn to_lsp_range(position: Position) -> Range {
    Range {
        start: to_lsp_position(position),
        end: LspPosition {
            line: position.line,
            character: position.character + position.length.max(1),
        },
    }
}

pub fn to_lsp_diagnostic(diag: &DocumentDiagnostic) -> Diagnostic {
    Diagnostic {
        range: to_lsp_range(diag.error.position),
        severity: Some(if diag.warning {
            DiagnosticSeverity::WARNING
        } else {
            DiagnosticSeverity::ERROR
        }),
        source: Some("nostos".to_string()),
        message: diag.error.message.clone(),
        ..Diagnostic::default()
    }
}
