//! Language server for the Nostos DSL.
//!
//! The [`indexer`] owns the document-index contract: it ingests document
//! events on a bounded channel, debounces bursts of changes, keeps the
//! symbol table and diagnostics current, and re-evaluates the workspace
//! entry file. The [`server`] module is the thin `tower-lsp` shell around
//! it.

pub mod diagnostics;
pub mod indexer;
pub mod server;

pub use indexer::{DocumentDiagnostic, IndexEvent, Indexer};
pub use server::run_stdio;
