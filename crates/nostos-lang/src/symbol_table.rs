//! Concurrency-safe symbol table backing language-server features.
//!
//! Entries are owned by the table and replaced wholesale per document: an
//! edit removes every entry belonging to the document and inserts fresh
//! ones inside one critical section, so readers always observe a consistent
//! table.

use crate::ast::{collect_symbols, Node};
use crate::position::{DocumentUri, Position};
use nostos_types::ObjectType;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// A named definition site.
#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub name: String,
    pub begin: Position,
    pub end: Position,
    pub defined_in: DocumentUri,
    /// Resolved object type, when known.
    pub ty: Option<Arc<ObjectType>>,
}

#[derive(Default)]
struct Tables {
    by_name: HashMap<String, Arc<SymbolEntry>>,
    by_pos: BTreeMap<(DocumentUri, Position), Arc<SymbolEntry>>,
    by_doc: HashMap<DocumentUri, Vec<Arc<SymbolEntry>>>,
}

/// Process-wide symbol index. Many readers, single writer.
#[derive(Default)]
pub struct SymbolTable {
    inner: RwLock<Tables>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Replace every entry belonging to `uri` with `entries`.
    pub fn replace_document(&self, uri: &DocumentUri, entries: Vec<SymbolEntry>) {
        let mut tables = self.inner.write().expect("symbol table lock poisoned");
        if let Some(old) = tables.by_doc.remove(uri) {
            for entry in old {
                // Only drop the by-name binding if it still points at this
                // document's entry; another document may have taken the name.
                if tables
                    .by_name
                    .get(&entry.name)
                    .is_some_and(|e| e.defined_in == *uri)
                {
                    tables.by_name.remove(&entry.name);
                }
                tables.by_pos.remove(&(uri.clone(), entry.begin));
            }
        }
        let mut doc_entries = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = Arc::new(entry);
            tables
                .by_name
                .insert(entry.name.clone(), Arc::clone(&entry));
            tables
                .by_pos
                .insert((uri.clone(), entry.begin), Arc::clone(&entry));
            doc_entries.push(entry);
        }
        tables.by_doc.insert(uri.clone(), doc_entries);
    }

    /// Index a parsed document: extract definition sites and swap them in.
    pub fn index_document(&self, uri: &DocumentUri, root: &Node) {
        let entries = collect_symbols(root)
            .into_iter()
            .map(|s| SymbolEntry {
                name: s.name,
                begin: s.begin,
                end: s.end,
                defined_in: uri.clone(),
                ty: None,
            })
            .collect();
        self.replace_document(uri, entries);
    }

    /// Remove a closed document's entries.
    pub fn remove_document(&self, uri: &DocumentUri) {
        self.replace_document(uri, Vec::new());
    }

    /// Definition site for a name, if any.
    pub fn definition(&self, name: &str) -> Option<Arc<SymbolEntry>> {
        let tables = self.inner.read().expect("symbol table lock poisoned");
        tables.by_name.get(name).cloned()
    }

    /// The symbol covering `position` in `uri`, if any.
    pub fn symbol_at(&self, uri: &DocumentUri, position: Position) -> Option<Arc<SymbolEntry>> {
        let tables = self.inner.read().expect("symbol table lock poisoned");
        tables
            .by_pos
            .range(..=(uri.clone(), position))
            .next_back()
            .map(|(_, entry)| entry)
            .filter(|e| e.defined_in == *uri && e.begin <= position && position <= e.end)
            .cloned()
    }

    /// All entries for one document, in position order.
    pub fn document_symbols(&self, uri: &DocumentUri) -> Vec<Arc<SymbolEntry>> {
        let tables = self.inner.read().expect("symbol table lock poisoned");
        let mut entries = tables.by_doc.get(uri).cloned().unwrap_or_default();
        entries.sort_by_key(|e| e.begin);
        entries
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("symbol table lock poisoned")
            .by_pos
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
