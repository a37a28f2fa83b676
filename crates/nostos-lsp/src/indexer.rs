//! Background document indexer.
//!
//! One worker drains a bounded event channel. Successive changes to the
//! same document are debounced: when the worker wakes it greedily consumes
//! everything pending without blocking, keeps only the latest text per
//! document, then indexes each distinct document once.

use dashmap::DashMap;
use indexmap::IndexMap;
use nostos_lang::{
    collect_parse_errors, parse_document, DocumentUri, ErrorKind, NostosError, Position,
    SymbolTable,
};
use nostos_types::{assert_value, default_registry, Registry, Type, Value};
use nostos_vm::eval_with_dir;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A document event for the indexer.
#[derive(Debug, Clone)]
pub enum IndexEvent {
    DidOpen { uri: DocumentUri, text: String },
    DidChange { uri: DocumentUri, text: String },
    DidClose { uri: DocumentUri },
    WorkspaceScan { root: PathBuf },
}

/// A published diagnostic: an error value plus its severity.
#[derive(Debug, Clone)]
pub struct DocumentDiagnostic {
    pub error: NostosError,
    pub warning: bool,
}

struct IndexerState {
    documents: DashMap<DocumentUri, String>,
    diagnostics: DashMap<DocumentUri, Vec<DocumentDiagnostic>>,
    symbols: SymbolTable,
    /// Latest successful evaluation of the workspace entry file.
    workspace_value: Mutex<Option<Value>>,
    registry: Mutex<Option<Arc<Registry>>>,
    degraded: AtomicBool,
}

/// Handle to the background indexer.
#[derive(Clone)]
pub struct Indexer {
    state: Arc<IndexerState>,
    events: mpsc::Sender<IndexEvent>,
}

impl Indexer {
    /// Spawn the worker.
    ///
    /// `registry_rx` delivers the type registry once loaded; until then
    /// indexing blocks, and if the loader fails the indexer degrades to
    /// the built-in default registry. Published diagnostics are forwarded
    /// to `published` per document, parse errors before evaluation errors.
    pub fn spawn(
        registry_rx: watch::Receiver<Option<Arc<Registry>>>,
        published: mpsc::Sender<(DocumentUri, Vec<DocumentDiagnostic>)>,
    ) -> Indexer {
        let (tx, rx) = mpsc::channel(64);
        let state = Arc::new(IndexerState {
            documents: DashMap::new(),
            diagnostics: DashMap::new(),
            symbols: SymbolTable::new(),
            workspace_value: Mutex::new(None),
            registry: Mutex::new(None),
            degraded: AtomicBool::new(false),
        });
        let worker_state = Arc::clone(&state);
        tokio::spawn(worker(worker_state, registry_rx, rx, published));
        Indexer { state, events: tx }
    }

    /// Enqueue an event; drops with a warning when the channel is full.
    pub fn send(&self, event: IndexEvent) {
        if let Err(e) = self.events.try_send(event) {
            warn!(error = %e, "indexer queue full, dropping event");
        }
    }

    pub fn did_open(&self, uri: DocumentUri, text: String) {
        self.send(IndexEvent::DidOpen { uri, text });
    }

    pub fn did_change(&self, uri: DocumentUri, text: String) {
        self.send(IndexEvent::DidChange { uri, text });
    }

    pub fn did_close(&self, uri: DocumentUri) {
        self.send(IndexEvent::DidClose { uri });
    }

    pub fn scan(&self, root: PathBuf) {
        self.send(IndexEvent::WorkspaceScan { root });
    }

    /// Latest published diagnostics for one document.
    pub fn diagnostics(&self, uri: &DocumentUri) -> Vec<DocumentDiagnostic> {
        self.state
            .diagnostics
            .get(uri)
            .map(|d| d.value().clone())
            .unwrap_or_default()
    }

    /// Per-document symbols, in position order.
    pub fn document_symbols(
        &self,
        uri: &DocumentUri,
    ) -> Vec<Arc<nostos_lang::SymbolEntry>> {
        self.state.symbols.document_symbols(uri)
    }

    /// Resolve a name to its definition site.
    pub fn definition(&self, name: &str) -> Option<Arc<nostos_lang::SymbolEntry>> {
        self.state.symbols.definition(name)
    }

    /// The identifier under a cursor position, read from the document
    /// snapshot.
    pub fn symbol_name_at(
        &self,
        uri: &DocumentUri,
        line: u32,
        character: u32,
    ) -> Option<String> {
        let text = self.state.documents.get(uri)?.value().clone();
        let line_text = text.lines().nth(line as usize)?;
        let chars: Vec<char> = line_text.chars().collect();
        let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '/' || c == '.';
        let mut start = (character as usize).min(chars.len());
        if start == chars.len() || !is_ident(chars[start]) {
            start = start.checked_sub(1)?;
        }
        if !is_ident(*chars.get(start)?) {
            return None;
        }
        while start > 0 && is_ident(chars[start - 1]) {
            start -= 1;
        }
        let mut end = start;
        while end < chars.len() && is_ident(chars[end]) {
            end += 1;
        }
        Some(chars[start..end].iter().collect())
    }

    /// Latest workspace value from `odyssey.no`, if evaluated.
    pub fn workspace_value(&self) -> Option<Value> {
        self.state
            .workspace_value
            .lock()
            .expect("workspace value lock poisoned")
            .clone()
    }

    /// Whether registry loading failed and the default registry is in use.
    pub fn is_degraded(&self) -> bool {
        self.state.degraded.load(Ordering::Relaxed)
    }
}

async fn worker(
    state: Arc<IndexerState>,
    mut registry_rx: watch::Receiver<Option<Arc<Registry>>>,
    mut events: mpsc::Receiver<IndexEvent>,
    published: mpsc::Sender<(DocumentUri, Vec<DocumentDiagnostic>)>,
) {
    while let Some(first) = events.recv().await {
        ensure_registry(&state, &mut registry_rx).await;

        // Debounce: drain whatever is pending, keep the latest per doc.
        let mut pending: IndexMap<DocumentUri, Staged> = IndexMap::new();
        let mut scans: Vec<PathBuf> = Vec::new();
        stage_event(first, &mut pending, &mut scans);
        while let Ok(event) = events.try_recv() {
            stage_event(event, &mut pending, &mut scans);
        }

        for root in scans {
            for uri in scan_workspace(&state, &root) {
                pending.entry(uri).or_insert(Staged::Reindex);
            }
        }

        for (uri, staged) in pending {
            match staged {
                Staged::Update(text) => {
                    state.documents.insert(uri.clone(), text);
                }
                Staged::Reindex => {
                    if !state.documents.contains_key(&uri) {
                        continue;
                    }
                }
                Staged::Close => {
                    state.documents.remove(&uri);
                    state.symbols.remove_document(&uri);
                    state.diagnostics.remove(&uri);
                    let _ = published.send((uri, Vec::new())).await;
                    continue;
                }
            }
            let diags = index_document(&state, &uri);
            state.diagnostics.insert(uri.clone(), diags.clone());
            if published.send((uri, diags)).await.is_err() {
                return;
            }
        }
    }
}

enum Staged {
    Update(String),
    Reindex,
    Close,
}

fn stage_event(
    event: IndexEvent,
    pending: &mut IndexMap<DocumentUri, Staged>,
    scans: &mut Vec<PathBuf>,
) {
    match event {
        IndexEvent::DidOpen { uri, text } | IndexEvent::DidChange { uri, text } => {
            pending.insert(uri, Staged::Update(text));
        }
        IndexEvent::DidClose { uri } => {
            pending.insert(uri, Staged::Close);
        }
        IndexEvent::WorkspaceScan { root } => scans.push(root),
    }
}

/// Wait for the registry to load; degrade to the built-in default when the
/// loader fails or goes away.
async fn ensure_registry(
    state: &Arc<IndexerState>,
    registry_rx: &mut watch::Receiver<Option<Arc<Registry>>>,
) {
    {
        let registry = state.registry.lock().expect("registry lock poisoned");
        if registry.is_some() {
            return;
        }
    }
    loop {
        let loaded = registry_rx.borrow().as_ref().cloned();
        if let Some(registry) = loaded {
            *state.registry.lock().expect("registry lock poisoned") = Some(registry);
            return;
        }
        if registry_rx.changed().await.is_err() {
            warn!("registry loader went away, using the built-in default");
            state.degraded.store(true, Ordering::Relaxed);
            *state.registry.lock().expect("registry lock poisoned") =
                Some(Arc::new(default_registry()));
            return;
        }
    }
}

/// Seed the document store from the workspace root, returning the URIs to
/// (re)index.
fn scan_workspace(state: &Arc<IndexerState>, root: &Path) -> Vec<DocumentUri> {
    let mut uris = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("no") {
            continue;
        }
        let Ok(text) = std::fs::read_to_string(entry.path()) else {
            continue;
        };
        let uri = DocumentUri::file(entry.path());
        state.documents.insert(uri.clone(), text);
        uris.push(uri);
    }
    debug!(root = %root.display(), count = uris.len(), "workspace scan");
    uris
}

/// Parse, reindex symbols and evaluate one document snapshot.
fn index_document(state: &Arc<IndexerState>, uri: &DocumentUri) -> Vec<DocumentDiagnostic> {
    let Some(text) = state.documents.get(uri).map(|t| t.value().clone()) else {
        return Vec::new();
    };
    let doc = parse_document(&text, uri);
    state.symbols.index_document(uri, &doc.root);

    let mut diags: Vec<DocumentDiagnostic> = collect_parse_errors(&doc.root)
        .into_iter()
        .map(|e| DocumentDiagnostic {
            error: NostosError::from(e),
            warning: false,
        })
        .collect();
    diags.extend(doc.warnings.iter().map(|w| DocumentDiagnostic {
        error: w.clone(),
        warning: true,
    }));

    // Evaluate for diagnostics; odyssey.no also refreshes the workspace
    // value the planner consumes.
    let is_entry = uri
        .to_file_path()
        .map(|p| p.file_name().and_then(|n| n.to_str()) == Some("odyssey.no"))
        .unwrap_or(false);
    if diags.iter().all(|d| d.warning) {
        let base = uri
            .to_file_path()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        match eval_with_dir(&doc.root, &base, uri) {
            Ok(value) => {
                diags.extend(schema_diagnostics(state, uri, &value));
                if is_entry {
                    *state
                        .workspace_value
                        .lock()
                        .expect("workspace value lock poisoned") = Some(value);
                }
            }
            Err(e) => diags.push(DocumentDiagnostic {
                error: e,
                warning: false,
            }),
        }
    }
    diags
}

/// Assert a resource-shaped document value against its registry type.
fn schema_diagnostics(
    state: &Arc<IndexerState>,
    uri: &DocumentUri,
    value: &Value,
) -> Vec<DocumentDiagnostic> {
    let registry = state.registry.lock().expect("registry lock poisoned");
    let Some(registry) = registry.as_ref() else {
        return Vec::new();
    };
    let (Some(api_version), Some(kind)) = (
        value.get("apiVersion").and_then(Value::as_str),
        value.get("kind").and_then(Value::as_str),
    ) else {
        return Vec::new();
    };
    let (group, version) = match api_version.split_once('/') {
        Some((g, v)) => (g, v),
        None => ("", api_version),
    };
    let Some(ty) = registry.get_type(group, version, kind) else {
        return Vec::new();
    };
    match assert_value(value, &Type::Object((*ty).clone())) {
        Ok(()) => Vec::new(),
        Err(e) => vec![DocumentDiagnostic {
            error: NostosError::new(
                ErrorKind::Schema,
                uri.clone(),
                Position::default(),
                e.to_string(),
            ),
            warning: false,
        }],
    }
}
