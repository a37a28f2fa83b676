//! The `tower-lsp` shell around the indexer.

use crate::diagnostics::{to_lsp_diagnostic, to_lsp_position};
use crate::indexer::Indexer;
use nostos_lang::DocumentUri;
use nostos_types::{default_registry, kubespec_enabled, kubespec_registry, Registry};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{info, warn};

struct Backend {
    client: Client,
    indexer: Indexer,
    root: Mutex<Option<std::path::PathBuf>>,
}

impl Backend {
    fn document_uri(url: &Url) -> DocumentUri {
        DocumentUri::parse(url.as_str())
    }

    fn to_url(uri: &DocumentUri) -> Option<Url> {
        Url::parse(uri.as_str()).ok()
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    #[allow(deprecated)]
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(root_uri) = params.root_uri {
            if let Ok(path) = root_uri.to_file_path() {
                *self.root.lock().expect("root lock poisoned") = Some(path);
            }
        }
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                document_symbol_provider: Some(OneOf::Left(true)),
                definition_provider: Some(OneOf::Left(true)),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: "nostos".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("language server initialised");
        if let Some(root) = self.root.lock().expect("root lock poisoned").clone() {
            self.indexer.scan(root);
        }
        if self.indexer.is_degraded() {
            self.client
                .log_message(MessageType::WARNING, "type registry degraded")
                .await;
        }
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.indexer.did_open(
            Self::document_uri(&params.text_document.uri),
            params.text_document.text,
        );
    }

    async fn did_change(&self, mut params: DidChangeTextDocumentParams) {
        // Full sync: the last content change carries the whole text.
        let Some(change) = params.content_changes.pop() else {
            return;
        };
        self.indexer
            .did_change(Self::document_uri(&params.text_document.uri), change.text);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.indexer
            .did_close(Self::document_uri(&params.text_document.uri));
    }

    #[allow(deprecated)]
    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = Self::document_uri(&params.text_document.uri);
        let symbols = self
            .indexer
            .document_symbols(&uri)
            .into_iter()
            .map(|entry| SymbolInformation {
                name: entry.name.clone(),
                kind: SymbolKind::KEY,
                tags: None,
                deprecated: None,
                location: Location {
                    uri: params.text_document.uri.clone(),
                    range: Range {
                        start: to_lsp_position(entry.begin),
                        end: to_lsp_position(entry.end),
                    },
                },
                container_name: None,
            })
            .collect::<Vec<_>>();
        Ok(Some(DocumentSymbolResponse::Flat(symbols)))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params.position;
        let uri = Self::document_uri(&params.text_document_position_params.text_document.uri);
        let Some(entry) = self
            .indexer
            .symbol_name_at(&uri, position.line, position.character)
            .and_then(|name| {
                // Dotted references resolve to their head binding.
                self.indexer.definition(&name).or_else(|| {
                    name.split('.')
                        .next()
                        .and_then(|head| self.indexer.definition(head))
                })
            })
        else {
            return Ok(None);
        };
        let Some(url) = Self::to_url(&entry.defined_in) else {
            return Ok(None);
        };
        Ok(Some(GotoDefinitionResponse::Scalar(Location {
            uri: url,
            range: Range {
                start: to_lsp_position(entry.begin),
                end: to_lsp_position(entry.end),
            },
        })))
    }
}

/// Load the type registry in the background and announce it on a watch
/// channel.
fn spawn_registry_loader() -> watch::Receiver<Option<Arc<Registry>>> {
    let (tx, rx) = watch::channel(None);
    tokio::task::spawn_blocking(move || {
        let registry = if kubespec_enabled() {
            match kubespec_registry() {
                Ok(registry) => registry,
                Err(e) => {
                    warn!(error = %e, "kubespec load failed, falling back to defaults");
                    default_registry()
                }
            }
        } else {
            default_registry()
        };
        let _ = tx.send(Some(Arc::new(registry)));
        // Keep the sender alive; dropping it would flag the indexer as
        // degraded.
        std::mem::forget(tx);
    });
    rx
}

/// Speak LSP over stdin/stdout until the client disconnects.
pub async fn run_stdio() -> anyhow::Result<()> {
    let registry_rx = spawn_registry_loader();
    let (published_tx, mut published_rx) = mpsc::channel(64);
    let indexer = Indexer::spawn(registry_rx, published_tx);

    let (service, socket) = LspService::new(move |client| {
        let diag_client = client.clone();
        tokio::spawn(async move {
            while let Some((uri, diags)) = published_rx.recv().await {
                let Some(url) = Backend::to_url(&uri) else {
                    continue;
                };
                let lsp_diags = diags.iter().map(to_lsp_diagnostic).collect();
                diag_client
                    .publish_diagnostics(url, lsp_diags, None)
                    .await;
            }
        });
        Backend {
            client,
            indexer: indexer.clone(),
            root: Mutex::new(None),
        }
    });

    Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
        .serve(service)
        .await;
    Ok(())
}
