//! LSP backend: wires tower-lsp lifecycle and document sync onto the
//! tsindex indexing pipeline and request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::notification::Notification;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use tsindex::cancellation::CancellationToken;
use tsindex::config::IndexerConfig;
use tsindex::handlers::{self, DefinitionHandler};
use tsindex::{dead_code, Indexer};

use crate::convert::{path_to_uri, position_from_lsp, range_to_lsp, uri_to_path};

/// Custom notification this server emits while a workspace scan is running
/// (spec §6, "progress notifications").
struct IndexerProgressNotification;

#[derive(Serialize)]
struct IndexerProgressParams {
    completed: usize,
    total: usize,
    message: Option<String>,
}

impl Notification for IndexerProgressNotification {
    type Params = IndexerProgressParams;
    const METHOD: &'static str = "tsindex/indexingProgress";
}

pub struct Backend {
    client: Client,
    indexer: RwLock<Option<Arc<Indexer>>>,
    definition_handler: AsyncMutex<DefinitionHandler>,
    open_documents: DashMap<Url, String>,
    workspace_root: RwLock<Option<PathBuf>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            indexer: RwLock::new(None),
            definition_handler: AsyncMutex::new(DefinitionHandler::new()),
            open_documents: DashMap::new(),
            workspace_root: RwLock::new(None),
        }
    }

    async fn indexer(&self) -> Option<Arc<Indexer>> {
        self.indexer.read().await.clone()
    }

    async fn run_initial_index(&self, root: PathBuf, init_options: Option<serde_json::Value>) {
        let config = init_options.map(IndexerConfig::from_json).unwrap_or_default();
        let indexer = Arc::new(Indexer::new(root, config));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<(usize, usize)>();
        let on_progress: tsindex::worker_pool::ProgressFn = Box::new(move |done, total, _msg| {
            let _ = tx.send((done, total));
        });

        let client = self.client.clone();
        let reporter = tokio::spawn(async move {
            while let Some((completed, total)) = rx.recv().await {
                client
                    .send_notification::<IndexerProgressNotification>(IndexerProgressParams {
                        completed,
                        total,
                        message: None,
                    })
                    .await;
            }
        });

        indexer.index_workspace(CancellationToken::new(), Some(on_progress)).await;
        let _ = reporter.await;

        *self.indexer.write().await = Some(indexer);
        self.client.log_message(MessageType::INFO, "tsindex: workspace indexed").await;
    }

    async fn publish_dead_code_diagnostics(&self, uri: Url) {
        let Some(indexer) = self.indexer().await else { return };
        let path = uri_to_path(&uri);
        let token = CancellationToken::new();
        if let tsindex::cancellation::Outcome::Done(candidates) = dead_code::analyze_file(&indexer, &path, &token) {
            let diagnostics: Vec<Diagnostic> = candidates
                .into_iter()
                .map(|c| Diagnostic {
                    range: Range::new(Position::new(c.line, 0), Position::new(c.line, 0)),
                    severity: Some(DiagnosticSeverity::HINT),
                    code: Some(NumberOrString::String("dead-export".to_string())),
                    source: Some("tsindex".to_string()),
                    message: format!("'{}' is exported but never imported elsewhere", c.name),
                    tags: Some(vec![DiagnosticTag::UNNECESSARY]),
                    ..Default::default()
                })
                .collect();
            self.client.publish_diagnostics(uri, diagnostics, None).await;
        }
    }

    async fn on_document_changed(&self, uri: &Url, content: &str) {
        if let Some(indexer) = self.indexer().await {
            let token = CancellationToken::new();
            let record = tsindex::extractor::analyze_file(&uri_to_path(uri), content, &token);
            indexer.merged.overlay.set(record);
        }
        self.definition_handler.lock().await.invalidate_file(&uri_to_path(uri));
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(root) = params.root_uri {
            if let Ok(path) = root.to_file_path() {
                *self.workspace_root.write().await = Some(path);
            }
        }

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "tsindex-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::FULL),
                    save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                        include_text: Some(true),
                    })),
                    ..Default::default()
                })),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                rename_provider: Some(OneOf::Right(RenameOptions {
                    prepare_provider: Some(true),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                })),
                workspace_symbol_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("tsindex-lsp server initialized");
        let root = self.workspace_root.read().await.clone();
        if let Some(root) = root {
            self.run_initial_index(root, None).await;
        }
        self.client.log_message(MessageType::INFO, "tsindex-lsp ready").await;
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("tsindex-lsp server shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let content = params.text_document.text;
        self.open_documents.insert(uri.clone(), content.clone());
        self.on_document_changed(&uri, &content).await;
        self.publish_dead_code_diagnostics(uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(change) = params.content_changes.into_iter().next() {
            self.open_documents.insert(uri.clone(), change.text.clone());
            self.on_document_changed(&uri, &change.text).await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(indexer) = self.indexer().await {
            let path = uri_to_path(&uri);
            indexer.merged.overlay.clear(&path);
            if let Ok(content) = tokio::fs::read_to_string(&path).await {
                let token = CancellationToken::new();
                let record = tsindex::extractor::analyze_file(&path, &content, &token);
                indexer.shards.put(record.clone());
                indexer.merged.shards.lock().expect("shard index lock poisoned").apply_record(&path, Some(record));
            }
        }
        self.publish_dead_code_diagnostics(uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.open_documents.remove(&uri);
        if let Some(indexer) = self.indexer().await {
            indexer.merged.overlay.clear(&uri_to_path(&uri));
        }
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn goto_definition(&self, params: GotoDefinitionParams) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(indexer) = self.indexer().await else { return Ok(None) };
        let Some(content) = self.open_documents.get(&uri).map(|d| d.clone()) else { return Ok(None) };
        let path = uri_to_path(&uri);

        let mut handler = self.definition_handler.lock().await;
        let symbols = handler.goto_definition(&indexer, &path, position_from_lsp(position), &content);
        drop(handler);

        if symbols.is_empty() {
            return Ok(None);
        }
        let locations: Vec<Location> = symbols
            .into_iter()
            .filter_map(|s| Some(Location::new(path_to_uri(&s.file_path)?, range_to_lsp(s.range))))
            .collect();
        match locations.len() {
            0 => Ok(None),
            1 => Ok(Some(GotoDefinitionResponse::Scalar(locations.into_iter().next().unwrap()))),
            _ => Ok(Some(GotoDefinitionResponse::Array(locations))),
        }
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let include_declaration = params.context.include_declaration;
        let Some(indexer) = self.indexer().await else { return Ok(None) };
        let Some(content) = self.open_documents.get(&uri).map(|d| d.clone()) else { return Ok(None) };
        let path = uri_to_path(&uri);

        let found = handlers::find_references(&indexer, &path, position_from_lsp(position), &content, include_declaration);
        if found.is_empty() {
            return Ok(None);
        }
        let locations: Vec<Location> = found
            .into_iter()
            .filter_map(|r| Some(Location::new(path_to_uri(&r.location.file)?, range_to_lsp(r.range))))
            .collect();
        Ok(Some(locations))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(indexer) = self.indexer().await else { return Ok(None) };
        let Some(content) = self.open_documents.get(&uri).map(|d| d.clone()) else { return Ok(None) };
        let path = uri_to_path(&uri);

        let Some(text) = handlers::hover(&indexer, &path, position_from_lsp(position), &content) else {
            return Ok(None);
        };
        Ok(Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: text,
            }),
            range: None,
        }))
    }

    async fn prepare_rename(&self, params: TextDocumentPositionParams) -> Result<Option<PrepareRenameResponse>> {
        let uri = params.text_document.uri;
        let position = params.position;
        let Some(indexer) = self.indexer().await else { return Ok(None) };
        let Some(content) = self.open_documents.get(&uri).map(|d| d.clone()) else { return Ok(None) };
        let path = uri_to_path(&uri);

        let Some(result) = handlers::prepare_rename(&indexer, &path, position_from_lsp(position), &content) else {
            return Ok(None);
        };
        Ok(Some(PrepareRenameResponse::RangeWithPlaceholder {
            range: range_to_lsp(result.range),
            placeholder: result.placeholder,
        }))
    }

    async fn rename(&self, params: RenameParams) -> Result<Option<WorkspaceEdit>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let new_name = params.new_name;
        let Some(indexer) = self.indexer().await else { return Ok(None) };
        let Some(content) = self.open_documents.get(&uri).map(|d| d.clone()) else { return Ok(None) };
        let path = uri_to_path(&uri);

        let edits_by_file = handlers::apply_rename(&indexer, &path, position_from_lsp(position), &content, &new_name);
        if edits_by_file.is_empty() {
            return Ok(None);
        }

        let mut changes = std::collections::HashMap::new();
        for (file, edits) in edits_by_file {
            let Some(file_uri) = path_to_uri(&file) else { continue };
            let text_edits = edits
                .into_iter()
                .map(|e| TextEdit {
                    range: range_to_lsp(e.range),
                    new_text: e.new_text,
                })
                .collect();
            changes.insert(file_uri, text_edits);
        }
        Ok(Some(WorkspaceEdit {
            changes: Some(changes),
            ..Default::default()
        }))
    }

    async fn symbol(&self, params: WorkspaceSymbolParams) -> Result<Option<Vec<SymbolInformation>>> {
        let Some(indexer) = self.indexer().await else { return Ok(None) };
        let ctx = indexer.ranking_context(None);
        let scored = handlers::workspace_symbol(&indexer, &params.query, &ctx);
        if scored.is_empty() {
            return Ok(None);
        }
        let results: Vec<SymbolInformation> = scored
            .into_iter()
            .filter_map(|s| {
                let uri = path_to_uri(&s.symbol.file_path)?;
                #[allow(deprecated)]
                Some(SymbolInformation {
                    name: s.symbol.name.clone(),
                    kind: symbol_kind_to_lsp(s.symbol.kind),
                    tags: None,
                    deprecated: None,
                    location: Location::new(uri, range_to_lsp(s.symbol.range)),
                    container_name: s.symbol.container_name.clone(),
                })
            })
            .collect();
        Ok(Some(results))
    }
}

fn symbol_kind_to_lsp(kind: tsindex::SymbolKind) -> SymbolKind {
    use tsindex::SymbolKind as K;
    match kind {
        K::Class => SymbolKind::CLASS,
        K::Interface => SymbolKind::INTERFACE,
        K::Function => SymbolKind::FUNCTION,
        K::Method => SymbolKind::METHOD,
        K::Property => SymbolKind::PROPERTY,
        K::Variable => SymbolKind::VARIABLE,
        K::Constant => SymbolKind::CONSTANT,
        K::Type => SymbolKind::TYPE_PARAMETER,
        K::Enum => SymbolKind::ENUM,
        K::EnumMember => SymbolKind::ENUM_MEMBER,
        K::Namespace => SymbolKind::NAMESPACE,
        K::Module => SymbolKind::MODULE,
        K::Parameter => SymbolKind::VARIABLE,
        K::Text => SymbolKind::STRING,
    }
}
