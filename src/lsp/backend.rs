use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::lsp::document::DocumentStore;
use crate::lsp::sink::LspSink;
use crate::scheduler::ValidationScheduler;
use crate::validation::Validator;
use crate::Config;

/// The main LSP backend that holds state and implements the Language Server Protocol
pub struct Backend {
    pub client: Client,
    pub config: Config,
    pub documents: DocumentStore,
    schedulers: Arc<Mutex<HashMap<Url, ValidationScheduler>>>,
}

impl Backend {
    pub fn new(client: Client, config: Config) -> Self {
        Self {
            client,
            config,
            documents: DocumentStore::new(),
            schedulers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start a validation worker for a newly opened document
    async fn start_validation(&self, uri: Url, text: String) {
        let sink = Arc::new(LspSink::new(self.client.clone(), self.documents.clone()));
        let validator = Validator::new(self.config.process_runner(), sink, uri.to_string());

        let mut scheduler = ValidationScheduler::new(validator, self.config.scheduler_settings());
        scheduler.set_text(text);
        scheduler.start();

        let previous = self.schedulers.lock().await.insert(uri, scheduler);
        if let Some(mut previous) = previous {
            previous.stop().await;
        }
    }

    async fn stage_text(&self, uri: &Url, text: String, force_revalidate: bool) {
        let schedulers = self.schedulers.lock().await;
        match schedulers.get(uri) {
            Some(scheduler) => scheduler.set_text_forced(text, force_revalidate),
            None => log::debug!("Ignoring text for untracked document {}", uri),
        }
    }

    async fn stop_all(&self) {
        let schedulers: Vec<_> = self.schedulers.lock().await.drain().collect();
        for (uri, mut scheduler) in schedulers {
            if !scheduler.stop().await {
                log::warn!("Validation of {} did not stop in time", uri);
            }
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(
        &self,
        _: InitializeParams,
    ) -> tower_lsp::jsonrpc::Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(true),
                        })),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "perl-syntax-ls".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "perl-syntax-ls initialized")
            .await;
    }

    async fn shutdown(&self) -> tower_lsp::jsonrpc::Result<()> {
        self.stop_all().await;
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let text = params.text_document.text;

        self.documents.insert(uri.clone(), text.clone()).await;
        self.start_validation(uri, text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(change) = params.content_changes.into_iter().last() {
            self.documents.insert(uri.clone(), change.text.clone()).await;
            self.stage_text(&uri, change.text, false).await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        let text = match params.text {
            Some(text) => {
                self.documents.insert(uri.clone(), text.clone()).await;
                Some(text)
            }
            None => self.documents.get(&uri).await,
        };

        // A save may change what the checker sees on disk (used modules)
        if let Some(text) = text {
            self.stage_text(&uri, text, true).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;

        let scheduler = self.schedulers.lock().await.remove(&uri);
        if let Some(mut scheduler) = scheduler {
            scheduler.stop().await;
        }
        self.documents.remove(&uri).await;

        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }
}
