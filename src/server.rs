//! LSP protocol surface.
//!
//! This module contains the `impl LanguageServer for Backend` block:
//! initialize (capabilities + settings overlay from
//! `initializationOptions`), full-sync document tracking, and the
//! completion request that drives the resolution engine.

use tower_lsp::LanguageServer;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

use crate::Backend;

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(options) = params.initialization_options {
            let mut settings = self.settings_snapshot();
            settings.apply_initialization_options(&options);
            self.replace_settings(settings);
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec![
                        "[".to_string(),
                        "'".to_string(),
                        "\"".to_string(),
                    ]),
                    all_commit_characters: None,
                    work_done_progress_options: WorkDoneProgressOptions {
                        work_done_progress: None,
                    },
                    ..Default::default()
                }),
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: self.server_name().to_string(),
                version: Some(self.server_version().to_string()),
            }),
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        if let Some(client) = self.client() {
            client
                .log_message(MessageType::INFO, "DeepKeysLSP initialized")
                .await;
        }
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        self.update_document(doc.uri.as_ref(), doc.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        // Full sync: the last change carries the complete text.
        if let Some(change) = params.content_changes.into_iter().next_back() {
            self.update_document(&uri, change.text);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.forget_document(params.text_document.uri.as_ref());
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri.to_string();
        let position = params.text_document_position.position;
        let trigger = params.context.map(|c| c.trigger_kind);

        match self.array_key_completion(&uri, position, trigger) {
            Some(items) if !items.is_empty() => Ok(Some(CompletionResponse::Array(items))),
            // No suggestions is a degrade, never a protocol error.
            _ => Ok(None),
        }
    }
}
