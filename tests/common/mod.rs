#![allow(dead_code)]

use deepkeys_lsp::Backend;
use deepkeys_lsp::completion::collect_candidates;
use deepkeys_lsp::parser::parse_program;
use deepkeys_lsp::resolve::resolve_variable_at;
use deepkeys_lsp::session::{Limits, Session};
use deepkeys_lsp::sql::StaticSchema;
use deepkeys_lsp::types::TypeUnion;
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

pub fn create_test_backend() -> Backend {
    Backend::new_test()
}

/// Open `text` under `uri` on the backend.
pub async fn open(backend: &Backend, uri: &Url, text: &str) {
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "php".to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
        .await;
}

/// Request completion at (line, character) with no trigger context
/// (explicit invocation, interactive profile).
pub async fn complete(
    backend: &Backend,
    uri: &Url,
    line: u32,
    character: u32,
) -> Vec<CompletionItem> {
    let result = backend
        .completion(CompletionParams {
            text_document_position: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri: uri.clone() },
                position: Position { line, character },
            },
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: None,
        })
        .await
        .expect("completion request failed");

    match result {
        Some(CompletionResponse::Array(items)) => items,
        Some(CompletionResponse::List(list)) => list.items,
        None => Vec::new(),
    }
}

pub fn labels(items: &[CompletionItem]) -> Vec<String> {
    items.iter().map(|i| i.label.clone()).collect()
}

/// Resolve `var` as read at the very end of `src`, using an interactive
/// session over a default (empty) schema.
pub fn resolve_var(src: &str, var: &str) -> TypeUnion {
    let program = parse_program(src);
    let schema = StaticSchema::default();
    let session = Session::new(&program, &schema, Limits::interactive());
    resolve_variable_at(&session, var, src.len() as u32)
}

/// Merged key names of `var`'s resolved union, in completion order.
pub fn key_names(src: &str, var: &str) -> Vec<String> {
    collect_candidates(&resolve_var(src, var))
        .into_iter()
        .map(|c| c.name)
        .collect()
}
