//! deepkeys_lsp — a PHP language server whose single deep feature is
//! associative array key completion.
//!
//! When the user types `$config['`, the bounded recursive resolver infers
//! the structural shape of `$config` — the set of possible keys, each
//! key's value types, and provenance comments — and the completion layer
//! offers the keys. Inference is best-effort under hard resource
//! ceilings: an empty result is normal, an error never surfaces.
//!
//! Module map, engine first:
//!
//! - [`types`] — the union type algebra (variants, unions, key entries).
//! - [`tree`] — the owned program graph resolution runs over.
//! - [`parser`] — `mago-syntax` front-end lowering source into a program.
//! - [`session`] — per-request budgets, counters, call memo.
//! - [`context`] — recursion contexts and the ancestor cycle guard.
//! - [`resolve`] — the central recursive dispatcher.
//! - [`calls`] — call resolution, override expansion, SQL builtins.
//! - [`sql`] — `SELECT` parsing and the schema provider boundary.
//! - [`settings`] — resolution profiles and the schema table map.
//! - [`completion`] — caret detection and completion item building.
//! - [`server`] — the `tower-lsp` protocol surface.

pub mod calls;
pub mod completion;
pub mod context;
pub mod parser;
pub mod resolve;
pub mod server;
pub mod session;
pub mod settings;
pub mod sql;
pub mod tree;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tower_lsp::Client;
use tower_lsp::lsp_types::Position;

use crate::settings::Settings;
use crate::tree::Program;

/// Shared server state behind the LSP protocol surface.
pub struct Backend {
    name: String,
    version: String,
    client: Option<Client>,
    settings: Mutex<Settings>,
    /// Open document texts by URI (full sync).
    open_files: Mutex<HashMap<String, String>>,
    /// Lowered programs by URI, rebuilt on every change.
    programs: Mutex<HashMap<String, Arc<Program>>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self::build(Some(client), Settings::load())
    }

    /// Backend without a client, for tests.
    pub fn new_test() -> Self {
        Self::build(None, Settings::default())
    }

    /// Backend without a client but with specific settings, for tests.
    pub fn new_test_with_settings(settings: Settings) -> Self {
        Self::build(None, settings)
    }

    fn build(client: Option<Client>, settings: Settings) -> Self {
        Backend {
            name: "DeepKeysLSP".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            client,
            settings: Mutex::new(settings),
            open_files: Mutex::new(HashMap::new()),
            programs: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn server_name(&self) -> &str {
        &self.name
    }

    pub(crate) fn server_version(&self) -> &str {
        &self.version
    }

    pub(crate) fn client(&self) -> Option<&Client> {
        self.client.as_ref()
    }

    /// Store a document and (re)build its program.
    pub fn update_document(&self, uri: &str, text: String) {
        let program = Arc::new(parser::parse_program(&text));
        self.open_files.lock().insert(uri.to_string(), text);
        self.programs.lock().insert(uri.to_string(), program);
    }

    pub fn forget_document(&self, uri: &str) {
        self.open_files.lock().remove(uri);
        self.programs.lock().remove(uri);
    }

    pub fn document_text(&self, uri: &str) -> Option<String> {
        self.open_files.lock().get(uri).cloned()
    }

    pub fn program_for(&self, uri: &str) -> Option<Arc<Program>> {
        self.programs.lock().get(uri).cloned()
    }

    pub fn settings_snapshot(&self) -> Settings {
        self.settings.lock().clone()
    }

    pub fn replace_settings(&self, settings: Settings) {
        *self.settings.lock() = settings;
    }

    /// Convert an LSP position (line, character) to a byte offset.
    /// Characters are counted as `char`s, which is exact for the ASCII
    /// sources PHP code overwhelmingly is.
    pub fn position_to_offset(content: &str, position: Position) -> Option<u32> {
        let mut offset: u32 = 0;
        for (i, line) in content.lines().enumerate() {
            if i == position.line as usize {
                let byte_col = line
                    .char_indices()
                    .nth(position.character as usize)
                    .map(|(idx, _)| idx)
                    .unwrap_or(line.len());
                return Some(offset + byte_col as u32);
            }
            offset += line.len() as u32 + 1;
        }
        Some(content.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_to_offset_counts_lines() {
        let content = "<?php\n$a = 1;\n$b = 2;\n";
        let offset = Backend::position_to_offset(
            content,
            Position {
                line: 1,
                character: 2,
            },
        )
        .unwrap();
        assert_eq!(&content[offset as usize..offset as usize + 1], " ");
    }

    #[test]
    fn documents_round_trip() {
        let backend = Backend::new_test();
        backend.update_document("file:///t.php", "<?php $x = 1;".to_string());
        assert!(backend.document_text("file:///t.php").is_some());
        assert!(backend.program_for("file:///t.php").is_some());
        backend.forget_document("file:///t.php");
        assert!(backend.document_text("file:///t.php").is_none());
    }
}
