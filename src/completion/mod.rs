//! Array key completion: caret detection, engine invocation and LSP item
//! building.

mod builder;
mod context;

pub use builder::{KeyCandidate, build_items, collect_candidates};
pub use context::{ArrayKeyTarget, detect_array_key_target, patch_unclosed_access};

use std::sync::Arc;

use tower_lsp::lsp_types::{CompletionItem, CompletionTriggerKind, Position};

use crate::Backend;
use crate::parser;
use crate::resolve;
use crate::session::Session;
use crate::sql::StaticSchema;

impl Backend {
    /// Produce array key completion items at `position`, or `None` when
    /// the caret is not in an array key context.
    pub(crate) fn array_key_completion(
        &self,
        uri: &str,
        position: Position,
        trigger: Option<CompletionTriggerKind>,
    ) -> Option<Vec<CompletionItem>> {
        let content = self.document_text(uri)?;
        let target = detect_array_key_target(&content, position)?;
        let offset = Self::position_to_offset(&content, position)?;

        // Mid-keystroke the statement is usually unclosed; patch it shut
        // so the parser recovers the surrounding code. The patch only
        // touches the cursor line, so earlier offsets stay valid.
        let patched = patch_unclosed_access(&content, position);
        let program = if patched == content {
            self.program_for(uri)
                .unwrap_or_else(|| Arc::new(parser::parse_program(&content)))
        } else {
            Arc::new(parser::parse_program(&patched))
        };

        let settings = self.settings_snapshot();
        // Explicit invocation gets the interactive budgets; trigger
        // characters fire while the user is typing and run on the
        // background profile.
        let profile = if trigger == Some(CompletionTriggerKind::TRIGGER_CHARACTER) {
            settings.background
        } else {
            settings.interactive
        };
        let schema = StaticSchema::new(settings.schema.clone());
        let session = Session::new(&program, &schema, profile.to_limits());

        let mut union = resolve::resolve_variable_at(&session, &target.var_name, offset);
        for key in &target.prefix_keys {
            union = resolve::value_union_for_key(&union, key);
        }

        let candidates = collect_candidates(&union);
        tracing::debug!(
            var = %target.var_name,
            resolved = session.expressions_resolved(),
            keys = candidates.len(),
            "array key completion"
        );

        let line = content.lines().nth(position.line as usize).unwrap_or("");
        Some(build_items(&candidates, &target, line, position))
    }
}
