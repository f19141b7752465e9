//! Turning a resolved type union into LSP completion items.
//!
//! Key entries from all map variants are merged per key name in
//! first-seen order: value unions are unioned for the preview text and
//! comments concatenated for the documentation. Entries whose key has no
//! statically-known text fall back to the small numeric index set.

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionTextEdit, Documentation, Position, Range,
    TextEdit,
};

use crate::types::{DYNAMIC_KEY_FALLBACK, TypeUnion};

use super::context::ArrayKeyTarget;

/// One merged completion candidate.
#[derive(Debug)]
pub struct KeyCandidate {
    pub name: String,
    pub value: TypeUnion,
    pub comments: Vec<String>,
    /// Came from the numeric fallback, not a real key name.
    pub numeric: bool,
}

/// Merge the union's key entries into ordered candidates.
pub fn collect_candidates(union: &TypeUnion) -> Vec<KeyCandidate> {
    let mut candidates: Vec<KeyCandidate> = Vec::new();

    for entry in union.map_keys() {
        let names: Vec<(String, bool)> = {
            let known: Vec<String> = entry.key.scalar_strings().map(str::to_string).collect();
            if known.is_empty() {
                // Dynamic key: suggest the first few numeric indexes.
                (0..DYNAMIC_KEY_FALLBACK)
                    .map(|n| (n.to_string(), true))
                    .collect()
            } else {
                known.into_iter().map(|name| (name, false)).collect()
            }
        };

        for (name, numeric) in names {
            if let Some(existing) = candidates.iter_mut().find(|c| c.name == name) {
                existing.value.extend(entry.value.clone());
                for comment in &entry.comments {
                    if !existing.comments.contains(comment) {
                        existing.comments.push(comment.clone());
                    }
                }
            } else {
                candidates.push(KeyCandidate {
                    name,
                    value: entry.value.clone(),
                    comments: entry.comments.clone(),
                    numeric,
                });
            }
        }
    }

    candidates
}

/// Render candidates as completion items for the detected caret context.
///
/// The text edit range covers the typed partial key plus any trailing
/// auto-inserted characters (closing quote and bracket), so accepting a
/// completion never produces duplicated brackets.
pub fn build_items(
    candidates: &[KeyCandidate],
    target: &ArrayKeyTarget,
    line: &str,
    position: Position,
) -> Vec<CompletionItem> {
    let quote = target.quote.unwrap_or('\'');
    let trailing = trailing_close_chars(line, position.character as usize, target.quote);
    let range = Range {
        start: Position {
            line: position.line,
            character: target.key_start_col,
        },
        end: Position {
            line: position.line,
            character: position.character + trailing as u32,
        },
    };

    let mut items = Vec::new();
    for (sort_idx, candidate) in candidates.iter().enumerate() {
        if !candidate.partial_matches(&target.partial_key) {
            continue;
        }

        let brief = candidate.value.brief_value();
        let detail = if brief.is_empty() {
            candidate.name.clone()
        } else {
            format!("{} = {}", candidate.name, brief)
        };
        let documentation = if candidate.comments.is_empty() {
            None
        } else {
            Some(Documentation::String(candidate.comments.join("\n")))
        };

        let new_text = if target.quote.is_some() {
            format!("{}{}]", candidate.name, quote)
        } else if candidate.numeric {
            format!("{}]", candidate.name)
        } else {
            format!("{}{}{}]", quote, candidate.name, quote)
        };

        items.push(CompletionItem {
            label: candidate.name.clone(),
            kind: Some(CompletionItemKind::FIELD),
            detail: Some(detail),
            documentation,
            filter_text: Some(candidate.name.clone()),
            text_edit: Some(CompletionTextEdit::Edit(TextEdit { range, new_text })),
            sort_text: Some(format!("{:04}", sort_idx)),
            ..CompletionItem::default()
        });
    }
    items
}

impl KeyCandidate {
    fn partial_matches(&self, partial: &str) -> bool {
        partial.is_empty()
            || self
                .name
                .to_lowercase()
                .starts_with(&partial.to_lowercase())
    }
}

/// Count auto-inserted characters after the cursor that the text edit
/// should swallow: a matching closing quote and/or `]`.
fn trailing_close_chars(line: &str, cursor_col: usize, quote: Option<char>) -> usize {
    let chars: Vec<char> = line.chars().collect();
    let mut count = 0;
    let mut i = cursor_col;
    if let Some(q) = quote {
        if chars.get(i) == Some(&q) {
            count += 1;
            i += 1;
        }
    }
    if chars.get(i) == Some(&']') {
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KeyEntry, ScalarKind, TypeUnion, TypeVariant};

    fn entry(name: &str, comments: &[&str]) -> KeyEntry {
        let mut e = KeyEntry::new(
            TypeUnion::single(TypeVariant::string_literal(0, name)),
            TypeUnion::single(TypeVariant::scalar(0, ScalarKind::Int)),
            0,
        );
        e.comments = comments.iter().map(|c| c.to_string()).collect();
        e
    }

    #[test]
    fn same_name_entries_merge_with_comment_concat() {
        let mut union = TypeUnion::empty();
        union.push(TypeVariant::map(0, vec![entry("a", &["first"])]));
        let mut other = KeyEntry::new(
            TypeUnion::single(TypeVariant::string_literal(1, "a")),
            TypeUnion::single(TypeVariant::scalar(1, ScalarKind::String)),
            1,
        );
        other.comments = vec!["second".to_string()];
        union.push(TypeVariant::map(1, vec![other]));

        let candidates = collect_candidates(&union);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "a");
        assert_eq!(candidates[0].comments, ["first", "second"]);
        assert_eq!(candidates[0].value.brief_value(), "int|string");
    }

    #[test]
    fn dynamic_keys_fall_back_to_numeric_indexes() {
        let dynamic = KeyEntry::new(
            TypeUnion::empty(),
            TypeUnion::single(TypeVariant::scalar(0, ScalarKind::String)),
            0,
        );
        let union = TypeUnion::single(TypeVariant::map(0, vec![dynamic]));
        let candidates = collect_candidates(&union);
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["0", "1", "2", "3", "4"]);
        assert!(candidates.iter().all(|c| c.numeric));
    }

    #[test]
    fn trailing_auto_close_is_swallowed() {
        assert_eq!(trailing_close_chars("$c['']", 4, Some('\'')), 2);
        assert_eq!(trailing_close_chars("$c[]", 3, None), 1);
        assert_eq!(trailing_close_chars("$c['", 4, Some('\'')), 0);
    }
}
