//! Permissive `SELECT` parsing for the query builtin, plus the schema
//! lookup boundary.
//!
//! The call resolver special-cases query-execution calls whose first
//! argument is a string literal: the literal is pattern-matched here to
//! recover the selected column list. The matching is deliberately loose —
//! case-insensitive, newline-tolerant, alias- and qualifier-aware — and a
//! string that does not look like a `SELECT` simply yields nothing.

use std::collections::HashMap;

/// Column source for wildcard selections (`SELECT * FROM t`).
///
/// A trait so tests can swap in a fixed schema; the production
/// implementation is [`StaticSchema`], fed from settings.
pub trait SchemaProvider {
    /// Ordered column names of `table`. Unknown tables yield an empty
    /// sequence — a degrade, not an error.
    fn columns_of(&self, table: &str) -> Vec<String>;
}

/// Settings-backed schema: a plain table → column-list map.
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    tables: HashMap<String, Vec<String>>,
}

impl StaticSchema {
    pub fn new(tables: HashMap<String, Vec<String>>) -> Self {
        StaticSchema { tables }
    }
}

impl SchemaProvider for StaticSchema {
    fn columns_of(&self, table: &str) -> Vec<String> {
        self.tables.get(table).cloned().unwrap_or_default()
    }
}

/// One selected field of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectField {
    /// `*` — expands through the schema provider.
    Wildcard,
    /// A named column, qualifier and alias already stripped.
    Named(String),
}

/// The recovered shape of a `SELECT` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectShape {
    pub fields: Vec<SelectField>,
    /// Source table, when a `FROM` clause was present.
    pub table: Option<String>,
}

impl SelectShape {
    /// Flatten to concrete column names, expanding wildcards through
    /// `schema`.
    pub fn column_names(&self, schema: &dyn SchemaProvider) -> Vec<String> {
        let mut out = Vec::new();
        for field in &self.fields {
            match field {
                SelectField::Named(name) => out.push(name.clone()),
                SelectField::Wildcard => {
                    out.extend(schema.columns_of(self.table.as_deref().unwrap_or("")));
                }
            }
        }
        out
    }
}

/// Parse a query string into its selected fields and source table.
///
/// Accepts `SELECT <fields> FROM <table> …` and partial `SELECT <fields>`
/// without a `FROM` clause. Returns `None` for anything that does not
/// start with `SELECT`.
pub fn parse_select(sql: &str) -> Option<SelectShape> {
    let trimmed = sql.trim();
    let rest = strip_keyword(trimmed, "select")?;

    let (field_text, table) = match find_keyword(rest, "from") {
        Some(pos) => {
            let after = &rest[pos + "from".len()..];
            (&rest[..pos], leading_identifier(after))
        }
        None => (rest, None),
    };

    let mut fields = Vec::new();
    for raw in field_text.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        if raw == "*" {
            fields.push(SelectField::Wildcard);
        } else if let Some(name) = field_name(raw) {
            fields.push(SelectField::Named(name));
        }
    }

    Some(SelectShape { fields, table })
}

/// Strip a leading keyword followed by whitespace, case-insensitively.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    if text.len() <= keyword.len() {
        return None;
    }
    if !text.is_char_boundary(keyword.len()) {
        return None;
    }
    let (head, tail) = text.split_at(keyword.len());
    if head.eq_ignore_ascii_case(keyword) && tail.starts_with(|c: char| c.is_whitespace()) {
        Some(tail.trim_start())
    } else {
        None
    }
}

/// Byte position of the first whitespace-delimited occurrence of
/// `keyword`, case-insensitive.
fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let len = keyword.len();
    let mut i = 0;
    while i + len <= bytes.len() {
        if text.is_char_boundary(i)
            && text.is_char_boundary(i + len)
            && text[i..i + len].eq_ignore_ascii_case(keyword)
        {
            let before_ok = i == 0 || bytes[i - 1].is_ascii_whitespace();
            let after_ok = i + len == bytes.len() || bytes[i + len].is_ascii_whitespace();
            if before_ok && after_ok {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// First identifier (`[A-Za-z_][A-Za-z0-9_]*`) in `text`.
fn leading_identifier(text: &str) -> Option<String> {
    let trimmed = text.trim_start();
    let mut out = String::new();
    for (i, c) in trimmed.chars().enumerate() {
        let ok = if i == 0 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };
        if ok {
            out.push(c);
        } else {
            break;
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

/// Reduce one selected field to its effective column name: the last
/// whitespace-separated token (covers `expr AS alias` and bare aliases),
/// with any `table.` qualifier dropped.
fn field_name(field: &str) -> Option<String> {
    let last = field.split_whitespace().next_back()?;
    let name = last.rsplit('.').next().unwrap_or(last);
    let name = name.trim_matches(|c| c == '`' || c == '"');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(shape: &SelectShape) -> Vec<String> {
        shape.column_names(&StaticSchema::default())
    }

    #[test]
    fn plain_field_list() {
        let shape = parse_select("SELECT id, name FROM users").unwrap();
        assert_eq!(names(&shape), ["id", "name"]);
        assert_eq!(shape.table.as_deref(), Some("users"));
    }

    #[test]
    fn case_insensitive_and_multiline() {
        let shape = parse_select("select\n  id,\n  email\nfrom\n  accounts\nwhere id = 1").unwrap();
        assert_eq!(names(&shape), ["id", "email"]);
        assert_eq!(shape.table.as_deref(), Some("accounts"));
    }

    #[test]
    fn qualifiers_and_aliases_are_stripped() {
        let shape = parse_select("SELECT u.id, u.name AS label, count(*) total FROM users u").unwrap();
        assert_eq!(names(&shape), ["id", "label", "total"]);
    }

    #[test]
    fn partial_select_without_from() {
        let shape = parse_select("SELECT id, flags").unwrap();
        assert_eq!(names(&shape), ["id", "flags"]);
        assert_eq!(shape.table, None);
    }

    #[test]
    fn wildcard_expands_through_schema() {
        let mut tables = HashMap::new();
        tables.insert(
            "users".to_string(),
            vec!["id".to_string(), "name".to_string(), "email".to_string()],
        );
        let schema = StaticSchema::new(tables);
        let shape = parse_select("SELECT * FROM users").unwrap();
        assert_eq!(shape.column_names(&schema), ["id", "name", "email"]);
    }

    #[test]
    fn wildcard_on_unknown_table_degrades_to_nothing() {
        let shape = parse_select("SELECT * FROM ghosts").unwrap();
        assert!(names(&shape).is_empty());
    }

    #[test]
    fn non_select_is_rejected() {
        assert!(parse_select("DELETE FROM users").is_none());
        assert!(parse_select("selection of things").is_none());
        assert!(parse_select("").is_none());
    }
}
