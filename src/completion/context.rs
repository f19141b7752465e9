//! Caret-context detection for array key completion.
//!
//! Walks backward from the cursor on the current line to recognise the
//! patterns that mean "the user is typing an array key":
//!
//!   - `$var[`                    — no quote yet
//!   - `$var['` / `$var["`       — empty partial
//!   - `$var['na`                 — partial `na`
//!   - `$var['a']['b'][`          — chained access, prefix keys `a`, `b`
//!
//! Also provides the source patch that closes an unclosed access so the
//! statement parses while the user is mid-keystroke.

use tower_lsp::lsp_types::Position;

/// The detected array-key caret context.
#[derive(Debug, Clone)]
pub struct ArrayKeyTarget {
    /// Variable being indexed, including the `$` prefix.
    pub var_name: String,
    /// Key text typed so far, without the opening quote.
    pub partial_key: String,
    /// Quote character in use, `None` right after `[`.
    pub quote: Option<char>,
    /// Column (0-based, in characters) where the key text begins.
    pub key_start_col: u32,
    /// Keys of preceding chained accesses, outermost first.
    pub prefix_keys: Vec<String>,
}

/// Detect whether the cursor sits in an array key position.
pub fn detect_array_key_target(content: &str, position: Position) -> Option<ArrayKeyTarget> {
    let line = content.lines().nth(position.line as usize)?;
    let chars: Vec<char> = line.chars().collect();
    let col = (position.character as usize).min(chars.len());
    if col == 0 {
        return None;
    }

    let mut i = col;

    // Partial key: identifier characters typed so far.
    let partial_end = i;
    while i > 0 && (chars[i - 1].is_alphanumeric() || chars[i - 1] == '_') {
        i -= 1;
    }
    let partial_start = i;

    // Opening quote, if any.
    let quote = if i > 0 && (chars[i - 1] == '\'' || chars[i - 1] == '"') {
        i -= 1;
        Some(chars[i])
    } else {
        None
    };

    // The `[` that opens this access.
    if i == 0 || chars[i - 1] != '[' {
        return None;
    }
    i -= 1;

    // Chained `['key']` segments before the current bracket.
    let mut prefix_keys: Vec<String> = Vec::new();
    loop {
        if i == 0 || chars[i - 1] != ']' {
            break;
        }
        let saved = i;
        i -= 1;
        let Some(&closing) = chars.get(i.wrapping_sub(1)) else {
            i = saved;
            break;
        };
        if closing != '\'' && closing != '"' {
            i = saved;
            break;
        }
        i -= 1;
        let key_end = i;
        while i > 0 && chars[i - 1] != closing {
            i -= 1;
        }
        if i == 0 {
            i = saved;
            break;
        }
        let key_text: String = chars[i..key_end].iter().collect();
        i -= 1; // opening quote
        if i == 0 || chars[i - 1] != '[' {
            i = saved;
            break;
        }
        i -= 1; // `[`
        prefix_keys.push(key_text);
    }
    prefix_keys.reverse();

    // The variable before the first bracket.
    let bracket = i;
    while i > 0 && (chars[i - 1].is_alphanumeric() || chars[i - 1] == '_') {
        i -= 1;
    }
    if i == 0 || chars[i - 1] != '$' {
        return None;
    }
    i -= 1;
    let var_name: String = chars[i..bracket].iter().collect();
    if var_name.len() < 2 {
        return None;
    }

    Some(ArrayKeyTarget {
        var_name,
        partial_key: chars[partial_start..partial_end].iter().collect(),
        quote,
        key_start_col: partial_start as u32,
        prefix_keys,
    })
}

/// Close an unclosed array access on the cursor line so the file parses.
///
/// Returns the input unchanged when there is nothing to patch. The patch
/// only ever appends to the cursor line, so byte offsets before the
/// cursor stay valid.
pub fn patch_unclosed_access(content: &str, position: Position) -> String {
    let line_idx = position.line as usize;
    let mut patched = String::with_capacity(content.len() + 4);

    for (i, line) in content.lines().enumerate() {
        if i == line_idx {
            patched.push_str(&close_access(line));
        } else {
            patched.push_str(line);
        }
        patched.push('\n');
    }
    if !content.ends_with('\n') && patched.ends_with('\n') {
        patched.pop();
    }
    patched
}

/// Complete the trailing `['partial` fragment of one line. Longer
/// patterns are tested first so `['']` is not half-matched as `['`.
fn close_access(line: &str) -> String {
    let trimmed = line.trim_end();
    if trimmed.ends_with("['']") || trimmed.ends_with("[\"\"]") {
        return format!("{trimmed};");
    }
    if trimmed.ends_with("[']") || trimmed.ends_with("[\"]") {
        let quote = if trimmed.ends_with("[']") { '\'' } else { '"' };
        let before = &trimmed[..trimmed.len() - 1];
        return format!("{before}{quote}];");
    }
    if trimmed.ends_with("[]") {
        return format!("{trimmed};");
    }
    if trimmed.ends_with('[') {
        return format!("{trimmed}];");
    }
    // `$var['par` — an open quote with a partial key after the bracket.
    if let Some(open) = trimmed.rfind('[') {
        let tail = &trimmed[open + 1..];
        let mut tail_chars = tail.chars();
        if let Some(quote @ ('\'' | '"')) = tail_chars.next() {
            if tail_chars.all(|c| c.is_alphanumeric() || c == '_') {
                return format!("{trimmed}{quote}];");
            }
        }
    }
    line.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(line: &str, character: u32) -> Option<ArrayKeyTarget> {
        detect_array_key_target(
            line,
            Position {
                line: 0,
                character,
            },
        )
    }

    #[test]
    fn bare_bracket() {
        let target = detect("$config[", 8).unwrap();
        assert_eq!(target.var_name, "$config");
        assert_eq!(target.partial_key, "");
        assert_eq!(target.quote, None);
        assert!(target.prefix_keys.is_empty());
    }

    #[test]
    fn quoted_partial() {
        let target = detect("$config['ho", 11).unwrap();
        assert_eq!(target.var_name, "$config");
        assert_eq!(target.partial_key, "ho");
        assert_eq!(target.quote, Some('\''));
        assert_eq!(target.key_start_col, 9);
    }

    #[test]
    fn chained_prefix_keys() {
        let target = detect("$response['meta']['page'][", 26).unwrap();
        assert_eq!(target.var_name, "$response");
        assert_eq!(target.prefix_keys, ["meta", "page"]);
    }

    #[test]
    fn not_an_array_context() {
        assert!(detect("echo $config;", 13).is_none());
        assert!(detect("$config", 7).is_none());
    }

    #[test]
    fn patching_closes_open_accesses() {
        let position = Position { line: 0, character: 9 };
        assert_eq!(
            patch_unclosed_access("$config['", position),
            "$config[''];"
        );
        assert_eq!(patch_unclosed_access("$config[", position), "$config[];");
        assert_eq!(
            patch_unclosed_access("$config['ho", position),
            "$config['ho'];"
        );
        assert_eq!(
            patch_unclosed_access("$x = 1;", position),
            "$x = 1;"
        );
    }
}
