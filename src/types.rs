//! The union type algebra used by the resolution engine.
//!
//! Every inference step produces a [`TypeUnion`]: an ordered, deduplicated
//! set of [`TypeVariant`] hypotheses about what a value might look like at
//! runtime. Map-shaped variants carry [`KeyEntry`] descriptors, which are
//! what the completion layer ultimately reads.
//!
//! All data here is owned and immutable once a union has been assembled;
//! the engine merges unions by value and never mutates a union after all
//! contributing branches have been collected.

/// Index of an expression node in [`crate::tree::Program`].
///
/// Used as a provenance handle: it records which syntax node produced a
/// variant or key entry. Provenance never participates in equality.
pub type NodeId = usize;

/// Sentinel node id for synthetic resolution roots (e.g. a completion
/// request that resolves a variable by name rather than through a node).
pub const NO_NODE: NodeId = usize::MAX;

/// Display budget for [`TypeUnion::brief_value`] renderings.
pub const BRIEF_VALUE_MAX_LEN: usize = 65;

/// How many placeholder numeric indexes (`0`, `1`, …) a key entry without
/// any statically-known key name contributes to completion. Heuristic
/// bound, not a contract.
pub const DYNAMIC_KEY_FALLBACK: usize = 5;

/// Identity of a callable declaration inside a [`crate::tree::Program`].
///
/// Doubles as the memoization key component for call resolution, so it
/// must stay cheap to copy, compare and hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallableId {
    /// Top-level function, by index into `Program::functions`.
    Function(usize),
    /// Method, by class index and method index within the class.
    Method { class: usize, method: usize },
    /// Anonymous function, by index into `Program::closures`.
    Closure(usize),
}

/// Primitive kind of a scalar variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Int,
    Float,
    Bool,
    Null,
}

impl ScalarKind {
    /// PHP-facing name used in previews (`string`, `int`, …).
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "bool",
            ScalarKind::Null => "null",
        }
    }
}

/// The shape carried by a [`TypeVariant`].
///
/// Exactly one of the five kinds; fields for other kinds cannot exist.
#[derive(Debug, Clone)]
pub enum Shape {
    /// A primitive value, with the literal text when statically known
    /// (`'active'`, `42`). `literal: None` means "some string/int/…".
    Scalar {
        kind: ScalarKind,
        literal: Option<String>,
    },
    /// An associative array: ordered key descriptors.
    Map { entries: Vec<KeyEntry> },
    /// A callable value (closure or referenced declaration).
    Callable { id: CallableId },
    /// Result marker of an executed query: the inferred row columns.
    /// Attached at the execute call site and read back at the fetch site.
    QueryResult { columns: Vec<KeyEntry> },
    /// An object instance whose internals we do not model.
    Instance { class: String },
}

/// One concrete hypothesis about a value's shape, tagged with the syntax
/// node that produced it.
#[derive(Debug, Clone)]
pub struct TypeVariant {
    /// Provenance: the node this hypothesis was derived from.
    pub definition: NodeId,
    pub shape: Shape,
}

impl TypeVariant {
    pub fn scalar(definition: NodeId, kind: ScalarKind) -> Self {
        TypeVariant {
            definition,
            shape: Shape::Scalar {
                kind,
                literal: None,
            },
        }
    }

    pub fn scalar_literal(definition: NodeId, kind: ScalarKind, literal: String) -> Self {
        TypeVariant {
            definition,
            shape: Shape::Scalar {
                kind,
                literal: Some(literal),
            },
        }
    }

    pub fn string_literal(definition: NodeId, value: impl Into<String>) -> Self {
        Self::scalar_literal(definition, ScalarKind::String, value.into())
    }

    pub fn int_literal(definition: NodeId, value: i64) -> Self {
        Self::scalar_literal(definition, ScalarKind::Int, value.to_string())
    }

    pub fn map(definition: NodeId, entries: Vec<KeyEntry>) -> Self {
        TypeVariant {
            definition,
            shape: Shape::Map { entries },
        }
    }

    pub fn instance(definition: NodeId, class: impl Into<String>) -> Self {
        TypeVariant {
            definition,
            shape: Shape::Instance {
                class: class.into(),
            },
        }
    }

    pub fn callable(definition: NodeId, id: CallableId) -> Self {
        TypeVariant {
            definition,
            shape: Shape::Callable { id },
        }
    }

    pub fn query_result(definition: NodeId, columns: Vec<KeyEntry>) -> Self {
        TypeVariant {
            definition,
            shape: Shape::QueryResult { columns },
        }
    }

    /// Structural equality: same shape, literals and nested structure.
    /// Provenance nodes and harvested comments are ignored, so two `['a'
    /// => 1]` literals written in different places compare equal.
    pub fn same_shape(&self, other: &TypeVariant) -> bool {
        self.shape.same(&other.shape)
    }

    /// Short preview of this variant for completion detail text.
    pub fn brief(&self) -> String {
        match &self.shape {
            Shape::Scalar { kind, literal } => match literal {
                Some(text) if *kind == ScalarKind::String => format!("'{}'", clip(text, 20)),
                Some(text) => clip(text, 20),
                None => kind.name().to_string(),
            },
            Shape::Map { entries } => {
                let keys: Vec<&str> = entries
                    .iter()
                    .flat_map(|e| e.key.scalar_strings())
                    .collect();
                if keys.is_empty() {
                    "array".to_string()
                } else {
                    format!("array{{{}}}", keys.join(", "))
                }
            }
            Shape::Callable { .. } => "callable".to_string(),
            Shape::QueryResult { .. } => "statement".to_string(),
            Shape::Instance { class } => class.clone(),
        }
    }

    /// Canonical structural rendering, used as part of memoization keys.
    /// Unlike [`brief`](Self::brief) it is never truncated.
    pub fn signature(&self) -> String {
        match &self.shape {
            Shape::Scalar { kind, literal } => match literal {
                Some(text) => format!("s:{}={}", kind.name(), text),
                None => format!("s:{}", kind.name()),
            },
            Shape::Map { entries } => {
                let inner: Vec<String> = entries
                    .iter()
                    .map(|e| format!("{}=>{}", e.key.signature(), e.value.signature()))
                    .collect();
                format!("m{{{}}}", inner.join(","))
            }
            Shape::Callable { id } => format!("c:{id:?}"),
            Shape::QueryResult { columns } => {
                let inner: Vec<String> = columns
                    .iter()
                    .map(|e| format!("{}=>{}", e.key.signature(), e.value.signature()))
                    .collect();
                format!("q{{{}}}", inner.join(","))
            }
            Shape::Instance { class } => format!("i:{class}"),
        }
    }
}

impl Shape {
    fn same(&self, other: &Shape) -> bool {
        match (self, other) {
            (
                Shape::Scalar { kind, literal },
                Shape::Scalar {
                    kind: ok,
                    literal: ol,
                },
            ) => kind == ok && literal == ol,
            (Shape::Map { entries }, Shape::Map { entries: oe }) => entries_same(entries, oe),
            (Shape::Callable { id }, Shape::Callable { id: oid }) => id == oid,
            (Shape::QueryResult { columns }, Shape::QueryResult { columns: oc }) => {
                entries_same(columns, oc)
            }
            (Shape::Instance { class }, Shape::Instance { class: oc }) => class == oc,
            _ => false,
        }
    }
}

fn entries_same(a: &[KeyEntry], b: &[KeyEntry]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same(y))
}

/// One key descriptor inside a map-shaped variant.
///
/// The key itself is a union: it is usually a single scalar string/int,
/// but a dynamic key expression (e.g. a loop variable) may contribute
/// several variants or none at all.
#[derive(Debug, Clone)]
pub struct KeyEntry {
    /// The key identity union. Scalar literal variants are the actual
    /// completion candidates.
    pub key: TypeUnion,
    /// Everything this key has been seen to hold.
    pub value: TypeUnion,
    /// Comment lines harvested next to the key's definition.
    pub comments: Vec<String>,
    /// The node that defined this key.
    pub definition: NodeId,
}

impl KeyEntry {
    pub fn new(key: TypeUnion, value: TypeUnion, definition: NodeId) -> Self {
        KeyEntry {
            key,
            value,
            comments: Vec::new(),
            definition,
        }
    }

    /// Structural comparison ignoring comments and provenance.
    pub fn same(&self, other: &KeyEntry) -> bool {
        self.key.same(&other.key) && self.value.same(&other.value)
    }

    /// First statically-known key text, if any.
    pub fn key_text(&self) -> Option<&str> {
        self.key.scalar_strings().next()
    }
}

/// Ordered, deduplicated set of shape hypotheses for one expression.
///
/// Insertion order is first-seen-first-kept and must be preserved: the
/// completion list ordering is derived from it. The empty union is the
/// normal "nothing could be inferred" result, not an error.
#[derive(Debug, Clone, Default)]
pub struct TypeUnion {
    variants: Vec<TypeVariant>,
}

impl TypeUnion {
    pub fn empty() -> Self {
        TypeUnion::default()
    }

    pub fn single(variant: TypeVariant) -> Self {
        TypeUnion {
            variants: vec![variant],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn variants(&self) -> &[TypeVariant] {
        &self.variants
    }

    /// Append one variant unless a structurally equal one is present.
    pub fn push(&mut self, variant: TypeVariant) {
        if !self.variants.iter().any(|v| v.same_shape(&variant)) {
            self.variants.push(variant);
        }
    }

    /// Union-of-unions: append `other`'s variants, skipping structural
    /// duplicates, preserving order.
    pub fn extend(&mut self, other: TypeUnion) {
        for variant in other.variants {
            self.push(variant);
        }
    }

    /// Merge a sequence of unions in order.
    pub fn merged(parts: impl IntoIterator<Item = TypeUnion>) -> Self {
        let mut out = TypeUnion::empty();
        for part in parts {
            out.extend(part);
        }
        out
    }

    pub fn same(&self, other: &TypeUnion) -> bool {
        self.variants.len() == other.variants.len()
            && self
                .variants
                .iter()
                .zip(&other.variants)
                .all(|(a, b)| a.same_shape(b))
    }

    /// All map-shaped variants' key entries, in variant order then entry
    /// order. No key deduplication happens here; merging same-name keys
    /// is the consumer's concern.
    pub fn map_keys(&self) -> impl Iterator<Item = &KeyEntry> {
        self.variants.iter().flat_map(|v| match &v.shape {
            Shape::Map { entries } => entries.as_slice(),
            _ => &[],
        })
    }

    /// Literal texts of all scalar variants (string and int literals).
    pub fn scalar_strings(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().filter_map(|v| match &v.shape {
            Shape::Scalar {
                literal: Some(text),
                ..
            } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Class names of all instance-shaped variants.
    pub fn instance_classes(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().filter_map(|v| match &v.shape {
            Shape::Instance { class } => Some(class.as_str()),
            _ => None,
        })
    }

    /// Callable identities of all callable-shaped variants.
    pub fn callable_ids(&self) -> impl Iterator<Item = CallableId> {
        self.variants.iter().filter_map(|v| match v.shape {
            Shape::Callable { id } => Some(id),
            _ => None,
        })
    }

    /// Short human-readable rendering for display, capped at
    /// [`BRIEF_VALUE_MAX_LEN`] characters. Never used for equality.
    pub fn brief_value(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for variant in &self.variants {
            let brief = variant.brief();
            if !parts.contains(&brief) {
                parts.push(brief);
            }
        }
        clip(&parts.join("|"), BRIEF_VALUE_MAX_LEN)
    }

    /// Canonical structural rendering, used in memoization keys.
    pub fn signature(&self) -> String {
        let parts: Vec<String> = self.variants.iter().map(|v| v.signature()).collect();
        format!("u[{}]", parts.join(","))
    }
}

/// Truncate to at most `max` characters, on a character boundary.
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(1)).collect();
        kept + "…"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_deduplicates_by_shape_not_provenance() {
        let mut union = TypeUnion::empty();
        union.push(TypeVariant::string_literal(1, "a"));
        union.push(TypeVariant::string_literal(2, "a"));
        union.push(TypeVariant::string_literal(3, "b"));
        assert_eq!(union.variants().len(), 2);
        let texts: Vec<&str> = union.scalar_strings().collect();
        assert_eq!(texts, ["a", "b"]);
    }

    #[test]
    fn empty_union_is_legal() {
        let union = TypeUnion::empty();
        assert!(union.is_empty());
        assert_eq!(union.brief_value(), "");
    }

    #[test]
    fn brief_value_is_capped() {
        let mut union = TypeUnion::empty();
        for i in 0..40 {
            union.push(TypeVariant::string_literal(i, format!("value_number_{i}")));
        }
        assert!(union.brief_value().chars().count() <= BRIEF_VALUE_MAX_LEN);
    }

    #[test]
    fn map_keys_flattens_in_variant_order() {
        let entry = |name: &str| {
            KeyEntry::new(
                TypeUnion::single(TypeVariant::string_literal(0, name)),
                TypeUnion::single(TypeVariant::scalar(0, ScalarKind::Int)),
                0,
            )
        };
        let mut union = TypeUnion::empty();
        union.push(TypeVariant::map(0, vec![entry("x")]));
        union.push(TypeVariant::map(1, vec![entry("y"), entry("z")]));
        let keys: Vec<&str> = union.map_keys().filter_map(|e| e.key_text()).collect();
        assert_eq!(keys, ["x", "y", "z"]);
    }
}
