//! The central recursive resolver.
//!
//! [`resolve`] dispatches on the kind of the context's node and returns a
//! [`TypeUnion`]. Results bubble up as unions, merged at each composition
//! point. Every descent is budget-checked through the session and
//! cycle-guarded through the context's ancestor chain; any failure to
//! infer — budget, cycle, unknown node — yields the empty union for that
//! edge and nothing else.

use crate::calls;
use crate::context::ExprCtx;
use crate::session::Session;
use crate::tree::{short_name, BinaryKind, ExprKind, ScopeId, Writer};
use crate::types::{KeyEntry, NodeId, ScalarKind, TypeUnion, TypeVariant};

/// Resolve the context's node to a type union.
pub fn resolve(ctx: &ExprCtx) -> TypeUnion {
    if ctx.depth_left == 0 || !ctx.session.try_step() {
        return TypeUnion::empty();
    }

    let program = ctx.session.program;
    let node = program.node(ctx.node);
    match &node.kind {
        ExprKind::StringLit(text) => {
            TypeUnion::single(TypeVariant::string_literal(ctx.node, text.clone()))
        }
        ExprKind::IntLit(value) => TypeUnion::single(TypeVariant::int_literal(ctx.node, *value)),
        ExprKind::FloatLit(value) => TypeUnion::single(TypeVariant::scalar_literal(
            ctx.node,
            ScalarKind::Float,
            value.to_string(),
        )),
        ExprKind::BoolLit(value) => TypeUnion::single(TypeVariant::scalar_literal(
            ctx.node,
            ScalarKind::Bool,
            value.to_string(),
        )),
        ExprKind::NullLit => TypeUnion::single(TypeVariant::scalar(ctx.node, ScalarKind::Null)),
        ExprKind::ArrayLit { .. } => resolve_array_literal(ctx),
        ExprKind::Var { name } => {
            let name = name.clone();
            resolve_variable_read(ctx, &name, node.scope, node.span.0)
        }
        ExprKind::Assign { value } => descend(ctx, *value),
        ExprKind::Binary { kind, lhs, rhs } => match kind {
            BinaryKind::Concat => TypeUnion::single(TypeVariant::scalar(ctx.node, ScalarKind::String)),
            BinaryKind::Arithmetic => {
                TypeUnion::single(TypeVariant::scalar(ctx.node, ScalarKind::Int))
            }
            BinaryKind::Bool => TypeUnion::single(TypeVariant::scalar(ctx.node, ScalarKind::Bool)),
            BinaryKind::Coalesce => {
                let mut union = descend(ctx, *lhs);
                union.extend(descend(ctx, *rhs));
                union
            }
            BinaryKind::Other => TypeUnion::empty(),
        },
        ExprKind::Ternary {
            condition,
            then,
            otherwise,
        } => {
            // True branch first; the short form `$a ?: $b` yields the
            // condition's own value when truthy.
            let mut union = match then {
                Some(branch) => descend(ctx, *branch),
                None => descend(ctx, *condition),
            };
            union.extend(descend(ctx, *otherwise));
            union
        }
        ExprKind::ArrayAccess { base, index } => {
            let base_union = descend(ctx, *base);
            let index_union = descend(ctx, *index);
            value_union_for_index(&base_union, &index_union)
        }
        ExprKind::FuncCall { .. }
        | ExprKind::MethodCall { .. }
        | ExprKind::StaticCall { .. }
        | ExprKind::New { .. }
        | ExprKind::Closure { .. } => calls::resolve_call(ctx),
        ExprKind::Unknown => TypeUnion::empty(),
    }
}

/// Resolve a sub-expression at depth − 1, breaking cycles: if the node is
/// already on the ancestor path, this edge contributes nothing.
pub(crate) fn descend(ctx: &ExprCtx, node: NodeId) -> TypeUnion {
    if ctx.in_ancestry(node) {
        return TypeUnion::empty();
    }
    resolve(&ctx.sub(node))
}

/// Resolve a sibling expression (a variable's writer) at the same depth.
fn descend_sibling(ctx: &ExprCtx, node: NodeId) -> TypeUnion {
    if ctx.in_ancestry(node) {
        return TypeUnion::empty();
    }
    resolve(&ctx.sibling(node))
}

/// Assemble the map variant for an array literal, bottom-up.
///
/// Elements with the same statically-known key text merge into one entry
/// (value unions merged, comments concatenated); keyless elements take
/// sequential integer keys; dynamic keys keep whatever union their key
/// expression resolves to.
fn resolve_array_literal(ctx: &ExprCtx) -> TypeUnion {
    let program = ctx.session.program;
    let ExprKind::ArrayLit { elements } = &program.node(ctx.node).kind else {
        return TypeUnion::empty();
    };

    let mut entries: Vec<KeyEntry> = Vec::new();
    let mut next_index: i64 = 0;

    for element in elements {
        let key_union = match element.key {
            Some(key) => descend(ctx, key),
            None => {
                let key = TypeUnion::single(TypeVariant::int_literal(element.value, next_index));
                next_index += 1;
                key
            }
        };
        let value_union = descend(ctx, element.value);

        // Statically determinable key: a single scalar literal variant.
        let static_text = if key_union.variants().len() == 1 {
            key_union.scalar_strings().next().map(str::to_string)
        } else {
            None
        };

        if let Some(text) = static_text {
            if let Some(existing) = entries
                .iter_mut()
                .find(|e| e.key_text().is_some_and(|k| k == text))
            {
                existing.value.extend(value_union);
                for comment in &element.comments {
                    if !existing.comments.contains(comment) {
                        existing.comments.push(comment.clone());
                    }
                }
                continue;
            }
        }

        let mut entry = KeyEntry::new(key_union, value_union, element.value);
        entry.comments = element.comments.clone();
        entries.push(entry);
    }

    TypeUnion::single(TypeVariant::map(ctx.node, entries))
}

/// Resolve a variable read by name: `$this`, a bound parameter, or the
/// union over every previous writer reaching the read.
pub fn resolve_variable_read(
    ctx: &ExprCtx,
    name: &str,
    scope: ScopeId,
    offset: u32,
) -> TypeUnion {
    let program = ctx.session.program;

    if name == "$this" {
        if let Some(class_idx) = program.enclosing_class_of_scope(scope) {
            return TypeUnion::single(TypeVariant::instance(
                ctx.node,
                program.classes[class_idx].name.clone(),
            ));
        }
        return TypeUnion::empty();
    }

    // A parameter of the enclosing callable reads the bound argument of
    // the innermost matching call frame; with no frame (e.g. completion
    // directly inside the body) the declared hint is all we know.
    if let Some(owner) = program.scopes[scope.0].owner {
        let callable = program.callable(owner);
        if let Some(position) = callable.params.iter().position(|p| p.name == name) {
            if let Some(frame) = ctx.frame {
                if frame.callee == owner {
                    return frame.args.get(position).cloned().unwrap_or_default();
                }
            }
            if let Some(hint) = callable.params[position].hint.as_deref() {
                return TypeUnion::single(TypeVariant::instance(
                    ctx.node,
                    short_name(hint).to_string(),
                ));
            }
            return TypeUnion::empty();
        }
    }

    let mut union = TypeUnion::empty();
    for record in program.writers_before(scope, name, offset) {
        match &record.writer {
            Writer::Whole { value } => union.extend(descend_sibling(ctx, *value)),
            Writer::KeyWrite { key, value } => {
                let key_union = descend_sibling(ctx, *key);
                let value_union = descend_sibling(ctx, *value);
                union.push(TypeVariant::map(
                    *value,
                    vec![KeyEntry::new(key_union, value_union, *value)],
                ));
            }
            Writer::Element { source } => {
                let source_union = descend_sibling(ctx, *source);
                for entry in source_union.map_keys() {
                    union.extend(entry.value.clone());
                }
            }
        }
    }
    union
}

/// Entry point for completion: resolve variable `name` as read at
/// `offset`, inside whatever scope encloses that offset.
pub fn resolve_variable_at(session: &Session<'_>, name: &str, offset: u32) -> TypeUnion {
    let scope = session.program.scope_at(offset);
    let root = ExprCtx::detached(session);
    resolve_variable_read(&root, name, scope, offset)
}

/// Values stored under `key` across all map variants of `union`.
pub fn value_union_for_key(union: &TypeUnion, key: &str) -> TypeUnion {
    let mut out = TypeUnion::empty();
    for entry in union.map_keys() {
        if entry.key.scalar_strings().any(|k| k == key) {
            out.extend(entry.value.clone());
        }
    }
    out
}

/// Index lookup on a resolved base: entries matching any statically-known
/// index text, or every entry when the index is dynamic.
fn value_union_for_index(base: &TypeUnion, index: &TypeUnion) -> TypeUnion {
    let keys: Vec<&str> = index.scalar_strings().collect();
    if keys.is_empty() {
        let mut out = TypeUnion::empty();
        for entry in base.map_keys() {
            out.extend(entry.value.clone());
        }
        return out;
    }
    let mut out = TypeUnion::empty();
    for key in keys {
        out.extend(value_union_for_key(base, key));
    }
    out
}
