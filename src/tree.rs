//! Owned program model: the read-only syntax graph the engine resolves
//! over.
//!
//! All data is owned so nothing depends on the parser's arena lifetime.
//! The [`Program`] bundles an expression arena (with parent links and byte
//! spans), lexical scopes, per-scope assignment records ("previous
//! writers"), and the declaration tables (functions, closures, classes
//! with their methods) together with the lookup helpers the call resolver
//! needs. Once built by [`crate::parser`], a program is never mutated.

use crate::types::{CallableId, NodeId};

/// Index of a lexical scope. Scope `0` is always top-level code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

/// Classification of a binary operator, as much as inference cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
    /// `.` — result degrades to a plain string.
    Concat,
    /// `+ - * / % **` — result degrades to a plain int.
    Arithmetic,
    /// `??` — union of both sides.
    Coalesce,
    /// Comparisons and logical operators — plain bool.
    Bool,
    /// Anything else — nothing inferable.
    Other,
}

/// How a function call names its callee.
#[derive(Debug, Clone)]
pub enum Callee {
    /// `foo(…)` — looked up in the function table.
    Named(String),
    /// `$fn(…)` — the callee expression resolves to callable variants.
    Dynamic(NodeId),
}

/// One element of an array literal.
#[derive(Debug, Clone)]
pub struct ArrayItem {
    /// Key expression, `None` for positional elements.
    pub key: Option<NodeId>,
    pub value: NodeId,
    /// Comment lines found directly above this element.
    pub comments: Vec<String>,
}

/// Expression node kinds the engine dispatches on.
///
/// `Unknown` is a first-class citizen: everything the front-end does not
/// model lowers to it and resolves to the empty union.
#[derive(Debug, Clone)]
pub enum ExprKind {
    StringLit(String),
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    NullLit,
    ArrayLit { elements: Vec<ArrayItem> },
    Var { name: String },
    Assign { value: NodeId },
    Binary { kind: BinaryKind, lhs: NodeId, rhs: NodeId },
    Ternary { condition: NodeId, then: Option<NodeId>, otherwise: NodeId },
    ArrayAccess { base: NodeId, index: NodeId },
    FuncCall { callee: Callee, args: Vec<NodeId> },
    MethodCall { receiver: NodeId, method: String, args: Vec<NodeId> },
    StaticCall { class: String, method: String, args: Vec<NodeId> },
    New { class: String, args: Vec<NodeId> },
    Closure { id: usize },
    Unknown,
}

/// One node in the expression arena.
#[derive(Debug, Clone)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub parent: Option<NodeId>,
    pub scope: ScopeId,
    /// Byte span `(start, end)` in the source text.
    pub span: (u32, u32),
}

#[derive(Debug, Clone)]
pub struct Param {
    /// Parameter name including the `$` prefix (e.g. `"$rows"`).
    pub name: String,
    /// Class-like type hint, if the declaration carries one.
    pub hint: Option<String>,
}

/// A callable declaration: function, method or closure.
#[derive(Debug, Clone)]
pub struct Callable {
    pub name: String,
    pub params: Vec<Param>,
    /// Nodes of every `return` expression in the body, in source order.
    pub returns: Vec<NodeId>,
    /// Abstract or interface member — has no body of its own.
    pub is_abstract: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub kind: ClassKind,
    /// Parent class/interface from `extends`, short name as written.
    pub parent: Option<String>,
    /// Interfaces from `implements`.
    pub interfaces: Vec<String>,
    pub methods: Vec<Callable>,
    /// Shipped stub (e.g. `PDO`), not declared in user source.
    pub is_builtin: bool,
}

/// What a recorded assignment binds to the variable.
#[derive(Debug, Clone)]
pub enum Writer {
    /// `$v = expr;`
    Whole { value: NodeId },
    /// `$v['k'] = expr;` — contributes a single-entry map.
    KeyWrite { key: NodeId, value: NodeId },
    /// `foreach (expr as $v)` — contributes the element union of `expr`.
    Element { source: NodeId },
}

/// One assignment/binding record, in source order.
#[derive(Debug, Clone)]
pub struct AssignRecord {
    pub scope: ScopeId,
    /// Target variable name including `$`.
    pub name: String,
    pub writer: Writer,
    /// Byte offset of the binding; only writers strictly before a read
    /// reach it.
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct ScopeInfo {
    /// The callable owning this scope; `None` for top-level code.
    pub owner: Option<CallableId>,
    pub span: (u32, u32),
}

/// Inheritance walks give up past this many levels; guards against
/// circular `extends` chains in broken sources.
const MAX_HIERARCHY_DEPTH: usize = 20;

/// The owned, immutable program graph.
#[derive(Debug)]
pub struct Program {
    nodes: Vec<ExprNode>,
    pub scopes: Vec<ScopeInfo>,
    pub functions: Vec<Callable>,
    pub closures: Vec<Callable>,
    pub classes: Vec<ClassDecl>,
    pub assignments: Vec<AssignRecord>,
}

impl Program {
    pub fn new() -> Self {
        Program {
            nodes: Vec::new(),
            scopes: vec![ScopeInfo {
                owner: None,
                span: (0, u32::MAX),
            }],
            functions: Vec::new(),
            closures: Vec::new(),
            classes: Vec::new(),
            assignments: Vec::new(),
        }
    }

    pub fn node(&self, id: NodeId) -> &ExprNode {
        &self.nodes[id]
    }

    pub(crate) fn push_node(&mut self, kind: ExprKind, scope: ScopeId, span: (u32, u32)) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(ExprNode {
            kind,
            parent: None,
            scope,
            span,
        });
        id
    }

    pub(crate) fn set_parent(&mut self, child: NodeId, parent: NodeId) {
        self.nodes[child].parent = Some(parent);
    }

    pub(crate) fn push_scope(&mut self, owner: Option<CallableId>, span: (u32, u32)) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(ScopeInfo { owner, span });
        id
    }

    /// The innermost scope whose span contains `offset`.
    pub fn scope_at(&self, offset: u32) -> ScopeId {
        let mut best = ScopeId(0);
        let mut best_start = 0u32;
        for (idx, scope) in self.scopes.iter().enumerate().skip(1) {
            let (start, end) = scope.span;
            if offset >= start && offset <= end && start >= best_start {
                best = ScopeId(idx);
                best_start = start;
            }
        }
        best
    }

    /// All writers of `name` in `scope` recorded strictly before `offset`,
    /// in source order. This is the "previous writers reaching this read"
    /// query of the variable resolver.
    pub fn writers_before(&self, scope: ScopeId, name: &str, offset: u32) -> Vec<&AssignRecord> {
        self.assignments
            .iter()
            .filter(|a| a.scope == scope && a.name == name && a.offset < offset)
            .collect()
    }

    pub fn callable(&self, id: CallableId) -> &Callable {
        match id {
            CallableId::Function(idx) => &self.functions[idx],
            CallableId::Method { class, method } => &self.classes[class].methods[method],
            CallableId::Closure(idx) => &self.closures[idx],
        }
    }

    /// The class index a method identity belongs to, if any.
    pub fn class_of(&self, id: CallableId) -> Option<usize> {
        match id {
            CallableId::Method { class, .. } => Some(class),
            _ => None,
        }
    }

    /// Look up a top-level function by name. PHP function names are
    /// case-insensitive; namespace qualifiers are ignored.
    pub fn function_named(&self, name: &str) -> Option<CallableId> {
        let short = short_name(name);
        self.functions
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(short))
            .map(CallableId::Function)
    }

    /// Look up a class-like by name (short-name match, case-insensitive).
    pub fn class_named(&self, name: &str) -> Option<usize> {
        let short = short_name(name);
        self.classes
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(short))
    }

    /// Find a method on `class_idx` or any ancestor, child-most wins.
    pub fn method_in_hierarchy(&self, class_idx: usize, method: &str) -> Option<CallableId> {
        let mut current = class_idx;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            let class = &self.classes[current];
            if let Some(m) = class
                .methods
                .iter()
                .position(|m| m.name.eq_ignore_ascii_case(method))
            {
                return Some(CallableId::Method {
                    class: current,
                    method: m,
                });
            }
            match class.parent.as_deref().and_then(|p| self.class_named(p)) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        None
    }

    /// Whether `class_idx` descends from `ancestor_idx` through `extends`
    /// or `implements`, transitively.
    pub fn is_descendant(&self, class_idx: usize, ancestor_idx: usize) -> bool {
        self.is_descendant_bounded(class_idx, ancestor_idx, MAX_HIERARCHY_DEPTH)
    }

    fn is_descendant_bounded(&self, class_idx: usize, ancestor_idx: usize, depth: usize) -> bool {
        if depth == 0 || class_idx == ancestor_idx {
            return depth > 0;
        }
        let class = &self.classes[class_idx];
        let mut direct: Vec<&str> = Vec::new();
        if let Some(parent) = class.parent.as_deref() {
            direct.push(parent);
        }
        direct.extend(class.interfaces.iter().map(|s| s.as_str()));
        for name in direct {
            if let Some(idx) = self.class_named(name) {
                if idx == ancestor_idx || self.is_descendant_bounded(idx, ancestor_idx, depth - 1) {
                    return true;
                }
            }
        }
        false
    }

    /// Concrete overrides of an abstract/interface method: every concrete
    /// method with the same name declared on a descendant of `class_idx`.
    /// Declaration order of the class table gives the candidate order.
    pub fn overrides_of(&self, class_idx: usize, method: &str) -> Vec<CallableId> {
        let mut out = Vec::new();
        for (idx, class) in self.classes.iter().enumerate() {
            if idx == class_idx || !self.is_descendant(idx, class_idx) {
                continue;
            }
            for (m, decl) in class.methods.iter().enumerate() {
                if !decl.is_abstract && decl.name.eq_ignore_ascii_case(method) {
                    out.push(CallableId::Method { class: idx, method: m });
                }
            }
        }
        out
    }

    /// Every method with a matching name across all class-likes,
    /// receiver ignored. The imprecise last-resort lookup.
    pub fn methods_named(&self, method: &str) -> Vec<CallableId> {
        let mut out = Vec::new();
        for (idx, class) in self.classes.iter().enumerate() {
            for (m, decl) in class.methods.iter().enumerate() {
                if decl.name.eq_ignore_ascii_case(method) {
                    out.push(CallableId::Method { class: idx, method: m });
                }
            }
        }
        out
    }

    /// The class a scope's owning method belongs to, for `$this`.
    pub fn enclosing_class_of_scope(&self, scope: ScopeId) -> Option<usize> {
        self.scopes[scope.0].owner.and_then(|id| self.class_of(id))
    }
}

impl Default for Program {
    fn default() -> Self {
        Program::new()
    }
}

/// Strip a leading `\` and any namespace qualifier, keeping the last
/// segment (`Acme\Db\PDO` → `PDO`).
pub fn short_name(name: &str) -> &str {
    let name = name.strip_prefix('\\').unwrap_or(name);
    name.rsplit('\\').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, parent: Option<&str>, interfaces: &[&str]) -> ClassDecl {
        ClassDecl {
            name: name.to_string(),
            kind: ClassKind::Class,
            parent: parent.map(str::to_string),
            interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
            methods: Vec::new(),
            is_builtin: false,
        }
    }

    #[test]
    fn short_name_strips_namespace() {
        assert_eq!(short_name("\\Acme\\Db\\Conn"), "Conn");
        assert_eq!(short_name("Conn"), "Conn");
    }

    #[test]
    fn descendant_walk_covers_extends_and_implements() {
        let mut program = Program::new();
        program.classes.push(class("Base", None, &[]));
        program.classes.push(class("Mid", Some("Base"), &[]));
        program.classes.push(class("Leaf", Some("Mid"), &[]));
        program.classes.push(class("Impl", None, &["Base"]));
        assert!(program.is_descendant(2, 0));
        assert!(program.is_descendant(3, 0));
        assert!(!program.is_descendant(0, 2));
    }

    #[test]
    fn circular_extends_terminates() {
        let mut program = Program::new();
        program.classes.push(class("A", Some("B"), &[]));
        program.classes.push(class("B", Some("A"), &[]));
        assert!(program.method_in_hierarchy(0, "missing").is_none());
    }
}
