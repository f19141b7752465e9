//! PHP front-end: parse source text with `mago-syntax` and lower it into
//! the owned [`Program`] graph the engine resolves over.
//!
//! All extracted data is owned so nothing depends on the parser's arena
//! lifetime. Lowering is best-effort: any construct the engine does not
//! model becomes an `Unknown` node, which simply resolves to the empty
//! union. Comments adjacent to array elements are harvested from the
//! parser's trivia list so they can surface as completion documentation.
//!
//! The two builtin classes the call resolver special-cases (`PDO`,
//! `PDOStatement`) are appended as stub declarations to every program,
//! unless the source defines its own.

use std::panic;

use bumpalo::Bump;
use mago_span::HasSpan;
use mago_syntax::ast::*;
use mago_syntax::parser::parse_file_content;

use crate::tree::{
    ArrayItem, AssignRecord, BinaryKind, Callable, Callee, ClassDecl, ClassKind, ExprKind, Param,
    Program, ScopeId, Writer,
};
use crate::types::{CallableId, NodeId};

/// Parse PHP source into a [`Program`].
///
/// A parser panic must not take the server down; it is contained here and
/// yields an empty program (no suggestions, not a crash).
pub fn parse_program(content: &str) -> Program {
    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| build_program(content)));
    match result {
        Ok(program) => program,
        Err(_) => {
            tracing::error!("parser panicked; degrading to an empty program");
            Program::new()
        }
    }
}

fn build_program(content: &str) -> Program {
    let arena = Bump::new();
    let file_id = mago_database::file::FileId::new("input.php");
    let parsed = parse_file_content(&arena, file_id, content);

    let mut lowerer = Lowerer {
        out: Program::new(),
        content,
        trivias: parsed.trivia.as_slice(),
        class_stack: Vec::new(),
        return_sinks: Vec::new(),
    };
    lowerer.lower_statements(parsed.statements.iter(), ScopeId(0));

    let mut program = lowerer.out;
    install_builtin_stubs(&mut program);
    program
}

/// Stub declarations for the host APIs the call resolver special-cases.
/// User-declared classes of the same name take precedence.
fn install_builtin_stubs(program: &mut Program) {
    let stub = |name: &str| Callable {
        name: name.to_string(),
        params: Vec::new(),
        returns: Vec::new(),
        is_abstract: false,
    };
    if program.class_named("PDO").is_none() {
        program.classes.push(ClassDecl {
            name: "PDO".to_string(),
            kind: ClassKind::Class,
            parent: None,
            interfaces: Vec::new(),
            methods: vec![stub("query"), stub("prepare")],
            is_builtin: true,
        });
    }
    if program.class_named("PDOStatement").is_none() {
        program.classes.push(ClassDecl {
            name: "PDOStatement".to_string(),
            kind: ClassKind::Class,
            parent: None,
            interfaces: Vec::new(),
            methods: vec![stub("fetch")],
            is_builtin: true,
        });
    }
}

struct Lowerer<'a> {
    out: Program,
    content: &'a str,
    trivias: &'a [Trivia<'a>],
    /// Enclosing class names, for `self` / `static` receivers.
    class_stack: Vec<String>,
    /// Return-expression sinks, innermost callable last.
    return_sinks: Vec<Vec<NodeId>>,
}

impl Lowerer<'_> {
    fn lower_statements<'s>(
        &mut self,
        statements: impl Iterator<Item = &'s Statement<'s>>,
        scope: ScopeId,
    ) {
        for statement in statements {
            self.lower_statement(statement, scope);
        }
    }

    fn lower_statement(&mut self, statement: &Statement<'_>, scope: ScopeId) {
        match statement {
            Statement::Namespace(ns) => {
                self.lower_statements(ns.statements().iter(), scope);
            }
            Statement::Expression(expr_stmt) => {
                self.lower_expr(expr_stmt.expression, scope);
            }
            Statement::Return(ret) => {
                if let Some(value) = &ret.value {
                    let id = self.lower_expr(value, scope);
                    if let Some(sink) = self.return_sinks.last_mut() {
                        sink.push(id);
                    }
                }
            }
            Statement::Block(block) => {
                self.lower_statements(block.statements.iter(), scope);
            }
            Statement::If(if_stmt) => {
                self.lower_expr(if_stmt.condition, scope);
                match &if_stmt.body {
                    IfBody::Statement(body) => {
                        self.lower_statement(body.statement, scope);
                        for else_if in body.else_if_clauses.iter() {
                            self.lower_expr(else_if.condition, scope);
                            self.lower_statement(else_if.statement, scope);
                        }
                        if let Some(else_clause) = &body.else_clause {
                            self.lower_statement(else_clause.statement, scope);
                        }
                    }
                    IfBody::ColonDelimited(body) => {
                        self.lower_statements(body.statements.iter(), scope);
                        for else_if in body.else_if_clauses.iter() {
                            self.lower_expr(else_if.condition, scope);
                            self.lower_statements(else_if.statements.iter(), scope);
                        }
                        if let Some(else_clause) = &body.else_clause {
                            self.lower_statements(else_clause.statements.iter(), scope);
                        }
                    }
                }
            }
            Statement::While(while_stmt) => match &while_stmt.body {
                WhileBody::Statement(inner) => self.lower_statement(inner, scope),
                WhileBody::ColonDelimited(body) => {
                    self.lower_statements(body.statements.iter(), scope)
                }
            },
            Statement::DoWhile(do_while) => self.lower_statement(do_while.statement, scope),
            Statement::For(for_stmt) => {
                for init in for_stmt.initializations.iter() {
                    self.lower_expr(init, scope);
                }
                match &for_stmt.body {
                    ForBody::Statement(inner) => self.lower_statement(inner, scope),
                    ForBody::ColonDelimited(body) => {
                        self.lower_statements(body.statements.iter(), scope)
                    }
                }
            }
            Statement::Foreach(foreach) => {
                let source = self.lower_expr(foreach.expression, scope);
                let body_span = foreach.body.span();
                if let Expression::Variable(Variable::Direct(dv)) = foreach.target.value() {
                    self.out.assignments.push(AssignRecord {
                        scope,
                        name: dv.name.to_string(),
                        writer: Writer::Element { source },
                        offset: body_span.start.offset,
                    });
                }
                match &foreach.body {
                    ForeachBody::Statement(inner) => self.lower_statement(inner, scope),
                    ForeachBody::ColonDelimited(body) => {
                        self.lower_statements(body.statements.iter(), scope)
                    }
                }
            }
            Statement::Try(try_stmt) => {
                self.lower_statements(try_stmt.block.statements.iter(), scope);
                for catch in try_stmt.catch_clauses.iter() {
                    self.lower_statements(catch.block.statements.iter(), scope);
                }
                if let Some(finally) = &try_stmt.finally_clause {
                    self.lower_statements(finally.block.statements.iter(), scope);
                }
            }
            Statement::Function(func) => {
                let name = func.name.value.to_string();
                let params = self.extract_params(&func.parameter_list);
                let body_span = (
                    func.body.left_brace.start.offset,
                    func.body.right_brace.end.offset,
                );
                let idx = self.out.functions.len();
                self.out.functions.push(Callable {
                    name,
                    params,
                    returns: Vec::new(),
                    is_abstract: false,
                });
                let inner = self
                    .out
                    .push_scope(Some(CallableId::Function(idx)), body_span);
                self.return_sinks.push(Vec::new());
                self.lower_statements(func.body.statements.iter(), inner);
                let returns = self.return_sinks.pop().unwrap_or_default();
                self.out.functions[idx].returns = returns;
            }
            Statement::Class(class) => {
                let class_name = class.name.value.to_string();
                let parent = class
                    .extends
                    .as_ref()
                    .and_then(|ext| ext.types.first().map(|ident| ident.value().to_string()));
                let interfaces: Vec<String> = class
                    .implements
                    .as_ref()
                    .map(|imp| {
                        imp.types
                            .iter()
                            .map(|ident| ident.value().to_string())
                            .collect()
                    })
                    .unwrap_or_default();
                let class_idx = self.out.classes.len();
                self.out.classes.push(ClassDecl {
                    name: class_name.clone(),
                    kind: ClassKind::Class,
                    parent,
                    interfaces,
                    methods: Vec::new(),
                    is_builtin: false,
                });
                self.class_stack.push(class_name);
                self.lower_members(class.members.iter(), class_idx, false);
                self.class_stack.pop();
            }
            Statement::Interface(iface) => {
                let iface_name = iface.name.value.to_string();
                let parent = iface
                    .extends
                    .as_ref()
                    .and_then(|ext| ext.types.first().map(|ident| ident.value().to_string()));
                let class_idx = self.out.classes.len();
                self.out.classes.push(ClassDecl {
                    name: iface_name.clone(),
                    kind: ClassKind::Interface,
                    parent,
                    interfaces: Vec::new(),
                    methods: Vec::new(),
                    is_builtin: false,
                });
                self.class_stack.push(iface_name);
                self.lower_members(iface.members.iter(), class_idx, true);
                self.class_stack.pop();
            }
            _ => {}
        }
    }

    /// Extract methods from a class-like body. `force_abstract` marks
    /// every member abstract regardless of body (interfaces).
    fn lower_members<'s>(
        &mut self,
        members: impl Iterator<Item = &'s ClassLikeMember<'s>>,
        class_idx: usize,
        force_abstract: bool,
    ) {
        for member in members {
            let ClassLikeMember::Method(method) = member else {
                continue;
            };
            let method_name = method.name.value.to_string();
            let params = self.extract_params(&method.parameter_list);
            let method_idx = self.out.classes[class_idx].methods.len();

            match &method.body {
                MethodBody::Concrete(block) if !force_abstract => {
                    let body_span = (block.left_brace.start.offset, block.right_brace.end.offset);
                    self.out.classes[class_idx].methods.push(Callable {
                        name: method_name,
                        params,
                        returns: Vec::new(),
                        is_abstract: false,
                    });
                    let inner = self.out.push_scope(
                        Some(CallableId::Method {
                            class: class_idx,
                            method: method_idx,
                        }),
                        body_span,
                    );
                    self.return_sinks.push(Vec::new());
                    self.lower_statements(block.statements.iter(), inner);
                    let returns = self.return_sinks.pop().unwrap_or_default();
                    self.out.classes[class_idx].methods[method_idx].returns = returns;
                }
                _ => {
                    self.out.classes[class_idx].methods.push(Callable {
                        name: method_name,
                        params,
                        returns: Vec::new(),
                        is_abstract: true,
                    });
                }
            }
        }
    }

    fn extract_params(&self, list: &FunctionLikeParameterList<'_>) -> Vec<Param> {
        list.parameters
            .iter()
            .map(|param| Param {
                name: param.variable.name.to_string(),
                hint: param.hint.as_ref().and_then(|h| hint_class(h)),
            })
            .collect()
    }

    fn lower_expr(&mut self, expr: &Expression<'_>, scope: ScopeId) -> NodeId {
        let span = (expr.span().start.offset, expr.span().end.offset);
        match expr {
            Expression::Literal(literal) => {
                let kind = self.literal_kind(literal, span);
                self.out.push_node(kind, scope, span)
            }
            Expression::Parenthesized(paren) => self.lower_expr(paren.expression, scope),
            Expression::Variable(Variable::Direct(dv)) => self.out.push_node(
                ExprKind::Var {
                    name: dv.name.to_string(),
                },
                scope,
                span,
            ),
            Expression::Array(arr) => self.lower_array(arr.elements.iter(), scope, span),
            Expression::LegacyArray(arr) => self.lower_array(arr.elements.iter(), scope, span),
            Expression::Assignment(assignment) => {
                let value = self.lower_expr(assignment.rhs, scope);

                if !assignment.operator.is_assign() {
                    // Compound assignment (`.=`, `+=`, `??=` …): the
                    // resulting value is not the bare right-hand side.
                    return self.out.push_node(ExprKind::Unknown, scope, span);
                }

                match assignment.lhs {
                    Expression::Variable(Variable::Direct(dv)) => {
                        self.out.assignments.push(AssignRecord {
                            scope,
                            name: dv.name.to_string(),
                            writer: Writer::Whole { value },
                            offset: span.0,
                        });
                    }
                    Expression::ArrayAccess(access) => {
                        if let Expression::Variable(Variable::Direct(dv)) = access.array {
                            let key = self.lower_expr(access.index, scope);
                            self.out.assignments.push(AssignRecord {
                                scope,
                                name: dv.name.to_string(),
                                writer: Writer::KeyWrite { key, value },
                                offset: span.0,
                            });
                        }
                    }
                    _ => {}
                }
                let id = self.out.push_node(ExprKind::Assign { value }, scope, span);
                self.attach(id, &[value]);
                id
            }
            Expression::Binary(binary) => {
                let lhs = self.lower_expr(binary.lhs, scope);
                let rhs = self.lower_expr(binary.rhs, scope);
                let kind = if binary.operator.is_null_coalesce() {
                    BinaryKind::Coalesce
                } else {
                    classify_operator(self.slice_between(
                        binary.lhs.span().end.offset,
                        binary.rhs.span().start.offset,
                    ))
                };
                let id = self
                    .out
                    .push_node(ExprKind::Binary { kind, lhs, rhs }, scope, span);
                self.attach(id, &[lhs, rhs]);
                id
            }
            Expression::Conditional(conditional) => {
                let condition = self.lower_expr(conditional.condition, scope);
                let then = conditional.then.map(|branch| self.lower_expr(branch, scope));
                let otherwise = self.lower_expr(conditional.r#else, scope);
                let id = self.out.push_node(
                    ExprKind::Ternary {
                        condition,
                        then,
                        otherwise,
                    },
                    scope,
                    span,
                );
                self.attach(id, &[condition, otherwise]);
                if let Some(branch) = then {
                    self.attach(id, &[branch]);
                }
                id
            }
            Expression::ArrayAccess(access) => {
                let base = self.lower_expr(access.array, scope);
                let index = self.lower_expr(access.index, scope);
                let id = self
                    .out
                    .push_node(ExprKind::ArrayAccess { base, index }, scope, span);
                self.attach(id, &[base, index]);
                id
            }
            Expression::Call(call) => self.lower_call(call, scope, span),
            Expression::Instantiation(inst) => {
                let class_name = match inst.class {
                    Expression::Identifier(ident) => Some(ident.value().to_string()),
                    Expression::Self_(_) | Expression::Static(_) => {
                        self.class_stack.last().cloned()
                    }
                    _ => None,
                };
                let args = match &inst.argument_list {
                    Some(list) => self.lower_args(list.arguments.iter(), scope),
                    None => Vec::new(),
                };
                let id = match class_name {
                    Some(class) => self.out.push_node(
                        ExprKind::New {
                            class,
                            args: args.clone(),
                        },
                        scope,
                        span,
                    ),
                    None => self.out.push_node(ExprKind::Unknown, scope, span),
                };
                self.attach(id, &args);
                id
            }
            Expression::Closure(closure) => {
                let body_span = (
                    closure.body.left_brace.start.offset,
                    closure.body.right_brace.end.offset,
                );
                let params = self.extract_params(&closure.parameter_list);
                let idx = self.out.closures.len();
                self.out.closures.push(Callable {
                    name: format!("{{closure#{idx}}}"),
                    params,
                    returns: Vec::new(),
                    is_abstract: false,
                });
                let inner = self
                    .out
                    .push_scope(Some(CallableId::Closure(idx)), body_span);
                self.return_sinks.push(Vec::new());
                self.lower_statements(closure.body.statements.iter(), inner);
                let returns = self.return_sinks.pop().unwrap_or_default();
                self.out.closures[idx].returns = returns;
                self.out.push_node(ExprKind::Closure { id: idx }, scope, span)
            }
            Expression::ArrowFunction(arrow) => {
                let params = self.extract_params(&arrow.parameter_list);
                let idx = self.out.closures.len();
                self.out.closures.push(Callable {
                    name: format!("{{closure#{idx}}}"),
                    params,
                    returns: Vec::new(),
                    is_abstract: false,
                });
                let inner = self.out.push_scope(Some(CallableId::Closure(idx)), span);
                let body = self.lower_expr(arrow.expression, inner);
                self.out.closures[idx].returns = vec![body];
                self.out.push_node(ExprKind::Closure { id: idx }, scope, span)
            }
            Expression::UnaryPrefix(unary) => {
                self.lower_expr(unary.operand, scope);
                self.out.push_node(ExprKind::Unknown, scope, span)
            }
            _ => self.out.push_node(ExprKind::Unknown, scope, span),
        }
    }

    fn literal_kind(&self, literal: &Literal<'_>, span: (u32, u32)) -> ExprKind {
        match literal {
            Literal::String(lit_str) => {
                let value = lit_str
                    .value
                    .map(str::to_string)
                    .unwrap_or_else(|| strip_quotes(lit_str.raw));
                ExprKind::StringLit(value)
            }
            Literal::Integer(lit_int) => {
                let digits = lit_int.raw.replace('_', "");
                ExprKind::IntLit(digits.parse::<i64>().unwrap_or(0))
            }
            _ => {
                // Keyword and float literals, classified from the source
                // text so we stay independent of their node payloads.
                let text = self.slice(span).trim().to_string();
                if text.eq_ignore_ascii_case("true") {
                    ExprKind::BoolLit(true)
                } else if text.eq_ignore_ascii_case("false") {
                    ExprKind::BoolLit(false)
                } else if text.eq_ignore_ascii_case("null") {
                    ExprKind::NullLit
                } else if let Ok(value) = text.replace('_', "").parse::<f64>() {
                    ExprKind::FloatLit(value)
                } else {
                    ExprKind::Unknown
                }
            }
        }
    }

    fn lower_call(&mut self, call: &Call<'_>, scope: ScopeId, span: (u32, u32)) -> NodeId {
        match call {
            Call::Function(func_call) => {
                let args = self.lower_args(func_call.argument_list.arguments.iter(), scope);
                let (callee, callee_node) = match func_call.function {
                    Expression::Identifier(ident) => {
                        (Callee::Named(ident.value().to_string()), None)
                    }
                    other => {
                        let node = self.lower_expr(other, scope);
                        (Callee::Dynamic(node), Some(node))
                    }
                };
                let id = self.out.push_node(
                    ExprKind::FuncCall {
                        callee,
                        args: args.clone(),
                    },
                    scope,
                    span,
                );
                self.attach(id, &args);
                if let Some(node) = callee_node {
                    self.attach(id, &[node]);
                }
                id
            }
            Call::Method(method_call) => {
                let receiver = self.lower_expr(method_call.object, scope);
                let args = self.lower_args(method_call.argument_list.arguments.iter(), scope);
                self.finish_method_call(receiver, &method_call.method, args, scope, span)
            }
            Call::NullSafeMethod(method_call) => {
                let receiver = self.lower_expr(method_call.object, scope);
                let args = self.lower_args(method_call.argument_list.arguments.iter(), scope);
                self.finish_method_call(receiver, &method_call.method, args, scope, span)
            }
            Call::StaticMethod(static_call) => {
                let class_name = match static_call.class {
                    Expression::Identifier(ident) => Some(ident.value().to_string()),
                    Expression::Self_(_) | Expression::Static(_) => {
                        self.class_stack.last().cloned()
                    }
                    _ => None,
                };
                let method = selector_name(&static_call.method);
                let args = self.lower_args(static_call.argument_list.arguments.iter(), scope);
                let id = match (class_name, method) {
                    (Some(class), Some(method)) => self.out.push_node(
                        ExprKind::StaticCall {
                            class,
                            method,
                            args: args.clone(),
                        },
                        scope,
                        span,
                    ),
                    _ => self.out.push_node(ExprKind::Unknown, scope, span),
                };
                self.attach(id, &args);
                id
            }
            _ => self.out.push_node(ExprKind::Unknown, scope, span),
        }
    }

    fn finish_method_call(
        &mut self,
        receiver: NodeId,
        selector: &ClassLikeMemberSelector<'_>,
        args: Vec<NodeId>,
        scope: ScopeId,
        span: (u32, u32),
    ) -> NodeId {
        let id = match selector_name(selector) {
            Some(method) => self.out.push_node(
                ExprKind::MethodCall {
                    receiver,
                    method,
                    args: args.clone(),
                },
                scope,
                span,
            ),
            None => self.out.push_node(ExprKind::Unknown, scope, span),
        };
        self.attach(id, &[receiver]);
        self.attach(id, &args);
        id
    }

    fn lower_args<'s>(
        &mut self,
        arguments: impl Iterator<Item = &'s Argument<'s>>,
        scope: ScopeId,
    ) -> Vec<NodeId> {
        arguments
            .map(|argument| {
                let value = match argument {
                    Argument::Positional(positional) => positional.value,
                    Argument::Named(named) => named.value,
                };
                self.lower_expr(value, scope)
            })
            .collect()
    }

    fn lower_array<'s>(
        &mut self,
        elements: impl Iterator<Item = &'s ArrayElement<'s>>,
        scope: ScopeId,
        span: (u32, u32),
    ) -> NodeId {
        let mut items: Vec<ArrayItem> = Vec::new();
        let mut floor = span.0;
        let mut children: Vec<NodeId> = Vec::new();

        for element in elements {
            match element {
                ArrayElement::KeyValue(kv) => {
                    let comments = self.comments_before(kv.key.span().start.offset, floor);
                    let key = self.lower_expr(kv.key, scope);
                    let value = self.lower_expr(kv.value, scope);
                    floor = kv.value.span().end.offset;
                    children.push(key);
                    children.push(value);
                    items.push(ArrayItem {
                        key: Some(key),
                        value,
                        comments,
                    });
                }
                ArrayElement::Value(v) => {
                    let comments = self.comments_before(v.value.span().start.offset, floor);
                    let value = self.lower_expr(v.value, scope);
                    floor = v.value.span().end.offset;
                    children.push(value);
                    items.push(ArrayItem {
                        key: None,
                        value,
                        comments,
                    });
                }
                ArrayElement::Variadic(v) => {
                    // Spread contents are not tracked; lower for side
                    // effects (nested assignments) only.
                    self.lower_expr(v.value, scope);
                    floor = v.value.span().end.offset;
                }
                ArrayElement::Missing(_) => {}
            }
        }

        let id = self
            .out
            .push_node(ExprKind::ArrayLit { elements: items }, scope, span);
        self.attach(id, &children);
        id
    }

    /// Comment lines directly above `start`, not reaching back past
    /// `floor`, with only whitespace between them and the element.
    fn comments_before(&self, start: u32, floor: u32) -> Vec<String> {
        let candidate = self
            .trivias
            .partition_point(|t| t.span.start.offset < start);
        let bytes = self.content.as_bytes();
        let mut covered = start;
        let mut collected: Vec<String> = Vec::new();

        for i in (0..candidate).rev() {
            let trivia = &self.trivias[i];
            if trivia.span.start.offset < floor {
                break;
            }
            let gap = bytes
                .get(trivia.span.end.offset as usize..covered as usize)
                .unwrap_or(&[]);
            if !gap.iter().all(u8::is_ascii_whitespace) {
                break;
            }
            match trivia.kind {
                TriviaKind::SingleLineComment
                | TriviaKind::MultiLineComment
                | TriviaKind::DocBlockComment
                | TriviaKind::HashComment => {
                    let cleaned = clean_comment(trivia.value);
                    if !cleaned.is_empty() {
                        collected.push(cleaned);
                    }
                    covered = trivia.span.start.offset;
                }
                TriviaKind::WhiteSpace => {
                    covered = trivia.span.start.offset;
                }
            }
        }

        collected.reverse();
        collected
    }

    fn attach(&mut self, parent: NodeId, children: &[NodeId]) {
        for &child in children {
            self.out.set_parent(child, parent);
        }
    }

    fn slice(&self, span: (u32, u32)) -> &str {
        self.content
            .get(span.0 as usize..span.1 as usize)
            .unwrap_or("")
    }

    fn slice_between(&self, start: u32, end: u32) -> &str {
        self.content.get(start as usize..end as usize).unwrap_or("")
    }
}

/// Member selector → plain method name; dynamic selectors stay opaque.
fn selector_name(selector: &ClassLikeMemberSelector<'_>) -> Option<String> {
    match selector {
        ClassLikeMemberSelector::Identifier(ident) => Some(ident.value.to_string()),
        _ => None,
    }
}

/// Class-like name of a parameter type hint, unwrapping nullability.
/// Scalar and compound hints carry no class information for us.
fn hint_class(hint: &Hint<'_>) -> Option<String> {
    match hint {
        Hint::Identifier(ident) => Some(ident.value().to_string()),
        Hint::Nullable(nullable) => hint_class(nullable.hint),
        _ => None,
    }
}

/// The operator token sits between the two operand spans; recovering it
/// from the source slice keeps us independent of operator node payloads.
fn classify_operator(token: &str) -> BinaryKind {
    let token = token.trim();
    match token {
        "." => BinaryKind::Concat,
        "+" | "-" | "*" | "/" | "%" | "**" => BinaryKind::Arithmetic,
        "??" => BinaryKind::Coalesce,
        "==" | "===" | "!=" | "!==" | "<>" | "<" | ">" | "<=" | ">=" | "<=>" => BinaryKind::Bool,
        "&&" | "||" => BinaryKind::Bool,
        _ if token.eq_ignore_ascii_case("and")
            || token.eq_ignore_ascii_case("or")
            || token.eq_ignore_ascii_case("xor") =>
        {
            BinaryKind::Bool
        }
        _ => BinaryKind::Other,
    }
}

fn strip_quotes(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2
        && (trimmed.starts_with('\'') || trimmed.starts_with('"'))
        && trimmed.ends_with(trimmed.chars().next().unwrap_or('\''))
    {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Strip comment markers and collapse a comment to one line of prose.
fn clean_comment(raw: &str) -> String {
    let text = raw.trim();
    let text = text
        .strip_prefix("/**")
        .or_else(|| text.strip_prefix("/*"))
        .map(|t| t.strip_suffix("*/").unwrap_or(t))
        .unwrap_or(text);
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        let line = line
            .strip_prefix("//")
            .or_else(|| line.strip_prefix('#'))
            .or_else(|| line.strip_prefix('*'))
            .unwrap_or(line)
            .trim();
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_classification() {
        assert_eq!(classify_operator(" . "), BinaryKind::Concat);
        assert_eq!(classify_operator("+"), BinaryKind::Arithmetic);
        assert_eq!(classify_operator("??"), BinaryKind::Coalesce);
        assert_eq!(classify_operator("==="), BinaryKind::Bool);
        assert_eq!(classify_operator("instanceof"), BinaryKind::Other);
    }

    #[test]
    fn comment_markers_are_stripped() {
        assert_eq!(clean_comment("// database host"), "database host");
        assert_eq!(clean_comment("# legacy note"), "legacy note");
        assert_eq!(
            clean_comment("/** the user's\n * display name */"),
            "the user's display name"
        );
    }

    #[test]
    fn quotes_are_stripped_from_raw_literals() {
        assert_eq!(strip_quotes("'host'"), "host");
        assert_eq!(strip_quotes("\"host\""), "host");
        assert_eq!(strip_quotes("host"), "host");
    }

    #[test]
    fn builtin_stubs_are_installed() {
        let program = parse_program("<?php\n$x = 1;\n");
        assert!(program.class_named("PDO").is_some());
        assert!(program.class_named("PDOStatement").is_some());
    }
}
