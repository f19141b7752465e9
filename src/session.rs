//! Per-request resolution state: budgets, counters and the call memo.
//!
//! One [`Session`] lives for exactly one completion request. It owns the
//! global work ceilings and the only mutable state the engine touches
//! while recursing: the resolved-expression counter and the append-only
//! call memo table. Nothing survives across requests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::sql::SchemaProvider;
use crate::tree::Program;
use crate::types::{CallableId, NodeId, NO_NODE, TypeUnion};

/// Hard ceilings for one resolution request.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Total sub-expressions the request may resolve.
    pub max_expressions: u32,
    /// Recursion depth budget at the root context.
    pub max_depth: u16,
    /// Wall-clock budget for the whole request.
    pub timeout: Duration,
}

impl Limits {
    /// Profile for an explicit completion request.
    pub fn interactive() -> Self {
        Limits {
            max_expressions: 7500,
            max_depth: 55,
            timeout: Duration::from_millis(4000),
        }
    }

    /// Profile for passive auto-popup resolution; must never block typing.
    pub fn background() -> Self {
        Limits {
            max_expressions: 1500,
            max_depth: 5,
            timeout: Duration::from_millis(100),
        }
    }
}

/// Process state for one resolution request.
///
/// Not `Sync`: a session belongs to the single synchronous call stack
/// that created it. Two concurrent requests get two sessions and share
/// nothing.
pub struct Session<'p> {
    pub program: &'p Program,
    pub schema: &'p dyn SchemaProvider,
    limits: Limits,
    started: Instant,
    resolved: Cell<u32>,
    cancel: Option<Arc<AtomicBool>>,
    /// Memo for call resolution, keyed by (callee, structural argument
    /// signature). Append-only for the session lifetime.
    call_memo: RefCell<HashMap<(CallableId, String), TypeUnion>>,
    /// The expression the request is completing, for diagnostics.
    pub target: NodeId,
}

impl<'p> Session<'p> {
    pub fn new(program: &'p Program, schema: &'p dyn SchemaProvider, limits: Limits) -> Self {
        Session {
            program,
            schema,
            limits,
            started: Instant::now(),
            resolved: Cell::new(0),
            cancel: None,
            call_memo: RefCell::new(HashMap::new()),
            target: NO_NODE,
        }
    }

    /// Attach the node identity of the completion target.
    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target = target;
        self
    }

    /// Attach a host-owned cancellation flag, checked cooperatively at
    /// every resolution step.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Account for one sub-expression about to be resolved.
    ///
    /// Returns `false` once any ceiling is tripped — expression count,
    /// wall clock, or host cancellation. The resolver then stops
    /// recursing in that branch and returns the empty union: a soft
    /// degrade, never an error.
    pub fn try_step(&self) -> bool {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return false;
            }
        }
        let count = self.resolved.get() + 1;
        self.resolved.set(count);
        if count > self.limits.max_expressions {
            return false;
        }
        self.started.elapsed() < self.limits.timeout
    }

    /// How many sub-expressions this session has resolved so far.
    pub fn expressions_resolved(&self) -> u32 {
        self.resolved.get()
    }

    pub fn max_depth(&self) -> u16 {
        self.limits.max_depth
    }

    pub fn memo_get(&self, callee: CallableId, signature: &str) -> Option<TypeUnion> {
        self.call_memo
            .borrow()
            .get(&(callee, signature.to_string()))
            .cloned()
    }

    pub fn memo_put(&self, callee: CallableId, signature: String, result: TypeUnion) {
        self.call_memo
            .borrow_mut()
            .insert((callee, signature), result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::StaticSchema;

    #[test]
    fn counter_ceiling_soft_fails() {
        let program = Program::new();
        let schema = StaticSchema::default();
        let limits = Limits {
            max_expressions: 2,
            max_depth: 10,
            timeout: Duration::from_secs(10),
        };
        let session = Session::new(&program, &schema, limits);
        assert!(session.try_step());
        assert!(session.try_step());
        assert!(!session.try_step());
        assert_eq!(session.expressions_resolved(), 3);
    }

    #[test]
    fn cancellation_flag_stops_stepping() {
        let program = Program::new();
        let schema = StaticSchema::default();
        let flag = Arc::new(AtomicBool::new(false));
        let session =
            Session::new(&program, &schema, Limits::interactive()).with_cancel_flag(flag.clone());
        assert!(session.try_step());
        flag.store(true, Ordering::Relaxed);
        assert!(!session.try_step());
    }
}
