//! Recursion contexts: one [`ExprCtx`] per node being resolved, one
//! [`CallFrame`] per callable entered.
//!
//! The parent links double as the cycle guard: the chain of ancestor
//! contexts *is* the ancestor-node set, and because it is made of plain
//! shared references, every recursion branch sees exactly its own path —
//! one branch detecting a cycle never affects its siblings.

use crate::session::Session;
use crate::types::{CallableId, NO_NODE, NodeId, TypeUnion};

/// Bound arguments for one callable entry.
///
/// Created by the call resolver when descending into a candidate's return
/// expressions; parameter references inside the body read from here by
/// position.
#[derive(Debug)]
pub struct CallFrame {
    pub callee: CallableId,
    pub args: Vec<TypeUnion>,
}

/// One node of the recursion tree.
pub struct ExprCtx<'a> {
    pub session: &'a Session<'a>,
    /// The node being resolved; [`NO_NODE`] for synthetic roots.
    pub node: NodeId,
    /// Remaining depth budget; 0 resolves to the empty union.
    pub depth_left: u16,
    /// Back-reference only — a child never outlives its parent.
    pub parent: Option<&'a ExprCtx<'a>>,
    /// Innermost call frame, if resolution is inside a callable body.
    pub frame: Option<&'a CallFrame>,
}

impl<'a> ExprCtx<'a> {
    /// Root context for resolving `node` with the session's full depth.
    pub fn root(session: &'a Session<'a>, node: NodeId) -> Self {
        ExprCtx {
            session,
            node,
            depth_left: session.max_depth(),
            parent: None,
            frame: None,
        }
    }

    /// Synthetic root for by-name resolution (completion requests),
    /// not tied to any real node.
    pub fn detached(session: &'a Session<'a>) -> Self {
        Self::root(session, NO_NODE)
    }

    /// Descend into a sub-expression: depth − 1, same frame.
    pub fn sub<'b>(&'b self, node: NodeId) -> ExprCtx<'b>
    where
        'a: 'b,
    {
        ExprCtx {
            session: self.session,
            node,
            depth_left: self.depth_left.saturating_sub(1),
            parent: Some(self),
            frame: self.frame,
        }
    }

    /// Sibling context at the same depth — used for a variable's writers,
    /// which are alternatives to this expression rather than parts of it.
    pub fn sibling<'b>(&'b self, node: NodeId) -> ExprCtx<'b>
    where
        'a: 'b,
    {
        ExprCtx {
            session: self.session,
            node,
            depth_left: self.depth_left,
            parent: Some(self),
            frame: self.frame,
        }
    }

    /// Enter a callable body at `node` with `frame` bound: depth − 1,
    /// frame replaced.
    pub fn enter_call<'b>(&'b self, node: NodeId, frame: &'b CallFrame) -> ExprCtx<'b>
    where
        'a: 'b,
    {
        ExprCtx {
            session: self.session,
            node,
            depth_left: self.depth_left.saturating_sub(1),
            parent: Some(self),
            frame: Some(frame),
        }
    }

    /// Whether `node` is already on this context's ancestor path
    /// (including this context itself). A hit means descending would
    /// re-enter an expression we are in the middle of resolving.
    pub fn in_ancestry(&self, node: NodeId) -> bool {
        if node == NO_NODE {
            return false;
        }
        let mut current = Some(self);
        while let Some(ctx) = current {
            if ctx.node == node {
                return true;
            }
            current = ctx.parent;
        }
        false
    }

    /// Bound argument union at `position` of the innermost frame.
    pub fn bound_arg(&self, position: usize) -> Option<&TypeUnion> {
        self.frame.and_then(|f| f.args.get(position))
    }
}
