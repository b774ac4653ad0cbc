//! Statement AST.

use super::expr_id::ExprId;
use super::operators::BinaryOp;
use super::types::AstType;
use crate::{Name, Span};

#[derive(Clone, Debug)]
pub struct SwitchCase {
    /// Constant condition expression for this case.
    pub value: ExprId,
    pub body: Vec<Stmt>,
    /// `true` if the case body ends in `fallthrough`.
    pub fallthrough: bool,
    pub span: Span,
}

/// The three source forms `each in` can lower (spec §4.6): a fixed array or
/// a composite with `__length__`/`__array__` methods share a "list" syntax,
/// distinguished structurally once the list's type is known; the low-level
/// form gives the pointer and length directly.
#[derive(Clone, Debug)]
pub enum EachInSource {
    List(ExprId),
    LowLevel { array: ExprId, length: ExprId },
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    Return(Option<ExprId>),
    /// A call-like expression used as a statement; its value is discarded.
    ExprStmt(ExprId),
    Declare {
        name: Name,
        ty: Option<AstType>,
        init: Option<ExprId>,
        is_pod: bool,
        is_static: bool,
        is_undef: bool,
    },
    Assign {
        target: ExprId,
        value: ExprId,
        /// Skip the assignment-management protocol (`__assign__`) and store
        /// directly, even for a non-POD target (spec §4.8).
        is_pod: bool,
    },
    /// `target op= value`, e.g. `+=`.
    CompoundAssign {
        op: BinaryOp,
        target: ExprId,
        value: ExprId,
    },
    /// `if`/`unless` and their `-else` variants. `negate` is `true` for `unless`.
    If {
        cond: ExprId,
        negate: bool,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    /// `while`/`until`. `negate` is `true` for `until`.
    While {
        cond: ExprId,
        negate: bool,
        body: Vec<Stmt>,
        label: Option<Name>,
    },
    /// `each x in <iterable> { .. }`. `element_name` defaults to `it` at parse time.
    EachIn {
        element_name: Name,
        source: EachInSource,
        /// Declared element type, if the source syntax named one — checked
        /// against the iterable's actual element type (spec §4.6).
        it_type: Option<AstType>,
        is_static: bool,
        body: Vec<Stmt>,
        label: Option<Name>,
    },
    /// `repeat N { .. }`.
    Repeat {
        count: ExprId,
        body: Vec<Stmt>,
        label: Option<Name>,
    },
    Break(Option<Name>),
    Continue(Option<Name>),
    Fallthrough,
    Switch {
        cond: ExprId,
        is_exhaustive: bool,
        cases: Vec<SwitchCase>,
        default: Option<Vec<Stmt>>,
    },
    For {
        before: Vec<Stmt>,
        cond: Option<ExprId>,
        step: Vec<Stmt>,
        body: Vec<Stmt>,
        label: Option<Name>,
    },
    Delete(ExprId),
    LlvmAsm {
        assembly: Name,
        constraints: Name,
        args: Vec<ExprId>,
        side_effects: bool,
        intel_syntax: bool,
        align_stack: bool,
    },
    /// Handled during earlier inference; a no-op at the lowering stage.
    DeclareConstant,
}

#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}
