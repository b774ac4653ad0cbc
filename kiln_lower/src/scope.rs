//! C4 Bridge Scope: lexical variable scoping plus the loop-label stack.
//!
//! Grounded on `ori_llvm::codegen::scope::Scope` (name → stack-slot binding)
//! and `ori_arc::lower::scope::ArcScope` (declaration-order tracking for
//! scope-exit processing) — here declaration order drives reverse-order
//! `__defer__` invocation (spec §4.7) rather than SSA phi-merge.

use kiln_ir::ir::{SlotId, TypeId};
use kiln_ir::{Name, Span};

bitflags::bitflags! {
    /// Traits governing a bridge variable's construction/destruction protocol
    /// (spec §4.7).
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct VarTraits: u8 {
        /// No constructor/destructor/assignment protocol applies.
        const POD       = 1 << 0;
        /// Deinitialized at program exit rather than scope exit.
        const STATIC    = 1 << 1;
        /// Skip zero-initialization on declaration.
        const UNDEF     = 1 << 2;
        /// Bound, not owned — never destructed (e.g. an `each-in` element).
        const REFERENCE = 1 << 3;
    }
}

impl VarTraits {
    /// Whether a variable with these traits is deferred to scope exit at all
    /// (POD and REFERENCE variables never run `__defer__`).
    #[must_use]
    pub fn needs_defer(self) -> bool {
        !self.intersects(VarTraits::POD | VarTraits::REFERENCE)
    }
}

#[derive(Clone, Debug)]
pub struct BridgeVar {
    pub name: Name,
    pub slot: SlotId,
    pub ty: TypeId,
    pub traits: VarTraits,
    pub span: Span,
}

/// One lexical block's declarations, in declaration order.
#[derive(Clone, Debug, Default)]
struct ScopeFrame {
    vars: Vec<BridgeVar>,
}

/// A stack of lexical scopes plus the name→slot lookup index.
///
/// Lookup walks innermost-to-outermost, matching spec §4.1's "current
/// namespace first" shadowing rule at the statement-block level.
#[derive(Clone, Debug, Default)]
pub struct BridgeScope {
    frames: Vec<ScopeFrame>,
}

impl BridgeScope {
    #[must_use]
    pub fn new() -> Self {
        Self { frames: vec![ScopeFrame::default()] }
    }

    pub fn enter(&mut self) {
        self.frames.push(ScopeFrame::default());
    }

    /// Leave the innermost scope, returning its declarations in reverse
    /// declaration order — the order `__defer__` must run in (spec §4.7).
    #[must_use]
    pub fn exit(&mut self) -> Vec<BridgeVar> {
        let mut frame = self.frames.pop().expect("exit without matching enter");
        frame.vars.reverse();
        frame.vars
    }

    pub fn declare(&mut self, var: BridgeVar) {
        self.frames
            .last_mut()
            .expect("at least one scope is always open")
            .vars
            .push(var);
    }

    #[must_use]
    pub fn lookup(&self, name: Name) -> Option<&BridgeVar> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.vars.iter().rev().find(|v| v.name == name))
    }

    /// Whether `name` is already declared in the innermost scope only —
    /// unlike `lookup`, does not walk outer frames, since shadowing an
    /// outer declaration is legal and only same-scope redeclaration is a
    /// `DuplicateDeclaration` error (spec §4.3).
    #[must_use]
    pub fn already_in_list(&self, name: Name) -> bool {
        self.frames.last().is_some_and(|frame| frame.vars.iter().any(|v| v.name == name))
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Declarations in every frame deeper than `depth`, innermost and
    /// most-recently-declared first — the order a `break`/`continue`/
    /// `return` jumping out of multiple lexical scopes at once must run
    /// `__defer__` in. Unlike `exit`, this does not close the frames: the
    /// scopes are still structurally open and will be popped normally by
    /// their owning `lower_block` call once lowering returns to it.
    #[must_use]
    pub fn vars_above(&self, depth: usize) -> Vec<BridgeVar> {
        self.frames[depth..]
            .iter()
            .rev()
            .flat_map(|frame| frame.vars.iter().rev().cloned())
            .collect()
    }
}

/// One enclosing loop's (or switch's) jump targets, for break/continue/
/// fallthrough and their labeled forms (spec §4.6).
#[derive(Clone, Copy, Debug)]
pub struct LoopFrame {
    pub label: Option<Name>,
    pub break_target: kiln_ir::ir::BlockId,
    pub continue_target: kiln_ir::ir::BlockId,
    /// `BridgeScope` depth when this loop was entered, so `break`/`continue`
    /// know how many scopes' defer lists to run before jumping.
    pub owning_scope_depth: usize,
}

/// Stack of enclosing loops, innermost last. A bare `break`/`continue`
/// targets the top frame; a labeled one searches from the top down.
#[derive(Clone, Debug, Default)]
pub struct LoopStack {
    frames: Vec<LoopFrame>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LoopLookupError {
    /// No enclosing loop at all (bare `break`/`continue` outside a loop).
    NotInLoop,
    /// A label was given but no enclosing loop carries it.
    UnknownLabel,
}

impl LoopStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: LoopFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<LoopFrame> {
        self.frames.pop()
    }

    /// Resolve a `break`/`continue` target: innermost loop if `label` is
    /// `None`, else the innermost loop carrying that label.
    pub fn resolve(&self, label: Option<Name>) -> Result<LoopFrame, LoopLookupError> {
        match label {
            None => self.frames.last().copied().ok_or(LoopLookupError::NotInLoop),
            Some(name) => self
                .frames
                .iter()
                .rev()
                .find(|f| f.label == Some(name))
                .copied()
                .ok_or(LoopLookupError::UnknownLabel),
        }
    }
}

/// Saved fallthrough target around one `switch` case body, so a nested
/// `switch` can maintain its own `fallthrough` target without losing the
/// enclosing one (spec §4.6 "fallthrough context save/restore").
#[derive(Clone, Debug, Default)]
pub struct FallthroughStack {
    targets: Vec<kiln_ir::ir::BlockId>,
}

impl FallthroughStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, target: kiln_ir::ir::BlockId) {
        self.targets.push(target);
    }

    pub fn pop(&mut self) {
        self.targets.pop();
    }

    #[must_use]
    pub fn current(&self) -> Option<kiln_ir::ir::BlockId> {
        self.targets.last().copied()
    }
}
