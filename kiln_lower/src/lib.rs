//! AST-to-IR lowering core: type-driven expression/statement lowering
//! (C4-C8) over `kiln_ir`'s IR builder and `kiln_types`'s resolver and
//! conformance engine.

mod assign;
mod destructor;
mod error;
mod expr;
mod flags;
mod scope;
mod stmt;

pub use assign::{emit_assign, emit_init, AssignmentResolver};
pub use destructor::{
    emit_static_deinit, emit_static_deinit_in_declaration_order, run_scope_exit, DestructorResolver,
};
pub use error::LowerError;
pub use expr::{lower_condition, lower_expr, lower_lvalue, ExprCtx};
pub use flags::CompilerFlags;
pub use scope::{
    BridgeScope, BridgeVar, FallthroughStack, LoopFrame, LoopLookupError, LoopStack, VarTraits,
};
pub use stmt::{lower_block, StmtCtx, StmtState};
