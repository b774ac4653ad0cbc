//! Rooted AST types produced by the (out-of-scope) parser.
//!
//! The core never mutates these except to append synthesized nodes for
//! polymorphic instantiations through the type resolver (spec §6).

mod expr;
mod expr_id;
mod function;
mod module;
mod operators;
mod stmt;
mod types;

pub use expr::{Expr, ExprArena, ExprKind, Literal};
pub use expr_id::ExprId;
pub use function::{AstComposite, AstEnum, AstFunction, Field, FunctionTraits, Param};
pub use module::{AstModule, Namespace};
pub use operators::{BinaryOp, UnaryOp};
pub use stmt::{EachInSource, Stmt, StmtKind, SwitchCase};
pub use types::{AstType, TypeElem};
