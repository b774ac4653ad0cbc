//! AST and IR data types shared by the Kiln compiler's lowering core.
//!
//! - `Span`/`Name`/`StringInterner`: source locations and interned identifiers.
//! - `ast`: the rooted AST contract the core receives from the (out-of-scope)
//!   parser (spec §6).
//! - `ir`: the IR module, basic-block instructions, and the C5 IR builder
//!   the core emits through (spec §4.4).

pub mod ast;
pub mod ir;
mod name;
mod span;

pub use name::{Name, StringInterner};
pub use span::{ObjectIndex, SourceLocation, Span};
