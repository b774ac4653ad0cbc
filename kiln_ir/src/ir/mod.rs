//! The IR data model: C1 (IR Module & Pool) and C5 (IR Builder).

mod block;
mod builder;
mod function;
mod instr;
mod module;
mod types;
mod value;

pub use block::{BlockId, IrBlock, Terminator};
pub use builder::{BuilderError, IrBuilder};
pub use function::{IrFunction, VarSlot};
pub use instr::{FCmpOp, ICmpOp, InstrId, InstrKind, IrInstr, MathOp};
pub use module::{GlobalVar, IrModule, PhiRelocation, StaticVar};
pub use types::{FloatWidth, IntWidth, IrTypeData, TypeId, TypeInterner};
pub use value::{IrValue, LitValue, SlotId, ValueKind};
