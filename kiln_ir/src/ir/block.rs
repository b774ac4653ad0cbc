//! Basic blocks and terminators.

use super::instr::IrInstr;
use super::value::IrValue;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    /// Sentinel used by break/continue targets that have not been set by an
    /// enclosing loop (spec §3 invariant 6). Real blocks are allocated from
    /// index 1 upward so this never collides with a live block.
    pub const NONE: BlockId = BlockId(0);

    #[inline]
    pub const fn new(index: u32) -> Self {
        BlockId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_unset(self) -> bool {
        self.0 == 0
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum Terminator {
    Jump(BlockId),
    CondBranch {
        cond: IrValue,
        if_true: BlockId,
        if_false: BlockId,
    },
    Switch {
        scrutinee: IrValue,
        /// `(uniqueness value, target)` pairs, per spec §3 invariant 7.
        cases: Vec<(i64, BlockId)>,
        default: BlockId,
    },
    Return(Option<IrValue>),
}

/// An ordered sequence of instructions terminated by exactly one terminator
/// (spec §3 invariant 1). The type makes "no instruction follows the
/// terminator" true by construction: instructions only accumulate in
/// `instrs`, and `terminator` is set exactly once by `IrBuilder::terminate_*`.
#[derive(Clone, Debug, Default)]
pub struct IrBlock {
    pub instrs: Vec<IrInstr>,
    pub terminator: Option<Terminator>,
}

impl IrBlock {
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }
}
