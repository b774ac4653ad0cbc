//! IR functions and stack-variable slots.

use super::block::{BlockId, IrBlock};
use super::types::TypeId;
use super::value::SlotId;
use crate::Name;

#[derive(Clone, Debug)]
pub struct VarSlot {
    pub name: Name,
    pub ty: TypeId,
}

#[derive(Clone, Debug)]
pub struct IrFunction {
    pub name: Name,
    pub param_types: Vec<TypeId>,
    pub return_type: TypeId,
    pub blocks: Vec<IrBlock>,
    /// Stack-variable slot table; contiguous and unique per spec §3 invariant 4.
    pub slots: Vec<VarSlot>,
}

impl IrFunction {
    #[must_use]
    pub fn new(name: Name, param_types: Vec<TypeId>, return_type: TypeId) -> Self {
        Self {
            name,
            param_types,
            return_type,
            // Block 0 is the `BlockId::NONE` sentinel; real blocks start at index 1.
            blocks: vec![IrBlock::default()],
            slots: Vec::new(),
        }
    }

    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId::new(u32::try_from(self.blocks.len()).expect("block count overflow"));
        self.blocks.push(IrBlock::default());
        id
    }

    #[must_use]
    pub fn block(&self, id: BlockId) -> &IrBlock {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut IrBlock {
        &mut self.blocks[id.index()]
    }

    pub fn push_slot(&mut self, name: Name, ty: TypeId) -> SlotId {
        let index = u32::try_from(self.slots.len()).expect("slot count overflow");
        self.slots.push(VarSlot { name, ty });
        SlotId(index)
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
