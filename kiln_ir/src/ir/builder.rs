//! The C5 IR Builder: appends typed instructions to a current basic block.
//!
//! Modeled on `ori_llvm::codegen::ir_builder` (ID-based, no raw pointers)
//! and `ori_arc::ir`'s basic-block shape, but free of any LLVM/inkwell
//! dependency — the core only produces the structured IR contract handed
//! to a backend (out of scope, spec §1).

use thiserror::Error;
use tracing::trace;

use super::block::{BlockId, Terminator};
use super::function::IrFunction;
use super::instr::{InstrId, InstrKind, MathOp};
use super::types::TypeId;
use super::value::{IrValue, LitValue, SlotId, ValueKind};
use crate::{Name, Span};

#[derive(Debug, Error, Eq, PartialEq)]
pub enum BuilderError {
    #[error("no current block is set")]
    NoCurrentBlock,
    #[error("cannot append to a terminated block")]
    BlockAlreadyTerminated,
}

/// Appends instructions to the current block of one `IrFunction`.
///
/// Borrows the function for the builder's lifetime; lowering creates a
/// fresh `IrBuilder` per function body (spec §5: one compilation advances
/// one AST through one IR module, single-threaded).
pub struct IrBuilder<'f> {
    function: &'f mut IrFunction,
    current_block: Option<BlockId>,
}

impl<'f> IrBuilder<'f> {
    #[must_use]
    pub fn new(function: &'f mut IrFunction) -> Self {
        Self {
            function,
            current_block: None,
        }
    }

    #[must_use]
    pub fn current_block_id(&self) -> Option<BlockId> {
        self.current_block
    }

    pub fn new_block(&mut self) -> BlockId {
        self.function.new_block()
    }

    pub fn use_block(&mut self, id: BlockId) {
        trace!(block = id.index(), "switching current block");
        self.current_block = Some(id);
    }

    #[must_use]
    pub fn is_current_block_terminated(&self) -> bool {
        self.current_block
            .is_some_and(|id| self.function.block(id).is_terminated())
    }

    fn append_raw(
        &mut self,
        kind: InstrKind,
        result_type: Option<TypeId>,
        span: Option<Span>,
    ) -> Result<Option<IrValue>, BuilderError> {
        let block_id = self.current_block.ok_or(BuilderError::NoCurrentBlock)?;
        let block = self.function.block_mut(block_id);
        if block.is_terminated() {
            return Err(BuilderError::BlockAlreadyTerminated);
        }
        let instr_index = block.instrs.len();
        block.instrs.push(super::instr::IrInstr {
            kind,
            result_type,
            span,
        });
        Ok(result_type.map(|ty| {
            IrValue::new(
                ValueKind::Result {
                    block: block_id,
                    instr: InstrId::new(u32::try_from(instr_index).expect("instr count overflow")),
                },
                ty,
            )
        }))
    }

    pub fn append(
        &mut self,
        kind: InstrKind,
        result_type: Option<TypeId>,
        span: Option<Span>,
    ) -> Result<Option<IrValue>, BuilderError> {
        self.append_raw(kind, result_type, span)
    }

    fn terminate(&mut self, terminator: Terminator) -> Result<(), BuilderError> {
        let block_id = self.current_block.ok_or(BuilderError::NoCurrentBlock)?;
        let block = self.function.block_mut(block_id);
        if block.is_terminated() {
            return Err(BuilderError::BlockAlreadyTerminated);
        }
        block.terminator = Some(terminator);
        Ok(())
    }

    pub fn terminate_jmp(&mut self, target: BlockId) -> Result<(), BuilderError> {
        self.terminate(Terminator::Jump(target))
    }

    pub fn terminate_cond(
        &mut self,
        cond: IrValue,
        if_true: BlockId,
        if_false: BlockId,
    ) -> Result<(), BuilderError> {
        self.terminate(Terminator::CondBranch {
            cond,
            if_true,
            if_false,
        })
    }

    pub fn terminate_switch(
        &mut self,
        scrutinee: IrValue,
        cases: Vec<(i64, BlockId)>,
        default: BlockId,
    ) -> Result<(), BuilderError> {
        self.terminate(Terminator::Switch {
            scrutinee,
            cases,
            default,
        })
    }

    pub fn terminate_return(&mut self, value: Option<IrValue>) -> Result<(), BuilderError> {
        self.terminate(Terminator::Return(value))
    }

    // -- Value constructors --
    //
    // These take an explicit `TypeId` from the module's `TypeInterner`
    // (width-keyed primitive types live on the module, not the function).

    #[must_use]
    pub fn literal_int(value: i64, ty: TypeId) -> IrValue {
        IrValue::new(ValueKind::Literal(LitValue::Int(value)), ty)
    }

    #[must_use]
    pub fn literal_usize(value: u64, usize_ty: TypeId) -> IrValue {
        IrValue::new(ValueKind::Literal(LitValue::UInt(value)), usize_ty)
    }

    #[must_use]
    pub fn literal_bool(value: bool, bool_ty: TypeId) -> IrValue {
        IrValue::new(ValueKind::Literal(LitValue::Bool(value)), bool_ty)
    }

    pub fn alloc(
        &mut self,
        ty: TypeId,
        pointer_ty: TypeId,
        span: Span,
    ) -> Result<IrValue, BuilderError> {
        Ok(self
            .append(InstrKind::Alloc { ty }, Some(pointer_ty), Some(span))?
            .expect("Alloc always produces a result"))
    }

    pub fn stack_save(&mut self, marker_ty: TypeId) -> Result<IrValue, BuilderError> {
        Ok(self
            .append(InstrKind::StackSave, Some(marker_ty), None)?
            .expect("StackSave always produces a result"))
    }

    pub fn stack_restore(&mut self, marker: IrValue) -> Result<(), BuilderError> {
        self.append(InstrKind::StackRestore { marker }, None, None)?;
        Ok(())
    }

    pub fn bitcast(&mut self, value: IrValue, to: TypeId) -> Result<IrValue, BuilderError> {
        Ok(self
            .append(InstrKind::Bitcast { value, to }, Some(to), None)?
            .expect("Bitcast always produces a result"))
    }

    pub fn load(&mut self, ptr: IrValue, pointee_ty: TypeId) -> Result<IrValue, BuilderError> {
        Ok(self
            .append(InstrKind::Load { ptr }, Some(pointee_ty), None)?
            .expect("Load always produces a result"))
    }

    pub fn store(&mut self, ptr: IrValue, value: IrValue) -> Result<(), BuilderError> {
        self.append(InstrKind::Store { ptr, value }, None, None)?;
        Ok(())
    }

    pub fn array_access(
        &mut self,
        base: IrValue,
        index: IrValue,
        element_pointer_ty: TypeId,
    ) -> Result<IrValue, BuilderError> {
        Ok(self
            .append(
                InstrKind::ArrayAccess { base, index },
                Some(element_pointer_ty),
                None,
            )?
            .expect("ArrayAccess always produces a result"))
    }

    pub fn field_access(
        &mut self,
        base: IrValue,
        field_index: u32,
        field_pointer_ty: TypeId,
    ) -> Result<IrValue, BuilderError> {
        Ok(self
            .append(
                InstrKind::FieldAccess { base, field_index },
                Some(field_pointer_ty),
                None,
            )?
            .expect("FieldAccess always produces a result"))
    }

    pub fn math(
        &mut self,
        op: MathOp,
        lhs: IrValue,
        rhs: IrValue,
        result_ty: TypeId,
        span: Span,
    ) -> Result<IrValue, BuilderError> {
        Ok(self
            .append(InstrKind::Math { op, lhs, rhs }, Some(result_ty), Some(span))?
            .expect("Math always produces a result"))
    }

    pub fn call(
        &mut self,
        callee: Name,
        args: Vec<IrValue>,
        return_ty: Option<TypeId>,
        span: Span,
    ) -> Result<Option<IrValue>, BuilderError> {
        self.append(InstrKind::Call { callee, args }, return_ty, Some(span))
    }

    pub fn zero_init(&mut self, ty: TypeId) -> Result<IrValue, BuilderError> {
        Ok(self
            .append(InstrKind::ZeroInit { ty }, Some(ty), None)?
            .expect("ZeroInit always produces a result"))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn llvm_asm(
        &mut self,
        assembly: Name,
        constraints: Name,
        args: Vec<IrValue>,
        side_effects: bool,
        intel_syntax: bool,
        align_stack: bool,
        result_ty: Option<TypeId>,
        span: Span,
    ) -> Result<Option<IrValue>, BuilderError> {
        self.append(
            InstrKind::LlvmAsm {
                assembly,
                constraints,
                args,
                side_effects,
                intel_syntax,
                align_stack,
            },
            result_ty,
            Some(span),
        )
    }

    /// Create a two-incoming phi. Either incoming pair may carry a
    /// placeholder value (e.g. `IrValue::new(ValueKind::Literal(LitValue::Int(0)), ty)`)
    /// when the true value is not yet available; the caller is then
    /// responsible for recording an `IrModule` relocation and patching it
    /// via `IrModule::resolve_phi` before the module is handed to the
    /// backend (spec §4.4, §9).
    pub fn phi2(
        &mut self,
        ty: TypeId,
        incoming_a: (IrValue, BlockId),
        incoming_b: (IrValue, BlockId),
    ) -> Result<(IrValue, InstrId), BuilderError> {
        let block_id = self.current_block.ok_or(BuilderError::NoCurrentBlock)?;
        let instr_index = self.function.block(block_id).instrs.len();
        let value = self
            .append(
                InstrKind::Phi2 {
                    incoming: [incoming_a, incoming_b],
                },
                Some(ty),
                None,
            )?
            .expect("Phi2 always produces a result");
        Ok((value, InstrId::new(u32::try_from(instr_index).expect("instr count overflow"))))
    }

    pub fn push_slot(&mut self, name: Name, ty: TypeId) -> SlotId {
        self.function.push_slot(name, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IntWidth, TypeInterner};

    fn new_function(interner: &TypeInterner) -> IrFunction {
        IrFunction::new(Name::from_raw(0), vec![], interner.int(IntWidth::S32))
    }

    #[test]
    fn appending_after_terminator_is_rejected() {
        let interner = TypeInterner::new();
        let mut function = new_function(&interner);
        let mut builder = IrBuilder::new(&mut function);
        let entry = builder.new_block();
        builder.use_block(entry);
        builder.terminate_return(None).unwrap();

        let err = builder
            .append(InstrKind::StackSave, None, None)
            .unwrap_err();
        assert_eq!(err, BuilderError::BlockAlreadyTerminated);
    }

    #[test]
    fn append_without_current_block_fails() {
        let interner = TypeInterner::new();
        let mut function = new_function(&interner);
        let mut builder = IrBuilder::new(&mut function);
        let err = builder
            .append(InstrKind::StackSave, None, None)
            .unwrap_err();
        assert_eq!(err, BuilderError::NoCurrentBlock);
    }

    #[test]
    fn math_appends_one_instruction_and_returns_its_result() {
        let interner = TypeInterner::new();
        let mut function = new_function(&interner);
        let i32_ty = interner.int(IntWidth::S32);
        let mut builder = IrBuilder::new(&mut function);
        let entry = builder.new_block();
        builder.use_block(entry);

        let lhs = IrBuilder::literal_int(2, i32_ty);
        let rhs = IrBuilder::literal_int(3, i32_ty);
        let sum = builder
            .math(MathOp::IAdd, lhs, rhs, i32_ty, Span::DUMMY)
            .unwrap();

        match sum.kind {
            ValueKind::Result { block, instr } => {
                assert_eq!(block, entry);
                assert_eq!(instr.index(), 0);
            }
            _ => panic!("expected a result value"),
        }
        assert_eq!(function.block(entry).instrs.len(), 1);
    }

    #[test]
    fn phi2_records_both_incoming_blocks() {
        let interner = TypeInterner::new();
        let mut function = new_function(&interner);
        let i32_ty = interner.int(IntWidth::S32);
        let mut builder = IrBuilder::new(&mut function);
        let a_block = builder.new_block();
        let b_block = builder.new_block();
        let merge = builder.new_block();
        builder.use_block(merge);

        let a = IrBuilder::literal_int(1, i32_ty);
        let b = IrBuilder::literal_int(2, i32_ty);
        let (phi_value, _instr) = builder
            .phi2(i32_ty, (a.clone(), a_block), (b.clone(), b_block))
            .unwrap();

        assert_eq!(phi_value.ty, i32_ty);
        let block = function.block(merge);
        assert!(matches!(
            block.instrs[0].kind,
            InstrKind::Phi2 { .. }
        ));
    }

    #[test]
    fn every_block_ends_with_exactly_one_terminator() {
        let interner = TypeInterner::new();
        let mut function = new_function(&interner);
        let mut builder = IrBuilder::new(&mut function);
        let entry = builder.new_block();
        builder.use_block(entry);
        builder.terminate_jmp(entry).unwrap();

        // A second terminate attempt must fail, preserving spec §3 invariant 1.
        let err = builder.terminate_jmp(entry).unwrap_err();
        assert_eq!(err, BuilderError::BlockAlreadyTerminated);
        assert!(function.block(entry).is_terminated());
    }
}
