//! C8 Deferred-Destructor Protocol: scope-exit `__defer__` invocation.
//!
//! Grounded on the same call-emission path as everything else the builder
//! drives (`ori_llvm::codegen::ir_builder`'s `call` instruction) — the
//! protocol itself is pure bookkeeping over `BridgeScope::exit`'s
//! declaration-order list (spec §4.7).

use kiln_ir::ir::{IrBuilder, TypeId};
use kiln_ir::ir::{IrValue, ValueKind};
use kiln_ir::Name;

use crate::error::LowerError;
use crate::scope::{BridgeVar, VarTraits};

/// Resolves a composite `TypeId` to its `__defer__` (destructor) function,
/// if one was generated for it. Implemented by the caller, which owns the
/// composite/method registry (spec §4.7's autogen step happens upstream of
/// this protocol).
pub trait DestructorResolver {
    /// Returns the defer function's name and the pointer-to-`ty` parameter
    /// type its single argument expects.
    fn defer_fn(&self, ty: TypeId) -> Option<(Name, TypeId)>;
}

fn emit_defer_call(
    builder: &mut IrBuilder<'_>,
    destructors: &dyn DestructorResolver,
    var: &BridgeVar,
) -> Result<(), LowerError> {
    if let Some((defer_name, ptr_ty)) = destructors.defer_fn(var.ty) {
        let ptr = IrValue::new(ValueKind::Local(var.slot), ptr_ty);
        builder.call(defer_name, vec![ptr], None, var.span)?;
    }
    Ok(())
}

/// Run `__defer__` for one scope's declarations, already in reverse
/// declaration order (the order `BridgeScope::exit` returns them in).
///
/// `POD` and `REFERENCE` variables are skipped outright. `STATIC`
/// variables are *not* destructed here — they are appended to
/// `deferred_statics` for `emit_static_deinit` to process once, at
/// program exit, instead of at every scope exit.
pub fn run_scope_exit(
    builder: &mut IrBuilder<'_>,
    destructors: &dyn DestructorResolver,
    deferred_statics: &mut Vec<BridgeVar>,
    vars: Vec<BridgeVar>,
) -> Result<(), LowerError> {
    for var in vars {
        if var.traits.contains(VarTraits::STATIC) {
            deferred_statics.push(var);
            continue;
        }
        if !var.traits.needs_defer() {
            continue;
        }
        emit_defer_call(builder, destructors, &var)?;
    }
    Ok(())
}

/// Emit the module's deinitialization routine: every `static` variable's
/// destructor, in reverse order of first encounter across the whole
/// compilation (spec §4.7).
pub fn emit_static_deinit(
    builder: &mut IrBuilder<'_>,
    destructors: &dyn DestructorResolver,
    statics: &[BridgeVar],
) -> Result<(), LowerError> {
    for var in statics.iter().rev() {
        emit_defer_call(builder, destructors, var)?;
    }
    Ok(())
}

/// `main`'s own `return` deinits the statics and globals it has accumulated
/// so far in *declaration* order, not the reverse order `emit_static_deinit`
/// uses for the module's own exit routine (spec §4.7: "For `return` in
/// `main`, static and global deinit is emitted in declaration order").
pub fn emit_static_deinit_in_declaration_order(
    builder: &mut IrBuilder<'_>,
    destructors: &dyn DestructorResolver,
    statics: &[BridgeVar],
) -> Result<(), LowerError> {
    for var in statics {
        emit_defer_call(builder, destructors, var)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_ir::ir::{IntWidth, IrFunction, IrTypeData, TypeInterner};
    use kiln_ir::Span;

    struct NoDestructors;
    impl DestructorResolver for NoDestructors {
        fn defer_fn(&self, _ty: TypeId) -> Option<(Name, TypeId)> {
            None
        }
    }

    struct AlwaysDestruct {
        defer_name: Name,
        ptr_ty: TypeId,
    }
    impl DestructorResolver for AlwaysDestruct {
        fn defer_fn(&self, _ty: TypeId) -> Option<(Name, TypeId)> {
            Some((self.defer_name, self.ptr_ty))
        }
    }

    fn setup() -> (TypeInterner, IrFunction) {
        let interner = TypeInterner::new();
        let function = IrFunction::new(Name::from_raw(0), vec![], interner.int(IntWidth::S32));
        (interner, function)
    }

    fn var(name: Name, traits: VarTraits, ty: TypeId) -> BridgeVar {
        BridgeVar {
            name,
            slot: kiln_ir::ir::SlotId(0),
            ty,
            traits,
            span: Span::DUMMY,
        }
    }

    #[test]
    fn pod_variables_skip_destructor_calls() {
        let (interner, mut function) = setup();
        let mut builder = IrBuilder::new(&mut function);
        let entry = builder.new_block();
        builder.use_block(entry);

        let i32_ty = interner.int(IntWidth::S32);
        let vars = vec![var(Name::from_raw(1), VarTraits::POD, i32_ty)];
        let destructors = AlwaysDestruct {
            defer_name: Name::from_raw(99),
            ptr_ty: interner.int(IntWidth::S32),
        };
        let mut statics = Vec::new();
        run_scope_exit(&mut builder, &destructors, &mut statics, vars).unwrap();

        builder.terminate_return(None).unwrap();
        assert!(function.block(entry).instrs.is_empty());
    }

    #[test]
    fn non_pod_variable_emits_a_call() {
        let (interner, mut function) = setup();
        let mut builder = IrBuilder::new(&mut function);
        let entry = builder.new_block();
        builder.use_block(entry);

        let struct_ty = interner.int(IntWidth::S32); // stand-in; only identity matters here
        let vars = vec![var(Name::from_raw(1), VarTraits::empty(), struct_ty)];
        let destructors = AlwaysDestruct {
            defer_name: Name::from_raw(99),
            ptr_ty: interner.bytes_pointer(),
        };
        let mut statics = Vec::new();
        run_scope_exit(&mut builder, &destructors, &mut statics, vars).unwrap();

        assert_eq!(function.block(entry).instrs.len(), 1);
    }

    #[test]
    fn static_variable_is_deferred_not_destructed_immediately() {
        let (interner, mut function) = setup();
        let mut builder = IrBuilder::new(&mut function);
        let entry = builder.new_block();
        builder.use_block(entry);

        let i32_ty = interner.int(IntWidth::S32);
        let vars = vec![var(Name::from_raw(1), VarTraits::STATIC, i32_ty)];
        let destructors = NoDestructors;
        let mut statics = Vec::new();
        run_scope_exit(&mut builder, &destructors, &mut statics, vars).unwrap();

        assert!(function.block(entry).instrs.is_empty());
        assert_eq!(statics.len(), 1);
    }

    #[test]
    fn static_deinit_runs_in_reverse_of_first_encounter() {
        let (interner, mut function) = setup();
        let mut builder = IrBuilder::new(&mut function);
        let entry = builder.new_block();
        builder.use_block(entry);

        let i32_ty = interner.int(IntWidth::S32);
        let statics = vec![
            var(Name::from_raw(1), VarTraits::STATIC, i32_ty),
            var(Name::from_raw(2), VarTraits::STATIC, i32_ty),
        ];
        let destructors = AlwaysDestruct {
            defer_name: Name::from_raw(77),
            ptr_ty: i32_ty,
        };
        emit_static_deinit(&mut builder, &destructors, &statics).unwrap();

        assert_eq!(function.block(entry).instrs.len(), 2);
        match &function.block(entry).instrs[0].kind {
            kiln_ir::ir::InstrKind::Call { args, .. } => match &args[0].kind {
                ValueKind::Local(slot) => assert_eq!(*slot, kiln_ir::ir::SlotId(0)),
                _ => panic!("expected a local pointer argument"),
            },
            _ => panic!("expected a call instruction"),
        }
    }

    #[test]
    fn main_return_deinit_runs_in_declaration_order() {
        let (interner, mut function) = setup();
        let mut builder = IrBuilder::new(&mut function);
        let entry = builder.new_block();
        builder.use_block(entry);

        let i32_ty = interner.int(IntWidth::S32);
        let statics = vec![
            var(Name::from_raw(1), VarTraits::STATIC, i32_ty),
            var(Name::from_raw(2), VarTraits::STATIC, i32_ty),
        ];
        let destructors = AlwaysDestruct {
            defer_name: Name::from_raw(77),
            ptr_ty: i32_ty,
        };
        emit_static_deinit_in_declaration_order(&mut builder, &destructors, &statics).unwrap();

        assert_eq!(function.block(entry).instrs.len(), 2);
        match &function.block(entry).instrs[0].kind {
            kiln_ir::ir::InstrKind::Call { args, .. } => match &args[0].kind {
                ValueKind::Local(slot) => assert_eq!(*slot, kiln_ir::ir::SlotId(0)),
                _ => panic!("expected a local pointer argument"),
            },
            _ => panic!("expected a call instruction"),
        }
    }
}
