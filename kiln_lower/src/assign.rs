//! C7 Assignment-Management Protocol: `__assign__`/`__copy_assign__`
//! dispatch in place of a raw `store` for non-POD targets (spec §4.8).
//!
//! Grounded on the same `handle_assign_management` call shape used at both
//! of its call sites in the teacher's statement lowering (plain `=` and
//! declaration-with-initializer): a POD target or an unresolved method both
//! fall back to `store`; otherwise the method is called with `this` (the
//! target's address) and `other` (the new value) as its two arguments.

use kiln_ir::ir::{IrBuilder, IrValue, TypeId};
use kiln_ir::{Name, Span};

use crate::error::LowerError;

/// Resolves a type's `__assign__`/`__copy_assign__` method, if one was
/// generated for it. `__copy_assign__` backs declaration-with-initializer;
/// `__assign__` backs plain `=` (spec §4.8).
pub trait AssignmentResolver {
    fn assign_fn(&self, ty: TypeId) -> Option<Name>;
    fn copy_assign_fn(&self, ty: TypeId) -> Option<Name>;
}

/// Emit a declaration's initializer store, dispatching to `__copy_assign__`
/// for a non-POD target with one, else falling back to a raw `store`.
pub fn emit_init(
    builder: &mut IrBuilder<'_>,
    resolver: &dyn AssignmentResolver,
    is_pod: bool,
    target: IrValue,
    value: IrValue,
    ty: TypeId,
    span: Span,
) -> Result<(), LowerError> {
    if !is_pod {
        if let Some(name) = resolver.copy_assign_fn(ty) {
            builder.call(name, vec![target, value], None, span)?;
            return Ok(());
        }
    }
    builder.store(target, value)?;
    Ok(())
}

/// Emit a plain `=` store, dispatching to `__assign__` for a non-POD target
/// with one, else falling back to a raw `store` (spec §4.8).
pub fn emit_assign(
    builder: &mut IrBuilder<'_>,
    resolver: &dyn AssignmentResolver,
    is_pod: bool,
    target: IrValue,
    value: IrValue,
    ty: TypeId,
    span: Span,
) -> Result<(), LowerError> {
    if !is_pod {
        if let Some(name) = resolver.assign_fn(ty) {
            builder.call(name, vec![target, value], None, span)?;
            return Ok(());
        }
    }
    builder.store(target, value)?;
    Ok(())
}
