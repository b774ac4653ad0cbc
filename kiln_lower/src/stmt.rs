//! C7 Statement Lowering: `StmtKind` → basic blocks and instructions.
//!
//! Dispatch shape mirrors `expr.rs`: one function per `StmtKind` variant.
//! Control flow is grounded on the same block-graph builder everything
//! else here drives; loop/switch bookkeeping and scope-exit ordering
//! follow `ori_arc::lower`'s structured-to-unstructured lowering (spec
//! §4.6) and `BridgeScope`'s declaration-order defer list (spec §4.7).

use rustc_hash::{FxHashMap, FxHashSet};

use kiln_ir::ast::{
    AstType, BinaryOp, EachInSource, ExprArena, ExprId, ExprKind, Namespace, Stmt, StmtKind, SwitchCase,
};
use kiln_ir::ir::{ICmpOp, IrBuilder, IrTypeData, IrValue, MathOp, TypeId, ValueKind};
use kiln_ir::{Name, Span};
use kiln_types::{conform, ConformMode, Resolver};

use crate::assign::{self, AssignmentResolver};
use crate::destructor::{self, DestructorResolver};
use crate::error::LowerError;
use crate::expr::{self, ExprCtx};
use crate::flags::CompilerFlags;
use crate::scope::{BridgeScope, BridgeVar, FallthroughStack, LoopFrame, LoopStack, VarTraits};

/// Read-only context threaded through one function body's statement
/// lowering; the registries mirror `expr::ExprCtx`'s `call_returns` seam —
/// each is resolved upstream and handed in rather than recomputed here.
pub struct StmtCtx<'a> {
    pub arena: &'a ExprArena,
    pub current_ns: &'a Namespace,
    pub using_ns: &'a [Namespace],
    pub call_returns: &'a FxHashMap<Name, TypeId>,
    /// Declared variant count of every enum `TypeId`, for exhaustive-switch
    /// checking (spec §4.6). Composite and primitive types never appear here.
    pub enum_variant_counts: &'a FxHashMap<TypeId, usize>,
    /// The enclosing function's declared return type, for conforming
    /// `return` expressions (spec §4.2 `Return` mode).
    pub return_type: TypeId,
    /// Compiler traits in effect for this Object (spec §6).
    pub flags: CompilerFlags,
    /// Whether the enclosing function carries `FunctionTraits::MAIN` — its
    /// `return` also deinits statics/globals in declaration order, not just
    /// its own lexical scopes (spec §4.7).
    pub is_main: bool,
    /// `__length__`'s interned name, for `each-in`'s dynamic/structure form
    /// (spec §4.6). Resolved once upstream rather than re-interned per call.
    pub length_method: Name,
    /// `__array__`'s interned name, for the same form.
    pub array_method: Name,
}

fn expr_ctx<'a>(ctx: &'a StmtCtx<'a>, state: &'a StmtState) -> ExprCtx<'a> {
    ExprCtx {
        arena: ctx.arena,
        scope: &state.scope,
        current_ns: ctx.current_ns,
        using_ns: ctx.using_ns,
        call_returns: ctx.call_returns,
    }
}

fn pointee_of(resolver: &Resolver<'_>, ptr_ty: TypeId, span: Span) -> Result<TypeId, LowerError> {
    match resolver.ir_types().get(ptr_ty) {
        IrTypeData::Pointer(inner) => Ok(*inner),
        _ => Err(LowerError::NotPointer { span }),
    }
}

/// Mutable bookkeeping threaded through one function body's lowering:
/// lexical scope, enclosing loop/switch jump targets, and the deferred-
/// static list accumulated for `destructor::emit_static_deinit` once the
/// whole module is lowered.
pub struct StmtState {
    pub scope: BridgeScope,
    pub loops: LoopStack,
    pub fallthrough: FallthroughStack,
    pub deferred_statics: Vec<BridgeVar>,
}

impl Default for StmtState {
    fn default() -> Self {
        Self::new()
    }
}

impl StmtState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scope: BridgeScope::new(),
            loops: LoopStack::new(),
            fallthrough: FallthroughStack::new(),
            deferred_statics: Vec::new(),
        }
    }
}

/// Lower one lexical block: a fresh scope, each statement in order
/// (stopping at the first one that leaves the current block terminated —
/// everything after it is unreachable), then that scope's `__defer__`
/// calls, skipped if the block is already terminated (the defers for an
/// early `return`/`break`/`continue` were already emitted at that jump).
pub fn lower_block(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    destructors: &dyn DestructorResolver,
    assignments: &dyn AssignmentResolver,
    ctx: &StmtCtx<'_>,
    state: &mut StmtState,
    stmts: &[Stmt],
) -> Result<(), LowerError> {
    state.scope.enter();
    for (i, stmt) in stmts.iter().enumerate() {
        if builder.is_current_block_terminated() {
            // `return`/`break`/`continue`/`fallthrough` already terminated
            // this block; anything after it can never run (spec §7's
            // `EarlyReturnDeadCode`, promoted from warning to hard error
            // only under `STRICT` since the core has no non-fatal
            // diagnostic channel of its own).
            if ctx.flags.contains(CompilerFlags::STRICT) && !ctx.flags.contains(CompilerFlags::IGNORE_EARLY_RETURN) {
                return Err(LowerError::EarlyReturnDeadCode { span: stmts[i].span });
            }
            break;
        }
        lower_stmt(builder, resolver, destructors, assignments, ctx, state, stmt)?;
    }
    let vars = state.scope.exit();
    if !builder.is_current_block_terminated() {
        destructor::run_scope_exit(builder, destructors, &mut state.deferred_statics, vars)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn lower_stmt(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    destructors: &dyn DestructorResolver,
    assignments: &dyn AssignmentResolver,
    ctx: &StmtCtx<'_>,
    state: &mut StmtState,
    stmt: &Stmt,
) -> Result<(), LowerError> {
    let span = stmt.span;
    match &stmt.kind {
        StmtKind::Return(value) => lower_return(builder, resolver, destructors, ctx, state, *value, span),
        StmtKind::ExprStmt(id) => {
            let ectx = expr_ctx(ctx, state);
            expr::lower_expr(builder, resolver, &ectx, *id)?;
            Ok(())
        }
        StmtKind::Declare { name, ty, init, is_pod, is_static, is_undef } => lower_declare(
            builder, resolver, assignments, ctx, state, *name, ty.as_ref(), *init, *is_pod, *is_static, *is_undef, span,
        ),
        StmtKind::Assign { target, value, is_pod } => {
            lower_assign(builder, resolver, assignments, ctx, state, *target, *value, *is_pod, span)
        }
        StmtKind::CompoundAssign { op, target, value } => {
            lower_compound_assign(builder, resolver, ctx, state, *op, *target, *value, span)
        }
        StmtKind::If { cond, negate, then_body, else_body } => lower_if(
            builder,
            resolver,
            destructors,
            assignments,
            ctx,
            state,
            *cond,
            *negate,
            then_body,
            else_body.as_deref(),
        ),
        StmtKind::While { cond, negate, body, label } => {
            lower_while(builder, resolver, destructors, assignments, ctx, state, *cond, *negate, body, *label)
        }
        StmtKind::EachIn { element_name, source, it_type, is_static, body, label } => lower_each_in(
            builder, resolver, destructors, assignments, ctx, state, *element_name, source, it_type.as_ref(),
            *is_static, body, *label, span,
        ),
        StmtKind::Repeat { count, body, label } => {
            lower_repeat(builder, resolver, destructors, assignments, ctx, state, *count, body, *label, span)
        }
        StmtKind::Break(label) => lower_break(builder, destructors, state, *label, span),
        StmtKind::Continue(label) => lower_continue(builder, destructors, state, *label, span),
        StmtKind::Fallthrough => lower_fallthrough(builder, state, span),
        StmtKind::Switch { cond, is_exhaustive, cases, default } => lower_switch(
            builder, resolver, destructors, assignments, ctx, state, *cond, *is_exhaustive, cases, default.as_deref(), span,
        ),
        StmtKind::For { before, cond, step, body, label } => {
            lower_for(builder, resolver, destructors, assignments, ctx, state, before, *cond, step, body, *label)
        }
        StmtKind::Delete(ptr) => {
            let ectx = expr_ctx(ctx, state);
            expr::lower_delete(builder, resolver, &ectx, *ptr, span)?;
            Ok(())
        }
        StmtKind::LlvmAsm { assembly, constraints, args, side_effects, intel_syntax, align_stack } => {
            let ectx = expr_ctx(ctx, state);
            let mut values = Vec::with_capacity(args.len());
            for &arg in args {
                values.push(expr::lower_expr(builder, resolver, &ectx, arg)?);
            }
            builder.llvm_asm(*assembly, *constraints, values, *side_effects, *intel_syntax, *align_stack, None, span)?;
            Ok(())
        }
        StmtKind::DeclareConstant => Ok(()),
    }
}

fn lower_return(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    destructors: &dyn DestructorResolver,
    ctx: &StmtCtx<'_>,
    state: &mut StmtState,
    value: Option<ExprId>,
    span: Span,
) -> Result<(), LowerError> {
    let result = match value {
        Some(id) => {
            let ectx = expr_ctx(ctx, state);
            let val = expr::lower_expr(builder, resolver, &ectx, id)?;
            let conformed = conform(builder, resolver.ir_types(), val, ctx.return_type, ConformMode::Return, span)
                .map_err(LowerError::Type)?;
            Some(conformed)
        }
        None => None,
    };
    // Every lexical scope still open at this `return`, innermost first —
    // a `return` jumps out of all of them at once (spec §4.7).
    let vars = state.scope.vars_above(0);
    destructor::run_scope_exit(builder, destructors, &mut state.deferred_statics, vars)?;
    // `main`'s `return` also deinits the statics/globals it has accumulated
    // so far, in declaration order (spec §4.6/§4.7); every other function's
    // `return` leaves them for the module's own exit routine.
    if ctx.is_main {
        destructor::emit_static_deinit_in_declaration_order(builder, destructors, &state.deferred_statics)?;
    }
    builder.terminate_return(result)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn lower_declare(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    assignments: &dyn AssignmentResolver,
    ctx: &StmtCtx<'_>,
    state: &mut StmtState,
    name: Name,
    ty: Option<&AstType>,
    init: Option<ExprId>,
    is_pod: bool,
    is_static: bool,
    is_undef: bool,
    span: Span,
) -> Result<(), LowerError> {
    // A redeclaration in the *same* lexical scope is rejected outright;
    // shadowing an outer scope's declaration is legal (spec §4.3).
    if state.scope.already_in_list(name) {
        return Err(LowerError::DuplicateDeclaration { name, span });
    }

    let init_val = match init {
        Some(id) => {
            let ectx = expr_ctx(ctx, state);
            Some(expr::lower_expr(builder, resolver, &ectx, id)?)
        }
        None => None,
    };
    let var_ty = match ty {
        Some(ast_ty) => resolver.resolve(ast_ty, ctx.current_ns, ctx.using_ns, span).map_err(LowerError::Type)?,
        None => init_val
            .as_ref()
            .map(|v| v.ty)
            .ok_or_else(|| LowerError::Internal("declaration has neither a type nor an initializer".to_string()))?,
    };

    let slot = builder.push_slot(name, var_ty);
    let ptr_ty = resolver.ir_types_mut().intern(IrTypeData::Pointer(var_ty));
    let ptr = IrValue::new(ValueKind::Local(slot), ptr_ty);

    match init_val {
        Some(val) => {
            let conformed = conform(builder, resolver.ir_types(), val, var_ty, ConformMode::Assigning, span)
                .map_err(LowerError::Type)?;
            assign::emit_init(builder, assignments, is_pod, ptr, conformed, var_ty, span)?;
        }
        // `UNDEF` skips even the zero-fill (spec §4.7); every other
        // uninitialized declaration gets a defined zero value. `NO_UNDEF`
        // (spec §6) overrides the declaration's own `is_undef` flag.
        None if !is_undef || ctx.flags.contains(CompilerFlags::NO_UNDEF) => {
            let zero = builder.zero_init(var_ty)?;
            builder.store(ptr, zero)?;
        }
        None => {}
    }

    let mut traits = VarTraits::empty();
    if is_pod {
        traits |= VarTraits::POD;
    }
    if is_static {
        traits |= VarTraits::STATIC;
    }
    if is_undef {
        traits |= VarTraits::UNDEF;
    }
    state.scope.declare(BridgeVar { name, slot, ty: var_ty, traits, span });
    Ok(())
}

fn lower_assign(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    assignments: &dyn AssignmentResolver,
    ctx: &StmtCtx<'_>,
    state: &mut StmtState,
    target: ExprId,
    value: ExprId,
    is_pod: bool,
    span: Span,
) -> Result<(), LowerError> {
    let ectx = expr_ctx(ctx, state);
    let ptr = expr::lower_lvalue(builder, resolver, &ectx, target)?;
    let pointee = pointee_of(resolver, ptr.ty, span)?;
    let val = expr::lower_expr(builder, resolver, &ectx, value)?;
    let conformed = conform(builder, resolver.ir_types(), val, pointee, ConformMode::Assigning, span).map_err(LowerError::Type)?;
    assign::emit_assign(builder, assignments, is_pod, ptr, conformed, pointee, span)?;
    Ok(())
}

fn lower_compound_assign(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    ctx: &StmtCtx<'_>,
    state: &mut StmtState,
    op: BinaryOp,
    target: ExprId,
    value: ExprId,
    span: Span,
) -> Result<(), LowerError> {
    let ectx = expr_ctx(ctx, state);
    let ptr = expr::lower_lvalue(builder, resolver, &ectx, target)?;
    let pointee = pointee_of(resolver, ptr.ty, span)?;
    let current = builder.load(ptr.clone(), pointee)?;
    let rhs = expr::lower_expr(builder, resolver, &ectx, value)?;
    let rhs = conform(builder, resolver.ir_types(), rhs, pointee, ConformMode::Calculation, span).map_err(LowerError::Type)?;

    let types = resolver.ir_types();
    let is_float = matches!(types.get(pointee), IrTypeData::Float(_));
    let is_signed = matches!(types.get(pointee), IrTypeData::Int(w) if w.is_signed());
    let math_op = expr::math_op_for(op, is_float, is_signed)
        .ok_or_else(|| LowerError::Internal("unsupported compound-assignment operator".to_string()))?;
    let updated = builder.math(math_op, current, rhs, pointee, span)?;
    builder.store(ptr, updated)?;
    Ok(())
}

/// `if`/`unless`: `negate` just swaps which branch the condition's "true"
/// outcome targets, rather than negating the value itself.
#[allow(clippy::too_many_arguments)]
fn lower_if(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    destructors: &dyn DestructorResolver,
    assignments: &dyn AssignmentResolver,
    ctx: &StmtCtx<'_>,
    state: &mut StmtState,
    cond: ExprId,
    negate: bool,
    then_body: &[Stmt],
    else_body: Option<&[Stmt]>,
) -> Result<(), LowerError> {
    let then_block = builder.new_block();
    let else_block = builder.new_block();
    let merge_block = builder.new_block();
    let (true_target, false_target) = if negate { (else_block, then_block) } else { (then_block, else_block) };
    let ectx = expr_ctx(ctx, state);
    expr::lower_condition(builder, resolver, &ectx, cond, true_target, false_target)?;

    builder.use_block(then_block);
    lower_block(builder, resolver, destructors, assignments, ctx, state, then_body)?;
    let then_falls_through = !builder.is_current_block_terminated();
    if then_falls_through {
        builder.terminate_jmp(merge_block)?;
    }

    builder.use_block(else_block);
    if let Some(else_stmts) = else_body {
        lower_block(builder, resolver, destructors, assignments, ctx, state, else_stmts)?;
    }
    let else_falls_through = !builder.is_current_block_terminated();
    if else_falls_through {
        builder.terminate_jmp(merge_block)?;
    }

    // If neither branch falls through (both `return`, say), `merge_block`
    // is unreachable; leaving it un-entered keeps the builder's current
    // block pointed at the already-terminated branch, so any statement
    // following this `if` is correctly treated as dead code.
    if then_falls_through || else_falls_through {
        builder.use_block(merge_block);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn lower_while(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    destructors: &dyn DestructorResolver,
    assignments: &dyn AssignmentResolver,
    ctx: &StmtCtx<'_>,
    state: &mut StmtState,
    cond: ExprId,
    negate: bool,
    body: &[Stmt],
    label: Option<Name>,
) -> Result<(), LowerError> {
    let header_block = builder.new_block();
    let body_block = builder.new_block();
    let exit_block = builder.new_block();
    builder.terminate_jmp(header_block)?;

    builder.use_block(header_block);
    let (true_target, false_target) = if negate { (exit_block, body_block) } else { (body_block, exit_block) };
    let ectx = expr_ctx(ctx, state);
    expr::lower_condition(builder, resolver, &ectx, cond, true_target, false_target)?;

    state.loops.push(LoopFrame {
        label,
        break_target: exit_block,
        continue_target: header_block,
        owning_scope_depth: state.scope.depth(),
    });
    builder.use_block(body_block);
    lower_block(builder, resolver, destructors, assignments, ctx, state, body)?;
    if !builder.is_current_block_terminated() {
        builder.terminate_jmp(header_block)?;
    }
    state.loops.pop();

    builder.use_block(exit_block);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn lower_repeat(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    destructors: &dyn DestructorResolver,
    assignments: &dyn AssignmentResolver,
    ctx: &StmtCtx<'_>,
    state: &mut StmtState,
    count: ExprId,
    body: &[Stmt],
    label: Option<Name>,
    span: Span,
) -> Result<(), LowerError> {
    let ectx = expr_ctx(ctx, state);
    let count_val = expr::lower_expr(builder, resolver, &ectx, count)?;
    let usize_ty = resolver.ir_types().usize_ty();
    let count_val = conform(builder, resolver.ir_types(), count_val, usize_ty, ConformMode::Calculation, span)
        .map_err(LowerError::Type)?;

    let idx_ptr = alloc_hidden_counter(builder, resolver, usize_ty)?;

    let header_block = builder.new_block();
    let body_block = builder.new_block();
    let incr_block = builder.new_block();
    let exit_block = builder.new_block();
    builder.terminate_jmp(header_block)?;

    builder.use_block(header_block);
    let idx_val = builder.load(idx_ptr.clone(), usize_ty)?;
    let bool_ty = resolver.ir_types().bool_ty();
    let cmp = builder.math(MathOp::ICmp(ICmpOp::ULt), idx_val, count_val, bool_ty, span)?;
    builder.terminate_cond(cmp, body_block, exit_block)?;

    state.loops.push(LoopFrame {
        label,
        break_target: exit_block,
        continue_target: incr_block,
        owning_scope_depth: state.scope.depth(),
    });
    builder.use_block(body_block);
    lower_block(builder, resolver, destructors, assignments, ctx, state, body)?;
    if !builder.is_current_block_terminated() {
        builder.terminate_jmp(incr_block)?;
    }
    state.loops.pop();

    builder.use_block(incr_block);
    bump_hidden_counter(builder, idx_ptr, usize_ty, span)?;
    builder.terminate_jmp(header_block)?;

    builder.use_block(exit_block);
    Ok(())
}

/// Whether `iterable` names a plain identifier bound as `REFERENCE` in
/// scope (e.g. a non-owning parameter) — such a binding cannot be iterated
/// with `each in` in place, since the loop writes the element slot back
/// through the array's own storage (spec §4.6 `FixedArrayNotMutable`).
fn each_in_target_is_reference(ctx: &StmtCtx<'_>, state: &StmtState, iterable: ExprId) -> bool {
    match &ctx.arena.get(iterable).kind {
        ExprKind::Identifier(name) => {
            state.scope.lookup(*name).is_some_and(|var| var.traits.contains(VarTraits::REFERENCE))
        }
        _ => false,
    }
}

/// One `each-in` source's resolved shape, after dispatching on
/// `EachInSource` and (for `List`) the iterable's actual type.
enum EachInForm {
    /// A fixed array: the bitcast base address is invariant across
    /// iterations, so it is computed once regardless of `is_static`.
    FixedArray { array_ptr: IrValue, elem_ty: TypeId },
    /// A composite with `__length__`/`__array__` methods.
    Dynamic { receiver: ExprId, elem_ty: TypeId },
    /// The low-level `array, length` form: `array` is already a pointer
    /// value, not an lvalue.
    LowLevel { array_expr: ExprId, array_val: IrValue, elem_ty: TypeId },
}

#[allow(clippy::too_many_arguments)]
fn lower_each_in(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    destructors: &dyn DestructorResolver,
    assignments: &dyn AssignmentResolver,
    ctx: &StmtCtx<'_>,
    state: &mut StmtState,
    element_name: Name,
    source: &EachInSource,
    it_type: Option<&AstType>,
    is_static: bool,
    body: &[Stmt],
    label: Option<Name>,
    span: Span,
) -> Result<(), LowerError> {
    let usize_ty = resolver.ir_types().usize_ty();

    let (form, len_val) = match source {
        EachInSource::List(iterable) => {
            let ectx = expr_ctx(ctx, state);
            let array_ptr = expr::lower_lvalue(builder, resolver, &ectx, *iterable)?;
            let pointee = pointee_of(resolver, array_ptr.ty, span)?;
            match resolver.ir_types().get(pointee) {
                IrTypeData::FixedArray(elem, len) => {
                    let (elem_ty, len) = (*elem, *len);
                    if each_in_target_is_reference(ctx, state, *iterable) {
                        return Err(LowerError::FixedArrayNotMutable { span });
                    }
                    if let Some(ast_ty) = it_type {
                        let declared =
                            resolver.resolve(ast_ty, ctx.current_ns, ctx.using_ns, span).map_err(LowerError::Type)?;
                        if declared != elem_ty {
                            return Err(LowerError::EachInElementTypeMismatch { span });
                        }
                    }
                    let len_val = IrBuilder::literal_usize(len, usize_ty);
                    (EachInForm::FixedArray { array_ptr, elem_ty }, len_val)
                }
                // A composite iterated via its own `__length__`/`__array__`
                // methods; its element type comes from the declared `it_type`
                // since there is no array element slot to read it from.
                _ => {
                    let elem_ty = match it_type {
                        Some(ast_ty) => {
                            resolver.resolve(ast_ty, ctx.current_ns, ctx.using_ns, span).map_err(LowerError::Type)?
                        }
                        None => {
                            return Err(LowerError::Internal(
                                "each-in over a non-array iterable requires a declared element type".to_string(),
                            ))
                        }
                    };
                    let ectx = expr_ctx(ctx, state);
                    let len_result =
                        expr::lower_method_call(builder, resolver, &ectx, *iterable, ctx.length_method, &[], span)?;
                    let len_val =
                        conform(builder, resolver.ir_types(), len_result, usize_ty, ConformMode::Calculation, span)
                            .map_err(LowerError::Type)?;
                    (EachInForm::Dynamic { receiver: *iterable, elem_ty }, len_val)
                }
            }
        }
        EachInSource::LowLevel { array, length } => {
            let ectx = expr_ctx(ctx, state);
            let array_val = expr::lower_expr(builder, resolver, &ectx, *array)?;
            let elem_ty = pointee_of(resolver, array_val.ty, span)?;
            let len_result = expr::lower_expr(builder, resolver, &ectx, *length)?;
            let len_val = conform(builder, resolver.ir_types(), len_result, usize_ty, ConformMode::Calculation, span)
                .map_err(LowerError::Type)?;
            (EachInForm::LowLevel { array_expr: *array, array_val, elem_ty }, len_val)
        }
    };

    let elem_ty = match &form {
        EachInForm::FixedArray { elem_ty, .. }
        | EachInForm::Dynamic { elem_ty, .. }
        | EachInForm::LowLevel { elem_ty, .. } => *elem_ty,
    };

    // For the dynamic and low-level forms, a non-static iterable's backing
    // storage may move between iterations, so its array pointer is
    // recomputed inside the loop body rather than hoisted out of it; the
    // fixed array's address never needs recomputing either way (spec §4.6).
    let static_array_ptr = match &form {
        EachInForm::FixedArray { array_ptr, .. } => Some(array_ptr.clone()),
        EachInForm::LowLevel { array_val, .. } if is_static => Some(array_val.clone()),
        EachInForm::Dynamic { receiver, .. } if is_static => {
            let ectx = expr_ctx(ctx, state);
            Some(expr::lower_method_call(builder, resolver, &ectx, *receiver, ctx.array_method, &[], span)?)
        }
        _ => None,
    };

    let idx_ptr = alloc_hidden_counter(builder, resolver, usize_ty)?;

    let header_block = builder.new_block();
    let body_block = builder.new_block();
    let incr_block = builder.new_block();
    let exit_block = builder.new_block();
    builder.terminate_jmp(header_block)?;

    builder.use_block(header_block);
    let idx_val = builder.load(idx_ptr.clone(), usize_ty)?;
    let bool_ty = resolver.ir_types().bool_ty();
    let cmp = builder.math(MathOp::ICmp(ICmpOp::ULt), idx_val, len_val, bool_ty, span)?;
    builder.terminate_cond(cmp, body_block, exit_block)?;

    state.loops.push(LoopFrame {
        label,
        break_target: exit_block,
        continue_target: incr_block,
        owning_scope_depth: state.scope.depth(),
    });
    builder.use_block(body_block);

    let array_ptr = match &static_array_ptr {
        Some(ptr) => ptr.clone(),
        None => match &form {
            EachInForm::LowLevel { array_expr, .. } => {
                let ectx = expr_ctx(ctx, state);
                expr::lower_expr(builder, resolver, &ectx, *array_expr)?
            }
            EachInForm::Dynamic { receiver, .. } => {
                let ectx = expr_ctx(ctx, state);
                expr::lower_method_call(builder, resolver, &ectx, *receiver, ctx.array_method, &[], span)?
            }
            EachInForm::FixedArray { .. } => {
                unreachable!("fixed-array pointer is always precomputed in static_array_ptr")
            }
        },
    };

    // The element variable is a stack slot of its own, copied from the
    // array each iteration. It never owns the array storage, so it is
    // always `REFERENCE` — never destructed — regardless of the source
    // array's own element traits (spec §4.7's `REFERENCE` is exactly
    // "bound, not owned").
    let idx_val = builder.load(idx_ptr.clone(), usize_ty)?;
    let elem_ptr_ty = resolver.ir_types_mut().intern(IrTypeData::Pointer(elem_ty));
    let elem_ptr = builder.array_access(array_ptr, idx_val, elem_ptr_ty)?;
    let elem_val = builder.load(elem_ptr, elem_ty)?;
    let elem_slot = builder.push_slot(element_name, elem_ty);
    let elem_slot_ptr_ty = resolver.ir_types_mut().intern(IrTypeData::Pointer(elem_ty));
    let elem_slot_ptr = IrValue::new(ValueKind::Local(elem_slot), elem_slot_ptr_ty);
    builder.store(elem_slot_ptr, elem_val)?;

    state.scope.enter();
    let mut traits = VarTraits::REFERENCE;
    if is_static {
        traits |= VarTraits::STATIC;
    }
    state
        .scope
        .declare(BridgeVar { name: element_name, slot: elem_slot, ty: elem_ty, traits, span });
    for stmt in body {
        if builder.is_current_block_terminated() {
            break;
        }
        lower_stmt(builder, resolver, destructors, assignments, ctx, state, stmt)?;
    }
    let vars = state.scope.exit();
    if !builder.is_current_block_terminated() {
        destructor::run_scope_exit(builder, destructors, &mut state.deferred_statics, vars)?;
        builder.terminate_jmp(incr_block)?;
    }
    state.loops.pop();

    builder.use_block(incr_block);
    bump_hidden_counter(builder, idx_ptr, usize_ty, span)?;
    builder.terminate_jmp(header_block)?;

    builder.use_block(exit_block);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn lower_for(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    destructors: &dyn DestructorResolver,
    assignments: &dyn AssignmentResolver,
    ctx: &StmtCtx<'_>,
    state: &mut StmtState,
    before: &[Stmt],
    cond: Option<ExprId>,
    step: &[Stmt],
    body: &[Stmt],
    label: Option<Name>,
) -> Result<(), LowerError> {
    // `before` declares into the loop's own scope, so its variables stay
    // visible to `cond`/`step`/`body` but are gone once the loop exits.
    state.scope.enter();
    for stmt in before {
        // A `return`/`break`/`continue`/`fallthrough` among `before`'s
        // statements would jump out of a loop that was never entered (spec
        // §4.6) — rejected outright rather than silently mis-lowered.
        if is_terminator_stmt(&stmt.kind) {
            return Err(LowerError::TerminatorInBeforeStatements { span: stmt.span });
        }
        lower_stmt(builder, resolver, destructors, assignments, ctx, state, stmt)?;
    }

    let header_block = builder.new_block();
    let body_block = builder.new_block();
    let step_block = builder.new_block();
    let exit_block = builder.new_block();
    builder.terminate_jmp(header_block)?;

    builder.use_block(header_block);
    match cond {
        Some(cond_id) => {
            let ectx = expr_ctx(ctx, state);
            let cond_val = expr::lower_expr(builder, resolver, &ectx, cond_id)?;
            builder.terminate_cond(cond_val, body_block, exit_block)?;
        }
        None => builder.terminate_jmp(body_block)?,
    }

    state.loops.push(LoopFrame {
        label,
        break_target: exit_block,
        continue_target: step_block,
        owning_scope_depth: state.scope.depth(),
    });
    builder.use_block(body_block);
    lower_block(builder, resolver, destructors, assignments, ctx, state, body)?;
    if !builder.is_current_block_terminated() {
        builder.terminate_jmp(step_block)?;
    }

    builder.use_block(step_block);
    for stmt in step {
        if builder.is_current_block_terminated() {
            break;
        }
        lower_stmt(builder, resolver, destructors, assignments, ctx, state, stmt)?;
    }
    if !builder.is_current_block_terminated() {
        builder.terminate_jmp(header_block)?;
    }
    state.loops.pop();

    builder.use_block(exit_block);
    let vars = state.scope.exit();
    if !builder.is_current_block_terminated() {
        destructor::run_scope_exit(builder, destructors, &mut state.deferred_statics, vars)?;
    }
    Ok(())
}

fn is_terminator_stmt(kind: &StmtKind) -> bool {
    matches!(kind, StmtKind::Return(_) | StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Fallthrough)
}

fn lower_break(
    builder: &mut IrBuilder<'_>,
    destructors: &dyn DestructorResolver,
    state: &mut StmtState,
    label: Option<Name>,
    span: Span,
) -> Result<(), LowerError> {
    let frame = state.loops.resolve(label).map_err(|e| LowerError::from_loop_lookup(e, span))?;
    let vars = state.scope.vars_above(frame.owning_scope_depth);
    destructor::run_scope_exit(builder, destructors, &mut state.deferred_statics, vars)?;
    builder.terminate_jmp(frame.break_target)?;
    Ok(())
}

fn lower_continue(
    builder: &mut IrBuilder<'_>,
    destructors: &dyn DestructorResolver,
    state: &mut StmtState,
    label: Option<Name>,
    span: Span,
) -> Result<(), LowerError> {
    let frame = state.loops.resolve(label).map_err(|e| LowerError::from_loop_lookup(e, span))?;
    let vars = state.scope.vars_above(frame.owning_scope_depth);
    destructor::run_scope_exit(builder, destructors, &mut state.deferred_statics, vars)?;
    builder.terminate_jmp(frame.continue_target)?;
    Ok(())
}

fn lower_fallthrough(builder: &mut IrBuilder<'_>, state: &mut StmtState, span: Span) -> Result<(), LowerError> {
    let target = state.fallthrough.current().ok_or(LowerError::NotInLoop { span })?;
    builder.terminate_jmp(target)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn lower_switch(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    destructors: &dyn DestructorResolver,
    assignments: &dyn AssignmentResolver,
    ctx: &StmtCtx<'_>,
    state: &mut StmtState,
    cond: ExprId,
    is_exhaustive: bool,
    cases: &[SwitchCase],
    default: Option<&[Stmt]>,
    span: Span,
) -> Result<(), LowerError> {
    let ectx = expr_ctx(ctx, state);
    let cond_val = expr::lower_expr(builder, resolver, &ectx, cond)?;

    if !matches!(resolver.ir_types().get(cond_val.ty), IrTypeData::Int(_) | IrTypeData::Bool) {
        return Err(LowerError::NotInteger { span });
    }

    // Over a known enum's variant count, exhaustiveness is checked by
    // *which* variants the cases cover, not merely how many cases there
    // are — `Red, Red, Green` against a 3-variant enum has 2 cases but
    // covers only 2 of 3 variants and must still fail (invariant 7).
    let variant_count = ctx.enum_variant_counts.get(&cond_val.ty).copied();
    let exhaustive_over_enum = is_exhaustive && default.is_none() && variant_count.is_some();

    let mut seen_values = FxHashSet::default();
    let mut covered_variants = FxHashSet::default();
    for case in cases {
        let value = case_const_value(ctx, case.value)?;
        if exhaustive_over_enum {
            let count = variant_count.expect("exhaustive_over_enum implies variant_count is Some");
            if value < 0 || value as usize >= count {
                return Err(LowerError::OutOfBoundsCaseValue { span: case.span });
            }
            if !covered_variants.insert(value) {
                return Err(LowerError::ExhaustiveSwitchExtraneousCase { span: case.span });
            }
        } else if !seen_values.insert(value) {
            return Err(LowerError::DuplicateCase { span: case.span });
        }
    }
    if exhaustive_over_enum {
        let count = variant_count.expect("exhaustive_over_enum implies variant_count is Some");
        if covered_variants.len() < count {
            return Err(LowerError::NonExhaustiveSwitch { span, missing_count: count - covered_variants.len() });
        }
    }

    let merge_block = builder.new_block();
    let default_block = builder.new_block();

    let mut case_targets = Vec::with_capacity(cases.len());
    let mut case_blocks = Vec::with_capacity(cases.len());
    for case in cases {
        let value = case_const_value(ctx, case.value)?;
        let block = builder.new_block();
        case_targets.push((value, block));
        case_blocks.push(block);
    }
    builder.terminate_switch(cond_val, case_targets, default_block)?;

    let mut any_falls_through = false;
    for (case, &block) in cases.iter().zip(case_blocks.iter()) {
        builder.use_block(block);
        let next_case_block = case_blocks
            .iter()
            .skip_while(|&&b| b != block)
            .nth(1)
            .copied()
            .unwrap_or(merge_block);
        // `fallthrough` inside this case jumps to the next case's block (or
        // the switch's merge block for the last case), saved/restored so a
        // nested switch's own `fallthrough` doesn't escape here.
        state.fallthrough.push(next_case_block);
        lower_block(builder, resolver, destructors, assignments, ctx, state, &case.body)?;
        state.fallthrough.pop();
        if !builder.is_current_block_terminated() {
            any_falls_through = true;
            let target = if case.fallthrough { next_case_block } else { merge_block };
            builder.terminate_jmp(target)?;
        }
    }

    builder.use_block(default_block);
    if let Some(default_stmts) = default {
        lower_block(builder, resolver, destructors, assignments, ctx, state, default_stmts)?;
    }
    if !builder.is_current_block_terminated() {
        any_falls_through = true;
        builder.terminate_jmp(merge_block)?;
    }

    if any_falls_through {
        builder.use_block(merge_block);
    }
    Ok(())
}

fn case_const_value(ctx: &StmtCtx<'_>, id: ExprId) -> Result<i64, LowerError> {
    use kiln_ir::ast::{ExprKind, Literal};
    match &ctx.arena.get(id).kind {
        ExprKind::Literal(Literal::Int(v)) => Ok(*v),
        ExprKind::Literal(Literal::Bool(v)) => Ok(i64::from(*v)),
        ExprKind::Literal(Literal::Char(c)) => Ok(i64::from(u32::from(*c))),
        _ => Err(LowerError::Internal("switch case value is not a compile-time constant".to_string())),
    }
}

fn alloc_hidden_counter(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    usize_ty: TypeId,
) -> Result<IrValue, LowerError> {
    let slot = builder.push_slot(Name::EMPTY, usize_ty);
    let ptr_ty = resolver.ir_types_mut().intern(IrTypeData::Pointer(usize_ty));
    let ptr = IrValue::new(ValueKind::Local(slot), ptr_ty);
    let zero = IrBuilder::literal_usize(0, usize_ty);
    builder.store(ptr.clone(), zero).map_err(LowerError::from)?;
    Ok(ptr)
}

fn bump_hidden_counter(builder: &mut IrBuilder<'_>, ptr: IrValue, usize_ty: TypeId, span: Span) -> Result<(), LowerError> {
    let current = builder.load(ptr.clone(), usize_ty)?;
    let one = IrBuilder::literal_usize(1, usize_ty);
    let next = builder.math(MathOp::IAdd, current, one, usize_ty, span)?;
    builder.store(ptr, next)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_ir::ast::{ExprKind, Literal};
    use kiln_ir::ir::{IntWidth, IrFunction, IrTypeData, Terminator, TypeInterner};
    use kiln_types::TypeRegistry;

    struct NoDestructors;
    impl DestructorResolver for NoDestructors {
        fn defer_fn(&self, _ty: TypeId) -> Option<(Name, TypeId)> {
            None
        }
    }

    struct NoAssign;
    impl AssignmentResolver for NoAssign {
        fn assign_fn(&self, _ty: TypeId) -> Option<Name> {
            None
        }
        fn copy_assign_fn(&self, _ty: TypeId) -> Option<Name> {
            None
        }
    }

    fn stmt(kind: StmtKind) -> Stmt {
        Stmt { kind, span: Span::DUMMY }
    }

    struct Harness {
        registry: TypeRegistry,
        strings: kiln_ir::StringInterner,
        types: TypeInterner,
        call_returns: FxHashMap<Name, TypeId>,
        enum_variant_counts: FxHashMap<TypeId, usize>,
        arena: ExprArena,
        ns: Namespace,
        length_method: Name,
        array_method: Name,
    }

    impl Harness {
        fn new() -> Self {
            let mut strings = kiln_ir::StringInterner::new();
            let length_method = strings.intern("__length__");
            let array_method = strings.intern("__array__");
            Harness {
                registry: TypeRegistry::new(),
                strings,
                types: TypeInterner::new(),
                call_returns: FxHashMap::default(),
                enum_variant_counts: FxHashMap::default(),
                arena: ExprArena::new(),
                ns: Namespace::global(),
                length_method,
                array_method,
            }
        }

        fn ctx<'a>(&'a self, return_type: TypeId) -> StmtCtx<'a> {
            StmtCtx {
                arena: &self.arena,
                current_ns: &self.ns,
                using_ns: &[],
                call_returns: &self.call_returns,
                enum_variant_counts: &self.enum_variant_counts,
                return_type,
                flags: CompilerFlags::empty(),
                is_main: false,
                length_method: self.length_method,
                array_method: self.array_method,
            }
        }
    }

    fn int_literal(arena: &mut ExprArena, v: i64) -> ExprId {
        arena.alloc(ExprKind::Literal(Literal::Int(v)), Span::DUMMY)
    }

    #[test]
    fn simple_return_lowers_to_one_add_and_a_ret() {
        let mut h = Harness::new();
        let i32_ty = h.types.int(IntWidth::S32);
        let lhs = int_literal(&mut h.arena, 2);
        let rhs = int_literal(&mut h.arena, 3);
        let sum = h.arena.alloc(ExprKind::Binary { op: BinaryOp::Add, lhs, rhs }, Span::DUMMY);
        let body = vec![stmt(StmtKind::Return(Some(sum)))];

        let mut resolver = Resolver::new(&h.registry, &h.strings, &mut h.types);
        let mut function = IrFunction::new(Name::from_raw(0), vec![], i32_ty);
        let mut builder = IrBuilder::new(&mut function);
        let entry = builder.new_block();
        builder.use_block(entry);
        let ctx = h.ctx(i32_ty);
        let mut state = StmtState::new();
        let destructors = NoDestructors;
        let assignments = NoAssign;

        lower_block(&mut builder, &mut resolver, &destructors, &assignments, &ctx, &mut state, &body).unwrap();

        assert_eq!(function.block(entry).instrs.len(), 1);
        assert!(matches!(
            function.block(entry).terminator,
            Some(Terminator::Return(Some(_)))
        ));
    }

    #[test]
    fn if_else_both_branches_returning_leaves_merge_block_unentered() {
        let mut h = Harness::new();
        let i32_ty = h.types.int(IntWidth::S32);
        let x_name = h.strings.intern("x");
        let zero = int_literal(&mut h.arena, 0);
        let x_ref = h.arena.alloc(ExprKind::Identifier(x_name), Span::DUMMY);
        let cond = h.arena.alloc(ExprKind::Binary { op: BinaryOp::Gt, lhs: x_ref, rhs: zero }, Span::DUMMY);
        let one = int_literal(&mut h.arena, 1);
        let neg_one = int_literal(&mut h.arena, -1);
        let then_body = vec![stmt(StmtKind::Return(Some(one)))];
        let else_body = vec![stmt(StmtKind::Return(Some(neg_one)))];
        let body = vec![stmt(StmtKind::If { cond, negate: false, then_body, else_body: Some(else_body) })];

        let mut resolver = Resolver::new(&h.registry, &h.strings, &mut h.types);
        let mut function = IrFunction::new(Name::from_raw(0), vec![i32_ty], i32_ty);
        let x_slot = function.push_slot(x_name, i32_ty);
        let mut builder = IrBuilder::new(&mut function);
        let entry = builder.new_block();
        builder.use_block(entry);
        let ctx = h.ctx(i32_ty);
        let mut state = StmtState::new();
        state.scope.declare(BridgeVar { name: x_name, slot: x_slot, ty: i32_ty, traits: VarTraits::POD, span: Span::DUMMY });
        let destructors = NoDestructors;
        let assignments = NoAssign;

        lower_block(&mut builder, &mut resolver, &destructors, &assignments, &ctx, &mut state, &body).unwrap();

        // entry, then, else, merge — merge is allocated but never entered
        // since both arms return.
        assert_eq!(function.blocks.len(), 5);
        assert!(matches!(function.block(entry).terminator, Some(Terminator::CondBranch { .. })));
        let then_block = kiln_ir::ir::BlockId::new(2);
        let else_block = kiln_ir::ir::BlockId::new(3);
        let merge_block = kiln_ir::ir::BlockId::new(4);
        assert!(matches!(function.block(then_block).terminator, Some(Terminator::Return(Some(_)))));
        assert!(matches!(function.block(else_block).terminator, Some(Terminator::Return(Some(_)))));
        assert!(function.block(merge_block).terminator.is_none());
        assert!(function.block(merge_block).instrs.is_empty());
    }

    #[test]
    fn each_in_over_a_fixed_array_never_calls_a_destructor() {
        let mut h = Harness::new();
        let i32_ty = h.types.int(IntWidth::S32);
        let array_ty = h.types.intern(IrTypeData::FixedArray(i32_ty, 4));
        let array_name = h.strings.intern("arr");
        let it_name = h.strings.intern("it");
        let array_ref = h.arena.alloc(ExprKind::Identifier(array_name), Span::DUMMY);
        let sum_name = h.strings.intern("sum");
        let sum_ref = h.arena.alloc(ExprKind::Identifier(sum_name), Span::DUMMY);
        let it_ref = h.arena.alloc(ExprKind::Identifier(it_name), Span::DUMMY);
        let body = vec![stmt(StmtKind::CompoundAssign { op: BinaryOp::Add, target: sum_ref, value: it_ref })];
        let each = stmt(StmtKind::EachIn {
            element_name: it_name,
            source: EachInSource::List(array_ref),
            it_type: None,
            is_static: true,
            body,
            label: None,
        });

        let mut resolver = Resolver::new(&h.registry, &h.strings, &mut h.types);
        let mut function = IrFunction::new(Name::from_raw(0), vec![], i32_ty);
        let array_slot = function.push_slot(array_name, array_ty);
        let sum_slot = function.push_slot(sum_name, i32_ty);
        let mut builder = IrBuilder::new(&mut function);
        let entry = builder.new_block();
        builder.use_block(entry);
        let ctx = h.ctx(i32_ty);
        let mut state = StmtState::new();
        state.scope.declare(BridgeVar { name: array_name, slot: array_slot, ty: array_ty, traits: VarTraits::POD | VarTraits::STATIC, span: Span::DUMMY });
        state.scope.declare(BridgeVar { name: sum_name, slot: sum_slot, ty: i32_ty, traits: VarTraits::POD, span: Span::DUMMY });

        struct AlwaysDestruct;
        impl DestructorResolver for AlwaysDestruct {
            fn defer_fn(&self, _ty: TypeId) -> Option<(Name, TypeId)> {
                Some((Name::from_raw(999), TypeId::from_raw(0)))
            }
        }
        let destructors = AlwaysDestruct;
        let assignments = NoAssign;

        lower_block(&mut builder, &mut resolver, &destructors, &assignments, &ctx, &mut state, std::slice::from_ref(&each)).unwrap();

        // No block in the function should contain a Call instruction: the
        // `it` element is REFERENCE and the array itself is STATIC, so
        // neither is destructed here.
        for block in &function.blocks {
            assert!(!block.instrs.iter().any(|i| matches!(i.kind, kiln_ir::ir::InstrKind::Call { .. })));
        }
    }

    #[test]
    fn fallthrough_in_switch_jumps_to_the_next_case_block_not_the_merge_block() {
        let mut h = Harness::new();
        let i32_ty = h.types.int(IntWidth::S32);
        let k_name = h.strings.intern("k");
        let k_ref = h.arena.alloc(ExprKind::Identifier(k_name), Span::DUMMY);
        let a_name = h.strings.intern("a");
        let b_name = h.strings.intern("b");
        h.call_returns.insert(a_name, i32_ty);
        h.call_returns.insert(b_name, i32_ty);
        let case1_val = int_literal(&mut h.arena, 1);
        let case2_val = int_literal(&mut h.arena, 2);
        let call_a = h.arena.alloc(ExprKind::Call { callee: a_name, args: vec![] }, Span::DUMMY);
        let call_b = h.arena.alloc(ExprKind::Call { callee: b_name, args: vec![] }, Span::DUMMY);
        let case1 = SwitchCase {
            value: case1_val,
            body: vec![stmt(StmtKind::ExprStmt(call_a)), stmt(StmtKind::Fallthrough)],
            fallthrough: true,
            span: Span::DUMMY,
        };
        let case2 = SwitchCase {
            value: case2_val,
            body: vec![stmt(StmtKind::ExprStmt(call_b))],
            fallthrough: false,
            span: Span::DUMMY,
        };
        let body = vec![stmt(StmtKind::Switch { cond: k_ref, is_exhaustive: false, cases: vec![case1, case2], default: None })];

        let mut resolver = Resolver::new(&h.registry, &h.strings, &mut h.types);
        let mut function = IrFunction::new(Name::from_raw(0), vec![i32_ty], i32_ty);
        let k_slot = function.push_slot(k_name, i32_ty);
        let mut builder = IrBuilder::new(&mut function);
        let entry = builder.new_block();
        builder.use_block(entry);
        let ctx = h.ctx(i32_ty);
        let mut state = StmtState::new();
        state.scope.declare(BridgeVar { name: k_name, slot: k_slot, ty: i32_ty, traits: VarTraits::POD, span: Span::DUMMY });
        let destructors = NoDestructors;
        let assignments = NoAssign;

        lower_block(&mut builder, &mut resolver, &destructors, &assignments, &ctx, &mut state, &body).unwrap();

        let switch_cases = match &function.block(entry).terminator {
            Some(Terminator::Switch { cases, .. }) => cases.clone(),
            other => panic!("expected a switch terminator, got {other:?}"),
        };
        let (_, case1_block) = switch_cases[0];
        let (_, case2_block) = switch_cases[1];
        assert_eq!(function.block(case1_block).terminator, Some(Terminator::Jump(case2_block)));
    }

    #[test]
    fn exhaustive_switch_missing_a_case_fails_lowering() {
        let mut h = Harness::new();
        let i32_ty = h.types.int(IntWidth::S32);
        // Enums collapse onto the shared int32 TypeId (spec §3's 32-bit
        // kind-index representation); `enum_variant_counts` keys on that
        // same TypeId for exhaustiveness checking.
        h.enum_variant_counts.insert(i32_ty, 3);
        let c_name = h.strings.intern("c");
        let c_ref = h.arena.alloc(ExprKind::Identifier(c_name), Span::DUMMY);
        let red = int_literal(&mut h.arena, 0);
        let blue = int_literal(&mut h.arena, 2);
        let cases = vec![
            SwitchCase { value: red, body: vec![], fallthrough: false, span: Span::DUMMY },
            SwitchCase { value: blue, body: vec![], fallthrough: false, span: Span::DUMMY },
        ];
        let body = vec![stmt(StmtKind::Switch { cond: c_ref, is_exhaustive: true, cases, default: None })];

        let mut resolver = Resolver::new(&h.registry, &h.strings, &mut h.types);
        let mut function = IrFunction::new(Name::from_raw(0), vec![i32_ty], i32_ty);
        let c_slot = function.push_slot(c_name, i32_ty);
        let mut builder = IrBuilder::new(&mut function);
        let entry = builder.new_block();
        builder.use_block(entry);
        let ctx = h.ctx(i32_ty);
        let mut state = StmtState::new();
        state.scope.declare(BridgeVar { name: c_name, slot: c_slot, ty: i32_ty, traits: VarTraits::POD, span: Span::DUMMY });
        let destructors = NoDestructors;
        let assignments = NoAssign;

        let err = lower_block(&mut builder, &mut resolver, &destructors, &assignments, &ctx, &mut state, &body).unwrap_err();
        assert!(matches!(err, LowerError::NonExhaustiveSwitch { missing_count: 1, .. }));
    }

    #[test]
    fn labeled_break_from_a_nested_loop_targets_the_outer_loops_exit() {
        let mut h = Harness::new();
        let i32_ty = h.types.int(IntWidth::S32);
        let bool_ty = h.types.bool_ty();
        let outer_label = h.strings.intern("outer");
        let cond = h.arena.alloc(ExprKind::Literal(Literal::Bool(true)), Span::DUMMY);
        let inner_body = vec![stmt(StmtKind::Break(Some(outer_label)))];
        let inner = stmt(StmtKind::While { cond, negate: false, body: inner_body, label: None });
        let outer = stmt(StmtKind::While { cond, negate: false, body: vec![inner], label: Some(outer_label) });

        let mut resolver = Resolver::new(&h.registry, &h.strings, &mut h.types);
        let mut function = IrFunction::new(Name::from_raw(0), vec![], i32_ty);
        let mut builder = IrBuilder::new(&mut function);
        let entry = builder.new_block();
        builder.use_block(entry);
        let ctx = h.ctx(i32_ty);
        let mut state = StmtState::new();
        let destructors = NoDestructors;
        let assignments = NoAssign;

        lower_block(&mut builder, &mut resolver, &destructors, &assignments, &ctx, &mut state, std::slice::from_ref(&outer)).unwrap();

        // Blocks allocate in order: entry(1), outer header/body/exit(2,3,4),
        // inner header/body/exit(5,6,7). The inner `break outer` must target
        // block 4 — outer's exit — not inner's own exit block 7.
        let _ = bool_ty;
        let outer_exit = kiln_ir::ir::BlockId::new(4);
        let inner_break_block = function
            .blocks
            .iter()
            .position(|b| matches!(&b.terminator, Some(Terminator::Jump(target)) if *target == outer_exit));
        assert!(inner_break_block.is_some(), "expected a jump targeting outer's exit block (id 4)");
    }

    #[test]
    fn no_undef_flag_forces_zero_init_despite_is_undef() {
        let mut h = Harness::new();
        let i32_ty = h.types.int(IntWidth::S32);
        let name = h.strings.intern("n");
        let body = vec![stmt(StmtKind::Declare { name, ty: Some(kiln_ir::ast::AstType::base(h.strings.intern("int32"))), init: None, is_pod: true, is_static: false, is_undef: true })];

        let mut resolver = Resolver::new(&h.registry, &h.strings, &mut h.types);
        let mut function = IrFunction::new(Name::from_raw(0), vec![], i32_ty);
        let mut builder = IrBuilder::new(&mut function);
        let entry = builder.new_block();
        builder.use_block(entry);
        let mut ctx = h.ctx(i32_ty);
        ctx.flags = CompilerFlags::NO_UNDEF;
        let mut state = StmtState::new();
        let destructors = NoDestructors;
        let assignments = NoAssign;

        lower_block(&mut builder, &mut resolver, &destructors, &assignments, &ctx, &mut state, &body).unwrap();

        assert!(function.block(entry).instrs.iter().any(|i| matches!(i.kind, kiln_ir::ir::InstrKind::Store { .. })));
    }
}
