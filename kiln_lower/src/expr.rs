//! C6 Expression Lowering: `ExprKind` → `IrValue`.
//!
//! Dispatch shape follows `ori_llvm`'s expression codegen (one function per
//! `ExprKind` variant, lvalues produced by a sibling `lower_lvalue` that
//! `lower_expr` loads through for rvalue contexts).

use rustc_hash::FxHashMap;

use kiln_ir::ast::{BinaryOp, Expr, ExprArena, ExprId, ExprKind, Literal, Namespace, UnaryOp};
use kiln_ir::ir::{
    FCmpOp, ICmpOp, IntWidth, IrBuilder, IrTypeData, IrValue, LitValue, MathOp, TypeId,
    TypeInterner, ValueKind,
};
use kiln_ir::{Name, Span};
use kiln_types::{conform, ConformMode, Resolver};

use crate::error::LowerError;
use crate::scope::BridgeScope;

/// Read-only context threaded through one function body's lowering.
pub struct ExprCtx<'a> {
    pub arena: &'a ExprArena,
    pub scope: &'a BridgeScope,
    pub current_ns: &'a Namespace,
    pub using_ns: &'a [Namespace],
    /// Declared return type of every callable name visible here (free
    /// functions and methods share one namespace at the call-name level,
    /// matching `StmtKind::Call`'s already-resolved-callee convention).
    /// Overload resolution itself happens upstream (spec §4.3); this core
    /// only needs the winning candidate's return type to type the call's
    /// result value.
    pub call_returns: &'a FxHashMap<Name, TypeId>,
}

fn expr<'a>(ctx: &ExprCtx<'a>, id: ExprId) -> &'a Expr {
    ctx.arena.get(id)
}

pub(crate) fn math_op_for(op: BinaryOp, is_float: bool, is_signed: bool) -> Option<MathOp> {
    use BinaryOp::{Add, BitAnd, BitOr, BitXor, Div, Eq, Ge, Gt, Le, Lt, Mod, Mul, Ne, Shl, Shr, Sub};
    Some(match (op, is_float, is_signed) {
        (Add, true, _) => MathOp::FAdd,
        (Add, false, _) => MathOp::IAdd,
        (Sub, true, _) => MathOp::FSub,
        (Sub, false, _) => MathOp::ISub,
        (Mul, true, _) => MathOp::FMul,
        (Mul, false, _) => MathOp::IMul,
        (Div, true, _) => MathOp::FDiv,
        (Div, false, true) => MathOp::SDiv,
        (Div, false, false) => MathOp::UDiv,
        (Mod, true, _) => MathOp::FMod,
        (Mod, false, true) => MathOp::SMod,
        (Mod, false, false) => MathOp::UMod,
        (BitAnd, false, _) => MathOp::And,
        (BitOr, false, _) => MathOp::Or,
        (BitXor, false, _) => MathOp::Xor,
        (Shl, false, _) => MathOp::Shl,
        (Shr, false, true) => MathOp::AShr,
        (Shr, false, false) => MathOp::LShr,
        (Eq, true, _) => MathOp::FCmp(FCmpOp::Eq),
        (Ne, true, _) => MathOp::FCmp(FCmpOp::Ne),
        (Lt, true, _) => MathOp::FCmp(FCmpOp::Lt),
        (Le, true, _) => MathOp::FCmp(FCmpOp::Le),
        (Gt, true, _) => MathOp::FCmp(FCmpOp::Gt),
        (Ge, true, _) => MathOp::FCmp(FCmpOp::Ge),
        (Eq, false, _) => MathOp::ICmp(ICmpOp::Eq),
        (Ne, false, _) => MathOp::ICmp(ICmpOp::Ne),
        (Lt, false, true) => MathOp::ICmp(ICmpOp::SLt),
        (Lt, false, false) => MathOp::ICmp(ICmpOp::ULt),
        (Le, false, true) => MathOp::ICmp(ICmpOp::SLe),
        (Le, false, false) => MathOp::ICmp(ICmpOp::ULe),
        (Gt, false, true) => MathOp::ICmp(ICmpOp::SGt),
        (Gt, false, false) => MathOp::ICmp(ICmpOp::UGt),
        (Ge, false, true) => MathOp::ICmp(ICmpOp::SGe),
        (Ge, false, false) => MathOp::ICmp(ICmpOp::UGe),
        (BinaryOp::And | BinaryOp::Or, _, _) => return None,
    })
}

fn is_comparison(op: MathOp) -> bool {
    matches!(op, MathOp::ICmp(_) | MathOp::FCmp(_))
}

/// Lower `id` to a loaded rvalue.
pub fn lower_expr(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    ctx: &ExprCtx<'_>,
    id: ExprId,
) -> Result<IrValue, LowerError> {
    let node = expr(ctx, id);
    let span = node.span;
    match node.kind.clone() {
        ExprKind::Literal(lit) => lower_literal(resolver.ir_types(), lit),
        ExprKind::Identifier(_) | ExprKind::Member { .. } | ExprKind::Subscript { .. } => {
            let (ptr, pointee) = lvalue(builder, resolver, ctx, id)?;
            builder.load(ptr, pointee).map_err(LowerError::from)
        }
        ExprKind::Unary { op, operand } => lower_unary(builder, resolver, ctx, op, operand, span),
        ExprKind::Binary { op, lhs, rhs } => lower_binary(builder, resolver, ctx, op, lhs, rhs, span),
        ExprKind::Call { callee, args } => lower_call(builder, resolver, ctx, callee, &args, span),
        ExprKind::MethodCall { receiver, method, args } => {
            lower_method_call(builder, resolver, ctx, receiver, method, &args, span)
        }
        ExprKind::New { ty, args } => lower_new(builder, resolver, ctx, &ty, &args, span),
        ExprKind::Delete { ptr } => lower_delete(builder, resolver, ctx, ptr, span),
        ExprKind::Ternary { cond, then_branch, else_branch } => {
            lower_ternary(builder, resolver, ctx, cond, then_branch, else_branch, span)
        }
        ExprKind::VaStart { list } => lower_va_list_op(builder, resolver, ctx, &[list], span),
        ExprKind::VaEnd { list } => lower_va_list_op(builder, resolver, ctx, &[list], span),
        ExprKind::VaCopy { dst, src } => lower_va_list_op(builder, resolver, ctx, &[dst, src], span),
    }
}

/// Lower `id` as a branch condition, short-circuiting nested `&&`/`||`
/// chains into the given targets rather than eagerly evaluating both
/// operands (spec §4.6's `if`/`while`/`unless`/`until` conditions). A plain
/// value-producing `&&`/`||` (not used as a branch condition) still falls
/// back to eager evaluation in `lower_binary`.
pub fn lower_condition(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    ctx: &ExprCtx<'_>,
    id: ExprId,
    true_target: kiln_ir::ir::BlockId,
    false_target: kiln_ir::ir::BlockId,
) -> Result<(), LowerError> {
    let node = expr(ctx, id);
    let span = node.span;
    match node.kind.clone() {
        ExprKind::Binary { op: BinaryOp::And, lhs, rhs } => {
            let mid = builder.new_block();
            lower_condition(builder, resolver, ctx, lhs, mid, false_target)?;
            builder.use_block(mid);
            lower_condition(builder, resolver, ctx, rhs, true_target, false_target)
        }
        ExprKind::Binary { op: BinaryOp::Or, lhs, rhs } => {
            let mid = builder.new_block();
            lower_condition(builder, resolver, ctx, lhs, true_target, mid)?;
            builder.use_block(mid);
            lower_condition(builder, resolver, ctx, rhs, true_target, false_target)
        }
        _ => {
            let cond_val = lower_expr(builder, resolver, ctx, id)?;
            let bool_ty = resolver.ir_types().bool_ty();
            let conformed = conform(builder, resolver.ir_types(), cond_val, bool_ty, ConformMode::Calculation, span)
                .map_err(|_| LowerError::NotBool { span })?;
            builder.terminate_cond(conformed, true_target, false_target).map_err(LowerError::from)
        }
    }
}

fn lower_literal(types: &TypeInterner, lit: Literal) -> Result<IrValue, LowerError> {
    // Literal types are the widest native representation; the enclosing
    // conformance step (spec §4.2) narrows/widens to context as needed.
    Ok(match lit {
        Literal::Int(v) => IrValue::new(ValueKind::Literal(LitValue::Int(v)), types.int(IntWidth::S32)),
        // No dedicated float literal kind in `LitValue`: the bit pattern
        // rides in `UInt` and is reinterpreted by the backend per `ty`.
        Literal::Float(bits) => {
            IrValue::new(ValueKind::Literal(LitValue::UInt(bits)), types.float(kiln_ir::ir::FloatWidth::F64))
        }
        Literal::Bool(v) => IrValue::new(ValueKind::Literal(LitValue::Bool(v)), types.bool_ty()),
        Literal::Str(name) => IrValue::new(ValueKind::AnonymousGlobal(name.raw()), types.bytes_pointer()),
        Literal::Char(c) => IrValue::new(ValueKind::Literal(LitValue::Int(i64::from(u32::from(c)))), types.int(IntWidth::S32)),
    })
}

/// Produce the address of an expression used in an assignment/member/
/// subscript base position.
pub fn lower_lvalue(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    ctx: &ExprCtx<'_>,
    id: ExprId,
) -> Result<IrValue, LowerError> {
    lvalue(builder, resolver, ctx, id).map(|(ptr, _)| ptr)
}

/// Every lvalue-producing path, returning `(address, pointee type)`. The
/// address's own `.ty` is always `Pointer(pointee)` — the same convention
/// `IrBuilder::alloc`/`field_access`/`array_access` already use for their
/// result types — so callers can uniformly `load` through it.
fn lvalue(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    ctx: &ExprCtx<'_>,
    id: ExprId,
) -> Result<(IrValue, TypeId), LowerError> {
    let node = expr(ctx, id);
    let span = node.span;
    match node.kind.clone() {
        ExprKind::Identifier(name) => {
            let var = ctx
                .scope
                .lookup(name)
                .ok_or(LowerError::UnknownIdentifier { name, span })?;
            let (slot, pointee) = (var.slot, var.ty);
            let ptr_ty = resolver.ir_types_mut().intern(IrTypeData::Pointer(pointee));
            Ok((IrValue::new(ValueKind::Local(slot), ptr_ty), pointee))
        }
        ExprKind::Member { base, field } => lvalue_member(builder, resolver, ctx, base, field, span),
        ExprKind::Subscript { base, index } => lvalue_subscript(builder, resolver, ctx, base, index, span),
        ExprKind::Unary { op: UnaryOp::Deref, operand } => {
            let ptr = lower_expr(builder, resolver, ctx, operand)?;
            let pointee = match resolver.ir_types().get(ptr.ty) {
                IrTypeData::Pointer(inner) => *inner,
                _ => return Err(LowerError::NotPointer { span }),
            };
            Ok((ptr, pointee))
        }
        _ => Err(LowerError::NotMutable { span }),
    }
}

fn lvalue_member(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    ctx: &ExprCtx<'_>,
    base: ExprId,
    field: Name,
    span: Span,
) -> Result<(IrValue, TypeId), LowerError> {
    let (base_ptr, struct_ty) = lvalue(builder, resolver, ctx, base)?;
    let field_names = resolver
        .field_names(struct_ty)
        .ok_or_else(|| LowerError::Internal("member access on an unresolved composite".to_string()))?;
    let field_index = field_names
        .iter()
        .position(|&n| n == field)
        .ok_or(LowerError::UnknownIdentifier { name: field, span })?;
    let field_ty = match resolver.ir_types().get(struct_ty) {
        IrTypeData::Structure(fields) => fields[field_index],
        _ => return Err(LowerError::Internal("member access base is not a composite".to_string())),
    };
    let field_ptr_ty = resolver.ir_types_mut().intern(IrTypeData::Pointer(field_ty));
    let field_index = field_index as u32;
    let ptr = builder
        .field_access(base_ptr, field_index, field_ptr_ty)
        .map_err(LowerError::from)?;
    Ok((ptr, field_ty))
}

fn lvalue_subscript(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    ctx: &ExprCtx<'_>,
    base: ExprId,
    index: ExprId,
    span: Span,
) -> Result<(IrValue, TypeId), LowerError> {
    let (base_ptr, pointee) = lvalue(builder, resolver, ctx, base)?;
    let index_val = lower_expr(builder, resolver, ctx, index)?;
    // `base_ptr` is the address of the base variable; a fixed-array base
    // decays in place (no load needed), while a pointer-typed base must be
    // loaded first so we index the pointer's *value*, not its storage slot.
    let (array_addr, elem_ty) = match resolver.ir_types().get(pointee).clone() {
        IrTypeData::FixedArray(elem, _) => (base_ptr, elem),
        IrTypeData::Pointer(elem) => {
            let loaded = builder.load(base_ptr, pointee).map_err(LowerError::from)?;
            (loaded, elem)
        }
        _ => return Err(LowerError::NotPointer { span }),
    };
    let elem_ptr_ty = resolver.ir_types_mut().intern(IrTypeData::Pointer(elem_ty));
    let ptr = builder
        .array_access(array_addr, index_val, elem_ptr_ty)
        .map_err(LowerError::from)?;
    Ok((ptr, elem_ty))
}

fn lower_unary(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    ctx: &ExprCtx<'_>,
    op: UnaryOp,
    operand: ExprId,
    span: Span,
) -> Result<IrValue, LowerError> {
    match op {
        UnaryOp::AddressOf => lower_lvalue(builder, resolver, ctx, operand),
        UnaryOp::Deref => {
            let ptr = lower_expr(builder, resolver, ctx, operand)?;
            let pointee = match resolver.ir_types().get(ptr.ty) {
                IrTypeData::Pointer(inner) => *inner,
                _ => return Err(LowerError::NotPointer { span }),
            };
            builder.load(ptr, pointee).map_err(LowerError::from)
        }
        UnaryOp::Neg => {
            let val = lower_expr(builder, resolver, ctx, operand)?;
            let zero = IrBuilder::literal_int(0, val.ty);
            let ty = val.ty;
            builder.math(MathOp::ISub, zero, val, ty, span).map_err(LowerError::from)
        }
        UnaryOp::Not => {
            let val = lower_expr(builder, resolver, ctx, operand)?;
            let ty = val.ty;
            let one = IrBuilder::literal_bool(true, ty);
            builder.math(MathOp::Xor, val, one, ty, span).map_err(LowerError::from)
        }
        UnaryOp::BitNot => {
            let val = lower_expr(builder, resolver, ctx, operand)?;
            let ty = val.ty;
            let all_ones = IrBuilder::literal_int(-1, ty);
            builder.math(MathOp::Xor, val, all_ones, ty, span).map_err(LowerError::from)
        }
    }
}

fn lower_binary(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    ctx: &ExprCtx<'_>,
    op: BinaryOp,
    lhs: ExprId,
    rhs: ExprId,
    span: Span,
) -> Result<IrValue, LowerError> {
    let l = lower_expr(builder, resolver, ctx, lhs)?;
    let r = lower_expr(builder, resolver, ctx, rhs)?;

    if matches!(op, BinaryOp::And | BinaryOp::Or) {
        // Short-circuit evaluation needs control flow, not a single `math`
        // instruction; `expr::lower_condition` is the real short-circuit
        // path, used by `lower_if`/`lower_while` when `&&`/`||` is a full
        // branch condition. As a plain value-producing expression (e.g.
        // stored into a `bool` variable) this falls back to eager
        // (non-short-circuiting) evaluation.
        let bitwise = if matches!(op, BinaryOp::And) { MathOp::And } else { MathOp::Or };
        let ty = l.ty;
        return builder.math(bitwise, l, r, ty, span).map_err(LowerError::from);
    }

    let r = conform(builder, resolver.ir_types(), r, l.ty, ConformMode::Calculation, span)
        .map_err(LowerError::Type)?;

    let types = resolver.ir_types();
    let is_float = matches!(types.get(l.ty), IrTypeData::Float(_));
    let is_signed = match types.get(l.ty) {
        IrTypeData::Int(w) => w.is_signed(),
        _ => false,
    };
    let math_op = math_op_for(op, is_float, is_signed)
        .ok_or_else(|| LowerError::Internal("unsupported binary operator".to_string()))?;
    let result_ty = if is_comparison(math_op) { types.bool_ty() } else { l.ty };
    builder.math(math_op, l, r, result_ty, span).map_err(LowerError::from)
}

fn lower_call(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    ctx: &ExprCtx<'_>,
    callee: Name,
    args: &[ExprId],
    span: Span,
) -> Result<IrValue, LowerError> {
    let mut values = Vec::with_capacity(args.len());
    for &arg in args {
        values.push(lower_expr(builder, resolver, ctx, arg)?);
    }
    let return_ty = *ctx
        .call_returns
        .get(&callee)
        .ok_or(LowerError::UndeclaredFunction { name: callee, span })?;
    builder
        .call(callee, values, Some(return_ty), span)
        .map_err(LowerError::from)?
        .ok_or_else(|| LowerError::Internal("call used as an expression must return a value".to_string()))
}

pub(crate) fn lower_method_call(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    ctx: &ExprCtx<'_>,
    receiver: ExprId,
    method: Name,
    args: &[ExprId],
    span: Span,
) -> Result<IrValue, LowerError> {
    let this_ptr = lower_lvalue(builder, resolver, ctx, receiver)?;
    let mut values = Vec::with_capacity(args.len() + 1);
    values.push(this_ptr);
    for &arg in args {
        values.push(lower_expr(builder, resolver, ctx, arg)?);
    }
    let return_ty = *ctx
        .call_returns
        .get(&method)
        .ok_or(LowerError::UndeclaredFunction { name: method, span })?;
    builder
        .call(method, values, Some(return_ty), span)
        .map_err(LowerError::from)?
        .ok_or_else(|| LowerError::Internal("method call used as an expression must return a value".to_string()))
}

fn lower_new(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    ctx: &ExprCtx<'_>,
    ty: &kiln_ir::ast::AstType,
    args: &[ExprId],
    span: Span,
) -> Result<IrValue, LowerError> {
    let resolved = resolver
        .resolve(ty, ctx.current_ns, ctx.using_ns, span)
        .map_err(LowerError::Type)?;
    let ptr_ty = resolver.ir_types_mut().intern(IrTypeData::Pointer(resolved));
    let ptr = builder.alloc(resolved, ptr_ty, span)?;
    let zero = builder.zero_init(resolved)?;
    builder.store(ptr.clone(), zero)?;
    for &arg in args {
        // Constructor dispatch (the matching overload's call) is emitted by
        // the caller once the initializer method is resolved (spec §4.3);
        // arguments are still evaluated here for their side effects/order.
        let _ = lower_expr(builder, resolver, ctx, arg)?;
    }
    Ok(ptr)
}

pub(crate) fn lower_delete(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    ctx: &ExprCtx<'_>,
    ptr: ExprId,
    span: Span,
) -> Result<IrValue, LowerError> {
    let value = lower_expr(builder, resolver, ctx, ptr)?;
    if !matches!(resolver.ir_types().get(value.ty), IrTypeData::Pointer(_) | IrTypeData::BytesPointer) {
        return Err(LowerError::NotPointer { span });
    }
    let bytes_ty = resolver.ir_types().bytes_pointer();
    let as_bytes = builder.bitcast(value, bytes_ty)?;
    // The deallocation symbol itself is a runtime/ABI concern resolved by a
    // later phase; this core only guarantees the operand is normalized to
    // the opaque bytes-pointer shape that free-like runtime calls expect.
    builder.call(Name::EMPTY, vec![as_bytes], None, span)?;
    Ok(IrValue::new(ValueKind::Literal(LitValue::Null), bytes_ty))
}

fn lower_ternary(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    ctx: &ExprCtx<'_>,
    cond: ExprId,
    then_branch: ExprId,
    else_branch: ExprId,
    span: Span,
) -> Result<IrValue, LowerError> {
    let cond_val = lower_expr(builder, resolver, ctx, cond)?;
    let then_block = builder.new_block();
    let else_block = builder.new_block();
    let merge_block = builder.new_block();
    builder.terminate_cond(cond_val, then_block, else_block)?;

    builder.use_block(then_block);
    let then_val = lower_expr(builder, resolver, ctx, then_branch)?;
    let then_exit = current_block(builder)?;
    builder.terminate_jmp(merge_block)?;

    builder.use_block(else_block);
    let else_val = lower_expr(builder, resolver, ctx, else_branch)?;
    let else_val = conform(builder, resolver.ir_types(), else_val, then_val.ty, ConformMode::Calculation, span)
        .map_err(LowerError::Type)?;
    let else_exit = current_block(builder)?;
    builder.terminate_jmp(merge_block)?;

    builder.use_block(merge_block);
    let ty = then_val.ty;
    let (phi_value, _instr) = builder.phi2(ty, (then_val, then_exit), (else_val, else_exit))?;
    Ok(phi_value)
}

fn current_block(builder: &IrBuilder<'_>) -> Result<kiln_ir::ir::BlockId, LowerError> {
    builder
        .current_block_id()
        .ok_or_else(|| LowerError::Internal("no current block".to_string()))
}

/// `va_start`/`va_end`/`va_copy` all lower to an opaque inline-asm-style
/// marker over the list operand(s); none produce a meaningful value.
fn lower_va_list_op(
    builder: &mut IrBuilder<'_>,
    resolver: &mut Resolver<'_>,
    ctx: &ExprCtx<'_>,
    operands: &[ExprId],
    span: Span,
) -> Result<IrValue, LowerError> {
    let mut args = Vec::with_capacity(operands.len());
    for &operand in operands {
        args.push(lower_lvalue(builder, resolver, ctx, operand)?);
    }
    builder.llvm_asm(Name::EMPTY, Name::EMPTY, args, true, false, false, None, span)?;
    Ok(IrValue::new(ValueKind::Literal(LitValue::Null), resolver.ir_types().bytes_pointer()))
}
