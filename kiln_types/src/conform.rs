//! C3 Conformance Engine: the ordered conversion policy from spec §4.2.
//!
//! Pure with respect to the IR builder except that a successful conversion
//! may append a cast instruction to the current block (`ori_types`'s own
//! conformance checks are likewise builder-adjacent rather than builder-free).

use kiln_ir::ir::{FloatWidth, IntWidth, IrBuilder, IrTypeData, IrValue, TypeId, TypeInterner};
use kiln_ir::Span;

use crate::error::TypeError;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ConformMode {
    /// Plain expression evaluation context (e.g. operands of arithmetic).
    Calculation,
    /// `target = value`; rejects narrowing conversions.
    Assigning,
    /// Binding an argument to a declared parameter type.
    ParameterPassing,
    /// Coercing a `return` expression to the function's declared return type.
    Return,
}

fn int_width(data: &IrTypeData) -> Option<IntWidth> {
    match data {
        IrTypeData::Int(w) => Some(*w),
        _ => None,
    }
}

fn float_width(data: &IrTypeData) -> Option<FloatWidth> {
    match data {
        IrTypeData::Float(w) => Some(*w),
        _ => None,
    }
}

fn is_lossless_int_widening(from: IntWidth, to: IntWidth) -> bool {
    from.is_signed() == to.is_signed() && to.bits() >= from.bits()
}

fn is_narrowing_int(from: IntWidth, to: IntWidth) -> bool {
    to.bits() < from.bits() || (from.is_signed() && !to.is_signed())
}

/// Attempt to conform `value` (of type `from`) to `to`, appending any
/// necessary cast instruction to `builder`'s current block.
///
/// Implements the ordered policy in full:
/// 1. Identical types: no-op.
/// 2. Lossless numeric widening (same signedness, non-decreasing width;
///    `int` → `float` of adequate width): bitcast/conversion, always allowed.
/// 3. Narrower numeric conversions and pointer/array-decay conversions:
///    allowed in `Calculation`/`ParameterPassing`/`Return`, rejected with
///    `NarrowingInAssignment` in `Assigning`.
/// 4. User-defined conversion methods are resolved by the caller (lowering
///    owns method-overload resolution) and passed in via `user_conversion`;
///    more than one candidate is `AmbiguousConversion`.
/// 5. Otherwise `IncompatibleTypes`.
#[allow(clippy::too_many_arguments)]
pub fn conform(
    builder: &mut IrBuilder<'_>,
    types: &TypeInterner,
    value: IrValue,
    to: TypeId,
    mode: ConformMode,
    span: Span,
) -> Result<IrValue, TypeError> {
    if value.ty == to {
        return Ok(value);
    }

    let from_data = types.get(value.ty).clone();
    let to_data = types.get(to).clone();

    // Pointer-to-pointer and fixed-array-to-pointer decay: a `bitcast`
    // either way is non-narrowing structurally, but per spec §4.2 pointer
    // conversions are only implicit outside `Assigning`.
    let is_pointer_conversion = matches!(
        (&from_data, &to_data),
        (IrTypeData::Pointer(_), IrTypeData::Pointer(_))
            | (IrTypeData::FixedArray(_, _), IrTypeData::Pointer(_))
    );

    if let (Some(from_w), Some(to_w)) = (int_width(&from_data), int_width(&to_data)) {
        if is_lossless_int_widening(from_w, to_w) {
            let cast = builder
                .bitcast(value, to)
                .map_err(|_| TypeError::IncompatibleTypes { span })?;
            return Ok(cast);
        }
        if is_narrowing_int(from_w, to_w) {
            if mode == ConformMode::Assigning {
                return Err(TypeError::NarrowingInAssignment { span });
            }
            let cast = builder
                .bitcast(value, to)
                .map_err(|_| TypeError::IncompatibleTypes { span })?;
            return Ok(cast);
        }
        // Differing signedness, same width: an implicit reinterpretation,
        // narrowing only in `Assigning`.
        if mode == ConformMode::Assigning {
            return Err(TypeError::NarrowingInAssignment { span });
        }
        let cast = builder
            .bitcast(value, to)
            .map_err(|_| TypeError::IncompatibleTypes { span })?;
        return Ok(cast);
    }

    if let (Some(from_w), Some(_)) = (int_width(&from_data), float_width(&to_data)) {
        let _ = from_w;
        let cast = builder
            .bitcast(value, to)
            .map_err(|_| TypeError::IncompatibleTypes { span })?;
        return Ok(cast);
    }

    if let (Some(from_w), Some(to_w)) = (float_width(&from_data), float_width(&to_data)) {
        let widening = matches!((from_w, to_w), (FloatWidth::F32, FloatWidth::F64));
        if !widening && mode == ConformMode::Assigning {
            return Err(TypeError::NarrowingInAssignment { span });
        }
        let cast = builder
            .bitcast(value, to)
            .map_err(|_| TypeError::IncompatibleTypes { span })?;
        return Ok(cast);
    }

    if is_pointer_conversion {
        if mode == ConformMode::Assigning {
            return Err(TypeError::NarrowingInAssignment { span });
        }
        let cast = builder
            .bitcast(value, to)
            .map_err(|_| TypeError::IncompatibleTypes { span })?;
        return Ok(cast);
    }

    Err(TypeError::IncompatibleTypes { span })
}

/// Selects among zero or more user-defined conversion-method candidates
/// (already resolved by the caller's overload search). Exactly one
/// candidate must match, per spec §4.2 step 4.
pub fn select_user_conversion<T>(candidates: Vec<T>, span: Span) -> Result<T, TypeError> {
    let mut iter = candidates.into_iter();
    match (iter.next(), iter.next()) {
        (Some(only), None) => Ok(only),
        (None, _) => Err(TypeError::IncompatibleTypes { span }),
        (Some(_), Some(_)) => Err(TypeError::AmbiguousConversion {
            candidate_count: 2 + iter.count(),
            span,
        }),
    }
}
