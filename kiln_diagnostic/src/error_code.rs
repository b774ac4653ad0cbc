//! Error codes for the lowering core's diagnostics.
//!
//! Format: `L####`, first digit is the phase, matching the teacher's
//! `E####`-per-phase convention:
//! - L0xxx: type resolution (C2)
//! - L1xxx: conformance (C3)
//! - L2xxx: bridge scope / name resolution (C4)
//! - L3xxx: statement lowering (C7) control-flow errors
//! - L9xxx: internal lowering errors (C5/C8 invariant violations)

use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    /// Unknown type name.
    L0001,
    /// Generic composite instantiated with the wrong arity.
    L0002,

    /// No conversion exists between two types.
    L1001,
    /// More than one user-defined conversion method matched.
    L1002,
    /// An implicit narrowing conversion was attempted in an assignment.
    L1003,

    /// Name not found in any visible namespace.
    L2001,
    /// Break/continue/fallthrough used outside an enclosing loop or switch.
    L2002,
    /// Labeled break/continue referenced an unknown label.
    L2003,
    /// Call to a function name with no matching declaration.
    L2004,
    /// Redeclaration of a name already in the innermost scope.
    L2005,

    /// Non-exhaustive switch over an enum type.
    L3001,
    /// Two case labels in the same switch share a value.
    L3002,
    /// An lvalue was required but the expression does not produce one.
    L3003,
    /// A pointer operand was required but the expression's type isn't one.
    L3004,
    /// A condition did not conform to `bool`.
    L3005,
    /// A switch condition was not integer-like.
    L3006,
    /// A `for` loop's `before` statements contained a terminator.
    L3007,
    /// An exhaustive switch's case matched a kind already covered.
    L3008,
    /// A case constant fell outside the condition enum's declared kinds.
    L3009,
    /// `each in`'s bound element type didn't match the iterable's element type.
    L3010,
    /// A fixed array given to `each in` was not mutable.
    L3011,
    /// Module-level statics were declared but the Object has no `main`.
    L3012,
    /// Statements follow an unconditional `return` and can never execute.
    L3013,

    /// Internal invariant violation in the IR builder.
    L9001,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::L0001 => "L0001",
            ErrorCode::L0002 => "L0002",
            ErrorCode::L1001 => "L1001",
            ErrorCode::L1002 => "L1002",
            ErrorCode::L1003 => "L1003",
            ErrorCode::L2001 => "L2001",
            ErrorCode::L2002 => "L2002",
            ErrorCode::L2003 => "L2003",
            ErrorCode::L2004 => "L2004",
            ErrorCode::L2005 => "L2005",
            ErrorCode::L3001 => "L3001",
            ErrorCode::L3002 => "L3002",
            ErrorCode::L3003 => "L3003",
            ErrorCode::L3004 => "L3004",
            ErrorCode::L3005 => "L3005",
            ErrorCode::L3006 => "L3006",
            ErrorCode::L3007 => "L3007",
            ErrorCode::L3008 => "L3008",
            ErrorCode::L3009 => "L3009",
            ErrorCode::L3010 => "L3010",
            ErrorCode::L3011 => "L3011",
            ErrorCode::L3012 => "L3012",
            ErrorCode::L3013 => "L3013",
            ErrorCode::L9001 => "L9001",
        }
    }

    #[must_use]
    pub fn is_internal_error(self) -> bool {
        matches!(self, ErrorCode::L9001)
    }

    /// `EarlyReturnDeadCode` is the one warning-severity entry in the
    /// catalog; everything else is a hard error.
    #[must_use]
    pub fn is_warning(self) -> bool {
        matches!(self, ErrorCode::L3013)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_code_name() {
        assert_eq!(ErrorCode::L0001.to_string(), "L0001");
    }

    #[test]
    fn internal_errors_are_l9xxx() {
        assert!(ErrorCode::L9001.is_internal_error());
        assert!(!ErrorCode::L0001.is_internal_error());
    }
}
