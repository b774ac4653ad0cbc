//! Errors raised while lowering one function body.

use kiln_diagnostic::{Diagnostic, ErrorCode};
use kiln_ir::ir::BuilderError;
use kiln_ir::{Name, Span};
use kiln_types::TypeError;
use thiserror::Error;

use crate::scope::LoopLookupError;

#[derive(Clone, Debug, Error)]
pub enum LowerError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("identifier not found")]
    UnknownIdentifier { name: Name, span: Span },

    #[error("`break`/`continue`/`fallthrough` used outside an enclosing loop or switch")]
    NotInLoop { span: Span },

    #[error("labeled jump references an unknown label")]
    UnknownLabel { span: Span },

    #[error("non-exhaustive `switch` over an enum type")]
    NonExhaustiveSwitch { span: Span, missing_count: usize },

    #[error("call to an undeclared function")]
    UndeclaredFunction { name: Name, span: Span },

    #[error("redeclaration of a name already in this scope")]
    DuplicateDeclaration { name: Name, span: Span },

    #[error("duplicate `case` value in `switch`")]
    DuplicateCase { span: Span },

    #[error("expression does not produce an lvalue")]
    NotMutable { span: Span },

    #[error("expression is not a pointer")]
    NotPointer { span: Span },

    #[error("condition does not conform to `bool`")]
    NotBool { span: Span },

    #[error("`switch` condition is not integer-like")]
    NotInteger { span: Span },

    #[error("`for` loop's `before` statements contain a terminator")]
    TerminatorInBeforeStatements { span: Span },

    #[error("exhaustive `switch` case covers a kind already matched by another case")]
    ExhaustiveSwitchExtraneousCase { span: Span },

    #[error("`case` value is out of range for the condition's enum type")]
    OutOfBoundsCaseValue { span: Span },

    #[error("`each in` element type does not match the iterable's element type")]
    EachInElementTypeMismatch { span: Span },

    #[error("fixed array given to `each in` is not mutable")]
    FixedArrayNotMutable { span: Span },

    #[error("module declares `static` variables but the Object has no `main`")]
    StaticWithoutMain { span: Span },

    #[error("statement is unreachable after an unconditional `return`")]
    EarlyReturnDeadCode { span: Span },

    /// An IR-builder invariant was violated — always a lowering bug, never
    /// a user-facing condition (spec §4.4's builder is infallible when the
    /// core drives it correctly).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BuilderError> for LowerError {
    fn from(err: BuilderError) -> Self {
        LowerError::Internal(err.to_string())
    }
}

impl LowerError {
    #[must_use]
    pub fn from_loop_lookup(err: LoopLookupError, span: Span) -> Self {
        match err {
            LoopLookupError::NotInLoop => LowerError::NotInLoop { span },
            LoopLookupError::UnknownLabel => LowerError::UnknownLabel { span },
        }
    }

    #[must_use]
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            LowerError::Type(type_error) => type_error.to_diagnostic(),
            LowerError::UnknownIdentifier { span, .. } => Diagnostic::error(ErrorCode::L2001)
                .with_message("identifier not found in this scope")
                .with_label(*span, "not found"),
            LowerError::NotInLoop { span } => Diagnostic::error(ErrorCode::L2002)
                .with_message("`break`/`continue`/`fallthrough` used outside an enclosing loop or switch")
                .with_label(*span, "here"),
            LowerError::UnknownLabel { span } => Diagnostic::error(ErrorCode::L2003)
                .with_message("labeled jump references an unknown label")
                .with_label(*span, "here"),
            LowerError::NonExhaustiveSwitch { span, missing_count } => {
                Diagnostic::error(ErrorCode::L3001)
                    .with_message(format!("non-exhaustive switch: {missing_count} case(s) not covered"))
                    .with_label(*span, "missing cases")
            }
            LowerError::UndeclaredFunction { span, .. } => Diagnostic::error(ErrorCode::L2004)
                .with_message("call to an undeclared function")
                .with_label(*span, "no matching declaration"),
            LowerError::DuplicateDeclaration { span, .. } => Diagnostic::error(ErrorCode::L2005)
                .with_message("a name with this spelling is already declared in this scope")
                .with_label(*span, "redeclared here"),
            LowerError::DuplicateCase { span } => Diagnostic::error(ErrorCode::L3002)
                .with_message("this `case` value is already handled by an earlier case")
                .with_label(*span, "duplicate value"),
            LowerError::NotMutable { span } => Diagnostic::error(ErrorCode::L3003)
                .with_message("an lvalue is required here")
                .with_label(*span, "not an lvalue"),
            LowerError::NotPointer { span } => Diagnostic::error(ErrorCode::L3004)
                .with_message("a pointer type is required here")
                .with_label(*span, "not a pointer"),
            LowerError::NotBool { span } => Diagnostic::error(ErrorCode::L3005)
                .with_message("condition does not conform to `bool`")
                .with_label(*span, "here"),
            LowerError::NotInteger { span } => Diagnostic::error(ErrorCode::L3006)
                .with_message("`switch` condition must be integer-like")
                .with_label(*span, "here"),
            LowerError::TerminatorInBeforeStatements { span } => Diagnostic::error(ErrorCode::L3007)
                .with_message("`for` loop's `before` statements may not contain `return`/`break`/`continue`")
                .with_label(*span, "terminates here"),
            LowerError::ExhaustiveSwitchExtraneousCase { span } => Diagnostic::error(ErrorCode::L3008)
                .with_message("this `case` duplicates a kind already covered by another case")
                .with_label(*span, "already covered"),
            LowerError::OutOfBoundsCaseValue { span } => Diagnostic::error(ErrorCode::L3009)
                .with_message("`case` value is out of range for the condition's enum type")
                .with_label(*span, "out of range"),
            LowerError::EachInElementTypeMismatch { span } => Diagnostic::error(ErrorCode::L3010)
                .with_message("`each in` element type does not match the iterable's element type")
                .with_label(*span, "here"),
            LowerError::FixedArrayNotMutable { span } => Diagnostic::error(ErrorCode::L3011)
                .with_message("fixed array given to `each in` must be mutable")
                .with_label(*span, "here"),
            LowerError::StaticWithoutMain { span } => Diagnostic::error(ErrorCode::L3012)
                .with_message("module declares `static` variables but the Object has no `main`")
                .with_label(*span, "here"),
            LowerError::EarlyReturnDeadCode { span } => Diagnostic::warning(ErrorCode::L3013)
                .with_message("statement is unreachable after an unconditional `return`")
                .with_label(*span, "unreachable"),
            LowerError::Internal(message) => Diagnostic::error(ErrorCode::L9001)
                .with_message(format!("internal compiler error: {message}")),
        }
    }
}
