//! Type-resolution and conformance errors.

use kiln_diagnostic::{Diagnostic, ErrorCode};
use kiln_ir::Span;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TypeError {
    #[error("unknown type `{name}`")]
    UnknownType { name: String, span: Span },

    #[error("ambiguous conversion: {candidate_count} candidates matched")]
    AmbiguousConversion { candidate_count: usize, span: Span },

    #[error("incompatible types")]
    IncompatibleTypes { span: Span },

    #[error("narrowing conversion not allowed in assignment")]
    NarrowingInAssignment { span: Span },

    #[error("fixed-array length must be a non-negative constant integer")]
    InvalidArrayLength { span: Span },
}

impl TypeError {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            TypeError::UnknownType { span, .. }
            | TypeError::AmbiguousConversion { span, .. }
            | TypeError::IncompatibleTypes { span }
            | TypeError::NarrowingInAssignment { span }
            | TypeError::InvalidArrayLength { span } => *span,
        }
    }

    #[must_use]
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            TypeError::UnknownType { name, span } => Diagnostic::error(ErrorCode::L0001)
                .with_message(format!("unknown type `{name}`"))
                .with_label(*span, "not found in this scope"),
            TypeError::AmbiguousConversion { candidate_count, span } => {
                Diagnostic::error(ErrorCode::L1002)
                    .with_message(format!("ambiguous conversion: {candidate_count} candidates matched"))
                    .with_label(*span, "could not pick a single conversion method")
            }
            TypeError::IncompatibleTypes { span } => Diagnostic::error(ErrorCode::L1001)
                .with_message("no conversion exists between these types")
                .with_label(*span, "here"),
            TypeError::NarrowingInAssignment { span } => Diagnostic::error(ErrorCode::L1003)
                .with_message("implicit narrowing conversion in assignment")
                .with_label(*span, "this assignment would lose precision")
                .with_note("add an explicit cast if this is intended"),
            TypeError::InvalidArrayLength { span } => Diagnostic::error(ErrorCode::L0002)
                .with_message("fixed-array length must be a non-negative constant integer")
                .with_label(*span, "here"),
        }
    }
}
