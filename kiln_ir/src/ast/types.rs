//! AST type representation.
//!
//! Per spec: an AST type is a non-empty ordered sequence of type elements.
//! Two types are *identical* iff their element sequences match structurally,
//! which falls out of `#[derive(PartialEq)]` on a flat `Vec<TypeElem>`.

use crate::Name;

/// One element of an `AstType`'s element sequence.
///
/// Element `0` is the outermost modifier; the base element is always last.
/// E.g. `*[4]int` lowers to `[Pointer, FixedArray(4), Base("int")]`.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeElem {
    /// Named primitive or composite type. Always the terminal element.
    Base(Name),
    /// Pointer to the remaining sequence.
    Pointer,
    /// Fixed-length array of the remaining sequence.
    FixedArray(u64),
    /// Instantiation of a polymorphic composite with type arguments.
    /// Always the terminal element (the composite name carries its own
    /// arguments rather than modifying a remaining sequence).
    GenericBase(Name, Vec<AstType>),
    /// Function pointer with parameter and return types. Terminal element.
    FunctionPointer(Vec<AstType>, Box<AstType>),
    /// A `$T`-like placeholder in a polymorphic context. Terminal element.
    PolymorphVar(Name),
}

/// A non-empty ordered sequence of type elements.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct AstType(Vec<TypeElem>);

impl AstType {
    /// Construct from a non-empty element sequence.
    ///
    /// # Panics
    /// Panics if `elems` is empty — callers (the parser) never produce an
    /// empty type; this is an internal invariant, not user-facing.
    #[must_use]
    pub fn new(elems: Vec<TypeElem>) -> Self {
        assert!(!elems.is_empty(), "AstType must have at least one element");
        AstType(elems)
    }

    /// Construct a bare base type (the common case).
    #[must_use]
    pub fn base(name: Name) -> Self {
        AstType(vec![TypeElem::Base(name)])
    }

    /// Wrap `self` in an outer pointer element.
    #[must_use]
    pub fn pointer_to(self) -> Self {
        let mut elems = vec![TypeElem::Pointer];
        elems.extend(self.0);
        AstType(elems)
    }

    #[must_use]
    pub fn elems(&self) -> &[TypeElem] {
        &self.0
    }

    /// The outermost element and the remaining sequence, if any.
    #[must_use]
    pub fn split_first(&self) -> (&TypeElem, &[TypeElem]) {
        self.0.split_first().expect("AstType is never empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sequences_are_equal() {
        let a = AstType::base(Name::from_raw(1));
        let b = AstType::base(Name::from_raw(1));
        assert_eq!(a, b);
    }

    #[test]
    fn pointer_wrapping_changes_identity() {
        let base = AstType::base(Name::from_raw(1));
        let ptr = base.clone().pointer_to();
        assert_ne!(base, ptr);
        assert_eq!(ptr.elems(), &[TypeElem::Pointer, TypeElem::Base(Name::from_raw(1))]);
    }

    #[should_panic(expected = "at least one element")]
    #[test]
    fn empty_sequence_panics() {
        let _ = AstType::new(vec![]);
    }
}
