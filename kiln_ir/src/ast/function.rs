//! Function, composite, and enum declarations.

use bitflags::bitflags;

use super::expr::ExprArena;
use super::expr_id::ExprId;
use super::stmt::Stmt;
use super::types::AstType;
use crate::Name;

bitflags! {
    /// Traits an `AstFunction` may carry, per spec §3.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct FunctionTraits: u16 {
        const MAIN     = 1 << 0;
        const PASS     = 1 << 1;
        const DEFER    = 1 << 2;
        const AUTOGEN  = 1 << 3;
        const VARIADIC = 1 << 4;
        const FOREIGN  = 1 << 5;
        const METHOD   = 1 << 6;
    }
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: Name,
    pub ty: AstType,
    /// Default-argument expression, evaluated against `arena` on missing
    /// trailing arguments at call sites (spec §4.5 Call / method call).
    pub default: Option<ExprId>,
}

#[derive(Clone, Debug)]
pub struct AstFunction {
    pub name: Name,
    pub params: Vec<Param>,
    pub return_type: AstType,
    pub body: Vec<Stmt>,
    pub traits: FunctionTraits,
    /// Receiver type for methods (`traits.contains(FunctionTraits::METHOD)`).
    pub this_type: Option<AstType>,
    pub arena: ExprArena,
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: Name,
    pub ty: AstType,
}

#[derive(Clone, Debug)]
pub struct AstComposite {
    pub name: Name,
    pub fields: Vec<Field>,
    /// Polymorph variables this composite is parameterized by, if any.
    pub polymorph_params: Vec<Name>,
    /// Participates in vtables / RTTI when `true`.
    pub is_class: bool,
}

impl AstComposite {
    #[must_use]
    pub fn is_polymorphic(&self) -> bool {
        !self.polymorph_params.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct AstEnum {
    pub name: Name,
    /// Kind names, implicitly indexed `0..n` per spec §3.
    pub kinds: Vec<Name>,
}
