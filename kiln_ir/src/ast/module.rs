//! Top-level AST for one translation unit, as handed to the core by the parser.

use super::function::{AstComposite, AstEnum, AstFunction};
use crate::Name;

/// A namespace path, e.g. `ns\name` joined components (spec §6 name mangling).
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Namespace(pub Vec<Name>);

impl Namespace {
    #[must_use]
    pub fn global() -> Self {
        Namespace(Vec::new())
    }

    #[must_use]
    pub fn is_global(&self) -> bool {
        self.0.is_empty()
    }
}

/// The rooted AST of one parsed translation unit.
#[derive(Clone, Debug, Default)]
pub struct AstModule {
    pub functions: Vec<AstFunction>,
    pub composites: Vec<AstComposite>,
    pub enums: Vec<AstEnum>,
    /// The namespace this module's declarations are emitted into.
    pub namespace: Namespace,
    /// `using` namespaces, in declaration order (spec §4.1 lookup order).
    pub using_namespaces: Vec<Namespace>,
}
