//! Namespace-aware composite/enum declaration lookup (spec §4.1).

use kiln_ir::ast::{AstComposite, AstEnum, Namespace};
use kiln_ir::Name;
use rustc_hash::FxHashMap;

#[derive(Clone, Copy, Debug)]
pub enum TypeDecl<'a> {
    Composite(&'a AstComposite),
    Enum(&'a AstEnum),
}

/// All composite/enum declarations visible to the resolver, keyed by the
/// namespace they were declared into.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    composites: FxHashMap<(Namespace, Name), AstComposite>,
    enums: FxHashMap<(Namespace, Name), AstEnum>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_composite(&mut self, namespace: Namespace, composite: AstComposite) {
        self.composites.insert((namespace, composite.name), composite);
    }

    pub fn register_enum(&mut self, namespace: Namespace, ast_enum: AstEnum) {
        self.enums.insert((namespace, ast_enum.name), ast_enum);
    }

    /// Look up `name` by the spec §4.1 order: current namespace, then each
    /// using namespace in declaration order, then the global namespace.
    /// The first hit wins.
    #[must_use]
    pub fn lookup(
        &self,
        current: &Namespace,
        using: &[Namespace],
        name: Name,
    ) -> Option<TypeDecl<'_>> {
        std::iter::once(current)
            .chain(using.iter())
            .chain(std::iter::once(&Namespace::global()))
            .find_map(|ns| self.lookup_in(ns, name))
    }

    fn lookup_in(&self, namespace: &Namespace, name: Name) -> Option<TypeDecl<'_>> {
        if let Some(composite) = self.composites.get(&(namespace.clone(), name)) {
            return Some(TypeDecl::Composite(composite));
        }
        if let Some(ast_enum) = self.enums.get(&(namespace.clone(), name)) {
            return Some(TypeDecl::Enum(ast_enum));
        }
        None
    }
}
