//! C2 Type Resolver: `AstType` → `TypeId`, grounded on `ori_types`'s
//! `resolve_parsed_type_simple` (recursive descent over type syntax) and
//! `well_known` (name-based dispatch for built-in generics).

use kiln_ir::ast::{AstType, Namespace, TypeElem};
use kiln_ir::ir::{FloatWidth, IntWidth, IrTypeData, TypeId, TypeInterner};
use kiln_ir::{Name, Span, StringInterner};
use rustc_hash::FxHashMap;

use crate::error::TypeError;
use crate::registry::{TypeDecl, TypeRegistry};

/// Canonical primitive spellings. Anything else is looked up as a
/// composite or enum name (spec §4.1: "Base with a composite name").
fn primitive(name: &str) -> Option<IrTypeData> {
    Some(match name {
        "int8" => IrTypeData::Int(IntWidth::S8),
        "int16" => IrTypeData::Int(IntWidth::S16),
        "int32" => IrTypeData::Int(IntWidth::S32),
        "int64" => IrTypeData::Int(IntWidth::S64),
        "uint8" => IrTypeData::Int(IntWidth::U8),
        "uint16" => IrTypeData::Int(IntWidth::U16),
        "uint32" => IrTypeData::Int(IntWidth::U32),
        "uint64" => IrTypeData::Int(IntWidth::U64),
        "bool" => IrTypeData::Bool,
        "float32" => IrTypeData::Float(FloatWidth::F32),
        "float64" => IrTypeData::Float(FloatWidth::F64),
        "bytes" => IrTypeData::BytesPointer,
        _ => return None,
    })
}

/// Resolves AST type syntax to interned `TypeId`s for one Object,
/// caching named-composite and generic-instantiation results (spec §4.1).
pub struct Resolver<'a> {
    registry: &'a TypeRegistry,
    strings: &'a StringInterner,
    ir_types: &'a mut TypeInterner,
    /// Non-generic composites/enums resolved by declared name.
    named_cache: FxHashMap<Name, TypeId>,
    /// Generic composite instantiations, keyed by (composite name, resolved args).
    generic_cache: FxHashMap<(Name, Vec<TypeId>), TypeId>,
    /// Ordered field names of every `Structure` this resolver has built,
    /// since `IrTypeData::Structure` itself only carries field `TypeId`s.
    field_names: FxHashMap<TypeId, Vec<Name>>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        registry: &'a TypeRegistry,
        strings: &'a StringInterner,
        ir_types: &'a mut TypeInterner,
    ) -> Self {
        Self {
            registry,
            strings,
            ir_types,
            named_cache: FxHashMap::default(),
            generic_cache: FxHashMap::default(),
            field_names: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn field_names(&self, ty: TypeId) -> Option<&[Name]> {
        self.field_names.get(&ty).map(Vec::as_slice)
    }

    /// The module type interner this resolver resolves into, for callers
    /// that need to intern derived types (e.g. a pointer-to-T for a `new`
    /// expression's result) alongside resolution.
    #[must_use]
    pub fn ir_types(&self) -> &TypeInterner {
        self.ir_types
    }

    pub fn ir_types_mut(&mut self) -> &mut TypeInterner {
        self.ir_types
    }

    pub fn resolve(
        &mut self,
        ty: &AstType,
        current: &Namespace,
        using: &[Namespace],
        span: Span,
    ) -> Result<TypeId, TypeError> {
        self.resolve_elems(ty.elems(), current, using, None, span)
    }

    fn resolve_elems(
        &mut self,
        elems: &[TypeElem],
        current: &Namespace,
        using: &[Namespace],
        subst: Option<&FxHashMap<Name, TypeId>>,
        span: Span,
    ) -> Result<TypeId, TypeError> {
        let (head, rest) = elems.split_first().expect("AstType is never empty");
        match head {
            TypeElem::Pointer => {
                let pointee = self.resolve_elems(rest, current, using, subst, span)?;
                Ok(self.ir_types.intern(IrTypeData::Pointer(pointee)))
            }
            TypeElem::FixedArray(len) => {
                let elem_ty = self.resolve_elems(rest, current, using, subst, span)?;
                Ok(self.ir_types.intern(IrTypeData::FixedArray(elem_ty, *len)))
            }
            TypeElem::Base(name) => self.resolve_base(*name, current, using, span),
            TypeElem::GenericBase(name, args) => {
                self.resolve_generic(*name, args, current, using, subst, span)
            }
            TypeElem::FunctionPointer(params, ret) => {
                let mut param_ids = Vec::with_capacity(params.len());
                for param in params {
                    param_ids.push(self.resolve_elems(param.elems(), current, using, subst, span)?);
                }
                let ret_id = self.resolve_elems(ret.elems(), current, using, subst, span)?;
                Ok(self.ir_types.intern(IrTypeData::FunctionPointer(param_ids, ret_id)))
            }
            TypeElem::PolymorphVar(name) => subst
                .and_then(|s| s.get(name))
                .copied()
                .ok_or_else(|| TypeError::UnknownType {
                    name: self.strings.lookup(*name).to_string(),
                    span,
                }),
        }
    }

    fn resolve_base(
        &mut self,
        name: Name,
        current: &Namespace,
        using: &[Namespace],
        span: Span,
    ) -> Result<TypeId, TypeError> {
        if let Some(data) = primitive(self.strings.lookup(name)) {
            return Ok(self.ir_types.intern(data));
        }
        if let Some(&cached) = self.named_cache.get(&name) {
            return Ok(cached);
        }
        match self.registry.lookup(current, using, name) {
            Some(TypeDecl::Composite(composite)) if composite.is_polymorphic() => {
                Err(TypeError::IncompatibleTypes { span })
            }
            Some(TypeDecl::Composite(composite)) => {
                let fields: Vec<_> = composite.fields.clone();
                let field_names: Vec<Name> = fields.iter().map(|f| f.name).collect();
                let mut field_ids = Vec::with_capacity(fields.len());
                for field in &fields {
                    field_ids.push(self.resolve_elems(field.ty.elems(), current, using, None, span)?);
                }
                let ty = self.ir_types.intern(IrTypeData::Structure(field_ids));
                self.named_cache.insert(name, ty);
                self.field_names.insert(ty, field_names);
                Ok(ty)
            }
            Some(TypeDecl::Enum(_)) => {
                // Enums are represented by their 32-bit kind index (spec §3).
                let ty = self.ir_types.int(IntWidth::S32);
                self.named_cache.insert(name, ty);
                Ok(ty)
            }
            None => Err(TypeError::UnknownType {
                name: self.strings.lookup(name).to_string(),
                span,
            }),
        }
    }

    fn resolve_generic(
        &mut self,
        name: Name,
        args: &[AstType],
        current: &Namespace,
        using: &[Namespace],
        outer_subst: Option<&FxHashMap<Name, TypeId>>,
        span: Span,
    ) -> Result<TypeId, TypeError> {
        let mut resolved_args = Vec::with_capacity(args.len());
        for arg in args {
            resolved_args.push(self.resolve_elems(arg.elems(), current, using, outer_subst, span)?);
        }
        if let Some(&cached) = self.generic_cache.get(&(name, resolved_args.clone())) {
            return Ok(cached);
        }
        let composite = match self.registry.lookup(current, using, name) {
            Some(TypeDecl::Composite(composite)) if composite.is_polymorphic() => composite,
            _ => return Err(TypeError::UnknownType {
                name: self.strings.lookup(name).to_string(),
                span,
            }),
        };
        if composite.polymorph_params.len() != resolved_args.len() {
            return Err(TypeError::IncompatibleTypes { span });
        }
        let subst: FxHashMap<Name, TypeId> = composite
            .polymorph_params
            .iter()
            .copied()
            .zip(resolved_args.iter().copied())
            .collect();
        let fields = composite.fields.clone();
        let field_names: Vec<Name> = fields.iter().map(|f| f.name).collect();
        let mut field_ids = Vec::with_capacity(fields.len());
        for field in &fields {
            field_ids.push(self.resolve_elems(field.ty.elems(), current, using, Some(&subst), span)?);
        }
        let ty = self.ir_types.intern(IrTypeData::Structure(field_ids));
        self.generic_cache.insert((name, resolved_args), ty);
        self.field_names.insert(ty, field_names);
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_ir::ast::{AstComposite, Field};

    fn setup() -> (TypeRegistry, StringInterner) {
        (TypeRegistry::new(), StringInterner::new())
    }

    #[test]
    fn primitive_base_resolves_without_registry_lookup() {
        let (registry, mut strings) = setup();
        let mut ir_types = TypeInterner::new();
        let name = strings.intern("int32");
        let mut resolver = Resolver::new(&registry, &strings, &mut ir_types);
        let ty = resolver
            .resolve(&AstType::base(name), &Namespace::global(), &[], Span::DUMMY)
            .unwrap();
        assert_eq!(ty, resolver.ir_types.int(IntWidth::S32));
    }

    #[test]
    fn unknown_base_name_errors() {
        let (registry, mut strings) = setup();
        let mut ir_types = TypeInterner::new();
        let name = strings.intern("Widget");
        let mut resolver = Resolver::new(&registry, &strings, &mut ir_types);
        let err = resolver
            .resolve(&AstType::base(name), &Namespace::global(), &[], Span::DUMMY)
            .unwrap_err();
        assert!(matches!(err, TypeError::UnknownType { .. }));
    }

    #[test]
    fn pointer_wraps_resolved_pointee() {
        let (registry, mut strings) = setup();
        let mut ir_types = TypeInterner::new();
        let name = strings.intern("int8");
        let mut resolver = Resolver::new(&registry, &strings, &mut ir_types);
        let ty = resolver
            .resolve(
                &AstType::base(name).pointer_to(),
                &Namespace::global(),
                &[],
                Span::DUMMY,
            )
            .unwrap();
        assert_eq!(
            resolver.ir_types.get(ty),
            &IrTypeData::Pointer(resolver.ir_types.int(IntWidth::S8))
        );
    }

    #[test]
    fn composite_resolution_is_cached() {
        let (mut registry, mut strings) = setup();
        let name = strings.intern("Point");
        let field_name = strings.intern("x");
        let field_ty_name = strings.intern("int32");
        registry.register_composite(
            Namespace::global(),
            AstComposite {
                name,
                fields: vec![Field {
                    name: field_name,
                    ty: AstType::base(field_ty_name),
                }],
                polymorph_params: Vec::new(),
                is_class: false,
            },
        );
        let mut ir_types = TypeInterner::new();
        let mut resolver = Resolver::new(&registry, &strings, &mut ir_types);
        let a = resolver
            .resolve(&AstType::base(name), &Namespace::global(), &[], Span::DUMMY)
            .unwrap();
        let b = resolver
            .resolve(&AstType::base(name), &Namespace::global(), &[], Span::DUMMY)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(resolver.field_names(a), Some(&[field_name][..]));
    }
}
