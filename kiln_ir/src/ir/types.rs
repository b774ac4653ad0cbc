//! Interned IR types.
//!
//! Modeled on `ori_types::{TypeData, TypeInterner}`: an external `TypeId`
//! handle gives O(1) equality, while `IrTypeData` holds the structural
//! definition keyed by the same handle.

use rustc_hash::FxHashMap;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        TypeId(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum IntWidth {
    S8,
    S16,
    S32,
    S64,
    U8,
    U16,
    U32,
    U64,
}

impl IntWidth {
    #[must_use]
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            IntWidth::S8 | IntWidth::S16 | IntWidth::S32 | IntWidth::S64
        )
    }

    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::S8 | IntWidth::U8 => 8,
            IntWidth::S16 | IntWidth::U16 => 16,
            IntWidth::S32 | IntWidth::U32 => 32,
            IntWidth::S64 | IntWidth::U64 => 64,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FloatWidth {
    F32,
    F64,
}

/// Structural definition of an IR type.
///
/// `Structure` is ordered: field `i`'s type is `fields[i]`, and a
/// companion `Name` list lives on the composite registry (kept outside
/// the interner so structurally-identical-but-differently-named
/// composites still intern distinctly via the registry's own lookup,
/// not via `IrTypeData` equality).
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum IrTypeData {
    Int(IntWidth),
    Bool,
    Float(FloatWidth),
    Pointer(TypeId),
    FixedArray(TypeId, u64),
    /// Ordered field types of a named composite (name held by the caller's registry).
    Structure(Vec<TypeId>),
    FunctionPointer(Vec<TypeId>, TypeId),
    /// Opaque pointer used for variadic lists (`va_list`) and `delete`'s operand.
    BytesPointer,
}

/// Interns `IrTypeData` by structural equality, per module (spec §4.1).
#[derive(Debug, Default)]
pub struct TypeInterner {
    data: Vec<IrTypeData>,
    lookup: FxHashMap<IrTypeData, TypeId>,
}

impl TypeInterner {
    #[must_use]
    pub fn new() -> Self {
        let mut interner = Self {
            data: Vec::new(),
            lookup: FxHashMap::default(),
        };
        for width in [
            IntWidth::S8,
            IntWidth::S16,
            IntWidth::S32,
            IntWidth::S64,
            IntWidth::U8,
            IntWidth::U16,
            IntWidth::U32,
            IntWidth::U64,
        ] {
            interner.intern(IrTypeData::Int(width));
        }
        interner.intern(IrTypeData::Bool);
        interner.intern(IrTypeData::Float(FloatWidth::F32));
        interner.intern(IrTypeData::Float(FloatWidth::F64));
        interner.intern(IrTypeData::BytesPointer);
        interner
    }

    /// Idempotent: re-interning structurally-equal data returns the same `TypeId`
    /// (spec §8 "Idempotence" testable property).
    pub fn intern(&mut self, data: IrTypeData) -> TypeId {
        if let Some(&id) = self.lookup.get(&data) {
            return id;
        }
        let id = TypeId::from_raw(u32::try_from(self.data.len()).expect("type interner overflow"));
        self.data.push(data.clone());
        self.lookup.insert(data, id);
        id
    }

    #[must_use]
    pub fn get(&self, id: TypeId) -> &IrTypeData {
        &self.data[id.index()]
    }

    #[must_use]
    pub fn int(&self, width: IntWidth) -> TypeId {
        *self
            .lookup
            .get(&IrTypeData::Int(width))
            .expect("primitive ints are pre-interned")
    }

    #[must_use]
    pub fn bool_ty(&self) -> TypeId {
        *self
            .lookup
            .get(&IrTypeData::Bool)
            .expect("bool is pre-interned")
    }

    #[must_use]
    pub fn float(&self, width: FloatWidth) -> TypeId {
        *self
            .lookup
            .get(&IrTypeData::Float(width))
            .expect("primitive floats are pre-interned")
    }

    #[must_use]
    pub fn bytes_pointer(&self) -> TypeId {
        *self
            .lookup
            .get(&IrTypeData::BytesPointer)
            .expect("bytes-pointer is pre-interned")
    }

    /// Canonical index type used for array subscripts and hidden each-in counters.
    #[must_use]
    pub fn usize_ty(&self) -> TypeId {
        self.int(IntWidth::U64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut interner = TypeInterner::new();
        let a = interner.intern(IrTypeData::Pointer(interner.int(IntWidth::S32)));
        let b = interner.intern(IrTypeData::Pointer(interner.int(IntWidth::S32)));
        assert_eq!(a, b);
    }

    #[test]
    fn structurally_distinct_types_differ() {
        let mut interner = TypeInterner::new();
        let p32 = interner.intern(IrTypeData::Pointer(interner.int(IntWidth::S32)));
        let p64 = interner.intern(IrTypeData::Pointer(interner.int(IntWidth::S64)));
        assert_ne!(p32, p64);
    }

    #[test]
    fn primitives_are_preinterned() {
        let interner = TypeInterner::new();
        assert_eq!(interner.int(IntWidth::S32), interner.int(IntWidth::S32));
    }
}
