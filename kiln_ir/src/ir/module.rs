//! The IR module: the C1 "IR Module & Pool" component.
//!
//! Owns every IR function, the type interner, global/static descriptors,
//! and the anonymous-global string table for one Object. All of it is
//! plain `Vec`-backed — matching the teacher's arena convention
//! (`ori_ir::arena`, `ori_arc::ir`) — so the whole module is freed in one
//! `Drop`, satisfying spec §3's "bump-allocated pool" lifecycle without an
//! actual bump allocator crate.

use rustc_hash::FxHashMap;

use super::function::IrFunction;
use super::types::{IrTypeData, TypeId, TypeInterner};
use super::value::IrValue;
use crate::Name;

#[derive(Clone, Debug)]
pub struct GlobalVar {
    pub name: Name,
    pub ty: TypeId,
}

#[derive(Clone, Debug)]
pub struct StaticVar {
    pub name: Name,
    pub ty: TypeId,
}

/// A relocation record for a `phi2` instruction created before one or both
/// incoming values existed (spec §4.4, §9 "two-pass phi resolution").
#[derive(Clone, Debug)]
pub struct PhiRelocation {
    pub function: Name,
    pub block: super::block::BlockId,
    pub instr: super::instr::InstrId,
    /// Which of the two incoming slots (0 or 1) this relocation patches.
    pub slot: u8,
}

#[derive(Debug, Default)]
pub struct IrModule {
    pub functions: Vec<IrFunction>,
    pub type_interner: TypeInterner,
    pub globals: Vec<GlobalVar>,
    pub statics: Vec<StaticVar>,
    /// String-table-backed anonymous globals for string literals (spec §6).
    pub anonymous_globals: Vec<Box<[u8]>>,
    /// Module-level initialization routine for statics/globals (spec §4.6 Declare).
    pub init_function: Option<IrFunction>,
    /// Deinitialization routine for statics, emitted at program exit (spec §4.7).
    pub deinit_function: Option<IrFunction>,
    pending_phi_relocations: Vec<PhiRelocation>,
    function_index: FxHashMap<Name, usize>,
}

impl IrModule {
    #[must_use]
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
            type_interner: TypeInterner::new(),
            globals: Vec::new(),
            statics: Vec::new(),
            anonymous_globals: Vec::new(),
            init_function: None,
            deinit_function: None,
            pending_phi_relocations: Vec::new(),
            function_index: FxHashMap::default(),
        }
    }

    pub fn add_function(&mut self, function: IrFunction) {
        let index = self.functions.len();
        self.function_index.insert(function.name, index);
        self.functions.push(function);
    }

    #[must_use]
    pub fn function(&self, name: Name) -> Option<&IrFunction> {
        self.function_index.get(&name).map(|&i| &self.functions[i])
    }

    pub fn function_mut(&mut self, name: Name) -> Option<&mut IrFunction> {
        if let Some(&i) = self.function_index.get(&name) {
            Some(&mut self.functions[i])
        } else {
            None
        }
    }

    /// Intern a string literal's bytes, returning its anonymous-global index.
    pub fn intern_string_literal(&mut self, bytes: &[u8]) -> u32 {
        let index = u32::try_from(self.anonymous_globals.len()).expect("global table overflow");
        self.anonymous_globals.push(bytes.into());
        index
    }

    pub fn record_phi_relocation(&mut self, relocation: PhiRelocation) {
        self.pending_phi_relocations.push(relocation);
    }

    /// Resolve every pending `phi2` relocation by patching the operand at
    /// `(function, block, instr, slot)` with `value`. Called once per
    /// relocation before the module is handed to the backend.
    pub fn resolve_phi(&mut self, relocation: &PhiRelocation, value: IrValue) {
        let function = self
            .function_mut(relocation.function)
            .expect("phi relocation references a live function");
        let block = function.block_mut(relocation.block);
        let instr = &mut block.instrs[relocation.instr.index()];
        if let super::instr::InstrKind::Phi2 { incoming } = &mut instr.kind {
            incoming[relocation.slot as usize].0 = value;
        } else {
            debug_assert!(false, "phi relocation target is not a Phi2 instruction");
        }
    }

    #[must_use]
    pub fn pending_phi_relocations(&self) -> &[PhiRelocation] {
        &self.pending_phi_relocations
    }

    pub fn take_phi_relocations(&mut self) -> Vec<PhiRelocation> {
        std::mem::take(&mut self.pending_phi_relocations)
    }

    /// Intern a composite's field types as an `IrTypeData::Structure`.
    pub fn intern_structure(&mut self, field_types: Vec<TypeId>) -> TypeId {
        self.type_interner.intern(IrTypeData::Structure(field_types))
    }
}
