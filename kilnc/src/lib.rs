//! Top-level compile driver: wires C2/C3 type resolution and C4-C8
//! lowering into one pass per Object (spec §5), producing the finished
//! `IrModule` the (out-of-scope) backend consumes.

use rustc_hash::FxHashMap;
use tracing::debug;

use kiln_diagnostic::Diagnostic;
use kiln_ir::ast::{AstFunction, AstModule, AstType, FunctionTraits};
use kiln_ir::ir::{IrBuilder, IrFunction, IrModule, IrTypeData, TypeInterner, TypeId};
use kiln_ir::{Name, Span, StringInterner};
use kiln_lower::{
    emit_static_deinit, lower_block, AssignmentResolver, BridgeVar, CompilerFlags,
    DestructorResolver, LowerError, StmtCtx, StmtState, VarTraits,
};
use kiln_types::{Resolver, TypeRegistry};

/// Looks up a composite's `__defer__` method by matching the method's
/// `this_type` against the destructed value's `TypeId`. The autogen step
/// that decides *which* composites get a `__defer__` happens upstream of
/// this core (spec §4.7); this resolver only has to know what was decided.
struct AstDestructorResolver {
    by_type: FxHashMap<TypeId, (Name, TypeId)>,
}

impl DestructorResolver for AstDestructorResolver {
    fn defer_fn(&self, ty: TypeId) -> Option<(Name, TypeId)> {
        self.by_type.get(&ty).copied()
    }
}

/// Looks up a composite's `__assign__`/`__copy_assign__` method by its
/// receiver type. Unlike `__defer__`, no dedicated `FunctionTraits` bit
/// marks these — they are recognized by name, the same way the teacher's
/// front end recognizes its own magic method names (spec §4.8).
struct AstAssignmentResolver {
    assign: FxHashMap<TypeId, Name>,
    copy_assign: FxHashMap<TypeId, Name>,
}

impl AssignmentResolver for AstAssignmentResolver {
    fn assign_fn(&self, ty: TypeId) -> Option<Name> {
        self.assign.get(&ty).copied()
    }

    fn copy_assign_fn(&self, ty: TypeId) -> Option<Name> {
        self.copy_assign.get(&ty).copied()
    }
}

fn build_type_registry(module: &AstModule) -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    for composite in &module.composites {
        registry.register_composite(module.namespace.clone(), composite.clone());
    }
    for ast_enum in &module.enums {
        registry.register_enum(module.namespace.clone(), ast_enum.clone());
    }
    registry
}

/// Resolve every `DEFER`-trait method's receiver type, building the lookup
/// `kiln_lower`'s scope-exit protocol calls into.
fn build_destructor_resolver(
    module: &AstModule,
    resolver: &mut Resolver<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> AstDestructorResolver {
    let mut by_type = FxHashMap::default();
    for function in &module.functions {
        if !function.traits.contains(FunctionTraits::DEFER) {
            continue;
        }
        let Some(this_type) = &function.this_type else {
            continue;
        };
        match resolver.resolve(this_type, &module.namespace, &module.using_namespaces, Span::DUMMY) {
            Ok(receiver_ty) => {
                let ptr_ty = resolver.ir_types_mut().intern(IrTypeData::Pointer(receiver_ty));
                by_type.insert(receiver_ty, (function.name, ptr_ty));
            }
            Err(err) => diagnostics.push(err.to_diagnostic()),
        }
    }
    AstDestructorResolver { by_type }
}

/// Resolve every `__assign__`/`__copy_assign__` method's receiver type by
/// name, building the lookup `kiln_lower`'s assignment-management protocol
/// calls into (spec §4.8).
fn build_assignment_resolver(
    module: &AstModule,
    resolver: &mut Resolver<'_>,
    strings: &StringInterner,
    diagnostics: &mut Vec<Diagnostic>,
) -> AstAssignmentResolver {
    let mut assign = FxHashMap::default();
    let mut copy_assign = FxHashMap::default();
    for function in &module.functions {
        let Some(this_type) = &function.this_type else {
            continue;
        };
        let is_assign = strings.lookup(function.name) == "__assign__";
        let is_copy_assign = strings.lookup(function.name) == "__copy_assign__";
        if !is_assign && !is_copy_assign {
            continue;
        }
        match resolver.resolve(this_type, &module.namespace, &module.using_namespaces, Span::DUMMY) {
            Ok(receiver_ty) => {
                if is_assign {
                    assign.insert(receiver_ty, function.name);
                } else {
                    copy_assign.insert(receiver_ty, function.name);
                }
            }
            Err(err) => diagnostics.push(err.to_diagnostic()),
        }
    }
    AstAssignmentResolver { assign, copy_assign }
}

/// Resolve every declared function's return type, keyed by name, so call
/// expressions elsewhere in the module can type their result without
/// re-resolving the callee's signature (spec §4.3's overload resolution
/// itself happens upstream; this core only needs the winning return type).
fn build_call_returns(
    module: &AstModule,
    resolver: &mut Resolver<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> FxHashMap<Name, TypeId> {
    let mut call_returns = FxHashMap::default();
    for function in &module.functions {
        match resolver.resolve(&function.return_type, &module.namespace, &module.using_namespaces, Span::DUMMY) {
            Ok(ty) => {
                call_returns.insert(function.name, ty);
            }
            Err(err) => diagnostics.push(err.to_diagnostic()),
        }
    }
    call_returns
}

/// Declared variant count of every enum, keyed by the `TypeId` its kind
/// index is represented as. Every enum currently collapses onto the same
/// shared `int32` `TypeId` (spec §3), so in a module with more than one
/// enum this map can only hold the last one registered — exhaustiveness
/// checking against the others falls back to the non-enum-aware "no count
/// known" path. Recorded as an accepted simplification in DESIGN.md.
fn build_enum_variant_counts(
    module: &AstModule,
    resolver: &mut Resolver<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> FxHashMap<TypeId, usize> {
    let mut counts = FxHashMap::default();
    for ast_enum in &module.enums {
        let ty = AstType::base(ast_enum.name);
        match resolver.resolve(&ty, &module.namespace, &module.using_namespaces, Span::DUMMY) {
            Ok(ty) => {
                counts.insert(ty, ast_enum.kinds.len());
            }
            Err(err) => diagnostics.push(err.to_diagnostic()),
        }
    }
    counts
}

/// Lower one Object's whole `AstModule` into a finished `IrModule`, or the
/// diagnostics explaining why it couldn't be.
///
/// `strings` is mutable because the driver interns a couple of synthetic
/// names of its own (the module deinitialization routine) alongside the
/// parser-supplied identifiers already interned into it.
pub fn compile_object(
    module: &AstModule,
    strings: &mut StringInterner,
    flags: CompilerFlags,
) -> Result<IrModule, Vec<Diagnostic>> {
    let registry = build_type_registry(module);
    // Built standalone rather than borrowed out of `IrModule` directly:
    // `resolver` needs to stay alive across the whole lowering loop, and
    // `IrModule::add_function` inside that loop needs unique access to the
    // module as a whole, which a live borrow into one of its fields would
    // block. The two are reunited once `resolver` (and the borrow it
    // holds) is no longer needed.
    let mut type_interner = TypeInterner::new();
    let mut diagnostics = Vec::new();

    // Interned up front, before `resolver` borrows `strings` for the rest
    // of this function's lifetime.
    let length_method = strings.intern("__length__");
    let array_method = strings.intern("__array__");

    let mut resolver = Resolver::new(&registry, strings, &mut type_interner);
    let call_returns = build_call_returns(module, &mut resolver, &mut diagnostics);
    let enum_variant_counts = build_enum_variant_counts(module, &mut resolver, &mut diagnostics);
    let destructors = build_destructor_resolver(module, &mut resolver, &mut diagnostics);
    let assignments = build_assignment_resolver(module, &mut resolver, strings, &mut diagnostics);

    let has_main = module.functions.iter().any(|f| f.traits.contains(FunctionTraits::MAIN));

    let mut ir_module = IrModule::new();
    let mut all_deferred_statics = Vec::new();

    for function in &module.functions {
        if function.traits.contains(FunctionTraits::FOREIGN) {
            // No body to lower; an extern declaration only contributes its
            // (already-recorded) signature to `call_returns`.
            continue;
        }
        match lower_function(
            &mut resolver,
            &destructors,
            &assignments,
            module,
            function,
            &call_returns,
            &enum_variant_counts,
            length_method,
            array_method,
            flags,
        ) {
            Ok((ir_function, mut deferred_statics)) => {
                debug!(name = function.name.raw(), blocks = ir_function.blocks.len(), "lowered function");
                ir_module.add_function(ir_function);
                // `main`'s own `return` already deinits its statics in
                // declaration order; folding them into the module's deinit
                // function too would destruct them twice.
                if !function.traits.contains(FunctionTraits::MAIN) {
                    all_deferred_statics.append(&mut deferred_statics);
                }
            }
            Err(diag) => diagnostics.push(diag),
        }
    }

    if !all_deferred_statics.is_empty() && !has_main {
        diagnostics.push(LowerError::StaticWithoutMain { span: Span::DUMMY }.to_diagnostic());
    }

    if !all_deferred_statics.is_empty() {
        ir_module.deinit_function = Some(build_deinit_function(
            &mut type_interner,
            &destructors,
            strings,
            &all_deferred_statics,
        ));
    }
    ir_module.type_interner = type_interner;

    if diagnostics.is_empty() {
        Ok(ir_module)
    } else {
        Err(diagnostics)
    }
}

#[allow(clippy::too_many_arguments)]
fn lower_function(
    resolver: &mut Resolver<'_>,
    destructors: &dyn DestructorResolver,
    assignments: &dyn AssignmentResolver,
    module: &AstModule,
    function: &AstFunction,
    call_returns: &FxHashMap<Name, TypeId>,
    enum_variant_counts: &FxHashMap<TypeId, usize>,
    length_method: Name,
    array_method: Name,
    flags: CompilerFlags,
) -> Result<(IrFunction, Vec<BridgeVar>), Diagnostic> {
    let return_type = resolver
        .resolve(&function.return_type, &module.namespace, &module.using_namespaces, Span::DUMMY)
        .map_err(|e| e.to_diagnostic())?;

    let mut param_types = Vec::with_capacity(function.params.len());
    for param in &function.params {
        let ty = resolver
            .resolve(&param.ty, &module.namespace, &module.using_namespaces, Span::DUMMY)
            .map_err(|e| e.to_diagnostic())?;
        param_types.push(ty);
    }

    let mut ir_function = IrFunction::new(function.name, param_types.clone(), return_type);
    let mut state = StmtState::new();
    for (param, &ty) in function.params.iter().zip(param_types.iter()) {
        let slot = ir_function.push_slot(param.name, ty);
        state.scope.declare(BridgeVar { name: param.name, slot, ty, traits: VarTraits::POD, span: Span::DUMMY });
    }

    let mut builder = IrBuilder::new(&mut ir_function);
    let entry = builder.new_block();
    builder.use_block(entry);

    let ctx = StmtCtx {
        arena: &function.arena,
        current_ns: &module.namespace,
        using_ns: &module.using_namespaces,
        call_returns,
        enum_variant_counts,
        return_type,
        flags,
        is_main: function.traits.contains(FunctionTraits::MAIN),
        length_method,
        array_method,
    };

    lower_block(&mut builder, resolver, destructors, assignments, &ctx, &mut state, &function.body)
        .map_err(|e| e.to_diagnostic())?;

    Ok((ir_function, state.deferred_statics))
}

/// The module's deinitialization routine: every `static` local's
/// destructor, in reverse order of first encounter across the whole
/// compilation (spec §4.7). Its declared return type is an arbitrary
/// placeholder, since `IrFunction` has no dedicated "void" type and the
/// routine never actually returns a value.
fn build_deinit_function(
    type_interner: &mut TypeInterner,
    destructors: &dyn DestructorResolver,
    strings: &mut StringInterner,
    statics: &[BridgeVar],
) -> IrFunction {
    let name = strings.intern("__kiln_deinit__");
    let placeholder_return = type_interner.bool_ty();
    let mut function = IrFunction::new(name, Vec::new(), placeholder_return);
    let mut builder = IrBuilder::new(&mut function);
    let entry = builder.new_block();
    builder.use_block(entry);
    emit_static_deinit(&mut builder, destructors, statics)
        .expect("static deinit emission over a fresh block cannot fail");
    builder.terminate_return(None).expect("fresh block has no terminator yet");
    function
}
