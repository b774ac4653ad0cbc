//! Compiler traits (spec §6): switches threaded through every lowering
//! entry point rather than a global/thread-local, per `Object`'s
//! single-owner-per-compilation model (spec §5).

bitflags::bitflags! {
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct CompilerFlags: u16 {
        /// Promote early-return and other pedantic warnings to errors.
        const STRICT                  = 1 << 0;
        const IGNORE_EARLY_RETURN     = 1 << 1;
        const IGNORE_UNUSED           = 1 << 2;
        const IGNORE_DEPRECATION      = 1 << 3;
        const IGNORE_PARTIAL_SUPPORT  = 1 << 4;
        const IGNORE_OBSOLETE         = 1 << 5;
        /// Force zero-initialization of `undef` declarations regardless of
        /// the `is_undef` flag on the declaration itself.
        const NO_UNDEF                = 1 << 6;
        /// Skip RTTI population of reflected kinds.
        const NO_TYPEINFO             = 1 << 7;
        /// Insert a null-guard before every pointer dereference.
        const NULL_CHECKS             = 1 << 8;
    }
}
