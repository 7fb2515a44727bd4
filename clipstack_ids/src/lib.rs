//! Handle types for the clipboard engine's arenas and tables.
//!
//! A handle packs an arena slot index and that slot's generation into one
//! word. Looking an object up checks both halves, so a handle kept across a
//! slot's reuse simply stops resolving instead of pointing at the new
//! occupant. A zero index is reserved to mean "no object".

#![forbid(unsafe_code)]

use std::fmt;

const INDEX_BITS: u32 = 32;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

macro_rules! arena_handle {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// The "no object" handle. Resolves to nothing in every arena.
            pub const fn nil() -> Self {
                Self(0)
            }

            pub const fn from_parts(index: u32, generation: u32) -> Self {
                Self(((generation as u64) << INDEX_BITS) | index as u64)
            }

            #[inline]
            pub const fn index(self) -> u32 {
                (self.0 & INDEX_MASK) as u32
            }

            #[inline]
            pub const fn generation(self) -> u32 {
                (self.0 >> INDEX_BITS) as u32
            }

            #[inline]
            pub const fn is_nil(self) -> bool {
                self.index() == 0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name))
                    .field(&self.index())
                    .field(&self.generation())
                    .finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_nil() {
                    f.write_str("nil")
                } else {
                    write!(f, "{}v{}", self.index(), self.generation())
                }
            }
        }
    };
}

arena_handle!(
    ObjectId,
    "Handle to an engine object (scene node, component, or asset)."
);
arena_handle!(
    ManagedId,
    "Handle to a managed (plain polymorphic) object."
);
arena_handle!(
    TypeId,
    "Handle to a registered type descriptor. The registry never reuses slots, so the generation stays 0."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_is_the_default_and_resolves_to_nothing() {
        assert!(ObjectId::nil().is_nil());
        assert_eq!(ObjectId::default(), ObjectId::nil());
        assert_eq!(format!("{}", ManagedId::nil()), "nil");
    }

    #[test]
    fn parts_survive_packing() {
        let cases: &[(u32, u32)] = &[(1, 0), (5, 2), (12345, 77), (u32::MAX, u32::MAX)];
        for &(index, generation) in cases {
            let id = ObjectId::from_parts(index, generation);
            assert_eq!(id.index(), index);
            assert_eq!(id.generation(), generation);
            assert!(!id.is_nil());
        }
    }

    #[test]
    fn a_bumped_generation_is_a_different_handle() {
        let stale = ManagedId::from_parts(3, 0);
        let reused = ManagedId::from_parts(3, 1);
        assert_ne!(stale, reused);
        assert_eq!(format!("{reused}"), "3v1");
    }
}
