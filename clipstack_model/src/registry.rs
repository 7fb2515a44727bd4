//! Registered type descriptors and name-based type resolution.
//!
//! Clipboard entries record types by qualified name; entries written by an
//! older build of the host may carry module spellings that have since moved.
//! Resolution therefore runs three strategies in order: exact qualified-name
//! lookup, a remap table of historical module renames, and finally a linear
//! scan matching on simple type name. A miss is not an error — the caller
//! treats it as "reference lost".

use clipstack_ids::TypeId;
use rustc_hash::FxHashMap;

use crate::property::PropertySet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeCategory {
    Node,
    Component,
    Asset,
    Managed,
}

#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    pub simple_name: String,
    /// `module::Name` spelling recorded on clipboards.
    pub qualified_name: String,
    pub category: TypeCategory,
    /// Property template cloned onto freshly added components/assets.
    pub defaults: PropertySet,
}

/// Name-to-type resolution surface consumed by the clipboard engine.
pub trait TypeResolver {
    fn resolve(&self, qualified_name: &str) -> Option<TypeId>;
    fn resolve_simple(&self, simple_name: &str) -> Option<TypeId>;
}

pub struct TypeRegistry {
    types: Vec<TypeDescriptor>,
    by_qualified: FxHashMap<String, TypeId>,
    /// Pairs of historical module spellings, applied in both directions.
    module_remaps: Vec<(String, String)>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            types: Vec::new(),
            by_qualified: FxHashMap::default(),
            module_remaps: Vec::new(),
        }
    }

    /// Record that `from::` and `to::` are the same module under two names.
    pub fn add_module_remap(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.module_remaps.push((from.into(), to.into()));
    }

    pub fn register(&mut self, descriptor: TypeDescriptor) -> TypeId {
        let id = TypeId::from_parts(self.types.len() as u32 + 1, 0);
        self.by_qualified
            .insert(descriptor.qualified_name.clone(), id);
        self.types.push(descriptor);
        id
    }

    #[inline]
    pub fn descriptor(&self, id: TypeId) -> Option<&TypeDescriptor> {
        if id.is_nil() {
            return None;
        }
        self.types.get(id.index() as usize - 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeDescriptor)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, d)| (TypeId::from_parts(i as u32 + 1, 0), d))
    }

    fn remapped_candidates(&self, qualified_name: &str) -> Vec<String> {
        let mut out = Vec::new();
        for (a, b) in &self.module_remaps {
            if let Some(rest) = qualified_name.strip_prefix(a.as_str()) {
                out.push(format!("{b}{rest}"));
            }
            if let Some(rest) = qualified_name.strip_prefix(b.as_str()) {
                out.push(format!("{a}{rest}"));
            }
        }
        out
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeResolver for TypeRegistry {
    fn resolve(&self, qualified_name: &str) -> Option<TypeId> {
        if let Some(&id) = self.by_qualified.get(qualified_name) {
            return Some(id);
        }
        for candidate in self.remapped_candidates(qualified_name) {
            if let Some(&id) = self.by_qualified.get(candidate.as_str()) {
                return Some(id);
            }
        }
        let simple = qualified_name
            .rsplit("::")
            .next()
            .unwrap_or(qualified_name);
        self.resolve_simple(simple)
    }

    fn resolve_simple(&self, simple_name: &str) -> Option<TypeId> {
        self.types
            .iter()
            .position(|d| d.simple_name == simple_name)
            .map(|i| TypeId::from_parts(i as u32 + 1, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertySet;

    fn descriptor(simple: &str, qualified: &str) -> TypeDescriptor {
        TypeDescriptor {
            simple_name: simple.to_string(),
            qualified_name: qualified.to_string(),
            category: TypeCategory::Component,
            defaults: PropertySet::new(),
        }
    }

    #[test]
    fn exact_lookup_wins() {
        let mut registry = TypeRegistry::new();
        let id = registry.register(descriptor("Mover", "game::Mover"));
        assert_eq!(registry.resolve("game::Mover"), Some(id));
    }

    #[test]
    fn module_remap_applies_both_directions() {
        let mut registry = TypeRegistry::new();
        registry.add_module_remap("game", "game_core");
        let id = registry.register(descriptor("Mover", "game_core::Mover"));
        assert_eq!(registry.resolve("game::Mover"), Some(id));

        let mut registry = TypeRegistry::new();
        registry.add_module_remap("game", "game_core");
        let id = registry.register(descriptor("Mover", "game::Mover"));
        assert_eq!(registry.resolve("game_core::Mover"), Some(id));
    }

    #[test]
    fn simple_name_scan_is_the_last_resort() {
        let mut registry = TypeRegistry::new();
        let id = registry.register(descriptor("Mover", "relocated::deeply::Mover"));
        assert_eq!(registry.resolve("legacy::Mover"), Some(id));
        assert_eq!(registry.resolve("legacy::Gone"), None);
    }
}
