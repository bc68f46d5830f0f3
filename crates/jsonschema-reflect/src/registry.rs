//! Definitions table for one reflection call.
//!
//! Names are reserved before a type's contents are walked, so a type that
//! reaches itself again gets a `$ref` to the reserved name instead of
//! recursing.

use std::any::TypeId;
use std::collections::HashMap;

use crate::schema::{Definitions, Schema};

/// What the registry knows about a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Status {
    Unseen,
    /// Currently being walked; reaching it again is a cycle.
    InProgress(String),
    Defined(String),
}

#[derive(Debug)]
struct Entry {
    name: String,
    in_progress: bool,
    defined: bool,
    /// A cycle produced a `$ref` to this entry.
    cycle_target: bool,
}

/// Collects definitions and hands out collision-free names.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    definitions: Definitions,
    entries: HashMap<TypeId, Entry>,
    /// Which type owns each name.
    owners: HashMap<String, TypeId>,
    name_counter: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, id: TypeId) -> Status {
        match self.entries.get(&id) {
            Some(entry) if entry.in_progress => Status::InProgress(entry.name.clone()),
            Some(entry) if entry.defined => Status::Defined(entry.name.clone()),
            _ => Status::Unseen,
        }
    }

    /// Name assigned to `id`, reserving one on first use. `base` is tried
    /// first, then `qualified`, then `base__N`.
    pub fn name_for(&mut self, id: TypeId, base: &str, qualified: &str) -> String {
        if let Some(entry) = self.entries.get(&id) {
            return entry.name.clone();
        }
        let name = self.generate_name(id, base, qualified);
        self.owners.insert(name.clone(), id);
        self.entries.insert(
            id,
            Entry {
                name: name.clone(),
                in_progress: false,
                defined: false,
                cycle_target: false,
            },
        );
        name
    }

    fn generate_name(&mut self, id: TypeId, base: &str, qualified: &str) -> String {
        let free = |owners: &HashMap<String, TypeId>, name: &str| {
            owners.get(name).is_none_or(|owner| *owner == id)
        };
        if free(&self.owners, base) {
            return base.to_string();
        }
        if !qualified.is_empty() && free(&self.owners, qualified) {
            tracing::trace!(name = base, qualified, "definition name collision");
            return qualified.to_string();
        }
        loop {
            self.name_counter += 1;
            let candidate = format!("{base}__{}", self.name_counter);
            if free(&self.owners, &candidate) {
                tracing::trace!(name = base, candidate = %candidate, "definition name collision");
                return candidate;
            }
        }
    }

    /// Marks `id` as being walked. Its name must already be reserved.
    pub fn begin(&mut self, id: TypeId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.in_progress = true;
        }
    }

    /// Records that a cycle produced a `$ref` to `id`.
    pub fn mark_cycle_target(&mut self, id: TypeId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.cycle_target = true;
        }
    }

    pub fn is_cycle_target(&self, id: TypeId) -> bool {
        self.entries.get(&id).is_some_and(|entry| entry.cycle_target)
    }

    /// Ends the walk of `id`. A given schema becomes the definition and
    /// later encounters resolve to it.
    pub fn finish(&mut self, id: TypeId, schema: Option<Schema>) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        entry.in_progress = false;
        if let Some(schema) = schema {
            tracing::trace!(name = %entry.name, "registered definition");
            entry.defined = true;
            self.definitions.insert(entry.name.clone(), schema);
        }
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Definitions sorted by name.
    pub fn into_definitions(mut self) -> Definitions {
        self.definitions.sort_keys();
        self.definitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;
    struct C;

    #[test]
    fn names_are_stable_per_type() {
        let mut registry = Registry::new();
        let a = TypeId::of::<A>();
        assert_eq!(registry.name_for(a, "Item", "one::Item"), "Item");
        assert_eq!(registry.name_for(a, "Item", "one::Item"), "Item");
    }

    #[test]
    fn collisions_fall_back_to_qualified_then_counter() {
        let mut registry = Registry::new();
        assert_eq!(registry.name_for(TypeId::of::<A>(), "Item", "one::Item"), "Item");
        assert_eq!(registry.name_for(TypeId::of::<B>(), "Item", "two::Item"), "two::Item");
        assert_eq!(registry.name_for(TypeId::of::<C>(), "Item", "two::Item"), "Item__1");
    }

    #[test]
    fn lifecycle_tracks_cycles_and_definitions() {
        let mut registry = Registry::new();
        let a = TypeId::of::<A>();
        assert_eq!(registry.status(a), Status::Unseen);

        let name = registry.name_for(a, "A", "");
        registry.begin(a);
        assert_eq!(registry.status(a), Status::InProgress(name.clone()));

        registry.mark_cycle_target(a);
        registry.finish(a, Some(Schema::new()));
        assert_eq!(registry.status(a), Status::Defined(name));
        assert!(registry.is_cycle_target(a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn finishing_without_schema_stores_nothing() {
        let mut registry = Registry::new();
        let a = TypeId::of::<A>();
        registry.name_for(a, "A", "");
        registry.begin(a);
        registry.finish(a, None);
        assert_eq!(registry.status(a), Status::Unseen);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn definitions_are_sorted() {
        let mut registry = Registry::new();
        for (id, name) in [(TypeId::of::<B>(), "Zeta"), (TypeId::of::<A>(), "Alpha")] {
            registry.name_for(id, name, "");
            registry.begin(id);
            registry.finish(id, Some(Schema::new()));
        }
        let names: Vec<_> = registry.into_definitions().into_keys().collect();
        assert_eq!(names, ["Alpha", "Zeta"]);
    }
}
