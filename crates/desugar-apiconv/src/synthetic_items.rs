//! Arena of classes synthesized during a pass.
//!
//! Classes are registered under their name the moment synthesis starts
//! (`UnderConstruction`) and flipped to `Complete` once every member has been
//! added. A re-entrant request for a class that is still being built finds
//! the registered record instead of starting over.

use std::collections::HashMap;

use desugar_ir::{ClassDef, ClassName, MethodDef, Proto};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};

use crate::error::ConversionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ClassHandle(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassState {
    UnderConstruction,
    Complete,
}

#[derive(Debug)]
struct ClassRecord {
    class: ClassDef,
    state: ClassState,
}

#[derive(Debug, Default)]
struct Arena {
    records: Vec<ClassRecord>,
    by_name: HashMap<ClassName, ClassHandle>,
}

#[derive(Debug, Default)]
pub(crate) struct SyntheticItems {
    /// Held for the whole synthesis of a class, so at most one synthesis is
    /// in flight at a time. Re-entrant: synthesizing a wrapper may require
    /// synthesizing further conversions on the same thread.
    synthesis: ReentrantMutex<()>,
    arena: Mutex<Arena>,
}

impl SyntheticItems {
    pub(crate) fn lock_synthesis(&self) -> ReentrantMutexGuard<'_, ()> {
        self.synthesis.lock()
    }

    /// Registers `class` as under construction. Returns `None` when a class
    /// with the same name already exists.
    pub(crate) fn begin_class(&self, class: ClassDef) -> Option<ClassHandle> {
        let mut arena = self.arena.lock();
        if arena.by_name.contains_key(&class.name) {
            return None;
        }
        Some(arena.insert(class, ClassState::UnderConstruction))
    }

    /// The complete class named `name`, created by `make` if absent.
    pub(crate) fn get_or_create_class(
        &self,
        name: &ClassName,
        make: impl FnOnce() -> ClassDef,
    ) -> ClassHandle {
        let mut arena = self.arena.lock();
        if let Some(handle) = arena.by_name.get(name) {
            return *handle;
        }
        arena.insert(make(), ClassState::Complete)
    }

    pub(crate) fn complete(&self, handle: ClassHandle) {
        self.arena.lock().records[handle.0].state = ClassState::Complete;
    }

    /// Adds `method` unless the class already declares its signature.
    pub(crate) fn add_method(&self, handle: ClassHandle, method: MethodDef) -> bool {
        self.arena.lock().records[handle.0].class.add_method(method)
    }

    pub(crate) fn has_method(&self, handle: ClassHandle, name: &str, proto: &Proto) -> bool {
        self.arena.lock().records[handle.0]
            .class
            .lookup_method(name, proto)
            .is_some()
    }

    /// Number of methods whose name starts with `prefix`.
    pub(crate) fn count_methods(&self, handle: ClassHandle, prefix: &str) -> usize {
        self.arena.lock().records[handle.0]
            .class
            .methods
            .iter()
            .filter(|method| method.name().starts_with(prefix))
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.arena.lock().records.len()
    }

    /// Every synthesized class sorted by name, members sorted by signature.
    pub(crate) fn into_classes(self) -> Result<Vec<ClassDef>, ConversionError> {
        let arena = self.arena.into_inner();
        let mut classes = Vec::with_capacity(arena.records.len());
        for record in arena.records {
            if record.state == ClassState::UnderConstruction {
                return Err(ConversionError::inconsistency(format!(
                    "synthesis of `{}` never completed",
                    record.class.name
                )));
            }
            let mut class = record.class;
            class
                .methods
                .sort_by(|a, b| (a.name(), a.proto()).cmp(&(b.name(), b.proto())));
            class
                .fields
                .sort_by(|a, b| a.field.name.cmp(&b.field.name));
            classes.push(class);
        }
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(classes)
    }
}

impl Arena {
    fn insert(&mut self, class: ClassDef, state: ClassState) -> ClassHandle {
        let handle = ClassHandle(self.records.len());
        self.by_name.insert(class.name.clone(), handle);
        self.records.push(ClassRecord { class, state });
        handle
    }
}
