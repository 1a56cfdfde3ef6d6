//! Desugarings that run before API conversion and take over some invokes.
//! A call one of them rewrites must not be converted a second time.

use desugar_ir::{ClassDef, Invoke};
use desugar_spec::MachineSpecification;

pub trait PrecedingDesugaring: Send + Sync {
    fn name(&self) -> &'static str;

    fn needs_desugaring(&self, invoke: &Invoke, context: &ClassDef) -> bool;
}

/// Calls to methods the desugared library provides as static backports.
#[derive(Debug, Clone, Copy)]
pub struct BackportedMethods<'a> {
    spec: &'a MachineSpecification,
}

impl<'a> BackportedMethods<'a> {
    pub fn new(spec: &'a MachineSpecification) -> Self {
        Self { spec }
    }
}

impl PrecedingDesugaring for BackportedMethods<'_> {
    fn name(&self) -> &'static str {
        "backported-methods"
    }

    fn needs_desugaring(&self, invoke: &Invoke, _context: &ClassDef) -> bool {
        self.spec.is_backported(&invoke.method)
    }
}

/// Calls redirected to a static helper of the desugared library.
#[derive(Debug, Clone, Copy)]
pub struct RetargetedMethods<'a> {
    spec: &'a MachineSpecification,
}

impl<'a> RetargetedMethods<'a> {
    pub fn new(spec: &'a MachineSpecification) -> Self {
        Self { spec }
    }
}

impl PrecedingDesugaring for RetargetedMethods<'_> {
    fn name(&self) -> &'static str {
        "retargeted-methods"
    }

    fn needs_desugaring(&self, invoke: &Invoke, _context: &ClassDef) -> bool {
        self.spec.retarget(&invoke.method).is_some()
    }
}

/// Static and super calls to interface methods, which are moved to companion
/// classes when the runtime lacks default and static interface methods.
#[derive(Debug, Clone, Copy)]
pub struct InterfaceMethodDesugaring {
    supports_default_interface_methods: bool,
}

impl InterfaceMethodDesugaring {
    pub fn new(supports_default_interface_methods: bool) -> Self {
        Self {
            supports_default_interface_methods,
        }
    }
}

impl PrecedingDesugaring for InterfaceMethodDesugaring {
    fn name(&self) -> &'static str {
        "interface-methods"
    }

    fn needs_desugaring(&self, invoke: &Invoke, _context: &ClassDef) -> bool {
        !self.supports_default_interface_methods
            && invoke.itf
            && (invoke.is_static() || invoke.is_super())
    }
}
