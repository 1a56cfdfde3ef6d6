use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use desugar_ir::{ClassDef, ClassGraph, ClassName, Code, Invoke, MethodDef, MethodRef, TypeRef};
use desugar_spec::{MachineSpecification, TypeRewriter};
use parking_lot::Mutex;

use crate::decision::ConversionDirection;
use crate::error::ConversionError;
use crate::options::ConversionOptions;
use crate::preceding::{
    BackportedMethods, InterfaceMethodDesugaring, PrecedingDesugaring, RetargetedMethods,
};
use crate::reporter::{Diagnostic, Reporter, Severity};
use crate::synthetic_items::SyntheticItems;
use crate::wrapper::{WrappedMethod, WrapperConversions};

/// Shared state of one API conversion pass.
///
/// Created at the start of the pass, written to while classes are scanned
/// (possibly from several worker threads) and consumed by [`finish`].
///
/// [`finish`]: ConversionContext::finish
pub struct ConversionContext<'a> {
    pub(crate) graph: &'a ClassGraph,
    pub(crate) spec: &'a MachineSpecification,
    pub(crate) rewriter: &'a dyn TypeRewriter,
    pub(crate) options: &'a ConversionOptions,
    pub(crate) reporter: &'a Reporter,
    preceding: Vec<Box<dyn PrecedingDesugaring + 'a>>,
    pub(crate) synthetics: SyntheticItems,
    pub(crate) memo: Memo,
    tracked: Mutex<BTreeSet<MethodRef>>,
    tracked_callbacks: Mutex<BTreeSet<MethodRef>>,
}

/// Memo tables. Guards are never held across a call that may synthesize.
#[derive(Default)]
pub(crate) struct Memo {
    pub(crate) conversions: Mutex<HashMap<(TypeRef, ConversionDirection), MethodRef>>,
    pub(crate) wrappers: Mutex<HashMap<ClassName, WrapperConversions>>,
    pub(crate) wrapper_methods: Mutex<HashMap<ClassName, Arc<[WrappedMethod]>>>,
    pub(crate) outlines: Mutex<HashMap<(ClassName, OutlineKey), MethodRef>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum OutlineKey {
    Call(Invoke),
    Parameters(MethodRef),
}

/// What the pass does to one program class.
#[derive(Debug)]
pub(crate) struct ClassResult {
    pub(crate) class: ClassName,
    pub(crate) rewritten: Vec<(MethodRef, Code)>,
    pub(crate) callbacks: Vec<MethodDef>,
}

/// Everything a pass synthesized, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesizedItems {
    pub classes: Vec<ClassDef>,
    pub tracked_conversions: Vec<MethodRef>,
    pub tracked_callbacks: Vec<MethodRef>,
}

impl<'a> ConversionContext<'a> {
    pub fn new(
        graph: &'a ClassGraph,
        spec: &'a MachineSpecification,
        rewriter: &'a dyn TypeRewriter,
        options: &'a ConversionOptions,
        reporter: &'a Reporter,
    ) -> Self {
        let preceding: Vec<Box<dyn PrecedingDesugaring + 'a>> = vec![
            Box::new(InterfaceMethodDesugaring::new(
                options.supports_default_interface_methods,
            )),
            Box::new(RetargetedMethods::new(spec)),
            Box::new(BackportedMethods::new(spec)),
        ];
        Self {
            graph,
            spec,
            rewriter,
            options,
            reporter,
            preceding,
            synthetics: SyntheticItems::default(),
            memo: Memo::default(),
            tracked: Mutex::new(BTreeSet::new()),
            tracked_callbacks: Mutex::new(BTreeSet::new()),
        }
    }

    #[must_use]
    pub fn with_preceding_desugaring(mut self, stage: Box<dyn PrecedingDesugaring + 'a>) -> Self {
        self.preceding.push(stage);
        self
    }

    pub fn options(&self) -> &ConversionOptions {
        self.options
    }

    pub fn reporter(&self) -> &Reporter {
        self.reporter
    }

    /// Number of classes synthesized so far.
    pub fn synthesized_class_count(&self) -> usize {
        self.synthetics.len()
    }

    pub(crate) fn is_desugared_by_preceding_stage(&self, invoke: &Invoke, context: &ClassDef) -> bool {
        self.preceding.iter().any(|stage| {
            let handled = stage.needs_desugaring(invoke, context);
            if handled {
                tracing::trace!(
                    target: "desugar.apiconv",
                    stage = stage.name(),
                    method = %invoke.method,
                    "invoke left to a preceding desugaring"
                );
            }
            handled
        })
    }

    /// Name of a class synthesized for `ty`: the desugared name of its base
    /// type plus `suffix`.
    pub(crate) fn synthetic_class_name(
        &self,
        ty: &TypeRef,
        suffix: &str,
    ) -> Result<ClassName, ConversionError> {
        let base = ty.base_type();
        let name = self
            .rewriter
            .rewritten_type(base)
            .as_ref()
            .and_then(|rewritten| rewritten.class_name().cloned())
            .or_else(|| base.class_name().cloned())
            .ok_or_else(|| {
                ConversionError::inconsistency(format!("no class can be synthesized for `{ty}`"))
            })?;
        Ok(name.with_suffix(suffix))
    }

    pub(crate) fn track_conversion(&self, method: &MethodRef) {
        if self.options.track_api_conversions {
            self.tracked.lock().insert(method.clone());
        }
    }

    pub(crate) fn track_callback(&self, method: &MethodRef) {
        if self.options.track_api_conversions {
            self.tracked_callbacks.lock().insert(method.clone());
        }
    }

    pub(crate) fn process_class(&self, class: &ClassDef) -> Result<ClassResult, ConversionError> {
        let mut result = ClassResult {
            class: class.name.clone(),
            rewritten: Vec::new(),
            callbacks: Vec::new(),
        };
        if let Some(kind) = class.synthetic {
            tracing::trace!(target: "desugar.apiconv", class = %class.name, %kind, "skipping synthesized class");
            return Ok(result);
        }
        for method in &class.methods {
            if let Some(code) = self.rewrite_call_sites(class, method)? {
                result.rewritten.push((method.method.clone(), code));
            }
        }
        for method in &class.methods {
            if !self.should_register_callback(class, method) {
                continue;
            }
            if let Some(callback) = self.synthesize_callback(class, method)? {
                result.callbacks.push(callback);
            }
        }
        Ok(result)
    }

    /// Ends the pass: reports tracked conversions and drains the synthesized
    /// classes in a stable order.
    pub fn finish(self) -> Result<SynthesizedItems, ConversionError> {
        let tracked_conversions: Vec<MethodRef> = self.tracked.into_inner().into_iter().collect();
        let tracked_callbacks: Vec<MethodRef> =
            self.tracked_callbacks.into_inner().into_iter().collect();
        report_tracked(self.reporter, "", &tracked_conversions);
        report_tracked(self.reporter, "callback ", &tracked_callbacks);
        let classes = self.synthetics.into_classes()?;
        Ok(SynthesizedItems {
            classes,
            tracked_conversions,
            tracked_callbacks,
        })
    }
}

fn report_tracked(reporter: &Reporter, kind: &str, methods: &[MethodRef]) {
    if methods.is_empty() {
        return;
    }
    let mut message = format!("Tracked {kind}desugared API conversions: ");
    for method in methods {
        message.push('\n');
        message.push_str(&method.to_string());
    }
    reporter.warning(Diagnostic::new(Severity::Warning, message));
}
