//! Callbacks: copies of program methods that override library methods, with
//! the library's own signature.
//!
//! The original runtime calls an overridden method with the original types,
//! which the type lens turns into something else in the program. A callback
//! with the vivified signature keeps that dispatch working: it converts its
//! arguments, calls the program method and converts the result back.

use std::collections::{HashSet, VecDeque};

use desugar_ir::access::ACC_SYNTHETIC;
use desugar_ir::{
    ClassDef, CodeBuilder, Invoke, MethodDef, OptionalBool, SyntheticKind, TypeRef, ValueType,
};

use crate::context::ConversionContext;
use crate::decision::ConversionDirection;
use crate::error::ConversionError;
use crate::wrapper::emit_forwarding_call;

impl ConversionContext<'_> {
    /// Whether `method` of `class` needs a callback.
    pub fn should_register_callback(&self, class: &ClassDef, method: &MethodDef) -> bool {
        if class.synthetic.is_some() || method.synthetic.is_some() {
            return false;
        }
        if method.is_private()
            || method.is_static()
            || method.is_abstract()
            || !method.is_virtual()
            || method.library_override.is_false()
        {
            return false;
        }
        if !self.rewriter.has_rewritten_type_in_signature(method.proto())
            || self.spec.is_emulated_interface(&class.ty())
        {
            return false;
        }
        let library_compilation = self.options.is_desugared_library_compilation();
        if !self.options.whole_program
            && class.is_interface()
            && (!self.options.supports_default_interface_methods || library_compilation)
        {
            return false;
        }
        if !self.spec.support_all_callbacks_from_library && library_compilation {
            return false;
        }
        self.overrides_non_final_library_method(class, method)
    }

    /// Walks every supertype of `class` except `Object` looking for an
    /// overridden method on a library class (any class when compiling the
    /// desugared library).
    fn overrides_non_final_library_method(&self, class: &ClassDef, method: &MethodDef) -> bool {
        let library_compilation = self.options.is_desugared_library_compilation();
        let mut queue: VecDeque<&TypeRef> = class.direct_supertypes().collect();
        let mut visited: HashSet<&TypeRef> = HashSet::new();
        let mut found = false;
        while let Some(ty) = queue.pop_front() {
            if ty.is_object() || !visited.insert(ty) {
                continue;
            }
            let Some(current) = self.graph.definition_for(ty) else {
                continue;
            };
            queue.extend(current.direct_supertypes());
            if !current.is_library() && !library_compilation {
                continue;
            }
            if !self.spec.support_all_callbacks_from_library
                && self.spec.is_emulated_interface(&current.ty())
            {
                continue;
            }
            let Some(overridden) = current.lookup_virtual_method(method.name(), method.proto()) else {
                continue;
            };
            // Instances of a rewritten type are wrapped instead.
            if self.rewriter.has_rewritten_type(&current.ty()) {
                return false;
            }
            if overridden.is_final() {
                return false;
            }
            found = true;
        }
        found
    }

    /// The callback of `method`, or `None` when its vivified signature is the
    /// same as its own or already declared by `class`.
    pub fn synthesize_callback(
        &self,
        class: &ClassDef,
        method: &MethodDef,
    ) -> Result<Option<MethodDef>, ConversionError> {
        let direction = ConversionDirection::FromVivified;
        let conversions = self.signature_conversions(&method.method, direction)?;
        let callback = conversions.converted_method(&method.method, direction, class.ty());
        if callback.proto == method.method.proto
            || class.lookup_method(&callback.name, &callback.proto).is_some()
        {
            return Ok(None);
        }
        let target = method.method.with_holder(class.ty());
        let invoke = if class.is_interface() {
            Invoke::invoke_interface(target)
        } else {
            Invoke::invoke_virtual(target)
        };
        let mut builder = CodeBuilder::new();
        builder.load(ValueType::Object, 0);
        emit_forwarding_call(&mut builder, &callback.proto, &conversions, invoke, 1);
        let code = builder.build(1 + callback.proto.param_slots());

        let library_override = if method.library_override.is_true() {
            OptionalBool::True
        } else {
            OptionalBool::Unknown
        };
        tracing::debug!(target: "desugar.apiconv", %callback, "synthesized callback");
        self.track_callback(&method.method);
        Ok(Some(
            MethodDef::new(callback, method.access.with(ACC_SYNTHETIC))
                .with_code(code)
                .with_library_override(library_override)
                .with_synthetic(SyntheticKind::ApiConversionCallback),
        ))
    }
}
