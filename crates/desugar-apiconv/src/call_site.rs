//! Rewriting of library calls whose signature mentions a rewritten type.
//!
//! A converted call either goes through a static helper synthesized next to
//! the calling class (`Caller$-API-CONV#apiConversion$N`), or has the
//! conversions emitted around the invoke itself.

use desugar_ir::{
    AccessFlags, BaseType, ClassDef, ClassName, ClassOrigin, Code, CodeBuilder, Instruction,
    Invoke, MethodDef, MethodRef, Proto, ResolvedMethod, SyntheticKind, TypeRef, ValueType,
};

use crate::context::{ConversionContext, OutlineKey};
use crate::decision::{ConversionDirection, SignatureConversions};
use crate::error::ConversionError;
use crate::wrapper::emit_forwarding_call;

const OUTLINE_PREFIX: &str = "apiConversion$";
const PARAMETERS_PREFIX: &str = "apiConversionParameters$";

/// What the rewriter learned about the target of a convertible call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RewriteTarget {
    pub(crate) is_public: bool,
}

impl ConversionContext<'_> {
    /// Whether `invoke`, issued from `context`, is a library call to convert.
    pub fn should_rewrite_invoke(&self, invoke: &Invoke, context: &ClassDef) -> bool {
        self.rewrite_target(invoke, context).is_some()
    }

    pub(crate) fn rewrite_target(&self, invoke: &Invoke, context: &ClassDef) -> Option<RewriteTarget> {
        if invoke.method.holder.is_array() {
            return None;
        }
        // Unresolvable calls keep their runtime error.
        let resolved = if invoke.is_super() {
            self.graph.lookup_super_target(&invoke.method, context)
        } else {
            self.graph.resolve_method(&invoke.method, invoke.itf)
        }?;
        if self.rewriter.has_rewritten_type(&resolved.holder_type())
            || self.rewriter.has_rewritten_type(&invoke.method.holder)
        {
            return None;
        }
        if !resolved.holder.is_library() || self.is_emulated_interface_override(&resolved) {
            return None;
        }
        if self.is_desugared_by_preceding_stage(invoke, context) {
            return None;
        }
        let needs_conversion = self.spec.generic_conversions(&invoke.method).is_some()
            || self
                .rewriter
                .has_rewritten_type_in_signature(&resolved.reference().proto);
        needs_conversion.then(|| RewriteTarget {
            is_public: resolved.method.is_public(),
        })
    }

    fn is_emulated_interface_override(&self, resolved: &ResolvedMethod<'_>) -> bool {
        let name = resolved.method.name();
        if !self.spec.is_emulated_method_name(name) {
            return false;
        }
        if self.spec.is_emulated_interface(&resolved.holder_type()) {
            return true;
        }
        self.graph
            .lookup_maximally_specific_method(resolved.holder, name, resolved.method.proto())
            .is_some_and(|found| self.spec.is_emulated_interface(&found.holder_type()))
    }

    /// The code of `method` with every convertible library call rewritten, or
    /// `None` when nothing changed.
    pub fn rewrite_call_sites(
        &self,
        class: &ClassDef,
        method: &MethodDef,
    ) -> Result<Option<Code>, ConversionError> {
        let Some(code) = &method.code else {
            return Ok(None);
        };
        if class.synthetic.is_some() {
            return Ok(None);
        }
        let mut builder = CodeBuilder::continuing(code);
        let mut changed = false;
        for insn in &code.instructions {
            let Instruction::Invoke(invoke) = insn else {
                builder.push(insn.clone());
                continue;
            };
            let Some(target) = self.rewrite_target(invoke, class) else {
                builder.push(insn.clone());
                continue;
            };
            let conversions =
                self.signature_conversions(&invoke.method, ConversionDirection::ToVivified)?;
            if conversions.is_empty() {
                builder.push(insn.clone());
                continue;
            }
            self.track_conversion(&invoke.method);
            if self.should_outline(invoke, method, target) {
                let outline = self.ensure_outline(invoke, class, &conversions)?;
                builder.invoke_static(outline);
            } else {
                self.emit_inline_conversion(&mut builder, invoke, class, &conversions, code.max_locals)?;
            }
            changed = true;
        }
        if !changed {
            return Ok(None);
        }
        tracing::trace!(target: "desugar.apiconv", method = %method.method, "rewrote library calls");
        let mut rewritten = builder.build(method.argument_slots());
        rewritten.max_locals = rewritten.max_locals.max(code.max_locals);
        rewritten.max_stack = rewritten.max_stack.max(code.max_stack);
        Ok(Some(rewritten))
    }

    fn should_outline(&self, invoke: &Invoke, context: &MethodDef, target: RewriteTarget) -> bool {
        self.options.outline_api_conversions
            && !invoke.is_super()
            && !invoke.method.is_instance_initializer()
            && !context.is_instance_initializer()
            && !self.spec.is_never_outline(&invoke.method)
            && target.is_public
    }

    /// A static helper performing `invoke` with its conversions. Non-static
    /// calls take the receiver as an extra leading parameter.
    fn ensure_outline(
        &self,
        invoke: &Invoke,
        context: &ClassDef,
        conversions: &SignatureConversions,
    ) -> Result<MethodRef, ConversionError> {
        let key = (context.name.clone(), OutlineKey::Call(invoke.clone()));
        if let Some(outline) = self.memo.outlines.lock().get(&key) {
            return Ok(outline.clone());
        }
        let method = &invoke.method;
        let proto = if invoke.has_receiver() {
            method.proto.prepend(method.holder.clone())
        } else {
            method.proto.clone()
        };
        let converted =
            conversions.converted_method(method, ConversionDirection::ToVivified, method.holder.clone());
        let mut builder = CodeBuilder::new();
        let first = if invoke.has_receiver() {
            builder.load(ValueType::Object, 0);
            1
        } else {
            0
        };
        emit_forwarding_call(
            &mut builder,
            &method.proto,
            conversions,
            Invoke::new(invoke.kind, converted, invoke.itf),
            first,
        );
        let code = builder.build(proto.param_slots());
        let outline = self.add_api_conversion_method(
            context,
            key,
            OUTLINE_PREFIX,
            proto,
            code,
            SyntheticKind::ApiConversion,
        )?;
        tracing::trace!(target: "desugar.apiconv", %outline, call = %method, "outlined API conversion");
        Ok(outline)
    }

    /// Adds a numbered static method to the `$-API-CONV` class of `context`,
    /// unless another thread already registered one for `key`.
    fn add_api_conversion_method(
        &self,
        context: &ClassDef,
        key: (ClassName, OutlineKey),
        prefix: &str,
        proto: Proto,
        code: Code,
        kind: SyntheticKind,
    ) -> Result<MethodRef, ConversionError> {
        let holder = context
            .name
            .with_suffix(SyntheticKind::ApiConversion.class_suffix());
        let _synthesis = self.synthetics.lock_synthesis();
        if let Some(existing) = self.memo.outlines.lock().get(&key) {
            return Ok(existing.clone());
        }
        let handle = self.synthetics.get_or_create_class(&holder, || {
            ClassDef::new(
                holder.as_str(),
                ClassOrigin::Program,
                AccessFlags::public_final_synthetic(),
            )
            .with_synthetic(SyntheticKind::ApiConversion)
        });
        let index = self.synthetics.count_methods(handle, prefix);
        let method = MethodRef::new(TypeRef::Class(holder), &format!("{prefix}{index}"), proto);
        let added = self.synthetics.add_method(
            handle,
            MethodDef::new(method.clone(), AccessFlags::public_static_synthetic())
                .with_code(code)
                .with_synthetic(kind),
        );
        if !added {
            return Err(ConversionError::inconsistency(format!(
                "helper `{method}` synthesized twice"
            )));
        }
        self.memo.outlines.lock().insert(key, method.clone());
        Ok(method)
    }

    /// Emits the conversions around the call. Only the last two parameters
    /// can be reached with `swap`; anything deeper goes through an `Object[]`
    /// helper whose elements are unpacked from the local `fresh_local`.
    fn emit_inline_conversion(
        &self,
        builder: &mut CodeBuilder,
        invoke: &Invoke,
        context: &ClassDef,
        conversions: &SignatureConversions,
        fresh_local: u16,
    ) -> Result<(), ConversionError> {
        let method = &invoke.method;
        let params = &method.proto.params;
        let count = params.len();
        if count > 0 {
            let deep = conversions.params[..count.saturating_sub(2)]
                .iter()
                .any(Option::is_some);
            let wide_last = count >= 2
                && params[count - 1].is_wide()
                && conversions.params[count - 2].is_some();
            if deep || wide_last {
                let helper = self.ensure_parameters_helper(invoke, context, conversions)?;
                builder
                    .invoke_static(helper)
                    .push(Instruction::Store(ValueType::Object, fresh_local));
                for (index, (param, conversion)) in params.iter().zip(&conversions.params).enumerate() {
                    let ty = conversion
                        .as_ref()
                        .map_or_else(|| param.clone(), |conversion| conversion.proto.ret.clone());
                    builder
                        .load(ValueType::Object, fresh_local)
                        .push(Instruction::ConstInt(index as i32))
                        .push(Instruction::ArrayLoad(ValueType::Object));
                    unbox_or_cast(builder, &ty);
                }
            } else {
                if let Some(last) = &conversions.params[count - 1] {
                    builder.invoke_static(last.clone());
                }
                if count >= 2 {
                    if let Some(second_to_last) = &conversions.params[count - 2] {
                        builder
                            .push(Instruction::Swap)
                            .invoke_static(second_to_last.clone())
                            .push(Instruction::Swap);
                    }
                }
            }
        }
        let converted =
            conversions.converted_method(method, ConversionDirection::ToVivified, method.holder.clone());
        builder.invoke(Invoke::new(invoke.kind, converted, invoke.itf));
        if let Some(ret) = &conversions.ret {
            builder.invoke_static(ret.clone());
        }
        Ok(())
    }

    /// `apiConversionParameters$N`: converts every parameter and returns them
    /// boxed in an `Object[]`.
    fn ensure_parameters_helper(
        &self,
        invoke: &Invoke,
        context: &ClassDef,
        conversions: &SignatureConversions,
    ) -> Result<MethodRef, ConversionError> {
        let key = (context.name.clone(), OutlineKey::Parameters(invoke.method.clone()));
        if let Some(helper) = self.memo.outlines.lock().get(&key) {
            return Ok(helper.clone());
        }
        let params = &invoke.method.proto.params;
        let proto = Proto::new(params.clone(), TypeRef::object().array_of());
        let mut builder = CodeBuilder::new();
        builder
            .push(Instruction::ConstInt(params.len() as i32))
            .push(Instruction::NewArray(TypeRef::object()));
        let mut local = 0;
        for (index, (param, conversion)) in params.iter().zip(&conversions.params).enumerate() {
            let Some(value_type) = param.value_type() else {
                continue;
            };
            builder
                .push(Instruction::Dup)
                .push(Instruction::ConstInt(index as i32))
                .load(value_type, local);
            if let Some(conversion) = conversion {
                builder.invoke_static(conversion.clone());
            }
            if let TypeRef::Primitive(base) = param {
                builder.invoke_static(box_method(*base));
            }
            builder.push(Instruction::ArrayStore(ValueType::Object));
            local += value_type.slots();
        }
        builder.push(Instruction::Return(Some(ValueType::Object)));
        let code = builder.build(proto.param_slots());
        self.add_api_conversion_method(
            context,
            key,
            PARAMETERS_PREFIX,
            proto,
            code,
            SyntheticKind::ApiConversionParameters,
        )
    }
}

fn unbox_or_cast(builder: &mut CodeBuilder, ty: &TypeRef) {
    match ty {
        TypeRef::Primitive(base) => {
            let unbox = unbox_method(*base);
            builder
                .push(Instruction::CheckCast(unbox.holder.clone()))
                .invoke(Invoke::invoke_virtual(unbox));
        }
        _ => {
            builder.push(Instruction::CheckCast(ty.clone()));
        }
    }
}

fn boxed(base: BaseType) -> (&'static str, &'static str) {
    match base {
        BaseType::Boolean => ("java.lang.Boolean", "booleanValue"),
        BaseType::Byte => ("java.lang.Byte", "byteValue"),
        BaseType::Char => ("java.lang.Character", "charValue"),
        BaseType::Short => ("java.lang.Short", "shortValue"),
        BaseType::Int => ("java.lang.Integer", "intValue"),
        BaseType::Long => ("java.lang.Long", "longValue"),
        BaseType::Float => ("java.lang.Float", "floatValue"),
        BaseType::Double => ("java.lang.Double", "doubleValue"),
    }
}

/// `Box.valueOf(primitive)`.
pub fn box_method(base: BaseType) -> MethodRef {
    let (holder, _) = boxed(base);
    MethodRef::new(
        TypeRef::class(holder),
        "valueOf",
        Proto::new(vec![TypeRef::Primitive(base)], TypeRef::class(holder)),
    )
}

/// `box.xxxValue()`.
pub fn unbox_method(base: BaseType) -> MethodRef {
    let (holder, name) = boxed(base);
    MethodRef::new(
        TypeRef::class(holder),
        name,
        Proto::new(Vec::new(), TypeRef::Primitive(base)),
    )
}
