//! Wrapper classes adapting a library type between its two worlds.
//!
//! For a wrapper-eligible type `T` two classes are synthesized, named after
//! the desugared type:
//!
//! * `T$-WRP` holds a `T` and implements `vivified(T)`, so code of the
//!   original runtime can call into a desugared instance;
//! * `T$-V-WRP` holds a `vivified(T)` and implements `T`, so program code can
//!   use an instance created by the original runtime.
//!
//! Each class has one `wrappedValue` field, a private constructor and a static
//! `convert` factory. `convert` returns null for null and unwraps an instance
//! of the sibling wrapper instead of wrapping it a second time. An instance
//! of a subwrapped type (a subtype with wrappers of its own) is handed to that
//! type's `convert` so it keeps its identity across the boundary.
//!
//! Construction runs in two phases. The shells (field, constructor, `convert`)
//! of both classes are registered and memoized first, then the forwarding
//! methods are generated. A forwarding method that needs a conversion for `T`
//! itself finds the memoized shells instead of recursing.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use desugar_ir::{
    AccessFlags, ClassDef, ClassName, ClassOrigin, CmpOp, Code, CodeBuilder, FieldDef, FieldRef,
    Instruction, Invoke, MethodDef, MethodRef, Proto, SyntheticKind, TypeRef, ValueType,
    INSTANCE_INITIALIZER,
};

use crate::context::ConversionContext;
use crate::decision::{ConversionDirection, SignatureConversions, CONVERT};
use crate::error::ConversionError;
use crate::synthetic_items::ClassHandle;

pub(crate) const WRAPPED_VALUE: &str = "wrappedValue";

/// The two `convert` factories of a wrapper pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperConversions {
    /// `T -> vivified(T)`, hosted by `T$-WRP`.
    pub conversion: MethodRef,
    /// `vivified(T) -> T`, hosted by `T$-V-WRP`.
    pub vivified_conversion: MethodRef,
}

/// A virtual method of a wrapped type that wrappers forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WrappedMethod {
    pub(crate) method: MethodRef,
    pub(crate) holder_is_interface: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WrapperKind {
    Wrapper,
    VivifiedWrapper,
}

impl WrapperKind {
    fn synthetic_kind(self) -> SyntheticKind {
        match self {
            WrapperKind::Wrapper => SyntheticKind::Wrapper,
            WrapperKind::VivifiedWrapper => SyntheticKind::VivifiedWrapper,
        }
    }

    /// The type the wrapper implements or extends.
    fn wrapping_type(self, ty: &TypeRef) -> TypeRef {
        match self {
            WrapperKind::Wrapper => ty.vivified(),
            WrapperKind::VivifiedWrapper => ty.clone(),
        }
    }

    /// The type of the wrapped value.
    fn wrapped_type(self, ty: &TypeRef) -> TypeRef {
        self.sibling().wrapping_type(ty)
    }

    fn sibling(self) -> Self {
        match self {
            WrapperKind::Wrapper => WrapperKind::VivifiedWrapper,
            WrapperKind::VivifiedWrapper => WrapperKind::Wrapper,
        }
    }

    /// Direction in which forwarded parameters are converted.
    fn params_direction(self) -> ConversionDirection {
        match self {
            WrapperKind::Wrapper => ConversionDirection::FromVivified,
            WrapperKind::VivifiedWrapper => ConversionDirection::ToVivified,
        }
    }
}

/// Names and handle of one half of a wrapper pair.
struct WrapperShell {
    kind: WrapperKind,
    name: ClassName,
    handle: ClassHandle,
    field: FieldRef,
}

impl ConversionContext<'_> {
    /// The wrapper pair of `ty`, synthesized on first request.
    pub fn ensure_wrappers(&self, ty: &TypeRef) -> Result<WrapperConversions, ConversionError> {
        let TypeRef::Class(name) = ty else {
            return Err(ConversionError::inconsistency(format!(
                "cannot generate a wrapper for `{ty}`"
            )));
        };
        if let Some(conversions) = self.memo.wrappers.lock().get(name) {
            return Ok(conversions.clone());
        }

        let _synthesis = self.synthetics.lock_synthesis();
        if let Some(conversions) = self.memo.wrappers.lock().get(name) {
            return Ok(conversions.clone());
        }
        if !self.spec.is_wrapper(ty) {
            return Err(ConversionError::inconsistency(format!(
                "`{ty}` is not eligible for wrapper conversion"
            )));
        }
        let class = self
            .graph
            .definition_for(ty)
            .ok_or_else(|| ConversionError::MissingDefinition(ty.clone()))?;
        if class.is_final() {
            return Err(ConversionError::inconsistency(format!(
                "cannot generate a wrapper for final type `{ty}`"
            )));
        }

        // Forwarding methods of a subwrapper may build the wrappers of `ty`
        // through a nested call, hence the second memo lookup below.
        let mut subwrappers = Vec::new();
        for subwrapper in self.spec.subwrappers(name) {
            if subwrapper == name || !self.graph.is_subtype(subwrapper, name) {
                return Err(ConversionError::inconsistency(format!(
                    "subwrapper `{subwrapper}` of `{ty}` is not a proper subtype"
                )));
            }
            let sub_ty = TypeRef::Class(subwrapper.clone());
            let conversions = self.ensure_wrappers(&sub_ty)?;
            subwrappers.push((sub_ty, conversions));
        }
        if let Some(conversions) = self.memo.wrappers.lock().get(name) {
            return Ok(conversions.clone());
        }
        tracing::debug!(
            target: "desugar.apiconv",
            %ty,
            subwrappers = subwrappers.len(),
            "synthesizing wrappers"
        );

        let wrapper_name = self.synthetic_class_name(ty, SyntheticKind::Wrapper.class_suffix())?;
        let vivified_name =
            self.synthetic_class_name(ty, SyntheticKind::VivifiedWrapper.class_suffix())?;
        let wrapper = self.begin_wrapper(
            WrapperKind::Wrapper,
            ty,
            class,
            (&wrapper_name, &vivified_name),
            &subwrappers,
        )?;
        let vivified = self.begin_wrapper(
            WrapperKind::VivifiedWrapper,
            ty,
            class,
            (&vivified_name, &wrapper_name),
            &subwrappers,
        )?;
        let conversions = WrapperConversions {
            conversion: convert_method(&wrapper_name, ty, WrapperKind::Wrapper),
            vivified_conversion: convert_method(&vivified_name, ty, WrapperKind::VivifiedWrapper),
        };
        self.memo
            .wrappers
            .lock()
            .insert(name.clone(), conversions.clone());

        let methods = self.wrapped_methods(class);
        for shell in [&wrapper, &vivified] {
            for wrapped in methods.iter() {
                let forwarding = self.forwarding_method(shell, wrapped)?;
                self.synthetics.add_method(shell.handle, forwarding);
            }
            self.synthetics.add_method(shell.handle, equals_method(shell));
            self.synthetics.add_method(shell.handle, hash_code_method(shell));
            self.synthetics.complete(shell.handle);
        }
        Ok(conversions)
    }

    /// Phase one: class, field, constructor and `convert`.
    fn begin_wrapper(
        &self,
        kind: WrapperKind,
        ty: &TypeRef,
        library_class: &ClassDef,
        (name, sibling): (&ClassName, &ClassName),
        subwrappers: &[(TypeRef, WrapperConversions)],
    ) -> Result<WrapperShell, ConversionError> {
        let this = TypeRef::Class(name.clone());
        let wrapping = kind.wrapping_type(ty);
        let wrapped = kind.wrapped_type(ty);

        let mut class = ClassDef::new(
            name.as_str(),
            ClassOrigin::Program,
            AccessFlags::public_final_synthetic(),
        )
        .with_synthetic(kind.synthetic_kind());
        let super_type = if library_class.is_interface() {
            class.interfaces.push(wrapping);
            TypeRef::object()
        } else {
            wrapping
        };
        class.super_class = Some(super_type.clone());

        let field = FieldRef::new(this.clone(), WRAPPED_VALUE, wrapped.clone());
        class.fields.push(FieldDef::new(
            field.clone(),
            AccessFlags::public_final_synthetic(),
        ));

        let constructor = MethodRef::new(
            this.clone(),
            INSTANCE_INITIALIZER,
            Proto::new(vec![wrapped.clone()], TypeRef::Void),
        );
        let mut builder = CodeBuilder::new();
        builder
            .load(ValueType::Object, 0)
            .invoke(Invoke::invoke_special(MethodRef::new(
                super_type,
                INSTANCE_INITIALIZER,
                Proto::new(Vec::new(), TypeRef::Void),
            )))
            .load(ValueType::Object, 0)
            .load(ValueType::Object, 1)
            .push(Instruction::PutField(field.clone()))
            .return_value(&TypeRef::Void);
        class.methods.push(
            MethodDef::new(constructor.clone(), AccessFlags::private_synthetic())
                .with_code(builder.build(2))
                .with_synthetic(kind.synthetic_kind()),
        );

        let sibling_field = FieldRef::new(
            TypeRef::Class(sibling.clone()),
            WRAPPED_VALUE,
            kind.wrapping_type(ty),
        );
        let convert = convert_method(name, ty, kind);
        let dispatch: Vec<(TypeRef, MethodRef)> = subwrappers
            .iter()
            .map(|(sub_ty, conversions)| match kind {
                WrapperKind::Wrapper => (sub_ty.clone(), conversions.conversion.clone()),
                WrapperKind::VivifiedWrapper => {
                    (sub_ty.vivified(), conversions.vivified_conversion.clone())
                }
            })
            .collect();
        let code = wrapper_convert_code(&this, &constructor, sibling, &sibling_field, &dispatch);
        class.methods.push(
            MethodDef::new(convert, AccessFlags::public_static_synthetic())
                .with_code(code)
                .with_synthetic(kind.synthetic_kind()),
        );

        let handle = self.synthetics.begin_class(class).ok_or_else(|| {
            ConversionError::inconsistency(format!("wrapper `{name}` synthesized twice"))
        })?;
        Ok(WrapperShell {
            kind,
            name: name.clone(),
            handle,
            field,
        })
    }

    /// Distinct non-final virtual methods of `class` and its supertypes,
    /// breadth first: the class, its interfaces, then its superclass.
    pub(crate) fn wrapped_methods(&self, class: &ClassDef) -> Arc<[WrappedMethod]> {
        if let Some(methods) = self.memo.wrapper_methods.lock().get(&class.name) {
            return methods.clone();
        }
        let methods: Arc<[WrappedMethod]> = self.collect_wrapped_methods(class).into();
        self.memo
            .wrapper_methods
            .lock()
            .entry(class.name.clone())
            .or_insert(methods)
            .clone()
    }

    fn collect_wrapped_methods(&self, class: &ClassDef) -> Vec<WrappedMethod> {
        let mut queue: VecDeque<&ClassDef> = VecDeque::from([class]);
        let mut visited: HashSet<&str> = HashSet::new();
        let mut seen: HashSet<(&str, &Proto)> = HashSet::new();
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            if current.ty().is_object() || !visited.insert(current.name.as_str()) {
                continue;
            }
            for method in current.virtual_methods() {
                if is_excluded_from_wrapping(method) {
                    continue;
                }
                // A final method still hides the signature further up.
                if !seen.insert((method.name(), method.proto())) || method.is_final() {
                    continue;
                }
                out.push(WrappedMethod {
                    method: method.method.with_holder(current.ty()),
                    holder_is_interface: current.is_interface(),
                });
            }
            queue.extend(
                current
                    .interfaces
                    .iter()
                    .chain(current.super_class.iter())
                    .filter_map(|ty| self.graph.definition_for(ty)),
            );
        }
        out
    }

    /// Phase two: one method of `shell` forwarding to the wrapped value.
    fn forwarding_method(
        &self,
        shell: &WrapperShell,
        wrapped: &WrappedMethod,
    ) -> Result<MethodDef, ConversionError> {
        let method = &wrapped.method;
        let is_final = self
            .graph
            .definition_for(&method.holder)
            .and_then(|holder| holder.lookup_method(&method.name, &method.proto))
            .is_some_and(|definition| definition.is_final());
        if is_final {
            return Err(ConversionError::inconsistency(format!(
                "final method `{method}` cannot be forwarded by a wrapper"
            )));
        }

        let this = TypeRef::Class(shell.name.clone());
        let params_direction = shell.kind.params_direction();
        let conversions = self.signature_conversions(method, params_direction)?;
        let (installed, forward) = match shell.kind {
            WrapperKind::Wrapper => (
                conversions.converted_method(method, params_direction, this),
                method.clone(),
            ),
            WrapperKind::VivifiedWrapper => {
                let holder = if self.rewriter.has_rewritten_type(&method.holder) {
                    method.holder.vivified()
                } else {
                    method.holder.clone()
                };
                (
                    method.with_holder(this),
                    conversions.converted_method(method, params_direction, holder),
                )
            }
        };
        let invoke = if wrapped.holder_is_interface {
            Invoke::invoke_interface(forward)
        } else {
            Invoke::invoke_virtual(forward)
        };

        let mut builder = CodeBuilder::new();
        builder
            .load(ValueType::Object, 0)
            .push(Instruction::GetField(shell.field.clone()));
        emit_forwarding_call(&mut builder, &installed.proto, &conversions, invoke, 1);
        let code = builder.build(1 + installed.proto.param_slots());
        Ok(MethodDef::new(installed, AccessFlags::public_synthetic())
            .with_code(code)
            .with_synthetic(shell.kind.synthetic_kind()))
    }
}

/// Loads the parameters of `proto` starting at local `first`, converting
/// those with a conversion, then invokes, converts the result and returns.
pub(crate) fn emit_forwarding_call(
    builder: &mut CodeBuilder,
    proto: &Proto,
    conversions: &SignatureConversions,
    invoke: Invoke,
    first: u16,
) {
    let mut local = first;
    for (param, conversion) in proto.params.iter().zip(&conversions.params) {
        if let Some(ty) = param.value_type() {
            builder.load(ty, local);
            local += ty.slots();
        }
        if let Some(conversion) = conversion {
            builder.invoke_static(conversion.clone());
        }
    }
    builder.invoke(invoke);
    if let Some(conversion) = &conversions.ret {
        builder.invoke_static(conversion.clone());
    }
    builder.return_value(&proto.ret);
}

fn convert_method(holder: &ClassName, ty: &TypeRef, kind: WrapperKind) -> MethodRef {
    MethodRef::new(
        TypeRef::Class(holder.clone()),
        CONVERT,
        Proto::new(vec![kind.wrapped_type(ty)], kind.wrapping_type(ty)),
    )
}

/// `null -> null`, sibling wrapper -> its wrapped value, instance of a
/// subwrapped type -> that type's `convert`, anything else -> a new wrapper.
fn wrapper_convert_code(
    this: &TypeRef,
    constructor: &MethodRef,
    sibling: &ClassName,
    sibling_field: &FieldRef,
    subwrappers: &[(TypeRef, MethodRef)],
) -> Code {
    let sibling = TypeRef::Class(sibling.clone());
    let mut builder = CodeBuilder::new();
    let non_null = builder.new_label();
    let not_sibling = builder.new_label();
    builder
        .load(ValueType::Object, 0)
        .push(Instruction::IfNonNull(non_null))
        .push(Instruction::ConstNull)
        .push(Instruction::Return(Some(ValueType::Object)))
        .bind(non_null)
        .load(ValueType::Object, 0)
        .push(Instruction::InstanceOf(sibling.clone()))
        .push(Instruction::IfInt(CmpOp::Eq, not_sibling))
        .load(ValueType::Object, 0)
        .push(Instruction::CheckCast(sibling))
        .push(Instruction::GetField(sibling_field.clone()))
        .push(Instruction::Return(Some(ValueType::Object)))
        .bind(not_sibling);
    for (subtype, convert) in subwrappers {
        let next = builder.new_label();
        builder
            .load(ValueType::Object, 0)
            .push(Instruction::InstanceOf(subtype.clone()))
            .push(Instruction::IfInt(CmpOp::Eq, next))
            .load(ValueType::Object, 0)
            .push(Instruction::CheckCast(subtype.clone()))
            .invoke_static(convert.clone())
            .push(Instruction::Return(Some(ValueType::Object)))
            .bind(next);
    }
    builder
        .push(Instruction::New(this.clone()))
        .push(Instruction::Dup)
        .load(ValueType::Object, 0)
        .invoke(Invoke::invoke_special(constructor.clone()))
        .push(Instruction::Return(Some(ValueType::Object)));
    builder.build(1)
}

/// Unwraps an argument of the same wrapper class, then delegates to the
/// wrapped value's `equals`.
fn equals_method(shell: &WrapperShell) -> MethodDef {
    let this = TypeRef::Class(shell.name.clone());
    let object_equals = MethodRef::new(
        TypeRef::object(),
        "equals",
        Proto::new(vec![TypeRef::object()], TypeRef::BOOLEAN),
    );
    let mut builder = CodeBuilder::new();
    let compare = builder.new_label();
    builder
        .load(ValueType::Object, 1)
        .push(Instruction::InstanceOf(this.clone()))
        .push(Instruction::IfInt(CmpOp::Eq, compare))
        .load(ValueType::Object, 1)
        .push(Instruction::CheckCast(this.clone()))
        .push(Instruction::GetField(shell.field.clone()))
        .push(Instruction::Store(ValueType::Object, 1))
        .bind(compare)
        .load(ValueType::Object, 0)
        .push(Instruction::GetField(shell.field.clone()))
        .load(ValueType::Object, 1)
        .invoke(Invoke::invoke_virtual(object_equals.clone()))
        .return_value(&TypeRef::BOOLEAN);
    MethodDef::new(object_equals.with_holder(this), AccessFlags::public_synthetic())
        .with_code(builder.build(2))
        .with_synthetic(shell.kind.synthetic_kind())
}

fn hash_code_method(shell: &WrapperShell) -> MethodDef {
    let this = TypeRef::Class(shell.name.clone());
    let object_hash_code = MethodRef::new(
        TypeRef::object(),
        "hashCode",
        Proto::new(Vec::new(), TypeRef::INT),
    );
    let mut builder = CodeBuilder::new();
    builder
        .load(ValueType::Object, 0)
        .push(Instruction::GetField(shell.field.clone()))
        .invoke(Invoke::invoke_virtual(object_hash_code.clone()))
        .return_value(&TypeRef::INT);
    MethodDef::new(object_hash_code.with_holder(this), AccessFlags::public_synthetic())
        .with_code(builder.build(1))
        .with_synthetic(shell.kind.synthetic_kind())
}

/// Bridges, lambda bodies and the `Object` methods wrappers define themselves.
fn is_excluded_from_wrapping(method: &MethodDef) -> bool {
    let name = method.name();
    let proto = method.proto();
    method.access.is_bridge()
        || name.starts_with("lambda$")
        || (name == "equals" && proto.params == [TypeRef::object()] && proto.ret == TypeRef::BOOLEAN)
        || (name == "hashCode" && proto.params.is_empty() && proto.ret == TypeRef::INT)
}
