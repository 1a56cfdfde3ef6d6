//! Conversions for enum types, which cannot be wrapped.
//!
//! `T$-EC` holds two static `convert` methods mapping each constant of one
//! world to the constant with the same name (and position) in the other.

use desugar_ir::{
    AccessFlags, ClassDef, ClassOrigin, CmpOp, Code, CodeBuilder, FieldRef, Instruction, MethodDef,
    MethodRef, SyntheticKind, TypeRef, ValueType,
};

use crate::context::ConversionContext;
use crate::decision::{ConversionDirection, CONVERT};
use crate::error::ConversionError;

impl ConversionContext<'_> {
    pub(crate) fn ensure_enum_conversion(
        &self,
        class: &ClassDef,
        direction: ConversionDirection,
    ) -> Result<MethodRef, ConversionError> {
        let ty = class.ty();
        let holder = self.synthetic_class_name(&ty, SyntheticKind::EnumConversion.class_suffix())?;
        let method = MethodRef::new(TypeRef::Class(holder.clone()), CONVERT, direction.proto(&ty));
        let constants = self.aligned_enum_constants(class)?;

        let _synthesis = self.synthetics.lock_synthesis();
        let handle = self.synthetics.get_or_create_class(&holder, || {
            ClassDef::new(
                holder.as_str(),
                ClassOrigin::Program,
                AccessFlags::public_final_synthetic(),
            )
            .with_synthetic(SyntheticKind::EnumConversion)
        });
        if self.synthetics.has_method(handle, &method.name, &method.proto) {
            return Ok(method);
        }
        tracing::debug!(target: "desugar.apiconv", %ty, ?direction, "synthesizing enum conversion");
        let code = enum_conversion_code(
            &direction.source(&ty),
            &direction.destination(&ty),
            &constants,
        );
        self.synthetics.add_method(
            handle,
            MethodDef::new(method.clone(), AccessFlags::public_static_synthetic())
                .with_code(code)
                .with_synthetic(SyntheticKind::EnumConversion),
        );
        Ok(method)
    }

    /// Constant names of `class`. Its desugared counterpart must declare the
    /// same constants in the same order.
    fn aligned_enum_constants<'c>(
        &self,
        class: &'c ClassDef,
    ) -> Result<Vec<&'c str>, ConversionError> {
        let ty = class.ty();
        let desugared = self.rewriter.rewritten_type(&ty).ok_or_else(|| {
            ConversionError::inconsistency(format!("enum `{ty}` is not rewritten"))
        })?;
        let counterpart = self
            .graph
            .definition_for(&desugared)
            .ok_or_else(|| ConversionError::MissingDefinition(desugared.clone()))?;
        let constants: Vec<&str> = class
            .enum_constants()
            .iter()
            .map(|field| &*field.field.name)
            .collect();
        let found: Vec<&str> = counterpart
            .enum_constants()
            .iter()
            .map(|field| &*field.field.name)
            .collect();
        if constants != found {
            return Err(ConversionError::inconsistency(format!(
                "enum `{ty}` declares constants {constants:?} but `{desugared}` declares {found:?}"
            )));
        }
        Ok(constants)
    }
}

/// Compares the argument against every constant but the last; the last one
/// is returned without a comparison.
fn enum_conversion_code(source: &TypeRef, destination: &TypeRef, constants: &[&str]) -> Code {
    let mut builder = CodeBuilder::new();
    let non_null = builder.new_label();
    builder
        .load(ValueType::Object, 0)
        .push(Instruction::IfNonNull(non_null))
        .push(Instruction::ConstNull)
        .push(Instruction::Return(Some(ValueType::Object)))
        .bind(non_null);
    let Some((last, rest)) = constants.split_last() else {
        builder
            .push(Instruction::ConstNull)
            .push(Instruction::Return(Some(ValueType::Object)));
        return builder.build(1);
    };
    for constant in rest {
        let next = builder.new_label();
        builder
            .load(ValueType::Object, 0)
            .push(Instruction::GetStatic(FieldRef::new(
                source.clone(),
                constant,
                source.clone(),
            )))
            .push(Instruction::IfRefCmp(CmpOp::Ne, next))
            .push(Instruction::GetStatic(FieldRef::new(
                destination.clone(),
                constant,
                destination.clone(),
            )))
            .push(Instruction::Return(Some(ValueType::Object)))
            .bind(next);
    }
    builder
        .push(Instruction::GetStatic(FieldRef::new(
            destination.clone(),
            last,
            destination.clone(),
        )))
        .push(Instruction::Return(Some(ValueType::Object)));
    builder.build(1)
}
