use desugar_ir::{
    AccessFlags, ClassDef, ClassOrigin, CmpOp, Code, CodeBuilder, Instruction, MethodDef, MethodRef,
    SyntheticKind, TypeRef, ValueType,
};

use crate::context::ConversionContext;
use crate::decision::{ConversionDirection, CONVERT};
use crate::error::ConversionError;

impl ConversionContext<'_> {
    /// Element-wise conversion of an array type, hosted by `Base$-AC`.
    pub(crate) fn ensure_array_conversion(
        &self,
        ty: &TypeRef,
        direction: ConversionDirection,
    ) -> Result<MethodRef, ConversionError> {
        let element = ty.element_type().ok_or_else(|| {
            ConversionError::inconsistency(format!("`{ty}` is not an array type"))
        })?;
        let element_conversion = self.ensure_conversion_method(element, direction, None)?;
        let holder = self.synthetic_class_name(ty, SyntheticKind::ArrayConversion.class_suffix())?;
        let method = MethodRef::new(TypeRef::Class(holder.clone()), CONVERT, direction.proto(ty));

        let _synthesis = self.synthetics.lock_synthesis();
        let handle = self.synthetics.get_or_create_class(&holder, || {
            ClassDef::new(
                holder.as_str(),
                ClassOrigin::Program,
                AccessFlags::public_final_synthetic(),
            )
            .with_synthetic(SyntheticKind::ArrayConversion)
        });
        if !self.synthetics.has_method(handle, &method.name, &method.proto) {
            tracing::debug!(target: "desugar.apiconv", %ty, ?direction, "synthesizing array conversion");
            let destination_element = direction.destination(element);
            self.synthetics.add_method(
                handle,
                MethodDef::new(method.clone(), AccessFlags::public_static_synthetic())
                    .with_code(array_conversion_code(&destination_element, &element_conversion))
                    .with_synthetic(SyntheticKind::ArrayConversion),
            );
        }
        Ok(method)
    }
}

/// ```text
/// if (src == null) return null;
/// int length = src.length;
/// Dst[] dst = new Dst[length];
/// for (int i = 0; i < length; i++) dst[i] = convert(src[i]);
/// return dst;
/// ```
fn array_conversion_code(destination_element: &TypeRef, element_conversion: &MethodRef) -> Code {
    const SOURCE: u16 = 0;
    const LENGTH: u16 = 1;
    const DESTINATION: u16 = 2;
    const INDEX: u16 = 3;

    let mut builder = CodeBuilder::new();
    let non_null = builder.new_label();
    let head = builder.new_label();
    let done = builder.new_label();
    builder
        .load(ValueType::Object, SOURCE)
        .push(Instruction::IfNonNull(non_null))
        .push(Instruction::ConstNull)
        .push(Instruction::Return(Some(ValueType::Object)))
        .bind(non_null)
        .load(ValueType::Object, SOURCE)
        .push(Instruction::ArrayLength)
        .push(Instruction::Store(ValueType::Int, LENGTH))
        .load(ValueType::Int, LENGTH)
        .push(Instruction::NewArray(destination_element.clone()))
        .push(Instruction::Store(ValueType::Object, DESTINATION))
        .push(Instruction::ConstInt(0))
        .push(Instruction::Store(ValueType::Int, INDEX))
        .bind(head)
        .load(ValueType::Int, INDEX)
        .load(ValueType::Int, LENGTH)
        .push(Instruction::IfIntCmp(CmpOp::Ge, done))
        .load(ValueType::Object, DESTINATION)
        .load(ValueType::Int, INDEX)
        .load(ValueType::Object, SOURCE)
        .load(ValueType::Int, INDEX)
        .push(Instruction::ArrayLoad(ValueType::Object))
        .invoke_static(element_conversion.clone())
        .push(Instruction::ArrayStore(ValueType::Object))
        .load(ValueType::Int, INDEX)
        .push(Instruction::ConstInt(1))
        .push(Instruction::IntAdd)
        .push(Instruction::Store(ValueType::Int, INDEX))
        .push(Instruction::Goto(head))
        .bind(done)
        .load(ValueType::Object, DESTINATION)
        .push(Instruction::Return(Some(ValueType::Object)));
    builder.build(1)
}
