//! Whether a value crossing the desugared/vivified boundary needs a
//! conversion, and which method performs it.

use desugar_ir::{MethodRef, Proto, TypeRef};

use crate::context::ConversionContext;
use crate::error::ConversionError;
use crate::reporter::{Diagnostic, Severity};

pub(crate) const CONVERT: &str = "convert";

/// Direction of a conversion for a type `T` as written in program code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConversionDirection {
    /// `T -> vivified(T)`.
    ToVivified,
    /// `vivified(T) -> T`.
    FromVivified,
}

impl ConversionDirection {
    pub fn source(self, ty: &TypeRef) -> TypeRef {
        match self {
            ConversionDirection::ToVivified => ty.clone(),
            ConversionDirection::FromVivified => ty.vivified(),
        }
    }

    pub fn destination(self, ty: &TypeRef) -> TypeRef {
        self.opposite().source(ty)
    }

    pub fn opposite(self) -> Self {
        match self {
            ConversionDirection::ToVivified => ConversionDirection::FromVivified,
            ConversionDirection::FromVivified => ConversionDirection::ToVivified,
        }
    }

    /// Proto of a conversion method for `ty` in this direction.
    pub fn proto(self, ty: &TypeRef) -> Proto {
        Proto::new(vec![self.source(ty)], self.destination(ty))
    }
}

/// Per-position conversions of one method signature. `None` leaves the
/// position untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SignatureConversions {
    pub(crate) params: Vec<Option<MethodRef>>,
    pub(crate) ret: Option<MethodRef>,
}

impl SignatureConversions {
    pub(crate) fn is_empty(&self) -> bool {
        self.ret.is_none() && self.params.iter().all(Option::is_none)
    }

    /// `method` as seen on the other side of the conversions. Parameters take
    /// the output type of their conversion when `params_direction` converts
    /// towards vivified, the input type otherwise; the return type the reverse.
    pub(crate) fn converted_method(
        &self,
        method: &MethodRef,
        params_direction: ConversionDirection,
        holder: TypeRef,
    ) -> MethodRef {
        let to_vivified = params_direction == ConversionDirection::ToVivified;
        let params = method
            .proto
            .params
            .iter()
            .zip(&self.params)
            .map(|(param, conversion)| match conversion {
                Some(conversion) if to_vivified => conversion.proto.ret.clone(),
                Some(conversion) => conversion_input(conversion),
                None => param.clone(),
            })
            .collect();
        let ret = match &self.ret {
            Some(conversion) if to_vivified => conversion_input(conversion),
            Some(conversion) => conversion.proto.ret.clone(),
            None => method.proto.ret.clone(),
        };
        MethodRef::new(holder, &method.name, Proto::new(params, ret))
    }
}

/// Parameter type of a unary conversion method.
pub(crate) fn conversion_input(conversion: &MethodRef) -> TypeRef {
    conversion
        .proto
        .params
        .first()
        .cloned()
        .unwrap_or_else(TypeRef::object)
}

impl ConversionContext<'_> {
    /// Whether a value of type `ty` in the signature of `invoked` has to be
    /// converted. An unconvertible rewritten type is fatal when compiling the
    /// desugared library and reported as info otherwise.
    pub fn should_convert(
        &self,
        ty: &TypeRef,
        generic: Option<&MethodRef>,
        invoked: &MethodRef,
    ) -> Result<bool, ConversionError> {
        if generic.is_some() {
            return Ok(true);
        }
        let base = ty.base_type();
        let Some(desugared) = self.rewriter.rewritten_type(base) else {
            return Ok(false);
        };
        if self.spec.custom_conversion(base).is_some() || self.spec.is_wrapper(base) {
            return Ok(true);
        }
        let message = format!(
            "Invoke to {}#{} may not work correctly at runtime (No conversion registered for type {desugared}).",
            invoked.holder, invoked.name
        );
        if self.options.is_desugared_library_compilation() {
            let error = ConversionError::UnconvertibleType {
                ty: base.clone(),
                context: invoked.clone(),
                message,
            };
            return Err(self.reporter.fatal_error(error, Some(invoked.clone())));
        }
        self.reporter.info(
            Diagnostic::new(Severity::Info, message)
                .with_origin(invoked.holder.clone())
                .with_position(invoked.clone()),
        );
        Ok(false)
    }

    /// The method converting a value of `ty` in `direction`, synthesizing it
    /// on first request. Repeated requests return the same reference.
    pub fn ensure_conversion_method(
        &self,
        ty: &TypeRef,
        direction: ConversionDirection,
        generic: Option<&MethodRef>,
    ) -> Result<MethodRef, ConversionError> {
        if let Some(generic) = generic {
            return Ok(generic.clone());
        }
        let key = (ty.clone(), direction);
        if let Some(method) = self.memo.conversions.lock().get(&key) {
            return Ok(method.clone());
        }
        let method = self.compute_conversion_method(ty, direction)?;
        let method = self
            .memo
            .conversions
            .lock()
            .entry(key)
            .or_insert(method)
            .clone();
        Ok(method)
    }

    fn compute_conversion_method(
        &self,
        ty: &TypeRef,
        direction: ConversionDirection,
    ) -> Result<MethodRef, ConversionError> {
        if ty.is_array() {
            return self.ensure_array_conversion(ty, direction);
        }
        if let Some(holder) = self.spec.custom_conversion(ty) {
            return Ok(MethodRef::new(
                TypeRef::Class(holder.clone()),
                CONVERT,
                direction.proto(ty),
            ));
        }
        let class = self
            .graph
            .definition_for(ty)
            .ok_or_else(|| ConversionError::MissingDefinition(ty.clone()))?;
        if class.is_enum() {
            return self.ensure_enum_conversion(class, direction);
        }
        let wrappers = self.ensure_wrappers(ty)?;
        Ok(match direction {
            ConversionDirection::ToVivified => wrappers.conversion,
            ConversionDirection::FromVivified => wrappers.vivified_conversion,
        })
    }

    /// Conversions for the parameters of `method` in `params_direction` and for
    /// its return value in the opposite direction.
    pub(crate) fn signature_conversions(
        &self,
        method: &MethodRef,
        params_direction: ConversionDirection,
    ) -> Result<SignatureConversions, ConversionError> {
        let generic = self.spec.generic_conversions(method);
        let generic_at = |index: usize| generic.and_then(|all| all.get(index)).and_then(Option::as_ref);
        let mut params = Vec::with_capacity(method.arity());
        for (index, param) in method.proto.params.iter().enumerate() {
            let override_method = generic_at(index);
            params.push(if self.should_convert(param, override_method, method)? {
                Some(self.ensure_conversion_method(param, params_direction, override_method)?)
            } else {
                None
            });
        }
        let override_method = generic_at(method.arity());
        let ret = if self.should_convert(&method.proto.ret, override_method, method)? {
            Some(self.ensure_conversion_method(
                &method.proto.ret,
                params_direction.opposite(),
                override_method,
            )?)
        } else {
            None
        };
        Ok(SignatureConversions { params, ret })
    }
}
