use desugar_ir::{ClassGraph, ClassName, TypeRef};

use crate::error::{SpecError, SpecValidationError, SpecWarning};
use crate::rewriter::{SpecificationTypeRewriter, TypeRewriter};
use crate::specification::MachineSpecification;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecDiagnostics {
    pub warnings: Vec<SpecWarning>,
    pub errors: Vec<SpecValidationError>,
}

impl SpecDiagnostics {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fails with every error at once; otherwise hands back the warnings.
    pub fn into_result(self) -> Result<Vec<SpecWarning>, SpecError> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(SpecError::Validation(self.errors))
        }
    }
}

impl MachineSpecification {
    /// Checks the specification against the library classes it describes.
    pub fn validate(&self, graph: &ClassGraph) -> SpecDiagnostics {
        let rewriter = SpecificationTypeRewriter::new(self);
        let mut out = SpecDiagnostics::default();
        validate_wrappers(self, graph, &rewriter, &mut out);
        validate_subwrappers(self, graph, &mut out);
        validate_custom_conversions(self, graph, &mut out);
        validate_generic_conversions(self, &mut out);
        for warning in &out.warnings {
            tracing::warn!(target: "desugar.spec", "{warning}");
        }
        out
    }
}

fn validate_wrappers(
    spec: &MachineSpecification,
    graph: &ClassGraph,
    rewriter: &SpecificationTypeRewriter,
    out: &mut SpecDiagnostics,
) {
    for name in &spec.wrappers {
        let ty = TypeRef::Class(name.clone());
        if spec.custom_conversions.contains_key(name) {
            out.warnings
                .push(SpecWarning::CustomConversionShadowsWrapper { ty: name.clone() });
        }
        if !rewriter.has_rewritten_type(&ty) {
            out.warnings.push(SpecWarning::NotRewritten {
                ty: name.clone(),
                section: "wrappers",
            });
        }
        let Some(class) = graph.class(name.as_str()) else {
            out.warnings.push(SpecWarning::MissingDefinition {
                ty: name.clone(),
                section: "wrappers",
            });
            continue;
        };
        if class.is_enum() {
            if let Some(desugared) = rewriter.rewritten_class(name) {
                check_enum_parity(graph, name, &desugared, out);
            }
        } else if class.is_final() {
            out.errors
                .push(SpecValidationError::FinalWrapperType { ty: name.clone() });
        }
    }
}

fn check_enum_parity(
    graph: &ClassGraph,
    name: &ClassName,
    desugared: &ClassName,
    out: &mut SpecDiagnostics,
) {
    let (Some(original), Some(counterpart)) =
        (graph.class(name.as_str()), graph.class(desugared.as_str()))
    else {
        return;
    };
    let names = |class: &desugar_ir::ClassDef| -> Vec<String> {
        class
            .enum_constants()
            .iter()
            .map(|field| field.field.name.to_string())
            .collect()
    };
    let expected = names(original);
    let found = names(counterpart);
    if expected != found {
        out.errors.push(SpecValidationError::EnumConstantMismatch {
            ty: name.clone(),
            desugared: desugared.clone(),
            expected,
            found,
        });
    }
}

fn validate_subwrappers(
    spec: &MachineSpecification,
    graph: &ClassGraph,
    out: &mut SpecDiagnostics,
) {
    for (ty, subwrappers) in &spec.subwrappers {
        for subwrapper in subwrappers {
            let reason = if !spec.wrappers.contains(ty) {
                Some("the wrapped type is not listed in `wrappers`")
            } else if !spec.wrappers.contains(subwrapper) {
                Some("it is not listed in `wrappers`")
            } else if subwrapper == ty
                || (graph.contains(ty.as_str())
                    && graph.contains(subwrapper.as_str())
                    && !graph.is_subtype(subwrapper, ty))
            {
                Some("it is not a proper subtype")
            } else {
                None
            };
            if let Some(reason) = reason {
                out.errors.push(SpecValidationError::InvalidSubwrapper {
                    ty: ty.clone(),
                    subwrapper: subwrapper.clone(),
                    reason,
                });
            }
        }
    }
}

fn validate_custom_conversions(
    spec: &MachineSpecification,
    graph: &ClassGraph,
    out: &mut SpecDiagnostics,
) {
    for holder in spec.custom_conversions.values() {
        if !graph.contains(holder.as_str()) {
            out.warnings.push(SpecWarning::MissingDefinition {
                ty: holder.clone(),
                section: "custom_conversions",
            });
        }
    }
}

fn validate_generic_conversions(spec: &MachineSpecification, out: &mut SpecDiagnostics) {
    for (method, conversions) in &spec.api_generic_conversion {
        let expected = method.arity() + 1;
        if conversions.len() != expected {
            out.errors.push(SpecValidationError::GenericConversionArity {
                method: method.clone(),
                expected,
                found: conversions.len(),
            });
        }
    }
}
