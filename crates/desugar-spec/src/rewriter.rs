use std::collections::{BTreeMap, BTreeSet};

use desugar_ir::{ClassName, Proto, TypeRef};

use crate::specification::MachineSpecification;

/// Maps library types to their desugared counterparts.
pub trait TypeRewriter: Send + Sync {
    /// Desugared counterpart of `ty`. Vivified types have none.
    fn rewritten_type(&self, ty: &TypeRef) -> Option<TypeRef>;

    fn has_rewritten_type(&self, ty: &TypeRef) -> bool {
        self.rewritten_type(ty).is_some()
    }

    fn has_rewritten_type_in_signature(&self, proto: &Proto) -> bool {
        proto.types().any(|ty| self.has_rewritten_type(ty))
    }

    /// The type `ty` denotes in emitted code: vivified types become the
    /// original type, rewritten types their desugared counterpart.
    fn rewrite(&self, ty: &TypeRef) -> TypeRef {
        if ty.mentions_vivified() {
            return ty.unvivified();
        }
        self.rewritten_type(ty).unwrap_or_else(|| ty.clone())
    }
}

/// Rewriter driven by the `rewrite_type`, `rewrite_prefix` and
/// `maintain_type` sections of a specification.
#[derive(Debug, Clone, Default)]
pub struct SpecificationTypeRewriter {
    rewrite_type: BTreeMap<ClassName, ClassName>,
    /// Longest prefix first.
    rewrite_prefix: Vec<(String, String)>,
    maintain_type: BTreeSet<ClassName>,
}

impl SpecificationTypeRewriter {
    pub fn new(spec: &MachineSpecification) -> Self {
        let mut rewrite_prefix: Vec<(String, String)> = spec
            .rewrite_prefix
            .iter()
            .map(|(prefix, rewritten)| (prefix.clone(), rewritten.clone()))
            .collect();
        rewrite_prefix.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self {
            rewrite_type: spec.rewrite_type.clone(),
            rewrite_prefix,
            maintain_type: spec.maintain_type.clone(),
        }
    }

    pub fn rewritten_class(&self, name: &ClassName) -> Option<ClassName> {
        if self.maintain_type.contains(name) {
            return None;
        }
        if let Some(rewritten) = self.rewrite_type.get(name) {
            return Some(rewritten.clone());
        }
        self.rewrite_prefix
            .iter()
            .find(|(prefix, _)| name.as_str().starts_with(prefix.as_str()))
            .map(|(prefix, rewritten)| {
                ClassName::new(&format!("{rewritten}{}", &name.as_str()[prefix.len()..]))
            })
    }
}

impl TypeRewriter for SpecificationTypeRewriter {
    fn rewritten_type(&self, ty: &TypeRef) -> Option<TypeRef> {
        match ty {
            TypeRef::Class(name) => self.rewritten_class(name).map(TypeRef::Class),
            TypeRef::Array(component) => self.rewritten_type(component).map(TypeRef::array_of),
            TypeRef::Vivified(_) | TypeRef::Void | TypeRef::Primitive(_) => None,
        }
    }
}
