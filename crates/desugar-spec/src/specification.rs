use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use desugar_ir::{ClassName, MethodRef, TypeRef};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::SpecError;

/// Pre-resolved description of the desugared library, as consumed by the
/// API conversion pass.
///
/// Method references are written as `holder#name(descriptor)`:
///
/// ```json
/// {
///   "rewrite_prefix": { "java.util.function.": "j$.util.function." },
///   "wrappers": ["java.util.function.Function", "java.util.function.UnaryOperator"],
///   "subwrappers": { "java.util.function.Function": ["java.util.function.UnaryOperator"] },
///   "never_outline_api": ["java.util.Collection#stream()Ljava/util/stream/Stream;"]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSpecification {
    /// Package prefixes relocated as a whole, e.g. `java.time.` -> `j$.time.`.
    pub rewrite_prefix: BTreeMap<String, String>,
    /// Individually relocated types. Takes precedence over prefixes.
    pub rewrite_type: BTreeMap<ClassName, ClassName>,
    /// Types kept under their original name even when a prefix matches.
    pub maintain_type: BTreeSet<ClassName>,
    /// Types converted through generated wrapper classes (or enum conversions
    /// when the type is an enum).
    pub wrappers: IndexSet<ClassName>,
    /// Wrapper type -> wrapper types of some of its subtypes. Converting an
    /// instance of one of those subtypes uses the subtype's wrapper, first
    /// match wins.
    pub subwrappers: BTreeMap<ClassName, Vec<ClassName>>,
    /// Type -> class declaring its two static `convert` methods.
    pub custom_conversions: BTreeMap<ClassName, ClassName>,
    /// Emulated interface -> names of its emulated methods.
    pub emulated_interfaces: BTreeMap<ClassName, BTreeSet<String>>,
    /// Method -> one optional conversion per parameter, then one for the return value.
    pub api_generic_conversion: BTreeMap<MethodRef, Vec<Option<MethodRef>>>,
    pub never_outline_api: BTreeSet<MethodRef>,
    pub backported_methods: BTreeSet<MethodRef>,
    pub retargeted_methods: BTreeMap<MethodRef, MethodRef>,
    pub support_all_callbacks_from_library: bool,
}

impl MachineSpecification {
    pub fn builder() -> SpecificationBuilder {
        SpecificationBuilder::default()
    }

    pub fn from_json(text: &str) -> Result<Self, SpecError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let spec = Self::from_json(&text)?;
        tracing::debug!(
            target: "desugar.spec",
            path = %path.display(),
            wrappers = spec.wrappers.len(),
            custom_conversions = spec.custom_conversions.len(),
            "loaded desugared library specification"
        );
        Ok(spec)
    }

    pub fn to_json_pretty(&self) -> Result<String, SpecError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_wrapper(&self, ty: &TypeRef) -> bool {
        matches!(ty, TypeRef::Class(name) if self.wrappers.contains(name))
    }

    pub fn subwrappers(&self, ty: &ClassName) -> &[ClassName] {
        self.subwrappers
            .get(ty)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Holder of the custom conversion registered for `ty`.
    pub fn custom_conversion(&self, ty: &TypeRef) -> Option<&ClassName> {
        match ty {
            TypeRef::Class(name) => self.custom_conversions.get(name),
            _ => None,
        }
    }

    pub fn is_emulated_interface(&self, ty: &TypeRef) -> bool {
        matches!(ty, TypeRef::Class(name) if self.emulated_interfaces.contains_key(name))
    }

    /// Whether any emulated interface declares a method called `name`.
    pub fn is_emulated_method_name(&self, name: &str) -> bool {
        self.emulated_interfaces
            .values()
            .any(|methods| methods.contains(name))
    }

    pub fn generic_conversions(&self, method: &MethodRef) -> Option<&[Option<MethodRef>]> {
        self.api_generic_conversion.get(method).map(Vec::as_slice)
    }

    pub fn is_never_outline(&self, method: &MethodRef) -> bool {
        self.never_outline_api.contains(method)
    }

    pub fn is_backported(&self, method: &MethodRef) -> bool {
        self.backported_methods.contains(method)
    }

    pub fn retarget(&self, method: &MethodRef) -> Option<&MethodRef> {
        self.retargeted_methods.get(method)
    }
}

/// Fluent construction of a [`MachineSpecification`].
#[derive(Debug, Default)]
pub struct SpecificationBuilder {
    spec: MachineSpecification,
}

impl SpecificationBuilder {
    pub fn rewrite_prefix(mut self, prefix: &str, rewritten: &str) -> Self {
        self.spec
            .rewrite_prefix
            .insert(prefix.to_owned(), rewritten.to_owned());
        self
    }

    pub fn rewrite_type(mut self, ty: &str, rewritten: &str) -> Self {
        self.spec
            .rewrite_type
            .insert(ClassName::new(ty), ClassName::new(rewritten));
        self
    }

    pub fn maintain_type(mut self, ty: &str) -> Self {
        self.spec.maintain_type.insert(ClassName::new(ty));
        self
    }

    pub fn wrapper(mut self, ty: &str) -> Self {
        self.spec.wrappers.insert(ClassName::new(ty));
        self
    }

    pub fn subwrapper(mut self, ty: &str, subwrapper: &str) -> Self {
        self.spec
            .subwrappers
            .entry(ClassName::new(ty))
            .or_default()
            .push(ClassName::new(subwrapper));
        self
    }

    pub fn custom_conversion(mut self, ty: &str, holder: &str) -> Self {
        self.spec
            .custom_conversions
            .insert(ClassName::new(ty), ClassName::new(holder));
        self
    }

    pub fn emulated_interface(mut self, ty: &str, methods: &[&str]) -> Self {
        self.spec.emulated_interfaces.insert(
            ClassName::new(ty),
            methods.iter().map(|name| (*name).to_owned()).collect(),
        );
        self
    }

    pub fn api_generic_conversion(
        mut self,
        method: MethodRef,
        conversions: Vec<Option<MethodRef>>,
    ) -> Self {
        self.spec.api_generic_conversion.insert(method, conversions);
        self
    }

    pub fn never_outline(mut self, method: MethodRef) -> Self {
        self.spec.never_outline_api.insert(method);
        self
    }

    pub fn backported(mut self, method: MethodRef) -> Self {
        self.spec.backported_methods.insert(method);
        self
    }

    pub fn retargeted(mut self, method: MethodRef, target: MethodRef) -> Self {
        self.spec.retargeted_methods.insert(method, target);
        self
    }

    pub fn support_all_callbacks_from_library(mut self, value: bool) -> Self {
        self.spec.support_all_callbacks_from_library = value;
        self
    }

    pub fn build(self) -> MachineSpecification {
        self.spec
    }
}
