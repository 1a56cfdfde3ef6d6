//! The type lens: the final mapping of program code onto the types that
//! exist at runtime. `vivified(T)` becomes `T`, a rewritten `T` becomes its
//! desugared counterpart.

use std::fmt;

use desugar_ir::{ClassDef, ClassGraph, ClassName, TypeRef};
use desugar_spec::TypeRewriter;

/// Applies the lens to every program class of `graph`, renaming classes
/// whose own name is rewritten. Returns the number of renamed classes.
pub fn apply_type_lens(graph: &mut ClassGraph, rewriter: &dyn TypeRewriter) -> usize {
    let mut renamed = 0;
    for name in graph.program_class_names() {
        let Some(mut class) = graph.remove_class(name.as_str()) else {
            continue;
        };
        lens_class(&mut class, &mut |ty| rewriter.rewrite(ty));
        if class.name != name {
            tracing::debug!(target: "desugar.apiconv", from = %name, to = %class.name, "renamed by type lens");
            renamed += 1;
        }
        graph.add_class(class);
    }
    renamed
}

fn lens_class(class: &mut ClassDef, lens: &mut dyn FnMut(&TypeRef) -> TypeRef) {
    if let Some(name) = lens(&class.ty()).class_name() {
        class.name = name.clone();
    }
    class.super_class = class.super_class.as_ref().map(|ty| lens(ty));
    for interface in &mut class.interfaces {
        *interface = lens(interface);
    }
    for field in &mut class.fields {
        field.field = field.field.map_types(lens);
    }
    for method in &mut class.methods {
        method.method = method.method.map_types(lens);
        if let Some(code) = &mut method.code {
            for insn in &mut code.instructions {
                insn.map_types(lens);
            }
        }
    }
}

/// A vivified type left in a program class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VivifiedReference {
    pub class: ClassName,
    /// The supertype list, a field, a method signature or a method body.
    pub member: String,
    pub ty: TypeRef,
}

impl fmt::Display for VivifiedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {} of {}", self.ty, self.member, self.class)
    }
}

/// Every vivified type still mentioned by a program class, sorted.
pub fn find_vivified_references(graph: &ClassGraph) -> Vec<VivifiedReference> {
    let mut found = Vec::new();
    for class in graph.classes().filter(|class| class.is_program()) {
        let mut record = |member: &dyn fmt::Display, ty: &TypeRef| {
            if ty.mentions_vivified() {
                found.push(VivifiedReference {
                    class: class.name.clone(),
                    member: member.to_string(),
                    ty: ty.clone(),
                });
            }
        };
        for supertype in class.direct_supertypes() {
            record(&"supertypes", supertype);
        }
        for field in &class.fields {
            record(&field.field, &field.field.ty);
        }
        for method in &class.methods {
            for ty in method.proto().types() {
                record(&method.method, ty);
            }
            let Some(code) = &method.code else {
                continue;
            };
            let body = format!("body of {}", method.method);
            for insn in &code.instructions {
                insn.visit_types(&mut |ty| record(&body, ty));
            }
        }
    }
    found.sort();
    found.dedup();
    found
}
