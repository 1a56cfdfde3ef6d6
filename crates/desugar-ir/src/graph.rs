use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;

use crate::class::{ClassDef, MethodDef};
use crate::code::Code;
use crate::method::{MethodRef, Proto};
use crate::types::{ClassName, TypeRef};

/// A method definition together with the class that declares it.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedMethod<'a> {
    pub holder: &'a ClassDef,
    pub method: &'a MethodDef,
}

impl<'a> ResolvedMethod<'a> {
    pub fn reference(&self) -> &'a MethodRef {
        &self.method.method
    }

    pub fn holder_type(&self) -> TypeRef {
        self.holder.ty()
    }
}

/// All class definitions visible to a compilation: program classes plus the
/// classpath and library classes they are compiled against.
#[derive(Debug, Clone, Default)]
pub struct ClassGraph {
    classes: IndexMap<ClassName, ClassDef>,
}

impl ClassGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `class`, returning the definition it replaces.
    pub fn add_class(&mut self, class: ClassDef) -> Option<ClassDef> {
        self.classes.insert(class.name.clone(), class)
    }

    pub fn remove_class(&mut self, name: &str) -> Option<ClassDef> {
        self.classes.shift_remove(name)
    }

    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut ClassDef> {
        self.classes.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Definition of a class or vivified type. Both worlds share the library
    /// definition.
    pub fn definition_for(&self, ty: &TypeRef) -> Option<&ClassDef> {
        ty.class_name().and_then(|name| self.classes.get(name.as_str()))
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.values()
    }

    pub fn classes_mut(&mut self) -> impl Iterator<Item = &mut ClassDef> {
        self.classes.values_mut()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Names of program classes, sorted.
    pub fn program_class_names(&self) -> Vec<ClassName> {
        let mut names: Vec<ClassName> = self
            .classes
            .values()
            .filter(|class| class.is_program())
            .map(|class| class.name.clone())
            .collect();
        names.sort();
        names
    }

    /// `class` followed by its superclasses, nearest first.
    pub fn superclass_chain<'a>(&'a self, class: &'a ClassDef) -> Vec<&'a ClassDef> {
        let mut chain = vec![class];
        let mut seen: HashSet<&str> = HashSet::from([class.name.as_str()]);
        let mut current = class;
        while let Some(next) = current
            .super_class
            .as_ref()
            .and_then(|ty| self.definition_for(ty))
        {
            if !seen.insert(next.name.as_str()) {
                break;
            }
            chain.push(next);
            current = next;
        }
        chain
    }

    /// Every interface implemented by `class` or one of its superclasses,
    /// directly or through superinterfaces, in breadth-first order.
    pub fn all_superinterfaces<'a>(&'a self, class: &'a ClassDef) -> Vec<&'a ClassDef> {
        let mut queue: VecDeque<&TypeRef> = VecDeque::new();
        for current in self.superclass_chain(class) {
            queue.extend(current.interfaces.iter());
        }
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        while let Some(ty) = queue.pop_front() {
            let Some(itf) = self.definition_for(ty) else {
                continue;
            };
            if !seen.insert(itf.name.as_str()) {
                continue;
            }
            queue.extend(itf.interfaces.iter());
            out.push(itf);
        }
        out
    }

    /// Every proper supertype of `ty` that has a definition, breadth first.
    pub fn supertypes(&self, ty: &TypeRef) -> Vec<TypeRef> {
        let Some(start) = self.definition_for(ty) else {
            return Vec::new();
        };
        let mut queue: VecDeque<&TypeRef> = start.direct_supertypes().collect();
        let mut seen: HashSet<&str> = HashSet::from([start.name.as_str()]);
        let mut out = Vec::new();
        while let Some(next) = queue.pop_front() {
            let Some(class) = self.definition_for(next) else {
                continue;
            };
            if !seen.insert(class.name.as_str()) {
                continue;
            }
            out.push(class.ty());
            queue.extend(class.direct_supertypes());
        }
        out
    }

    pub fn is_subtype(&self, sub: &ClassName, sup: &ClassName) -> bool {
        if sub == sup || sup.as_str() == "java.lang.Object" {
            return true;
        }
        let sup = TypeRef::Class(sup.clone());
        self.supertypes(&TypeRef::Class(sub.clone())).contains(&sup)
    }

    /// Method resolution: the holder and its superclasses first, then the
    /// maximally specific superinterface methods.
    pub fn resolve_method(&self, method: &MethodRef, _is_interface: bool) -> Option<ResolvedMethod<'_>> {
        let holder = self.definition_for(&method.holder)?;
        for class in self.superclass_chain(holder) {
            if let Some(found) = class.lookup_method(&method.name, &method.proto) {
                return Some(ResolvedMethod {
                    holder: class,
                    method: found,
                });
            }
        }
        self.lookup_maximally_specific_method(holder, &method.name, &method.proto)
    }

    /// Target of an `invokespecial` on a supertype method issued from `context`.
    pub fn lookup_super_target(
        &self,
        method: &MethodRef,
        context: &ClassDef,
    ) -> Option<ResolvedMethod<'_>> {
        let holder = self.definition_for(&method.holder)?;
        if holder.is_interface() {
            return self.resolve_method(method, true);
        }
        let start = context.super_class.as_ref()?;
        self.resolve_method(&method.with_holder(start.clone()), false)
    }

    /// The superinterface method of `class` with the given signature that no
    /// other candidate overrides, preferring a single non-abstract one.
    pub fn lookup_maximally_specific_method<'a>(
        &'a self,
        class: &'a ClassDef,
        name: &str,
        proto: &Proto,
    ) -> Option<ResolvedMethod<'a>> {
        let candidates: Vec<ResolvedMethod<'a>> = self
            .all_superinterfaces(class)
            .into_iter()
            .filter_map(|itf| {
                itf.lookup_method(name, proto)
                    .filter(|m| !m.is_static() && !m.is_private())
                    .map(|method| ResolvedMethod { holder: itf, method })
            })
            .collect();
        let maximal: Vec<ResolvedMethod<'a>> = candidates
            .iter()
            .filter(|candidate| {
                !candidates.iter().any(|other| {
                    other.holder.name != candidate.holder.name
                        && self.is_subtype(&other.holder.name, &candidate.holder.name)
                })
            })
            .copied()
            .collect();
        let mut non_abstract = maximal.iter().filter(|m| !m.method.is_abstract());
        match (non_abstract.next(), non_abstract.next()) {
            (Some(only), None) => Some(*only),
            _ => maximal.first().copied(),
        }
    }

    /// Runtime dispatch of a virtual or interface call on an instance of `receiver`.
    pub fn lookup_virtual_dispatch(
        &self,
        receiver: &ClassName,
        name: &str,
        proto: &Proto,
    ) -> Option<ResolvedMethod<'_>> {
        let class = self.class(receiver.as_str())?;
        for current in self.superclass_chain(class) {
            if let Some(method) = current
                .lookup_method(name, proto)
                .filter(|m| !m.is_static())
            {
                if method.is_abstract() {
                    break;
                }
                return Some(ResolvedMethod {
                    holder: current,
                    method,
                });
            }
        }
        self.lookup_maximally_specific_method(class, name, proto)
            .filter(|resolved| !resolved.method.is_abstract())
    }

    /// Appends methods to `class`, skipping signatures it already declares.
    /// Returns how many were added.
    pub fn add_methods(
        &mut self,
        class: &str,
        methods: impl IntoIterator<Item = MethodDef>,
    ) -> usize {
        let Some(class) = self.classes.get_mut(class) else {
            return 0;
        };
        methods
            .into_iter()
            .filter(|method| class.add_method(method.clone()))
            .count()
    }

    pub fn replace_code(&mut self, method: &MethodRef, code: Code) -> bool {
        let Some(name) = method.holder.class_name() else {
            return false;
        };
        match self
            .classes
            .get_mut(name.as_str())
            .and_then(|class| class.lookup_method_mut(&method.name, &method.proto))
        {
            Some(definition) => {
                definition.code = Some(code);
                true
            }
            None => false,
        }
    }
}

impl FromIterator<ClassDef> for ClassGraph {
    fn from_iter<T: IntoIterator<Item = ClassDef>>(iter: T) -> Self {
        let mut graph = ClassGraph::new();
        for class in iter {
            graph.add_class(class);
        }
        graph
    }
}
