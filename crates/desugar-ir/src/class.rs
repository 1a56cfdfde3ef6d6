use desugar_classfile::access::{ACC_ENUM, ACC_STATIC};
use desugar_classfile::AccessFlags;

use crate::code::Code;
use crate::method::{FieldRef, MethodRef, Proto};
use crate::synthetic::SyntheticKind;
use crate::types::{ClassName, TypeRef};

/// Where a class definition comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClassOrigin {
    /// Compiled and emitted by this compilation.
    Program,
    /// Visible for compilation but not emitted (e.g. the desugared library).
    Classpath,
    /// Provided by the platform runtime.
    Library,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OptionalBool {
    #[default]
    Unknown,
    True,
    False,
}

impl OptionalBool {
    pub fn is_true(self) -> bool {
        self == OptionalBool::True
    }

    pub fn is_false(self) -> bool {
        self == OptionalBool::False
    }
}

impl From<bool> for OptionalBool {
    fn from(value: bool) -> Self {
        if value {
            OptionalBool::True
        } else {
            OptionalBool::False
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub field: FieldRef,
    pub access: AccessFlags,
}

impl FieldDef {
    pub fn new(field: FieldRef, access: AccessFlags) -> Self {
        Self { field, access }
    }

    pub fn is_static(&self) -> bool {
        self.access.is_static()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    pub method: MethodRef,
    pub access: AccessFlags,
    pub code: Option<Code>,
    /// Whether the method overrides a library method, when known.
    pub library_override: OptionalBool,
    pub synthetic: Option<SyntheticKind>,
}

impl MethodDef {
    pub fn new(method: MethodRef, access: AccessFlags) -> Self {
        Self {
            method,
            access,
            code: None,
            library_override: OptionalBool::Unknown,
            synthetic: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: Code) -> Self {
        self.code = Some(code);
        self
    }

    #[must_use]
    pub fn with_synthetic(mut self, kind: SyntheticKind) -> Self {
        self.synthetic = Some(kind);
        self
    }

    #[must_use]
    pub fn with_library_override(mut self, value: OptionalBool) -> Self {
        self.library_override = value;
        self
    }

    pub fn name(&self) -> &str {
        &self.method.name
    }

    pub fn proto(&self) -> &Proto {
        &self.method.proto
    }

    pub fn is_static(&self) -> bool {
        self.access.is_static()
    }

    pub fn is_private(&self) -> bool {
        self.access.is_private()
    }

    pub fn is_final(&self) -> bool {
        self.access.is_final()
    }

    pub fn is_abstract(&self) -> bool {
        self.access.is_abstract()
    }

    pub fn is_public(&self) -> bool {
        self.access.is_public()
    }

    pub fn is_instance_initializer(&self) -> bool {
        self.method.is_instance_initializer()
    }

    /// Dispatched through the virtual method table.
    pub fn is_virtual(&self) -> bool {
        !self.is_static()
            && !self.is_private()
            && !self.method.is_instance_initializer()
            && !self.method.is_class_initializer()
    }

    /// Local slots taken by the receiver and the parameters.
    pub fn argument_slots(&self) -> u16 {
        self.method.proto.param_slots() + u16::from(!self.is_static())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: ClassName,
    pub origin: ClassOrigin,
    pub access: AccessFlags,
    pub super_class: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
    pub synthetic: Option<SyntheticKind>,
}

impl ClassDef {
    /// A class extending `java.lang.Object` (except `java.lang.Object` itself).
    pub fn new(name: &str, origin: ClassOrigin, access: AccessFlags) -> Self {
        let super_class = (name != "java.lang.Object").then(TypeRef::object);
        Self {
            name: ClassName::new(name),
            origin,
            access,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            synthetic: None,
        }
    }

    #[must_use]
    pub fn with_super(mut self, super_class: TypeRef) -> Self {
        self.super_class = Some(super_class);
        self
    }

    #[must_use]
    pub fn with_interface(mut self, interface: TypeRef) -> Self {
        self.interfaces.push(interface);
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    #[must_use]
    pub fn with_synthetic(mut self, kind: SyntheticKind) -> Self {
        self.synthetic = Some(kind);
        self
    }

    pub fn ty(&self) -> TypeRef {
        TypeRef::Class(self.name.clone())
    }

    pub fn is_interface(&self) -> bool {
        self.access.is_interface()
    }

    pub fn is_enum(&self) -> bool {
        self.access.is_enum()
    }

    pub fn is_final(&self) -> bool {
        self.access.is_final()
    }

    pub fn is_program(&self) -> bool {
        self.origin == ClassOrigin::Program
    }

    pub fn is_library(&self) -> bool {
        self.origin == ClassOrigin::Library
    }

    /// Direct supertypes: the superclass first, then the interfaces.
    pub fn direct_supertypes(&self) -> impl Iterator<Item = &TypeRef> {
        self.super_class.iter().chain(self.interfaces.iter())
    }

    pub fn lookup_method(&self, name: &str, proto: &Proto) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|m| &*m.method.name == name && &m.method.proto == proto)
    }

    pub fn lookup_method_mut(&mut self, name: &str, proto: &Proto) -> Option<&mut MethodDef> {
        self.methods
            .iter_mut()
            .find(|m| &*m.method.name == name && &m.method.proto == proto)
    }

    pub fn lookup_virtual_method(&self, name: &str, proto: &Proto) -> Option<&MethodDef> {
        self.lookup_method(name, proto).filter(|m| m.is_virtual())
    }

    pub fn lookup_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| &*f.field.name == name)
    }

    pub fn virtual_methods(&self) -> impl Iterator<Item = &MethodDef> {
        self.methods.iter().filter(|m| m.is_virtual())
    }

    pub fn instance_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.is_static())
    }

    /// Enum constants in declaration order.
    pub fn enum_constants(&self) -> Vec<&FieldDef> {
        let ty = self.ty();
        self.fields
            .iter()
            .filter(|f| {
                f.access.contains(ACC_STATIC | ACC_ENUM) && f.field.ty == ty
            })
            .collect()
    }

    /// Adds `method` unless a method with the same signature exists.
    pub fn add_method(&mut self, method: MethodDef) -> bool {
        if self
            .lookup_method(&method.method.name, &method.method.proto)
            .is_some()
        {
            return false;
        }
        self.methods.push(method);
        true
    }
}
