use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use desugar_classfile::{parse_field_descriptor, BaseType, FieldType};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IrError;

/// Prefix used when a vivified type has to be rendered as text.
pub const VIVIFIED_PREFIX: &str = "$-vivified-$.";

/// A binary class name in source form (`java.util.function.Function`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassName(Arc<str>);

impl ClassName {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Builds a name from the slash-separated form used in descriptors.
    pub fn from_internal(internal: &str) -> Self {
        Self(Arc::from(internal.replace('/', ".")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn internal_name(&self) -> String {
        self.0.replace('.', "/")
    }

    /// The name of a class derived from this one, e.g. `Foo$-WRP`.
    #[must_use]
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self(Arc::from(format!("{}{suffix}", self.0)))
    }

    pub fn simple_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    pub fn package(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }
}

impl Borrow<str> for ClassName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClassName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl Serialize for ClassName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ClassName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ClassName::new(&name))
    }
}

/// A type occurring in a signature, field or instruction.
///
/// A library type exists in three worlds: the original type, its desugared
/// counterpart and its vivified alias. Program code refers to original types
/// (which the type lens later rewrites to the desugared ones); `Vivified`
/// marks positions that must end up referring to the original type in the
/// emitted output.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeRef {
    Void,
    Primitive(BaseType),
    Class(ClassName),
    Vivified(ClassName),
    Array(Box<TypeRef>),
}

impl TypeRef {
    pub const VOID: TypeRef = TypeRef::Void;
    pub const BOOLEAN: TypeRef = TypeRef::Primitive(BaseType::Boolean);
    pub const INT: TypeRef = TypeRef::Primitive(BaseType::Int);
    pub const LONG: TypeRef = TypeRef::Primitive(BaseType::Long);
    pub const DOUBLE: TypeRef = TypeRef::Primitive(BaseType::Double);

    pub fn class(name: &str) -> Self {
        TypeRef::Class(ClassName::new(name))
    }

    pub fn object() -> Self {
        TypeRef::class("java.lang.Object")
    }

    #[must_use]
    pub fn array_of(self) -> Self {
        TypeRef::Array(Box::new(self))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Void)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeRef::Primitive(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeRef::Array(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            TypeRef::Class(_) | TypeRef::Vivified(_) | TypeRef::Array(_)
        )
    }

    pub fn is_object(&self) -> bool {
        matches!(self, TypeRef::Class(name) if name.as_str() == "java.lang.Object")
    }

    /// True when the type, or the base type of an array, is vivified.
    pub fn mentions_vivified(&self) -> bool {
        matches!(self.base_type(), TypeRef::Vivified(_))
    }

    /// Strips every array dimension.
    pub fn base_type(&self) -> &TypeRef {
        let mut ty = self;
        while let TypeRef::Array(component) = ty {
            ty = component;
        }
        ty
    }

    pub fn element_type(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Array(component) => Some(component),
            _ => None,
        }
    }

    /// Class name of a class or vivified type. Arrays and primitives have none.
    pub fn class_name(&self) -> Option<&ClassName> {
        match self {
            TypeRef::Class(name) | TypeRef::Vivified(name) => Some(name),
            _ => None,
        }
    }

    /// `vivified(T)`; arrays are vivified through their base type.
    #[must_use]
    pub fn vivified(&self) -> TypeRef {
        match self {
            TypeRef::Class(name) => TypeRef::Vivified(name.clone()),
            TypeRef::Array(component) => component.vivified().array_of(),
            other => other.clone(),
        }
    }

    #[must_use]
    pub fn unvivified(&self) -> TypeRef {
        match self {
            TypeRef::Vivified(name) => TypeRef::Class(name.clone()),
            TypeRef::Array(component) => component.unvivified().array_of(),
            other => other.clone(),
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            TypeRef::Void => None,
            TypeRef::Primitive(base) => Some(ValueType::from_base(*base)),
            _ => Some(ValueType::Object),
        }
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, TypeRef::Primitive(base) if base.is_wide())
    }

    /// Number of local variable slots (and operand stack words) the type occupies.
    pub fn slots(&self) -> u16 {
        match self {
            TypeRef::Void => 0,
            ty if ty.is_wide() => 2,
            _ => 1,
        }
    }

    pub fn descriptor(&self) -> String {
        let mut out = String::new();
        self.write_descriptor(&mut out);
        out
    }

    fn write_descriptor(&self, out: &mut String) {
        match self {
            TypeRef::Void => out.push('V'),
            TypeRef::Primitive(base) => out.push(base.descriptor_char()),
            TypeRef::Class(name) => {
                out.push('L');
                out.push_str(&name.internal_name());
                out.push(';');
            }
            TypeRef::Vivified(name) => {
                out.push('L');
                out.push_str(&VIVIFIED_PREFIX.replace('.', "/"));
                out.push_str(&name.internal_name());
                out.push(';');
            }
            TypeRef::Array(component) => {
                out.push('[');
                component.write_descriptor(out);
            }
        }
    }

    pub fn from_descriptor(desc: &str) -> Result<Self, IrError> {
        if desc == "V" {
            return Ok(TypeRef::Void);
        }
        Ok(TypeRef::from_field_type(&parse_field_descriptor(desc)?))
    }

    pub fn from_field_type(ty: &FieldType) -> Self {
        match ty {
            FieldType::Base(base) => TypeRef::Primitive(*base),
            FieldType::Object(internal) => TypeRef::Class(ClassName::from_internal(internal)),
            FieldType::Array(component) => TypeRef::from_field_type(component).array_of(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => f.write_str("void"),
            TypeRef::Primitive(base) => f.write_str(base.keyword()),
            TypeRef::Class(name) => write!(f, "{name}"),
            TypeRef::Vivified(name) => write!(f, "{VIVIFIED_PREFIX}{name}"),
            TypeRef::Array(component) => write!(f, "{component}[]"),
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Computational type of a value on the operand stack or in a local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Int,
    Long,
    Float,
    Double,
    Object,
}

impl ValueType {
    pub fn from_base(base: BaseType) -> Self {
        match base {
            BaseType::Long => ValueType::Long,
            BaseType::Float => ValueType::Float,
            BaseType::Double => ValueType::Double,
            BaseType::Boolean | BaseType::Byte | BaseType::Char | BaseType::Short | BaseType::Int => {
                ValueType::Int
            }
        }
    }

    pub fn slots(self) -> u16 {
        match self {
            ValueType::Long | ValueType::Double => 2,
            _ => 1,
        }
    }
}
