use std::fmt;
use std::sync::Arc;

use desugar_classfile::{parse_method_descriptor, ReturnType};
use serde::{Deserialize, Serialize};

use crate::error::IrError;
use crate::types::{ClassName, TypeRef};

pub const INSTANCE_INITIALIZER: &str = "<init>";
pub const CLASS_INITIALIZER: &str = "<clinit>";

/// Parameter and return types of a method.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Proto {
    pub params: Vec<TypeRef>,
    pub ret: TypeRef,
}

impl Proto {
    pub fn new(params: Vec<TypeRef>, ret: TypeRef) -> Self {
        Self { params, ret }
    }

    pub fn parse(descriptor: &str) -> Result<Self, IrError> {
        let desc = parse_method_descriptor(descriptor)?;
        let params = desc.params.iter().map(TypeRef::from_field_type).collect();
        let ret = match &desc.return_type {
            ReturnType::Void => TypeRef::Void,
            ReturnType::Type(ty) => TypeRef::from_field_type(ty),
        };
        Ok(Self { params, ret })
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Local slots taken by the parameters, excluding any receiver.
    pub fn param_slots(&self) -> u16 {
        self.params.iter().map(TypeRef::slots).sum()
    }

    /// The same proto with `ty` as an extra leading parameter.
    #[must_use]
    pub fn prepend(&self, ty: TypeRef) -> Self {
        let mut params = Vec::with_capacity(self.params.len() + 1);
        params.push(ty);
        params.extend(self.params.iter().cloned());
        Self {
            params,
            ret: self.ret.clone(),
        }
    }

    /// Parameter types followed by the return type.
    pub fn types(&self) -> impl Iterator<Item = &TypeRef> {
        self.params.iter().chain(std::iter::once(&self.ret))
    }

    pub fn descriptor(&self) -> String {
        let mut out = String::from("(");
        for param in &self.params {
            out.push_str(&param.descriptor());
        }
        out.push(')');
        out.push_str(&self.ret.descriptor());
        out
    }

    #[must_use]
    pub fn map_types(&self, f: &mut dyn FnMut(&TypeRef) -> TypeRef) -> Self {
        Self {
            params: self.params.iter().map(&mut *f).collect(),
            ret: f(&self.ret),
        }
    }
}

impl fmt::Display for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor())
    }
}

impl fmt::Debug for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// A symbolic method reference: holder, name and proto.
///
/// Written as text in the `holder#name(descriptor)` form, e.g.
/// `java.util.Collection#stream()Ljava/util/stream/Stream;`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MethodRef {
    pub holder: TypeRef,
    pub name: Arc<str>,
    pub proto: Proto,
}

impl MethodRef {
    pub fn new(holder: TypeRef, name: &str, proto: Proto) -> Self {
        Self {
            holder,
            name: Arc::from(name),
            proto,
        }
    }

    pub fn parse(text: &str) -> Result<Self, IrError> {
        let invalid = || IrError::InvalidMethodReference(text.to_string());
        let (holder, rest) = text.split_once('#').ok_or_else(invalid)?;
        let open = rest.find('(').ok_or_else(invalid)?;
        let (name, descriptor) = rest.split_at(open);
        if holder.is_empty() || name.is_empty() {
            return Err(invalid());
        }
        let holder = if holder.starts_with('[') {
            TypeRef::from_descriptor(&holder.replace('.', "/"))?
        } else {
            TypeRef::Class(ClassName::new(holder))
        };
        Ok(Self::new(holder, name, Proto::parse(descriptor)?))
    }

    pub fn is_instance_initializer(&self) -> bool {
        &*self.name == INSTANCE_INITIALIZER
    }

    pub fn is_class_initializer(&self) -> bool {
        &*self.name == CLASS_INITIALIZER
    }

    pub fn arity(&self) -> usize {
        self.proto.arity()
    }

    /// Same name and proto, regardless of holder.
    pub fn matches_signature(&self, other: &MethodRef) -> bool {
        self.name == other.name && self.proto == other.proto
    }

    #[must_use]
    pub fn with_holder(&self, holder: TypeRef) -> Self {
        Self {
            holder,
            name: self.name.clone(),
            proto: self.proto.clone(),
        }
    }

    #[must_use]
    pub fn with_proto(&self, proto: Proto) -> Self {
        Self {
            holder: self.holder.clone(),
            name: self.name.clone(),
            proto,
        }
    }

    #[must_use]
    pub fn map_types(&self, f: &mut dyn FnMut(&TypeRef) -> TypeRef) -> Self {
        Self {
            holder: f(&self.holder),
            name: self.name.clone(),
            proto: self.proto.map_types(f),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}{}", self.holder, self.name, self.proto)
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl TryFrom<String> for MethodRef {
    type Error = IrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MethodRef::parse(&value)
    }
}

impl From<MethodRef> for String {
    fn from(value: MethodRef) -> Self {
        value.to_string()
    }
}

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    pub holder: TypeRef,
    pub name: Arc<str>,
    pub ty: TypeRef,
}

impl FieldRef {
    pub fn new(holder: TypeRef, name: &str, ty: TypeRef) -> Self {
        Self {
            holder,
            name: Arc::from(name),
            ty,
        }
    }

    #[must_use]
    pub fn map_types(&self, f: &mut dyn FnMut(&TypeRef) -> TypeRef) -> Self {
        Self {
            holder: f(&self.holder),
            name: self.name.clone(),
            ty: f(&self.ty),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}:{}", self.holder, self.name, self.ty.descriptor())
    }
}

impl fmt::Debug for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
