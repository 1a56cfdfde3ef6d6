#![forbid(unsafe_code)]

//! In-memory program model used by the desugaring passes: types, method and
//! field references, stack-machine code and the class graph.

mod class;
mod code;
mod error;
mod graph;
mod method;
mod synthetic;
mod types;

pub use crate::class::{ClassDef, ClassOrigin, FieldDef, MethodDef, OptionalBool};
pub use crate::code::{CmpOp, Code, CodeBuilder, Instruction, Invoke, InvokeKind, Label};
pub use crate::error::IrError;
pub use crate::graph::{ClassGraph, ResolvedMethod};
pub use crate::method::{FieldRef, MethodRef, Proto, CLASS_INITIALIZER, INSTANCE_INITIALIZER};
pub use crate::synthetic::SyntheticKind;
pub use crate::types::{ClassName, TypeRef, ValueType, VIVIFIED_PREFIX};

pub use desugar_classfile::{access, AccessFlags, BaseType};
