//! Utilities shared by the desugaring tests.
//!
//! [`fixtures`] describes a miniature platform: a few `java.*` library types
//! that the desugared library relocates, their `j$.*` counterparts as they
//! exist on the classpath, and some `android.*` library classes whose
//! signatures mention them. [`Interpreter`] executes code of a class graph,
//! which lets tests run synthesized conversions after the type lens.

pub mod fixtures;
mod interpreter;

pub use interpreter::{Interpreter, InterpreterError, ObjectId, Value};
