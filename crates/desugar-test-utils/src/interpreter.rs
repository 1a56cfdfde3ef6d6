//! A small stack-machine interpreter for [`ClassGraph`] code.
//!
//! It runs whatever the graph contains: program classes after the type lens,
//! classpath classes and library classes. Methods without code are either
//! abstract or one of the handful of natives `java.lang.Object` needs.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use desugar_ir::{
    ClassDef, ClassGraph, ClassName, Code, Instruction, Invoke, InvokeKind, Label, MethodDef,
    MethodRef, Proto, TypeRef, ValueType,
};
use thiserror::Error;

const DEFAULT_STEP_LIMIT: usize = 1_000_000;
const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Ref(ObjectId),
    /// A `java.lang.String`.
    Str(Arc<str>),
}

impl Value {
    pub fn string(text: &str) -> Self {
        Self::Str(Arc::from(text))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Self::Ref(id) => Some(*id),
            _ => None,
        }
    }

    fn default_for(ty: &TypeRef) -> Self {
        match ty.value_type() {
            Some(ValueType::Int) => Self::Int(0),
            Some(ValueType::Long) => Self::Long(0),
            Some(ValueType::Float) => Self::Float(0.0),
            Some(ValueType::Double) => Self::Double(0.0),
            Some(ValueType::Object) | None => Self::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpreterError {
    #[error("null pointer in {0}")]
    NullPointer(String),
    #[error("no class `{0}`")]
    NoSuchClass(String),
    #[error("no method resolves `{0}`")]
    NoSuchMethod(MethodRef),
    #[error("`{0}` is abstract")]
    AbstractMethod(MethodRef),
    #[error("`{0}` has no code and no native implementation")]
    MissingNative(MethodRef),
    #[error("`{class}` cannot be cast to `{ty}`")]
    ClassCast { class: String, ty: TypeRef },
    #[error("index {index} out of bounds for length {length}")]
    ArrayIndex { index: i32, length: usize },
    #[error("negative array size {0}")]
    NegativeArraySize(i32),
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: String },
    #[error("uncaught exception {0:?}")]
    Thrown(Value),
    #[error("step limit of {0} exceeded")]
    StepLimit(usize),
    #[error("call depth exceeded in `{0}`")]
    StackOverflow(MethodRef),
    #[error("malformed code in `{method}`: {message}")]
    Malformed { method: MethodRef, message: String },
    #[error("invalid descriptor `{0}`")]
    InvalidDescriptor(String),
    #[error("dangling object reference {0}")]
    DanglingReference(usize),
}

type Result<T, E = InterpreterError> = std::result::Result<T, E>;

#[derive(Debug)]
enum HeapObject {
    Instance {
        class: ClassName,
        fields: HashMap<Arc<str>, Value>,
    },
    Array {
        element: TypeRef,
        values: Vec<Value>,
    },
}

pub struct Interpreter<'g> {
    graph: &'g ClassGraph,
    heap: Vec<HeapObject>,
    statics: HashMap<(ClassName, Arc<str>), Value>,
    initialized: HashSet<ClassName>,
    steps: usize,
    step_limit: usize,
    depth: usize,
}

impl<'g> Interpreter<'g> {
    pub fn new(graph: &'g ClassGraph) -> Self {
        Self {
            graph,
            heap: Vec::new(),
            statics: HashMap::new(),
            initialized: HashSet::new(),
            steps: 0,
            step_limit: DEFAULT_STEP_LIMIT,
            depth: 0,
        }
    }

    #[must_use]
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn call_static(&mut self, method: &MethodRef, args: Vec<Value>) -> Result<Option<Value>> {
        self.invoke(&Invoke::invoke_static(method.clone()), None, args)
    }

    /// Dispatches `method` on the runtime class of `receiver`.
    pub fn call_virtual(
        &mut self,
        method: &MethodRef,
        receiver: Value,
        args: Vec<Value>,
    ) -> Result<Option<Value>> {
        let holder_is_interface = self
            .graph
            .definition_for(&method.holder)
            .is_some_and(ClassDef::is_interface);
        let invoke = if holder_is_interface {
            Invoke::invoke_interface(method.clone())
        } else {
            Invoke::invoke_virtual(method.clone())
        };
        self.invoke(&invoke, Some(receiver), args)
    }

    /// Allocates an instance of `class` and runs its `<init>` with the given
    /// descriptor, e.g. `"()V"`.
    pub fn instantiate(&mut self, class: &str, descriptor: &str, args: Vec<Value>) -> Result<Value> {
        let name = ClassName::new(class);
        if !self.graph.contains(class) {
            return Err(InterpreterError::NoSuchClass(class.to_string()));
        }
        self.ensure_initialized(&name)?;
        let object = self.allocate(name);
        let proto = Proto::parse(descriptor)
            .map_err(|_| InterpreterError::InvalidDescriptor(descriptor.to_string()))?;
        let constructor = MethodRef::new(TypeRef::class(class), "<init>", proto);
        self.invoke(&Invoke::invoke_special(constructor), Some(object.clone()), args)?;
        Ok(object)
    }

    pub fn new_array(&mut self, element: TypeRef, values: Vec<Value>) -> Value {
        self.heap.push(HeapObject::Array { element, values });
        Value::Ref(ObjectId(self.heap.len() - 1))
    }

    /// Reads a static field, running the class initializer first.
    pub fn get_static(&mut self, class: &str, field: &str) -> Result<Value> {
        let name = ClassName::new(class);
        self.ensure_initialized(&name)?;
        Ok(self
            .statics
            .get(&(name, Arc::from(field)))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// An instance field of `value`, if it was ever written.
    pub fn field(&self, value: &Value, name: &str) -> Option<Value> {
        match self.heap.get(value.as_object()?.0)? {
            HeapObject::Instance { fields, .. } => fields.get(name).cloned(),
            HeapObject::Array { .. } => None,
        }
    }

    /// The runtime class of `value`; arrays report `java.lang.Object`.
    pub fn class_of(&self, value: &Value) -> Option<ClassName> {
        match value {
            Value::Str(_) => Some(ClassName::new("java.lang.String")),
            Value::Ref(id) => match self.heap.get(id.0)? {
                HeapObject::Instance { class, .. } => Some(class.clone()),
                HeapObject::Array { .. } => Some(ClassName::new("java.lang.Object")),
            },
            _ => None,
        }
    }

    pub fn array_values(&self, value: &Value) -> Option<&[Value]> {
        match self.heap.get(value.as_object()?.0)? {
            HeapObject::Array { values, .. } => Some(values),
            HeapObject::Instance { .. } => None,
        }
    }

    pub fn invoke(
        &mut self,
        invoke: &Invoke,
        receiver: Option<Value>,
        mut args: Vec<Value>,
    ) -> Result<Option<Value>> {
        let resolved = self.dispatch(invoke, receiver.as_ref())?;
        if resolved.1.is_static() {
            self.ensure_initialized(&resolved.0.name)?;
        }
        if let Some(receiver) = receiver {
            args.insert(0, receiver);
        }
        tracing::trace!(target: "desugar.interpreter", method = %resolved.1.method, "invoke");
        self.execute(resolved.0, resolved.1, args)
    }

    fn dispatch(
        &self,
        invoke: &Invoke,
        receiver: Option<&Value>,
    ) -> Result<(&'g ClassDef, &'g MethodDef)> {
        let graph = self.graph;
        let method = &invoke.method;
        if invoke.has_receiver() && receiver.map_or(true, Value::is_null) {
            return Err(InterpreterError::NullPointer(format!("call to {method}")));
        }
        let resolved = match invoke.kind {
            InvokeKind::Virtual | InvokeKind::Interface => {
                let class = receiver
                    .and_then(|receiver| self.class_of(receiver))
                    .ok_or_else(|| InterpreterError::TypeMismatch {
                        expected: "object receiver",
                        found: format!("{receiver:?}"),
                    })?;
                graph.lookup_virtual_dispatch(&class, &method.name, &method.proto)
            }
            InvokeKind::Static | InvokeKind::Special | InvokeKind::Super => {
                graph.resolve_method(method, invoke.itf)
            }
        };
        let resolved = resolved.ok_or_else(|| InterpreterError::NoSuchMethod(method.clone()))?;
        Ok((resolved.holder, resolved.method))
    }

    fn execute(
        &mut self,
        holder: &'g ClassDef,
        method: &'g MethodDef,
        args: Vec<Value>,
    ) -> Result<Option<Value>> {
        let Some(code) = &method.code else {
            return self.native(holder, method, &args);
        };
        if self.depth >= MAX_DEPTH {
            return Err(InterpreterError::StackOverflow(method.method.clone()));
        }
        self.depth += 1;
        let result = self.run(method, code, args);
        self.depth -= 1;
        result
    }

    fn native(&self, holder: &ClassDef, method: &MethodDef, args: &[Value]) -> Result<Option<Value>> {
        if method.is_abstract() {
            return Err(InterpreterError::AbstractMethod(method.method.clone()));
        }
        let arg = |idx: usize| {
            args.get(idx)
                .ok_or_else(|| malformed(&method.method, "missing native argument"))
        };
        match (
            holder.name.as_str(),
            method.name(),
            method.proto().descriptor().as_str(),
        ) {
            ("java.lang.Object", "<init>", "()V") => Ok(None),
            ("java.lang.Object", "equals", "(Ljava/lang/Object;)Z") => Ok(Some(Value::Int(
                i32::from(same_reference(arg(0)?, arg(1)?)),
            ))),
            ("java.lang.Object", "hashCode", "()I") => {
                Ok(Some(Value::Int(identity_hash(arg(0)?))))
            }
            _ => Err(InterpreterError::MissingNative(method.method.clone())),
        }
    }

    fn run(&mut self, method: &'g MethodDef, code: &'g Code, args: Vec<Value>) -> Result<Option<Value>> {
        let owner = &method.method;
        let labels = code.label_offsets();
        let jump = |label: &Label| {
            labels
                .get(label)
                .copied()
                .ok_or_else(|| malformed(owner, "branch to unbound label"))
        };

        let frame_size = usize::from(code.max_locals.max(method.argument_slots()));
        let mut locals = vec![Value::Null; frame_size];
        let mut incoming = args.into_iter();
        let mut slot = 0;
        if !method.is_static() {
            locals[0] = incoming
                .next()
                .ok_or_else(|| malformed(owner, "missing receiver"))?;
            slot = 1;
        }
        for param in &owner.proto.params {
            locals[slot] = incoming
                .next()
                .ok_or_else(|| malformed(owner, "missing argument"))?;
            slot += usize::from(param.slots());
        }

        let mut stack: Vec<Value> = Vec::with_capacity(usize::from(code.max_stack));
        let mut pc = 0;
        while let Some(insn) = code.instructions.get(pc) {
            pc += 1;
            self.steps += 1;
            if self.steps > self.step_limit {
                return Err(InterpreterError::StepLimit(self.step_limit));
            }
            match insn {
                Instruction::Label(_) => {}
                Instruction::Load(_, index) => {
                    let value = locals
                        .get(usize::from(*index))
                        .cloned()
                        .ok_or_else(|| malformed(owner, "load outside the frame"))?;
                    stack.push(value);
                }
                Instruction::Store(_, index) => {
                    let value = pop(&mut stack, owner)?;
                    let local = locals
                        .get_mut(usize::from(*index))
                        .ok_or_else(|| malformed(owner, "store outside the frame"))?;
                    *local = value;
                }
                Instruction::ConstNull => stack.push(Value::Null),
                Instruction::ConstInt(value) => stack.push(Value::Int(*value)),
                Instruction::ConstString(text) => stack.push(Value::Str(text.clone())),
                Instruction::Dup => {
                    let top = stack
                        .last()
                        .cloned()
                        .ok_or_else(|| malformed(owner, "dup on an empty stack"))?;
                    stack.push(top);
                }
                Instruction::Pop => {
                    pop(&mut stack, owner)?;
                }
                Instruction::Swap => {
                    let top = pop(&mut stack, owner)?;
                    let below = pop(&mut stack, owner)?;
                    stack.push(top);
                    stack.push(below);
                }
                Instruction::New(ty) => {
                    let name = ty
                        .class_name()
                        .ok_or_else(|| malformed(owner, "new of a non-class type"))?;
                    if !self.graph.contains(name.as_str()) {
                        return Err(InterpreterError::NoSuchClass(name.to_string()));
                    }
                    self.ensure_initialized(name)?;
                    stack.push(self.allocate(name.clone()));
                }
                Instruction::NewArray(element) => {
                    let length = pop_int(&mut stack, owner)?;
                    let length = usize::try_from(length)
                        .map_err(|_| InterpreterError::NegativeArraySize(length))?;
                    let values = vec![Value::default_for(element); length];
                    stack.push(self.new_array(element.clone(), values));
                }
                Instruction::ArrayLength => {
                    let array = pop(&mut stack, owner)?;
                    let length = self.array(&array, "arraylength")?.len();
                    stack.push(Value::Int(length as i32));
                }
                Instruction::ArrayLoad(_) => {
                    let index = pop_int(&mut stack, owner)?;
                    let array = pop(&mut stack, owner)?;
                    let values = self.array(&array, "array load")?;
                    let value = element_index(index, values.len())
                        .map(|idx| values[idx].clone())?;
                    stack.push(value);
                }
                Instruction::ArrayStore(_) => {
                    let value = pop(&mut stack, owner)?;
                    let index = pop_int(&mut stack, owner)?;
                    let array = pop(&mut stack, owner)?;
                    let values = self.array_mut(&array, "array store")?;
                    let idx = element_index(index, values.len())?;
                    values[idx] = value;
                }
                Instruction::CheckCast(ty) => {
                    let value = stack
                        .last()
                        .ok_or_else(|| malformed(owner, "checkcast on an empty stack"))?;
                    if !value.is_null() && !self.is_instance(value, ty) {
                        return Err(InterpreterError::ClassCast {
                            class: self
                                .class_of(value)
                                .map_or_else(|| format!("{value:?}"), |class| class.to_string()),
                            ty: ty.clone(),
                        });
                    }
                }
                Instruction::InstanceOf(ty) => {
                    let value = pop(&mut stack, owner)?;
                    stack.push(Value::Int(i32::from(self.is_instance(&value, ty))));
                }
                Instruction::GetField(field) => {
                    let object = pop(&mut stack, owner)?;
                    let fields = self.fields_mut(&object, "getfield")?;
                    let value = fields
                        .get(&*field.name)
                        .cloned()
                        .unwrap_or_else(|| Value::default_for(&field.ty));
                    stack.push(value);
                }
                Instruction::PutField(field) => {
                    let value = pop(&mut stack, owner)?;
                    let object = pop(&mut stack, owner)?;
                    self.fields_mut(&object, "putfield")?
                        .insert(Arc::from(&*field.name), value);
                }
                Instruction::GetStatic(field) => {
                    let holder = field
                        .holder
                        .class_name()
                        .ok_or_else(|| malformed(owner, "static field on a non-class type"))?;
                    self.ensure_initialized(holder)?;
                    let value = self
                        .statics
                        .get(&(holder.clone(), Arc::from(&*field.name)))
                        .cloned()
                        .unwrap_or_else(|| Value::default_for(&field.ty));
                    stack.push(value);
                }
                Instruction::PutStatic(field) => {
                    let value = pop(&mut stack, owner)?;
                    let holder = field
                        .holder
                        .class_name()
                        .ok_or_else(|| malformed(owner, "static field on a non-class type"))?;
                    self.ensure_initialized(holder)?;
                    self.statics
                        .insert((holder.clone(), Arc::from(&*field.name)), value);
                }
                Instruction::Invoke(invoke) => {
                    let arity = invoke.method.proto.arity();
                    let split = stack
                        .len()
                        .checked_sub(arity)
                        .ok_or_else(|| malformed(owner, "too few call arguments"))?;
                    let call_args = stack.split_off(split);
                    let receiver = if invoke.has_receiver() {
                        Some(pop(&mut stack, owner)?)
                    } else {
                        None
                    };
                    if let Some(result) = self.invoke(invoke, receiver, call_args)? {
                        stack.push(result);
                    }
                }
                Instruction::IntAdd => {
                    let right = pop_int(&mut stack, owner)?;
                    let left = pop_int(&mut stack, owner)?;
                    stack.push(Value::Int(left.wrapping_add(right)));
                }
                Instruction::IfInt(op, label) => {
                    let value = pop_int(&mut stack, owner)?;
                    if op.holds(value.cmp(&0)) {
                        pc = jump(label)?;
                    }
                }
                Instruction::IfIntCmp(op, label) => {
                    let right = pop_int(&mut stack, owner)?;
                    let left = pop_int(&mut stack, owner)?;
                    if op.holds(left.cmp(&right)) {
                        pc = jump(label)?;
                    }
                }
                Instruction::IfRefCmp(op, label) => {
                    let right = pop(&mut stack, owner)?;
                    let left = pop(&mut stack, owner)?;
                    let ordering = if same_reference(&left, &right) {
                        Ordering::Equal
                    } else {
                        Ordering::Less
                    };
                    if op.holds(ordering) {
                        pc = jump(label)?;
                    }
                }
                Instruction::IfNull(label) => {
                    if pop(&mut stack, owner)?.is_null() {
                        pc = jump(label)?;
                    }
                }
                Instruction::IfNonNull(label) => {
                    if !pop(&mut stack, owner)?.is_null() {
                        pc = jump(label)?;
                    }
                }
                Instruction::Goto(label) => pc = jump(label)?,
                Instruction::Return(Some(_)) => return pop(&mut stack, owner).map(Some),
                Instruction::Return(None) => return Ok(None),
                Instruction::Throw => return Err(InterpreterError::Thrown(pop(&mut stack, owner)?)),
            }
        }
        Err(malformed(owner, "execution ran past the last instruction"))
    }

    /// Runs `<clinit>` of `name` the first time the class is used.
    fn ensure_initialized(&mut self, name: &ClassName) -> Result<()> {
        if !self.initialized.insert(name.clone()) {
            return Ok(());
        }
        let graph = self.graph;
        let Some(class) = graph.class(name.as_str()) else {
            return Ok(());
        };
        if let Some(super_name) = class.super_class.as_ref().and_then(TypeRef::class_name) {
            self.ensure_initialized(super_name)?;
        }
        if let Some(initializer) = class
            .methods
            .iter()
            .find(|method| method.method.is_class_initializer())
        {
            tracing::trace!(target: "desugar.interpreter", class = %name, "class initialization");
            self.execute(class, initializer, Vec::new())?;
        }
        Ok(())
    }

    fn allocate(&mut self, class: ClassName) -> Value {
        self.heap.push(HeapObject::Instance {
            class,
            fields: HashMap::new(),
        });
        Value::Ref(ObjectId(self.heap.len() - 1))
    }

    fn heap_object_mut(&mut self, value: &Value, operation: &str) -> Result<&mut HeapObject> {
        match value {
            Value::Ref(id) => self
                .heap
                .get_mut(id.0)
                .ok_or(InterpreterError::DanglingReference(id.0)),
            Value::Null => Err(InterpreterError::NullPointer(operation.to_string())),
            other => Err(InterpreterError::TypeMismatch {
                expected: "heap object",
                found: format!("{other:?}"),
            }),
        }
    }

    fn fields_mut(&mut self, value: &Value, operation: &str) -> Result<&mut HashMap<Arc<str>, Value>> {
        match self.heap_object_mut(value, operation)? {
            HeapObject::Instance { fields, .. } => Ok(fields),
            HeapObject::Array { .. } => Err(InterpreterError::TypeMismatch {
                expected: "instance",
                found: "array".to_string(),
            }),
        }
    }

    fn array(&self, value: &Value, operation: &str) -> Result<&[Value]> {
        match value {
            Value::Null => Err(InterpreterError::NullPointer(operation.to_string())),
            _ => self.array_values(value).ok_or_else(|| InterpreterError::TypeMismatch {
                expected: "array",
                found: format!("{value:?}"),
            }),
        }
    }

    fn array_mut(&mut self, value: &Value, operation: &str) -> Result<&mut Vec<Value>> {
        match self.heap_object_mut(value, operation)? {
            HeapObject::Array { values, .. } => Ok(values),
            HeapObject::Instance { .. } => Err(InterpreterError::TypeMismatch {
                expected: "array",
                found: "instance".to_string(),
            }),
        }
    }

    fn is_instance(&self, value: &Value, ty: &TypeRef) -> bool {
        if ty.is_object() {
            return matches!(value, Value::Ref(_) | Value::Str(_));
        }
        match value {
            Value::Str(_) => *ty == TypeRef::class("java.lang.String"),
            Value::Ref(id) => match self.heap.get(id.0) {
                Some(HeapObject::Instance { class, .. }) => ty
                    .class_name()
                    .is_some_and(|expected| self.graph.is_subtype(class, expected)),
                Some(HeapObject::Array { element, .. }) => ty
                    .element_type()
                    .is_some_and(|expected| self.is_assignable(element, expected)),
                None => false,
            },
            _ => false,
        }
    }

    fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
        if from == to || (to.is_object() && from.is_reference()) {
            return true;
        }
        match (from, to) {
            (TypeRef::Class(from), TypeRef::Class(to)) => self.graph.is_subtype(from, to),
            (TypeRef::Array(from), TypeRef::Array(to)) => self.is_assignable(from, to),
            _ => false,
        }
    }
}

fn malformed(method: &MethodRef, message: &str) -> InterpreterError {
    InterpreterError::Malformed {
        method: method.clone(),
        message: message.to_string(),
    }
}

fn pop(stack: &mut Vec<Value>, method: &MethodRef) -> Result<Value> {
    stack
        .pop()
        .ok_or_else(|| malformed(method, "operand stack underflow"))
}

fn pop_int(stack: &mut Vec<Value>, method: &MethodRef) -> Result<i32> {
    match pop(stack, method)? {
        Value::Int(value) => Ok(value),
        other => Err(InterpreterError::TypeMismatch {
            expected: "int",
            found: format!("{other:?}"),
        }),
    }
}

fn element_index(index: i32, length: usize) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|idx| *idx < length)
        .ok_or(InterpreterError::ArrayIndex { index, length })
}

fn same_reference(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Ref(left), Value::Ref(right)) => left == right,
        (Value::Str(left), Value::Str(right)) => left == right,
        _ => false,
    }
}

fn identity_hash(value: &Value) -> i32 {
    match value {
        Value::Ref(id) => id.0 as i32,
        Value::Str(text) => text
            .bytes()
            .fold(0i32, |hash, byte| hash.wrapping_mul(31).wrapping_add(i32::from(byte))),
        _ => 0,
    }
}
