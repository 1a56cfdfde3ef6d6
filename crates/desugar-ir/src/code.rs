//! Stack-machine code model.
//!
//! The instruction set is the subset of JVM bytecode the conversion machinery
//! reads and emits. Branch targets are symbolic [`Label`]s bound by
//! [`Instruction::Label`] pseudo instructions.

use std::collections::HashMap;
use std::sync::Arc;

use crate::method::{FieldRef, MethodRef};
use crate::types::{TypeRef, ValueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Static,
    Virtual,
    Interface,
    /// `invokespecial` on an instance initializer or a private method.
    Special,
    /// `invokespecial` on a method of a supertype.
    Super,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Invoke {
    pub kind: InvokeKind,
    pub method: MethodRef,
    /// Whether the symbolic reference names an interface method.
    pub itf: bool,
}

impl Invoke {
    pub fn new(kind: InvokeKind, method: MethodRef, itf: bool) -> Self {
        Self { kind, method, itf }
    }

    pub fn invoke_static(method: MethodRef) -> Self {
        Self::new(InvokeKind::Static, method, false)
    }

    pub fn invoke_virtual(method: MethodRef) -> Self {
        Self::new(InvokeKind::Virtual, method, false)
    }

    pub fn invoke_interface(method: MethodRef) -> Self {
        Self::new(InvokeKind::Interface, method, true)
    }

    pub fn invoke_special(method: MethodRef) -> Self {
        Self::new(InvokeKind::Special, method, false)
    }

    pub fn is_static(&self) -> bool {
        self.kind == InvokeKind::Static
    }

    pub fn is_super(&self) -> bool {
        self.kind == InvokeKind::Super
    }

    pub fn has_receiver(&self) -> bool {
        !self.is_static()
    }

    /// Operand stack words consumed, receiver included.
    pub fn argument_words(&self) -> u16 {
        self.method.proto.param_slots() + u16::from(self.has_receiver())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

impl CmpOp {
    pub fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CmpOp::Eq => ordering == Equal,
            CmpOp::Ne => ordering != Equal,
            CmpOp::Lt => ordering == Less,
            CmpOp::Ge => ordering != Less,
            CmpOp::Gt => ordering == Greater,
            CmpOp::Le => ordering != Greater,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Label(Label),
    Load(ValueType, u16),
    Store(ValueType, u16),
    ConstNull,
    ConstInt(i32),
    ConstString(Arc<str>),
    Dup,
    Pop,
    Swap,
    New(TypeRef),
    /// Pops a length, pushes a new array with the given element type.
    NewArray(TypeRef),
    ArrayLength,
    ArrayLoad(ValueType),
    ArrayStore(ValueType),
    CheckCast(TypeRef),
    InstanceOf(TypeRef),
    GetField(FieldRef),
    PutField(FieldRef),
    GetStatic(FieldRef),
    PutStatic(FieldRef),
    Invoke(Invoke),
    IntAdd,
    /// Compares an int against zero.
    IfInt(CmpOp, Label),
    IfIntCmp(CmpOp, Label),
    /// Reference comparison; only `Eq` and `Ne` are meaningful.
    IfRefCmp(CmpOp, Label),
    IfNull(Label),
    IfNonNull(Label),
    Goto(Label),
    Return(Option<ValueType>),
    Throw,
}

impl Instruction {
    pub fn as_invoke(&self) -> Option<&Invoke> {
        match self {
            Instruction::Invoke(invoke) => Some(invoke),
            _ => None,
        }
    }

    pub fn branch_target(&self) -> Option<Label> {
        match self {
            Instruction::IfInt(_, label)
            | Instruction::IfIntCmp(_, label)
            | Instruction::IfRefCmp(_, label)
            | Instruction::IfNull(label)
            | Instruction::IfNonNull(label)
            | Instruction::Goto(label) => Some(*label),
            _ => None,
        }
    }

    /// Control never falls through to the next instruction.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Instruction::Goto(_) | Instruction::Return(_) | Instruction::Throw
        )
    }

    /// Operand stack words popped and pushed.
    pub fn stack_effect(&self) -> (u16, u16) {
        match self {
            Instruction::Label(_) | Instruction::Goto(_) => (0, 0),
            Instruction::Load(ty, _) => (0, ty.slots()),
            Instruction::Store(ty, _) => (ty.slots(), 0),
            Instruction::ConstNull | Instruction::ConstInt(_) | Instruction::ConstString(_) => {
                (0, 1)
            }
            Instruction::Dup => (1, 2),
            Instruction::Pop => (1, 0),
            Instruction::Swap => (2, 2),
            Instruction::New(_) => (0, 1),
            Instruction::NewArray(_)
            | Instruction::ArrayLength
            | Instruction::CheckCast(_)
            | Instruction::InstanceOf(_) => (1, 1),
            Instruction::ArrayLoad(ty) => (2, ty.slots()),
            Instruction::ArrayStore(ty) => (2 + ty.slots(), 0),
            Instruction::GetField(field) => (1, field.ty.slots()),
            Instruction::PutField(field) => (1 + field.ty.slots(), 0),
            Instruction::GetStatic(field) => (0, field.ty.slots()),
            Instruction::PutStatic(field) => (field.ty.slots(), 0),
            Instruction::Invoke(invoke) => (invoke.argument_words(), invoke.method.proto.ret.slots()),
            Instruction::IntAdd => (2, 1),
            Instruction::IfInt(..) | Instruction::IfNull(_) | Instruction::IfNonNull(_) => (1, 0),
            Instruction::IfIntCmp(..) | Instruction::IfRefCmp(..) => (2, 0),
            Instruction::Return(ty) => (ty.map_or(0, ValueType::slots), 0),
            Instruction::Throw => (1, 0),
        }
    }

    /// Calls `f` on every type the instruction mentions.
    pub fn visit_types(&self, f: &mut dyn FnMut(&TypeRef)) {
        match self {
            Instruction::New(ty)
            | Instruction::NewArray(ty)
            | Instruction::CheckCast(ty)
            | Instruction::InstanceOf(ty) => f(ty),
            Instruction::GetField(field)
            | Instruction::PutField(field)
            | Instruction::GetStatic(field)
            | Instruction::PutStatic(field) => {
                f(&field.holder);
                f(&field.ty);
            }
            Instruction::Invoke(invoke) => {
                f(&invoke.method.holder);
                for ty in invoke.method.proto.types() {
                    f(ty);
                }
            }
            _ => {}
        }
    }

    /// Rewrites every type the instruction mentions.
    pub fn map_types(&mut self, f: &mut dyn FnMut(&TypeRef) -> TypeRef) {
        match self {
            Instruction::New(ty)
            | Instruction::NewArray(ty)
            | Instruction::CheckCast(ty)
            | Instruction::InstanceOf(ty) => *ty = f(ty),
            Instruction::GetField(field)
            | Instruction::PutField(field)
            | Instruction::GetStatic(field)
            | Instruction::PutStatic(field) => *field = field.map_types(f),
            Instruction::Invoke(invoke) => invoke.method = invoke.method.map_types(f),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: Vec<Instruction>,
}

impl Code {
    /// Builds code and computes its stack and locals limits. `argument_slots`
    /// is the number of local slots taken by the receiver and the parameters.
    pub fn new(instructions: Vec<Instruction>, argument_slots: u16) -> Self {
        let mut code = Self {
            max_stack: 0,
            max_locals: 0,
            instructions,
        };
        code.recompute_limits(argument_slots);
        code
    }

    pub fn recompute_limits(&mut self, argument_slots: u16) {
        self.max_stack = compute_max_stack(&self.instructions);
        self.max_locals = self
            .instructions
            .iter()
            .filter_map(|insn| match insn {
                Instruction::Load(ty, index) | Instruction::Store(ty, index) => {
                    Some(index + ty.slots())
                }
                _ => None,
            })
            .fold(argument_slots, u16::max);
    }

    pub fn invokes(&self) -> impl Iterator<Item = &Invoke> {
        self.instructions.iter().filter_map(Instruction::as_invoke)
    }

    /// First label number not bound in this code.
    pub fn next_label(&self) -> u32 {
        self.instructions
            .iter()
            .filter_map(|insn| match insn {
                Instruction::Label(Label(n)) => Some(n + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Maps every bound label to the index of its pseudo instruction.
    pub fn label_offsets(&self) -> HashMap<Label, usize> {
        self.instructions
            .iter()
            .enumerate()
            .filter_map(|(idx, insn)| match insn {
                Instruction::Label(label) => Some((*label, idx)),
                _ => None,
            })
            .collect()
    }
}

/// Straight-line stack height simulation. Heights at branch targets are
/// recorded when the branch is seen and picked up when the label is bound.
fn compute_max_stack(instructions: &[Instruction]) -> u16 {
    let mut heights: HashMap<Label, u16> = HashMap::new();
    let mut height: Option<u16> = Some(0);
    let mut max = 0;
    for insn in instructions {
        if let Instruction::Label(label) = insn {
            height = heights.get(label).copied().or(height).or(Some(0));
            continue;
        }
        let current = height.unwrap_or(0);
        let (pops, pushes) = insn.stack_effect();
        let after = current.saturating_sub(pops) + pushes;
        max = max.max(after).max(current);
        if let Some(target) = insn.branch_target() {
            heights.entry(target).or_insert(after);
        }
        height = if insn.is_terminal() { None } else { Some(after) };
    }
    max
}

/// Accumulates instructions and hands out fresh labels.
#[derive(Debug, Default)]
pub struct CodeBuilder {
    instructions: Vec<Instruction>,
    next_label: u32,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder whose labels do not collide with the labels of `code`.
    pub fn continuing(code: &Code) -> Self {
        Self {
            instructions: Vec::new(),
            next_label: code.next_label(),
        }
    }

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    pub fn push(&mut self, insn: Instruction) -> &mut Self {
        self.instructions.push(insn);
        self
    }

    pub fn bind(&mut self, label: Label) -> &mut Self {
        self.push(Instruction::Label(label))
    }

    pub fn load(&mut self, ty: ValueType, index: u16) -> &mut Self {
        self.push(Instruction::Load(ty, index))
    }

    pub fn invoke(&mut self, invoke: Invoke) -> &mut Self {
        self.push(Instruction::Invoke(invoke))
    }

    pub fn invoke_static(&mut self, method: MethodRef) -> &mut Self {
        self.invoke(Invoke::invoke_static(method))
    }

    /// Loads the arguments of a method taking `params`, starting at local `first`.
    /// Returns the next free local.
    pub fn load_arguments<'t>(
        &mut self,
        params: impl IntoIterator<Item = &'t TypeRef>,
        first: u16,
    ) -> u16 {
        let mut local = first;
        for param in params {
            if let Some(ty) = param.value_type() {
                self.load(ty, local);
                local += ty.slots();
            }
        }
        local
    }

    /// Returns from the method with a value of type `ty` (or nothing for void).
    pub fn return_value(&mut self, ty: &TypeRef) -> &mut Self {
        self.push(Instruction::Return(ty.value_type()))
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    pub fn build(self, argument_slots: u16) -> Code {
        Code::new(self.instructions, argument_slots)
    }
}
