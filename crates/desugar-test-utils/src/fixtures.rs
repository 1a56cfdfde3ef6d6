//! A miniature platform library, its desugared counterparts and the machine
//! specification tying them together.
//!
//! Library classes are written with the types the original runtime uses
//! (`java.time.Instant`). Classpath classes under `j$` already use runtime
//! types: the type lens never touches them. Program code is written against
//! the unlensed library types, as a compiler would emit it.

use std::sync::Arc;

use desugar_ir::access::{
    ACC_ABSTRACT, ACC_ENUM, ACC_FINAL, ACC_INTERFACE, ACC_PRIVATE, ACC_PROTECTED, ACC_PUBLIC,
    ACC_STATIC,
};
use desugar_ir::{
    AccessFlags, BaseType, ClassDef, ClassGraph, ClassOrigin, CmpOp, Code, FieldDef, FieldRef,
    Instruction, Invoke, Label, MethodDef, MethodRef, TypeRef, ValueType,
};
use desugar_spec::{MachineSpecification, SpecificationTypeRewriter};

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const SUPPLIER: &str = "java.util.function.Supplier";
pub const FUNCTION: &str = "java.util.function.Function";
pub const UNARY_OPERATOR: &str = "java.util.function.UnaryOperator";
pub const STREAM: &str = "java.util.stream.Stream";
pub const COLLECTION: &str = "java.util.Collection";
pub const ARRAY_LIST: &str = "java.util.ArrayList";
pub const INSTANT: &str = "java.time.Instant";
pub const DAY_OF_WEEK: &str = "java.time.DayOfWeek";
pub const CLOCK: &str = "java.time.Clock";
pub const ZONE_ID: &str = "java.time.ZoneId";
pub const TASK_QUEUE: &str = "android.content.TaskQueue";
pub const TASK: &str = "android.content.Task";
pub const CONSTANT_SUPPLIER: &str = "android.content.ConstantSupplier";
pub const DAY_LISTENER: &str = "android.content.DayListener";
pub const TIME_CONVERSIONS: &str = "j$.time.TimeConversions";
pub const SUPPLIERS: &str = "j$.util.function.Suppliers";

pub const DAYS: [&str; 3] = ["MONDAY", "TUESDAY", "WEDNESDAY"];

const BOXES: [(BaseType, &str, &str); 8] = [
    (BaseType::Boolean, "java.lang.Boolean", "booleanValue"),
    (BaseType::Byte, "java.lang.Byte", "byteValue"),
    (BaseType::Char, "java.lang.Character", "charValue"),
    (BaseType::Short, "java.lang.Short", "shortValue"),
    (BaseType::Int, "java.lang.Integer", "intValue"),
    (BaseType::Long, "java.lang.Long", "longValue"),
    (BaseType::Float, "java.lang.Float", "floatValue"),
    (BaseType::Double, "java.lang.Double", "doubleValue"),
];

/// The desugared name of a class under one of the rewritten prefixes.
pub fn desugared(name: &str) -> String {
    match name.strip_prefix("java.") {
        Some(rest) => format!("j$.{rest}"),
        None => name.to_string(),
    }
}

pub fn specification() -> MachineSpecification {
    MachineSpecification::builder()
        .rewrite_prefix("java.time.", "j$.time.")
        .rewrite_prefix("java.util.function.", "j$.util.function.")
        .rewrite_prefix("java.util.stream.", "j$.util.stream.")
        .wrapper(SUPPLIER)
        .wrapper(FUNCTION)
        .wrapper(UNARY_OPERATOR)
        .subwrapper(FUNCTION, UNARY_OPERATOR)
        .wrapper(STREAM)
        .wrapper(CLOCK)
        .wrapper(DAY_OF_WEEK)
        .custom_conversion(INSTANT, TIME_CONVERSIONS)
        .emulated_interface(COLLECTION, &["stream"])
        .never_outline(method_ref(
            "android.content.TaskQueue#inlineOnly(Ljava/util/function/Supplier;)Ljava/lang/Object;",
        ))
        .backported(method_ref(
            "android.content.TaskQueue#legacy(Ljava/util/function/Supplier;)V",
        ))
        .retargeted(
            method_ref("android.content.TaskQueue#retargeted(Ljava/util/function/Supplier;)V"),
            method_ref("j$.util.function.Suppliers#retargeted(Lj$/util/function/Supplier;)V"),
        )
        .build()
}

pub fn rewriter() -> SpecificationTypeRewriter {
    SpecificationTypeRewriter::new(&specification())
}

/// Library and classpath classes, without any program class.
pub fn platform() -> ClassGraph {
    let library = ClassOrigin::Library;
    let classpath = ClassOrigin::Classpath;
    let mut classes = vec![object(), string()];
    classes.extend(
        BOXES
            .iter()
            .map(|(base, name, unbox)| box_class(*base, name, unbox)),
    );
    classes.extend([
        supplier(SUPPLIER, library),
        supplier(&desugared(SUPPLIER), classpath),
        function(FUNCTION, library),
        function(&desugared(FUNCTION), classpath),
        unary_operator(UNARY_OPERATOR, FUNCTION, library),
        unary_operator(&desugared(UNARY_OPERATOR), &desugared(FUNCTION), classpath),
        stream(STREAM, library),
        stream(&desugared(STREAM), classpath),
        collection(),
        array_list(),
        instant(INSTANT, library),
        instant(&desugared(INSTANT), classpath),
        enum_class(DAY_OF_WEEK, library, &DAYS),
        enum_class(&desugared(DAY_OF_WEEK), classpath, &DAYS),
        clock(CLOCK, INSTANT, library),
        clock(&desugared(CLOCK), &desugared(INSTANT), classpath),
        zone_id(ZONE_ID, library),
        zone_id(&desugared(ZONE_ID), classpath),
        time_conversions(),
        task_queue(),
        task(),
        constant_supplier(),
        day_listener(),
    ]);
    classes.into_iter().collect()
}

/// The platform plus `classes`.
pub fn graph_with(classes: impl IntoIterator<Item = ClassDef>) -> ClassGraph {
    let mut graph = platform();
    for class in classes {
        graph.add_class(class);
    }
    graph
}

pub fn method_ref(text: &str) -> MethodRef {
    MethodRef::parse(text).unwrap_or_else(|err| panic!("invalid fixture method `{text}`: {err}"))
}

pub fn field_ref(holder: &str, name: &str, descriptor: &str) -> FieldRef {
    let ty = TypeRef::from_descriptor(descriptor)
        .unwrap_or_else(|err| panic!("invalid fixture descriptor `{descriptor}`: {err}"));
    FieldRef::new(TypeRef::class(holder), name, ty)
}

/// The descriptor of a class type, `Ljava/lang/Object;` for `java.lang.Object`.
pub fn descriptor(name: &str) -> String {
    TypeRef::class(name).descriptor()
}

pub fn class(name: &str, origin: ClassOrigin, access: u16) -> ClassDef {
    ClassDef::new(name, origin, AccessFlags::new(access))
}

/// A public program class extending `java.lang.Object`.
pub fn program_class(name: &str) -> ClassDef {
    class(name, ClassOrigin::Program, ACC_PUBLIC)
}

pub fn interface(name: &str, origin: ClassOrigin) -> ClassDef {
    class(name, origin, ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
}

/// A method without code: abstract, or provided by the interpreter.
pub fn declared_method(text: &str, access: u16) -> MethodDef {
    MethodDef::new(method_ref(text), AccessFlags::new(access))
}

pub fn method(text: &str, access: u16, instructions: Vec<Instruction>) -> MethodDef {
    let definition = declared_method(text, access);
    let code = Code::new(instructions, definition.argument_slots());
    definition.with_code(code)
}

/// `<init>()V` calling the no-argument constructor of `super_class`.
pub fn default_constructor(holder: &str, super_class: &str) -> MethodDef {
    method(
        &format!("{holder}#<init>()V"),
        ACC_PUBLIC,
        vec![
            aload(0),
            invokespecial(&format!("{super_class}#<init>()V")),
            vreturn(),
        ],
    )
}

pub fn field(holder: &str, name: &str, descriptor: &str, access: u16) -> FieldDef {
    FieldDef::new(field_ref(holder, name, descriptor), AccessFlags::new(access))
}

pub fn aload(index: u16) -> Instruction {
    Instruction::Load(ValueType::Object, index)
}

pub fn iload(index: u16) -> Instruction {
    Instruction::Load(ValueType::Int, index)
}

pub fn lload(index: u16) -> Instruction {
    Instruction::Load(ValueType::Long, index)
}

pub fn areturn() -> Instruction {
    Instruction::Return(Some(ValueType::Object))
}

pub fn ireturn() -> Instruction {
    Instruction::Return(Some(ValueType::Int))
}

pub fn lreturn() -> Instruction {
    Instruction::Return(Some(ValueType::Long))
}

pub fn vreturn() -> Instruction {
    Instruction::Return(None)
}

pub fn ldc(text: &str) -> Instruction {
    Instruction::ConstString(Arc::from(text))
}

pub fn new_object(class: &str) -> Instruction {
    Instruction::New(TypeRef::class(class))
}

pub fn invokestatic(text: &str) -> Instruction {
    Instruction::Invoke(Invoke::invoke_static(method_ref(text)))
}

pub fn invokevirtual(text: &str) -> Instruction {
    Instruction::Invoke(Invoke::invoke_virtual(method_ref(text)))
}

pub fn invokeinterface(text: &str) -> Instruction {
    Instruction::Invoke(Invoke::invoke_interface(method_ref(text)))
}

pub fn invokespecial(text: &str) -> Instruction {
    Instruction::Invoke(Invoke::invoke_special(method_ref(text)))
}

pub fn getfield(holder: &str, name: &str, descriptor: &str) -> Instruction {
    Instruction::GetField(field_ref(holder, name, descriptor))
}

pub fn putfield(holder: &str, name: &str, descriptor: &str) -> Instruction {
    Instruction::PutField(field_ref(holder, name, descriptor))
}

pub fn getstatic(holder: &str, name: &str, descriptor: &str) -> Instruction {
    Instruction::GetStatic(field_ref(holder, name, descriptor))
}

pub fn putstatic(holder: &str, name: &str, descriptor: &str) -> Instruction {
    Instruction::PutStatic(field_ref(holder, name, descriptor))
}

fn object_init() -> Instruction {
    invokespecial("java.lang.Object#<init>()V")
}

fn object() -> ClassDef {
    class(OBJECT, ClassOrigin::Library, ACC_PUBLIC)
        .with_method(declared_method("java.lang.Object#<init>()V", ACC_PUBLIC))
        .with_method(declared_method(
            "java.lang.Object#equals(Ljava/lang/Object;)Z",
            ACC_PUBLIC,
        ))
        .with_method(declared_method("java.lang.Object#hashCode()I", ACC_PUBLIC))
}

fn string() -> ClassDef {
    class(STRING, ClassOrigin::Library, ACC_PUBLIC | ACC_FINAL)
}

fn box_class(base: BaseType, name: &str, unbox: &str) -> ClassDef {
    let primitive = TypeRef::Primitive(base).descriptor();
    let value_type = ValueType::from_base(base);
    class(name, ClassOrigin::Library, ACC_PUBLIC | ACC_FINAL)
        .with_field(field(name, "value", &primitive, ACC_PRIVATE | ACC_FINAL))
        .with_method(method(
            &format!("{name}#<init>({primitive})V"),
            ACC_PRIVATE,
            vec![
                aload(0),
                object_init(),
                aload(0),
                Instruction::Load(value_type, 1),
                putfield(name, "value", &primitive),
                vreturn(),
            ],
        ))
        .with_method(method(
            &format!("{name}#valueOf({primitive}){}", descriptor(name)),
            ACC_PUBLIC | ACC_STATIC,
            vec![
                new_object(name),
                Instruction::Dup,
                Instruction::Load(value_type, 0),
                invokespecial(&format!("{name}#<init>({primitive})V")),
                areturn(),
            ],
        ))
        .with_method(method(
            &format!("{name}#{unbox}(){primitive}"),
            ACC_PUBLIC,
            vec![
                aload(0),
                getfield(name, "value", &primitive),
                Instruction::Return(Some(value_type)),
            ],
        ))
}

fn supplier(name: &str, origin: ClassOrigin) -> ClassDef {
    interface(name, origin).with_method(declared_method(
        &format!("{name}#get()Ljava/lang/Object;"),
        ACC_PUBLIC | ACC_ABSTRACT,
    ))
}

fn function(name: &str, origin: ClassOrigin) -> ClassDef {
    let own = descriptor(name);
    interface(name, origin)
        .with_method(declared_method(
            &format!("{name}#apply(Ljava/lang/Object;)Ljava/lang/Object;"),
            ACC_PUBLIC | ACC_ABSTRACT,
        ))
        .with_method(declared_method(
            &format!("{name}#andThen({own}){own}"),
            ACC_PUBLIC | ACC_ABSTRACT,
        ))
}

fn unary_operator(name: &str, function: &str, origin: ClassOrigin) -> ClassDef {
    interface(name, origin).with_interface(TypeRef::class(function))
}

fn stream(name: &str, origin: ClassOrigin) -> ClassDef {
    let own = descriptor(name);
    interface(name, origin)
        .with_method(declared_method(
            &format!("{name}#count()J"),
            ACC_PUBLIC | ACC_ABSTRACT,
        ))
        .with_method(declared_method(
            &format!("{name}#limit(J){own}"),
            ACC_PUBLIC | ACC_ABSTRACT,
        ))
}

fn collection() -> ClassDef {
    interface(COLLECTION, ClassOrigin::Library)
        .with_method(declared_method(
            "java.util.Collection#size()I",
            ACC_PUBLIC | ACC_ABSTRACT,
        ))
        .with_method(method(
            "java.util.Collection#stream()Ljava/util/stream/Stream;",
            ACC_PUBLIC,
            vec![Instruction::ConstNull, areturn()],
        ))
}

fn array_list() -> ClassDef {
    class(ARRAY_LIST, ClassOrigin::Library, ACC_PUBLIC)
        .with_interface(TypeRef::class(COLLECTION))
        .with_method(default_constructor(ARRAY_LIST, OBJECT))
        .with_method(method(
            "java.util.ArrayList#size()I",
            ACC_PUBLIC,
            vec![Instruction::ConstInt(0), ireturn()],
        ))
}

fn instant(name: &str, origin: ClassOrigin) -> ClassDef {
    let own = descriptor(name);
    class(name, origin, ACC_PUBLIC | ACC_FINAL)
        .with_field(field(name, "seconds", "J", ACC_PRIVATE | ACC_FINAL))
        .with_method(method(
            &format!("{name}#<init>(J)V"),
            ACC_PUBLIC,
            vec![
                aload(0),
                object_init(),
                aload(0),
                lload(1),
                putfield(name, "seconds", "J"),
                vreturn(),
            ],
        ))
        .with_method(method(
            &format!("{name}#getEpochSecond()J"),
            ACC_PUBLIC,
            vec![aload(0), getfield(name, "seconds", "J"), lreturn()],
        ))
        .with_method(method(
            &format!("{name}#ofEpochSecond(J){own}"),
            ACC_PUBLIC | ACC_STATIC,
            vec![
                new_object(name),
                Instruction::Dup,
                lload(0),
                invokespecial(&format!("{name}#<init>(J)V")),
                areturn(),
            ],
        ))
}

/// An enum whose `<clinit>` creates one instance per constant.
pub fn enum_class(name: &str, origin: ClassOrigin, constants: &[&str]) -> ClassDef {
    let own = descriptor(name);
    let mut initializer = Vec::new();
    let mut definition = class(name, origin, ACC_PUBLIC | ACC_FINAL | ACC_ENUM);
    for constant in constants {
        initializer.extend([
            new_object(name),
            Instruction::Dup,
            invokespecial(&format!("{name}#<init>()V")),
            putstatic(name, constant, &own),
        ]);
        definition = definition.with_field(field(
            name,
            constant,
            &own,
            ACC_PUBLIC | ACC_STATIC | ACC_FINAL | ACC_ENUM,
        ));
    }
    initializer.push(vreturn());
    definition
        .with_method(method(
            &format!("{name}#<init>()V"),
            ACC_PRIVATE,
            vec![aload(0), object_init(), vreturn()],
        ))
        .with_method(method(&format!("{name}#<clinit>()V"), ACC_STATIC, initializer))
}

fn clock(name: &str, instant: &str, origin: ClassOrigin) -> ClassDef {
    let instant_descriptor = descriptor(instant);
    class(name, origin, ACC_PUBLIC | ACC_ABSTRACT)
        .with_method(method(
            &format!("{name}#<init>()V"),
            ACC_PROTECTED,
            vec![aload(0), object_init(), vreturn()],
        ))
        .with_method(declared_method(
            &format!("{name}#instant(){instant_descriptor}"),
            ACC_PUBLIC | ACC_ABSTRACT,
        ))
        .with_method(method(
            &format!("{name}#millis()J"),
            ACC_PUBLIC,
            vec![
                aload(0),
                invokevirtual(&format!("{name}#instant(){instant_descriptor}")),
                invokevirtual(&format!("{instant}#getEpochSecond()J")),
                lreturn(),
            ],
        ))
        .with_method(method(
            &format!("{name}#zoneName()Ljava/lang/String;"),
            ACC_PUBLIC | ACC_FINAL,
            vec![ldc("UTC"), areturn()],
        ))
}

fn zone_id(name: &str, origin: ClassOrigin) -> ClassDef {
    class(name, origin, ACC_PUBLIC | ACC_ABSTRACT)
        .with_method(method(
            &format!("{name}#<init>()V"),
            ACC_PROTECTED,
            vec![aload(0), object_init(), vreturn()],
        ))
        .with_method(declared_method(
            &format!("{name}#getId()Ljava/lang/String;"),
            ACC_PUBLIC | ACC_ABSTRACT,
        ))
}

fn time_conversions() -> ClassDef {
    class(TIME_CONVERSIONS, ClassOrigin::Classpath, ACC_PUBLIC | ACC_FINAL)
        .with_method(instant_conversion(&desugared(INSTANT), INSTANT))
        .with_method(instant_conversion(INSTANT, &desugared(INSTANT)))
}

/// `convert(from)to`, copying the epoch second.
fn instant_conversion(from: &str, to: &str) -> MethodDef {
    let non_null = Label(0);
    method(
        &format!(
            "{TIME_CONVERSIONS}#convert({}){}",
            descriptor(from),
            descriptor(to)
        ),
        ACC_PUBLIC | ACC_STATIC,
        vec![
            aload(0),
            Instruction::IfNonNull(non_null),
            Instruction::ConstNull,
            areturn(),
            Instruction::Label(non_null),
            new_object(to),
            Instruction::Dup,
            aload(0),
            invokevirtual(&format!("{from}#getEpochSecond()J")),
            invokespecial(&format!("{to}#<init>(J)V")),
            areturn(),
        ],
    )
}

fn supplier_get(at: u16) -> [Instruction; 3] {
    [
        aload(at),
        invokeinterface("java.util.function.Supplier#get()Ljava/lang/Object;"),
        areturn(),
    ]
}

/// Library entry points taking and returning rewritten types.
fn task_queue() -> ClassDef {
    let day = descriptor(DAY_OF_WEEK);
    let not_monday = Label(0);
    let methods = [
        default_constructor(TASK_QUEUE, OBJECT),
        method(
            "android.content.TaskQueue#submit(Ljava/util/function/Supplier;)Ljava/lang/Object;",
            ACC_PUBLIC,
            supplier_get(1).to_vec(),
        ),
        method(
            "android.content.TaskQueue#schedule(Ljava/util/function/Supplier;J)Ljava/lang/Object;",
            ACC_PUBLIC,
            supplier_get(1).to_vec(),
        ),
        method(
            "android.content.TaskQueue#constant(Ljava/lang/Object;)Ljava/util/function/Supplier;",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                new_object(CONSTANT_SUPPLIER),
                Instruction::Dup,
                aload(0),
                invokespecial("android.content.ConstantSupplier#<init>(Ljava/lang/Object;)V"),
                areturn(),
            ],
        ),
        method(
            "android.content.TaskQueue#isConstant(Ljava/util/function/Supplier;)Z",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                Instruction::InstanceOf(TypeRef::class(CONSTANT_SUPPLIER)),
                ireturn(),
            ],
        ),
        method(
            "android.content.TaskQueue#echo(Ljava/util/function/Supplier;)Ljava/util/function/Supplier;",
            ACC_PUBLIC | ACC_STATIC,
            vec![aload(0), areturn()],
        ),
        method(
            "android.content.TaskQueue#first(Ljava/util/function/Supplier;Ljava/util/function/Supplier;)Ljava/lang/Object;",
            ACC_PUBLIC | ACC_STATIC,
            supplier_get(0).to_vec(),
        ),
        method(
            "android.content.TaskQueue#chain(Ljava/util/function/Supplier;II)Ljava/lang/Object;",
            ACC_PUBLIC | ACC_STATIC,
            supplier_get(0).to_vec(),
        ),
        method(
            "android.content.TaskQueue#inlineOnly(Ljava/util/function/Supplier;)Ljava/lang/Object;",
            ACC_PUBLIC | ACC_STATIC,
            supplier_get(0).to_vec(),
        ),
        method(
            "android.content.TaskQueue#deadlineOf(Landroid/content/Task;)Ljava/time/Instant;",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                invokevirtual("android.content.Task#deadline()Ljava/time/Instant;"),
                areturn(),
            ],
        ),
        method(
            &format!("android.content.TaskQueue#echoDay({day}){day}"),
            ACC_PUBLIC | ACC_STATIC,
            vec![aload(0), areturn()],
        ),
        method(
            &format!("android.content.TaskQueue#isMonday({day})Z"),
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                getstatic(DAY_OF_WEEK, "MONDAY", &day),
                Instruction::IfRefCmp(CmpOp::Ne, not_monday),
                Instruction::ConstInt(1),
                ireturn(),
                Instruction::Label(not_monday),
                Instruction::ConstInt(0),
                ireturn(),
            ],
        ),
        method(
            "android.content.TaskQueue#echoFunction(Ljava/util/function/Function;)Ljava/util/function/Function;",
            ACC_PUBLIC | ACC_STATIC,
            vec![aload(0), areturn()],
        ),
        method(
            "android.content.TaskQueue#isUnary(Ljava/util/function/Function;)Z",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                Instruction::InstanceOf(TypeRef::class(UNARY_OPERATOR)),
                ireturn(),
            ],
        ),
        method(
            "android.content.TaskQueue#andThen(Ljava/util/function/Function;Ljava/util/function/Function;)Ljava/util/function/Function;",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                aload(1),
                invokeinterface("java.util.function.Function#andThen(Ljava/util/function/Function;)Ljava/util/function/Function;"),
                areturn(),
            ],
        ),
        method(
            "android.content.TaskQueue#zone()Ljava/time/ZoneId;",
            ACC_PUBLIC | ACC_STATIC,
            vec![Instruction::ConstNull, areturn()],
        ),
        method(
            "android.content.TaskQueue#count([Ljava/util/function/Supplier;)I",
            ACC_PUBLIC | ACC_STATIC,
            vec![aload(0), Instruction::ArrayLength, ireturn()],
        ),
        method(
            "android.content.TaskQueue#drain(Ljava/util/function/Supplier;)V",
            ACC_PROTECTED,
            vec![vreturn()],
        ),
        method(
            "android.content.TaskQueue#legacy(Ljava/util/function/Supplier;)V",
            ACC_PUBLIC | ACC_STATIC,
            vec![vreturn()],
        ),
        method(
            "android.content.TaskQueue#retargeted(Ljava/util/function/Supplier;)V",
            ACC_PUBLIC | ACC_STATIC,
            vec![vreturn()],
        ),
        method(
            &format!("android.content.TaskQueue#notify(Landroid/content/DayListener;{day})V"),
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                aload(1),
                invokeinterface(&format!("android.content.DayListener#onDay({day})V")),
                vreturn(),
            ],
        ),
        method(
            "android.content.TaskQueue#expiry(Ljava/time/Instant;)J",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                invokevirtual("java.time.Instant#getEpochSecond()J"),
                lreturn(),
            ],
        ),
        method(
            "android.content.TaskQueue#clockMillis(Ljava/time/Clock;)J",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                invokevirtual("java.time.Clock#instant()Ljava/time/Instant;"),
                invokevirtual("java.time.Instant#getEpochSecond()J"),
                lreturn(),
            ],
        ),
    ];
    methods
        .into_iter()
        .fold(class(TASK_QUEUE, ClassOrigin::Library, ACC_PUBLIC), ClassDef::with_method)
}

fn task() -> ClassDef {
    class(TASK, ClassOrigin::Library, ACC_PUBLIC | ACC_ABSTRACT)
        .with_method(default_constructor(TASK, OBJECT))
        .with_method(method(
            "android.content.Task#deadline()Ljava/time/Instant;",
            ACC_PUBLIC,
            vec![Instruction::ConstNull, areturn()],
        ))
        .with_method(method(
            "android.content.Task#created()Ljava/time/Instant;",
            ACC_PUBLIC | ACC_FINAL,
            vec![Instruction::ConstNull, areturn()],
        ))
        .with_method(method(
            "android.content.Task#label()Ljava/lang/String;",
            ACC_PUBLIC,
            vec![ldc("task"), areturn()],
        ))
}

fn constant_supplier() -> ClassDef {
    class(CONSTANT_SUPPLIER, ClassOrigin::Library, ACC_PUBLIC | ACC_FINAL)
        .with_interface(TypeRef::class(SUPPLIER))
        .with_field(field(
            CONSTANT_SUPPLIER,
            "value",
            "Ljava/lang/Object;",
            ACC_PRIVATE | ACC_FINAL,
        ))
        .with_method(method(
            "android.content.ConstantSupplier#<init>(Ljava/lang/Object;)V",
            ACC_PUBLIC,
            vec![
                aload(0),
                object_init(),
                aload(0),
                aload(1),
                putfield(CONSTANT_SUPPLIER, "value", "Ljava/lang/Object;"),
                vreturn(),
            ],
        ))
        .with_method(method(
            "android.content.ConstantSupplier#get()Ljava/lang/Object;",
            ACC_PUBLIC,
            vec![
                aload(0),
                getfield(CONSTANT_SUPPLIER, "value", "Ljava/lang/Object;"),
                areturn(),
            ],
        ))
}

fn day_listener() -> ClassDef {
    interface(DAY_LISTENER, ClassOrigin::Library).with_method(declared_method(
        &format!("android.content.DayListener#onDay({})V", descriptor(DAY_OF_WEEK)),
        ACC_PUBLIC | ACC_ABSTRACT,
    ))
}
