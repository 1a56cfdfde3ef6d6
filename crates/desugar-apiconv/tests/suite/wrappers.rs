use desugar_apiconv::{ConversionDirection, ConversionOptions};
use desugar_ir::access::{ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC};
use desugar_ir::{ClassDef, ClassName, Instruction, Proto, SyntheticKind, TypeRef};
use desugar_test_utils::fixtures::{
    self, aload, areturn, getfield, invokeinterface, invokespecial, invokestatic, invokevirtual,
    ireturn, ldc, lload, lreturn, method, method_ref, new_object, program_class, putfield,
    vreturn,
};
use desugar_test_utils::{Interpreter, Value};
use pretty_assertions::assert_eq;

use super::support::{convert, fortune, with_context};

fn method_names(class: &ClassDef) -> Vec<String> {
    class
        .methods
        .iter()
        .map(|method| format!("{}{}", method.name(), method.proto()))
        .collect()
}

#[test]
fn abstract_class_wrappers_forward_every_non_final_method() {
    let graph = fixtures::platform();
    let spec = fixtures::specification();
    let clock = TypeRef::class(fixtures::CLOCK);
    let classes = with_context(&graph, &spec, ConversionOptions::default(), |context, _| {
        let conversions = context.ensure_wrappers(&clock).unwrap();
        assert_eq!(
            conversions.conversion.holder,
            TypeRef::class("j$.time.Clock$-WRP")
        );
        context.finish().unwrap().classes
    });
    assert_eq!(classes.len(), 2);

    let wrapper = &classes[1];
    assert_eq!(wrapper.name.as_str(), "j$.time.Clock$-WRP");
    assert_eq!(wrapper.synthetic, Some(SyntheticKind::Wrapper));
    assert_eq!(wrapper.super_class, Some(clock.vivified()));
    assert!(wrapper.interfaces.is_empty());
    assert_eq!(wrapper.fields.len(), 1);
    assert_eq!(&*wrapper.fields[0].field.name, "wrappedValue");
    assert_eq!(wrapper.fields[0].field.ty, clock);

    let instant = TypeRef::class(fixtures::INSTANT);
    let forwarded = wrapper
        .lookup_method("instant", &desugar_ir::Proto::new(Vec::new(), instant.vivified()))
        .expect("instant() with the vivified return type");
    assert!(forwarded.code.is_some());
    let names = method_names(wrapper);
    assert!(names.iter().any(|name| name.starts_with("millis")), "{names:?}");
    assert!(names.iter().all(|name| !name.starts_with("zoneName")), "{names:?}");

    let vivified = &classes[0];
    assert_eq!(vivified.name.as_str(), "j$.time.Clock$-V-WRP");
    assert_eq!(vivified.synthetic, Some(SyntheticKind::VivifiedWrapper));
    assert_eq!(vivified.super_class, Some(clock.clone()));
    assert_eq!(vivified.fields[0].field.ty, clock.vivified());
    assert!(vivified
        .lookup_method("instant", &desugar_ir::Proto::new(Vec::new(), instant))
        .is_some());
}

#[test]
fn interface_wrappers_implement_the_interface() {
    let graph = fixtures::platform();
    let spec = fixtures::specification();
    let supplier = TypeRef::class(fixtures::SUPPLIER);
    let classes = with_context(&graph, &spec, ConversionOptions::default(), |context, _| {
        context.ensure_wrappers(&supplier).unwrap();
        context.finish().unwrap().classes
    });
    let names: Vec<&str> = classes.iter().map(|class| class.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "j$.util.function.Supplier$-V-WRP",
            "j$.util.function.Supplier$-WRP"
        ]
    );
    let wrapper = &classes[1];
    assert_eq!(wrapper.super_class, Some(TypeRef::object()));
    assert_eq!(wrapper.interfaces, vec![supplier.vivified()]);
    assert_eq!(
        method_names(wrapper),
        vec![
            "<init>(Ljava/util/function/Supplier;)V",
            "convert(Ljava/util/function/Supplier;)L$-vivified-$/java/util/function/Supplier;",
            "equals(Ljava/lang/Object;)Z",
            "get()Ljava/lang/Object;",
            "hashCode()I",
        ]
    );
}

#[test]
fn wrapping_is_undone_on_the_way_back() {
    let echo = program_class("app.Echo")
        .with_method(method(
            "app.Echo#roundTrip(Ljava/util/function/Supplier;)Ljava/util/function/Supplier;",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                invokestatic("android.content.TaskQueue#echo(Ljava/util/function/Supplier;)Ljava/util/function/Supplier;"),
                areturn(),
            ],
        ))
        .with_method(method(
            "app.Echo#constantSurvives()Z",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                ldc("x"),
                invokestatic("android.content.TaskQueue#constant(Ljava/lang/Object;)Ljava/util/function/Supplier;"),
                invokestatic("android.content.TaskQueue#isConstant(Ljava/util/function/Supplier;)Z"),
                ireturn(),
            ],
        ))
        .with_method(method(
            "app.Echo#constantValue()Ljava/lang/Object;",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                ldc("x"),
                invokestatic("android.content.TaskQueue#constant(Ljava/lang/Object;)Ljava/util/function/Supplier;"),
                invokeinterface("java.util.function.Supplier#get()Ljava/lang/Object;"),
                areturn(),
            ],
        ))
        .with_method(method(
            "app.Echo#submit(Ljava/util/function/Supplier;)Ljava/lang/Object;",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                new_object(fixtures::TASK_QUEUE),
                Instruction::Dup,
                invokespecial("android.content.TaskQueue#<init>()V"),
                aload(0),
                invokevirtual("android.content.TaskQueue#submit(Ljava/util/function/Supplier;)Ljava/lang/Object;"),
                areturn(),
            ],
        ));
    let mut graph = fixtures::graph_with([echo, fortune()]);
    convert(&mut graph, ConversionOptions::default());

    let mut interpreter = Interpreter::new(&graph);
    let supplier = interpreter.instantiate("app.Fortune", "()V", Vec::new()).unwrap();
    let round_trip =
        method_ref("app.Echo#roundTrip(Lj$/util/function/Supplier;)Lj$/util/function/Supplier;");
    assert_eq!(
        interpreter.call_static(&round_trip, vec![supplier.clone()]),
        Ok(Some(supplier.clone()))
    );
    assert_eq!(
        interpreter.call_static(&round_trip, vec![Value::Null]),
        Ok(Some(Value::Null))
    );
    assert_eq!(
        interpreter.call_static(&method_ref("app.Echo#constantSurvives()Z"), Vec::new()),
        Ok(Some(Value::Int(1)))
    );
    assert_eq!(
        interpreter.call_static(&method_ref("app.Echo#constantValue()Ljava/lang/Object;"), Vec::new()),
        Ok(Some(Value::string("x")))
    );
    assert_eq!(
        interpreter.call_static(
            &method_ref("app.Echo#submit(Lj$/util/function/Supplier;)Ljava/lang/Object;"),
            vec![supplier]
        ),
        Ok(Some(Value::string("fortune")))
    );
}

#[test]
fn library_calls_reach_program_overrides_through_a_wrapper() {
    let fixed_clock = fixtures::class(
        "app.FixedClock",
        desugar_ir::ClassOrigin::Program,
        ACC_PUBLIC,
    )
    .with_super(TypeRef::class(fixtures::CLOCK))
    .with_field(fixtures::field("app.FixedClock", "seconds", "J", 0))
    .with_method(method(
        "app.FixedClock#<init>(J)V",
        ACC_PUBLIC,
        vec![
            aload(0),
            invokespecial("java.time.Clock#<init>()V"),
            aload(0),
            lload(1),
            putfield("app.FixedClock", "seconds", "J"),
            vreturn(),
        ],
    ))
    .with_method(method(
        "app.FixedClock#instant()Ljava/time/Instant;",
        ACC_PUBLIC,
        vec![
            aload(0),
            getfield("app.FixedClock", "seconds", "J"),
            invokestatic("java.time.Instant#ofEpochSecond(J)Ljava/time/Instant;"),
            areturn(),
        ],
    ));
    let clocks = program_class("app.Clocks").with_method(method(
        "app.Clocks#millis(Ljava/time/Clock;)J",
        ACC_PUBLIC | ACC_STATIC,
        vec![
            aload(0),
            invokestatic("android.content.TaskQueue#clockMillis(Ljava/time/Clock;)J"),
            lreturn(),
        ],
    ));
    let mut graph = fixtures::graph_with([fixed_clock, clocks]);
    let summary = convert(&mut graph, ConversionOptions::default());
    assert!(summary.callbacks.is_empty());
    assert_eq!(
        summary.synthesized(SyntheticKind::Wrapper),
        [desugar_ir::ClassName::new("j$.time.Clock$-WRP")]
    );

    let mut interpreter = Interpreter::new(&graph);
    let clock = interpreter
        .instantiate("app.FixedClock", "(J)V", vec![Value::Long(42)])
        .unwrap();
    assert_eq!(
        interpreter.call_static(&method_ref("app.Clocks#millis(Lj$/time/Clock;)J"), vec![clock]),
        Ok(Some(Value::Long(42)))
    );
}

/// `holder#name` of every invoke in `name` of the synthesized `class`.
fn forwarded_calls(class: &ClassDef, name: &str, proto: &Proto) -> Vec<String> {
    let method = class
        .lookup_method(name, proto)
        .unwrap_or_else(|| panic!("missing {}#{name}{proto}", class.name));
    method
        .code
        .as_ref()
        .expect("forwarding code")
        .instructions
        .iter()
        .filter_map(Instruction::as_invoke)
        .map(|invoke| format!("{}#{}", invoke.method.holder, invoke.method.name))
        .collect()
}

#[test]
fn self_referential_wrappers_reuse_their_own_conversions() {
    let graph = fixtures::platform();
    let spec = fixtures::specification();
    let function = TypeRef::class(fixtures::FUNCTION);
    let stream = TypeRef::class(fixtures::STREAM);
    let classes = with_context(&graph, &spec, ConversionOptions::default(), |context, _| {
        let first = context.ensure_wrappers(&function).unwrap();
        assert_eq!(context.ensure_wrappers(&function).unwrap(), first);
        assert_eq!(
            context
                .ensure_conversion_method(&function, ConversionDirection::ToVivified, None)
                .unwrap(),
            first.conversion
        );
        context.ensure_wrappers(&stream).unwrap();
        context.finish().unwrap().classes
    });
    let names: Vec<&str> = classes.iter().map(|class| class.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "j$.util.function.Function$-V-WRP",
            "j$.util.function.Function$-WRP",
            "j$.util.function.UnaryOperator$-V-WRP",
            "j$.util.function.UnaryOperator$-WRP",
            "j$.util.stream.Stream$-V-WRP",
            "j$.util.stream.Stream$-WRP",
        ]
    );

    let and_then = Proto::new(vec![function.vivified()], function.vivified());
    assert_eq!(
        forwarded_calls(&classes[1], "andThen", &and_then),
        vec![
            "j$.util.function.Function$-V-WRP#convert",
            "java.util.function.Function#andThen",
            "j$.util.function.Function$-WRP#convert",
        ]
    );
    let and_then = Proto::new(vec![function.clone()], function.clone());
    assert_eq!(
        forwarded_calls(&classes[0], "andThen", &and_then),
        vec![
            "j$.util.function.Function$-WRP#convert",
            "$-vivified-$.java.util.function.Function#andThen",
            "j$.util.function.Function$-V-WRP#convert",
        ]
    );
    let limit = Proto::new(vec![TypeRef::LONG], stream.vivified());
    assert_eq!(
        forwarded_calls(&classes[5], "limit", &limit),
        vec![
            "java.util.stream.Stream#limit",
            "j$.util.stream.Stream$-WRP#convert",
        ]
    );
}

/// A program function answering `apply` with its label; `andThen` hands back
/// the function it is given.
fn labelled(name: &str, interface: &str) -> ClassDef {
    let object = "Ljava/lang/Object;";
    program_class(name)
        .with_interface(TypeRef::class(interface))
        .with_field(fixtures::field(name, "label", object, ACC_PRIVATE))
        .with_method(method(
            &format!("{name}#<init>({object})V"),
            ACC_PUBLIC,
            vec![
                aload(0),
                invokespecial("java.lang.Object#<init>()V"),
                aload(0),
                aload(1),
                putfield(name, "label", object),
                vreturn(),
            ],
        ))
        .with_method(method(
            &format!("{name}#apply({object}){object}"),
            ACC_PUBLIC,
            vec![aload(0), getfield(name, "label", object), areturn()],
        ))
        .with_method(method(
            &format!("{name}#andThen(Ljava/util/function/Function;)Ljava/util/function/Function;"),
            ACC_PUBLIC,
            vec![aload(1), areturn()],
        ))
}

fn functions() -> ClassDef {
    let function = "Ljava/util/function/Function;";
    program_class("app.Functions")
        .with_method(method(
            &format!("app.Functions#then({function}{function}){function}"),
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                aload(1),
                invokestatic(&format!(
                    "android.content.TaskQueue#andThen({function}{function}){function}"
                )),
                areturn(),
            ],
        ))
        .with_method(method(
            &format!("app.Functions#echo({function}){function}"),
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                invokestatic(&format!("android.content.TaskQueue#echoFunction({function}){function}")),
                areturn(),
            ],
        ))
        .with_method(method(
            &format!("app.Functions#isUnary({function})Z"),
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                invokestatic(&format!("android.content.TaskQueue#isUnary({function})Z")),
                ireturn(),
            ],
        ))
}

fn function_graph() -> desugar_ir::ClassGraph {
    fixtures::graph_with([
        labelled("app.Label", fixtures::FUNCTION),
        labelled("app.Twice", fixtures::UNARY_OPERATOR),
        functions(),
    ])
}

#[test]
fn self_referential_forwarding_round_trips_at_runtime() {
    let mut graph = function_graph();
    let summary = convert(&mut graph, ConversionOptions::default());
    assert!(summary.callbacks.is_empty());

    let mut interpreter = Interpreter::new(&graph);
    let first = interpreter
        .instantiate("app.Label", "(Ljava/lang/Object;)V", vec![Value::string("first")])
        .unwrap();
    let second = interpreter
        .instantiate("app.Label", "(Ljava/lang/Object;)V", vec![Value::string("second")])
        .unwrap();
    let then = method_ref(
        "app.Functions#then(Lj$/util/function/Function;Lj$/util/function/Function;)Lj$/util/function/Function;",
    );
    let composed = interpreter
        .call_static(&then, vec![first, second.clone()])
        .unwrap()
        .expect("a function");
    assert_eq!(composed, second, "both wrappers are undone on the way back");
    assert_eq!(
        interpreter.call_virtual(
            &method_ref("j$.util.function.Function#apply(Ljava/lang/Object;)Ljava/lang/Object;"),
            composed,
            vec![Value::Null],
        ),
        Ok(Some(Value::string("second")))
    );
}

#[test]
fn subtype_instances_cross_the_boundary_in_their_own_wrapper() {
    let mut graph = function_graph();
    let summary = convert(&mut graph, ConversionOptions::default());
    assert_eq!(
        summary.synthesized(SyntheticKind::Wrapper),
        [
            ClassName::new("j$.util.function.Function$-WRP"),
            ClassName::new("j$.util.function.UnaryOperator$-WRP"),
        ]
    );

    let mut interpreter = Interpreter::new(&graph);
    let twice = interpreter
        .instantiate("app.Twice", "(Ljava/lang/Object;)V", vec![Value::string("twice")])
        .unwrap();
    let label = interpreter
        .instantiate("app.Label", "(Ljava/lang/Object;)V", vec![Value::string("label")])
        .unwrap();
    let is_unary = method_ref("app.Functions#isUnary(Lj$/util/function/Function;)Z");
    assert_eq!(
        interpreter.call_static(&is_unary, vec![twice.clone()]),
        Ok(Some(Value::Int(1)))
    );
    assert_eq!(
        interpreter.call_static(&is_unary, vec![label.clone()]),
        Ok(Some(Value::Int(0)))
    );

    let echo = method_ref("app.Functions#echo(Lj$/util/function/Function;)Lj$/util/function/Function;");
    assert_eq!(
        interpreter.call_static(&echo, vec![twice.clone()]),
        Ok(Some(twice))
    );
    assert_eq!(
        interpreter.call_static(&echo, vec![label.clone()]),
        Ok(Some(label))
    );
}
