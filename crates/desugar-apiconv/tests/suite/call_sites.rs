use desugar_apiconv::{ConversionOptions, Severity};
use desugar_ir::access::{ACC_PUBLIC, ACC_STATIC};
use desugar_ir::{ClassName, Instruction, Invoke, InvokeKind, SyntheticKind, TypeRef};
use desugar_test_utils::fixtures::{
    self, aload, areturn, invokeinterface, invokestatic, invokevirtual, lload, method, method_ref,
    program_class, vreturn,
};
use desugar_test_utils::{Interpreter, Value};
use pretty_assertions::assert_eq;

use super::support::{convert, fortune, inline_options, instructions, invoked, run_pass};

const ECHO: &str =
    "android.content.TaskQueue#echo(Ljava/util/function/Supplier;)Ljava/util/function/Supplier;";
const TO_VIVIFIED: &str = "j$.util.function.Supplier$-WRP#convert";
const FROM_VIVIFIED: &str = "j$.util.function.Supplier$-V-WRP#convert";

fn echo_caller(name: &str) -> desugar_ir::MethodDef {
    method(
        &format!(
            "app.Caller#{name}(Ljava/util/function/Supplier;)Ljava/util/function/Supplier;"
        ),
        ACC_PUBLIC | ACC_STATIC,
        vec![aload(0), invokestatic(ECHO), areturn()],
    )
}

#[test]
fn outlined_helpers_are_numbered_per_caller_and_shared() {
    let caller = program_class("app.Caller")
        .with_method(echo_caller("run"))
        .with_method(echo_caller("again"))
        .with_method(method(
            "app.Caller#submit(Landroid/content/TaskQueue;Ljava/util/function/Supplier;)Ljava/lang/Object;",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                aload(1),
                invokevirtual("android.content.TaskQueue#submit(Ljava/util/function/Supplier;)Ljava/lang/Object;"),
                areturn(),
            ],
        ));
    let mut graph = fixtures::graph_with([caller]);
    let summary = run_pass(&mut graph, ConversionOptions::default());
    assert_eq!(
        summary.synthesized(SyntheticKind::ApiConversion),
        [ClassName::new("app.Caller$-API-CONV")]
    );
    assert_eq!(summary.rewritten_methods.len(), 3);

    let run = invoked(&graph, "app.Caller", "run");
    assert_eq!(run.len(), 1);
    assert!(run[0].starts_with("app.Caller$-API-CONV#apiConversion$"), "{run:?}");
    assert_eq!(invoked(&graph, "app.Caller", "again"), run);
    let submit = invoked(&graph, "app.Caller", "submit");
    assert_eq!(submit.len(), 1);
    assert_ne!(submit, run);

    let helpers = graph.class("app.Caller$-API-CONV").expect("helper class");
    let names: Vec<&str> = helpers.methods.iter().map(|method| method.name()).collect();
    assert_eq!(names, ["apiConversion$0", "apiConversion$1"]);
    assert!(helpers.methods.iter().all(|method| method.is_static()));
    let with_receiver = helpers
        .methods
        .iter()
        .find(|method| method.proto().arity() == 2)
        .expect("helper taking the receiver");
    assert_eq!(
        with_receiver.proto().params,
        vec![
            TypeRef::class(fixtures::TASK_QUEUE),
            TypeRef::class(fixtures::SUPPLIER)
        ]
    );
    let body: Vec<String> = with_receiver
        .code
        .as_ref()
        .expect("helper code")
        .instructions
        .iter()
        .filter_map(Instruction::as_invoke)
        .map(|invoke| format!("{}#{}", invoke.method.holder, invoke.method.name))
        .collect();
    assert_eq!(body, [TO_VIVIFIED, "android.content.TaskQueue#submit"]);
    assert_eq!(
        submit[0],
        format!("app.Caller$-API-CONV#{}", with_receiver.name())
    );
}

#[test]
fn constructors_convert_inline() {
    let holder = program_class("app.Holder").with_method(method(
        "app.Holder#<init>(Ljava/util/function/Supplier;)V",
        ACC_PUBLIC,
        vec![
            aload(0),
            fixtures::invokespecial("java.lang.Object#<init>()V"),
            aload(1),
            invokestatic(ECHO),
            Instruction::Pop,
            vreturn(),
        ],
    ));
    let mut graph = fixtures::graph_with([holder]);
    let summary = run_pass(&mut graph, ConversionOptions::default());
    assert!(summary.synthesized(SyntheticKind::ApiConversion).is_empty());
    assert_eq!(
        invoked(&graph, "app.Holder", "<init>"),
        [
            "java.lang.Object#<init>",
            TO_VIVIFIED,
            "android.content.TaskQueue#echo",
            FROM_VIVIFIED
        ]
    );
}

#[test]
fn never_outline_methods_convert_inline() {
    let caller = program_class("app.Inline").with_method(method(
        "app.Inline#run(Ljava/util/function/Supplier;)Ljava/lang/Object;",
        ACC_PUBLIC | ACC_STATIC,
        vec![
            aload(0),
            invokestatic("android.content.TaskQueue#inlineOnly(Ljava/util/function/Supplier;)Ljava/lang/Object;"),
            areturn(),
        ],
    ));
    let mut graph = fixtures::graph_with([caller]);
    let summary = run_pass(&mut graph, ConversionOptions::default());
    assert!(summary.synthesized(SyntheticKind::ApiConversion).is_empty());
    assert_eq!(
        invoked(&graph, "app.Inline", "run"),
        [TO_VIVIFIED, "android.content.TaskQueue#inlineOnly"]
    );
}

#[test]
fn last_two_parameters_are_converted_with_swaps() {
    let swapper = program_class("app.Swapper").with_method(method(
        "app.Swapper#first(Ljava/util/function/Supplier;Ljava/util/function/Supplier;)Ljava/lang/Object;",
        ACC_PUBLIC | ACC_STATIC,
        vec![
            aload(0),
            aload(1),
            invokestatic("android.content.TaskQueue#first(Ljava/util/function/Supplier;Ljava/util/function/Supplier;)Ljava/lang/Object;"),
            areturn(),
        ],
    ));
    let mut graph = fixtures::graph_with([swapper, fortune()]);
    let summary = convert(&mut graph, inline_options());
    assert!(summary.synthesized(SyntheticKind::ApiConversion).is_empty());
    assert!(summary
        .synthesized(SyntheticKind::ApiConversionParameters)
        .is_empty());
    let swaps = instructions(&graph, "app.Swapper", "first")
        .iter()
        .filter(|insn| **insn == Instruction::Swap)
        .count();
    assert_eq!(swaps, 2);

    let mut interpreter = Interpreter::new(&graph);
    let a = interpreter.instantiate("app.Fortune", "()V", Vec::new()).unwrap();
    let b = interpreter.instantiate("app.Fortune", "()V", Vec::new()).unwrap();
    assert_eq!(
        interpreter.call_static(
            &method_ref("app.Swapper#first(Lj$/util/function/Supplier;Lj$/util/function/Supplier;)Ljava/lang/Object;"),
            vec![a, b]
        ),
        Ok(Some(Value::string("fortune")))
    );
}

#[test]
fn deep_parameters_go_through_an_object_array() {
    let chain = program_class("app.Chain")
        .with_method(method(
            "app.Chain#run(Ljava/util/function/Supplier;)Ljava/lang/Object;",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                Instruction::ConstInt(1),
                Instruction::ConstInt(2),
                invokestatic("android.content.TaskQueue#chain(Ljava/util/function/Supplier;II)Ljava/lang/Object;"),
                areturn(),
            ],
        ))
        .with_method(method(
            "app.Chain#later(Landroid/content/TaskQueue;Ljava/util/function/Supplier;J)Ljava/lang/Object;",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                aload(1),
                lload(2),
                invokevirtual("android.content.TaskQueue#schedule(Ljava/util/function/Supplier;J)Ljava/lang/Object;"),
                areturn(),
            ],
        ));
    let mut graph = fixtures::graph_with([chain, fortune()]);
    let summary = convert(&mut graph, inline_options());
    assert_eq!(
        summary.synthesized(SyntheticKind::ApiConversion),
        [ClassName::new("app.Chain$-API-CONV")]
    );
    let helpers = graph.class("app.Chain$-API-CONV").expect("helper class");
    let names: Vec<&str> = helpers.methods.iter().map(|method| method.name()).collect();
    assert_eq!(names, ["apiConversionParameters$0", "apiConversionParameters$1"]);

    let run = invoked(&graph, "app.Chain", "run");
    assert_eq!(run.len(), 4, "{run:?}");
    assert!(run[0].starts_with("app.Chain$-API-CONV#apiConversionParameters$"));
    assert_eq!(
        run[1..].to_vec(),
        [
            "java.lang.Integer#intValue",
            "java.lang.Integer#intValue",
            "android.content.TaskQueue#chain"
        ]
    );
    let later = invoked(&graph, "app.Chain", "later");
    assert_eq!(later[1..].to_vec(), ["java.lang.Long#longValue", "android.content.TaskQueue#schedule"]);

    let mut interpreter = Interpreter::new(&graph);
    let supplier = interpreter.instantiate("app.Fortune", "()V", Vec::new()).unwrap();
    assert_eq!(
        interpreter.call_static(
            &method_ref("app.Chain#run(Lj$/util/function/Supplier;)Ljava/lang/Object;"),
            vec![supplier.clone()]
        ),
        Ok(Some(Value::string("fortune")))
    );
    let queue = interpreter
        .instantiate(fixtures::TASK_QUEUE, "()V", Vec::new())
        .unwrap();
    assert_eq!(
        interpreter.call_static(
            &method_ref("app.Chain#later(Landroid/content/TaskQueue;Lj$/util/function/Supplier;J)Ljava/lang/Object;"),
            vec![queue, supplier, Value::Long(5)]
        ),
        Ok(Some(Value::string("fortune")))
    );
}

#[test]
fn calls_handled_elsewhere_are_left_alone() {
    let skips = program_class("app.Skips")
        .with_method(method(
            "app.Skips#get(Ljava/util/function/Supplier;)Ljava/lang/Object;",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                invokeinterface("java.util.function.Supplier#get()Ljava/lang/Object;"),
                areturn(),
            ],
        ))
        .with_method(method(
            "app.Skips#stream(Ljava/util/ArrayList;)Ljava/util/stream/Stream;",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                invokevirtual("java.util.ArrayList#stream()Ljava/util/stream/Stream;"),
                areturn(),
            ],
        ))
        .with_method(method(
            "app.Skips#collectionStream(Ljava/util/Collection;)Ljava/util/stream/Stream;",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                invokeinterface("java.util.Collection#stream()Ljava/util/stream/Stream;"),
                areturn(),
            ],
        ))
        .with_method(method(
            "app.Skips#legacy(Ljava/util/function/Supplier;)V",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                invokestatic("android.content.TaskQueue#legacy(Ljava/util/function/Supplier;)V"),
                vreturn(),
            ],
        ))
        .with_method(method(
            "app.Skips#retargeted(Ljava/util/function/Supplier;)V",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                invokestatic("android.content.TaskQueue#retargeted(Ljava/util/function/Supplier;)V"),
                vreturn(),
            ],
        ));
    let mut graph = fixtures::graph_with([skips]);
    let summary = run_pass(&mut graph, ConversionOptions::default());
    assert!(summary.rewritten_methods.is_empty(), "{:?}", summary.rewritten_methods);
    assert!(summary.synthesized_classes.is_empty());
    assert!(summary.diagnostics.is_empty());
}

#[test]
fn super_calls_convert_inline() {
    let worker = program_class("app.Worker")
        .with_super(TypeRef::class(fixtures::TASK_QUEUE))
        .with_method(method(
            "app.Worker#flush(Ljava/util/function/Supplier;)V",
            ACC_PUBLIC,
            vec![
                aload(0),
                aload(1),
                Instruction::Invoke(Invoke::new(
                    InvokeKind::Super,
                    method_ref("android.content.TaskQueue#drain(Ljava/util/function/Supplier;)V"),
                    false,
                )),
                vreturn(),
            ],
        ));
    let mut graph = fixtures::graph_with([worker]);
    let summary = run_pass(&mut graph, ConversionOptions::default());
    assert!(summary.synthesized(SyntheticKind::ApiConversion).is_empty());
    assert_eq!(
        invoked(&graph, "app.Worker", "flush"),
        [TO_VIVIFIED, "android.content.TaskQueue#drain"]
    );
    let drain = instructions(&graph, "app.Worker", "flush")
        .iter()
        .filter_map(Instruction::as_invoke)
        .last()
        .expect("drain call");
    assert_eq!(drain.kind, InvokeKind::Super);
    assert_eq!(
        drain.method.proto.params,
        vec![TypeRef::class(fixtures::SUPPLIER).vivified()]
    );
}

#[test]
fn tracked_conversions_are_reported() {
    let caller = program_class("app.Caller").with_method(echo_caller("run"));
    let mut graph = fixtures::graph_with([caller]);
    let options = ConversionOptions {
        track_api_conversions: true,
        ..ConversionOptions::default()
    };
    let summary = run_pass(&mut graph, options);
    assert_eq!(summary.tracked_conversions, vec![method_ref(ECHO)]);
    assert!(summary.tracked_callbacks.is_empty());
    let warnings: Vec<&str> = summary
        .diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.severity == Severity::Warning)
        .map(|diagnostic| diagnostic.message.as_str())
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("Tracked desugared API conversions: "));
    assert!(warnings[0].ends_with(ECHO), "{}", warnings[0]);
}
