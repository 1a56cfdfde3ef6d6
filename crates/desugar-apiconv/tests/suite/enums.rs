use desugar_apiconv::{ApiConversionPass, ConversionDirection, ConversionError, ConversionOptions};
use desugar_ir::access::{ACC_PUBLIC, ACC_STATIC};
use desugar_ir::{ClassGraph, ClassName, ClassOrigin, SyntheticKind, TypeRef};
use desugar_test_utils::fixtures::{
    self, aload, areturn, invokestatic, ireturn, method, method_ref, program_class,
};
use desugar_test_utils::{Interpreter, Value};
use pretty_assertions::assert_eq;

use super::support::{convert, with_context};

fn days() -> desugar_ir::ClassDef {
    program_class("app.Days")
        .with_method(method(
            "app.Days#echo(Ljava/time/DayOfWeek;)Ljava/time/DayOfWeek;",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                invokestatic(
                    "android.content.TaskQueue#echoDay(Ljava/time/DayOfWeek;)Ljava/time/DayOfWeek;",
                ),
                areturn(),
            ],
        ))
        .with_method(method(
            "app.Days#isMonday(Ljava/time/DayOfWeek;)Z",
            ACC_PUBLIC | ACC_STATIC,
            vec![
                aload(0),
                invokestatic("android.content.TaskQueue#isMonday(Ljava/time/DayOfWeek;)Z"),
                ireturn(),
            ],
        ))
}

#[test]
fn enum_conversion_class_holds_both_directions() {
    let mut graph = fixtures::graph_with([days()]);
    let summary = convert(&mut graph, ConversionOptions::default());
    assert_eq!(
        summary.synthesized(SyntheticKind::EnumConversion),
        [ClassName::new("j$.time.DayOfWeek$-EC")]
    );
    assert!(summary.synthesized(SyntheticKind::Wrapper).is_empty());

    let conversions = graph.class("j$.time.DayOfWeek$-EC").expect("enum conversion class");
    let names: Vec<&str> = conversions.methods.iter().map(|method| method.name()).collect();
    assert_eq!(names, ["convert", "convert"]);
    assert!(conversions.methods.iter().all(|method| method.is_static()));
}

#[test]
fn constants_map_by_name_in_both_directions() {
    let mut graph = fixtures::graph_with([days()]);
    convert(&mut graph, ConversionOptions::default());

    let mut interpreter = Interpreter::new(&graph);
    let echo = method_ref("app.Days#echo(Lj$/time/DayOfWeek;)Lj$/time/DayOfWeek;");
    for constant in fixtures::DAYS {
        let value = interpreter.get_static("j$.time.DayOfWeek", constant).unwrap();
        assert_eq!(
            interpreter.call_static(&echo, vec![value.clone()]),
            Ok(Some(value)),
            "{constant}"
        );
    }

    let is_monday = method_ref("app.Days#isMonday(Lj$/time/DayOfWeek;)Z");
    let monday = interpreter.get_static("j$.time.DayOfWeek", "MONDAY").unwrap();
    let tuesday = interpreter.get_static("j$.time.DayOfWeek", "TUESDAY").unwrap();
    assert_eq!(
        interpreter.call_static(&is_monday, vec![monday]),
        Ok(Some(Value::Int(1)))
    );
    assert_eq!(
        interpreter.call_static(&is_monday, vec![tuesday]),
        Ok(Some(Value::Int(0)))
    );
}

#[test]
fn null_converts_to_null() {
    let mut graph = fixtures::graph_with([days()]);
    convert(&mut graph, ConversionOptions::default());

    let mut interpreter = Interpreter::new(&graph);
    assert_eq!(
        interpreter.call_static(
            &method_ref("app.Days#echo(Lj$/time/DayOfWeek;)Lj$/time/DayOfWeek;"),
            vec![Value::Null]
        ),
        Ok(Some(Value::Null))
    );
}

/// The platform with a desugared `DayOfWeek` that gained a constant.
fn mismatched_days() -> ClassGraph {
    let mut graph = fixtures::platform();
    graph.add_class(fixtures::enum_class(
        &fixtures::desugared(fixtures::DAY_OF_WEEK),
        ClassOrigin::Classpath,
        &["MONDAY", "TUESDAY", "WEDNESDAY", "THURSDAY"],
    ));
    graph
}

#[test]
fn mismatched_constants_are_a_specification_inconsistency() {
    let graph = mismatched_days();
    let spec = fixtures::specification();
    with_context(&graph, &spec, ConversionOptions::default(), |context, _| {
        let result = context.ensure_conversion_method(
            &TypeRef::class(fixtures::DAY_OF_WEEK),
            ConversionDirection::FromVivified,
            None,
        );
        let Err(ConversionError::SpecificationInconsistency(message)) = &result else {
            panic!("expected an inconsistency, got {result:?}");
        };
        assert!(message.contains("THURSDAY"), "{message}");
        assert_eq!(context.synthesized_class_count(), 0);
    });
}

#[test]
fn pass_rejects_mismatched_constants_before_converting() {
    let mut graph = mismatched_days();
    graph.add_class(days());
    let spec = fixtures::specification();
    let rewriter = fixtures::rewriter();
    let result =
        ApiConversionPass::new(&spec, &rewriter, ConversionOptions::default()).run(&mut graph);
    let Err(ConversionError::SpecificationInconsistency(message)) = &result else {
        panic!("expected an inconsistency, got {result:?}");
    };
    assert!(message.contains("j$.time.DayOfWeek"), "{message}");
    assert!(graph.class("j$.time.DayOfWeek$-EC").is_none());
    assert!(graph.class("app.Days$-API-CONV").is_none());
}
