use desugar_apiconv::{
    find_vivified_references, ApiConversionPass, ConversionError, ConversionOptions, Severity,
};
use desugar_config::CompilationMode;
use desugar_ir::access::{ACC_PUBLIC, ACC_STATIC};
use desugar_ir::{ClassDef, ClassGraph, Instruction, TypeRef};
use desugar_test_utils::fixtures::{
    self, aload, areturn, invokestatic, ireturn, lreturn, method, program_class,
};
use pretty_assertions::assert_eq;

use super::support::{convert, fortune, inline_options, run_pass};

/// A handful of program classes touching every kind of conversion.
fn application() -> ClassGraph {
    let mut classes: Vec<ClassDef> = (0..6)
        .map(|index| {
            let name = format!("app.Client{index}");
            program_class(&name)
                .with_method(method(
                    &format!("{name}#echo(Ljava/util/function/Supplier;)Ljava/util/function/Supplier;"),
                    ACC_PUBLIC | ACC_STATIC,
                    vec![
                        aload(0),
                        invokestatic("android.content.TaskQueue#echo(Ljava/util/function/Supplier;)Ljava/util/function/Supplier;"),
                        areturn(),
                    ],
                ))
                .with_method(method(
                    &format!("{name}#isMonday(Ljava/time/DayOfWeek;)Z"),
                    ACC_PUBLIC | ACC_STATIC,
                    vec![
                        aload(0),
                        invokestatic("android.content.TaskQueue#isMonday(Ljava/time/DayOfWeek;)Z"),
                        ireturn(),
                    ],
                ))
                .with_method(method(
                    &format!("{name}#millis(Ljava/time/Clock;)J"),
                    ACC_PUBLIC | ACC_STATIC,
                    vec![
                        aload(0),
                        invokestatic("android.content.TaskQueue#clockMillis(Ljava/time/Clock;)J"),
                        lreturn(),
                    ],
                ))
                .with_method(method(
                    &format!("{name}#count([Ljava/util/function/Supplier;)I"),
                    ACC_PUBLIC | ACC_STATIC,
                    vec![
                        aload(0),
                        invokestatic("android.content.TaskQueue#count([Ljava/util/function/Supplier;)I"),
                        ireturn(),
                    ],
                ))
        })
        .collect();
    classes.push(fortune());
    classes.push(
        fixtures::class("app.LateTask", desugar_ir::ClassOrigin::Program, ACC_PUBLIC)
            .with_super(TypeRef::class(fixtures::TASK))
            .with_method(method(
                "app.LateTask#deadline()Ljava/time/Instant;",
                ACC_PUBLIC,
                vec![Instruction::ConstNull, areturn()],
            )),
    );
    fixtures::graph_with(classes)
}

fn sorted_classes(graph: &ClassGraph) -> Vec<&ClassDef> {
    let mut classes: Vec<&ClassDef> = graph.classes().collect();
    classes.sort_by(|a, b| a.name.cmp(&b.name));
    classes
}

#[test]
fn output_does_not_depend_on_the_worker_count() {
    let mut single = application();
    let single_summary = run_pass(
        &mut single,
        ConversionOptions {
            worker_threads: Some(1),
            ..ConversionOptions::default()
        },
    );
    let mut parallel = application();
    let parallel_summary = run_pass(
        &mut parallel,
        ConversionOptions {
            worker_threads: Some(4),
            ..ConversionOptions::default()
        },
    );
    assert_eq!(single_summary, parallel_summary);
    assert_eq!(sorted_classes(&single), sorted_classes(&parallel));
    assert_eq!(single_summary.callbacks.len(), 1);
    assert_eq!(single_summary.rewritten_methods.len(), 24);
}

#[test]
fn type_lens_removes_every_vivified_reference() {
    for options in [ConversionOptions::default(), inline_options()] {
        let mut graph = application();
        run_pass(&mut graph, options.clone());
        assert!(
            !find_vivified_references(&graph).is_empty(),
            "converted code mentions vivified types before the lens"
        );

        let mut graph = application();
        convert(&mut graph, options);
        let left = find_vivified_references(&graph);
        assert!(left.is_empty(), "{left:?}");
    }
}

#[test]
fn second_run_changes_nothing() {
    for options in [ConversionOptions::default(), inline_options()] {
        let mut graph = application();
        run_pass(&mut graph, options.clone());
        let before: Vec<ClassDef> = sorted_classes(&graph).into_iter().cloned().collect();

        let again = run_pass(&mut graph, options);
        assert!(again.rewritten_methods.is_empty(), "{:?}", again.rewritten_methods);
        assert!(again.callbacks.is_empty());
        assert!(again.synthesized_classes.is_empty());
        let after: Vec<ClassDef> = sorted_classes(&graph).into_iter().cloned().collect();
        assert_eq!(before, after);
    }
}

fn zone_client() -> ClassDef {
    program_class("app.Zones").with_method(method(
        "app.Zones#zone()Ljava/time/ZoneId;",
        ACC_PUBLIC | ACC_STATIC,
        vec![
            invokestatic("android.content.TaskQueue#zone()Ljava/time/ZoneId;"),
            areturn(),
        ],
    ))
}

#[test]
fn unconvertible_types_are_reported_and_left_unconverted() {
    let mut graph = fixtures::graph_with([zone_client()]);
    let summary = run_pass(&mut graph, ConversionOptions::default());
    assert!(summary.rewritten_methods.is_empty());
    assert_eq!(summary.diagnostics.len(), 1);
    assert_eq!(summary.diagnostics[0].severity, Severity::Info);
    assert!(summary.diagnostics[0].message.contains("j$.time.ZoneId"));
}

#[test]
fn unconvertible_types_fail_a_desugared_library_build() {
    let mut graph = fixtures::graph_with([zone_client()]);
    let spec = fixtures::specification();
    let rewriter = fixtures::rewriter();
    let options = ConversionOptions {
        mode: CompilationMode::DesugaredLibrary,
        ..ConversionOptions::default()
    };
    let result = ApiConversionPass::new(&spec, &rewriter, options).run(&mut graph);
    assert!(
        matches!(
            &result,
            Err(ConversionError::UnconvertibleType { ty, .. }) if *ty == TypeRef::class(fixtures::ZONE_ID)
        ),
        "{result:?}"
    );
    assert!(graph.class("app.Zones$-API-CONV").is_none());
}
