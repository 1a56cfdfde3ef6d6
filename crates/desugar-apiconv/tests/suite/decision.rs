use desugar_apiconv::{ConversionDirection, ConversionError, ConversionOptions, Severity};
use desugar_config::CompilationMode;
use desugar_ir::TypeRef;
use desugar_spec::MachineSpecification;
use desugar_test_utils::fixtures::{self, method_ref};
use pretty_assertions::assert_eq;

use super::support::with_context;

fn zone_call() -> desugar_ir::MethodRef {
    method_ref("android.content.TaskQueue#zone()Ljava/time/ZoneId;")
}

#[test]
fn rewritten_types_with_a_registered_conversion_are_converted() {
    let graph = fixtures::platform();
    let spec = fixtures::specification();
    let invoked = zone_call();
    with_context(&graph, &spec, ConversionOptions::default(), |context, reporter| {
        for name in [fixtures::SUPPLIER, fixtures::INSTANT, fixtures::DAY_OF_WEEK] {
            let ty = TypeRef::class(name);
            assert_eq!(context.should_convert(&ty, None, &invoked), Ok(true), "{name}");
            assert_eq!(
                context.should_convert(&ty.array_of(), None, &invoked),
                Ok(true),
                "{name}[]"
            );
        }
        assert_eq!(
            context.should_convert(&TypeRef::class(fixtures::STRING), None, &invoked),
            Ok(false)
        );
        assert_eq!(context.should_convert(&TypeRef::INT, None, &invoked), Ok(false));
        assert!(reporter.diagnostics().is_empty());
    });
}

#[test]
fn missing_conversion_is_reported_as_info_for_applications() {
    let graph = fixtures::platform();
    let spec = fixtures::specification();
    let invoked = zone_call();
    with_context(&graph, &spec, ConversionOptions::default(), |context, reporter| {
        assert_eq!(
            context.should_convert(&TypeRef::class(fixtures::ZONE_ID), None, &invoked),
            Ok(false)
        );
        let diagnostics = reporter.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Info);
        assert_eq!(
            diagnostics[0].message,
            "Invoke to android.content.TaskQueue#zone may not work correctly at runtime \
             (No conversion registered for type j$.time.ZoneId)."
        );
        assert_eq!(diagnostics[0].position.as_ref(), Some(&invoked));
    });
}

#[test]
fn missing_conversion_is_fatal_for_the_desugared_library() {
    let graph = fixtures::platform();
    let spec = fixtures::specification();
    let invoked = zone_call();
    let options = ConversionOptions {
        mode: CompilationMode::DesugaredLibrary,
        ..ConversionOptions::default()
    };
    with_context(&graph, &spec, options, |context, reporter| {
        let result = context.should_convert(&TypeRef::class(fixtures::ZONE_ID), None, &invoked);
        assert!(
            matches!(&result, Err(ConversionError::UnconvertibleType { context: reported, .. }) if *reported == invoked),
            "{result:?}"
        );
        assert!(reporter.has_errors());
    });
}

#[test]
fn generic_conversion_overrides_the_type_check() {
    let graph = fixtures::platform();
    let spec = fixtures::specification();
    let generic = method_ref("j$.util.Conversions#toObject(Ljava/lang/Object;)Ljava/lang/Object;");
    with_context(&graph, &spec, ConversionOptions::default(), |context, _| {
        let string = TypeRef::class(fixtures::STRING);
        assert_eq!(
            context.should_convert(&string, Some(&generic), &zone_call()),
            Ok(true)
        );
        assert_eq!(
            context.ensure_conversion_method(&string, ConversionDirection::ToVivified, Some(&generic)),
            Ok(generic.clone())
        );
        assert_eq!(context.synthesized_class_count(), 0);
    });
}

#[test]
fn wrapper_conversions_are_synthesized_once() {
    let graph = fixtures::platform();
    let spec = fixtures::specification();
    with_context(&graph, &spec, ConversionOptions::default(), |context, _| {
        let supplier = TypeRef::class(fixtures::SUPPLIER);
        let to = context
            .ensure_conversion_method(&supplier, ConversionDirection::ToVivified, None)
            .unwrap();
        assert_eq!(to.holder, TypeRef::class("j$.util.function.Supplier$-WRP"));
        assert_eq!(&*to.name, "convert");
        assert_eq!(to.proto, ConversionDirection::ToVivified.proto(&supplier));

        let from = context
            .ensure_conversion_method(&supplier, ConversionDirection::FromVivified, None)
            .unwrap();
        assert_eq!(from.holder, TypeRef::class("j$.util.function.Supplier$-V-WRP"));
        assert_eq!(from.proto, ConversionDirection::FromVivified.proto(&supplier));
        assert_eq!(context.synthesized_class_count(), 2);

        let again = context
            .ensure_conversion_method(&supplier, ConversionDirection::ToVivified, None)
            .unwrap();
        assert_eq!(again, to);
        assert_eq!(context.synthesized_class_count(), 2);
    });
}

#[test]
fn custom_conversions_are_referenced_not_synthesized() {
    let graph = fixtures::platform();
    let spec = fixtures::specification();
    with_context(&graph, &spec, ConversionOptions::default(), |context, _| {
        let instant = TypeRef::class(fixtures::INSTANT);
        let conversion = context
            .ensure_conversion_method(&instant, ConversionDirection::FromVivified, None)
            .unwrap();
        assert_eq!(conversion.holder, TypeRef::class(fixtures::TIME_CONVERSIONS));
        assert_eq!(&*conversion.name, "convert");
        assert_eq!(conversion.proto.params, vec![instant.vivified()]);
        assert_eq!(conversion.proto.ret, instant);
        assert_eq!(context.synthesized_class_count(), 0);
    });
}

#[test]
fn arrays_and_enums_get_their_own_holders() {
    let graph = fixtures::platform();
    let spec = fixtures::specification();
    with_context(&graph, &spec, ConversionOptions::default(), |context, _| {
        let suppliers = TypeRef::class(fixtures::SUPPLIER).array_of();
        let array = context
            .ensure_conversion_method(&suppliers, ConversionDirection::ToVivified, None)
            .unwrap();
        assert_eq!(array.holder, TypeRef::class("j$.util.function.Supplier$-AC"));
        assert_eq!(array.proto, ConversionDirection::ToVivified.proto(&suppliers));
        // The element conversion brings the wrapper pair along.
        assert_eq!(context.synthesized_class_count(), 3);

        let day = TypeRef::class(fixtures::DAY_OF_WEEK);
        let enum_conversion = context
            .ensure_conversion_method(&day, ConversionDirection::FromVivified, None)
            .unwrap();
        assert_eq!(enum_conversion.holder, TypeRef::class("j$.time.DayOfWeek$-EC"));
        assert_eq!(enum_conversion.proto, ConversionDirection::FromVivified.proto(&day));
        assert_eq!(context.synthesized_class_count(), 4);
    });
}

#[test]
fn final_wrapper_types_are_a_specification_inconsistency() {
    let graph = fixtures::platform();
    let spec = MachineSpecification::builder()
        .rewrite_prefix("java.time.", "j$.time.")
        .wrapper(fixtures::INSTANT)
        .build();
    with_context(&graph, &spec, ConversionOptions::default(), |context, _| {
        let result = context.ensure_conversion_method(
            &TypeRef::class(fixtures::INSTANT),
            ConversionDirection::ToVivified,
            None,
        );
        assert!(
            matches!(&result, Err(ConversionError::SpecificationInconsistency(_))),
            "{result:?}"
        );
    });
}
