use desugar_ir::{MethodRef, TypeRef};
use desugar_spec::{MachineSpecification, SpecError, SpecificationTypeRewriter, TypeRewriter};
use pretty_assertions::assert_eq;

const SPEC: &str = r#"{
  "rewrite_prefix": {
    "java.time.": "j$.time.",
    "java.util.function.": "j$.util.function."
  },
  "maintain_type": ["java.time.format.DateTimeFormatter"],
  "wrappers": ["java.util.function.Function", "java.time.DayOfWeek"],
  "custom_conversions": { "java.time.Instant": "j$.time.TimeConversions" },
  "emulated_interfaces": { "java.util.Collection": ["stream", "removeIf"] },
  "never_outline_api": ["java.util.Collection#stream()Ljava/util/stream/Stream;"],
  "support_all_callbacks_from_library": true
}"#;

#[test]
fn loads_specification_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("desugar.json");
    std::fs::write(&path, SPEC).unwrap();

    let spec = MachineSpecification::load_from_path(&path).unwrap();
    assert_eq!(
        spec.wrappers.iter().map(|name| name.as_str()).collect::<Vec<_>>(),
        vec!["java.util.function.Function", "java.time.DayOfWeek"]
    );
    assert!(spec.support_all_callbacks_from_library);
    assert!(spec.is_never_outline(
        &MethodRef::parse("java.util.Collection#stream()Ljava/util/stream/Stream;").unwrap()
    ));

    let rewriter = SpecificationTypeRewriter::new(&spec);
    assert_eq!(
        rewriter.rewrite(&TypeRef::class("java.util.function.Function")),
        TypeRef::class("j$.util.function.Function")
    );
    assert!(!rewriter.has_rewritten_type(&TypeRef::class("java.time.format.DateTimeFormatter")));
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.json");
    let err = MachineSpecification::load_from_path(&path).unwrap_err();
    match err {
        SpecError::Io { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}
