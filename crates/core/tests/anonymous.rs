use std::fs;
use std::path::Path;
use std::rc::Rc;

use stasis_core::ast::AstLocator;
use stasis_core::locators::{AnonymousClassSourceLocator, ClosureSourceLocator};
use stasis_core::{Identifier, IdentifierKind, LocatorError, ReflectionError, Reflector, Value};
use tempfile::tempdir;

const SOURCE: &str = r#"<?php
$logger = new class implements Countable {
    public function count(): int { return 0; }
};

$adder = function (int $by = 5) { return $by; };
$twice = fn($x) => fn($y) => $x + $y;
"#;

fn write_source(dir: &Path) -> std::path::PathBuf {
    let file = dir.join("anonymous.php");
    fs::write(&file, SOURCE).expect("write source");
    file
}

fn anonymous_class() -> Identifier {
    Identifier::class("class@anonymous").expect("anonymous identifier")
}

fn closure() -> Identifier {
    Identifier::function("{closure}").expect("closure identifier")
}

#[test]
fn anonymous_class_is_found_by_line() {
    let dir = tempdir().expect("tempdir");
    let file = write_source(dir.path());
    let locator =
        AnonymousClassSourceLocator::new(&file, 2, Rc::new(AstLocator::new())).expect("locator");
    let reflector = Reflector::new(locator);

    let reflection = reflector.reflect(&anonymous_class()).expect("anonymous class");
    let class = reflection.as_class().expect("a class");
    assert!(class.is_anonymous());
    assert!(class.name().starts_with("class@anonymous"));
    assert!(class.name().contains("anonymous.php:2:"), "name was {}", class.name());
    assert_eq!(class.start_line(), 2);
    assert!(class.method("count").is_some());

    let source = class.located_source();
    let expected = file.to_string_lossy().replace('\\', "/");
    assert_eq!(source.file_name(), Some(expected.as_str()));
}

#[test]
fn anonymous_class_locator_ignores_named_lookups() {
    let dir = tempdir().expect("tempdir");
    let file = write_source(dir.path());
    let locator =
        AnonymousClassSourceLocator::new(&file, 2, Rc::new(AstLocator::new())).expect("locator");
    let reflector = Reflector::new(locator);

    let err = reflector.reflect_class("Countable").expect_err("named class is not answered");
    assert!(err.is_not_found());

    let all = reflector.reflect_all_classes().expect("all classes");
    assert_eq!(all.len(), 1);
    assert!(reflector.reflect_all_functions().expect("functions").is_empty());
}

#[test]
fn closure_is_found_by_line_with_its_defaults() {
    let dir = tempdir().expect("tempdir");
    let file = write_source(dir.path());
    let locator = ClosureSourceLocator::new(&file, 6, Rc::new(AstLocator::new())).expect("locator");
    let reflector = Reflector::new(locator);

    let reflection = reflector.reflect(&closure()).expect("closure");
    let function = reflection.as_function().expect("a function");
    assert!(function.is_closure());
    assert_eq!(function.name(), "{closure}");
    assert_eq!(function.start_line(), 6);
    assert_eq!(function.parameter_names(), vec!["by"]);
    assert_eq!(
        function.parameter_default_value(&reflector, "by").expect("default compiles"),
        Some(Value::Int(5))
    );
}

#[test]
fn nested_arrow_functions_on_one_line_are_ambiguous() {
    let dir = tempdir().expect("tempdir");
    let file = write_source(dir.path());
    let locator = ClosureSourceLocator::new(&file, 7, Rc::new(AstLocator::new())).expect("locator");
    let reflector = Reflector::new(locator);

    match reflector.reflect(&closure()) {
        Err(ReflectionError::Locator(LocatorError::TwoClosuresOnSameLine { line, .. })) => {
            assert_eq!(line, 7)
        }
        other => panic!("expected TwoClosuresOnSameLine, got {other:?}"),
    }
}

#[test]
fn empty_lines_report_nothing_declared() {
    let dir = tempdir().expect("tempdir");
    let file = write_source(dir.path());
    let ast = Rc::new(AstLocator::new());

    let classes = Reflector::new(
        AnonymousClassSourceLocator::new(&file, 5, Rc::clone(&ast)).expect("class locator"),
    );
    match classes.reflect(&anonymous_class()) {
        Err(ReflectionError::Locator(LocatorError::NoAnonymousDeclarationOnLine { file, line })) => {
            assert!(file.ends_with("anonymous.php"));
            assert_eq!(line, 5);
        }
        other => panic!("expected NoAnonymousDeclarationOnLine, got {other:?}"),
    }

    let closures =
        Reflector::new(ClosureSourceLocator::new(&file, 2, ast).expect("closure locator"));
    assert!(matches!(
        closures.reflect(&closure()),
        Err(ReflectionError::Locator(LocatorError::NoClosureOnLine { line: 2, .. }))
    ));
}

#[test]
fn missing_files_are_rejected_up_front() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("missing.php");
    let result = ClosureSourceLocator::new(&missing, 1, Rc::new(AstLocator::new()));
    assert!(matches!(result, Err(LocatorError::LocatedSource(_))));
    assert_eq!(closure().kind(), IdentifierKind::Function);
}
