use std::fs;
use std::rc::Rc;

use stasis_core::ast::AstLocator;
use stasis_core::locators::{AggregateSourceLocator, BuiltinStubLocator, StringSourceLocator};
use stasis_core::source::Provenance;
use stasis_core::{Identifier, LocatorError, Reflector, Value};
use tempfile::tempdir;

fn stub_reflector() -> Reflector {
    Reflector::new(BuiltinStubLocator::new(Rc::new(AstLocator::new())).expect("bundled stubs"))
}

#[test]
fn builtin_classes_are_case_insensitive() {
    let reflector = stub_reflector();
    let std_class = reflector.reflect_class("STDCLASS").expect("stdClass");
    assert_eq!(std_class.name(), "stdClass");

    let source = std_class.located_source();
    assert!(source.is_builtin());
    assert_eq!(source.file_name(), None);
    assert_eq!(source.provenance(), &Provenance::BuiltIn { extension: Some("Core".to_string()) });

    let exception = reflector.reflect_class("Exception").expect("Exception");
    assert_eq!(exception.interface_names(), vec!["Throwable"]);
    let throwable = reflector.reflect_class("throwable").expect("Throwable");
    assert!(throwable.is_interface());
    assert_eq!(throwable.interface_names(), vec!["Stringable"]);
}

#[test]
fn builtin_functions_and_constants() {
    let reflector = stub_reflector();
    assert_eq!(reflector.reflect_function("STRLEN").expect("strlen").name(), "strlen");

    assert_eq!(reflector.constant_value("PHP_INT_MIN").expect("PHP_INT_MIN"), Value::Int(i64::MIN));
    assert_eq!(reflector.constant_value("PHP_INT_MAX").expect("PHP_INT_MAX"), Value::Int(i64::MAX));
    assert_eq!(reflector.constant_value("PHP_EOL").expect("PHP_EOL"), Value::from("\n"));
    assert!(reflector.reflect_constant("php_eol").expect_err("constants are exact").is_not_found());

    let json = reflector.reflect_class("JsonSerializable").expect("JsonSerializable");
    assert_eq!(
        json.located_source().provenance(),
        &Provenance::BuiltIn { extension: Some("json".to_string()) }
    );
}

#[test]
fn only_indexed_symbols_are_answered() {
    let ast = Rc::new(AstLocator::new());
    let locator = BuiltinStubLocator::new(ast).expect("bundled stubs");
    assert!(locator.has_stub(&Identifier::class("countable").expect("identifier")));
    assert!(!locator.has_stub(&Identifier::class("ArrayObject").expect("identifier")));
    assert!(!locator.has_stub(&Identifier::constant("php_eol").expect("identifier")));

    let reflector = Reflector::new(locator);
    assert!(reflector.reflect_class("ArrayObject").expect_err("unknown").is_not_found());

    let classes = reflector.reflect_all_classes().expect("all classes");
    assert_eq!(classes.len(), 13);
    let functions = reflector.reflect_all_functions().expect("all functions");
    let mut names: Vec<&str> = functions.iter().map(|function| function.name()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["constant", "count", "define", "strlen"]);
}

#[test]
fn user_code_builds_on_builtins() {
    let ast = Rc::new(AstLocator::new());
    let user = StringSourceLocator::new(
        r#"<?php
namespace App;

class NotFound extends \Exception implements \Countable
{
    const WIDTH = \PHP_INT_SIZE * 2;
    const LINE = PHP_EOL;
}
"#,
        Rc::clone(&ast),
    )
    .expect("user source");
    let reflector = Reflector::new(
        AggregateSourceLocator::default()
            .with(user)
            .with(BuiltinStubLocator::new(ast).expect("bundled stubs")),
    );

    let not_found = reflector.reflect_class("App\\NotFound").expect("NotFound");
    let parent = not_found.parent_class(&reflector).expect("parent lookup").expect("has a parent");
    assert_eq!(parent.name(), "Exception");
    assert!(parent.located_source().is_builtin());
    assert_eq!(not_found.constant_value(&reflector, "WIDTH").expect("WIDTH"), Value::Int(16));
    assert_eq!(not_found.constant_value(&reflector, "LINE").expect("LINE"), Value::from("\n"));

    let interfaces = not_found.interfaces(&reflector).expect("interfaces");
    assert_eq!(interfaces.len(), 1);
    assert_eq!(interfaces[0].name(), "Countable");
}

#[test]
fn stub_directories_need_an_index() {
    let dir = tempdir().expect("tempdir");
    let ast = Rc::new(AstLocator::new());

    let missing = dir.path().join("missing");
    assert!(matches!(
        BuiltinStubLocator::from_directory(&missing, Rc::clone(&ast)),
        Err(LocatorError::InvalidDirectory { .. })
    ));
    assert!(matches!(
        BuiltinStubLocator::from_directory(dir.path(), Rc::clone(&ast)),
        Err(LocatorError::MissingStubIndex { .. })
    ));

    fs::write(dir.path().join("index.json"), "{ broken").expect("write index");
    assert!(matches!(
        BuiltinStubLocator::from_directory(dir.path(), Rc::clone(&ast)),
        Err(LocatorError::FailedToParseJson { .. })
    ));
}

#[test]
fn stub_directories_are_read_on_demand() {
    let dir = tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("ext")).expect("mkdir");
    fs::write(
        dir.path().join("index.json"),
        r#"{"classes": {"Redis": {"file": "ext/redis.php", "extension": "redis"}},
            "constants": {"REDIS_VERSION": {"file": "ext/redis.php"}}}"#,
    )
    .expect("write index");
    fs::write(
        dir.path().join("ext/redis.php"),
        "<?php\nclass Redis { const OPT = 1; }\nclass NotIndexed {}\nconst REDIS_VERSION = '6.0';\n",
    )
    .expect("write stub");

    let locator =
        BuiltinStubLocator::from_directory(dir.path(), Rc::new(AstLocator::new())).expect("stubs");
    let reflector = Reflector::new(locator);
    let redis = reflector.reflect_class("redis").expect("Redis");
    assert_eq!(redis.constant_value(&reflector, "OPT").expect("OPT"), Value::Int(1));
    assert_eq!(reflector.constant_value("REDIS_VERSION").expect("version"), Value::from("6.0"));
    assert!(reflector.reflect_class("NotIndexed").expect_err("unindexed").is_not_found());

    let classes = reflector.reflect_all_classes().expect("all classes");
    assert_eq!(classes.len(), 1);
}
