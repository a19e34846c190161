use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use stasis_core::ast::AstLocator;
use stasis_core::locators::{
    AggregateSourceLocator, AutoloadHost, AutoloadSourceLocator, EvaluatedCodeSourceLocator,
    RegisteredAutoloaders,
};
use stasis_core::{IdentifierKind, Reflector, Value};
use tempfile::tempdir;

/// A host whose only autoloader includes `<dir>/<Class>.php`.
fn host_for(dir: &Path) -> RegisteredAutoloaders {
    let dir = dir.to_path_buf();
    RegisteredAutoloaders::new()
        .with_autoloader(move |class, access| access.include(&dir.join(format!("{class}.php"))))
}

fn write_class(dir: &Path, class: &str) -> PathBuf {
    let path = dir.join(format!("{class}.php"));
    fs::write(&path, format!("<?php\nclass {class}\n{{\n    const ORIGIN = '{class}';\n}}\n"))
        .expect("write class file");
    path
}

#[test]
fn probing_finds_the_file_without_loading_it() {
    let dir = tempdir().expect("tempdir");
    let path = write_class(dir.path(), "Lazy");
    let host = Rc::new(host_for(dir.path()));
    let reflector =
        Reflector::new(AutoloadSourceLocator::new(Rc::clone(&host), Rc::new(AstLocator::new())));

    let class = reflector.reflect_class("Lazy").expect("Lazy through the autoloader");
    assert_eq!(class.name(), "Lazy");
    let expected = path.to_string_lossy().replace('\\', "/");
    assert_eq!(class.located_source().file_name(), Some(expected.as_str()));

    assert!(!host.is_live(IdentifierKind::Class, "Lazy"));
    assert!(host.included_files().is_empty());
    assert!(!host.file_access().is_probing());
}

#[test]
fn live_classes_use_their_declaring_file() {
    let dir = tempdir().expect("tempdir");
    let path = write_class(dir.path(), "Eager");
    let host = Rc::new(host_for(dir.path()));

    assert!(host.load_class("Eager"));
    assert!(host.is_live(IdentifierKind::Class, "eager"));
    assert_eq!(host.included_files(), vec![path.clone()]);
    assert_eq!(host.declaring_file(IdentifierKind::Class, "Eager"), Some(path));

    let reflector =
        Reflector::new(AutoloadSourceLocator::new(Rc::clone(&host), Rc::new(AstLocator::new())));
    let class = reflector.reflect_class("Eager").expect("Eager");
    assert_eq!(class.constant_value(&reflector, "ORIGIN").expect("ORIGIN"), Value::from("Eager"));
    assert_eq!(host.included_files().len(), 1);
}

#[test]
fn unknown_classes_are_not_found() {
    let dir = tempdir().expect("tempdir");
    let host = Rc::new(host_for(dir.path()));
    let reflector =
        Reflector::new(AutoloadSourceLocator::new(Rc::clone(&host), Rc::new(AstLocator::new())));

    assert!(reflector.reflect_class("Ghost").expect_err("no file").is_not_found());
    assert!(reflector.reflect_all_classes().expect("all classes").is_empty());
    assert!(!host.load_class("Ghost"));
}

#[test]
fn aliases_resolve_to_the_target_declaration() {
    let dir = tempdir().expect("tempdir");
    write_class(dir.path(), "Target");
    let host = Rc::new(host_for(dir.path()).with_alias("Legacy\\OldName", "Target"));
    let reflector =
        Reflector::new(AutoloadSourceLocator::new(Rc::clone(&host), Rc::new(AstLocator::new())));

    let class = reflector.reflect_class("Legacy\\OldName").expect("alias");
    assert_eq!(class.name(), "Target");
    assert!(reflector.reflect_class("legacy\\oldname").is_ok());
    let source = class.located_source();
    assert_eq!(source.alias(), Some("Legacy\\OldName"));
    assert_eq!(source.declared_name(), Some("Target"));
    assert!(!host.is_live(IdentifierKind::Class, "Target"));
}

#[test]
fn functions_and_constants_come_from_declaring_files_only() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("functions.php");
    fs::write(&path, "<?php\nnamespace Lib;\nfunction helper() {}\nconst LIMIT = 10;\n")
        .expect("write functions");
    let host = Rc::new(host_for(dir.path()));
    let reflector =
        Reflector::new(AutoloadSourceLocator::new(Rc::clone(&host), Rc::new(AstLocator::new())));

    assert!(reflector.reflect_function("Lib\\helper").expect_err("not live").is_not_found());

    host.declare_live(IdentifierKind::Function, "Lib\\helper", Some(path.clone()));
    host.declare_live(IdentifierKind::Constant, "Lib\\LIMIT", Some(path));
    assert_eq!(reflector.reflect_function("lib\\HELPER").expect("helper").name(), "Lib\\helper");
    assert_eq!(reflector.constant_value("Lib\\LIMIT").expect("LIMIT"), Value::Int(10));

    host.declare_live(IdentifierKind::Function, "strlen", None);
    assert!(reflector.reflect_function("strlen").expect_err("engine function").is_not_found());
}

#[test]
fn evaluated_code_is_reflected_from_kept_source() {
    let host = Rc::new(
        RegisteredAutoloaders::new()
            .with_evaluated(IdentifierKind::Class, "Generated\\Proxy", "<?php namespace Generated; class Proxy {}")
            .with_evaluated(IdentifierKind::Function, "made_up", "<?php function made_up($x = 3) {}"),
    );
    let ast = Rc::new(AstLocator::new());
    let reflector = Reflector::new(
        AggregateSourceLocator::default()
            .with(EvaluatedCodeSourceLocator::new(Rc::clone(&host), Rc::clone(&ast)))
            .with(AutoloadSourceLocator::new(Rc::clone(&host), ast)),
    );

    let proxy = reflector.reflect_class("Generated\\Proxy").expect("Proxy");
    assert!(proxy.located_source().is_evaluated());
    assert_eq!(proxy.located_source().file_name(), None);
    assert!(host.is_live(IdentifierKind::Class, "Generated\\Proxy"));

    let made_up = reflector.reflect_function("made_up").expect("made_up");
    assert_eq!(made_up.parameter_default_value(&reflector, "x").expect("x"), Some(Value::Int(3)));

    assert!(reflector.reflect_all_classes().expect("all").is_empty());
}
