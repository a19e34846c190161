use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;
use stasis_core::ast::AstLocator;
use stasis_core::locators::composer::{
    for_composer_json, for_composer_json_and_installed_json, for_installed_json,
};
use stasis_core::locators::{
    DirectoriesSourceLocator, FileListSourceLocator, Psr0Mapping, Psr4Mapping,
    PsrAutoloaderLocator, PsrMapping, SingleFileSourceLocator,
};
use stasis_core::{Identifier, LocatorError, Reflector};
use tempfile::tempdir;

fn write(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}

fn class_names(reflector: &Reflector) -> Vec<String> {
    reflector
        .reflect_all_classes()
        .expect("all classes")
        .iter()
        .map(|class| class.name().to_string())
        .collect()
}

#[test]
fn single_file_locator_reads_lazily_and_reports_missing_files() -> Result<()> {
    let dir = tempdir()?;
    let file = dir.path().join("one.php");
    write(&file, "<?php class One {} function one() {}")?;

    let locator = SingleFileSourceLocator::new(&file, Rc::new(AstLocator::new()))?;
    assert_eq!(locator.path(), file.as_path());
    let reflector = Reflector::new(locator);
    assert_eq!(reflector.reflect_class("one")?.name(), "One");
    assert_eq!(reflector.reflect_function("ONE")?.name(), "one");

    let missing = SingleFileSourceLocator::new(dir.path().join("nope.php"), Rc::new(AstLocator::new()));
    assert!(matches!(missing, Err(LocatorError::LocatedSource(_))));
    Ok(())
}

#[test]
fn file_list_searches_in_order() -> Result<()> {
    let dir = tempdir()?;
    let first = dir.path().join("first.php");
    let second = dir.path().join("second.php");
    write(&first, "<?php namespace First; class Shared {} class OnlyFirst {}")?;
    write(&second, "<?php namespace First; class Shared { const FROM = 2; } class OnlySecond {}")?;

    let locator =
        FileListSourceLocator::new([first.clone(), second.clone()], Rc::new(AstLocator::new()))?;
    assert_eq!(locator.paths().collect::<Vec<_>>(), vec![first.as_path(), second.as_path()]);
    let reflector = Reflector::new(locator);

    let shared = reflector.reflect_class("First\\Shared")?;
    assert!(shared.constant_names().is_empty());
    assert!(reflector.reflect_class("First\\OnlySecond").is_ok());
    assert_eq!(
        class_names(&reflector),
        vec!["First\\Shared", "First\\OnlyFirst", "First\\Shared", "First\\OnlySecond"]
    );
    Ok(())
}

#[test]
fn directories_are_shallow_unless_recursive() -> Result<()> {
    let dir = tempdir()?;
    write(&dir.path().join("b.php"), "<?php class B {}")?;
    write(&dir.path().join("a.php"), "<?php class A {}")?;
    write(&dir.path().join("notes.txt"), "class NotPhp {}")?;
    write(&dir.path().join("nested/deep/c.php"), "<?php class C {}")?;

    let shallow = Reflector::new(DirectoriesSourceLocator::new([dir.path()], Rc::new(AstLocator::new()))?);
    assert_eq!(class_names(&shallow), vec!["A", "B"]);
    assert!(shallow.reflect_class("C").expect_err("nested is skipped").is_not_found());

    let recursive =
        DirectoriesSourceLocator::recursive([dir.path()], Rc::new(AstLocator::new()))?;
    assert_eq!(
        recursive.roots(),
        &[
            dir.path().to_path_buf(),
            dir.path().join("nested"),
            dir.path().join("nested/deep"),
        ]
    );
    let recursive = Reflector::new(recursive);
    assert_eq!(class_names(&recursive), vec!["A", "B", "C"]);
    assert_eq!(recursive.reflect_class("c")?.name(), "C");
    Ok(())
}

#[test]
fn latin1_files_are_readable_and_do_not_hide_their_neighbours() -> Result<()> {
    let dir = tempdir()?;
    let legacy = dir.path().join("Legacy.php");
    let mut bytes = b"<?php\n// Auteur: Fran".to_vec();
    bytes.push(0xE7);
    bytes.extend_from_slice(b"ois\nclass Legacy { const NAME = 'legacy'; }\n");
    fs::write(&legacy, bytes)?;
    write(&dir.path().join("Other.php"), "<?php class Other {}")?;

    let single = Reflector::new(SingleFileSourceLocator::new(&legacy, Rc::new(AstLocator::new()))?);
    let class = single.reflect_class("Legacy")?;
    assert_eq!(class.constant_value(&single, "NAME")?, stasis_core::Value::from("legacy"));

    let tree = Reflector::new(DirectoriesSourceLocator::new([dir.path()], Rc::new(AstLocator::new()))?);
    assert_eq!(tree.reflect_class("Other")?.name(), "Other");
    assert_eq!(tree.reflect_class("Legacy")?.name(), "Legacy");
    Ok(())
}

#[test]
fn directories_must_exist() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("missing");
    let result = DirectoriesSourceLocator::new([missing], Rc::new(AstLocator::new()));
    match result {
        Err(LocatorError::InvalidDirectory { path }) => assert!(path.ends_with("/missing")),
        Err(other) => panic!("expected InvalidDirectory, got {other:?}"),
        Ok(_) => panic!("expected InvalidDirectory"),
    }
}

#[test]
fn psr4_maps_the_remainder_to_a_path() -> Result<()> {
    let dir = tempdir()?;
    let src = dir.path().join("src");
    let lib = dir.path().join("lib");
    fs::create_dir_all(&src)?;
    fs::create_dir_all(&lib)?;

    let mapping = Psr4Mapping::new([("App\\", vec![src.clone(), lib.clone()])])?;
    assert_eq!(
        mapping.resolve_possible_file_paths(&Identifier::class("App\\Foo\\Bar")?),
        vec![src.join("Foo/Bar.php"), lib.join("Foo/Bar.php")]
    );
    assert!(mapping.resolve_possible_file_paths(&Identifier::function("App\\foo")?).is_empty());
    assert!(mapping.resolve_possible_file_paths(&Identifier::class("Other\\Foo")?).is_empty());

    let trimmed = Psr4Mapping::new([("\\App", vec![src.clone()])])?;
    assert_eq!(
        trimmed.resolve_possible_file_paths(&Identifier::class("App\\Baz")?),
        vec![src.join("Baz.php")]
    );
    Ok(())
}

#[test]
fn psr0_maps_underscores_and_exact_prefixes() -> Result<()> {
    let dir = tempdir()?;
    let src = dir.path().join("src");
    fs::create_dir_all(&src)?;

    let mapping = Psr0Mapping::new([("App_", vec![src.clone()])])?;
    assert_eq!(
        mapping.resolve_possible_file_paths(&Identifier::class("App_Foo_Bar")?),
        vec![src.join("Foo/Bar.php")]
    );
    assert_eq!(
        mapping.resolve_possible_file_paths(&Identifier::class("App_")?),
        vec![src.join("App_.php")]
    );

    let namespaced = Psr0Mapping::new([("Vendor\\Pkg\\", vec![src.clone()])])?;
    assert_eq!(
        namespaced.resolve_possible_file_paths(&Identifier::class("Vendor\\Pkg\\Sub_Name")?),
        vec![src.join("Sub/Name.php")]
    );
    assert_eq!(
        namespaced.resolve_possible_file_paths(&Identifier::class("Vendor\\Pkg\\My_Ns\\Thing")?),
        vec![src.join("My/Ns/Thing.php")]
    );
    assert_eq!(
        namespaced.resolve_possible_file_paths(&Identifier::class("Vendor\\Pkg")?),
        vec![src.join("Vendor/Pkg.php")]
    );
    Ok(())
}

#[test]
fn psr_locator_only_reads_candidate_files() -> Result<()> {
    let dir = tempdir()?;
    let src = dir.path().join("src");
    write(&src.join("Model/User.php"), "<?php namespace App\\Model; class User {}")?;
    write(&src.join("Model/Misplaced.php"), "<?php namespace App\\Model; class Elsewhere {}")?;

    let locator = PsrAutoloaderLocator::new(
        Psr4Mapping::new([("App\\", vec![src.clone()])])?,
        Rc::new(AstLocator::new()),
    );
    assert_eq!(locator.mapping().directories(), vec![src.clone()]);
    let reflector = Reflector::new(locator);

    let user = reflector.reflect_class("App\\Model\\User")?;
    assert_eq!(user.located_source().declared_name(), Some("App\\Model\\User"));
    assert!(reflector.reflect_class("App\\Model\\Elsewhere").expect_err("wrong file").is_not_found());
    assert!(reflector.reflect_class("App\\Model\\Missing").expect_err("no file").is_not_found());

    let mut all = class_names(&reflector);
    all.sort();
    assert_eq!(all, vec!["App\\Model\\Elsewhere", "App\\Model\\User"]);
    Ok(())
}

fn composer_project() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempdir()?;
    let root = dir.path().to_path_buf();
    write(
        &root.join("composer.json"),
        r#"{
            "autoload": {
                "psr-4": {"App\\": "src/", "Missing\\": "nowhere/"},
                "classmap": ["legacy"],
                "files": ["helpers.php", "gone.php"]
            }
        }"#,
    )?;
    write(&root.join("src/Kernel.php"), "<?php namespace App; class Kernel {}")?;
    write(&root.join("legacy/deep/Old.php"), "<?php class Old_Thing {}")?;
    write(&root.join("helpers.php"), "<?php function app_helper() {}")?;

    write(
        &root.join("vendor/composer/installed.json"),
        r#"{"packages": [
            {"name": "acme/log", "install-path": "../acme/log",
             "autoload": {"psr-4": {"Acme\\Log\\": "src"}}},
            {"name": "acme/legacy",
             "autoload": {"psr-0": {"Acme_": "lib/"}}}
        ]}"#,
    )?;
    write(&root.join("vendor/acme/log/src/Logger.php"), "<?php namespace Acme\\Log; class Logger {}")?;
    write(&root.join("vendor/acme/legacy/lib/Old/Widget.php"), "<?php class Acme_Old_Widget {}")?;
    Ok((dir, root))
}

#[test]
fn composer_json_covers_the_project_only() -> Result<()> {
    let (_guard, root) = composer_project()?;
    let locator = for_composer_json(&root, Rc::new(AstLocator::new()))?;
    assert_eq!(locator.len(), 3);
    let reflector = Reflector::new(locator);

    assert_eq!(reflector.reflect_class("App\\Kernel")?.name(), "App\\Kernel");
    assert_eq!(reflector.reflect_class("Old_Thing")?.name(), "Old_Thing");
    assert_eq!(reflector.reflect_function("app_helper")?.name(), "app_helper");
    assert!(reflector.reflect_class("Acme\\Log\\Logger").expect_err("vendor").is_not_found());
    Ok(())
}

#[test]
fn installed_json_covers_packages_only() -> Result<()> {
    let (_guard, root) = composer_project()?;
    let reflector = Reflector::new(for_installed_json(&root, Rc::new(AstLocator::new()))?);

    assert_eq!(reflector.reflect_class("Acme\\Log\\Logger")?.name(), "Acme\\Log\\Logger");
    assert_eq!(reflector.reflect_class("Acme_Old_Widget")?.name(), "Acme_Old_Widget");
    assert!(reflector.reflect_class("App\\Kernel").expect_err("project").is_not_found());
    Ok(())
}

#[test]
fn combined_locator_sees_everything() -> Result<()> {
    let (_guard, root) = composer_project()?;
    let reflector =
        Reflector::new(for_composer_json_and_installed_json(&root, Rc::new(AstLocator::new()))?);

    for class in ["App\\Kernel", "Old_Thing", "Acme\\Log\\Logger", "Acme_Old_Widget"] {
        assert!(reflector.reflect_class(class).is_ok(), "{class} should be found");
    }
    Ok(())
}

#[test]
fn composer_errors_name_what_is_missing() -> Result<()> {
    let dir = tempdir()?;
    let ast = Rc::new(AstLocator::new());

    let missing_dir = dir.path().join("nope");
    assert!(matches!(
        for_composer_json(&missing_dir, Rc::clone(&ast)),
        Err(LocatorError::InvalidProjectDirectory { .. })
    ));
    assert!(matches!(
        for_composer_json(dir.path(), Rc::clone(&ast)),
        Err(LocatorError::MissingManifest { .. })
    ));

    write(&dir.path().join("composer.json"), "{ not json")?;
    assert!(matches!(
        for_composer_json(dir.path(), Rc::clone(&ast)),
        Err(LocatorError::FailedToParseJson { .. })
    ));

    write(&dir.path().join("composer.json"), r#"{"config": {"vendor-dir": "deps"}}"#)?;
    match for_installed_json(dir.path(), Rc::clone(&ast)) {
        Err(LocatorError::MissingInstalledManifest { path }) => {
            assert!(path.ends_with("deps/composer/installed.json"), "path was {path}")
        }
        Err(other) => panic!("expected MissingInstalledManifest, got {other:?}"),
        Ok(_) => panic!("expected MissingInstalledManifest"),
    }
    assert!(for_composer_json(dir.path(), ast)?.is_empty());
    Ok(())
}
