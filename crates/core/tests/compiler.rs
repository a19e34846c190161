use std::fs;
use std::rc::Rc;

use stasis_core::ast::AstLocator;
use stasis_core::compiler::value::{ArrayKey, PhpArray};
use stasis_core::locators::{SingleFileSourceLocator, StringSourceLocator};
use stasis_core::{CompileError, ReflectionError, Reflector, Value};
use tempfile::tempdir;

fn reflector_for(source: &str) -> Reflector {
    let locator =
        StringSourceLocator::new(source, Rc::new(AstLocator::new())).expect("string locator");
    Reflector::new(locator)
}

/// Compile `expr` as the value of a global constant.
fn eval(expr: &str) -> Result<Value, CompileError> {
    let reflector = reflector_for(&format!("<?php\nconst SUBJECT = {expr};\n"));
    let constant = reflector.reflect_constant("SUBJECT").expect("constant declared");
    constant.value(&reflector)
}

fn eval_ok(expr: &str) -> Value {
    eval(expr).unwrap_or_else(|err| panic!("{expr} should compile: {err}"))
}

#[test]
fn arithmetic_follows_precedence() {
    assert_eq!(eval_ok("2 + 2 * 3"), Value::Int(8));
    assert_eq!(eval_ok("(2 + 2) * 3"), Value::Int(12));
    assert_eq!(eval_ok("2 ** 3 ** 2"), Value::Int(512));
    assert_eq!(eval_ok("-2 ** 2"), Value::Int(-4));
    assert_eq!(eval_ok("7 % 4 + 10 / 4"), Value::Float(5.5));
    assert_eq!(eval_ok("1 << 4 | 1"), Value::Int(17));
}

#[test]
fn strings_concatenate_and_format_floats() {
    assert_eq!(eval_ok(r#""foo" . "bar""#), Value::from("foobar"));
    assert_eq!(eval_ok("0.1 + 0.2 . ''"), Value::from("0.3"));
    assert_eq!(eval_ok("'n' . 1e25"), Value::from("n1.0E+25"));
    assert_eq!(eval_ok("'v' . true . null . 3"), Value::from("v13"));
}

#[test]
fn escapes_produce_raw_bytes() {
    let reflector = reflector_for(
        r#"<?php
class Bytes
{
    const HIGH = "\xFF";
    const OCTAL = "\101\377";
    const JOINED = self::HIGH . "a";
    const ACCENT = "\u{e9}";
}
"#,
    );
    let class = reflector.reflect_class("Bytes").expect("Bytes");
    let value = |name: &str| class.constant_value(&reflector, name).expect("constant compiles");

    let high = value("HIGH");
    assert_eq!(high, Value::from(vec![0xFF]));
    assert_eq!(high.as_php_string().map(|s| s.len()), Some(1));
    assert_ne!(high, Value::from("\u{FF}"));
    assert_eq!(value("OCTAL"), Value::from(vec![b'A', 0xFF]));
    assert_eq!(value("JOINED"), Value::from(vec![0xFF, b'a']));
    assert_eq!(value("ACCENT"), Value::from("\u{e9}"));
    assert_eq!(eval_ok(r#""\xFF" === "\377""#), Value::Bool(true));
}

#[test]
fn equality_is_loose_or_strict() {
    assert_eq!(eval_ok(r#"1 == "1""#), Value::Bool(true));
    assert_eq!(eval_ok(r#"1 === "1""#), Value::Bool(false));
    assert_eq!(eval_ok(r#"1 !== "1""#), Value::Bool(true));
    assert_eq!(eval_ok(r#"1 <> 2"#), Value::Bool(true));
    assert_eq!(eval_ok("[1, 2] == [1, 2]"), Value::Bool(true));
    assert_eq!(eval_ok("'abc' <=> 'abd'"), Value::Int(-1));
}

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(eval_ok("false && UNDEFINED_CONSTANT"), Value::Bool(false));
    assert_eq!(eval_ok("true || UNDEFINED_CONSTANT"), Value::Bool(true));
    assert_eq!(eval_ok("true xor true"), Value::Bool(false));
    assert_eq!(eval_ok("!0"), Value::Bool(true));
}

#[test]
fn ternaries_are_lazy() {
    assert_eq!(eval_ok("1 ? 'yes' : UNDEFINED_CONSTANT"), Value::from("yes"));
    assert_eq!(eval_ok("0 ?: 'fallback'"), Value::from("fallback"));
    assert_eq!(eval_ok("'set' ?: 'fallback'"), Value::from("set"));
}

#[test]
fn coalesce_and_instanceof_cannot_be_compiled() {
    let err = eval("null ?? 1").expect_err("?? is rejected");
    match err {
        CompileError::UnableToCompileNode { reason, .. } => assert!(reason.contains("??")),
        other => panic!("expected UnableToCompileNode, got {other:?}"),
    }
}

#[test]
fn runtime_constructs_name_the_node_and_line() {
    let err = eval("strlen('abc')").expect_err("calls are rejected");
    match err {
        CompileError::UnableToCompileNode { reason, context, line } => {
            assert!(reason.contains("function call"), "reason was {reason}");
            assert_eq!(context, "global scope");
            assert_eq!(line, 2);
        }
        other => panic!("expected UnableToCompileNode, got {other:?}"),
    }
    assert!(matches!(eval("$x"), Err(CompileError::UnableToCompileNode { .. })));
    assert!(matches!(eval("new Foo()"), Err(CompileError::UnableToCompileNode { .. })));
}

#[test]
fn arithmetic_errors_are_reported() {
    for expr in ["1 / 0", "1 % 0", "1 << -1", "'abc' * 2", "[] - 1"] {
        assert!(
            matches!(eval(expr), Err(CompileError::UnableToCompileNode { .. })),
            "{expr} should not compile"
        );
    }
    match eval("1 / 0") {
        Err(CompileError::UnableToCompileNode { reason, .. }) => {
            assert!(reason.contains("Division by zero"))
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn array_literals_normalize_keys_and_merge_spreads() {
    let Value::Array(array) = eval_ok("[1, 2, 'k' => 3, ...[4, 5], ...['k' => 6]]") else {
        panic!("expected an array");
    };
    let entries: Vec<(ArrayKey, Value)> =
        array.iter().map(|(key, value)| (key.clone(), value.clone())).collect();
    assert_eq!(
        entries,
        vec![
            (ArrayKey::Int(0), Value::Int(1)),
            (ArrayKey::Int(1), Value::Int(2)),
            (ArrayKey::from("k"), Value::Int(6)),
            (ArrayKey::Int(2), Value::Int(4)),
            (ArrayKey::Int(3), Value::Int(5)),
        ]
    );

    let Value::Array(collapsed) = eval_ok("['1' => 'a', true => 'b', 1.7 => 'c', 5 => 'd', 'e']")
    else {
        panic!("expected an array");
    };
    assert_eq!(collapsed.len(), 3);
    assert_eq!(collapsed.get(&ArrayKey::Int(1)), Some(&Value::from("c")));
    assert_eq!(collapsed.get(&ArrayKey::Int(6)), Some(&Value::from("e")));

    assert_eq!(eval_ok("['a' => ['b' => 7]]['a']['b']"), Value::Int(7));
}

#[test]
fn true_false_and_null_are_case_insensitive() {
    assert_eq!(eval_ok("TRUE"), Value::Bool(true));
    assert_eq!(eval_ok("False"), Value::Bool(false));
    assert_eq!(eval_ok("\\null"), Value::Null);
}

#[test]
fn global_constants_resolve_through_table_then_reflection() {
    let reflector = reflector_for(
        r#"<?php
namespace App;

const BASE = 2;
const DERIVED = BASE * PHP_INT_SIZE;
const VIA_FALLBACK = GLOBAL_ONE + 1;

namespace Other;
"#,
    )
    .with_global_constants([("PHP_INT_SIZE".to_string(), Value::Int(8))]);

    assert_eq!(reflector.constant_value("App\\DERIVED").expect("derived"), Value::Int(16));

    match reflector.constant_value("App\\VIA_FALLBACK") {
        Err(ReflectionError::Compile(err)) => match *err {
            CompileError::UnableToCompileNode { reason, context, .. } => {
                assert!(reason.contains("App\\GLOBAL_ONE"), "reason was {reason}");
                assert_eq!(context, "namespace App");
            }
            other => panic!("expected UnableToCompileNode, got {other:?}"),
        },
        other => panic!("expected a compile error, got {other:?}"),
    }
}

#[test]
fn constants_referring_to_constants() {
    let reflector = reflector_for(
        r#"<?php
const A = 2;
const B = A * 3;
define('C', B + 1);
"#,
    );
    assert_eq!(reflector.constant_value("C").expect("C"), Value::Int(7));

    let c = reflector.reflect_constant("C").expect("C declared");
    let compiled = stasis_core::compiler::global_constant(&c, &reflector).expect("compiles");
    assert_eq!(compiled.constant_name.as_deref(), Some("C"));
}

#[test]
fn define_with_an_unreadable_value_has_no_value() {
    let reflector = reflector_for("<?php define('D', $a = 1);");
    let constant = reflector.reflect_constant("D").expect("D declared");
    assert!(matches!(constant.value(&reflector), Err(CompileError::InvalidConstantNode { .. })));
}

#[test]
fn self_constants_resolve_through_the_parent_chain() {
    let reflector = reflector_for(
        r#"<?php
class Grandparent { const BAR = 'baz'; }
class ParentClass extends Grandparent {}
class Child extends ParentClass
{
    public function foo($bar = self::BAR) {}
}
"#,
    );
    let child = reflector.reflect_class("Child").expect("Child");
    let method = child.method("foo").expect("foo");
    assert_eq!(
        method.parameter_default_value(&reflector, "bar").expect("default compiles"),
        Some(Value::from("baz"))
    );
    assert_eq!(child.constant_value(&reflector, "BAR").expect("inherited"), Value::from("baz"));
}

#[test]
fn class_constants_see_interfaces_traits_and_other_classes() {
    let reflector = reflector_for(
        r#"<?php
namespace App;

interface Named { const PREFIX = 'i:'; }
trait Versioned { const VERSION = 3; }
class Config { const NAME = 'cfg'; }

class Service extends Base implements Named
{
    use Versioned;

    const LABEL = self::PREFIX . Config::NAME . static::VERSION;
    const UP = parent::ROOT . '!';
    const CLS = Config::class;
    const ME = [self::class, static::class, parent::class];
}

class Base { const ROOT = 'base'; }
"#,
    );
    let service = reflector.reflect_class("App\\Service").expect("Service");
    assert_eq!(service.constant_value(&reflector, "LABEL").expect("LABEL"), Value::from("i:cfg3"));
    assert_eq!(service.constant_value(&reflector, "UP").expect("UP"), Value::from("base!"));
    assert_eq!(service.constant_value(&reflector, "CLS").expect("CLS"), Value::from("App\\Config"));
    assert_eq!(
        service.constant_value(&reflector, "ME").expect("ME"),
        Value::Array(PhpArray::list([
            Value::from("App\\Service"),
            Value::from("App\\Service"),
            Value::from("App\\Base"),
        ]))
    );
}

#[test]
fn missing_class_constants_name_the_start_class() {
    let reflector = reflector_for("<?php class Lonely { const A = self::MISSING; }");
    let lonely = reflector.reflect_class("Lonely").expect("Lonely");
    match lonely.constant_value(&reflector, "A") {
        Err(CompileError::UnableToCompileNode { reason, context, .. }) => {
            assert!(reason.contains("Lonely::MISSING"), "reason was {reason}");
            assert_eq!(context, "class Lonely");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn self_reference_is_circular() {
    let reflector = reflector_for("<?php class A { const X = self::X; }");
    let a = reflector.reflect_class("A").expect("A");
    match a.constant_value(&reflector, "X") {
        Err(CompileError::CircularReference { constant }) => assert_eq!(constant, "A::X"),
        other => panic!("expected CircularReference, got {other:?}"),
    }
}

#[test]
fn mutual_references_are_circular() {
    let reflector = reflector_for(
        r#"<?php
class Ping { const V = Pong::V; }
class Pong { const V = Ping::V; }
const LOOP_A = LOOP_B;
const LOOP_B = LOOP_A;
"#,
    );
    let ping = reflector.reflect_class("Ping").expect("Ping");
    assert!(matches!(
        ping.constant_value(&reflector, "V"),
        Err(CompileError::CircularReference { .. })
    ));
    let loop_a = reflector.reflect_constant("LOOP_A").expect("LOOP_A");
    assert!(matches!(loop_a.value(&reflector), Err(CompileError::CircularReference { .. })));
}

#[test]
fn repeated_non_circular_references_are_fine() {
    let reflector = reflector_for("<?php class D { const A = 1; const B = [self::A, self::A, self::A]; }");
    let d = reflector.reflect_class("D").expect("D");
    assert_eq!(
        d.constant_value(&reflector, "B").expect("B"),
        Value::Array(PhpArray::list([Value::Int(1), Value::Int(1), Value::Int(1)]))
    );
}

#[test]
fn property_defaults_compile_in_class_context() {
    let reflector = reflector_for(
        r#"<?php
class Settings
{
    public $list = [self::A, self::A * 2];
    protected ?string $name = null;
    private int $untouched;
    const A = 3;
}
"#,
    );
    let settings = reflector.reflect_class("Settings").expect("Settings");
    assert_eq!(
        settings.property_default_value(&reflector, "list").expect("list"),
        Some(Value::Array(PhpArray::list([Value::Int(3), Value::Int(6)])))
    );
    assert_eq!(settings.property_default_value(&reflector, "name").expect("name"), Some(Value::Null));
    assert_eq!(settings.property_default_value(&reflector, "untouched").expect("untouched"), None);
    assert!(matches!(
        settings.property_default_value(&reflector, "missing"),
        Err(CompileError::Reflection(_))
    ));
}

#[test]
fn magic_constants_use_the_enclosing_scope() {
    let reflector = reflector_for(
        r#"<?php
namespace Shop;

trait Greets
{
    public function hi($t = __TRAIT__) {}
}

class Cart
{
    public function add($m = __METHOD__, $c = __CLASS__, $f = __FUNCTION__, $n = __NAMESPACE__, $l = __LINE__) {}
}

function outside($c = __CLASS__, $m = __METHOD__) {}
"#,
    );
    let cart = reflector.reflect_class("Shop\\Cart").expect("Cart");
    let add = cart.method("add").expect("add");
    let default = |name: &str| add.parameter_default_value(&reflector, name).expect("compiles");
    assert_eq!(default("m"), Some(Value::from("Shop\\Cart::add")));
    assert_eq!(default("c"), Some(Value::from("Shop\\Cart")));
    assert_eq!(default("f"), Some(Value::from("add")));
    assert_eq!(default("n"), Some(Value::from("Shop")));
    assert_eq!(default("l"), Some(Value::Int(11)));

    let greets = reflector.reflect_class("Shop\\Greets").expect("Greets");
    let hi = greets.method("hi").expect("hi");
    assert_eq!(
        hi.parameter_default_value(&reflector, "t").expect("compiles"),
        Some(Value::from("Shop\\Greets"))
    );

    let outside = reflector.reflect_function("Shop\\outside").expect("outside");
    assert_eq!(outside.parameter_default_value(&reflector, "c").expect("c"), Some(Value::from("")));
    assert_eq!(
        outside.parameter_default_value(&reflector, "m").expect("m"),
        Some(Value::from("Shop\\outside"))
    );
}

#[test]
fn file_magic_constants_need_a_file() {
    assert!(matches!(
        eval("__DIR__"),
        Err(CompileError::CodeLocationMissing { magic: "__DIR__" })
    ));

    let dir = tempdir().expect("tempdir");
    let file = dir.path().join("paths.php");
    fs::write(&file, "<?php\nconst HERE = __DIR__;\nconst SELF_FILE = __FILE__;\n").expect("write");
    let locator =
        SingleFileSourceLocator::new(&file, Rc::new(AstLocator::new())).expect("file locator");
    let reflector = Reflector::new(locator);

    let expected_dir = dir.path().to_string_lossy().replace('\\', "/");
    assert_eq!(reflector.constant_value("HERE").expect("HERE"), Value::from(expected_dir));
    let expected_file = file.to_string_lossy().replace('\\', "/");
    assert_eq!(reflector.constant_value("SELF_FILE").expect("SELF_FILE"), Value::from(expected_file));
}
