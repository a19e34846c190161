//! Constant-expression compiler.
//!
//! Evaluates the expressions the host allows in constant positions (class
//! and global constants, property and parameter defaults) without running
//! any code. Class constants are looked up through the reflector, so a
//! constant in one file may refer to a class declared in another.

pub mod operators;
pub mod value;

use std::collections::HashSet;
use std::rc::Rc;

use log::trace;
use thiserror::Error;

use crate::ast::node::{ArrayItem, BinaryOp, ClassRef, Expr, ExprKind, MagicConstant, Name};
use crate::compiler::operators::OperatorError;
use crate::compiler::value::{ArrayKey, PhpArray, Value};
use crate::reflection::{ReflectionClass, ReflectionConstant};
use crate::reflector::{ReflectionError, Reflector};
use crate::source::LocatedSource;

/// Error type for constant-expression compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Unable to compile expression in {context} on line {line}: {reason}")]
    UnableToCompileNode { reason: String, context: String, line: u32 },

    #[error("Circular reference to constant {constant}")]
    CircularReference { constant: String },

    #[error("Declaration of constant {name} has no compilable value")]
    InvalidConstantNode { name: String },

    #[error("{magic} needs a file location, but the source has none")]
    CodeLocationMissing { magic: &'static str },

    #[error(transparent)]
    Reflection(#[from] ReflectionError),
}

/// Convenience result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// A compiled value, with the constant it was read from when the expression
/// was a constant reference.
#[derive(Debug, Clone)]
pub struct CompiledValue {
    pub value: Value,
    pub constant_name: Option<String>,
}

impl CompiledValue {
    fn plain(value: Value) -> Self {
        Self { value, constant_name: None }
    }
}

impl PartialEq for CompiledValue {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

/// Where an expression sits: enclosing class, function, namespace and the
/// source it was parsed from.
#[derive(Clone)]
pub struct CompilerContext<'r> {
    reflector: &'r Reflector,
    class: Option<ReflectionClass>,
    namespace: Option<String>,
    function: Option<String>,
    source: Option<Rc<LocatedSource>>,
}

impl<'r> CompilerContext<'r> {
    pub fn new(reflector: &'r Reflector) -> Self {
        Self { reflector, class: None, namespace: None, function: None, source: None }
    }

    /// Context of an expression written directly inside `class`.
    pub fn for_class(reflector: &'r Reflector, class: &ReflectionClass) -> Self {
        Self::new(reflector)
            .with_class(class.clone())
            .with_namespace(class.namespace_name().map(str::to_string))
            .with_source(Rc::clone(class.located_source()))
    }

    pub fn with_class(mut self, class: ReflectionClass) -> Self {
        self.class = Some(class);
        self
    }

    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn with_source(mut self, source: Rc<LocatedSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn reflector(&self) -> &'r Reflector {
        self.reflector
    }

    pub fn enclosing_class(&self) -> Option<&ReflectionClass> {
        self.class.as_ref()
    }

    /// `class Foo, function bar, namespace App`, or `global scope`.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(class) = &self.class {
            parts.push(format!("class {}", class.name()));
        }
        if let Some(function) = &self.function {
            parts.push(format!("function {function}"));
        }
        if let Some(namespace) = &self.namespace {
            parts.push(format!("namespace {namespace}"));
        }
        if parts.is_empty() {
            "global scope".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// `(lowercased class name, constant)` pairs currently being resolved.
/// Global constants use an empty class part.
type Visiting = HashSet<(String, String)>;

/// Compile `expr` in `context`.
pub fn compile(expr: &Expr, context: &CompilerContext<'_>) -> CompileResult<CompiledValue> {
    compile_expr(expr, context, &mut Visiting::new())
}

/// Value of class constant `name` as seen from `class`: declared by the
/// class, its traits, its parents or its interfaces.
pub fn class_constant(
    class: &ReflectionClass,
    name: &str,
    reflector: &Reflector,
) -> CompileResult<CompiledValue> {
    let context = CompilerContext::for_class(reflector, class);
    resolve_class_constant(class, name, &context, class.start_line(), &mut Visiting::new())
}

/// Value of a global constant declaration.
pub fn global_constant(
    constant: &ReflectionConstant,
    reflector: &Reflector,
) -> CompileResult<CompiledValue> {
    resolve_global_constant(constant, reflector, &mut Visiting::new())
}

fn unable(reason: impl Into<String>, context: &CompilerContext<'_>, line: u32) -> CompileError {
    CompileError::UnableToCompileNode { reason: reason.into(), context: context.describe(), line }
}

fn operator_error(err: OperatorError, context: &CompilerContext<'_>, line: u32) -> CompileError {
    unable(err.to_string(), context, line)
}

fn compile_expr(
    expr: &Expr,
    context: &CompilerContext<'_>,
    visiting: &mut Visiting,
) -> CompileResult<CompiledValue> {
    let line = expr.line;
    let value = match &expr.kind {
        ExprKind::Int(i) => Value::Int(*i),
        ExprKind::Float(f) => Value::Float(*f),
        ExprKind::String(s) => Value::from(s.clone()),
        ExprKind::Array(items) => Value::Array(compile_array(items, context, visiting, line)?),
        ExprKind::ConstFetch(name) => return compile_const_fetch(name, context, visiting, line),
        ExprKind::ClassConstFetch { class, constant } => {
            let class = resolve_class_ref(class, context, line)?;
            return resolve_class_constant(&class, constant, context, line, visiting);
        }
        ExprKind::ClassName(class) => Value::from(class_name(class, context, line)?),
        ExprKind::MagicConstant(magic) => magic_constant(*magic, context, line)?,
        ExprKind::Unary { op, operand } => {
            let operand = compile_expr(operand, context, visiting)?.value;
            operators::unary(*op, &operand).map_err(|err| operator_error(err, context, line))?
        }
        ExprKind::Binary { op, left, right } => {
            compile_binary(*op, left, right, context, visiting, line)?
        }
        ExprKind::Ternary { condition, then, otherwise } => {
            let condition = compile_expr(condition, context, visiting)?;
            return match then {
                Some(then) if condition.value.to_bool() => compile_expr(then, context, visiting),
                None if condition.value.to_bool() => Ok(condition),
                _ => compile_expr(otherwise, context, visiting),
            };
        }
        ExprKind::ArrayDim { target, index: Some(index) } => {
            let target = compile_expr(target, context, visiting)?.value;
            let index = compile_expr(index, context, visiting)?.value;
            array_fetch(&target, &index, context, line)?
        }
        other => {
            return Err(unable(
                format!("{} cannot be used in a constant expression", other.kind_name()),
                context,
                line,
            ))
        }
    };
    Ok(CompiledValue::plain(value))
}

fn compile_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    context: &CompilerContext<'_>,
    visiting: &mut Visiting,
    line: u32,
) -> CompileResult<Value> {
    if matches!(op, BinaryOp::Coalesce | BinaryOp::Instanceof) {
        return Err(operator_error(OperatorError::NotConstantOperator(op.symbol()), context, line));
    }
    let left = compile_expr(left, context, visiting)?.value;
    match op {
        BinaryOp::BooleanAnd | BinaryOp::LogicalAnd if !left.to_bool() => {
            return Ok(Value::Bool(false));
        }
        BinaryOp::BooleanOr | BinaryOp::LogicalOr if left.to_bool() => {
            return Ok(Value::Bool(true));
        }
        _ => {}
    }
    let right = compile_expr(right, context, visiting)?.value;
    operators::binary(op, &left, &right).map_err(|err| operator_error(err, context, line))
}

fn compile_array(
    items: &[ArrayItem],
    context: &CompilerContext<'_>,
    visiting: &mut Visiting,
    line: u32,
) -> CompileResult<PhpArray> {
    let mut array = PhpArray::new();
    for item in items {
        if item.by_ref {
            return Err(unable("references cannot be used in a constant expression", context, line));
        }
        let value = compile_expr(&item.value, context, visiting)?.value;
        if item.spread {
            let Value::Array(spread) = value else {
                return Err(unable(
                    format!("only arrays can be unpacked, got {}", value.type_name()),
                    context,
                    line,
                ));
            };
            for (key, entry) in spread.iter() {
                match key {
                    ArrayKey::Int(_) => array.push(entry.clone()),
                    ArrayKey::String(_) => array.insert(key.clone(), entry.clone()),
                }
            }
            continue;
        }
        match &item.key {
            Some(key) => {
                let key_value = compile_expr(key, context, visiting)?.value;
                let key = ArrayKey::from_value(&key_value)
                    .ok_or_else(|| unable("Illegal offset type: array", context, line))?;
                array.insert(key, value);
            }
            None => array.push(value),
        }
    }
    Ok(array)
}

fn array_fetch(
    target: &Value,
    index: &Value,
    context: &CompilerContext<'_>,
    line: u32,
) -> CompileResult<Value> {
    let Value::Array(array) = target else {
        return Err(unable(
            format!("cannot read an offset of {}", target.type_name()),
            context,
            line,
        ));
    };
    let key = ArrayKey::from_value(index)
        .ok_or_else(|| unable("Illegal offset type: array", context, line))?;
    array.get(&key).cloned().ok_or_else(|| {
        unable(format!("Undefined array key {}", key.to_value().to_php_string()), context, line)
    })
}

fn compile_const_fetch(
    name: &Name,
    context: &CompilerContext<'_>,
    visiting: &mut Visiting,
    line: u32,
) -> CompileResult<CompiledValue> {
    for (special, value) in
        [("true", Value::Bool(true)), ("false", Value::Bool(false)), ("null", Value::Null)]
    {
        if name.is_special_constant(special) {
            return Ok(CompiledValue::plain(value));
        }
    }

    let candidates: Vec<&str> =
        std::iter::once(name.resolved.as_str()).chain(name.fallback.as_deref()).collect();
    let reflector = context.reflector();

    for candidate in &candidates {
        if let Some(value) = reflector.global_constant(candidate) {
            trace!("constant {candidate} taken from the global constant table");
            return Ok(CompiledValue { value: value.clone(), constant_name: Some(candidate.to_string()) });
        }
    }

    for candidate in &candidates {
        match reflector.reflect_constant(candidate) {
            Ok(constant) => return resolve_global_constant(&constant, reflector, visiting),
            Err(err) if err.is_not_found() => continue,
            Err(err) => return Err(err.into()),
        }
    }

    Err(unable(
        format!("Could not locate constant \"{}\" while evaluating constant expression", name.resolved),
        context,
        line,
    ))
}

fn resolve_global_constant(
    constant: &ReflectionConstant,
    reflector: &Reflector,
    visiting: &mut Visiting,
) -> CompileResult<CompiledValue> {
    let name = constant.name().to_string();
    let Some(expr) = constant.ast_node().value.as_ref() else {
        return Err(CompileError::InvalidConstantNode { name });
    };
    let key = (String::new(), name.clone());
    if !visiting.insert(key.clone()) {
        return Err(CompileError::CircularReference { constant: name });
    }
    let context = CompilerContext::new(reflector)
        .with_namespace(constant.namespace_name().map(str::to_string))
        .with_source(Rc::clone(constant.located_source()));
    let result = compile_expr(expr, &context, visiting);
    visiting.remove(&key);
    Ok(CompiledValue { value: result?.value, constant_name: Some(name) })
}

fn resolve_class_ref(
    class: &ClassRef,
    context: &CompilerContext<'_>,
    line: u32,
) -> CompileResult<ReflectionClass> {
    match class {
        ClassRef::SelfRef | ClassRef::Static => context.enclosing_class().cloned().ok_or_else(|| {
            unable(format!("{}:: used outside of a class", class.describe()), context, line)
        }),
        ClassRef::Parent => {
            let enclosing = context
                .enclosing_class()
                .ok_or_else(|| unable("parent:: used outside of a class", context, line))?;
            enclosing.parent_class(context.reflector())?.ok_or_else(|| {
                unable(
                    format!("parent:: used in class {} which has no parent", enclosing.name()),
                    context,
                    line,
                )
            })
        }
        ClassRef::Named(name) => match context.enclosing_class() {
            Some(enclosing) if enclosing.name().eq_ignore_ascii_case(&name.resolved) => {
                Ok(enclosing.clone())
            }
            _ => Ok(context.reflector().reflect_class(&name.resolved)?),
        },
    }
}

fn class_name(class: &ClassRef, context: &CompilerContext<'_>, line: u32) -> CompileResult<String> {
    match class {
        ClassRef::Named(name) => Ok(name.resolved.clone()),
        ClassRef::SelfRef | ClassRef::Static => context
            .enclosing_class()
            .map(|class| class.name().to_string())
            .ok_or_else(|| {
                unable(format!("{}::class used outside of a class", class.describe()), context, line)
            }),
        ClassRef::Parent => context
            .enclosing_class()
            .and_then(|class| class.parent_class_name())
            .map(str::to_string)
            .ok_or_else(|| unable("parent::class used without a parent class", context, line)),
    }
}

fn resolve_class_constant(
    start: &ReflectionClass,
    name: &str,
    context: &CompilerContext<'_>,
    line: u32,
    visiting: &mut Visiting,
) -> CompileResult<CompiledValue> {
    let reflector = context.reflector();
    let declaring = find_declaring_class(start, name, reflector, context, line, &mut HashSet::new())?
        .ok_or_else(|| {
            unable(
                format!(
                    "Could not locate constant {}::{name} while evaluating constant expression",
                    start.name()
                ),
                context,
                line,
            )
        })?;

    let qualified = format!("{}::{name}", declaring.name());
    let key = (declaring.name().to_ascii_lowercase(), name.to_string());
    if !visiting.insert(key.clone()) {
        return Err(CompileError::CircularReference { constant: qualified });
    }
    let declaring_context = CompilerContext::for_class(reflector, &declaring);
    let result = match declaring.own_constant_expr(name) {
        Some(expr) => compile_expr(expr, &declaring_context, visiting),
        None => Err(CompileError::InvalidConstantNode { name: qualified.clone() }),
    };
    visiting.remove(&key);
    Ok(CompiledValue { value: result?.value, constant_name: Some(qualified) })
}

/// Walk the class, its traits, its parents and then its interfaces until a
/// declaration of `name` turns up. `seen` guards against inheritance cycles.
fn find_declaring_class(
    class: &ReflectionClass,
    name: &str,
    reflector: &Reflector,
    context: &CompilerContext<'_>,
    line: u32,
    seen: &mut HashSet<String>,
) -> CompileResult<Option<ReflectionClass>> {
    if !seen.insert(class.name().to_ascii_lowercase()) {
        return Ok(None);
    }
    if class.has_own_constant(name) {
        return Ok(Some(class.clone()));
    }
    if class.ast_node().enum_case(name).is_some() {
        return Err(unable(
            format!("enum case {}::{name} is not a constant value", class.name()),
            context,
            line,
        ));
    }
    for used in class.traits(reflector)? {
        if let Some(found) = find_declaring_class(&used, name, reflector, context, line, seen)? {
            return Ok(Some(found));
        }
    }
    if let Some(parent) = class.parent_class(reflector)? {
        if let Some(found) = find_declaring_class(&parent, name, reflector, context, line, seen)? {
            return Ok(Some(found));
        }
    }
    for interface in class.interfaces(reflector)? {
        if let Some(found) = find_declaring_class(&interface, name, reflector, context, line, seen)?
        {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

fn magic_constant(
    magic: MagicConstant,
    context: &CompilerContext<'_>,
    line: u32,
) -> CompileResult<Value> {
    let class_name = context.enclosing_class().map(|class| class.name().to_string());
    Ok(match magic {
        MagicConstant::Dir => Value::from(
            context
                .source
                .as_ref()
                .and_then(|source| source.directory())
                .ok_or(CompileError::CodeLocationMissing { magic: "__DIR__" })?,
        ),
        MagicConstant::File => Value::from(
            context
                .source
                .as_ref()
                .and_then(|source| source.file_name().map(str::to_string))
                .ok_or(CompileError::CodeLocationMissing { magic: "__FILE__" })?,
        ),
        MagicConstant::Line => Value::Int(i64::from(line)),
        MagicConstant::Class => Value::from(class_name.unwrap_or_default()),
        MagicConstant::Namespace => Value::from(context.namespace.clone().unwrap_or_default()),
        MagicConstant::Function => Value::from(context.function.clone().unwrap_or_default()),
        MagicConstant::Method => Value::from(match (&class_name, &context.function) {
            (Some(class), Some(function)) => format!("{class}::{function}"),
            (None, Some(function)) => function.clone(),
            _ => String::new(),
        }),
        MagicConstant::Trait => Value::from(
            context
                .enclosing_class()
                .filter(|class| class.is_trait())
                .map(|class| class.name().to_string())
                .unwrap_or_default(),
        ),
    })
}
