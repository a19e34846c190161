//! Reflection handles.
//!
//! Handles are cheap immutable values: a shared AST node, the located source
//! it was parsed from and the enclosing namespace. Anything that needs other
//! symbols (parent classes, constant values) takes the `Reflector` as an
//! argument instead of holding on to it.

use std::rc::Rc;

use crate::ast::node::{ClassKind, ClassLike, ClassMember, ConstantDecl, Expr, FunctionLike};
use crate::ast::strategy::DeclarationNode;
use crate::compiler::value::Value;
use crate::compiler::{self, CompileError, CompileResult, CompilerContext};
use crate::identifier::{IdentifierKind, ANONYMOUS_CLASS_PREFIX, NAMESPACE_SEPARATOR};
use crate::reflector::{ReflectionError, ReflectionResult, Reflector};
use crate::source::LocatedSource;

/// A reflected class, function or constant.
#[derive(Debug, Clone)]
pub enum Reflection {
    Class(ReflectionClass),
    Function(ReflectionFunction),
    Constant(ReflectionConstant),
}

impl Reflection {
    pub fn kind(&self) -> IdentifierKind {
        match self {
            Reflection::Class(_) => IdentifierKind::Class,
            Reflection::Function(_) => IdentifierKind::Function,
            Reflection::Constant(_) => IdentifierKind::Constant,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Reflection::Class(class) => class.name(),
            Reflection::Function(function) => function.name(),
            Reflection::Constant(constant) => constant.name(),
        }
    }

    pub fn located_source(&self) -> &Rc<LocatedSource> {
        match self {
            Reflection::Class(class) => class.located_source(),
            Reflection::Function(function) => function.located_source(),
            Reflection::Constant(constant) => constant.located_source(),
        }
    }

    pub fn ast_node(&self) -> DeclarationNode {
        match self {
            Reflection::Class(class) => DeclarationNode::Class(Rc::clone(class.ast_node())),
            Reflection::Function(function) => {
                DeclarationNode::Function(Rc::clone(function.ast_node()))
            }
            Reflection::Constant(constant) => {
                DeclarationNode::Constant(Rc::clone(constant.ast_node()))
            }
        }
    }

    pub fn as_class(&self) -> Option<&ReflectionClass> {
        match self {
            Reflection::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&ReflectionFunction> {
        match self {
            Reflection::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&ReflectionConstant> {
        match self {
            Reflection::Constant(constant) => Some(constant),
            _ => None,
        }
    }

    pub fn into_class(self) -> Option<ReflectionClass> {
        match self {
            Reflection::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn into_function(self) -> Option<ReflectionFunction> {
        match self {
            Reflection::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn into_constant(self) -> Option<ReflectionConstant> {
        match self {
            Reflection::Constant(constant) => Some(constant),
            _ => None,
        }
    }
}

fn short_name(name: &str) -> &str {
    name.rsplit(NAMESPACE_SEPARATOR).next().unwrap_or(name)
}

/// Compile the default value of `param` of `function`, if it has one.
fn parameter_default(
    function: &FunctionLike,
    param: &str,
    context: &CompilerContext<'_>,
) -> CompileResult<Option<Value>> {
    match function.param(param).and_then(|param| param.default.as_ref()) {
        Some(default) => Ok(Some(compiler::compile(default, context)?.value)),
        None => Ok(None),
    }
}

#[derive(Debug, Clone)]
pub struct ReflectionClass {
    name: String,
    node: Rc<ClassLike>,
    source: Rc<LocatedSource>,
    namespace: Option<String>,
}

impl ReflectionClass {
    pub fn new(node: Rc<ClassLike>, source: Rc<LocatedSource>, namespace: Option<String>) -> Self {
        let name = match &node.namespaced_name {
            Some(name) => name.clone(),
            None => format!(
                "{ANONYMOUS_CLASS_PREFIX}{}:{}:{}",
                source.file_name().unwrap_or_default(),
                node.line,
                node.column
            ),
        };
        Self { name, node, source, namespace }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> &str {
        match &self.node.name {
            Some(name) => name,
            None => &self.name,
        }
    }

    pub fn namespace_name(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn class_kind(&self) -> ClassKind {
        self.node.kind
    }

    pub fn is_interface(&self) -> bool {
        self.node.kind == ClassKind::Interface
    }

    pub fn is_trait(&self) -> bool {
        self.node.kind == ClassKind::Trait
    }

    pub fn is_enum(&self) -> bool {
        self.node.kind == ClassKind::Enum
    }

    pub fn is_anonymous(&self) -> bool {
        self.node.is_anonymous()
    }

    pub fn is_abstract(&self) -> bool {
        self.node.is_abstract
    }

    pub fn is_final(&self) -> bool {
        self.node.is_final
    }

    pub fn ast_node(&self) -> &Rc<ClassLike> {
        &self.node
    }

    pub fn located_source(&self) -> &Rc<LocatedSource> {
        &self.source
    }

    pub fn start_line(&self) -> u32 {
        self.node.line
    }

    pub fn end_line(&self) -> u32 {
        self.node.end_line
    }

    pub fn start_column(&self) -> u32 {
        self.node.column
    }

    /// Declared parent class. Interfaces have none: their `extends` list is
    /// reported by `interface_names`.
    pub fn parent_class_name(&self) -> Option<&str> {
        if self.is_interface() {
            return None;
        }
        self.node.extends.first().map(|name| name.resolved.as_str())
    }

    pub fn parent_class(&self, reflector: &Reflector) -> ReflectionResult<Option<ReflectionClass>> {
        self.parent_class_name().map(|name| reflector.reflect_class(name)).transpose()
    }

    /// Directly implemented (or, for interfaces, extended) interfaces.
    pub fn interface_names(&self) -> Vec<&str> {
        let names = if self.is_interface() { &self.node.extends } else { &self.node.implements };
        names.iter().map(|name| name.resolved.as_str()).collect()
    }

    pub fn interfaces(&self, reflector: &Reflector) -> ReflectionResult<Vec<ReflectionClass>> {
        self.interface_names().into_iter().map(|name| reflector.reflect_class(name)).collect()
    }

    pub fn trait_names(&self) -> Vec<&str> {
        self.node.used_traits().map(|name| name.resolved.as_str()).collect()
    }

    pub fn traits(&self, reflector: &Reflector) -> ReflectionResult<Vec<ReflectionClass>> {
        self.trait_names().into_iter().map(|name| reflector.reflect_class(name)).collect()
    }

    /// Names of the constants declared by this class itself.
    pub fn constant_names(&self) -> Vec<&str> {
        self.node
            .members
            .iter()
            .filter_map(|member| match member {
                ClassMember::Constant(constant) => Some(constant.name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn has_own_constant(&self, name: &str) -> bool {
        self.node.constant(name).is_some()
    }

    /// Value expression of a constant declared by this class itself.
    pub fn own_constant_expr(&self, name: &str) -> Option<&Expr> {
        self.node.constant(name).map(|constant| &constant.value)
    }

    /// Value of constant `name`, looked up through parents and interfaces.
    pub fn constant_value(&self, reflector: &Reflector, name: &str) -> CompileResult<Value> {
        compiler::class_constant(self, name, reflector).map(|compiled| compiled.value)
    }

    pub fn methods(&self) -> Vec<ReflectionMethod> {
        self.node
            .methods()
            .map(|method| ReflectionMethod { class: self.clone(), node: Rc::clone(method) })
            .collect()
    }

    /// Method declared by this class itself, case-insensitively.
    pub fn method(&self, name: &str) -> Option<ReflectionMethod> {
        self.node
            .method(name)
            .map(|method| ReflectionMethod { class: self.clone(), node: Rc::clone(method) })
    }

    /// Default value of property `name`; `None` without a default.
    pub fn property_default_value(
        &self,
        reflector: &Reflector,
        name: &str,
    ) -> CompileResult<Option<Value>> {
        let Some(property) = self.node.property(name) else {
            return Err(CompileError::Reflection(ReflectionError::MemberNotFound {
                class: self.name.clone(),
                member: format!("${name}"),
            }));
        };
        match &property.default {
            Some(default) => {
                let context = CompilerContext::for_class(reflector, self);
                Ok(Some(compiler::compile(default, &context)?.value))
            }
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReflectionMethod {
    class: ReflectionClass,
    node: Rc<FunctionLike>,
}

impl ReflectionMethod {
    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn declaring_class(&self) -> &ReflectionClass {
        &self.class
    }

    pub fn ast_node(&self) -> &Rc<FunctionLike> {
        &self.node
    }

    pub fn is_static(&self) -> bool {
        self.node.is_static
    }

    pub fn is_abstract(&self) -> bool {
        self.node.is_abstract || self.node.body.is_none()
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.node.params.iter().map(|param| param.name.as_str()).collect()
    }

    /// Compile the default value of `param` in the declaring class.
    pub fn parameter_default_value(
        &self,
        reflector: &Reflector,
        param: &str,
    ) -> CompileResult<Option<Value>> {
        let context = CompilerContext::for_class(reflector, &self.class).with_function(self.name());
        parameter_default(&self.node, param, &context)
    }
}

#[derive(Debug, Clone)]
pub struct ReflectionFunction {
    node: Rc<FunctionLike>,
    source: Rc<LocatedSource>,
    namespace: Option<String>,
}

impl ReflectionFunction {
    pub fn new(node: Rc<FunctionLike>, source: Rc<LocatedSource>, namespace: Option<String>) -> Self {
        Self { node, source, namespace }
    }

    pub fn name(&self) -> &str {
        &self.node.namespaced_name
    }

    pub fn short_name(&self) -> &str {
        short_name(&self.node.namespaced_name)
    }

    pub fn namespace_name(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is_closure(&self) -> bool {
        self.node.is_closure()
    }

    pub fn ast_node(&self) -> &Rc<FunctionLike> {
        &self.node
    }

    pub fn located_source(&self) -> &Rc<LocatedSource> {
        &self.source
    }

    pub fn start_line(&self) -> u32 {
        self.node.line
    }

    pub fn start_column(&self) -> u32 {
        self.node.column
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.node.params.iter().map(|param| param.name.as_str()).collect()
    }

    pub fn parameter_default_value(
        &self,
        reflector: &Reflector,
        param: &str,
    ) -> CompileResult<Option<Value>> {
        let context = CompilerContext::new(reflector)
            .with_namespace(self.namespace.clone())
            .with_function(self.name())
            .with_source(Rc::clone(&self.source));
        parameter_default(&self.node, param, &context)
    }
}

#[derive(Debug, Clone)]
pub struct ReflectionConstant {
    node: Rc<ConstantDecl>,
    source: Rc<LocatedSource>,
    namespace: Option<String>,
}

impl ReflectionConstant {
    pub fn new(node: Rc<ConstantDecl>, source: Rc<LocatedSource>, namespace: Option<String>) -> Self {
        Self { node, source, namespace }
    }

    pub fn name(&self) -> &str {
        &self.node.namespaced_name
    }

    pub fn short_name(&self) -> &str {
        short_name(&self.node.namespaced_name)
    }

    /// Namespace the declaration appears in.
    pub fn namespace_name(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn ast_node(&self) -> &Rc<ConstantDecl> {
        &self.node
    }

    pub fn located_source(&self) -> &Rc<LocatedSource> {
        &self.source
    }

    pub fn value(&self, reflector: &Reflector) -> CompileResult<Value> {
        compiler::global_constant(self, reflector).map(|compiled| compiled.value)
    }
}
