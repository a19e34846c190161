//! Conversion of declaration nodes into reflection handles.

use std::rc::Rc;

use crate::ast::node::{ClassLike, ConstantDecl, FunctionLike};
use crate::identifier::IdentifierKind;
use crate::reflection::{Reflection, ReflectionClass, ReflectionConstant, ReflectionFunction};
use crate::reflector::Reflector;
use crate::source::LocatedSource;

/// A node the AST locator can turn into a reflection.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationNode {
    Class(Rc<ClassLike>),
    Function(Rc<FunctionLike>),
    Constant(Rc<ConstantDecl>),
}

impl DeclarationNode {
    pub fn kind(&self) -> IdentifierKind {
        match self {
            DeclarationNode::Class(_) => IdentifierKind::Class,
            DeclarationNode::Function(_) => IdentifierKind::Function,
            DeclarationNode::Constant(_) => IdentifierKind::Constant,
        }
    }

    pub fn line(&self) -> u32 {
        match self {
            DeclarationNode::Class(class) => class.line,
            DeclarationNode::Function(function) => function.line,
            DeclarationNode::Constant(constant) => constant.line,
        }
    }

    /// Column of the declaring keyword; constants report 1.
    pub fn column(&self) -> u32 {
        match self {
            DeclarationNode::Class(class) => class.column,
            DeclarationNode::Function(function) => function.column,
            DeclarationNode::Constant(_) => 1,
        }
    }
}

/// Strategy used by the AST locator to build reflections.
pub trait NodeToReflection {
    /// Build a reflection for `node`, or `None` to skip it.
    fn convert(
        &self,
        reflector: &Reflector,
        node: &DeclarationNode,
        source: &Rc<LocatedSource>,
        namespace: Option<&str>,
    ) -> Option<Reflection>;
}

/// Builds the crate's own reflection handles.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNodeToReflection;

impl NodeToReflection for DefaultNodeToReflection {
    fn convert(
        &self,
        _reflector: &Reflector,
        node: &DeclarationNode,
        source: &Rc<LocatedSource>,
        namespace: Option<&str>,
    ) -> Option<Reflection> {
        let namespace = namespace.map(str::to_string);
        let source = Rc::clone(source);
        Some(match node {
            DeclarationNode::Class(class) => {
                Reflection::Class(ReflectionClass::new(Rc::clone(class), source, namespace))
            }
            DeclarationNode::Function(function) => {
                Reflection::Function(ReflectionFunction::new(Rc::clone(function), source, namespace))
            }
            DeclarationNode::Constant(constant) => {
                Reflection::Constant(ReflectionConstant::new(Rc::clone(constant), source, namespace))
            }
        })
    }
}
