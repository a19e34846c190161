//! Finds declarations inside parsed sources.
//!
//! Parse results are cached for the lifetime of the locator, keyed by the
//! backing file when there is one and by a content hash otherwise.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, trace};
use thiserror::Error;

use crate::ast::error::SyntaxError;
use crate::ast::node::{ClassMember, SourceFile, Stmt};
use crate::ast::parser::parse;
use crate::ast::strategy::{DeclarationNode, DefaultNodeToReflection, NodeToReflection};
use crate::identifier::{Identifier, IdentifierKind};
use crate::reflection::Reflection;
use crate::reflector::Reflector;
use crate::source::LocatedSource;

/// Error type for AST location.
#[derive(Debug, Error)]
pub enum AstLocatorError {
    #[error("{kind} \"{name}\" could not be found in the located source")]
    IdentifierNotFound { name: String, kind: IdentifierKind },

    #[error("Failed to parse {location}")]
    ParseFailure {
        location: String,
        #[source]
        source: SyntaxError,
    },
}

/// Convenience result type for AST location.
pub type AstLocatorResult<T> = Result<T, AstLocatorError>;

/// A declaration node together with the namespace it was declared in.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedDeclaration {
    pub node: DeclarationNode,
    pub namespace: Option<String>,
    /// Anonymous classes, closures and arrow functions.
    pub anonymous: bool,
}

pub struct AstLocator {
    cache: RefCell<HashMap<String, Rc<SourceFile>>>,
    strategy: Box<dyn NodeToReflection>,
}

impl Default for AstLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl AstLocator {
    pub fn new() -> Self {
        Self { cache: RefCell::new(HashMap::new()), strategy: Box::new(DefaultNodeToReflection) }
    }

    /// Replace the node conversion strategy.
    pub fn with_strategy(mut self, strategy: impl NodeToReflection + 'static) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    /// Number of distinct parse results held by the cache.
    pub fn cached_trees(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Parse `source`, or return the cached tree.
    pub fn parse(&self, source: &LocatedSource) -> AstLocatorResult<Rc<SourceFile>> {
        let key = source.cache_key();
        if let Some(tree) = self.cache.borrow().get(&key) {
            trace!("parse cache hit for {key}");
            return Ok(Rc::clone(tree));
        }

        debug!("parsing {}", source.describe());
        let tree = parse(source.text()).map_err(|source_error| AstLocatorError::ParseFailure {
            location: source.describe(),
            source: source_error,
        })?;
        let tree = Rc::new(tree);
        self.cache.borrow_mut().insert(key, Rc::clone(&tree));
        Ok(tree)
    }

    /// Every declaration in `source`, in source order.
    pub fn declarations(&self, source: &LocatedSource) -> AstLocatorResult<Vec<LocatedDeclaration>> {
        let tree = self.parse(source)?;
        let mut found = Vec::new();
        let mut namespaces = Vec::new();
        collect(&tree.statements, &mut namespaces, &mut found);
        Ok(found)
    }

    pub fn convert(
        &self,
        reflector: &Reflector,
        declaration: &LocatedDeclaration,
        source: &Rc<LocatedSource>,
    ) -> Option<Reflection> {
        self.strategy
            .convert(reflector, &declaration.node, source, declaration.namespace.as_deref())
            .filter(|reflection| declaration.node.kind().matches(reflection))
    }

    pub fn find_one(
        &self,
        reflector: &Reflector,
        source: &Rc<LocatedSource>,
        identifier: &Identifier,
    ) -> AstLocatorResult<Reflection> {
        let wanted = lookup_name(source, identifier);
        let kind = identifier.kind();
        self.find_all_of_kind(reflector, source, kind)?
            .into_iter()
            .find(|reflection| same_name(kind, reflection.name(), &wanted))
            .ok_or_else(|| AstLocatorError::IdentifierNotFound {
                name: identifier.name().to_string(),
                kind,
            })
    }

    /// Named declarations of `kind`; anonymous ones are never included.
    pub fn find_all_of_kind(
        &self,
        reflector: &Reflector,
        source: &Rc<LocatedSource>,
        kind: IdentifierKind,
    ) -> AstLocatorResult<Vec<Reflection>> {
        Ok(self
            .declarations(source)?
            .iter()
            .filter(|declaration| !declaration.anonymous && declaration.node.kind() == kind)
            .filter_map(|declaration| self.convert(reflector, declaration, source))
            .collect())
    }

    /// Anonymous classes (`kind == Class`) or closures (`kind == Function`)
    /// declared on `line`.
    pub fn anonymous_declarations_on_line(
        &self,
        source: &LocatedSource,
        kind: IdentifierKind,
        line: u32,
    ) -> AstLocatorResult<Vec<LocatedDeclaration>> {
        Ok(self
            .declarations(source)?
            .into_iter()
            .filter(|declaration| {
                declaration.anonymous
                    && declaration.node.kind() == kind
                    && declaration.node.line() == line
            })
            .collect())
    }

    pub fn find_anonymous_on_line(
        &self,
        reflector: &Reflector,
        source: &Rc<LocatedSource>,
        kind: IdentifierKind,
        line: u32,
    ) -> AstLocatorResult<Vec<Reflection>> {
        Ok(self
            .anonymous_declarations_on_line(source, kind, line)?
            .iter()
            .filter_map(|declaration| self.convert(reflector, declaration, source))
            .collect())
    }
}

/// For sources reached through an alias, a lookup by the alias means the
/// declared name.
fn lookup_name(source: &LocatedSource, identifier: &Identifier) -> String {
    match (source.alias(), source.declared_name()) {
        (Some(alias), Some(declared)) if identifier.matches_name(alias) => declared.to_string(),
        _ => identifier.name().to_string(),
    }
}

fn same_name(kind: IdentifierKind, declared: &str, wanted: &str) -> bool {
    if kind.is_case_insensitive() {
        declared.eq_ignore_ascii_case(wanted)
    } else {
        declared == wanted
    }
}

fn collect(
    statements: &[Stmt],
    namespaces: &mut Vec<Option<String>>,
    found: &mut Vec<LocatedDeclaration>,
) {
    for statement in statements {
        let namespace = namespaces.last().cloned().flatten();
        let entry = |node: DeclarationNode, anonymous: bool| LocatedDeclaration {
            node,
            namespace: namespace.clone(),
            anonymous,
        };

        match statement {
            Stmt::Namespace(block) => {
                namespaces.push(block.name.clone());
                collect(&block.statements, namespaces, found);
                namespaces.pop();
            }
            Stmt::Class(class) | Stmt::AnonymousClass(class) => {
                found.push(entry(DeclarationNode::Class(Rc::clone(class)), class.is_anonymous()));
                for member in &class.members {
                    if let ClassMember::Method(method) = member {
                        if let Some(body) = &method.body {
                            collect(body, namespaces, found);
                        }
                    }
                }
            }
            Stmt::Function(function) | Stmt::Closure(function) => {
                found.push(entry(DeclarationNode::Function(Rc::clone(function)), function.is_closure()));
                if let Some(body) = &function.body {
                    collect(body, namespaces, found);
                }
            }
            Stmt::Constants(constants) => {
                for constant in constants {
                    found.push(entry(DeclarationNode::Constant(Rc::clone(constant)), false));
                }
            }
            Stmt::Block(body) => collect(body, namespaces, found),
        }
    }
}
