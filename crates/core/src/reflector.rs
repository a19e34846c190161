//! Reflector facade: name in, reflection out.

use std::collections::HashMap;

use log::debug;
use thiserror::Error;

use crate::compiler::value::Value;
use crate::compiler::CompileError;
use crate::identifier::{Identifier, IdentifierError, IdentifierKind};
use crate::locators::{LocatorError, SourceLocator};
use crate::reflection::{Reflection, ReflectionClass, ReflectionConstant, ReflectionFunction};

/// Error type for reflector lookups.
#[derive(Debug, Error)]
pub enum ReflectionError {
    #[error("{kind} \"{name}\" could not be found")]
    IdentifierNotFound { name: String, kind: IdentifierKind },

    #[error("{class} has no member {member}")]
    MemberNotFound { class: String, member: String },

    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Compile(Box<CompileError>),
}

impl From<CompileError> for ReflectionError {
    fn from(err: CompileError) -> Self {
        ReflectionError::Compile(Box::new(err))
    }
}

impl ReflectionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReflectionError::IdentifierNotFound { .. })
    }
}

/// Convenience result type for reflector lookups.
pub type ReflectionResult<T> = Result<T, ReflectionError>;

/// Looks symbols up through a source locator. Nothing it does declares a
/// symbol in the running host.
pub struct Reflector {
    locator: Box<dyn SourceLocator>,
    global_constants: HashMap<String, Value>,
}

impl Reflector {
    pub fn new(locator: impl SourceLocator + 'static) -> Self {
        Self { locator: Box::new(locator), global_constants: HashMap::new() }
    }

    /// Constants the expression compiler may use before asking the locator.
    pub fn with_global_constants(
        mut self,
        constants: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        self.global_constants.extend(constants);
        self
    }

    pub fn global_constant(&self, name: &str) -> Option<&Value> {
        self.global_constants.get(name)
    }

    pub fn reflect(&self, identifier: &Identifier) -> ReflectionResult<Reflection> {
        debug!("reflecting {identifier}");
        self.locator.locate_one(self, identifier)?.ok_or_else(|| {
            ReflectionError::IdentifierNotFound {
                name: identifier.name().to_string(),
                kind: identifier.kind(),
            }
        })
    }

    pub fn reflect_class(&self, name: &str) -> ReflectionResult<ReflectionClass> {
        let identifier = Identifier::class(name)?;
        let reflection = self.reflect(&identifier)?;
        reflection.into_class().ok_or_else(|| not_found(&identifier))
    }

    pub fn reflect_function(&self, name: &str) -> ReflectionResult<ReflectionFunction> {
        let identifier = Identifier::function(name)?;
        let reflection = self.reflect(&identifier)?;
        reflection.into_function().ok_or_else(|| not_found(&identifier))
    }

    pub fn reflect_constant(&self, name: &str) -> ReflectionResult<ReflectionConstant> {
        let identifier = Identifier::constant(name)?;
        let reflection = self.reflect(&identifier)?;
        reflection.into_constant().ok_or_else(|| not_found(&identifier))
    }

    pub fn reflect_all_of_kind(&self, kind: IdentifierKind) -> ReflectionResult<Vec<Reflection>> {
        Ok(self.locator.locate_all_of_kind(self, kind)?)
    }

    pub fn reflect_all_classes(&self) -> ReflectionResult<Vec<ReflectionClass>> {
        Ok(self
            .reflect_all_of_kind(IdentifierKind::Class)?
            .into_iter()
            .filter_map(Reflection::into_class)
            .collect())
    }

    pub fn reflect_all_functions(&self) -> ReflectionResult<Vec<ReflectionFunction>> {
        Ok(self
            .reflect_all_of_kind(IdentifierKind::Function)?
            .into_iter()
            .filter_map(Reflection::into_function)
            .collect())
    }

    pub fn reflect_all_constants(&self) -> ReflectionResult<Vec<ReflectionConstant>> {
        Ok(self
            .reflect_all_of_kind(IdentifierKind::Constant)?
            .into_iter()
            .filter_map(Reflection::into_constant)
            .collect())
    }

    /// Reflect constant `name` and compile its value.
    pub fn constant_value(&self, name: &str) -> ReflectionResult<Value> {
        Ok(self.reflect_constant(name)?.value(self)?)
    }
}

fn not_found(identifier: &Identifier) -> ReflectionError {
    ReflectionError::IdentifierNotFound {
        name: identifier.name().to_string(),
        kind: identifier.kind(),
    }
}
