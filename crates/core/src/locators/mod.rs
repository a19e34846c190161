//! Source locators: strategies that turn an identifier into a reflection by
//! finding the source that declares it.
//!
//! Every strategy answers "not found" with `Ok(None)`. Errors are reserved
//! for malformed input, bad configuration, IO and parse failures.

pub mod aggregate;
pub mod anonymous;
pub mod autoload;
pub mod builtin;
pub mod composer;
pub mod directories;
pub mod evaluated;
pub mod file;
pub mod memoizing;
pub mod psr;
pub mod string;

use std::path::Path;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::locator::{AstLocator, AstLocatorError};
use crate::identifier::{Identifier, IdentifierKind};
use crate::reflection::Reflection;
use crate::reflector::Reflector;
use crate::source::{normalize_path, LocatedSource, LocatedSourceError};

pub use aggregate::AggregateSourceLocator;
pub use anonymous::{AnonymousClassSourceLocator, ClosureSourceLocator};
pub use autoload::{AutoloadHost, AutoloadSourceLocator, FileAccess, FileAccessSlot, RegisteredAutoloaders};
pub use builtin::BuiltinStubLocator;
pub use directories::DirectoriesSourceLocator;
pub use evaluated::EvaluatedCodeSourceLocator;
pub use file::{FileListSourceLocator, SingleFileSourceLocator};
pub use memoizing::MemoizingSourceLocator;
pub use psr::{Psr0Mapping, Psr4Mapping, PsrAutoloaderLocator, PsrMapping};
pub use string::StringSourceLocator;

/// Error type for source locators.
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("Source code string was empty")]
    EmptySourceCode,

    #[error("{path} is not a directory")]
    InvalidDirectory { path: String },

    #[error(transparent)]
    LocatedSource(#[from] LocatedSourceError),

    #[error(transparent)]
    Ast(#[from] AstLocatorError),

    #[error("Invalid prefix mapping {prefix:?}: {reason}")]
    InvalidPrefixMapping { prefix: String, reason: String },

    #[error("Could not locate project directory {path}")]
    InvalidProjectDirectory { path: String },

    #[error("Could not locate composer.json at {path}")]
    MissingManifest { path: String },

    #[error("Could not locate installed.json at {path}")]
    MissingInstalledManifest { path: String },

    #[error("Failed to parse {path}")]
    FailedToParseJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not locate a stub index at {path}")]
    MissingStubIndex { path: String },

    #[error("Stub file {file} is listed in the index but not available")]
    MissingStubFile { file: String },

    #[error("I/O error on {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("A file access probe is already active")]
    ProbeAlreadyActive,

    #[error("No anonymous class declared on line {line} of {file}")]
    NoAnonymousDeclarationOnLine { file: String, line: u32 },

    #[error("Two or more anonymous classes declared on line {line} of {file}")]
    TwoAnonymousDeclarationsOnSameLine { file: String, line: u32 },

    #[error("No closure declared on line {line} of {file}")]
    NoClosureOnLine { file: String, line: u32 },

    #[error("Two or more closures declared on line {line} of {file}")]
    TwoClosuresOnSameLine { file: String, line: u32 },
}

impl LocatorError {
    /// Errors that only say "this locator has nothing for you"; aggregate
    /// locators move on to the next strategy.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LocatorError::NoAnonymousDeclarationOnLine { .. }
                | LocatorError::NoClosureOnLine { .. }
                | LocatorError::Ast(AstLocatorError::IdentifierNotFound { .. })
        )
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        LocatorError::Io { path: normalize_path(path), source }
    }
}

/// Convenience result type for source locators.
pub type LocatorResult<T> = Result<T, LocatorError>;

/// A strategy for finding the source that declares a symbol.
pub trait SourceLocator {
    /// Reflection of `identifier`, or `None` when this strategy cannot find it.
    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>>;

    /// Every named declaration of `kind` this strategy can see.
    fn locate_all_of_kind(
        &self,
        reflector: &Reflector,
        kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>>;
}

impl<T: SourceLocator + ?Sized> SourceLocator for Box<T> {
    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        (**self).locate_one(reflector, identifier)
    }

    fn locate_all_of_kind(
        &self,
        reflector: &Reflector,
        kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>> {
        (**self).locate_all_of_kind(reflector, kind)
    }
}

impl<T: SourceLocator + ?Sized> SourceLocator for Rc<T> {
    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        (**self).locate_one(reflector, identifier)
    }

    fn locate_all_of_kind(
        &self,
        reflector: &Reflector,
        kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>> {
        (**self).locate_all_of_kind(reflector, kind)
    }
}

/// Ask the AST locator for `identifier` in `source`, mapping "not declared
/// here" to `None`.
pub(crate) fn find_in_source(
    ast: &AstLocator,
    reflector: &Reflector,
    source: &Rc<LocatedSource>,
    identifier: &Identifier,
) -> LocatorResult<Option<Reflection>> {
    match ast.find_one(reflector, source, identifier) {
        Ok(reflection) => Ok(Some(reflection)),
        Err(AstLocatorError::IdentifierNotFound { .. }) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
