//! stasis-core
//!
//! Static reflection for PHP source: find the declaration of a class,
//! function or constant, parse it, and evaluate its constant expressions,
//! all without executing any of the code being inspected.
//!
//! The pieces fit together as follows:
//!
//! - a [`locators::SourceLocator`] strategy turns an [`identifier::Identifier`]
//!   into a [`source::LocatedSource`] and asks the [`ast::AstLocator`] for the
//!   matching declaration;
//! - the [`reflector::Reflector`] is the facade callers use;
//! - the [`compiler`] evaluates constant expressions (constant values,
//!   property and parameter defaults) on demand.

pub mod ast;
pub mod compiler;
pub mod identifier;
pub mod locators;
pub mod reflection;
pub mod reflector;
pub mod source;

pub use compiler::value::{PhpString, Value};
pub use compiler::{CompileError, CompileResult, CompiledValue, CompilerContext};
pub use identifier::{Identifier, IdentifierError, IdentifierKind};
pub use locators::{LocatorError, LocatorResult, SourceLocator};
pub use reflection::{Reflection, ReflectionClass, ReflectionConstant, ReflectionFunction, ReflectionMethod};
pub use reflector::{ReflectionError, ReflectionResult, Reflector};
pub use source::{LocatedSource, LocatedSourceError, Provenance};
