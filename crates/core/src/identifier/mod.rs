//! Identifiers: what is being looked up, and what kind of symbol it is.
//!
//! An `Identifier` is the unit every locator and the reflector work with. It is
//! validated once at construction so that the rest of the system can assume:
//! - the name never starts with a namespace separator;
//! - the name is never empty;
//! - class and function names are syntactically valid qualified names.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reflection::Reflection;

/// Namespace separator used by the scripting language.
pub const NAMESPACE_SEPARATOR: char = '\\';

/// Prefix of the synthetic names given to anonymous classes.
pub const ANONYMOUS_CLASS_PREFIX: &str = "class@anonymous";

/// Name given to every closure and arrow function.
pub const CLOSURE_NAME: &str = "{closure}";

/// Error type for identifier construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The name is empty or is not a valid name for the requested kind.
    #[error("Invalid {kind} identifier name {name:?}")]
    InvalidIdentifierName { name: String, kind: IdentifierKind },
}

/// The kind of symbol an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Class,
    Function,
    Constant,
}

impl IdentifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IdentifierKind::Class => "class",
            IdentifierKind::Function => "function",
            IdentifierKind::Constant => "constant",
        }
    }

    /// True iff `reflection` was produced for a symbol of this kind.
    pub fn matches(self, reflection: &Reflection) -> bool {
        reflection.kind() == self
    }

    /// Class and function names are case-insensitive in the host language;
    /// constant names are not.
    pub fn is_case_insensitive(self) -> bool {
        !matches!(self, IdentifierKind::Constant)
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated `(name, kind)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    name: String,
    kind: IdentifierKind,
}

impl Identifier {
    /// Build an identifier, stripping leading namespace separators.
    pub fn new(name: impl Into<String>, kind: IdentifierKind) -> Result<Self, IdentifierError> {
        let raw = name.into();
        let name = raw.trim_start_matches(NAMESPACE_SEPARATOR).to_string();

        let valid = match kind {
            IdentifierKind::Constant => !name.is_empty(),
            IdentifierKind::Class => {
                name.starts_with(ANONYMOUS_CLASS_PREFIX) || is_valid_qualified_name(&name)
            }
            IdentifierKind::Function => name == CLOSURE_NAME || is_valid_qualified_name(&name),
        };

        if !valid {
            return Err(IdentifierError::InvalidIdentifierName { name: raw, kind });
        }

        Ok(Self { name, kind })
    }

    pub fn class(name: impl Into<String>) -> Result<Self, IdentifierError> {
        Self::new(name, IdentifierKind::Class)
    }

    pub fn function(name: impl Into<String>) -> Result<Self, IdentifierError> {
        Self::new(name, IdentifierKind::Function)
    }

    pub fn constant(name: impl Into<String>) -> Result<Self, IdentifierError> {
        Self::new(name, IdentifierKind::Constant)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    pub fn is_class(&self) -> bool {
        self.kind == IdentifierKind::Class
    }

    pub fn is_function(&self) -> bool {
        self.kind == IdentifierKind::Function
    }

    pub fn is_constant(&self) -> bool {
        self.kind == IdentifierKind::Constant
    }

    pub fn is_anonymous_class(&self) -> bool {
        self.is_class() && self.name.starts_with(ANONYMOUS_CLASS_PREFIX)
    }

    pub fn is_closure(&self) -> bool {
        self.is_function() && self.name == CLOSURE_NAME
    }

    /// Compare a declared symbol name against this identifier, honouring the
    /// case rules of the identifier's kind.
    pub fn matches_name(&self, declared: &str) -> bool {
        let declared = declared.trim_start_matches(NAMESPACE_SEPARATOR);
        if self.kind.is_case_insensitive() {
            declared.eq_ignore_ascii_case(&self.name)
        } else {
            declared == self.name
        }
    }

    /// Key used by caches: case-folded for classes and functions.
    pub fn cache_key(&self) -> (String, IdentifierKind) {
        let name = if self.kind.is_case_insensitive() {
            self.name.to_ascii_lowercase()
        } else {
            self.name.clone()
        };
        (name, self.kind)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic() || c as u32 >= 0x80
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit()
}

/// `Foo`, `Foo\Bar`, `_x\y9`; no empty segments.
pub fn is_valid_qualified_name(name: &str) -> bool {
    !name.is_empty()
        && name.split(NAMESPACE_SEPARATOR).all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if is_name_start(c)) && chars.all(is_name_char)
        })
}
