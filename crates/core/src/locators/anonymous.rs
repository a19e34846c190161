//! Locators for anonymous classes and closures, identified by the file and
//! line they are declared on.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::ast::locator::AstLocator;
use crate::identifier::{Identifier, IdentifierKind};
use crate::locators::{LocatorError, LocatorResult, SourceLocator};
use crate::reflection::Reflection;
use crate::reflector::Reflector;
use crate::source::{normalize_path, read_php_file, LocatedSource};

/// Shared lookup for both locators: `kind` is `Class` for anonymous classes
/// and `Function` for closures.
struct AnonymousOnLine {
    file: PathBuf,
    line: u32,
    kind: IdentifierKind,
    ast: Rc<AstLocator>,
}

impl AnonymousOnLine {
    fn new(
        file: impl Into<PathBuf>,
        line: u32,
        kind: IdentifierKind,
        ast: Rc<AstLocator>,
    ) -> LocatorResult<Self> {
        let file = file.into();
        // Fails early for a missing file.
        LocatedSource::new("", None, Some(file.as_path()))?;
        Ok(Self { file, line, kind, ast })
    }

    fn not_found(&self) -> LocatorError {
        let (file, line) = (normalize_path(&self.file), self.line);
        match self.kind {
            IdentifierKind::Class => LocatorError::NoAnonymousDeclarationOnLine { file, line },
            _ => LocatorError::NoClosureOnLine { file, line },
        }
    }

    fn ambiguous(&self) -> LocatorError {
        let (file, line) = (normalize_path(&self.file), self.line);
        match self.kind {
            IdentifierKind::Class => LocatorError::TwoAnonymousDeclarationsOnSameLine { file, line },
            _ => LocatorError::TwoClosuresOnSameLine { file, line },
        }
    }

    fn locate(&self, reflector: &Reflector) -> LocatorResult<Reflection> {
        let text = read_php_file(&self.file).map_err(|e| LocatorError::io(&self.file, e))?;
        let whole_file = LocatedSource::new(text.as_str(), None, Some(self.file.as_path()))?;
        let mut declarations =
            self.ast.anonymous_declarations_on_line(&whole_file, self.kind, self.line)?;

        let declaration = match declarations.len() {
            0 => return Err(self.not_found()),
            1 => declarations.remove(0),
            _ => return Err(self.ambiguous()),
        };
        let source = Rc::new(LocatedSource::anonymous(
            text,
            &self.file,
            declaration.node.line(),
            declaration.node.column(),
        )?);
        self.ast.convert(reflector, &declaration, &source).ok_or_else(|| self.not_found())
    }

    fn wanted(&self, identifier: &Identifier) -> bool {
        match self.kind {
            IdentifierKind::Class => identifier.is_anonymous_class(),
            _ => identifier.is_closure(),
        }
    }

    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        if !self.wanted(identifier) {
            return Ok(None);
        }
        self.locate(reflector).map(Some)
    }

    fn locate_all_of_kind(
        &self,
        reflector: &Reflector,
        kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>> {
        if kind != self.kind {
            return Ok(Vec::new());
        }
        Ok(vec![self.locate(reflector)?])
    }
}

/// Locates the anonymous class declared on a given line of a file.
pub struct AnonymousClassSourceLocator {
    inner: AnonymousOnLine,
}

impl AnonymousClassSourceLocator {
    pub fn new(file: impl AsRef<Path>, line: u32, ast: Rc<AstLocator>) -> LocatorResult<Self> {
        let inner = AnonymousOnLine::new(file.as_ref(), line, IdentifierKind::Class, ast)?;
        Ok(Self { inner })
    }
}

impl SourceLocator for AnonymousClassSourceLocator {
    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        self.inner.locate_one(reflector, identifier)
    }

    fn locate_all_of_kind(
        &self,
        reflector: &Reflector,
        kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>> {
        self.inner.locate_all_of_kind(reflector, kind)
    }
}

/// Locates the closure or arrow function declared on a given line of a file.
pub struct ClosureSourceLocator {
    inner: AnonymousOnLine,
}

impl ClosureSourceLocator {
    pub fn new(file: impl AsRef<Path>, line: u32, ast: Rc<AstLocator>) -> LocatorResult<Self> {
        let inner = AnonymousOnLine::new(file.as_ref(), line, IdentifierKind::Function, ast)?;
        Ok(Self { inner })
    }
}

impl SourceLocator for ClosureSourceLocator {
    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        self.inner.locate_one(reflector, identifier)
    }

    fn locate_all_of_kind(
        &self,
        reflector: &Reflector,
        kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>> {
        self.inner.locate_all_of_kind(reflector, kind)
    }
}
