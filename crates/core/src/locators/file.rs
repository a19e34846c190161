//! Locators backed by individual files on disk.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::trace;

use crate::ast::locator::AstLocator;
use crate::identifier::{Identifier, IdentifierKind};
use crate::locators::{find_in_source, LocatorResult, SourceLocator};
use crate::reflection::Reflection;
use crate::reflector::Reflector;
use crate::source::{normalize_path, LocatedSource, LocatedSourceError};

/// Locates symbols in one file. The file must exist at construction; its
/// text is read on first use and kept.
pub struct SingleFileSourceLocator {
    path: PathBuf,
    ast: Rc<AstLocator>,
    source: RefCell<Option<Rc<LocatedSource>>>,
}

impl SingleFileSourceLocator {
    pub fn new(path: impl Into<PathBuf>, ast: Rc<AstLocator>) -> LocatorResult<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(LocatedSourceError::InvalidFileLocation {
                path: normalize_path(&path),
                reason: "file does not exist".to_string(),
            }
            .into());
        }
        Ok(Self { path, ast, source: RefCell::new(None) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn source(&self) -> LocatorResult<Rc<LocatedSource>> {
        if let Some(source) = self.source.borrow().as_ref() {
            return Ok(Rc::clone(source));
        }
        trace!("reading {}", self.path.display());
        let source = Rc::new(LocatedSource::from_file(&self.path, None)?);
        *self.source.borrow_mut() = Some(Rc::clone(&source));
        Ok(source)
    }
}

impl SourceLocator for SingleFileSourceLocator {
    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        find_in_source(&self.ast, reflector, &self.source()?, identifier)
    }

    fn locate_all_of_kind(
        &self,
        reflector: &Reflector,
        kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>> {
        Ok(self.ast.find_all_of_kind(reflector, &self.source()?, kind)?)
    }
}

/// Locates symbols in a fixed list of files, searched in order.
pub struct FileListSourceLocator {
    files: Vec<SingleFileSourceLocator>,
}

impl FileListSourceLocator {
    pub fn new(
        paths: impl IntoIterator<Item = impl Into<PathBuf>>,
        ast: Rc<AstLocator>,
    ) -> LocatorResult<Self> {
        let files = paths
            .into_iter()
            .map(|path| SingleFileSourceLocator::new(path, Rc::clone(&ast)))
            .collect::<LocatorResult<Vec<_>>>()?;
        Ok(Self { files })
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(SingleFileSourceLocator::path)
    }
}

impl SourceLocator for FileListSourceLocator {
    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        for file in &self.files {
            if let Some(reflection) = file.locate_one(reflector, identifier)? {
                return Ok(Some(reflection));
            }
        }
        Ok(None)
    }

    fn locate_all_of_kind(
        &self,
        reflector: &Reflector,
        kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>> {
        let mut found = Vec::new();
        for file in &self.files {
            found.extend(file.locate_all_of_kind(reflector, kind)?);
        }
        Ok(found)
    }
}
