//! Locator over the `.php` files of one or more directories.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;

use crate::ast::locator::AstLocator;
use crate::identifier::{Identifier, IdentifierKind};
use crate::locators::file::FileListSourceLocator;
use crate::locators::{LocatorError, LocatorResult, SourceLocator};
use crate::reflection::Reflection;
use crate::reflector::Reflector;
use crate::source::normalize_path;

/// Searches the immediate `.php` files of each root, roots in the order
/// given and files in sorted order. Use [`DirectoriesSourceLocator::recursive`]
/// to include nested directories.
pub struct DirectoriesSourceLocator {
    roots: Vec<PathBuf>,
    ast: Rc<AstLocator>,
    files: RefCell<Option<Rc<FileListSourceLocator>>>,
}

impl DirectoriesSourceLocator {
    pub fn new(
        roots: impl IntoIterator<Item = impl Into<PathBuf>>,
        ast: Rc<AstLocator>,
    ) -> LocatorResult<Self> {
        let roots: Vec<PathBuf> = roots.into_iter().map(Into::into).collect();
        for root in &roots {
            if !root.is_dir() {
                return Err(LocatorError::InvalidDirectory { path: normalize_path(root) });
            }
        }
        Ok(Self { roots, ast, files: RefCell::new(None) })
    }

    /// Like `new`, but every directory below each root becomes a root of
    /// its own.
    pub fn recursive(
        roots: impl IntoIterator<Item = impl Into<PathBuf>>,
        ast: Rc<AstLocator>,
    ) -> LocatorResult<Self> {
        let shallow = Self::new(roots, ast)?;
        let mut expanded = Vec::new();
        for root in &shallow.roots {
            expand(root, &mut expanded)?;
        }
        Ok(Self { roots: expanded, ..shallow })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// `.php` files of every root; listed once and kept.
    fn files(&self) -> LocatorResult<Rc<FileListSourceLocator>> {
        if let Some(files) = self.files.borrow().as_ref() {
            return Ok(Rc::clone(files));
        }
        let mut paths = Vec::new();
        for root in &self.roots {
            paths.extend(php_files(root)?);
        }
        debug!("{} php files under {} directories", paths.len(), self.roots.len());
        let files = Rc::new(FileListSourceLocator::new(paths, Rc::clone(&self.ast))?);
        *self.files.borrow_mut() = Some(Rc::clone(&files));
        Ok(files)
    }
}

impl SourceLocator for DirectoriesSourceLocator {
    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        self.files()?.locate_one(reflector, identifier)
    }

    fn locate_all_of_kind(
        &self,
        reflector: &Reflector,
        kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>> {
        self.files()?.locate_all_of_kind(reflector, kind)
    }
}

fn sorted_entries(dir: &Path) -> LocatorResult<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| LocatorError::io(dir, e))? {
        entries.push(entry.map_err(|e| LocatorError::io(dir, e))?.path());
    }
    entries.sort();
    Ok(entries)
}

fn php_files(dir: &Path) -> LocatorResult<Vec<PathBuf>> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "php"))
        .collect())
}

/// `dir` followed by every directory below it, depth first.
fn expand(dir: &Path, out: &mut Vec<PathBuf>) -> LocatorResult<()> {
    out.push(dir.to_path_buf());
    for entry in sorted_entries(dir)? {
        if entry.is_dir() {
            expand(&entry, out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_php_files_of_the_root_are_listed() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("b.php"), "<?php").expect("write");
        fs::write(dir.path().join("a.php"), "<?php").expect("write");
        fs::write(dir.path().join("notes.txt"), "").expect("write");
        fs::create_dir(dir.path().join("nested")).expect("mkdir");
        fs::write(dir.path().join("nested/c.php"), "<?php").expect("write");

        let names: Vec<_> = php_files(dir.path())
            .expect("list")
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(names, vec!["a.php", "b.php"]);

        let locator = DirectoriesSourceLocator::recursive([dir.path()], Rc::new(AstLocator::new()))
            .expect("recursive locator");
        assert_eq!(locator.roots().len(), 2);
    }

    #[test]
    fn files_are_rejected_as_roots() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("x.php");
        fs::write(&file, "<?php").expect("write");
        let result = DirectoriesSourceLocator::new([file], Rc::new(AstLocator::new()));
        assert!(matches!(result, Err(LocatorError::InvalidDirectory { .. })));
    }
}
