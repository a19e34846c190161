//! Locating classes through the host's own autoload rules, without letting
//! the host load anything.
//!
//! The host opens files through a [`FileAccessSlot`]. While a lookup runs,
//! the slot holds a probe that records the first path an autoloader asks
//! for and reports every include as failed, so the autoloader gives up and
//! nothing is declared. The recorded path is then parsed statically.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;

use crate::ast::locator::AstLocator;
use crate::identifier::{Identifier, IdentifierKind, NAMESPACE_SEPARATOR};
use crate::locators::{find_in_source, LocatorError, LocatorResult, SourceLocator};
use crate::reflection::Reflection;
use crate::reflector::Reflector;
use crate::source::{read_php_file, LocatedSource};

/// How the host opens a file for inclusion.
pub trait FileAccess {
    /// Include `path`; true when the file was loaded.
    fn include(&self, path: &Path) -> bool;
}

/// The host's current file access, replaceable for the duration of a probe.
pub struct FileAccessSlot {
    current: RefCell<Rc<dyn FileAccess>>,
    probing: Cell<bool>,
}

impl FileAccessSlot {
    pub fn new(access: Rc<dyn FileAccess>) -> Self {
        Self { current: RefCell::new(access), probing: Cell::new(false) }
    }

    /// Include `path` through whatever access is installed right now.
    pub fn include(&self, path: &Path) -> bool {
        let access = Rc::clone(&self.current.borrow());
        access.include(path)
    }

    /// Install `probe` until the returned guard is dropped.
    pub fn substitute(&self, probe: Rc<dyn FileAccess>) -> LocatorResult<SubstitutionGuard<'_>> {
        if self.probing.get() {
            return Err(LocatorError::ProbeAlreadyActive);
        }
        self.probing.set(true);
        let previous = self.current.replace(probe);
        Ok(SubstitutionGuard { slot: self, previous: Some(previous) })
    }

    pub fn is_probing(&self) -> bool {
        self.probing.get()
    }
}

/// Restores the previous file access when dropped.
pub struct SubstitutionGuard<'a> {
    slot: &'a FileAccessSlot,
    previous: Option<Rc<dyn FileAccess>>,
}

impl Drop for SubstitutionGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.slot.current.replace(previous);
        }
        self.slot.probing.set(false);
    }
}

/// Records the first path asked for and refuses every include.
#[derive(Default)]
struct PathProbe {
    first: RefCell<Option<PathBuf>>,
}

impl FileAccess for PathProbe {
    fn include(&self, path: &Path) -> bool {
        let mut first = self.first.borrow_mut();
        if first.is_none() {
            *first = Some(path.to_path_buf());
        }
        false
    }
}

/// What the locator needs from a host with dynamic symbol loading.
pub trait AutoloadHost {
    fn file_access(&self) -> &FileAccessSlot;

    /// Run the host's autoloaders for `class`; true if one of them succeeded.
    fn run_autoloaders(&self, class: &str) -> bool;

    /// True when the running host already declares the symbol.
    fn is_live(&self, kind: IdentifierKind, name: &str) -> bool;

    /// The class `alias` was aliased to, if it is an alias.
    fn alias_target(&self, alias: &str) -> Option<String>;

    /// File that declared a live symbol; `None` for engine-provided ones.
    fn declaring_file(&self, kind: IdentifierKind, name: &str) -> Option<PathBuf>;

    /// Source of a symbol declared by runtime-evaluated code.
    fn evaluated_source(&self, kind: IdentifierKind, name: &str) -> Option<String>;
}

/// Finds the file declaring a symbol by asking the host where it would load
/// it from.
pub struct AutoloadSourceLocator<H> {
    host: Rc<H>,
    ast: Rc<AstLocator>,
}

impl<H: AutoloadHost> AutoloadSourceLocator<H> {
    pub fn new(host: Rc<H>, ast: Rc<AstLocator>) -> Self {
        Self { host, ast }
    }

    /// Path the host would load `class` from.
    fn class_file(&self, class: &str) -> LocatorResult<Option<PathBuf>> {
        if self.host.is_live(IdentifierKind::Class, class) {
            return Ok(self.host.declaring_file(IdentifierKind::Class, class));
        }

        let probe = Rc::new(PathProbe::default());
        {
            let _guard = self.host.file_access().substitute(Rc::clone(&probe) as Rc<dyn FileAccess>)?;
            self.host.run_autoloaders(class);
        }
        let path = probe.first.borrow_mut().take();
        debug!("autoload probe for {class}: {path:?}");
        Ok(path)
    }

    fn locate_in_file(
        &self,
        reflector: &Reflector,
        path: &Path,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        if !path.is_file() {
            debug!("{} does not exist", path.display());
            return Ok(None);
        }
        let source = Rc::new(LocatedSource::from_file(path, Some(identifier.name().to_string()))?);
        find_in_source(&self.ast, reflector, &source, identifier)
    }
}

impl<H: AutoloadHost> SourceLocator for AutoloadSourceLocator<H> {
    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        let name = identifier.name();
        match identifier.kind() {
            IdentifierKind::Class => {
                if let Some(target) = self.host.alias_target(name) {
                    let Some(path) = self.class_file(&target)? else {
                        return Ok(None);
                    };
                    let text = read_php_file(&path).map_err(|e| LocatorError::io(&path, e))?;
                    let source = Rc::new(LocatedSource::aliased(text, target, &path, name)?);
                    return find_in_source(&self.ast, reflector, &source, identifier);
                }
                match self.class_file(name)? {
                    Some(path) => self.locate_in_file(reflector, &path, identifier),
                    None => Ok(None),
                }
            }
            kind => match self.host.declaring_file(kind, name) {
                Some(path) => self.locate_in_file(reflector, &path, identifier),
                None => Ok(None),
            },
        }
    }

    /// Autoload rules cannot be enumerated.
    fn locate_all_of_kind(
        &self,
        _reflector: &Reflector,
        _kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>> {
        Ok(Vec::new())
    }
}

/// Default file access: includes existing files and remembers them.
#[derive(Default)]
struct IncludingFileAccess {
    included: RefCell<Vec<PathBuf>>,
}

impl FileAccess for IncludingFileAccess {
    fn include(&self, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        self.included.borrow_mut().push(path.to_path_buf());
        true
    }
}

/// A loader: given a class name and the file access to load through,
/// returns true once it has loaded the class.
pub type Autoloader = Box<dyn Fn(&str, &FileAccessSlot) -> bool>;

type SymbolKey = (IdentifierKind, String);

fn symbol_key(kind: IdentifierKind, name: &str) -> SymbolKey {
    let name = name.trim_start_matches(NAMESPACE_SEPARATOR);
    if kind.is_case_insensitive() {
        (kind, name.to_ascii_lowercase())
    } else {
        (kind, name.to_string())
    }
}

/// An in-process host: loaders run in registration order, a symbol becomes
/// live when a loader succeeds outside a probe.
pub struct RegisteredAutoloaders {
    slot: FileAccessSlot,
    files: Rc<IncludingFileAccess>,
    loaders: Vec<Autoloader>,
    live: RefCell<HashMap<SymbolKey, Option<PathBuf>>>,
    aliases: HashMap<String, String>,
    evaluated: HashMap<SymbolKey, String>,
}

impl Default for RegisteredAutoloaders {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisteredAutoloaders {
    pub fn new() -> Self {
        let files = Rc::new(IncludingFileAccess::default());
        Self {
            slot: FileAccessSlot::new(Rc::clone(&files) as Rc<dyn FileAccess>),
            files,
            loaders: Vec::new(),
            live: RefCell::new(HashMap::new()),
            aliases: HashMap::new(),
            evaluated: HashMap::new(),
        }
    }

    pub fn with_autoloader(mut self, loader: impl Fn(&str, &FileAccessSlot) -> bool + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    /// Register `alias` as another name for class `target`.
    pub fn with_alias(mut self, alias: &str, target: &str) -> Self {
        let (_, key) = symbol_key(IdentifierKind::Class, alias);
        self.aliases.insert(key, target.trim_start_matches(NAMESPACE_SEPARATOR).to_string());
        self
    }

    /// Record source text for a symbol declared by evaluated code. The symbol
    /// is live from then on.
    pub fn with_evaluated(mut self, kind: IdentifierKind, name: &str, source: &str) -> Self {
        self.evaluated.insert(symbol_key(kind, name), source.to_string());
        self.live.get_mut().insert(symbol_key(kind, name), None);
        self
    }

    /// Mark a symbol as declared by the running host.
    pub fn declare_live(&self, kind: IdentifierKind, name: &str, file: Option<PathBuf>) {
        self.live.borrow_mut().insert(symbol_key(kind, name), file);
    }

    /// Run the loaders for `class` the way the host would on first use.
    pub fn load_class(&self, class: &str) -> bool {
        for loader in &self.loaders {
            if loader(class, &self.slot) {
                if !self.slot.is_probing() {
                    let file = self.files.included.borrow().last().cloned();
                    self.declare_live(IdentifierKind::Class, class, file);
                }
                return true;
            }
        }
        false
    }

    /// Every file included so far, in order.
    pub fn included_files(&self) -> Vec<PathBuf> {
        self.files.included.borrow().clone()
    }
}

impl AutoloadHost for RegisteredAutoloaders {
    fn file_access(&self) -> &FileAccessSlot {
        &self.slot
    }

    fn run_autoloaders(&self, class: &str) -> bool {
        self.load_class(class)
    }

    fn is_live(&self, kind: IdentifierKind, name: &str) -> bool {
        self.live.borrow().contains_key(&symbol_key(kind, name))
    }

    fn alias_target(&self, alias: &str) -> Option<String> {
        let (_, key) = symbol_key(IdentifierKind::Class, alias);
        self.aliases.get(&key).cloned()
    }

    fn declaring_file(&self, kind: IdentifierKind, name: &str) -> Option<PathBuf> {
        self.live.borrow().get(&symbol_key(kind, name)).cloned().flatten()
    }

    fn evaluated_source(&self, kind: IdentifierKind, name: &str) -> Option<String> {
        self.evaluated.get(&symbol_key(kind, name)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    struct Refuse;

    impl FileAccess for Refuse {
        fn include(&self, _path: &Path) -> bool {
            false
        }
    }

    #[test]
    fn guard_restores_previous_access_and_refuses_reentry() {
        let host = RegisteredAutoloaders::new();
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("a.php");
        fs::write(&file, "<?php").expect("write");

        {
            let _guard = host.file_access().substitute(Rc::new(Refuse)).expect("first probe");
            assert!(host.file_access().is_probing());
            assert!(!host.file_access().include(&file));
            assert!(matches!(
                host.file_access().substitute(Rc::new(Refuse)),
                Err(LocatorError::ProbeAlreadyActive)
            ));
        }

        assert!(!host.file_access().is_probing());
        assert!(host.file_access().include(&file));
        assert_eq!(host.included_files(), vec![file]);
    }

    #[test]
    fn probe_keeps_the_first_path() {
        let probe = PathProbe::default();
        assert!(!probe.include(Path::new("/a.php")));
        assert!(!probe.include(Path::new("/b.php")));
        assert_eq!(probe.first.borrow().as_deref(), Some(Path::new("/a.php")));
    }
}
