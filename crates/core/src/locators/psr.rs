//! Namespace-prefix to directory mappings (PSR-4 and PSR-0 style) and the
//! locator that walks their candidate files.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;

use crate::ast::locator::AstLocator;
use crate::identifier::{Identifier, IdentifierKind, NAMESPACE_SEPARATOR};
use crate::locators::directories::DirectoriesSourceLocator;
use crate::locators::{find_in_source, LocatorError, LocatorResult, SourceLocator};
use crate::reflection::Reflection;
use crate::reflector::Reflector;
use crate::source::{normalize_path, LocatedSource};

/// Maps a class name to the files that may declare it.
pub trait PsrMapping {
    /// Candidate files for `identifier`, most specific mapping first.
    fn resolve_possible_file_paths(&self, identifier: &Identifier) -> Vec<PathBuf>;

    /// Every mapped directory, without duplicates, in table order.
    fn directories(&self) -> Vec<PathBuf>;
}

type PrefixTable = Vec<(String, Vec<PathBuf>)>;

fn build_table<S, P>(
    mappings: impl IntoIterator<Item = (S, Vec<P>)>,
    normalize: impl Fn(&str) -> String,
) -> LocatorResult<PrefixTable>
where
    S: Into<String>,
    P: AsRef<Path>,
{
    let mut table = Vec::new();
    for (prefix, dirs) in mappings {
        let prefix: String = prefix.into();
        if prefix.trim_matches(NAMESPACE_SEPARATOR).is_empty() {
            return Err(LocatorError::InvalidPrefixMapping {
                prefix,
                reason: "prefix must not be empty".to_string(),
            });
        }
        if dirs.is_empty() {
            return Err(LocatorError::InvalidPrefixMapping {
                prefix,
                reason: "no directories given".to_string(),
            });
        }
        let mut paths = Vec::with_capacity(dirs.len());
        for dir in dirs {
            let dir = dir.as_ref();
            if !dir.is_dir() {
                return Err(LocatorError::InvalidDirectory { path: normalize_path(dir) });
            }
            paths.push(dir.to_path_buf());
        }
        table.push((normalize(&prefix), paths));
    }
    Ok(table)
}

fn unique_directories(table: &PrefixTable) -> Vec<PathBuf> {
    let mut seen = Vec::new();
    for dir in table.iter().flat_map(|(_, dirs)| dirs) {
        if !seen.contains(dir) {
            seen.push(dir.clone());
        }
    }
    seen
}

/// PSR-4: the part of the class name after the prefix becomes the relative
/// path, with namespace separators as directory separators.
#[derive(Debug, Clone)]
pub struct Psr4Mapping {
    table: PrefixTable,
}

impl Psr4Mapping {
    /// Prefixes are normalized to end with a single `\`. Directories must
    /// exist.
    pub fn new<S, P>(mappings: impl IntoIterator<Item = (S, Vec<P>)>) -> LocatorResult<Self>
    where
        S: Into<String>,
        P: AsRef<Path>,
    {
        let table = build_table(mappings, |prefix| {
            format!("{}\\", prefix.trim_matches(NAMESPACE_SEPARATOR))
        })?;
        Ok(Self { table })
    }
}

impl PsrMapping for Psr4Mapping {
    fn resolve_possible_file_paths(&self, identifier: &Identifier) -> Vec<PathBuf> {
        if !identifier.is_class() {
            return Vec::new();
        }
        let name = identifier.name();
        let mut candidates = Vec::new();
        for (prefix, dirs) in &self.table {
            let Some(remainder) = name.strip_prefix(prefix.as_str()) else {
                continue;
            };
            if remainder.is_empty() {
                continue;
            }
            let relative = format!("{}.php", remainder.replace(NAMESPACE_SEPARATOR, "/"));
            candidates.extend(dirs.iter().map(|dir| dir.join(&relative)));
        }
        candidates
    }

    fn directories(&self) -> Vec<PathBuf> {
        unique_directories(&self.table)
    }
}

/// PSR-0: like PSR-4, but underscores in the remainder also separate
/// directories, and a name equal to its prefix maps to a file named after
/// the prefix.
#[derive(Debug, Clone)]
pub struct Psr0Mapping {
    table: PrefixTable,
}

impl Psr0Mapping {
    /// Prefixes are kept as written (`App_`, `Vendor\Package\`).
    pub fn new<S, P>(mappings: impl IntoIterator<Item = (S, Vec<P>)>) -> LocatorResult<Self>
    where
        S: Into<String>,
        P: AsRef<Path>,
    {
        let table = build_table(mappings, str::to_string)?;
        Ok(Self { table })
    }
}

impl PsrMapping for Psr0Mapping {
    fn resolve_possible_file_paths(&self, identifier: &Identifier) -> Vec<PathBuf> {
        if !identifier.is_class() {
            return Vec::new();
        }
        let name = identifier.name();
        let mut candidates = Vec::new();
        for (prefix, dirs) in &self.table {
            let bare_prefix = prefix.trim_end_matches(NAMESPACE_SEPARATOR);
            let relative = if name == prefix || name == bare_prefix {
                format!("{}.php", bare_prefix.replace(NAMESPACE_SEPARATOR, "/"))
            } else if let Some(remainder) = name.strip_prefix(prefix.as_str()) {
                format!("{}.php", remainder.replace([NAMESPACE_SEPARATOR, '_'], "/"))
            } else {
                continue;
            };
            candidates.extend(dirs.iter().map(|dir| dir.join(&relative)));
        }
        candidates
    }

    fn directories(&self) -> Vec<PathBuf> {
        unique_directories(&self.table)
    }
}

/// Locates classes by trying each candidate file of a prefix mapping.
pub struct PsrAutoloaderLocator {
    mapping: Box<dyn PsrMapping>,
    ast: Rc<AstLocator>,
}

impl PsrAutoloaderLocator {
    pub fn new(mapping: impl PsrMapping + 'static, ast: Rc<AstLocator>) -> Self {
        Self { mapping: Box::new(mapping), ast }
    }

    pub fn mapping(&self) -> &dyn PsrMapping {
        self.mapping.as_ref()
    }
}

impl SourceLocator for PsrAutoloaderLocator {
    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        for path in self.mapping.resolve_possible_file_paths(identifier) {
            if !path.is_file() {
                debug!("no file at {} for {identifier}", path.display());
                continue;
            }
            let source =
                Rc::new(LocatedSource::from_file(&path, Some(identifier.name().to_string()))?);
            if let Some(reflection) = find_in_source(&self.ast, reflector, &source, identifier)? {
                return Ok(Some(reflection));
            }
        }
        Ok(None)
    }

    /// Scans every mapped directory recursively.
    fn locate_all_of_kind(
        &self,
        reflector: &Reflector,
        kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>> {
        let directories = self.mapping.directories();
        if directories.is_empty() {
            return Ok(Vec::new());
        }
        DirectoriesSourceLocator::recursive(directories, Rc::clone(&self.ast))?
            .locate_all_of_kind(reflector, kind)
    }
}
