//! Stubs for engine-provided classes, functions and constants.
//!
//! A JSON index maps each symbol to the stub file declaring it:
//!
//! ```json
//! { "classes": { "stdClass": { "file": "Core/Core_c.php", "extension": "Core" } },
//!   "functions": {}, "constants": {} }
//! ```
//!
//! A small index is bundled with the crate; a full stub set can be loaded
//! from a directory holding an `index.json`.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;
use serde::Deserialize;

use crate::ast::locator::AstLocator;
use crate::identifier::{Identifier, IdentifierKind};
use crate::locators::{find_in_source, LocatorError, LocatorResult, SourceLocator};
use crate::reflection::Reflection;
use crate::reflector::Reflector;
use crate::source::{normalize_path, read_php_file, LocatedSource};

const INDEX_FILE: &str = "index.json";

const BUNDLED_INDEX: &str = include_str!("../../stubs/index.json");

const BUNDLED_STUBS: &[(&str, &str)] = &[
    ("Core/Core_c.php", include_str!("../../stubs/Core/Core_c.php")),
    ("Core/Core_d.php", include_str!("../../stubs/Core/Core_d.php")),
    ("Core/Core_f.php", include_str!("../../stubs/Core/Core_f.php")),
    ("json/json.php", include_str!("../../stubs/json/json.php")),
    ("standard/standard_defines.php", include_str!("../../stubs/standard/standard_defines.php")),
    ("standard/standard_f.php", include_str!("../../stubs/standard/standard_f.php")),
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct StubEntry {
    file: String,
    #[serde(default)]
    extension: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StubIndex {
    classes: HashMap<String, StubEntry>,
    functions: HashMap<String, StubEntry>,
    constants: HashMap<String, StubEntry>,
}

impl StubIndex {
    fn parse(text: &str, path: &str) -> LocatorResult<Self> {
        let index: StubIndex = serde_json::from_str(text).map_err(|source| {
            LocatorError::FailedToParseJson { path: path.to_string(), source }
        })?;
        Ok(index.normalized())
    }

    /// Class and function keys are stored lowercased.
    fn normalized(self) -> Self {
        let fold = |map: HashMap<String, StubEntry>| {
            map.into_iter().map(|(name, entry)| (name.to_ascii_lowercase(), entry)).collect()
        };
        Self {
            classes: fold(self.classes),
            functions: fold(self.functions),
            constants: self.constants,
        }
    }

    fn table(&self, kind: IdentifierKind) -> &HashMap<String, StubEntry> {
        match kind {
            IdentifierKind::Class => &self.classes,
            IdentifierKind::Function => &self.functions,
            IdentifierKind::Constant => &self.constants,
        }
    }

    fn entry(&self, identifier: &Identifier) -> Option<&StubEntry> {
        let (key, kind) = identifier.cache_key();
        self.table(kind).get(&key)
    }
}

#[derive(Debug, Clone)]
enum StubFiles {
    Bundled,
    Directory(PathBuf),
}

/// Locates engine-provided symbols in stub files.
pub struct BuiltinStubLocator {
    index: StubIndex,
    files: StubFiles,
    ast: Rc<AstLocator>,
}

impl BuiltinStubLocator {
    /// Locator over the stubs bundled with the crate.
    pub fn new(ast: Rc<AstLocator>) -> LocatorResult<Self> {
        let index = StubIndex::parse(BUNDLED_INDEX, "<bundled stubs>/index.json")?;
        Ok(Self { index, files: StubFiles::Bundled, ast })
    }

    /// Locator over a stub directory containing `index.json`.
    pub fn from_directory(dir: impl AsRef<Path>, ast: Rc<AstLocator>) -> LocatorResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(LocatorError::InvalidDirectory { path: normalize_path(dir) });
        }
        let index_path = dir.join(INDEX_FILE);
        if !index_path.is_file() {
            return Err(LocatorError::MissingStubIndex { path: normalize_path(&index_path) });
        }
        let text = fs::read_to_string(&index_path).map_err(|e| LocatorError::io(&index_path, e))?;
        let index = StubIndex::parse(&text, &normalize_path(&index_path))?;
        Ok(Self { index, files: StubFiles::Directory(dir.to_path_buf()), ast })
    }

    /// Whether the index lists `identifier`.
    pub fn has_stub(&self, identifier: &Identifier) -> bool {
        self.index.entry(identifier).is_some()
    }

    fn stub_text(&self, file: &str) -> LocatorResult<String> {
        match &self.files {
            StubFiles::Bundled => BUNDLED_STUBS
                .iter()
                .find(|(name, _)| *name == file)
                .map(|(_, text)| text.to_string())
                .ok_or_else(|| LocatorError::MissingStubFile { file: file.to_string() }),
            StubFiles::Directory(dir) => {
                let path = dir.join(file);
                read_php_file(&path).map_err(|e| LocatorError::io(&path, e))
            }
        }
    }
}

impl SourceLocator for BuiltinStubLocator {
    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        let Some(entry) = self.index.entry(identifier) else {
            return Ok(None);
        };
        debug!("{identifier} is a builtin stubbed in {}", entry.file);
        let text = self.stub_text(&entry.file)?;
        let source =
            Rc::new(LocatedSource::builtin(text, identifier.name(), entry.extension.clone()));
        find_in_source(&self.ast, reflector, &source, identifier)
    }

    /// Every indexed symbol of `kind`, read from each stub file once.
    fn locate_all_of_kind(
        &self,
        reflector: &Reflector,
        kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>> {
        let table = self.index.table(kind);
        let files: BTreeSet<(&str, Option<&str>)> = table
            .values()
            .map(|entry| (entry.file.as_str(), entry.extension.as_deref()))
            .collect();

        let mut found = Vec::new();
        for (file, extension) in files {
            let text = self.stub_text(file)?;
            let source = Rc::new(LocatedSource::builtin(text, file, extension.map(str::to_string)));
            found.extend(
                self.ast
                    .find_all_of_kind(reflector, &source, kind)?
                    .into_iter()
                    .filter(|reflection| {
                        let key = if kind.is_case_insensitive() {
                            reflection.name().to_ascii_lowercase()
                        } else {
                            reflection.name().to_string()
                        };
                        table.contains_key(&key)
                    }),
            );
        }
        Ok(found)
    }
}
