//! Locators built from a project's `composer.json` and the
//! `installed.json` of its vendor directory.

use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::ast::locator::AstLocator;
use crate::locators::aggregate::AggregateSourceLocator;
use crate::locators::directories::DirectoriesSourceLocator;
use crate::locators::file::SingleFileSourceLocator;
use crate::locators::psr::{Psr0Mapping, Psr4Mapping, PsrAutoloaderLocator};
use crate::locators::{LocatorError, LocatorResult};
use crate::source::normalize_path;

const DEFAULT_VENDOR_DIR: &str = "vendor";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(path) => vec![path],
            OneOrMany::Many(paths) => paths,
        }
    }
}

/// `{prefix: dir | [dirs]}` in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PrefixMap(Vec<(String, Vec<String>)>);

impl<'de> Deserialize<'de> for PrefixMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PrefixMapVisitor(PhantomData<PrefixMap>);

        impl<'de> Visitor<'de> for PrefixMapVisitor {
            type Value = PrefixMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of namespace prefixes to directories")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PrefixMap, A::Error> {
                let mut entries = Vec::new();
                while let Some((prefix, dirs)) = map.next_entry::<String, OneOrMany>()? {
                    entries.push((prefix, dirs.into_vec()));
                }
                Ok(PrefixMap(entries))
            }
        }

        deserializer.deserialize_map(PrefixMapVisitor(PhantomData))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Autoload {
    #[serde(rename = "psr-4")]
    psr4: PrefixMap,
    #[serde(rename = "psr-0")]
    psr0: PrefixMap,
    classmap: Vec<String>,
    files: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Config {
    #[serde(rename = "vendor-dir")]
    vendor_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ComposerManifest {
    autoload: Autoload,
    config: Config,
}

#[derive(Debug, Clone, Deserialize)]
struct InstalledPackage {
    name: String,
    #[serde(default)]
    autoload: Autoload,
    #[serde(rename = "install-path", default)]
    install_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum InstalledManifest {
    Packages { packages: Vec<InstalledPackage> },
    Legacy(Vec<InstalledPackage>),
}

impl InstalledManifest {
    fn into_packages(self) -> Vec<InstalledPackage> {
        match self {
            InstalledManifest::Packages { packages } => packages,
            InstalledManifest::Legacy(packages) => packages,
        }
    }
}

/// Autoload entries of every package, resolved against their install roots
/// and filtered down to what exists on disk.
#[derive(Debug, Default)]
struct Collected {
    psr4: Vec<(String, Vec<PathBuf>)>,
    psr0: Vec<(String, Vec<PathBuf>)>,
    classmap_dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

impl Collected {
    fn add(&mut self, root: &Path, autoload: Autoload) {
        collect_prefixes(root, autoload.psr4, &mut self.psr4);
        collect_prefixes(root, autoload.psr0, &mut self.psr0);

        for entry in autoload.classmap {
            let path = root.join(&entry);
            if path.is_dir() {
                self.classmap_dirs.push(path);
            } else if path.is_file() {
                self.files.push(path);
            } else {
                debug!("skipping missing classmap entry {}", path.display());
            }
        }
        for entry in autoload.files {
            let path = root.join(&entry);
            if path.is_file() {
                self.files.push(path);
            } else {
                debug!("skipping missing autoload file {}", path.display());
            }
        }
    }

    fn into_locator(self, ast: Rc<AstLocator>) -> LocatorResult<AggregateSourceLocator> {
        let mut aggregate = AggregateSourceLocator::default();
        if !self.psr4.is_empty() {
            aggregate.push(PsrAutoloaderLocator::new(Psr4Mapping::new(self.psr4)?, Rc::clone(&ast)));
        }
        if !self.psr0.is_empty() {
            aggregate.push(PsrAutoloaderLocator::new(Psr0Mapping::new(self.psr0)?, Rc::clone(&ast)));
        }
        if !self.classmap_dirs.is_empty() {
            aggregate.push(DirectoriesSourceLocator::recursive(self.classmap_dirs, Rc::clone(&ast))?);
        }
        for file in self.files {
            aggregate.push(SingleFileSourceLocator::new(file, Rc::clone(&ast))?);
        }
        debug!("composer locator with {} strategies", aggregate.len());
        Ok(aggregate)
    }
}

fn collect_prefixes(root: &Path, map: PrefixMap, out: &mut Vec<(String, Vec<PathBuf>)>) {
    for (prefix, dirs) in map.0 {
        if prefix.is_empty() {
            debug!("skipping fallback mapping without a prefix under {}", root.display());
            continue;
        }
        let existing: Vec<PathBuf> = dirs
            .iter()
            .map(|dir| root.join(dir))
            .filter(|dir| {
                let exists = dir.is_dir();
                if !exists {
                    debug!("skipping missing directory {} for {prefix}", dir.display());
                }
                exists
            })
            .collect();
        if !existing.is_empty() {
            out.push((prefix, existing));
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> LocatorResult<T> {
    let text = fs::read_to_string(path).map_err(|e| LocatorError::io(path, e))?;
    serde_json::from_str(&text)
        .map_err(|source| LocatorError::FailedToParseJson { path: normalize_path(path), source })
}

/// Project root and its parsed `composer.json`.
fn read_project(project: &Path) -> LocatorResult<(PathBuf, ComposerManifest)> {
    if !project.is_dir() {
        return Err(LocatorError::InvalidProjectDirectory { path: normalize_path(project) });
    }
    let manifest_path = project.join("composer.json");
    if !manifest_path.is_file() {
        return Err(LocatorError::MissingManifest { path: normalize_path(&manifest_path) });
    }
    let manifest: ComposerManifest = read_json(&manifest_path)?;
    Ok((project.to_path_buf(), manifest))
}

fn read_installed(root: &Path, manifest: &ComposerManifest) -> LocatorResult<Vec<InstalledPackage>> {
    let vendor = root.join(manifest.config.vendor_dir.as_deref().unwrap_or(DEFAULT_VENDOR_DIR));
    let installed_path = vendor.join("composer").join("installed.json");
    if !installed_path.is_file() {
        return Err(LocatorError::MissingInstalledManifest {
            path: normalize_path(&installed_path),
        });
    }
    let installed: InstalledManifest = read_json(&installed_path)?;
    Ok(installed.into_packages())
}

fn add_packages(
    collected: &mut Collected,
    root: &Path,
    manifest: &ComposerManifest,
    packages: Vec<InstalledPackage>,
) {
    let vendor = root.join(manifest.config.vendor_dir.as_deref().unwrap_or(DEFAULT_VENDOR_DIR));
    for package in packages {
        let package_root = match &package.install_path {
            Some(install_path) => vendor.join("composer").join(install_path),
            None => vendor.join(&package.name),
        };
        debug!("package {} installed at {}", package.name, package_root.display());
        collected.add(&package_root, package.autoload);
    }
}

/// Locator for the autoload rules of the root project only.
pub fn for_composer_json(
    project: impl AsRef<Path>,
    ast: Rc<AstLocator>,
) -> LocatorResult<AggregateSourceLocator> {
    let (root, manifest) = read_project(project.as_ref())?;
    let mut collected = Collected::default();
    collected.add(&root, manifest.autoload);
    collected.into_locator(ast)
}

/// Locator for the autoload rules of installed packages only.
pub fn for_installed_json(
    project: impl AsRef<Path>,
    ast: Rc<AstLocator>,
) -> LocatorResult<AggregateSourceLocator> {
    let (root, manifest) = read_project(project.as_ref())?;
    let packages = read_installed(&root, &manifest)?;
    let mut collected = Collected::default();
    add_packages(&mut collected, &root, &manifest, packages);
    collected.into_locator(ast)
}

/// Root project rules first, then every installed package.
pub fn for_composer_json_and_installed_json(
    project: impl AsRef<Path>,
    ast: Rc<AstLocator>,
) -> LocatorResult<AggregateSourceLocator> {
    let (root, manifest) = read_project(project.as_ref())?;
    let packages = read_installed(&root, &manifest)?;
    let mut collected = Collected::default();
    collected.add(&root, manifest.autoload.clone());
    add_packages(&mut collected, &root, &manifest, packages);
    collected.into_locator(ast)
}
