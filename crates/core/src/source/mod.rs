//! Located sources: source text plus where it came from.
//!
//! A `LocatedSource` is created once per lookup and shared (via `Rc`) by every
//! reflection produced from the same parse. File-backed sources are validated
//! eagerly so that a bad path surfaces at construction, not at first use.

use std::fs;
use std::io;
use std::path::Path;

use log::debug;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Error type for located source construction.
#[derive(Debug, Error)]
pub enum LocatedSourceError {
    /// The path does not exist, is not a regular file, or cannot be read.
    #[error("Invalid file location {path}: {reason}")]
    InvalidFileLocation { path: String, reason: String },
}

/// Convenience result type for located source construction.
pub type LocatedSourceResult<T> = Result<T, LocatedSourceError>;

/// Where a piece of source text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// Text read from a user file, or supplied inline.
    Ordinary,
    /// Stub text standing in for an engine-provided symbol.
    BuiltIn { extension: Option<String> },
    /// Text of code the host declared through runtime evaluation.
    Evaluated,
    /// An anonymous declaration inside `file` at `line`/`column`.
    Anonymous { file: String, line: u32, column: u32 },
    /// Ordinary source reached through an alias of the declared symbol.
    Aliased { alias: String },
}

/// Source text, optional origin path and provenance flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedSource {
    text: String,
    declared_name: Option<String>,
    path: Option<String>,
    provenance: Provenance,
}

impl LocatedSource {
    /// Ordinary source. When `path` is given it must name an existing,
    /// readable, regular file.
    pub fn new(
        text: impl Into<String>,
        declared_name: Option<String>,
        path: Option<&Path>,
    ) -> LocatedSourceResult<Self> {
        let path = path.map(validated_path).transpose()?;
        Ok(Self { text: text.into(), declared_name, path, provenance: Provenance::Ordinary })
    }

    /// Read `path` and wrap its contents as an ordinary source.
    pub fn from_file(path: &Path, declared_name: Option<String>) -> LocatedSourceResult<Self> {
        let normalized = validated_path(path)?;
        let text = read_php_file(path).map_err(|e| invalid(path, e.to_string()))?;
        Ok(Self { text, declared_name, path: Some(normalized), provenance: Provenance::Ordinary })
    }

    /// Stub text for an engine-provided symbol. Never carries a path.
    pub fn builtin(
        text: impl Into<String>,
        declared_name: impl Into<String>,
        extension: Option<String>,
    ) -> Self {
        Self {
            text: text.into(),
            declared_name: Some(declared_name.into()),
            path: None,
            provenance: Provenance::BuiltIn { extension },
        }
    }

    /// Text of runtime-evaluated code. Never carries a path.
    pub fn evaluated(text: impl Into<String>, declared_name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            declared_name: Some(declared_name.into()),
            path: None,
            provenance: Provenance::Evaluated,
        }
    }

    /// Source for an anonymous declaration. The path is synthetic and encodes
    /// the originating file, line and column.
    pub fn anonymous(
        text: impl Into<String>,
        file: &Path,
        line: u32,
        column: u32,
    ) -> LocatedSourceResult<Self> {
        let file = validated_path(file)?;
        Ok(Self {
            text: text.into(),
            declared_name: None,
            path: Some(format!("{file}:{line}:{column}")),
            provenance: Provenance::Anonymous { file, line, column },
        })
    }

    /// Ordinary file source reached through `alias`.
    pub fn aliased(
        text: impl Into<String>,
        declared_name: impl Into<String>,
        path: &Path,
        alias: impl Into<String>,
    ) -> LocatedSourceResult<Self> {
        let path = validated_path(path)?;
        Ok(Self {
            text: text.into(),
            declared_name: Some(declared_name.into()),
            path: Some(path),
            provenance: Provenance::Aliased { alias: alias.into() },
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn declared_name(&self) -> Option<&str> {
        self.declared_name.as_deref()
    }

    /// Forward-slash normalized path (synthetic for anonymous sources).
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.provenance, Provenance::BuiltIn { .. })
    }

    pub fn is_evaluated(&self) -> bool {
        matches!(self.provenance, Provenance::Evaluated)
    }

    pub fn alias(&self) -> Option<&str> {
        match &self.provenance {
            Provenance::Aliased { alias } => Some(alias),
            _ => None,
        }
    }

    /// The real file backing this source, if any. For anonymous sources this
    /// is the originating file rather than the synthetic path.
    pub fn file_name(&self) -> Option<&str> {
        match &self.provenance {
            Provenance::Anonymous { file, .. } => Some(file),
            Provenance::BuiltIn { .. } | Provenance::Evaluated => None,
            Provenance::Ordinary | Provenance::Aliased { .. } => self.path.as_deref(),
        }
    }

    /// Directory of the backing file, forward-slash normalized.
    pub fn directory(&self) -> Option<String> {
        let file = self.file_name()?;
        match file.rfind('/') {
            Some(0) => Some("/".to_string()),
            Some(idx) => Some(file[..idx].to_string()),
            None => Some(".".to_string()),
        }
    }

    /// Key under which the parse of this source is cached: the backing file
    /// if there is one, otherwise a hash of the text.
    pub fn cache_key(&self) -> String {
        match self.file_name() {
            Some(file) => format!("file:{file}"),
            None => {
                let mut hasher = Sha256::new();
                hasher.update(self.text.as_bytes());
                format!("sha256:{:x}", hasher.finalize())
            }
        }
    }

    /// Short human-readable description used in parse failure messages.
    pub fn describe(&self) -> String {
        match self.file_name() {
            Some(file) => file.to_string(),
            None => {
                let snippet: String = self.text.chars().take(20).collect();
                format!("{snippet:?}")
            }
        }
    }
}

/// Replace platform separators with `/`.
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Read a PHP file as text. The host accepts any bytes, so a file that is
/// not UTF-8 (a Latin-1 comment, say) is decoded lossily instead of failing.
pub fn read_php_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            debug!("{} is not valid UTF-8; decoding lossily", path.display());
            Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
        }
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> LocatedSourceError {
    LocatedSourceError::InvalidFileLocation { path: normalize_path(path), reason: reason.into() }
}

fn validated_path(path: &Path) -> LocatedSourceResult<String> {
    let meta = fs::metadata(path).map_err(|e| invalid(path, e.to_string()))?;
    if !meta.is_file() {
        return Err(invalid(path, "not a regular file"));
    }
    fs::File::open(path).map_err(|e| invalid(path, e.to_string()))?;
    Ok(normalize_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_sources_are_keyed_by_content_hash() {
        let a = LocatedSource::new("<?php class A {}", None, None).expect("inline");
        let b = LocatedSource::new("<?php class A {}", Some("A".into()), None).expect("inline");
        let c = LocatedSource::new("<?php class B {}", None, None).expect("inline");
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
        assert!(a.cache_key().starts_with("sha256:"));
    }

    #[test]
    fn builtin_and_evaluated_sources_have_no_location() {
        let builtin = LocatedSource::builtin("<?php class stdClass {}", "stdClass", None);
        assert!(builtin.is_builtin());
        assert_eq!(builtin.path(), None);
        assert_eq!(builtin.directory(), None);

        let evaluated = LocatedSource::evaluated("<?php class Gen {}", "Gen");
        assert!(evaluated.is_evaluated());
        assert_eq!(evaluated.file_name(), None);
    }

    #[test]
    fn missing_files_are_rejected() {
        let err = LocatedSource::new("", None, Some(Path::new("/definitely/not/here.php")))
            .expect_err("missing file");
        assert!(matches!(err, LocatedSourceError::InvalidFileLocation { .. }));
    }

    #[test]
    fn describe_uses_a_short_snippet_without_a_file() {
        let source =
            LocatedSource::new("<?php class Something extends Other {}", None, None).unwrap();
        assert_eq!(source.describe(), "\"<?php class Somethin\"");
    }
}
