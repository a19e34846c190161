use std::cell::RefCell;
use std::collections::HashMap;

use log::trace;

use crate::identifier::{Identifier, IdentifierKind};
use crate::locators::{LocatorResult, SourceLocator};
use crate::reflection::Reflection;
use crate::reflector::Reflector;

/// Caches the answers of another locator, misses included. Entries are never
/// invalidated; errors are not cached.
pub struct MemoizingSourceLocator<L> {
    inner: L,
    located: RefCell<HashMap<(String, IdentifierKind), Option<Reflection>>>,
    located_by_kind: RefCell<HashMap<IdentifierKind, Vec<Reflection>>>,
}

impl<L: SourceLocator> MemoizingSourceLocator<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            located: RefCell::new(HashMap::new()),
            located_by_kind: RefCell::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<L: SourceLocator> SourceLocator for MemoizingSourceLocator<L> {
    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        let key = identifier.cache_key();
        if let Some(cached) = self.located.borrow().get(&key) {
            trace!("memoized {identifier}");
            return Ok(cached.clone());
        }
        let located = self.inner.locate_one(reflector, identifier)?;
        self.located.borrow_mut().insert(key, located.clone());
        Ok(located)
    }

    fn locate_all_of_kind(
        &self,
        reflector: &Reflector,
        kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>> {
        if let Some(cached) = self.located_by_kind.borrow().get(&kind) {
            trace!("memoized every {kind}");
            return Ok(cached.clone());
        }
        let located = self.inner.locate_all_of_kind(reflector, kind)?;
        self.located_by_kind.borrow_mut().insert(kind, located.clone());
        Ok(located)
    }
}
