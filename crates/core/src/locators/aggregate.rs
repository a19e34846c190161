use log::debug;

use crate::identifier::{Identifier, IdentifierKind};
use crate::locators::{LocatorResult, SourceLocator};
use crate::reflection::Reflection;
use crate::reflector::Reflector;

/// Ordered list of strategies. The first one that finds a symbol wins; later
/// strategies are not consulted.
#[derive(Default)]
pub struct AggregateSourceLocator {
    locators: Vec<Box<dyn SourceLocator>>,
}

impl AggregateSourceLocator {
    pub fn new(locators: Vec<Box<dyn SourceLocator>>) -> Self {
        Self { locators }
    }

    /// Append a strategy after the existing ones.
    pub fn with(mut self, locator: impl SourceLocator + 'static) -> Self {
        self.push(locator);
        self
    }

    pub fn push(&mut self, locator: impl SourceLocator + 'static) {
        self.locators.push(Box::new(locator));
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

impl SourceLocator for AggregateSourceLocator {
    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        for (idx, locator) in self.locators.iter().enumerate() {
            match locator.locate_one(reflector, identifier) {
                Ok(Some(reflection)) => return Ok(Some(reflection)),
                Ok(None) => {}
                Err(err) if err.is_not_found() => {
                    debug!("locator #{idx} has nothing for {identifier}: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }

    /// Results of every strategy, concatenated in order. Duplicates are kept.
    fn locate_all_of_kind(
        &self,
        reflector: &Reflector,
        kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>> {
        let mut found = Vec::new();
        for locator in &self.locators {
            found.extend(locator.locate_all_of_kind(reflector, kind)?);
        }
        Ok(found)
    }
}
