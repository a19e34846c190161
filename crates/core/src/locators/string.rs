use std::rc::Rc;

use crate::ast::locator::AstLocator;
use crate::identifier::{Identifier, IdentifierKind};
use crate::locators::{find_in_source, LocatorError, LocatorResult, SourceLocator};
use crate::reflection::Reflection;
use crate::reflector::Reflector;
use crate::source::LocatedSource;

/// Locates symbols in a fixed piece of source text.
pub struct StringSourceLocator {
    source: Rc<LocatedSource>,
    ast: Rc<AstLocator>,
}

impl StringSourceLocator {
    pub fn new(source: impl Into<String>, ast: Rc<AstLocator>) -> LocatorResult<Self> {
        let text = source.into();
        if text.trim().is_empty() {
            return Err(LocatorError::EmptySourceCode);
        }
        let source = Rc::new(LocatedSource::new(text, None, None)?);
        Ok(Self { source, ast })
    }
}

impl SourceLocator for StringSourceLocator {
    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        find_in_source(&self.ast, reflector, &self.source, identifier)
    }

    fn locate_all_of_kind(
        &self,
        reflector: &Reflector,
        kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>> {
        Ok(self.ast.find_all_of_kind(reflector, &self.source, kind)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_source_is_rejected() {
        let ast = Rc::new(AstLocator::new());
        assert!(matches!(
            StringSourceLocator::new("  \n\t", ast),
            Err(LocatorError::EmptySourceCode)
        ));
    }
}
