use std::rc::Rc;

use log::debug;

use crate::ast::locator::AstLocator;
use crate::identifier::{Identifier, IdentifierKind};
use crate::locators::autoload::AutoloadHost;
use crate::locators::{find_in_source, LocatorResult, SourceLocator};
use crate::reflection::Reflection;
use crate::reflector::Reflector;
use crate::source::LocatedSource;

/// Locates symbols the host declared by evaluating code at runtime, using
/// the source text the host kept for them.
pub struct EvaluatedCodeSourceLocator<H> {
    host: Rc<H>,
    ast: Rc<AstLocator>,
}

impl<H: AutoloadHost> EvaluatedCodeSourceLocator<H> {
    pub fn new(host: Rc<H>, ast: Rc<AstLocator>) -> Self {
        Self { host, ast }
    }
}

impl<H: AutoloadHost> SourceLocator for EvaluatedCodeSourceLocator<H> {
    fn locate_one(
        &self,
        reflector: &Reflector,
        identifier: &Identifier,
    ) -> LocatorResult<Option<Reflection>> {
        let Some(text) = self.host.evaluated_source(identifier.kind(), identifier.name()) else {
            return Ok(None);
        };
        debug!("{identifier} was declared by evaluated code");
        let source = Rc::new(LocatedSource::evaluated(text, identifier.name()));
        find_in_source(&self.ast, reflector, &source, identifier)
    }

    /// The host does not enumerate evaluated code.
    fn locate_all_of_kind(
        &self,
        _reflector: &Reflector,
        _kind: IdentifierKind,
    ) -> LocatorResult<Vec<Reflection>> {
        Ok(Vec::new())
    }
}
