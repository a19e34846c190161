//! Parse-time name resolution: current namespace plus `use` imports.

use std::collections::HashMap;

use crate::ast::node::Name;

/// What a `use` import brings into scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseKind {
    Class,
    Function,
    Constant,
}

/// Namespace and import tables in effect at a point of the file.
#[derive(Debug, Clone, Default)]
pub struct NameContext {
    namespace: Option<String>,
    classes: HashMap<String, String>,
    functions: HashMap<String, String>,
    constants: HashMap<String, String>,
}

impl NameContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a namespace; imports do not carry over between namespaces.
    pub fn enter_namespace(&mut self, namespace: Option<String>) {
        *self = Self { namespace: namespace.filter(|ns| !ns.is_empty()), ..Self::default() };
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Register `use <name> [as <alias>]`.
    pub fn add_use(&mut self, kind: UseKind, name: &str, alias: Option<&str>) {
        let name = name.trim_start_matches('\\').to_string();
        let alias = alias
            .map(str::to_string)
            .unwrap_or_else(|| name.rsplit('\\').next().unwrap_or(&name).to_string());
        match kind {
            UseKind::Class => self.classes.insert(alias.to_ascii_lowercase(), name),
            UseKind::Function => self.functions.insert(alias.to_ascii_lowercase(), name),
            UseKind::Constant => self.constants.insert(alias, name),
        };
    }

    /// Fully-qualified name of a symbol declared here as `short`.
    pub fn declare(&self, short: &str) -> String {
        self.prefixed(short)
    }

    pub fn resolve_class(&self, written: &str) -> Name {
        let resolved = self.resolve_qualified(written).unwrap_or_else(|| {
            match self.classes.get(&written.to_ascii_lowercase()) {
                Some(target) => target.clone(),
                None => self.prefixed(written),
            }
        });
        Name { written: written.to_string(), resolved, fallback: None }
    }

    pub fn resolve_function(&self, written: &str) -> Name {
        if let Some(resolved) = self.resolve_qualified(written) {
            return Name { written: written.to_string(), resolved, fallback: None };
        }
        match self.functions.get(&written.to_ascii_lowercase()) {
            Some(target) => {
                Name { written: written.to_string(), resolved: target.clone(), fallback: None }
            }
            None => self.unqualified_with_fallback(written),
        }
    }

    pub fn resolve_constant(&self, written: &str) -> Name {
        if let Some(resolved) = self.resolve_qualified(written) {
            return Name { written: written.to_string(), resolved, fallback: None };
        }
        match self.constants.get(written) {
            Some(target) => {
                Name { written: written.to_string(), resolved: target.clone(), fallback: None }
            }
            None => self.unqualified_with_fallback(written),
        }
    }

    /// Fully-qualified, `namespace\`-relative and qualified names. `None` for
    /// unqualified names, whose resolution depends on the symbol kind.
    fn resolve_qualified(&self, written: &str) -> Option<String> {
        if let Some(absolute) = written.strip_prefix('\\') {
            return Some(absolute.to_string());
        }
        if written.len() > 10 && written[..10].eq_ignore_ascii_case("namespace\\") {
            return Some(self.prefixed(&written[10..]));
        }
        let (first, rest) = written.split_once('\\')?;
        Some(match self.classes.get(&first.to_ascii_lowercase()) {
            Some(target) => format!("{target}\\{rest}"),
            None => self.prefixed(written),
        })
    }

    fn unqualified_with_fallback(&self, written: &str) -> Name {
        match &self.namespace {
            Some(namespace) => Name {
                written: written.to_string(),
                resolved: format!("{namespace}\\{written}"),
                fallback: Some(written.to_string()),
            },
            None => Name { written: written.to_string(), resolved: written.to_string(), fallback: None },
        }
    }

    fn prefixed(&self, name: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}\\{name}"),
            None => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_namespace(ns: &str) -> NameContext {
        let mut ctx = NameContext::new();
        ctx.enter_namespace(Some(ns.to_string()));
        ctx
    }

    #[test]
    fn class_names_use_imports_then_namespace() {
        let mut ctx = in_namespace("App");
        ctx.add_use(UseKind::Class, "Vendor\\Lib\\Thing", None);
        ctx.add_use(UseKind::Class, "Vendor\\Other", Some("O"));

        assert_eq!(ctx.resolve_class("thing").resolved, "Vendor\\Lib\\Thing");
        assert_eq!(ctx.resolve_class("O\\Sub").resolved, "Vendor\\Other\\Sub");
        assert_eq!(ctx.resolve_class("Local").resolved, "App\\Local");
        assert_eq!(ctx.resolve_class("\\Root").resolved, "Root");
        assert_eq!(ctx.resolve_class("namespace\\Here").resolved, "App\\Here");
    }

    #[test]
    fn unqualified_constants_fall_back_to_global() {
        let ctx = in_namespace("App");
        let name = ctx.resolve_constant("PHP_EOL");
        assert_eq!(name.resolved, "App\\PHP_EOL");
        assert_eq!(name.fallback.as_deref(), Some("PHP_EOL"));

        let global = NameContext::new().resolve_constant("PHP_EOL");
        assert_eq!(global.resolved, "PHP_EOL");
        assert_eq!(global.fallback, None);
    }

    #[test]
    fn entering_a_namespace_drops_imports() {
        let mut ctx = in_namespace("A");
        ctx.add_use(UseKind::Function, "Lib\\helper", None);
        assert_eq!(ctx.resolve_function("helper").resolved, "Lib\\helper");
        ctx.enter_namespace(Some("B".into()));
        assert_eq!(ctx.resolve_function("helper").resolved, "B\\helper");
    }
}
