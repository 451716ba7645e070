use super::Error;
use crate::jvm::{BinaryName, MethodAccessFlags, Name, UnqualifiedName};
use std::collections::HashSet;

pub struct Settings {
    /// Classes never rewritten, written as `my/pkg/Klass`
    pub excluded_classes: HashSet<String>,

    /// Prefixes of classes never rewritten, written as `my/pkg/`
    pub excluded_prefixes: Vec<String>,

    /// Start of the name of every generated dispatcher (eg. `redirect`)
    ///
    /// Dispatchers are named `{prefix}{owner simple name}${method name}`.
    pub dispatcher_prefix: UnqualifiedName,

    /// Access flags on generated dispatchers
    pub dispatcher_access_flags: MethodAccessFlags,
}

impl Settings {
    pub fn new() -> Settings {
        Settings {
            excluded_classes: HashSet::new(),
            excluded_prefixes: vec![],
            dispatcher_prefix: UnqualifiedName::REDIRECT,
            dispatcher_access_flags: MethodAccessFlags::PRIVATE
                | MethodAccessFlags::STATIC
                | MethodAccessFlags::SYNTHETIC,
        }
    }

    /// Never rewrite this class (dotted or internal form)
    pub fn exclude_class(&mut self, name: &str) -> Result<(), Error> {
        let name = BinaryName::from_qualified(name).map_err(Error::MalformedName)?;
        self.excluded_classes.insert(name.as_str().to_owned());
        Ok(())
    }

    /// Never rewrite classes whose name starts with this prefix (dotted or internal form)
    pub fn exclude_prefix(&mut self, prefix: &str) {
        self.excluded_prefixes.push(prefix.replace('.', "/"));
    }

    /// Check if a class (internal form) is excluded from rewriting
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded_classes.contains(name)
            || self
                .excluded_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings::new()
    }
}
