use super::{synthesize_dispatcher, CallSiteRewriter, Error, Registry, Settings};
use crate::jvm::class_file::{ClassFile, Code, Method};
use dashmap::DashSet;
use std::borrow::Cow;

/// Rewrites classes as they are loaded
///
/// One transformer is meant to be shared (by reference) by every thread loading classes. The
/// registry it reads from must be fully populated before the transformer is created.
pub struct ClassTransformer<'r> {
    registry: &'r Registry,
    settings: Settings,

    /// Classes this transformer has already rewritten
    transformed: DashSet<String>,
}

impl<'r> ClassTransformer<'r> {
    pub fn new(registry: &'r Registry, settings: Settings) -> ClassTransformer<'r> {
        ClassTransformer {
            registry,
            settings,
            transformed: DashSet::new(),
        }
    }

    /// Check if a class (dotted or internal form) was rewritten by this transformer
    pub fn has_transformed(&self, name: &str) -> bool {
        self.transformed.contains(&name.replace('.', "/"))
    }

    /// Rewrite the registered call sites in a class
    ///
    /// The input comes back unchanged (and borrowed) when the class is empty, excluded, hosts
    /// replacement methods, was already rewritten, or contains no registered call site. Malformed
    /// classes are an error: there is never partially rewritten output.
    pub fn transform<'a>(&self, name: &str, bytes: &'a [u8]) -> Result<Cow<'a, [u8]>, Error> {
        if bytes.is_empty() {
            log::trace!("{}: empty class, skipping", name);
            return Ok(Cow::Borrowed(bytes));
        }

        let name = name.replace('.', "/");
        if self.settings.is_excluded(&name) {
            log::trace!("{}: excluded, skipping", name);
            return Ok(Cow::Borrowed(bytes));
        }
        if self.registry.is_replacement_owner(&name) {
            log::trace!("{}: hosts replacement methods, skipping", name);
            return Ok(Cow::Borrowed(bytes));
        }

        // Claim the name up front so that concurrent loads of one class rewrite it only once
        if !self.transformed.insert(name.clone()) {
            log::trace!("{}: already transformed, skipping", name);
            return Ok(Cow::Borrowed(bytes));
        }
        match self.rewrite_class(&name, bytes) {
            Ok(Some(output)) => Ok(Cow::Owned(output)),
            Ok(None) => {
                self.transformed.remove(&name);
                Ok(Cow::Borrowed(bytes))
            }
            Err(err) => {
                self.transformed.remove(&name);
                Err(err)
            }
        }
    }

    /// Rewritten class, or `None` if it contains no registered call site
    fn rewrite_class(&self, name: &str, bytes: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let mut class = ClassFile::parse_bytes(bytes)?;
        let mut rewriter = CallSiteRewriter::new(self.registry, &self.settings, &class)?;

        let mut rewritten = 0;
        let ClassFile {
            constants, methods, ..
        } = &mut class;
        for method in methods.iter_mut() {
            let method_name = constants.utf8(method.name_index)?.to_owned();
            let attribute = match method.code_attribute_mut(constants) {
                Some(attribute) => attribute,
                None => continue,
            };
            let mut code: Code = attribute.decode()?;
            let count = rewriter.rewrite_code(constants, &method_name, &mut code.code_array.0)?;
            if count > 0 {
                attribute.encode(&code)?;
                rewritten += count;
            }
        }

        if rewritten == 0 {
            log::trace!("{}: no registered call sites", name);
            return Ok(None);
        }

        let pending = rewriter.into_pending();
        let dispatchers = pending.len();
        for dispatcher in &pending {
            let method: Method = synthesize_dispatcher(
                dispatcher,
                self.registry,
                &self.settings,
                &mut class.constants,
                class.version,
            )?;
            class.methods.push(method);
        }

        let output = class.to_bytes()?;
        log::debug!(
            "{}: rewrote {} call sites, added {} dispatchers",
            name,
            rewritten,
            dispatchers
        );
        Ok(Some(output))
    }
}
