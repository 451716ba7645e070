use super::{Error, MethodEntry, Registry, Settings};
use crate::jvm::class_file::{ClassFile, ConstantIndex, ConstantsPool, MethodRefConstantIndex};
use crate::jvm::code::{opcode, InvokeType, Instructions};
use crate::jvm::{BinaryName, FieldType, Name, RenderDescriptor, UnqualifiedName};
use byteorder::{BigEndian, ByteOrder};
use std::collections::{HashMap, HashSet};

/// Dispatcher method that still needs to be added to the class being rewritten
#[derive(Debug)]
pub struct PendingDispatcher<'r> {
    pub generated_name: UnqualifiedName,
    pub generated_descriptor: String,
    pub entry: &'r MethodEntry,

    /// How the original call was made (used again for the fallback)
    pub invoke_type: InvokeType,

    /// Method reference of the original call
    pub original_method: MethodRefConstantIndex,
}

/// Rewrites matching virtual call sites in the method bodies of one class
///
/// Dispatchers requested along the way are accumulated (once per distinct method) and handed
/// back at the end, so the class' method list isn't touched while its bodies are rewritten.
pub struct CallSiteRewriter<'r> {
    registry: &'r Registry,
    settings: &'r Settings,

    class_name: String,
    class_is_interface: bool,

    /// Interfaces only get static methods with code from Java 8 onwards
    can_add_dispatchers: bool,

    pending: Vec<PendingDispatcher<'r>>,

    /// Indices into `pending`, keyed by owner, name, and descriptor of the original method
    pending_by_method: HashMap<(&'r str, &'r str, String), usize>,

    /// Names and descriptors of the methods in the class, including pending dispatchers
    taken_methods: HashSet<(String, String)>,
}

impl<'r> CallSiteRewriter<'r> {
    pub fn new(
        registry: &'r Registry,
        settings: &'r Settings,
        class: &ClassFile,
    ) -> Result<CallSiteRewriter<'r>, Error> {
        let mut taken_methods = HashSet::new();
        for method in &class.methods {
            let name = class.method_name(method)?.to_owned();
            let descriptor = class.method_descriptor(method)?.to_owned();
            taken_methods.insert((name, descriptor));
        }

        Ok(CallSiteRewriter {
            registry,
            settings,
            class_name: class.class_name()?.to_owned(),
            class_is_interface: class.is_interface(),
            can_add_dispatchers: !class.is_interface()
                || class.version.supports_static_interface_methods(),
            pending: vec![],
            pending_by_method: HashMap::new(),
            taken_methods,
        })
    }

    /// Rewrite the registered call sites in a code array, returning how many were rewritten
    ///
    /// Instructions are rewritten in place and keep their length, so no offset in the method
    /// (branches, exception ranges, stack map frames, debug tables) changes.
    pub fn rewrite_code(
        &mut self,
        constants: &mut ConstantsPool,
        method_name: &str,
        code: &mut [u8],
    ) -> Result<usize, Error> {
        let mut call_sites = vec![];
        for instruction in Instructions::new(code) {
            let (offset, op) = instruction?;
            if op == opcode::INVOKEVIRTUAL || op == opcode::INVOKEINTERFACE {
                call_sites.push((offset, op));
            }
        }

        let mut rewritten = 0;
        for (offset, op) in call_sites {
            let method_index = BigEndian::read_u16(&code[offset + 1..offset + 3]);
            let method = MethodRefConstantIndex(ConstantIndex(method_index));
            let target = match self.redirect_target(constants, method, op)? {
                Some(target) => target,
                None => continue,
            };

            log::debug!(
                "{}.{}: rewriting call at offset {} to use method #{}",
                self.class_name,
                method_name,
                offset,
                (target.0).0
            );
            code[offset] = opcode::INVOKESTATIC;
            BigEndian::write_u16(&mut code[offset + 1..offset + 3], (target.0).0);
            if op == opcode::INVOKEINTERFACE {
                code[offset + 3] = opcode::NOP;
                code[offset + 4] = opcode::NOP;
            }
            rewritten += 1;
        }

        Ok(rewritten)
    }

    /// Static method a call site should be sent to instead, if any
    fn redirect_target(
        &mut self,
        constants: &mut ConstantsPool,
        method: MethodRefConstantIndex,
        op: u8,
    ) -> Result<Option<MethodRefConstantIndex>, Error> {
        let registry: &'r Registry = self.registry;
        let resolved = constants.method_ref(method)?;
        if !registry.has_entries_for(resolved.owner) {
            return Ok(None);
        }
        let entry = match registry.find_entry(resolved.owner, resolved.name, resolved.descriptor) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let key = entry.key();

        // The static receiver type is known to be tracked: skip the runtime check
        if let Some(target) = registry.fast_path_target(entry, key.owner.as_str()) {
            log::debug!("{}: direct call to {} for {}", self.class_name, target, key);
            let target = constants.get_method_ref(
                target.owner.as_str(),
                target.name.as_str(),
                &target.descriptor.render(),
                false,
            )?;
            return Ok(Some(target));
        }

        if !self.can_add_dispatchers {
            log::warn!(
                "{}: leaving call to {} alone, interfaces of this class file version cannot hold \
                 a dispatcher",
                self.class_name,
                key
            );
            return Ok(None);
        }

        let invoke_type = if op == opcode::INVOKEINTERFACE {
            let count = key.descriptor.parameter_length(true);
            InvokeType::Interface(count as u8)
        } else {
            InvokeType::Virtual
        };
        let idx = self.request_dispatcher(entry, invoke_type, method);
        let dispatcher = &self.pending[idx];
        let dispatcher = constants.get_method_ref(
            &self.class_name,
            dispatcher.generated_name.as_str(),
            &dispatcher.generated_descriptor,
            self.class_is_interface,
        )?;
        Ok(Some(dispatcher))
    }

    /// Find or create the dispatcher for a method, returning its index in `pending`
    fn request_dispatcher(
        &mut self,
        entry: &'r MethodEntry,
        invoke_type: InvokeType,
        original_method: MethodRefConstantIndex,
    ) -> usize {
        let key = entry.key();
        let cache_key = (
            key.owner.as_str(),
            key.name.as_str(),
            key.descriptor.render(),
        );
        if let Some(idx) = self.pending_by_method.get(&cache_key) {
            return *idx;
        }

        let generated_descriptor = key
            .descriptor
            .with_receiver(FieldType::Object(BinaryName::OBJECT))
            .render();
        let base_name = self
            .settings
            .dispatcher_prefix
            .concat(&key.owner.simple_name())
            .concat(&UnqualifiedName::DOLLAR)
            .concat(&key.name);

        // Avoid clashing with methods already in the class (or other dispatchers)
        let mut generated_name = base_name.clone();
        let mut suffix = 0;
        while self
            .taken_methods
            .contains(&(generated_name.as_str().to_owned(), generated_descriptor.clone()))
        {
            suffix += 1;
            generated_name = base_name
                .concat(&UnqualifiedName::DOLLAR)
                .concat(&UnqualifiedName::number(suffix));
        }
        self.taken_methods.insert((
            generated_name.as_str().to_owned(),
            generated_descriptor.clone(),
        ));

        log::debug!(
            "{}: new dispatcher {}{} for {}",
            self.class_name,
            generated_name,
            generated_descriptor,
            key
        );
        let idx = self.pending.len();
        self.pending_by_method.insert(cache_key, idx);
        self.pending.push(PendingDispatcher {
            generated_name,
            generated_descriptor,
            entry,
            invoke_type,
            original_method,
        });
        idx
    }

    /// Dispatchers requested so far, in the order they were first requested
    pub fn into_pending(self) -> Vec<PendingDispatcher<'r>> {
        self.pending
    }
}
