use super::Error;
use crate::jvm::{BinaryName, FieldType, MethodDescriptor, Name, RenderDescriptor, UnqualifiedName};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Handle on a tracked type, only meaningful for the registry that issued it
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct TrackedTypeId(usize);

/// Runtime type that some virtual calls should be redirected for
#[derive(Debug)]
pub struct TrackedType {
    name: BinaryName,

    /// Types statically known to be subtypes of this one (always including the type itself)
    known_subtypes: HashSet<String>,
}

impl TrackedType {
    pub fn name(&self) -> &BinaryName {
        &self.name
    }

    pub fn is_known_subtype(&self, name: &str) -> bool {
        self.known_subtypes.contains(name)
    }
}

/// Identifies a virtual method by the class it is referenced through, its name, and descriptor
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct MethodKey {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,
}

impl MethodKey {
    /// Names can be dotted (`a.b.C`) or internal (`a/b/C`)
    pub fn parse(owner: &str, name: &str, descriptor: &str) -> Result<MethodKey, Error> {
        Ok(MethodKey {
            owner: class_name(owner)?,
            name: method_name(name)?,
            descriptor: MethodDescriptor::parse_method(descriptor)?,
        })
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor.render())
    }
}

/// Static method that runs instead of a virtual call when the receiver is of the tracked type
///
/// The receiver is passed as the first argument, followed by the arguments of the original call.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TargetTracker {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,
}

impl TargetTracker {
    /// Names can be dotted (`a.b.C`) or internal (`a/b/C`)
    pub fn parse(owner: &str, name: &str, descriptor: &str) -> Result<TargetTracker, Error> {
        Ok(TargetTracker {
            owner: class_name(owner)?,
            name: method_name(name)?,
            descriptor: MethodDescriptor::parse_method(descriptor)?,
        })
    }

    /// Check the replacement can be called with the stack set up for the original method
    fn check_compatible(&self, original: &MethodKey) -> Result<(), Error> {
        let incompatible = |reason: &'static str| Error::IncompatibleReplacement {
            original: original.to_string(),
            replacement: self.to_string(),
            reason,
        };

        let (receiver, parameters) = match self.descriptor.parameters.split_first() {
            Some(split) => split,
            None => return Err(incompatible("missing receiver parameter")),
        };
        if !receiver.is_reference() {
            return Err(incompatible("receiver parameter is not a reference"));
        }
        if parameters.len() != original.descriptor.parameters.len() {
            return Err(incompatible("parameter count differs"));
        }
        let same_parameters = parameters
            .iter()
            .zip(original.descriptor.parameters.iter())
            .all(|(replacement, original)| passes_verification(original, replacement));
        if !same_parameters {
            return Err(incompatible("parameter types differ"));
        }

        let same_return = match (&self.descriptor.return_type, &original.descriptor.return_type) {
            (None, None) => true,
            (Some(replacement), Some(original)) => passes_verification(replacement, original),
            _ => false,
        };
        if !same_return {
            return Err(incompatible("return types differ"));
        }

        Ok(())
    }
}

/// Whether the verifier accepts a value of type `from` where a `to` is expected
///
/// Without the class hierarchy at hand, references are only accepted when the types match
/// exactly or the expected type is `java/lang/Object`. Primitives narrower than `int` all share
/// the `int` verification type.
fn passes_verification(from: &FieldType, to: &FieldType) -> bool {
    match (from, to) {
        (FieldType::Base(_), FieldType::Base(_)) => from.slot_kind() == to.slot_kind(),
        (_, FieldType::Object(object)) if from.is_reference() => {
            from == to || *object == BinaryName::OBJECT
        }
        _ => from == to,
    }
}

impl fmt::Display for TargetTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor.render())
    }
}

/// All the redirections registered for one method
#[derive(Debug)]
pub struct MethodEntry {
    key: MethodKey,

    /// Checked in order at runtime: the first tracked type the receiver is an instance of wins
    entries: Vec<(TrackedTypeId, TargetTracker)>,
}

impl MethodEntry {
    pub fn key(&self) -> &MethodKey {
        &self.key
    }

    pub fn entries(&self) -> &[(TrackedTypeId, TargetTracker)] {
        &self.entries
    }
}

/// Everything that call sites get redirected for
///
/// The registry is filled in once (through `&mut Registry`) and then only read, typically shared
/// by reference between threads transforming classes.
#[derive(Debug, Default)]
pub struct Registry {
    tracked_types: Vec<TrackedType>,
    tracked_by_name: HashMap<BinaryName, TrackedTypeId>,

    /// Entries by owner, then by name and descriptor
    methods: HashMap<String, HashMap<(String, String), MethodEntry>>,

    replacement_owners: HashSet<String>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Register a type to track, returning the existing one if it is already registered
    pub fn register_type(&mut self, name: &str) -> Result<TrackedTypeId, Error> {
        let name = class_name(name)?;
        if let Some(id) = self.tracked_by_name.get(&name) {
            return Ok(*id);
        }

        let id = TrackedTypeId(self.tracked_types.len());
        let mut known_subtypes = HashSet::new();
        known_subtypes.insert(name.as_str().to_owned());
        self.tracked_types.push(TrackedType {
            name: name.clone(),
            known_subtypes,
        });
        self.tracked_by_name.insert(name, id);
        Ok(id)
    }

    /// Record that a class is statically known to be a subtype of a tracked type
    ///
    /// Call sites whose receiver is statically typed as a known subtype skip the runtime type
    /// check and call the replacement directly.
    pub fn add_known_subtype(&mut self, tracked: TrackedTypeId, subtype: &str) -> Result<(), Error> {
        let subtype = class_name(subtype)?;
        self.tracked_types[tracked.0]
            .known_subtypes
            .insert(subtype.as_str().to_owned());
        Ok(())
    }

    /// Redirect calls to `method` on receivers of type `tracked` to the static `target`
    ///
    /// Registering a second target for the same tracked type replaces the first one, without
    /// changing the order in which tracked types are checked.
    pub fn register_redirect(
        &mut self,
        method: MethodKey,
        tracked: TrackedTypeId,
        target: TargetTracker,
    ) -> Result<(), Error> {
        target.check_compatible(&method)?;
        self.replacement_owners
            .insert(target.owner.as_str().to_owned());

        let entry = self
            .methods
            .entry(method.owner.as_str().to_owned())
            .or_insert_with(HashMap::new)
            .entry((method.name.as_str().to_owned(), method.descriptor.render()))
            .or_insert_with(|| MethodEntry {
                key: method,
                entries: vec![],
            });

        match entry.entries.iter_mut().find(|(id, _)| *id == tracked) {
            Some((_, existing)) => *existing = target,
            None => entry.entries.push((tracked, target)),
        }
        Ok(())
    }

    /// Find the redirections registered for a method, using internal names
    pub fn find_entry(&self, owner: &str, name: &str, descriptor: &str) -> Option<&MethodEntry> {
        self.methods
            .get(owner)?
            .get(&(name.to_owned(), descriptor.to_owned()))
    }

    /// Quick check for whether any method is registered on a class
    pub fn has_entries_for(&self, owner: &str) -> bool {
        self.methods.contains_key(owner)
    }

    pub fn tracked_type(&self, id: TrackedTypeId) -> &TrackedType {
        &self.tracked_types[id.0]
    }

    /// Target to call directly when the static receiver type is already known to be tracked
    ///
    /// The first tracked type (in registration order) that lists the receiver type as a known
    /// subtype is picked.
    pub fn fast_path_target<'a>(
        &self,
        entry: &'a MethodEntry,
        static_receiver: &str,
    ) -> Option<&'a TargetTracker> {
        entry
            .entries
            .iter()
            .find(|(id, _)| self.tracked_type(*id).is_known_subtype(static_receiver))
            .map(|(_, target)| target)
    }

    /// Classes hosting replacement methods, which are never rewritten themselves
    pub fn replacement_owners(&self) -> impl Iterator<Item = &str> {
        self.replacement_owners.iter().map(String::as_str)
    }

    pub fn is_replacement_owner(&self, name: &str) -> bool {
        self.replacement_owners.contains(name)
    }
}

fn class_name(name: &str) -> Result<BinaryName, Error> {
    BinaryName::from_qualified(name).map_err(Error::MalformedName)
}

/// Constructors and class initializers are never called virtually
fn method_name(name: &str) -> Result<UnqualifiedName, Error> {
    if name.starts_with('<') {
        return Err(Error::MalformedName(format!(
            "'{}' cannot be called virtually",
            name
        )));
    }
    UnqualifiedName::from_string(name.to_owned()).map_err(Error::MalformedName)
}
