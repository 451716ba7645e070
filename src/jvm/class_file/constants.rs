use crate::jvm::class_file::{parse_bytes, Attribute, AttributeLike, Parse, Serialize};
use crate::jvm::Error;
use crate::util::{Offset, OffsetVec, Width};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use std::fmt;
use std::result::Result;

/// Class file constants pool
///
/// The pool is append only: constants parsed from an existing class keep their indices (so
/// every index elsewhere in the class stays valid) and new constants go at the end. Lookups by
/// value return the existing index whenever an equal constant is already in the pool, so that
/// rewriting a class never duplicates constants.
pub struct ConstantsPool {
    constants: OffsetVec<Constant>,

    utf8s: HashMap<String, Utf8ConstantIndex>,
    classes: HashMap<String, ClassConstantIndex>,
    name_and_types: HashMap<(String, String), NameAndTypeConstantIndex>,
    methodrefs: HashMap<(String, String, String, bool), MethodRefConstantIndex>,
}

/// Resolved view of a `CONSTANT_Methodref_info` or `CONSTANT_InterfaceMethodref_info`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodRef<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
    pub is_interface: bool,
}

impl ConstantsPool {
    /// Make a fresh empty constants pool
    pub fn new() -> ConstantsPool {
        ConstantsPool {
            constants: OffsetVec::new_starting_at(Offset(1)),
            utf8s: HashMap::new(),
            classes: HashMap::new(),
            name_and_types: HashMap::new(),
            methodrefs: HashMap::new(),
        }
    }

    /// Number of entries (not indices) in the pool
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Push a constant into the constant pool, provided there is space for it
    ///
    /// Note: the largest valid index is 65534, indexing starts at 1, and some constants take two
    /// spaces.
    fn push_constant(&mut self, constant: Constant) -> Result<ConstantIndex, ConstantPoolOverflow> {
        // Compute the offset at which this constant will be inserted
        let offset: u16 = self.constants.offset_len().0 as u16;

        // Detect if the next constant would overflow the pool
        if offset.checked_add(constant.width() as u16).is_none() {
            return Err(ConstantPoolOverflow { constant, offset });
        }

        self.constants.push(constant);
        Ok(ConstantIndex(offset))
    }

    /// Record every constant already in the pool under its value, so that later lookups reuse it
    ///
    /// Entries whose references don't resolve are skipped: they are only an error if something
    /// actually tries to use them. When the pool contains duplicates, the first one wins.
    fn index_existing(&mut self) {
        let mut classes = vec![];
        let mut name_and_types = vec![];
        let mut methodrefs = vec![];

        for (offset, _, constant) in self.constants.iter() {
            let index = ConstantIndex(offset.0 as u16);
            match constant {
                Constant::Utf8(utf8) => {
                    if let Some(string) = utf8.as_str() {
                        self.utf8s
                            .entry(string.to_owned())
                            .or_insert(Utf8ConstantIndex(index));
                    }
                }
                Constant::Class(name) => {
                    if let Ok(name) = self.utf8(*name) {
                        classes.push((name.to_owned(), ClassConstantIndex(index)));
                    }
                }
                Constant::NameAndType { name, descriptor } => {
                    if let (Ok(name), Ok(descriptor)) = (self.utf8(*name), self.utf8(*descriptor))
                    {
                        let key = (name.to_owned(), descriptor.to_owned());
                        name_and_types.push((key, NameAndTypeConstantIndex(index)));
                    }
                }
                Constant::MethodRef { .. } => {
                    if let Ok(method) = self.method_ref(MethodRefConstantIndex(index)) {
                        let key = (
                            method.owner.to_owned(),
                            method.name.to_owned(),
                            method.descriptor.to_owned(),
                            method.is_interface,
                        );
                        methodrefs.push((key, MethodRefConstantIndex(index)));
                    }
                }
                _ => (),
            }
        }

        for (key, index) in classes {
            self.classes.entry(key).or_insert(index);
        }
        for (key, index) in name_and_types {
            self.name_and_types.entry(key).or_insert(index);
        }
        for (key, index) in methodrefs {
            self.methodrefs.entry(key).or_insert(index);
        }
    }

    /// Look up the constant at an index
    pub fn get(&self, index: ConstantIndex) -> Result<&Constant, Error> {
        self.constants
            .get_offset(Offset(index.0 as usize))
            .ok_or(Error::MissingConstant(index))
    }

    /// Look up a utf8 constant
    ///
    /// Constants that have no `str` form (see [`ModifiedUtf8`]) are reported as malformed.
    pub fn utf8(&self, index: Utf8ConstantIndex) -> Result<&str, Error> {
        match self.get(index.0)? {
            Constant::Utf8(utf8) => utf8
                .as_str()
                .ok_or_else(|| Error::MalformedUtf8(utf8.as_bytes().to_vec())),
            _ => Err(Error::UnexpectedConstant {
                index: index.0,
                expected: "utf8",
            }),
        }
    }

    /// Look up the internal name of a class constant
    pub fn class_name(&self, index: ClassConstantIndex) -> Result<&str, Error> {
        match self.get(index.0)? {
            Constant::Class(name) => self.utf8(*name),
            _ => Err(Error::UnexpectedConstant {
                index: index.0,
                expected: "class",
            }),
        }
    }

    /// Look up the name and descriptor in a name & type constant
    pub fn name_and_type(&self, index: NameAndTypeConstantIndex) -> Result<(&str, &str), Error> {
        match self.get(index.0)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(Error::UnexpectedConstant {
                index: index.0,
                expected: "name and type",
            }),
        }
    }

    /// Resolve a method reference into its owner, name, and descriptor
    pub fn method_ref(&self, index: MethodRefConstantIndex) -> Result<MethodRef<'_>, Error> {
        match self.get(index.0)? {
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => {
                let owner = self.class_name(*class)?;
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Ok(MethodRef {
                    owner,
                    name,
                    descriptor,
                    is_interface: *is_interface,
                })
            }
            _ => Err(Error::UnexpectedConstant {
                index: index.0,
                expected: "method reference",
            }),
        }
    }

    /// Get or insert a utf8 constant from the constant pool
    pub fn get_utf8<'a, S: Into<Cow<'a, str>>>(
        &mut self,
        utf8: S,
    ) -> Result<Utf8ConstantIndex, ConstantPoolOverflow> {
        let cow = utf8.into();

        if let Some(idx) = self.utf8s.get::<str>(cow.borrow()) {
            Ok(*idx)
        } else {
            let owned = cow.into_owned();
            let constant = Constant::Utf8(ModifiedUtf8::from(owned.clone()));
            let idx = Utf8ConstantIndex(self.push_constant(constant)?);
            self.utf8s.insert(owned, idx);
            Ok(idx)
        }
    }

    /// Get or insert a class constant from the constant pool
    pub fn get_class(&mut self, name: &str) -> Result<ClassConstantIndex, ConstantPoolOverflow> {
        if let Some(idx) = self.classes.get(name) {
            Ok(*idx)
        } else {
            let name_utf8 = self.get_utf8(name)?;
            let constant = Constant::Class(name_utf8);
            let idx = ClassConstantIndex(self.push_constant(constant)?);
            self.classes.insert(name.to_owned(), idx);
            Ok(idx)
        }
    }

    /// Get or insert a name & type constant from the constant pool
    pub fn get_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
    ) -> Result<NameAndTypeConstantIndex, ConstantPoolOverflow> {
        let name_and_type_key = (name.to_owned(), descriptor.to_owned());
        if let Some(idx) = self.name_and_types.get(&name_and_type_key) {
            Ok(*idx)
        } else {
            let name = self.get_utf8(name)?;
            let descriptor = self.get_utf8(descriptor)?;
            let constant = Constant::NameAndType { name, descriptor };
            let idx = NameAndTypeConstantIndex(self.push_constant(constant)?);
            self.name_and_types.insert(name_and_type_key, idx);
            Ok(idx)
        }
    }

    /// Get or insert a `CONSTANT_Methodref_info` or `CONSTANT_InterfaceMethodref_info`
    pub fn get_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        is_interface: bool,
    ) -> Result<MethodRefConstantIndex, ConstantPoolOverflow> {
        let method_key = (
            owner.to_owned(),
            name.to_owned(),
            descriptor.to_owned(),
            is_interface,
        );
        if let Some(idx) = self.methodrefs.get(&method_key) {
            Ok(*idx)
        } else {
            let class = self.get_class(owner)?;
            let name_and_type = self.get_name_and_type(name, descriptor)?;
            let constant = Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            };
            let idx = MethodRefConstantIndex(self.push_constant(constant)?);
            self.methodrefs.insert(method_key, idx);
            Ok(idx)
        }
    }

    /// Add an attribute to the constant pool
    pub fn get_attribute<A: AttributeLike>(&mut self, attribute: A) -> Result<Attribute, Error> {
        let name_index = self.get_utf8(A::NAME)?;
        let mut info = vec![];

        attribute.serialize(&mut info).map_err(Error::IoError)?;

        Ok(Attribute { name_index, info })
    }
}

impl Default for ConstantsPool {
    fn default() -> Self {
        ConstantsPool::new()
    }
}

impl std::fmt::Debug for ConstantsPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.constants.fmt(f)
    }
}

/// Count is one more than the largest index (so `long` and `double` count twice)
impl Serialize for ConstantsPool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        (self.constants.offset_len().0 as u16).serialize(writer)?;
        for (_, _, constant) in self.constants.iter() {
            constant.serialize(writer)?;
        }
        Ok(())
    }
}

impl Parse for ConstantsPool {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let count = u16::parse(reader)? as usize;
        let mut pool = ConstantsPool::new();
        while pool.constants.offset_len().0 < count {
            let constant = Constant::parse(reader)?;
            pool.constants.push(constant);
        }
        pool.index_existing();
        Ok(pool)
    }
}

#[derive(Debug)]
pub struct ConstantPoolOverflow {
    pub constant: Constant,
    pub offset: u16,
}

/// Constants as in the constant pool
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone)]
pub enum Constant {
    /// Class or an interface
    Class(Utf8ConstantIndex),

    /// Field
    FieldRef(ClassConstantIndex, NameAndTypeConstantIndex),

    /// Method (this combines `Methodref` and `InterfaceMethodref`
    MethodRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
        is_interface: bool,
    },

    /// Constant object of type `java.lang.String`
    String(Utf8ConstantIndex),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Constant primitive of type `float`
    Float(f32),

    /// Constant primitive of type `long`
    Long(i64),

    /// Constant primitive of type `double`
    Double(f64),

    /// Name and a type (eg. for a field or a method)
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Constant UTF-8 encoded raw string value
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the
    /// null character `\u{0000}` and the encoding of supplementary characters
    /// is different).
    Utf8(ModifiedUtf8),

    /// Constant object of type `java.lang.invoke.MethodHandle`
    MethodHandle {
        handle_kind: HandleKind,

        /// Depending on the method kind, this points to different things:
        ///
        ///   - `FieldRef` for `GetField`, `GetStatic`, `PutField`, `PutStatic`
        ///   - `MethodRef` for the rest
        member: ConstantIndex,
    },

    /// Method type
    MethodType { descriptor: Utf8ConstantIndex },

    /// Dynamically-computed constant
    Dynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Dynamically-computed call site
    InvokeDynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        method_descriptor: NameAndTypeConstantIndex,
    },

    /// Module (only in `module-info` classes)
    Module(Utf8ConstantIndex),

    /// Package exported or opened by a module
    Package(Utf8ConstantIndex),
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Constant::Utf8(utf8) => {
                1u8.serialize(writer)?;
                let buffer: &[u8] = utf8.as_bytes();
                (buffer.len() as u16).serialize(writer)?;
                writer.write_all(buffer)?;
            }
            Constant::Integer(integer) => {
                3u8.serialize(writer)?;
                integer.serialize(writer)?;
            }
            Constant::Float(float) => {
                4u8.serialize(writer)?;
                float.serialize(writer)?;
            }
            Constant::Long(long) => {
                5u8.serialize(writer)?;
                long.serialize(writer)?;
            }
            Constant::Double(double) => {
                6u8.serialize(writer)?;
                double.serialize(writer)?;
            }
            Constant::Class(name) => {
                7u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::String(bytes) => {
                8u8.serialize(writer)?;
                bytes.serialize(writer)?;
            }
            Constant::FieldRef(class, name_and_type) => {
                9u8.serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => {
                (if !is_interface { 10u8 } else { 11u8 }).serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::NameAndType { name, descriptor } => {
                12u8.serialize(writer)?;
                name.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::MethodHandle {
                handle_kind,
                member,
            } => {
                15u8.serialize(writer)?;
                handle_kind.serialize(writer)?;
                member.serialize(writer)?;
            }
            Constant::MethodType { descriptor } => {
                16u8.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::Dynamic {
                bootstrap_method,
                name_and_type,
            } => {
                17u8.serialize(writer)?;
                bootstrap_method.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::InvokeDynamic {
                bootstrap_method,
                method_descriptor,
            } => {
                18u8.serialize(writer)?;
                bootstrap_method.serialize(writer)?;
                method_descriptor.serialize(writer)?;
            }
            Constant::Module(name) => {
                19u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::Package(name) => {
                20u8.serialize(writer)?;
                name.serialize(writer)?;
            }
        };
        Ok(())
    }
}

impl Parse for Constant {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let constant = match u8::parse(reader)? {
            1 => {
                let len = u16::parse(reader)? as usize;
                Constant::Utf8(ModifiedUtf8::from_bytes(parse_bytes(reader, len)?))
            }
            3 => Constant::Integer(i32::parse(reader)?),
            4 => Constant::Float(f32::parse(reader)?),
            5 => Constant::Long(i64::parse(reader)?),
            6 => Constant::Double(f64::parse(reader)?),
            7 => Constant::Class(Utf8ConstantIndex::parse(reader)?),
            8 => Constant::String(Utf8ConstantIndex::parse(reader)?),
            9 => Constant::FieldRef(
                ClassConstantIndex::parse(reader)?,
                NameAndTypeConstantIndex::parse(reader)?,
            ),
            tag @ (10 | 11) => Constant::MethodRef {
                class: ClassConstantIndex::parse(reader)?,
                name_and_type: NameAndTypeConstantIndex::parse(reader)?,
                is_interface: tag == 11,
            },
            12 => Constant::NameAndType {
                name: Utf8ConstantIndex::parse(reader)?,
                descriptor: Utf8ConstantIndex::parse(reader)?,
            },
            15 => Constant::MethodHandle {
                handle_kind: HandleKind::parse(reader)?,
                member: ConstantIndex::parse(reader)?,
            },
            16 => Constant::MethodType {
                descriptor: Utf8ConstantIndex::parse(reader)?,
            },
            17 => Constant::Dynamic {
                bootstrap_method: u16::parse(reader)?,
                name_and_type: NameAndTypeConstantIndex::parse(reader)?,
            },
            18 => Constant::InvokeDynamic {
                bootstrap_method: u16::parse(reader)?,
                method_descriptor: NameAndTypeConstantIndex::parse(reader)?,
            },
            19 => Constant::Module(Utf8ConstantIndex::parse(reader)?),
            20 => Constant::Package(Utf8ConstantIndex::parse(reader)?),
            tag => return Err(Error::UnknownConstantTag(tag)),
        };
        Ok(constant)
    }
}

/// Text of a `CONSTANT_Utf8_info`, kept exactly as it is encoded
///
/// Java string literals may contain unpaired surrogates, which are fine in a class file but have
/// no Rust `str` equivalent. Those constants are carried along as bytes and written back out
/// unchanged; only the decodable ones can be looked up as text.
#[derive(Clone, PartialEq, Eq)]
pub struct ModifiedUtf8 {
    bytes: Vec<u8>,
    decoded: Option<String>,
}

impl ModifiedUtf8 {
    pub fn from_bytes(bytes: Vec<u8>) -> ModifiedUtf8 {
        let decoded = decode_modified_utf8(&bytes);
        ModifiedUtf8 { bytes, decoded }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decoded text, if it is valid Unicode
    pub fn as_str(&self) -> Option<&str> {
        self.decoded.as_deref()
    }
}

impl From<String> for ModifiedUtf8 {
    fn from(string: String) -> ModifiedUtf8 {
        ModifiedUtf8 {
            bytes: encode_modified_utf8(&string),
            decoded: Some(string),
        }
    }
}

impl fmt::Debug for ModifiedUtf8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.decoded {
            Some(string) => fmt::Debug::fmt(string, f),
            None => write!(f, "<undecodable {:02X?}>", self.bytes),
        }
    }
}

/// Modified UTF-8 format used in class files.
///
/// See [this `DataInput` section for details][0]. Quoting from that section:
///
/// > The differences between this format and the standard UTF-8 format are the following:
/// >
/// >  * The null byte `\u0000` is encoded in 2-byte format rather than 1-byte, so that the encoded
/// >    strings never have embedded nulls.
/// >  * Only the 1-byte, 2-byte, and 3-byte formats are used.
/// >  * Supplementary characters are represented in the form of surrogate pairs.
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer: Vec<u8> = vec![];
    for c in string.chars() {
        // Handle the exception for how `\u{0000}` is represented
        let len: usize = if c == '\u{0000}' { 2 } else { c.len_utf8() };
        let code: u32 = c as u32;

        match len {
            1 => buffer.push(code as u8),
            2 => {
                buffer.push((code >> 6 & 0x1F) as u8 | 0b1100_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
            3 => {
                buffer.push((code >> 12 & 0x0F) as u8 | 0b1110_0000);
                buffer.push((code >> 6 & 0x3F) as u8 | 0b1000_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }

            // Supplementary characters: main divergence from unicode
            _ => {
                buffer.push(0b1110_1101);
                buffer.push(((code >> 16 & 0x0F) as u8).wrapping_sub(1) & 0x0F | 0b1010_0000);
                buffer.push((code >> 10 & 0x3F) as u8 | 0b1000_0000);

                buffer.push(0b1110_1101);
                buffer.push(((code >> 6 & 0x1F) as u8) | 0b1011_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
        }
    }
    buffer
}

/// Inverse of [`encode_modified_utf8`]
///
/// Each 1, 2, or 3 byte group decodes to one UTF-16 code unit, and surrogate pairs are then
/// reassembled. Returns `None` for byte sequences that aren't modified UTF-8, including unpaired
/// surrogates (which a JVM accepts but a Rust `String` can't hold).
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    fn continuation(byte: Option<u8>) -> Option<u16> {
        match byte {
            Some(b @ 0x80..=0xBF) => Some((b & 0x3F) as u16),
            _ => None,
        }
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut bytes = bytes.iter().copied();
    while let Some(lead) = bytes.next() {
        let unit = match lead {
            0x01..=0x7F => lead as u16,
            0xC0..=0xDF => {
                let low = continuation(bytes.next())?;
                ((lead as u16 & 0x1F) << 6) | low
            }
            0xE0..=0xEF => {
                let mid = continuation(bytes.next())?;
                let low = continuation(bytes.next())?;
                ((lead as u16 & 0x0F) << 12) | (mid << 6) | low
            }
            _ => return None,
        };
        units.push(unit);
    }
    String::from_utf16(&units).ok()
}



/// Almost all constants have width 1, except for `Constant::Long` and `Constant::Double`. From the
/// JVM class file format, section 4.4.5:
///
/// > All 8-byte constants take up two entries in the constant_pool table of the class file. If a
/// > CONSTANT_Long_info or CONSTANT_Double_info structure is the item in the constant_pool table
/// > at index n, then the next usable item in the pool is located at index n+2. The constant_pool
/// > index n+1 must be valid but is considered unusable.
/// >
/// > In retrospect, making 8-byte constants take two constant pool entries was a poor choice.
impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct ConstantIndex(pub u16);

macro_rules! constant_index {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
        pub struct $name(pub ConstantIndex);

        impl From<$name> for ConstantIndex {
            fn from(index: $name) -> ConstantIndex {
                index.0
            }
        }

        impl Serialize for $name {
            fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                self.0.serialize(writer)
            }
        }

        impl Parse for $name {
            fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
                Ok($name(ConstantIndex::parse(reader)?))
            }
        }
    };
}

constant_index!(
    /// Index of a `CONSTANT_Utf8_info`
    Utf8ConstantIndex
);
constant_index!(
    /// Index of a `CONSTANT_NameAndType_info`
    NameAndTypeConstantIndex
);
constant_index!(
    /// Index of a `CONSTANT_Class_info` (`0` in the few places where "no class" is allowed)
    ClassConstantIndex
);
constant_index!(
    /// Index of a `CONSTANT_Methodref_info` or `CONSTANT_InterfaceMethodref_info`
    MethodRefConstantIndex
);

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Parse for ConstantIndex {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(ConstantIndex(u16::parse(reader)?))
    }
}

/// Type of method handle
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-5.html#jvms-5.4.3.5-220
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum HandleKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl Serialize for HandleKind {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        let byte: u8 = match self {
            HandleKind::GetField => 1,
            HandleKind::GetStatic => 2,
            HandleKind::PutField => 3,
            HandleKind::PutStatic => 4,
            HandleKind::InvokeVirtual => 5,
            HandleKind::InvokeStatic => 6,
            HandleKind::InvokeSpecial => 7,
            HandleKind::NewInvokeSpecial => 8,
            HandleKind::InvokeInterface => 9,
        };
        byte.serialize(writer)
    }
}

impl Parse for HandleKind {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let kind = match u8::parse(reader)? {
            1 => HandleKind::GetField,
            2 => HandleKind::GetStatic,
            3 => HandleKind::PutField,
            4 => HandleKind::PutStatic,
            5 => HandleKind::InvokeVirtual,
            6 => HandleKind::InvokeStatic,
            7 => HandleKind::InvokeSpecial,
            8 => HandleKind::NewInvokeSpecial,
            9 => HandleKind::InvokeInterface,
            other => return Err(Error::UnknownHandleKind(other)),
        };
        Ok(kind)
    }
}
