use crate::jvm::class_file::{
    Attribute, ClassConstantIndex, ConstantsPool, Field, Method, Parse, Serialize, Version,
};
use crate::jvm::{ClassAccessFlags, Error};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// Representation of the [`class` file format of the JVM][0]
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html
#[derive(Debug)]
pub struct ClassFile {
    pub version: Version,
    pub constants: ConstantsPool,
    pub access_flags: ClassAccessFlags,
    pub this_class: ClassConstantIndex,
    pub super_class: ClassConstantIndex,
    pub interfaces: Vec<ClassConstantIndex>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Magic header bytes that go at the front of the serialized class file
    pub const MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

    /// Parse a complete class file, rejecting anything left over after the last attribute
    pub fn parse_bytes(bytes: &[u8]) -> Result<ClassFile, Error> {
        let mut reader = Cursor::new(bytes);
        let class = ClassFile::parse(&mut reader)?;
        let remaining = bytes.len() - reader.position() as usize;
        if remaining != 0 {
            return Err(Error::TrailingBytes(remaining));
        }
        Ok(class)
    }

    /// Encode the class file
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = vec![];
        self.serialize(&mut bytes)?;
        Ok(bytes)
    }

    /// Internal name of the class (eg. `java/lang/Object`)
    pub fn class_name(&self) -> Result<&str, Error> {
        self.constants.class_name(self.this_class)
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    pub fn method_name(&self, method: &Method) -> Result<&str, Error> {
        self.constants.utf8(method.name_index)
    }

    pub fn method_descriptor(&self, method: &Method) -> Result<&str, Error> {
        self.constants.utf8(method.descriptor_index)
    }
}

impl Serialize for ClassFile {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&ClassFile::MAGIC)?;
        self.version.serialize(writer)?;
        self.constants.serialize(writer)?;
        self.access_flags.serialize(writer)?;
        self.this_class.serialize(writer)?;
        self.super_class.serialize(writer)?;
        self.interfaces.serialize(writer)?;
        self.fields.serialize(writer)?;
        self.methods.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl Parse for ClassFile {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != ClassFile::MAGIC {
            return Err(Error::BadMagic(magic));
        }

        Ok(ClassFile {
            version: Version::parse(reader)?,
            constants: ConstantsPool::parse(reader)?,
            access_flags: ClassAccessFlags::parse(reader)?,
            this_class: ClassConstantIndex::parse(reader)?,
            super_class: ClassConstantIndex::parse(reader)?,
            interfaces: Vec::parse(reader)?,
            fields: Vec::parse(reader)?,
            methods: Vec::parse(reader)?,
            attributes: Vec::parse(reader)?,
        })
    }
}
