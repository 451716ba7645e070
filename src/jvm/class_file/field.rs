use crate::jvm::class_file::{Attribute, Parse, Serialize, Utf8ConstantIndex};
use crate::jvm::{Error, FieldAccessFlags};
use byteorder::{ReadBytesExt, WriteBytesExt};

/// Field declared by a class or interface
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.5
#[derive(Debug)]
pub struct Field {
    pub access_flags: FieldAccessFlags,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub attributes: Vec<Attribute>,
}

impl Serialize for Field {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.access_flags.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.descriptor_index.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl Parse for Field {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(Field {
            access_flags: FieldAccessFlags::parse(reader)?,
            name_index: Utf8ConstantIndex::parse(reader)?,
            descriptor_index: Utf8ConstantIndex::parse(reader)?,
            attributes: Vec::parse(reader)?,
        })
    }
}
