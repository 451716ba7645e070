use crate::jvm::class_file::{
    Attribute, Code, ConstantsPool, Parse, Serialize, Utf8ConstantIndex,
};
use crate::jvm::{Error, MethodAccessFlags};
use byteorder::{ReadBytesExt, WriteBytesExt};

/// Method declared by a class or interface
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.6
#[derive(Debug)]
pub struct Method {
    pub access_flags: MethodAccessFlags,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub attributes: Vec<Attribute>,
}

impl Method {
    /// The `Code` attribute, absent on `abstract` and `native` methods
    pub fn code_attribute_mut(&mut self, constants: &ConstantsPool) -> Option<&mut Attribute> {
        self.attributes
            .iter_mut()
            .find(|attribute| attribute.is::<Code>(constants))
    }
}

impl Serialize for Method {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.access_flags.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.descriptor_index.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl Parse for Method {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(Method {
            access_flags: MethodAccessFlags::parse(reader)?,
            name_index: Utf8ConstantIndex::parse(reader)?,
            descriptor_index: Utf8ConstantIndex::parse(reader)?,
            attributes: Vec::parse(reader)?,
        })
    }
}
