use crate::jvm::class_file::{
    parse_bytes, ClassConstantIndex, ConstantsPool, Parse, Serialize, Utf8ConstantIndex,
};
use crate::jvm::Error;
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// Attributes (used in classes, fields, methods, and even on some attributes)
///
/// Attributes are kept as opaque bytes unless something needs to look inside them. That way
/// attributes we don't understand (annotations, debug tables, vendor extensions) survive a
/// parse/serialize cycle untouched.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name_index: Utf8ConstantIndex,
    pub info: Vec<u8>,
}

impl Attribute {
    /// Check if this is an attribute of a given kind
    pub fn is<A: AttributeLike>(&self, constants: &ConstantsPool) -> bool {
        matches!(constants.utf8(self.name_index), Ok(name) if name == A::NAME)
    }

    /// Decode the attribute payload, which must fill the whole `info` buffer
    pub fn decode<A: AttributeLike + Parse>(&self) -> Result<A, Error> {
        let mut reader = Cursor::new(&self.info);
        let decoded = A::parse(&mut reader)?;
        let remaining = self.info.len() - reader.position() as usize;
        if remaining != 0 {
            return Err(Error::TrailingBytes(remaining));
        }
        Ok(decoded)
    }

    /// Replace the payload with a new encoding of the attribute
    pub fn encode<A: AttributeLike>(&mut self, attribute: &A) -> Result<(), Error> {
        let mut info = vec![];
        attribute.serialize(&mut info)?;
        self.info = info;
        Ok(())
    }
}

impl Serialize for Attribute {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.name_index.serialize(writer)?;

        // Attribute info length is 4 bytes
        (self.info.len() as u32).serialize(writer)?;
        writer.write_all(&self.info)?;

        Ok(())
    }
}

impl Parse for Attribute {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let name_index = Utf8ConstantIndex::parse(reader)?;
        let len = u32::parse(reader)? as usize;
        let info = parse_bytes(reader, len)?;
        Ok(Attribute { name_index, info })
    }
}

/// Attributes are all stored in the same way (see `Attribute`), but internally
/// they represent very different things. This trait is implemented by things
/// which can be turned into attributes.
pub trait AttributeLike: Serialize {
    /// Name of the attribute
    const NAME: &'static str;
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.3
#[derive(Debug)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_array: BytecodeArray,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

impl Serialize for Code {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.max_stack.serialize(writer)?;
        self.max_locals.serialize(writer)?;
        self.code_array.serialize(writer)?;
        self.exception_table.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl Parse for Code {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(Code {
            max_stack: u16::parse(reader)?,
            max_locals: u16::parse(reader)?,
            code_array: BytecodeArray::parse(reader)?,
            exception_table: Vec::parse(reader)?,
            attributes: Vec::parse(reader)?,
        })
    }
}

impl AttributeLike for Code {
    const NAME: &'static str = "Code";
}

#[derive(Debug)]
pub struct ExceptionHandler {
    /// Start of exception handler range (inclusive)
    pub start_pc: BytecodeIndex,

    /// End of exception handler range (exclusive)
    pub end_pc: BytecodeIndex,

    /// Start of the exception handler
    pub handler_pc: BytecodeIndex,

    pub catch_type: ClassConstantIndex,
}

impl Serialize for ExceptionHandler {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.end_pc.serialize(writer)?;
        self.handler_pc.serialize(writer)?;
        self.catch_type.serialize(writer)?;
        Ok(())
    }
}

impl Parse for ExceptionHandler {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(ExceptionHandler {
            start_pc: BytecodeIndex::parse(reader)?,
            end_pc: BytecodeIndex::parse(reader)?,
            handler_pc: BytecodeIndex::parse(reader)?,
            catch_type: ClassConstantIndex::parse(reader)?,
        })
    }
}

/// Encoded bytecode instructions
#[derive(Debug)]
pub struct BytecodeArray(pub Vec<u8>);

impl Serialize for BytecodeArray {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        let len = self.0.len() as u32;
        len.serialize(writer)?;
        writer.write_all(&self.0)?;
        Ok(())
    }
}

impl Parse for BytecodeArray {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let len = u32::parse(reader)? as usize;
        Ok(BytecodeArray(parse_bytes(reader, len)?))
    }
}

/// Index into `BytecodeArray`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BytecodeIndex(pub u16);

impl Serialize for BytecodeIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Parse for BytecodeIndex {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(BytecodeIndex(u16::parse(reader)?))
    }
}

/// Only written, never read back: frames in existing methods stay valid as long as no
/// instruction moves, so they are carried along as raw bytes.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.7.4
#[derive(Debug)]
pub struct StackMapTable(pub Vec<StackMapFrame>);

impl AttributeLike for StackMapTable {
    const NAME: &'static str = "StackMapTable";
}

impl Serialize for StackMapTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackMapFrame {
    /// Frame has the same locals as the previous frame and number of stack items is zero
    /// Tags: 0-63 or 251
    SameLocalsNoStack { offset_delta: u16 },
}

impl Serialize for StackMapFrame {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            // `same_frame` and `same_frame_extended`
            StackMapFrame::SameLocalsNoStack { offset_delta } => {
                if *offset_delta <= 63 {
                    (*offset_delta as u8).serialize(writer)?;
                } else {
                    251u8.serialize(writer)?;
                    offset_delta.serialize(writer)?;
                }
            }
        };
        Ok(())
    }
}
