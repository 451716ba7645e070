use crate::jvm::Error;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Result;

/// Utility trait for serializing data inside class files
///
/// Java class files have some peculiarities that make it useful to define an extra trait (instead
/// of just using `serde`):
///
///   - tags are always `u8`
///   - when serializing a sequence, the length of the sequence is usually `u16`
///
pub trait Serialize: Sized {
    /// Serialize construct into a binary output stream
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()>;
}

/// Counterpart of [`Serialize`] for reading class files back in
///
/// Parsing can fail for more reasons than IO (unknown tags, bad indices), hence the richer
/// error type.
pub trait Parse: Sized {
    /// Parse construct from a binary input stream
    fn parse<R: ReadBytesExt>(reader: &mut R) -> std::result::Result<Self, Error>;
}

impl Serialize for u8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(*self)
    }
}

impl Serialize for u16 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<BigEndian>(*self)
    }
}

impl Serialize for u32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<BigEndian>(*self)
    }
}

impl Serialize for i16 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i16::<BigEndian>(*self)
    }
}

impl Serialize for i32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<BigEndian>(*self)
    }
}

impl Serialize for i64 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i64::<BigEndian>(*self)
    }
}

impl Serialize for f32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_f32::<BigEndian>(*self)
    }
}

impl Serialize for f64 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_f64::<BigEndian>(*self)
    }
}

/// Size in `u16` is the first thing serialized/deserialized
impl<A: Serialize> Serialize for Vec<A> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        (self.len() as u16).serialize(writer)?;
        for elem in self {
            elem.serialize(writer)?;
        }
        Ok(())
    }
}

impl Parse for u8 {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> std::result::Result<Self, Error> {
        Ok(reader.read_u8()?)
    }
}

impl Parse for u16 {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> std::result::Result<Self, Error> {
        Ok(reader.read_u16::<BigEndian>()?)
    }
}

impl Parse for u32 {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> std::result::Result<Self, Error> {
        Ok(reader.read_u32::<BigEndian>()?)
    }
}

impl Parse for i32 {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> std::result::Result<Self, Error> {
        Ok(reader.read_i32::<BigEndian>()?)
    }
}

impl Parse for i64 {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> std::result::Result<Self, Error> {
        Ok(reader.read_i64::<BigEndian>()?)
    }
}

impl Parse for f32 {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> std::result::Result<Self, Error> {
        Ok(reader.read_f32::<BigEndian>()?)
    }
}

impl Parse for f64 {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> std::result::Result<Self, Error> {
        Ok(reader.read_f64::<BigEndian>()?)
    }
}

/// Size in `u16` is the first thing serialized/deserialized
impl<A: Parse> Parse for Vec<A> {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> std::result::Result<Self, Error> {
        let len = u16::parse(reader)?;
        let mut elems = Vec::with_capacity(len as usize);
        for _ in 0..len {
            elems.push(A::parse(reader)?);
        }
        Ok(elems)
    }
}

/// Read exactly `len` raw bytes
pub fn parse_bytes<R: ReadBytesExt>(
    reader: &mut R,
    len: usize,
) -> std::result::Result<Vec<u8>, Error> {
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}
