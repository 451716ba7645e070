use super::class_file::{Constant, ConstantIndex, ConstantPoolOverflow};
use std::fmt;

#[derive(Debug)]
pub enum Error {
    ConstantPoolOverflow {
        constant: Constant,
        offset: u16,
    },
    IoError(std::io::Error),

    /// Class file does not start with `0xCAFEBABE`
    BadMagic([u8; 4]),

    /// Bytes left over after the last class attribute
    TrailingBytes(usize),

    UnknownConstantTag(u8),
    UnknownHandleKind(u8),

    /// A constant index points nowhere (or into the unusable half of a wide constant)
    MissingConstant(ConstantIndex),

    /// A constant index points to a constant of the wrong kind
    UnexpectedConstant {
        index: ConstantIndex,
        expected: &'static str,
    },

    /// `CONSTANT_Utf8_info` bytes which aren't valid modified UTF-8
    MalformedUtf8(Vec<u8>),

    BadDescriptor(String),
    MalformedName(String),

    /// Opcode that isn't part of the instruction set
    UnknownOpcode {
        offset: usize,
        opcode: u8,
    },

    /// Instruction runs past the end of the code array
    TruncatedInstruction(usize),

    MethodCodeMaxStackOverflow(usize),
    MethodCodeMaxLocalsOverflow(usize),
    MethodCodeOverflow(usize),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<ConstantPoolOverflow> for Error {
    fn from(overflow: ConstantPoolOverflow) -> Error {
        Error::ConstantPoolOverflow {
            constant: overflow.constant,
            offset: overflow.offset,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConstantPoolOverflow { constant, offset } => {
                write!(f, "constant pool overflow at {} adding {:?}", offset, constant)
            }
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::BadMagic(magic) => write!(f, "bad class file magic {:02X?}", magic),
            Error::TrailingBytes(count) => {
                write!(f, "{} trailing bytes after end of class file", count)
            }
            Error::UnknownConstantTag(tag) => write!(f, "unknown constant pool tag {}", tag),
            Error::UnknownHandleKind(kind) => write!(f, "unknown method handle kind {}", kind),
            Error::MissingConstant(index) => write!(f, "no constant at index {}", index.0),
            Error::UnexpectedConstant { index, expected } => {
                write!(f, "constant at index {} is not a {}", index.0, expected)
            }
            Error::MalformedUtf8(bytes) => write!(f, "malformed modified UTF-8 {:?}", bytes),
            Error::BadDescriptor(msg) => write!(f, "bad descriptor: {}", msg),
            Error::MalformedName(msg) => write!(f, "malformed name: {}", msg),
            Error::UnknownOpcode { offset, opcode } => {
                write!(f, "unknown opcode 0x{:02x} at offset {}", opcode, offset)
            }
            Error::TruncatedInstruction(offset) => {
                write!(f, "instruction at offset {} runs past end of code", offset)
            }
            Error::MethodCodeMaxStackOverflow(size) => write!(f, "max stack {} too large", size),
            Error::MethodCodeMaxLocalsOverflow(size) => {
                write!(f, "max locals {} too large", size)
            }
            Error::MethodCodeOverflow(size) => write!(f, "method code of {} bytes too large", size),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}
