use super::{Parse, Serialize};
use crate::jvm::Error;
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::Result;

/// Version of the class file, which is used to verify that the JVM has the
/// necessary features to interpret the class
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Version {
    pub minor_version: u16,
    pub major_version: u16,
}

impl Version {
    /// JVM class file version corresponding to Java SE 5.0
    pub const JAVA5: Version = Version {
        minor_version: 0,
        major_version: 49,
    };

    /// JVM class file version corresponding to Java SE 6
    pub const JAVA6: Version = Version {
        minor_version: 0,
        major_version: 50,
    };

    /// JVM class file version corresponding to Java SE 8 (released March 2014)
    pub const JAVA8: Version = Version {
        minor_version: 0,
        major_version: 52,
    };

    /// Methods with branches need a `StackMapTable` from this version onwards (it is optional in
    /// 50 and mandatory from 51)
    pub fn uses_stack_map_frames(&self) -> bool {
        self.major_version >= Self::JAVA6.major_version
    }

    /// Interfaces can declare static methods with code, and `invokestatic` can target
    /// interface methods, from this version onwards
    pub fn supports_static_interface_methods(&self) -> bool {
        self.major_version >= Self::JAVA8.major_version
    }
}

impl Serialize for Version {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.minor_version.serialize(writer)?;
        self.major_version.serialize(writer)?;
        Ok(())
    }
}

impl Parse for Version {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> std::result::Result<Self, Error> {
        let minor_version = u16::parse(reader)?;
        let major_version = u16::parse(reader)?;
        Ok(Version {
            minor_version,
            major_version,
        })
    }
}
