use super::{Deserialize, Serialize};
use bitflags::bitflags;
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::Result;

/// Access flags are a big-endian `u16`. Bits this crate does not know about are dropped when
/// reading, since none of them mean anything for the class versions that can be decoded.
macro_rules! access_flags {
    ($(#[$attr:meta])* $name:ident { $($flag:ident = $bit:expr;)* }) => {
        bitflags! {
            $(#[$attr])*
            pub struct $name: u16 {
                $(const $flag = $bit;)*
            }
        }

        impl Serialize for $name {
            fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
                self.bits().serialize(writer)
            }
        }

        impl Deserialize for $name {
            fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
                u16::deserialize(reader).map(Self::from_bits_truncate)
            }
        }
    };
}

access_flags! {
    /// Flags on a class (JVMS table 4.1-B)
    ClassAccessFlags {
        PUBLIC = 0x0001;
        FINAL = 0x0010;
        SUPER = 0x0020;
        INTERFACE = 0x0200;
        ABSTRACT = 0x0400;
        SYNTHETIC = 0x1000;
        ANNOTATION = 0x2000;
        ENUM = 0x4000;
    }
}

access_flags! {
    /// Flags on a field (JVMS table 4.5-A)
    FieldAccessFlags {
        PUBLIC = 0x0001;
        PRIVATE = 0x0002;
        PROTECTED = 0x0004;
        STATIC = 0x0008;
        FINAL = 0x0010;
        VOLATILE = 0x0040;
        TRANSIENT = 0x0080;
        SYNTHETIC = 0x1000;
        ENUM = 0x4000;
    }
}

access_flags! {
    /// Flags on a method (JVMS table 4.6-A)
    MethodAccessFlags {
        PUBLIC = 0x0001;
        PRIVATE = 0x0002;
        PROTECTED = 0x0004;
        STATIC = 0x0008;
        FINAL = 0x0010;
        SYNCHRONIZED = 0x0020;
        BRIDGE = 0x0040;
        VARARGS = 0x0080;
        NATIVE = 0x0100;
        ABSTRACT = 0x0400;
        STRICT = 0x0800;
        SYNTHETIC = 0x1000;
    }
}
