use crate::jvm::{Deserialize, Serialize};
use byteorder::{ReadBytesExt, WriteBytesExt};

/// Class file format version
///
/// Minor version comes first in the binary format, but `Ord` compares the major version first.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

impl Version {
    pub const JAVA1_1: Version = Version::new(45, 3);
    pub const JAVA1_2: Version = Version::new(46, 0);
    pub const JAVA1_3: Version = Version::new(47, 0);
    pub const JAVA1_4: Version = Version::new(48, 0);
    pub const JAVA5: Version = Version::new(49, 0);
    pub const JAVA6: Version = Version::new(50, 0);

    pub const fn new(major: u16, minor: u16) -> Version {
        Version { major, minor }
    }

    /// Classes we can decode and encode again without stack map frames
    ///
    /// Version 50 classes fall back to the type-inferring verifier when their `StackMapTable` is
    /// missing. Anything newer requires the stack maps we drop.
    pub fn is_supported(&self) -> bool {
        (Version::JAVA1_1.major..=Version::JAVA6.major).contains(&self.major)
    }
}

impl Serialize for Version {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.minor.serialize(writer)?;
        self.major.serialize(writer)
    }
}

impl Deserialize for Version {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        let minor = u16::deserialize(reader)?;
        let major = u16::deserialize(reader)?;
        Ok(Version { major, minor })
    }
}
