use crate::jvm::code::{ConstantData, FieldRef, MethodRef};
use crate::jvm::{
    BinaryName, Deserialize, Error, Name, ParseDescriptor, RefType, RenderDescriptor, Serialize,
};
use crate::util::Width;
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::borrow::{Borrow, Cow};
use std::collections::HashMap;

/// Constant pool read out of a class file
///
/// Index `0` and the slot following every `long` or `double` are unusable and stored as `None`.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    entries: Vec<Option<Constant>>,
}

impl ConstantPool {
    /// Number of slots, including the unusable slot `0`
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn get(&self, index: ConstantIndex) -> Result<&Constant, Error> {
        self.entries
            .get(index.0 as usize)
            .and_then(|constant| constant.as_ref())
            .ok_or(Error::BadConstantIndex(index.0))
    }

    pub fn utf8(&self, index: Utf8ConstantIndex) -> Result<&str, Error> {
        match self.get(index.0)? {
            Constant::Utf8(string) => Ok(string),
            _ => Err(Error::UnexpectedConstant {
                index: (index.0).0,
                expected: "Utf8",
            }),
        }
    }

    /// Raw text of a class constant (either a binary name or an array descriptor)
    pub fn class_name(&self, index: ClassConstantIndex) -> Result<&str, Error> {
        match self.get(index.0)? {
            Constant::Class(name) => self.utf8(*name),
            _ => Err(Error::UnexpectedConstant {
                index: (index.0).0,
                expected: "Class",
            }),
        }
    }

    pub fn name_and_type(&self, index: NameAndTypeConstantIndex) -> Result<(&str, &str), Error> {
        match self.get(index.0)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(Error::UnexpectedConstant {
                index: (index.0).0,
                expected: "NameAndType",
            }),
        }
    }

    /// Iterate over the usable constants along with their indices
    pub fn iter(&self) -> impl Iterator<Item = (ConstantIndex, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(idx, constant)| Some((ConstantIndex(idx as u16), constant.as_ref()?)))
    }

    pub fn decode<R: ReadBytesExt>(reader: &mut R) -> Result<ConstantPool, Error> {
        let count = u16::deserialize(reader)?;
        let mut entries: Vec<Option<Constant>> = Vec::with_capacity(count as usize);
        entries.push(None);
        while entries.len() < count as usize {
            let constant = Constant::decode(reader)?;
            let width = constant.width();
            entries.push(Some(constant));
            if width == 2 {
                entries.push(None);
            }
        }
        if entries.len() != count as usize {
            return Err(Error::MalformedAttribute("constant pool"));
        }
        Ok(ConstantPool { entries })
    }
}

impl Serialize for ConstantPool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        (self.entries.len() as u16).serialize(writer)?;
        for constant in self.entries.iter().flatten() {
            constant.serialize(writer)?;
        }
        Ok(())
    }
}

/// Class file constants pool builder
///
/// The pool is append only and deduplicates every constant it hands out. Once the class has been
/// fully written out, the builder is consumed into a regular [`ConstantPool`].
pub struct ConstantsPool {
    constants: Vec<Constant>,
    next_offset: u16,

    utf8s: HashMap<String, Utf8ConstantIndex>,
    classes: HashMap<Utf8ConstantIndex, ClassConstantIndex>,
    strings: HashMap<Utf8ConstantIndex, StringConstantIndex>,
    integers: HashMap<i32, ConstantIndex>,
    floats: HashMap<u32, ConstantIndex>,
    longs: HashMap<i64, ConstantIndex>,
    doubles: HashMap<u64, ConstantIndex>,
    name_and_types: HashMap<(Utf8ConstantIndex, Utf8ConstantIndex), NameAndTypeConstantIndex>,
    fieldrefs: HashMap<(ClassConstantIndex, NameAndTypeConstantIndex), FieldRefConstantIndex>,
    methodrefs:
        HashMap<(ClassConstantIndex, NameAndTypeConstantIndex, bool), MethodRefConstantIndex>,
}

impl Default for ConstantsPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantsPool {
    /// Make a fresh empty constants pool
    pub fn new() -> ConstantsPool {
        ConstantsPool {
            constants: vec![],
            next_offset: 1,
            utf8s: HashMap::new(),
            classes: HashMap::new(),
            strings: HashMap::new(),
            integers: HashMap::new(),
            floats: HashMap::new(),
            longs: HashMap::new(),
            doubles: HashMap::new(),
            name_and_types: HashMap::new(),
            fieldrefs: HashMap::new(),
            methodrefs: HashMap::new(),
        }
    }

    /// Push a constant into the constant pool, provided there is space for it
    ///
    /// Note: the largest valid index is 65534, indexing starts at 1, and some constants take two
    /// spaces.
    fn push_constant(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        let offset = self.next_offset;
        match offset.checked_add(constant.width() as u16) {
            Some(next) if next < u16::MAX => self.next_offset = next,
            _ => return Err(Error::ConstantPoolOverflow { constant, offset }),
        }
        self.constants.push(constant);
        Ok(ConstantIndex(offset))
    }

    /// Consume the builder and return the final pool
    pub fn into_pool(self) -> ConstantPool {
        let mut entries = Vec::with_capacity(self.next_offset as usize);
        entries.push(None);
        for constant in self.constants {
            let width = constant.width();
            entries.push(Some(constant));
            if width == 2 {
                entries.push(None);
            }
        }
        ConstantPool { entries }
    }

    /// Get or insert a utf8 constant from the constant pool
    pub fn get_utf8<'a, S: Into<Cow<'a, str>>>(
        &mut self,
        utf8: S,
    ) -> Result<Utf8ConstantIndex, Error> {
        let cow = utf8.into();

        if let Some(idx) = self.utf8s.get::<str>(cow.borrow()) {
            Ok(*idx)
        } else {
            let owned = cow.into_owned();
            let constant = Constant::Utf8(owned.clone());
            let idx = Utf8ConstantIndex(self.push_constant(constant)?);
            self.utf8s.insert(owned, idx);
            Ok(idx)
        }
    }

    /// Get or insert a class constant from its raw text
    fn get_class_text(&mut self, text: &str) -> Result<ClassConstantIndex, Error> {
        let name = self.get_utf8(text)?;
        if let Some(idx) = self.classes.get(&name) {
            Ok(*idx)
        } else {
            let idx = ClassConstantIndex(self.push_constant(Constant::Class(name))?);
            self.classes.insert(name, idx);
            Ok(idx)
        }
    }

    /// Get or insert a class constant for a plain class name
    pub fn get_class(&mut self, class: &BinaryName) -> Result<ClassConstantIndex, Error> {
        self.get_class_text(class.as_str())
    }

    /// Get or insert a class constant for any reference type
    ///
    /// Arrays are written as their descriptors, see [JVMS 4.4.1][0].
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.4.1
    pub fn get_ref_type(
        &mut self,
        ref_type: &RefType<BinaryName>,
    ) -> Result<ClassConstantIndex, Error> {
        self.get_class_text(&class_constant_text(ref_type))
    }

    /// Get or insert a string constant from the constant pool
    pub fn get_string(&mut self, string: &str) -> Result<StringConstantIndex, Error> {
        let utf8 = self.get_utf8(string)?;
        if let Some(idx) = self.strings.get(&utf8) {
            Ok(*idx)
        } else {
            let idx = StringConstantIndex(self.push_constant(Constant::String(utf8))?);
            self.strings.insert(utf8, idx);
            Ok(idx)
        }
    }

    /// Get or insert a name & type constant from the constant pool
    pub fn get_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
    ) -> Result<NameAndTypeConstantIndex, Error> {
        let name = self.get_utf8(name)?;
        let descriptor = self.get_utf8(descriptor)?;
        let key = (name, descriptor);
        if let Some(idx) = self.name_and_types.get(&key) {
            Ok(*idx)
        } else {
            let constant = Constant::NameAndType { name, descriptor };
            let idx = NameAndTypeConstantIndex(self.push_constant(constant)?);
            self.name_and_types.insert(key, idx);
            Ok(idx)
        }
    }

    /// Get or insert a `CONSTANT_Fieldref_info`
    pub fn get_field_ref(&mut self, field: &FieldRef) -> Result<FieldRefConstantIndex, Error> {
        let class = self.get_class(&field.owner)?;
        let name_and_type =
            self.get_name_and_type(field.name.as_str(), &field.descriptor.render())?;
        let key = (class, name_and_type);
        if let Some(idx) = self.fieldrefs.get(&key) {
            Ok(*idx)
        } else {
            let constant = Constant::FieldRef(class, name_and_type);
            let idx = FieldRefConstantIndex(self.push_constant(constant)?);
            self.fieldrefs.insert(key, idx);
            Ok(idx)
        }
    }

    /// Get or insert a `CONSTANT_Methodref_info` or `CONSTANT_InterfaceMethodref_info`
    pub fn get_method_ref(&mut self, method: &MethodRef) -> Result<MethodRefConstantIndex, Error> {
        let class = self.get_ref_type(&method.owner)?;
        let name_and_type =
            self.get_name_and_type(method.name.as_str(), &method.descriptor.render())?;
        let key = (class, name_and_type, method.is_interface);
        if let Some(idx) = self.methodrefs.get(&key) {
            Ok(*idx)
        } else {
            let constant = Constant::MethodRef {
                class,
                name_and_type,
                is_interface: method.is_interface,
            };
            let idx = MethodRefConstantIndex(self.push_constant(constant)?);
            self.methodrefs.insert(key, idx);
            Ok(idx)
        }
    }

    /// Get or insert a constant which can be loaded with `ldc`, `ldc_w`, or `ldc2_w`
    ///
    /// Floating point constants are deduplicated on their bits, so `-0.0` and `NaN` payloads
    /// survive unchanged.
    pub fn get_constant(&mut self, constant: &ConstantData) -> Result<ConstantIndex, Error> {
        match constant {
            ConstantData::String(string) => Ok(self.get_string(string)?.into()),
            ConstantData::Class(class) => Ok(self.get_ref_type(class)?.into()),
            ConstantData::Integer(integer) => {
                if let Some(idx) = self.integers.get(integer) {
                    Ok(*idx)
                } else {
                    let idx = self.push_constant(Constant::Integer(*integer))?;
                    self.integers.insert(*integer, idx);
                    Ok(idx)
                }
            }
            ConstantData::Long(long) => {
                if let Some(idx) = self.longs.get(long) {
                    Ok(*idx)
                } else {
                    let idx = self.push_constant(Constant::Long(*long))?;
                    self.longs.insert(*long, idx);
                    Ok(idx)
                }
            }
            ConstantData::Float(float) => {
                let bits = float.to_bits();
                if let Some(idx) = self.floats.get(&bits) {
                    Ok(*idx)
                } else {
                    let idx = self.push_constant(Constant::Float(*float))?;
                    self.floats.insert(bits, idx);
                    Ok(idx)
                }
            }
            ConstantData::Double(double) => {
                let bits = double.to_bits();
                if let Some(idx) = self.doubles.get(&bits) {
                    Ok(*idx)
                } else {
                    let idx = self.push_constant(Constant::Double(*double))?;
                    self.doubles.insert(bits, idx);
                    Ok(idx)
                }
            }
        }
    }
}

/// Text stored in a `CONSTANT_Class_info` for a reference type
pub fn class_constant_text(ref_type: &RefType<BinaryName>) -> Cow<'_, str> {
    match ref_type {
        RefType::Object(class) => Cow::Borrowed(class.as_str()),
        other => Cow::Owned(other.render()),
    }
}

/// Inverse of [`class_constant_text`]
pub fn parse_class_constant(text: &str) -> Result<RefType<BinaryName>, Error> {
    if text.starts_with('[') {
        RefType::parse(text).map_err(|err| Error::BadDescriptor(format!("{}: {}", text, err)))
    } else {
        BinaryName::from_str(text)
            .map(RefType::Object)
            .map_err(Error::BadName)
    }
}

/// Constants as in the constant pool
///
/// Note: constant types introduced along with `invokedynamic` are not included, since classes
/// that could contain them are rejected.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, PartialEq)]
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
    Utf8(String),
}

impl Constant {
    pub fn decode<R: ReadBytesExt>(reader: &mut R) -> Result<Constant, Error> {
        let constant = match u8::deserialize(reader)? {
            1 => {
                let len = u16::deserialize(reader)?;
                let mut buffer = vec![0u8; len as usize];
                reader.read_exact(&mut buffer)?;
                Constant::Utf8(decode_modified_utf8(&buffer)?)
            }
            3 => Constant::Integer(i32::deserialize(reader)?),
            4 => Constant::Float(f32::deserialize(reader)?),
            5 => Constant::Long(i64::deserialize(reader)?),
            6 => Constant::Double(f64::deserialize(reader)?),
            7 => Constant::Class(Utf8ConstantIndex::deserialize(reader)?),
            8 => Constant::String(Utf8ConstantIndex::deserialize(reader)?),
            9 => Constant::FieldRef(
                ClassConstantIndex::deserialize(reader)?,
                NameAndTypeConstantIndex::deserialize(reader)?,
            ),
            tag @ (10 | 11) => Constant::MethodRef {
                class: ClassConstantIndex::deserialize(reader)?,
                name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
                is_interface: tag == 11,
            },
            12 => Constant::NameAndType {
                name: Utf8ConstantIndex::deserialize(reader)?,
                descriptor: Utf8ConstantIndex::deserialize(reader)?,
            },
            other => return Err(Error::UnsupportedConstant(other)),
        };
        Ok(constant)
    }
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Constant::Utf8(string) => {
                1u8.serialize(writer)?;
                let buffer: Vec<u8> = encode_modified_utf8(string);
                (buffer.len() as u16).serialize(writer)?;
                writer.write_all(&buffer)?;
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
        };
        Ok(())
    }
}

/// Almost all constants have width 1, except for `Constant::Long` and `Constant::Double`. Quoting
/// the JVMS:
///
/// > All 8-byte constants take up two entries in the constant_pool table of the class file. If a
/// > CONSTANT_Long_info or CONSTANT_Double_info structure is the item in the constant_pool table
/// > at index n, then the next usable item in the pool is located at index n+2. The constant_pool
/// > index n+1 must be valid but is considered unusable.
impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

/// Encode a string as modified UTF-8 (JVMS 4.4.7)
///
/// Each UTF-16 code unit is written on its own with the 1, 2, or 3 byte UTF-8 forms. This gives
/// the two differences from standard UTF-8: NUL takes two bytes, and supplementary characters
/// become a pair of 3 byte surrogates.
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(string.len());
    for unit in string.encode_utf16() {
        match unit {
            0x0001..=0x007F => buffer.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                buffer.push(0xC0 | (unit >> 6) as u8);
                buffer.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                buffer.push(0xE0 | (unit >> 12) as u8);
                buffer.push(0x80 | (unit >> 6 & 0x3F) as u8);
                buffer.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    buffer
}

/// Decode modified UTF-8 back into a string
///
/// Surrogate pairs are recombined. A lone surrogate has no representation in a Rust string, so it
/// is reported as malformed along with every other invalid sequence.
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String, Error> {
    let malformed = |at: usize| Error::MalformedUtf8(format!("invalid sequence at byte {}", at));

    // First decode into UTF-16 code units, then let the standard library pair up surrogates
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i] as u16;
        if b0 & 0x80 == 0 && b0 != 0 {
            units.push(b0);
            i += 1;
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = *bytes.get(i + 1).ok_or_else(|| malformed(i))? as u16;
            if b1 & 0xC0 != 0x80 {
                return Err(malformed(i));
            }
            units.push((b0 & 0x1F) << 6 | (b1 & 0x3F));
            i += 2;
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = *bytes.get(i + 1).ok_or_else(|| malformed(i))? as u16;
            let b2 = *bytes.get(i + 2).ok_or_else(|| malformed(i))? as u16;
            if b1 & 0xC0 != 0x80 || b2 & 0xC0 != 0x80 {
                return Err(malformed(i));
            }
            units.push((b0 & 0x0F) << 12 | (b1 & 0x3F) << 6 | (b2 & 0x3F));
            i += 3;
        } else {
            return Err(malformed(i));
        }
    }
    String::from_utf16(&units).map_err(|err| Error::MalformedUtf8(err.to_string()))
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct ConstantIndex(pub u16);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct Utf8ConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct StringConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct NameAndTypeConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct ClassConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct FieldRefConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct MethodRefConstantIndex(pub ConstantIndex);

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Deserialize for ConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        Ok(ConstantIndex(u16::deserialize(reader)?))
    }
}

macro_rules! typed_constant_index {
    ($($typ:ident),*) => {
        $(
            impl From<$typ> for ConstantIndex {
                fn from(index: $typ) -> ConstantIndex {
                    index.0
                }
            }

            impl Serialize for $typ {
                fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                    self.0.serialize(writer)
                }
            }

            impl Deserialize for $typ {
                fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
                    Ok($typ(ConstantIndex::deserialize(reader)?))
                }
            }
        )*
    };
}

typed_constant_index!(
    Utf8ConstantIndex,
    StringConstantIndex,
    NameAndTypeConstantIndex,
    ClassConstantIndex,
    FieldRefConstantIndex,
    MethodRefConstantIndex
);


#[cfg(test)]
mod pool_tests {
    use super::*;
    use crate::jvm::{FieldType, MethodDescriptor, UnqualifiedName};
    use std::io::Cursor;

    #[test]
    fn deduplicates_constants() {
        let mut pool = ConstantsPool::new();
        let a = pool.get_utf8("client").unwrap();
        let b = pool.get_utf8(String::from("client")).unwrap();
        assert_eq!(a, b);

        let c1 = pool.get_class(&BinaryName::OBJECT).unwrap();
        let c2 = pool
            .get_ref_type(&RefType::Object(BinaryName::OBJECT))
            .unwrap();
        assert_eq!(c1, c2);

        let neg_zero = pool.get_constant(&ConstantData::Float(-0.0)).unwrap();
        let zero = pool.get_constant(&ConstantData::Float(0.0)).unwrap();
        assert_ne!(neg_zero, zero);
    }

    #[test]
    fn wide_constants_take_two_slots() {
        let mut pool = ConstantsPool::new();
        let long = pool.get_constant(&ConstantData::Long(7)).unwrap();
        let int = pool.get_constant(&ConstantData::Integer(7)).unwrap();
        assert_eq!(long, ConstantIndex(1));
        assert_eq!(int, ConstantIndex(3));

        let pool = pool.into_pool();
        assert_eq!(pool.len(), 4);
        assert!(pool.get(ConstantIndex(2)).is_err());
    }

    #[test]
    fn serialized_pool_decodes() {
        let mut builder = ConstantsPool::new();
        let field = FieldRef {
            owner: BinaryName::from_str("client").unwrap(),
            name: UnqualifiedName::from_str("ob").unwrap(),
            descriptor: FieldType::boolean(),
        };
        let method = MethodRef {
            owner: RefType::Object(BinaryName::OBJECT),
            name: UnqualifiedName::INIT,
            descriptor: MethodDescriptor {
                parameters: vec![],
                return_type: None,
            },
            is_interface: false,
        };
        let field_idx = builder.get_field_ref(&field).unwrap();
        let method_idx = builder.get_method_ref(&method).unwrap();
        builder.get_constant(&ConstantData::Double(1.5)).unwrap();

        let mut bytes = vec![];
        builder.into_pool().serialize(&mut bytes).unwrap();
        let pool = ConstantPool::decode(&mut Cursor::new(&bytes)).unwrap();

        match pool.get(field_idx.into()).unwrap() {
            Constant::FieldRef(class, nat) => {
                assert_eq!(pool.class_name(*class).unwrap(), "client");
                assert_eq!(pool.name_and_type(*nat).unwrap(), ("ob", "Z"));
            }
            other => panic!("unexpected constant {:?}", other),
        }
        match pool.get(method_idx.into()).unwrap() {
            Constant::MethodRef { name_and_type, .. } => {
                assert_eq!(pool.name_and_type(*name_and_type).unwrap(), ("<init>", "()V"));
            }
            other => panic!("unexpected constant {:?}", other),
        }
    }

    #[test]
    fn class_constants_for_arrays() {
        let array = parse_class_constant("[Ljava/lang/String;").unwrap();
        assert_eq!(class_constant_text(&array), "[Ljava/lang/String;");
        let object = parse_class_constant("client").unwrap();
        assert_eq!(object, RefType::Object(BinaryName::from_str("client").unwrap()));
        assert!(parse_class_constant("").is_err());
    }

    #[test]
    fn rejects_invokedynamic_constants() {
        // count = 2, tag 18
        let bytes = [0u8, 2, 18, 0, 0, 0, 1];
        match ConstantPool::decode(&mut Cursor::new(&bytes[..])) {
            Err(Error::UnsupportedConstant(18)) => (),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
