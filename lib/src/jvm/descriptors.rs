//! Field and method descriptors (JVMS 4.3)
//!
//! Descriptors are generic over how classes are named so that the same shapes can be reused for
//! resolved names ([`BinaryName`]) and for anything a caller wants to swap them out for through
//! `map`.

use super::{BinaryName, Name};
use crate::util::Width;
use std::fmt;

/// Descriptor could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorError {
    /// Character offset in the descriptor text
    pub position: usize,
    pub message: String,
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at offset {})", self.message, self.position)
    }
}

impl std::error::Error for DescriptorError {}

/// Cursor over the text of a descriptor
pub struct DescriptorReader<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> DescriptorReader<'a> {
    pub fn new(text: &'a str) -> DescriptorReader<'a> {
        DescriptorReader { text, position: 0 }
    }

    pub fn peek(&self) -> Option<char> {
        self.text[self.position..].chars().next()
    }

    /// Consume the next character if it is `expected`
    pub fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.position += expected.len_utf8();
            true
        } else {
            false
        }
    }

    /// Consume up to (and including) `terminator`, returning what came before it
    pub fn until(&mut self, terminator: char) -> Option<&'a str> {
        let rest = &self.text[self.position..];
        let end = rest.find(terminator)?;
        self.position += end + terminator.len_utf8();
        Some(&rest[..end])
    }

    pub fn error(&self, message: impl Into<String>) -> DescriptorError {
        DescriptorError {
            position: self.position,
            message: message.into(),
        }
    }

    fn unexpected(&self, what: &str) -> DescriptorError {
        match self.peek() {
            Some(c) => self.error(format!("expected {}, found '{}'", what, c)),
            None => self.error(format!("expected {}, found end of descriptor", what)),
        }
    }
}

/// Textual form of a descriptor
pub trait RenderDescriptor {
    fn write_descriptor(&self, out: &mut String);

    fn render(&self) -> String {
        let mut out = String::new();
        self.write_descriptor(&mut out);
        out
    }
}

pub trait ParseDescriptor: Sized {
    fn read_descriptor(reader: &mut DescriptorReader) -> Result<Self, DescriptorError>;

    /// Parse all of `text` as one descriptor
    fn parse(text: &str) -> Result<Self, DescriptorError> {
        let mut reader = DescriptorReader::new(text);
        let parsed = Self::read_descriptor(&mut reader)?;
        match reader.peek() {
            None => Ok(parsed),
            Some(c) => Err(reader.error(format!("trailing '{}'", c))),
        }
    }
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    const ALL: [(BaseType, char); 8] = [
        (BaseType::Byte, 'B'),
        (BaseType::Char, 'C'),
        (BaseType::Double, 'D'),
        (BaseType::Float, 'F'),
        (BaseType::Int, 'I'),
        (BaseType::Long, 'J'),
        (BaseType::Short, 'S'),
        (BaseType::Boolean, 'Z'),
    ];

    pub fn descriptor_char(self) -> char {
        Self::ALL
            .iter()
            .find(|(base, _)| *base == self)
            .map_or('?', |(_, c)| *c)
    }

    pub fn from_descriptor_char(c: char) -> Option<BaseType> {
        Self::ALL
            .iter()
            .find(|(_, base_char)| *base_char == c)
            .map(|(base, _)| *base)
    }

    /// Values of this type are `int`s on the operand stack
    pub fn is_int_like(self) -> bool {
        !matches!(self, BaseType::Long | BaseType::Float | BaseType::Double)
    }
}

impl Width for BaseType {
    fn width(&self) -> usize {
        match self {
            BaseType::Long | BaseType::Double => 2,
            _ => 1,
        }
    }
}

impl RenderDescriptor for BaseType {
    fn write_descriptor(&self, out: &mut String) {
        out.push(self.descriptor_char());
    }
}

impl ParseDescriptor for BaseType {
    fn read_descriptor(reader: &mut DescriptorReader) -> Result<Self, DescriptorError> {
        match reader.peek().and_then(BaseType::from_descriptor_char) {
            Some(base) => {
                reader.position += 1;
                Ok(base)
            }
            None => Err(reader.unexpected("a primitive type")),
        }
    }
}

impl RenderDescriptor for BinaryName {
    fn write_descriptor(&self, out: &mut String) {
        out.push('L');
        out.push_str(self.as_str());
        out.push(';');
    }
}

impl ParseDescriptor for BinaryName {
    fn read_descriptor(reader: &mut DescriptorReader) -> Result<Self, DescriptorError> {
        if !reader.eat('L') {
            return Err(reader.unexpected("'L'"));
        }
        let start = reader.position;
        let name = reader
            .until(';')
            .ok_or_else(|| reader.error("class name is missing its ';'"))?;
        BinaryName::from_str(name).map_err(|message| DescriptorError {
            position: start,
            message,
        })
    }
}

/// Array of `element_type`
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ArrayType<T> {
    /// Dimensions beyond the first (`A[]` has 0, `A[][][]` has 2)
    pub additional_dimensions: usize,
    pub element_type: T,
}

impl<T> ArrayType<T> {
    pub fn map<T2>(&self, map_element: impl FnOnce(&T) -> T2) -> ArrayType<T2> {
        ArrayType {
            additional_dimensions: self.additional_dimensions,
            element_type: map_element(&self.element_type),
        }
    }

    pub const fn dimensions(&self) -> usize {
        self.additional_dimensions + 1
    }

    fn single(element_type: T) -> ArrayType<T> {
        ArrayType {
            additional_dimensions: 0,
            element_type,
        }
    }

    fn wrapped(self) -> ArrayType<T> {
        ArrayType {
            additional_dimensions: self.additional_dimensions + 1,
            element_type: self.element_type,
        }
    }
}

impl<T: RenderDescriptor> RenderDescriptor for ArrayType<T> {
    fn write_descriptor(&self, out: &mut String) {
        out.extend(std::iter::repeat('[').take(self.dimensions()));
        self.element_type.write_descriptor(out);
    }
}

/// Anything a reference can point to
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum RefType<Class> {
    Object(Class),
    ObjectArray(ArrayType<Class>),
    PrimitiveArray(ArrayType<BaseType>),
}

impl<C> RefType<C> {
    pub fn map<C2>(&self, map_class: impl FnOnce(&C) -> C2) -> RefType<C2> {
        match self {
            RefType::Object(class) => RefType::Object(map_class(class)),
            RefType::ObjectArray(array) => RefType::ObjectArray(array.map(map_class)),
            RefType::PrimitiveArray(array) => RefType::PrimitiveArray(*array),
        }
    }

    /// Array whose elements have type `element`
    pub fn array(element: FieldType<C>) -> RefType<C> {
        match element {
            FieldType::Base(base) => RefType::PrimitiveArray(ArrayType::single(base)),
            FieldType::Ref(RefType::Object(class)) => {
                RefType::ObjectArray(ArrayType::single(class))
            }
            FieldType::Ref(RefType::ObjectArray(array)) => RefType::ObjectArray(array.wrapped()),
            FieldType::Ref(RefType::PrimitiveArray(array)) => {
                RefType::PrimitiveArray(array.wrapped())
            }
        }
    }
}

impl<C: RenderDescriptor> RenderDescriptor for RefType<C> {
    fn write_descriptor(&self, out: &mut String) {
        match self {
            RefType::Object(class) => class.write_descriptor(out),
            RefType::ObjectArray(array) => array.write_descriptor(out),
            RefType::PrimitiveArray(array) => array.write_descriptor(out),
        }
    }
}

impl<C: ParseDescriptor> ParseDescriptor for RefType<C> {
    fn read_descriptor(reader: &mut DescriptorReader) -> Result<Self, DescriptorError> {
        let mut dimensions = 0;
        while reader.eat('[') {
            dimensions += 1;
        }
        if dimensions > 255 {
            return Err(reader.error("array has more than 255 dimensions"));
        }

        match (dimensions, reader.peek()) {
            (0, Some('L')) => C::read_descriptor(reader).map(RefType::Object),
            (0, _) => Err(reader.unexpected("'L' or '['")),
            (_, Some('L')) => Ok(RefType::ObjectArray(ArrayType {
                additional_dimensions: dimensions - 1,
                element_type: C::read_descriptor(reader)?,
            })),
            (_, _) => Ok(RefType::PrimitiveArray(ArrayType {
                additional_dimensions: dimensions - 1,
                element_type: BaseType::read_descriptor(reader)?,
            })),
        }
    }
}

/// Type of a field, parameter, or return value
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType<Class> {
    Base(BaseType),
    Ref(RefType<Class>),
}

impl<C> Width for FieldType<C> {
    fn width(&self) -> usize {
        match self {
            FieldType::Base(base) => base.width(),
            FieldType::Ref(_) => 1,
        }
    }
}

impl<C> FieldType<C> {
    pub fn map<C2>(&self, map_class: impl FnOnce(&C) -> C2) -> FieldType<C2> {
        match self {
            FieldType::Base(base) => FieldType::Base(*base),
            FieldType::Ref(ref_type) => FieldType::Ref(ref_type.map(map_class)),
        }
    }

    pub fn array(element: FieldType<C>) -> FieldType<C> {
        FieldType::Ref(RefType::array(element))
    }

    pub const fn object(class: C) -> FieldType<C> {
        FieldType::Ref(RefType::Object(class))
    }

    pub const fn int() -> FieldType<C> {
        FieldType::Base(BaseType::Int)
    }

    pub const fn long() -> FieldType<C> {
        FieldType::Base(BaseType::Long)
    }

    pub const fn float() -> FieldType<C> {
        FieldType::Base(BaseType::Float)
    }

    pub const fn double() -> FieldType<C> {
        FieldType::Base(BaseType::Double)
    }

    pub const fn boolean() -> FieldType<C> {
        FieldType::Base(BaseType::Boolean)
    }
}

impl<C: RenderDescriptor> RenderDescriptor for FieldType<C> {
    fn write_descriptor(&self, out: &mut String) {
        match self {
            FieldType::Base(base) => base.write_descriptor(out),
            FieldType::Ref(ref_type) => ref_type.write_descriptor(out),
        }
    }
}

impl<C: ParseDescriptor> ParseDescriptor for FieldType<C> {
    fn read_descriptor(reader: &mut DescriptorReader) -> Result<Self, DescriptorError> {
        match reader.peek() {
            Some('L' | '[') => RefType::read_descriptor(reader).map(FieldType::Ref),
            _ => BaseType::read_descriptor(reader).map(FieldType::Base),
        }
    }
}

/// Parameter and return types of a method
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct MethodDescriptor<Class> {
    pub parameters: Vec<FieldType<Class>>,

    /// `None` for `void`
    pub return_type: Option<FieldType<Class>>,
}

impl<C> MethodDescriptor<C> {
    pub fn map<C2>(&self, map_class: impl Fn(&C) -> C2) -> MethodDescriptor<C2> {
        MethodDescriptor {
            parameters: self
                .parameters
                .iter()
                .map(|parameter| parameter.map(&map_class))
                .collect(),
            return_type: self.return_type.as_ref().map(|ret| ret.map(&map_class)),
        }
    }

    /// Local variable slots taken up by the arguments, including `this` if there is one
    pub fn parameter_length(&self, has_this_param: bool) -> usize {
        let this = usize::from(has_this_param);
        this + self.parameters.iter().map(Width::width).sum::<usize>()
    }
}

impl<C: RenderDescriptor> RenderDescriptor for MethodDescriptor<C> {
    fn write_descriptor(&self, out: &mut String) {
        out.push('(');
        for parameter in &self.parameters {
            parameter.write_descriptor(out);
        }
        out.push(')');
        match &self.return_type {
            Some(ret) => ret.write_descriptor(out),
            None => out.push('V'),
        }
    }
}

impl<C: ParseDescriptor> ParseDescriptor for MethodDescriptor<C> {
    fn read_descriptor(reader: &mut DescriptorReader) -> Result<Self, DescriptorError> {
        if !reader.eat('(') {
            return Err(reader.unexpected("'('"));
        }
        let mut parameters = vec![];
        while !reader.eat(')') {
            if reader.peek().is_none() {
                return Err(reader.unexpected("')'"));
            }
            parameters.push(FieldType::read_descriptor(reader)?);
        }
        let return_type = if reader.eat('V') {
            None
        } else {
            Some(FieldType::read_descriptor(reader)?)
        };
        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}
