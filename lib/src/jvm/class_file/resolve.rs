use crate::jvm::class_file::{
    parse_class_constant, ClassConstantIndex, Constant, ConstantIndex, ConstantPool,
    Utf8ConstantIndex,
};
use crate::jvm::code::{ConstantData, FieldRef, MethodRef};
use crate::jvm::{
    BinaryName, Error, FieldType, MethodDescriptor, Name, ParseDescriptor, RefType,
    UnqualifiedName,
};

/// Lookups resolving pool indices into the symbolic values used by the model
impl ConstantPool {
    pub fn binary_name(&self, index: ClassConstantIndex) -> Result<BinaryName, Error> {
        BinaryName::from_str(self.class_name(index)?).map_err(Error::BadName)
    }

    pub fn ref_type(&self, index: ClassConstantIndex) -> Result<RefType<BinaryName>, Error> {
        parse_class_constant(self.class_name(index)?)
    }

    pub fn unqualified_name(&self, index: Utf8ConstantIndex) -> Result<UnqualifiedName, Error> {
        UnqualifiedName::from_str(self.utf8(index)?).map_err(Error::BadName)
    }

    pub fn field_type(&self, index: Utf8ConstantIndex) -> Result<FieldType<BinaryName>, Error> {
        let text = self.utf8(index)?;
        FieldType::parse(text).map_err(|err| Error::BadDescriptor(format!("{}: {}", text, err)))
    }

    pub fn method_descriptor(
        &self,
        index: Utf8ConstantIndex,
    ) -> Result<MethodDescriptor<BinaryName>, Error> {
        let text = self.utf8(index)?;
        MethodDescriptor::parse(text)
            .map_err(|err| Error::BadDescriptor(format!("{}: {}", text, err)))
    }

    /// Constant loadable through `ldc` or usable as a field's `ConstantValue`
    pub fn constant_data(&self, index: ConstantIndex) -> Result<ConstantData, Error> {
        match self.get(index)? {
            Constant::Integer(i) => Ok(ConstantData::Integer(*i)),
            Constant::Float(f) => Ok(ConstantData::Float(*f)),
            Constant::Long(l) => Ok(ConstantData::Long(*l)),
            Constant::Double(d) => Ok(ConstantData::Double(*d)),
            Constant::String(utf8) => Ok(ConstantData::String(self.utf8(*utf8)?.to_owned())),
            Constant::Class(_) => Ok(ConstantData::Class(self.ref_type(ClassConstantIndex(index))?)),
            _ => Err(Error::UnexpectedConstant {
                index: index.0,
                expected: "loadable constant",
            }),
        }
    }

    pub fn field_ref(&self, index: ConstantIndex) -> Result<FieldRef, Error> {
        match self.get(index)? {
            Constant::FieldRef(class, name_and_type) => {
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Ok(FieldRef {
                    owner: self.binary_name(*class)?,
                    name: UnqualifiedName::from_str(name).map_err(Error::BadName)?,
                    descriptor: FieldType::parse(descriptor).map_err(|err| {
                        Error::BadDescriptor(format!("{}: {}", descriptor, err))
                    })?,
                })
            }
            _ => Err(Error::UnexpectedConstant {
                index: index.0,
                expected: "Fieldref",
            }),
        }
    }

    pub fn method_ref(&self, index: ConstantIndex) -> Result<MethodRef, Error> {
        match self.get(index)? {
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => {
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Ok(MethodRef {
                    owner: self.ref_type(*class)?,
                    name: UnqualifiedName::from_str(name).map_err(Error::BadName)?,
                    descriptor: MethodDescriptor::parse(descriptor).map_err(|err| {
                        Error::BadDescriptor(format!("{}: {}", descriptor, err))
                    })?,
                    is_interface: *is_interface,
                })
            }
            _ => Err(Error::UnexpectedConstant {
                index: index.0,
                expected: "Methodref",
            }),
        }
    }
}
