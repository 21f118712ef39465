use crate::jvm::class_file::{self, AttributeLike, ConstantPool, ConstantValue, ConstantsPool};
use crate::jvm::code::ConstantData;
use crate::jvm::{
    BinaryName, Error, FieldAccessFlags, FieldType, Name, RenderDescriptor, UnqualifiedName,
};
use log::debug;

/// In-memory representation of a field
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub access_flags: FieldAccessFlags,
    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,

    /// Constant field value
    pub constant_value: Option<ConstantData>,
}

impl Field {
    pub(crate) fn decode(pool: &ConstantPool, field: &class_file::Field) -> Result<Field, Error> {
        let name = pool.unqualified_name(field.name_index)?;
        let descriptor = pool.field_type(field.descriptor_index)?;
        let mut constant_value = None;
        for attribute in &field.attributes {
            let attribute_name = pool.utf8(attribute.name_index)?;
            if attribute_name == ConstantValue::NAME {
                let ConstantValue(index) = attribute.parse()?;
                constant_value = Some(pool.constant_data(index)?);
            } else {
                debug!("Dropping attribute {} of field {}", attribute_name, name);
            }
        }
        Ok(Field {
            access_flags: field.access_flags,
            name,
            descriptor,
            constant_value,
        })
    }

    pub(crate) fn encode(&self, constants: &mut ConstantsPool) -> Result<class_file::Field, Error> {
        let name_index = constants.get_utf8(self.name.as_str())?;
        let descriptor_index = constants.get_utf8(self.descriptor.render())?;
        let mut attributes = vec![];
        if let Some(constant) = &self.constant_value {
            let index = constants.get_constant(constant)?;
            attributes.push(constants.get_attribute(ConstantValue(index))?);
        }
        Ok(class_file::Field {
            access_flags: self.access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }
}
