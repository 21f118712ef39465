use crate::jvm::code::{ConstantData, FieldRef, Insn, Instruction, MethodRef};
use crate::jvm::model::Class;
use crate::jvm::{BinaryName, FieldType, MethodDescriptor, RefType};
use std::collections::HashMap;

/// Renames classes everywhere they are mentioned
///
/// Names missing from the table are left alone, so remapping never fails.
pub struct Remapper<'a> {
    mappings: &'a HashMap<BinaryName, BinaryName>,
}

impl<'a> Remapper<'a> {
    pub fn new(mappings: &'a HashMap<BinaryName, BinaryName>) -> Remapper<'a> {
        Remapper { mappings }
    }

    /// Output name of a class
    pub fn map_name(&self, name: &BinaryName) -> BinaryName {
        self.mappings.get(name).unwrap_or(name).clone()
    }

    pub fn map_ref_type(&self, ref_type: &RefType<BinaryName>) -> RefType<BinaryName> {
        ref_type.map(|class| self.map_name(class))
    }

    pub fn map_field_type(&self, field_type: &FieldType<BinaryName>) -> FieldType<BinaryName> {
        field_type.map(|class| self.map_name(class))
    }

    pub fn map_descriptor(
        &self,
        descriptor: &MethodDescriptor<BinaryName>,
    ) -> MethodDescriptor<BinaryName> {
        descriptor.map(|class| self.map_name(class))
    }

    pub fn map_constant(&self, constant: &ConstantData) -> ConstantData {
        match constant {
            ConstantData::Class(class) => ConstantData::Class(self.map_ref_type(class)),
            other => other.clone(),
        }
    }

    fn map_field_ref(&self, field: &FieldRef) -> FieldRef {
        FieldRef {
            owner: self.map_name(&field.owner),
            name: field.name.clone(),
            descriptor: self.map_field_type(&field.descriptor),
        }
    }

    fn map_method_ref(&self, method: &MethodRef) -> MethodRef {
        MethodRef {
            owner: self.map_ref_type(&method.owner),
            name: method.name.clone(),
            descriptor: self.map_descriptor(&method.descriptor),
            is_interface: method.is_interface,
        }
    }

    /// Rename the classes an instruction refers to, or `None` if it refers to no class
    pub fn map_instruction(&self, instruction: &Instruction) -> Option<Instruction> {
        use Instruction::*;
        Some(match instruction {
            Ldc(constant @ ConstantData::Class(_)) => Ldc(self.map_constant(constant)),
            GetStatic(field) => GetStatic(self.map_field_ref(field)),
            PutStatic(field) => PutStatic(self.map_field_ref(field)),
            GetField(field) => GetField(self.map_field_ref(field)),
            PutField(field) => PutField(self.map_field_ref(field)),
            Invoke(typ, method) => Invoke(*typ, self.map_method_ref(method)),
            New(class) => New(self.map_ref_type(class)),
            ANewArray(class) => ANewArray(self.map_ref_type(class)),
            CheckCast(class) => CheckCast(self.map_ref_type(class)),
            InstanceOf(class) => InstanceOf(self.map_ref_type(class)),
            MultiANewArray(class, dimensions) => {
                MultiANewArray(self.map_ref_type(class), *dimensions)
            }
            _ => return None,
        })
    }

    /// Rename every class mentioned in a class, including the class itself
    pub fn remap_class(&self, class: &mut Class) {
        class.name = self.map_name(&class.name);
        class.super_name = class.super_name.as_ref().map(|name| self.map_name(name));
        for interface in &mut class.interfaces {
            *interface = self.map_name(interface);
        }

        for field in &mut class.fields {
            field.descriptor = self.map_field_type(&field.descriptor);
            field.constant_value = field
                .constant_value
                .as_ref()
                .map(|constant| self.map_constant(constant));
        }

        for method in &mut class.methods {
            method.descriptor = self.map_descriptor(&method.descriptor);
            for exception in &mut method.exceptions {
                *exception = self.map_name(exception);
            }

            if let Some(code) = &mut method.code {
                for handler in &mut code.handlers {
                    if let Some(catch_type) = &mut handler.catch_type {
                        *catch_type = self.map_name(catch_type);
                    }
                }
                for id in code.instructions.ids() {
                    let renamed = match &code.instructions[id] {
                        Insn::Instruction(instruction) => self.map_instruction(instruction),
                        _ => None,
                    };
                    if let Some(renamed) = renamed {
                        code.instructions.replace(id, renamed);
                    }
                }
            }
        }
    }
}
