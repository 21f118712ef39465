use crate::jvm::class_file::{self, AttributeLike, ConstantPool, ConstantsPool, Exceptions};
use crate::jvm::code::{decode_code, encode_code, Code};
use crate::jvm::{
    BinaryName, Error, MethodAccessFlags, MethodDescriptor, Name, RenderDescriptor,
    UnqualifiedName,
};
use log::debug;

/// Semantic representation of a method
#[derive(Clone, Debug)]
pub struct Method {
    pub access_flags: MethodAccessFlags,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,

    /// Which exceptions can this method throw?
    ///
    /// Note: this does not need to include `RuntimeException`, `Error`, or subclasses
    pub exceptions: Vec<BinaryName>,

    /// Method body (absent for `abstract` and `native` methods)
    pub code: Option<Code>,
}

impl Method {
    /// Create a new method with no body
    pub fn new(
        access_flags: MethodAccessFlags,
        name: UnqualifiedName,
        descriptor: MethodDescriptor<BinaryName>,
    ) -> Method {
        Method {
            access_flags,
            name,
            descriptor,
            exceptions: vec![],
            code: None,
        }
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    /// Local variable slots taken up by the parameters (including `this`)
    pub fn parameter_slots(&self) -> usize {
        self.descriptor.parameter_length(!self.is_static())
    }

    /// Does the method match a name and rendered descriptor?
    pub fn matches(&self, name: &str, descriptor: &str) -> bool {
        self.name.as_str() == name && self.descriptor.render() == descriptor
    }

    pub(crate) fn decode(
        pool: &ConstantPool,
        method: &class_file::Method,
    ) -> Result<Method, Error> {
        let name = pool.unqualified_name(method.name_index)?;
        let descriptor = pool.method_descriptor(method.descriptor_index)?;
        let mut exceptions = vec![];
        let mut code = None;
        for attribute in &method.attributes {
            let attribute_name = pool.utf8(attribute.name_index)?;
            if attribute_name == class_file::Code::NAME {
                let raw: class_file::Code = attribute.parse()?;
                code = Some(decode_code(pool, &raw)?);
            } else if attribute_name == Exceptions::NAME {
                let Exceptions(classes) = attribute.parse()?;
                exceptions = classes
                    .into_iter()
                    .map(|class| pool.binary_name(class))
                    .collect::<Result<_, _>>()?;
            } else {
                debug!(
                    "Dropping attribute {} of method {}{}",
                    attribute_name,
                    name,
                    descriptor.render()
                );
            }
        }
        Ok(Method {
            access_flags: method.access_flags,
            name,
            descriptor,
            exceptions,
            code,
        })
    }

    pub(crate) fn encode(
        &self,
        constants: &mut ConstantsPool,
    ) -> Result<class_file::Method, Error> {
        let name_index = constants.get_utf8(self.name.as_str())?;
        let descriptor_index = constants.get_utf8(self.descriptor.render())?;

        let mut attributes = vec![];
        if let Some(code) = &self.code {
            let code = encode_code(code, self.parameter_slots(), constants)?;
            attributes.push(constants.get_attribute(code)?);
        }
        if !self.exceptions.is_empty() {
            let exceptions = self
                .exceptions
                .iter()
                .map(|class| constants.get_class(class))
                .collect::<Result<Vec<_>, _>>()?;
            attributes.push(constants.get_attribute(Exceptions(exceptions))?);
        }

        Ok(class_file::Method {
            access_flags: self.access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }
}
