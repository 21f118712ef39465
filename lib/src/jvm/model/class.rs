use crate::jvm::class_file::{self, ClassFile, ConstantsPool, Version};
use crate::jvm::model::{Field, Method};
use crate::jvm::verifier::verify_method;
use crate::jvm::{
    BinaryName, ClassAccessFlags, Error, Name, RenderDescriptor, Serialize, UnqualifiedName,
};
use log::debug;

/// Semantic representation of a class
#[derive(Clone, Debug)]
pub struct Class {
    /// Class file version, written back unchanged
    pub version: Version,
    pub access_flags: ClassAccessFlags,
    pub name: BinaryName,

    /// Only `java/lang/Object` has no superclass
    pub super_name: Option<BinaryName>,
    pub interfaces: Vec<BinaryName>,

    /// Fields
    ///
    /// Use [`Self::add_field`] to make sure no two fields share a name and descriptor
    pub fields: Vec<Field>,

    /// Methods
    ///
    /// Use [`Self::add_method`] to make sure no two methods share a name and descriptor
    pub methods: Vec<Method>,
}

impl Class {
    /// Create a new empty class extending `java/lang/Object`
    pub fn new(version: Version, access_flags: ClassAccessFlags, name: BinaryName) -> Class {
        Class {
            version,
            access_flags,
            name,
            super_name: Some(BinaryName::OBJECT),
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
        }
    }

    /// Parse a class from the bytes of a class file
    ///
    /// Only the `ConstantValue`, `Code`, and `Exceptions` attributes survive. Everything else
    /// (debug information, stack maps, signatures, annotations, ...) is dropped.
    pub fn decode(bytes: &[u8]) -> Result<Class, Error> {
        let class_file = ClassFile::decode(bytes)?;
        let pool = &class_file.constants;

        let name = pool.binary_name(class_file.this_class)?;
        let super_name = class_file
            .super_class
            .map(|index| pool.binary_name(index))
            .transpose()?;
        let interfaces = class_file
            .interfaces
            .iter()
            .map(|index| pool.binary_name(*index))
            .collect::<Result<_, _>>()?;
        let fields = class_file
            .fields
            .iter()
            .map(|field| Field::decode(pool, field))
            .collect::<Result<_, _>>()?;
        let methods = class_file
            .methods
            .iter()
            .map(|method| Method::decode(pool, method))
            .collect::<Result<_, _>>()?;
        for attribute in &class_file.attributes {
            debug!(
                "Dropping attribute {} of class {}",
                pool.utf8(attribute.name_index)?,
                name
            );
        }

        Ok(Class {
            version: class_file.version,
            access_flags: class_file.access_flags,
            name,
            super_name,
            interfaces,
            fields,
            methods,
        })
    }

    /// Lower the class into a class file, rebuilding the constant pool
    pub fn to_class_file(&self) -> Result<ClassFile, Error> {
        let mut constants = ConstantsPool::new();

        let this_class = constants.get_class(&self.name)?;
        let super_class = self
            .super_name
            .as_ref()
            .map(|name| constants.get_class(name))
            .transpose()?;
        let interfaces = self
            .interfaces
            .iter()
            .map(|interface| constants.get_class(interface))
            .collect::<Result<_, _>>()?;
        let fields: Vec<class_file::Field> = self
            .fields
            .iter()
            .map(|field| field.encode(&mut constants))
            .collect::<Result<_, Error>>()?;
        let methods: Vec<class_file::Method> = self
            .methods
            .iter()
            .map(|method| method.encode(&mut constants))
            .collect::<Result<_, Error>>()?;

        Ok(ClassFile {
            version: self.version,
            constants: constants.into_pool(),
            access_flags: self.access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes: vec![],
        })
    }

    /// Serialize the class into the bytes of a class file
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let class_file = self.to_class_file()?;
        let mut bytes = vec![];
        class_file.serialize(&mut bytes)?;
        Ok(bytes)
    }

    /// Type-check every method body, stopping at the first failure
    pub fn verify(&self) -> Result<(), Error> {
        for method in &self.methods {
            verify_method(self, method)?;
        }
        Ok(())
    }

    /// Add a method, rejecting it if one with the same name and descriptor already exists
    pub fn add_method(&mut self, method: Method) -> Result<(), Error> {
        let descriptor = method.descriptor.render();
        if self.find_method(method.name.as_str(), &descriptor).is_some() {
            return Err(Error::DuplicateMethod {
                name: method.name.as_str().to_owned(),
                descriptor,
            });
        }
        self.methods.push(method);
        Ok(())
    }

    /// Add a field, rejecting it if one with the same name and descriptor already exists
    pub fn add_field(&mut self, field: Field) -> Result<(), Error> {
        let duplicate = self
            .fields
            .iter()
            .any(|other| other.name == field.name && other.descriptor == field.descriptor);
        if duplicate {
            return Err(Error::DuplicateField {
                name: field.name.as_str().to_owned(),
                descriptor: field.descriptor.render(),
            });
        }
        self.fields.push(field);
        Ok(())
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&Method> {
        self.methods
            .iter()
            .find(|method| method.matches(name, descriptor))
    }

    pub fn find_method_mut(&mut self, name: &str, descriptor: &str) -> Option<&mut Method> {
        self.methods
            .iter_mut()
            .find(|method| method.matches(name, descriptor))
    }

    /// The static initializer, if there is one
    pub fn class_initializer_mut(&mut self) -> Option<&mut Method> {
        self.methods
            .iter_mut()
            .find(|method| method.name == UnqualifiedName::CLINIT)
    }
}
