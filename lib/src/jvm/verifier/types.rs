use crate::jvm::code::ConstantData;
use crate::jvm::{BaseType, FieldType};
use crate::util::Width;

/// Values tracked by the verifier
///
/// This is a coarser version of [this hierarchy][0]: every reference type (including `null` and
/// uninitialized objects) is just [`VerificationType::Reference`]. [`VerificationType::Top`] is
/// what two different types merge into, as well as the second slot of a `long` or `double` local.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se6/html/ClassFile.doc.html#9801
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum VerificationType {
    Integer,
    Float,
    Long,
    Double,
    Reference,

    /// Pushed by `jsr`, consumed by `ret`
    ReturnAddress,
    Top,
}

impl VerificationType {
    /// Least upper bound of two types
    pub fn merge(self, other: VerificationType) -> VerificationType {
        if self == other {
            self
        } else {
            VerificationType::Top
        }
    }

    /// Type of the value pushed by `ldc`
    pub fn of_constant(constant: &ConstantData) -> VerificationType {
        match constant {
            ConstantData::Integer(_) => VerificationType::Integer,
            ConstantData::Float(_) => VerificationType::Float,
            ConstantData::Long(_) => VerificationType::Long,
            ConstantData::Double(_) => VerificationType::Double,
            ConstantData::String(_) | ConstantData::Class(_) => VerificationType::Reference,
        }
    }
}

impl<C> From<&FieldType<C>> for VerificationType {
    fn from(field_type: &FieldType<C>) -> Self {
        match field_type {
            FieldType::Base(BaseType::Int)
            | FieldType::Base(BaseType::Char)
            | FieldType::Base(BaseType::Short)
            | FieldType::Base(BaseType::Byte)
            | FieldType::Base(BaseType::Boolean) => VerificationType::Integer,
            FieldType::Base(BaseType::Float) => VerificationType::Float,
            FieldType::Base(BaseType::Long) => VerificationType::Long,
            FieldType::Base(BaseType::Double) => VerificationType::Double,
            FieldType::Ref(_) => VerificationType::Reference,
        }
    }
}

impl Width for VerificationType {
    fn width(&self) -> usize {
        match self {
            VerificationType::Double | VerificationType::Long => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::BinaryName;

    #[test]
    fn merging() {
        use VerificationType::*;
        assert_eq!(Integer.merge(Integer), Integer);
        assert_eq!(Integer.merge(Float), Top);
        assert_eq!(Reference.merge(ReturnAddress), Top);
        assert_eq!(Top.merge(Long), Top);
    }

    #[test]
    fn from_field_types() {
        assert_eq!(
            VerificationType::from(&FieldType::<BinaryName>::boolean()),
            VerificationType::Integer
        );
        assert_eq!(
            VerificationType::from(&FieldType::object(BinaryName::STRING)),
            VerificationType::Reference
        );
        assert_eq!(VerificationType::from(&FieldType::<BinaryName>::long()).width(), 2);
    }
}
