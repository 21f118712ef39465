//! Swap the RSA key the client encrypts its login block with
//!
//! Both halves of the key are `static final BigInteger` fields initialized from decimal string
//! literals:
//!
//! ```text
//! new java/math/BigInteger
//! dup
//! ldc "1234..."
//! invokespecial java/math/BigInteger.<init>(Ljava/lang/String;)V
//! putstatic cb.n : Ljava/math/BigInteger;
//! ```
//!
//! A client still carrying the vendor key would be unusable, so every lookup failure here is
//! fatal.

use super::{ClassMap, Error, FieldLocation, PatchContext};
use crate::jvm::code::{Code, ConstantData, Insn, Instruction};
use crate::jvm::{BinaryName, FieldType, Name};
use log::info;

pub fn replace_key(classes: &mut ClassMap, ctx: &mut PatchContext) -> Result<(), Error> {
    let settings = ctx.settings;
    let targets = [
        (&settings.key_fields.modulus, &settings.public_key.modulus),
        (&settings.key_fields.exponent, &settings.public_key.exponent),
    ];
    for (location, value) in targets {
        let class = classes
            .get_mut(&location.class)
            .ok_or_else(|| Error::MissingClass(location.class.as_str().to_owned()))?;
        let code = class
            .class_initializer_mut()
            .and_then(|clinit| clinit.code.as_mut())
            .ok_or_else(|| Error::MissingClassInitializer(location.class.as_str().to_owned()))?;

        let replaced = replace_literal(code, location, value);
        if replaced == 0 {
            return Err(Error::MissingKeyField {
                class: location.class.as_str().to_owned(),
                field: location.field.as_str().to_owned(),
            });
        }
        info!(
            "Replaced {} literal(s) initializing {}.{}",
            replaced, location.class, location.field
        );
    }
    Ok(())
}

/// Replace the string literal each assignment of the field is built from
pub fn replace_literal(code: &mut Code, location: &FieldLocation, value: &str) -> usize {
    let big_integer = FieldType::object(BinaryName::BIGINTEGER);
    let mut replaced = 0;
    for id in code.instructions.ids() {
        let assigns_field = matches!(
            &code.instructions[id],
            Insn::Instruction(Instruction::PutStatic(field))
                if field.name == location.field && field.descriptor == big_integer
        );
        if !assigns_field {
            continue;
        }
        let literal = code
            .instructions
            .prev(id)
            .and_then(|prev| code.instructions.prev(prev))
            .filter(|literal| {
                matches!(
                    code.instructions[*literal],
                    Insn::Instruction(Instruction::Ldc(ConstantData::String(_)))
                )
            });
        if let Some(literal) = literal {
            let replacement = Instruction::Ldc(ConstantData::String(value.to_owned()));
            code.instructions.replace(literal, replacement);
            replaced += 1;
        }
    }
    replaced
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::Version;
    use crate::jvm::code::{BranchInstruction, FieldRef, InvokeType, MethodRef};
    use crate::jvm::model::{Class, Method};
    use crate::jvm::{
        ClassAccessFlags, MethodAccessFlags, MethodDescriptor, RefType, UnqualifiedName,
    };
    use crate::patch::{KeyFields, RsaPublicKey, Settings};

    fn assign(code: &mut Code, owner: &str, field: &str, literal: &str) {
        let big_integer = BinaryName::BIGINTEGER;
        code.instructions
            .push_back(Instruction::New(RefType::Object(big_integer.clone())));
        code.instructions.push_back(Instruction::Dup);
        code.instructions
            .push_back(Instruction::Ldc(ConstantData::String(literal.to_owned())));
        code.instructions.push_back(Instruction::Invoke(
            InvokeType::Special,
            MethodRef {
                owner: RefType::Object(big_integer.clone()),
                name: UnqualifiedName::INIT,
                descriptor: MethodDescriptor {
                    parameters: vec![FieldType::object(BinaryName::STRING)],
                    return_type: None,
                },
                is_interface: false,
            },
        ));
        code.instructions.push_back(Instruction::PutStatic(FieldRef {
            owner: BinaryName::from_str(owner).unwrap(),
            name: UnqualifiedName::from_str(field).unwrap(),
            descriptor: FieldType::object(big_integer),
        }));
    }

    fn key_class() -> Class {
        let mut class = Class::new(
            Version::JAVA1_4,
            ClassAccessFlags::SUPER,
            BinaryName::from_str("cb").unwrap(),
        );
        let mut clinit = Method::new(
            MethodAccessFlags::STATIC,
            UnqualifiedName::CLINIT,
            MethodDescriptor {
                parameters: vec![],
                return_type: None,
            },
        );
        let mut code = Code::new();
        assign(&mut code, "cb", "n", "9999");
        assign(&mut code, "cb", "e", "17");
        assign(&mut code, "cb", "other", "42");
        code.instructions.push_back(BranchInstruction::Return);
        clinit.code = Some(code);
        class.add_method(clinit).unwrap();
        class
    }

    fn settings(modulus: &str, exponent: &str) -> Settings {
        Settings::new(
            KeyFields::parse(modulus, exponent).unwrap(),
            RsaPublicKey::new("123456789".to_owned(), "65537".to_owned()).unwrap(),
        )
        .unwrap()
    }

    fn literals(class: &mut Class) -> Vec<String> {
        let code = class
            .class_initializer_mut()
            .unwrap()
            .code
            .as_ref()
            .unwrap();
        code.instructions
            .iter()
            .filter_map(|(_, insn)| match insn {
                Insn::Instruction(Instruction::Ldc(ConstantData::String(s))) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn replaces_both_halves() {
        let settings = settings("cb.n", "cb.e");
        let mut ctx = PatchContext::new(&settings);
        let mut classes = ClassMap::new();
        let class = key_class();
        classes.insert(class.name.clone(), class);

        replace_key(&mut classes, &mut ctx).unwrap();
        let class = classes.values_mut().next().unwrap();
        assert_eq!(literals(class), vec!["123456789", "65537", "42"]);
        assert!(ctx.warnings().is_empty());
    }

    #[test]
    fn lookups_are_fatal() {
        let mut classes = ClassMap::new();
        let class = key_class();
        classes.insert(class.name.clone(), class);

        let missing_class = settings("zz.n", "cb.e");
        let err = replace_key(&mut classes, &mut PatchContext::new(&missing_class)).unwrap_err();
        assert!(matches!(err, Error::MissingClass(name) if name == "zz"));

        let missing_field = settings("cb.n", "cb.d");
        let err = replace_key(&mut classes, &mut PatchContext::new(&missing_field)).unwrap_err();
        assert!(matches!(err, Error::MissingKeyField { field, .. } if field == "d"));

        let bare = Class::new(
            Version::JAVA1_4,
            ClassAccessFlags::SUPER,
            BinaryName::from_str("zz").unwrap(),
        );
        classes.insert(bare.name.clone(), bare);
        let err = replace_key(&mut classes, &mut PatchContext::new(&missing_class)).unwrap_err();
        assert!(matches!(err, Error::MissingClassInitializer(name) if name == "zz"));
    }
}
