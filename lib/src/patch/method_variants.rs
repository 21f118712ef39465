//! Turn method variants into forwarders to one canonical method
//!
//! The obfuscator clones methods with shuffled parameters and extra dummy parameters (whose only
//! purpose is to change the signature). The body of each variant is replaced with a call to the
//! original method, so only the original is left to patch and maintain.

use super::{ClassMap, MethodInfo, PatchContext};
use crate::jvm::code::{
    BranchInstruction, Code, ConstantData, Instruction, InvokeType, Label, MethodRef,
};
use crate::jvm::model::{Class, Method};
use crate::jvm::{BaseType, BinaryName, FieldType, RefType, RenderDescriptor};
use crate::util::Width;
use log::debug;

pub const PASS: &str = "MethodVariants";

/// Most parameters the original method can have (dummy aside) without an explicit mapping
const MAX_POSITIONAL_PARAMETERS: usize = 2;

pub fn synthesize_variants(classes: &mut ClassMap, ctx: &mut PatchContext) {
    let settings = ctx.settings;
    for (class_name, entries) in &settings.variants {
        let class = match classes.get_mut(class_name) {
            Some(class) => class,
            None => {
                ctx.warn(PASS, format!("no class {} to map variants in", class_name));
                continue;
            }
        };
        for entry in entries {
            for variant in &entry.variants {
                match forward_variant(class, &entry.method, variant) {
                    Ok(()) => debug!(
                        "Forwarded {}.{}{} to {} ({})",
                        class.name,
                        variant.name,
                        variant.descriptor.render(),
                        entry.method.name,
                        entry.name
                    ),
                    Err(problem) => ctx.warn(PASS, problem),
                }
            }
        }
    }
}

/// Replace the body of `variant` with a call to `original`
///
/// On failure, nothing changes and the reason is returned.
pub fn forward_variant(
    class: &mut Class,
    original: &MethodInfo,
    variant: &MethodInfo,
) -> Result<(), String> {
    let owner = class.name.clone();
    let describe =
        |info: &MethodInfo| format!("{}.{}{}", owner, info.name, info.descriptor.render());

    let original_method = find(class, original)
        .ok_or_else(|| format!("couldn't find original method {}", describe(original)))?;
    if original_method.is_static() {
        return Err(format!("original method {} is static", describe(original)));
    }
    let variant_method = find(class, variant)
        .ok_or_else(|| format!("couldn't find variant method {}", describe(variant)))?;
    if variant_method.is_static() || variant_method.code.is_none() {
        return Err(format!(
            "variant method {} is static or has no body",
            describe(variant)
        ));
    }
    if variant.descriptor.return_type != original.descriptor.return_type {
        return Err(format!(
            "variant {} does not return the same type as {}",
            describe(variant),
            describe(original)
        ));
    }

    let code = forwarder(&owner, original, variant).map_err(|problem| {
        format!(
            "couldn't forward {} to {}: {}",
            describe(variant),
            describe(original),
            problem
        )
    })?;

    let variant_method = class
        .methods
        .iter_mut()
        .find(|method| method.name == variant.name && method.descriptor == variant.descriptor)
        .ok_or_else(|| format!("couldn't find variant method {}", describe(variant)))?;
    variant_method.code = Some(code);
    Ok(())
}

fn find<'c>(class: &'c Class, info: &MethodInfo) -> Option<&'c Method> {
    class
        .methods
        .iter()
        .find(|method| method.name == info.name && method.descriptor == info.descriptor)
}

/// Body of a variant: `this`, the arguments in the original's order, the call, the return
fn forwarder(
    owner: &BinaryName,
    original: &MethodInfo,
    variant: &MethodInfo,
) -> Result<Code, String> {
    let original_parameters = &original.descriptor.parameters;
    let variant_parameters = &variant.descriptor.parameters;

    // Local slot of each variant parameter (`this` is in slot 0)
    let mut slots = Vec::with_capacity(variant_parameters.len());
    let mut next_slot = 1;
    for parameter in variant_parameters {
        slots.push(next_slot);
        next_slot += parameter.width();
    }

    let dummies = match original.dummy_index {
        Some(index) if index < original_parameters.len() => 1,
        _ => 0,
    };
    let real_parameters = original_parameters.len() - dummies;
    if variant.arg_mapping.is_none() && real_parameters > MAX_POSITIONAL_PARAMETERS {
        return Err(format!(
            "{} parameters cannot be matched up by position, an argument mapping is needed",
            real_parameters
        ));
    }

    let mut code = Code::new();
    code.instructions.push_back(Instruction::ALoad(0));
    let mut positional = 0;
    for (index, parameter) in original_parameters.iter().enumerate() {
        if original.dummy_index == Some(index) {
            let value = original.dummy_value.unwrap_or(0);
            code.instructions.push_back(push_constant(parameter, value)?);
            continue;
        }

        let source = match &variant.arg_mapping {
            Some(mapping) => *mapping
                .get(index)
                .ok_or_else(|| format!("no mapping for parameter {}", index))?,
            None => {
                if variant.dummy_index == Some(positional) {
                    positional += 1;
                }
                positional += 1;
                positional - 1
            }
        };
        let (slot, typ) = slots
            .get(source)
            .zip(variant_parameters.get(source))
            .ok_or_else(|| format!("variant has no parameter {}", source))?;
        let slot = u16::try_from(*slot).map_err(|_| String::from("too many parameters"))?;
        code.instructions.push_back(load(typ, slot));
    }

    code.instructions.push_back(Instruction::Invoke(
        InvokeType::Virtual,
        MethodRef {
            owner: RefType::Object(owner.clone()),
            name: original.name.clone(),
            descriptor: original.descriptor.clone(),
            is_interface: false,
        },
    ));
    code.instructions.push_back(return_of(&original.descriptor.return_type));
    Ok(code)
}

/// Shortest instruction pushing the dummy value as the parameter type expects it
fn push_constant(parameter: &FieldType<BinaryName>, value: i64) -> Result<Instruction, String> {
    match parameter {
        FieldType::Base(base) if base.is_int_like() => i32::try_from(value)
            .map(Instruction::push_int)
            .map_err(|_| format!("dummy value {} does not fit in an int", value)),
        FieldType::Base(BaseType::Long) => Ok(match value {
            0 => Instruction::LConst0,
            1 => Instruction::LConst1,
            _ => Instruction::Ldc(ConstantData::Long(value)),
        }),
        other => Err(format!(
            "dummy parameter of type {} is not supported",
            other.render()
        )),
    }
}

fn load(typ: &FieldType<BinaryName>, slot: u16) -> Instruction {
    match typ {
        FieldType::Base(BaseType::Long) => Instruction::LLoad(slot),
        FieldType::Base(BaseType::Float) => Instruction::FLoad(slot),
        FieldType::Base(BaseType::Double) => Instruction::DLoad(slot),
        FieldType::Base(_) => Instruction::ILoad(slot),
        FieldType::Ref(_) => Instruction::ALoad(slot),
    }
}

fn return_of(typ: &Option<FieldType<BinaryName>>) -> BranchInstruction<Label> {
    match typ {
        None => BranchInstruction::Return,
        Some(FieldType::Base(BaseType::Long)) => BranchInstruction::LReturn,
        Some(FieldType::Base(BaseType::Float)) => BranchInstruction::FReturn,
        Some(FieldType::Base(BaseType::Double)) => BranchInstruction::DReturn,
        Some(FieldType::Base(_)) => BranchInstruction::IReturn,
        Some(FieldType::Ref(_)) => BranchInstruction::AReturn,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::Version;
    use crate::jvm::code::Insn;
    use crate::jvm::{ClassAccessFlags, MethodAccessFlags, Name, UnqualifiedName};
    use crate::patch::{KeyFields, MethodVariants, RsaPublicKey, Settings};

    fn method(name: &str, descriptor: &str) -> Method {
        let info = MethodInfo::new(name, descriptor).unwrap();
        let mut method = Method::new(MethodAccessFlags::PUBLIC, info.name, info.descriptor);
        let mut code = Code::new();
        code.instructions.push_back(Instruction::Nop);
        if method.descriptor.return_type.is_some() {
            code.instructions.push_back(Instruction::IConst0);
        }
        code.instructions.push_back(return_of(&method.descriptor.return_type));
        method.code = Some(code);
        method
    }

    fn packet_class(methods: &[(&str, &str)]) -> Class {
        let mut class = Class::new(
            Version::JAVA1_4,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            BinaryName::from_str("pk").unwrap(),
        );
        for (name, descriptor) in methods {
            class.add_method(method(name, descriptor)).unwrap();
        }
        class
    }

    fn body(class: &Class, name: &str, descriptor: &str) -> Vec<Insn> {
        class
            .find_method(name, descriptor)
            .unwrap()
            .code
            .as_ref()
            .unwrap()
            .instructions
            .iter()
            .map(|(_, insn)| insn.clone())
            .collect()
    }

    fn invoke(name: &str, descriptor: &str) -> Insn {
        let info = MethodInfo::new(name, descriptor).unwrap();
        Instruction::Invoke(
            InvokeType::Virtual,
            MethodRef {
                owner: RefType::Object(BinaryName::from_str("pk").unwrap()),
                name: info.name,
                descriptor: info.descriptor,
                is_interface: false,
            },
        )
        .into()
    }

    #[test]
    fn forwards_with_dummy() {
        let mut class = packet_class(&[("f", "(II)V"), ("g", "(I)V")]);
        let original = MethodInfo::new("f", "(II)V").unwrap().with_dummy(1, 0);
        let variant = MethodInfo::new("g", "(I)V").unwrap();
        forward_variant(&mut class, &original, &variant).unwrap();

        assert_eq!(
            body(&class, "g", "(I)V"),
            vec![
                Instruction::ALoad(0).into(),
                Instruction::ILoad(1).into(),
                Instruction::IConst0.into(),
                invoke("f", "(II)V"),
                BranchInstruction::Return.into(),
            ]
        );
        class.verify().unwrap();
    }

    #[test]
    fn skips_variant_dummy_and_wide_slots() {
        let mut class = packet_class(&[("f", "(JI)I"), ("h", "(BJI)I")]);
        let original = MethodInfo::new("f", "(JI)I").unwrap();
        let variant = MethodInfo::new("h", "(BJI)I").unwrap().with_dummy(0, 12);
        forward_variant(&mut class, &original, &variant).unwrap();

        assert_eq!(
            body(&class, "h", "(BJI)I"),
            vec![
                Instruction::ALoad(0).into(),
                Instruction::LLoad(2).into(),
                Instruction::ILoad(4).into(),
                invoke("f", "(JI)I"),
                BranchInstruction::IReturn.into(),
            ]
        );
        class.verify().unwrap();
    }

    #[test]
    fn explicit_mapping_and_long_dummy() {
        let mut class = packet_class(&[("f", "(IIJI)V"), ("k", "(III)V")]);
        let original = MethodInfo::new("f", "(IIJI)V").unwrap().with_dummy(2, 300);
        let variant = MethodInfo::new("k", "(III)V")
            .unwrap()
            .with_arg_mapping(vec![2, 0, 9, 1]);
        forward_variant(&mut class, &original, &variant).unwrap();

        assert_eq!(
            body(&class, "k", "(III)V"),
            vec![
                Instruction::ALoad(0).into(),
                Instruction::ILoad(3).into(),
                Instruction::ILoad(1).into(),
                Instruction::Ldc(ConstantData::Long(300)).into(),
                Instruction::ILoad(2).into(),
                invoke("f", "(IIJI)V"),
                BranchInstruction::Return.into(),
            ]
        );
    }

    #[test]
    fn mapping_on_the_original_is_ignored() {
        let mut class = packet_class(&[("f", "(III)V"), ("k", "(III)V")]);
        let before = body(&class, "k", "(III)V");
        let original = MethodInfo::new("f", "(III)V")
            .unwrap()
            .with_arg_mapping(vec![2, 1, 0]);
        let variant = MethodInfo::new("k", "(III)V").unwrap();
        let problem = forward_variant(&mut class, &original, &variant).unwrap_err();
        assert!(problem.contains("argument mapping"));
        assert_eq!(body(&class, "k", "(III)V"), before);
    }

    #[test]
    fn variant_mapping_with_dummy_on_the_original() {
        let mut settings = Settings::new(
            KeyFields::parse("a.b", "a.c").unwrap(),
            RsaPublicKey::new("7".to_owned(), "3".to_owned()).unwrap(),
        )
        .unwrap();
        settings.variants.insert(
            BinaryName::from_str("pk").unwrap(),
            vec![MethodVariants {
                name: String::from("writeTriple"),
                method: MethodInfo::new("f", "(IIIB)V").unwrap().with_dummy(3, -7),
                variants: vec![MethodInfo::new("k", "(IIIB)V")
                    .unwrap()
                    .with_arg_mapping(vec![2, 1, 0])],
            }],
        );

        let mut classes = ClassMap::new();
        let class = packet_class(&[("f", "(IIIB)V"), ("k", "(IIIB)V")]);
        classes.insert(class.name.clone(), class);

        let mut ctx = PatchContext::new(&settings);
        synthesize_variants(&mut classes, &mut ctx);
        assert!(ctx.into_warnings().is_empty());

        let class = &classes[&BinaryName::from_str("pk").unwrap()];
        assert_eq!(
            body(class, "k", "(IIIB)V"),
            vec![
                Instruction::ALoad(0).into(),
                Instruction::ILoad(3).into(),
                Instruction::ILoad(2).into(),
                Instruction::ILoad(1).into(),
                Instruction::BiPush(-7).into(),
                invoke("f", "(IIIB)V"),
                BranchInstruction::Return.into(),
            ]
        );
        class.verify().unwrap();
    }

    #[test]
    fn positional_needs_at_most_two_parameters() {
        let mut class = packet_class(&[("f", "(IIII)V"), ("k", "(IIII)V")]);
        let before = body(&class, "k", "(IIII)V");

        // Three real parameters plus a dummy
        let original = MethodInfo::new("f", "(IIII)V").unwrap().with_dummy(3, 1);
        let variant = MethodInfo::new("k", "(IIII)V").unwrap();
        let problem = forward_variant(&mut class, &original, &variant).unwrap_err();
        assert!(problem.contains("argument mapping"));
        assert_eq!(body(&class, "k", "(IIII)V"), before);
    }

    #[test]
    fn missing_methods_are_warnings() {
        let mut settings = Settings::new(
            KeyFields::parse("a.b", "a.c").unwrap(),
            RsaPublicKey::new("7".to_owned(), "3".to_owned()).unwrap(),
        )
        .unwrap();
        let entry = MethodVariants {
            name: String::from("write"),
            method: MethodInfo::new("f", "(II)V").unwrap().with_dummy(1, 0),
            variants: vec![
                MethodInfo::new("g", "(I)V").unwrap(),
                MethodInfo::new("missing", "(I)V").unwrap(),
            ],
        };
        settings
            .variants
            .insert(BinaryName::from_str("pk").unwrap(), vec![entry.clone()]);
        settings
            .variants
            .insert(BinaryName::from_str("nope").unwrap(), vec![entry]);

        let mut classes = ClassMap::new();
        let class = packet_class(&[("f", "(II)V"), ("g", "(I)V")]);
        classes.insert(class.name.clone(), class);

        let mut ctx = PatchContext::new(&settings);
        synthesize_variants(&mut classes, &mut ctx);
        let warnings = ctx.into_warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].message.contains("nope"));
        assert!(warnings[1].message.contains("pk.missing(I)V"));
        assert!(warnings.iter().all(|warning| warning.pass == PASS));

        let class = &classes[&BinaryName::from_str("pk").unwrap()];
        assert_eq!(body(class, "g", "(I)V").len(), 5);
        assert_eq!(
            class.find_method("g", "(I)V").unwrap().name,
            UnqualifiedName::from_str("g").unwrap()
        );
    }
}
