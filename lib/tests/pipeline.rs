use classpatch::jvm::class_file::Version;
use classpatch::jvm::code::{
    BranchInstruction, Code, ConstantData, FieldRef, Insn, Instruction, InvokeType, MethodRef,
    OrdComparison, ShiftType,
};
use classpatch::jvm::model::{Class, Field, Method};
use classpatch::jvm::{
    BaseType, BinaryName, ClassAccessFlags, FieldAccessFlags, FieldType, MethodAccessFlags,
    MethodDescriptor, Name, RefType, UnqualifiedName,
};
use classpatch::patch::{KeyFields, MethodInfo, MethodVariants, Patcher, RsaPublicKey, Settings};

const MODULUS: &str = "1230186684530117755130494958384962720772853569595334792197322452151726400507263657518745202199786469389956474942774063845925192557326303453731548268507917026122142913461670429214311602221240479274737794080665351419597459856902143413";
const EXPONENT: &str = "65537";

fn name<N: Name>(name: &str) -> N {
    N::from_str(name).unwrap()
}

fn descriptor(
    parameters: Vec<FieldType<BinaryName>>,
    return_type: Option<FieldType<BinaryName>>,
) -> MethodDescriptor<BinaryName> {
    MethodDescriptor {
        parameters,
        return_type,
    }
}

fn new_class(class_name: &str) -> Class {
    Class::new(
        Version::JAVA1_4,
        ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
        name(class_name),
    )
}

fn sentinel() -> FieldRef {
    FieldRef {
        owner: name("client"),
        name: name("ob"),
        descriptor: FieldType::boolean(),
    }
}

/// `client`, holding an opaque predicate, dead arithmetic, an obfuscated shift, and a mouse
/// handler
fn client() -> Class {
    let mut class = new_class("client");
    class
        .add_field(Field {
            access_flags: FieldAccessFlags::STATIC,
            name: name("ob"),
            descriptor: FieldType::boolean(),
            constant_value: None,
        })
        .unwrap();

    // static int update(int x)
    let mut update = Method::new(
        MethodAccessFlags::STATIC,
        name("update"),
        descriptor(vec![FieldType::int()], Some(FieldType::int())),
    );
    let mut code = Code::new();
    let done = code.instructions.new_label();
    let list = &mut code.instructions;
    list.push_back(Instruction::GetStatic(sentinel()));
    list.push_back(Instruction::IStore(3));
    list.push_back(Instruction::ILoad(0));
    list.push_back(Instruction::BiPush(-49));
    list.push_back(Instruction::ISub);
    list.push_back(Instruction::BiPush(42));
    list.push_back(Instruction::IDiv);
    list.push_back(Instruction::IStore(2));
    list.push_back(Instruction::ILoad(0));
    list.push_back(Instruction::BiPush(37));
    list.push_back(Instruction::ISh(ShiftType::Left));
    list.push_back(Instruction::IStore(1));
    list.push_back(Instruction::ILoad(3));
    list.push_back(BranchInstruction::If(OrdComparison::EQ, done));
    list.push_back(Instruction::IConst0);
    list.push_back(BranchInstruction::IReturn);
    list.push_back(Insn::Label(done));
    list.push_back(Instruction::ILoad(1));
    list.push_back(BranchInstruction::IReturn);
    update.code = Some(code);
    class.add_method(update).unwrap();

    // void mousePressed(MouseEvent event)
    let mut mouse_pressed = Method::new(
        MethodAccessFlags::PUBLIC,
        UnqualifiedName::MOUSEPRESSED,
        descriptor(vec![FieldType::object(BinaryName::MOUSEEVENT)], None),
    );
    let mut code = Code::new();
    let skip = code.instructions.new_label();
    code.instructions.push_back(Instruction::ALoad(1));
    code.instructions.push_back(Instruction::Invoke(
        InvokeType::Virtual,
        MethodRef {
            owner: RefType::Object(BinaryName::MOUSEEVENT),
            name: UnqualifiedName::ISMETADOWN,
            descriptor: descriptor(vec![], Some(FieldType::boolean())),
            is_interface: false,
        },
    ));
    code.instructions.push_back(BranchInstruction::If(OrdComparison::EQ, skip));
    code.instructions.push_back(Instruction::Nop);
    code.instructions.push_back(Insn::Label(skip));
    code.instructions.push_back(BranchInstruction::Return);
    mouse_pressed.code = Some(code);
    class.add_method(mouse_pressed).unwrap();

    class
}

/// `cb`, holding the RSA key
fn key_holder() -> Class {
    let mut class = new_class("cb");
    let big_integer = FieldType::object(BinaryName::BIGINTEGER);
    let mut code = Code::new();
    for (field, literal) in [("n", "9999991"), ("e", "17")] {
        class
            .add_field(Field {
                access_flags: FieldAccessFlags::STATIC | FieldAccessFlags::FINAL,
                name: name(field),
                descriptor: big_integer.clone(),
                constant_value: None,
            })
            .unwrap();

        let list = &mut code.instructions;
        list.push_back(Instruction::New(RefType::Object(BinaryName::BIGINTEGER)));
        list.push_back(Instruction::Dup);
        list.push_back(Instruction::Ldc(ConstantData::String(literal.to_owned())));
        list.push_back(Instruction::Invoke(
            InvokeType::Special,
            MethodRef {
                owner: RefType::Object(BinaryName::BIGINTEGER),
                name: UnqualifiedName::INIT,
                descriptor: descriptor(vec![FieldType::object(BinaryName::STRING)], None),
                is_interface: false,
            },
        ));
        list.push_back(Instruction::PutStatic(FieldRef {
            owner: name("cb"),
            name: name(field),
            descriptor: big_integer.clone(),
        }));
    }
    code.instructions.push_back(BranchInstruction::Return);

    let mut clinit = Method::new(
        MethodAccessFlags::STATIC,
        UnqualifiedName::CLINIT,
        descriptor(vec![], None),
    );
    clinit.code = Some(code);
    class.add_method(clinit).unwrap();
    class
}

/// `pk`, with `g(I)V` being a variant of `f(II)V`
fn packets() -> Class {
    let mut class = new_class("pk");
    for (method_name, parameters) in [("f", 2), ("g", 1)] {
        let mut method = Method::new(
            MethodAccessFlags::PUBLIC,
            name(method_name),
            descriptor(vec![FieldType::int(); parameters], None),
        );
        let mut code = Code::new();
        code.instructions.push_back(Instruction::ILoad(1));
        code.instructions.push_back(Instruction::Pop);
        code.instructions.push_back(BranchInstruction::Return);
        method.code = Some(code);
        class.add_method(method).unwrap();
    }
    class
}

fn settings() -> Settings {
    let mut settings = Settings::new(
        KeyFields::parse("cb.n", "cb.e").unwrap(),
        RsaPublicKey::new(MODULUS.to_owned(), EXPONENT.to_owned()).unwrap(),
    )
    .unwrap();
    settings.variants.insert(
        name("pk"),
        vec![MethodVariants {
            name: String::from("write"),
            method: MethodInfo::new("f", "(II)V").unwrap().with_dummy(1, 0),
            variants: vec![MethodInfo::new("g", "(I)V").unwrap()],
        }],
    );
    settings.add_mapping("cb", "rsa/Key").unwrap();
    settings
}

fn body(class: &Class, method: &str, descriptor: &str) -> Vec<Insn> {
    class
        .find_method(method, descriptor)
        .unwrap()
        .code
        .as_ref()
        .unwrap()
        .instructions
        .iter()
        .map(|(_, insn)| insn.clone())
        .collect()
}

#[test]
fn end_to_end() {
    let entries = vec![
        client().encode().unwrap(),
        key_holder().encode().unwrap(),
        packets().encode().unwrap(),
    ];
    let output = Patcher::new(settings()).patch(entries).unwrap();
    assert!(output.warnings.is_empty(), "{:?}", output.warnings);

    let names: Vec<_> = output.classes.iter().map(|c| c.entry_name()).collect();
    assert_eq!(names, vec!["rsa/Key.class", "client.class", "pk.class"]);
    let decoded: Vec<Class> = output
        .classes
        .iter()
        .map(|class| Class::decode(&class.bytes).unwrap())
        .collect();
    for class in &decoded {
        class.verify().unwrap();
    }

    // No sentinel loads, no dead stores, shift masked
    let update = body(&decoded[1], "update", "(I)I");
    assert!(!update.iter().any(|insn| matches!(
        insn,
        Insn::Instruction(Instruction::GetStatic(field)) if field.name.as_str() == "ob"
    )));
    assert!(!update.iter().any(|insn| matches!(
        insn,
        Insn::Instruction(Instruction::IStore(2)) | Insn::Instruction(Instruction::IStore(3))
    )));
    assert!(update
        .iter()
        .filter_map(Insn::as_instruction)
        .any(|instruction| instruction.int_constant() == Some(5)));
    assert!(update
        .iter()
        .any(|insn| matches!(insn, Insn::Branch(BranchInstruction::Goto(_)))));

    // Right clicks
    let mouse_pressed = body(&decoded[1], "mousePressed", "(Ljava/awt/event/MouseEvent;)V");
    assert!(mouse_pressed.iter().any(|insn| matches!(
        insn,
        Insn::Instruction(Instruction::Invoke(InvokeType::Static, method))
            if method.name == UnqualifiedName::ISRIGHTMOUSEBUTTON
    )));

    // Key
    let clinit = body(&decoded[0], "<clinit>", "()V");
    let literals: Vec<_> = clinit
        .iter()
        .filter_map(|insn| match insn {
            Insn::Instruction(Instruction::Ldc(ConstantData::String(s))) => Some(s.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(literals, vec![MODULUS, EXPONENT]);
    assert!(clinit.iter().any(|insn| matches!(
        insn,
        Insn::Instruction(Instruction::PutStatic(field)) if field.owner.as_str() == "rsa/Key"
    )));

    // Variant
    let g = body(&decoded[2], "g", "(I)V");
    assert_eq!(g.len(), 5);
    assert_eq!(g[0], Instruction::ALoad(0).into());
    assert_eq!(g[1], Instruction::ILoad(1).into());
    assert_eq!(g[2], Instruction::IConst0.into());
}

#[test]
fn verification_failures_abort() {
    let mut broken = packets();
    let code = broken.methods[0].code.as_mut().unwrap();
    code.instructions.clear();
    code.instructions.push_back(Instruction::FConst0);
    code.instructions.push_back(Instruction::IStore(1));
    code.instructions.push_back(BranchInstruction::Return);

    let entries = vec![
        client().encode().unwrap(),
        key_holder().encode().unwrap(),
        broken.encode().unwrap(),
    ];
    let err = Patcher::new(settings()).patch(entries).unwrap_err();
    assert!(err
        .to_string()
        .starts_with("Bytecode correctness failed: expected Integer, found Float at pk.f(II)V"));

    let mut lenient = settings();
    lenient.verify = false;
    let entries = vec![
        client().encode().unwrap(),
        key_holder().encode().unwrap(),
        broken.encode().unwrap(),
    ];
    assert!(Patcher::new(lenient).patch(entries).is_ok());
}

#[test]
fn variant_with_argument_mapping() {
    let mut packets = packets();
    // `k(BIII)V` has its dummy first, `t(IIIB)V` last
    let byte = FieldType::Base(BaseType::Byte);
    let int = FieldType::int();
    let methods = [
        ("t", vec![int.clone(), int.clone(), int.clone(), byte.clone()]),
        ("k", vec![byte, int.clone(), int.clone(), int]),
    ];
    for (method_name, parameters) in methods {
        let mut method = Method::new(
            MethodAccessFlags::PUBLIC,
            name(method_name),
            descriptor(parameters, None),
        );
        let mut code = Code::new();
        code.instructions.push_back(BranchInstruction::Return);
        method.code = Some(code);
        packets.add_method(method).unwrap();
    }

    let mut settings = settings();
    settings.variants.insert(
        name("pk"),
        vec![MethodVariants {
            name: String::from("writeTriple"),
            method: MethodInfo::new("t", "(IIIB)V").unwrap().with_dummy(3, 1),
            variants: vec![MethodInfo::new("k", "(BIII)V")
                .unwrap()
                .with_arg_mapping(vec![3, 1, 2])],
        }],
    );

    let entries = vec![
        client().encode().unwrap(),
        key_holder().encode().unwrap(),
        packets.encode().unwrap(),
    ];
    let output = Patcher::new(settings).patch(entries).unwrap();
    assert!(output.warnings.is_empty(), "{:?}", output.warnings);

    let decoded = Class::decode(&output.classes[2].bytes).unwrap();
    let k = body(&decoded, "k", "(BIII)V");
    let expected: Vec<Insn> = vec![
        Instruction::ALoad(0).into(),
        Instruction::ILoad(4).into(),
        Instruction::ILoad(2).into(),
        Instruction::ILoad(3).into(),
        Instruction::IConst1.into(),
    ];
    assert_eq!(k[..5], expected[..]);
    assert!(matches!(
        &k[5],
        Insn::Instruction(Instruction::Invoke(InvokeType::Virtual, method))
            if method.name.as_str() == "t"
    ));
    assert_eq!(k[6], BranchInstruction::Return.into());
}
