//! Lower an editable [`Code`] back into a `Code` attribute

use super::{
    BranchInstruction, Code, CompareMode, ConstantData, EqComparison, Insn, Instruction,
    InvokeType, Label, OrdComparison, ShiftType,
};
use crate::jvm::class_file::{self, ConstantIndex, ConstantsPool};
use crate::jvm::{BaseType, Error, Serialize};
use byteorder::WriteBytesExt;
use log::debug;
use std::collections::HashMap;
use std::io::Result as IoResult;

/// Entry of the method body, with everything but branch offsets already resolved
enum Lowered<'a> {
    Bytes(Vec<u8>),
    Label(Label),
    Branch(&'a BranchInstruction<Label>),
}

/// Encode the instructions and handlers of a method
///
/// Constants referenced by instructions are interned into `constants`. Jumps are emitted in their
/// short form unless the offset doesn't fit in 16 bits: `goto`/`jsr` then become `goto_w`/`jsr_w`
/// and conditional branches become an inverted branch over a `goto_w`. `max_stack` and
/// `max_locals` are computed from the instructions.
pub fn encode_code(
    code: &Code,
    parameter_slots: usize,
    constants: &mut ConstantsPool,
) -> Result<class_file::Code, Error> {
    let max_stack = code.max_stack()?;
    let max_locals = code.max_locals(parameter_slots);
    let max_stack =
        u16::try_from(max_stack).map_err(|_| Error::MethodCodeMaxStackOverflow(max_stack))?;
    let max_locals =
        u16::try_from(max_locals).map_err(|_| Error::MethodCodeMaxLocalsOverflow(max_locals))?;

    let mut lowered: Vec<Lowered> = vec![];
    for (_, insn) in code.instructions.iter() {
        lowered.push(match insn {
            Insn::Label(label) => Lowered::Label(*label),
            Insn::Instruction(instruction) => {
                let mut bytes = vec![];
                encode_instruction(instruction, constants, &mut bytes)?;
                Lowered::Bytes(bytes)
            }
            Insn::Branch(branch) => Lowered::Branch(branch),
        });
    }

    // Widen jumps until every offset fits
    let mut wide: Vec<bool> = vec![false; lowered.len()];
    let (offsets, labels) = loop {
        let (offsets, labels) = layout(&lowered, &wide)?;
        let mut changed = false;
        for (idx, entry) in lowered.iter().enumerate() {
            if let Lowered::Branch(branch) = entry {
                if wide[idx] || !has_short_form(branch) {
                    continue;
                }
                for target in branch.jump_targets() {
                    let target = label_offset(&labels, target)?;
                    if i16::try_from(target - offsets[idx]).is_err() {
                        wide[idx] = true;
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break (offsets, labels);
        }
    };

    let mut code_array: Vec<u8> = vec![];
    for (idx, entry) in lowered.iter().enumerate() {
        match entry {
            Lowered::Bytes(bytes) => code_array.extend_from_slice(bytes),
            Lowered::Label(_) => (),
            Lowered::Branch(branch) => {
                let offset = offsets[idx];
                let relative = |label: &Label| -> Result<i64, Error> {
                    Ok(label_offset(&labels, *label)? - offset)
                };
                let branch = branch.map_labels(relative)?;
                encode_branch(&branch, offset, wide[idx], &mut code_array)?;
            }
        }
    }
    if code_array.len() > u16::MAX as usize {
        return Err(Error::MethodCodeOverflow(code_array.len()));
    }

    let mut exception_table = vec![];
    for handler in &code.handlers {
        let start_pc = label_offset(&labels, handler.start)? as u16;
        let end_pc = label_offset(&labels, handler.end)? as u16;
        let handler_pc = label_offset(&labels, handler.handler)? as u16;
        if start_pc >= end_pc {
            debug!(
                "Dropping handler {:?}-{:?} which no longer covers any code",
                handler.start, handler.end
            );
            continue;
        }
        let catch_type = match &handler.catch_type {
            None => ConstantIndex(0),
            Some(class) => constants.get_class(class)?.0,
        };
        exception_table.push(class_file::ExceptionHandler {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        });
    }

    Ok(class_file::Code {
        max_stack,
        max_locals,
        code_array,
        exception_table,
        attributes: vec![],
    })
}

fn label_offset(labels: &HashMap<Label, i64>, label: Label) -> Result<i64, Error> {
    labels.get(&label).copied().ok_or(Error::UnplacedLabel(label))
}

/// Byte offset of every entry and every label, given which jumps are wide
fn layout(
    lowered: &[Lowered],
    wide: &[bool],
) -> Result<(Vec<i64>, HashMap<Label, i64>), Error> {
    let mut offsets = Vec::with_capacity(lowered.len());
    let mut labels = HashMap::new();
    let mut offset: i64 = 0;
    for (entry, wide) in lowered.iter().zip(wide) {
        offsets.push(offset);
        offset += match entry {
            Lowered::Bytes(bytes) => bytes.len() as i64,
            Lowered::Label(label) => {
                if labels.insert(*label, offset).is_some() {
                    return Err(Error::DuplicateLabel(*label));
                }
                0
            }
            Lowered::Branch(branch) => branch_width(branch, offset, *wide),
        };
    }
    Ok((offsets, labels))
}

/// Does the branch have a form with a 16-bit offset?
fn has_short_form<Lbl>(branch: &BranchInstruction<Lbl>) -> bool {
    matches!(
        branch,
        BranchInstruction::If(_, _)
            | BranchInstruction::IfICmp(_, _)
            | BranchInstruction::IfACmp(_, _)
            | BranchInstruction::IfNull(_, _)
            | BranchInstruction::Goto(_)
            | BranchInstruction::Jsr(_)
    )
}

/// Zero bytes after a switch opcode at `offset`, aligning its operands to four bytes
fn switch_padding(offset: i64) -> i64 {
    (4 - (offset + 1) % 4) % 4
}

fn branch_width<Lbl>(branch: &BranchInstruction<Lbl>, offset: i64, wide: bool) -> i64 {
    match branch {
        BranchInstruction::If(_, _)
        | BranchInstruction::IfICmp(_, _)
        | BranchInstruction::IfACmp(_, _)
        | BranchInstruction::IfNull(_, _) => {
            if wide {
                8
            } else {
                3
            }
        }
        BranchInstruction::Goto(_) | BranchInstruction::Jsr(_) => {
            if wide {
                5
            } else {
                3
            }
        }
        BranchInstruction::TableSwitch { targets, .. } => {
            1 + switch_padding(offset) + 12 + 4 * targets.len() as i64
        }
        BranchInstruction::LookupSwitch { targets, .. } => {
            1 + switch_padding(offset) + 8 + 8 * targets.len() as i64
        }
        _ => 1,
    }
}

/// Encode a branch whose targets are relative to `offset`
fn encode_branch<W: WriteBytesExt>(
    branch: &BranchInstruction<i64>,
    offset: i64,
    wide: bool,
    writer: &mut W,
) -> IoResult<()> {
    fn ord_opcode(comp: OrdComparison, base: u8) -> u8 {
        base + match comp {
            OrdComparison::EQ => 0,
            OrdComparison::NE => 1,
            OrdComparison::LT => 2,
            OrdComparison::GE => 3,
            OrdComparison::GT => 4,
            OrdComparison::LE => 5,
        }
    }
    fn eq_opcode(comp: EqComparison, base: u8) -> u8 {
        match comp {
            EqComparison::EQ => base,
            EqComparison::NE => base + 1,
        }
    }

    /* A conditional branch too far for 16 bits becomes
     *
     *       if<!cond> skip
     *       goto_w target
     *   skip:
     */
    let conditional = match branch {
        BranchInstruction::If(comp, lbl) => Some((*comp, 0x99u8, *lbl)),
        BranchInstruction::IfICmp(comp, lbl) => Some((*comp, 0x9f, *lbl)),
        _ => None,
    };
    if let Some((comp, base, lbl)) = conditional {
        if wide {
            ord_opcode(!comp, base).serialize(writer)?;
            8i16.serialize(writer)?;
            0xc8u8.serialize(writer)?;
            return ((lbl - 3) as i32).serialize(writer);
        }
        ord_opcode(comp, base).serialize(writer)?;
        return (lbl as i16).serialize(writer);
    }

    let reference = match branch {
        BranchInstruction::IfACmp(comp, lbl) => Some((*comp, 0xa5u8, *lbl)),
        BranchInstruction::IfNull(comp, lbl) => Some((*comp, 0xc6, *lbl)),
        _ => None,
    };
    if let Some((comp, base, lbl)) = reference {
        if wide {
            eq_opcode(!comp, base).serialize(writer)?;
            8i16.serialize(writer)?;
            0xc8u8.serialize(writer)?;
            return ((lbl - 3) as i32).serialize(writer);
        }
        eq_opcode(comp, base).serialize(writer)?;
        return (lbl as i16).serialize(writer);
    }

    match branch {
        BranchInstruction::Goto(lbl) | BranchInstruction::Jsr(lbl) => {
            let is_goto = matches!(branch, BranchInstruction::Goto(_));
            if wide {
                (if is_goto { 0xc8u8 } else { 0xc9 }).serialize(writer)?;
                (*lbl as i32).serialize(writer)?;
            } else {
                (if is_goto { 0xa7u8 } else { 0xa8 }).serialize(writer)?;
                (*lbl as i16).serialize(writer)?;
            }
        }
        BranchInstruction::TableSwitch {
            default,
            low,
            targets,
        } => {
            0xaau8.serialize(writer)?;
            for _ in 0..switch_padding(offset) {
                0x00u8.serialize(writer)?;
            }
            (*default as i32).serialize(writer)?;
            low.serialize(writer)?;
            (low + targets.len() as i32 - 1).serialize(writer)?;
            for target in targets {
                (*target as i32).serialize(writer)?;
            }
        }
        BranchInstruction::LookupSwitch { default, targets } => {
            0xabu8.serialize(writer)?;
            for _ in 0..switch_padding(offset) {
                0x00u8.serialize(writer)?;
            }
            (*default as i32).serialize(writer)?;
            (targets.len() as i32).serialize(writer)?;
            let mut sorted = targets.clone();
            sorted.sort_by_key(|(key, _)| *key);
            for (key, target) in sorted {
                key.serialize(writer)?;
                (target as i32).serialize(writer)?;
            }
        }
        BranchInstruction::IReturn => 0xacu8.serialize(writer)?,
        BranchInstruction::LReturn => 0xadu8.serialize(writer)?,
        BranchInstruction::FReturn => 0xaeu8.serialize(writer)?,
        BranchInstruction::DReturn => 0xafu8.serialize(writer)?,
        BranchInstruction::AReturn => 0xb0u8.serialize(writer)?,
        BranchInstruction::Return => 0xb1u8.serialize(writer)?,
        BranchInstruction::AThrow => 0xbfu8.serialize(writer)?,
        BranchInstruction::If(_, _)
        | BranchInstruction::IfICmp(_, _)
        | BranchInstruction::IfACmp(_, _)
        | BranchInstruction::IfNull(_, _) => (),
    }
    Ok(())
}

/* The load/store instructions follow the same pattern:
 *
 *   - short form (0-3) have special bytes
 *   - normal form (0-255) use `iload` plus a byte operand
 *   - wide form (255-65535) use `wide iload` plus two byte operands
 */
fn encode_load_or_store<W: WriteBytesExt>(
    idx: u16,
    short_form_start: u8,
    normal_form: u8,
    writer: &mut W,
) -> IoResult<()> {
    match u8::try_from(idx) {
        Ok(n @ 0..=3) => (short_form_start + n).serialize(writer),
        Ok(n) => {
            normal_form.serialize(writer)?;
            n.serialize(writer)
        }
        Err(_) => {
            0xc4u8.serialize(writer)?;
            normal_form.serialize(writer)?;
            idx.serialize(writer)
        }
    }
}

fn encode_instruction<W: WriteBytesExt>(
    instruction: &Instruction,
    constants: &mut ConstantsPool,
    writer: &mut W,
) -> Result<(), Error> {
    use Instruction::*;

    let simple: u8 = match instruction {
        Nop => 0x00,
        AConstNull => 0x01,
        IConstM1 => 0x02,
        IConst0 => 0x03,
        IConst1 => 0x04,
        IConst2 => 0x05,
        IConst3 => 0x06,
        IConst4 => 0x07,
        IConst5 => 0x08,
        LConst0 => 0x09,
        LConst1 => 0x0a,
        FConst0 => 0x0b,
        FConst1 => 0x0c,
        FConst2 => 0x0d,
        DConst0 => 0x0e,
        DConst1 => 0x0f,
        IALoad => 0x2e,
        LALoad => 0x2f,
        FALoad => 0x30,
        DALoad => 0x31,
        AALoad => 0x32,
        BALoad => 0x33,
        CALoad => 0x34,
        SALoad => 0x35,
        IAStore => 0x4f,
        LAStore => 0x50,
        FAStore => 0x51,
        DAStore => 0x52,
        AAStore => 0x53,
        BAStore => 0x54,
        CAStore => 0x55,
        SAStore => 0x56,
        Pop => 0x57,
        Pop2 => 0x58,
        Dup => 0x59,
        DupX1 => 0x5a,
        DupX2 => 0x5b,
        Dup2 => 0x5c,
        Dup2X1 => 0x5d,
        Dup2X2 => 0x5e,
        Swap => 0x5f,
        IAdd => 0x60,
        LAdd => 0x61,
        FAdd => 0x62,
        DAdd => 0x63,
        ISub => 0x64,
        LSub => 0x65,
        FSub => 0x66,
        DSub => 0x67,
        IMul => 0x68,
        LMul => 0x69,
        FMul => 0x6a,
        DMul => 0x6b,
        IDiv => 0x6c,
        LDiv => 0x6d,
        FDiv => 0x6e,
        DDiv => 0x6f,
        IRem => 0x70,
        LRem => 0x71,
        FRem => 0x72,
        DRem => 0x73,
        INeg => 0x74,
        LNeg => 0x75,
        FNeg => 0x76,
        DNeg => 0x77,
        ISh(ShiftType::Left) => 0x78,
        LSh(ShiftType::Left) => 0x79,
        ISh(ShiftType::ArithmeticRight) => 0x7a,
        LSh(ShiftType::ArithmeticRight) => 0x7b,
        ISh(ShiftType::LogicalRight) => 0x7c,
        LSh(ShiftType::LogicalRight) => 0x7d,
        IAnd => 0x7e,
        LAnd => 0x7f,
        IOr => 0x80,
        LOr => 0x81,
        IXor => 0x82,
        LXor => 0x83,
        I2L => 0x85,
        I2F => 0x86,
        I2D => 0x87,
        L2I => 0x88,
        L2F => 0x89,
        L2D => 0x8a,
        F2I => 0x8b,
        F2L => 0x8c,
        F2D => 0x8d,
        D2I => 0x8e,
        D2L => 0x8f,
        D2F => 0x90,
        I2B => 0x91,
        I2C => 0x92,
        I2S => 0x93,
        LCmp => 0x94,
        FCmp(CompareMode::L) => 0x95,
        FCmp(CompareMode::G) => 0x96,
        DCmp(CompareMode::L) => 0x97,
        DCmp(CompareMode::G) => 0x98,
        ArrayLength => 0xbe,
        MonitorEnter => 0xc2,
        MonitorExit => 0xc3,

        BiPush(b) => {
            0x10u8.serialize(writer)?;
            b.serialize(writer)?;
            return Ok(());
        }
        SiPush(s) => {
            0x11u8.serialize(writer)?;
            s.serialize(writer)?;
            return Ok(());
        }
        Ldc(constant) => {
            let ConstantIndex(idx) = constants.get_constant(constant)?;
            match constant {
                ConstantData::Long(_) | ConstantData::Double(_) => {
                    0x14u8.serialize(writer)?;
                    idx.serialize(writer)?;
                }
                _ => match u8::try_from(idx) {
                    Ok(b) => {
                        0x12u8.serialize(writer)?;
                        b.serialize(writer)?;
                    }
                    Err(_) => {
                        0x13u8.serialize(writer)?;
                        idx.serialize(writer)?;
                    }
                },
            }
            return Ok(());
        }
        ILoad(idx) => return Ok(encode_load_or_store(*idx, 0x1a, 0x15, writer)?),
        LLoad(idx) => return Ok(encode_load_or_store(*idx, 0x1e, 0x16, writer)?),
        FLoad(idx) => return Ok(encode_load_or_store(*idx, 0x22, 0x17, writer)?),
        DLoad(idx) => return Ok(encode_load_or_store(*idx, 0x26, 0x18, writer)?),
        ALoad(idx) => return Ok(encode_load_or_store(*idx, 0x2a, 0x19, writer)?),
        IStore(idx) => return Ok(encode_load_or_store(*idx, 0x3b, 0x36, writer)?),
        LStore(idx) => return Ok(encode_load_or_store(*idx, 0x3f, 0x37, writer)?),
        FStore(idx) => return Ok(encode_load_or_store(*idx, 0x43, 0x38, writer)?),
        DStore(idx) => return Ok(encode_load_or_store(*idx, 0x47, 0x39, writer)?),
        AStore(idx) => return Ok(encode_load_or_store(*idx, 0x4b, 0x3a, writer)?),
        IInc(idx, amount) => {
            match (u8::try_from(*idx), i8::try_from(*amount)) {
                (Ok(idx), Ok(amount)) => {
                    0x84u8.serialize(writer)?;
                    idx.serialize(writer)?;
                    amount.serialize(writer)?;
                }
                _ => {
                    0xc4u8.serialize(writer)?;
                    0x84u8.serialize(writer)?;
                    idx.serialize(writer)?;
                    amount.serialize(writer)?;
                }
            }
            return Ok(());
        }
        Ret(idx) => {
            match u8::try_from(*idx) {
                Ok(idx) => {
                    0xa9u8.serialize(writer)?;
                    idx.serialize(writer)?;
                }
                Err(_) => {
                    0xc4u8.serialize(writer)?;
                    0xa9u8.serialize(writer)?;
                    idx.serialize(writer)?;
                }
            }
            return Ok(());
        }
        GetStatic(field) | PutStatic(field) | GetField(field) | PutField(field) => {
            let opcode: u8 = match instruction {
                GetStatic(_) => 0xb2,
                PutStatic(_) => 0xb3,
                GetField(_) => 0xb4,
                _ => 0xb5,
            };
            opcode.serialize(writer)?;
            constants.get_field_ref(field)?.0.serialize(writer)?;
            return Ok(());
        }
        Invoke(typ, method) => {
            let index = constants.get_method_ref(method)?.0;
            match typ {
                InvokeType::Virtual => 0xb6u8.serialize(writer)?,
                InvokeType::Special => 0xb7u8.serialize(writer)?,
                InvokeType::Static => 0xb8u8.serialize(writer)?,
                InvokeType::Interface => 0xb9u8.serialize(writer)?,
            }
            index.serialize(writer)?;
            if let InvokeType::Interface = typ {
                (method.descriptor.parameter_length(true) as u8).serialize(writer)?;
                0u8.serialize(writer)?;
            }
            return Ok(());
        }
        New(class) | ANewArray(class) | CheckCast(class) | InstanceOf(class) => {
            let opcode: u8 = match instruction {
                New(_) => 0xbb,
                ANewArray(_) => 0xbd,
                CheckCast(_) => 0xc0,
                _ => 0xc1,
            };
            opcode.serialize(writer)?;
            constants.get_ref_type(class)?.0.serialize(writer)?;
            return Ok(());
        }
        NewArray(base_type) => {
            let atype: u8 = match base_type {
                BaseType::Boolean => 4,
                BaseType::Char => 5,
                BaseType::Float => 6,
                BaseType::Double => 7,
                BaseType::Byte => 8,
                BaseType::Short => 9,
                BaseType::Int => 10,
                BaseType::Long => 11,
            };
            0xbcu8.serialize(writer)?;
            atype.serialize(writer)?;
            return Ok(());
        }
        MultiANewArray(class, dimensions) => {
            0xc5u8.serialize(writer)?;
            constants.get_ref_type(class)?.0.serialize(writer)?;
            dimensions.serialize(writer)?;
            return Ok(());
        }
    };
    simple.serialize(writer)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::{ClassConstantIndex, ConstantPool};
    use crate::jvm::code::{decode_code, ExceptionHandler, InsnList};
    use crate::jvm::BinaryName;

    fn method(insns: Vec<Insn>, next_label: usize) -> Code {
        let mut instructions = InsnList::new();
        for _ in 0..next_label {
            instructions.new_label();
        }
        for insn in insns {
            instructions.push_back(insn);
        }
        Code {
            instructions,
            handlers: vec![],
        }
    }

    fn encode(code: &Code) -> (class_file::Code, ConstantPool) {
        let mut constants = ConstantsPool::new();
        let encoded = encode_code(code, 1, &mut constants).unwrap();
        (encoded, constants.into_pool())
    }

    #[test]
    fn short_forms() {
        let code = method(
            vec![
                Instruction::ILoad(0).into(),
                Instruction::IStore(200).into(),
                Instruction::IInc(300, 1).into(),
                BranchInstruction::Return.into(),
            ],
            0,
        );
        let (encoded, _) = encode(&code);
        assert_eq!(
            encoded.code_array,
            vec![0x1a, 0x36, 200, 0xc4, 0x84, 0x01, 0x2c, 0x00, 0x01, 0xb1]
        );
        assert_eq!(encoded.max_stack, 1);
        assert_eq!(encoded.max_locals, 301);
    }

    #[test]
    fn far_conditional_is_widened() {
        let far = Label::START;
        let mut insns: Vec<Insn> = vec![
            Instruction::ILoad(0).into(),
            BranchInstruction::If(OrdComparison::EQ, far).into(),
        ];
        for _ in 0..40_000 {
            insns.push(Instruction::Nop.into());
        }
        insns.push(Insn::Label(far));
        insns.push(BranchInstruction::Return.into());
        let code = method(insns, 1);

        let (encoded, pool) = encode(&code);
        let bytes = &encoded.code_array;
        // ifne +8, goto_w to the return
        assert_eq!(&bytes[1..4], &[0x9a, 0x00, 0x08]);
        assert_eq!(bytes[4], 0xc8);
        assert_eq!(&bytes[5..9], &(40_009i32 - 4).to_be_bytes());
        assert_eq!(bytes.len(), 1 + 8 + 40_000 + 1);

        let decoded = decode_code(&pool, &encoded).unwrap();
        let branches: Vec<_> = decoded
            .instructions
            .iter()
            .filter_map(|(_, insn)| insn.as_branch().cloned())
            .collect();
        assert_eq!(branches.len(), 3);
        assert!(matches!(branches[0], BranchInstruction::If(OrdComparison::NE, _)));
        assert!(matches!(branches[1], BranchInstruction::Goto(_)));
    }

    #[test]
    fn switch_padding_depends_on_offset() {
        let target = Label::START;
        let code = method(
            vec![
                Instruction::ILoad(0).into(),
                BranchInstruction::LookupSwitch {
                    default: target,
                    targets: vec![(7, target), (-2, target)],
                }
                .into(),
                Insn::Label(target),
                BranchInstruction::Return.into(),
            ],
            1,
        );
        let (encoded, _) = encode(&code);
        let bytes = &encoded.code_array;
        assert_eq!(bytes[1], 0xab);
        assert_eq!(&bytes[2..4], &[0, 0]);
        // keys come out sorted
        assert_eq!(&bytes[12..16], &(-2i32).to_be_bytes());
        assert_eq!(&bytes[20..24], &7i32.to_be_bytes());
        assert_eq!(bytes.len(), 1 + 1 + 2 + 8 + 16 + 1);
    }

    #[test]
    fn handlers_and_constants() {
        let start = Label::START;
        let end = start.next();
        let handler = end.next();
        let mut code = method(
            vec![
                Insn::Label(start),
                Instruction::Ldc(ConstantData::String("hi".to_string())).into(),
                Instruction::Pop.into(),
                Insn::Label(end),
                BranchInstruction::Return.into(),
                Insn::Label(handler),
                BranchInstruction::AThrow.into(),
            ],
            3,
        );
        code.handlers.push(ExceptionHandler {
            start,
            end,
            handler,
            catch_type: Some(BinaryName::THROWABLE),
        });
        let (encoded, pool) = encode(&code);
        assert_eq!(encoded.exception_table.len(), 1);
        let entry = &encoded.exception_table[0];
        assert_eq!((entry.start_pc, entry.end_pc, entry.handler_pc), (0, 3, 4));
        assert_eq!(pool.class_name(ClassConstantIndex(entry.catch_type)).unwrap(), "java/lang/Throwable");

        let decoded = decode_code(&pool, &encoded).unwrap();
        assert_eq!(decoded.handlers.len(), 1);
        assert_eq!(decoded.handlers[0].catch_type, Some(BinaryName::THROWABLE));
    }

    #[test]
    fn unplaced_label() {
        let code = method(vec![BranchInstruction::Goto(Label::START).into()], 1);
        let mut constants = ConstantsPool::new();
        assert!(matches!(
            encode_code(&code, 0, &mut constants),
            Err(Error::UnplacedLabel(_))
        ));
    }

    #[test]
    fn invokedynamic_is_rejected() {
        let raw = class_file::Code {
            max_stack: 0,
            max_locals: 0,
            code_array: vec![0xba, 0x00, 0x01, 0x00, 0x00],
            exception_table: vec![],
            attributes: vec![],
        };
        assert!(matches!(
            decode_code(&ConstantsPool::new().into_pool(), &raw),
            Err(Error::UnsupportedInstruction { .. })
        ));
    }

    #[test]
    fn branch_into_operand_is_rejected() {
        let raw = class_file::Code {
            max_stack: 0,
            max_locals: 0,
            code_array: vec![0x10, 0x05, 0xa7, 0xff, 0xff, 0xb1],
            exception_table: vec![],
            attributes: vec![],
        };
        assert!(matches!(
            decode_code(&ConstantsPool::new().into_pool(), &raw),
            Err(Error::BadBranchTarget { offset: 2, target: 1 })
        ));
    }
}
