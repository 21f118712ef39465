//! Lift a `Code` attribute into an editable [`Code`]

use super::{
    BranchInstruction, Code, CompareMode, EqComparison, ExceptionHandler, Insn, InsnList,
    Instruction, InvokeType, Label, OrdComparison, ShiftType,
};
use crate::jvm::class_file::{self, ClassConstantIndex, ConstantIndex, ConstantPool};
use crate::jvm::{BaseType, Deserialize, Error};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

/// Instruction as decoded, with branch targets still absolute byte offsets
enum Decoded {
    Instruction(Instruction),
    Branch(BranchInstruction<i64>),
}

/// Decode the bytecode and exception table of a method
///
/// Every byte offset that is the target of a branch or the boundary of an exception range
/// becomes a [`Label`] placed right before the instruction at that offset (or at the very end,
/// for ranges extending to the end of the code).
pub fn decode_code(pool: &ConstantPool, raw: &class_file::Code) -> Result<Code, Error> {
    let bytes: &[u8] = &raw.code_array;
    let code_len = bytes.len() as i64;

    let mut decoded: Vec<(u32, Decoded)> = vec![];
    let mut reader = Cursor::new(bytes);
    while (reader.position() as usize) < bytes.len() {
        let offset = reader.position() as u32;
        let insn = decode_instruction(&mut reader, offset, pool)?;
        decoded.push((offset, insn));
    }
    let starts: BTreeSet<i64> = decoded.iter().map(|(off, _)| *off as i64).collect();

    // Collect every offset needing a label
    let mut targets: BTreeSet<i64> = BTreeSet::new();
    for (offset, insn) in &decoded {
        if let Decoded::Branch(branch) = insn {
            for target in branch.jump_targets() {
                if !starts.contains(&target) {
                    return Err(Error::BadBranchTarget {
                        offset: *offset,
                        target,
                    });
                }
                targets.insert(target);
            }
        }
    }
    for handler in &raw.exception_table {
        let start = handler.start_pc as i64;
        let end = handler.end_pc as i64;
        let target = handler.handler_pc as i64;
        let bad = |target: i64| Error::BadBranchTarget {
            offset: handler.handler_pc as u32,
            target,
        };
        if !starts.contains(&start) || start >= end {
            return Err(bad(start));
        }
        if !(starts.contains(&end) || end == code_len) {
            return Err(bad(end));
        }
        if !starts.contains(&target) {
            return Err(bad(target));
        }
        targets.extend([start, end, target]);
    }

    let mut instructions = InsnList::new();
    let labels: BTreeMap<i64, Label> = targets
        .into_iter()
        .map(|offset| (offset, instructions.new_label()))
        .collect();
    let label_at = |offset: &i64| -> Result<Label, Error> {
        labels.get(offset).copied().ok_or(Error::BadBranchTarget {
            offset: 0,
            target: *offset,
        })
    };

    for (offset, insn) in decoded {
        if let Some(label) = labels.get(&(offset as i64)) {
            instructions.push_back(Insn::Label(*label));
        }
        match insn {
            Decoded::Instruction(instruction) => {
                instructions.push_back(instruction);
            }
            Decoded::Branch(branch) => {
                instructions.push_back(branch.map_labels(label_at)?);
            }
        }
    }
    if let Some(label) = labels.get(&code_len) {
        instructions.push_back(Insn::Label(*label));
    }

    let handlers = raw
        .exception_table
        .iter()
        .map(|handler| {
            let catch_type = if handler.catch_type.0 == 0 {
                None
            } else {
                Some(pool.binary_name(ClassConstantIndex(handler.catch_type))?)
            };
            Ok(ExceptionHandler {
                start: label_at(&(handler.start_pc as i64))?,
                end: label_at(&(handler.end_pc as i64))?,
                handler: label_at(&(handler.handler_pc as i64))?,
                catch_type,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(Code {
        instructions,
        handlers,
    })
}

fn read_u8(reader: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    Ok(u8::deserialize(reader)?)
}

fn read_u16(reader: &mut Cursor<&[u8]>) -> Result<u16, Error> {
    Ok(u16::deserialize(reader)?)
}

fn read_i32(reader: &mut Cursor<&[u8]>) -> Result<i32, Error> {
    Ok(i32::deserialize(reader)?)
}

/// Skip the 0-3 bytes of padding aligning switch operands to a multiple of four
fn skip_switch_padding(reader: &mut Cursor<&[u8]>) -> Result<(), Error> {
    while reader.position() % 4 != 0 {
        read_u8(reader)?;
    }
    Ok(())
}

fn decode_instruction(
    reader: &mut Cursor<&[u8]>,
    offset: u32,
    pool: &ConstantPool,
) -> Result<Decoded, Error> {
    use Instruction::*;

    let base = offset as i64;
    let rel16 = |reader: &mut Cursor<&[u8]>| -> Result<i64, Error> {
        Ok(base + i16::deserialize(reader)? as i64)
    };
    let rel32 = |reader: &mut Cursor<&[u8]>| -> Result<i64, Error> {
        Ok(base + i32::deserialize(reader)? as i64)
    };
    let constant = |reader: &mut Cursor<&[u8]>| -> Result<ConstantIndex, Error> {
        Ok(ConstantIndex(read_u16(reader)?))
    };
    let class = |reader: &mut Cursor<&[u8]>| {
        let index = ClassConstantIndex(ConstantIndex(read_u16(reader)?));
        pool.ref_type(index)
    };
    let branch = |branch: BranchInstruction<i64>| -> Result<Decoded, Error> {
        Ok(Decoded::Branch(branch))
    };

    let opcode = read_u8(reader)?;
    let instruction = match opcode {
        0x00 => Nop,
        0x01 => AConstNull,
        0x02 => IConstM1,
        0x03 => IConst0,
        0x04 => IConst1,
        0x05 => IConst2,
        0x06 => IConst3,
        0x07 => IConst4,
        0x08 => IConst5,
        0x09 => LConst0,
        0x0a => LConst1,
        0x0b => FConst0,
        0x0c => FConst1,
        0x0d => FConst2,
        0x0e => DConst0,
        0x0f => DConst1,
        0x10 => BiPush(i8::deserialize(reader)?),
        0x11 => SiPush(i16::deserialize(reader)?),
        0x12 => Ldc(pool.constant_data(ConstantIndex(read_u8(reader)? as u16))?),
        0x13 | 0x14 => Ldc(pool.constant_data(constant(reader)?)?),
        0x15 => ILoad(read_u8(reader)? as u16),
        0x16 => LLoad(read_u8(reader)? as u16),
        0x17 => FLoad(read_u8(reader)? as u16),
        0x18 => DLoad(read_u8(reader)? as u16),
        0x19 => ALoad(read_u8(reader)? as u16),
        0x1a..=0x1d => ILoad((opcode - 0x1a) as u16),
        0x1e..=0x21 => LLoad((opcode - 0x1e) as u16),
        0x22..=0x25 => FLoad((opcode - 0x22) as u16),
        0x26..=0x29 => DLoad((opcode - 0x26) as u16),
        0x2a..=0x2d => ALoad((opcode - 0x2a) as u16),
        0x2e => IALoad,
        0x2f => LALoad,
        0x30 => FALoad,
        0x31 => DALoad,
        0x32 => AALoad,
        0x33 => BALoad,
        0x34 => CALoad,
        0x35 => SALoad,
        0x36 => IStore(read_u8(reader)? as u16),
        0x37 => LStore(read_u8(reader)? as u16),
        0x38 => FStore(read_u8(reader)? as u16),
        0x39 => DStore(read_u8(reader)? as u16),
        0x3a => AStore(read_u8(reader)? as u16),
        0x3b..=0x3e => IStore((opcode - 0x3b) as u16),
        0x3f..=0x42 => LStore((opcode - 0x3f) as u16),
        0x43..=0x46 => FStore((opcode - 0x43) as u16),
        0x47..=0x4a => DStore((opcode - 0x47) as u16),
        0x4b..=0x4e => AStore((opcode - 0x4b) as u16),
        0x4f => IAStore,
        0x50 => LAStore,
        0x51 => FAStore,
        0x52 => DAStore,
        0x53 => AAStore,
        0x54 => BAStore,
        0x55 => CAStore,
        0x56 => SAStore,
        0x57 => Pop,
        0x58 => Pop2,
        0x59 => Dup,
        0x5a => DupX1,
        0x5b => DupX2,
        0x5c => Dup2,
        0x5d => Dup2X1,
        0x5e => Dup2X2,
        0x5f => Swap,
        0x60 => IAdd,
        0x61 => LAdd,
        0x62 => FAdd,
        0x63 => DAdd,
        0x64 => ISub,
        0x65 => LSub,
        0x66 => FSub,
        0x67 => DSub,
        0x68 => IMul,
        0x69 => LMul,
        0x6a => FMul,
        0x6b => DMul,
        0x6c => IDiv,
        0x6d => LDiv,
        0x6e => FDiv,
        0x6f => DDiv,
        0x70 => IRem,
        0x71 => LRem,
        0x72 => FRem,
        0x73 => DRem,
        0x74 => INeg,
        0x75 => LNeg,
        0x76 => FNeg,
        0x77 => DNeg,
        0x78 => ISh(ShiftType::Left),
        0x79 => LSh(ShiftType::Left),
        0x7a => ISh(ShiftType::ArithmeticRight),
        0x7b => LSh(ShiftType::ArithmeticRight),
        0x7c => ISh(ShiftType::LogicalRight),
        0x7d => LSh(ShiftType::LogicalRight),
        0x7e => IAnd,
        0x7f => LAnd,
        0x80 => IOr,
        0x81 => LOr,
        0x82 => IXor,
        0x83 => LXor,
        0x84 => IInc(read_u8(reader)? as u16, i8::deserialize(reader)? as i16),
        0x85 => I2L,
        0x86 => I2F,
        0x87 => I2D,
        0x88 => L2I,
        0x89 => L2F,
        0x8a => L2D,
        0x8b => F2I,
        0x8c => F2L,
        0x8d => F2D,
        0x8e => D2I,
        0x8f => D2L,
        0x90 => D2F,
        0x91 => I2B,
        0x92 => I2C,
        0x93 => I2S,
        0x94 => LCmp,
        0x95 => FCmp(CompareMode::L),
        0x96 => FCmp(CompareMode::G),
        0x97 => DCmp(CompareMode::L),
        0x98 => DCmp(CompareMode::G),
        0x99 => return branch(BranchInstruction::If(OrdComparison::EQ, rel16(reader)?)),
        0x9a => return branch(BranchInstruction::If(OrdComparison::NE, rel16(reader)?)),
        0x9b => return branch(BranchInstruction::If(OrdComparison::LT, rel16(reader)?)),
        0x9c => return branch(BranchInstruction::If(OrdComparison::GE, rel16(reader)?)),
        0x9d => return branch(BranchInstruction::If(OrdComparison::GT, rel16(reader)?)),
        0x9e => return branch(BranchInstruction::If(OrdComparison::LE, rel16(reader)?)),
        0x9f => return branch(BranchInstruction::IfICmp(OrdComparison::EQ, rel16(reader)?)),
        0xa0 => return branch(BranchInstruction::IfICmp(OrdComparison::NE, rel16(reader)?)),
        0xa1 => return branch(BranchInstruction::IfICmp(OrdComparison::LT, rel16(reader)?)),
        0xa2 => return branch(BranchInstruction::IfICmp(OrdComparison::GE, rel16(reader)?)),
        0xa3 => return branch(BranchInstruction::IfICmp(OrdComparison::GT, rel16(reader)?)),
        0xa4 => return branch(BranchInstruction::IfICmp(OrdComparison::LE, rel16(reader)?)),
        0xa5 => return branch(BranchInstruction::IfACmp(EqComparison::EQ, rel16(reader)?)),
        0xa6 => return branch(BranchInstruction::IfACmp(EqComparison::NE, rel16(reader)?)),
        0xa7 => return branch(BranchInstruction::Goto(rel16(reader)?)),
        0xa8 => return branch(BranchInstruction::Jsr(rel16(reader)?)),
        0xa9 => Ret(read_u8(reader)? as u16),
        0xaa => {
            skip_switch_padding(reader)?;
            let default = rel32(reader)?;
            let low = read_i32(reader)?;
            let high = read_i32(reader)?;
            if high < low {
                return Err(Error::MalformedAttribute("tableswitch"));
            }
            let targets = (low..=high)
                .map(|_| rel32(reader))
                .collect::<Result<Vec<_>, _>>()?;
            return branch(BranchInstruction::TableSwitch {
                default,
                low,
                targets,
            });
        }
        0xab => {
            skip_switch_padding(reader)?;
            let default = rel32(reader)?;
            let pairs = read_i32(reader)?;
            if pairs < 0 {
                return Err(Error::MalformedAttribute("lookupswitch"));
            }
            let targets = (0..pairs)
                .map(|_| Ok((read_i32(reader)?, rel32(reader)?)))
                .collect::<Result<Vec<_>, Error>>()?;
            return branch(BranchInstruction::LookupSwitch { default, targets });
        }
        0xac => return branch(BranchInstruction::IReturn),
        0xad => return branch(BranchInstruction::LReturn),
        0xae => return branch(BranchInstruction::FReturn),
        0xaf => return branch(BranchInstruction::DReturn),
        0xb0 => return branch(BranchInstruction::AReturn),
        0xb1 => return branch(BranchInstruction::Return),
        0xb2 => GetStatic(pool.field_ref(constant(reader)?)?),
        0xb3 => PutStatic(pool.field_ref(constant(reader)?)?),
        0xb4 => GetField(pool.field_ref(constant(reader)?)?),
        0xb5 => PutField(pool.field_ref(constant(reader)?)?),
        0xb6 => Invoke(InvokeType::Virtual, pool.method_ref(constant(reader)?)?),
        0xb7 => Invoke(InvokeType::Special, pool.method_ref(constant(reader)?)?),
        0xb8 => Invoke(InvokeType::Static, pool.method_ref(constant(reader)?)?),
        0xb9 => {
            let method = pool.method_ref(constant(reader)?)?;
            // argument count and a zero byte, both implied by the descriptor
            read_u8(reader)?;
            read_u8(reader)?;
            Invoke(InvokeType::Interface, method)
        }
        0xba => {
            return Err(Error::UnsupportedInstruction {
                offset,
                name: "invokedynamic",
            })
        }
        0xbb => New(class(reader)?),
        0xbc => NewArray(match read_u8(reader)? {
            4 => BaseType::Boolean,
            5 => BaseType::Char,
            6 => BaseType::Float,
            7 => BaseType::Double,
            8 => BaseType::Byte,
            9 => BaseType::Short,
            10 => BaseType::Int,
            11 => BaseType::Long,
            _ => return Err(Error::MalformedAttribute("newarray")),
        }),
        0xbd => ANewArray(class(reader)?),
        0xbe => ArrayLength,
        0xbf => return branch(BranchInstruction::AThrow),
        0xc0 => CheckCast(class(reader)?),
        0xc1 => InstanceOf(class(reader)?),
        0xc2 => MonitorEnter,
        0xc3 => MonitorExit,
        0xc4 => {
            let widened = read_u8(reader)?;
            let idx = read_u16(reader)?;
            match widened {
                0x15 => ILoad(idx),
                0x16 => LLoad(idx),
                0x17 => FLoad(idx),
                0x18 => DLoad(idx),
                0x19 => ALoad(idx),
                0x36 => IStore(idx),
                0x37 => LStore(idx),
                0x38 => FStore(idx),
                0x39 => DStore(idx),
                0x3a => AStore(idx),
                0x84 => IInc(idx, i16::deserialize(reader)?),
                0xa9 => Ret(idx),
                other => {
                    return Err(Error::UnknownOpcode {
                        offset,
                        opcode: other,
                    })
                }
            }
        }
        0xc5 => {
            let element = class(reader)?;
            MultiANewArray(element, read_u8(reader)?)
        }
        0xc6 => return branch(BranchInstruction::IfNull(EqComparison::EQ, rel16(reader)?)),
        0xc7 => return branch(BranchInstruction::IfNull(EqComparison::NE, rel16(reader)?)),
        0xc8 => return branch(BranchInstruction::Goto(rel32(reader)?)),
        0xc9 => return branch(BranchInstruction::Jsr(rel32(reader)?)),
        other => {
            return Err(Error::UnknownOpcode {
                offset,
                opcode: other,
            })
        }
    };
    Ok(Decoded::Instruction(instruction))
}
