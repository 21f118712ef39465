//! Normalize obfuscated shift distances
//!
//! The JVM only looks at the low 5 bits of an `int` shift distance (6 bits for a `long` shift),
//! so the obfuscator pads constant distances with junk high bits. Masking them off keeps the
//! semantics and gives back the distances a decompiler expects.

use super::ClassMap;
use crate::jvm::code::{Code, ConstantData, Insn, Instruction};
use log::debug;

const INT_SHIFT_MASK: i32 = 0x1F;
const LONG_SHIFT_MASK: i32 = 0x3F;

pub fn mask_shifts(classes: &mut ClassMap) {
    for class in classes.values_mut() {
        let mut masked = 0;
        for method in &mut class.methods {
            if let Some(code) = &mut method.code {
                masked += mask_code(code);
            }
        }
        if masked > 0 {
            debug!("Masked {} shift distances in {}", masked, class.name);
        }
    }
}

/// Mask every constant shift distance in a method body, returning how many changed
pub fn mask_code(code: &mut Code) -> usize {
    let mut masked = 0;
    for id in code.instructions.ids() {
        let mask = match &code.instructions[id] {
            Insn::Instruction(Instruction::ISh(_)) => INT_SHIFT_MASK,
            Insn::Instruction(Instruction::LSh(_)) => LONG_SHIFT_MASK,
            _ => continue,
        };
        let distance = match code.instructions.prev(id) {
            Some(prev) => prev,
            None => continue,
        };
        let replacement = match &code.instructions[distance] {
            Insn::Instruction(constant) => masked_constant(constant, mask),
            _ => None,
        };
        if let Some(replacement) = replacement {
            code.instructions.replace(distance, replacement);
            masked += 1;
        }
    }
    masked
}

/// Same constant load with the value masked, or `None` if masking changes nothing
fn masked_constant(instruction: &Instruction, mask: i32) -> Option<Instruction> {
    let value = instruction.int_constant()?;
    let masked = value & mask;
    if masked == value {
        return None;
    }
    Some(match instruction {
        Instruction::Ldc(_) => Instruction::Ldc(ConstantData::Integer(masked)),
        Instruction::SiPush(_) => Instruction::SiPush(masked as i16),
        // Masked values always fit in a byte. Only `iconst_m1` gets here otherwise
        _ => Instruction::BiPush(masked as i8),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::ShiftType;

    fn body(instructions: Vec<Instruction>) -> Code {
        let mut code = Code::new();
        for instruction in instructions {
            code.instructions.push_back(instruction);
        }
        code
    }

    fn contents(code: &Code) -> Vec<Insn> {
        code.instructions.iter().map(|(_, insn)| insn.clone()).collect()
    }

    #[test]
    fn masks_each_constant_form() {
        let mut code = body(vec![
            Instruction::ILoad(0),
            Instruction::Ldc(ConstantData::Integer(-1_389_567_647)),
            Instruction::ISh(ShiftType::Left),
            Instruction::ILoad(0),
            Instruction::BiPush(40),
            Instruction::ISh(ShiftType::ArithmeticRight),
            Instruction::LLoad(1),
            Instruction::SiPush(1000),
            Instruction::LSh(ShiftType::LogicalRight),
            Instruction::ILoad(0),
            Instruction::IConstM1,
            Instruction::ISh(ShiftType::Left),
        ]);
        assert_eq!(mask_code(&mut code), 4);

        let contents = contents(&code);
        assert_eq!(
            contents[1],
            Instruction::Ldc(ConstantData::Integer(-1_389_567_647 & 0x1F)).into()
        );
        assert_eq!(contents[4], Instruction::BiPush(8).into());
        assert_eq!(contents[7], Instruction::SiPush(1000 & 0x3F).into());
        assert_eq!(contents[10], Instruction::BiPush(31).into());
    }

    #[test]
    fn idempotent() {
        let mut code = body(vec![
            Instruction::ILoad(0),
            Instruction::Ldc(ConstantData::Integer(0x7FFF_FFE3)),
            Instruction::ISh(ShiftType::Left),
            Instruction::ILoad(0),
            Instruction::IConst3,
            Instruction::ISh(ShiftType::Left),
        ]);
        assert_eq!(mask_code(&mut code), 1);
        let once = contents(&code);
        assert_eq!(mask_code(&mut code), 0);
        assert_eq!(contents(&code), once);
    }

    #[test]
    fn leaves_other_operands_alone() {
        let original = vec![
            Instruction::ILoad(0),
            Instruction::ILoad(1),
            Instruction::ISh(ShiftType::Left),
            Instruction::Ldc(ConstantData::Integer(4096)),
            Instruction::IAdd,
            Instruction::BiPush(100),
            Instruction::IMul,
        ];
        let mut code = body(original.clone());
        assert_eq!(mask_code(&mut code), 0);
        let expected: Vec<Insn> = original.into_iter().map(Insn::from).collect();
        assert_eq!(contents(&code), expected);
    }
}
