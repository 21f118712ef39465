//! Remove arithmetic stored into locals which are never read
//!
//! The obfuscator sprinkles statements like `int x = -79 % ((y - -49) / 42);` through method
//! bodies. Each one is a short run of `int` arithmetic ending in a store to a slot that no
//! instruction ever loads.

use super::ClassMap;
use crate::jvm::code::{Code, Insn, InsnId, Instruction};
use log::debug;
use std::collections::{BTreeMap, HashSet};

/// Longest run removed, the store included
const MAX_RUN: usize = 8;

pub fn remove_dead_math(classes: &mut ClassMap) {
    for class in classes.values_mut() {
        for method in &mut class.methods {
            if let Some(code) = &mut method.code {
                let removed = remove_dead_stores(code);
                if removed > 0 {
                    debug!(
                        "Removed {} dead stores from {}.{}",
                        removed, class.name, method.name
                    );
                }
            }
        }
    }
}

/// Remove dead `int` arithmetic from a method body, returning how many stores went away
pub fn remove_dead_stores(code: &mut Code) -> usize {
    let mut loaded: HashSet<u16> = HashSet::new();
    let mut stored: BTreeMap<u16, InsnId> = BTreeMap::new();
    for (id, insn) in code.instructions.iter() {
        match insn {
            Insn::Instruction(Instruction::ILoad(slot))
            | Insn::Instruction(Instruction::IInc(slot, _)) => {
                loaded.insert(*slot);
            }
            Insn::Instruction(Instruction::IStore(slot)) => {
                stored.insert(*slot, id);
            }
            _ => (),
        }
    }

    let mut removed = 0;
    for (slot, store) in stored {
        // An earlier run may already have taken this store with it
        if loaded.contains(&slot) || code.instructions.get(store).is_none() {
            continue;
        }
        if let Some(run) = producing_run(code, store, &loaded) {
            for id in run {
                code.instructions.remove(id);
            }
            removed += 1;
        }
    }
    removed
}

/// Walk back from a store to the start of the run computing the stored value
///
/// Returns `None` if the run would be too long, contains anything other than plain `int`
/// arithmetic on locals and small constants, or stores into a slot in `loaded`.
fn producing_run(code: &Code, store: InsnId, loaded: &HashSet<u16>) -> Option<Vec<InsnId>> {
    let mut run = vec![];
    let mut needed: usize = 0;
    let mut cursor = Some(store);
    while let Some(id) = cursor {
        if run.len() == MAX_RUN {
            return None;
        }
        let instruction = match code.instructions.get(id)? {
            Insn::Instruction(Instruction::IStore(slot)) if loaded.contains(slot) => return None,
            Insn::Instruction(instruction) if is_dead_math(instruction) => instruction,
            _ => return None,
        };
        let (pops, pushes) = instruction.stack_effect();
        needed = needed.checked_sub(pushes)? + pops;
        run.push(id);
        if needed == 0 {
            return Some(run);
        }
        cursor = code.instructions.prev(id);
    }
    None
}

fn is_dead_math(instruction: &Instruction) -> bool {
    matches!(
        instruction,
        Instruction::ILoad(_)
            | Instruction::IStore(_)
            | Instruction::IAdd
            | Instruction::ISub
            | Instruction::IDiv
            | Instruction::IRem
            | Instruction::BiPush(_)
            | Instruction::IConstM1
            | Instruction::IConst0
            | Instruction::IConst1
            | Instruction::IConst2
            | Instruction::IConst3
            | Instruction::IConst4
            | Instruction::IConst5
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{BranchInstruction, InvokeType, MethodRef};
    use crate::jvm::{BinaryName, FieldType, MethodDescriptor, Name, RefType, UnqualifiedName};

    fn contents(code: &Code) -> Vec<Insn> {
        code.instructions.iter().map(|(_, insn)| insn.clone()).collect()
    }

    #[test]
    fn removes_five_instruction_run() {
        // int x = (y - -49) / 42;
        let mut code = Code::new();
        code.instructions.push_back(Instruction::ILoad(0));
        code.instructions.push_back(Instruction::BiPush(-49));
        code.instructions.push_back(Instruction::ISub);
        code.instructions.push_back(Instruction::BiPush(42));
        code.instructions.push_back(Instruction::IDiv);
        code.instructions.push_back(Instruction::IStore(1));
        code.instructions.push_back(Instruction::ILoad(0));
        code.instructions.push_back(BranchInstruction::IReturn);

        assert_eq!(remove_dead_stores(&mut code), 1);
        assert_eq!(
            contents(&code),
            vec![
                Instruction::ILoad(0).into(),
                BranchInstruction::IReturn.into(),
            ]
        );
    }

    #[test]
    fn removes_seven_instruction_run() {
        // int x = -79 % ((y - -49) / 42);
        let mut code = Code::new();
        code.instructions.push_back(Instruction::BiPush(-79));
        code.instructions.push_back(Instruction::ILoad(0));
        code.instructions.push_back(Instruction::BiPush(-49));
        code.instructions.push_back(Instruction::ISub);
        code.instructions.push_back(Instruction::BiPush(42));
        code.instructions.push_back(Instruction::IDiv);
        code.instructions.push_back(Instruction::IRem);
        code.instructions.push_back(Instruction::IStore(2));
        code.instructions.push_back(BranchInstruction::Return);

        assert_eq!(remove_dead_stores(&mut code), 1);
        assert_eq!(contents(&code), vec![BranchInstruction::Return.into()]);
    }

    #[test]
    fn overlapping_runs() {
        // The run ending in `istore_1` swallows the store to slot 2
        let mut code = Code::new();
        code.instructions.push_back(Instruction::IConst1);
        code.instructions.push_back(Instruction::IConst2);
        code.instructions.push_back(Instruction::IStore(2));
        code.instructions.push_back(Instruction::IStore(1));
        code.instructions.push_back(BranchInstruction::Return);

        assert_eq!(remove_dead_stores(&mut code), 1);
        assert_eq!(contents(&code), vec![BranchInstruction::Return.into()]);
    }

    #[test]
    fn keeps_run_holding_a_live_store() {
        let mut code = Code::new();
        code.instructions.push_back(Instruction::IConst1);
        code.instructions.push_back(Instruction::IConst2);
        code.instructions.push_back(Instruction::IStore(1));
        code.instructions.push_back(Instruction::IStore(2));
        code.instructions.push_back(Instruction::ILoad(1));
        code.instructions.push_back(BranchInstruction::IReturn);

        let before = contents(&code);
        assert_eq!(remove_dead_stores(&mut code), 0);
        assert_eq!(contents(&code), before);
    }

    #[test]
    fn keeps_run_with_a_call() {
        let mut code = Code::new();
        code.instructions.push_back(Instruction::ILoad(0));
        code.instructions.push_back(Instruction::Invoke(
            InvokeType::Static,
            MethodRef {
                owner: RefType::Object(BinaryName::from_str("client").unwrap()),
                name: UnqualifiedName::from_str("hash").unwrap(),
                descriptor: MethodDescriptor {
                    parameters: vec![FieldType::int()],
                    return_type: Some(FieldType::int()),
                },
                is_interface: false,
            },
        ));
        code.instructions.push_back(Instruction::IConst2);
        code.instructions.push_back(Instruction::IAdd);
        code.instructions.push_back(Instruction::IStore(1));
        code.instructions.push_back(BranchInstruction::Return);

        let before = contents(&code);
        assert_eq!(remove_dead_stores(&mut code), 0);
        assert_eq!(contents(&code), before);
    }

    #[test]
    fn keeps_live_and_label_crossing_runs() {
        let mut code = Code::new();
        let label = code.instructions.new_label();
        // Slot 1 is read back through `iinc`
        code.instructions.push_back(Instruction::IConst1);
        code.instructions.push_back(Instruction::IStore(1));
        code.instructions.push_back(Instruction::IInc(1, 1));
        // Slot 2 is dead, but its value is computed across a label
        code.instructions.push_back(Instruction::IConst1);
        code.instructions.push_back(Insn::Label(label));
        code.instructions.push_back(Instruction::IConst2);
        code.instructions.push_back(Instruction::IAdd);
        code.instructions.push_back(Instruction::IStore(2));
        code.instructions.push_back(BranchInstruction::Return);

        let before = contents(&code);
        assert_eq!(remove_dead_stores(&mut code), 0);
        assert_eq!(contents(&code), before);
    }

    #[test]
    fn keeps_runs_that_are_too_long() {
        let mut code = Code::new();
        code.instructions.push_back(Instruction::ILoad(0));
        for _ in 0..4 {
            code.instructions.push_back(Instruction::IConst1);
            code.instructions.push_back(Instruction::IAdd);
        }
        code.instructions.push_back(Instruction::IStore(1));
        code.instructions.push_back(BranchInstruction::Return);

        assert_eq!(remove_dead_stores(&mut code), 0);
        assert_eq!(code.instructions.len(), 11);
    }
}
