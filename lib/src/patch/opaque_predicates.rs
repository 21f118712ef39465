//! Remove branches on the sentinel field
//!
//! The obfuscator guards random jumps with a static `boolean` which is never assigned, so the
//! condition always comes out the same way. The field is either branched on directly:
//!
//! ```text
//! getstatic client.ob : Z
//! ifeq L9
//! ```
//!
//! or first copied into a local (always the last one), which is then branched on:
//!
//! ```text
//! getstatic client.ob : Z
//! istore 2
//! ...
//! iload 2
//! ifeq L10
//! ```
//!
//! Either way the branch becomes a `goto` and the loads go away. Labels are left in place.

use super::{ClassMap, PatchContext};
use crate::jvm::code::{BranchInstruction, Code, FieldRef, Insn, InsnId, Instruction, Label};
use crate::jvm::model::Method;
use crate::jvm::RenderDescriptor;
use log::debug;
use std::collections::BTreeSet;

pub const PASS: &str = "OpaquePredicates";

enum Edit {
    Remove(InsnId),
    Goto(InsnId, Label),
}

pub fn remove_opaque_predicates(classes: &mut ClassMap, ctx: &mut PatchContext) {
    let sentinel = ctx.settings.sentinel.clone();
    for class in classes.values_mut() {
        for method in &mut class.methods {
            let problems = simplify_method(method, &sentinel);
            for problem in problems {
                let message = format!(
                    "{} in {}.{}{}",
                    problem,
                    class.name,
                    method.name,
                    method.descriptor.render()
                );
                ctx.warn(PASS, message);
            }
        }
    }
}

/// Rewrite every sentinel branch in a method, returning descriptions of the loads left alone
fn simplify_method(method: &mut Method, sentinel: &FieldRef) -> Vec<String> {
    match &mut method.code {
        Some(code) => simplify_code(code, sentinel),
        None => vec![],
    }
}

/// Rewrite every sentinel branch in a method body, returning descriptions of the loads left
/// alone
///
/// If a sentinel is copied into a local in a way that is not fully understood, nothing in the
/// body is changed.
pub fn simplify_code(code: &mut Code, sentinel: &FieldRef) -> Vec<String> {
    let list = &code.instructions;
    let mut problems = vec![];
    let mut edits = vec![];
    let mut slots = BTreeSet::new();

    for (id, insn) in list.iter() {
        if !is_sentinel_load(insn, sentinel) {
            continue;
        }
        match list.next(id).map(|next| (next, &list[next])) {
            Some((next, Insn::Branch(BranchInstruction::If(_, target)))) => {
                edits.push(Edit::Remove(id));
                edits.push(Edit::Goto(next, *target));
            }
            Some((_, Insn::Instruction(Instruction::IStore(slot)))) => {
                slots.insert(*slot);
            }
            Some((_, other)) => {
                problems.push(format!("sentinel load followed by {}", other.to_string().trim()))
            }
            None => problems.push(String::from("sentinel load at the end of the code")),
        }
    }

    for slot in slots {
        match local_copy_edits(code, sentinel, slot) {
            Ok(local_edits) => edits.extend(local_edits),
            Err(problem) => {
                problems.push(format!("{}, leaving the method untouched", problem));
                return problems;
            }
        }
    }

    let list = &mut code.instructions;
    let mut gotos = 0;
    for edit in edits {
        match edit {
            Edit::Remove(id) => {
                list.remove(id);
            }
            Edit::Goto(id, target) => {
                list.replace(id, BranchInstruction::Goto(target));
                gotos += 1;
            }
        }
    }
    if gotos > 0 {
        debug!("Turned {} sentinel branches into gotos", gotos);
    }
    problems
}

/// Edits removing a local which holds a copy of the sentinel
///
/// Every store to the local must come straight from the sentinel and every load must feed
/// straight into a single-operand conditional.
fn local_copy_edits(code: &Code, sentinel: &FieldRef, slot: u16) -> Result<Vec<Edit>, String> {
    let list = &code.instructions;
    let mut edits = vec![];
    for (id, insn) in list.iter() {
        match insn {
            Insn::Instruction(Instruction::IStore(s)) if *s == slot => {
                match list.prev(id) {
                    Some(prev) if is_sentinel_load(&list[prev], sentinel) => {
                        edits.push(Edit::Remove(prev));
                        edits.push(Edit::Remove(id));
                    }
                    _ => return Err(format!("local {} is assigned something else", slot)),
                }
            }
            Insn::Instruction(Instruction::ILoad(s)) if *s == slot => {
                match list.next(id).map(|next| (next, &list[next])) {
                    Some((next, Insn::Branch(BranchInstruction::If(_, target)))) => {
                        edits.push(Edit::Remove(id));
                        edits.push(Edit::Goto(next, *target));
                    }
                    _ => return Err(format!("local {} is used outside a branch", slot)),
                }
            }
            Insn::Instruction(Instruction::IInc(s, _)) if *s == slot => {
                return Err(format!("local {} is incremented", slot))
            }
            _ => (),
        }
    }
    Ok(edits)
}

fn is_sentinel_load(insn: &Insn, sentinel: &FieldRef) -> bool {
    matches!(insn, Insn::Instruction(Instruction::GetStatic(field)) if field == sentinel)
}
