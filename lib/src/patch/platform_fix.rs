//! Fix right clicks on newer JDKs
//!
//! The client tells right clicks apart using `MouseEvent.isMetaDown()`, which stopped reporting
//! the right button on JDK 9. `SwingUtilities.isRightMouseButton(MouseEvent)` takes the event as
//! its only argument, so swapping the virtual call for the static one leaves the stack as is.

use super::{ClassMap, PatchContext, PlatformFix};
use crate::jvm::code::{Code, Insn, Instruction, InvokeType};
use log::info;

pub const PASS: &str = "PlatformFix";

pub fn fix_platform(classes: &mut ClassMap, ctx: &mut PatchContext) {
    let fix = &ctx.settings.platform_fix;
    let mut patched = 0;
    for class in classes.values_mut() {
        let handler = class
            .methods
            .iter_mut()
            .find(|method| method.name == fix.method);
        if let Some(code) = handler.and_then(|method| method.code.as_mut()) {
            let replaced = replace_calls(code, fix);
            if replaced > 0 {
                info!("Replaced {} calls to {} in {}", replaced, fix.call, class.name);
                patched += 1;
            }
        }
    }

    if patched == 0 {
        let message = format!("no {} method calling {} was found", fix.method, fix.call);
        ctx.warn(PASS, message);
    }
}

/// Swap every matching call in a method body, returning how many were swapped
pub fn replace_calls(code: &mut Code, fix: &PlatformFix) -> usize {
    let mut replaced = 0;
    for id in code.instructions.ids() {
        let matches = match &code.instructions[id] {
            Insn::Instruction(Instruction::Invoke(InvokeType::Virtual, method))
            | Insn::Instruction(Instruction::Invoke(InvokeType::Interface, method)) => {
                method.name == fix.call && method.descriptor == fix.call_descriptor
            }
            _ => false,
        };
        if matches {
            let replacement = Instruction::Invoke(InvokeType::Static, fix.replacement.clone());
            code.instructions.replace(id, replacement);
            replaced += 1;
        }
    }
    replaced
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{BranchInstruction, MethodRef};
    use crate::jvm::{BinaryName, FieldType, MethodDescriptor, Name, RefType, UnqualifiedName};

    fn is_meta_down() -> Instruction {
        Instruction::Invoke(
            InvokeType::Virtual,
            MethodRef {
                owner: RefType::Object(BinaryName::MOUSEEVENT),
                name: UnqualifiedName::ISMETADOWN,
                descriptor: MethodDescriptor {
                    parameters: vec![],
                    return_type: Some(FieldType::boolean()),
                },
                is_interface: false,
            },
        )
    }

    #[test]
    fn swaps_the_call() {
        let fix = PlatformFix::default();
        let mut code = Code::new();
        code.instructions.push_back(Instruction::ALoad(1));
        code.instructions.push_back(is_meta_down());
        code.instructions.push_back(Instruction::Pop);
        code.instructions.push_back(Instruction::ALoad(1));
        code.instructions.push_back(Instruction::Invoke(
            InvokeType::Virtual,
            MethodRef {
                owner: RefType::Object(BinaryName::MOUSEEVENT),
                name: UnqualifiedName::from_str("getX").unwrap(),
                descriptor: MethodDescriptor {
                    parameters: vec![],
                    return_type: Some(FieldType::int()),
                },
                is_interface: false,
            },
        ));
        code.instructions.push_back(Instruction::Pop);
        code.instructions.push_back(BranchInstruction::Return);

        assert_eq!(replace_calls(&mut code, &fix), 1);
        let calls: Vec<_> = code
            .instructions
            .iter()
            .filter_map(|(_, insn)| match insn {
                Insn::Instruction(Instruction::Invoke(typ, method)) => Some((*typ, method.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(calls[0], (InvokeType::Static, fix.replacement.clone()));
        assert_eq!(calls[1].1.name.as_str(), "getX");

        // Stack effect is unchanged
        assert_eq!(
            is_meta_down().stack_effect(),
            Instruction::Invoke(InvokeType::Static, fix.replacement).stack_effect()
        );
    }
}
