use super::{Frame, VerificationType};
use crate::jvm::code::{BranchInstruction, FlowGraph, Insn, Instruction};
use crate::jvm::model::{Class, Method};
use crate::jvm::{Error, Name, RenderDescriptor, VerifierErrorKind};
use log::error;

/// Type-check the body of a method
///
/// Methods without code trivially pass. On failure, the full listing of the method is logged
/// before the error is returned.
pub fn verify_method(class: &Class, method: &Method) -> Result<(), Error> {
    let code = match &method.code {
        Some(code) => code,
        None => return Ok(()),
    };
    let graph = FlowGraph::new(code)?;

    let fail = |index: usize, kind: VerifierErrorKind| -> Error {
        let listing: String = (0..graph.len())
            .map(|idx| format!("{:>5}: {}\n", idx, graph.insn(idx)))
            .collect();
        let descriptor = method.descriptor.render();
        error!(
            "Verification of {}.{}{} failed at {}: {}\n{}",
            class.name, method.name, descriptor, index, kind, listing
        );
        Error::VerifierError {
            class: class.name.as_str().to_owned(),
            method: method.name.as_str().to_owned(),
            descriptor,
            index,
            instruction: if index < graph.len() {
                graph.insn(index).to_string().trim().to_owned()
            } else {
                String::from("<end of code>")
            },
            kind,
            listing,
        }
    };

    let max_locals = code.max_locals(method.parameter_slots());
    let entry = Frame::entry(method.is_static(), &method.descriptor.parameters, max_locals);
    let mut frames: Vec<Option<Frame>> = vec![None; graph.len()];
    let mut worklist: Vec<usize> = vec![];

    flow_into(0, &entry, &mut frames, &mut worklist).map_err(|kind| fail(0, kind))?;
    while let Some(idx) = worklist.pop() {
        let mut frame = match &frames[idx] {
            Some(frame) => frame.clone(),
            None => continue,
        };

        for handler in graph.handlers_covering(idx) {
            flow_into(handler, &frame.for_handler(), &mut frames, &mut worklist)
                .map_err(|kind| fail(idx, kind))?;
        }

        match graph.insn(idx) {
            Insn::Label(_) => {
                flow_into(idx + 1, &frame, &mut frames, &mut worklist)
                    .map_err(|kind| fail(idx, kind))?;
            }
            Insn::Instruction(instruction) => {
                frame
                    .verify_instruction(instruction)
                    .map_err(|kind| fail(idx, kind))?;
                if !matches!(instruction, Instruction::Ret(_)) {
                    flow_into(idx + 1, &frame, &mut frames, &mut worklist)
                        .map_err(|kind| fail(idx, kind))?;
                }
            }
            Insn::Branch(branch) => {
                frame
                    .verify_branch_instruction(branch, &method.descriptor.return_type)
                    .map_err(|kind| fail(idx, kind))?;
                let mut into_target = frame.clone();
                if let BranchInstruction::Jsr(_) = branch {
                    into_target.stack.push(VerificationType::ReturnAddress);
                }
                for target in graph.branch_targets(branch)? {
                    flow_into(target, &into_target, &mut frames, &mut worklist)
                        .map_err(|kind| fail(idx, kind))?;
                }
                if branch.falls_through() {
                    flow_into(idx + 1, &frame, &mut frames, &mut worklist)
                        .map_err(|kind| fail(idx, kind))?;
                }
            }
        }
    }

    Ok(())
}

/// Record `frame` flowing into `target`, queueing the target if its frame changed
fn flow_into(
    target: usize,
    frame: &Frame,
    frames: &mut [Option<Frame>],
    worklist: &mut Vec<usize>,
) -> Result<(), VerifierErrorKind> {
    if target >= frames.len() {
        return Err(VerifierErrorKind::FallsOffEnd);
    }
    let changed = match frames[target].as_mut() {
        Some(existing) => existing.merge(frame)?,
        None => {
            frames[target] = Some(frame.clone());
            true
        }
    };
    if changed && !worklist.contains(&target) {
        worklist.push(target);
    }
    Ok(())
}
