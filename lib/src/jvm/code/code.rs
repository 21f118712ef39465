use super::{BranchInstruction, FlowGraph, Insn, InsnList, Instruction, Label};
use crate::jvm::{BinaryName, Error};

/// Body of a method
///
/// The maximum stack depth and the number of locals are not stored: both are derived from the
/// instructions whenever the method is encoded.
#[derive(Clone, Debug, Default)]
pub struct Code {
    pub instructions: InsnList,
    pub handlers: Vec<ExceptionHandler>,
}

/// Entry of a method's exception table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Start of the protected range (inclusive)
    pub start: Label,

    /// End of the protected range (exclusive)
    pub end: Label,

    /// Start of the handler code
    pub handler: Label,

    /// Exception caught (`None` catches everything, as for `finally`)
    pub catch_type: Option<BinaryName>,
}

impl Code {
    pub fn new() -> Code {
        Code::default()
    }

    /// Number of local variable slots needed
    ///
    /// This is the larger of the slots taken up by the parameters (`this` included) and the
    /// highest slot touched by any instruction, reachable or not.
    pub fn max_locals(&self, parameter_slots: usize) -> usize {
        self.instructions
            .iter()
            .filter_map(|(_, insn)| match insn {
                Insn::Instruction(instruction) => instruction.local_slot(),
                _ => None,
            })
            .map(|(slot, width)| slot as usize + width)
            .fold(parameter_slots, usize::max)
    }

    /// Maximum depth of the operand stack (in slots) over every reachable path
    ///
    /// Exception handlers start with just the exception on the stack. When two paths reach an
    /// instruction with different depths, the first depth found wins.
    pub fn max_stack(&self) -> Result<usize, Error> {
        let graph = FlowGraph::new(self)?;
        let len = graph.len();
        let mut depths: Vec<Option<usize>> = vec![None; len];
        let mut worklist: Vec<usize> = vec![];
        let mut max = 0;

        let visit = |idx: usize,
                     depth: usize,
                     depths: &mut Vec<Option<usize>>,
                     worklist: &mut Vec<usize>,
                     max: &mut usize| {
            if idx < len && depths[idx].is_none() {
                depths[idx] = Some(depth);
                worklist.push(idx);
                *max = usize::max(*max, depth);
            }
        };

        visit(0, 0, &mut depths, &mut worklist, &mut max);
        while let Some(idx) = worklist.pop() {
            let depth = depths[idx].unwrap_or(0);

            for handler in graph.handlers_covering(idx) {
                visit(handler, 1, &mut depths, &mut worklist, &mut max);
            }

            match graph.insn(idx) {
                Insn::Label(_) => visit(idx + 1, depth, &mut depths, &mut worklist, &mut max),
                Insn::Instruction(instruction) => {
                    let (pops, pushes) = instruction.stack_effect();
                    let after = depth.saturating_sub(pops) + pushes;
                    max = usize::max(max, after);
                    if !matches!(instruction, Instruction::Ret(_)) {
                        visit(idx + 1, after, &mut depths, &mut worklist, &mut max);
                    }
                }
                Insn::Branch(branch) => {
                    let after = depth.saturating_sub(branch.stack_pops());
                    let into_target = match branch {
                        BranchInstruction::Jsr(_) => after + 1,
                        _ => after,
                    };
                    for target in graph.branch_targets(branch)? {
                        visit(target, into_target, &mut depths, &mut worklist, &mut max);
                    }
                    if branch.falls_through() {
                        visit(idx + 1, after, &mut depths, &mut worklist, &mut max);
                    }
                }
            }
        }

        Ok(max)
    }
}
