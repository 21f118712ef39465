use super::{BranchInstruction, Code, Insn, InsnId, Label};
use crate::jvm::{BinaryName, Error};
use std::collections::HashMap;

/// Index-based view of a method body for data-flow analyses
///
/// Entries (labels included) are numbered by their position in the list. Falling through from
/// entry `i` means continuing at `i + 1`.
pub struct FlowGraph<'a> {
    nodes: Vec<(InsnId, &'a Insn)>,
    labels: HashMap<Label, usize>,
    handlers: Vec<HandlerRange<'a>>,
}

/// Exception handler with its range resolved to entry positions
pub struct HandlerRange<'a> {
    pub start: usize,
    pub end: usize,
    pub handler: usize,
    pub catch_type: Option<&'a BinaryName>,
}

impl<'a> FlowGraph<'a> {
    pub fn new(code: &'a Code) -> Result<FlowGraph<'a>, Error> {
        let nodes: Vec<(InsnId, &'a Insn)> = code.instructions.iter().collect();

        let mut labels = HashMap::new();
        for (idx, (_, insn)) in nodes.iter().enumerate() {
            if let Insn::Label(label) = insn {
                if labels.insert(*label, idx).is_some() {
                    return Err(Error::DuplicateLabel(*label));
                }
            }
        }

        let position = |label: &Label| labels.get(label).copied().ok_or(Error::UnplacedLabel(*label));
        let handlers = code
            .handlers
            .iter()
            .map(|handler| {
                Ok(HandlerRange {
                    start: position(&handler.start)?,
                    end: position(&handler.end)?,
                    handler: position(&handler.handler)?,
                    catch_type: handler.catch_type.as_ref(),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(FlowGraph {
            nodes,
            labels,
            handlers,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn insn(&self, idx: usize) -> &'a Insn {
        self.nodes[idx].1
    }

    pub fn id(&self, idx: usize) -> InsnId {
        self.nodes[idx].0
    }

    pub fn label_position(&self, label: Label) -> Result<usize, Error> {
        self.labels
            .get(&label)
            .copied()
            .ok_or(Error::UnplacedLabel(label))
    }

    /// Positions of every explicit jump target of a branch
    pub fn branch_targets(&self, branch: &BranchInstruction<Label>) -> Result<Vec<usize>, Error> {
        branch
            .jump_targets()
            .into_iter()
            .map(|label| self.label_position(label))
            .collect()
    }

    pub fn handlers(&self) -> &[HandlerRange<'a>] {
        &self.handlers
    }

    /// Handler entry points for exceptions thrown at position `idx`
    pub fn handlers_covering(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.handlers
            .iter()
            .filter(move |range| range.start <= idx && idx < range.end)
            .map(|range| range.handler)
    }
}
