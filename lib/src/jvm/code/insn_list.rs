use super::{Insn, Label};
use std::ops::Index;

/// Stable handle to an entry of an [`InsnList`]
///
/// Handles stay valid across insertions and removals of other entries. Once the entry itself is
/// removed, the handle no longer resolves to anything.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct InsnId(usize);

#[derive(Clone, Debug)]
struct Node {
    insn: Option<Insn>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Ordered, editable sequence of instructions and labels making up a method body
///
/// Nodes live in an arena and are linked in both directions, so passes can walk forwards or
/// backwards from any instruction and rewrite the list around it in constant time.
///
/// Labels may be added but not removed or replaced, since branches and exception handlers may
/// still refer to them. The only way to drop labels is [`InsnList::clear`].
#[derive(Clone, Debug, Default)]
pub struct InsnList {
    nodes: Vec<Node>,
    first: Option<usize>,
    last: Option<usize>,
    len: usize,
    next_label: Option<Label>,
}

impl InsnList {
    pub fn new() -> InsnList {
        InsnList::default()
    }

    /// Number of live entries (labels included)
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocate a label which is fresh for this list
    ///
    /// The label is not placed until it is inserted as an [`Insn::Label`].
    pub fn new_label(&mut self) -> Label {
        let label = self.next_label.unwrap_or(Label::START);
        self.next_label = Some(label.next());
        label
    }

    pub fn first(&self) -> Option<InsnId> {
        self.first.map(InsnId)
    }

    pub fn last(&self) -> Option<InsnId> {
        self.last.map(InsnId)
    }

    pub fn next(&self, id: InsnId) -> Option<InsnId> {
        self.live(id).and_then(|node| node.next).map(InsnId)
    }

    pub fn prev(&self, id: InsnId) -> Option<InsnId> {
        self.live(id).and_then(|node| node.prev).map(InsnId)
    }

    /// Next entry which is not a label
    pub fn next_insn(&self, id: InsnId) -> Option<InsnId> {
        let mut cursor = self.next(id);
        while let Some(next) = cursor {
            if !self[next].is_label() {
                return Some(next);
            }
            cursor = self.next(next);
        }
        None
    }

    /// Previous entry which is not a label
    pub fn prev_insn(&self, id: InsnId) -> Option<InsnId> {
        let mut cursor = self.prev(id);
        while let Some(prev) = cursor {
            if !self[prev].is_label() {
                return Some(prev);
            }
            cursor = self.prev(prev);
        }
        None
    }

    pub fn get(&self, id: InsnId) -> Option<&Insn> {
        self.nodes.get(id.0).and_then(|node| node.insn.as_ref())
    }

    fn live(&self, id: InsnId) -> Option<&Node> {
        self.nodes.get(id.0).filter(|node| node.insn.is_some())
    }

    fn alloc(&mut self, insn: Insn, prev: Option<usize>, next: Option<usize>) -> usize {
        if let Insn::Label(label) = &insn {
            // Keep fresh labels fresh, even if this one was made elsewhere
            if self.next_label.map_or(true, |next| next <= *label) {
                self.next_label = Some(label.next());
            }
        }
        let idx = self.nodes.len();
        self.nodes.push(Node {
            insn: Some(insn),
            prev,
            next,
        });
        match prev {
            Some(p) => self.nodes[p].next = Some(idx),
            None => self.first = Some(idx),
        }
        match next {
            Some(n) => self.nodes[n].prev = Some(idx),
            None => self.last = Some(idx),
        }
        self.len += 1;
        idx
    }

    /// Append an entry to the end of the list
    pub fn push_back(&mut self, insn: impl Into<Insn>) -> InsnId {
        let last = self.last;
        InsnId(self.alloc(insn.into(), last, None))
    }

    /// Insert an entry right before `anchor`, returning `None` if the anchor was removed
    pub fn insert_before(&mut self, anchor: InsnId, insn: impl Into<Insn>) -> Option<InsnId> {
        let prev = self.live(anchor)?.prev;
        Some(InsnId(self.alloc(insn.into(), prev, Some(anchor.0))))
    }

    /// Insert an entry right after `anchor`, returning `None` if the anchor was removed
    pub fn insert_after(&mut self, anchor: InsnId, insn: impl Into<Insn>) -> Option<InsnId> {
        let next = self.live(anchor)?.next;
        Some(InsnId(self.alloc(insn.into(), Some(anchor.0), next)))
    }

    /// Unlink an instruction from the list
    ///
    /// Returns `None` without changing anything if the entry is a label or was already removed.
    pub fn remove(&mut self, id: InsnId) -> Option<Insn> {
        let node = self.nodes.get_mut(id.0)?;
        if node.insn.as_ref()?.is_label() {
            return None;
        }
        let insn = node.insn.take();
        let (prev, next) = (node.prev.take(), node.next.take());
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.first = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.last = prev,
        }
        self.len -= 1;
        insn
    }

    /// Swap out an instruction for another one, returning the old instruction
    ///
    /// Labels can neither be replaced nor introduced this way, so `None` is returned (and nothing
    /// changes) if either the existing entry or the replacement is a label.
    pub fn replace(&mut self, id: InsnId, insn: impl Into<Insn>) -> Option<Insn> {
        let insn = insn.into();
        if insn.is_label() {
            return None;
        }
        let slot = self.nodes.get_mut(id.0)?.insn.as_mut()?;
        if slot.is_label() {
            return None;
        }
        Some(std::mem::replace(slot, insn))
    }

    /// Remove every entry, labels included
    ///
    /// Handles obtained before clearing must not be used afterwards.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.first = None;
        self.last = None;
        self.len = 0;
    }

    /// Walk the list in order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.first,
        }
    }

    /// Handles of every entry, in order
    ///
    /// Handy for walking the list while editing it.
    pub fn ids(&self) -> Vec<InsnId> {
        self.iter().map(|(id, _)| id).collect()
    }
}

impl Index<InsnId> for InsnList {
    type Output = Insn;

    /// Panics if the entry was removed
    fn index(&self, id: InsnId) -> &Insn {
        match self.get(id) {
            Some(insn) => insn,
            None => panic!("instruction {:?} was removed", id),
        }
    }
}

impl<I: Into<Insn>> FromIterator<I> for InsnList {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        let mut list = InsnList::new();
        for insn in iter {
            list.push_back(insn);
        }
        list
    }
}

pub struct Iter<'a> {
    list: &'a InsnList,
    cursor: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (InsnId, &'a Insn);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = &self.list.nodes[idx];
        self.cursor = node.next;
        node.insn.as_ref().map(|insn| (InsnId(idx), insn))
    }
}
