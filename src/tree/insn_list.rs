use crate::tree::InsnNode;
use crate::{Api, ClassFileResult, MethodVisitor};
use std::cell::OnceCell;
use std::fmt::{Debug, Formatter};
use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ARENA_ID: AtomicU64 = AtomicU64::new(0);

/// A handle to a node of an [`InsnList`].
///
/// A handle stays valid until its node is removed, including when the node is spliced into
/// another list, where it then designates the same node. Using a handle that is not valid for a
/// list panics.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct InsnId {
    arena: u64,
    slot: u32,
    generation: u32,
}

impl Debug for InsnId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}.{}.{}", self.arena, self.slot, self.generation)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    node: InsnNode,
    prev: Option<InsnId>,
    next: Option<InsnId>,
}

#[derive(Debug)]
struct Entry {
    generation: u32,
    slot: Option<Slot>,
}

/// Node storage. A vacated entry goes on the free list and gets a new generation, so handles
/// to the removed node stop matching it.
#[derive(Debug)]
struct Arena {
    id: u64,
    entries: Vec<Entry>,
    free: Vec<u32>,
}

impl Arena {
    fn new() -> Arena {
        Arena {
            id: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
            entries: Vec::new(),
            free: Vec::new(),
        }
    }

    fn entry(&self, id: InsnId) -> Option<&Entry> {
        self.entries
            .get(id.slot as usize)
            .filter(|entry| entry.generation == id.generation)
    }

    fn get(&self, id: InsnId) -> Option<&Slot> {
        self.entry(id).and_then(|entry| entry.slot.as_ref())
    }

    fn get_mut(&mut self, id: InsnId) -> Option<&mut Slot> {
        self.entries
            .get_mut(id.slot as usize)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.slot.as_mut())
    }

    fn allocate(&mut self, slot: Slot) -> InsnId {
        let index = match self.free.pop() {
            Some(index) => {
                self.entries[index as usize].slot = Some(slot);
                index
            }
            None => {
                let index = u32::try_from(self.entries.len())
                    .unwrap_or_else(|_| panic!("instruction arena {} is full", self.id));
                self.entries.push(Entry {
                    generation: 0,
                    slot: Some(slot),
                });
                index
            }
        };
        InsnId {
            arena: self.id,
            slot: index,
            generation: self.entries[index as usize].generation,
        }
    }

    fn release(&mut self, id: InsnId) -> Option<Slot> {
        let entry = self
            .entries
            .get_mut(id.slot as usize)
            .filter(|entry| entry.generation == id.generation)?;
        let slot = entry.slot.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.slot);
        Some(slot)
    }
}

/// The instructions of a method body, as a doubly linked list stored in arenas.
///
/// Insertion and removal are O(1) given an [`InsnId`], and removed slots are reused. Splicing
/// another list in moves its arenas over and relinks its ends, so it doesn't touch the moved
/// nodes. Positional access goes through a cache of the node order that is rebuilt on the first
/// positional access after a change.
pub struct InsnList {
    /// Never empty. New nodes go to the first arena with a free slot, or to the first arena.
    arenas: Vec<Arena>,
    first: Option<InsnId>,
    last: Option<InsnId>,
    len: usize,
    cache: OnceCell<Vec<InsnId>>,
}

impl InsnList {
    pub fn new() -> InsnList {
        InsnList {
            arenas: vec![Arena::new()],
            first: None,
            last: None,
            len: 0,
            cache: OnceCell::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn arena_mut(&mut self, id: InsnId) -> Option<&mut Arena> {
        self.arenas.iter_mut().find(|arena| arena.id == id.arena)
    }

    fn try_slot(&self, id: InsnId) -> Option<&Slot> {
        self.arenas
            .iter()
            .find(|arena| arena.id == id.arena)
            .and_then(|arena| arena.get(id))
    }

    fn slot(&self, id: InsnId) -> &Slot {
        match self.try_slot(id) {
            Some(slot) => slot,
            None => panic!("instruction {id:?} is not in this list"),
        }
    }

    fn slot_mut(&mut self, id: InsnId) -> &mut Slot {
        match self.arena_mut(id).and_then(|arena| arena.get_mut(id)) {
            Some(slot) => slot,
            None => panic!("instruction {id:?} is not in this list"),
        }
    }

    /// Whether `id` designates a node currently in this list.
    pub fn contains(&self, id: InsnId) -> bool {
        self.try_slot(id).is_some()
    }

    pub fn first(&self) -> Option<InsnId> {
        self.first
    }

    pub fn last(&self) -> Option<InsnId> {
        self.last
    }

    pub fn next(&self, id: InsnId) -> Option<InsnId> {
        self.slot(id).next
    }

    pub fn previous(&self, id: InsnId) -> Option<InsnId> {
        self.slot(id).prev
    }

    fn order(&self) -> &[InsnId] {
        self.cache.get_or_init(|| {
            let mut order = Vec::with_capacity(self.len);
            let mut current = self.first;
            while let Some(id) = current {
                order.push(id);
                current = self.slot(id).next;
            }
            order
        })
    }

    /// The node at `index`. Panics if `index` is out of range.
    pub fn get(&self, index: usize) -> InsnId {
        let order = self.order();
        assert!(
            index < order.len(),
            "index {index} out of range for instruction list of length {}",
            order.len()
        );
        order[index]
    }

    /// The position of `id` in the list.
    pub fn index_of(&self, id: InsnId) -> usize {
        self.slot(id);
        self.order()
            .iter()
            .position(|&other| other == id)
            .unwrap_or_default()
    }

    /// Points `prev` and `next` at `first` and `last`, which already point back at them.
    fn link(&mut self, first: InsnId, last: InsnId, prev: Option<InsnId>, next: Option<InsnId>) {
        match prev {
            Some(prev) => self.slot_mut(prev).next = Some(first),
            None => self.first = Some(first),
        }
        match next {
            Some(next) => self.slot_mut(next).prev = Some(last),
            None => self.last = Some(last),
        }
        self.cache.take();
    }

    fn insert_between(
        &mut self,
        node: InsnNode,
        prev: Option<InsnId>,
        next: Option<InsnId>,
    ) -> InsnId {
        let arena = self
            .arenas
            .iter()
            .position(|arena| !arena.free.is_empty())
            .unwrap_or(0);
        let id = self.arenas[arena].allocate(Slot { node, prev, next });
        self.link(id, id, prev, next);
        self.len += 1;
        id
    }

    /// Appends `node` at the end of the list.
    pub fn add(&mut self, node: impl Into<InsnNode>) -> InsnId {
        self.insert_between(node.into(), self.last, None)
    }

    /// Inserts `node` at the start of the list.
    pub fn insert(&mut self, node: impl Into<InsnNode>) -> InsnId {
        self.insert_between(node.into(), None, self.first)
    }

    pub fn insert_before(&mut self, anchor: InsnId, node: impl Into<InsnNode>) -> InsnId {
        let prev = self.slot(anchor).prev;
        self.insert_between(node.into(), prev, Some(anchor))
    }

    pub fn insert_after(&mut self, anchor: InsnId, node: impl Into<InsnNode>) -> InsnId {
        let next = self.slot(anchor).next;
        self.insert_between(node.into(), Some(anchor), next)
    }

    /// Unlinks the node and hands it back. `id` is invalid afterwards.
    pub fn remove(&mut self, id: InsnId) -> InsnNode {
        let slot = self.arena_mut(id).and_then(|arena| arena.release(id));
        let Some(Slot { node, prev, next }) = slot else {
            panic!("instruction {id:?} is not in this list");
        };
        match prev {
            Some(prev) => self.slot_mut(prev).next = next,
            None => self.first = next,
        }
        match next {
            Some(next) => self.slot_mut(next).prev = prev,
            None => self.last = prev,
        }
        self.len -= 1;
        self.cache.take();
        node
    }

    /// Puts `node` in place of the node designated by `id`, returning the old one. `id` now
    /// designates the new node.
    pub fn set(&mut self, id: InsnId, node: impl Into<InsnNode>) -> InsnNode {
        std::mem::replace(&mut self.slot_mut(id).node, node.into())
    }

    /// Removes every node. Handles obtained before are invalid afterwards.
    pub fn clear(&mut self) {
        self.arenas = vec![Arena::new()];
        self.first = None;
        self.last = None;
        self.len = 0;
        self.cache.take();
    }

    /// Moves every node of `other` to the end of this list, leaving `other` empty. Handles to the
    /// moved nodes now designate them in this list.
    pub fn append_list(&mut self, other: &mut InsnList) {
        self.splice(other, self.last, None);
    }

    /// Moves every node of `other` to the start of this list, leaving `other` empty.
    pub fn insert_list(&mut self, other: &mut InsnList) {
        self.splice(other, None, self.first);
    }

    pub fn insert_list_before(&mut self, anchor: InsnId, other: &mut InsnList) {
        let prev = self.slot(anchor).prev;
        self.splice(other, prev, Some(anchor));
    }

    pub fn insert_list_after(&mut self, anchor: InsnId, other: &mut InsnList) {
        let next = self.slot(anchor).next;
        self.splice(other, Some(anchor), next);
    }

    /// Takes over the arenas of `other` and links its ends in. Costs one step per arena of
    /// `other`, which is one unless `other` was itself spliced into.
    fn splice(&mut self, other: &mut InsnList, prev: Option<InsnId>, next: Option<InsnId>) {
        let (Some(head), Some(tail)) = (other.first, other.last) else {
            return;
        };
        self.arenas.append(&mut other.arenas);
        self.slot_mut(head).prev = prev;
        self.slot_mut(tail).next = next;
        self.link(head, tail, prev, next);
        self.len += other.len;
        other.clear();
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            front: self.first,
            back: self.last,
            remaining: self.len,
        }
    }

    /// A cursor starting before the first node.
    pub fn cursor(&mut self) -> Cursor<'_> {
        Cursor {
            list: self,
            current: None,
        }
    }

    /// Replays every node into `mv`.
    pub fn accept(&self, mv: &mut dyn MethodVisitor) -> ClassFileResult<()> {
        for (_, node) in self {
            node.accept(mv)?;
        }
        Ok(())
    }

    pub fn check(&self, api: Api) -> ClassFileResult<()> {
        for (_, node) in self {
            node.check(api)?;
        }
        Ok(())
    }
}

impl Default for InsnList {
    fn default() -> InsnList {
        InsnList::new()
    }
}

impl Clone for InsnList {
    /// The clone is a separate list: handles into `self` are not valid for it.
    fn clone(&self) -> InsnList {
        self.iter().map(|(_, node)| node.clone()).collect()
    }
}

impl Debug for InsnList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|(_, node)| &node.insn))
            .finish()
    }
}

impl PartialEq for InsnList {
    fn eq(&self, other: &InsnList) -> bool {
        self.len == other.len && self.iter().zip(other).all(|((_, a), (_, b))| a == b)
    }
}

impl Index<InsnId> for InsnList {
    type Output = InsnNode;

    fn index(&self, id: InsnId) -> &InsnNode {
        &self.slot(id).node
    }
}

impl IndexMut<InsnId> for InsnList {
    fn index_mut(&mut self, id: InsnId) -> &mut InsnNode {
        &mut self.slot_mut(id).node
    }
}

impl<'a> IntoIterator for &'a InsnList {
    type Item = (InsnId, &'a InsnNode);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl FromIterator<InsnNode> for InsnList {
    fn from_iter<T: IntoIterator<Item = InsnNode>>(iter: T) -> InsnList {
        let mut list = InsnList::new();
        for node in iter {
            list.add(node);
        }
        list
    }
}

#[derive(Debug, Clone)]
pub struct Iter<'a> {
    list: &'a InsnList,
    front: Option<InsnId>,
    back: Option<InsnId>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (InsnId, &'a InsnNode);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.front?;
        let slot = self.list.slot(id);
        self.front = slot.next;
        self.remaining -= 1;
        Some((id, &slot.node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.back?;
        let slot = self.list.slot(id);
        self.back = slot.prev;
        self.remaining -= 1;
        Some((id, &slot.node))
    }
}

impl ExactSizeIterator for Iter<'_> {}

/// A position in an [`InsnList`] that allows editing the list while walking it.
///
/// Besides the nodes, the cursor can sit on a "ghost" position between the last and the first
/// node. It starts there, so `move_next` goes to the first node and `move_prev` to the last.
#[derive(Debug)]
pub struct Cursor<'a> {
    list: &'a mut InsnList,
    current: Option<InsnId>,
}

impl Cursor<'_> {
    pub fn current(&self) -> Option<InsnId> {
        self.current
    }

    pub fn node(&self) -> Option<&InsnNode> {
        self.current.map(|id| &self.list[id])
    }

    pub fn node_mut(&mut self) -> Option<&mut InsnNode> {
        self.current.map(|id| &mut self.list[id])
    }

    pub fn move_next(&mut self) -> Option<InsnId> {
        self.current = match self.current {
            Some(id) => self.list.next(id),
            None => self.list.first(),
        };
        self.current
    }

    pub fn move_prev(&mut self) -> Option<InsnId> {
        self.current = match self.current {
            Some(id) => self.list.previous(id),
            None => self.list.last(),
        };
        self.current
    }

    /// Inserts before the current node, or at the end on the ghost position. The cursor doesn't
    /// move, so the new node is skipped by `move_next`.
    pub fn insert_before(&mut self, node: impl Into<InsnNode>) -> InsnId {
        match self.current {
            Some(id) => self.list.insert_before(id, node),
            None => self.list.add(node),
        }
    }

    /// Inserts after the current node, or at the start on the ghost position.
    pub fn insert_after(&mut self, node: impl Into<InsnNode>) -> InsnId {
        match self.current {
            Some(id) => self.list.insert_after(id, node),
            None => self.list.insert(node),
        }
    }

    /// Removes the current node and moves back to the previous one, so that `move_next` continues
    /// with the node that followed the removed one.
    pub fn remove_current(&mut self) -> Option<InsnNode> {
        let id = self.current?;
        self.current = self.list.previous(id);
        Some(self.list.remove(id))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tree::Insn;
    use crate::Opcode;

    fn opcodes(list: &InsnList) -> Vec<Opcode> {
        list.iter().filter_map(|(_, node)| node.opcode()).collect()
    }

    fn five() -> (InsnList, Vec<InsnId>) {
        let mut list = InsnList::new();
        let ids = [
            Opcode::Nop,
            Opcode::IConst0,
            Opcode::IConst1,
            Opcode::IConst2,
            Opcode::Return,
        ]
        .into_iter()
        .map(|opcode| list.add(opcode))
        .collect();
        (list, ids)
    }

    #[test]
    fn test_remove_middle() {
        let (mut list, ids) = five();
        assert_eq!(ids[2], list.get(2));
        let removed = list.remove(ids[2]);
        assert_eq!(Some(Opcode::IConst1), removed.opcode());
        assert_eq!(4, list.len());
        assert_eq!(ids[3], list.get(2));
        assert!(!list.contains(ids[2]));
        assert_eq!(3, list.index_of(ids[4]));
    }

    #[test]
    fn test_forward_and_backward_agree() {
        let (mut list, ids) = five();
        list.insert(Opcode::Pop);
        list.insert_after(ids[0], Opcode::Dup);
        list.insert_before(ids[4], Opcode::Swap);
        list.remove(ids[1]);
        let forward: Vec<_> = list.iter().map(|(id, _)| id).collect();
        let mut backward: Vec<_> = list.iter().rev().map(|(id, _)| id).collect();
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(list.len(), forward.len());
        for (i, id) in forward.iter().enumerate() {
            assert_eq!(*id, list.get(i));
        }
        assert_eq!(
            vec![
                Opcode::Pop,
                Opcode::Nop,
                Opcode::Dup,
                Opcode::IConst1,
                Opcode::IConst2,
                Opcode::Swap,
                Opcode::Return
            ],
            opcodes(&list)
        );
    }

    #[test]
    fn test_set_keeps_position() {
        let (mut list, ids) = five();
        let old = list.set(ids[1], Insn::Var {
            opcode: Opcode::ILoad,
            var_index: 0,
        });
        assert_eq!(Some(Opcode::IConst0), old.opcode());
        assert_eq!(Some(Opcode::ILoad), list[list.get(1)].opcode());
    }

    #[test]
    fn test_splice_empties_source() {
        let (mut list, ids) = five();
        let mut other = InsnList::new();
        other.add(Opcode::AConstNull);
        let throw = other.add(Opcode::AThrow);
        list.insert_list_after(ids[0], &mut other);
        assert!(other.is_empty());
        assert_eq!(7, list.len());
        assert_eq!(throw, list.get(2));
        assert_eq!(Some(Opcode::AThrow), list[throw].opcode());
        assert!(!other.contains(throw));
        // the emptied list stays usable
        other.add(Opcode::Nop);
        assert_eq!(1, other.len());
    }

    #[test]
    fn test_splice_at_either_end() {
        let (mut list, ids) = five();
        let mut head = InsnList::new();
        head.add(Opcode::AConstNull);
        let mut tail = InsnList::new();
        tail.add(Opcode::Pop);
        let mut middle = InsnList::new();
        middle.add(Opcode::Dup);
        let swap = middle.add(Opcode::Swap);
        list.insert_list(&mut head);
        list.append_list(&mut tail);
        list.insert_list_before(ids[4], &mut middle);
        assert_eq!(
            vec![
                Opcode::AConstNull,
                Opcode::Nop,
                Opcode::IConst0,
                Opcode::IConst1,
                Opcode::IConst2,
                Opcode::Dup,
                Opcode::Swap,
                Opcode::Return,
                Opcode::Pop
            ],
            opcodes(&list)
        );
        assert_eq!(Some(swap), list.previous(ids[4]));
        assert_eq!(9, list.iter().rev().count());
    }

    #[test]
    fn test_spliced_nodes_stay_editable() {
        let (mut list, ids) = five();
        let mut other = InsnList::new();
        let dup = other.add(Opcode::Dup);
        list.append_list(&mut other);
        list.remove(ids[0]);
        let pop = list.insert_after(dup, Opcode::Pop);
        list.remove(dup);
        assert_eq!(Some(pop), list.last());
        assert_eq!(Some(ids[4]), list.previous(pop));
        assert_eq!(5, list.len());
    }

    #[test]
    fn test_removed_slots_are_reused() {
        let (mut list, _) = five();
        for _ in 0..1000 {
            let id = list.add(Opcode::Nop);
            list.remove(id);
        }
        assert_eq!(5, list.len());
        let entries: usize = list.arenas.iter().map(|arena| arena.entries.len()).sum();
        assert_eq!(6, entries);
    }

    #[test]
    fn test_cursor_edits_while_walking() {
        let (mut list, _) = five();
        let mut cursor = list.cursor();
        while cursor.move_next().is_some() {
            match cursor.node().and_then(InsnNode::opcode) {
                Some(Opcode::IConst1) => {
                    cursor.remove_current();
                }
                Some(Opcode::Return) => {
                    cursor.insert_before(Opcode::Pop);
                }
                Some(Opcode::IConst2) => {
                    if let Some(node) = cursor.node_mut() {
                        node.insn = Insn::Simple(Opcode::IConst3);
                    }
                }
                _ => {}
            }
        }
        assert_eq!(
            vec![
                Opcode::Nop,
                Opcode::IConst0,
                Opcode::IConst3,
                Opcode::Pop,
                Opcode::Return
            ],
            opcodes(&list)
        );
    }

    #[test]
    #[should_panic(expected = "not in this list")]
    fn test_foreign_handle_panics() {
        let (mut list, _) = five();
        let (other, other_ids) = five();
        drop(other);
        list.remove(other_ids[0]);
    }

    #[test]
    #[should_panic(expected = "not in this list")]
    fn test_stale_handle_panics_after_reuse() {
        let (mut list, ids) = five();
        list.remove(ids[2]);
        let reused = list.add(Opcode::Pop);
        assert_eq!(ids[2].slot, reused.slot);
        assert!(!list.contains(ids[2]));
        list.set(ids[2], Opcode::Nop);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_get_out_of_range() {
        let (list, _) = five();
        list.get(5);
    }
}
