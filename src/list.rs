use crate::{
    arena::Arena,
    constant::{Word, MAP_ENTRY_BYTES, NEXT_OFFSET, PREV_OFFSET, PROG_ENTRY_BYTES},
    data::{SyspageError, SyspageErrorCode},
};

// Circular doubly linked lists living inside the arena. Entries of every list
// start with their `next` and `prev` words, a head of 0 is the empty list.

fn next_of(arena: &Arena, node: Word) -> Result<Word, SyspageError> {
    arena.read_word(node.wrapping_add(NEXT_OFFSET as Word))
}

fn prev_of(arena: &Arena, node: Word) -> Result<Word, SyspageError> {
    arena.read_word(node.wrapping_add(PREV_OFFSET as Word))
}

fn set_next(arena: &mut Arena, node: Word, next: Word) -> Result<(), SyspageError> {
    arena.write_word(node.wrapping_add(NEXT_OFFSET as Word), next)
}

fn set_prev(arena: &mut Arena, node: Word, prev: Word) -> Result<(), SyspageError> {
    arena.write_word(node.wrapping_add(PREV_OFFSET as Word), prev)
}

/// Links `node` in front of `head`, i.e. at the tail. Returns the (possibly new) head.
pub fn insert_tail(arena: &mut Arena, head: Word, node: Word) -> Result<Word, SyspageError> {
    if head == 0 {
        set_next(arena, node, node)?;
        set_prev(arena, node, node)?;
        return Ok(node);
    }
    let tail = prev_of(arena, head)?;
    set_prev(arena, node, tail)?;
    set_next(arena, tail, node)?;
    set_next(arena, node, head)?;
    set_prev(arena, head, node)?;
    Ok(head)
}

pub fn tail(arena: &Arena, head: Word) -> Result<Option<Word>, SyspageError> {
    if head == 0 {
        return Ok(None);
    }
    prev_of(arena, head).map(Some)
}

pub fn iter(arena: &Arena, head: Word) -> ListIter<'_> {
    ListIter {
        arena,
        head,
        next: if head == 0 { None } else { Some(head) },
        // no list can hold more entries than fit in the arena
        budget: arena.size() / MAP_ENTRY_BYTES.min(PROG_ENTRY_BYTES) + 1,
    }
}

/// Walks the list from its head, yielding entry addresses.
pub struct ListIter<'a> {
    arena: &'a Arena,
    head: Word,
    next: Option<Word>,
    budget: usize,
}

impl Iterator for ListIter<'_> {
    type Item = Result<Word, SyspageError>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        if self.budget == 0 {
            self.next = None;
            return Some(Err(SyspageError::new(
                SyspageErrorCode::CorruptList,
                format!("list at [ {:#010x} ] never returns to its head", self.head),
            )));
        }
        self.budget -= 1;
        match next_of(self.arena, node) {
            Ok(next) => {
                self.next = if next == self.head { None } else { Some(next) };
                Some(Ok(node))
            }
            Err(err) => {
                self.next = None;
                Some(Err(err))
            }
        }
    }
}

/// Validates the links of the whole list, returning its length.
pub fn check(arena: &Arena, head: Word) -> Result<usize, SyspageError> {
    let mut count = 0;
    for node in iter(arena, head) {
        let node = node?;
        let next = next_of(arena, node)?;
        if prev_of(arena, next)? != node {
            return Err(SyspageError::new(
                SyspageErrorCode::CorruptList,
                format!("entry [ {next:#010x} ] does not link back to [ {node:#010x} ]"),
            ));
        }
        count += 1;
    }
    if let Some(tail) = tail(arena, head)? {
        if next_of(arena, tail)? != head {
            return Err(SyspageError::new(
                SyspageErrorCode::CorruptList,
                format!("tail [ {tail:#010x} ] does not link to head [ {head:#010x} ]"),
            ));
        }
    }
    Ok(count)
}
