//! The name tree: an ordered index of encoded name-component sequences,
//! backing the FIB, PIT and Content Store with shared entries.
//!
//! Modeled as a left-child/right-sibling trie over fixed-size arena slots,
//! the same shape the embedded reference forwarder uses for its name tree
//! (there, a splay tree of siblings with a child pointer per node). A
//! `Vec`-backed arena with a `u16` free list gets the same worst-case
//! logarithmic-or-better lookup without requiring self-balancing, since
//! names here are capped at ten components.

use crate::error::Error;
use crate::name::Name;

/// Sentinel for "no entry", matching the reference forwarder's `NDN_INVALID_ID`.
pub const INVALID_ID: u16 = 0xFFFF;

#[derive(Debug, Clone)]
struct Node {
    /// Encoded bytes of this node's own name component (empty for the root).
    component: Vec<u8>,
    left_child: u16,
    right_sibling: u16,
    pub fib_id: u16,
    pub pit_id: u16,
    pub cs_id: u16,
}

impl Node {
    fn empty() -> Self {
        Self {
            component: Vec::new(),
            left_child: INVALID_ID,
            right_sibling: INVALID_ID,
            fib_id: INVALID_ID,
            pit_id: INVALID_ID,
            cs_id: INVALID_ID,
        }
    }

    fn is_unused(&self) -> bool {
        self.fib_id == INVALID_ID && self.pit_id == INVALID_ID && self.cs_id == INVALID_ID
    }
}

/// A fixed-capacity name tree. Free slots are tracked as a singly linked
/// list threaded through `right_sibling` of the freed nodes, rooted at
/// `free_head`, so insert/remove never reallocate.
pub struct NameTree {
    nodes: Vec<Node>,
    free_head: u16,
    root_children: u16,
}

impl NameTree {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity < INVALID_ID as usize, "name tree capacity too large");
        let mut nodes = Vec::with_capacity(capacity);
        for i in 0..capacity {
            let mut node = Node::empty();
            node.right_sibling = if i + 1 < capacity {
                (i + 1) as u16
            } else {
                INVALID_ID
            };
            nodes.push(node);
        }
        Self {
            nodes,
            free_head: if capacity == 0 { INVALID_ID } else { 0 },
            root_children: INVALID_ID,
        }
    }

    fn alloc(&mut self) -> Result<u16, Error> {
        if self.free_head == INVALID_ID {
            return Err(Error::NameTreeFull);
        }
        let id = self.free_head;
        self.free_head = self.nodes[id as usize].right_sibling;
        self.nodes[id as usize] = Node::empty();
        Ok(id)
    }

    fn free(&mut self, id: u16) {
        self.nodes[id as usize] = Node::empty();
        self.nodes[id as usize].right_sibling = self.free_head;
        self.free_head = id;
    }

    fn components(name: &Name) -> Vec<Vec<u8>> {
        name.components()
            .iter()
            .map(|c| {
                let mut bytes = Vec::with_capacity(1 + c.value().len());
                bytes.push(c.kind() as u8);
                bytes.extend_from_slice(c.value());
                bytes
            })
            .collect()
    }

    /// Finds the id of the node that exactly matches `name`'s full component
    /// sequence, inserting intermediate and terminal nodes as needed.
    pub fn find_or_insert(&mut self, name: &Name) -> Result<u16, Error> {
        let components = Self::components(name);
        if components.is_empty() {
            return Err(Error::InvalidNameFormat("empty name".into()));
        }

        // `parent` is `None` while we're still searching the root's
        // children list; `Some(id)` once we've descended past the root.
        let mut parent: Option<u16> = None;
        let mut current_node = INVALID_ID;

        for component in &components {
            let children_head = match parent {
                None => self.root_children,
                Some(p) => self.nodes[p as usize].left_child,
            };

            let mut found = INVALID_ID;
            let mut cursor = children_head;
            while cursor != INVALID_ID {
                if self.nodes[cursor as usize].component == *component {
                    found = cursor;
                    break;
                }
                cursor = self.nodes[cursor as usize].right_sibling;
            }

            if found == INVALID_ID {
                let new_id = self.alloc()?;
                self.nodes[new_id as usize].component = component.clone();
                self.nodes[new_id as usize].right_sibling = children_head;
                match parent {
                    None => self.root_children = new_id,
                    Some(p) => self.nodes[p as usize].left_child = new_id,
                }
                found = new_id;
            }

            parent = Some(found);
            current_node = found;
        }

        Ok(current_node)
    }

    /// Finds the id of the node matching `name` exactly, without inserting.
    pub fn find(&self, name: &Name) -> Option<u16> {
        let components = Self::components(name);
        let mut current = self.root_children;
        let mut found = INVALID_ID;

        for component in &components {
            found = INVALID_ID;
            let mut cursor = current;
            while cursor != INVALID_ID {
                if self.nodes[cursor as usize].component == *component {
                    found = cursor;
                    break;
                }
                cursor = self.nodes[cursor as usize].right_sibling;
            }
            if found == INVALID_ID {
                return None;
            }
            current = self.nodes[found as usize].left_child;
        }

        if components.is_empty() {
            None
        } else {
            Some(found)
        }
    }

    /// Finds the id of the deepest node along `name`'s path that carries an
    /// entry of `kind`, walking from the root down and remembering the last
    /// match. Used for FIB longest-prefix-match and CS prefix lookups.
    pub fn longest_prefix_match(&self, name: &Name, kind: EntryKind) -> Option<u16> {
        let components = Self::components(name);
        let mut current = self.root_children;
        let mut best = None;

        for component in &components {
            let mut found = INVALID_ID;
            let mut cursor = current;
            while cursor != INVALID_ID {
                if self.nodes[cursor as usize].component == *component {
                    found = cursor;
                    break;
                }
                cursor = self.nodes[cursor as usize].right_sibling;
            }
            if found == INVALID_ID {
                break;
            }
            if kind.get(&self.nodes[found as usize]) != INVALID_ID {
                best = Some(found);
            }
            current = self.nodes[found as usize].left_child;
        }

        best
    }

    /// Depth-first search for the first descendant of `id` (or, if `id` is
    /// `INVALID_ID`, of the root) that carries an entry of `kind`. Used by
    /// the content store to satisfy a `CanBePrefix` Interest against Data
    /// cached under a longer name than the query, the mirror image of
    /// `longest_prefix_match`'s ancestor-direction walk.
    pub fn find_descendant_with_entry(&self, id: u16, kind: EntryKind) -> Option<u16> {
        let start = if id == INVALID_ID {
            self.root_children
        } else {
            self.nodes[id as usize].left_child
        };

        let mut stack = vec![start];
        while let Some(siblings) = stack.pop() {
            let mut cursor = siblings;
            while cursor != INVALID_ID {
                if kind.get(&self.nodes[cursor as usize]) != INVALID_ID {
                    return Some(cursor);
                }
                let child = self.nodes[cursor as usize].left_child;
                if child != INVALID_ID {
                    stack.push(child);
                }
                cursor = self.nodes[cursor as usize].right_sibling;
            }
        }
        None
    }

    /// Number of allocated nodes (names with at least one path component
    /// resolved in the tree, whether or not they carry a FIB/PIT/CS entry
    /// of their own).
    pub fn len(&self) -> usize {
        let mut free = 0usize;
        let mut cursor = self.free_head;
        while cursor != INVALID_ID {
            free += 1;
            cursor = self.nodes[cursor as usize].right_sibling;
        }
        self.nodes.len() - free
    }

    pub fn fib_id(&self, id: u16) -> u16 {
        self.nodes[id as usize].fib_id
    }
    pub fn pit_id(&self, id: u16) -> u16 {
        self.nodes[id as usize].pit_id
    }
    pub fn cs_id(&self, id: u16) -> u16 {
        self.nodes[id as usize].cs_id
    }

    pub fn set_fib_id(&mut self, id: u16, fib_id: u16) {
        self.nodes[id as usize].fib_id = fib_id;
    }
    pub fn set_pit_id(&mut self, id: u16, pit_id: u16) {
        self.nodes[id as usize].pit_id = pit_id;
    }
    pub fn set_cs_id(&mut self, id: u16, cs_id: u16) {
        self.nodes[id as usize].cs_id = cs_id;
    }

    /// Clears the given slot kind on `id`; if the node then carries no slots
    /// and has no children, it and any now-childless ancestors are freed.
    pub fn release(&mut self, name: &Name, kind: EntryKind) {
        let components = Self::components(name);
        let mut path = Vec::with_capacity(components.len());
        let mut current = self.root_children;

        for component in &components {
            let mut found = INVALID_ID;
            let mut cursor = current;
            while cursor != INVALID_ID {
                if self.nodes[cursor as usize].component == *component {
                    found = cursor;
                    break;
                }
                cursor = self.nodes[cursor as usize].right_sibling;
            }
            if found == INVALID_ID {
                return;
            }
            path.push(found);
            current = self.nodes[found as usize].left_child;
        }

        if let Some(&leaf) = path.last() {
            kind.clear(&mut self.nodes[leaf as usize]);
        }

        // Walk the path from the leaf back to the root, freeing any node
        // that now has no slots and no children.
        for window_end in (0..path.len()).rev() {
            let id = path[window_end];
            let has_children = self.nodes[id as usize].left_child != INVALID_ID;
            if has_children || !self.nodes[id as usize].is_unused() {
                break;
            }
            if window_end == 0 {
                let mut list_head = self.root_children;
                Self::unlink_sibling(&mut self.nodes, &mut list_head, id);
                self.root_children = list_head;
            } else {
                let parent = path[window_end - 1] as usize;
                let mut list_head = self.nodes[parent].left_child;
                Self::unlink_sibling(&mut self.nodes, &mut list_head, id);
                self.nodes[parent].left_child = list_head;
            }
            self.free(id);
        }
    }

    fn unlink_sibling(nodes: &mut [Node], list_head: &mut u16, target: u16) {
        if *list_head == target {
            *list_head = nodes[target as usize].right_sibling;
            return;
        }
        let mut cursor = *list_head;
        while cursor != INVALID_ID {
            let next = nodes[cursor as usize].right_sibling;
            if next == target {
                nodes[cursor as usize].right_sibling = nodes[target as usize].right_sibling;
                return;
            }
            cursor = next;
        }
    }
}

/// Which of a node's three back-reference slots an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Fib,
    Pit,
    Cs,
}

impl EntryKind {
    fn get(&self, node: &Node) -> u16 {
        match self {
            EntryKind::Fib => node.fib_id,
            EntryKind::Pit => node.pit_id,
            EntryKind::Cs => node.cs_id,
        }
    }

    fn clear(&self, node: &mut Node) {
        match self {
            EntryKind::Fib => node.fib_id = INVALID_ID,
            EntryKind::Pit => node.pit_id = INVALID_ID,
            EntryKind::Cs => node.cs_id = INVALID_ID,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Name;

    #[test]
    fn insert_then_find() {
        let mut tree = NameTree::new(16);
        let name = Name::from_str("/a/b/c").unwrap();
        let id = tree.find_or_insert(&name).unwrap();
        tree.set_fib_id(id, 3);
        assert_eq!(tree.find(&name), Some(id));
        assert_eq!(tree.fib_id(id), 3);
    }

    #[test]
    fn longest_prefix_match_picks_deepest_fib_entry() {
        let mut tree = NameTree::new(16);
        let short = Name::from_str("/a").unwrap();
        let long = Name::from_str("/a/b").unwrap();
        let short_id = tree.find_or_insert(&short).unwrap();
        tree.set_fib_id(short_id, 1);
        let long_id = tree.find_or_insert(&long).unwrap();
        tree.set_fib_id(long_id, 2);

        let query = Name::from_str("/a/b/c").unwrap();
        let matched = tree.longest_prefix_match(&query, EntryKind::Fib).unwrap();
        assert_eq!(matched, long_id);
    }

    #[test]
    fn release_frees_childless_chain() {
        let mut tree = NameTree::new(4);
        let name = Name::from_str("/a/b").unwrap();
        let id = tree.find_or_insert(&name).unwrap();
        tree.set_pit_id(id, 7);
        tree.release(&name, EntryKind::Pit);
        assert_eq!(tree.find(&name), None);
        // the pool should be fully reusable again
        let again = tree.find_or_insert(&name).unwrap();
        tree.set_pit_id(again, 9);
        assert_eq!(tree.pit_id(again), 9);
    }

    #[test]
    fn find_descendant_with_entry_locates_deeper_node() {
        let mut tree = NameTree::new(16);
        let prefix = Name::from_str("/a").unwrap();
        let deeper = Name::from_str("/a/b/c").unwrap();
        tree.find_or_insert(&prefix).unwrap();
        let deeper_id = tree.find_or_insert(&deeper).unwrap();
        tree.set_cs_id(deeper_id, 5);

        let prefix_id = tree.find(&prefix).unwrap();
        let found = tree.find_descendant_with_entry(prefix_id, EntryKind::Cs).unwrap();
        assert_eq!(found, deeper_id);
    }

    #[test]
    fn find_descendant_with_entry_from_root() {
        let mut tree = NameTree::new(16);
        let name = Name::from_str("/x/y").unwrap();
        let id = tree.find_or_insert(&name).unwrap();
        tree.set_cs_id(id, 2);

        let found = tree.find_descendant_with_entry(INVALID_ID, EntryKind::Cs).unwrap();
        assert_eq!(found, id);
    }

    #[test]
    fn len_counts_allocated_nodes() {
        let mut tree = NameTree::new(8);
        assert_eq!(tree.len(), 0);
        tree.find_or_insert(&Name::from_str("/a/b").unwrap()).unwrap();
        assert_eq!(tree.len(), 2);
        tree.release(&Name::from_str("/a/b").unwrap(), EntryKind::Fib);
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn full_tree_reports_full() {
        let mut tree = NameTree::new(1);
        tree.find_or_insert(&Name::from_str("/a").unwrap()).unwrap();
        let err = tree.find_or_insert(&Name::from_str("/b").unwrap());
        assert!(matches!(err, Err(Error::NameTreeFull)));
    }
}
