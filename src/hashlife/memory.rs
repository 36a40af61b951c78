use super::{NodeIdx, QuadTreeNode, LEAF_LEVEL};

const INITIAL_BUCKETS: usize = 1 << 12;

/// Hash cons for quadtree nodes.
///
/// Nodes live in a growable arena and are deduplicated through a chained
/// hash table keyed on `(level, children)`; for leaves the children fields
/// hold the packed cell bitmap. Two macrocells are equal exactly when they
/// share an index, so equality checks never traverse the tree. Index 0 is a
/// reserved dummy that terminates bucket chains; nothing references it.
pub(super) struct MemoryManager {
    storage: Vec<QuadTreeNode>,
    buckets: Vec<NodeIdx>,
}

impl MemoryManager {
    pub(super) fn new() -> Self {
        Self {
            storage: vec![QuadTreeNode::default()],
            buckets: vec![NodeIdx::NULL; INITIAL_BUCKETS],
        }
    }

    #[inline]
    pub(super) fn get(&self, idx: NodeIdx) -> &QuadTreeNode {
        &self.storage[idx.0 as usize]
    }

    #[inline]
    pub(super) fn get_mut(&mut self, idx: NodeIdx) -> &mut QuadTreeNode {
        &mut self.storage[idx.0 as usize]
    }

    /// Find a leaf node with the given 8x8 cell bitmap.
    /// If the node is not found, it is created.
    pub(super) fn find_or_create_leaf(&mut self, cells: u64) -> NodeIdx {
        let nw = NodeIdx(cells as u32);
        let ne = NodeIdx((cells >> 32) as u32);
        self.find_or_create(LEAF_LEVEL, nw, ne, NodeIdx::NULL, NodeIdx::NULL)
    }

    /// Find a node with the given canonical children.
    /// If the node is not found, it is created.
    ///
    /// `level` is related to the result; the children are `level - 1`.
    pub(super) fn find_or_create_node(
        &mut self,
        level: u32,
        nw: NodeIdx,
        ne: NodeIdx,
        sw: NodeIdx,
        se: NodeIdx,
    ) -> NodeIdx {
        debug_assert!(level > LEAF_LEVEL);
        self.find_or_create(level, nw, ne, sw, se)
    }

    fn find_or_create(
        &mut self,
        level: u32,
        nw: NodeIdx,
        ne: NodeIdx,
        sw: NodeIdx,
        se: NodeIdx,
    ) -> NodeIdx {
        let hash = QuadTreeNode::hash(level, nw, ne, sw, se);
        let i = hash & (self.buckets.len() - 1);
        let mut node = self.buckets[i];
        let mut prev = NodeIdx::NULL;
        // search the bucket chain
        while node != NodeIdx::NULL {
            let n = self.get(node);
            if n.nw == nw && n.ne == ne && n.sw == sw && n.se == se && n.level == level {
                // move the node to the front of the chain
                if prev != NodeIdx::NULL {
                    let (head, next) = (self.buckets[i], n.next);
                    self.get_mut(prev).next = next;
                    self.get_mut(node).next = head;
                    self.buckets[i] = node;
                }
                return node;
            }
            prev = node;
            node = n.next;
        }

        let idx = NodeIdx(u32::try_from(self.storage.len()).expect("ran out of u32 indices"));
        self.storage.push(QuadTreeNode {
            nw,
            ne,
            sw,
            se,
            level,
            next: self.buckets[i],
            ..Default::default()
        });
        self.buckets[i] = idx;
        // double the number of buckets if the load factor exceeds 0.5
        if self.len() * 2 > self.buckets.len() {
            self.rehash();
        }
        idx
    }

    fn rehash(&mut self) {
        let new_size = self.buckets.len() << 1;
        log::debug!(
            "rehashing node table: {} nodes, {} buckets",
            self.len(),
            new_size
        );
        let mut new_buckets = vec![NodeIdx::NULL; new_size];
        for idx in (1..self.storage.len()).map(|i| NodeIdx(i as u32)) {
            let n = self.get(idx);
            let hash = QuadTreeNode::hash(n.level, n.nw, n.ne, n.sw, n.se);
            let i = hash & (new_size - 1);
            self.get_mut(idx).next = new_buckets[i];
            new_buckets[i] = idx;
        }
        self.buckets = new_buckets;
    }

    /// Number of canonical nodes created so far.
    pub(super) fn len(&self) -> usize {
        self.storage.len() - 1
    }

    pub(super) fn bytes_total(&self) -> usize {
        self.storage.capacity() * std::mem::size_of::<QuadTreeNode>()
            + self.buckets.capacity() * std::mem::size_of::<NodeIdx>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_are_deduplicated() {
        let mut mem = MemoryManager::new();
        let a = mem.find_or_create_leaf(0xdead_beef);
        let b = mem.find_or_create_leaf(0xdead_beef);
        let c = mem.find_or_create_leaf(0xbeef_dead);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(mem.len(), 2);
    }

    #[test]
    fn nodes_are_deduplicated_by_level_and_children() {
        let mut mem = MemoryManager::new();
        let leaf = mem.find_or_create_leaf(1);
        let a = mem.find_or_create_node(LEAF_LEVEL + 1, leaf, leaf, leaf, leaf);
        let b = mem.find_or_create_node(LEAF_LEVEL + 1, leaf, leaf, leaf, leaf);
        assert_eq!(a, b);
        assert_eq!(mem.len(), 2);
    }

    #[test]
    fn survives_rehash() {
        let mut mem = MemoryManager::new();
        let leaves: Vec<_> = (0..INITIAL_BUCKETS as u64)
            .map(|i| mem.find_or_create_leaf(i))
            .collect();
        for (i, &idx) in leaves.iter().enumerate() {
            assert_eq!(mem.find_or_create_leaf(i as u64), idx);
        }
        assert_eq!(mem.len(), INITIAL_BUCKETS);
    }
}
