use super::{MemoryManager, NodeIdx, LEAF_LEVEL};

/// Cache of the all-dead node at each level.
pub(super) struct BlankNodes {
    data: Vec<NodeIdx>,
}

impl BlankNodes {
    pub(super) fn new() -> Self {
        Self { data: vec![] }
    }

    pub(super) fn get(&mut self, level: u32, mem: &mut MemoryManager) -> NodeIdx {
        let i = (level - LEAF_LEVEL) as usize;
        let v = &mut self.data;
        while v.len() <= i {
            if let Some(&b) = v.last() {
                let level = LEAF_LEVEL + v.len() as u32;
                v.push(mem.find_or_create_node(level, b, b, b, b));
            } else {
                v.push(mem.find_or_create_leaf(0));
            }
        }
        v[i]
    }
}
