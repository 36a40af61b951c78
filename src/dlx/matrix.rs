use anyhow::{anyhow, Result};

/// Position of an item in the item arena; the sentinel root is the last slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) struct ItemIdx(pub(super) u32);

/// Position of a node in the node arena.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) struct NodeIdx(pub(super) u32);

/// Marks the column-header nodes, which belong to no option.
pub(super) const OPTION_NONE: u32 = u32::MAX;

/// One element of the universe to be covered.
///
/// Items form a circular doubly-linked list threaded through a sentinel
/// root; an item leaves the list while covered and its own links are
/// preserved so that uncovering can reinsert it in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct Item {
    pub(super) prev: ItemIdx,
    pub(super) next: ItemIdx,
    /// The header node of this item's column list.
    pub(super) head: NodeIdx,
    /// Number of options currently covering this item, excluding the header.
    pub(super) count: u32,
}

/// One cell of the sparse boolean matrix.
///
/// A node is either a column header or the occurrence of an item in an
/// option. Columns are circular doubly-linked lists through `up`/`down`;
/// rows are the contiguous arena spans recorded in [`OptionRow`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct Node {
    pub(super) up: NodeIdx,
    pub(super) down: NodeIdx,
    pub(super) top: ItemIdx,
    /// Index of the owning option, or `OPTION_NONE` for a header.
    pub(super) option: u32,
}

/// Span of an option's nodes in the node arena.
#[derive(Clone, Debug)]
pub(super) struct OptionRow {
    pub(super) start: u32,
    pub(super) end: u32,
}

/// An exact cover problem in dancing-links form.
///
/// Built once from a universe size and a family of options (subsets of the
/// universe, given as item indices); [`Self::solve_all`] and
/// [`Self::solve_one`] then search for subfamilies that cover every item
/// exactly once. Solutions are reported as 0-based positions into the input
/// option family.
///
/// ```
/// let mut problem = dlx_life::Problem::new(4, [
///     vec![1, 2],
///     vec![0],
///     vec![0, 3],
///     vec![3],
/// ]).unwrap();
/// let covers = problem.solve_all();
/// assert_eq!(covers.len(), 2);
/// ```
pub struct Problem {
    pub(super) items: Vec<Item>,
    pub(super) nodes: Vec<Node>,
    pub(super) options: Vec<OptionRow>,
    /// The partial solution maintained by the search.
    pub(super) subset: Vec<usize>,
}

impl Problem {
    /// Constructs the matrix for `n_items` items and the given option
    /// family. Fails if any option references an item index out of bounds.
    pub fn new<O>(n_items: usize, option_sets: O) -> Result<Self>
    where
        O: IntoIterator,
        O::Item: AsRef<[usize]>,
    {
        let n = u32::try_from(n_items).map_err(|_| anyhow!("too many items: {n_items}"))?;

        // Circular item list through the sentinel root at slot `n`; every
        // item's column starts out as a self-linked header.
        let mut items: Vec<Item> = (0..=n)
            .map(|i| Item {
                prev: ItemIdx(if i == 0 { n } else { i - 1 }),
                next: ItemIdx(if i == n { 0 } else { i + 1 }),
                head: NodeIdx(i),
                count: 0,
            })
            .collect();
        let mut nodes: Vec<Node> = (0..n)
            .map(|i| Node {
                up: NodeIdx(i),
                down: NodeIdx(i),
                top: ItemIdx(i),
                option: OPTION_NONE,
            })
            .collect();

        let mut options = Vec::new();
        for (index, set) in option_sets.into_iter().enumerate() {
            let set = set.as_ref();
            let start = nodes.len() as u32;
            for &item in set {
                if item >= n_items {
                    return Err(anyhow!(
                        "option {index} references item {item}, but the problem has {n_items} items"
                    ));
                }
                let head = NodeIdx(item as u32);
                let idx = NodeIdx(nodes.len() as u32);
                let up = nodes[head.0 as usize].up;
                // append at the bottom of the column, just above the header
                nodes.push(Node {
                    up,
                    down: head,
                    top: ItemIdx(item as u32),
                    option: index as u32,
                });
                nodes[up.0 as usize].down = idx;
                nodes[head.0 as usize].up = idx;
                items[item].count += 1;
            }
            options.push(OptionRow {
                start,
                end: nodes.len() as u32,
            });
        }

        Ok(Self {
            items,
            nodes,
            options,
            subset: Vec::new(),
        })
    }

    /// Number of options in the problem.
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[inline]
    pub(super) fn item(&self, i: ItemIdx) -> &Item {
        &self.items[i.0 as usize]
    }

    #[inline]
    pub(super) fn item_mut(&mut self, i: ItemIdx) -> &mut Item {
        &mut self.items[i.0 as usize]
    }

    #[inline]
    pub(super) fn node(&self, i: NodeIdx) -> &Node {
        &self.nodes[i.0 as usize]
    }

    #[inline]
    pub(super) fn node_mut(&mut self, i: NodeIdx) -> &mut Node {
        &mut self.nodes[i.0 as usize]
    }

    pub(super) fn root(&self) -> ItemIdx {
        ItemIdx(self.items.len() as u32 - 1)
    }

    /// True if every item is covered by the current partial solution.
    pub(super) fn items_empty(&self) -> bool {
        self.item(self.root()).next == self.root()
    }

    /// Removes `c` from play: unlinks it from the item list and hides every
    /// option that still covers it. The inverse of [`Self::uncover`].
    pub(super) fn cover(&mut self, c: ItemIdx) {
        let (prev, next) = {
            let it = self.item(c);
            (it.prev, it.next)
        };
        self.item_mut(prev).next = next;
        self.item_mut(next).prev = prev;

        let head = self.item(c).head;
        let mut r = self.node(head).down;
        while r != head {
            self.hide(r);
            r = self.node(r).down;
        }
    }

    /// Exact inverse of [`Self::cover`]: traverses the column upward and
    /// each row leftward, so every link and count is restored to its
    /// pre-cover value.
    pub(super) fn uncover(&mut self, c: ItemIdx) {
        let head = self.item(c).head;
        let mut r = self.node(head).up;
        while r != head {
            self.unhide(r);
            r = self.node(r).up;
        }

        let (prev, next) = {
            let it = self.item(c);
            (it.prev, it.next)
        };
        self.item_mut(prev).next = c;
        self.item_mut(next).prev = c;
    }

    /// Unlinks every node of `r`'s option except `r` itself from its column.
    fn hide(&mut self, r: NodeIdx) {
        let row = self.options[self.node(r).option as usize].clone();
        for j in (row.start..row.end).map(NodeIdx) {
            if j == r {
                continue;
            }
            let (up, down, top) = {
                let node = self.node(j);
                (node.up, node.down, node.top)
            };
            self.node_mut(up).down = down;
            self.node_mut(down).up = up;
            self.item_mut(top).count -= 1;
        }
    }

    /// Relinks the nodes hidden by [`Self::hide`], in reverse order.
    fn unhide(&mut self, r: NodeIdx) {
        let row = self.options[self.node(r).option as usize].clone();
        for j in (row.start..row.end).rev().map(NodeIdx) {
            if j == r {
                continue;
            }
            let (up, down, top) = {
                let node = self.node(j);
                (node.up, node.down, node.top)
            };
            self.node_mut(up).down = j;
            self.node_mut(down).up = j;
            self.item_mut(top).count += 1;
        }
    }

    /// MRV heuristic: the still-uncovered item with the fewest remaining
    /// options, ties broken by list order. Must not be called on an empty
    /// item list.
    pub(super) fn next_candidate(&self) -> ItemIdx {
        let root = self.root();
        let mut best = self.item(root).next;
        debug_assert_ne!(best, root);
        let mut c = self.item(best).next;
        while c != root {
            if self.item(c).count < self.item(best).count {
                best = c;
            }
            c = self.item(c).next;
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem() -> Problem {
        Problem::new(4, [vec![1, 2], vec![0], vec![0, 3], vec![3]]).unwrap()
    }

    #[test]
    fn construction_links_columns_and_counts() {
        let p = problem();
        assert_eq!(p.items[0].count, 2); // options 1 and 2
        assert_eq!(p.items[1].count, 1);
        assert_eq!(p.items[2].count, 1);
        assert_eq!(p.items[3].count, 2);

        // item 0's column holds option 1's node then option 2's, in input order
        let head = p.item(ItemIdx(0)).head;
        let first = p.node(head).down;
        let second = p.node(first).down;
        assert_eq!(p.node(first).option, 1);
        assert_eq!(p.node(second).option, 2);
        assert_eq!(p.node(second).down, head);
    }

    #[test]
    fn construction_rejects_out_of_bounds_items() {
        assert!(Problem::new(4, [vec![0, 4]]).is_err());
        assert!(Problem::new(0, [vec![0]]).is_err());
        assert!(Problem::new(4, Vec::<Vec<usize>>::new()).is_ok());
    }

    #[test]
    fn cover_then_uncover_restores_every_link_and_count() {
        let mut p = problem();
        let items_before = p.items.clone();
        let nodes_before = p.nodes.clone();

        for &first in &[0u32, 1, 2, 3] {
            for &second in &[0u32, 1, 2, 3] {
                if first == second {
                    continue;
                }
                p.cover(ItemIdx(first));
                p.cover(ItemIdx(second));
                p.uncover(ItemIdx(second));
                p.uncover(ItemIdx(first));
                assert_eq!(p.items, items_before);
                assert_eq!(p.nodes, nodes_before);
            }
        }
    }

    #[test]
    fn covering_an_item_hides_its_options_elsewhere() {
        let mut p = problem();
        // covering item 0 hides options 1 and 2; option 2 also covers item 3
        p.cover(ItemIdx(0));
        assert_eq!(p.item(ItemIdx(3)).count, 1);
        // the item list now skips item 0
        assert_eq!(p.item(p.root()).next, ItemIdx(1));
        p.uncover(ItemIdx(0));
        assert_eq!(p.item(ItemIdx(3)).count, 2);
        assert_eq!(p.item(p.root()).next, ItemIdx(0));
    }

    #[test]
    fn mrv_prefers_the_scarcest_item() {
        let p = problem();
        // items 1 and 2 are covered by a single option each; item 1 comes first
        assert_eq!(p.next_candidate(), ItemIdx(1));
    }
}
