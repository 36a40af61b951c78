use super::matrix::{NodeIdx, Problem};
use std::ops::ControlFlow;

impl Problem {
    /// Finds every exact cover, reported in search order as sets of option
    /// indices. The matrix is fully restored afterwards, so solving is
    /// repeatable.
    pub fn solve_all(&mut self) -> Vec<Vec<usize>> {
        let mut found = Vec::new();
        let _ = self.search(&mut |subset| {
            found.push(subset.to_vec());
            ControlFlow::Continue(())
        });
        log::debug!(
            "exact cover search over {} options found {} covers",
            self.option_count(),
            found.len()
        );
        found
    }

    /// Finds the first exact cover in search order, if any. Unlike an
    /// exhaustive run this short-circuits as soon as a cover is found; the
    /// matrix is still fully restored on the way out.
    pub fn solve_one(&mut self) -> Option<Vec<usize>> {
        let mut first = None;
        let _ = self.search(&mut |subset| {
            first = Some(subset.to_vec());
            ControlFlow::Break(())
        });
        first
    }

    /// Knuth's Algorithm X. Branches on the MRV item, covering the chosen
    /// option's items on the way down and uncovering them in reverse on the
    /// way back up, so the matrix is byte-identical after every backtrack.
    fn search<F>(&mut self, visit: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&[usize]) -> ControlFlow<()>,
    {
        if self.items_empty() {
            return visit(&self.subset);
        }
        let c = self.next_candidate();
        if self.item(c).count == 0 {
            // dead end: an item is no longer coverable
            return ControlFlow::Continue(());
        }

        self.cover(c);
        let head = self.item(c).head;
        let mut r = self.node(head).down;
        let mut flow = ControlFlow::Continue(());
        while r != head {
            let option = self.node(r).option;
            let row = self.options[option as usize].clone();
            for j in (row.start..row.end).map(NodeIdx) {
                if j != r {
                    let top = self.node(j).top;
                    self.cover(top);
                }
            }
            self.subset.push(option as usize);
            flow = self.search(visit);
            self.subset.pop();
            for j in (row.start..row.end).rev().map(NodeIdx) {
                if j != r {
                    let top = self.node(j).top;
                    self.uncover(top);
                }
            }
            if flow.is_break() {
                break;
            }
            r = self.node(r).down;
        }
        self.uncover(c);
        flow
    }
}
