use super::{BlankNodes, MemoryManager, NodeIdx, QuadTreeNode, Tile, LEAF_LEVEL};
use ahash::AHashMap as HashMap;
use anyhow::{anyhow, Result};
use num_bigint::BigInt;
use rand::{Rng, SeedableRng};

/// Handle to a canonical square of cells.
///
/// Handles are only meaningful together with the [`HashLifeEngine`] that
/// created them. Within one engine, two handles compare equal exactly when
/// they denote the same cell pattern, so `==` is a constant-time deep
/// comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Macrocell(NodeIdx);

/// Implementation of [HashLife algorithm](https://conwaylife.com/wiki/HashLife).
///
/// The engine owns a hash cons that canonicalises every square it ever
/// builds, and memoises on each node its *result*: the centre half advanced
/// by a quarter of the node's side in generations. Repeated patterns at any
/// scale collapse onto single nodes, which is what makes deep time jumps
/// cheap.
///
/// A leaf sits at level 4 and spans 8x8 cells; a node at level `k` spans
/// `2^(k - 1)` cells per side and its result advances by `2^(k - 3)`
/// generations. Cells outside a square are treated as dead; callers that
/// want a pattern to survive near the boundary pad it with [`Self::expand`]
/// before asking for results.
pub struct HashLifeEngine {
    mem: MemoryManager,
    blank: BlankNodes,
}

impl HashLifeEngine {
    pub fn new() -> Self {
        Self {
            mem: MemoryManager::new(),
            blank: BlankNodes::new(),
        }
    }

    /// Builds the level-4 leaf with the given 4x4 tile quadrants.
    pub fn leaf(&mut self, nw: Tile, ne: Tile, sw: Tile, se: Tile) -> Macrocell {
        self.leaf_from_tile(Tile::from_quads(nw, ne, sw, se))
    }

    /// Builds the level-4 leaf holding the full 8x8 tile.
    pub fn leaf_from_tile(&mut self, cells: Tile) -> Macrocell {
        Macrocell(self.mem.find_or_create_leaf(cells.bits()))
    }

    /// Builds the node with the given children, one level above them.
    ///
    /// Fails if the four children do not share a level.
    pub fn node(
        &mut self,
        nw: Macrocell,
        ne: Macrocell,
        sw: Macrocell,
        se: Macrocell,
    ) -> Result<Macrocell> {
        let levels = [nw, ne, sw, se].map(|m| self.mem.get(m.0).level);
        if levels.iter().any(|&l| l != levels[0]) {
            return Err(anyhow!(
                "child levels differ: {} {} {} {}",
                levels[0],
                levels[1],
                levels[2],
                levels[3]
            ));
        }
        Ok(Macrocell(self.mem.find_or_create_node(
            levels[0] + 1,
            nw.0,
            ne.0,
            sw.0,
            se.0,
        )))
    }

    /// The all-dead square at the given level (at least 4).
    pub fn blank(&mut self, level: u32) -> Macrocell {
        assert!(level >= LEAF_LEVEL, "macrocell levels start at {LEAF_LEVEL}");
        Macrocell(self.blank.get(level, &mut self.mem))
    }

    /// Quadtree level of the macrocell; leaves are level 4.
    pub fn level(&self, m: Macrocell) -> u32 {
        self.mem.get(m.0).level
    }

    /// Side length of the macrocell in cells.
    pub fn side_len(&self, m: Macrocell) -> u64 {
        1u64 << (self.level(m) - 1)
    }

    /// Returns true if all contained cells are dead.
    pub fn is_empty(&mut self, m: Macrocell) -> bool {
        let level = self.mem.get(m.0).level;
        m.0 == self.blank.get(level, &mut self.mem)
    }

    /// Returns the cell at `(x, y)`, with the origin in the north-west
    /// corner of the macrocell.
    pub fn get_cell(&self, m: Macrocell, x: u64, y: u64) -> bool {
        let mut idx = m.0;
        let mut side = self.side_len(m);
        debug_assert!(x < side && y < side);
        let (mut x, mut y) = (x, y);
        loop {
            let n = self.mem.get(idx);
            if n.is_leaf() {
                return Tile::from_bits(n.leaf_cells()).get(x as u32, y as u32);
            }
            let half = side / 2;
            idx = match (x < half, y < half) {
                (true, true) => n.nw,
                (false, true) => n.ne,
                (true, false) => n.sw,
                (false, false) => n.se,
            };
            if x >= half {
                x -= half;
            }
            if y >= half {
                y -= half;
            }
            side = half;
        }
    }

    /// Counts the alive cells, memoising per canonical node.
    pub fn population(&self, m: Macrocell) -> BigInt {
        fn inner(idx: NodeIdx, mem: &MemoryManager, cache: &mut HashMap<NodeIdx, BigInt>) -> BigInt {
            if let Some(cached) = cache.get(&idx) {
                return cached.clone();
            }
            let n = mem.get(idx);
            let result = if n.is_leaf() {
                BigInt::from(n.leaf_cells().count_ones())
            } else {
                n.parts()
                    .map(|x| inner(x, mem, cache))
                    .into_iter()
                    .sum::<BigInt>()
            };
            cache.insert(idx, result.clone());
            result
        }

        let mut cache = HashMap::new();
        inner(m.0, &self.mem, &mut cache)
    }

    /// Surrounds the macrocell with a blank frame, doubling its side; the
    /// original cells end up centred in the returned square. This is how a
    /// caller keeps a growing pattern away from the dead boundary between
    /// result steps.
    pub fn expand(&mut self, m: Macrocell) -> Macrocell {
        let n = self.mem.get(m.0).clone();
        let idx = if n.is_leaf() {
            let t = Tile::from_bits(n.leaf_cells());
            let e = Tile::EMPTY;
            let quads = [
                Tile::from_quads(e, e, e, t.nw()),
                Tile::from_quads(e, e, t.ne(), e),
                Tile::from_quads(e, t.sw(), e, e),
                Tile::from_quads(t.se(), e, e, e),
            ]
            .map(|q| self.mem.find_or_create_leaf(q.bits()));
            self.mem
                .find_or_create_node(LEAF_LEVEL + 1, quads[0], quads[1], quads[2], quads[3])
        } else {
            let b = self.blank.get(n.level - 1, &mut self.mem);
            let nw = self.mem.find_or_create_node(n.level, b, b, b, n.nw);
            let ne = self.mem.find_or_create_node(n.level, b, b, n.ne, b);
            let sw = self.mem.find_or_create_node(n.level, b, n.sw, b, b);
            let se = self.mem.find_or_create_node(n.level, n.se, b, b, b);
            self.mem.find_or_create_node(n.level + 1, nw, ne, sw, se)
        };
        Macrocell(idx)
    }

    /// The centre half of the macrocell advanced by `2^(level - 3)`
    /// generations, one level down. Memoised: asking twice for the same
    /// canonical node returns the identical macrocell without recomputation.
    ///
    /// Fails on a bare leaf, which has no level below it to return.
    pub fn result(&mut self, m: Macrocell) -> Result<Macrocell> {
        if self.mem.get(m.0).is_leaf() {
            return Err(anyhow!("a leaf has no result; expand it first"));
        }
        Ok(Macrocell(self.result_inner(m.0)))
    }

    fn result_inner(&mut self, idx: NodeIdx) -> NodeIdx {
        {
            let n = self.mem.get(idx);
            if n.has_result {
                return n.result;
            }
        }
        let n = self.mem.get(idx).clone();
        debug_assert!(!n.is_leaf());
        let result = if n.level == LEAF_LEVEL + 1 {
            self.result_of_leaves(&n)
        } else {
            self.result_of_nodes(&n)
        };
        let n = self.mem.get_mut(idx);
        n.result = result;
        n.has_result = true;
        result
    }

    /// Base case: all four children are 8x8 leaves. The nine subsquare
    /// tiles each advance two generations through the adder network, the
    /// four overlapping recompositions advance two more, for a net four.
    fn result_of_leaves(&mut self, n: &QuadTreeNode) -> NodeIdx {
        let [nw, ne, sw, se] = n
            .parts()
            .map(|x| Tile::from_bits(self.mem.get(x).leaf_cells()));

        let r = [
            nw,
            Tile::from_quads(nw.ne(), ne.nw(), nw.se(), ne.sw()),
            ne,
            Tile::from_quads(nw.sw(), nw.se(), sw.nw(), sw.ne()),
            Tile::from_quads(nw.se(), ne.sw(), sw.ne(), se.nw()),
            Tile::from_quads(ne.sw(), ne.se(), se.nw(), se.ne()),
            sw,
            Tile::from_quads(sw.ne(), se.nw(), sw.se(), se.sw()),
            se,
        ]
        .map(Tile::result);

        let nw2 = Tile::from_quads(r[0], r[1], r[3], r[4]).result();
        let ne2 = Tile::from_quads(r[1], r[2], r[4], r[5]).result();
        let sw2 = Tile::from_quads(r[3], r[4], r[6], r[7]).result();
        let se2 = Tile::from_quads(r[4], r[5], r[7], r[8]).result();
        self.mem
            .find_or_create_leaf(Tile::from_quads(nw2, ne2, sw2, se2).bits())
    }

    /// General case: nine subsquares tiling the centre three quarters, the
    /// result of each, then four overlapping squares of those results, the
    /// result of each again.
    fn result_of_nodes(&mut self, n: &QuadTreeNode) -> NodeIdx {
        // level of the nine subsquares, of the four recompositions and of
        // the returned node
        let level = n.level - 1;
        let [nw, ne, sw, se] = n.parts().map(|x| self.mem.get(x).clone());

        let mut t = [
            n.nw,
            self.mem.find_or_create_node(level, nw.ne, ne.nw, nw.se, ne.sw),
            n.ne,
            self.mem.find_or_create_node(level, nw.sw, nw.se, sw.nw, sw.ne),
            self.mem.find_or_create_node(level, nw.se, ne.sw, sw.ne, se.nw),
            self.mem.find_or_create_node(level, ne.sw, ne.se, se.nw, se.ne),
            n.sw,
            self.mem.find_or_create_node(level, sw.ne, se.nw, sw.se, se.sw),
            n.se,
        ];
        for x in t.iter_mut() {
            *x = self.result_inner(*x);
        }

        let nw2 = self.mem.find_or_create_node(level, t[0], t[1], t[3], t[4]);
        let ne2 = self.mem.find_or_create_node(level, t[1], t[2], t[4], t[5]);
        let sw2 = self.mem.find_or_create_node(level, t[3], t[4], t[6], t[7]);
        let se2 = self.mem.find_or_create_node(level, t[4], t[5], t[7], t[8]);
        let nw2 = self.result_inner(nw2);
        let ne2 = self.result_inner(ne2);
        let sw2 = self.result_inner(sw2);
        let se2 = self.result_inner(se2);
        self.mem.find_or_create_node(level, nw2, ne2, sw2, se2)
    }

    /// Builds a uniformly random macrocell at the given level; intended for
    /// tests and benchmarks. `None` seeds from the OS.
    pub fn random(&mut self, level: u32, seed: Option<u64>) -> Macrocell {
        assert!(level >= LEAF_LEVEL, "macrocell levels start at {LEAF_LEVEL}");
        let mut rng = if let Some(x) = seed {
            rand_chacha::ChaCha8Rng::seed_from_u64(x)
        } else {
            rand_chacha::ChaCha8Rng::from_os_rng()
        };
        self.random_inner(level, &mut rng)
    }

    fn random_inner(&mut self, level: u32, rng: &mut rand_chacha::ChaCha8Rng) -> Macrocell {
        if level == LEAF_LEVEL {
            return self.leaf_from_tile(Tile::from_bits(rng.random()));
        }
        let children = [0; 4].map(|_| self.random_inner(level - 1, rng));
        let idx = self.mem.find_or_create_node(
            level,
            children[0].0,
            children[1].0,
            children[2].0,
            children[3].0,
        );
        Macrocell(idx)
    }

    /// Number of canonical nodes the engine has interned.
    pub fn node_count(&self) -> usize {
        self.mem.len()
    }

    /// Approximate heap memory usage of the engine in bytes.
    pub fn bytes_total(&self) -> usize {
        self.mem.bytes_total()
    }
}

impl Default for HashLifeEngine {
    fn default() -> Self {
        Self::new()
    }
}
