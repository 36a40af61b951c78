use anyhow::{anyhow, Result};
use rand::{Rng, SeedableRng};

/// Masks selecting the centred subsquares of an 8x8 bitmap.
pub(super) const CENTER_6: u64 = 0x007e_7e7e_7e7e_7e00;
pub(super) const CENTER_4: u64 = 0x0000_3c3c_3c3c_0000;
pub(super) const CENTER_2: u64 = 0x0000_0018_1800_0000;

/// An 8x8 block of cells packed into a 64-bit word.
///
/// Bit `i` holds the cell at `(x, y) = (i % 8, i / 8)`, with `x` growing to
/// the right and `y` growing downwards. Smaller squares (6x6, 4x4, 2x2) are
/// represented in the same word, centred, with all bits outside the centre
/// zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Tile(u64);

/// Adds the bits of two words in parallel, returning sum and carry planes.
#[inline]
const fn half_adder(a: u64, b: u64) -> (u64, u64) {
    (a ^ b, a & b)
}

/// Adds the bits of three words in parallel, returning sum and carry planes.
#[inline]
const fn full_adder(a: u64, b: u64, c: u64) -> (u64, u64) {
    (a ^ b ^ c, (a & b) | (b & c) | (a & c))
}

impl Tile {
    pub const EMPTY: Tile = Tile(0);

    /// Wraps a raw 64-bit bitmap.
    pub fn from_bits(bits: u64) -> Self {
        Tile(bits)
    }

    /// Returns the raw 64-bit bitmap.
    pub fn bits(self) -> u64 {
        self.0
    }

    /// Parses a tile from text: `'1'` is alive, `'0'` is dead, every other
    /// character is ignored. Cells are consumed left to right, top to bottom,
    /// into bit positions `0..64`; exactly 64 cell characters are required.
    pub fn from_ascii(text: &str) -> Result<Self> {
        let mut bits = 0u64;
        let mut index = 0u32;
        for c in text.chars() {
            let alive = match c {
                '1' => true,
                '0' => false,
                _ => continue,
            };
            if index == 64 {
                return Err(anyhow!("tile text has more than 64 cell characters"));
            }
            bits |= (alive as u64) << index;
            index += 1;
        }
        if index < 64 {
            return Err(anyhow!(
                "tile text has only {} of 64 cell characters",
                index
            ));
        }
        Ok(Tile(bits))
    }

    /// Builds a tile from 8 rows of 8 cells, top to bottom.
    pub fn from_rows(rows: [u8; 8]) -> Self {
        Tile(u64::from_le_bytes(rows))
    }

    /// Returns the cells row by row, top to bottom.
    pub fn rows(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Creates a uniformly random tile. `None` seeds from the OS.
    pub fn random(seed: Option<u64>) -> Self {
        let mut rng = if let Some(x) = seed {
            rand_chacha::ChaCha8Rng::seed_from_u64(x)
        } else {
            rand_chacha::ChaCha8Rng::from_os_rng()
        };
        Tile(rng.random())
    }

    /// Returns the cell at `(x, y)`.
    pub fn get(self, x: u32, y: u32) -> bool {
        debug_assert!(x < 8 && y < 8);
        (self.0 >> (x + 8 * y)) & 1 != 0
    }

    /// Sets the cell at `(x, y)` to either alive or dead.
    pub fn set(&mut self, x: u32, y: u32, alive: bool) {
        debug_assert!(x < 8 && y < 8);
        let index = x + 8 * y;
        self.0 = (self.0 & !(1 << index)) | ((alive as u64) << index);
    }

    /// Number of alive cells.
    pub fn population(self) -> u32 {
        self.0.count_ones()
    }

    /// Returns the tile shifted right and down by the given cell counts
    /// (negative values shift left and up). Bits shifted across a row
    /// boundary wrap into garbage; callers mask the centre they care about.
    pub fn shift(self, right: i32, down: i32) -> Tile {
        let amount = right + 8 * down;
        if amount > 0 {
            Tile(self.0 << amount)
        } else {
            Tile(self.0 >> -amount)
        }
    }

    /// The centre 6x6, everything else zeroed.
    pub fn center6(self) -> Tile {
        Tile(self.0 & CENTER_6)
    }

    /// The centre 4x4, everything else zeroed.
    pub fn center4(self) -> Tile {
        Tile(self.0 & CENTER_4)
    }

    /// The centre 2x2, everything else zeroed.
    pub fn center2(self) -> Tile {
        Tile(self.0 & CENTER_2)
    }

    /// Quarter accessors of an 8x8 tile, each returned as a centred 4x4.
    pub fn nw(self) -> Tile {
        self.shift(2, 2).center4()
    }

    pub fn ne(self) -> Tile {
        self.shift(-2, 2).center4()
    }

    pub fn sw(self) -> Tile {
        self.shift(2, -2).center4()
    }

    pub fn se(self) -> Tile {
        self.shift(-2, -2).center4()
    }

    /// Composes an 8x8 tile from four centred 4x4 quadrant tiles.
    pub fn from_quads(nw: Tile, ne: Tile, sw: Tile, se: Tile) -> Tile {
        let nw = nw.center4().shift(-2, -2);
        let ne = ne.center4().shift(2, -2);
        let sw = sw.center4().shift(-2, 2);
        let se = se.center4().shift(2, 2);
        Tile(nw.0 | ne.0 | sw.0 | se.0)
    }

    /// The next generation under B3/S23, computed with a bit-parallel adder
    /// network ("Life in a Register"). Only the centre 6x6 of the returned
    /// tile is meaningful; the outer ring is zeroed.
    ///
    /// The three planes `sum1`, `sum2`, `sum4` hold the neighbour count of
    /// every cell modulo 8, counting the cell itself. Counts of 8 and 9 alias
    /// to 0 and 1, which is harmless: the rules only distinguish counts 3
    /// (alive next) and 4 (unchanged).
    pub fn next(self) -> Tile {
        let cells = self.0;
        let left = cells << 1;
        let right = cells >> 1;
        let (mid1, mid2) = full_adder(left, cells, right);

        let up1 = mid1 << 8;
        let up2 = mid2 << 8;
        let down1 = mid1 >> 8;
        let down2 = mid2 >> 8;

        let (sum1, sum2a) = full_adder(up1, mid1, down1);
        let (sum2b, sum4a) = full_adder(up2, mid2, down2);
        let (sum2, sum4b) = half_adder(sum2a, sum2b);
        let sum4 = sum4a ^ sum4b;

        let result = (cells & !sum1 & !sum2 & sum4) | (sum1 & sum2 & !sum4);
        Tile(result & CENTER_6)
    }

    /// The centre 4x4 two generations ahead.
    pub fn result(self) -> Tile {
        self.next().next().center4()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Tile {
        Tile::from_ascii(text).unwrap()
    }

    fn empty() -> Tile {
        parse(
            "00000000
             00000000
             00000000
             00000000
             00000000
             00000000
             00000000
             00000000",
        )
    }

    fn blinker() -> Tile {
        parse(
            "00000000
             00000000
             00000000
             00111000
             00000000
             00000000
             00000000
             00000000",
        )
    }

    fn toad() -> Tile {
        parse(
            "00000000
             00000000
             00000000
             00011100
             00111000
             00000000
             00000000
             00000000",
        )
    }

    fn glider() -> Tile {
        parse(
            "00000000
             00000000
             00001000
             00000100
             00011100
             00000000
             00000000
             00000000",
        )
    }

    fn nth(tile: Tile, generations: u32) -> Tile {
        (0..generations).fold(tile, |t, _| t.next())
    }

    #[test]
    fn empty_grid_stays_empty() {
        assert_eq!(nth(empty(), 10), empty());
    }

    #[test]
    fn oscillators_repeat_with_period_two() {
        assert_eq!(nth(toad(), 2), toad());
        assert_ne!(toad().next(), toad());
        assert_eq!(toad().next(), nth(toad(), 3));

        assert_eq!(nth(blinker(), 2), blinker());
        assert_ne!(blinker().next(), blinker());
        assert_eq!(blinker().next(), nth(blinker(), 3));
    }

    #[test]
    fn blinker_flips_to_a_column() {
        let vertical = parse(
            "00000000
             00000000
             00010000
             00010000
             00010000
             00000000
             00000000
             00000000",
        );
        assert_eq!(blinker().next(), vertical);
        assert_eq!(nth(blinker(), 2), blinker().center6());
    }

    #[test]
    fn oscillator_results_are_fixed_points() {
        assert_eq!(blinker().result(), blinker());
        assert_eq!(toad().result(), toad());
        assert_eq!(empty().result(), empty());
    }

    #[test]
    fn glider_drifts_diagonally() {
        assert_eq!(nth(glider(), 4), glider().shift(1, 1));
        assert_eq!(
            nth(glider(), 4).center4(),
            glider().shift(1, 1).center4()
        );
    }

    #[test]
    fn quadrants_recompose() {
        let tile = Tile::random(Some(42));
        let composed = Tile::from_quads(tile.nw(), tile.ne(), tile.sw(), tile.se());
        assert_eq!(composed, tile);
    }

    #[test]
    fn quadrants_are_centred() {
        let mut tile = Tile::EMPTY;
        tile.set(0, 0, true);
        // The corner cell of the nw quadrant moves to the corner of the
        // centred 4x4, which is (2, 2).
        assert!(tile.nw().get(2, 2));
        assert_eq!(tile.ne(), Tile::EMPTY);
        assert_eq!(tile.sw(), Tile::EMPTY);
        assert_eq!(tile.se(), Tile::EMPTY);
    }

    #[test]
    fn rows_roundtrip() {
        let tile = Tile::random(Some(7));
        assert_eq!(Tile::from_rows(tile.rows()), tile);
        let rows = blinker().rows();
        assert_eq!(rows[3], 0b0011_1000);
    }

    #[test]
    fn ascii_ignores_whitespace_and_validates_length() {
        assert_eq!(parse("0 1 ".repeat(32).as_str()).population(), 32);
        assert!(Tile::from_ascii("0101").is_err());
        assert!(Tile::from_ascii(&"0".repeat(65)).is_err());
    }

    #[test]
    fn masks_are_nested() {
        let filled = Tile::from_bits(u64::MAX);
        assert_eq!(filled.center6().population(), 36);
        assert_eq!(filled.center4().population(), 16);
        assert_eq!(filled.center2().population(), 4);
        assert_eq!(filled.center6().center4(), filled.center4());
        assert_eq!(filled.center4().center2(), filled.center2());
    }
}
