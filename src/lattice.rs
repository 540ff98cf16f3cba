use crate::error::IsingError;
use crate::rng::UniformSource;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A spin, always -1 or +1.
pub type Spin = i8;

/// The two checkerboard colors, `(row + col) % 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Color {
    /// Sites with an even coordinate sum.
    Even,
    /// Sites with an odd coordinate sum.
    Odd,
}

impl Color {
    /// Both colors in update order.
    pub const ALL: [Color; 2] = [Color::Even, Color::Odd];

    /// Color of the site at (row, col).
    pub fn of(row: usize, col: usize) -> Self {
        Self::from_index((row + col) % 2)
    }

    /// 0 for even, 1 for odd.
    pub fn index(self) -> usize {
        match self {
            Color::Even => 0,
            Color::Odd => 1,
        }
    }

    /// Color from an index, only the parity is used.
    pub fn from_index(index: usize) -> Self {
        if index % 2 == 0 {
            Color::Even
        } else {
            Color::Odd
        }
    }

    /// The other color.
    pub fn opposite(self) -> Self {
        match self {
            Color::Even => Color::Odd,
            Color::Odd => Color::Even,
        }
    }
}

/// An LxL periodic grid of spins.
///
/// Spins are stored as two color sublattices, each L rows of `ceil(L/2)` slots. Within a row of a
/// sublattice, slot `k` holds the site at column `2k + ((row + color) % 2)`. For even L every
/// neighbor of a site lives in the other sublattice, which lets a half-sweep borrow one color
/// mutably while reading the other. For odd L the periodic seam joins sites of the same color and
/// rows holding `floor(L/2)` sites of a color leave their last slot unused.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Lattice {
    size: usize,
    sublattices: [Vec<Spin>; 2],
}

impl Lattice {
    /// Make a lattice with every spin set to `spin`.
    pub fn new_uniform(size: usize, spin: Spin) -> Result<Self, IsingError> {
        check_spin(0, spin)?;
        let half = Self::check_size(size)?.div_ceil(2);
        let mut sublattices = [alloc_sites(size, half)?, alloc_sites(size, half)?];
        sublattices
            .iter_mut()
            .for_each(|sub| sub.resize(size * half, spin));
        Ok(Self { size, sublattices })
    }

    /// Make a random lattice. Sites are drawn in row-major order, a uniform draw below 0.5
    /// gives -1 and anything else +1.
    pub fn new_random<R: UniformSource + ?Sized>(
        size: usize,
        rng: &mut R,
    ) -> Result<Self, IsingError> {
        let mut lattice = Self::new_uniform(size, 1)?;
        for row in 0..size {
            for col in 0..size {
                let spin = if rng.next_uniform() < 0.5 { -1 } else { 1 };
                lattice.set(row, col, spin);
            }
        }
        Ok(lattice)
    }

    /// Make a lattice from a row-major grid of spins.
    pub fn from_spins(size: usize, spins: &[Spin]) -> Result<Self, IsingError> {
        let expected = Self::check_size(size)?
            .checked_mul(size)
            .ok_or(IsingError::Allocation { size })?;
        if spins.len() != expected {
            return Err(IsingError::SizeMismatch {
                expected,
                found: spins.len(),
            });
        }
        spins
            .iter()
            .enumerate()
            .try_for_each(|(index, spin)| check_spin(index, *spin))?;

        let mut lattice = Self::new_uniform(size, 1)?;
        spins.iter().enumerate().for_each(|(index, spin)| {
            lattice.set(index / size, index % size, *spin);
        });
        Ok(lattice)
    }

    fn check_size(size: usize) -> Result<usize, IsingError> {
        if size == 0 {
            Err(IsingError::InvalidLatticeSize(size))
        } else {
            Ok(size)
        }
    }

    /// Edge length L.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of sites, L*L.
    pub fn num_sites(&self) -> usize {
        self.size * self.size
    }

    /// Slots per row of a single color sublattice.
    pub fn half_width(&self) -> usize {
        self.size.div_ceil(2)
    }

    /// True when every neighbor of a site has the other color, which holds for even L.
    pub fn is_bipartite(&self) -> bool {
        self.size % 2 == 0
    }

    /// Color of a site.
    pub fn color(&self, row: usize, col: usize) -> Color {
        Color::of(row, col)
    }

    fn locate(&self, row: usize, col: usize) -> (usize, usize) {
        let color = (row + col) % 2;
        (color, row * self.half_width() + col / 2)
    }

    /// Spin at (row, col).
    pub fn get(&self, row: usize, col: usize) -> Spin {
        let (color, index) = self.locate(row, col);
        self.sublattices[color][index]
    }

    /// Overwrite the spin at (row, col).
    ///
    /// # Panics
    /// If `spin` is not -1 or +1.
    pub fn set(&mut self, row: usize, col: usize, spin: Spin) {
        assert!(spin == 1 || spin == -1, "spins must be -1 or +1");
        let (color, index) = self.locate(row, col);
        self.sublattices[color][index] = spin;
    }

    /// The four periodic neighbors of a site: up, down, left, right.
    pub fn neighbors(&self, row: usize, col: usize) -> [(usize, usize); 4] {
        let l = self.size;
        [
            ((row + l - 1) % l, col),
            ((row + 1) % l, col),
            (row, (col + l - 1) % l),
            (row, (col + 1) % l),
        ]
    }

    /// Sum of the four neighboring spins, in -4..=4.
    pub fn neighbor_sum(&self, row: usize, col: usize) -> i32 {
        self.neighbors(row, col)
            .iter()
            .map(|(r, c)| i32::from(self.get(*r, *c)))
            .sum()
    }

    /// Iterate over `(row, col, spin)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Spin)> + '_ {
        (0..self.size)
            .flat_map(move |row| (0..self.size).map(move |col| (row, col, self.get(row, col))))
    }

    /// Copy the spins out in row-major order.
    pub fn to_row_major(&self) -> Vec<Spin> {
        self.iter().map(|(_, _, spin)| spin).collect()
    }

    /// The sublattice of one color, including the unused slots of odd edge lengths.
    pub fn sublattice(&self, color: Color) -> &[Spin] {
        &self.sublattices[color.index()]
    }

    /// Borrow `color` mutably and its opposite immutably.
    pub(crate) fn split_for_update(&mut self, color: Color) -> (&mut [Spin], &[Spin]) {
        let [even, odd] = &mut self.sublattices;
        match color {
            Color::Even => (even.as_mut_slice(), odd.as_slice()),
            Color::Odd => (odd.as_mut_slice(), even.as_slice()),
        }
    }
}

impl PartialEq for Lattice {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.iter().eq(other.iter())
    }
}

impl Eq for Lattice {}

fn check_spin(index: usize, value: Spin) -> Result<(), IsingError> {
    if value == 1 || value == -1 {
        Ok(())
    } else {
        Err(IsingError::InvalidSpin { index, value })
    }
}

fn alloc_sites(size: usize, half: usize) -> Result<Vec<Spin>, IsingError> {
    let n = size
        .checked_mul(half)
        .ok_or(IsingError::Allocation { size })?;
    let mut v = Vec::new();
    v.try_reserve_exact(n)
        .map_err(|_| IsingError::Allocation { size })?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::XorShift64;

    #[test]
    fn test_layout_roundtrip() {
        let spins = (0..36)
            .map(|i| if (i * 7) % 3 == 0 { -1 } else { 1 })
            .collect::<Vec<Spin>>();
        let lattice = Lattice::from_spins(6, &spins).unwrap();
        assert_eq!(lattice.to_row_major(), spins);
    }

    #[test]
    fn test_sublattice_colors() {
        // Every slot of the even sublattice is an even site.
        let mut lattice = Lattice::new_uniform(4, 1).unwrap();
        for row in 0..4 {
            for col in 0..4 {
                if Color::of(row, col) == Color::Even {
                    lattice.set(row, col, -1);
                }
            }
        }
        assert!(lattice.sublattice(Color::Even).iter().all(|s| *s == -1));
        assert!(lattice.sublattice(Color::Odd).iter().all(|s| *s == 1));
    }

    #[test]
    fn test_neighbors_opposite_color() {
        let lattice = Lattice::new_uniform(6, 1).unwrap();
        for (row, col, _) in lattice.iter() {
            let c = lattice.color(row, col);
            for (r, cc) in lattice.neighbors(row, col).iter() {
                assert_eq!(lattice.color(*r, *cc), c.opposite());
            }
        }
    }

    #[test]
    fn test_rejects_bad_sizes() {
        assert!(matches!(
            Lattice::new_uniform(0, 1),
            Err(IsingError::InvalidLatticeSize(0))
        ));
    }

    #[test]
    fn test_odd_size_layout() {
        let spins = (0..25)
            .map(|i| if (i * 3) % 7 < 3 { -1 } else { 1 })
            .collect::<Vec<Spin>>();
        let lattice = Lattice::from_spins(5, &spins).unwrap();
        assert!(!lattice.is_bipartite());
        assert_eq!(lattice.half_width(), 3);
        assert_eq!(lattice.to_row_major(), spins);
        // The periodic seam joins (0, 0) and (0, 4), both even.
        assert_eq!(lattice.color(0, 4), Color::Even);
        assert!(lattice.neighbors(0, 0).contains(&(0, 4)));
        assert!(lattice.neighbors(0, 0).contains(&(4, 0)));
    }

    #[test]
    fn test_equality_ignores_unused_slots() {
        let down = Lattice::new_uniform(3, -1).unwrap();
        let decoded = Lattice::from_spins(3, &[-1; 9]).unwrap();
        assert_ne!(down.sublattice(Color::Odd), decoded.sublattice(Color::Odd));
        assert_eq!(down, decoded);
    }

    #[test]
    fn test_from_spins_size_overflow() {
        assert!(matches!(
            Lattice::from_spins(1usize << 40, &[]),
            Err(IsingError::Allocation { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_spins() {
        let spins = vec![1, 1, 0, -1];
        assert!(matches!(
            Lattice::from_spins(2, &spins),
            Err(IsingError::InvalidSpin { index: 2, value: 0 })
        ));
        assert!(matches!(
            Lattice::from_spins(2, &spins[..3]),
            Err(IsingError::SizeMismatch {
                expected: 4,
                found: 3
            })
        ));
    }

    #[test]
    fn test_allocation_overflow() {
        assert!(matches!(
            Lattice::new_uniform(usize::MAX - 1, 1),
            Err(IsingError::Allocation { .. })
        ));
    }

    #[test]
    fn test_random_reference() {
        let mut rng = XorShift64::new(100);
        let lattice = Lattice::new_random(4, &mut rng).unwrap();
        assert_eq!(
            lattice.to_row_major(),
            vec![-1, -1, -1, -1, -1, 1, -1, 1, -1, -1, -1, -1, 1, 1, -1, 1]
        );
    }

    #[test]
    fn test_neighbor_sum_wraps() {
        let mut lattice = Lattice::new_uniform(4, 1).unwrap();
        lattice.set(3, 0, -1);
        lattice.set(0, 3, -1);
        assert_eq!(lattice.neighbor_sum(0, 0), 0);
    }
}
