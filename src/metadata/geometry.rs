//! Spatial metadata of a volume.
//!
//! Voxel indices map to physical coordinates as `p = origin + D * diag(spacing) * index`,
//! where `D` is the direction matrix stored in row-major order. Column `i` of `D` is the
//! physical direction of index axis `i`. Index and size triplets are ordered (x, y, z).

use nalgebra::{Matrix3, Vector3};

pub const IDENTITY_DIRECTION: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
    pub direction: [f64; 9],
    pub size: [usize; 3],
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new([0, 0, 0])
    }
}

impl Geometry {
    /// Geometry with zero origin, unit spacing and identity direction
    pub fn new(size: [usize; 3]) -> Self {
        Self {
            origin: [0.0; 3],
            spacing: [1.0; 3],
            direction: IDENTITY_DIRECTION,
            size,
        }
    }

    pub fn with_origin(self, origin: [f64; 3]) -> Self {
        Self { origin, ..self }
    }

    pub fn with_spacing(self, spacing: [f64; 3]) -> Self {
        Self { spacing, ..self }
    }

    pub fn with_direction(self, direction: [f64; 9]) -> Self {
        Self { direction, ..self }
    }

    /// Array shape in (z, y, x) order
    pub fn shape(&self) -> (usize, usize, usize) {
        let [x, y, z] = self.size;
        (z, y, x)
    }

    pub fn numel(&self) -> usize {
        self.size.iter().product()
    }

    /// Voxel count, or `None` on overflow
    pub fn checked_numel(&self) -> Option<usize> {
        self.size
            .iter()
            .try_fold(1usize, |count, &len| count.checked_mul(len))
    }

    /// Whether origin, spacing and direction match exactly. Size is not compared.
    pub fn same_space(&self, other: &Geometry) -> bool {
        self.origin == other.origin
            && self.spacing == other.spacing
            && self.direction == other.direction
    }

    /// Direction matrix `D`
    pub fn direction_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_row_slice(&self.direction)
    }

    /// Matrix `D * diag(spacing)`
    pub fn index_to_physical_matrix(&self) -> Matrix3<f64> {
        self.direction_matrix() * Matrix3::from_diagonal(&Vector3::from(self.spacing))
    }

    /// Inverse of `D * diag(spacing)`, or `None` when the grid is degenerate
    pub fn physical_to_index_matrix(&self) -> Option<Matrix3<f64>> {
        self.index_to_physical_matrix()
            .try_inverse()
            .filter(|inverse| inverse.iter().all(|v| v.is_finite()))
    }

    pub fn index_to_physical(&self, index: [f64; 3]) -> [f64; 3] {
        let point =
            Vector3::from(self.origin) + self.index_to_physical_matrix() * Vector3::from(index);
        point.into()
    }

    pub fn physical_to_continuous_index(&self, point: [f64; 3]) -> Option<[f64; 3]> {
        let inverse = self.physical_to_index_matrix()?;
        let index = inverse * (Vector3::from(point) - Vector3::from(self.origin));
        Some(index.into())
    }

    /// Three-letter anatomical orientation code in the MetaImage convention (`RAI` for identity)
    pub fn orientation_code(&self) -> String {
        const LETTERS: [[char; 2]; 3] = [['R', 'L'], ['A', 'P'], ['I', 'S']];
        (0..3)
            .map(|axis| {
                let (row, value) = (0..3)
                    .map(|row| (row, self.direction[row * 3 + axis]))
                    .fold((0, 0.0_f64), |best, cur| {
                        if cur.1.abs() > best.1.abs() {
                            cur
                        } else {
                            best
                        }
                    });
                LETTERS[row][usize::from(value < 0.0)]
            })
            .collect()
    }
}

/// Affine map taking continuous indices of one grid to continuous indices of another
/// grid, through their shared physical space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexMap {
    matrix: Matrix3<f64>,
    offset: Vector3<f64>,
}

impl IndexMap {
    pub fn between(from: &Geometry, to: &Geometry) -> Option<Self> {
        let inverse = to.physical_to_index_matrix()?;
        Some(Self {
            matrix: inverse * from.index_to_physical_matrix(),
            offset: inverse * (Vector3::from(from.origin) - Vector3::from(to.origin)),
        })
    }

    pub fn apply(&self, index: [f64; 3]) -> [f64; 3] {
        (self.matrix * Vector3::from(index) + self.offset).into()
    }
}
