//! The size and granularity of the voxel grid in which images are
//! reconstructed.

use crate::exports::Lengthf32;
use crate::index::BoxDim_u;

/// Square transaxial grid of `n x n` pixels with `slices` axial planes.
///
/// All geometry is expressed in detector-bin-width units; `pixel_size` is the
/// transaxial pitch in those units. The grid is centred on the scanner axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid {
    pub n: usize,
    pub slices: usize,
    pub pixel_size: Lengthf32,
}

impl Grid {

    pub fn new(n: usize, slices: usize, pixel_size: Lengthf32) -> Self {
        assert!(n > 0 && slices > 0, "Grid dimensions must be non-zero");
        assert!(pixel_size > 0.0, "Grid pixel size must be positive");
        Self { n, slices, pixel_size }
    }

    /// Transaxial half-width, i.e. the distance from the scanner axis to the
    /// edge of the grid.
    pub fn half_width(&self) -> Lengthf32 {
        self.n as Lengthf32 * self.pixel_size / 2.0
    }

    pub fn dim(&self) -> BoxDim_u { [self.n, self.n, self.slices] }

    pub fn num_pixels(&self) -> usize { self.n * self.n }

    pub fn num_voxels(&self) -> usize { self.n * self.n * self.slices }

    /// Transaxial centre of the pixel with the given (row, col) index.
    pub fn pixel_centre(&self, [row, col]: [usize; 2]) -> (Lengthf32, Lengthf32) {
        let h = self.half_width();
        let p = self.pixel_size;
        ((col as Lengthf32 + 0.5) * p - h,
         (row as Lengthf32 + 0.5) * p - h)
    }

}

#[cfg(test)]
mod test_grid {
    use super::*;
    use rstest::rstest;
    use float_eq::assert_float_eq;

    #[rstest(/**/ index ,  expected_centre,
             case([0,0], (-1.0, -1.0)),
             case([0,1], ( 1.0, -1.0)),
             case([1,0], (-1.0,  1.0)),
             case([1,1], ( 1.0,  1.0)),
    )]
    fn test_pixel_centre(index: [usize; 2], expected_centre: (Lengthf32, Lengthf32)) {
        let grid = Grid::new(2, 1, 2.0);
        let (x, y) = grid.pixel_centre(index);
        assert_float_eq!((x, y), expected_centre, ulps <= (1, 1));
    }

    #[test]
    fn half_width_spans_half_the_grid() {
        let grid = Grid::new(128, 47, 0.5);
        assert_float_eq!(grid.half_width(), 32.0, ulps <= 1);
        assert_eq!(grid.num_voxels(), 128 * 128 * 47);
    }
}
