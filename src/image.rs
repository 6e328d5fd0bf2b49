use crate::exports::Intensityf32;
use crate::grid::Grid;
use crate::index::{index3_to_1, Index1_u, Index3_u};

pub type ImageData = Vec<Intensityf32>;

/// A flattened 3D voxel grid.
///
/// Internally the axial dimension is the fastest-varying index (see
/// `crate::index`); callers exchange data through [`Image::copy_image`] and
/// [`Image::read_image`], which convert from/to the conventional slice-major
/// order used by flat image files.
#[derive(Clone, Debug)]
pub struct Image {
    pub grid: Grid,
    pub data: ImageData,
}

impl core::ops::IndexMut<Index1_u> for Image {
    #[inline]
    fn index_mut(&mut self, i: Index1_u) -> &mut Self::Output { &mut self.data[i] }
}

impl core::ops::Index<Index1_u> for Image {
    type Output = Intensityf32;
    #[inline]
    fn index(&self, i: Index1_u) -> &Self::Output { &self.data[i] }
}

impl core::ops::IndexMut<Index3_u> for Image {
    fn index_mut(&mut self, i3: Index3_u) -> &mut Self::Output {
        let i1 = index3_to_1(i3, self.grid.dim());
        &mut self.data[i1]
    }
}

impl core::ops::Index<Index3_u> for Image {
    type Output = Intensityf32;
    fn index(&self, i3: Index3_u) -> &Self::Output {
        let i1 = index3_to_1(i3, self.grid.dim());
        &self.data[i1]
    }
}

impl Image {

    pub fn new(grid: Grid, data: ImageData) -> Self {
        assert_eq!(data.len(), grid.num_voxels(),
                   "Image data does not match grid dimensions {:?}", grid.dim());
        Image { grid, data }
    }

    pub fn ones(grid: Grid) -> Self {
        Self { data: vec![1.0; grid.num_voxels()], grid }
    }

    pub fn empty(grid: Grid) -> Self {
        Self::new(grid, vec![0.0; grid.num_voxels()])
    }

    // A new empty data store with matching size
    pub fn zeros_buffer(grid: Grid) -> ImageData { vec![0.0; grid.num_voxels()] }

    /// Bulk transfer from a caller buffer in slice-major order
    /// (`(slice * n + row) * n + col`) into the internal axial-fastest layout.
    pub fn copy_image(&mut self, caller: &[Intensityf32]) {
        let [n, _, ns] = self.grid.dim();
        assert_eq!(caller.len(), self.data.len(),
                   "Caller image buffer does not match grid dimensions");
        for s in 0..ns {
            for r in 0..n {
                for c in 0..n {
                    self.data[(r * n + c) * ns + s] = caller[(s * n + r) * n + c];
                }
            }
        }
    }

    /// Bulk transfer into a caller buffer in slice-major order; the inverse
    /// of [`Image::copy_image`].
    pub fn read_image(&self, caller: &mut [Intensityf32]) {
        let [n, _, ns] = self.grid.dim();
        assert_eq!(caller.len(), self.data.len(),
                   "Caller image buffer does not match grid dimensions");
        for s in 0..ns {
            for r in 0..n {
                for c in 0..n {
                    caller[(s * n + r) * n + c] = self.data[(r * n + c) * ns + s];
                }
            }
        }
    }

}
