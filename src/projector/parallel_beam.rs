//! Ray-driven parallel-beam projection.
//!
//! One ray per detector bin, traced once in the transaxial plane; the axial
//! dimension is the vectorised inner loop, since a parallel-beam view has
//! identical transaxial geometry for every slice. Both directions walk the
//! same traversal, which makes the backprojection the exact adjoint of the
//! forward projection.

use crate::exports::{Anglef32, Intensityf32, Lengthf32};
use crate::grid::Grid;
use crate::image::Image;
use crate::ray::{ray_grid_hit, trace};
use crate::sinogram::Sinogram;

use super::Projector;

#[derive(Clone, Copy, Debug)]
pub struct ParallelBeam {
    pub bins: usize,
    pub bin_width: Lengthf32,
    /// Shift of the ray-casting origin along the detector direction; a pure
    /// geometric correction for a rotating centre of rotation.
    pub cor_offset: Lengthf32,
}

impl ParallelBeam {

    pub fn new(bins: usize, bin_width: Lengthf32, cor_offset: Lengthf32) -> Self {
        assert!(bins > 0, "A view must contain at least one bin");
        assert!(bin_width > 0.0, "Bin width must be positive");
        Self { bins, bin_width, cor_offset }
    }

    pub fn for_sinogram(sinogram: &Sinogram, cor_offset: Lengthf32) -> Self {
        Self::new(sinogram.bins, sinogram.bin_width, cor_offset)
    }

    /// Lateral offset of the ray belonging to a detector bin.
    #[inline]
    fn offset(&self, bin: usize) -> Lengthf32 {
        (bin as Lengthf32 - self.bins as Lengthf32 / 2.0 + 0.5) * self.bin_width
            + self.cor_offset
    }

}

impl Projector for ParallelBeam {

    fn project_view(&self, image: &Image, view: &mut [Intensityf32],
                    cs: Anglef32, sn: Anglef32) {
        let ns = image.grid.slices;
        debug_assert_eq!(view.len(), self.bins * ns);
        view.fill(0.0);
        for bin in 0..self.bins {
            if let Some(hit) = ray_grid_hit(cs, sn, self.offset(bin), image.grid) {
                let destination = &mut view[bin * ns..(bin + 1) * ns];
                trace(hit, |pixel, length| {
                    let voxels = &image.data[pixel * ns..(pixel + 1) * ns];
                    for (d, &v) in destination.iter_mut().zip(voxels) {
                        *d += length * v;
                    }
                });
            }
        }
    }

    fn backproject_view(&self, backprojection: &mut [Intensityf32], grid: Grid,
                        view: &[Intensityf32], cs: Anglef32, sn: Anglef32) {
        let ns = grid.slices;
        debug_assert_eq!(view.len(), self.bins * ns);
        debug_assert_eq!(backprojection.len(), grid.num_voxels());
        for bin in 0..self.bins {
            if let Some(hit) = ray_grid_hit(cs, sn, self.offset(bin), grid) {
                let source = &view[bin * ns..(bin + 1) * ns];
                trace(hit, |pixel, length| {
                    let voxels = &mut backprojection[pixel * ns..(pixel + 1) * ns];
                    for (v, &s) in voxels.iter_mut().zip(source) {
                        *v += length * s;
                    }
                });
            }
        }
    }

}
