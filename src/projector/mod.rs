//! Overall structure of forward and backward projections.
//!
//! The [`Projector`] trait abstracts the per-view projection pair; the single
//! production implementation is [`ParallelBeam`]. Dispatch happens once per
//! run (the engine is generic over `P: Projector`), never per ray.
//!
//! [`project_subset`] performs the forward/backward passes of one OSEM
//! subset: the subset's angles are folded in parallel into per-thread
//! numerator/denominator accumulators, which are element-wise reduced after
//! all workers join. The caller (the engine) only sees the joined result, so
//! the image update always reads completed accumulators.

pub use parallel_beam::ParallelBeam;

pub mod parallel_beam;

use rayon::prelude::*;

use crate::angles::AngleTable;
use crate::config::Weighting;
use crate::exports::{Anglef32, Intensityf32};
use crate::grid::Grid;
use crate::image::{Image, ImageData};
use crate::sinogram::Sinogram;

/// Abstract interface for forward-backward projection implementations
pub trait Projector {
    /// Forward-project `image` into one angular view (`bin * slices + slice`
    /// layout). Overwrites `view`; no side effects outside it.
    fn project_view(&self, image: &Image, view: &mut [Intensityf32],
                    cs: Anglef32, sn: Anglef32);

    /// Exact adjoint of [`Projector::project_view`]: accumulate
    /// `path_length * view value` into every voxel the view's rays traverse.
    fn backproject_view(&self, backprojection: &mut [Intensityf32], grid: Grid,
                        view: &[Intensityf32], cs: Anglef32, sn: Anglef32);
}

/// Numerator and sensitivity accumulators of one OSEM subset, summed over
/// all of the subset's angles.
pub struct SubsetAccumulators {
    pub numerator: ImageData,
    pub denominator: ImageData,
}

// Data needed to be passed efficiently between the projection of one angle
// and the next, because of the constraints imposed by `fold`.
struct FoldState {
    numerator: ImageData,
    denominator: ImageData,
    // Scratch view: holds the forward estimate, then the ratio, of the angle
    // currently being processed.
    ratio: Vec<Intensityf32>,
    // Scratch view for the unity / mask-valued sensitivity backprojection.
    weights: Vec<Intensityf32>,
}

/// Forward- and back-project every angle of one subset.
///
/// Per angle: forward-project the current estimate, form the measured/estimate
/// ratio (an estimate of exactly zero leaves the ratio at one; a mask bin
/// multiplies it), backproject the ratio into the numerator and a unity or
/// mask-valued view into the denominator.
pub fn project_subset<P: Projector + Sync>(
    projector: &P,
    image    : &Image,
    measured : &Sinogram,
    mask     : Option<&[u32]>,
    weighting: Weighting,
    angles   : &AngleTable,
    subset   : &[usize],
) -> SubsetAccumulators {
    let view_len = measured.view_len();

    // Closure preparing the state needed by `fold`: will be called by `fold`
    // at the start of every thread that is launched.
    let initial_thread_state = || FoldState {
        numerator:   Image::zeros_buffer(image.grid),
        denominator: Image::zeros_buffer(image.grid),
        ratio:       vec![0.0; view_len],
        weights:     vec![1.0; view_len],
    };

    // -------- Project all of the subset's angles forwards and backwards ----
    let fold_result = subset
        .par_iter()
        .fold(initial_thread_state, |mut state, &angle| {
            let (cs, sn) = angles.trig(angle);

            // Forward projection of the current image estimate
            projector.project_view(image, &mut state.ratio, cs, sn);

            // Ratio against the measured data, in place
            let measured_view = measured.view(angle);
            let mask_view = mask.map(|m| &m[angle * view_len..(angle + 1) * view_len]);
            for i in 0..view_len {
                let estimate = state.ratio[i];
                let mut ratio = if estimate == 0.0 { 1.0 } else { measured_view[i] / estimate };
                if let Some(m) = mask_view { ratio *= m[i] as Intensityf32; }
                state.ratio[i] = ratio;
            }

            // Backprojection of the ratio onto the numerator
            projector.backproject_view(&mut state.numerator, image.grid, &state.ratio, cs, sn);

            // Backprojection of the subset sensitivity onto the denominator
            match (weighting, mask_view) {
                (Weighting::Masked, Some(m)) => {
                    for (w, &v) in state.weights.iter_mut().zip(m) { *w = v as Intensityf32; }
                }
                _ => state.weights.fill(1.0),
            }
            projector.backproject_view(&mut state.denominator, image.grid, &state.weights, cs, sn);

            state
        });

    // -------- combine the accumulators calculated on each thread -----------
    let (numerator, denominator) = fold_result
        .map(|state| (state.numerator, state.denominator))
        .reduce(|| (Image::zeros_buffer(image.grid), Image::zeros_buffer(image.grid)),
                |(ln, ld), (rn, rd)| (elementwise_add(ln, rn), elementwise_add(ld, rd)));

    SubsetAccumulators { numerator, denominator }
}

/// Forward-project every view of a sinogram; used when simulating data.
pub fn forward_project_all<P: Projector + Sync>(
    projector: &P,
    image    : &Image,
    angles   : &AngleTable,
    sinogram : &mut Sinogram,
) {
    assert_eq!(sinogram.angles, angles.len(),
               "Sinogram angle count does not match the angle table");
    let view_len = sinogram.view_len();
    sinogram.data
        .par_chunks_mut(view_len)
        .enumerate()
        .for_each(|(angle, view)| {
            let (cs, sn) = angles.trig(angle);
            projector.project_view(image, view, cs, sn);
        });
}

pub fn elementwise_add(a: Vec<f32>, b: Vec<f32>) -> Vec<f32> {
    a.iter().zip(b.iter()).map(|(l, r)| l + r).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angles::safe_trig;
    use float_eq::assert_float_eq;

    fn dot(a: &[f32], b: &[f32]) -> f64 {
        a.iter().zip(b).map(|(&x, &y)| x as f64 * y as f64).sum()
    }

    #[test]
    fn projecting_an_all_zero_image_gives_an_all_zero_sinogram() {
        let grid = Grid::new(8, 3, 1.0);
        let image = Image::empty(grid);
        let angles = AngleTable::new(12, 0.0);
        let projector = ParallelBeam::new(10, 1.0, 0.0);
        let mut sinogram = Sinogram::new(10, 12, 3, 1.0);
        forward_project_all(&projector, &image, &angles, &mut sinogram);
        assert!(sinogram.data.iter().all(|&x| x == 0.0));
    }

    // <A x, y> == <x, At y>: backprojection is the exact adjoint of forward
    // projection.
    #[test]
    fn backprojection_is_the_adjoint_of_projection() {
        let grid = Grid::new(5, 2, 1.0);
        let projector = ParallelBeam::new(7, 1.0, 0.25);
        let (cs, sn) = safe_trig(0.7);

        // Deterministic, structureless test vectors
        let x = Image::new(grid, (0..grid.num_voxels())
                           .map(|i| (i as f32 * 0.7129).sin().abs() + 0.1)
                           .collect());
        let y: Vec<f32> = (0..7 * 2)
            .map(|i| (i as f32 * 1.3371).cos().abs() + 0.1)
            .collect();

        let mut ax = vec![0.0; 7 * 2];
        projector.project_view(&x, &mut ax, cs, sn);

        let mut aty = Image::zeros_buffer(grid);
        projector.backproject_view(&mut aty, grid, &y, cs, sn);

        assert_float_eq!(dot(&ax, &y), dot(&x.data, &aty), rel <= 1e-5);
    }
}
