//! Edge-preserving regularization potentials over the 6-connected voxel
//! neighbourhood.
//!
//! A prior supplies, per voxel:
//!
//! + `derivative`: the first directional derivative of the potential, which
//!   the engine adds (scaled by `beta`) to the EM sensitivity denominator;
//!
//! + `curvature_bound`: an upper bound on the potential's second derivative,
//!   the quantity that guards the nonnegativity of that denominator;
//!
//! + `potential`: the scalar potential value, for objective reporting only.
//!
//! Out-of-range neighbours are treated as equal to the centre voxel, so every
//! boundary direction contributes zero; no direction wraps around the grid.

use crate::image::Image;
use crate::index::Index3_u;

/// Tuning constants shared by all voxels of one prior instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriorParameters {
    /// Edge threshold: differences well above `delta` are treated as genuine
    /// edges and penalised less (Geman-McClure).
    pub delta: f32,
    /// Smoothing constant inside the gradient-magnitude square root, keeping
    /// the potential differentiable at zero gradient (Total-Variation).
    pub epsilon: f32,
}

impl Default for PriorParameters {
    fn default() -> Self { Self { delta: 0.1, epsilon: 1e-6 } }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Prior {
    None,
    Gaussian,
    TotalVariation(PriorParameters),
    GemanMcClure(PriorParameters),
}

/// The 6 neighbour directions: (axis, forward?).
const DIRECTIONS: [(usize, bool); 6] =
    [(0, true), (0, false), (1, true), (1, false), (2, true), (2, false)];

fn neighbour(dim: Index3_u, v: Index3_u, axis: usize, forward: bool) -> Option<Index3_u> {
    let mut nb = v;
    if forward {
        if v[axis] + 1 >= dim[axis] { return None; }
        nb[axis] += 1;
    } else {
        if v[axis] == 0 { return None; }
        nb[axis] -= 1;
    }
    Some(nb)
}

/// Smoothed L2 norm of the forward-difference gradient at `p`.
fn gradient_magnitude(image: &Image, p: Index3_u, epsilon: f32) -> f32 {
    let dim = image.grid.dim();
    let here = image[p];
    let mut sum_sq = epsilon;
    for axis in 0..3 {
        if let Some(fwd) = neighbour(dim, p, axis, true) {
            let d = image[fwd] - here;
            sum_sq += d * d;
        }
    }
    sum_sq.sqrt()
}

impl Prior {

    pub fn is_none(&self) -> bool { matches!(self, Prior::None) }

    /// First derivative of the potential with respect to the voxel at `v`,
    /// summed over the 6-neighbourhood.
    pub fn derivative(&self, image: &Image, v: Index3_u) -> f32 {
        let dim = image.grid.dim();
        let here = image[v];
        match *self {
            Prior::None => 0.0,

            Prior::Gaussian => {
                let mut sum = 0.0;
                for (axis, forward) in DIRECTIONS {
                    if let Some(nb) = neighbour(dim, v, axis, forward) {
                        sum += here - image[nb];
                    }
                }
                sum
            }

            Prior::TotalVariation(PriorParameters { epsilon, .. }) => {
                // The centre voxel appears in its own gradient magnitude and,
                // as a forward neighbour, in the magnitude of each backward
                // neighbour.
                let mut sum = 0.0;
                let mut forward_diffs = 0.0;
                for axis in 0..3 {
                    if let Some(bwd) = neighbour(dim, v, axis, false) {
                        sum += (here - image[bwd]) / gradient_magnitude(image, bwd, epsilon);
                    }
                    if let Some(fwd) = neighbour(dim, v, axis, true) {
                        forward_diffs += image[fwd] - here;
                    }
                }
                sum - forward_diffs / gradient_magnitude(image, v, epsilon)
            }

            Prior::GemanMcClure(PriorParameters { delta, .. }) => {
                let d2 = delta * delta;
                let mut sum = 0.0;
                for (axis, forward) in DIRECTIONS {
                    if let Some(nb) = neighbour(dim, v, axis, forward) {
                        let r = here - image[nb];
                        let q = 1.0 + r * r / d2;
                        sum += (r / d2) / (q * q);
                    }
                }
                sum
            }
        }
    }

    /// Upper bound on the second derivative of the potential at `v`.
    pub fn curvature_bound(&self, image: &Image, v: Index3_u) -> f32 {
        match *self {
            Prior::None => 0.0,
            // Quadratic potential: the curvature is the number of neighbour
            // directions actually present at this voxel.
            Prior::Gaussian => {
                let dim = image.grid.dim();
                DIRECTIONS.iter()
                    .filter(|&&(axis, forward)| neighbour(dim, v, axis, forward).is_some())
                    .count() as f32
            }
            // No algebraic second-derivative bound is used for TV.
            Prior::TotalVariation(_) => 0.0,
            Prior::GemanMcClure(PriorParameters { delta, .. }) => 1.0 / (delta * delta),
        }
    }

    /// Largest possible `curvature_bound` for any voxel of any image; used
    /// for the engine's pre-run stability report.
    pub fn max_curvature_bound(&self) -> f32 {
        match *self {
            Prior::None | Prior::TotalVariation(_) => 0.0,
            Prior::Gaussian => DIRECTIONS.len() as f32,
            Prior::GemanMcClure(PriorParameters { delta, .. }) => 1.0 / (delta * delta),
        }
    }

    /// Scalar potential value at `v`. Diagnostic / objective use only: the
    /// update rule never reads it.
    pub fn potential(&self, image: &Image, v: Index3_u) -> f32 {
        let dim = image.grid.dim();
        let here = image[v];
        match *self {
            Prior::None => 0.0,

            // Half the sum of squared forward differences, over the axes
            // where a forward neighbour exists.
            Prior::Gaussian => {
                let mut sum = 0.0;
                for axis in 0..3 {
                    if let Some(fwd) = neighbour(dim, v, axis, true) {
                        let d = image[fwd] - here;
                        sum += d * d;
                    }
                }
                sum / 2.0
            }

            Prior::TotalVariation(PriorParameters { epsilon, .. }) => {
                gradient_magnitude(image, v, epsilon)
            }

            Prior::GemanMcClure(PriorParameters { delta, .. }) => {
                let d2 = delta * delta;
                let mut sum = 0.0;
                for axis in 0..3 {
                    if let Some(fwd) = neighbour(dim, v, axis, true) {
                        let r = image[fwd] - here;
                        sum += r * r / (2.0 * (d2 + r * r));
                    }
                }
                sum
            }
        }
    }

    /// Penalty objective over the whole image: the sum of per-voxel
    /// potentials.
    pub fn objective(&self, image: &Image) -> f64 {
        if self.is_none() { return 0.0; }
        let [nr, nc, ns] = image.grid.dim();
        let mut total = 0.0;
        for r in 0..nr {
            for c in 0..nc {
                for s in 0..ns {
                    total += self.potential(image, [r, c, s]) as f64;
                }
            }
        }
        total
    }

}
