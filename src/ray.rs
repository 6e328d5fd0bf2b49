//! Find the pixels traversed by a single projection ray, and the path length
//! within each.
//!
//! The algorithm is centred around two key simplifications:
//!
//! 1. Express the pixel pitch in terms of the components of the ray's
//!    direction vector. This allows trivial calculation of how far we must
//!    move along the ray before reaching a grid line, in either transaxial
//!    axis.
//!
//! 2. Keep per-axis counts of the crossings remaining before the ray leaves
//!    the grid; whichever axis exhausts its count first marks the exit
//!    boundary and terminates the traversal.
//!
//! Rays live entirely in the transaxial plane: a parallel-beam view has
//! identical geometry for every axial slice, so the slice dimension is
//! handled by the projector as a vectorised inner loop over the traversal
//! produced here.

use crate::exports::Lengthf32;
use crate::grid::Grid;

const EPS: Lengthf32 = 1e-5;

/// State of a ray at the point where it enters the grid.
///
/// Ephemeral: produced by [`ray_grid_hit`] and consumed immediately by
/// [`trace`]; never persisted.
#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    /// Flattened transaxial pixel index (`row * n + col`) of the entry pixel.
    pub pixel: i32,
    /// Index increment when crossing a column / row boundary.
    pub delta: [i32; 2],
    /// Path distance from the entry point to the first grid-line crossing in
    /// each axis.
    pub next_boundary: [Lengthf32; 2],
    /// Constant per-crossing path-length increment for each axis.
    pub step: [Lengthf32; 2],
    /// Crossings left in each axis before the ray exits the grid.
    pub remaining: [i32; 2],
}

/// Cast the ray of a given view angle and lateral detector offset against the
/// grid.
///
/// `cs`/`sn` must come from [`crate::angles::safe_trig`] (or an
/// [`crate::angles::AngleTable`]), which guarantees both components are
/// non-zero and never exactly diagonal. `offset` is the lateral distance of
/// the ray from the scanner axis, in the same units as the grid geometry.
///
/// Returns `None` when the ray misses the grid entirely.
pub fn ray_grid_hit(cs: Lengthf32, sn: Lengthf32, offset: Lengthf32, grid: Grid) -> Option<RayHit> {
    // The ray runs perpendicular to the detector direction (cs, sn), through
    // the point at `offset` along it.
    let dir    = [-sn, cs];
    let origin = [offset * cs, offset * sn];
    let h = grid.half_width();

    // Slab test: parameter interval for which the ray is inside [-h, h] along
    // each axis; the ray is inside the grid on the intersection of the two.
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far  = f32::INFINITY;
    for axis in 0..2 {
        let ta = (-h - origin[axis]) / dir[axis];
        let tb = ( h - origin[axis]) / dir[axis];
        t_near = t_near.max(ta.min(tb));
        t_far  = t_far .min(ta.max(tb));
    }
    if t_near >= t_far { return None; }

    let n = grid.n as i32;
    let mut pixel = 0;
    let mut delta         = [0; 2];
    let mut next_boundary = [0.0; 2];
    let mut step          = [0.0; 2];
    let mut remaining     = [0; 2];

    // Axis strides of the flattened transaxial index: col moves by 1, row by n.
    let stride = [1, n];

    for axis in 0..2 {
        // Entry coordinate in pixel units, in [0, n].
        let mut e = (origin[axis] + t_near * dir[axis] + h) / grid.pixel_size;
        // Floating-point subtractions which should give zero usually miss very
        // slightly; a small negative result would make `floor` pick a pixel
        // outside the grid.
        if e.abs() < EPS { e = 0.0; }
        let mut i = e.floor() as i32;
        // Entry exactly on the far face belongs to the last pixel.
        i = i.clamp(0, n - 1);
        let frac = e - i as Lengthf32;

        let d = dir[axis];
        step[axis] = grid.pixel_size / d.abs();
        if d > 0.0 {
            next_boundary[axis] = (1.0 - frac) * step[axis];
            remaining[axis] = n - i;
            delta[axis] = stride[axis];
        } else {
            next_boundary[axis] = frac * step[axis];
            remaining[axis] = i + 1;
            delta[axis] = -stride[axis];
        }
        pixel += i * stride[axis];
    }

    Some(RayHit { pixel, delta, next_boundary, step, remaining })
}

/// Walk a traversal, calling `visit(pixel, path_length)` for every pixel the
/// ray crosses, in order from entry to exit.
#[inline]
pub fn trace(mut hit: RayHit, mut visit: impl FnMut(usize, Lengthf32)) {
    // How far we have moved since entering the grid
    let mut here = 0.0;

    loop {
        // Which grid line will be hit next, and its position along the ray
        let axis = (hit.next_boundary[1] < hit.next_boundary[0]) as usize;
        let boundary = hit.next_boundary[axis];

        // The path length within the pixel we are about to leave
        let length = boundary - here;
        if length > 0.0 {
            visit(hit.pixel as usize, length);
        }

        // Move along the ray until it leaves this pixel
        here = boundary;

        // Find the next grid line in this axis
        hit.next_boundary[axis] += hit.step[axis];

        // Move the index across the boundary we are crossing
        hit.pixel += hit.delta[axis];
        hit.remaining[axis] -= 1;

        // If we have traversed the whole grid, we're finished
        if hit.remaining[axis] == 0 { break; }
    }
}
