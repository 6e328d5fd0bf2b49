//! Projection-angle table.
//!
//! Built once per reconstruction run: parallel-beam views are equally spaced
//! over half a revolution. The table owns the two numerical fixes that keep
//! the ray caster's reciprocal-slope arithmetic well defined:
//!
//! + angles at odd multiples of 45 degrees are perturbed by a small epsilon,
//!   so the transaxial slope components never coincide exactly;
//!
//! + sine/cosine values of negligible magnitude are clamped to a signed
//!   epsilon rather than zero.

use std::f32::consts::PI;

use crate::exports::Anglef32;

/// Sine or cosine magnitudes below this are clamped (keeping their sign).
pub const TRIG_EPS: Anglef32 = 1e-6;

/// Perturbation applied to angles in the 45-degree family, in radians.
const DIAGONAL_NUDGE: Anglef32 = 1e-4;

#[derive(Clone, Debug)]
pub struct AngleTable {
    pub theta: Vec<Anglef32>,
    pub cos: Vec<Anglef32>,
    pub sin: Vec<Anglef32>,
}

impl AngleTable {

    /// Equally spaced angles `theta_a = (a + angle_shift) * pi / n`.
    ///
    /// `angle_shift` is expressed as a fraction of the angular step, matching
    /// the convention of interleaved acquisitions.
    pub fn new(n: usize, angle_shift: Anglef32) -> Self {
        assert!(n > 0, "Angle table must contain at least one angle");
        let step = PI / n as Anglef32;
        let mut table = Self {
            theta: Vec::with_capacity(n),
            cos:   Vec::with_capacity(n),
            sin:   Vec::with_capacity(n),
        };
        for a in 0..n {
            let theta = (a as Anglef32 + angle_shift) * step;
            let (cs, sn) = safe_trig(theta);
            table.theta.push(theta);
            table.cos.push(cs);
            table.sin.push(sn);
        }
        table
    }

    pub fn len(&self) -> usize { self.theta.len() }

    pub fn is_empty(&self) -> bool { self.theta.is_empty() }

    /// `(cos, sin)` for angle index `a`, already perturbed and clamped.
    #[inline]
    pub fn trig(&self, a: usize) -> (Anglef32, Anglef32) {
        (self.cos[a], self.sin[a])
    }

}

/// Well-conditioned `(cos, sin)` for a projection angle.
pub fn safe_trig(theta: Anglef32) -> (Anglef32, Anglef32) {
    let (mut sn, mut cs) = theta.sin_cos();
    // A slope through an exact diagonal makes the entry computation singular.
    if (cs.abs() - sn.abs()).abs() < TRIG_EPS {
        let (s, c) = (theta + DIAGONAL_NUDGE).sin_cos();
        sn = s;
        cs = c;
    }
    if cs.abs() < TRIG_EPS { cs = TRIG_EPS.copysign(cs); }
    if sn.abs() < TRIG_EPS { sn = TRIG_EPS.copysign(sn); }
    (cs, sn)
}
