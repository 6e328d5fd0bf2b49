//! Deterministic ordering of projection angles into subsets.
//!
//! Subsets are processed in bit-reversal (van der Corput) order, which
//! maximises the angular distance between consecutively processed subsets and
//! noticeably accelerates convergence compared to a naive sequential sweep.
//! The ordering is generated once per reconstruction run and reused by every
//! iteration.

/// Bit-reversed binary fraction of `d`: the bits of `d`, read from least to
/// most significant, accumulate 1/2, 1/4, 1/8, ...
fn bit_reversed_fraction(mut d: usize) -> f64 {
    let mut fraction = 0.0;
    let mut place = 0.5;
    while d > 0 {
        if d & 1 == 1 { fraction += place; }
        place /= 2.0;
        d >>= 1;
    }
    fraction
}

/// Partition `0..total_angles` into subsets of `subset_size` angles.
///
/// Each subset is a comb of angles with stride `ceil(total / size)`, whose
/// starting angle is placed by the bit-reversed fraction of the subset index;
/// collisions with already-taken angles are resolved by linear probing. When
/// `subset_size` does not divide `total_angles`, the leftover angles form one
/// final, smaller subset.
///
/// Postcondition: the concatenation of all subsets is a permutation of
/// `0..total_angles`.
pub fn generate_subsets(total_angles: usize, subset_size: usize) -> Vec<Vec<usize>> {
    assert!(subset_size >= 1 && subset_size <= total_angles,
            "subset size {subset_size} outside 1..={total_angles}");

    let stride = (total_angles + subset_size - 1) / subset_size;
    let count = total_angles / subset_size;
    let mut taken = vec![false; total_angles];
    let mut subsets = Vec::with_capacity(count + 1);

    for d in 0..count {
        let start = (bit_reversed_fraction(d)
                     * (total_angles as f64 / subset_size as f64)) as usize;
        let mut subset = Vec::with_capacity(subset_size);
        for k in 0..subset_size {
            let mut angle = (start + k * stride) % total_angles;
            while taken[angle] { angle = (angle + 1) % total_angles; }
            taken[angle] = true;
            subset.push(angle);
        }
        subsets.push(subset);
    }

    // Whatever remains when the subset size does not divide the angle count
    let leftover: Vec<usize> = (0..total_angles).filter(|&a| !taken[a]).collect();
    if !leftover.is_empty() { subsets.push(leftover); }

    subsets
}
