//! Synthetic test objects and simulated measurements, for regression
//! fixtures and end-to-end exercising of the reconstruction chain.

use itertools::iproduct;
use rand::Rng;
use rand_distr::{Distribution, Poisson};

use crate::exports::{Intensityf32, Lengthf32};
use crate::grid::Grid;
use crate::image::Image;
use crate::sinogram::Sinogram;

/// Uniform square region of `2*half x 2*half` transaxial pixels centred in
/// the grid, extended through every slice.
pub fn centred_square(grid: Grid, half: usize, value: Intensityf32) -> Image {
    assert!(2 * half <= grid.n, "Region does not fit in the grid");
    let lo = grid.n / 2 - half;
    let hi = grid.n / 2 + half;
    let mut image = Image::empty(grid);
    for (r, c, s) in iproduct!(lo..hi, lo..hi, 0..grid.slices) {
        image[[r, c, s]] = value;
    }
    image
}

/// Uniform transaxial disc of the given radius, extended through every slice.
pub fn centred_disc(grid: Grid, radius: Lengthf32, value: Intensityf32) -> Image {
    let mut image = Image::empty(grid);
    for (r, c) in iproduct!(0..grid.n, 0..grid.n) {
        let (x, y) = grid.pixel_centre([r, c]);
        if x * x + y * y <= radius * radius {
            for s in 0..grid.slices {
                image[[r, c, s]] = value;
            }
        }
    }
    image
}

/// Replace every positive sinogram bin with a Poisson sample of
/// `value * counts_per_unit`, scaled back to the original units. Zero bins
/// stay zero, so simulated data never turns empty regions on.
pub fn add_counting_noise(sinogram: &mut Sinogram, counts_per_unit: f32,
                          rng: &mut impl Rng) {
    assert!(counts_per_unit > 0.0, "Count scale must be positive");
    for v in &mut sinogram.data {
        if *v > 0.0 {
            let mean = (*v * counts_per_unit) as f64;
            if let Ok(poisson) = Poisson::new(mean) {
                *v = poisson.sample(rng) as f32 / counts_per_unit;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn centred_square_holds_the_expected_mass() {
        let grid = Grid::new(4, 2, 1.0);
        let image = centred_square(grid, 1, 3.0);
        let total: f32 = image.data.iter().sum();
        assert_float_eq!(total, 2.0 * 2.0 * 2.0 * 3.0, ulps <= 1);
        assert_eq!(image[[1, 1, 0]], 3.0);
        assert_eq!(image[[0, 0, 0]], 0.0);
    }

    #[test]
    fn disc_is_contained_in_its_radius() {
        let grid = Grid::new(16, 1, 1.0);
        let image = centred_disc(grid, 5.0, 1.0);
        for r in 0..16 {
            for c in 0..16 {
                let (x, y) = grid.pixel_centre([r, c]);
                if image[[r, c, 0]] > 0.0 {
                    assert!(x * x + y * y <= 25.0);
                }
            }
        }
        // The disc covers roughly pi r^2 pixels
        let covered = image.data.iter().filter(|&&v| v > 0.0).count();
        assert!((60..100).contains(&covered), "covered {covered} pixels");
    }

    #[test]
    fn counting_noise_preserves_zeros_and_roughly_the_mean() {
        let mut sinogram = Sinogram::new(16, 4, 1, 1.0);
        for (i, v) in sinogram.data.iter_mut().enumerate() {
            if i % 2 == 0 { *v = 5.0; }
        }
        let mut rng = StdRng::seed_from_u64(7);
        add_counting_noise(&mut sinogram, 1000.0, &mut rng);

        let (mut sum, mut count) = (0.0, 0);
        for (i, &v) in sinogram.data.iter().enumerate() {
            if i % 2 == 1 {
                assert_eq!(v, 0.0);
            } else {
                sum += v;
                count += 1;
            }
        }
        // 5000 expected counts per bin: the sample mean is within a percent
        assert_float_eq!(sum / count as f32, 5.0, rel <= 0.01);
    }
}
