//! The Ordered-Subsets Expectation-Maximization driver.
//!
//! One engine instance owns the angle table, subset ordering and worker pool
//! for a reconstruction geometry; `run` executes a fixed number of iterations
//! to completion or fails fast on numerical divergence. Subsets execute
//! strictly in scheduler order (the ordering affects convergence); the
//! parallelism lives *within* a subset, across its projection angles, and all
//! workers join before the image update reads the accumulators.

use ndarray::azip;

use crate::angles::AngleTable;
use crate::config::{Config, Weighting};
use crate::error::{alloc_buffer, Error};
use crate::exports::Intensityf32;
use crate::grid::Grid;
use crate::image::Image;
use crate::index::{index1_to_3, index3_to_1};
use crate::prior::Prior;
use crate::projector::{project_subset, ParallelBeam, SubsetAccumulators};
use crate::sinogram::Sinogram;
use crate::subsets::generate_subsets;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Iterations,
    Subsets,
}

impl Verbosity {
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Verbosity::Quiet,
            1 => Verbosity::Iterations,
            _ => Verbosity::Subsets,
        }
    }
}

/// Summary of a completed run.
#[derive(Clone, Copy, Debug)]
pub struct RunStats {
    pub iterations: usize,
    pub subsets_processed: usize,
    /// Sensitivity sum of the last processed subset.
    pub last_sensitivity_sum: f64,
    /// Final penalty objective, when a prior is configured.
    pub objective: Option<f64>,
}

pub struct Osem {
    pub grid: Grid,
    pub angles: AngleTable,
    pub projector: ParallelBeam,
    pub subsets: Vec<Vec<usize>>,
    pub prior: Prior,
    pub beta: f32,
    pub weighting: Weighting,
    pub upper_bound: f32,
    pool: rayon::ThreadPool,
}

impl Osem {

    pub fn new(config: &Config) -> Result<Self, Error> {
        let grid = config.grid();
        let angles = AngleTable::new(config.angles(), config.angle_shift);
        let projector = ParallelBeam::new(config.sinogram.bins,
                                          config.sinogram.bin_width,
                                          config.center_of_rotation_offset);
        let subsets = generate_subsets(angles.len(), config.subset_size());
        // Fixed-size worker pool, never resized after this point
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build()
            .map_err(|_| Error::Allocation { what: "worker pool", bytes: 0 })?;
        Ok(Self {
            grid, angles, projector, subsets,
            prior: config.prior.build(),
            beta: config.beta,
            weighting: config.weighting,
            upper_bound: config.range_upper_bound,
            pool,
        })
    }

    /// Run `niter` OSEM iterations over `image` in place.
    ///
    /// Unless `resume` is set, the estimate is first reset to a uniform ones
    /// image. The engine owns `image` and the accumulators for the duration
    /// of the call; it completes the full `niter * subsets * angles` amount
    /// of work or returns the first fatal error.
    pub fn run(&self,
               image    : &mut Image,
               measured : &Sinogram,
               mask     : Option<&[u32]>,
               niter    : usize,
               resume   : bool,
               verbosity: Verbosity,
    ) -> Result<RunStats, Error> {
        assert_eq!(image.grid, self.grid,
                   "Image grid does not match the engine geometry");
        assert_eq!(measured.angles, self.angles.len(),
                   "Sinogram angle count does not match the engine geometry");
        assert_eq!(measured.bins, self.projector.bins,
                   "Sinogram bin count does not match the engine geometry");
        assert_eq!(measured.slices, self.grid.slices,
                   "Sinogram slice count does not match the engine geometry");
        if let Some(m) = mask {
            assert_eq!(m.len(), measured.len(),
                       "Mask length does not match the sinogram");
        }

        if !resume {
            image.data.fill(1.0);
        }

        if verbosity >= Verbosity::Subsets && self.beta != 0.0 {
            // The margin the nonnegativity guard protects: how hard the
            // prior can push against the weakest subset sensitivity.
            println!("stability: beta * max curvature bound = {:.3e}",
                     self.beta * self.prior.max_curvature_bound());
        }

        let mut stats = RunStats {
            iterations: niter,
            subsets_processed: 0,
            last_sensitivity_sum: 0.0,
            objective: None,
        };

        for iteration in 0..niter {
            if verbosity >= Verbosity::Iterations {
                println!("iteration {}/{niter}", iteration + 1);
            }
            for (subset_index, subset) in self.subsets.iter().enumerate() {
                let accumulators = self.pool.install(|| project_subset(
                    &self.projector, image, measured, mask,
                    self.weighting, &self.angles, subset,
                ));

                // The workers have joined; the only cross-worker scalar is
                // reduced serially here.
                let sensitivity: f64 =
                    accumulators.denominator.iter().map(|&x| x as f64).sum();

                self.apply_update(image, &accumulators, subset_index)?;
                self.check_range(image, iteration, subset_index)?;

                stats.subsets_processed += 1;
                stats.last_sensitivity_sum = sensitivity;
                if verbosity >= Verbosity::Subsets {
                    println!("  subset {subset_index:2} ({} angles): sensitivity sum {:.6e}",
                             subset.len(), sensitivity);
                }
            }
        }

        if !self.prior.is_none() {
            let objective = self.prior.objective(image);
            stats.objective = Some(objective);
            if verbosity >= Verbosity::Iterations {
                println!("penalty objective {objective:.6e}");
            }
        }

        Ok(stats)
    }

    /// Multiplicative image update from one subset's accumulators.
    fn apply_update(&self, image: &mut Image, acc: &SubsetAccumulators,
                    subset: usize) -> Result<(), Error> {
        if self.beta == 0.0 || self.prior.is_none() {
            // Plain EM: voxels this subset never saw keep their value
            azip!((voxel in &mut image.data,
                   &numerator in &acc.numerator,
                   &denominator in &acc.denominator) {
                if denominator != 0.0 { *voxel *= numerator / denominator }
            });
            return Ok(());
        }

        // One-step-late regularized update: the derivative field is taken on
        // the image as it stood before this subset's update.
        let derivative = self.prior_derivative_field(image)?;
        let dim = self.grid.dim();
        for (i, &voxel_derivative) in derivative.iter().enumerate() {
            let denominator = acc.denominator[i] + self.beta * voxel_derivative;
            if denominator < 0.0 {
                return Err(Error::NonnegativityViolation {
                    index: index1_to_3(i, dim),
                    denominator,
                    subset,
                });
            }
            image.data[i] *= acc.numerator[i] / denominator;
        }
        Ok(())
    }

    fn prior_derivative_field(&self, image: &Image) -> Result<Vec<Intensityf32>, Error> {
        let dim = self.grid.dim();
        let mut field = alloc_buffer("prior derivative field", self.grid.num_voxels())?;
        let [nr, nc, ns] = dim;
        for r in 0..nr {
            for c in 0..nc {
                for s in 0..ns {
                    field[index3_to_1([r, c, s], dim)] =
                        self.prior.derivative(image, [r, c, s]);
                }
            }
        }
        Ok(field)
    }

    /// Divergence guard: every voxel must stay within the physically valid
    /// range after each subset update. A NaN fails the containment test and
    /// is caught here as well.
    fn check_range(&self, image: &Image, iteration: usize, subset: usize)
                   -> Result<(), Error> {
        let upper = self.upper_bound;
        for (i, &value) in image.data.iter().enumerate() {
            if !(0.0..=upper).contains(&value) {
                return Err(Error::OutOfRangeVoxel {
                    index: index1_to_3(i, self.grid.dim()),
                    value, upper, iteration, subset,
                });
            }
        }
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GridConfig, PriorConfig, PriorModel, SinogramConfig};
    use crate::projector::forward_project_all;
    use float_eq::assert_float_eq;

    fn small_config() -> Config {
        Config {
            iterations: 1,
            subsets: 1,
            beta: 0.0,
            weighting: Weighting::Unweighted,
            prior: PriorConfig::default(),
            grid: GridConfig { transaxial: 6, slices: 1, pixel_size: 1.0 },
            sinogram: SinogramConfig { bins: 10, bin_width: 1.0 },
            rotation_steps_per_revolution: 12,
            angle_shift: 0.0,
            center_of_rotation_offset: 0.0,
            range_upper_bound: 2.0,
            num_threads: 2,
        }
    }

    fn measured_from(engine: &Osem, source: &Image, config: &Config) -> Sinogram {
        let mut sinogram = config.empty_sinogram();
        forward_project_all(&engine.projector, source, &engine.angles, &mut sinogram);
        sinogram
    }

    // Noiseless data from a uniform source: one EM iteration lands exactly on
    // the source value in every covered voxel, because the ratio view is the
    // source value everywhere the estimate is non-zero.
    #[test]
    fn uniform_source_is_recovered_in_one_iteration() {
        let config = small_config();
        let engine = Osem::new(&config).unwrap();
        let source = Image::new(engine.grid, vec![0.5; engine.grid.num_voxels()]);
        let measured = measured_from(&engine, &source, &config);

        let mut estimate = Image::ones(engine.grid);
        let stats = engine.run(&mut estimate, &measured, None, 1, false,
                               Verbosity::Quiet).unwrap();
        assert_eq!(stats.subsets_processed, 1);
        assert!(stats.last_sensitivity_sum > 0.0);
        for &v in &estimate.data {
            assert_float_eq!(v, 0.5, rel <= 1e-4);
        }
    }

    #[test]
    fn divergent_update_is_a_fatal_out_of_range() {
        let config = small_config();
        let engine = Osem::new(&config).unwrap();
        let source = Image::new(engine.grid, vec![0.5; engine.grid.num_voxels()]);
        let mut measured = measured_from(&engine, &source, &config);
        // Scale the data well past the physically valid range
        for v in &mut measured.data { *v *= 10.0; }

        let mut estimate = Image::ones(engine.grid);
        let result = engine.run(&mut estimate, &measured, None, 1, false,
                                Verbosity::Quiet);
        assert!(matches!(result, Err(Error::OutOfRangeVoxel { .. })));
    }

    #[test]
    fn overwhelming_prior_is_a_fatal_nonnegativity_violation() {
        let mut config = small_config();
        config.beta = 1e6;
        config.prior = PriorConfig { model: PriorModel::Gaussian, ..PriorConfig::default() };
        let engine = Osem::new(&config).unwrap();

        // A deep notch makes the Gaussian derivative strongly negative there
        let mut start = Image::new(engine.grid, vec![1.0; engine.grid.num_voxels()]);
        start[[3, 3, 0]] = 0.01;
        let measured = measured_from(&engine, &start, &config);

        let mut estimate = start.clone();
        let result = engine.run(&mut estimate, &measured, None, 1, true,
                                Verbosity::Quiet);
        assert!(matches!(result, Err(Error::NonnegativityViolation { .. })));
    }

    #[test]
    fn fresh_run_ignores_the_incoming_estimate() {
        let config = small_config();
        let engine = Osem::new(&config).unwrap();
        let source = Image::new(engine.grid, vec![0.5; engine.grid.num_voxels()]);
        let measured = measured_from(&engine, &source, &config);

        let mut from_ones = Image::ones(engine.grid);
        engine.run(&mut from_ones, &measured, None, 1, false, Verbosity::Quiet).unwrap();

        let mut from_garbage = Image::new(engine.grid,
                                          vec![1.7; engine.grid.num_voxels()]);
        engine.run(&mut from_garbage, &measured, None, 1, false, Verbosity::Quiet).unwrap();

        for (a, b) in from_ones.data.iter().zip(&from_garbage.data) {
            assert_float_eq!(*a, *b, ulps <= 1);
        }
    }

    #[test]
    fn all_ones_mask_changes_nothing() {
        let config = small_config();
        let engine = Osem::new(&config).unwrap();
        let source = Image::new(engine.grid, vec![0.5; engine.grid.num_voxels()]);
        let measured = measured_from(&engine, &source, &config);
        let mask = vec![1_u32; measured.len()];

        let mut bare = Image::ones(engine.grid);
        engine.run(&mut bare, &measured, None, 2, false, Verbosity::Quiet).unwrap();

        let mut masked = Image::ones(engine.grid);
        engine.run(&mut masked, &measured, Some(&mask), 2, false, Verbosity::Quiet).unwrap();

        for (a, b) in bare.data.iter().zip(&masked.data) {
            assert_float_eq!(*a, *b, ulps <= 1);
        }
    }
}
