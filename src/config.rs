//! Configuration file parser for the reconstruction engine.
//!
//! All tuning lives in one explicit record threaded through the engine's
//! constructor; there is no process-wide mutable state.

use std::error::Error;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::grid::Grid;
use crate::prior::{Prior, PriorParameters};
use crate::sinogram::Sinogram;

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {

    /// Number of OSEM iterations to perform
    pub iterations: usize,

    /// Number of OSEM subsets per iteration
    #[serde(default = "default_subsets")]
    pub subsets: usize,

    /// Regularization weight; 0 disables the prior entirely
    #[serde(default)]
    pub beta: f32,

    #[serde(default)]
    pub weighting: Weighting,

    #[serde(default)]
    pub prior: PriorConfig,

    pub grid: GridConfig,

    pub sinogram: SinogramConfig,

    /// Angular sampling of the rotating acquisition; views span half a
    /// revolution, so the angle count is half of this
    pub rotation_steps_per_revolution: usize,

    /// Shift applied to every view angle, as a fraction of the angular step
    #[serde(default)]
    pub angle_shift: f32,

    /// Shift of the ray-casting origin, in detector-bin-width units
    #[serde(default)]
    pub center_of_rotation_offset: f32,

    /// Upper edge of the physically valid voxel range; exceeding it after a
    /// subset update aborts the run
    #[serde(default = "default_upper_bound")]
    pub range_upper_bound: f32,

    /// Size of the fixed worker pool; 0 lets the pool pick one thread per core
    #[serde(default)]
    pub num_threads: usize,

}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    /// Transaxial pixels per side
    pub transaxial: usize,
    /// Axial slice count (shared with the sinogram)
    pub slices: usize,
    /// Transaxial pitch, in detector-bin-width units
    #[serde(default = "default_unit")]
    pub pixel_size: f32,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct SinogramConfig {
    /// Detector bins per view
    pub bins: usize,
    #[serde(default = "default_unit")]
    pub bin_width: f32,
}

/// How the subset sensitivity denominator is built.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// Backproject unity; a supplied mask still gates the ratio
    #[default]
    Unweighted,
    /// Backproject the mask itself (identical to Unweighted when no mask is
    /// supplied)
    Masked,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PriorConfig {
    #[serde(default)]
    pub model: PriorModel,
    /// Edge threshold of the Geman-McClure potential
    #[serde(default = "default_delta")]
    pub delta: f32,
    /// Smoothing constant of the Total-Variation potential
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,
}

impl Default for PriorConfig {
    fn default() -> Self {
        Self { model: PriorModel::None, delta: default_delta(), epsilon: default_epsilon() }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PriorModel {
    #[default]
    None,
    Gaussian,
    TotalVariation,
    GemanMcclure,
}

impl PriorConfig {
    pub fn build(&self) -> Prior {
        let params = PriorParameters { delta: self.delta, epsilon: self.epsilon };
        match self.model {
            PriorModel::None           => Prior::None,
            PriorModel::Gaussian       => Prior::Gaussian,
            PriorModel::TotalVariation => Prior::TotalVariation(params),
            PriorModel::GemanMcclure   => Prior::GemanMcClure(params),
        }
    }
}

impl Config {

    /// Number of projection angles: the views span half a revolution.
    pub fn angles(&self) -> usize {
        (self.rotation_steps_per_revolution / 2).max(1)
    }

    /// Angles per subset handed to the scheduler; a remainder becomes the
    /// scheduler's final, smaller subset.
    pub fn subset_size(&self) -> usize {
        (self.angles() / self.subsets.max(1)).max(1)
    }

    pub fn grid(&self) -> Grid {
        Grid::new(self.grid.transaxial, self.grid.slices, self.grid.pixel_size)
    }

    pub fn empty_sinogram(&self) -> Sinogram {
        Sinogram::new(self.sinogram.bins, self.angles(), self.grid.slices,
                      self.sinogram.bin_width)
    }

}

fn default_subsets()    -> usize { 1 }
fn default_unit()       -> f32 { 1.0 }
fn default_upper_bound()-> f32 { 2.0 }
fn default_delta()      -> f32 { 0.1 }
fn default_epsilon()    -> f32 { 1e-6 }

pub fn read_config_file(path: &Path) -> Result<Config, Box<dyn Error>> {
    let config = fs::read_to_string(path)
        .map_err(|e| format!("Couldn't read config file `{}`: {e}", path.display()))?;
    Ok(toml::from_str(&config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    //  ---  Parse string as TOML  -------------------------
    fn parse<'d, D: Deserialize<'d>>(input: &'d str) -> D {
        toml::from_str(input).unwrap()
    }

    // ----- Test the example on-disk config file ----------------------------
    #[test]
    fn test_config_file() {
        let config = read_config_file("osem-config.toml".as_ref()).unwrap();
        assert_eq!(config.iterations, 4);
        assert_eq!(config.subsets, 8);
        assert_eq!(config.weighting, Weighting::Masked);
        assert_eq!(config.prior.model, PriorModel::GemanMcclure);
        assert_eq!(config.prior.delta, 0.2);
        assert_eq!(config.beta, 0.05);
        assert_eq!(config.angles(), 96);
        assert_eq!(config.subset_size(), 12);
        assert_eq!(config.grid().n, 128);
    }

    #[test]
    fn minimal_config_fills_in_defaults() {
        let config: Config = parse(r#"
            iterations = 2
            rotation_steps_per_revolution = 16

            [grid]
            transaxial = 32
            slices = 5

            [sinogram]
            bins = 40
        "#);
        assert_eq!(config.subsets, 1);
        assert_eq!(config.beta, 0.0);
        assert_eq!(config.weighting, Weighting::Unweighted);
        assert_eq!(config.prior, PriorConfig::default());
        assert_eq!(config.range_upper_bound, 2.0);
        assert_eq!(config.num_threads, 0);
        assert_eq!(config.grid.pixel_size, 1.0);
        assert_eq!(config.sinogram.bin_width, 1.0);
        assert_eq!(config.angles(), 8);
    }

    #[test]
    fn prior_models_parse_by_name() {
        let prior: PriorConfig = parse(r#"model = "total-variation""#);
        assert_eq!(prior.model, PriorModel::TotalVariation);
        let prior: PriorConfig = parse(r#"model = "geman-mcclure"
                                          delta = 0.5"#);
        assert_eq!(prior.model, PriorModel::GemanMcclure);
        assert_eq!(prior.delta, 0.5);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<Config, _> = toml::from_str(r#"
            iterations = 1
            rotation_steps_per_revolution = 8
            iteratoins = 3

            [grid]
            transaxial = 4
            slices = 1

            [sinogram]
            bins = 4
        "#);
        assert!(result.is_err());
    }
}
