// ----------------------------------- CLI -----------------------------------
use clap::Parser;

#[derive(clap::Parser, Debug, Clone)]
#[clap(name = "makesino", about = "Simulate a sinogram by forward-projecting a synthetic phantom")]
pub struct Cli {

    /// TOML configuration file (geometry sections are used)
    #[clap(short, long)]
    pub config: PathBuf,

    /// Where to write the simulated sinogram
    #[clap(short, long, default_value = "data/out/phantom-sino.raw")]
    pub out: PathBuf,

    /// Also write the phantom image itself
    #[clap(long)]
    pub write_phantom: Option<PathBuf>,

    /// Phantom shape
    #[clap(long, value_enum, default_value = "disc")]
    pub shape: Shape,

    /// Voxel value inside the phantom
    #[clap(long, default_value = "0.5")]
    pub value: f32,

    /// Disc radius (or square half-width) in pixels; defaults to a third of
    /// the grid
    #[clap(long)]
    pub size: Option<f32>,

    /// Poisson counts per unit line integral; omit for noiseless data
    #[clap(long)]
    pub counts: Option<f32>,

    /// Seed of the noise generator
    #[clap(long, default_value = "0")]
    pub seed: u64,

}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum Shape {
    Disc,
    Square,
}

// --------------------------------------------------------------------------------

use std::error::Error;
use std::fs::create_dir_all;
use std::path::PathBuf;

use indicatif::ProgressBar;
use rand::{rngs::StdRng, SeedableRng};

use ringrec::angles::AngleTable;
use ringrec::config::read_config_file;
use ringrec::io::raw;
use ringrec::phantom::{add_counting_noise, centred_disc, centred_square};
use ringrec::projector::{ParallelBeam, Projector};
use ringrec::utils::group_digits;

fn main() -> Result<(), Box<dyn Error>> {

    let args = Cli::parse();
    let config = read_config_file(&args.config)?;
    let grid = config.grid();

    let phantom = match args.shape {
        Shape::Disc => {
            let radius = args.size.unwrap_or(grid.n as f32 / 3.0) * grid.pixel_size;
            centred_disc(grid, radius, args.value)
        }
        Shape::Square => {
            let half = args.size.unwrap_or(grid.n as f32 / 3.0).round() as usize;
            centred_square(grid, half, args.value)
        }
    };

    let angles = AngleTable::new(config.angles(), config.angle_shift);
    let projector = ParallelBeam::new(config.sinogram.bins, config.sinogram.bin_width,
                                      config.center_of_rotation_offset);
    let mut sinogram = config.empty_sinogram();

    println!("Projecting {} voxels into {} views of {} bins",
             group_digits(grid.num_voxels()), angles.len(), sinogram.bins);
    let progress = ProgressBar::new(angles.len() as u64);
    for angle in 0..angles.len() {
        let (cs, sn) = angles.trig(angle);
        projector.project_view(&phantom, sinogram.view_mut(angle), cs, sn);
        progress.inc(1);
    }
    progress.finish();

    if let Some(counts) = args.counts {
        let mut rng = StdRng::seed_from_u64(args.seed);
        add_counting_noise(&mut sinogram, counts, &mut rng);
    }

    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() { create_dir_all(parent)?; }
    }
    raw::write_sinogram(&sinogram, &args.out)?;

    if let Some(path) = &args.write_phantom {
        raw::write_image(&phantom, path)?;
    }

    Ok(())
}
