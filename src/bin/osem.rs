// ----------------------------------- CLI -----------------------------------
use clap::Parser;

#[derive(clap::Parser, Debug, Clone)]
#[clap(name = "osem", about = "Ordered-subsets EM reconstruction of ring-scanner sinograms")]
pub struct Cli {

    /// TOML configuration file
    #[clap(short, long)]
    pub config: PathBuf,

    /// Raw sinogram to reconstruct (f32 LE, slice-angle-bin order)
    #[clap(short, long)]
    pub input: PathBuf,

    /// Per-bin weight mask (u32 LE, slice-angle-bin order)
    #[clap(short, long)]
    pub mask: Option<PathBuf>,

    /// Initial estimate to resume from, instead of a uniform image
    #[clap(short, long)]
    pub resume: Option<PathBuf>,

    /// Stem of the per-iteration output files
    #[clap(short, long, default_value = "data/out/osem")]
    pub out_files: String,

    /// Repeat for more diagnostics (-v: iterations, -vv: subsets)
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

}

// --------------------------------------------------------------------------------

use std::error::Error;
use std::fs::create_dir_all;
use std::path::PathBuf;

use ringrec::config::read_config_file;
use ringrec::io::raw;
use ringrec::osem::{Osem, Verbosity};
use ringrec::utils::{group_digits, timing::Progress};
use ringrec::Image;

fn main() -> Result<(), Box<dyn Error>> {

    let args = Cli::parse();
    let verbosity = Verbosity::from_level(args.verbose);
    let mut progress = Progress::new();

    progress.start("Reading configuration");
    let config = read_config_file(&args.config)?;
    progress.done();

    progress.start("Reading sinogram");
    let measured = raw::read_sinogram(config.sinogram.bins, config.angles(),
                                      config.grid.slices, config.sinogram.bin_width,
                                      &args.input)?;
    progress.done();

    let mask = match &args.mask {
        Some(path) => {
            progress.start("Reading mask");
            let mask = raw::read_mask(config.sinogram.bins, config.angles(),
                                      config.grid.slices, path)?;
            progress.done();
            Some(mask)
        }
        None => None,
    };

    let engine = Osem::new(&config)?;
    println!("{} angles in {} subsets -> {} voxels",
             engine.angles.len(), engine.subsets.len(),
             group_digits(engine.grid.num_voxels()));

    let mut image = match &args.resume {
        Some(path) => raw::read_image(config.grid(), path)?,
        None       => Image::ones(config.grid()),
    };
    let mut resume = args.resume.is_some();

    // If the directory where results will be written does not exist yet, make it
    if let Some(parent) = PathBuf::from(format!("{}_00.raw", args.out_files)).parent() {
        if !parent.as_os_str().is_empty() { create_dir_all(parent)?; }
    }

    let mut last_stats = None;
    for iteration in 0..config.iterations {
        progress.start(&format!("Iteration {:2}/{}", iteration + 1, config.iterations));
        if verbosity > Verbosity::Quiet { println!(); }
        let stats = engine.run(&mut image, &measured, mask.as_deref(), 1,
                               resume, verbosity)?;
        resume = true; // later iterations continue from the current estimate
        progress.done();

        let path = PathBuf::from(format!("{}_{:02}.raw", args.out_files, iteration));
        raw::write_image(&image, &path)?;
        last_stats = Some(stats);
    }

    if let Some(stats) = last_stats {
        if let Some(objective) = stats.objective {
            println!("final penalty objective: {objective:.6e}");
        }
    }
    Ok(())
}
