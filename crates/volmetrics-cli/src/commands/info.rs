use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use volmetrics_core::io::{SliceAxes, Volume};

#[derive(Args)]
pub struct InfoArgs {
    /// Input NPY volume
    pub file: PathBuf,

    /// Also scan the whole volume for its maximum finite sample
    #[arg(long)]
    pub max: bool,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let volume = Volume::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let header = volume.header();
    let axes = SliceAxes::default();
    let (rows, cols) = volume.slice_dims(axes);
    let (outer, inner) = volume.grid_dims(axes);

    println!("File:        {}", args.file.display());
    println!("Format:      NPY {}.{}", header.version.0, header.version.1);
    println!("Shape:       {:?}", volume.shape());
    println!("Dtype:       {}", header.dtype.descr());
    println!(
        "Order:       {}",
        if header.fortran_order { "Fortran" } else { "C" }
    );
    println!("Slices:      {}x{} of {}x{} ({} total)", outer, inner, rows, cols, outer * inner);

    let total_mib = header.data_len() as f64 / (1024.0 * 1024.0);
    println!("Data size:   {:.1} MiB", total_mib);

    if args.max {
        let max = volume.global_max()?;
        println!("Max value:   {}", max);
    }

    Ok(())
}
