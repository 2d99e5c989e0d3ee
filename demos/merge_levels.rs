use clap::Parser;
use gridfield::{HierarchicalGridData, UniformGrid, UniformGridData};
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;

#[derive(Debug, Parser)]
#[clap(version = "1.0", author = "J. Zrake <jzrake@clemson.edu>")]
struct Opts {
    /// Number of cells per axis on the coarse level
    #[clap(short = 'n', long, default_value = "32")]
    resolution: usize,

    /// Interpolate within the selected level instead of taking the nearest cell
    #[clap(short = 'r', long)]
    resample: bool,

    #[clap(short = 'v', long)]
    verbose: bool,
}

fn gaussian(x: &[f64]) -> f64 {
    (-(x[0] * x[0] + x[1] * x[1]) / 0.1).exp()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::parse();

    SimpleLogger::new()
        .with_level(if opts.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .init()?;

    info!("{:?}", opts);

    let n = opts.resolution;
    let coarse = UniformGridData::sample_function(gaussian, &[n, n], &[-1.0, -1.0], &[1.0, 1.0], 0)?;
    let dx = coarse.dx().to_vec();

    // Four fine patches tiling the center of the domain, as if written by
    // four processes.
    let half = n / 2;
    let fine_dx: Vec<_> = dx.iter().map(|d| d / 2.0).collect();
    let mut components = vec![coarse];

    for (i, j) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
        let x0 = [
            -0.5 + i as f64 * half as f64 * fine_dx[0],
            -0.5 + j as f64 * half as f64 * fine_dx[1],
        ];
        let grid = UniformGrid::from_spacing(&[half, half], &x0, &fine_dx)?.with_ref_level(1);
        components.push(UniformGridData::from_function(grid, gaussian));
    }

    let start = std::time::Instant::now();
    let hierarchy = HierarchicalGridData::new(components)?;
    info!("hierarchy:\n{}", hierarchy);

    let merged = hierarchy.merge_refinement_levels(opts.resample)?;
    let exact = UniformGridData::from_function(merged.grid().clone(), gaussian);
    let error = (&merged - &exact)?;

    info!("merged shape ............ {:?}", merged.shape());
    info!("integral ................ {}", merged.integral());
    info!("max error ............... {}", error.abs_max());
    info!("L2 error ................ {}", error.norm2());
    info!("elapsed ................. {}s", start.elapsed().as_secs_f64());
    Ok(())
}
