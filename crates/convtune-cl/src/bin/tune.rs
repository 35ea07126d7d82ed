use std::error::Error;
use std::io::{self, Write};

use clap::Parser;
use rand::Rng;

use convtune::{enumerate, sweep, ElemType, Geometry, MemoryStrategy, TuneLimits};
use convtune_cl::OclExecutor;

/// Sweep convolution kernel tilings on an OpenCL device and report the
/// throughput of every configuration that compiles and runs.
#[derive(Parser, Debug)]
#[command(name = "tune")]
struct Args {
    /// Timed kernel executions per configuration.
    #[arg(long)]
    iterations: u32,
    /// OpenCL platform index.
    #[arg(long, default_value_t = 0)]
    platform: usize,
    /// OpenCL device index.
    #[arg(long, default_value_t = 0)]
    device: usize,
    /// Row stride alignment unit; 0 disables padding.
    #[arg(long)]
    padding: u32,
    /// Work-group sizes must be a multiple of this unit.
    #[arg(long)]
    thread_unit: u32,
    /// Smallest number of columns per work-group to try.
    #[arg(long)]
    min_threads: u32,
    /// Device ceiling on work-items per work-group.
    #[arg(long)]
    max_threads: u32,
    /// Largest number of rows per work-group to try.
    #[arg(long)]
    max_rows: u32,
    /// Largest number of columns per work-group to try.
    #[arg(long)]
    max_columns: u32,
    /// Step between successive column counts.
    #[arg(long)]
    thread_increment: u32,
    /// Per-thread tile element budget, register reserve included.
    #[arg(long)]
    max_items: u32,
    #[arg(long)]
    width: u32,
    #[arg(long)]
    height: u32,
    #[arg(long)]
    filter_width: u32,
    #[arg(long)]
    filter_height: u32,
    /// Sweep the shared-staging variants instead of direct access.
    #[arg(long)]
    local: bool,
    /// Emit the results as a JSON array instead of the textual table.
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let geometry = Geometry::new(
        args.width,
        args.height,
        args.filter_width,
        args.filter_height,
        args.padding,
    );
    let limits = TuneLimits::new(
        args.min_threads,
        args.max_threads,
        args.max_rows,
        args.max_columns,
        args.thread_unit,
        args.thread_increment,
        args.max_items,
        None,
    );
    let strategies = if args.local {
        [MemoryStrategy::SharedStaging]
    } else {
        [MemoryStrategy::Direct]
    };

    let configs = enumerate(&geometry, &limits, &strategies, ElemType::F32);
    log::info!("{} candidate configurations", configs.len());

    let mut rng = rand::rng();
    let input: Vec<f32> = (0..geometry.input_len())
        .map(|_| rng.random_range(0.0..1000.0))
        .collect();
    let filter: Vec<f32> = (0..geometry.filter_len())
        .map(|_| rng.random_range(0.0..100.0))
        .collect();

    let mut executor = OclExecutor::new(args.platform, args.device, &geometry, &input, &filter)?;

    let stdout = io::stdout();
    if args.json {
        let results = sweep(&mut executor, &configs, args.iterations, &mut io::sink())?;
        serde_json::to_writer_pretty(stdout.lock(), &results)?;
        writeln!(stdout.lock())?;
    } else {
        sweep(&mut executor, &configs, args.iterations, &mut stdout.lock())?;
    }

    Ok(())
}
