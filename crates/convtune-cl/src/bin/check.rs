use std::error::Error;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use convtune::{check, generate, ElemType, Geometry, KernelConfig, MemoryStrategy};
use convtune_cl::OclExecutor;

/// Run one generated kernel configuration on an OpenCL device and
/// compare its output against the sequential reference convolution.
#[derive(Parser, Debug)]
#[command(name = "check")]
struct Args {
    /// OpenCL platform index.
    #[arg(long, default_value_t = 0)]
    platform: usize,
    /// OpenCL device index.
    #[arg(long, default_value_t = 0)]
    device: usize,
    /// Row stride alignment unit; 0 disables padding.
    #[arg(long)]
    padding: u32,
    /// Columns per work-group.
    #[arg(long)]
    cb: u32,
    /// Rows per work-group.
    #[arg(long)]
    rb: u32,
    /// Columns per work-item.
    #[arg(long)]
    ct: u32,
    /// Rows per work-item.
    #[arg(long)]
    rt: u32,
    #[arg(long)]
    width: u32,
    #[arg(long)]
    height: u32,
    #[arg(long)]
    filter_width: u32,
    #[arg(long)]
    filter_height: u32,
    /// Verify the shared-staging variant instead of direct access.
    #[arg(long)]
    local: bool,
    /// Print the generated kernel source.
    #[arg(long)]
    print: bool,
    /// Seed the input from entropy instead of the fixed seed.
    #[arg(long)]
    random: bool,
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
    let strategy = if args.local {
        MemoryStrategy::SharedStaging
    } else {
        MemoryStrategy::Direct
    };
    let config = KernelConfig::new(geometry, args.cb, args.rb, args.ct, args.rt, strategy, ElemType::F32);

    if geometry.width % config.group_columns() != 0 || geometry.height % config.group_rows() != 0 {
        return Err(format!(
            "geometry {}x{} is not divisible by the work-group tile {}x{}",
            geometry.width,
            geometry.height,
            config.group_columns(),
            config.group_rows(),
        )
        .into());
    }

    if args.print {
        println!("{}", generate(&config));
    }

    let mut rng: StdRng = if args.random {
        StdRng::from_os_rng()
    } else {
        StdRng::seed_from_u64(42)
    };
    let input: Vec<f32> = (0..geometry.input_len())
        .map(|_| rng.random_range(0.0..1000.0))
        .collect();
    let filter: Vec<f32> = (0..geometry.filter_len())
        .map(|_| rng.random_range(0.0..100.0))
        .collect();

    let mut executor = OclExecutor::new(args.platform, args.device, &geometry, &input, &filter)?;
    let report = check(&mut executor, &config, &input, &filter)?;

    if report.passed() {
        println!("TEST PASSED.");
    } else {
        println!(
            "Wrong items: {} ({:.3}%).",
            report.mismatched,
            report.percentage()
        );
    }

    Ok(())
}
