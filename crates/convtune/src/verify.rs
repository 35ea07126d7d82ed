use num_traits::Float;

use crate::config::{ClScalar, KernelConfig};
use crate::convolution::convolution;
use crate::generate::generate;
use crate::runtime::{Executor, LaunchError};

/// Relative tolerance of the elementwise comparison. Generated kernels
/// may accumulate in a different association order than the reference,
/// so bitwise equality is not expected.
pub const TOLERANCE: f64 = 1.0e-4;

/// Outcome of one verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    /// Output cells differing from the reference beyond tolerance.
    pub mismatched: u64,
    /// Logical output cells compared, padding columns excluded.
    pub total: u64,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.mismatched == 0
    }

    /// Share of mismatching cells, in percent.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.mismatched as f64 * 100.0 / self.total as f64
        }
    }
}

/// Run one generated kernel and compare its output elementwise against
/// the reference convolution on the same input and filter.
///
/// Compilation and execution failures are fatal here, unlike in the
/// sweep. A numeric mismatch is counted and reported, never an error.
pub fn check<E, X>(
    executor: &mut X,
    config: &KernelConfig,
    input: &[E],
    filter: &[E],
) -> Result<CheckReport, LaunchError>
where
    E: ClScalar,
    X: Executor<E>,
{
    let source = generate(config);
    let kernel = executor.compile(&source)?;
    executor.run(&kernel, &config.launch_grid())?;
    let device = executor.read_output()?;

    let geometry = &config.geometry;
    let mut host = vec![E::zero(); geometry.output_len()];
    convolution(geometry, input, &mut host, filter);

    let stride = geometry.output_stride() as usize;
    let mut mismatched = 0;
    for y in 0..geometry.height as usize {
        for x in 0..geometry.width as usize {
            if !approx_eq(device[(y * stride) + x], host[(y * stride) + x]) {
                mismatched += 1;
            }
        }
    }

    Ok(CheckReport {
        mismatched,
        total: geometry.width as u64 * geometry.height as u64,
    })
}

/// Tolerance comparison with an absolute floor for near-zero values.
pub fn approx_eq<E: Float>(a: E, b: E) -> bool {
    let tolerance = E::from(TOLERANCE).expect("tolerance fits the scalar type");
    let diff = (a - b).abs();
    diff <= tolerance || diff <= a.abs().max(b.abs()) * tolerance
}
