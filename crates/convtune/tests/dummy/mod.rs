use std::time::Duration;

use convtune::convolution::convolution;
use convtune::{ClScalar, Executor, Geometry, KernelSource, LaunchError, LaunchGrid};

/// In-process stand-in for the OpenCL collaborator, used to test the
/// driver and harness plumbing without a device. It "compiles" by
/// counting the call and "executes" by running the reference convolution
/// on its host buffers.
pub struct DummyExecutor<E> {
    geometry: Geometry,
    input: Vec<E>,
    filter: Vec<E>,
    output: Vec<E>,
    /// Compile calls observed so far.
    pub compiled: usize,
    /// Compile call indices (0-based) that fail with a forced diagnostic.
    pub fail_compiles: Vec<usize>,
    /// Output cells corrupted after each run, to exercise mismatch
    /// reporting.
    pub corrupt_cells: usize,
}

impl<E: ClScalar> DummyExecutor<E> {
    pub fn new(geometry: Geometry, input: Vec<E>, filter: Vec<E>) -> Self {
        assert_eq!(input.len(), geometry.input_len());
        assert_eq!(filter.len(), geometry.filter_len());
        let output = vec![E::zero(); geometry.output_len()];

        Self {
            geometry,
            input,
            filter,
            output,
            compiled: 0,
            fail_compiles: Vec::new(),
            corrupt_cells: 0,
        }
    }
}

impl<E: ClScalar> Executor<E> for DummyExecutor<E> {
    type Kernel = KernelSource;

    fn compile(&mut self, source: &KernelSource) -> Result<Self::Kernel, LaunchError> {
        let index = self.compiled;
        self.compiled += 1;
        if self.fail_compiles.contains(&index) {
            return Err(LaunchError::Compilation("forced build failure".into()));
        }
        Ok(source.clone())
    }

    fn run(&mut self, _kernel: &Self::Kernel, _grid: &LaunchGrid) -> Result<Duration, LaunchError> {
        convolution(&self.geometry, &self.input, &mut self.output, &self.filter);
        // Doubling plus one lands outside any relative tolerance, whatever
        // the cell's magnitude.
        for cell in self.output.iter_mut().take(self.corrupt_cells) {
            *cell = *cell + *cell + E::one();
        }
        Ok(Duration::from_micros(250))
    }

    fn read_output(&mut self) -> Result<Vec<E>, LaunchError> {
        Ok(self.output.clone())
    }
}
