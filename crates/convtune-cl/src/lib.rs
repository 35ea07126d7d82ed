//! OpenCL executor for convtune.
//!
//! [`OclExecutor`] implements the core crate's [`Executor`] seam on a
//! real device through the `ocl` crate: it bootstraps one platform,
//! device and in-order queue, uploads the input and filter buffers at
//! construction, and compiles and launches generated kernels on demand.

use std::time::{Duration, Instant};

use ocl::flags::MemFlags;
use ocl::{Buffer, Context, Device, Kernel, OclPrm, Platform, Program, Queue};

use convtune::{ClScalar, Executor, Geometry, KernelSource, LaunchError, LaunchGrid};

/// Compiler options handed to the OpenCL program build, matching the
/// flags the kernels are tuned for.
pub const BUILD_OPTIONS: &str = "-cl-mad-enable -Werror";

/// One device context with the three buffers of a run bound to it.
pub struct OclExecutor<E: OclPrm> {
    context: Context,
    device: Device,
    queue: Queue,
    input: Buffer<E>,
    output: Buffer<E>,
    filter: Buffer<E>,
}

impl<E: ClScalar + OclPrm> OclExecutor<E> {
    /// Bootstrap the indexed platform and device, allocate the device
    /// buffers and upload `input` and `filter`.
    ///
    /// Failures here are fatal to the run; per-kernel failures surface
    /// later from [`Executor::compile`] and [`Executor::run`].
    pub fn new(
        platform_index: usize,
        device_index: usize,
        geometry: &Geometry,
        input: &[E],
        filter: &[E],
    ) -> Result<Self, LaunchError> {
        assert_eq!(input.len(), geometry.input_len());
        assert_eq!(filter.len(), geometry.filter_len());

        let platforms = Platform::list();
        let platform = platforms
            .get(platform_index)
            .copied()
            .ok_or_else(|| LaunchError::Device(format!("no OpenCL platform {platform_index}")))?;
        let devices = Device::list_all(platform)
            .map_err(|err| LaunchError::Device(err.to_string()))?;
        let device = devices
            .get(device_index)
            .copied()
            .ok_or_else(|| LaunchError::Device(format!("no OpenCL device {device_index}")))?;

        let context = Context::builder()
            .platform(platform)
            .devices(device)
            .build()
            .map_err(|err| LaunchError::Device(err.to_string()))?;
        let queue = Queue::new(&context, device, None)
            .map_err(|err| LaunchError::Device(err.to_string()))?;

        let input = Buffer::builder()
            .queue(queue.clone())
            .flags(MemFlags::new().read_only())
            .len(input.len())
            .copy_host_slice(input)
            .build()
            .map_err(|err| LaunchError::Transfer(err.to_string()))?;
        let output = Buffer::builder()
            .queue(queue.clone())
            .flags(MemFlags::new().write_only())
            .len(geometry.output_len())
            .build()
            .map_err(|err| LaunchError::Transfer(err.to_string()))?;
        let filter = Buffer::builder()
            .queue(queue.clone())
            .flags(MemFlags::new().read_only())
            .len(filter.len())
            .copy_host_slice(filter)
            .build()
            .map_err(|err| LaunchError::Transfer(err.to_string()))?;

        log::debug!(
            "initialized {} / {}",
            platform.name().unwrap_or_else(|_| "?".into()),
            device.name().unwrap_or_else(|_| "?".into()),
        );

        Ok(Self {
            context,
            device,
            queue,
            input,
            output,
            filter,
        })
    }
}

impl<E: ClScalar + OclPrm> Executor<E> for OclExecutor<E> {
    type Kernel = Kernel;

    fn compile(&mut self, source: &KernelSource) -> Result<Self::Kernel, LaunchError> {
        let program = Program::builder()
            .src(source.as_str())
            .cmplr_opt(BUILD_OPTIONS)
            .devices(self.device)
            .build(&self.context)
            .map_err(|err| LaunchError::Compilation(err.to_string()))?;

        Kernel::builder()
            .program(&program)
            .name(source.entry_point)
            .queue(self.queue.clone())
            .arg(&self.input)
            .arg(&self.output)
            .arg(&self.filter)
            .build()
            .map_err(|err| LaunchError::Compilation(err.to_string()))
    }

    fn run(&mut self, kernel: &Self::Kernel, grid: &LaunchGrid) -> Result<Duration, LaunchError> {
        let start = Instant::now();
        unsafe {
            kernel
                .cmd()
                .global_work_size([grid.global[0] as usize, grid.global[1] as usize])
                .local_work_size([grid.local[0] as usize, grid.local[1] as usize])
                .enq()
                .map_err(|err| LaunchError::Execution(err.to_string()))?;
        }
        self.queue
            .finish()
            .map_err(|err| LaunchError::Execution(err.to_string()))?;
        Ok(start.elapsed())
    }

    fn read_output(&mut self) -> Result<Vec<E>, LaunchError> {
        let mut host = vec![E::default(); self.output.len()];
        self.output
            .read(&mut host)
            .enq()
            .map_err(|err| LaunchError::Transfer(err.to_string()))?;
        Ok(host)
    }
}
