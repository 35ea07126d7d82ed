use std::error::Error;
use std::fmt::{self, Display};
use std::time::Duration;

use crate::config::{ClScalar, LaunchGrid};
use crate::generate::KernelSource;

/// A failure reported by the external compute collaborator.
///
/// The search driver degrades any of these to "skip this configuration";
/// the correctness harness treats them as fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    /// Device or queue bootstrap failed; fatal to the whole run.
    Device(String),
    /// The kernel text failed to compile; carries the build diagnostic.
    Compilation(String),
    /// A kernel launch or completion wait failed.
    Execution(String),
    /// A host/device buffer operation failed.
    Transfer(String),
}

impl Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::Device(reason) => write!(f, "device setup failed: {reason}"),
            LaunchError::Compilation(diagnostic) => {
                write!(f, "kernel compilation failed: {diagnostic}")
            }
            LaunchError::Execution(reason) => write!(f, "kernel execution failed: {reason}"),
            LaunchError::Transfer(reason) => write!(f, "buffer transfer failed: {reason}"),
        }
    }
}

impl Error for LaunchError {}

/// The compile-and-execute collaborator the driver and harness talk to.
///
/// An executor owns the device context and the three buffers of one run:
/// input and filter are uploaded at construction and stay read-only, the
/// output buffer is written by kernels only. [`Executor::run`] blocks on
/// the completion event before returning, so no buffer is ever touched
/// while a launch is in flight.
pub trait Executor<E: ClScalar> {
    /// Handle to one compiled kernel object.
    type Kernel;

    /// Compile generated source into a runnable kernel with the buffers
    /// bound in the order `(input, output, filter)`.
    fn compile(&mut self, source: &KernelSource) -> Result<Self::Kernel, LaunchError>;

    /// Launch once over `grid`, wait for completion, and report the
    /// elapsed time.
    fn run(&mut self, kernel: &Self::Kernel, grid: &LaunchGrid) -> Result<Duration, LaunchError>;

    /// Copy the device output buffer back to the host.
    fn read_output(&mut self) -> Result<Vec<E>, LaunchError>;
}
