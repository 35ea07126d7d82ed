//! Autotuning OpenCL kernel generation for 2-D box convolution.
//!
//! The [`generate`] module specializes a box convolution into OpenCL C
//! source text for one tiling configuration, in one of two memory
//! strategies: direct access to the bulk input buffer, or cooperative
//! staging of the halo-extended input tile through local memory. The
//! [`tune`] module enumerates every legal configuration for a problem
//! geometry and times each on a device, and [`verify`] compares one
//! generated kernel against the sequential reference in [`convolution`].
//!
//! Device access goes through the [`runtime::Executor`] trait; this crate
//! never talks to a device itself. See the `convtune-cl` crate for the
//! OpenCL executor and the command line tools.

pub mod benchmark;
pub mod config;
pub mod convolution;
pub mod generate;
pub mod geometry;
pub mod runtime;
pub mod template;
pub mod tune;
pub mod verify;

pub use config::{ClScalar, ElemType, KernelConfig, LaunchGrid, MemoryStrategy};
pub use generate::{generate, KernelSource, KERNEL_NAME};
pub use geometry::Geometry;
pub use runtime::{Executor, LaunchError};
pub use tune::{enumerate, sweep, TuneLimits, TuningResult, REPORT_HEADER};
pub use verify::{check, CheckReport};
