//! `ds-tensor` - Tensor primitives with pluggable compute backends for device-smoke.
//!
//! This crate provides:
//! - A host-resident `Tensor` type with random-matrix generation
//! - A `ComputeBackend` trait for pluggable compute (CPU, CUDA, Metal)
//! - Device-resident buffers (`DeviceTensor` / `DeviceStorage`)
//! - A reference `CpuBackend`, plus feature-gated accelerator backends

pub mod backend;
pub mod cpu;
#[cfg(feature = "cuda")]
pub mod cuda;
pub mod error;
#[cfg(feature = "metal")]
pub mod metal;
pub mod shape;
pub mod storage;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use backend::ComputeBackend;
pub use cpu::CpuBackend;
#[cfg(feature = "cuda")]
pub use cuda::CudaBackend;
pub use error::{Result, TensorError};
#[cfg(feature = "metal")]
pub use metal::MetalBackend;
pub use shape::Shape;
pub use storage::{DeviceStorage, DeviceTensor};
pub use tensor::Tensor;
