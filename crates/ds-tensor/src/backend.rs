use std::fmt::Debug;

use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::storage::DeviceTensor;
use crate::tensor::Tensor;

/// Trait for pluggable compute backends (CPU, CUDA, Metal).
///
/// A backend owns a device and moves data across the host/device boundary
/// explicitly: `upload` and `download` copy, `matmul` runs on the device.
/// Kernel dispatch may return before the device has finished; callers that
/// time device work must bracket it with `synchronize`.
pub trait ComputeBackend: Debug {
    /// Returns the name of this backend (e.g., "cpu", "cuda", "metal").
    fn name(&self) -> &str;

    /// Copy a host tensor into device memory.
    fn upload(&self, tensor: &Tensor) -> Result<DeviceTensor>;

    /// Copy a device tensor back into host memory.
    fn download(&self, tensor: &DeviceTensor) -> Result<Tensor>;

    /// Matrix multiplication: C = A @ B on the device.
    ///
    /// Both operands must be 2-D with a shared inner dimension. The result
    /// stays resident on the device.
    fn matmul(&self, a: &DeviceTensor, b: &DeviceTensor) -> Result<DeviceTensor>;

    /// Block until all previously dispatched work on this backend has
    /// completed. No-op for synchronous backends.
    fn synchronize(&self) -> Result<()>;
}

/// Validate a matmul operand pair, returning `(m, k, n)`.
pub fn matmul_dims(a: &Shape, b: &Shape) -> Result<(usize, usize, usize)> {
    if a.ndim() != 2 || b.ndim() != 2 {
        return Err(TensorError::Unsupported(format!(
            "matmul requires 2-D operands, got {} and {}",
            a, b
        )));
    }

    let m = a.dim(0);
    let k = a.dim(1);
    let k2 = b.dim(0);
    let n = b.dim(1);

    if k != k2 {
        return Err(TensorError::MatmulMismatch { m, k, k2, n });
    }
    Ok((m, k, n))
}
