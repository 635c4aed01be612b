use rand::Rng;
use rand_distr::StandardNormal;

use crate::backend::ComputeBackend;
use crate::error::Result;
use crate::shape::Shape;

/// A host-resident tensor.
///
/// Holds contiguous, row-major f32 data with an associated shape. Compute is
/// dispatched to a `ComputeBackend`; data moves to a device through
/// `ComputeBackend::upload`.
#[derive(Debug, Clone)]
pub struct Tensor {
    data: Vec<f32>,
    shape: Shape,
}

impl Tensor {
    /// Create a new tensor from f32 data and a shape.
    ///
    /// # Panics
    /// Panics if `data.len() != shape.numel()`.
    pub fn new(data: Vec<f32>, shape: Shape) -> Self {
        assert_eq!(
            data.len(),
            shape.numel(),
            "data length {} does not match shape {} (numel={})",
            data.len(),
            shape,
            shape.numel()
        );
        Tensor { data, shape }
    }

    /// Create a zero-filled tensor with the given shape.
    pub fn zeros(shape: Shape) -> Self {
        let n = shape.numel();
        Tensor {
            data: vec![0.0; n],
            shape,
        }
    }

    /// Create a tensor of independent standard-normal samples.
    pub fn randn<R: Rng + ?Sized>(shape: Shape, rng: &mut R) -> Self {
        let n = shape.numel();
        let data: Vec<f32> = (0..n).map(|_| rng.sample(StandardNormal)).collect();
        Tensor { data, shape }
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the underlying data as an f32 slice.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Matrix multiplication of two 2-D tensors on the given backend.
    ///
    /// self is [m, k], other is [k, n], result is [m, n]. Uploads both
    /// operands, multiplies on the device, and downloads the product.
    pub fn matmul(&self, other: &Tensor, backend: &dyn ComputeBackend) -> Result<Tensor> {
        let a = backend.upload(self)?;
        let b = backend.upload(other)?;
        let c = backend.matmul(&a, &b)?;
        backend.download(&c)
    }
}
